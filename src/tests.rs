use std::{collections::BTreeMap, ops::Range, ptr::NonNull};

/// Tracks the state of every byte of a pool's storage independently of the
/// pool, so that tests can detect overlapping or foreign slots.
pub struct ShadowPool {
    regions: BTreeMap<usize, SpRegion>,
    slot_size: usize,
}

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum SpRegion {
    Free,
    Used,
    Invalid,
}

impl ShadowPool {
    pub fn new(slot_size: usize) -> Self {
        Self {
            regions: Some((0, SpRegion::Invalid)).into_iter().collect(),
            slot_size,
        }
    }

    fn region_at(&self, addr: usize) -> SpRegion {
        let (_, &region) = self.regions.range(0..=addr).next_back().unwrap();
        region
    }

    fn convert_range(&mut self, range: Range<usize>, old_region: SpRegion, new_region: SpRegion) {
        if range.is_empty() {
            return;
        }

        assert_ne!(old_region, new_region);
        log::trace!(
            "sp: converting {:?} from {:?} to {:?}",
            range,
            old_region,
            new_region
        );

        let (&addr, &region) = self.regions.range(0..range.end).next_back().unwrap();
        if addr > range.start {
            panic!("there's a discontinuity in range {:?}", range);
        } else if region != old_region {
            panic!(
                "range {:?} is {:?} (expected {:?})",
                range, region, old_region
            );
        }

        // Insert an element at `range.start`
        if addr == range.start {
            *self.regions.get_mut(&addr).unwrap() = new_region;
        } else {
            self.regions.insert(range.start, new_region);
        }

        // Each element must represent a discontinuity. If it doesnt't represent
        // a discontinuity, it must be removed.
        if let Some((_, &region)) = self.regions.range(0..range.start).next_back() {
            if region == new_region {
                self.regions.remove(&range.start);
            }
        }

        if let Some(&end_region) = self.regions.get(&range.end) {
            if end_region == new_region {
                self.regions.remove(&range.end);
            }
        } else {
            // Insert an element at `range.end`
            self.regions.insert(range.end, old_region);
        }
    }

    fn slot_range(&self, slot: NonNull<u8>) -> Range<usize> {
        let start = slot.as_ptr() as usize;
        start..start + self.slot_size
    }

    pub fn insert_storage(&mut self, start: *const u8, len: usize) {
        let start = start as usize;
        self.convert_range(start..start + len, SpRegion::Invalid, SpRegion::Free);
    }

    pub fn allocate(&mut self, slot: NonNull<u8>) {
        let range = self.slot_range(slot);
        self.convert_range(range, SpRegion::Free, SpRegion::Used);
    }

    pub fn release(&mut self, slot: NonNull<u8>) {
        let range = self.slot_range(slot);
        self.convert_range(range, SpRegion::Used, SpRegion::Free);
    }

    /// Return `true` if the whole slot is currently free.
    pub fn is_free(&self, slot: NonNull<u8>) -> bool {
        let range = self.slot_range(slot);
        self.region_at(range.start) == SpRegion::Free
            && self
                .regions
                .range(range.start + 1..range.end)
                .next()
                .is_none()
    }
}
