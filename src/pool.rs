//! The fixed-slot pool core
use core::{
    fmt,
    iter::FusedIterator,
    marker::PhantomData,
    mem::{self, MaybeUninit},
    ptr::NonNull,
    slice,
};

use crate::{DefaultOptions, Error, PoolOptions};

/// A free-list link. It occupies the first [`LINK_SIZE`] bytes of every free
/// slot.
type Link = Option<NonNull<u8>>;

/// The number of bytes at the start of a free slot that hold the link to the
/// next free slot. This is the minimum slot size.
pub const LINK_SIZE: usize = mem::size_of::<Link>();

#[doc = svgbobdoc::transform!(
/// The pool handle.
///
/// # Data Structure Overview
///
/// <center>
/// ```svgbob
///                  slot 0          slot 1          slot 2          slot 3
///              ,---------------+---------------+---------------+---------------,
///   storage:   | O---+         |  (payload)    | O---+         |  null         |
///              '-----|---------+---------------+-----|---------+---------------'
///                ^   |                           ^   |           ^
///                |   '---------------------------'   '-----------'
///                |
///   head --------'                      slot_size
///                                    |<------------->|
/// ```
/// </center>
)]
///
/// The free slots form a singly-linked list whose links live in the first
/// [`LINK_SIZE`] bytes of each free slot. An allocated slot belongs entirely
/// to its user. A slot is free if and only if it is reachable from `head`.
///
/// # Properties
///
///  - [`allocate`](Self::allocate) pops the head of the free list in constant
///    time. Right after initialization, slots are handed out in ascending
///    address order.
///
///  - [`release`](Self::release) scans the free list for the released slot
///    before pushing it to the head, so releasing an already-free slot is
///    reported as [`Error::NotAllocated`] instead of corrupting the list.
///    The scan is linear in the number of free slots.
///
///  - The storage is borrowed for `'pool` and is never allocated, freed, or
///    resized by the pool. Links are accessed unaligned, so the storage needs
///    no particular alignment.
///
pub struct SlotPool<'pool, O = DefaultOptions> {
    storage: Option<NonNull<u8>>,
    head: Link,
    slot_size: u32,
    slot_number: u32,
    _phantom: PhantomData<(&'pool mut (), fn() -> O)>,
}

// Safety: All slots referenced by a particular instance of `SlotPool` are
//         logically owned by that `SlotPool` until they are allocated, and
//         `&self` methods never write to them, so these are safe.
unsafe impl<O> Send for SlotPool<'_, O> {}

unsafe impl<O> Sync for SlotPool<'_, O> {}

impl<O> fmt::Debug for SlotPool<'_, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotPool")
            .field("storage", &self.storage)
            .field("head", &self.head)
            .field("slot_size", &self.slot_size)
            .field("slot_number", &self.slot_number)
            .finish()
    }
}

impl<O: PoolOptions> Default for SlotPool<'_, O> {
    fn default() -> Self {
        Self::INIT
    }
}

impl<O: PoolOptions> const_default1::ConstDefault for SlotPool<'_, O> {
    const DEFAULT: Self = Self::INIT;
}

/// Read the link stored in a free slot.
///
/// # Safety
///
/// `slot` must point to at least [`LINK_SIZE`] initialized bytes.
#[inline]
unsafe fn read_link(slot: NonNull<u8>) -> Link {
    slot.as_ptr().cast::<Link>().read_unaligned()
}

/// Store a link in a slot.
///
/// # Safety
///
/// `slot` must point to at least [`LINK_SIZE`] writable bytes.
#[inline]
unsafe fn write_link(slot: NonNull<u8>, next: Link) {
    slot.as_ptr().cast::<Link>().write_unaligned(next)
}

impl<'pool, O: PoolOptions> SlotPool<'pool, O> {
    /// A pool with no storage. [`allocate`](Self::allocate) fails until the
    /// pool is initialized.
    pub const INIT: Self = Self {
        storage: None,
        head: None,
        slot_size: 0,
        slot_number: 0,
        _phantom: PhantomData,
    };

    /// Validate a slot geometry and calculate the required storage length.
    fn storage_len_for(slot_size: u32, slot_number: u32) -> Result<usize, Error> {
        if slot_size == 0 || slot_number == 0 || (slot_size as usize) < LINK_SIZE {
            return Err(Error::Parameters);
        }
        (slot_size as usize)
            .checked_mul(slot_number as usize)
            .ok_or(Error::Parameters)
    }

    /// Initialize the pool with `slot_number` slots of `slot_size` bytes each,
    /// carved from the beginning of `storage`. Any previous state of the pool
    /// is discarded.
    ///
    /// The used part of `storage` is cleared to zero, and every slot becomes
    /// free. Slots are then allocated in ascending address order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parameters`] without modifying anything if
    /// `slot_size` or `slot_number` is zero, `slot_size` is smaller than
    /// [`LINK_SIZE`], or `storage` is shorter than
    /// `slot_size * slot_number` bytes. These checks are performed regardless
    /// of [`PoolOptions::CHECK_PARAMS`].
    ///
    /// # Examples
    ///
    /// ```
    /// use slotpool::SlotPool;
    /// use std::mem::MaybeUninit;
    /// let mut storage = [MaybeUninit::uninit(); 256];
    /// let mut pool: SlotPool<'_> = SlotPool::INIT;
    /// pool.init(&mut storage, 32, 8).unwrap();
    /// assert_eq!(pool.free_count(), 8);
    /// ```
    ///
    /// The storage must outlive the pool:
    ///
    /// ```rust,compile_fail
    /// use slotpool::SlotPool;
    /// use std::mem::MaybeUninit;
    /// let mut pool: SlotPool<'_> = SlotPool::INIT;
    /// let mut storage = [MaybeUninit::uninit(); 256];
    /// pool.init(&mut storage, 32, 8).unwrap();
    /// drop(storage); // dropping the storage first is not allowed
    /// drop(pool);
    /// ```
    pub fn init(
        &mut self,
        storage: &'pool mut [MaybeUninit<u8>],
        slot_size: u32,
        slot_number: u32,
    ) -> Result<(), Error> {
        let len = Self::storage_len_for(slot_size, slot_number);
        pool_assert!(O, len.is_ok(), "invalid slot geometry");
        let len = len?;

        if storage.len() < len {
            pool_assert!(
                O,
                false,
                "storage is {} bytes long ({} bytes required)",
                storage.len(),
                len
            );
            return Err(Error::Parameters);
        }

        // Safety: `storage` is a valid, exclusively borrowed region of at
        //         least `len` bytes that outlives `self`, and every slot can
        //         hold a link
        unsafe {
            self.init_unchecked(
                NonNull::new_unchecked(storage.as_mut_ptr().cast()),
                slot_size,
                slot_number,
            )
        };
        Ok(())
    }

    /// Initialize the pool with one slot per element of `storage`, each
    /// [`size_of::<T>()`](mem::size_of) bytes long.
    ///
    /// Slot `i` is located at `&storage[i]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parameters`] if `storage` is empty, `T` is smaller
    /// than [`LINK_SIZE`], or the geometry doesn't fit in `u32`.
    ///
    /// # Examples
    ///
    /// ```
    /// use slotpool::SlotPool;
    /// use std::mem::MaybeUninit;
    /// struct Node { next: Option<Box<Node>>, data: u8 }
    ///
    /// let mut storage: [MaybeUninit<Node>; 3] = [const { MaybeUninit::uninit() }; 3];
    /// let base = storage.as_ptr() as *mut u8;
    ///
    /// let mut pool: SlotPool<'_> = SlotPool::INIT;
    /// pool.init_for(&mut storage).unwrap();
    /// assert_eq!(pool.allocate().unwrap().as_ptr(), base);
    /// ```
    pub fn init_for<T>(&mut self, storage: &'pool mut [MaybeUninit<T>]) -> Result<(), Error> {
        let slot_size = u32::try_from(mem::size_of::<T>()).map_err(|_| Error::Parameters)?;
        let slot_number = u32::try_from(storage.len()).map_err(|_| Error::Parameters)?;
        let len = mem::size_of_val(storage);

        // Safety: Any bit pattern is valid for `MaybeUninit<u8>`, and the
        //         byte slice covers exactly the same region
        let bytes = unsafe {
            slice::from_raw_parts_mut(storage.as_mut_ptr().cast::<MaybeUninit<u8>>(), len)
        };
        self.init(bytes, slot_size, slot_number)
    }

    /// Initialize the pool over the storage starting at `storage`.
    ///
    /// When [`PoolOptions::CHECK_PARAMS`] is enabled, a null `storage`, a
    /// zero `slot_size` or `slot_number`, a `slot_size` smaller than
    /// [`LINK_SIZE`], or an overflowing total size is reported as
    /// [`Error::Parameters`] without modifying anything.
    ///
    /// # Safety
    ///
    ///  - `storage` must be valid for reads and writes of
    ///    `slot_size * slot_number` bytes for `'pool`, and nothing else may
    ///    access that region except through the slots handed out by `self`.
    ///
    ///  - If [`PoolOptions::CHECK_PARAMS`] is disabled, the parameters must
    ///    satisfy the conditions listed above. Otherwise the behavior is
    ///    undefined.
    ///
    pub unsafe fn init_ptr(
        &mut self,
        storage: *mut u8,
        slot_size: u32,
        slot_number: u32,
    ) -> Result<(), Error> {
        pool_assert!(
            O,
            !storage.is_null() && Self::storage_len_for(slot_size, slot_number).is_ok(),
            "invalid memory pool parameters"
        );

        if O::CHECK_PARAMS {
            if storage.is_null() {
                return Err(Error::Parameters);
            }
            Self::storage_len_for(slot_size, slot_number)?;
        }

        self.init_unchecked(NonNull::new_unchecked(storage), slot_size, slot_number);
        Ok(())
    }

    /// Reset `self`, zero the storage, and link every slot into the free
    /// list.
    ///
    /// # Safety
    ///
    /// `storage` must be valid for `slot_size * slot_number` bytes and
    /// `slot_size` must be at least [`LINK_SIZE`].
    unsafe fn init_unchecked(&mut self, storage: NonNull<u8>, slot_size: u32, slot_number: u32) {
        let slot_size = slot_size as usize;

        *self = Self::INIT;
        storage
            .as_ptr()
            .write_bytes(0, slot_size.wrapping_mul(slot_number as usize));

        self.storage = Some(storage);
        self.slot_size = slot_size as u32;
        self.slot_number = slot_number;

        // Link in descending order so that the head ends up at slot 0 and
        // each slot points to the one after it
        for i in (0..slot_number as usize).rev() {
            let slot = NonNull::new_unchecked(storage.as_ptr().add(i * slot_size));
            self.push_free(slot);
        }
    }

    /// Make `slot` the new head of the free list.
    ///
    /// # Safety
    ///
    /// `slot` must be a slot of `self` that is not currently in the free list.
    #[inline]
    unsafe fn push_free(&mut self, slot: NonNull<u8>) {
        // The link is written even if the list is empty because the slot's
        // first bytes may hold a stale payload
        write_link(slot, self.head);
        self.head = Some(slot);
    }

    /// Allocate a slot.
    ///
    /// Returns the head of the free list. If [`PoolOptions::ZEROIZE`] is
    /// enabled, the whole slot reads as zero; otherwise only its first
    /// [`LINK_SIZE`] bytes are cleared.
    ///
    /// # Errors
    ///
    ///  - [`Error::Space`] if every slot is allocated. The pool is left
    ///    unchanged and remains usable.
    ///
    ///  - [`Error::Parameters`] if the pool was never initialized and
    ///    [`PoolOptions::CHECK_PARAMS`] is enabled. (Otherwise
    ///    [`Error::Space`] is reported.)
    ///
    /// # Time Complexity
    ///
    /// This method will complete in constant time, or linear in the slot size
    /// when zeroing.
    ///
    /// # Examples
    ///
    /// ```
    /// use slotpool::{Error, SlotPool};
    /// use std::mem::MaybeUninit;
    /// let mut storage = [MaybeUninit::uninit(); 64];
    /// let mut pool: SlotPool<'_> = SlotPool::INIT;
    /// pool.init(&mut storage, 32, 2).unwrap();
    ///
    /// let first = pool.allocate().unwrap();
    /// let second = pool.allocate().unwrap();
    /// assert_eq!(second.as_ptr() as usize - first.as_ptr() as usize, 32);
    /// assert_eq!(pool.allocate(), Err(Error::Space));
    /// ```
    pub fn allocate(&mut self) -> Result<NonNull<u8>, Error> {
        if O::CHECK_PARAMS && self.storage.is_none() {
            pool_assert!(O, false, "the pool is not initialized");
            return Err(Error::Parameters);
        }

        let slot = self.head.ok_or(Error::Space)?;

        // Safety: `slot` is a free slot owned by `self`, which is at least
        //         `LINK_SIZE` bytes long and holds a valid link
        unsafe {
            let next = read_link(slot);
            if O::ZEROIZE {
                slot.as_ptr().write_bytes(0, self.slot_size as usize);
            }
            write_link(slot, None);
            self.head = next;
        }

        Ok(slot)
    }

    /// Release a slot previously returned by [`allocate`](Self::allocate).
    ///
    /// The free list is searched for `slot` first. If `slot` is already
    /// free, [`Error::NotAllocated`] is returned and nothing is modified.
    /// Otherwise `slot` becomes the head of the free list and will be the
    /// next one to be allocated.
    ///
    /// # Errors
    ///
    ///  - [`Error::NotAllocated`] if `slot` is currently free (double
    ///    release).
    ///
    ///  - [`Error::Parameters`] if the pool was never initialized and
    ///    [`PoolOptions::CHECK_PARAMS`] is enabled.
    ///
    /// # Time Complexity
    ///
    /// This method will complete in linear time in the number of free slots.
    ///
    /// # Safety
    ///
    /// `slot` must be one of the slot addresses of `self` (the addresses
    /// [`allocate`](Self::allocate) can return). Neither the bounds nor the
    /// alignment of `slot` are checked unless [`PoolOptions::ASSERTIONS`]
    /// is enabled. The caller must not access the slot after it's released.
    ///
    pub unsafe fn release(&mut self, slot: NonNull<u8>) -> Result<(), Error> {
        if O::CHECK_PARAMS && self.storage.is_none() {
            pool_assert!(O, false, "the pool is not initialized");
            return Err(Error::Parameters);
        }

        pool_assert!(
            O,
            self.slot_index(slot).is_some(),
            "{:p} is not a slot of this pool",
            slot
        );

        if self.is_free(slot) {
            pool_assert!(O, false, "{:p} is already free", slot);
            return Err(Error::NotAllocated);
        }

        self.push_free(slot);
        Ok(())
    }

    /// [`release`](Self::release) taking a raw pointer. A null `slot` is
    /// reported as [`Error::Parameters`].
    ///
    /// # Safety
    ///
    /// See [`release`](Self::release).
    pub unsafe fn release_ptr(&mut self, slot: *mut u8) -> Result<(), Error> {
        match NonNull::new(slot) {
            Some(slot) => self.release(slot),
            None => {
                pool_assert!(O, false, "releasing a null slot");
                Err(Error::Parameters)
            }
        }
    }

    /// Get the size of each slot in bytes.
    #[inline]
    pub fn slot_size(&self) -> u32 {
        self.slot_size
    }

    /// Get the total number of slots.
    #[inline]
    pub fn slot_number(&self) -> u32 {
        self.slot_number
    }

    /// Get the number of storage bytes managed by the pool.
    #[inline]
    pub fn storage_len(&self) -> usize {
        self.slot_size as usize * self.slot_number as usize
    }

    /// Return `true` if the pool has been initialized.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.storage.is_some()
    }

    /// Return `true` if no slot can be allocated.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.head.is_none()
    }

    /// Get the address of the slot at `index`.
    pub fn slot(&self, index: u32) -> Option<NonNull<u8>> {
        let storage = self.storage?;
        if index >= self.slot_number {
            return None;
        }
        // Safety: `index * slot_size` is within the storage
        Some(unsafe {
            NonNull::new_unchecked(
                storage
                    .as_ptr()
                    .add(index as usize * self.slot_size as usize),
            )
        })
    }

    /// Get the index of the slot located at `ptr`. Returns `None` if `ptr` is
    /// outside the storage or doesn't point to the start of a slot.
    pub fn slot_index(&self, ptr: NonNull<u8>) -> Option<u32> {
        let storage = self.storage?;
        let offset = (ptr.as_ptr() as usize).checked_sub(storage.as_ptr() as usize)?;
        if offset >= self.storage_len() || offset % self.slot_size as usize != 0 {
            return None;
        }
        Some((offset / self.slot_size as usize) as u32)
    }

    /// Iterate over the free slots, starting from the one that would be
    /// allocated next.
    #[inline]
    pub fn free_slots(&self) -> FreeSlots<'_> {
        FreeSlots {
            next: self.head,
            _phantom: PhantomData,
        }
    }

    /// Return `true` if `slot` is in the free list.
    ///
    /// This performs the same linear scan as [`release`](Self::release).
    pub fn is_free(&self, slot: NonNull<u8>) -> bool {
        self.free_slots().any(|free| free == slot)
    }

    /// Count the free slots.
    ///
    /// # Time Complexity
    ///
    /// This method will complete in linear time in the number of free slots.
    pub fn free_count(&self) -> u32 {
        self.free_slots().count() as u32
    }

    /// Count the allocated slots.
    ///
    /// # Time Complexity
    ///
    /// See [`Self::free_count`].
    pub fn allocated_count(&self) -> u32 {
        self.slot_number - self.free_count()
    }
}

/// An iterator over the free slots of a [`SlotPool`], created by
/// [`SlotPool::free_slots`].
pub struct FreeSlots<'a> {
    next: Link,
    _phantom: PhantomData<&'a ()>,
}

impl Iterator for FreeSlots<'_> {
    type Item = NonNull<u8>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.next?;
        // Safety: `slot` is in the free list of the pool borrowed by `self`,
        //         which can't be modified while `self` exists
        self.next = unsafe { read_link(slot) };
        Some(slot)
    }
}

impl FusedIterator for FreeSlots<'_> {}

impl fmt::Debug for FreeSlots<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FreeSlots").field("next", &self.next).finish()
    }
}
