/// The error type of [`SlotPool`](crate::SlotPool) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum Error {
    /// The arguments were invalid: null storage, zero slot size or count, a
    /// slot smaller than [`LINK_SIZE`](crate::LINK_SIZE), too small storage,
    /// or an uninitialized pool.
    #[error("invalid memory pool parameters")]
    Parameters,
    /// All slots are currently allocated.
    #[error("no free slot is available")]
    Space,
    /// The slot being released is already in the free list.
    #[error("slot was not allocated")]
    NotAllocated,
}
