//! This crate implements a fixed-slot memory pool: a deterministic,
//! non-fragmenting allocator that partitions a caller-supplied buffer into
//! equally-sized slots.
//!
//!  - **Allocation completes in constant time.** Deallocation is linear in the
//!    number of currently free slots because it checks for double frees.
//!
//!  - **No fragmentation, no hidden allocations.** The pool never calls a
//!    general-purpose allocator. The free list is stored inside the free
//!    slots themselves, so there is no per-slot bookkeeping overhead.
//!
//!  - **The storage is provided by an application.** A `static` array, a stack
//!    array, or a block obtained from another allocator all work. The pool
//!    only borrows it.
//!
//!  - **This crate supports `#![no_std]`.** It can be used in bare-metal and
//!    RTOS-based applications. The pool is not internally synchronized; wrap
//!    it in whatever lock suits the execution context.
//!
//! # Examples
//!
//! ```rust
//! use slotpool::{Error, SlotPool};
//! use std::mem::MaybeUninit;
//!
//! let mut storage = [MaybeUninit::uninit(); 3 * 16];
//! let mut pool: SlotPool<'_> = SlotPool::INIT;
//! pool.init(&mut storage, 16, 3).unwrap();
//!
//! let a = pool.allocate().unwrap();
//! let b = pool.allocate().unwrap();
//! let c = pool.allocate().unwrap();
//! assert_eq!(pool.allocate(), Err(Error::Space));
//!
//! unsafe {
//!     a.cast::<u64>().as_ptr().write_unaligned(42);
//!     pool.release(b).unwrap();
//!     // Releasing a slot twice is detected
//!     assert_eq!(pool.release(b), Err(Error::NotAllocated));
//! }
//!
//! // The most recently released slot is handed out first
//! assert_eq!(pool.allocate(), Ok(b));
//! # let _ = c;
//! ```
//!
//! # Configuration
//!
//! Parameter validation, zero-initialization on allocation, and internal
//! assertions are selected at compile time through a [`PoolOptions`] type
//! parameter. See [`DefaultOptions`], [`Unchecked`], [`NoZeroize`], and
//! [`Asserted`].
//!
#![no_std]

/// Evaluates an assertion only if `$opts` enables [`PoolOptions::ASSERTIONS`].
macro_rules! pool_assert {
    ($opts:ty, $($tt:tt)*) => {
        if <$opts as $crate::PoolOptions>::ASSERTIONS {
            assert!($($tt)*);
        }
    };
}

mod error;
mod options;
mod pool;
pub use self::{
    error::Error,
    options::{Asserted, DefaultOptions, NoZeroize, PoolOptions, Unchecked},
    pool::{FreeSlots, SlotPool, LINK_SIZE},
};

#[cfg(test)]
extern crate std;

#[cfg(test)]
mod tests;
