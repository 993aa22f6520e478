/// Compile-time options of [`SlotPool`](crate::SlotPool).
pub trait PoolOptions {
    /// Validate the parameters of the unchecked entry points and report
    /// [`Error::Parameters`](crate::Error::Parameters).
    ///
    /// The safe initializers always validate what is needed for memory
    /// safety regardless of this option.
    const CHECK_PARAMS: bool = true;

    /// Clear the whole slot to zero on allocation (`calloc` semantics). The
    /// free-list link at the start of the slot is cleared either way.
    const ZEROIZE: bool = true;

    /// Panic on caller-contract violations (invalid parameters, double
    /// release, foreign slot addresses) in addition to reporting them.
    ///
    /// Running out of free slots is an expected condition and never panics.
    const ASSERTIONS: bool = false;
}

/// Parameter validation and zeroing enabled, assertions disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DefaultOptions;

impl PoolOptions for DefaultOptions {}

/// Skips parameter validation in the unchecked entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Unchecked;

impl PoolOptions for Unchecked {
    const CHECK_PARAMS: bool = false;
}

/// Hands out slots without clearing their payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NoZeroize;

impl PoolOptions for NoZeroize {
    const ZEROIZE: bool = false;
}

/// [`DefaultOptions`] with assertions enabled, for development builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Asserted;

impl PoolOptions for Asserted {
    const ASSERTIONS: bool = true;
}
