use thiserror::Error;

/// Construction-validation errors.
///
/// These are the only recoverable failures in the crate: every clock
/// operation (advance, set, reset, stop, reads) is total over its input
/// domain. Misuse that cannot be recovered from — a non-positive ticker
/// period, a non-positive throttle interval — panics instead.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A [`ClockBuilder`](crate::ClockBuilder) was built without a nanotime
    /// or wall time source.
    #[error("no time source provided")]
    NoTimeSource,

    /// Stopwatch options carried no clock.
    #[error("no clock provided")]
    NoClock,
}
