use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("start and stop must satisfy start <= stop < 2^64 - 10*(2^32-1)")]
    OutOfRange,

    #[error("sieve size {0} KiB is outside [1, 8192]")]
    InvalidSieveSize(i32),

    #[error("thread count {0} must be >= 1")]
    InvalidThreadCount(i32),

    #[error("nth prime search would exceed the maximum sieveable value")]
    NthPrimeOutOfRange,

    #[error("failed to allocate sieve memory")]
    AllocationFailure,

    #[error("sieving was aborted")]
    Aborted,
}

pub type Result<T> = std::result::Result<T, Error>;
