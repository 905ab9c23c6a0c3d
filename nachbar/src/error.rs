use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(
        "working capacity of {required} neighbours exceeds the {available} other items in the store"
    )]
    InsufficientPool { required: usize, available: usize },
    #[error("index has uncompiled mutations, call compile() before querying")]
    NotCompiled,
    #[error("k must be at least 1")]
    InvalidK,
    #[error("convergence threshold {0} must lie in (0, 1]")]
    InvalidDelta(f64),
    #[error("compiled row holds {compiled} entries but exact search returned {exact}")]
    LengthMismatch { compiled: usize, exact: usize },
}
