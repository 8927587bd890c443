use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{device}: node count mismatch, expected {expected} got {actual}")]
    NodeMismatch { device: String, expected: usize, actual: usize },

    #[error(transparent)]
    Engine(#[from] engine_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
