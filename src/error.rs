use thiserror::Error;

/// Errors reported by [`Tree`](crate::Tree) mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// The key being inserted is already present in the tree.
    #[error("key is already present in the tree")]
    DuplicateKey,
}

pub type Result<T> = std::result::Result<T, Error>;
