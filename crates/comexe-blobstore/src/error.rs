use thiserror::Error;

/// Recoverable failures from the blob store and registry. Allocation
/// failure itself is not represented here; it is fatal and aborts the
/// process, matching a platform allocator that is assumed never to
/// return null.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlobStoreError {
    #[error("key {0} is invalid or stale")]
    InvalidKey(u32),
    #[error("stored value at key {0} does not match the requested type")]
    TypeMismatch(u32),
}

pub type Result<T> = std::result::Result<T, BlobStoreError>;
