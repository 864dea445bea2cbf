mod fs;

pub use fs::FsStore;

use crate::error::Result;

/// Byte-blob gateway to the object store.
///
/// The pipeline only ever loads a named blob or persists one; listing,
/// deletion and credentials are the concern of whatever sits behind this
/// trait. Implementations must surface failures immediately; the pipeline
/// has no retry policy.
pub trait ObjectStore {
    /// Fetches the blob stored under `key`.
    ///
    /// # Errors
    /// `PipelineErr::Store` if the blob is missing or unreadable.
    fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Persists `bytes` under `key`, replacing any previous blob.
    ///
    /// # Errors
    /// `PipelineErr::Store` if the blob cannot be written.
    fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;
}
