//! Cloud provider interface.
//!
//! The workflow talks to the provider only through [`ImageProvider`]:
//! - Snapshot lookup, copy and state polling
//! - Image lookup, registration and state polling
//!
//! The EC2-backed implementation lives in `amicopy-ec2`; a scripted one for
//! tests lives in `amicopy-testing`.

use amicopy_id::{ImageId, SnapshotId};
use async_trait::async_trait;
use thiserror::Error;

use crate::model::{
    CopySnapshotRequest, ImageState, RegisterImageRequest, Snapshot, SnapshotState, SourceImage,
};

/// Error reported by the provider for a single call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderError {
    /// Provider error code (e.g. `UnauthorizedOperation`), if any.
    pub code: Option<String>,

    /// Human-readable message supplied by the provider.
    pub message: String,
}

impl ProviderError {
    /// Create an error without a code.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// Create an error with a provider error code.
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

/// Provider calls used by the copy workflow.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Look up snapshots by id.
    async fn describe_snapshots(&self, ids: &[SnapshotId]) -> Result<Vec<Snapshot>, ProviderError>;

    /// Start copying a snapshot from `source_region` into the provider's region.
    async fn copy_snapshot(&self, request: &CopySnapshotRequest)
        -> Result<SnapshotId, ProviderError>;

    /// Current state of a snapshot.
    async fn snapshot_state(&self, id: &SnapshotId) -> Result<SnapshotState, ProviderError>;

    /// Look up images by id.
    async fn describe_images(&self, ids: &[ImageId]) -> Result<Vec<SourceImage>, ProviderError>;

    /// Register a new image.
    async fn register_image(&self, request: &RegisterImageRequest)
        -> Result<ImageId, ProviderError>;

    /// Current state of an image.
    async fn image_state(&self, id: &ImageId) -> Result<ImageState, ProviderError>;
}
