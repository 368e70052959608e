//! Workflow errors.
//!
//! Every variant is fatal for the copy. Resources created before the failure
//! are left in place; [`CopyError::leaked_snapshot`] and
//! [`CopyError::leaked_image`] name them.

use std::time::Duration;

use amicopy_id::{ImageId, SnapshotId};
use amicopy_wait::WaitError;
use thiserror::Error;

use crate::provider::ProviderError;

/// Copy workflow errors.
#[derive(Debug, Error)]
pub enum CopyError {
    /// Fetching snapshot or image metadata failed.
    #[error("looking up {resource} failed: {message}")]
    ResourceLookup {
        resource: String,
        message: String,
        leftovers: Leftovers,
    },

    /// The provider rejected the snapshot copy request.
    #[error("copying snapshot {snapshot_id} failed: {message}")]
    CopyRequest {
        snapshot_id: SnapshotId,
        message: String,
    },

    /// The provider rejected the image registration request.
    #[error("registering image '{name}' failed: {message}")]
    RegistrationRequest {
        name: String,
        /// Copied snapshot left behind.
        snapshot_id: SnapshotId,
        message: String,
    },

    /// The copied snapshot reached the `error` state.
    #[error("copying the snapshot failed: the new snapshot ({snapshot_id}) is broken")]
    SnapshotCopyFailed { snapshot_id: SnapshotId },

    /// The registered image reached the `failed` state.
    #[error("creating the image failed: the new image ({image_id}) is broken")]
    ImageCreationFailed {
        image_id: ImageId,
        /// Copied snapshot left behind.
        snapshot_id: SnapshotId,
    },

    /// The source image is internally inconsistent.
    #[error("invalid source image {image_id}: {reason}")]
    InvalidSourceImage { image_id: ImageId, reason: String },

    /// A wait exceeded its deadline.
    #[error("timeout after {elapsed:?} waiting for {resource}")]
    Timeout {
        resource: String,
        elapsed: Duration,
        leftovers: Leftovers,
    },

    /// A wait was cancelled.
    #[error("cancelled while waiting for {resource}")]
    Cancelled {
        resource: String,
        leftovers: Leftovers,
    },
}

/// Resources created before a failure and left in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Leftovers {
    /// Copied snapshot, possibly still pending.
    pub snapshot_id: Option<SnapshotId>,

    /// Registered image, possibly still pending.
    pub image_id: Option<ImageId>,
}

impl Leftovers {
    /// Nothing was created yet.
    pub fn none() -> Self {
        Self::default()
    }

    /// The copied snapshot exists.
    pub fn snapshot(snapshot_id: &SnapshotId) -> Self {
        Self {
            snapshot_id: Some(snapshot_id.clone()),
            image_id: None,
        }
    }

    /// Both the copied snapshot and the registered image exist.
    pub fn image(snapshot_id: &SnapshotId, image_id: &ImageId) -> Self {
        Self {
            snapshot_id: Some(snapshot_id.clone()),
            image_id: Some(image_id.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot_id.is_none() && self.image_id.is_none()
    }
}

impl CopyError {
    /// Create a lookup error from a provider error, before anything was created.
    pub fn lookup(resource: impl Into<String>, err: ProviderError) -> Self {
        Self::ResourceLookup {
            resource: resource.into(),
            message: err.message,
            leftovers: Leftovers::none(),
        }
    }

    /// Map a wait failure on `resource`. `leftovers` names what already exists.
    pub(crate) fn from_wait(
        resource: &str,
        err: WaitError<ProviderError>,
        leftovers: Leftovers,
    ) -> Self {
        match err {
            WaitError::Fetch(err) => Self::ResourceLookup {
                resource: resource.to_string(),
                message: err.message,
                leftovers,
            },
            WaitError::Timeout { resource, elapsed } => Self::Timeout {
                resource,
                elapsed,
                leftovers,
            },
            WaitError::Cancelled { resource } => Self::Cancelled {
                resource,
                leftovers,
            },
        }
    }

    fn leftovers(&self) -> Option<&Leftovers> {
        match self {
            Self::ResourceLookup { leftovers, .. }
            | Self::Timeout { leftovers, .. }
            | Self::Cancelled { leftovers, .. } => Some(leftovers),
            _ => None,
        }
    }

    /// The copied snapshot that outlives this failure, if one was created.
    pub fn leaked_snapshot(&self) -> Option<&SnapshotId> {
        match self {
            Self::SnapshotCopyFailed { snapshot_id }
            | Self::RegistrationRequest { snapshot_id, .. }
            | Self::ImageCreationFailed { snapshot_id, .. } => Some(snapshot_id),
            other => other.leftovers()?.snapshot_id.as_ref(),
        }
    }

    /// The registered image that outlives this failure, if one was created.
    pub fn leaked_image(&self) -> Option<&ImageId> {
        match self {
            Self::ImageCreationFailed { image_id, .. } => Some(image_id),
            other => other.leftovers()?.image_id.as_ref(),
        }
    }
}
