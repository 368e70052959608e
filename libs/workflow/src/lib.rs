//! # amicopy-workflow
//!
//! Copies a machine image by copying its root snapshot and registering a new
//! image on top of the copy.
//!
//! ```text
//! describe source image
//!   └── copy root snapshot ──(poll until settled)──┐
//!                                                   ▼
//!        resolve networking flag, build device map
//!                                                   │
//!   register image ──(poll until settled)──► new image id
//! ```
//!
//! Each step starts only after the previous one reached a terminal state.
//! Errors are returned, never acted on; the caller decides how to exit.

pub mod device_map;
pub mod error;
pub mod image;
pub mod model;
pub mod networking;
pub mod provider;
pub mod snapshot;

use amicopy_id::{ImageId, SnapshotId};
use amicopy_wait::Waiter;
use serde::Serialize;
use tracing::info;

pub use device_map::build_block_device_map;
pub use error::{CopyError, Leftovers};
pub use image::create_image;
pub use model::{
    BlockDevice, BlockDeviceMap, DeviceSpec, ImageState, Snapshot, SnapshotState, SourceDevice,
    SourceImage, VolumeSpec,
};
pub use networking::resolve_sriov_net_support;
pub use provider::{ImageProvider, ProviderError};
pub use snapshot::copy_snapshot;

/// What to copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyImageRequest {
    /// Region holding the source image; the copy lands in the provider's region.
    pub region: String,

    pub source_image_id: ImageId,

    /// Force SR-IOV `simple` on the new image.
    pub force_enhanced_networking: bool,
}

/// Result of a completed copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyReport {
    pub source_image_id: ImageId,
    pub source_snapshot_id: SnapshotId,
    pub target_snapshot_id: SnapshotId,
    pub block_device_map: BlockDeviceMap,
    pub sriov_net_support: Option<String>,
    pub target_image_id: ImageId,
}

/// Run the whole copy.
pub async fn copy_image(
    provider: &dyn ImageProvider,
    request: &CopyImageRequest,
    waiter: &mut Waiter,
) -> Result<CopyReport, CopyError> {
    let image_id = &request.source_image_id;
    let source_image = provider
        .describe_images(std::slice::from_ref(image_id))
        .await
        .map_err(|e| CopyError::lookup(format!("image {image_id}"), e))?
        .into_iter()
        .next()
        .ok_or_else(|| CopyError::ResourceLookup {
            resource: format!("image {image_id}"),
            message: "image not found".to_string(),
            leftovers: Leftovers::none(),
        })?;

    info!(
        image_id = %source_image.id,
        name = %source_image.name,
        root_device = %source_image.root_device_name,
        "Copying image"
    );

    let source_snapshot_id = source_image
        .root_device()
        .and_then(|root| root.snapshot_id.clone())
        .ok_or_else(|| CopyError::InvalidSourceImage {
            image_id: source_image.id.clone(),
            reason: format!(
                "root device {} is not backed by a snapshot",
                source_image.root_device_name
            ),
        })?;

    let target_snapshot_id =
        copy_snapshot(provider, &request.region, &source_snapshot_id, waiter).await?;

    let sriov_net_support = resolve_sriov_net_support(
        request.force_enhanced_networking,
        source_image.sriov_net_support.as_deref(),
    );

    let block_device_map = build_block_device_map(&source_image, &target_snapshot_id)?;

    let target_image_id = create_image(
        provider,
        &source_image,
        block_device_map.clone(),
        sriov_net_support.clone(),
        &target_snapshot_id,
        waiter,
    )
    .await?;

    info!(image_id = %target_image_id, "The new image is available");

    Ok(CopyReport {
        source_image_id: source_image.id,
        source_snapshot_id,
        target_snapshot_id,
        block_device_map,
        sriov_net_support,
        target_image_id,
    })
}
