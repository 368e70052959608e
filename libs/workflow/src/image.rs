//! Image registration step.

use amicopy_id::{ImageId, SnapshotId};
use amicopy_wait::{Terminal, Waiter};
use tracing::info;

use crate::error::{CopyError, Leftovers};
use crate::model::{BlockDeviceMap, RegisterImageRequest, SourceImage};
use crate::provider::ImageProvider;

/// Register a copy of `source_image` backed by `device_map` and wait for it.
///
/// `snapshot_id` is the copied root snapshot; it is only used to report what
/// a failure leaves behind.
pub async fn create_image(
    provider: &dyn ImageProvider,
    source_image: &SourceImage,
    device_map: BlockDeviceMap,
    sriov_net_support: Option<String>,
    snapshot_id: &SnapshotId,
    waiter: &mut Waiter,
) -> Result<ImageId, CopyError> {
    let request = RegisterImageRequest {
        name: source_image.name.clone(),
        architecture: source_image.architecture.clone(),
        kernel_id: source_image.kernel_id.clone(),
        ramdisk_id: source_image.ramdisk_id.clone(),
        root_device_name: source_image.root_device_name.clone(),
        block_device_map: device_map,
        virtualization_type: source_image.virtualization_type.clone(),
        sriov_net_support,
    };

    let target_image_id = provider
        .register_image(&request)
        .await
        .map_err(|e| CopyError::RegistrationRequest {
            name: request.name.clone(),
            snapshot_id: snapshot_id.clone(),
            message: e.message,
        })?;

    info!(image_id = %target_image_id, name = %request.name, "Image registration started");

    let resource = format!("image {target_image_id}");
    let image_id = &target_image_id;
    let outcome = waiter
        .wait_for_terminal(&resource, move || provider.image_state(image_id))
        .await
        .map_err(|e| {
            CopyError::from_wait(&resource, e, Leftovers::image(snapshot_id, image_id))
        })?;

    match outcome {
        Terminal::Failed(_) => Err(CopyError::ImageCreationFailed {
            image_id: target_image_id,
            snapshot_id: snapshot_id.clone(),
        }),
        Terminal::Succeeded(state) => {
            info!(image_id = %target_image_id, state = %state, "Image registration finished");
            Ok(target_image_id)
        }
    }
}
