//! Block device map synthesis for the copied image.
//!
//! The new map standardizes storage instead of copying it:
//! - The root volume is 10 GB of general purpose SSD (`gp2`) backed by the
//!   copied snapshot. Only the source's delete-on-termination flag is kept.
//! - Four ephemeral slots `/dev/sdb`..`/dev/sde` are always declared. Slots
//!   the instance type does not offer are ignored at launch.

use amicopy_id::SnapshotId;

use crate::error::CopyError;
use crate::model::{BlockDeviceMap, DeviceSpec, SourceImage, VolumeSpec};

/// Root volume size in GB.
pub const ROOT_VOLUME_SIZE_GB: i32 = 10;

/// Root volume type.
pub const ROOT_VOLUME_TYPE: &str = "gp2";

/// Number of ephemeral slots declared.
pub const EPHEMERAL_SLOTS: u8 = 4;

/// Build the block device map for the new image.
pub fn build_block_device_map(
    source_image: &SourceImage,
    target_snapshot_id: &SnapshotId,
) -> Result<BlockDeviceMap, CopyError> {
    let root_device_name = &source_image.root_device_name;
    let root = source_image
        .root_device()
        .ok_or_else(|| CopyError::InvalidSourceImage {
            image_id: source_image.id.clone(),
            reason: format!("no block device mapping for root device {root_device_name}"),
        })?;

    let mut map = BlockDeviceMap::new();
    map.insert(
        root_device_name.clone(),
        DeviceSpec::Volume(VolumeSpec {
            snapshot_id: target_snapshot_id.clone(),
            size_gb: ROOT_VOLUME_SIZE_GB,
            volume_type: ROOT_VOLUME_TYPE.to_string(),
            delete_on_termination: root.delete_on_termination,
        }),
    );

    for slot in 0..EPHEMERAL_SLOTS {
        // A slot that collides with the root device keeps the root entry.
        map.insert(
            ephemeral_device_name(slot),
            DeviceSpec::Ephemeral {
                virtual_name: format!("ephemeral{slot}"),
            },
        );
    }

    Ok(map)
}

/// `/dev/sdb` for slot 0, `/dev/sdc` for slot 1, and so on.
fn ephemeral_device_name(slot: u8) -> String {
    format!("/dev/sd{}", char::from(b'b' + slot))
}
