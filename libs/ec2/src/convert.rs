//! Conversions between EC2 API shapes and workflow models.

use std::collections::BTreeMap;
use std::str::FromStr;

use amicopy_workflow::{
    BlockDeviceMap, DeviceSpec, ImageState, ProviderError, Snapshot, SnapshotState, SourceDevice,
    SourceImage,
};
use aws_sdk_ec2::types as ec2;

/// Parse an ID returned by the API.
pub(crate) fn parse_id<T>(raw: Option<&str>, kind: &str) -> Result<T, ProviderError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = raw.ok_or_else(|| ProviderError::new(format!("response is missing the {kind} id")))?;
    raw.parse()
        .map_err(|e| ProviderError::new(format!("invalid {kind} id '{raw}' in response: {e}")))
}

/// Snapshot state; a missing state is treated as still pending.
pub(crate) fn snapshot_state(state: Option<&ec2::SnapshotState>) -> SnapshotState {
    state
        .map(|s| SnapshotState::from(s.as_str()))
        .unwrap_or(SnapshotState::Pending)
}

/// Image state; a missing state is treated as still pending.
pub(crate) fn image_state(state: Option<&ec2::ImageState>) -> ImageState {
    state
        .map(|s| ImageState::from(s.as_str()))
        .unwrap_or(ImageState::Pending)
}

pub(crate) fn snapshot(snapshot: &ec2::Snapshot) -> Result<Snapshot, ProviderError> {
    Ok(Snapshot {
        id: parse_id(snapshot.snapshot_id(), "snapshot")?,
        state: snapshot_state(snapshot.state()),
        description: snapshot.description().map(str::to_string),
    })
}

pub(crate) fn source_image(image: &ec2::Image) -> Result<SourceImage, ProviderError> {
    let mut block_device_mappings = BTreeMap::new();
    for mapping in image.block_device_mappings() {
        let Some(device_name) = mapping.device_name() else {
            continue;
        };
        let ebs = mapping.ebs();
        let snapshot_id = match ebs.and_then(|ebs| ebs.snapshot_id()) {
            Some(raw) => Some(parse_id(Some(raw), "snapshot")?),
            None => None,
        };
        block_device_mappings.insert(
            device_name.to_string(),
            SourceDevice {
                snapshot_id,
                delete_on_termination: ebs
                    .and_then(|ebs| ebs.delete_on_termination())
                    .unwrap_or(false),
            },
        );
    }

    Ok(SourceImage {
        id: parse_id(image.image_id(), "image")?,
        name: image.name().unwrap_or_default().to_string(),
        architecture: image
            .architecture()
            .map(|a| a.as_str().to_string())
            .unwrap_or_default(),
        kernel_id: image.kernel_id().map(str::to_string),
        ramdisk_id: image.ramdisk_id().map(str::to_string),
        root_device_name: image.root_device_name().unwrap_or_default().to_string(),
        virtualization_type: image
            .virtualization_type()
            .map(|v| v.as_str().to_string())
            .unwrap_or_default(),
        sriov_net_support: image.sriov_net_support().map(str::to_string),
        block_device_mappings,
    })
}

pub(crate) fn block_device_mappings(map: &BlockDeviceMap) -> Vec<ec2::BlockDeviceMapping> {
    map.iter()
        .map(|device| {
            let builder = ec2::BlockDeviceMapping::builder().device_name(&device.device_name);
            match &device.spec {
                DeviceSpec::Volume(volume) => builder
                    .ebs(
                        ec2::EbsBlockDevice::builder()
                            .snapshot_id(volume.snapshot_id.as_str())
                            .volume_size(volume.size_gb)
                            .volume_type(ec2::VolumeType::from(volume.volume_type.as_str()))
                            .delete_on_termination(volume.delete_on_termination)
                            .build(),
                    )
                    .build(),
                DeviceSpec::Ephemeral { virtual_name } => {
                    builder.virtual_name(virtual_name).build()
                }
            }
        })
        .collect()
}
