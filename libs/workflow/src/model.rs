//! Resource descriptors exchanged with the provider.

use std::collections::BTreeMap;
use std::fmt;

use amicopy_id::{ImageId, SnapshotId};
use amicopy_wait::LifecycleState;
use serde::Serialize;

/// A device entry of the source image's block device mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDevice {
    /// Snapshot backing the device, absent for ephemeral devices.
    pub snapshot_id: Option<SnapshotId>,

    /// Whether the volume is deleted when the instance terminates.
    pub delete_on_termination: bool,
}

/// Image to copy, fetched once at the start of the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceImage {
    pub id: ImageId,
    pub name: String,
    pub architecture: String,
    pub kernel_id: Option<String>,
    pub ramdisk_id: Option<String>,
    pub root_device_name: String,
    pub virtualization_type: String,

    /// Enhanced networking setting, carried verbatim.
    pub sriov_net_support: Option<String>,

    /// Device name to device.
    pub block_device_mappings: BTreeMap<String, SourceDevice>,
}

impl SourceImage {
    /// The mapping entry for the declared root device, if present.
    pub fn root_device(&self) -> Option<&SourceDevice> {
        self.block_device_mappings.get(&self.root_device_name)
    }
}

/// Snapshot lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum SnapshotState {
    Pending,
    Completed,
    Error,
    /// Any other provider state; treated as settled.
    Other(String),
}

impl SnapshotState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for SnapshotState {
    fn from(s: &str) -> Self {
        match s {
            "pending" => Self::Pending,
            "completed" => Self::Completed,
            "error" => Self::Error,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<SnapshotState> for String {
    fn from(state: SnapshotState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for SnapshotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LifecycleState for SnapshotState {
    fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    fn is_failed(&self) -> bool {
        matches!(self, Self::Error)
    }
}

/// Snapshot metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub state: SnapshotState,
    pub description: Option<String>,
}

/// Image lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum ImageState {
    Pending,
    Available,
    Failed,
    /// Any other provider state; treated as settled.
    Other(String),
}

impl ImageState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Available => "available",
            Self::Failed => "failed",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for ImageState {
    fn from(s: &str) -> Self {
        match s {
            "pending" => Self::Pending,
            "available" => Self::Available,
            "failed" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<ImageState> for String {
    fn from(state: ImageState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for ImageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LifecycleState for ImageState {
    fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// EBS-style persistent volume attached at launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeSpec {
    pub snapshot_id: SnapshotId,
    pub size_gb: i32,
    pub volume_type: String,
    pub delete_on_termination: bool,
}

/// What a device name maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceSpec {
    Volume(VolumeSpec),
    Ephemeral { virtual_name: String },
}

/// One entry of a block device map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockDevice {
    pub device_name: String,
    pub spec: DeviceSpec,
}

/// Ordered mapping from device name to device spec.
///
/// Device names are unique; entries keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BlockDeviceMap {
    entries: Vec<BlockDevice>,
}

impl BlockDeviceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry. Returns false, leaving the map unchanged, if the
    /// device name is already mapped.
    pub fn insert(&mut self, device_name: impl Into<String>, spec: DeviceSpec) -> bool {
        let device_name = device_name.into();
        if self.get(&device_name).is_some() {
            return false;
        }
        self.entries.push(BlockDevice { device_name, spec });
        true
    }

    pub fn get(&self, device_name: &str) -> Option<&DeviceSpec> {
        self.entries
            .iter()
            .find(|entry| entry.device_name == device_name)
            .map(|entry| &entry.spec)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockDevice> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a BlockDeviceMap {
    type Item = &'a BlockDevice;
    type IntoIter = std::slice::Iter<'a, BlockDevice>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Cross-region snapshot copy request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopySnapshotRequest {
    pub source_region: String,
    pub source_snapshot_id: SnapshotId,
    pub description: Option<String>,
}

/// Image registration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterImageRequest {
    pub name: String,
    pub architecture: String,
    pub kernel_id: Option<String>,
    pub ramdisk_id: Option<String>,
    pub root_device_name: String,
    pub block_device_map: BlockDeviceMap,
    pub virtualization_type: String,
    pub sriov_net_support: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_state_parsing() {
        assert_eq!(SnapshotState::from("pending"), SnapshotState::Pending);
        assert_eq!(SnapshotState::from("completed"), SnapshotState::Completed);
        assert_eq!(SnapshotState::from("error"), SnapshotState::Error);
        assert_eq!(
            SnapshotState::from("recoverable"),
            SnapshotState::Other("recoverable".to_string())
        );
    }

    #[test]
    fn test_other_states_are_settled_successes() {
        let snapshot = SnapshotState::from("recovering");
        assert!(!snapshot.is_pending());
        assert!(!snapshot.is_failed());

        let image = ImageState::from("deregistered");
        assert!(!image.is_pending());
        assert!(!image.is_failed());
    }

    #[test]
    fn test_image_state_display() {
        assert_eq!(ImageState::Available.to_string(), "available");
        assert_eq!(ImageState::from("failed"), ImageState::Failed);
    }

    #[test]
    fn test_block_device_map_rejects_duplicate_names() {
        let mut map = BlockDeviceMap::new();
        assert!(map.insert(
            "/dev/sdb",
            DeviceSpec::Ephemeral {
                virtual_name: "ephemeral0".to_string()
            }
        ));
        assert!(!map.insert(
            "/dev/sdb",
            DeviceSpec::Ephemeral {
                virtual_name: "ephemeral1".to_string()
            }
        ));
        assert_eq!(map.len(), 1);
        assert_eq!(
            map.get("/dev/sdb"),
            Some(&DeviceSpec::Ephemeral {
                virtual_name: "ephemeral0".to_string()
            })
        );
    }

    #[test]
    fn test_device_spec_json_shape() {
        let spec = DeviceSpec::Ephemeral {
            virtual_name: "ephemeral0".to_string(),
        };
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "kind": "ephemeral", "virtual_name": "ephemeral0" })
        );
    }
}
