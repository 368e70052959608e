//! Test support for the copy workflow.
//!
//! [`ScriptedProvider`] is an in-memory [`ImageProvider`]: it serves a fixed
//! set of images and snapshots, replays scripted state sequences for the
//! resources it creates, injects failures per operation and records every
//! call.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use amicopy_id::{ImageId, SnapshotId};
use amicopy_workflow::model::{CopySnapshotRequest, RegisterImageRequest};
use amicopy_workflow::{
    ImageProvider, ImageState, ProviderError, Snapshot, SnapshotState, SourceDevice, SourceImage,
};
use async_trait::async_trait;

/// Provider operation, used to inject failures and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    DescribeSnapshots,
    CopySnapshot,
    SnapshotState,
    DescribeImages,
    RegisterImage,
    ImageState,
}

/// A recorded provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    DescribeSnapshots(Vec<SnapshotId>),
    CopySnapshot(CopySnapshotRequest),
    SnapshotState(SnapshotId),
    DescribeImages(Vec<ImageId>),
    RegisterImage(RegisterImageRequest),
    ImageState(ImageId),
}

impl Call {
    pub fn operation(&self) -> Operation {
        match self {
            Self::DescribeSnapshots(_) => Operation::DescribeSnapshots,
            Self::CopySnapshot(_) => Operation::CopySnapshot,
            Self::SnapshotState(_) => Operation::SnapshotState,
            Self::DescribeImages(_) => Operation::DescribeImages,
            Self::RegisterImage(_) => Operation::RegisterImage,
            Self::ImageState(_) => Operation::ImageState,
        }
    }
}

/// State sequence replayed by successive lookups; the last state repeats.
#[derive(Debug)]
struct Script<S>(VecDeque<S>);

impl<S: Clone> Script<S> {
    fn next(&mut self) -> Option<S> {
        if self.0.len() > 1 {
            self.0.pop_front()
        } else {
            self.0.front().cloned()
        }
    }
}

#[derive(Debug, Default)]
struct State {
    images: BTreeMap<ImageId, SourceImage>,
    snapshots: BTreeMap<SnapshotId, Snapshot>,
    pending_copies: VecDeque<(SnapshotId, Vec<SnapshotState>)>,
    pending_registrations: VecDeque<(ImageId, Vec<ImageState>)>,
    snapshot_scripts: BTreeMap<SnapshotId, Script<SnapshotState>>,
    image_scripts: BTreeMap<ImageId, Script<ImageState>>,
    failures: HashMap<Operation, ProviderError>,
    calls: Vec<Call>,
}

/// In-memory provider with scripted behavior.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    state: Mutex<State>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `image` from image lookups.
    pub fn with_image(self, image: SourceImage) -> Self {
        self.lock().images.insert(image.id.clone(), image);
        self
    }

    /// Serve `snapshot` from snapshot lookups.
    pub fn with_snapshot(self, snapshot: Snapshot) -> Self {
        self.lock().snapshots.insert(snapshot.id.clone(), snapshot);
        self
    }

    /// The next snapshot copy returns `id`, whose state lookups replay `states`.
    pub fn on_copy_snapshot(
        self,
        id: SnapshotId,
        states: impl IntoIterator<Item = SnapshotState>,
    ) -> Self {
        self.lock()
            .pending_copies
            .push_back((id, states.into_iter().collect()));
        self
    }

    /// The next registration returns `id`, whose state lookups replay `states`.
    pub fn on_register_image(
        self,
        id: ImageId,
        states: impl IntoIterator<Item = ImageState>,
    ) -> Self {
        self.lock()
            .pending_registrations
            .push_back((id, states.into_iter().collect()));
        self
    }

    /// Every call of `operation` fails with `error`.
    pub fn failing(self, operation: Operation, error: ProviderError) -> Self {
        self.lock().failures.insert(operation, error);
        self
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Number of calls of `operation` made so far.
    pub fn count(&self, operation: Operation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record `call` and return the injected failure for its operation, if any.
    fn record(&self, call: Call) -> Result<MutexGuard<'_, State>, ProviderError> {
        let mut state = self.lock();
        let operation = call.operation();
        state.calls.push(call);
        if let Some(error) = state.failures.get(&operation).cloned() {
            return Err(error);
        }
        Ok(state)
    }
}

#[async_trait]
impl ImageProvider for ScriptedProvider {
    async fn describe_snapshots(&self, ids: &[SnapshotId]) -> Result<Vec<Snapshot>, ProviderError> {
        let state = self.record(Call::DescribeSnapshots(ids.to_vec()))?;
        Ok(ids
            .iter()
            .filter_map(|id| state.snapshots.get(id).cloned())
            .collect())
    }

    async fn copy_snapshot(
        &self,
        request: &CopySnapshotRequest,
    ) -> Result<SnapshotId, ProviderError> {
        let mut state = self.record(Call::CopySnapshot(request.clone()))?;
        let (id, states) = state
            .pending_copies
            .pop_front()
            .ok_or_else(|| ProviderError::new("no scripted snapshot copy"))?;
        state
            .snapshot_scripts
            .insert(id.clone(), Script(states.into()));
        Ok(id)
    }

    async fn snapshot_state(&self, id: &SnapshotId) -> Result<SnapshotState, ProviderError> {
        let mut state = self.record(Call::SnapshotState(id.clone()))?;
        if let Some(next) = state.snapshot_scripts.get_mut(id).and_then(Script::next) {
            return Ok(next);
        }
        state
            .snapshots
            .get(id)
            .map(|snapshot| snapshot.state.clone())
            .ok_or_else(|| {
                ProviderError::with_code(
                    "InvalidSnapshot.NotFound",
                    format!("The snapshot '{id}' does not exist."),
                )
            })
    }

    async fn describe_images(&self, ids: &[ImageId]) -> Result<Vec<SourceImage>, ProviderError> {
        let state = self.record(Call::DescribeImages(ids.to_vec()))?;
        Ok(ids
            .iter()
            .filter_map(|id| state.images.get(id).cloned())
            .collect())
    }

    async fn register_image(
        &self,
        request: &RegisterImageRequest,
    ) -> Result<ImageId, ProviderError> {
        let mut state = self.record(Call::RegisterImage(request.clone()))?;
        let (id, states) = state
            .pending_registrations
            .pop_front()
            .ok_or_else(|| ProviderError::new("no scripted image registration"))?;
        state.image_scripts.insert(id.clone(), Script(states.into()));
        Ok(id)
    }

    async fn image_state(&self, id: &ImageId) -> Result<ImageState, ProviderError> {
        let mut state = self.record(Call::ImageState(id.clone()))?;
        state
            .image_scripts
            .get_mut(id)
            .and_then(Script::next)
            .ok_or_else(|| {
                ProviderError::with_code(
                    "InvalidAMIID.NotFound",
                    format!("The image id '[{id}]' does not exist"),
                )
            })
    }
}

/// Fixtures shared by workflow and CLI tests.
pub mod fixtures {
    use super::*;

    pub fn image_id(s: &str) -> ImageId {
        s.parse().expect("valid image id")
    }

    pub fn snapshot_id(s: &str) -> SnapshotId {
        s.parse().expect("valid snapshot id")
    }

    /// HVM image `ami-0001` whose root `/dev/sda1` is backed by `snap-0001`.
    pub fn source_image() -> SourceImage {
        let mut block_device_mappings = BTreeMap::new();
        block_device_mappings.insert(
            "/dev/sda1".to_string(),
            SourceDevice {
                snapshot_id: Some(snapshot_id("snap-0001")),
                delete_on_termination: true,
            },
        );
        SourceImage {
            id: image_id("ami-0001"),
            name: "ubuntu-base".to_string(),
            architecture: "x86_64".to_string(),
            kernel_id: None,
            ramdisk_id: None,
            root_device_name: "/dev/sda1".to_string(),
            virtualization_type: "hvm".to_string(),
            sriov_net_support: None,
            block_device_mappings,
        }
    }

    /// Completed snapshot `snap-0001` backing [`source_image`].
    pub fn source_snapshot() -> Snapshot {
        Snapshot {
            id: snapshot_id("snap-0001"),
            state: SnapshotState::Completed,
            description: Some("Root volume of ubuntu-base".to_string()),
        }
    }
}
