//! Snapshot copy step.

use amicopy_id::SnapshotId;
use amicopy_wait::{Terminal, Waiter};
use tracing::info;

use crate::error::{CopyError, Leftovers};
use crate::model::CopySnapshotRequest;
use crate::provider::ImageProvider;

/// Copy `source_snapshot_id` from `source_region` and wait for the copy.
///
/// The copy keeps the source snapshot's description. Any settled state other
/// than `error` counts as success.
pub async fn copy_snapshot(
    provider: &dyn ImageProvider,
    source_region: &str,
    source_snapshot_id: &SnapshotId,
    waiter: &mut Waiter,
) -> Result<SnapshotId, CopyError> {
    let source = provider
        .describe_snapshots(std::slice::from_ref(source_snapshot_id))
        .await
        .map_err(|e| CopyError::lookup(format!("snapshot {source_snapshot_id}"), e))?
        .into_iter()
        .next()
        .ok_or_else(|| CopyError::ResourceLookup {
            resource: format!("snapshot {source_snapshot_id}"),
            message: "snapshot not found".to_string(),
            leftovers: Leftovers::none(),
        })?;

    let request = CopySnapshotRequest {
        source_region: source_region.to_string(),
        source_snapshot_id: source.id.clone(),
        description: source.description.clone(),
    };

    let target_snapshot_id = provider
        .copy_snapshot(&request)
        .await
        .map_err(|e| CopyError::CopyRequest {
            snapshot_id: source.id.clone(),
            message: e.message,
        })?;

    info!(
        source_snapshot_id = %source.id,
        snapshot_id = %target_snapshot_id,
        "Snapshot copy started"
    );

    let resource = format!("snapshot {target_snapshot_id}");
    let snapshot_id = &target_snapshot_id;
    let outcome = waiter
        .wait_for_terminal(&resource, move || provider.snapshot_state(snapshot_id))
        .await
        .map_err(|e| CopyError::from_wait(&resource, e, Leftovers::snapshot(snapshot_id)))?;

    match outcome {
        Terminal::Failed(_) => Err(CopyError::SnapshotCopyFailed {
            snapshot_id: target_snapshot_id,
        }),
        Terminal::Succeeded(state) => {
            info!(snapshot_id = %target_snapshot_id, state = %state, "Snapshot copy finished");
            Ok(target_snapshot_id)
        }
    }
}
