//! Integration tests for the copy workflow.
//!
//! These tests drive the full sequence against a scripted provider:
//! 1. Source image and snapshot lookup
//! 2. Snapshot copy and polling
//! 3. Device map synthesis and image registration
//!
//! Time is paused so poll intervals elapse instantly.

use std::time::Duration;

use amicopy_testing::fixtures::{image_id, snapshot_id, source_image, source_snapshot};
use amicopy_testing::{Call, Operation, ScriptedProvider};
use amicopy_wait::{WaitConfig, Waiter};
use amicopy_workflow::{
    copy_image, copy_snapshot, CopyError, CopyImageRequest, DeviceSpec, ImageState,
    ProviderError, SnapshotState, VolumeSpec,
};
use tokio::sync::watch;

fn request(force_enhanced_networking: bool) -> CopyImageRequest {
    CopyImageRequest {
        region: "us-east-1".to_string(),
        source_image_id: image_id("ami-0001"),
        force_enhanced_networking,
    }
}

fn waiter() -> Waiter {
    Waiter::without_cancellation(WaitConfig::default())
}

/// Provider where every step succeeds after a short pending phase.
fn happy_provider() -> ScriptedProvider {
    ScriptedProvider::new()
        .with_image(source_image())
        .with_snapshot(source_snapshot())
        .on_copy_snapshot(
            snapshot_id("snap-0002"),
            [
                SnapshotState::Pending,
                SnapshotState::Pending,
                SnapshotState::Completed,
            ],
        )
        .on_register_image(
            image_id("ami-0002"),
            [ImageState::Pending, ImageState::Available],
        )
}

#[tokio::test(start_paused = true)]
async fn test_copy_image_end_to_end() {
    let provider = happy_provider();

    let report = copy_image(&provider, &request(false), &mut waiter())
        .await
        .unwrap();

    assert_eq!(report.source_image_id, image_id("ami-0001"));
    assert_eq!(report.source_snapshot_id, snapshot_id("snap-0001"));
    assert_eq!(report.target_snapshot_id, snapshot_id("snap-0002"));
    assert_eq!(report.target_image_id, image_id("ami-0002"));
    assert_eq!(report.sriov_net_support, None);

    assert_eq!(report.block_device_map.len(), 5);
    assert_eq!(
        report.block_device_map.get("/dev/sda1"),
        Some(&DeviceSpec::Volume(VolumeSpec {
            snapshot_id: snapshot_id("snap-0002"),
            size_gb: 10,
            volume_type: "gp2".to_string(),
            delete_on_termination: true,
        }))
    );
    for (slot, name) in ["/dev/sdb", "/dev/sdc", "/dev/sdd", "/dev/sde"]
        .iter()
        .enumerate()
    {
        assert_eq!(
            report.block_device_map.get(name),
            Some(&DeviceSpec::Ephemeral {
                virtual_name: format!("ephemeral{slot}")
            })
        );
    }

    // Three snapshot lookups for [pending, pending, completed]
    assert_eq!(provider.count(Operation::SnapshotState), 3);
    assert_eq!(provider.count(Operation::ImageState), 2);
}

#[tokio::test(start_paused = true)]
async fn test_steps_run_in_order_with_propagated_fields() {
    let provider = happy_provider();

    copy_image(&provider, &request(false), &mut waiter())
        .await
        .unwrap();

    let operations: Vec<_> = provider.calls().iter().map(Call::operation).collect();
    assert_eq!(
        operations,
        [
            Operation::DescribeImages,
            Operation::DescribeSnapshots,
            Operation::CopySnapshot,
            Operation::SnapshotState,
            Operation::SnapshotState,
            Operation::SnapshotState,
            Operation::RegisterImage,
            Operation::ImageState,
            Operation::ImageState,
        ]
    );

    let calls = provider.calls();
    let Some(Call::CopySnapshot(copy)) = calls
        .iter()
        .find(|c| c.operation() == Operation::CopySnapshot)
    else {
        panic!("no copy call recorded");
    };
    assert_eq!(copy.source_region, "us-east-1");
    assert_eq!(copy.source_snapshot_id, snapshot_id("snap-0001"));
    assert_eq!(
        copy.description.as_deref(),
        Some("Root volume of ubuntu-base")
    );

    let Some(Call::RegisterImage(register)) = calls
        .iter()
        .find(|c| c.operation() == Operation::RegisterImage)
    else {
        panic!("no register call recorded");
    };
    let source = source_image();
    assert_eq!(register.name, source.name);
    assert_eq!(register.architecture, source.architecture);
    assert_eq!(register.root_device_name, source.root_device_name);
    assert_eq!(register.virtualization_type, source.virtualization_type);
    assert_eq!(register.sriov_net_support, None);
    assert_eq!(register.block_device_map.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_force_enhanced_networking_registers_simple() {
    let provider = happy_provider();

    let report = copy_image(&provider, &request(true), &mut waiter())
        .await
        .unwrap();

    assert_eq!(report.sriov_net_support.as_deref(), Some("simple"));
    let registered = provider.calls().into_iter().find_map(|call| match call {
        Call::RegisterImage(request) => Some(request),
        _ => None,
    });
    assert_eq!(
        registered.unwrap().sriov_net_support.as_deref(),
        Some("simple")
    );
}

#[tokio::test(start_paused = true)]
async fn test_copy_request_rejected_skips_registration() {
    let provider = happy_provider().failing(
        Operation::CopySnapshot,
        ProviderError::with_code(
            "UnauthorizedOperation",
            "You are not authorized to perform this operation.",
        ),
    );

    let err = copy_image(&provider, &request(false), &mut waiter())
        .await
        .unwrap_err();

    match err {
        CopyError::CopyRequest {
            snapshot_id: id,
            message,
        } => {
            assert_eq!(id, snapshot_id("snap-0001"));
            assert!(message.contains("not authorized"));
        }
        other => panic!("expected CopyRequest, got {other:?}"),
    }
    assert_eq!(provider.count(Operation::SnapshotState), 0);
    assert_eq!(provider.count(Operation::RegisterImage), 0);
}

#[tokio::test(start_paused = true)]
async fn test_broken_snapshot_copy_is_fatal() {
    let provider = ScriptedProvider::new()
        .with_image(source_image())
        .with_snapshot(source_snapshot())
        .on_copy_snapshot(
            snapshot_id("snap-0002"),
            [SnapshotState::Pending, SnapshotState::Error],
        );

    let err = copy_image(&provider, &request(false), &mut waiter())
        .await
        .unwrap_err();

    assert!(matches!(
        &err,
        CopyError::SnapshotCopyFailed { snapshot_id: id } if *id == snapshot_id("snap-0002")
    ));
    assert_eq!(err.leaked_snapshot(), Some(&snapshot_id("snap-0002")));
    assert_eq!(provider.count(Operation::SnapshotState), 2);
    assert_eq!(provider.count(Operation::RegisterImage), 0);
}

#[tokio::test(start_paused = true)]
async fn test_registration_rejected_reports_leaked_snapshot() {
    let provider = happy_provider().failing(
        Operation::RegisterImage,
        ProviderError::new("AMI name 'ubuntu-base' is already in use"),
    );

    let err = copy_image(&provider, &request(false), &mut waiter())
        .await
        .unwrap_err();

    assert!(matches!(err, CopyError::RegistrationRequest { .. }));
    assert_eq!(err.leaked_snapshot(), Some(&snapshot_id("snap-0002")));
    assert_eq!(provider.count(Operation::ImageState), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_image_is_fatal() {
    let provider = ScriptedProvider::new()
        .with_image(source_image())
        .with_snapshot(source_snapshot())
        .on_copy_snapshot(snapshot_id("snap-0002"), [SnapshotState::Completed])
        .on_register_image(
            image_id("ami-0002"),
            [ImageState::Pending, ImageState::Failed],
        );

    let err = copy_image(&provider, &request(false), &mut waiter())
        .await
        .unwrap_err();

    match err {
        CopyError::ImageCreationFailed {
            image_id: id,
            snapshot_id: snap,
        } => {
            assert_eq!(id, image_id("ami-0002"));
            assert_eq!(snap, snapshot_id("snap-0002"));
        }
        other => panic!("expected ImageCreationFailed, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_source_image_lookup_failure() {
    let provider = happy_provider().failing(
        Operation::DescribeImages,
        ProviderError::new("Request has expired."),
    );

    let err = copy_image(&provider, &request(false), &mut waiter())
        .await
        .unwrap_err();

    match err {
        CopyError::ResourceLookup {
            resource, message, ..
        } => {
            assert_eq!(resource, "image ami-0001");
            assert_eq!(message, "Request has expired.");
        }
        other => panic!("expected ResourceLookup, got {other:?}"),
    }
    assert_eq!(provider.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_source_image_is_lookup_error() {
    let provider = ScriptedProvider::new();

    let err = copy_image(&provider, &request(false), &mut waiter())
        .await
        .unwrap_err();

    assert!(matches!(err, CopyError::ResourceLookup { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_lookup_failure() {
    let provider = happy_provider().failing(
        Operation::DescribeSnapshots,
        ProviderError::new("snapshot lookup throttled"),
    );

    let err = copy_image(&provider, &request(false), &mut waiter())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CopyError::ResourceLookup { ref resource, .. } if resource == "snapshot snap-0001"
    ));
    assert_eq!(provider.count(Operation::CopySnapshot), 0);
}

#[tokio::test(start_paused = true)]
async fn test_root_without_snapshot_is_invalid() {
    let mut image = source_image();
    if let Some(root) = image.block_device_mappings.get_mut("/dev/sda1") {
        root.snapshot_id = None;
    }
    let provider = ScriptedProvider::new().with_image(image);

    let err = copy_image(&provider, &request(false), &mut waiter())
        .await
        .unwrap_err();

    assert!(matches!(err, CopyError::InvalidSourceImage { .. }));
    assert_eq!(provider.count(Operation::DescribeSnapshots), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stuck_snapshot_times_out() {
    let provider = ScriptedProvider::new()
        .with_image(source_image())
        .with_snapshot(source_snapshot())
        .on_copy_snapshot(snapshot_id("snap-0002"), [SnapshotState::Pending]);
    let mut waiter = Waiter::without_cancellation(WaitConfig {
        interval: Duration::from_secs(5),
        timeout: Some(Duration::from_secs(60)),
    });

    let err = copy_image(&provider, &request(false), &mut waiter)
        .await
        .unwrap_err();

    match err {
        CopyError::Timeout {
            ref resource,
            elapsed,
            ..
        } => {
            assert_eq!(resource, "snapshot snap-0002");
            assert_eq!(elapsed, Duration::from_secs(60));
        }
        ref other => panic!("expected Timeout, got {other:?}"),
    }
    // The pending copy is still there
    assert_eq!(err.leaked_snapshot(), Some(&snapshot_id("snap-0002")));
    assert_eq!(err.leaked_image(), None);
    assert_eq!(provider.count(Operation::RegisterImage), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_wait_stops_workflow() {
    let provider = ScriptedProvider::new()
        .with_image(source_image())
        .with_snapshot(source_snapshot())
        .on_copy_snapshot(snapshot_id("snap-0002"), [SnapshotState::Pending]);
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let mut waiter = Waiter::new(WaitConfig::default(), cancel_rx);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        let _ = cancel_tx.send(true);
    });

    let err = copy_image(&provider, &request(false), &mut waiter)
        .await
        .unwrap_err();

    assert!(matches!(err, CopyError::Cancelled { .. }));
    assert_eq!(err.leaked_snapshot(), Some(&snapshot_id("snap-0002")));
    assert_eq!(provider.count(Operation::RegisterImage), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stuck_image_times_out_with_leftovers() {
    let provider = ScriptedProvider::new()
        .with_image(source_image())
        .with_snapshot(source_snapshot())
        .on_copy_snapshot(snapshot_id("snap-0002"), [SnapshotState::Completed])
        .on_register_image(image_id("ami-0002"), [ImageState::Pending]);
    let mut waiter = Waiter::without_cancellation(WaitConfig {
        interval: Duration::from_secs(5),
        timeout: Some(Duration::from_secs(20)),
    });

    let err = copy_image(&provider, &request(false), &mut waiter)
        .await
        .unwrap_err();

    assert!(matches!(
        &err,
        CopyError::Timeout { resource, .. } if resource == "image ami-0002"
    ));
    assert_eq!(err.leaked_snapshot(), Some(&snapshot_id("snap-0002")));
    assert_eq!(err.leaked_image(), Some(&image_id("ami-0002")));
}

#[tokio::test(start_paused = true)]
async fn test_image_state_lookup_failure_reports_leftovers() {
    let provider = happy_provider().failing(
        Operation::ImageState,
        ProviderError::with_code("RequestLimitExceeded", "throttled"),
    );

    let err = copy_image(&provider, &request(false), &mut waiter())
        .await
        .unwrap_err();

    match &err {
        CopyError::ResourceLookup {
            resource, message, ..
        } => {
            assert_eq!(resource, "image ami-0002");
            assert_eq!(message, "throttled");
        }
        other => panic!("expected ResourceLookup, got {other:?}"),
    }
    assert_eq!(err.leaked_snapshot(), Some(&snapshot_id("snap-0002")));
    assert_eq!(err.leaked_image(), Some(&image_id("ami-0002")));
    assert_eq!(provider.count(Operation::ImageState), 1);
}

#[tokio::test(start_paused = true)]
async fn test_source_lookups_leave_nothing_behind() {
    let provider = happy_provider().failing(
        Operation::DescribeSnapshots,
        ProviderError::new("snapshot lookup throttled"),
    );

    let err = copy_image(&provider, &request(false), &mut waiter())
        .await
        .unwrap_err();

    assert_eq!(err.leaked_snapshot(), None);
    assert_eq!(err.leaked_image(), None);
}

#[tokio::test(start_paused = true)]
async fn test_copy_snapshot_step_alone() {
    let provider = ScriptedProvider::new()
        .with_snapshot(source_snapshot())
        .on_copy_snapshot(
            snapshot_id("snap-00aa"),
            [SnapshotState::Pending, SnapshotState::from("recoverable")],
        );

    let copied = copy_snapshot(
        &provider,
        "eu-west-1",
        &snapshot_id("snap-0001"),
        &mut waiter(),
    )
    .await
    .unwrap();

    // Non-error settled states count as success
    assert_eq!(copied, snapshot_id("snap-00aa"));
}
