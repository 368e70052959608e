//! Output formatting for the copy result.

use amicopy_workflow::{CopyReport, DeviceSpec};
use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

const CLI_SCHEMA_VERSION: &str = "amicopy.cli.v1";

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON format.
    Json,
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", "Success:".green().bold(), message);
}

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", "Info:".blue().bold(), message);
}

#[derive(Debug, Serialize)]
pub struct ReceiptNextStep {
    pub label: &'static str,
    pub cmd: String,
}

/// One row of the device map table.
#[derive(Debug, Tabled)]
struct DeviceRow {
    #[tabled(rename = "DEVICE")]
    device: String,
    #[tabled(rename = "KIND")]
    kind: &'static str,
    #[tabled(rename = "SOURCE")]
    source: String,
    #[tabled(rename = "SIZE")]
    size: String,
    #[tabled(rename = "TYPE")]
    volume_type: String,
    #[tabled(rename = "DELETE ON TERMINATION")]
    delete_on_termination: String,
}

fn device_rows(report: &CopyReport) -> Vec<DeviceRow> {
    report
        .block_device_map
        .iter()
        .map(|device| match &device.spec {
            DeviceSpec::Volume(volume) => DeviceRow {
                device: device.device_name.clone(),
                kind: "volume",
                source: volume.snapshot_id.to_string(),
                size: format!("{} GB", volume.size_gb),
                volume_type: volume.volume_type.clone(),
                delete_on_termination: volume.delete_on_termination.to_string(),
            },
            DeviceSpec::Ephemeral { virtual_name } => DeviceRow {
                device: device.device_name.clone(),
                kind: "ephemeral",
                source: virtual_name.clone(),
                size: "-".to_string(),
                volume_type: "-".to_string(),
                delete_on_termination: "-".to_string(),
            },
        })
        .collect()
}

fn next_steps(region: &str, report: &CopyReport) -> Vec<ReceiptNextStep> {
    vec![ReceiptNextStep {
        label: "Launch",
        cmd: format!(
            "aws ec2 run-instances --region {region} --image-id {}",
            report.target_image_id
        ),
    }]
}

pub fn receipt_value<T: Serialize>(
    status: &str,
    kind: &str,
    resource_key: &str,
    resource: &T,
    ids: serde_json::Value,
    next: &[ReceiptNextStep],
) -> serde_json::Value {
    let mut receipt = serde_json::Map::new();
    receipt.insert("kind".to_string(), serde_json::json!(kind));
    receipt.insert("status".to_string(), serde_json::json!(status));
    receipt.insert("ids".to_string(), ids);
    receipt.insert(
        "next".to_string(),
        serde_json::to_value(next).unwrap_or_else(|_| serde_json::json!([])),
    );
    receipt.insert(
        resource_key.to_string(),
        serde_json::to_value(resource).unwrap_or_else(|_| serde_json::json!({})),
    );
    serde_json::json!({ "receipt": receipt })
}

fn copy_receipt_value(region: &str, report: &CopyReport) -> serde_json::Value {
    receipt_value(
        "available",
        "images.copy",
        "image",
        report,
        serde_json::json!({
            "region": region,
            "source_image_id": report.source_image_id,
            "source_snapshot_id": report.source_snapshot_id,
            "target_snapshot_id": report.target_snapshot_id,
            "target_image_id": report.target_image_id,
        }),
        &next_steps(region, report),
    )
}

/// Print the result of a completed copy.
pub fn print_copy_receipt(format: OutputFormat, region: &str, report: &CopyReport) {
    match format {
        OutputFormat::Table => {
            print_success(&format!(
                "New AMI {} created from {}",
                report.target_image_id, report.source_image_id
            ));
            println!("{}", Table::new(device_rows(report)));
            print_info(&format!(
                "Root snapshot {} copied to {}",
                report.source_snapshot_id, report.target_snapshot_id
            ));
            if let Some(sriov) = &report.sriov_net_support {
                print_info(&format!("Enhanced networking: {sriov}"));
            }
            for step in next_steps(region, report) {
                print_info(&format!("{}: {}", step.label, step.cmd));
            }
        }
        OutputFormat::Json => {
            println!("{}", format_json(&copy_receipt_value(region, report), "{}"));
        }
    }
}

fn format_json<T: Serialize + ?Sized>(data: &T, fallback: &str) -> String {
    let value = serde_json::to_value(data).unwrap_or_else(|_| serde_json::json!({}));
    let wrapped = wrap_with_schema(value);
    let sorted = sort_json_value(wrapped);
    serde_json::to_string_pretty(&sorted).unwrap_or_else(|_| fallback.to_string())
}

fn wrap_with_schema(value: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "schemaVersion": CLI_SCHEMA_VERSION,
        "data": value
    })
}

fn sort_json_value(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Array(values) => {
            serde_json::Value::Array(values.into_iter().map(sort_json_value).collect())
        }
        serde_json::Value::Object(entries) => {
            let mut pairs: Vec<_> = entries.into_iter().collect();
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
            let mut mapped = serde_json::Map::new();
            for (key, value) in pairs {
                mapped.insert(key, sort_json_value(value));
            }
            serde_json::Value::Object(mapped)
        }
        other => other,
    }
}
