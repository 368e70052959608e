//! Run configuration resolved from the command line and environment.

use std::str::FromStr;
use std::time::Duration;

use amicopy_ec2::StaticCredentials;
use amicopy_id::ImageId;
use amicopy_wait::WaitConfig;
use amicopy_workflow::CopyImageRequest;
use anyhow::{bail, Result};
use tracing_subscriber::filter::LevelFilter;

use crate::cli::{Cli, LogFormat};
use crate::output::OutputFormat;

/// Validated run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub region: String,
    pub source_image_id: ImageId,

    /// Explicit key pair. `None` falls back to the SDK credential chain.
    pub credentials: Option<StaticCredentials>,

    pub force_enhanced_networking: bool,
    pub wait: WaitConfig,
    pub log_level: String,
    pub log_format: LogFormat,
    pub format: OutputFormat,
}

impl Config {
    /// Build and validate the configuration from parsed arguments.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let credentials = match (&cli.aws_access_key, &cli.aws_secret_key) {
            (Some(access_key_id), Some(secret_access_key)) => Some(StaticCredentials {
                access_key_id: access_key_id.clone(),
                secret_access_key: secret_access_key.clone(),
            }),
            (None, None) => None,
            (Some(_), None) => bail!("--aws-access-key was given without --aws-secret-key"),
            (None, Some(_)) => bail!("--aws-secret-key was given without --aws-access-key"),
        };

        if cli.region.trim().is_empty() {
            bail!("region must not be empty");
        }

        if cli.poll_interval == 0 {
            bail!("--poll-interval must be at least 1 second");
        }

        let timeout = match cli.timeout {
            Some(0) => bail!("--timeout must be at least 1 second"),
            other => other.map(Duration::from_secs),
        };

        let log_level = normalize_log_level(&cli.log_level)?;

        let format = match cli.format.as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Table,
        };

        Ok(Self {
            region: cli.region.clone(),
            source_image_id: cli.ami_id.clone(),
            credentials,
            force_enhanced_networking: cli.enhanced_networking,
            wait: WaitConfig {
                interval: Duration::from_secs(cli.poll_interval),
                timeout,
            },
            log_level,
            log_format: cli.log_format,
            format,
        })
    }

    /// The workflow request for this run.
    pub fn copy_request(&self) -> CopyImageRequest {
        CopyImageRequest {
            region: self.region.clone(),
            source_image_id: self.source_image_id.clone(),
            force_enhanced_networking: self.force_enhanced_networking,
        }
    }
}

/// Accept the usual level names, including `warning` and `critical`.
fn normalize_log_level(level: &str) -> Result<String> {
    let level = match level.to_ascii_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        other => other.to_string(),
    };
    if LevelFilter::from_str(&level).is_err() {
        bail!("unknown log level '{level}'");
    }
    Ok(level)
}
