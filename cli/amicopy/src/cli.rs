//! Command line interface.

use amicopy_ec2::Ec2Provider;
use amicopy_id::ImageId;
use amicopy_wait::Waiter;
use amicopy_workflow::{copy_image, CopyReport, ImageProvider};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::Config;
use crate::logging;
use crate::output::print_copy_receipt;

/// Copy a public AMI to your own account.
///
/// Enables enhanced networking on request and sets convenient defaults for
/// the root volume size and the number of ephemeral volumes.
#[derive(Debug, Parser)]
#[command(name = "ami-copy")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// AWS access key ID (defaults to the SDK credential chain).
    #[arg(short = 'a', long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub aws_access_key: Option<String>,

    /// AWS secret access key.
    #[arg(short = 's', long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub aws_secret_key: Option<String>,

    /// Region which contains the source AMI and will contain the copy as well.
    #[arg(short, long, env = "AWS_REGION", default_value = "us-east-1")]
    pub region: String,

    /// ID of the AMI to copy.
    #[arg(short = 'i', long = "ami-id", value_name = "AMI_ID")]
    pub ami_id: ImageId,

    /// Enable enhanced networking (SR-IOV) in the resulting image.
    #[arg(short = 'e', long)]
    pub enhanced_networking: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long, default_value = "info")]
    pub log_level: String,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Seconds between status checks of the snapshot copy and the new image.
    #[arg(long, value_name = "SECS", default_value_t = 5)]
    pub poll_interval: u64,

    /// Give up waiting for a pending resource after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Output format (table or json).
    #[arg(long, default_value = "table")]
    pub format: String,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

impl Cli {
    /// Run the copy.
    pub async fn run(self) -> Result<()> {
        let config = Config::from_cli(&self)?;
        logging::init(&config.log_level, config.log_format)?;

        info!(
            region = %config.region,
            ami_id = %config.source_image_id,
            enhanced_networking = config.force_enhanced_networking,
            poll_interval_secs = config.wait.interval.as_secs(),
            "Configuration loaded"
        );

        let provider = Ec2Provider::connect(&config.region, config.credentials.clone()).await;

        let (cancel_tx, cancel_rx) = watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Received interrupt, cancelling");
                let _ = cancel_tx.send(true);
            }
        });

        let report = run_copy(&provider, &config, cancel_rx).await?;
        print_copy_receipt(config.format, &config.region, &report);

        Ok(())
    }
}

/// Run the copy workflow described by `config` against `provider`.
pub async fn run_copy(
    provider: &dyn ImageProvider,
    config: &Config,
    cancel: watch::Receiver<bool>,
) -> Result<CopyReport> {
    let mut waiter = Waiter::new(config.wait.clone(), cancel);
    let report = copy_image(provider, &config.copy_request(), &mut waiter).await?;
    Ok(report)
}
