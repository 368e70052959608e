//! ami-copy - copy an AMI into your own account
//!
//! Copies the root snapshot of a (typically public) AMI, then registers a new
//! AMI on the copy with a 10 GB gp2 root volume, four ephemeral slots and
//! optionally enhanced networking.

use clap::Parser;

mod cli;
mod config;
mod error;
mod logging;
mod output;

use cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // Run the copy
    if let Err(e) = cli.run().await {
        tracing::error!(error = %format!("{e:#}"), "Copy failed");
        error::print_error(&e);
        std::process::exit(1);
    }
}
