//! node-reroll - recycle provisioner-managed cluster nodes.
//!
//! This is the entry point for the `node-reroll` binary.

mod args;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use node_reroll_cluster::KubeCluster;
use node_reroll_compute::Ec2Provider;
use node_reroll_control::{RerollContext, RerollOrchestrator, RunOutcome};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use args::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.default_log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::debug!(?args, "Parsed arguments");

    let config = args.reroll_config().context("Invalid node selection")?;

    let cluster = KubeCluster::new()
        .await
        .context("Failed to create Kubernetes client")?;
    let compute = Ec2Provider::new(args.region.clone()).await;

    let orchestrator =
        RerollOrchestrator::new(RerollContext::new(Arc::new(cluster), Arc::new(compute), config));
    let report = orchestrator.run().await.context("Node re-roll failed")?;

    if report.outcome == RunOutcome::Completed {
        println!("{report}");
    }

    let code = report.exit_code();
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
