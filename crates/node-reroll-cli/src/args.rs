//! Command line arguments.

use clap::Parser;
use node_reroll_core::{parse_label_filter, SelectionCriteria};
use node_reroll_control::RerollConfig;

/// Re-roll provisioner-managed nodes so they are replaced with fresh instances.
#[derive(Parser, Debug)]
#[command(name = "node-reroll")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Show what would be done without making changes.
    #[arg(long)]
    pub dry_run: bool,

    /// Maximum nodes to process at once. Only 1 is supported.
    #[arg(long, default_value_t = 1)]
    pub max_concurrent: u32,

    /// Timeout for draining a node (seconds).
    #[arg(long, default_value_t = 300)]
    pub drain_timeout: u64,

    /// Pause between nodes (seconds).
    #[arg(long, default_value_t = 30)]
    pub wait_between: u64,

    /// Timeout for a replacement node to become ready (seconds).
    #[arg(long, default_value_t = 300)]
    pub replacement_timeout: u64,

    /// Only re-roll nodes in this nodepool.
    #[arg(long)]
    pub nodepool: Option<String>,

    /// Only re-roll nodes with this label (key=value). Repeatable.
    #[arg(long = "label", value_name = "KEY=VALUE")]
    pub labels: Vec<String>,

    /// Enable debug logging.
    #[arg(long, short)]
    pub verbose: bool,

    /// Delete node objects but leave their instances running.
    #[arg(long)]
    pub skip_instance_termination: bool,

    /// AWS region for instance lookups and termination.
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,
}

impl Args {
    /// Node selection criteria from `--nodepool` and `--label`.
    pub fn criteria(&self) -> node_reroll_core::Result<SelectionCriteria> {
        let mut criteria = SelectionCriteria::new();
        if let Some(pool) = &self.nodepool {
            criteria = criteria.with_node_pool(pool.as_str());
        }
        for raw in &self.labels {
            let (key, value) = parse_label_filter(raw)?;
            criteria = criteria.with_label(key, value);
        }
        Ok(criteria)
    }

    /// Reroll configuration for these arguments.
    pub fn reroll_config(&self) -> node_reroll_core::Result<RerollConfig> {
        Ok(RerollConfig::default()
            .with_simulate(self.dry_run)
            .with_max_concurrent(self.max_concurrent)
            .with_drain_timeout(self.drain_timeout)
            .with_pause_between_nodes(self.wait_between)
            .with_replacement_timeout(self.replacement_timeout)
            .with_skip_instance_termination(self.skip_instance_termination)
            .with_criteria(self.criteria()?))
    }

    /// Log filter used when `RUST_LOG` is not set.
    pub const fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            concat!(
                "info,node_reroll_core=debug,node_reroll_cluster=debug,",
                "node_reroll_compute=debug,node_reroll_control=debug,node_reroll_cli=debug"
            )
        } else {
            "info"
        }
    }
}
