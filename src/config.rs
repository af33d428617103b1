//! Command-line configuration for the coordinator binary.

use crate::topology::types::Topology;
use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

/// Fragment-aware transaction router with deferred-write recovery
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// HTTP listen address
    #[arg(long, default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,

    /// JSON topology file; the built-in three-node layout is used when absent
    #[arg(long)]
    pub topology: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn max_level(&self) -> anyhow::Result<tracing::Level> {
        tracing::Level::from_str(&self.log_level)
            .map_err(|e| anyhow::anyhow!("invalid --log-level {:?}: {}", self.log_level, e))
    }

    /// Reads the topology file if one was given. Validation happens when the
    /// registry is built.
    pub fn load_topology(&self) -> anyhow::Result<Topology> {
        let Some(path) = &self.topology else {
            return Ok(Topology::default());
        };

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading topology file {}", path.display()))?;
        let topology: Topology = serde_json::from_str(&raw)
            .with_context(|| format!("parsing topology file {}", path.display()))?;
        Ok(topology)
    }
}
