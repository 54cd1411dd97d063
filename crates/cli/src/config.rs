//! Top-level CLI argument parsing.

use std::sync::Arc;

use clap::{Parser, ValueEnum};
use corelib::{HashAlgorithm, HashRing, Md5Algorithm, Sha1Algorithm};

use crate::commands::Command;

/// Which digest to hash ring positions with.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum HashAlgorithmArg {
    Sha1,
    Md5,
}

impl HashAlgorithmArg {
    fn build(self) -> Arc<dyn HashAlgorithm> {
        match self {
            HashAlgorithmArg::Sha1 => Arc::new(Sha1Algorithm),
            HashAlgorithmArg::Md5 => Arc::new(Md5Algorithm),
        }
    }
}

/// Inspects a consistent hash ring built from `--server` flags given on the
/// command line.
///
/// Each run constructs a fresh ring from `servers` and `virtual_nodes`, then
/// performs exactly one subcommand against it; there is no persisted ring
/// state between invocations.
#[derive(Debug, Parser)]
#[command(name = "consistent-hash", about = "Inspect a consistent hash ring")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,

    /// A server to place on the ring. Repeat to add more than one.
    #[arg(long = "server", global = true)]
    pub servers: Vec<String>,

    /// Virtual nodes placed per server.
    #[arg(long, default_value_t = 42, global = true)]
    pub virtual_nodes: u32,

    /// Hash algorithm used to compute ring positions.
    #[arg(long, value_enum, default_value_t = HashAlgorithmArg::Sha1, global = true)]
    pub algorithm: HashAlgorithmArg,
}

impl CliConfig {
    /// Builds the ring described by `servers`/`virtual_nodes`/`algorithm`
    /// and runs `command` against it.
    pub fn run(self) -> anyhow::Result<()> {
        if self.servers.is_empty() {
            anyhow::bail!("at least one --server is required");
        }

        let ring: HashRing<String> =
            HashRing::with_algorithm_and_vnodes(self.algorithm.build(), self.virtual_nodes)
                .map_err(|err| anyhow::anyhow!("invalid ring options: {err}"))?;
        ring.add_range_default(self.servers.clone())
            .map_err(|err| anyhow::anyhow!("failed to build ring: {err}"))?;
        ring.create_configuration_snapshot()
            .map_err(|err| anyhow::anyhow!("failed to publish ring snapshot: {err}"))?;

        self.command.run(&ring)
    }
}
