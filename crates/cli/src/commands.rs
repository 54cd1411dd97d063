//! Subcommands that inspect a ring built by [`crate::config::CliConfig`].

use clap::Subcommand;
use corelib::HashRing;

/// A single CLI action against an already-built, already-snapshotted ring.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Prints the server(s) responsible for a key.
    Lookup {
        /// The key to look up.
        key: String,
        /// How many distinct replica servers to return.
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
    /// Prints every server on the ring and its virtual node count.
    Describe,
    /// Prints how many of `--keys` keys would land on each server, to
    /// eyeball distribution evenness.
    Distribution {
        /// Number of synthetic keys to hash.
        #[arg(long, default_value_t = 10_000)]
        keys: u32,
    },
}

/// Structured result of running a [`Command`], separated from its
/// formatting so tests can assert on it directly.
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    Lookup(Vec<String>),
    Describe { algorithm: &'static str, servers: Vec<String> },
    Distribution(Vec<(String, u32)>),
}

impl Command {
    pub fn run(&self, ring: &HashRing<String>) -> anyhow::Result<()> {
        let result = self.evaluate(ring)?;
        print_result(&result);
        Ok(())
    }

    fn evaluate(&self, ring: &HashRing<String>) -> anyhow::Result<CommandResult> {
        match self {
            Command::Lookup { key, count } => {
                let servers = ring.get_servers(key.as_str(), *count);
                Ok(CommandResult::Lookup(servers))
            }
            Command::Describe => Ok(CommandResult::Describe {
                algorithm: ring.hash_algorithm_name(),
                servers: ring.servers(),
            }),
            Command::Distribution { keys } => {
                let mut counts: std::collections::BTreeMap<String, u32> = ring
                    .servers()
                    .into_iter()
                    .map(|s| (s, 0u32))
                    .collect();
                for i in 0..*keys {
                    let key = format!("sample-key-{i}");
                    if let Some(server) = ring.try_get_server(key.as_str()) {
                        *counts.entry(server).or_insert(0) += 1;
                    }
                }
                Ok(CommandResult::Distribution(counts.into_iter().collect()))
            }
        }
    }
}

fn print_result(result: &CommandResult) {
    match result {
        CommandResult::Lookup(servers) => {
            for server in servers {
                println!("{server}");
            }
        }
        CommandResult::Describe { algorithm, servers } => {
            println!("algorithm\t{algorithm}");
            for server in servers {
                println!("{server}");
            }
        }
        CommandResult::Distribution(rows) => {
            for (server, count) in rows {
                println!("{server}\t{count}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_with(servers: &[&str]) -> HashRing<String> {
        let ring: HashRing<String> = HashRing::new();
        ring.add_range_default(servers.iter().map(|s| s.to_string())).unwrap();
        ring.create_configuration_snapshot().unwrap();
        ring
    }

    #[test]
    fn lookup_returns_requested_replica_count() {
        let ring = ring_with(&["a", "b", "c"]);
        let result = Command::Lookup { key: "k".to_string(), count: 2 }
            .evaluate(&ring)
            .unwrap();
        match result {
            CommandResult::Lookup(servers) => assert_eq!(servers.len(), 2),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn describe_lists_every_server_and_the_algorithm() {
        let ring = ring_with(&["a", "b"]);
        let result = Command::Describe.evaluate(&ring).unwrap();
        match result {
            CommandResult::Describe { algorithm, servers } => {
                assert_eq!(algorithm, "SHA1");
                assert_eq!(servers, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn distribution_covers_every_server_key() {
        let ring = ring_with(&["a", "b", "c"]);
        let result = Command::Distribution { keys: 300 }.evaluate(&ring).unwrap();
        match result {
            CommandResult::Distribution(rows) => {
                assert_eq!(rows.len(), 3);
                let total: u32 = rows.iter().map(|(_, c)| c).sum();
                assert_eq!(total, 300);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
