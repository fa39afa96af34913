//! `skeind`: the skein node daemon.
//!
//! Runs a node that owns the shards the consistent-hash ring assigns to it,
//! holding an advisory lock file per owned shard under the data directory.
//!
//! # Usage
//!
//! ```text
//! skeind start                                  # start with defaults
//! skeind -c skein.toml start                    # start with a config file
//! skeind start -d ./node2 -b 127.0.0.1:50001    # second instance
//! skeind start -p 127.0.0.1:50000               # start with a boot peer
//! skeind shard /some/path -p 127.0.0.1:50001    # where does a path live?
//! skeind locks                                  # which lock files are held?
//! ```

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use skein_cluster::{DEFAULT_FEED_CAPACITY, MembershipFeed};
use skein_engine::{SkeinNode, SkeinNodeConfig};
use skein_placement::HashRing;
use skein_shard::ShardMap;
use skein_store::{AdvisoryLock, FsNamespace, Namespace, Resource, StoreError, canonical_key};
use skein_types::{LOCK_DIR, NodeName};
use tracing::{info, warn};

use config::CliConfig;

// -----------------------------------------------------------------------
// CLI definition
// -----------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "skeind", version, about = "skein shard cluster node")]
struct Cli {
    /// Path to TOML config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the node and serve until Ctrl-C.
    Start {
        /// Override data directory (useful for running multiple instances).
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Override the bind address, which is also the node name.
        #[arg(short, long)]
        bind_addr: Option<String>,

        /// Boot peer, by bind address. Can be specified multiple times.
        #[arg(short, long)]
        peer: Vec<String>,
    },

    /// Print the shard, lock file and owner of a path.
    Shard {
        /// Logical path to look up.
        path: String,

        /// Cluster members besides this node. Replaces the configured peers.
        #[arg(short, long)]
        peer: Vec<String>,
    },

    /// List lock files in the data directory and whether they are held.
    Locks,
}

// -----------------------------------------------------------------------
// Entrypoint
// -----------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = CliConfig::load(cli.config.as_deref()).context("failed to load config")?;

    setup_tracing(&config.log.level);

    match cli.command {
        Commands::Start {
            data_dir,
            bind_addr,
            peer,
        } => {
            // CLI args override config file values.
            if let Some(dir) = data_dir {
                config.node.data_dir = dir;
            }
            if let Some(addr) = bind_addr {
                config.node.bind_addr = addr;
            }
            if !peer.is_empty() {
                config.cluster.peers = peer.into_iter().map(NodeName::from).collect();
            }
            cmd_start(config).await
        }
        Commands::Shard { path, peer } => {
            if !peer.is_empty() {
                config.cluster.peers = peer.into_iter().map(NodeName::from).collect();
            }
            cmd_shard(&config, &path)
        }
        Commands::Locks => cmd_locks(&config),
    }
}

/// Initialize the `tracing` subscriber with the given level filter.
///
/// Respects `RUST_LOG` env var if set, otherwise uses the config value.
fn setup_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

// -----------------------------------------------------------------------
// skeind start
// -----------------------------------------------------------------------

async fn cmd_start(config: CliConfig) -> Result<()> {
    info!("starting skeind");
    info!(
        data_dir = %config.node.data_dir.display(),
        bind_addr = %config.node.bind_addr,
        num_shards = config.cluster.num_shards.get(),
        num_replicas = config.cluster.num_replicas.get(),
        peers = config.cluster.peers.len(),
        "node configuration"
    );

    let namespace = Arc::new(
        FsNamespace::new(&config.node.data_dir).context("failed to open data directory")?,
    );
    let name = NodeName::from(config.node.bind_addr.as_str());
    let node = SkeinNode::new(node_config(&config, name.clone()), namespace);

    // Membership: the node starts alone, then learns about boot peers
    // through the same path a membership layer would use.
    let feed = MembershipFeed::new(name, DEFAULT_FEED_CAPACITY);
    let events = feed.sender();
    let feed_task = tokio::spawn(feed.run(Arc::clone(node.reconciler())));
    for peer in &config.cluster.peers {
        events
            .join(peer.clone())
            .await
            .context("membership feed stopped")?;
    }

    info!(node = %node.name(), "node running, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("shutdown requested");

    // Drain pending membership events before tearing down.
    drop(events);
    let view = feed_task.await.context("membership feed task failed")?;
    info!(members = view.len(), "membership feed drained");

    let report = tokio::task::spawn_blocking(move || node.shutdown())
        .await
        .context("shutdown task failed")?;
    if report.lock_failures.is_empty() {
        info!(closed = report.closed, "skeind stopped cleanly");
    } else {
        warn!(
            closed = report.closed,
            still_locked = report.lock_failures.len(),
            "skeind stopped with shard locks still held"
        );
    }
    Ok(())
}

fn node_config(config: &CliConfig, name: NodeName) -> SkeinNodeConfig {
    SkeinNodeConfig {
        num_shards: config.cluster.num_shards,
        num_replicas: config.cluster.num_replicas,
        lock_base: PathBuf::from("/"),
        ..SkeinNodeConfig::new(name)
    }
}

// -----------------------------------------------------------------------
// skeind shard
// -----------------------------------------------------------------------

fn cmd_shard(config: &CliConfig, path: &str) -> Result<()> {
    let key = canonical_key(path).with_context(|| format!("invalid path {path:?}"))?;

    let local = NodeName::from(config.node.bind_addr.as_str());
    let mut ring = HashRing::new(local, config.cluster.num_replicas);
    for peer in &config.cluster.peers {
        ring.add(peer.clone());
    }

    let shard = ShardMap::new(config.cluster.num_shards).shard_of(&key);
    let owner = ring.node_of(shard);
    let lock_file = lock_dir(config).join(shard.to_string());

    println!("Path:      {key}");
    println!("Shard:     {shard} of {}", config.cluster.num_shards);
    println!("Lock file: {}", lock_file.display());
    println!(
        "Owner:     {owner}{}",
        if ring.is_local(shard) { " (this node)" } else { "" }
    );
    println!("Members:   {}", ring.member_count());
    Ok(())
}

// -----------------------------------------------------------------------
// skeind locks
// -----------------------------------------------------------------------

fn cmd_locks(config: &CliConfig) -> Result<()> {
    let dir = lock_dir(config);
    if !dir.is_dir() {
        println!("No lock directory at {}", dir.display());
        return Ok(());
    }

    let mut names: Vec<String> = std::fs::read_dir(&dir)
        .with_context(|| format!("cannot list {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort_by_key(|n| (n.parse::<u32>().unwrap_or(u32::MAX), n.clone()));

    let namespace = FsNamespace::new(&config.node.data_dir)
        .context("failed to open data directory")?;
    println!("Lock files in {}: {}", dir.display(), names.len());
    for name in names {
        let logical = Path::new("/").join(LOCK_DIR).join(&name);
        let state = probe_lock(&namespace, &logical)
            .with_context(|| format!("cannot probe {name}"))?;
        println!("  shard {name:>5}  {state}");
    }
    Ok(())
}

/// Whether some other process holds the lock on `path`.
fn probe_lock(namespace: &FsNamespace, path: &Path) -> Result<&'static str> {
    let handle = namespace.open(path)?;
    let state = match handle.try_lock() {
        Ok(()) => {
            handle.unlock()?;
            "free"
        }
        Err(StoreError::LockContended(_)) => "held",
        Err(e) => {
            handle.close()?;
            return Err(e.into());
        }
    };
    handle.close()?;
    Ok(state)
}

fn lock_dir(config: &CliConfig) -> PathBuf {
    config.node.data_dir.join(LOCK_DIR)
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
