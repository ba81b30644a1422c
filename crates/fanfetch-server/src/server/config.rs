use anyhow::bail;
use clap::Parser;
use core::time::Duration;

/// Runtime configuration for the `fanfetch-server` binary.
///
/// These settings control the fan-out width, per-fetch timeout, and admission
/// limit of the URL collection service. All values are parsed from CLI
/// arguments or environment variables, with defaults suitable for a single
/// small instance.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "fanfetch-server",
    version,
    about = "An HTTP service that fetches batches of URLs concurrently"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Example: "0.0.0.0:7000"
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:7000"))]
    pub server_addr: String,

    /// Worker budget: the maximum number of fetches a single batch runs at
    /// once.
    ///
    /// Batches are processed in chunks of this many URLs. A chunk must be
    /// fully drained before the next one is dispatched.
    ///
    /// Environment variable: `NUM_WORKERS`
    #[arg(long, env = "NUM_WORKERS", default_value_t = 4)]
    pub num_workers: usize,

    /// Timeout applied to every individual fetch, in milliseconds.
    ///
    /// Covers connecting, sending the request, and reading the whole body.
    ///
    /// Environment variable: `FETCH_TIMEOUT_MS`
    #[arg(long, env = "FETCH_TIMEOUT_MS", default_value_t = 1_000)]
    pub fetch_timeout_ms: u64,

    /// Maximum number of batches processed concurrently across the process.
    ///
    /// Requests beyond this limit are rejected with `429 Too Many Requests`
    /// before their body is decoded or validated.
    ///
    /// Environment variable: `MAX_CONCURRENT_BATCHES`
    #[arg(long, env = "MAX_CONCURRENT_BATCHES", default_value_t = 100)]
    pub max_concurrent_batches: usize,

    /// Seconds to wait for in-flight batches to finish on shutdown before
    /// their fetches are cancelled.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 5)]
    pub shutdown_timeout: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub num_workers: usize,
    pub fetch_timeout: Duration,
    pub max_concurrent_batches: usize,
    pub shutdown_timeout: Duration,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.num_workers == 0 {
            bail!("NUM_WORKERS must be greater than 0");
        }

        if args.max_concurrent_batches == 0 {
            bail!("MAX_CONCURRENT_BATCHES must be greater than 0");
        }

        if args.fetch_timeout_ms == 0 {
            bail!("FETCH_TIMEOUT_MS must be greater than 0");
        }

        Ok(Self {
            server_addr: args.server_addr,
            num_workers: args.num_workers,
            fetch_timeout: Duration::from_millis(args.fetch_timeout_ms),
            max_concurrent_batches: args.max_concurrent_batches,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
        })
    }
}
