use std::path::PathBuf;
use structopt::StructOpt;

/// Authoritative file server for a netdisc share.
///
/// Reads a flat TOML configuration (created interactively on first run)
/// and serves the configured mount directory. CLI flags override the
/// file where they overlap.
#[derive(StructOpt, Debug)]
#[structopt(name = "netdisc-server")]
pub struct Opts {
    /// Print version and build information, then exit.
    #[structopt(long)]
    pub version: bool,

    /// Verbose logging (also enabled by DEBUG_MODE=1).
    #[structopt(short, long)]
    pub debug: bool,

    /// Configuration file path.
    #[structopt(short, long)]
    pub config: Option<PathBuf>,

    /// Serve this directory instead of the configured one.
    #[structopt(long = "mount-dir")]
    pub mount_dir: Option<String>,

    /// Listen on this address instead of the configured port,
    /// e.g. 0.0.0.0:14400.
    #[structopt(long)]
    pub listen: Option<String>,
}
