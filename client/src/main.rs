use clap::{Parser, Subcommand};
use client::ClientNode;
use client::cli;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "netdisc-client",
    version,
    about = "netdisc client CLI",
    propagate_version = true
)]
pub struct Cli {
    #[arg(long, default_value = "127.0.0.1:14400", help = "Server address")]
    server: String,

    #[arg(long, help = "Local mount directory")]
    mount: PathBuf,

    #[arg(long = "client-id", help = "Client identity override")]
    client_id: Option<String>,

    #[arg(
        long = "deadline-ms",
        default_value_t = 5000,
        help = "Per-call deadline in milliseconds"
    )]
    deadline_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Push a local file to the server")]
    Store { name: String },
    #[command(about = "Pull a file from the server")]
    Fetch { name: String },
    #[command(about = "Delete a file on the server")]
    Delete { name: String },
    #[command(about = "List the server's files")]
    List,
    #[command(about = "Show one file's server-side metadata")]
    Stat { name: String },
    #[command(about = "Mirror the mount directory until interrupted")]
    Sync,
}

fn resolve_server(addr: &str) -> SocketAddr {
    match addr.to_socket_addrs().ok().and_then(|mut it| it.next()) {
        Some(a) => a,
        None => {
            eprintln!("Cannot resolve server address '{}'", addr);
            std::process::exit(2);
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let server_addr = resolve_server(&cli.server);
    let node = ClientNode::new(cli.mount, server_addr, cli.client_id, cli.deadline_ms);

    let code = match &cli.command {
        Commands::Store { name } => cli::file::handle_store(&node, name),
        Commands::Fetch { name } => cli::file::handle_fetch(&node, name),
        Commands::Delete { name } => cli::file::handle_delete(&node, name),
        Commands::List => cli::list::handle_list(&node),
        Commands::Stat { name } => cli::file::handle_stat(&node, name),
        Commands::Sync => cli::sync::handle_sync(node),
    };
    std::process::exit(code);
}
