use server::config::{EnvVar, Opts, get_or_create_config};
use server::core::{CallbackProcessorHandle, ServerState};
use server::fs::init_working_dir;
use server::global_var::{ENV_VAR, LOGGER_CELL};
use server::interface::handle_connection;
use server::network::{TcpConn, TcpListener};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use structopt::StructOpt;

/// One line: package version, then whatever build.rs could stamp.
fn version_banner() -> String {
    let mut banner = format!("netdisc-server {}", env!("CARGO_PKG_VERSION"));
    if let Some(rev) = option_env!("NETDISC_GIT_REV") {
        banner.push_str(&format!(" ({})", rev));
    }
    if let Some(when) = option_env!("NETDISC_BUILT_AT") {
        banner.push_str(&format!(", built {}", when));
    }
    banner
}

fn fatal(msg: String) -> ! {
    eprintln!("{}", msg);
    std::process::exit(1)
}

#[tokio::main]
async fn main() {
    let opts = Opts::from_args();

    if opts.version {
        println!("{}", version_banner());
        return;
    }
    if opts.debug {
        unsafe {
            std::env::set_var("DEBUG_MODE", "1");
        }
    }

    let cfg_path = opts.config.as_deref().and_then(|p| p.to_str());
    let mut config = match get_or_create_config(cfg_path) {
        Ok(config) => config,
        Err(e) => fatal(format!("Failed to load or create configuration: {}", e)),
    };
    if let Some(mount_dir) = &opts.mount_dir {
        config.mount_dir = mount_dir.clone();
    }

    let env_var = match EnvVar::from_config(&config) {
        Ok(ev) => ev,
        Err(e) => fatal(format!("Failed to resolve runtime settings: {}", e)),
    };

    let mount = env_var.mount_dir().to_path_buf();
    let (logger, logger_handle) = match init_working_dir(&mount).await {
        Ok(pair) => pair,
        Err(e) => fatal(format!(
            "Failed to initialize mount directory '{}': {}",
            mount.display(),
            e
        )),
    };

    let listen_addr = match &opts.listen {
        Some(addr) => match addr.parse::<SocketAddr>() {
            Ok(a) => a,
            Err(e) => fatal(format!("Invalid listen address '{}': {}", addr, e)),
        },
        None => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), env_var.port()),
    };

    let identity_line = format!(
        "this is '{}' ({}), reachable at {}",
        env_var.machine_name(),
        env_var
            .hardware_addr_hex()
            .unwrap_or_else(|| "no hardware address".to_string()),
        env_var.advertised_addr()
    );

    ENV_VAR
        .set(env_var)
        .expect("Environment variable already set");
    LOGGER_CELL.set(logger).expect("Logger already set");

    // LOGGER enabled starting from this point

    let state = ServerState::new(mount);

    let listener = match TcpListener::bind_on(listen_addr).await {
        Ok(l) => l,
        Err(e) => fatal(format!("Failed to bind {}: {}", listen_addr, e)),
    };
    let local_addr = listener.local_addr().expect("listener has a local address");

    let accept_state = state.clone();
    let listener_handle = listener.into_task(move |stream, peer| {
        let state = accept_state.clone();
        tokio::spawn(async move {
            handle_connection(state, TcpConn::new(stream, peer)).await;
        });
    });

    let callback_handle = CallbackProcessorHandle::spawn(state.clone());

    server::global_var::LOGGER.info(identity_line);
    server::global_var::LOGGER.info(format!("netdisc server listening on {}", local_addr));
    println!("netdisc server listening on {}", local_addr);

    if let Err(e) = tokio::signal::ctrl_c().await {
        server::global_var::LOGGER.error(format!("Failed to wait for shutdown signal: {}", e));
    }

    server::global_var::LOGGER.info("System shutting down...");
    let _ = listener_handle.shutdown().await;
    let _ = callback_handle.shutdown().await;
    server::global_var::LOGGER.shutdown().await;
    let _ = logger_handle.await;
}
