use crate::config::Config;
use crate::err::Result;
use crate::fs::util::expand_tilde;
use crate::network::get_private_ipv4_with_mac;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

/// Settings the process runs with, resolved once at startup from the
/// config file plus interface discovery: who this server is, where it
/// listens, and which directory it serves. Installed into a `OnceLock`
/// and read-only afterwards.
#[derive(Debug)]
pub struct EnvVar {
    machine_name: String,
    hardware_addr: Option<[u8; 6]>,
    advertise_ip: IpAddr,
    port: u16,
    mount_dir: PathBuf,
}

impl EnvVar {
    pub fn from_config(config: &Config) -> Result<Self> {
        // Discovery is best-effort: a machine without a private interface
        // (CI containers) advertises loopback and has no hardware address.
        let discovered = get_private_ipv4_with_mac();
        Ok(Self {
            machine_name: config.machine_name.clone(),
            hardware_addr: discovered.map(|(_, mac)| mac),
            advertise_ip: discovered
                .map(|(ip, _)| IpAddr::V4(ip))
                .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            port: config.port,
            mount_dir: PathBuf::from(expand_tilde(&config.mount_dir)),
        })
    }

    pub fn machine_name(&self) -> &str {
        &self.machine_name
    }

    /// Colon-separated hex, when an interface with a MAC was found.
    pub fn hardware_addr_hex(&self) -> Option<String> {
        self.hardware_addr
            .map(|mac| mac.map(|b| format!("{:02x}", b)).join(":"))
    }

    /// The address peers on the local network would dial.
    pub fn advertised_addr(&self) -> SocketAddr {
        SocketAddr::new(self.advertise_ip, self.port)
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn mount_dir(&self) -> &Path {
        &self.mount_dir
    }
}
