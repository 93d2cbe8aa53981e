pub mod cancel;
pub mod tcp_conn;
pub mod tcp_listener;
mod util;

pub use cancel::CancelToken;
pub use tcp_conn::{StreamEnd, TcpConn, TcpConnConfig};
pub use tcp_listener::{ListenerHandle, TcpListener};
pub use util::get_private_ipv4_with_mac;
