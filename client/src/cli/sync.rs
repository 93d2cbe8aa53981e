use crate::node::ClientNode;
use crate::sync::run_sync;
use std::sync::Arc;

pub fn handle_sync(node: ClientNode) -> i32 {
    println!(
        "mirroring {} against {} as '{}'",
        node.mount.display(),
        node.server_addr,
        node.client_id
    );
    match run_sync(Arc::new(node)) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("sync: {}", e);
            1
        }
    }
}
