use crate::format::util::{format_epoch_secs, format_size};
use crate::node::ClientNode;
use api_model::status::StatusCode;

/// Exit code policy: settled outcomes (OK, ALREADY_EXISTS) are success.
fn finish(name: &str, verb: &str, status: StatusCode) -> i32 {
    println!("{} {}: {}", verb, name, status);
    if status.is_settled() { 0 } else { 1 }
}

pub fn handle_store(node: &ClientNode, name: &str) -> i32 {
    match node.store_file(name) {
        Ok(status) => finish(name, "store", status),
        Err(e) => {
            eprintln!("store {}: {}", name, e);
            1
        }
    }
}

pub fn handle_fetch(node: &ClientNode, name: &str) -> i32 {
    match node.fetch_file(name) {
        Ok(status) => finish(name, "fetch", status),
        Err(e) => {
            eprintln!("fetch {}: {}", name, e);
            1
        }
    }
}

pub fn handle_delete(node: &ClientNode, name: &str) -> i32 {
    match node.delete_file(name) {
        Ok((status, info)) => {
            if let Some(info) = info {
                println!(
                    "deleted {} ({}, last modified {})",
                    info.name,
                    format_size(info.file_size),
                    format_epoch_secs(info.mtime)
                );
            }
            finish(name, "delete", status)
        }
        Err(e) => {
            eprintln!("delete {}: {}", name, e);
            1
        }
    }
}

pub fn handle_stat(node: &ClientNode, name: &str) -> i32 {
    match node.file_status(name) {
        Ok((status, Some(info))) => {
            println!("name:  {}", info.name);
            println!("size:  {}", format_size(info.file_size));
            println!("mtime: {}", format_epoch_secs(info.mtime));
            println!("ctime: {}", format_epoch_secs(info.ctime));
            if status.is_ok() { 0 } else { 1 }
        }
        Ok((status, None)) => finish(name, "stat", status),
        Err(e) => {
            eprintln!("stat {}: {}", name, e);
            1
        }
    }
}
