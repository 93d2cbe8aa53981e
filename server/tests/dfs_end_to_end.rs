//! End-to-end RPC tests: a real listener on an ephemeral port, driven by
//! the real blocking client.

use api_model::status::StatusCode;
use client::ClientNode;
use server::core::{CallbackProcessorHandle, ServerState};
use server::interface::handle_connection;
use server::network::{ListenerHandle, TcpConn, TcpListener};
use server::utilities::install_noop_logger;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

struct TempDirGuard(PathBuf);
impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let mut p = std::env::temp_dir();
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        p.push(format!("{}_{}_{}", prefix, std::process::id(), ts));
        fs::create_dir_all(&p).unwrap();
        TempDirGuard(p)
    }
    fn path(&self) -> &Path {
        &self.0
    }
}
impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

async fn spawn_server(
    mount: &Path,
) -> (
    Arc<ServerState>,
    SocketAddr,
    ListenerHandle,
    CallbackProcessorHandle,
) {
    install_noop_logger();
    let state = ServerState::new(mount.to_path_buf());
    let listener = TcpListener::bind_on(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    let accept_state = state.clone();
    let listener_handle = listener.into_task(move |stream, peer| {
        let st = accept_state.clone();
        tokio::spawn(async move {
            handle_connection(st, TcpConn::new(stream, peer)).await;
        });
    });
    let callback_handle = CallbackProcessorHandle::spawn(state.clone());
    (state, addr, listener_handle, callback_handle)
}

fn node_for(mount: &Path, addr: SocketAddr, id: &str) -> Arc<ClientNode> {
    Arc::new(ClientNode::new(
        mount.to_path_buf(),
        addr,
        Some(id.to_string()),
        5000,
    ))
}

/// Run a blocking client call off the async runtime.
async fn blocking<T, F>(f: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.unwrap()
}

fn set_mtime(path: &Path, secs: i64) {
    let t = std::time::UNIX_EPOCH + Duration::from_secs(secs as u64);
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(t)
        .unwrap();
}

fn mtime_of(path: &Path) -> i64 {
    fs::metadata(path)
        .unwrap()
        .modified()
        .unwrap()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn store_then_fetch_round_trips_content() {
    let server_dir = TempDirGuard::new("e2e_roundtrip_server");
    let client_a_dir = TempDirGuard::new("e2e_roundtrip_a");
    let client_b_dir = TempDirGuard::new("e2e_roundtrip_b");
    let (state, addr, _l, _cb) = spawn_server(server_dir.path()).await;

    // Binary content with NULs and CRLF sequences must survive.
    let mut content = b"hello\x00world\r\nbinary".to_vec();
    content.extend_from_slice(&[0u8, 13, 10, 255, 1, 2, 3]);
    fs::write(client_a_dir.path().join("blob.bin"), &content).unwrap();

    let a = node_for(client_a_dir.path(), addr, "client-a");
    let b = node_for(client_b_dir.path(), addr, "client-b");

    let status = blocking({
        let a = a.clone();
        move || a.store_file("blob.bin")
    })
    .await
    .unwrap();
    assert_eq!(status, StatusCode::Ok);
    assert_eq!(
        fs::read(server_dir.path().join("blob.bin")).unwrap(),
        content
    );
    assert!(state.locks.is_empty(), "store must release the write lock");

    let status = blocking({
        let b = b.clone();
        move || b.fetch_file("blob.bin")
    })
    .await
    .unwrap();
    assert_eq!(status, StatusCode::Ok);
    assert_eq!(
        fs::read(client_b_dir.path().join("blob.bin")).unwrap(),
        content
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn empty_file_round_trips() {
    let server_dir = TempDirGuard::new("e2e_empty_server");
    let client_a_dir = TempDirGuard::new("e2e_empty_a");
    let client_b_dir = TempDirGuard::new("e2e_empty_b");
    let (_state, addr, _l, _cb) = spawn_server(server_dir.path()).await;

    fs::write(client_a_dir.path().join("empty.txt"), b"").unwrap();
    let a = node_for(client_a_dir.path(), addr, "client-a");
    let b = node_for(client_b_dir.path(), addr, "client-b");

    let status = blocking({
        let a = a.clone();
        move || a.store_file("empty.txt")
    })
    .await
    .unwrap();
    assert_eq!(status, StatusCode::Ok);
    assert!(server_dir.path().join("empty.txt").exists());

    let status = blocking({
        let b = b.clone();
        move || b.fetch_file("empty.txt")
    })
    .await
    .unwrap();
    // The server's empty file matches the absent-local sentinel CRC, so
    // the client materializes the empty file from the short-circuit.
    assert_eq!(status, StatusCode::AlreadyExists);
    let local = client_b_dir.path().join("empty.txt");
    assert!(local.exists());
    assert_eq!(fs::metadata(&local).unwrap().len(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn chunk_boundary_sizes_round_trip() {
    let server_dir = TempDirGuard::new("e2e_chunks_server");
    let client_a_dir = TempDirGuard::new("e2e_chunks_a");
    let client_b_dir = TempDirGuard::new("e2e_chunks_b");
    let (_state, addr, _l, _cb) = spawn_server(server_dir.path()).await;

    // Exact multiple of CHUNK_SIZE - 1: no trailing empty frame needed.
    let chunk = api_model::protocol::CHUNK_SIZE - 1;
    let content: Vec<u8> = (0..chunk * 3).map(|i| (i % 251) as u8).collect();
    fs::write(client_a_dir.path().join("aligned.bin"), &content).unwrap();

    let a = node_for(client_a_dir.path(), addr, "client-a");
    let b = node_for(client_b_dir.path(), addr, "client-b");

    let status = blocking({
        let a = a.clone();
        move || a.store_file("aligned.bin")
    })
    .await
    .unwrap();
    assert_eq!(status, StatusCode::Ok);

    let status = blocking({
        let b = b.clone();
        move || b.fetch_file("aligned.bin")
    })
    .await
    .unwrap();
    assert_eq!(status, StatusCode::Ok);
    assert_eq!(
        fs::read(client_b_dir.path().join("aligned.bin")).unwrap(),
        content
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn write_lock_has_a_single_winner() {
    let server_dir = TempDirGuard::new("e2e_lock_server");
    let client_dir = TempDirGuard::new("e2e_lock_client");
    let (state, addr, _l, _cb) = spawn_server(server_dir.path()).await;

    fs::write(client_dir.path().join("b"), b"x").unwrap();
    let c1 = node_for(client_dir.path(), addr, "c1");
    let c2 = node_for(client_dir.path(), addr, "c2");

    // Two concurrent lock requests: exactly one OK.
    let (r1, r2) = tokio::join!(
        blocking({
            let c1 = c1.clone();
            move || c1.request_write_lock("b")
        }),
        blocking({
            let c2 = c2.clone();
            move || c2.request_write_lock("b")
        }),
    );
    let statuses = [r1.unwrap(), r2.unwrap()];
    let winners = statuses.iter().filter(|s| s.is_ok()).count();
    assert_eq!(winners, 1, "exactly one lock holder; got {:?}", statuses);
    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::Internal).count(),
        1,
        "the loser sees the server's internal denial: {:?}",
        statuses
    );

    // A store attempt by a third party is refused at the lock step.
    let c3 = node_for(client_dir.path(), addr, "c3");
    let status = blocking({
        let c3 = c3.clone();
        move || c3.store_file("b")
    })
    .await
    .unwrap();
    assert_eq!(status, StatusCode::ResourceExhausted);

    // Re-requesting a lock that is already held is refused, even for the
    // holder itself.
    let winner = if statuses[0].is_ok() { c1 } else { c2 };
    let status = blocking({
        let winner = winner.clone();
        move || winner.store_file("b")
    })
    .await
    .unwrap();
    assert_eq!(status, StatusCode::ResourceExhausted);

    // Once the grant is released, a fresh writer goes through.
    state.locks.release("b");
    let winner2 = node_for(client_dir.path(), addr, "c9");
    let status = blocking({
        let winner2 = winner2.clone();
        move || winner2.store_file("b")
    })
    .await
    .unwrap();
    assert_eq!(status, StatusCode::Ok);
    assert!(state.locks.is_empty());
    assert_eq!(fs::read(server_dir.path().join("b")).unwrap(), b"x");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn store_without_lock_is_refused_and_does_not_mutate() {
    use api_model::protocol::message::request_message::{RequestKind, RequestMessage};
    use api_model::protocol::message::response_message::ResponseKind;
    use api_model::protocol::models::store::StoreRequest;
    use api_model::protocol::protocol::Protocol;
    use client::conn::Connection;

    let server_dir = TempDirGuard::new("e2e_nolock_server");
    let (_state, addr, _l, _cb) = spawn_server(server_dir.path()).await;
    fs::write(server_dir.path().join("keep.txt"), b"original").unwrap();

    let status = blocking(move || {
        let mut conn = Connection::connect(addr, Duration::from_secs(5)).unwrap();
        let msg = RequestMessage::new(
            "rogue".into(),
            5000,
            RequestKind::Store(StoreRequest {
                name: "keep.txt".into(),
                mtime: 1,
                crc: 0x1234_5678,
                size: 4,
            }),
        );
        conn.send_message(&msg.serialize()).unwrap();
        match conn.read_response().unwrap().response {
            ResponseKind::Error(e) => e.status,
            other => panic!("expected error reply, got {:?}", other),
        }
    })
    .await;
    assert_eq!(status, StatusCode::Internal);
    assert_eq!(
        fs::read(server_dir.path().join("keep.txt")).unwrap(),
        b"original"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn delete_then_stat_reports_not_found() {
    let server_dir = TempDirGuard::new("e2e_delete_server");
    let client_dir = TempDirGuard::new("e2e_delete_client");
    let (state, addr, _l, _cb) = spawn_server(server_dir.path()).await;

    fs::write(server_dir.path().join("doomed.txt"), b"bye").unwrap();
    let node = node_for(client_dir.path(), addr, "c1");

    let (status, info) = blocking({
        let node = node.clone();
        move || node.delete_file("doomed.txt")
    })
    .await
    .unwrap();
    assert_eq!(status, StatusCode::Ok);
    let info = info.expect("delete reports prior metadata");
    assert_eq!(info.name, "doomed.txt");
    assert_eq!(info.file_size, 3);
    assert!(!server_dir.path().join("doomed.txt").exists());
    assert!(state.locks.is_empty(), "delete must release the write lock");

    let (status, info) = blocking({
        let node = node.clone();
        move || node.file_status("doomed.txt")
    })
    .await
    .unwrap();
    assert_eq!(status, StatusCode::NotFound);
    assert!(info.is_none());

    // Deleting a missing file also reports NotFound and drains the lock.
    let (status, _) = blocking({
        let node = node.clone();
        move || node.delete_file("doomed.txt")
    })
    .await
    .unwrap();
    assert_eq!(status, StatusCode::NotFound);
    assert!(state.locks.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn fetch_short_circuit_leaves_client_untouched() {
    let server_dir = TempDirGuard::new("e2e_s1_server");
    let client_dir = TempDirGuard::new("e2e_s1_client");
    let (_state, addr, _l, _cb) = spawn_server(server_dir.path()).await;

    fs::write(server_dir.path().join("a.txt"), b"hello").unwrap();
    set_mtime(&server_dir.path().join("a.txt"), 100);
    fs::write(client_dir.path().join("a.txt"), b"hello").unwrap();
    set_mtime(&client_dir.path().join("a.txt"), 50);

    let node = node_for(client_dir.path(), addr, "c1");
    let status = blocking({
        let node = node.clone();
        move || node.fetch_file("a.txt")
    })
    .await
    .unwrap();

    assert_eq!(status, StatusCode::AlreadyExists);
    assert_eq!(fs::read(client_dir.path().join("a.txt")).unwrap(), b"hello");
    // No touch in this direction: the server copy is the newer one.
    assert_eq!(mtime_of(&client_dir.path().join("a.txt")), 50);
    assert_eq!(mtime_of(&server_dir.path().join("a.txt")), 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn store_touch_only_advances_server_mtime() {
    let server_dir = TempDirGuard::new("e2e_s6_server");
    let client_dir = TempDirGuard::new("e2e_s6_client");
    let (state, addr, _l, _cb) = spawn_server(server_dir.path()).await;

    fs::write(server_dir.path().join("e.log"), b"same bytes").unwrap();
    set_mtime(&server_dir.path().join("e.log"), 100);
    fs::write(client_dir.path().join("e.log"), b"same bytes").unwrap();
    set_mtime(&client_dir.path().join("e.log"), 400);

    let node = node_for(client_dir.path(), addr, "c1");
    let status = blocking({
        let node = node.clone();
        move || node.store_file("e.log")
    })
    .await
    .unwrap();

    assert_eq!(status, StatusCode::AlreadyExists);
    assert_eq!(mtime_of(&server_dir.path().join("e.log")), 400);
    assert_eq!(
        fs::read(server_dir.path().join("e.log")).unwrap(),
        b"same bytes"
    );
    assert!(state.locks.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn deadline_mid_stream_releases_lock_and_leaves_no_torn_file() {
    use api_model::protocol::message::request_message::{RequestKind, RequestMessage};
    use api_model::protocol::message::response_message::ResponseKind;
    use api_model::protocol::models::store::StoreRequest;
    use api_model::protocol::protocol::Protocol;
    use client::conn::Connection;

    let server_dir = TempDirGuard::new("e2e_s3_server");
    let (state, addr, _l, _cb) = spawn_server(server_dir.path()).await;

    let locks = state.clone();
    let status = blocking(move || {
        let mut conn = Connection::connect(addr, Duration::from_secs(10)).unwrap();
        // Take the lock first, as a well-behaved writer would.
        locks.locks.try_acquire("big.bin", "slow-client").unwrap();

        let msg = RequestMessage::new(
            "slow-client".into(),
            200, // the transfer will outlive this deadline
            RequestKind::Store(StoreRequest {
                name: "big.bin".into(),
                mtime: 1,
                crc: 0xAAAA_BBBB,
                size: 1024 * 1024,
            }),
        );
        conn.send_message(&msg.serialize()).unwrap();
        match conn.read_response().unwrap().response {
            ResponseKind::StoreReady(_) => {}
            other => panic!("expected go-ahead, got {:?}", other),
        }
        // Send a token amount of data, then stall past the deadline.
        let mut partial = std::io::Cursor::new(vec![0x42u8; 1000]);
        conn.send_chunks(&mut partial, 1000).unwrap();
        std::thread::sleep(Duration::from_millis(600));
        match conn.read_response().unwrap().response {
            ResponseKind::Store(reply) => reply.status,
            other => panic!("expected final store reply, got {:?}", other),
        }
    })
    .await;

    assert_eq!(status, StatusCode::DeadlineExceeded);
    assert!(
        state.locks.owner("big.bin").is_none(),
        "lock table must not retain the entry"
    );
    assert!(
        !server_dir.path().join("big.bin").exists(),
        "no torn file under the canonical name"
    );
    // Staging leftovers are cleaned up too.
    let tmp = server_dir.path().join(".netdisc").join("tmp");
    if tmp.exists() {
        assert_eq!(fs::read_dir(&tmp).unwrap().count(), 0);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn list_and_callback_return_the_directory_snapshot() {
    let server_dir = TempDirGuard::new("e2e_list_server");
    let client_dir = TempDirGuard::new("e2e_list_client");
    let (_state, addr, _l, _cb) = spawn_server(server_dir.path()).await;

    fs::write(server_dir.path().join("one.txt"), b"1").unwrap();
    fs::write(server_dir.path().join("two.txt"), b"22").unwrap();
    fs::create_dir(server_dir.path().join("subdir")).unwrap();

    let node = node_for(client_dir.path(), addr, "c1");

    let (status, files) = blocking({
        let node = node.clone();
        move || node.list_files()
    })
    .await
    .unwrap();
    assert_eq!(status, StatusCode::Ok);
    let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["one.txt", "two.txt"]);
    assert_eq!(files[0].file_size, 1);
    assert_eq!(files[1].file_size, 2);

    // The long-poll callback is answered within the fallback tick with
    // the same snapshot.
    let (status, files) = blocking({
        let node = node.clone();
        move || node.callback_list("")
    })
    .await
    .unwrap();
    assert_eq!(status, StatusCode::Ok);
    assert_eq!(files.len(), 2);
}
