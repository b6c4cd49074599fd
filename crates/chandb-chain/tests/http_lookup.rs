use chandb_chain::{ChainApiConfig, ChannelLookup, HttpChannelLookup, LookupError};
use chandb_wire::{Hash256, OutPoint};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

fn start_one_shot_server(
    status_line: &'static str,
    body: String,
    delay: Duration,
) -> (String, mpsc::Receiver<String>, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let (tx, rx) = mpsc::channel::<String>();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let mut buf = [0u8; 8192];
        let n = stream.read(&mut buf).unwrap_or(0);
        let _ = tx.send(String::from_utf8_lossy(&buf[..n]).to_string());

        thread::sleep(delay);
        let resp = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        // The client may already have given up.
        let _ = stream.write_all(resp.as_bytes());
    });

    (format!("http://{addr}/api"), rx, handle)
}

fn chan_point(index: u32) -> OutPoint {
    let mut txid = [0u8; 32];
    txid[0] = 0xaa;
    OutPoint::new(Hash256::new(txid), index)
}

fn client(base_url: String, timeout: Duration) -> HttpChannelLookup {
    HttpChannelLookup::new(ChainApiConfig::new(base_url).with_timeout(timeout)).unwrap()
}

#[test]
fn lookup_builds_short_channel_id_from_location_and_outpoint() {
    let body = serde_json::json!({ "success": true, "block_height": 500_000, "block_index": 12 }).to_string();
    let (url, rx, handle) = start_one_shot_server("200 OK", body, Duration::ZERO);

    let scid = client(url, Duration::from_secs(5)).lookup(&chan_point(1)).unwrap();
    handle.join().unwrap();

    assert_eq!(scid.block_height(), 500_000);
    assert_eq!(scid.tx_index(), 12);
    assert_eq!(scid.output_index(), 1);

    let request = rx.recv().unwrap();
    let expected_path = format!("GET /api/tx/{}{} ", "00".repeat(31), "aa");
    assert!(request.starts_with(&expected_path), "unexpected request: {request}");
}

#[test]
fn unsuccessful_response_is_remote_error() {
    let body = serde_json::json!({ "success": false, "error": "not found" }).to_string();
    let (url, _rx, handle) = start_one_shot_server("200 OK", body, Duration::ZERO);

    let err = client(url, Duration::from_secs(5)).lookup(&chan_point(0)).unwrap_err();
    handle.join().unwrap();

    assert!(matches!(err, LookupError::Remote { .. }), "got {err:?}");
}

#[test]
fn malformed_body_is_decode_error() {
    let (url, _rx, handle) = start_one_shot_server("200 OK", "{not json".to_string(), Duration::ZERO);

    let err = client(url, Duration::from_secs(5)).lookup(&chan_point(0)).unwrap_err();
    handle.join().unwrap();

    assert!(matches!(err, LookupError::Decode(_)), "got {err:?}");
}

#[test]
fn server_error_is_status_error() {
    let (url, _rx, handle) =
        start_one_shot_server("500 Internal Server Error", "{}".to_string(), Duration::ZERO);

    let err = client(url, Duration::from_secs(5)).lookup(&chan_point(0)).unwrap_err();
    handle.join().unwrap();

    assert!(matches!(err, LookupError::Status { status: 500, .. }), "got {err:?}");
}

#[test]
fn slow_server_hits_timeout() {
    let body = serde_json::json!({ "success": true, "block_height": 1, "block_index": 1 }).to_string();
    let (url, _rx, handle) = start_one_shot_server("200 OK", body, Duration::from_secs(2));

    let err = client(url, Duration::from_millis(200)).lookup(&chan_point(0)).unwrap_err();
    handle.join().unwrap();

    assert!(err.is_timeout(), "got {err:?}");
}

#[test]
fn output_index_above_u16_is_out_of_range() {
    let body = serde_json::json!({ "success": true, "block_height": 10, "block_index": 1 }).to_string();
    let (url, _rx, handle) = start_one_shot_server("200 OK", body, Duration::ZERO);

    let err = client(url, Duration::from_secs(5))
        .lookup(&chan_point(70_000))
        .unwrap_err();
    handle.join().unwrap();

    assert!(matches!(err, LookupError::OutOfRange(_)), "got {err:?}");
}
