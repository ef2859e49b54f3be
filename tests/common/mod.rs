//! Shared utilities for integration tests: raw TCP HTTP mocks for the node
//! and the key management service.

#![allow(dead_code)]

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ed25519_dalek::Signer as _;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use tez_reveal::tezos::OperationHash;

pub const TEST_CHAIN_ID: &str = "NetXdQprcVkpaWU";
pub const TEST_BRANCH: &str = "BKiHSFY5yPf2ne3BSAWXhFKVfA7GUk484ACE9Rk2PNhS9BEYg2w";
pub const TEST_PROTOCOL: &str = "ProxfordYmVfjWnRcgjWH36fW6PArwqykTFzotUxRs6gmTcZDuH";
pub const TEST_ADDRESS: &str = "tz1Qr9uevaimfiPS6X1otehsKrwvZjX7bsyL";
pub const TEST_EDPK: &str = "edpkvRQaXJ26ZAFi2ZNq5Hb5wXcc3S1Q8kVaXNjxXDfmtWEp9DkpFZ";
pub const TEST_KEY_HANDLE: &str =
    "projects/p/locations/global/keyRings/r/cryptoKeys/k/cryptoKeyVersions/1";

/// SPKI form of the Ed25519 key with seed `[7; 32]`.
pub const ED25519_PEM: &str = "-----BEGIN PUBLIC KEY-----
MCowBQYDK2VwAyEA6kpsY+KcUgq+9VB7Ey7F+ZVHdq6+vnuSQh7qaRRG0iw=
-----END PUBLIC KEY-----
";

/// SPKI form of the secp256k1 key with secret scalar 1.
pub const SECP256K1_PEM: &str = "-----BEGIN PUBLIC KEY-----
MFYwEAYHKoZIzj0CAQYFK4EEAAoDQgAEeb5mfvncu6xVoGKVzocLBwKb/NstzijZ
WfKBWxb4F5hIOtp3JqPEZV2k+/wOEQio/Re0SKaFVBmcR9CP+xDUuA==
-----END PUBLIC KEY-----
";

/// A request as seen by a mock.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub method: String,
    /// Path including the query string.
    pub path: String,
    pub body: String,
}

/// Handle to a running mock.
pub struct MockServer {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<MockRequest>>>,
}

impl MockServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests whose path starts with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.path.starts_with(prefix))
            .count()
    }
}

/// Start a programmable mock. The handler returns `(status, body)`, or
/// `None` to close the connection without answering.
pub async fn start_programmable_backend<F>(handler: F) -> MockServer
where
    F: Fn(&MockRequest) -> Option<(u16, String)> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let handler = Arc::new(handler);

    let recorded = requests.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let handler = handler.clone();
                    let recorded = recorded.clone();
                    tokio::spawn(async move {
                        serve_one(socket, handler.as_ref(), &recorded).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    MockServer { addr, requests }
}

async fn serve_one<F>(mut socket: TcpStream, handler: &F, recorded: &Mutex<Vec<MockRequest>>)
where
    F: Fn(&MockRequest) -> Option<(u16, String)>,
{
    let Some(request) = read_request(&mut socket).await else {
        return;
    };
    recorded.lock().unwrap().push(request.clone());

    let Some((status, body)) = handler(&request) else {
        let _ = socket.shutdown().await;
        return;
    };
    let status_text = match status {
        200 => "200 OK",
        400 => "400 Bad Request",
        401 => "401 Unauthorized",
        403 => "403 Forbidden",
        404 => "404 Not Found",
        429 => "429 Too Many Requests",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_text,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

async fn read_request(socket: &mut TcpStream) -> Option<MockRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = buf.len().min(header_end + content_length);
    let body = String::from_utf8_lossy(&buf[header_end..body_end]).to_string();

    Some(MockRequest { method, path, body })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// An address nothing listens on.
pub async fn closed_port() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Behaviour of a mock node.
#[derive(Clone)]
pub struct NodeScript {
    pub chain_id: &'static str,
    /// Current counter; the operation should use this plus one.
    pub counter: u64,
    pub manager_key: Option<&'static str>,
    /// `None` answers like a node: with the hash of the injected bytes.
    pub injection: Option<(u16, String)>,
    /// Close the connection on injection without answering.
    pub drop_injection: bool,
}

impl Default for NodeScript {
    fn default() -> Self {
        Self {
            chain_id: TEST_CHAIN_ID,
            counter: 6,
            manager_key: None,
            injection: None,
            drop_injection: false,
        }
    }
}

pub async fn start_mock_node(script: NodeScript) -> MockServer {
    start_programmable_backend(move |req| node_response(&script, req)).await
}

fn node_response(script: &NodeScript, req: &MockRequest) -> Option<(u16, String)> {
    let path = req.path.as_str();
    let reply = match (req.method.as_str(), path) {
        ("GET", "/chains/main/chain_id") => (200, format!("\"{}\"", script.chain_id)),
        ("GET", "/chains/main/blocks/head~2/hash") => (200, format!("\"{}\"", TEST_BRANCH)),
        ("GET", "/chains/main/blocks/head/protocols") => (
            200,
            format!(
                r#"{{"protocol":"{p}","next_protocol":"{p}"}}"#,
                p = TEST_PROTOCOL
            ),
        ),
        ("GET", "/chains/main/mempool/filter") => (
            200,
            r#"{"minimal_fees":"100","minimal_nanotez_per_gas_unit":["100","1"],"minimal_nanotez_per_byte":["1000","1"]}"#
                .to_string(),
        ),
        ("GET", p) if p.ends_with("/manager_key") => match script.manager_key {
            Some(key) => (200, format!("\"{}\"", key)),
            None => (200, "null".to_string()),
        },
        ("GET", p) if p.ends_with("/counter") => (200, format!("\"{}\"", script.counter)),
        ("POST", "/injection/operation?chain=main") => {
            if script.drop_injection {
                return None;
            }
            match &script.injection {
                Some(reply) => reply.clone(),
                None => {
                    let hex_body: String = serde_json::from_str(&req.body).unwrap();
                    let bytes = hex::decode(hex_body).unwrap();
                    let hash = OperationHash::of_signed_bytes(&bytes);
                    (200, format!("\"{}\"", hash))
                }
            }
        }
        _ => (404, "[]".to_string()),
    };
    Some(reply)
}

/// Signed bytes the mock node received on injection.
pub fn injected_bytes(node: &MockServer) -> Vec<Vec<u8>> {
    node.requests()
        .iter()
        .filter(|r| r.method == "POST" && r.path.starts_with("/injection/operation"))
        .map(|r| {
            let hex_body: String = serde_json::from_str(&r.body).unwrap();
            hex::decode(hex_body).unwrap()
        })
        .collect()
}

pub fn test_signing_key() -> ed25519_dalek::SigningKey {
    ed25519_dalek::SigningKey::from_bytes(&[7u8; 32])
}

/// A KMS holding the Ed25519 test key under [`TEST_KEY_HANDLE`].
pub async fn start_mock_kms() -> MockServer {
    let public_key_path = format!("/{}/publicKey", TEST_KEY_HANDLE);
    let sign_path = format!("/{}:asymmetricSign", TEST_KEY_HANDLE);

    start_programmable_backend(move |req| {
        if req.method == "GET" && req.path == public_key_path {
            let body = serde_json::json!({ "pem": ED25519_PEM, "algorithm": "EC_SIGN_ED25519" });
            return Some((200, body.to_string()));
        }
        if req.method == "POST" && req.path == sign_path {
            let request: serde_json::Value = serde_json::from_str(&req.body).unwrap();
            let data = BASE64.decode(request["data"].as_str().unwrap()).unwrap();
            let signature = test_signing_key().sign(&data).to_bytes();
            let body = serde_json::json!({ "signature": BASE64.encode(signature) });
            return Some((200, body.to_string()));
        }
        Some((404, r#"{"error":{"code":404,"status":"NOT_FOUND"}}"#.to_string()))
    })
    .await
}
