//! Local stand-in for the DigitalOcean API
//!
//! [`MockApi`] listens on an ephemeral port and answers scripted JSON
//! responses per (method, path). Every request is recorded so tests can
//! assert exactly what the real providers sent.

#![allow(dead_code)]

use serde_json::Value;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tellurian_core::config::{Credential, ProviderConfig};
use tellurian_core::resource::{DropletData, DropletProperties};
use tellurian_core::{OperationTracker, ResourceData, StateFile, StateRecord};
use tellurian_provider_digitalocean::DigitalOceanClient;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// A request as received by the mock
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub method: String,
    /// Path and query, e.g. `/v2/droplets?per_page=200&name=web-1`
    pub target: String,
    pub body: Option<Value>,
}

impl Recorded {
    /// `"METHOD target"`
    pub fn line(&self) -> String {
        format!("{} {}", self.method, self.target)
    }

    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or_default()
    }
}

struct Route {
    method: String,
    path: String,
    responses: VecDeque<(u16, String)>,
}

#[derive(Default)]
struct MockState {
    routes: Vec<Route>,
    requests: Vec<Recorded>,
}

impl MockState {
    fn respond(&mut self, method: &str, target: &str, body: &[u8]) -> (u16, String) {
        let path = target.split('?').next().unwrap_or_default().to_string();
        self.requests.push(Recorded {
            method: method.to_string(),
            target: target.to_string(),
            body: serde_json::from_slice(body).ok(),
        });

        let Some(route) = self
            .routes
            .iter_mut()
            .find(|r| r.method == method && r.path == path)
        else {
            return (404, r#"{"id":"not_found","message":"no such route"}"#.to_string());
        };

        // The last scripted response repeats
        if route.responses.len() > 1 {
            route.responses.pop_front().unwrap_or((500, String::new()))
        } else {
            route.responses.front().cloned().unwrap_or((500, String::new()))
        }
    }
}

/// Scripted HTTP server speaking just enough HTTP/1.1 for reqwest
pub struct MockApi {
    addr: SocketAddr,
    state: Arc<Mutex<MockState>>,
}

impl MockApi {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(MockState::default()));

        let shared = state.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = shared.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, state).await;
                });
            }
        });

        Self { addr, state }
    }

    /// Script a response; repeated calls for the same route queue up
    ///
    /// `path` is relative to the API base, e.g. `/droplets`.
    pub fn on(&self, method: &str, path: &str, status: u16, body: Value) -> &Self {
        let body = if body.is_null() {
            String::new()
        } else {
            body.to_string()
        };
        let full_path = format!("/v2{}", path);

        let mut state = self.state.lock().unwrap();
        match state
            .routes
            .iter_mut()
            .find(|r| r.method == method && r.path == full_path)
        {
            Some(route) => route.responses.push_back((status, body)),
            None => state.routes.push(Route {
                method: method.to_string(),
                path: full_path,
                responses: VecDeque::from([(status, body)]),
            }),
        }
        self
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/v2", self.addr)
    }

    pub fn config(&self) -> ProviderConfig {
        let mut config = ProviderConfig::new(Credential::new("DO_PAO", "dop_v1_test").unwrap());
        config.api_base_url = self.base_url();
        config
    }

    pub fn client(&self) -> DigitalOceanClient {
        DigitalOceanClient::new(&self.config()).unwrap()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Recorded requests as `"METHOD target"` lines
    pub fn lines(&self) -> Vec<String> {
        self.requests().iter().map(Recorded::line).collect()
    }

    /// Bodies of the requests sent to one route
    pub fn bodies(&self, method: &str, path: &str) -> Vec<Value> {
        let full_path = format!("/v2{}", path);
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path() == full_path)
            .filter_map(|r| r.body)
            .collect()
    }
}

async fn serve(stream: TcpStream, state: Arc<Mutex<MockState>>) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).await? == 0 {
        return Ok(());
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }

    let mut body = vec![0; content_length];
    reader.read_exact(&mut body).await?;

    let (status, payload) = state.lock().unwrap().respond(&method, &target, &body);

    let mut response = format!("HTTP/1.1 {} Mock\r\nConnection: close\r\n", status);
    if status != 204 {
        response.push_str(&format!(
            "Content-Type: application/json\r\nContent-Length: {}\r\n",
            payload.len()
        ));
    }
    response.push_str("\r\n");
    response.push_str(&payload);

    let mut stream = reader.into_inner();
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

/// Tracker with short real-time intervals
pub fn fast_tracker() -> OperationTracker {
    OperationTracker::new(Duration::from_millis(10), Duration::from_secs(5))
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn droplet_properties(name: &str, region: &str) -> DropletProperties {
    DropletProperties {
        name: name.to_string(),
        region: region.to_string(),
        size: "s-1vcpu-1gb".to_string(),
        image: "ubuntu-24-04-x64".to_string(),
        ssh_keys: Vec::new(),
        backups: false,
        ipv6: false,
        user_data: None,
        vpc_uuid: None,
        monitoring: false,
        volumes: Vec::new(),
        tags: Vec::new(),
    }
}

/// API representation of a droplet
pub fn droplet_json(id: u64, name: &str, region: &str, size: &str, image: &str) -> Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "status": "active",
        "region": { "slug": region },
        "size_slug": size,
        "image": { "id": 6918990, "slug": image },
        "networks": {
            "v4": [{ "ip_address": "203.0.113.20", "type": "public" }],
            "v6": []
        },
        "tags": []
    })
}

/// State that tracks one droplet under the given identifier
pub fn state_tracking(identifier: &str, id: u64, name: &str) -> StateFile {
    StateFile::from_records(vec![StateRecord::new(
        identifier,
        ResourceData::Droplet(DropletData {
            id,
            name: name.to_string(),
            region: "nyc3".to_string(),
            size: "s-1vcpu-1gb".to_string(),
            image: "ubuntu-24-04-x64".to_string(),
            public_ipv4: None,
            ipv6_enabled: false,
            tags: Vec::new(),
        }),
    )])
}
