//! In-process stand-in for the CoWIN API.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::cowin_client::{ClientConfig, CowinClient};

#[derive(Default)]
struct Routes {
    responses: HashMap<String, VecDeque<(u16, String)>>,
    requests: Vec<String>,
}

impl Routes {
    /// Queued responses are served in order; the last one repeats forever.
    fn next_response(&mut self, path: &str) -> (u16, String) {
        match self.responses.get_mut(path) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap(),
            None => (404, r#"{"message": "not found"}"#.to_string()),
        }
    }
}

/// Serves canned responses keyed by request path (without query string).
pub(crate) struct FakeUpstream {
    base_url: String,
    routes: Arc<Mutex<Routes>>,
}

impl FakeUpstream {
    pub(crate) async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes = Arc::new(Mutex::new(Routes::default()));

        let server_routes = routes.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let routes = server_routes.clone();
                tokio::spawn(async move {
                    let mut head = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => head.extend_from_slice(&chunk[..n]),
                        }
                    }
                    let head = String::from_utf8_lossy(&head).to_string();
                    let target = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                    let path = target.split('?').next().unwrap_or("/");
                    let path = path.strip_prefix("/api").unwrap_or(path).to_string();

                    let (status, body) = {
                        let mut routes = routes.lock().unwrap();
                        routes.requests.push(head.trim_end().to_string());
                        routes.next_response(&path)
                    };

                    let response = format!(
                        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        reason(status),
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self {
            base_url: format!("http://{}/api", addr),
            routes,
        }
    }

    /// Queue a response for `path`.
    pub(crate) fn respond(self, path: &str, status: u16, body: &str) -> Self {
        self.routes
            .lock()
            .unwrap()
            .responses
            .entry(path.to_string())
            .or_default()
            .push_back((status, body.to_string()));
        self
    }

    pub(crate) fn client(&self) -> CowinClient {
        CowinClient::with_config(ClientConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(5),
            use_system_proxy: false,
        })
        .unwrap()
    }

    /// Request heads received so far, oldest first.
    pub(crate) fn requests(&self) -> Vec<String> {
        self.routes.lock().unwrap().requests.clone()
    }

    /// Number of requests whose path starts with `path`.
    pub(crate) fn hits(&self, path: &str) -> usize {
        let prefix = format!("GET /api{}", path);
        self.requests()
            .iter()
            .filter(|head| head.starts_with(&prefix))
            .count()
    }
}

/// A base URL nothing is listening on.
pub(crate) async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/api", addr)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

pub(crate) mod fixtures {
    /// One free and one paid center, each with a session open to 18+.
    pub(crate) const TWO_CENTERS: &str = r#"{
        "centers": [
            {
                "center_id": 1201,
                "name": "Civil Hospital",
                "state_name": "Maharashtra",
                "district_name": "Pune",
                "block_name": "Haveli",
                "pincode": 411001,
                "from": "09:00:00",
                "to": "17:00:00",
                "fee_type": "Free",
                "sessions": [
                    {
                        "session_id": "a1b2",
                        "date": "03-05-2021",
                        "available_capacity": 5,
                        "available_capacity_dose1": 3,
                        "available_capacity_dose2": 2,
                        "min_age_limit": 18,
                        "vaccine": "COVISHIELD",
                        "slots": ["09:00AM-11:00AM"]
                    }
                ]
            },
            {
                "center_id": 1202,
                "name": "Ruby Hall Clinic",
                "state_name": "Maharashtra",
                "district_name": "Pune",
                "block_name": "Pune City",
                "pincode": 411001,
                "fee_type": "Paid",
                "vaccine_fees": [{"vaccine": "COVAXIN", "fee": "780"}],
                "sessions": [
                    {
                        "session_id": "c3d4",
                        "date": "04-05-2021",
                        "available_capacity": 12.0,
                        "available_capacity_dose1": 10.0,
                        "available_capacity_dose2": 2.0,
                        "min_age_limit": 18,
                        "vaccine": "COVAXIN",
                        "slots": ["10:00AM-12:00PM", "12:00PM-02:00PM"]
                    }
                ]
            }
        ]
    }"#;

    /// Centers with nothing bookable.
    pub(crate) const NO_CAPACITY: &str = r#"{
        "centers": [
            {
                "center_id": 1301,
                "name": "Sassoon Hospital",
                "state_name": "Maharashtra",
                "district_name": "Pune",
                "block_name": "Haveli",
                "pincode": 411001,
                "fee_type": "Free",
                "sessions": [
                    {
                        "session_id": "e5f6",
                        "date": "03-05-2021",
                        "available_capacity": 0,
                        "available_capacity_dose1": 0,
                        "available_capacity_dose2": 0,
                        "min_age_limit": 18,
                        "vaccine": "COVISHIELD",
                        "slots": ["09:00AM-11:00AM"]
                    }
                ]
            }
        ]
    }"#;

    pub(crate) const STATES: &str = r#"{
        "states": [
            {"state_id": 16, "state_name": "Karnataka"},
            {"state_id": 21, "state_name": "Maharashtra"}
        ],
        "ttl": 24
    }"#;

    pub(crate) const MAHARASHTRA_DISTRICTS: &str = r#"{
        "districts": [
            {"district_id": 395, "district_name": "Mumbai"},
            {"district_id": 363, "district_name": "Pune"}
        ],
        "ttl": 24
    }"#;
}
