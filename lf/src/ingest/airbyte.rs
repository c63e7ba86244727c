//! Airbyte API client
//!
//! Implements HealthProbe and Ingestor against the Airbyte config API
//! (`/health`, `/connections/sync`, `/jobs/get`).

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::{HealthProbe, IngestError, Ingestor, JobStatus};
use crate::config::IngestionConfig;

/// HTTP client for an Airbyte server
pub struct AirbyteClient {
    base_url: String,
    http: Client,
    request_timeout: Duration,
    health_timeout: Duration,
}

impl AirbyteClient {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration, health_timeout: Duration) -> Result<Self, IngestError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(%base_url, ?request_timeout, ?health_timeout, "AirbyteClient::new: called");
        let http = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            base_url,
            http,
            request_timeout,
            health_timeout,
        })
    }

    pub fn from_config(config: &IngestionConfig) -> Result<Self, IngestError> {
        Self::new(config.base_url.clone(), config.request_timeout(), config.health_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<Value, IngestError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, %body, "AirbyteClient::post_json: called");
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.request_timeout))?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            debug!(%status, %message, "AirbyteClient::post_json: API error");
            return Err(IngestError::Api { status, message });
        }
        Ok(response.json().await?)
    }
}

fn transport_error(e: reqwest::Error, timeout: Duration) -> IngestError {
    if e.is_timeout() {
        IngestError::Timeout(timeout)
    } else {
        IngestError::Network(e)
    }
}

/// Extract `job.id`, which Airbyte returns as a number
fn parse_job_id(body: &Value) -> Result<String, IngestError> {
    match &body["job"]["id"] {
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) if !s.is_empty() => Ok(s.clone()),
        other => Err(IngestError::InvalidResponse(format!("missing job.id in response: {}", other))),
    }
}

fn parse_job_status(body: &Value) -> Result<JobStatus, IngestError> {
    body["job"]["status"]
        .as_str()
        .map(JobStatus::parse)
        .ok_or_else(|| IngestError::InvalidResponse("missing job.status in response".to_string()))
}

/// Numeric ids go back as numbers, anything else as a string
fn job_id_value(job_id: &str) -> Value {
    job_id
        .parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(job_id))
}

#[async_trait]
impl HealthProbe for AirbyteClient {
    async fn check(&self) -> Result<bool, IngestError> {
        let url = format!("{}/health", self.base_url);
        debug!(%url, "AirbyteClient::check: called");
        let response = self
            .http
            .get(&url)
            .timeout(self.health_timeout)
            .send()
            .await
            .map_err(|e| transport_error(e, self.health_timeout))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            warn!(%status, "Health endpoint returned an error status");
            return Err(IngestError::Api {
                status,
                message: response.text().await.unwrap_or_default(),
            });
        }
        let body: Value = response.json().await?;
        let available = body["available"].as_bool().unwrap_or(false);
        debug!(available, "AirbyteClient::check: parsed health");
        Ok(available)
    }
}

#[async_trait]
impl Ingestor for AirbyteClient {
    async fn trigger(&self, source_id: &str) -> Result<String, IngestError> {
        debug!(%source_id, "AirbyteClient::trigger: called");
        let body = self
            .post_json("/connections/sync", serde_json::json!({ "connectionId": source_id }))
            .await?;
        parse_job_id(&body)
    }

    async fn poll_status(&self, job_id: &str) -> Result<JobStatus, IngestError> {
        debug!(%job_id, "AirbyteClient::poll_status: called");
        let body = self
            .post_json("/jobs/get", serde_json::json!({ "id": job_id_value(job_id) }))
            .await?;
        parse_job_status(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Canned reply for requests whose path ends with `suffix`
    struct Route {
        suffix: &'static str,
        status: u16,
        body: String,
    }

    fn route(suffix: &'static str, status: u16, body: serde_json::Value) -> Route {
        Route {
            suffix,
            status,
            body: body.to_string(),
        }
    }

    /// Minimal HTTP/1.1 server answering from `routes`; returns the API base URL
    /// and the recorded `(path, body)` of each request
    async fn serve(routes: Vec<Route>) -> (String, Arc<Mutex<Vec<(String, String)>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();
        let routes = Arc::new(routes);

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let routes = routes.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    handle(stream, &routes, &recorded).await;
                });
            }
        });

        (format!("http://{}/api/v1", addr), requests)
    }

    async fn handle(mut stream: TcpStream, routes: &[Route], recorded: &Mutex<Vec<(String, String)>>) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            let n = stream.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let content_length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = stream.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        let path = head.split_whitespace().nth(1).unwrap_or_default().to_string();
        let body = String::from_utf8_lossy(&buf[header_end..]).to_string();
        recorded.lock().unwrap().push((path.clone(), body));

        let (status, reply) = routes
            .iter()
            .find(|r| path.ends_with(r.suffix))
            .map(|r| (r.status, r.body.clone()))
            .unwrap_or((404, "{}".to_string()));
        let response = format!(
            "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            reply.len(),
            reply
        );
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;
    }

    fn client(base_url: &str) -> AirbyteClient {
        AirbyteClient::new(base_url, Duration::from_secs(5), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_health_parses_available_flag() {
        let (url, _) = serve(vec![route("/health", 200, json!({"available": true}))]).await;
        assert!(client(&url).check().await.unwrap());

        let (url, _) = serve(vec![route("/health", 200, json!({"available": false}))]).await;
        assert!(!client(&url).check().await.unwrap());

        let (url, _) = serve(vec![route("/health", 200, json!({}))]).await;
        assert!(!client(&url).check().await.unwrap());
    }

    #[tokio::test]
    async fn test_health_error_status_is_api_error() {
        let (url, _) = serve(vec![route("/health", 503, json!({"message": "down"}))]).await;
        let err = client(&url).check().await.unwrap_err();
        assert!(matches!(err, IngestError::Api { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_trigger_and_poll_round_trip() {
        let (url, requests) = serve(vec![
            route("/connections/sync", 200, json!({"job": {"id": 42, "status": "pending"}})),
            route("/jobs/get", 200, json!({"job": {"id": 42, "status": "succeeded"}})),
        ])
        .await;
        let client = client(&url);

        let job_id = client.trigger("facebook-ads-connection").await.unwrap();
        assert_eq!(job_id, "42");
        let status = client.poll_status(&job_id).await.unwrap();
        assert_eq!(status, JobStatus::Succeeded);

        let requests = requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].0, "/api/v1/connections/sync");
        let trigger_body: Value = serde_json::from_str(&requests[0].1).unwrap();
        assert_eq!(trigger_body, json!({"connectionId": "facebook-ads-connection"}));
        assert_eq!(requests[1].0, "/api/v1/jobs/get");
        let poll_body: Value = serde_json::from_str(&requests[1].1).unwrap();
        assert_eq!(poll_body, json!({"id": 42}));
    }

    #[tokio::test]
    async fn test_non_success_status_is_api_error() {
        let (url, _) = serve(vec![route("/connections/sync", 404, json!({"message": "unknown connection"}))]).await;
        let err = client(&url).trigger("missing-connection").await.unwrap_err();
        match err {
            IngestError::Api { status, message } => {
                assert_eq!(status, 404);
                assert!(message.contains("unknown connection"));
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_status_is_invalid_response() {
        let (url, _) = serve(vec![route("/jobs/get", 200, json!({"job": {"id": 7}}))]).await;
        let err = client(&url).poll_status("7").await.unwrap_err();
        assert!(matches!(err, IngestError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_unresponsive_server_is_timeout() {
        // Connections queue in the backlog but are never answered
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/api/v1", listener.local_addr().unwrap());
        let client = AirbyteClient::new(url, Duration::from_millis(100), Duration::from_millis(100)).unwrap();

        assert!(matches!(client.check().await, Err(IngestError::Timeout(_))));
        assert!(matches!(client.poll_status("1").await, Err(IngestError::Timeout(_))));
        drop(listener);
    }

    #[test]
    fn test_parse_job_id() {
        assert_eq!(parse_job_id(&json!({"job": {"id": 1234, "status": "running"}})).unwrap(), "1234");
        assert_eq!(parse_job_id(&json!({"job": {"id": "abc"}})).unwrap(), "abc");
        assert!(matches!(
            parse_job_id(&json!({"job": {}})),
            Err(IngestError::InvalidResponse(_))
        ));
        assert!(parse_job_id(&json!({"job": {"id": ""}})).is_err());
    }

    #[test]
    fn test_parse_job_status() {
        assert_eq!(
            parse_job_status(&json!({"job": {"status": "succeeded"}})).unwrap(),
            JobStatus::Succeeded
        );
        assert_eq!(
            parse_job_status(&json!({"job": {"status": "incomplete"}})).unwrap(),
            JobStatus::Running
        );
        assert!(parse_job_status(&json!({"attempts": []})).is_err());
    }

    #[test]
    fn test_job_id_value() {
        assert_eq!(job_id_value("42"), json!(42));
        assert_eq!(job_id_value("job-42"), json!("job-42"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = AirbyteClient::new(
            "http://localhost:8001/api/v1/",
            Duration::from_secs(1),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.base_url(), "http://localhost:8001/api/v1");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let client = AirbyteClient::new("http://127.0.0.1:1/api/v1", Duration::from_secs(2), Duration::from_secs(2)).unwrap();

        let health = client.check().await;
        assert!(matches!(health, Err(IngestError::Network(_))));

        let trigger = client.trigger("facebook-ads-connection").await;
        assert!(matches!(trigger, Err(IngestError::Network(_))));
    }
}
