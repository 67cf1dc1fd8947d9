use std::io;
use std::time::Duration;

use super::{ApiRequest, ApiResponse, Body, Transport, TransportError};

const USER_AGENT: &str = concat!("fieldops/", env!("CARGO_PKG_VERSION"));
const BOUNDARY: &str = "----fieldops-upload-7d1f3a";

/// Blocking HTTP transport over a shared `ureq` agent.
pub struct UreqTransport {
    agent: ureq::Agent,
    base_url: String,
}

impl UreqTransport {
    #[must_use]
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}

fn multipart(field: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 256);
    out.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    out.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    out.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    out.extend_from_slice(bytes);
    out.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    out
}

fn is_timeout(err: &ureq::Transport) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            if matches!(io_err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) {
                return true;
            }
        }
        source = cause.source();
    }
    err.to_string().contains("timed out")
}

/// A body that cannot be read in full is a transport failure, never an
/// empty success.
fn read_body(response: ureq::Response) -> Result<ApiResponse, TransportError> {
    let status = response.status();
    let body = response.into_string().map_err(|err| {
        tracing::warn!(status, "failed to read response body: {err}");
        body_error(&err)
    })?;
    Ok(ApiResponse { status, body })
}

fn body_error(err: &io::Error) -> TransportError {
    if matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) {
        TransportError::Timeout
    } else {
        TransportError::Network(format!("failed to read response body: {err}"))
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut call = self
            .agent
            .request(request.method.as_str(), &self.url(&request.path))
            .set("Accept", "application/json");
        for (key, value) in &request.query {
            call = call.query(key, value);
        }
        if let Some(token) = &request.token {
            call = call.set("Authorization", &format!("Bearer {token}"));
        }

        let result = match &request.body {
            Body::Empty => call.call(),
            Body::Json(value) => call.send_json(value),
            Body::Form(pairs) => {
                let borrowed: Vec<(&str, &str)> = pairs
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect();
                call.send_form(&borrowed)
            }
            Body::File {
                field,
                filename,
                content_type,
                bytes,
            } => call
                .set(
                    "Content-Type",
                    &format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .send_bytes(&multipart(field, filename, content_type, bytes)),
        };

        match result {
            Ok(response) | Err(ureq::Error::Status(_, response)) => read_body(response),
            Err(ureq::Error::Transport(err)) => {
                if is_timeout(&err) {
                    Err(TransportError::Timeout)
                } else {
                    Err(TransportError::Network(err.to_string()))
                }
            }
        }
    }
}
