#![allow(dead_code)]

//! Shared harness for the `fo` end-to-end tests: an in-process stub of the
//! ticketing backend plus a command builder with an isolated state dir.

use assert_cmd::Command;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;
use tiny_http::{Header, Response, Server, StatusCode};

/// One request as the stub saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: String,
    pub body: String,
    pub authorization: Option<String>,
}

impl Recorded {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("request body should be JSON")
    }

    pub fn query_has(&self, pair: &str) -> bool {
        self.query.split('&').any(|p| p == pair)
    }
}

type Handler = dyn Fn(&Recorded) -> (u16, Value) + Send + Sync;

/// Stub backend answering from a routing closure. Stops on drop.
pub struct StubServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl StubServer {
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&Recorded) -> (u16, Value) + Send + Sync + 'static,
    {
        let server = Server::http("127.0.0.1:0").expect("http server");
        let base_url = format!("http://{}", server.server_addr());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));
        let handler: Box<Handler> = Box::new(handler);

        let seen = Arc::clone(&requests);
        let stopping = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            while !stopping.load(Ordering::Relaxed) {
                let mut req = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };
                let (path, query) = match req.url().split_once('?') {
                    Some((p, q)) => (p.to_string(), q.to_string()),
                    None => (req.url().to_string(), String::new()),
                };
                let mut body = String::new();
                let _ = req.as_reader().read_to_string(&mut body);
                let authorization = req
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Authorization"))
                    .map(|h| h.value.as_str().to_string());
                let recorded = Recorded {
                    method: req.method().as_str().to_string(),
                    path,
                    query,
                    body,
                    authorization,
                };

                let (status, reply) = handler(&recorded);
                seen.lock().expect("request log").push(recorded);

                let content_type =
                    Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .expect("content-type header");
                let _ = req.respond(
                    Response::from_string(reply.to_string())
                        .with_status_code(StatusCode(status))
                        .with_header(content_type),
                );
            }
        });

        Self {
            base_url,
            requests,
            stop,
            handle: Some(handle),
        }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().expect("request log").clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Isolated state and config locations for one test.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("tempdir"),
        }
    }

    pub fn state_dir(&self) -> PathBuf {
        self.dir.path().join("state")
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    pub fn session_path(&self) -> PathBuf {
        self.state_dir().join("session.toml")
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// `fo` pointed at `base_url`, JSON output, quiet logs, no ambient
    /// credentials from the developer's environment.
    pub fn fo(&self, base_url: &str) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fo"));
        cmd.current_dir(self.dir.path());
        cmd.env("FIELDOPS_LOG", "error");
        cmd.env("FIELDOPS_STATE_DIR", self.state_dir());
        cmd.env("FIELDOPS_CONFIG", self.config_path());
        for var in [
            "FORMAT",
            "DEBUG",
            "FIELDOPS_TOKEN",
            "FIELDOPS_PASSWORD",
            "FIELDOPS_API_URL",
            "FIELDOPS_TIMEOUT_SECS",
        ] {
            cmd.env_remove(var);
        }
        cmd.args(["--api-url", base_url, "--format", "json"]);
        cmd
    }

    /// Log in against a stub that accepts any credentials with `token`.
    pub fn login(&self, base_url: &str) {
        let output = self
            .fo(base_url)
            .args(["login", "-u", "dispatch@example.com", "--password", "pw"])
            .output()
            .expect("login should not crash");
        assert!(
            output.status.success(),
            "login failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

/// Parse stdout of a finished command as JSON.
pub fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
        panic!(
            "stdout should be JSON ({err}): {}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

/// Parse the `{"error": {...}}` object a failed command writes to stderr.
pub fn stderr_error(output: &std::process::Output) -> Value {
    let parsed: Value = serde_json::from_slice(&output.stderr).unwrap_or_else(|err| {
        panic!(
            "stderr should be JSON ({err}): {}",
            String::from_utf8_lossy(&output.stderr)
        )
    });
    parsed["error"].clone()
}

pub fn not_found() -> (u16, Value) {
    (404, serde_json::json!({"detail": "Not Found"}))
}
