//! E2E tests for login, logout, and how the saved token behaves when the
//! backend rejects it.
//!
//! Each test runs `fo` as a subprocess against an in-process stub backend
//! with its own temporary state directory.

mod support;

use serde_json::{Value, json};
use support::{StubServer, Workspace, not_found, stderr_error, stdout_json};

fn accepting_backend() -> StubServer {
    StubServer::start(|req| match (req.method.as_str(), req.path.as_str()) {
        ("POST", "/token") => (
            200,
            json!({"access_token": "tok-1", "token_type": "bearer", "must_change_password": false}),
        ),
        ("GET", "/tickets/dispatch/queue") => {
            if req.authorization.as_deref() == Some("Bearer tok-1") {
                (200, json!([]))
            } else {
                (401, json!({"detail": "Could not validate credentials"}))
            }
        }
        _ => not_found(),
    })
}

// ---------------------------------------------------------------------------
// login / logout
// ---------------------------------------------------------------------------

#[test]
fn login_saves_session_and_logout_removes_it() {
    let stub = accepting_backend();
    let ws = Workspace::new();

    let output = ws
        .fo(&stub.base_url)
        .args(["login", "-u", "dispatch@example.com", "--password", "pw"])
        .output()
        .expect("login should not crash");
    assert!(
        output.status.success(),
        "login failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let json = stdout_json(&output);
    assert_eq!(json["ok"], true);
    assert_eq!(json["username"], "dispatch@example.com");
    assert_eq!(json["token_type"], "bearer");
    assert_eq!(json["must_change_password"], false);

    let saved = std::fs::read_to_string(ws.session_path()).expect("session file");
    assert!(saved.contains("tok-1"), "token should be saved: {saved}");

    let token_requests = stub.requests_to("POST", "/token");
    assert_eq!(token_requests.len(), 1);
    assert!(token_requests[0].body.contains("password=pw"));
    assert!(token_requests[0].authorization.is_none());

    let output = ws
        .fo(&stub.base_url)
        .arg("logout")
        .output()
        .expect("logout should not crash");
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["removed"], true);
    assert!(!ws.session_path().exists());

    let output = ws
        .fo(&stub.base_url)
        .arg("logout")
        .output()
        .expect("second logout should not crash");
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["removed"], false);
}

#[test]
fn saved_session_is_sent_as_bearer_token() {
    let stub = accepting_backend();
    let ws = Workspace::new();
    ws.login(&stub.base_url);

    let output = ws
        .fo(&stub.base_url)
        .arg("queue")
        .output()
        .expect("queue should not crash");
    assert!(
        output.status.success(),
        "queue failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let queue = stub.requests_to("GET", "/tickets/dispatch/queue");
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].authorization.as_deref(), Some("Bearer tok-1"));
}

#[test]
fn bad_credentials_report_server_detail() {
    let stub = StubServer::start(|req| match req.path.as_str() {
        "/token" => (401, json!({"detail": "Incorrect email or password"})),
        _ => not_found(),
    });
    let ws = Workspace::new();

    let output = ws
        .fo(&stub.base_url)
        .args(["login", "-u", "dispatch@example.com", "--password", "nope"])
        .output()
        .expect("login should not crash");
    assert!(!output.status.success());

    let err = stderr_error(&output);
    assert_eq!(err["message"], "Incorrect email or password");
    assert_eq!(err["status"], 401);
    assert!(!ws.session_path().exists());
}

#[test]
fn login_without_password_source_fails() {
    let stub = accepting_backend();
    let ws = Workspace::new();

    // stdin is closed, so there is no line to read a password from
    let output = ws
        .fo(&stub.base_url)
        .args(["login", "-u", "dispatch@example.com"])
        .output()
        .expect("login should not crash");
    assert!(!output.status.success());
    assert!(stub.requests().is_empty(), "no request without a password");
}

// ---------------------------------------------------------------------------
// 401 handling
// ---------------------------------------------------------------------------

#[test]
fn unauthorized_clears_saved_session() {
    let stub = accepting_backend();
    let ws = Workspace::new();
    ws.login(&stub.base_url);

    // Replace the saved token with one the backend rejects.
    let saved = std::fs::read_to_string(ws.session_path()).expect("session file");
    std::fs::write(ws.session_path(), saved.replace("tok-1", "tok-expired")).expect("rewrite");

    let output = ws
        .fo(&stub.base_url)
        .arg("queue")
        .output()
        .expect("queue should not crash");
    assert!(!output.status.success());

    let err = stderr_error(&output);
    assert_eq!(err["error_code"], "E3001");
    assert_eq!(err["message"], "Unauthorized - please log in again");
    assert!(
        !ws.session_path().exists(),
        "a rejected saved session should be removed"
    );
}

#[test]
fn rejected_flag_token_keeps_saved_session() {
    let stub = accepting_backend();
    let ws = Workspace::new();
    ws.login(&stub.base_url);

    let output = ws
        .fo(&stub.base_url)
        .args(["queue", "--token", "someone-elses"])
        .output()
        .expect("queue should not crash");
    assert!(!output.status.success());
    assert_eq!(stderr_error(&output)["error_code"], "E3001");
    assert!(ws.session_path().exists(), "saved login must survive");
}

#[test]
fn env_token_is_used_without_session() {
    let stub = accepting_backend();
    let ws = Workspace::new();

    let output = ws
        .fo(&stub.base_url)
        .env("FIELDOPS_TOKEN", "tok-1")
        .arg("queue")
        .output()
        .expect("queue should not crash");
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["tickets"], Value::Array(Vec::new()));
}

#[test]
fn missing_token_fails_before_any_request() {
    let stub = accepting_backend();
    let ws = Workspace::new();

    let output = ws
        .fo(&stub.base_url)
        .arg("queue")
        .output()
        .expect("queue should not crash");
    assert!(!output.status.success());

    let err = stderr_error(&output);
    assert_eq!(err["error_code"], "E1002");
    assert!(
        err["suggestion"]
            .as_str()
            .is_some_and(|s| s.contains("fo login"))
    );
    assert!(stub.requests().is_empty());
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn malformed_config_is_reported_with_code() {
    let stub = accepting_backend();
    let ws = Workspace::new();
    std::fs::write(ws.config_path(), "[dispatch\nqueue_limit = ").expect("write config");

    let output = ws
        .fo(&stub.base_url)
        .arg("queue")
        .output()
        .expect("queue should not crash");
    assert!(!output.status.success());

    let err = stderr_error(&output);
    assert_eq!(err["error_code"], "E1001");
    assert!(
        err["message"]
            .as_str()
            .is_some_and(|m| m.contains("config.toml"))
    );
    assert!(stub.requests().is_empty());
}
