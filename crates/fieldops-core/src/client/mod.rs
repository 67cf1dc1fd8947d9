//! Typed client for the field-ops REST backend.
//!
//! All calls go through [`ApiClient::send`], which classifies failures into
//! [`ApiError`], raises at most one operator notification per throttle
//! window, and drops the session on 401. Callers still get the `Err` back and
//! decide locally what to do with it.
//!
//! The wire is abstracted behind [`Transport`] so the workflow logic can be
//! exercised without a server.

pub mod http;

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::company::{self, RosterPlan};
use crate::concurrency::{self, VersionGuard};
use crate::error::{ApiError, ErrorCode};
use crate::fanout::{BulkOutcome, BulkReport, DEFAULT_FANOUT_LIMIT, run_bounded};
use crate::filter::TicketListFilter;
use crate::form::{self, FormData};
use crate::model::{Resource, Ticket, WorkflowSummary, path_segment};
use crate::notify::{Notifier, ThrottledNotifier, TracingNotifier};
use crate::session::SessionStore;
use crate::shipment::{self, ShipmentUpdatePlan};
use crate::workflow::{Queue, TransitionRequest};

pub use http::UreqTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(Value),
    /// `application/x-www-form-urlencoded`.
    Form(Vec<(String, String)>),
    /// Single-file `multipart/form-data` upload.
    File {
        field: String,
        filename: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Body,
    pub token: Option<String>,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: Body::Empty,
            token: None,
        }
    }

    #[must_use]
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn queries(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Body::Json(body);
        self
    }

    #[must_use]
    pub fn body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// Query value by key, for assertions and logging.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Failures below HTTP: nothing came back from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    Timeout,
    Network(String),
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => Self::Timeout,
            TransportError::Network(reason) => Self::Network { reason },
        }
    }
}

/// Executes one HTTP exchange. Non-2xx statuses are responses, not errors.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// Human message for a FastAPI-style `detail` value.
///
/// Strings pass through, objects contribute their `message`, anything else
/// is rendered as compact JSON.
#[must_use]
pub fn detail_message(detail: &Value) -> String {
    match detail {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("message").and_then(Value::as_str) {
            Some(message) => message.to_string(),
            None => detail.to_string(),
        },
        other => other.to_string(),
    }
}

fn validation_message(detail: &Value) -> String {
    match detail {
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .map(|item| {
                    let loc = item
                        .get("loc")
                        .and_then(Value::as_array)
                        .map(|loc| {
                            loc.iter()
                                .map(|part| match part {
                                    Value::String(s) => s.clone(),
                                    other => other.to_string(),
                                })
                                .collect::<Vec<_>>()
                                .join(".")
                        })
                        .filter(|joined| !joined.is_empty())
                        .unwrap_or_else(|| "field".to_string());
                    let msg = item.get("msg").and_then(Value::as_str).unwrap_or("invalid");
                    format!("{loc}: {msg}")
                })
                .collect();
            format!("Validation error: {}", parts.join(", "))
        }
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("msg")
            .and_then(Value::as_str)
            .map_or_else(|| "Validation error".to_string(), str::to_string),
        _ => "Validation error".to_string(),
    }
}

/// Map a non-2xx response to the error taxonomy.
#[must_use]
pub fn classify(status: u16, body: &str) -> ApiError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let detail = parsed.as_ref().and_then(|v| v.get("detail")).cloned();

    match status {
        401 => ApiError::Unauthorized,
        404 => ApiError::NotFound {
            detail: detail
                .as_ref()
                .map_or_else(|| "Resource not found".to_string(), detail_message),
        },
        409 => {
            let version = |key: &str| {
                detail
                    .as_ref()
                    .and_then(|d| d.get(key))
                    .and_then(Value::as_i64)
            };
            ApiError::Conflict {
                message: detail
                    .as_ref()
                    .map_or_else(|| "Ticket version conflict".to_string(), detail_message),
                current_version: version("current_ticket_version"),
                expected_version: version("expected_ticket_version"),
            }
        }
        422 => {
            let source = detail.or(parsed).unwrap_or(Value::Null);
            ApiError::Validation {
                message: validation_message(&source),
            }
        }
        _ => {
            let text = match detail {
                Some(d) => detail_message(&d),
                None if !body.trim().is_empty() && parsed.is_none() => body.trim().to_string(),
                None => format!("Request failed with status code {status}"),
            };
            ApiError::Http {
                status,
                detail: text,
            }
        }
    }
}

/// Response of `POST /token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "bearer")]
    pub token_type: String,
    #[serde(default)]
    pub must_change_password: bool,
}

fn bearer() -> String {
    "bearer".to_string()
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    #[serde(default)]
    count: u64,
}

/// One page of the ticket list plus the numbers shown in its header.
#[derive(Debug, Clone, Serialize)]
pub struct TicketPage {
    pub tickets: Vec<Ticket>,
    pub total: u64,
    pub archived: u64,
}

/// Ticket detail view: the ticket and its related records.
#[derive(Debug, Clone, Serialize)]
pub struct TicketDetail {
    pub ticket: Ticket,
    pub comments: Vec<Value>,
    pub time_entries: Vec<Value>,
    pub shipments: Vec<Value>,
    pub tasks: Vec<Value>,
}

/// Post-transition quick actions from the ticket detail screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuickAction {
    CheckIn,
    CheckOut,
    Complete,
    Claim { claimed_by: Option<String> },
}

impl QuickAction {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::CheckIn => "check-in",
            Self::CheckOut => "check-out",
            Self::Complete => "complete",
            Self::Claim { .. } => "claim",
        }
    }

    fn request(&self, ticket_id: &str) -> ApiRequest {
        match self {
            Self::CheckIn => ApiRequest::new(Method::Put, format!("/tickets/{ticket_id}/check-in"))
                .json(Value::Object(Map::new())),
            Self::CheckOut => {
                ApiRequest::new(Method::Put, format!("/tickets/{ticket_id}/check-out"))
                    .json(Value::Object(Map::new()))
            }
            Self::Complete => ApiRequest::new(Method::Patch, format!("/tickets/{ticket_id}/status"))
                .json(serde_json::json!({ "status": "completed" })),
            Self::Claim { claimed_by } => {
                let mut body = Map::new();
                if let Some(user) = claimed_by {
                    body.insert("claimed_by".into(), Value::from(user.as_str()));
                }
                ApiRequest::new(Method::Put, format!("/tickets/{ticket_id}/claim"))
                    .json(Value::Object(body))
            }
        }
    }
}

/// Result of a company save: the stored company and per-technician outcomes.
#[derive(Debug, Clone, Serialize)]
pub struct CompanySaveReport {
    pub company: FormData,
    pub created: bool,
    pub deleted_techs: usize,
    pub techs: BulkReport,
}

pub struct ApiClient<T> {
    transport: T,
    token: Mutex<Option<String>>,
    notifier: Arc<dyn Notifier>,
    session: Option<SessionStore>,
    fanout_limit: usize,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            token: Mutex::new(None),
            notifier: Arc::new(ThrottledNotifier::new(TracingNotifier)),
            session: None,
            fanout_limit: DEFAULT_FANOUT_LIMIT,
        }
    }

    #[must_use]
    pub fn with_token(self, token: Option<String>) -> Self {
        self.set_token(token);
        self
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Session store cleared when the backend answers 401.
    #[must_use]
    pub fn with_session_store(mut self, store: SessionStore) -> Self {
        self.session = Some(store);
        self
    }

    #[must_use]
    pub fn with_fanout_limit(mut self, limit: usize) -> Self {
        self.fanout_limit = limit.max(1);
        self
    }

    pub const fn transport(&self) -> &T {
        &self.transport
    }

    pub fn token(&self) -> Option<String> {
        self.token.lock().ok().and_then(|t| t.clone())
    }

    pub fn set_token(&self, token: Option<String>) {
        if let Ok(mut slot) = self.token.lock() {
            *slot = token;
        }
    }

    fn exchange(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        request.token = self.token();
        debug!(method = request.method.as_str(), path = %request.path, "request");
        let response = self.transport.execute(&request)?;
        debug!(status = response.status, path = %request.path, "response");
        Ok(response)
    }

    /// The single request wrapper every endpoint goes through.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`] after it has been reported.
    pub fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        self.send_with(request, |err| err)
    }

    /// [`Self::send`] with an endpoint-specific rewrite applied to the error
    /// before it is reported, so the notification and the returned error agree.
    fn send_with(
        &self,
        request: ApiRequest,
        rewrite: impl FnOnce(ApiError) -> ApiError,
    ) -> Result<Value, ApiError> {
        let path = request.path.clone();
        let outcome = self.exchange(request).and_then(|response| {
            if !response.is_success() {
                return Err(classify(response.status, &response.body));
            }
            if response.body.trim().is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(&response.body).map_err(|err| ApiError::Decode {
                path: path.clone(),
                reason: err.to_string(),
            })
        });

        outcome.map_err(rewrite).inspect_err(|err| self.report(&path, err))
    }

    fn report(&self, path: &str, err: &ApiError) {
        debug!(path, code = err.error_code().code(), status = ?err.status(), "request failed: {err}");
        if matches!(err, ApiError::Unauthorized) {
            self.force_logout();
        }
        if err.is_notifiable() {
            self.notifier.error(&err.to_string());
        }
    }

    fn force_logout(&self) {
        self.set_token(None);
        if let Some(store) = &self.session {
            if let Err(err) = store.clear() {
                warn!("failed to clear session after 401: {err:#}");
            }
        }
    }

    fn send_as<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R, ApiError> {
        let path = request.path.clone();
        let value = self.send(request)?;
        decode(&path, value)
    }

    fn send_list(&self, request: ApiRequest) -> Result<Vec<Value>, ApiError> {
        match self.send(request)? {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            other => Ok(vec![other]),
        }
    }

    // -- auth ----------------------------------------------------------------

    /// Exchange credentials for a bearer token and keep it on the client.
    ///
    /// # Errors
    ///
    /// Bad credentials surface as [`ApiError::Http`] with status 401 and the
    /// server's detail; they do not count as a forced logout.
    pub fn login(&self, username: &str, password: &str) -> Result<TokenResponse, ApiError> {
        let request = ApiRequest::new(Method::Post, "/token").body(Body::Form(vec![
            ("username".to_string(), username.to_string()),
            ("password".to_string(), password.to_string()),
        ]));
        let response = self.exchange(request)?;
        if !response.is_success() {
            let err = match classify(response.status, &response.body) {
                ApiError::Unauthorized => {
                    let detail = serde_json::from_str::<Value>(&response.body)
                        .ok()
                        .and_then(|v| v.get("detail").map(detail_message))
                        .unwrap_or_else(|| "Incorrect email or password".to_string());
                    ApiError::Http { status: 401, detail }
                }
                other => other,
            };
            return Err(err);
        }
        let value: Value =
            serde_json::from_str(&response.body).map_err(|err| ApiError::Decode {
                path: "/token".to_string(),
                reason: err.to_string(),
            })?;
        let token: TokenResponse = decode("/token", value)?;
        self.set_token(Some(token.access_token.clone()));
        info!(username, "logged in");
        Ok(token)
    }

    // -- tickets -------------------------------------------------------------

    pub fn dispatch_queue(&self, queue: Queue, limit: u32, skip: u32) -> Result<Vec<Ticket>, ApiError> {
        self.send_as(
            ApiRequest::new(Method::Get, "/tickets/dispatch/queue")
                .query("queue", queue.as_str())
                .query("limit", limit)
                .query("skip", skip),
        )
    }

    pub fn get_ticket(&self, ticket_id: &str) -> Result<Ticket, ApiError> {
        self.send_as(ApiRequest::new(Method::Get, format!("/tickets/{ticket_id}")))
    }

    /// The ticket as an untyped object, for edit round-trips.
    pub fn get_ticket_raw(&self, ticket_id: &str) -> Result<FormData, ApiError> {
        self.send_as(ApiRequest::new(Method::Get, format!("/tickets/{ticket_id}")))
    }

    pub fn list_tickets(
        &self,
        filter: &TicketListFilter,
        limit: u32,
        skip: u32,
    ) -> Result<Vec<Ticket>, ApiError> {
        self.send_as(
            ApiRequest::new(Method::Get, "/tickets/")
                .queries(filter.to_query())
                .query("limit", limit)
                .query("skip", skip),
        )
    }

    pub fn count_tickets(&self, filter: &TicketListFilter) -> Result<u64, ApiError> {
        let count: CountResponse = self.send_as(
            ApiRequest::new(Method::Get, "/tickets/count").queries(filter.to_query()),
        )?;
        Ok(count.count)
    }

    /// List page with header totals. The active view subtracts archived
    /// tickets from the server total and hides archived rows.
    pub fn ticket_page(
        &self,
        filter: &TicketListFilter,
        limit: u32,
        skip: u32,
    ) -> Result<TicketPage, ApiError> {
        let archived = self.count_tickets(&filter.archived_only())?;
        let server_total = self.count_tickets(filter)?;
        let total = if filter.is_active_view() {
            server_total.saturating_sub(archived)
        } else {
            server_total
        };

        let keep_archived = filter.status.as_deref() == Some("archived");
        let tickets = self
            .list_tickets(filter, limit, skip)?
            .into_iter()
            .filter(|t| keep_archived || t.status.as_deref() != Some("archived"))
            .collect();

        Ok(TicketPage {
            tickets,
            total,
            archived,
        })
    }

    /// `POST /tickets/{id}/approve?approve=true`; approval also archives.
    pub fn approve_ticket(&self, ticket_id: &str) -> Result<Value, ApiError> {
        self.send(
            ApiRequest::new(Method::Post, format!("/tickets/{ticket_id}/approve"))
                .query("approve", "true"),
        )
    }

    pub fn transition(&self, ticket_id: &str, request: &TransitionRequest) -> Result<Ticket, ApiError> {
        let body = serde_json::to_value(request).map_err(|err| {
            ApiError::invalid_input(ErrorCode::InvalidInput, err.to_string())
        })?;
        info!(
            ticket_id,
            target = request.workflow_state.as_str(),
            expected_version = request.expected_ticket_version,
            "workflow transition"
        );
        self.send_as(
            ApiRequest::new(Method::Post, format!("/tickets/{ticket_id}/workflow-transition"))
                .json(body),
        )
    }

    /// Approve every id with bounded concurrency. Failures are reported per
    /// id and never stop the rest of the batch.
    pub fn bulk_approve(&self, ticket_ids: &[String]) -> BulkReport {
        let results = run_bounded(ticket_ids, self.fanout_limit, |id| self.approve_ticket(id));
        let outcomes = ticket_ids
            .iter()
            .zip(&results)
            .map(|(id, result)| BulkOutcome::from_result(id, result))
            .collect();
        let report = BulkReport::new(outcomes);
        info!(succeeded = report.succeeded, failed = report.failed, "bulk approve finished");
        report
    }

    /// Ticket plus related records, fetched concurrently. Only the ticket
    /// itself is required; a failed side fetch leaves its section empty.
    pub fn ticket_detail(&self, ticket_id: &str) -> Result<TicketDetail, ApiError> {
        let side = |request: ApiRequest, what: &str| {
            self.send_list(request).unwrap_or_else(|err| {
                warn!(ticket_id, section = what, "detail section unavailable: {err}");
                Vec::new()
            })
        };

        thread::scope(|scope| {
            let comments = scope.spawn(|| {
                side(
                    ApiRequest::new(Method::Get, format!("/tickets/{ticket_id}/comments")),
                    "comments",
                )
            });
            let time_entries = scope.spawn(|| {
                side(
                    ApiRequest::new(Method::Get, format!("/tickets/{ticket_id}/time-entries/")),
                    "time_entries",
                )
            });
            let shipments = scope.spawn(|| {
                side(
                    ApiRequest::new(Method::Get, "/shipments/")
                        .query("ticket_id", ticket_id)
                        .query("limit", 200)
                        .query("skip", 0),
                    "shipments",
                )
            });
            let tasks = scope.spawn(|| {
                side(
                    ApiRequest::new(Method::Get, "/tasks/")
                        .query("ticket_id", ticket_id)
                        .query("limit", 200),
                    "tasks",
                )
            });

            let ticket = self.get_ticket(ticket_id);
            let detail = TicketDetail {
                comments: join_section(comments),
                time_entries: join_section(time_entries),
                shipments: join_section(shipments),
                tasks: join_section(tasks),
                ticket: ticket?,
            };
            Ok(detail)
        })
    }

    /// Run a quick action, then re-fetch the ticket.
    pub fn quick_action(&self, ticket_id: &str, action: &QuickAction) -> Result<Ticket, ApiError> {
        self.send(action.request(ticket_id))?;
        info!(ticket_id, action = action.label(), "quick action applied");
        self.get_ticket(ticket_id)
    }

    /// Write `edits` over the ticket under the optimistic version guard.
    ///
    /// The payload is cleaned, stripped of read-only relations, and stamped
    /// with `expected_ticket_version` before the `PUT`.
    pub fn update_ticket(
        &self,
        ticket_id: &str,
        edits: &FormData,
        guard: VersionGuard,
    ) -> Result<Ticket, ApiError> {
        let mut payload = form::strip_ticket_read_only_fields(&form::clean_form_data(edits));
        let version = guard.stamp(&mut payload);
        debug!(ticket_id, expected_version = version, "updating ticket");
        let path = format!("/tickets/{ticket_id}");
        let value = self.send_with(
            ApiRequest::new(Method::Put, path.clone()).json(Value::Object(payload)),
            concurrency::conflict_for_update,
        )?;
        decode(&path, value)
    }

    /// Full edit round-trip: load, normalize for editing, apply `changes`,
    /// write back under the version captured at load time.
    pub fn edit_ticket(&self, ticket_id: &str, changes: &FormData) -> Result<Ticket, ApiError> {
        let raw = self.get_ticket_raw(ticket_id)?;
        let guard = VersionGuard::from_version(raw.get("ticket_version").and_then(Value::as_i64));
        let mut working = form::normalize_ticket_for_edit(&raw);
        for (key, value) in changes {
            working.insert(key.clone(), value.clone());
        }
        self.update_ticket(ticket_id, &working, guard)
    }

    pub fn create_ticket(&self, data: &FormData) -> Result<Ticket, ApiError> {
        let payload = form::strip_ticket_read_only_fields(&form::clean_form_data(data));
        self.send_as(ApiRequest::new(Method::Post, "/tickets/").json(Value::Object(payload)))
    }

    pub fn add_comment(&self, ticket_id: &str, comment: &str) -> Result<Value, ApiError> {
        if comment.trim().is_empty() {
            return Err(ApiError::invalid_input(
                ErrorCode::InvalidInput,
                "comment text must not be empty",
            ));
        }
        self.send(
            ApiRequest::new(Method::Post, format!("/tickets/{ticket_id}/comments"))
                .json(serde_json::json!({ "comment": comment })),
        )
    }

    // -- reports -------------------------------------------------------------

    pub fn workflow_summary(
        &self,
        lookback_days: u32,
        onsite_alert_minutes: u32,
    ) -> Result<WorkflowSummary, ApiError> {
        self.send_as(
            ApiRequest::new(Method::Get, "/tickets/reports/workflow-summary")
                .query("lookback_days", lookback_days)
                .query("onsite_alert_minutes", onsite_alert_minutes),
        )
    }

    // -- generic resources ---------------------------------------------------

    pub fn list_resource(
        &self,
        resource: Resource,
        query: Vec<(String, String)>,
    ) -> Result<Vec<Value>, ApiError> {
        self.send_list(ApiRequest::new(Method::Get, resource.path()).queries(query))
    }

    pub fn get_resource(&self, resource: Resource, id: &str) -> Result<Value, ApiError> {
        self.send(ApiRequest::new(Method::Get, resource.item_path(id)?))
    }

    pub fn create_resource(&self, resource: Resource, data: &FormData) -> Result<Value, ApiError> {
        self.send(
            ApiRequest::new(Method::Post, resource.path())
                .json(Value::Object(form::clean_form_data(data))),
        )
    }

    pub fn update_resource(
        &self,
        resource: Resource,
        id: &str,
        data: &FormData,
    ) -> Result<Value, ApiError> {
        self.send(
            ApiRequest::new(Method::Put, resource.item_path(id)?)
                .json(Value::Object(form::clean_form_data(data))),
        )
    }

    pub fn delete_resource(&self, resource: Resource, id: &str) -> Result<Value, ApiError> {
        self.send(ApiRequest::new(Method::Delete, resource.item_path(id)?))
    }

    // -- shipments -----------------------------------------------------------

    pub fn set_shipment_status(&self, shipment_id: &str, status: &str) -> Result<Value, ApiError> {
        self.send(
            ApiRequest::new(Method::Patch, shipment_status_path(shipment_id)?)
                .json(Value::Object(shipment::status_body(status))),
        )
    }

    /// Update a shipment, routing a move to `shipped` through the status
    /// endpoint so inventory is adjusted server-side.
    pub fn update_shipment(&self, shipment_id: &str, data: &FormData) -> Result<Value, ApiError> {
        let current = self.get_resource(Resource::Shipments, shipment_id)?;
        let current_status = current.get("status").and_then(Value::as_str);

        match shipment::plan_update(current_status, form::clean_form_data(data)) {
            ShipmentUpdatePlan::Put(body) => self.update_resource_raw(Resource::Shipments, shipment_id, body),
            ShipmentUpdatePlan::Ship { status, remaining } => {
                let mut last = self.send(
                    ApiRequest::new(Method::Patch, shipment_status_path(shipment_id)?)
                        .json(Value::Object(status)),
                )?;
                if let Some(rest) = remaining {
                    last = self.update_resource_raw(Resource::Shipments, shipment_id, rest)?;
                }
                Ok(last)
            }
        }
    }

    fn update_resource_raw(&self, resource: Resource, id: &str, body: FormData) -> Result<Value, ApiError> {
        self.send(ApiRequest::new(Method::Put, resource.item_path(id)?).json(Value::Object(body)))
    }

    // -- companies -----------------------------------------------------------

    pub fn company_states(&self) -> Result<Value, ApiError> {
        self.send(ApiRequest::new(Method::Get, "/fieldtech-companies/states"))
    }

    pub fn company_regions(&self) -> Result<Value, ApiError> {
        self.send(ApiRequest::new(Method::Get, "/fieldtech-companies/regions"))
    }

    pub fn company_zip_lookup(&self, zip: &str) -> Result<Value, ApiError> {
        let zip = path_segment(zip.trim())?;
        self.send(ApiRequest::new(Method::Get, format!("/fieldtech-companies/zip/{zip}")))
    }

    /// Upload a company/technician CSV.
    pub fn import_companies(&self, filename: &str, bytes: Vec<u8>) -> Result<Value, ApiError> {
        self.send(
            ApiRequest::new(Method::Post, "/fieldtech-companies/import").body(Body::File {
                field: "file".to_string(),
                filename: filename.to_string(),
                content_type: "text/csv".to_string(),
                bytes,
            }),
        )
    }

    /// Same as [`Self::import_companies`], reading the CSV from disk.
    pub fn import_companies_file(&self, path: &Path) -> Result<Value, ApiError> {
        let bytes = std::fs::read(path).map_err(|err| {
            ApiError::invalid_input(
                ErrorCode::InvalidInput,
                format!("cannot read {}: {err}", path.display()),
            )
        })?;
        let filename = path
            .file_name()
            .map_or_else(|| "import.csv".to_string(), |n| n.to_string_lossy().into_owned());
        self.import_companies(&filename, bytes)
    }

    /// Save a company and reconcile its technician roster.
    ///
    /// With a `company_id` the company is updated and technicians missing
    /// from the form are deleted (delete failures are ignored); without one
    /// the company is created. Remaining technicians are then updated or
    /// created, all through the bounded fan-out.
    pub fn save_company(&self, data: &FormData) -> Result<CompanySaveReport, ApiError> {
        let payload = Value::Object(company::clean_company_payload(data));
        let submitted = company::submitted_techs(data);

        let (stored, created, plan) = match company::company_id(data) {
            Some(id) => {
                let existing: FormData =
                    self.send_as(ApiRequest::new(Method::Get, Resource::FieldtechCompanies.item_path(&id)?))?;
                let stored: FormData = self.send_as(
                    ApiRequest::new(Method::Put, Resource::FieldtechCompanies.item_path(&id)?).json(payload),
                )?;
                let plan = RosterPlan::new(&company::existing_tech_ids(&existing), submitted);
                (stored, false, plan)
            }
            None => {
                let stored: FormData = self.send_as(
                    ApiRequest::new(Method::Post, Resource::FieldtechCompanies.path()).json(payload),
                )?;
                (stored, true, RosterPlan::new(&[], submitted))
            }
        };

        let Some(company_id) = company::company_id(&stored).or_else(|| company::company_id(data)) else {
            return Err(ApiError::Decode {
                path: Resource::FieldtechCompanies.path(),
                reason: "saved company has no company_id".to_string(),
            });
        };

        let deleted = run_bounded(&plan.deletes, self.fanout_limit, |id| {
            self.delete_resource(Resource::Fieldtechs, id)
        })
        .into_iter()
        .filter(Result::is_ok)
        .count();

        let results = run_bounded(&plan.upserts, self.fanout_limit, |tech| {
            let body = Value::Object(tech.payload(&company_id));
            match &tech.field_tech_id {
                Some(id) => Resource::Fieldtechs
                    .item_path(id)
                    .and_then(|path| self.send(ApiRequest::new(Method::Put, path).json(body))),
                None => self.send(ApiRequest::new(Method::Post, Resource::Fieldtechs.path()).json(body)),
            }
        });
        let outcomes = plan
            .upserts
            .iter()
            .zip(&results)
            .map(|(tech, result)| {
                let label = tech.field_tech_id.clone().unwrap_or_else(|| tech.name.clone());
                BulkOutcome::from_result(&label, result)
            })
            .collect();

        info!(company_id = %company_id, created, deleted, "company saved");
        Ok(CompanySaveReport {
            company: stored,
            created,
            deleted_techs: deleted,
            techs: BulkReport::new(outcomes),
        })
    }
}

fn shipment_status_path(shipment_id: &str) -> Result<String, ApiError> {
    Ok(format!("/shipments/{}/status", path_segment(shipment_id)?))
}

fn join_section(handle: thread::ScopedJoinHandle<'_, Vec<Value>>) -> Vec<Value> {
    handle.join().unwrap_or_default()
}

fn decode<R: DeserializeOwned>(path: &str, value: Value) -> Result<R, ApiError> {
    serde_json::from_value(value).map_err(|err| ApiError::Decode {
        path: path.to_string(),
        reason: err.to_string(),
    })
}


#[cfg(test)]
mod tests {
    use super::testing::FakeTransport;
    use super::*;
    use crate::error::CONFLICT_MESSAGE;
    use crate::notify::testing::RecordingNotifier;
    use crate::workflow::{ActionKind, TransitionDraft, action_for_ticket};
    use serde_json::json;

    fn client(transport: FakeTransport) -> (ApiClient<FakeTransport>, Arc<RecordingNotifier>) {
        let recorder = Arc::new(RecordingNotifier::default());
        let client = ApiClient::new(transport)
            .with_token(Some("tok".into()))
            .with_notifier(recorder.clone());
        (client, recorder)
    }

    fn body_of(request: &ApiRequest) -> Value {
        match &request.body {
            Body::Json(v) => v.clone(),
            other => panic!("expected json body, got {other:?}"),
        }
    }

    #[test]
    fn classify_maps_dedicated_statuses() {
        assert_eq!(classify(401, r#"{"detail":"expired"}"#), ApiError::Unauthorized);
        assert_eq!(
            classify(404, r#"{"detail":"Ticket not found"}"#),
            ApiError::NotFound {
                detail: "Ticket not found".into()
            }
        );
        assert_eq!(
            classify(409, r#"{"detail":{"message":"Ticket version mismatch","current_ticket_version":5,"expected_ticket_version":4}}"#),
            ApiError::Conflict {
                message: "Ticket version mismatch".into(),
                current_version: Some(5),
                expected_version: Some(4),
            }
        );
        assert_eq!(
            classify(500, "upstream exploded"),
            ApiError::Http {
                status: 500,
                detail: "upstream exploded".into()
            }
        );
        assert_eq!(
            classify(400, r#"{"detail":{"code":7}}"#),
            ApiError::Http {
                status: 400,
                detail: r#"{"code":7}"#.into()
            }
        );
    }

    #[test]
    fn validation_errors_join_locations() {
        let err = classify(
            422,
            r#"{"detail":[{"loc":["body","site_id"],"msg":"field required"},{"loc":["body","priority"],"msg":"bad value"}]}"#,
        );
        assert_eq!(
            err.to_string(),
            "Validation error: body.site_id: field required, body.priority: bad value"
        );
        assert_eq!(classify(422, r#"{"detail":"nope"}"#).to_string(), "nope");
        assert_eq!(classify(422, r#"{"detail":{"msg":"bad date"}}"#).to_string(), "bad date");
        assert_eq!(classify(422, r#"[{"msg":"x"}]"#).to_string(), "Validation error: field: x");
    }

    #[test]
    fn needstech_queue_action_posts_conversion() {
        let transport = FakeTransport::default()
            .ok(
                Method::Get,
                "/tickets/dispatch/queue",
                json!([{"ticket_id": "T-7", "site_id": "S-1", "workflow_state": "needstech", "ticket_version": 2}]),
            )
            .ok(
                Method::Post,
                "/tickets/T-7/workflow-transition",
                json!({"ticket_id": "T-7", "workflow_state": "scheduled", "ticket_version": 3}),
            );
        let (client, _) = client(transport);

        let rows = client.dispatch_queue(Queue::Needstech, 300, 0).expect("queue");
        let queue_req = &client.transport().recorded()[0];
        assert_eq!(queue_req.query_value("queue"), Some("needstech"));
        assert_eq!(queue_req.query_value("limit"), Some("300"));
        assert_eq!(queue_req.query_value("skip"), Some("0"));

        let ticket = &rows[0];
        let ActionKind::Transition(spec) = action_for_ticket(ticket).expect("action").kind else {
            panic!("expected transition");
        };
        let request = TransitionDraft::new(ticket, spec)
            .with_schedule_date("2026-11-02")
            .submit()
            .expect("valid");
        let updated = client.transition("T-7", &request).expect("transition");
        assert_eq!(updated.workflow_state.as_deref(), Some("scheduled"));

        let sent = client
            .transport()
            .recorded_to(Method::Post, "/tickets/T-7/workflow-transition");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].token.as_deref(), Some("tok"));
        let body = body_of(&sent[0]);
        assert_eq!(body["workflow_state"], json!("scheduled"));
        assert_eq!(body["convert_to_type"], json!("onsite"));
        assert_eq!(body["schedule_date"], json!("2026-11-02"));
        assert_eq!(body["expected_ticket_version"], json!(2));
    }

    #[test]
    fn ticket_edit_sends_clean_stamped_payload() {
        let transport = FakeTransport::default()
            .ok(
                Method::Get,
                "/tickets/T-1",
                json!({
                    "ticket_id": "T-1",
                    "ticket_version": 3,
                    "site_id": "S-1",
                    "site": {"site_id": "S-1"},
                    "assigned_user": {"user_id": "u1"},
                    "created_at": "2026-10-01T10:00:00",
                    "date_scheduled": "2026-10-04T00:00:00",
                    "due_date": "",
                    "notes": "old"
                }),
            )
            .ok(Method::Put, "/tickets/T-1", json!({"ticket_id": "T-1", "ticket_version": 4}));
        let (client, _) = client(transport);

        let mut changes = FormData::new();
        changes.insert("notes".into(), json!("new note"));
        let saved = client.edit_ticket("T-1", &changes).expect("edit");
        assert_eq!(saved.ticket_version, Some(4));

        let put = client.transport().recorded_to(Method::Put, "/tickets/T-1");
        let body = body_of(&put[0]);
        assert_eq!(body["expected_ticket_version"], json!(3));
        assert_eq!(body["notes"], json!("new note"));
        assert_eq!(body["date_scheduled"], json!("2026-10-04"));
        assert_eq!(body["due_date"], Value::Null);
        assert_eq!(body.get("date_closed"), Some(&Value::Null), "absent dates go out as null");
        for gone in ["site", "assigned_user", "created_at", "ticket_id"] {
            assert!(body.get(gone).is_none(), "{gone} must be stripped");
        }
        // empty time fields are not nullable, so they are dropped
        assert!(body.get("check_in_time").is_none());
    }

    #[test]
    fn version_conflict_is_reported_with_fixed_message() {
        let transport = FakeTransport::default()
            .ok(Method::Get, "/tickets/T-1", json!({"ticket_id": "T-1", "ticket_version": 3}))
            .status(
                Method::Put,
                "/tickets/T-1",
                409,
                json!({"detail": {"message": "Ticket version mismatch", "current_ticket_version": 4, "expected_ticket_version": 3}}),
            );
        let (client, notes) = client(transport);

        let err = client.edit_ticket("T-1", &FormData::new()).expect_err("conflict");
        assert!(matches!(err, ApiError::Conflict { current_version: Some(4), .. }));
        assert_eq!(err.to_string(), CONFLICT_MESSAGE);
        assert_eq!(client.transport().recorded_to(Method::Put, "/tickets/T-1").len(), 1);
        assert_eq!(notes.taken(), vec![CONFLICT_MESSAGE.to_string()]);
    }

    #[test]
    fn record_ids_stay_inside_their_collection() {
        let transport = FakeTransport::default()
            .ok(Method::Delete, "/sites/..%2Fusers%2F5", json!({"ok": true}))
            .ok(Method::Patch, "/shipments/SH%201/status", json!({"status": "shipped"}))
            .ok(Method::Get, "/fieldtech-companies/zip/..%2Fregions", json!([]));
        let (client, notes) = client(transport);

        client.delete_resource(Resource::Sites, "../users/5").expect("delete");
        client.set_shipment_status("SH 1", "shipped").expect("status");
        client.company_zip_lookup("../regions").expect("zip");
        assert!(client.transport().recorded_to(Method::Delete, "/users/5").is_empty());

        for id in ["..", ".", " "] {
            let err = client.delete_resource(Resource::Users, id).expect_err("refused");
            assert_eq!(err.error_code(), ErrorCode::InvalidInput);
        }
        assert!(client.set_shipment_status("..", "shipped").is_err());
        assert_eq!(client.transport().recorded().len(), 3);
        assert!(notes.taken().is_empty());
    }

    #[test]
    fn unauthorized_clears_token_and_session_without_toast() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::in_dir(dir.path());
        store
            .save(&crate::session::Session::new("tok".into(), "bearer".into(), None))
            .expect("save");

        let transport = FakeTransport::default().status(
            Method::Get,
            "/tickets/T-1",
            401,
            json!({"detail": "Could not validate credentials"}),
        );
        let (client, notes) = client(transport);
        let client = client.with_session_store(store.clone());

        let err = client.get_ticket("T-1").expect_err("401");
        assert_eq!(err, ApiError::Unauthorized);
        assert_eq!(err.to_string(), "Unauthorized - please log in again");
        assert_eq!(client.token(), None);
        assert_eq!(store.load().expect("load"), None);
        assert!(notes.taken().is_empty());
    }

    #[test]
    fn not_found_is_silent_but_server_errors_toast() {
        let transport = FakeTransport::default()
            .status(Method::Get, "/tickets/T-404", 404, json!({"detail": "Ticket not found"}))
            .status(Method::Get, "/tickets/T-500", 500, json!({"detail": "db down"}));
        let (client, notes) = client(transport);

        assert!(matches!(client.get_ticket("T-404"), Err(ApiError::NotFound { .. })));
        assert!(notes.taken().is_empty());
        let err = client.get_ticket("T-500").expect_err("500");
        assert_eq!(err.to_string(), "db down");
        assert_eq!(notes.taken(), vec!["db down".to_string()]);
    }

    #[test]
    fn transport_failures_map_to_fixed_messages() {
        let transport = FakeTransport::default()
            .on(Method::Get, "/tickets/slow", Err(TransportError::Timeout))
            .on(Method::Get, "/tickets/down", Err(TransportError::Network("refused".into())));
        let (client, notes) = client(transport);

        let slow = client.get_ticket("slow").expect_err("timeout");
        assert_eq!(
            slow.to_string(),
            "Request timed out - the server may be slow or overloaded. Please try again."
        );
        let down = client.get_ticket("down").expect_err("network");
        assert_eq!(down.to_string(), "Network error - please check if the server is running");
        assert_eq!(notes.taken().len(), 2);
    }

    #[test]
    fn bulk_approve_reports_each_id() {
        let transport = FakeTransport::default()
            .ok(Method::Post, "/tickets/A/approve", json!({"ok": true}))
            .status(Method::Post, "/tickets/B/approve", 400, json!({"detail": "not pending"}))
            .ok(Method::Post, "/tickets/C/approve", json!({"ok": true}));
        let (client, _) = client(transport);

        let ids = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let report = client.bulk_approve(&ids);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.results[1].id, "B");
        assert_eq!(report.results[1].error.as_deref(), Some("not pending"));

        let approvals: Vec<_> = client
            .transport()
            .recorded()
            .into_iter()
            .filter(|r| r.path.ends_with("/approve"))
            .collect();
        assert_eq!(approvals.len(), 3);
        assert!(approvals.iter().all(|r| r.query_value("approve") == Some("true")));
    }

    #[test]
    fn active_view_subtracts_archived_and_hides_rows() {
        let transport = FakeTransport::default()
            .ok(Method::Get, "/tickets/count", json!({"count": 4}))
            .ok(Method::Get, "/tickets/count", json!({"count": 10}))
            .ok(
                Method::Get,
                "/tickets/",
                json!([
                    {"ticket_id": "T-1", "status": "open"},
                    {"ticket_id": "T-2", "status": "archived"}
                ]),
            );
        let (client, _) = client(transport);

        let filter = TicketListFilter {
            status: Some("active".into()),
            ..TicketListFilter::default()
        };
        let page = client.ticket_page(&filter, 50, 0).expect("page");
        assert_eq!(page.archived, 4);
        assert_eq!(page.total, 6);
        assert_eq!(page.tickets.len(), 1);

        let counts = client.transport().recorded_to(Method::Get, "/tickets/count");
        assert_eq!(counts[0].query_value("status"), Some("archived"));
        assert_eq!(counts[1].query_value("status"), None);
    }

    #[test]
    fn detail_tolerates_missing_sections() {
        let transport = FakeTransport::default()
            .ok(Method::Get, "/tickets/T-1", json!({"ticket_id": "T-1"}))
            .ok(Method::Get, "/tickets/T-1/comments", json!([{"comment": "hi"}]))
            .status(Method::Get, "/tickets/T-1/time-entries/", 500, json!({"detail": "boom"}))
            .ok(Method::Get, "/shipments/", json!([]))
            .ok(Method::Get, "/tasks/", json!([{"task_id": "K-1"}]));
        let (client, _) = client(transport);

        let detail = client.ticket_detail("T-1").expect("detail");
        assert_eq!(detail.comments.len(), 1);
        assert!(detail.time_entries.is_empty());
        assert_eq!(detail.tasks.len(), 1);

        let shipments = client.transport().recorded_to(Method::Get, "/shipments/");
        assert_eq!(shipments[0].query_value("ticket_id"), Some("T-1"));
        assert_eq!(shipments[0].query_value("limit"), Some("200"));
    }

    #[test]
    fn quick_action_refetches_ticket() {
        let transport = FakeTransport::default()
            .ok(Method::Patch, "/tickets/T-1/status", json!({}))
            .ok(Method::Get, "/tickets/T-1", json!({"ticket_id": "T-1", "status": "completed"}));
        let (client, _) = client(transport);

        let ticket = client.quick_action("T-1", &QuickAction::Complete).expect("complete");
        assert_eq!(ticket.status.as_deref(), Some("completed"));
        let patch = client.transport().recorded_to(Method::Patch, "/tickets/T-1/status");
        assert_eq!(body_of(&patch[0]), json!({"status": "completed"}));
    }

    #[test]
    fn company_save_reconciles_roster() {
        let transport = FakeTransport::default()
            .ok(
                Method::Get,
                "/fieldtech-companies/C-1",
                json!({"company_id": "C-1", "techs": [{"field_tech_id": "1"}, {"field_tech_id": "2"}]}),
            )
            .ok(Method::Put, "/fieldtech-companies/C-1", json!({"company_id": "C-1", "company_name": "Acme"}))
            .status(Method::Delete, "/fieldtechs/1", 500, json!({"detail": "in use"}))
            .ok(Method::Put, "/fieldtechs/2", json!({"field_tech_id": "2"}))
            .ok(Method::Post, "/fieldtechs/", json!({"field_tech_id": "3"}));
        let (client, _) = client(transport);

        let form = json!({
            "company_id": "C-1",
            "company_name": "Acme",
            "lat": 1.0,
            "techs": [
                {"field_tech_id": "2", "name": "Kept"},
                {"name": "Fresh", "service_radius_miles": "20"}
            ]
        });
        let report = client
            .save_company(form.as_object().expect("object"))
            .expect("save");
        assert!(!report.created);
        assert_eq!(report.deleted_techs, 0);
        assert!(report.techs.all_ok());

        let t = client.transport();
        let company_put = body_of(&t.recorded_to(Method::Put, "/fieldtech-companies/C-1")[0]);
        assert!(company_put.get("lat").is_none());
        assert!(company_put.get("techs").is_none());
        assert_eq!(t.recorded_to(Method::Delete, "/fieldtechs/1").len(), 1);
        let created = body_of(&t.recorded_to(Method::Post, "/fieldtechs/")[0]);
        assert_eq!(created["company_id"], json!("C-1"));
        assert_eq!(created["service_radius_miles"], json!(20));
    }

    #[test]
    fn shipping_uses_status_endpoint_first() {
        let transport = FakeTransport::default()
            .ok(Method::Get, "/shipments/SH-1", json!({"shipment_id": "SH-1", "status": "pending"}))
            .ok(Method::Patch, "/shipments/SH-1/status", json!({"status": "shipped"}))
            .ok(Method::Put, "/shipments/SH-1", json!({"shipment_id": "SH-1"}));
        let (client, _) = client(transport);

        let mut data = FormData::new();
        data.insert("status".into(), json!("shipped"));
        data.insert("tracking_number".into(), json!("1Z"));
        data.insert("notes".into(), json!("dock 4"));
        client.update_shipment("SH-1", &data).expect("update");

        let order: Vec<_> = client
            .transport()
            .recorded()
            .into_iter()
            .map(|r| (r.method, r.path))
            .collect();
        assert_eq!(
            order,
            vec![
                (Method::Get, "/shipments/SH-1".to_string()),
                (Method::Patch, "/shipments/SH-1/status".to_string()),
                (Method::Put, "/shipments/SH-1".to_string()),
            ]
        );
    }

    #[test]
    fn login_stores_token_and_reports_bad_credentials() {
        let ok = FakeTransport::default().ok(
            Method::Post,
            "/token",
            json!({"access_token": "abc", "token_type": "bearer"}),
        );
        let client = ApiClient::new(ok);
        let token = client.login("dana@example.com", "pw").expect("login");
        assert_eq!(token.access_token, "abc");
        assert_eq!(client.token().as_deref(), Some("abc"));
        let sent = &client.transport().recorded()[0];
        assert!(matches!(&sent.body, Body::Form(pairs) if pairs.iter().any(|(k, v)| k == "username" && v == "dana@example.com")));

        let bad = FakeTransport::default().status(
            Method::Post,
            "/token",
            401,
            json!({"detail": "Incorrect email or password"}),
        );
        let err = ApiClient::new(bad).login("x", "y").expect_err("bad creds");
        assert_eq!(
            err,
            ApiError::Http {
                status: 401,
                detail: "Incorrect email or password".into()
            }
        );
    }
}
