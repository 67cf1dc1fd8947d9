//! Per-invocation wiring: config, output mode, session store, API client.

use anyhow::Result;
use fieldops_core::config::UserConfig;
use fieldops_core::error::{ApiError, ErrorCode};
use fieldops_core::session::SessionStore;
use fieldops_core::{ApiClient, UreqTransport};
use std::time::Duration;
use tracing::debug;

use crate::credentials::{self, ResolvedToken, TokenSource};
use crate::output::OutputMode;

pub type Client = ApiClient<UreqTransport>;

pub struct AppContext {
    pub config: UserConfig,
    pub output: OutputMode,
    store: SessionStore,
    token_flag: Option<String>,
}

impl AppContext {
    /// `api_url_flag` wins over the environment and the config file.
    pub fn new(
        mut config: UserConfig,
        output: OutputMode,
        api_url_flag: Option<&str>,
        token_flag: Option<String>,
    ) -> Result<Self> {
        if let Some(url) = api_url_flag.map(str::trim).filter(|u| !u.is_empty()) {
            config.api.base_url = url.to_string();
        }
        Ok(Self {
            config,
            output,
            store: SessionStore::open_default()?,
            token_flag,
        })
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    fn transport(&self) -> UreqTransport {
        UreqTransport::new(
            &self.config.api.base_url,
            Duration::from_secs(self.config.api.timeout_secs),
        )
    }

    /// Client without credentials, for `fo login`.
    pub fn anonymous_client(&self) -> Client {
        ApiClient::new(self.transport()).with_fanout_limit(self.config.dispatch.fanout_limit)
    }

    pub fn resolve_token(&self) -> Option<ResolvedToken> {
        credentials::resolve_token(self.token_flag.as_deref(), &self.store)
    }

    /// Authenticated client.
    ///
    /// Only a token loaded from the session file is cleared on 401; a
    /// rejected `--token` or `FIELDOPS_TOKEN` leaves the saved login alone.
    pub fn client(&self) -> Result<Client> {
        let Some(resolved) = self.resolve_token() else {
            return Err(ApiError::invalid_input(
                ErrorCode::NotLoggedIn,
                "Not logged in - no access token available",
            )
            .into());
        };
        debug!(source = ?resolved.source, base_url = %self.config.api.base_url, "using access token");

        let mut client = self.anonymous_client().with_token(Some(resolved.token));
        if resolved.source == TokenSource::Session {
            client = client.with_session_store(self.store.clone());
        }
        Ok(client)
    }
}
