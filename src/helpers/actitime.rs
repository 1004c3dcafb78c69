use reqwest::{Client, Response, header};
use std::env;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::error::DriverError;
use crate::models::abf::TimesheetRow;
use crate::models::actitime::{TimeTrackWrite, UserIdentity};

const START_TIMEOUT: Duration = Duration::from_secs(3);

/// Write side of the actiTIME API that batch entries are submitted to.
#[allow(async_fn_in_trait)]
pub trait TimeTrackWriter {
    /// Authenticates `username` and makes it the account later writes go to.
    async fn start(&mut self, username: &str, password: &str) -> Result<UserIdentity, DriverError>;

    /// Records `minutes` on the row's day and task, returning the server acknowledgment.
    async fn write_day_time_track(
        &self,
        row: &TimesheetRow,
        minutes: i64,
        comment: &str,
    ) -> Result<serde_json::Value, DriverError>;
}

#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Base URL of the actiTIME REST API, e.g. `https://example.com/api/v1`
    pub target: String,
}

impl DriverConfig {
    pub fn from_env() -> Result<Self, DriverError> {
        let target = env::var("ACTITIME_URL").map_err(|_| DriverError::MissingConfig("ACTITIME_URL"))?;
        Ok(Self { target })
    }
}

pub fn client_init() -> Result<Client, DriverError> {
    info!("Initializing actiTIME client");

    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static("application/json; charset=UTF-8"),
    );

    match Client::builder().default_headers(headers).build() {
        Ok(client) => {
            info!("actiTIME client initialized successfully");
            Ok(client)
        }
        Err(e) => {
            error!("Failed to build actiTIME client: {}", e);
            Err(e.into())
        }
    }
}

struct Credentials {
    username: String,
    password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// HTTP driver for one actiTIME server.
#[derive(Debug)]
pub struct Driver {
    client: Client,
    target: String,
    session: Option<(Credentials, UserIdentity)>,
}

impl Driver {
    pub fn new(client: Client, config: DriverConfig) -> Self {
        Self {
            client,
            target: config.target.trim_end_matches('/').to_string(),
            session: None,
        }
    }

    pub fn identity(&self) -> Option<&UserIdentity> {
        self.session.as_ref().map(|(_, identity)| identity)
    }

    pub fn is_started(&self) -> bool {
        self.session.is_some()
    }
}

impl TimeTrackWriter for Driver {
    async fn start(&mut self, username: &str, password: &str) -> Result<UserIdentity, DriverError> {
        self.session = None;

        let url = format!("{}/users/me", self.target);
        info!("Starting actiTIME session for {}", username);

        let response = match self
            .client
            .get(&url)
            .basic_auth(username, Some(password))
            .timeout(START_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                error!("Failed to send request to actiTIME: {}", e);
                return Err(e.into());
            }
        };

        let text = read_body(response).await?;

        let identity = match serde_json::from_str::<UserIdentity>(&text) {
            Ok(identity) => identity,
            Err(e) => {
                error!("Failed to parse actiTIME user: {}", e);
                error!("Raw response: {}", text);
                return Err(e.into());
            }
        };

        info!(
            "Session started for {} {} (id {})",
            identity.first_name, identity.last_name, identity.id
        );

        let credentials = Credentials {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.session = Some((credentials, identity.clone()));
        Ok(identity)
    }

    async fn write_day_time_track(
        &self,
        row: &TimesheetRow,
        minutes: i64,
        comment: &str,
    ) -> Result<serde_json::Value, DriverError> {
        let Some((credentials, identity)) = &self.session else {
            error!("Write attempted before the actiTIME session was started");
            return Err(DriverError::NotStarted);
        };

        let url = format!(
            "{}/timetrack/{}/{}/{}",
            self.target,
            identity.id,
            row.date_query(),
            row.task_id
        );
        let body = TimeTrackWrite {
            time: minutes,
            comment: comment.to_string(),
        };

        debug!("Writing {} minutes to {}", minutes, url);

        let response = match self
            .client
            .patch(&url)
            .basic_auth(&credentials.username, Some(&credentials.password))
            .json(&body)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                error!("Failed to send time track to actiTIME: {}", e);
                return Err(e.into());
            }
        };

        let text = read_body(response).await?;

        match serde_json::from_str(&text) {
            Ok(ack) => Ok(ack),
            Err(e) => {
                error!("Failed to parse time track response: {}", e);
                error!("Raw response: {}", text);
                Err(e.into())
            }
        }
    }
}

async fn read_body(response: Response) -> Result<String, DriverError> {
    let status = response.status();

    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        error!("actiTIME returned error status {}: {}", status, body);
        return Err(DriverError::Status { status, body });
    }

    match response.text().await {
        Ok(text) => Ok(text),
        Err(e) => {
            error!("Failed to read response body: {}", e);
            Err(e.into())
        }
    }
}
