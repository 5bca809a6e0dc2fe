//! Owner-API implementation of [`VehicleClient`]
//!
//! Data requests first read the vehicle summary, which answers without waking
//! the car. Only an online vehicle is asked for `vehicle_data`; a dormant one
//! yields a state-only snapshot.

use super::types::{Category, VehicleIdentity, VehicleSnapshot, VehicleState};
use super::VehicleClient;
use crate::clock::SharedClock;
use crate::config::ApiConfig;
use crate::error::{Result, VigilError};
use crate::logging::{StructuredLogger, get_logger};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep};

const WAKE_POLL: Duration = Duration::from_secs(5);

/// Authenticated connection to the owner API, shared by all vehicle clients
pub struct ApiSession {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    max_retries: u32,
    retry_delay: Duration,
    wake_timeout: Duration,
    logger: StructuredLogger,
}

impl ApiSession {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let access_token = config.access_token.trim().to_string();
        if access_token.is_empty() {
            return Err(VigilError::auth("No access token configured"));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token,
            max_retries: config.max_retries.max(1),
            retry_delay: Duration::from_secs(config.retry_delay_secs),
            wake_timeout: Duration::from_secs(config.wake_timeout_secs),
            logger: get_logger("api"),
        })
    }

    /// GET `path` and return the `response` member of the body
    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        self.execute_with_retry(path, || async {
            let resp = self
                .authorized(self.http.get(self.url(path)))
                .query(query)
                .send()
                .await?;
            Self::decode(resp).await
        })
        .await
    }

    /// POST a JSON body to `path` and return the `response` member
    pub async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.execute_with_retry(path, || async {
            let resp = self
                .authorized(self.http.post(self.url(path)))
                .json(body)
                .send()
                .await?;
            Self::decode(resp).await
        })
        .await
    }

    async fn execute_with_retry<F, Fut>(&self, what: &str, operation: F) -> Result<Value>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<Value>>,
    {
        let mut attempts = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() => {
                    attempts += 1;
                    if attempts >= self.max_retries {
                        return Err(e);
                    }
                    self.logger
                        .warn(&format!("Request {what} attempt {attempts} failed: {e}"));
                    sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, concat!("vigil/", env!("CARGO_PKG_VERSION")))
    }

    async fn decode(resp: reqwest::Response) -> Result<Value> {
        let status = resp.status();
        if status.is_success() {
            let mut body: Value = resp.json().await?;
            return Ok(body.get_mut("response").map(Value::take).unwrap_or(Value::Null));
        }
        let text = resp.text().await.unwrap_or_default();
        Err(status_error(status, &text))
    }
}

fn status_error(status: StatusCode, body: &str) -> VigilError {
    let detail = format!("{status}: {}", body.trim());
    if status == StatusCode::UNAUTHORIZED {
        VigilError::auth(detail)
    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        VigilError::network(detail)
    } else {
        VigilError::api(detail)
    }
}

#[derive(Debug, Deserialize)]
struct VehicleSummary {
    id: u64,
    #[serde(default)]
    vin: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    state: VehicleState,
}

impl VehicleSummary {
    fn identity(&self) -> VehicleIdentity {
        VehicleIdentity {
            id: self.id,
            vin: self.vin.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CommandReply {
    result: bool,
    #[serde(default)]
    reason: String,
}

/// List the vehicles on the account without waking any of them
pub async fn discover_vehicles(
    session: Arc<ApiSession>,
    clock: SharedClock,
) -> Result<Vec<HttpVehicleClient>> {
    let listing = session.get("/api/1/vehicles", &[]).await?;
    let summaries: Vec<VehicleSummary> = serde_json::from_value(listing)?;
    Ok(summaries
        .iter()
        .map(|s| HttpVehicleClient::new(session.clone(), s.identity(), clock.clone()))
        .collect())
}

pub struct HttpVehicleClient {
    session: Arc<ApiSession>,
    identity: VehicleIdentity,
    clock: SharedClock,
}

impl HttpVehicleClient {
    pub fn new(session: Arc<ApiSession>, identity: VehicleIdentity, clock: SharedClock) -> Self {
        Self {
            session,
            identity,
            clock,
        }
    }

    fn path(&self, tail: &str) -> String {
        format!("/api/1/vehicles/{}{}", self.identity.id, tail)
    }

    async fn current_state(&self) -> Result<VehicleState> {
        let summary = self.session.get(&self.path(""), &[]).await?;
        let summary: VehicleSummary = serde_json::from_value(summary)?;
        Ok(summary.state)
    }

    async fn fetch(&self, categories: &[Category]) -> Result<VehicleSnapshot> {
        let state = self.current_state().await?;
        if state.is_dormant() || categories.is_empty() {
            return Ok(VehicleSnapshot::state_only(state, self.clock.now()));
        }

        let endpoints = categories
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(";");
        let mut data = self
            .session
            .get(&self.path("/vehicle_data"), &[("endpoints", endpoints)])
            .await?;
        Ok(VehicleSnapshot {
            state,
            charge_state: take_category(&mut data, Category::ChargeState)?,
            climate_state: take_category(&mut data, Category::ClimateState)?,
            drive_state: take_category(&mut data, Category::DriveState)?,
            retrieved_at: self.clock.now(),
        })
    }
}

fn take_category<T: DeserializeOwned>(data: &mut Value, category: Category) -> Result<Option<T>> {
    match data.get_mut(category.as_str()).map(Value::take) {
        Some(Value::Null) | None => Ok(None),
        Some(v) => Ok(Some(serde_json::from_value(v)?)),
    }
}

#[async_trait::async_trait]
impl VehicleClient for HttpVehicleClient {
    fn identity(&self) -> &VehicleIdentity {
        &self.identity
    }

    async fn get_full_snapshot(&self) -> Result<VehicleSnapshot> {
        self.fetch(&Category::DATA).await
    }

    async fn get_category(&self, category: Category) -> Result<VehicleSnapshot> {
        match category {
            Category::State => self.fetch(&[]).await,
            other => self.fetch(&[other]).await,
        }
    }

    async fn wake(&self) -> Result<()> {
        let deadline = Instant::now() + self.session.wake_timeout;
        self.session
            .post(&self.path("/wake_up"), &Value::Object(Default::default()))
            .await?;
        loop {
            if self.current_state().await? == VehicleState::Online {
                return Ok(());
            }
            if Instant::now() + WAKE_POLL > deadline {
                return Err(VigilError::network(format!(
                    "{} did not wake within {}s",
                    self.identity.label(),
                    self.session.wake_timeout.as_secs()
                )));
            }
            sleep(WAKE_POLL).await;
        }
    }

    async fn send_command(&self, name: &str, params: Value) -> Result<()> {
        let reply = self
            .session
            .post(&self.path(&format!("/command/{name}")), &params)
            .await?;
        let reply: CommandReply = serde_json::from_value(reply)?;
        if reply.result || reply.reason == "already_set" {
            Ok(())
        } else {
            Err(VigilError::command(name, reply.reason.as_str()))
        }
    }
}
