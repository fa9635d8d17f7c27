// File: crates/bcbooking_erp/src/gateway.rs
//! Authenticated calls to the Business Central OData booking functions.

use bcbooking_config::ErpConfig;
use reqwest::{header, Client, Response, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::ErpError;
use crate::models::UpstreamRecord;
use crate::token::TokenProvider;

/// The unbound OData actions exposed by the booking extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErpFunction {
    SetupList,
    SetupDetail,
    TimeSlots,
}

impl ErpFunction {
    pub fn name(self) -> &'static str {
        match self {
            ErpFunction::SetupList => "BookingAppointment_GetBookingSetupList",
            ErpFunction::SetupDetail => "BookingAppointment_GetBookingSetup",
            ErpFunction::TimeSlots => "BookingAppointment_GetAvailableTimeSlotAPI",
        }
    }
}

fn is_auth_rejection(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

pub struct ErpGateway {
    client: Client,
    config: ErpConfig,
    tokens: Arc<TokenProvider>,
}

impl ErpGateway {
    pub fn new(client: Client, config: ErpConfig, tokens: Arc<TokenProvider>) -> Self {
        Self {
            client,
            config,
            tokens,
        }
    }

    /// `{api_base}/{tenant}/{environment}/ODataV4/{function}`
    pub fn function_url(&self, function: ErpFunction) -> Result<String, ErpError> {
        let tenant_id = self
            .config
            .tenant_id
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ErpError::MissingConfig("tenant_id"))?;
        Ok(format!(
            "{}/{}/{}/ODataV4/{}",
            self.config.api_base_url_or_default(),
            tenant_id,
            self.config.environment,
            function.name()
        ))
    }

    /// Calls `function` and returns the decoded JSON body.
    ///
    /// A 401 or 403 triggers one token refresh and one resend. If the resend
    /// is refused as well the call fails with [`ErpError::Unauthorized`].
    pub async fn call(&self, function: ErpFunction, body: Option<&Value>) -> Result<Value, ErpError> {
        let url = self.function_url(function)?;
        let token = self.tokens.get_token().await?;

        let mut response = self.send(&url, &token, body).await?;
        if is_auth_rejection(response.status()) {
            warn!(
                "{} refused the token with {}, refreshing and retrying once",
                function.name(),
                response.status()
            );
            let fresh = self.tokens.refresh_token(&token).await?;
            response = self.send(&url, &fresh, body).await?;

            if is_auth_rejection(response.status()) {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                error!("{} refused the refreshed token with {}", function.name(), status);
                return Err(ErpError::Unauthorized { status, body });
            }
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("{} failed with {}: {}", function.name(), status, body);
            return Err(ErpError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        debug!("{} returned {} bytes", function.name(), bytes.len());
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn send(&self, url: &str, token: &str, body: Option<&Value>) -> Result<Response, ErpError> {
        let request = self
            .client
            .post(url)
            .query(&[("Company", self.config.company.as_str())])
            .bearer_auth(token)
            .header(header::ACCEPT, "application/json");

        let request = match body {
            Some(body) => request.json(body),
            None => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(""),
        };
        Ok(request.send().await?)
    }

    /// All booking setups, unwrapped from the OData envelope.
    pub async fn fetch_setup_list(&self) -> Result<Vec<UpstreamRecord>, ErpError> {
        let payload = self.call(ErpFunction::SetupList, None).await?;
        let records = unwrap_envelope(payload)?;
        info!("Fetched {} booking setups", records.len());
        Ok(records)
    }

    /// The setup of one branch, returned as Business Central sent it.
    pub async fn fetch_branch_setup(&self, branch: &str) -> Result<Value, ErpError> {
        let body = json!({ "_BookingSetupCode": branch });
        self.call(ErpFunction::SetupDetail, Some(&body)).await
    }

    /// Forwards a time-slot query body unchanged.
    pub async fn fetch_time_slots(&self, query: &Value) -> Result<Value, ErpError> {
        self.call(ErpFunction::TimeSlots, Some(query)).await
    }
}

/// Extracts the records from a `{"value": ...}` response.
///
/// Business Central codeunit actions return their payload as a JSON string
/// inside `value`, so a string is parsed a second time. An unparseable string
/// or a non-array value yields no records. Array elements that are not
/// objects are skipped.
pub fn unwrap_envelope(payload: Value) -> Result<Vec<UpstreamRecord>, ErpError> {
    let value = match payload {
        Value::Object(mut map) => map.remove("value"),
        _ => None,
    };

    let items = match value {
        None | Some(Value::Null) => {
            return Err(ErpError::InvalidPayload(
                "Invalid JSON from Business Central".to_string(),
            ))
        }
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(items)) => items,
            Ok(other) => {
                warn!("Envelope string decoded to {}, not an array", kind(&other));
                return Ok(Vec::new());
            }
            Err(e) => {
                warn!("Discarding malformed envelope string: {}", e);
                return Ok(Vec::new());
            }
        },
        Some(Value::Array(items)) => items,
        Some(other) => {
            warn!("Envelope value is {}, not an array", kind(&other));
            return Ok(Vec::new());
        }
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(record) => Some(record),
            _ => None,
        })
        .collect())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
