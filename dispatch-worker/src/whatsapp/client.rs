//! WATI REST client.
//!
//! Every outbound call goes through [`WatiClient::make_request`], which
//! builds the URL, POSTs with the bearer token and a fixed timeout, applies
//! the [`RetryPolicy`], and folds the response into a [`SendResult`].

use std::time::Duration;

use reqwest::{
    header::{self, HeaderMap},
    Client, Method, StatusCode,
};
use serde::Serialize;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{error, info, warn};
use url::Url;

use super::retry::RetryPolicy;
use super::types::{HeaderValue, SendResult, TemplateParameter, TemplatePayload};
use crate::config::env_non_empty;
use crate::error::ConfigError;

/// Fixed timeout for every messaging request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw connection settings. Unset values fall back to the environment in
/// [`WatiClient::from_env`].
#[derive(Debug, Clone, Default)]
pub struct WatiSettings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub instance_id: Option<String>,
}

impl WatiSettings {
    /// Fill any unset value from `WATI_API_KEY`, `WATI_BASE_URL`, `WATI_INSTANCE_ID`.
    pub fn or_env(self) -> Self {
        Self {
            api_key: non_empty(self.api_key).or_else(|| env_non_empty("WATI_API_KEY")),
            base_url: non_empty(self.base_url).or_else(|| env_non_empty("WATI_BASE_URL")),
            instance_id: non_empty(self.instance_id)
                .or_else(|| env_non_empty("WATI_INSTANCE_ID")),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Strip surrounding whitespace and a single leading `+`.
pub fn normalize_phone_number(number: &str) -> String {
    let number = number.trim();
    number.strip_prefix('+').unwrap_or(number).to_string()
}

/// WhatsApp business messaging client.
///
/// Configuration is fixed at construction. The inner HTTP client (and its
/// connection pool) is reused across calls.
#[derive(Debug, Clone)]
pub struct WatiClient {
    http: Client,
    base_url: String,
    instance_id: String,
    retry: RetryPolicy,
}

impl WatiClient {
    /// Build a client, failing if any setting is missing or empty.
    pub fn new(settings: WatiSettings) -> Result<Self, ConfigError> {
        let api_key = non_empty(settings.api_key).ok_or(ConfigError::MissingApiKey)?;
        let base_url = non_empty(settings.base_url).ok_or(ConfigError::MissingBaseUrl)?;
        let instance_id = non_empty(settings.instance_id).ok_or(ConfigError::MissingInstanceId)?;

        Url::parse(&base_url).map_err(|e| ConfigError::InvalidBaseUrl(e.to_string()))?;

        let mut headers = HeaderMap::new();
        let bearer = header::HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| ConfigError::InvalidApiKey)?;
        headers.insert(header::AUTHORIZATION, bearer);
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let http = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        info!(
            base_url = %base_url,
            instance_id = %instance_id,
            "wati_client_initialized"
        );

        Ok(Self {
            http,
            base_url,
            instance_id,
            retry: RetryPolicy::default(),
        })
    }

    /// Build a client entirely from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(WatiSettings::default().or_env())
    }

    /// Replace the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a pre-approved template message.
    ///
    /// `parameters` and `header_values` are only included when non-empty.
    pub async fn send_template_message(
        &self,
        phone_number: &str,
        template_name: &str,
        parameters: &[TemplateParameter],
        header_values: &[HeaderValue],
        broadcast_name: &str,
    ) -> SendResult {
        let phone = normalize_phone_number(phone_number);

        let payload = TemplatePayload {
            template_name,
            broadcast_name,
            parameters,
            header_values,
        };

        let endpoint = format!(
            "sendTemplateMessage?whatsappNumber={}",
            urlencoding::encode(&phone)
        );
        let result = self.make_request(&endpoint, Some(&payload)).await;

        if result.success {
            info!(
                template_name = template_name,
                phone = %phone,
                "wati_template_message_sent"
            );
        }

        result
    }

    /// Send a free-form message inside an active conversation window.
    pub async fn send_session_message(&self, phone_number: &str, message_text: &str) -> SendResult {
        let phone = normalize_phone_number(phone_number);

        let endpoint = format!(
            "sendSessionMessage/{}?messageText={}",
            urlencoding::encode(&phone),
            urlencoding::encode(message_text)
        );

        let result = self.make_request::<()>(&endpoint, None).await;

        if result.success {
            info!(phone = %phone, text_length = message_text.len(), "wati_session_message_sent");
        }

        result
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    /// Once retries are exhausted the last response is returned as
    /// `API Error <status>` with its status recorded.
    async fn make_request<P: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        payload: Option<&P>,
    ) -> SendResult {
        let url = self.endpoint_url(endpoint);

        info!(url = %url, "wati_request_starting");
        if let Some(body) = payload {
            match serde_json::to_string(body) {
                Ok(json) => info!(payload = %json, "wati_request_payload"),
                Err(e) => return SendResult::unexpected(e),
            }
        }

        let mut retries = 0u32;

        loop {
            let mut request = self.http.request(Method::POST, &url);
            if let Some(body) = payload {
                request = request.json(body);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    error!(url = %url, error = %e, timeout = e.is_timeout(), "wati_request_error");
                    return SendResult::unexpected(e);
                }
            };

            let status = response.status();
            info!(
                url = %url,
                status_code = status.as_u16(),
                retries = retries,
                "wati_response_received"
            );

            if self.retry.should_retry(&Method::POST, status, retries) {
                retries += 1;
                let delay = self.retry.delay_for(retries, status, response.headers());
                warn!(
                    url = %url,
                    status_code = status.as_u16(),
                    retry = retries,
                    delay_ms = delay.as_millis() as u64,
                    "wati_request_retrying"
                );
                sleep(delay).await;
                continue;
            }

            let data = match read_body(response).await {
                Ok(data) => data,
                Err(e) => {
                    error!(url = %url, error = %e, "wati_response_read_error");
                    return SendResult::unexpected(e);
                }
            };

            if status == StatusCode::OK {
                info!(url = %url, response = %data, "wati_request_succeeded");
                return SendResult::ok(data, status.as_u16());
            }

            let result = SendResult::api_error(status.as_u16(), &data);
            error!(
                url = %url,
                status_code = status.as_u16(),
                error = result.error.as_deref().unwrap_or_default(),
                "wati_request_failed"
            );
            return result;
        }
    }
}

/// Decode a response body as JSON, keeping the raw text when it is not JSON.
async fn read_body(response: reqwest::Response) -> Result<Value, reqwest::Error> {
    let text = response.text().await?;
    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}
