use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::config::PesapalConfig;
use crate::errors::ServiceError;

use super::{GatewayOrderRequest, GatewaySubmitResponse, GatewayTransactionStatus, PaymentGateway};

/// Authentication tokens are short-lived; renew slightly early so a token
/// is never sent right at its expiry instant.
const TOKEN_EXPIRY_SKEW_SECS: i64 = 30;

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl GatewayErrorBody {
    fn describe(&self) -> String {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => format!("{}: {}", code, message),
            (_, Some(message)) => message.clone(),
            (Some(code), _) => code.clone(),
            _ => "unspecified gateway error".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(rename = "expiryDate", default)]
    expiry_date: Option<String>,
    #[serde(default)]
    error: Option<GatewayErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RegisterIpnResponse {
    #[serde(default)]
    ipn_id: Option<String>,
    #[serde(default)]
    error: Option<GatewayErrorBody>,
}

#[derive(Debug, Deserialize)]
struct SubmitOrderResponse {
    #[serde(default)]
    order_tracking_id: Option<String>,
    #[serde(default)]
    redirect_url: Option<String>,
    #[serde(default)]
    error: Option<GatewayErrorBody>,
}

/// Pesapal API 3.0 client.
///
/// Caches the bearer token until shortly before its advertised expiry and
/// the registered IPN id for the process lifetime, so steady-state traffic
/// costs one HTTP call per operation.
pub struct PesapalClient {
    http: reqwest::Client,
    config: PesapalConfig,
    token: RwLock<Option<CachedToken>>,
    ipn_id: RwLock<Option<String>>,
}

impl PesapalClient {
    pub fn new(config: PesapalConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            token: RwLock::new(None),
            ipn_id: RwLock::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn bearer_token(&self) -> Result<String, ServiceError> {
        {
            let cached = self.token.read().await;
            if let Some(cached) = cached.as_ref() {
                if cached.expires_at - Duration::seconds(TOKEN_EXPIRY_SKEW_SECS) > Utc::now() {
                    return Ok(cached.token.clone());
                }
            }
        }

        let response = self
            .http
            .post(self.url("/api/Auth/RequestToken"))
            .json(&json!({
                "consumer_key": self.config.consumer_key,
                "consumer_secret": self.config.consumer_secret,
            }))
            .send()
            .await
            .map_err(|e| ServiceError::GatewayError(format!("token request failed: {}", e)))?;

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::GatewayError(format!("malformed token response: {}", e)))?;

        if let Some(error) = body.error {
            return Err(ServiceError::GatewayError(format!(
                "authentication rejected: {}",
                error.describe()
            )));
        }
        let token = body.token.filter(|t| !t.is_empty()).ok_or_else(|| {
            ServiceError::GatewayError("authentication response carried no token".to_string())
        })?;

        // The expiry comes back as an RFC 3339 timestamp. If it does not
        // parse, assume a short lifetime rather than caching forever.
        let expires_at = body
            .expiry_date
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc::now() + Duration::minutes(5));

        debug!(%expires_at, "gateway token refreshed");
        let mut cached = self.token.write().await;
        *cached = Some(CachedToken {
            token: token.clone(),
            expires_at,
        });
        Ok(token)
    }
}

#[async_trait]
impl PaymentGateway for PesapalClient {
    #[instrument(skip(self))]
    async fn register_ipn(&self) -> Result<String, ServiceError> {
        {
            let cached = self.ipn_id.read().await;
            if let Some(id) = cached.as_ref() {
                return Ok(id.clone());
            }
        }

        let token = self.bearer_token().await?;
        let response = self
            .http
            .post(self.url("/api/URLSetup/RegisterIPN"))
            .bearer_auth(&token)
            .json(&json!({
                "url": self.config.ipn_url,
                "ipn_notification_type": "GET",
            }))
            .send()
            .await
            .map_err(|e| ServiceError::GatewayError(format!("IPN registration failed: {}", e)))?;

        let body: RegisterIpnResponse = response.json().await.map_err(|e| {
            ServiceError::GatewayError(format!("malformed IPN registration response: {}", e))
        })?;

        if let Some(error) = body.error {
            return Err(ServiceError::GatewayError(format!(
                "IPN registration rejected: {}",
                error.describe()
            )));
        }
        let ipn_id = body.ipn_id.filter(|id| !id.is_empty()).ok_or_else(|| {
            ServiceError::GatewayError("IPN registration returned no id".to_string())
        })?;

        let mut cached = self.ipn_id.write().await;
        *cached = Some(ipn_id.clone());
        Ok(ipn_id)
    }

    #[instrument(skip(self, request), fields(merchant_reference = %request.merchant_reference))]
    async fn submit_order(
        &self,
        request: &GatewayOrderRequest,
    ) -> Result<GatewaySubmitResponse, ServiceError> {
        let token = self.bearer_token().await?;
        let notification_id = self.register_ipn().await?;

        let (first_name, last_name) = split_name(request.billing_name.as_deref());
        let payload = json!({
            "id": request.merchant_reference,
            "currency": request.currency,
            "amount": request.amount,
            "description": request.description,
            "callback_url": request.callback_url,
            "notification_id": notification_id,
            "billing_address": {
                "email_address": request.billing_email,
                "phone_number": request.billing_phone,
                "first_name": first_name,
                "last_name": last_name,
            },
        });

        let response = self
            .http
            .post(self.url("/api/Transactions/SubmitOrderRequest"))
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ServiceError::GatewayError(format!("order submission failed: {}", e)))?;

        let body: SubmitOrderResponse = response.json().await.map_err(|e| {
            ServiceError::GatewayError(format!("malformed order submission response: {}", e))
        })?;

        if let Some(error) = body.error {
            return Err(ServiceError::GatewayError(format!(
                "order submission rejected: {}",
                error.describe()
            )));
        }
        match (body.order_tracking_id, body.redirect_url) {
            (Some(order_tracking_id), Some(redirect_url))
                if !order_tracking_id.is_empty() && !redirect_url.is_empty() =>
            {
                Ok(GatewaySubmitResponse {
                    order_tracking_id,
                    redirect_url,
                })
            }
            _ => Err(ServiceError::GatewayError(
                "order submission returned no tracking id".to_string(),
            )),
        }
    }

    #[instrument(skip(self))]
    async fn transaction_status(
        &self,
        tracking_id: &str,
    ) -> Result<GatewayTransactionStatus, ServiceError> {
        let token = self.bearer_token().await?;
        let response = self
            .http
            .get(self.url("/api/Transactions/GetTransactionStatus"))
            .query(&[("orderTrackingId", tracking_id)])
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| ServiceError::GatewayError(format!("status query failed: {}", e)))?;

        let raw: Value = response
            .json()
            .await
            .map_err(|e| ServiceError::GatewayError(format!("malformed status response: {}", e)))?;

        if let Some(error) = raw.get("error").filter(|e| !e.is_null()) {
            let body: GatewayErrorBody =
                serde_json::from_value(error.clone()).unwrap_or(GatewayErrorBody {
                    code: None,
                    message: None,
                });
            return Err(ServiceError::GatewayError(format!(
                "status query rejected: {}",
                body.describe()
            )));
        }

        // The code arrives as a bare number; unknown or missing codes are
        // treated as pending downstream.
        let payment_status_code = match raw.get("status_code") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.clone(),
            _ => {
                warn!(%tracking_id, "status response carried no status_code");
                "0".to_string()
            }
        };

        let amount = raw
            .get("amount")
            .and_then(Value::as_f64)
            .and_then(Decimal::from_f64)
            .unwrap_or_default();
        let currency = raw
            .get("currency")
            .and_then(Value::as_str)
            .unwrap_or(&self.config.currency)
            .to_string();
        let payment_method = raw
            .get("payment_method")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(GatewayTransactionStatus {
            payment_status_code,
            payment_method,
            amount,
            currency,
            raw,
        })
    }
}

fn split_name(full: Option<&str>) -> (String, String) {
    match full {
        Some(full) => {
            let mut parts = full.split_whitespace();
            let first = parts.next().unwrap_or("").to_string();
            let last = parts.collect::<Vec<_>>().join(" ");
            (first, last)
        }
        None => (String::new(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_name_handles_shapes() {
        assert_eq!(
            split_name(Some("Achieng Odhiambo")),
            ("Achieng".to_string(), "Odhiambo".to_string())
        );
        assert_eq!(split_name(Some("Amina")), ("Amina".to_string(), String::new()));
        assert_eq!(split_name(None), (String::new(), String::new()));
    }
}
