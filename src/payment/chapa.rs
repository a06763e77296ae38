use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::config::PaymentConfig;
use crate::errors::BotError;
use crate::payment::{PaymentGateway, PaymentInit};

/// HTTP client for a Chapa-style payment gateway.
///
/// Transaction references are generated by the caller and must be globally
/// unique per order attempt; the gateway echoes them back in callbacks.
pub struct ChapaClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

#[derive(Debug, Serialize)]
struct InitializeRequest<'a> {
    amount: String,
    currency: &'a str,
    phone_number: &'a str,
    tx_ref: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    first_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct InitializeResponse {
    status: String,
    message: Option<String>,
    data: Option<InitializeData>,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    checkout_url: Option<String>,
    #[serde(default)]
    instructions: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    status: String,
    data: Option<VerifyData>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: Option<String>,
}

impl ChapaClient {
    pub fn new(config: &PaymentConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        }
    }

    fn network_error(context: &str, err: &reqwest::Error) -> BotError {
        error!("Chapa {context} request failed: {err}");
        BotError::Gateway {
            message: format!("{context}: {err}"),
            retryable: true,
        }
    }

    fn http_error(context: &str, status: reqwest::StatusCode) -> BotError {
        error!("Chapa {context} returned HTTP {status}");
        BotError::Gateway {
            message: format!("{context}: HTTP {status}"),
            retryable: status.is_server_error(),
        }
    }
}

#[async_trait]
impl PaymentGateway for ChapaClient {
    async fn initialize(
        &self,
        amount: u32,
        currency: &str,
        phone: &str,
        tx_ref: &str,
        customer_name: &str,
    ) -> Result<PaymentInit, BotError> {
        let url = format!("{}/transaction/initialize", self.base_url);
        let body = InitializeRequest {
            amount: amount.to_string(),
            currency,
            phone_number: phone,
            tx_ref,
            first_name: customer_name,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::network_error("initialize", &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::http_error("initialize", status));
        }

        let parsed: InitializeResponse = response
            .json()
            .await
            .map_err(|e| Self::network_error("initialize", &e))?;
        if parsed.status != "success" {
            let message = parsed
                .message
                .unwrap_or_else(|| "Payment initialization failed".to_string());
            error!(tx_ref = %tx_ref, "Chapa initialize rejected: {message}");
            return Err(BotError::Gateway {
                message,
                retryable: false,
            });
        }

        let data = parsed.data.unwrap_or(InitializeData {
            checkout_url: None,
            instructions: None,
        });
        Ok(PaymentInit {
            tx_ref: tx_ref.to_string(),
            checkout_url: data.checkout_url,
            instructions: data.instructions,
        })
    }

    async fn verify(&self, tx_ref: &str) -> Result<bool, BotError> {
        let url = format!("{}/transaction/verify/{tx_ref}", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| Self::network_error("verify", &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::http_error("verify", status));
        }

        let parsed: VerifyResponse = response
            .json()
            .await
            .map_err(|e| Self::network_error("verify", &e))?;
        let settled = parsed.status == "success"
            && parsed
                .data
                .and_then(|d| d.status)
                .is_some_and(|s| s == "success");
        Ok(settled)
    }
}
