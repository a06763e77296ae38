use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::BotError;
use crate::geofence::GeofenceBounds;
use crate::schedule::{ServiceHours, ServiceMode};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub token: String,
    /// Chat id of the merchant channel orders are published to.
    #[serde(default, rename = "merchantChannel")]
    pub merchant_channel: String,
    /// Usernames allowed to resolve orders and drive admin commands.
    #[serde(default)]
    pub admins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// With payments disabled, issued orders go straight to the merchant
    /// channel.
    pub enabled: bool,
    #[serde(default = "default_base_url", rename = "baseUrl")]
    pub base_url: String,
    #[serde(default, rename = "secretKey")]
    pub secret_key: String,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_base_url() -> String {
    "https://api.chapa.co/v1".to_string()
}

fn default_currency() -> String {
    "ETB".to_string()
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_base_url(),
            secret_key: String::new(),
            currency: default_currency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default = "default_delivery_fee")]
    pub fee: u32,
}

fn default_delivery_fee() -> u32 {
    39
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            fee: default_delivery_fee(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScheduleConfig {
    #[serde(flatten)]
    pub hours: ServiceHours,
    #[serde(default)]
    pub mode: ServiceMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_geofence() -> GeofenceBounds {
    GeofenceBounds {
        min_lat: 7.85,
        max_lat: 8.0,
        min_lon: 38.0,
        max_lon: 38.2,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    /// Cafe → item → price. A `null` price marks a non-orderable
    /// category header.
    #[serde(default)]
    pub catalog: BTreeMap<String, BTreeMap<String, Option<u32>>>,
    #[serde(default = "default_geofence")]
    pub geofence: GeofenceBounds,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub payments: PaymentConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            telegram: TelegramConfig::default(),
            catalog: BTreeMap::new(),
            geofence: default_geofence(),
            schedule: ScheduleConfig::default(),
            payments: PaymentConfig::default(),
            delivery: DeliveryConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// Checks that must hold before the bot can serve customers. The
    /// schedule window is validated separately when the service gate is
    /// constructed.
    pub fn validate(&self) -> Result<(), BotError> {
        if self.telegram.token.is_empty() {
            return Err(BotError::Config("telegram.token is not set".into()));
        }
        if self.telegram.merchant_channel.is_empty() {
            return Err(BotError::Config(
                "telegram.merchantChannel is not set".into(),
            ));
        }
        if self.catalog.is_empty() {
            return Err(BotError::Config("catalog has no cafes".into()));
        }
        if self.payments.enabled && self.payments.secret_key.is_empty() {
            return Err(BotError::Config(
                "payments.secretKey is required when payments are enabled".into(),
            ));
        }
        if self.geofence.min_lat > self.geofence.max_lat
            || self.geofence.min_lon > self.geofence.max_lon
        {
            return Err(BotError::Config("geofence bounds are inverted".into()));
        }
        Ok(())
    }
}
