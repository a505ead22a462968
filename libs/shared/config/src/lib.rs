use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// When a booked slot goes back to `available`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SlotReleasePolicy {
    /// Only cancelling/deleting the appointment frees the slot. Completed
    /// appointments keep their slot booked as a record of the visit.
    #[default]
    OnDeletion,
    /// Moving the appointment to `completed` also frees the slot.
    OnCompletion,
}

impl fmt::Display for SlotReleasePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotReleasePolicy::OnDeletion => write!(f, "on_deletion"),
            SlotReleasePolicy::OnCompletion => write!(f, "on_completion"),
        }
    }
}

impl FromStr for SlotReleasePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on_deletion" | "deletion" => Ok(SlotReleasePolicy::OnDeletion),
            "on_completion" | "completion" => Ok(SlotReleasePolicy::OnCompletion),
            other => Err(format!("Unknown slot release policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store_url: String,
    pub store_api_key: String,
    pub jwt_secret: String,
    pub port: u16,
    pub slot_release_policy: SlotReleasePolicy,
    pub compensate_orphans: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_url: String::new(),
            store_api_key: String::new(),
            jwt_secret: String::new(),
            port: 3000,
            slot_release_policy: SlotReleasePolicy::default(),
            compensate_orphans: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            store_url: env::var("DOCUMENT_STORE_URL")
                .unwrap_or_else(|_| {
                    warn!("DOCUMENT_STORE_URL not set, falling back to in-memory store");
                    String::new()
                }),
            store_api_key: env::var("DOCUMENT_STORE_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("DOCUMENT_STORE_API_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("AUTH_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("AUTH_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            port: env::var("API_PORT")
                .ok()
                .and_then(|raw| match raw.parse::<u16>() {
                    Ok(port) => Some(port),
                    Err(_) => {
                        warn!("API_PORT is not a valid port ({}), using default", raw);
                        None
                    }
                })
                .unwrap_or(defaults.port),
            slot_release_policy: env::var("SLOT_RELEASE_POLICY")
                .ok()
                .and_then(|raw| match raw.parse::<SlotReleasePolicy>() {
                    Ok(policy) => Some(policy),
                    Err(e) => {
                        warn!("{}, using default", e);
                        None
                    }
                })
                .unwrap_or(defaults.slot_release_policy),
            compensate_orphans: env::var("BOOKING_COMPENSATE_ORPHANS")
                .ok()
                .map(|raw| parse_flag(&raw, defaults.compensate_orphans))
                .unwrap_or(defaults.compensate_orphans),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        self.is_remote_store_configured() && !self.jwt_secret.is_empty()
    }

    pub fn is_remote_store_configured(&self) -> bool {
        !self.store_url.is_empty() && !self.store_api_key.is_empty()
    }
}

fn parse_flag(raw: &str, fallback: bool) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            warn!("Unrecognised boolean value '{}', using {}", raw, fallback);
            fallback
        }
    }
}
