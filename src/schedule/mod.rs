use std::sync::RwLock;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Manual override for the service-availability gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServiceMode {
    /// Evaluate the configured open/close hour window.
    #[default]
    Auto,
    /// Accept orders regardless of the hour window.
    ForcedOpen,
    /// Reject orders regardless of the hour window.
    ForcedClosed,
}

/// Open/close hour window, evaluated in a fixed UTC offset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ServiceHours {
    #[serde(default = "default_open_hour", rename = "openHour")]
    pub open_hour: u32,
    #[serde(default = "default_close_hour", rename = "closeHour")]
    pub close_hour: u32,
    #[serde(default = "default_utc_offset", rename = "utcOffsetHours")]
    pub utc_offset_hours: i32,
}

fn default_open_hour() -> u32 {
    6
}

fn default_close_hour() -> u32 {
    22
}

fn default_utc_offset() -> i32 {
    3
}

impl Default for ServiceHours {
    fn default() -> Self {
        Self {
            open_hour: default_open_hour(),
            close_hour: default_close_hour(),
            utc_offset_hours: default_utc_offset(),
        }
    }
}

/// Process-wide service-availability gate, consulted before any state
/// transition that would progress a conversation.
///
/// The mode is the only mutable part; admins flip it at runtime via
/// `/open`, `/close` and `/auto`.
pub struct ServiceGate {
    hours: ServiceHours,
    offset: FixedOffset,
    mode: RwLock<ServiceMode>,
}

impl ServiceGate {
    pub fn new(hours: ServiceHours, mode: ServiceMode) -> Result<Self> {
        if hours.open_hour >= 24 || hours.close_hour > 24 {
            anyhow::bail!(
                "Service hours out of range: open={} close={}",
                hours.open_hour,
                hours.close_hour
            );
        }
        let offset = FixedOffset::east_opt(hours.utc_offset_hours * 3600)
            .with_context(|| format!("Invalid UTC offset: {}", hours.utc_offset_hours))?;
        Ok(Self {
            hours,
            offset,
            mode: RwLock::new(mode),
        })
    }

    pub fn mode(&self) -> ServiceMode {
        *self.mode.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn set_mode(&self, mode: ServiceMode) {
        *self
            .mode
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = mode;
    }

    pub fn is_open(&self) -> bool {
        self.is_open_at(Utc::now())
    }

    /// Gate decision at a specific instant. Split out so the hour-window
    /// logic is testable without wall-clock dependence.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        match self.mode() {
            ServiceMode::ForcedOpen => true,
            ServiceMode::ForcedClosed => false,
            ServiceMode::Auto => {
                let local: DateTime<FixedOffset> = now.with_timezone(&self.offset);
                self.hours.open_hour <= local.hour() && local.hour() < self.hours.close_hour
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn gate(mode: ServiceMode) -> ServiceGate {
        // 06:00–22:00 at UTC+3
        ServiceGate::new(
            ServiceHours {
                open_hour: 6,
                close_hour: 22,
                utc_offset_hours: 3,
            },
            mode,
        )
        .unwrap()
    }

    #[test]
    fn auto_mode_follows_hour_window_in_local_offset() {
        let g = gate(ServiceMode::Auto);
        // 04:00 UTC = 07:00 local → open
        let morning = Utc.with_ymd_and_hms(2024, 5, 1, 4, 0, 0).unwrap();
        assert!(g.is_open_at(morning));
        // 20:00 UTC = 23:00 local → closed
        let night = Utc.with_ymd_and_hms(2024, 5, 1, 20, 0, 0).unwrap();
        assert!(!g.is_open_at(night));
        // 03:00 UTC = 06:00 local → boundary opens
        let open_edge = Utc.with_ymd_and_hms(2024, 5, 1, 3, 0, 0).unwrap();
        assert!(g.is_open_at(open_edge));
        // 19:00 UTC = 22:00 local → boundary closes
        let close_edge = Utc.with_ymd_and_hms(2024, 5, 1, 19, 0, 0).unwrap();
        assert!(!g.is_open_at(close_edge));
    }

    #[test]
    fn forced_modes_ignore_the_clock() {
        let night = Utc.with_ymd_and_hms(2024, 5, 1, 23, 30, 0).unwrap();
        assert!(gate(ServiceMode::ForcedOpen).is_open_at(night));
        let noon = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        assert!(!gate(ServiceMode::ForcedClosed).is_open_at(noon));
    }

    #[test]
    fn mode_override_is_observable_after_set() {
        let g = gate(ServiceMode::Auto);
        g.set_mode(ServiceMode::ForcedClosed);
        assert_eq!(g.mode(), ServiceMode::ForcedClosed);
        assert!(!g.is_open());
    }

    #[test]
    fn rejects_out_of_range_hours() {
        assert!(
            ServiceGate::new(
                ServiceHours {
                    open_hour: 25,
                    close_hour: 26,
                    utc_offset_hours: 0,
                },
                ServiceMode::Auto,
            )
            .is_err()
        );
    }
}
