//! Configuration of the DLB integration
//!
//! All configuration is explicit: it is loaded once by the caller (usually the cron
//! binary) and passed into the orchestrator at construction time. The sync core keeps
//! no process-wide mutable state.

use std::error::Error;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::brigade::Brigade;

fn default_timeout_seconds() -> u64 {
    30
}

fn default_generate_months_ahead() -> u32 {
    12
}

/// Settings for talking to the remote DLB system
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DlbConfig {
    /// Master switch. When false, sync runs return immediately without any remote call
    pub enabled: bool,
    /// Base URL of the DLB API, e.g. `https://dlb.example.org/api/v1`
    pub api_base_url: String,
    /// Bearer token attached to every request
    pub api_token: String,
    /// Per-request timeout
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Default horizon for muster generation
    #[serde(default = "default_generate_months_ahead")]
    pub generate_months_ahead: u32,
}

impl Default for DlbConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_base_url: String::new(),
            api_token: String::new(),
            timeout_seconds: default_timeout_seconds(),
            generate_months_ahead: default_generate_months_ahead(),
        }
    }
}

impl DlbConfig {
    /// Whether the integration is both switched on and has a token to authenticate with
    pub fn has_token(&self) -> bool {
        self.api_token.trim().is_empty() == false
    }
}

/// The settings file consumed by the cron binary: the DLB connection plus the
/// configured brigades
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    pub dlb: DlbConfig,
    pub brigades: Vec<Brigade>,
}

impl SyncSettings {
    /// Load settings from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        let file = match std::fs::File::open(path) {
            Err(err) => return Err(format!("Unable to open settings file {:?}: {}", path, err).into()),
            Ok(file) => file,
        };
        let settings = serde_json::from_reader(file)?;
        Ok(settings)
    }

    /// The brigade to sync: the requested id, or the sole configured brigade by default
    pub fn brigade<'a>(&'a self, id: Option<&str>) -> Result<&'a Brigade, Box<dyn Error>> {
        match id {
            Some(id) => self
                .brigades
                .iter()
                .find(|b| b.id() == id)
                .ok_or_else(|| format!("No brigade {:?} in the settings file", id).into()),
            None => match self.brigades.as_slice() {
                [single] => Ok(single),
                [] => Err("No brigades are configured".into()),
                _ => Err("Several brigades are configured, specify one with --brigade".into()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::holidays::Region;
    use chrono::{NaiveTime, Weekday};

    fn settings_with_brigades(ids: &[&str]) -> SyncSettings {
        SyncSettings {
            dlb: DlbConfig::default(),
            brigades: ids
                .iter()
                .map(|id| {
                    Brigade::new(
                        *id,
                        format!("Brigade {}", id),
                        Region::National,
                        Weekday::Mon,
                        NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
                        2,
                    )
                })
                .collect(),
        }
    }

    #[test]
    fn brigade_selection() {
        let settings = settings_with_brigades(&["b1"]);
        assert_eq!(settings.brigade(None).unwrap().id(), "b1");
        assert_eq!(settings.brigade(Some("b1")).unwrap().id(), "b1");
        assert!(settings.brigade(Some("nope")).is_err());

        let settings = settings_with_brigades(&["b1", "b2"]);
        assert!(settings.brigade(None).is_err());
        assert_eq!(settings.brigade(Some("b2")).unwrap().id(), "b2");

        let settings = settings_with_brigades(&[]);
        assert!(settings.brigade(None).is_err());
    }

    #[test]
    fn config_defaults_applied_on_parse() {
        let json = r#"{"enabled": true, "api_base_url": "https://dlb.example.org/api", "api_token": "secret"}"#;
        let config: DlbConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.timeout_seconds, 30);
        assert_eq!(config.generate_months_ahead, 12);
        assert!(config.has_token());

        let config = DlbConfig::default();
        assert!(!config.has_token());
    }
}
