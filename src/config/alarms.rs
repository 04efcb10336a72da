//! Alarm profiles (`_alarms.yml`).
//!
//! ```yaml
//! default:
//!   when:
//!     - danger: 1
//!       fails: 2
//!       raises: 1
//!       alarms:
//!         mail: [ops@example.com]
//!     - danger: 5
//!       alarms:
//!         mail: [ops@example.com, cto@example.com]
//!         execute: ["logger -t site-monitor"]
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use super::yaml::describe;
use crate::error_handling::ConfigError;

/// Name of the profile used when a site doesn't select one.
pub const DEFAULT_PROFILE: &str = "default";

fn one() -> u32 {
    1
}

/// Delivery channels of a danger level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlarmChannels {
    /// E-mail receivers
    #[serde(default)]
    pub mail: Vec<String>,
    /// Shell commands, fed the report on stdin
    #[serde(default)]
    pub execute: Vec<String>,
    /// Slack targets (not delivered)
    #[serde(default)]
    pub slack: Vec<String>,
}

/// One `when` entry of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DangerLevel {
    /// Lowest check danger this level applies to
    #[serde(default = "one")]
    pub danger: u32,
    /// Consecutive failures before alarming
    #[serde(default = "one")]
    pub fails: u32,
    /// Successes needed to clear a failure
    #[serde(default = "one")]
    pub raises: u32,
    #[serde(default)]
    pub alarms: AlarmChannels,
}

/// Danger levels of one profile, highest danger first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlarmProfile {
    levels: Vec<DangerLevel>,
}

impl AlarmProfile {
    pub fn new(mut levels: Vec<DangerLevel>) -> Self {
        // stable: levels sharing a danger keep their document order
        levels.sort_by(|a, b| b.danger.cmp(&a.danger));
        Self { levels }
    }

    pub fn levels(&self) -> &[DangerLevel] {
        &self.levels
    }

    /// The highest level whose threshold the danger reaches.
    pub fn level_for(&self, danger: u32) -> Option<&DangerLevel> {
        self.levels.iter().find(|level| danger >= level.danger)
    }
}

/// All profiles of `_alarms.yml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmProfiles {
    profiles: HashMap<String, AlarmProfile>,
}

impl AlarmProfiles {
    /// Reads and parses `_alarms.yml`.
    ///
    /// # Errors
    ///
    /// Fails when the file is unreadable, malformed, or lacks a `default` profile.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let value: Value =
            serde_yaml::from_str(text).map_err(|e| ConfigError::Syntax(e.to_string()))?;
        Self::from_value(&value)
    }

    /// Builds profiles from a parsed document.
    ///
    /// Top-level entries whose value is not a mapping are ignored, so the file
    /// can carry YAML anchors or notes next to the profiles.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let map = value.as_mapping().ok_or_else(|| ConfigError::InvalidField {
            field: "alarms".into(),
            message: format!("expected a mapping of profiles, got {}", describe(value)),
        })?;

        let mut profiles = HashMap::new();
        for (name, body) in map {
            let (Some(name), Some(body)) = (name.as_str(), body.as_mapping()) else {
                log::debug!("Ignoring alarm entry {}", describe(name));
                continue;
            };

            let levels = match body.get("when") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Sequence(cases)) => cases
                    .iter()
                    .map(|case| {
                        serde_yaml::from_value::<DangerLevel>(case.clone()).map_err(|e| {
                            ConfigError::InvalidField {
                                field: format!("{name}.when"),
                                message: e.to_string(),
                            }
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                Some(other) => {
                    return Err(ConfigError::InvalidField {
                        field: format!("{name}.when"),
                        message: format!("expected a list, got {}", describe(other)),
                    })
                }
            };

            profiles.insert(name.to_string(), AlarmProfile::new(levels));
        }

        if !profiles.contains_key(DEFAULT_PROFILE) {
            return Err(ConfigError::MissingDefaultProfile);
        }
        Ok(Self { profiles })
    }

    /// Returns the named profile, falling back to the default one.
    pub fn profile(&self, name: Option<&str>) -> &AlarmProfile {
        let name = name.unwrap_or(DEFAULT_PROFILE);
        match self.profiles.get(name) {
            Some(profile) => profile,
            None => {
                log::warn!("Unknown alarm profile {:?}, using {:?}", name, DEFAULT_PROFILE);
                self.default_profile()
            }
        }
    }

    fn default_profile(&self) -> &AlarmProfile {
        static EMPTY: AlarmProfile = AlarmProfile { levels: Vec::new() };
        self.profiles.get(DEFAULT_PROFILE).unwrap_or(&EMPTY)
    }
}
