//! Game configuration schema, YAML loading, and validation.
//!
//! Configuration is supplied by the orchestration layer when a session is
//! created: the role list to deal out, per-phase durations, and an optional
//! shuffle seed for reproducible role assignment. Validation collects every
//! issue it finds instead of failing on the first.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::role::{Alignment, Role};
use crate::session::phase::Phase;

/// A `Duration` that serializes as a humantime string (`"90s"`, `"2m"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration(pub Duration);

impl Serialize for HumanDuration {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(self.0).to_string())
    }
}

impl<'de> Deserialize<'de> for HumanDuration {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw)
            .map(HumanDuration)
            .map_err(serde::de::Error::custom)
    }
}

/// Configuration for one game session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// The role list dealt to seats. Its length is the expected player count.
    pub roles: Vec<Role>,

    /// Per-phase duration overrides. Phases not listed use
    /// [`GameConfig::DEFAULT_PHASE_DURATION`].
    #[serde(default)]
    pub phase_durations: BTreeMap<Phase, HumanDuration>,

    /// Seed for the role shuffle. When absent a random seed is drawn and
    /// recorded in the `RolesAssigned` event for later reproduction.
    #[serde(default)]
    pub shuffle_seed: Option<u64>,
}

impl GameConfig {
    /// Fallback duration for phases without a configured override.
    pub const DEFAULT_PHASE_DURATION: Duration = Duration::from_secs(60);

    /// Duration for `phase`, falling back to the default.
    #[must_use]
    pub fn duration_for(&self, phase: Phase) -> Duration {
        self.phase_durations
            .get(&phase)
            .map_or(Self::DEFAULT_PHASE_DURATION, |d| d.0)
    }

    /// Parses a configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Yaml`] on malformed YAML.
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Loads a configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Io`] if the file cannot be read and
    /// [`EngineError::Yaml`] on malformed YAML.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    /// Validates the configuration, collecting all issues found.
    #[must_use]
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if self.roles.is_empty() {
            issues.push(ValidationIssue::error("roles", "role list is empty"));
        }

        let antagonists = self
            .roles
            .iter()
            .filter(|r| r.alignment() == Alignment::Werewolf)
            .count();
        let others = self.roles.len() - antagonists;

        if !self.roles.is_empty() && antagonists == 0 {
            issues.push(ValidationIssue::error(
                "roles",
                "no antagonist-aligned role; the game would be over before it starts",
            ));
        }
        if antagonists > 0 && antagonists >= others {
            issues.push(ValidationIssue::error(
                "roles",
                "antagonists are not outnumbered; the game would end at the first check",
            ));
        }

        for unique in [Role::Seer, Role::Witch, Role::Guard] {
            if self.roles.iter().filter(|r| **r == unique).count() > 1 {
                issues.push(ValidationIssue::warning(
                    "roles",
                    format!("more than one {unique} in the role list"),
                ));
            }
        }

        for (phase, duration) in &self.phase_durations {
            if duration.0.is_zero() {
                issues.push(ValidationIssue::error(
                    format!("phase_durations.{phase}"),
                    "duration must be non-zero",
                ));
            }
        }

        issues
    }

    /// Validates and converts any error-severity issue into an
    /// [`EngineError::Config`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] carrying every issue found when at
    /// least one has error severity. Warnings alone do not fail.
    pub fn validated(self) -> Result<Self> {
        let issues = self.validate();
        if issues.iter().any(|i| i.severity == Severity::Error) {
            return Err(EngineError::Config { issues });
        }
        for issue in issues {
            tracing::warn!(path = %issue.path, "config warning: {}", issue.message);
        }
        Ok(self)
    }
}

/// A single issue found during configuration validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g. `"phase_durations.Night"`).
    pub path: String,
    /// Description of the issue.
    pub message: String,
    /// Severity level.
    pub severity: Severity,
}

impl ValidationIssue {
    fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{prefix}: {} at {}", self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Prevents the configuration from being used.
    Error,
    /// Suspicious but usable.
    Warning,
}
