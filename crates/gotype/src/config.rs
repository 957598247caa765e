//! User-facing configuration of how problems are reported.

use std::collections::BTreeMap;

use crate::diagnostic::{ProblemKind, Severity};

/// Preset mapping from problem kinds to severities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(serde::Serialize, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
    /// Type compatibility and operator problems are warnings.
    #[default]
    Lenient,
    /// Every problem except lints is an error.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct Config {
    pub profile: Profile,

    /// Severities which take precedence over the profile.
    pub overrides: BTreeMap<ProblemKind, Severity>,

    /// Report assignments to method receivers.
    pub receiver_lint: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            overrides: BTreeMap::new(),
            receiver_lint: true,
        }
    }
}

impl Config {
    pub fn with_profile(profile: Profile) -> Self {
        Self {
            profile,
            ..Self::default()
        }
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn severity(&self, kind: ProblemKind) -> Severity {
        if let Some(&severity) = self.overrides.get(&kind) {
            return severity;
        }

        match self.profile {
            Profile::Lenient if kind.is_type_compatibility() => Severity::Warning,
            Profile::Lenient | Profile::Strict => kind.default_severity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn lenient_downgrades_type_problems() {
        let config = Config::default();
        assert_eq!(config.severity(ProblemKind::TypeMismatch), Severity::Warning);
        assert_eq!(
            config.severity(ProblemKind::OperatorTypeMismatch),
            Severity::Warning
        );
        assert_eq!(
            config.severity(ProblemKind::AssignmentCountMismatch),
            Severity::Error
        );
        assert_eq!(
            config.severity(ProblemKind::ReceiverAssignment),
            Severity::WeakWarning
        );
    }

    #[test]
    fn strict_reports_errors() {
        let config = Config::with_profile(Profile::Strict);
        assert_eq!(config.severity(ProblemKind::NilToNonNilable), Severity::Error);
        assert_eq!(
            config.severity(ProblemKind::ReceiverAssignment),
            Severity::WeakWarning
        );
    }

    #[test]
    fn parse_overrides() {
        let config = Config::from_json(
            r#"{
                "profile": "strict",
                "overrides": { "type-mismatch": "weak_warning" },
                "receiver-lint": false
            }"#,
        )
        .unwrap();

        assert_eq!(config.profile, Profile::Strict);
        assert!(!config.receiver_lint);
        assert_eq!(
            config.severity(ProblemKind::TypeMismatch),
            Severity::WeakWarning
        );
        assert_eq!(
            config.severity(ProblemKind::InterfaceNotSatisfied),
            Severity::Error
        );
    }

    #[test]
    fn reject_unknown_fields() {
        assert!(Config::from_json(r#"{ "profil": "strict" }"#).is_err());
    }
}
