//! Synchronization scopes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The key identifying one independent synchronization session.
///
/// A scope always names a user. When both `script_id` and `version_id` are
/// present it additionally names one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    /// The user whose pipelines are watched.
    pub user_id: String,
    /// The script, when watching a specific pipeline run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_id: Option<String>,
    /// The script version, when watching a specific pipeline run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
}

impl Scope {
    /// Creates a user-wide scope.
    #[must_use]
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            script_id: None,
            version_id: None,
        }
    }

    /// Creates a scope for one pipeline run.
    #[must_use]
    pub fn pipeline_run(
        user_id: impl Into<String>,
        script_id: impl Into<String>,
        version_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            script_id: Some(script_id.into()),
            version_id: Some(version_id.into()),
        }
    }

    /// Returns `(script_id, version_id)` when the scope names a pipeline run.
    #[must_use]
    pub fn run_keys(&self) -> Option<(&str, &str)> {
        match (self.script_id.as_deref(), self.version_id.as_deref()) {
            (Some(script), Some(version)) => Some((script, version)),
            _ => None,
        }
    }

    /// Returns true if the scope names a pipeline run.
    #[must_use]
    pub fn has_pipeline_run(&self) -> bool {
        self.run_keys().is_some()
    }

    /// Returns true if an event carrying `keys` belongs to this scope.
    ///
    /// A key only rules an event out when both sides carry it and the
    /// values differ.
    #[must_use]
    pub fn accepts(&self, keys: &EventScope) -> bool {
        fn compatible(ours: Option<&str>, theirs: Option<&str>) -> bool {
            match (ours, theirs) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
        }

        compatible(Some(&self.user_id), keys.user_id.as_deref())
            && compatible(self.script_id.as_deref(), keys.script_id.as_deref())
            && compatible(self.version_id.as_deref(), keys.version_id.as_deref())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user:{}", self.user_id)?;
        if let Some(script) = &self.script_id {
            write!(f, "/script:{script}")?;
        }
        if let Some(version) = &self.version_id {
            write!(f, "/version:{version}")?;
        }
        Ok(())
    }
}

/// Scope keys carried by an inbound event. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventScope {
    /// The user the event belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// The script the event belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_id: Option<String>,
    /// The script version the event belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
}

impl From<&Scope> for EventScope {
    fn from(scope: &Scope) -> Self {
        Self {
            user_id: Some(scope.user_id.clone()),
            script_id: scope.script_id.clone(),
            version_id: scope.version_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_keys() {
        assert_eq!(Scope::user("u").run_keys(), None);
        assert_eq!(
            Scope::pipeline_run("u", "s", "v").run_keys(),
            Some(("s", "v"))
        );

        let partial = Scope {
            user_id: "u".into(),
            script_id: Some("s".into()),
            version_id: None,
        };
        assert!(!partial.has_pipeline_run());
    }

    #[test]
    fn test_accepts_matching_and_missing_keys() {
        let scope = Scope::pipeline_run("u", "s", "v");

        assert!(scope.accepts(&EventScope::default()));
        assert!(scope.accepts(&EventScope {
            user_id: Some("u".into()),
            script_id: Some("s".into()),
            version_id: Some("v".into()),
        }));
        assert!(!scope.accepts(&EventScope {
            script_id: Some("other".into()),
            ..EventScope::default()
        }));
        assert!(!scope.accepts(&EventScope {
            user_id: Some("someone-else".into()),
            ..EventScope::default()
        }));
    }

    #[test]
    fn test_user_scope_accepts_run_events() {
        let scope = Scope::user("u");
        assert!(scope.accepts(&EventScope {
            user_id: Some("u".into()),
            script_id: Some("s".into()),
            version_id: Some("v".into()),
        }));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Scope::pipeline_run("u", "s", "v").to_string(),
            "user:u/script:s/version:v"
        );
        assert_eq!(Scope::user("u").to_string(), "user:u");
    }
}
