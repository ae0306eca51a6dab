// ABOUTME: Classification of status strings reported by the deployment API.
// ABOUTME: Unknown values are treated as still in progress.

use std::fmt;

/// Where a remote deployment currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentStatus {
    /// Queued or running; carries the raw status string.
    Pending(String),
    Succeeded,
    /// Terminal failure; carries the raw status string.
    Failed(String),
}

impl DeploymentStatus {
    /// Classify a raw status. Matching ignores case and surrounding whitespace.
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "succeeded" | "success" | "completed" => DeploymentStatus::Succeeded,
            "failed" | "error" | "cancelled" | "canceled" => DeploymentStatus::Failed(normalized),
            _ => DeploymentStatus::Pending(normalized),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, DeploymentStatus::Pending(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            DeploymentStatus::Pending(raw) | DeploymentStatus::Failed(raw) => raw,
            DeploymentStatus::Succeeded => "succeeded",
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_aliases() {
        for raw in ["succeeded", "success", "Completed", " SUCCESS "] {
            assert_eq!(DeploymentStatus::parse(raw), DeploymentStatus::Succeeded, "{raw}");
        }
    }

    #[test]
    fn failure_aliases_are_terminal() {
        for raw in ["failed", "error", "cancelled", "canceled"] {
            let status = DeploymentStatus::parse(raw);
            assert!(matches!(status, DeploymentStatus::Failed(_)), "{raw}");
            assert!(status.is_terminal());
        }
    }

    #[test]
    fn anything_else_is_pending() {
        for raw in ["pending", "queued", "in_progress", "running", "warming-up", ""] {
            let status = DeploymentStatus::parse(raw);
            assert!(matches!(status, DeploymentStatus::Pending(_)), "{raw}");
            assert!(!status.is_terminal());
        }
    }

    #[test]
    fn display_keeps_the_reported_value() {
        assert_eq!(DeploymentStatus::parse("In_Progress").to_string(), "in_progress");
        assert_eq!(DeploymentStatus::Succeeded.to_string(), "succeeded");
    }
}
