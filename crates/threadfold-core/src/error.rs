use std::fmt;

use crate::api::ApiError;

/// Machine-readable error codes for scripts and log scraping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    AccountNotFound,
    StatusNotFound,
    ApiRequestFailed,
    ApiDecodeFailed,
    MissingForestEntry,
    CycleDetected,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::AccountNotFound => "E2001",
            Self::StatusNotFound => "E2002",
            Self::ApiRequestFailed => "E4001",
            Self::ApiDecodeFailed => "E4002",
            Self::MissingForestEntry => "E7001",
            Self::CycleDetected => "E7002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::AccountNotFound => "Account not found",
            Self::StatusNotFound => "Status not found",
            Self::ApiRequestFailed => "Conversation API request failed",
            Self::ApiDecodeFailed => "Conversation API returned malformed JSON",
            Self::MissingForestEntry => "Reply forest is missing a guaranteed entry",
            Self::CycleDetected => "Reply forest contains a cycle",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to the user.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => {
                Some("Fix syntax in <config dir>/threadfold/config.toml and retry.")
            }
            Self::AccountNotFound => Some("Check the handle, including the @domain part."),
            Self::StatusNotFound => None,
            Self::ApiRequestFailed => {
                Some("Check the instance URL and token; the server may be rate limiting.")
            }
            Self::ApiDecodeFailed => Some("The instance may not speak the Mastodon API."),
            Self::MissingForestEntry | Self::CycleDetected | Self::InternalUnexpected => {
                Some("Reload with `newest`. If persistent, report a bug with logs.")
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised while growing or classifying the reply forest.
///
/// [`ForestError::MissingKey`] and [`ForestError::CycleDetected`] are
/// invariant violations: they are reachable only through corrupted state and
/// abort the ingestion step that observed them.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// A lookup that the forest invariants guarantee came back empty.
    #[error("invariant violated: {map} has no entry for '{key}'")]
    MissingKey {
        /// Which index was consulted.
        map: &'static str,
        /// The absent key.
        key: String,
    },

    /// A status was reached from itself while walking the forest.
    #[error("invariant violated: cycle through '{0}'")]
    CycleDetected(String),

    /// The conversation API failed; statuses merged earlier in the batch stay merged.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ForestError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::MissingKey { .. } => ErrorCode::MissingForestEntry,
            Self::CycleDetected(_) => ErrorCode::CycleDetected,
            Self::Api(api) => api.code(),
        }
    }

    /// Returns `true` for errors that mean the forest itself is corrupt.
    #[must_use]
    pub const fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::MissingKey { .. } | Self::CycleDetected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::ConfigParseError,
            ErrorCode::AccountNotFound,
            ErrorCode::StatusNotFound,
            ErrorCode::ApiRequestFailed,
            ErrorCode::ApiDecodeFailed,
            ErrorCode::MissingForestEntry,
            ErrorCode::CycleDetected,
            ErrorCode::InternalUnexpected,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::MissingForestEntry.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn invariant_errors_are_flagged() {
        let missing = ForestError::MissingKey {
            map: "id_to_status",
            key: "7".into(),
        };
        assert!(missing.is_invariant_violation());
        assert_eq!(missing.code(), ErrorCode::MissingForestEntry);
        assert_eq!(
            missing.to_string(),
            "invariant violated: id_to_status has no entry for '7'"
        );

        let api = ForestError::from(ApiError::NotFound("9".into()));
        assert!(!api.is_invariant_violation());
        assert_eq!(api.code(), ErrorCode::StatusNotFound);
    }
}
