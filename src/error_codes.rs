use std::fmt;

use anyhow::Error;
use serde::Serialize;

pub const NO_ANSI_FILES: &str = "NO_ANSI_FILES";
pub const THEME_KEY_MISSING: &str = "THEME_KEY_MISSING";
pub const THEME_INVALID_COLOR: &str = "THEME_INVALID_COLOR";
pub const SVG_PARSE_FAILED: &str = "SVG_PARSE_FAILED";
pub const MALFORMED_TRANSFORM: &str = "MALFORMED_TRANSFORM";
pub const MISSING_VIEWBOX: &str = "MISSING_VIEWBOX";
pub const INVALID_VIEWBOX: &str = "INVALID_VIEWBOX";

/// Fallback code for failures that never attached a [`CodedError`].
pub const UNCLASSIFIED: &str = "UNCLASSIFIED";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodedError {
    pub code: &'static str,
    pub message: String,
}

impl CodedError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            ok: false,
            error: ErrorEnvelopeBody {
                code: self.code.to_owned(),
                message: self.message.clone(),
            },
        }
    }
}

impl fmt::Display for CodedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CodedError {}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub ok: bool,
    pub error: ErrorEnvelopeBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelopeBody {
    pub code: String,
    pub message: String,
}

pub fn find_coded_error(error: &Error) -> Option<&CodedError> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<CodedError>())
}

/// Builds the JSON error envelope for any failure. Errors without a code keep the
/// full anyhow chain as the message.
pub fn envelope_for(error: &Error) -> ErrorEnvelope {
    match find_coded_error(error) {
        Some(coded) => ErrorEnvelope {
            ok: false,
            error: ErrorEnvelopeBody {
                code: coded.code.to_owned(),
                message: format!("{error:#}"),
            },
        },
        None => CodedError::new(UNCLASSIFIED, format!("{error:#}")).envelope(),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::{envelope_for, find_coded_error, CodedError, NO_ANSI_FILES, UNCLASSIFIED};

    #[test]
    fn coded_error_survives_context_layers() {
        let error = Err::<(), _>(CodedError::new(NO_ANSI_FILES, "nothing to do"))
            .context("failed to build screenshots")
            .unwrap_err();
        let coded = find_coded_error(&error).expect("coded error should be found in chain");
        assert_eq!(coded.code, NO_ANSI_FILES);

        let envelope = envelope_for(&error);
        assert!(!envelope.ok);
        assert_eq!(envelope.error.code, NO_ANSI_FILES);
        assert!(envelope.error.message.contains("failed to build screenshots"));
        assert!(envelope.error.message.contains("nothing to do"));
    }

    #[test]
    fn plain_errors_are_unclassified() {
        let error = anyhow::anyhow!("disk on fire");
        let envelope = envelope_for(&error);
        assert_eq!(envelope.error.code, UNCLASSIFIED);
        assert_eq!(envelope.error.message, "disk on fire");
    }
}
