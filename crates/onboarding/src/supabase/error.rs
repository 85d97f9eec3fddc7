use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when talking to Supabase.
#[derive(Debug, Error)]
pub enum SupabaseError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Supabase answered with an error response.
    #[error("API error: {status} - {message}")]
    Api {
        status: u16,
        message: String,
        /// Machine-readable code (`error_code` or PostgREST `code`) when present.
        code: Option<String>,
    },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A privileged call was made on a client built without the service-role key.
    #[error("Supabase service role key is not configured")]
    MissingServiceRoleKey,
}

impl SupabaseError {
    pub(crate) fn from_response(status: StatusCode, body: &str) -> Self {
        let message = error_message(body).unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            } else {
                trimmed.to_string()
            }
        });

        Self::Api {
            status: status.as_u16(),
            message,
            code: error_code(body),
        }
    }

    /// HTTP status of an API error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Remote message of an API error, verbatim.
    #[must_use]
    pub fn api_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Machine-readable code of an API error.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// Extract the human-readable message from a Supabase error body.
///
/// GoTrue and PostgREST disagree on the field name; the first string found
/// among `msg`, `message`, `error_description` and `error` wins.
#[must_use]
pub fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

fn error_code(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error_code", "code"].iter().find_map(|key| match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_field_order() {
        assert_eq!(
            error_message(r#"{"msg":"Email not confirmed","message":"other"}"#).as_deref(),
            Some("Email not confirmed")
        );
        assert_eq!(
            error_message(r#"{"message":"relation does not exist"}"#).as_deref(),
            Some("relation does not exist")
        );
        assert_eq!(
            error_message(
                r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#
            )
            .as_deref(),
            Some("Invalid login credentials")
        );
        assert_eq!(
            error_message(r#"{"error":"invalid_grant"}"#).as_deref(),
            Some("invalid_grant")
        );
        assert_eq!(error_message("upstream timeout"), None);
        assert_eq!(error_message(r#"{"code":400}"#), None);
    }

    #[test]
    fn test_from_response() {
        let err = SupabaseError::from_response(
            StatusCode::BAD_REQUEST,
            r#"{"code":400,"error_code":"email_not_confirmed","msg":"Email not confirmed"}"#,
        );
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.api_message(), Some("Email not confirmed"));
        assert_eq!(err.code(), Some("email_not_confirmed"));

        let err = SupabaseError::from_response(StatusCode::BAD_GATEWAY, "");
        assert_eq!(err.api_message(), Some("Bad Gateway"));

        let err = SupabaseError::from_response(StatusCode::NOT_FOUND, "no such route\n");
        assert_eq!(err.api_message(), Some("no such route"));
        assert_eq!(err.code(), None);
    }
}
