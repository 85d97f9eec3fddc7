//! Uniform `{success, error?}` result shape.

use serde::{Deserialize, Serialize};

/// Outcome of an auth or delivery operation, as shown to the user.
///
/// Every failure is reduced to a single human-readable message; callers render
/// it as an inline alert.
///
/// ```
/// use vanguard_core::OperationResult;
///
/// let json = serde_json::to_string(&OperationResult::ok()).unwrap();
/// assert_eq!(json, r#"{"success":true}"#);
///
/// let failed = OperationResult::failure("Invalid verification code");
/// assert_eq!(failed.error(), Some("Invalid verification code"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Message to show when it did not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationResult {
    /// A successful result.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    /// A failed result carrying `message`.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
        }
    }

    /// Whether the operation succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }

    /// The failure message, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Convert into a `Result`, using a generic message when a failure carries none.
    ///
    /// # Errors
    ///
    /// Returns the failure message when `success` is false.
    pub fn into_result(self) -> Result<(), String> {
        if self.success {
            Ok(())
        } else {
            Err(self
                .error
                .unwrap_or_else(|| "Something went wrong".to_string()))
        }
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for OperationResult {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(_) => Self::ok(),
            Err(e) => Self::failure(e.to_string()),
        }
    }
}
