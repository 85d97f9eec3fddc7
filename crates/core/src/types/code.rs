//! One-time email verification code.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Number of digits in a verification code.
pub const CODE_LENGTH: usize = 6;

/// Errors that can occur when parsing a [`VerificationCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationCodeError {
    /// Wrong number of characters.
    #[error("Please enter all {CODE_LENGTH} digits")]
    WrongLength,
    /// A character other than an ASCII digit was found.
    #[error("Verification code must contain only digits")]
    NonDigit,
}

/// A six-digit verification code.
///
/// Leading zeros are significant: `"012345"` is a valid code and is kept as
/// text, never converted to a number.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VerificationCode(String);

impl VerificationCode {
    /// Parse a code, ignoring surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationCodeError::WrongLength`] unless exactly six
    /// characters remain, and [`VerificationCodeError::NonDigit`] if any of them
    /// is not an ASCII digit.
    pub fn parse(s: &str) -> Result<Self, VerificationCodeError> {
        let trimmed = s.trim();
        if trimmed.chars().count() != CODE_LENGTH {
            return Err(VerificationCodeError::WrongLength);
        }
        if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(VerificationCodeError::NonDigit);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Build a code from six digits, as collected by the entry widget.
    #[must_use]
    pub fn from_digits(digits: [u8; CODE_LENGTH]) -> Option<Self> {
        if digits.iter().all(|d| *d <= 9) {
            Some(Self(digits.iter().map(|d| char::from(b'0' + d)).collect()))
        } else {
            None
        }
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant-time comparison against another code.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.0
            .bytes()
            .zip(other.0.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

// Codes are credentials; keep them out of logs.
impl fmt::Debug for VerificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VerificationCode(******)")
    }
}

impl fmt::Display for VerificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for VerificationCode {
    type Err = VerificationCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VerificationCode {
    type Error = VerificationCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<VerificationCode> for String {
    fn from(code: VerificationCode) -> Self {
        code.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert_eq!(VerificationCode::parse("123456").unwrap().as_str(), "123456");
        assert_eq!(VerificationCode::parse(" 012345 ").unwrap().as_str(), "012345");
    }

    #[test]
    fn test_parse_wrong_length() {
        assert_eq!(
            VerificationCode::parse("12345"),
            Err(VerificationCodeError::WrongLength)
        );
        assert_eq!(
            VerificationCode::parse("1234567"),
            Err(VerificationCodeError::WrongLength)
        );
        assert_eq!(
            VerificationCode::parse(""),
            Err(VerificationCodeError::WrongLength)
        );
    }

    #[test]
    fn test_parse_non_digit() {
        assert_eq!(
            VerificationCode::parse("12a456"),
            Err(VerificationCodeError::NonDigit)
        );
        assert_eq!(
            VerificationCode::parse("١٢٣٤٥٦"),
            Err(VerificationCodeError::NonDigit)
        );
    }

    #[test]
    fn test_from_digits() {
        let code = VerificationCode::from_digits([0, 4, 2, 9, 1, 7]).unwrap();
        assert_eq!(code.as_str(), "042917");
        assert!(VerificationCode::from_digits([0, 4, 2, 10, 1, 7]).is_none());
    }

    #[test]
    fn test_matches() {
        let a = VerificationCode::parse("123456").unwrap();
        let b = VerificationCode::parse("123456").unwrap();
        let c = VerificationCode::parse("123457").unwrap();
        assert!(a.matches(&b));
        assert!(!a.matches(&c));
    }

    #[test]
    fn test_debug_is_redacted() {
        let code = VerificationCode::parse("987654").unwrap();
        assert!(!format!("{code:?}").contains("987654"));
    }
}
