//! Core types for Voice Vanguard Vault.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod code;
pub mod email;
pub mod id;
pub mod result;

pub use code::{CODE_LENGTH, VerificationCode, VerificationCodeError};
pub use email::{Email, EmailError};
pub use id::UserId;
pub use result::OperationResult;
