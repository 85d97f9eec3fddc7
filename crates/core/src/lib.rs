//! Voice Vanguard Vault Core - Shared types library.
//!
//! This crate provides common types used across all Voice Vanguard Vault components:
//! - `onboarding` - Sign-up, sign-in and email verification service
//! - `recorder` - Voice clip capture with live transcription
//! - `cli` - Diagnostic commands for Supabase and the email webhook
//!
//! # Architecture
//!
//! The core crate contains only types and UI state models - no network clients,
//! no database access. Operations that need the network are injected through
//! traits (see [`code_entry::VerificationBackend`]).
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for emails, user IDs, verification codes, and results
//! - [`code_entry`] - Six-digit verification code entry model

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod code_entry;
pub mod types;

pub use code_entry::{CodeEntry, CodeEntryError, VerificationBackend, VerificationPrompt};
pub use types::*;
