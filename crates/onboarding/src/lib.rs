//! Voice Vanguard Vault onboarding service.
//!
//! This crate provides the onboarding API as a library, allowing it to be
//! tested end to end and reused by the diagnostics CLI.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod codes;
pub mod config;
pub mod error;
pub mod mailer;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod supabase;
