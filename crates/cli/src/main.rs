//! Voice Vanguard Vault CLI - email delivery and Supabase diagnostics.
//!
//! # Usage
//!
//! ```bash
//! # Try every known payload shape against the email webhook
//! vv-cli webhook shapes --to me@example.com
//!
//! # Send one verification email through the configured webhook
//! vv-cli webhook send --to me@example.com
//!
//! # Send one verification email through SMTP
//! vv-cli smtp send --to me@example.com
//!
//! # Check auth settings and table access
//! vv-cli supabase check
//!
//! # Perform a real sign-up
//! vv-cli supabase signup --email me@example.com --password 'hunter22'
//! ```
//!
//! Settings come from the same environment (and `.env`) as the service.

#![cfg_attr(not(test), forbid(unsafe_code))]
// Diagnostics report on stdout
#![allow(clippy::print_stdout)]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "vv-cli")]
#[command(author, version, about = "Voice Vanguard Vault diagnostics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Email webhook diagnostics
    Webhook {
        #[command(subcommand)]
        action: WebhookAction,
    },
    /// Direct SMTP diagnostics
    Smtp {
        #[command(subcommand)]
        action: SmtpAction,
    },
    /// Supabase diagnostics
    Supabase {
        #[command(subcommand)]
        action: SupabaseAction,
    },
}

#[derive(Subcommand)]
enum WebhookAction {
    /// POST every known payload shape and print the raw answers
    Shapes {
        /// Recipient address
        #[arg(short, long)]
        to: String,

        /// Webhook URL (defaults to `N8N_WEBHOOK_URL`)
        #[arg(short, long)]
        url: Option<String>,
    },
    /// Send one verification email
    Send {
        /// Recipient address
        #[arg(short, long)]
        to: String,
    },
}

#[derive(Subcommand)]
enum SmtpAction {
    /// Send one verification email
    Send {
        /// Recipient address
        #[arg(short, long)]
        to: String,
    },
}

#[derive(Subcommand)]
enum SupabaseAction {
    /// Report auth settings, app tables and code table lockdown
    Check,
    /// Sign up a real user
    Signup {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,

        /// Stored as `full_name` user metadata
        #[arg(short = 'n', long)]
        full_name: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Webhook { action } => match action {
            WebhookAction::Shapes { to, url } => {
                commands::webhook::shapes(&to, url.as_deref()).await?;
            }
            WebhookAction::Send { to } => commands::webhook::send(&to).await?,
        },
        Commands::Smtp { action } => match action {
            SmtpAction::Send { to } => commands::smtp::send(&to).await?,
        },
        Commands::Supabase { action } => match action {
            SupabaseAction::Check => commands::supabase::check().await?,
            SupabaseAction::Signup {
                email,
                password,
                full_name,
            } => commands::supabase::signup(&email, &password, full_name.as_deref()).await?,
        },
    }
    Ok(())
}
