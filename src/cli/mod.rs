//! CLI module - Command-line interface for EduFlow
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// EduFlow - school administration back office
#[derive(Parser)]
#[command(name = "eduflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API server
    #[command(alias = "serve", alias = "-d", alias = "--daemon")]
    Daemon,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Show recent activity and PIN verifications
    Audit {
        /// Number of entries to show
        #[arg(default_value = "20")]
        limit: u64,
        /// Show the PIN audit instead of the activity log
        #[arg(long)]
        pin: bool,
    },
}

#[derive(Subcommand)]
pub enum AdminCommands {
    /// List all admins
    #[command(alias = "ls")]
    List,
    /// Create an active admin
    Create {
        username: String,
        email: String,
        /// Display name, defaults to the username
        #[arg(long)]
        name: Option<String>,
        /// Read from EDUFLOW_ADMIN_PASSWORD when omitted
        #[arg(long, env = "EDUFLOW_ADMIN_PASSWORD")]
        password: String,
    },
    /// Set an admin's management PIN
    SetPin { username: String, pin: String },
    /// Set a new password and clear any lockout
    ResetPassword {
        username: String,
        #[arg(long, env = "EDUFLOW_ADMIN_PASSWORD")]
        password: String,
    },
    /// Approve a pending signup
    Approve { username: String },
}

pub use commands::*;
