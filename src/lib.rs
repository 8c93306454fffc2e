//! Gmail Filter Manager
//!
//! Converts Gmail mail filters between three forms: the XML export Gmail
//! produces and imports, a hand-editable YAML file, and the filter
//! resources of the Gmail REST API.
//!
//! # Overview
//!
//! - **Codecs**: [`xml`] and [`yaml`] read and write a [`Filter`], the
//!   internal form shared by every pipeline
//! - **API mapping**: [`filter_mapper`] turns API filters into entries and
//!   back, resolving label IDs through a [`LabelResolver`]
//! - **Session**: [`GmailContext`] fetches filters and labels once per command
//!
//! # Example Usage
//!
//! ```no_run
//! use gmail_filter_manager::{xml, yaml};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let filter = xml::read("mailFilters.xml").await?;
//!     yaml::write("mailFilters.yaml", &filter).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`auth`] - OAuth2 authentication and Gmail API initialization
//! - [`client`] - Gmail API client trait and production implementation
//! - [`cli`] - Command-line parsing and command resolution
//! - [`commands`] - Subcommand pipelines
//! - [`config`] - Configuration management
//! - [`context`] - Fetch-once session cache
//! - [`error`] - Error types and result aliases
//! - [`filter_mapper`] - API filter to entry mapping
//! - [`label_resolver`] - Label ID and name lookups
//! - [`mapping`] - XML/API vocabulary tables
//! - [`models`] - Core data structures

pub mod auth;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod filter_mapper;
pub mod label_resolver;
pub mod mapping;
pub mod models;
pub mod xml;
pub mod yaml;

// Re-export commonly used types for convenience
pub use error::{GfmError, Result};

// Core data models
pub use models::{Filter, FilterEntry, Namespaces, PropertyValue};

// Client traits
pub use client::{GmailClient, LabelInfo, ProductionGmailClient};

pub use context::GmailContext;
pub use label_resolver::LabelResolver;

// Config types
pub use config::{AuthConfig, Config, FileConfig};

// CLI types (for binary usage)
pub use cli::{Cli, Command, Commands, ProgressReporter, PutOptions};
