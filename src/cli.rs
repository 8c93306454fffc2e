//! Command-line interface

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{self, Config};
use crate::error::{GfmError, Result};

#[derive(Parser, Debug)]
#[command(name = "gfm")]
#[command(version)]
#[command(
    about = "Manage Gmail filters as XML exports, YAML files and Gmail API resources",
    long_about = None
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Gmail XML export to read [default: mailFilters.xml]
    #[arg(short = 'x', long = "input_xml", global = true)]
    pub input_xml: Option<PathBuf>,

    /// YAML filter file to read [default: mailFilters.yaml]
    #[arg(short = 'y', long = "input_yaml", global = true)]
    pub input_yaml: Option<PathBuf>,

    /// XML file to write [default: filters.xml]
    #[arg(short = 'X', long = "output_xml", global = true)]
    pub output_xml: Option<PathBuf>,

    /// YAML file to write [default: mailFilters.yaml]
    #[arg(short = 'Y', long = "output_yaml", global = true)]
    pub output_yaml: Option<PathBuf>,

    /// OAuth token file [default: <config dir>/gmail_filter/auth]
    #[arg(long = "auth_file", global = true)]
    pub auth_file: Option<PathBuf>,

    /// OAuth client ID
    #[arg(long = "client_id", global = true)]
    pub client_id: Option<String>,

    /// OAuth client secret
    #[arg(long = "client_secret", global = true)]
    pub client_secret: Option<String>,

    /// Print API resources as raw JSON
    #[arg(short, long, global = true)]
    pub raw: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Convert the XML export into YAML
    #[command(name = "xml2yaml", visible_alias = "x2y")]
    Xml2Yaml,

    /// Convert the YAML file into a Gmail XML export
    #[command(name = "yaml2xml", visible_alias = "y2x")]
    Yaml2Xml,

    /// Download the account's filters into the YAML file
    #[command(name = "get")]
    Get,

    /// Create the YAML file's filters in the account
    #[command(name = "put")]
    Put {
        /// Show what would change without changing anything
        #[arg(long)]
        dry_run: bool,

        /// Also delete account filters that are not in the YAML file
        #[arg(long)]
        prune: bool,

        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },

    /// Print the filters of the YAML file
    #[command(name = "show_filters", visible_alias = "sf")]
    ShowFilters,

    /// Print the filters of the XML export
    #[command(name = "show_filter_xml", visible_alias = "sfx")]
    ShowFilterXml,

    /// Print the account's filters as the API returns them
    #[command(name = "show_filterapi", visible_alias = "sfa")]
    ShowFilterApi,

    /// Print the account's labels
    #[command(name = "show_labels_api", visible_alias = "sla")]
    ShowLabelsApi,

    /// Authenticate with Gmail API
    #[command(name = "auth")]
    Auth {
        /// Discard the stored token and authorize again
        #[arg(long)]
        force: bool,
    },

    /// Write a configuration file with the default settings
    #[command(name = "init_config")]
    InitConfig {
        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

/// Options of the `put` command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PutOptions {
    pub dry_run: bool,
    pub prune: bool,
    pub yes: bool,
}

/// A subcommand with the paths and flags it operates on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    XmlToYaml { input: PathBuf, output: PathBuf },
    YamlToXml { input: PathBuf, output: PathBuf },
    Get { output: PathBuf },
    Put { input: PathBuf, options: PutOptions },
    ShowFilters { input: PathBuf },
    ShowFilterXml { input: PathBuf },
    ShowFilterApi { raw: bool },
    ShowLabelsApi { raw: bool },
    Auth { force: bool },
    InitConfig { path: PathBuf, force: bool },
}

/// Fully resolved invocation: flags over config over defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: Command,
    pub auth_file: PathBuf,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Parses process arguments; an unknown subcommand is [`GfmError::UnknownCommand`]
///
/// Help, version and other usage errors are printed by clap, which exits.
pub fn parse_args<I, T>(args: I) -> Result<Cli>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Ok(cli),
        Err(e) if e.kind() == ErrorKind::InvalidSubcommand => {
            let token = match e.get(ContextKind::InvalidSubcommand) {
                Some(ContextValue::String(token)) => token.clone(),
                _ => "<unknown>".to_string(),
            };
            Err(GfmError::UnknownCommand(token))
        }
        Err(e) => e.exit(),
    }
}

impl Cli {
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(config::default_config_path)
    }

    pub fn resolve(&self, config: &Config) -> Invocation {
        let files = &config.files;
        let pick = |flag: &Option<PathBuf>, configured: &PathBuf| {
            flag.clone().unwrap_or_else(|| configured.clone())
        };
        let input_xml = pick(&self.input_xml, &files.input_xml);
        let input_yaml = pick(&self.input_yaml, &files.input_yaml);
        let output_xml = pick(&self.output_xml, &files.output_xml);
        let output_yaml = pick(&self.output_yaml, &files.output_yaml);

        let command = match &self.command {
            Commands::Xml2Yaml => Command::XmlToYaml {
                input: input_xml,
                output: output_yaml,
            },
            Commands::Yaml2Xml => Command::YamlToXml {
                input: input_yaml,
                output: output_xml,
            },
            Commands::Get => Command::Get {
                output: output_yaml,
            },
            Commands::Put {
                dry_run,
                prune,
                yes,
            } => Command::Put {
                input: input_yaml,
                options: PutOptions {
                    dry_run: *dry_run,
                    prune: *prune,
                    yes: *yes,
                },
            },
            Commands::ShowFilters => Command::ShowFilters { input: input_yaml },
            Commands::ShowFilterXml => Command::ShowFilterXml { input: input_xml },
            Commands::ShowFilterApi => Command::ShowFilterApi { raw: self.raw },
            Commands::ShowLabelsApi => Command::ShowLabelsApi { raw: self.raw },
            Commands::Auth { force } => Command::Auth { force: *force },
            Commands::InitConfig { force } => Command::InitConfig {
                path: self.config_path(),
                force: *force,
            },
        };

        Invocation {
            command,
            auth_file: self
                .auth_file
                .clone()
                .or_else(|| config.auth.auth_file.clone())
                .unwrap_or_else(config::default_auth_file),
            client_id: self
                .client_id
                .clone()
                .or_else(|| config.auth.client_id.clone()),
            client_secret: self
                .client_secret
                .clone()
                .or_else(|| config.auth.client_secret.clone()),
        }
    }
}

/// Progress reporter using indicatif
pub struct ProgressReporter {
    multi: MultiProgress,
    spinner_style: ProgressStyle,
}

impl ProgressReporter {
    /// Reporter drawing through an existing `MultiProgress`
    pub fn with_multi_progress(multi: MultiProgress) -> Self {
        // Use {elapsed} for human-readable format (e.g., "1s", "234ms")
        let spinner_style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed:>6}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ");

        Self {
            multi,
            spinner_style,
        }
    }

    /// Reporter that draws nothing
    pub fn hidden() -> Self {
        Self::with_multi_progress(MultiProgress::with_draw_target(ProgressDrawTarget::hidden()))
    }

    pub fn add_spinner(&self, msg: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(self.spinner_style.clone());
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Finish a spinner and leave a one-line summary in its place
    pub fn finish_spinner(&self, pb: &ProgressBar, msg: &str) {
        pb.finish_and_clear();
        let _ = self.multi.println(format!("  ✓ {}", msg));
    }
}

/// Ask the user a yes/no question, defaulting to no
pub fn confirm_action(prompt: &str) -> Result<bool> {
    inquire::Confirm::new(prompt)
        .with_default(false)
        .prompt()
        .map_err(|e| {
            GfmError::IoError(std::io::Error::new(
                std::io::ErrorKind::Interrupted,
                e.to_string(),
            ))
        })
}
