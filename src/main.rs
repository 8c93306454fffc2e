use anyhow::Result;
use gmail_filter_manager::auth::{self, AuthSettings};
use gmail_filter_manager::cli::{self, Command, Commands, Invocation, ProgressReporter};
use gmail_filter_manager::client::ProductionGmailClient;
use gmail_filter_manager::commands;
use gmail_filter_manager::config::Config;
use gmail_filter_manager::context::GmailContext;
use indicatif::MultiProgress;
use std::io::Write;
use std::process;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// A writer that prints through MultiProgress to avoid spinner conflicts
#[derive(Clone)]
struct MultiProgressWriter {
    multi: Arc<MultiProgress>,
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MultiProgressWriter {
    fn new(multi: Arc<MultiProgress>) -> Self {
        Self {
            multi,
            buffer: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn buffer(&self) -> MutexGuard<'_, Vec<u8>> {
        self.buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Write for MultiProgressWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut buffer = self.buffer();
        if !buffer.is_empty() {
            let msg = String::from_utf8_lossy(&buffer);
            let msg = msg.trim_end_matches('\n');
            if !msg.is_empty() {
                // A hidden MultiProgress drops println output
                if self.multi.is_hidden() {
                    eprintln!("{}", msg);
                } else {
                    let _ = self.multi.println(msg);
                }
            }
            buffer.clear();
        }
        Ok(())
    }
}

impl Drop for MultiProgressWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// MakeWriter implementation for tracing
#[derive(Clone)]
struct MultiProgressMakeWriter {
    multi: Arc<MultiProgress>,
}

impl<'a> MakeWriter<'a> for MultiProgressMakeWriter {
    type Writer = MultiProgressWriter;

    fn make_writer(&'a self) -> Self::Writer {
        MultiProgressWriter::new(Arc::clone(&self.multi))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    // On non-Windows platforms, use aws-lc-rs; on Windows, use ring
    #[cfg(not(windows))]
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    #[cfg(windows)]
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    let cli = cli::parse_args(std::env::args_os())?;

    let default_filter = if cli.debug {
        "gmail_filter_manager=debug,gfm=debug,warn"
    } else {
        "gmail_filter_manager=info,gfm=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let multi_progress = Arc::new(MultiProgress::new());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(MultiProgressMakeWriter {
            multi: Arc::clone(&multi_progress),
        })
        .with_target(false)
        .init();

    // init_config must work even when the existing file is broken
    let config = if matches!(cli.command, Commands::InitConfig { .. }) {
        Config::default()
    } else {
        Config::load(&cli.config_path()).await?
    };
    let invocation = cli.resolve(&config);
    let reporter = ProgressReporter::with_multi_progress((*multi_progress).clone());
    let mut stdout = std::io::stdout();

    match &invocation.command {
        Command::XmlToYaml { input, output } => {
            let count = commands::xml_to_yaml(input, output).await?;
            println!("Converted {} filters from {:?} to {:?}", count, input, output);
        }

        Command::YamlToXml { input, output } => {
            let count = commands::yaml_to_xml(input, output).await?;
            println!("Converted {} filters from {:?} to {:?}", count, input, output);
        }

        Command::ShowFilters { input } => commands::show_filters(input, &mut stdout).await?,

        Command::ShowFilterXml { input } => commands::show_filter_xml(input, &mut stdout).await?,

        Command::InitConfig { path, force } => {
            commands::init_config(path, *force, &mut stdout).await?
        }

        Command::Auth { force } => {
            let ctx = connect(&invocation, *force).await?;
            let email = ctx.client().get_profile().await?;
            println!("Successfully authenticated with Gmail API");
            println!("Token stored at: {:?}", invocation.auth_file);
            println!("Connected to account: {}", email);
        }

        Command::Get { output } => {
            let mut ctx = connect(&invocation, false).await?;
            let filter = commands::get(&mut ctx, output, &reporter).await?;
            println!("Wrote {} filters to {:?}", filter.len(), output);
        }

        Command::Put { input, options } => {
            let mut ctx = connect(&invocation, false).await?;
            commands::put(
                &mut ctx,
                input,
                *options,
                &reporter,
                &mut stdout,
                cli::confirm_action,
            )
            .await?;
        }

        Command::ShowFilterApi { raw } => {
            let mut ctx = connect(&invocation, false).await?;
            commands::show_filter_api(&mut ctx, *raw, &reporter, &mut stdout).await?;
        }

        Command::ShowLabelsApi { raw } => {
            let mut ctx = connect(&invocation, false).await?;
            commands::show_labels_api(&mut ctx, *raw, &reporter, &mut stdout).await?;
        }
    }

    Ok(())
}

/// Authorizes and wraps the hub in a session context
async fn connect(invocation: &Invocation, force: bool) -> Result<GmailContext> {
    let settings = AuthSettings::resolve(
        invocation.auth_file.clone(),
        invocation.client_id.clone(),
        invocation.client_secret.clone(),
    )?;

    // No spinner here: the browser flow prints its URL to the terminal
    tracing::info!("Authenticating with Gmail API...");
    let hub = auth::initialize_gmail_hub(&settings, force).await?;
    Ok(GmailContext::new(Box::new(ProductionGmailClient::new(hub))))
}
