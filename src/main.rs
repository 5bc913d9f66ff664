//! Stratosphere CLI entrypoint.
//!
//! This is the main entrypoint for the stratosphere command-line tool.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use stratosphere::catalog::CatalogFile;
use stratosphere::cli::{Cli, Commands, OutputFormatter, StdinConfirmer};
use stratosphere::config::{Settings, SettingsParser, SettingsValidator};
use stratosphere::error::{Result, StratosphereError};
use stratosphere::reconciler::{AutoApprove, Confirmer, Reconciler, ReconciliationResult};
use stratosphere::remote::DeploymentManagerClient;
use stratosphere::template::{Template, TemplateContext};

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    // Initialize logging
    init_logging(cli.verbose);

    // Every remote call is awaited in order, one thread is enough.
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(cli));
    // An interrupted prompt leaves a stdin read on the blocking pool.
    runtime.shutdown_background();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system on stderr; `RUST_LOG` takes precedence.
fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "info,reqwest=warn,hyper=warn",
        1 => "debug,reqwest=warn,hyper=warn",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if std::env::var("STRATOSPHERE_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let parser = SettingsParser::new();
    parser.load_dotenv()?;

    let mut settings = parser.resolve(cli.config.as_deref())?;
    apply_flags(&mut settings, &cli);
    SettingsValidator::new().validate(&settings)?;
    debug!("Resolved settings: {settings:?}");

    let formatter = OutputFormatter::new();

    match cli.command {
        Commands::Render { catalog, summary } => cmd_render(&settings, &catalog, summary, &formatter),
        Commands::Apply { catalog, yes, .. } => {
            let mut template = load_template(&settings, &catalog)?;
            let client = connect(&settings)?;
            let confirmer = confirmer(yes);
            let reconciler = reconciler(&client, confirmer.as_ref(), &settings);

            let result = until_interrupted(reconciler.apply(&mut template)).await?;
            report(&result, &formatter)
        }
        Commands::Delete { catalog, yes, .. } => {
            let template = load_template(&settings, &catalog)?;
            let client = connect(&settings)?;
            let confirmer = confirmer(yes);
            let reconciler = reconciler(&client, confirmer.as_ref(), &settings);

            let result = until_interrupted(reconciler.delete(template.name())).await?;
            report(&result, &formatter)
        }
    }
}

/// Applies CLI flags over the resolved settings.
fn apply_flags(settings: &mut Settings, cli: &Cli) {
    if let Some(project) = &cli.project {
        settings.project = Some(project.clone());
    }
    if let Some(environment) = &cli.environment {
        settings.environment = Some(environment.clone());
    }
    if let Some(format) = cli.format {
        settings.format = Some(format);
    }

    let (poll_interval, timeout) = match &cli.command {
        Commands::Render { .. } => (None, None),
        Commands::Apply {
            poll_interval, timeout, ..
        }
        | Commands::Delete {
            poll_interval, timeout, ..
        } => (*poll_interval, *timeout),
    };
    if let Some(interval) = poll_interval {
        settings.poll.interval_secs = interval;
    }
    if let Some(timeout) = timeout {
        settings.poll.timeout_secs = Some(timeout);
    }
}

/// Builds the template described by a catalog file.
fn load_template(settings: &Settings, catalog: &Path) -> Result<Template> {
    let project = settings.require_project()?;
    let environment = settings.require_environment()?;
    let source = CatalogFile::load(catalog)?;

    Ok(Template::new(TemplateContext::new(project, environment), source).with_format(settings.format()))
}

/// Render the manifest to stdout.
fn cmd_render(settings: &Settings, catalog: &Path, summary: bool, formatter: &OutputFormatter) -> Result<()> {
    let mut template = load_template(settings, catalog)?;
    let text = template.render()?.to_string();

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;

    if summary {
        eprintln!("\nTemplate {} ({})", template.name(), template.description());
        eprint!("{}", formatter.format_resources(&template.manifest()?));
    }

    Ok(())
}

fn connect(settings: &Settings) -> Result<DeploymentManagerClient> {
    let token = SettingsParser::access_token()?;
    DeploymentManagerClient::with_options(
        &settings.api.base_url,
        settings.require_project()?,
        &token,
        settings.api.timeout_secs,
    )
}

fn confirmer(yes: bool) -> Box<dyn Confirmer> {
    if yes {
        Box::new(AutoApprove)
    } else {
        Box::new(StdinConfirmer::new())
    }
}

fn reconciler<'a>(
    client: &'a DeploymentManagerClient,
    confirmer: &'a dyn Confirmer,
    settings: &Settings,
) -> Reconciler<'a, DeploymentManagerClient> {
    Reconciler::new(client, confirmer)
        .with_poll_interval(Duration::from_secs(settings.poll.interval_secs))
        .with_deadline(settings.poll_deadline())
}

/// Runs `work` until it finishes or Ctrl-C is pressed.
async fn until_interrupted<T>(work: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::pin!(work);
    tokio::select! {
        result = &mut work => result,
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => Err(StratosphereError::internal(
                "interrupted, the remote operation may still be running",
            )),
            Err(e) => {
                warn!("Failed to listen for Ctrl-C: {e}");
                work.await
            }
        },
    }
}

fn report(result: &ReconciliationResult, formatter: &OutputFormatter) -> Result<()> {
    info!("{result}");
    eprint!("{}", formatter.format_result(result));
    Ok(())
}
