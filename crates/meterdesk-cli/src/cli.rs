//! Command-line parsing, configuration layering, and dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use meterdesk_client::{ApiClient, ClientSettings, Screen};
use meterdesk_config::{ClientConfig, ConfigLoader, validate::validate};
use meterdesk_core::SortDirection;
use meterdesk_telemetry::{LogFormat, LoggingConfig, init_logging};
use tracing::{Instrument, info_span};
use uuid::Uuid;

use crate::client::{AppContext, CliError, CliResult, parse_key_value, parse_sort};
use crate::commands::adjustments::{handle_approve, handle_reject};
use crate::commands::browse::handle_browse;
use crate::commands::list::{handle_list, handle_screens, handle_show};
use crate::commands::reports::{handle_report_request, handle_report_watch};

/// Parses CLI arguments, executes the requested command, and reports the
/// outcome. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let command_name = command_label(&cli.command);
    let trace_id = Uuid::new_v4().to_string();

    let ctx = match prepare(&cli, &trace_id) {
        Ok(ctx) => ctx,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            return err.exit_code();
        }
    };

    let span = info_span!("meterdesk", trace_id = %trace_id, command = command_name);
    match dispatch(cli, &ctx).instrument(span).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

fn prepare(cli: &Cli, trace_id: &str) -> CliResult<AppContext> {
    let config = resolve_config(cli, ConfigLoader::new())?;
    init_logging(&LoggingConfig {
        level: &config.log.level,
        format: LogFormat::from_label(config.log.format.as_deref()),
        build_sha: option_env!("METERDESK_BUILD_SHA").unwrap_or("dev"),
    })
    .map_err(CliError::failure)?;
    let client = ApiClient::new(&ClientSettings {
        base_url: config.api_url.clone(),
        timeout: config.timeout(),
        session_cookie: config.session_cookie.clone(),
        request_id: Some(trace_id.to_string()),
    })?;
    Ok(AppContext { client, config })
}

/// Layer command-line overrides on top of the loaded configuration.
fn resolve_config(cli: &Cli, loader: ConfigLoader) -> CliResult<ClientConfig> {
    let loader = match &cli.config {
        Some(path) => loader.with_path(path),
        None => loader,
    };
    let mut config = loader.load()?;
    if let Some(url) = &cli.api_url {
        config.api_url.clone_from(url);
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    validate(&config)?;
    Ok(config)
}

pub(crate) async fn dispatch(cli: Cli, ctx: &AppContext) -> CliResult<()> {
    let output = cli.output;
    match cli.command {
        Command::Screens => handle_screens(output),
        Command::Ls(args) => handle_list(ctx, args, output).await,
        Command::Show(args) => handle_show(ctx, args, output).await,
        Command::Browse(args) => handle_browse(ctx, args, output).await,
        Command::Report(ReportCommand::Request(args)) => {
            handle_report_request(ctx, args, output).await
        }
        Command::Report(ReportCommand::Watch(args)) => {
            handle_report_watch(ctx, args, output).await
        }
        Command::Adjustment(AdjustmentCommand::Approve(args)) => {
            handle_approve(ctx, args, output).await
        }
        Command::Adjustment(AdjustmentCommand::Reject(args)) => {
            handle_reject(ctx, args, output).await
        }
    }
}

#[derive(Parser)]
#[command(name = "meterdesk", about = "Admin console for the Meterdesk billing API")]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "METERDESK_CONFIG",
        help = "JSON configuration file"
    )]
    pub(crate) config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the configured API base URL")]
    pub(crate) api_url: Option<String>,
    #[arg(long, global = true, help = "Override the request timeout in seconds")]
    pub(crate) timeout: Option<u64>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// List the available screens.
    Screens,
    /// Fetch one page of a screen.
    Ls(ListArgs),
    /// Show one record of a screen.
    Show(ShowArgs),
    /// Browse a screen interactively.
    Browse(BrowseArgs),
    /// Request and track report jobs.
    #[command(subcommand)]
    Report(ReportCommand),
    /// Decide meter reading adjustments.
    #[command(subcommand)]
    Adjustment(AdjustmentCommand),
}

#[derive(Subcommand)]
pub(crate) enum ReportCommand {
    /// Submit a report job.
    Request(ReportRequestArgs),
    /// Poll existing report jobs until they finish.
    Watch(ReportWatchArgs),
}

#[derive(Subcommand)]
pub(crate) enum AdjustmentCommand {
    /// Approve a pending adjustment.
    Approve(ApproveArgs),
    /// Reject a pending adjustment.
    Reject(RejectArgs),
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ListArgs {
    #[arg(help = "Screen to list (see `meterdesk screens`)")]
    pub(crate) screen: Screen,
    #[arg(long, help = "Free-text search")]
    pub(crate) search: Option<String>,
    #[arg(long = "filter", value_parser = parse_key_value, help = "Filter as key=value; repeatable")]
    pub(crate) filters: Vec<(String, String)>,
    #[arg(long, value_parser = parse_sort, help = "Sort as field[:asc|desc]")]
    pub(crate) sort: Option<(String, SortDirection)>,
    #[arg(long, default_value_t = 1, help = "One-based page number")]
    pub(crate) page: u32,
    #[arg(long, help = "Rows per page")]
    pub(crate) page_size: Option<u32>,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ShowArgs {
    #[arg(help = "Screen the record belongs to")]
    pub(crate) screen: Screen,
    #[arg(help = "Record identifier")]
    pub(crate) id: String,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct BrowseArgs {
    #[arg(help = "Screen to browse")]
    pub(crate) screen: Screen,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ReportRequestArgs {
    #[arg(help = "Report type, e.g. billing-summary")]
    pub(crate) kind: String,
    #[arg(long = "param", value_parser = parse_key_value, help = "Report parameter as key=value; repeatable")]
    pub(crate) parameters: Vec<(String, String)>,
    #[arg(long, help = "Poll until the job finishes")]
    pub(crate) wait: bool,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ReportWatchArgs {
    #[arg(required = true, help = "Report job identifiers")]
    pub(crate) ids: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ApproveArgs {
    #[arg(help = "Adjustment identifier")]
    pub(crate) id: String,
    #[arg(long, help = "Submit without checking the current status first")]
    pub(crate) skip_check: bool,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct RejectArgs {
    #[arg(help = "Adjustment identifier")]
    pub(crate) id: String,
    #[arg(long, help = "Reason recorded with the rejection")]
    pub(crate) reason: String,
    #[arg(long, help = "Submit without checking the current status first")]
    pub(crate) skip_check: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Screens => "screens",
        Command::Ls(_) => "ls",
        Command::Show(_) => "show",
        Command::Browse(_) => "browse",
        Command::Report(ReportCommand::Request(_)) => "report_request",
        Command::Report(ReportCommand::Watch(_)) => "report_watch",
        Command::Adjustment(AdjustmentCommand::Approve(_)) => "adjustment_approve",
        Command::Adjustment(AdjustmentCommand::Reject(_)) => "adjustment_reject",
    }
}
