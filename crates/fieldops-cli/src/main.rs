#![forbid(unsafe_code)]

mod cmd;
mod context;
mod credentials;
mod output;
mod validate;

use clap::{CommandFactory, Parser, Subcommand};
use context::AppContext;
use fieldops_core::client::QuickAction;
use fieldops_core::config::{self, load_user_config};
use fieldops_core::error::{ApiError, ErrorCode};
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use std::env;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "fo: dispatcher CLI for the field-service ticketing API",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format: pretty, text, or json.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for --format json.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Backend base URL (overrides FIELDOPS_API_URL and the config file).
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,

    /// Access token (overrides FIELDOPS_TOKEN and the saved session).
    #[arg(long, global = true, value_name = "TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Session",
        about = "Log in and save the access token",
        long_about = "Exchange a username and password for an access token and save it for later commands.",
        after_help = "EXAMPLES:\n    # Prompt for the password\n    fo login --username dispatch@example.com\n\n    # Non-interactive\n    FIELDOPS_PASSWORD=... fo login -u dispatch@example.com"
    )]
    Login(cmd::login::LoginArgs),

    #[command(next_help_heading = "Session", about = "Forget the saved access token")]
    Logout,

    #[command(
        next_help_heading = "Dispatch",
        about = "Show a dispatcher worklist",
        long_about = "Fetch a dispatcher queue and show each ticket with its recommended action.",
        after_help = "EXAMPLES:\n    # Everything that needs a dispatcher\n    fo queue\n\n    # Go-backs at one site\n    fo queue --queue goback --search S-1042"
    )]
    Queue(cmd::queue::QueueArgs),

    #[command(
        next_help_heading = "Dispatch",
        about = "Run the recommended action for a ticket",
        long_about = "Run the queue action for a ticket's workflow state. Scheduling actions need a date; approvals ask for confirmation.",
        after_help = "EXAMPLES:\n    # Schedule a needstech ticket as onsite\n    fo act T-1042 --date 2026-11-02\n\n    # Approve without prompting\n    fo act T-1043 --yes"
    )]
    Act(cmd::act::ActArgs),

    #[command(
        next_help_heading = "Dispatch",
        about = "Print the workflow state to action table"
    )]
    Actions,

    #[command(
        next_help_heading = "Dispatch",
        about = "Approve tickets in bulk",
        after_help = "EXAMPLES:\n    fo approve T-1 T-2 T-3"
    )]
    Approve(cmd::approve::ApproveArgs),

    #[command(
        next_help_heading = "Dispatch",
        about = "Workflow summary report",
        after_help = "EXAMPLES:\n    fo summary --lookback-days 7"
    )]
    Summary(cmd::summary::SummaryArgs),

    #[command(
        next_help_heading = "Tickets",
        about = "List tickets",
        after_help = "EXAMPLES:\n    # Active onsite tickets\n    fo list --type onsite\n\n    # Archived, page 2\n    fo list --status archived --page 2"
    )]
    List(cmd::list::ListArgs),

    #[command(next_help_heading = "Tickets", about = "Show a ticket with related records")]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Tickets",
        about = "Edit ticket fields",
        long_about = "Edit ticket fields. The write carries the version read when the ticket was loaded; if someone else saved in between, the edit is rejected and nothing is retried.",
        after_help = "EXAMPLES:\n    fo edit T-1042 --set priority=critical --set due_date="
    )]
    Edit(cmd::edit::EditArgs),

    #[command(
        next_help_heading = "Tickets",
        about = "Create a ticket",
        after_help = "EXAMPLES:\n    fo create --site S-1042 --type onsite --set inc_number=INC0012345"
    )]
    Create(cmd::edit::CreateArgs),

    #[command(next_help_heading = "Tickets", about = "Check in on site")]
    CheckIn(cmd::quick::QuickArgs),

    #[command(next_help_heading = "Tickets", about = "Check out from site")]
    CheckOut(cmd::quick::QuickArgs),

    #[command(next_help_heading = "Tickets", about = "Mark a ticket completed")]
    Complete(cmd::quick::QuickArgs),

    #[command(next_help_heading = "Tickets", about = "Claim a ticket")]
    Claim(cmd::quick::ClaimArgs),

    #[command(
        next_help_heading = "Tickets",
        about = "Add a comment to a ticket",
        after_help = "EXAMPLES:\n    fo comment T-1042 \"Tech running 30 min late\""
    )]
    Comment(cmd::comment::CommentArgs),

    #[command(
        next_help_heading = "Records",
        about = "List, show, create, update or delete other records"
    )]
    Resource(cmd::resource::ResourceArgs),

    #[command(next_help_heading = "Records", about = "Field-tech companies")]
    Company(cmd::company::CompanyArgs),

    #[command(
        next_help_heading = "Records",
        about = "Change a shipment's status",
        after_help = "EXAMPLES:\n    fo shipment-status 31 shipped"
    )]
    ShipmentStatus(cmd::shipment_status::ShipmentStatusArgs),

    #[command(
        next_help_heading = "Shell",
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    fo completions zsh > ~/.zfunc/_fo"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("FIELDOPS_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "fieldops=debug,info"
        } else {
            "fieldops=info,warn"
        })
    });

    let format = env::var("FIELDOPS_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: Cli, output: OutputMode, config: config::UserConfig) -> anyhow::Result<()> {
    // Commands that never talk to the backend.
    match cli.command {
        Commands::Actions => return cmd::actions::run_actions(output),
        Commands::Completions(ref args) => {
            let mut command = Cli::command();
            return cmd::completions::run_completions(args.shell, &mut command);
        }
        _ => {}
    }

    let ctx = AppContext::new(config, output, cli.api_url.as_deref(), cli.token)?;
    debug!(base_url = %ctx.config.api.base_url, "context ready");

    match cli.command {
        Commands::Login(ref args) => cmd::login::run_login(args, &ctx),
        Commands::Logout => cmd::login::run_logout(&ctx),
        Commands::Queue(ref args) => cmd::queue::run_queue(args, &ctx),
        Commands::Act(ref args) => cmd::act::run_act(args, &ctx),
        Commands::Actions | Commands::Completions(_) => Ok(()),
        Commands::Approve(ref args) => cmd::approve::run_approve(args, &ctx),
        Commands::Summary(ref args) => cmd::summary::run_summary(args, &ctx),
        Commands::List(ref args) => cmd::list::run_list(args, &ctx),
        Commands::Show(ref args) => cmd::show::run_show(args, &ctx),
        Commands::Edit(ref args) => cmd::edit::run_edit(args, &ctx),
        Commands::Create(ref args) => cmd::edit::run_create(args, &ctx),
        Commands::CheckIn(ref args) => {
            cmd::quick::run_quick(&args.id, &QuickAction::CheckIn, &ctx)
        }
        Commands::CheckOut(ref args) => {
            cmd::quick::run_quick(&args.id, &QuickAction::CheckOut, &ctx)
        }
        Commands::Complete(ref args) => {
            cmd::quick::run_quick(&args.id, &QuickAction::Complete, &ctx)
        }
        Commands::Claim(ref args) => cmd::quick::run_quick(&args.id, &args.action(), &ctx),
        Commands::Comment(ref args) => cmd::comment::run_comment(args, &ctx),
        Commands::Resource(ref args) => cmd::resource::run_resource(args, &ctx),
        Commands::Company(ref args) => cmd::company::run_company(args, &ctx),
        Commands::ShipmentStatus(ref args) => {
            cmd::shipment_status::run_shipment_status(args, &ctx)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let config = match load_user_config() {
        Ok(config) => config,
        Err(err) => {
            let mode = resolve_output_mode(cli.format, cli.json, None);
            let code = ErrorCode::ConfigParseError;
            let error = CliError::with_details(
                format!("{err:#}"),
                code.hint().unwrap_or_default(),
                code.code(),
            );
            let _ = render_error(mode, &error);
            return ExitCode::FAILURE;
        }
    };
    let output = resolve_output_mode(cli.format, cli.json, config.output.as_deref());

    match run(cli, output, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(api) = err.downcast_ref::<ApiError>() {
                debug!(code = api.error_code().code(), "command failed");
            }
            if let Err(render_err) = render_error(output, &CliError::from_anyhow(&err)) {
                eprintln!("error: {err:#} ({render_err})");
            }
            ExitCode::FAILURE
        }
    }
}
