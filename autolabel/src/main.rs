//! Pull request auto-labeler.
//!
//! Reads `.github/auto-label.json`, diffs the pull request against the merge
//! base of its head and base commits, and adds/removes ruled labels so the PR
//! carries exactly the labels its changed files call for.

use std::path::PathBuf;

use anyhow::{Context, Result};
use autolabel::core::types::LabelSet;
use autolabel::exit_codes;
use autolabel::io::config::{CONFIG_PATH, load_config};
use autolabel::io::context::{ActionContext, ContextInputs, PULL_REQUEST_EVENT};
use autolabel::io::git::Git;
use autolabel::io::github::{DEFAULT_GRAPHQL_URL, GitHubClient};
use autolabel::logging;
use autolabel::plan::{PlanOutcome, plan_labels};
use autolabel::reconcile::{NeutralReason, RunOutcome, run_reconcile};
use clap::{Args, Parser, Subcommand};
use tracing::error;

#[derive(Parser)]
#[command(
    name = "autolabel",
    version,
    about = "Label pull requests from file-path glob rules"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile the pull request's labels (GitHub Actions entrypoint).
    Run(RunArgs),
    /// Print the labels a diff would add/remove, without calling GitHub.
    Plan(PlanArgs),
    /// Check the rules file against its schema and glob syntax.
    Validate(ConfigArgs),
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Repository checkout to operate in.
    #[arg(long, env = "GITHUB_WORKSPACE", default_value = ".")]
    workspace: PathBuf,
    /// Rules file, relative to the workspace.
    #[arg(long, default_value = CONFIG_PATH)]
    config: PathBuf,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    config: ConfigArgs,
    /// Repository as `owner/name`.
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repository: Option<String>,
    /// Triggering event name.
    #[arg(long, env = "GITHUB_EVENT_NAME", default_value = PULL_REQUEST_EVENT)]
    event_name: String,
    /// Webhook payload JSON (supplies the action and PR number).
    #[arg(long, env = "GITHUB_EVENT_PATH")]
    event_path: Option<PathBuf>,
    /// Pull request number; overrides the payload.
    #[arg(long)]
    number: Option<u64>,
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,
    #[arg(long, env = "GITHUB_GRAPHQL_URL", default_value = DEFAULT_GRAPHQL_URL)]
    graphql_url: String,
    /// Compute and log the label delta without mutating the pull request.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct PlanArgs {
    #[command(flatten)]
    config: ConfigArgs,
    /// Base commit or branch the pull request targets.
    #[arg(long)]
    base: String,
    /// Head commit of the pull request.
    #[arg(long, default_value = "HEAD")]
    head: String,
    /// Labels currently on the pull request.
    #[arg(long, value_delimiter = ',')]
    current: Vec<String>,
    /// Print the plan as JSON.
    #[arg(long)]
    json: bool,
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            error!(error = %format!("{err:#}"), "autolabel failed");
            eprintln!("{:#}", err);
            exit_codes::FAILURE
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Run(args) => cmd_run(args),
        Command::Plan(args) => cmd_plan(args),
        Command::Validate(args) => cmd_validate(args),
    }
}

fn cmd_run(args: RunArgs) -> Result<i32> {
    let ctx = ActionContext::from_inputs(ContextInputs {
        workspace: args.config.workspace.clone(),
        config: args.config.config.clone(),
        repository: args.repository,
        event_name: args.event_name,
        event_path: args.event_path,
        number: args.number,
        dry_run: args.dry_run,
    })?;
    let client = GitHubClient::new(args.token.as_deref(), args.graphql_url)?;
    let git = Git::new(&ctx.workspace);

    match run_reconcile(&ctx, &client, &git)? {
        RunOutcome::Neutral(reason) => {
            match reason {
                NeutralReason::ConfigAbsent(path) => {
                    println!("neutral: config file does not exist ({})", path.display());
                }
                NeutralReason::UnsupportedEvent(event) => {
                    println!("neutral: event {event} is not handled");
                }
            }
            Ok(exit_codes::NEUTRAL)
        }
        RunOutcome::Reconciled(report) => {
            println!(
                "run: desired={} added={} removed={} dry_run={}",
                join(&report.plan.desired),
                join(&report.added),
                join(&report.removed),
                report.dry_run
            );
            if !report.unknown.is_empty() {
                eprintln!(
                    "warning: labels not defined in repository: {}",
                    join(&report.unknown)
                );
            }
            Ok(exit_codes::OK)
        }
    }
}

fn cmd_plan(args: PlanArgs) -> Result<i32> {
    let config_path = args.config.workspace.join(&args.config.config);
    let git = Git::new(&args.config.workspace);
    let current: LabelSet = args
        .current
        .iter()
        .map(|label| label.trim().to_string())
        .filter(|label| !label.is_empty())
        .collect();

    match plan_labels(&config_path, &git, &args.head, &args.base, current)? {
        PlanOutcome::ConfigAbsent => {
            println!(
                "neutral: config file does not exist ({})",
                config_path.display()
            );
            Ok(exit_codes::NEUTRAL)
        }
        PlanOutcome::Planned(plan) => {
            if args.json {
                let payload = serde_json::to_string_pretty(&plan).context("serialize plan")?;
                println!("{payload}");
            } else {
                println!("plan: files={}", plan.changed_files.len());
                println!("plan: desired={}", join(&plan.desired));
                println!("plan: add={}", join(&plan.delta.to_add));
                println!("plan: remove={}", join(&plan.delta.to_remove));
            }
            Ok(exit_codes::OK)
        }
    }
}

fn cmd_validate(args: ConfigArgs) -> Result<i32> {
    let config_path = args.workspace.join(&args.config);
    match load_config(&config_path)? {
        Some(config) => {
            println!("valid: {} rule(s) in {}", config.rules.len(), config_path.display());
            Ok(exit_codes::OK)
        }
        None => {
            println!(
                "neutral: config file does not exist ({})",
                config_path.display()
            );
            Ok(exit_codes::NEUTRAL)
        }
    }
}

fn join(labels: &LabelSet) -> String {
    labels.iter().cloned().collect::<Vec<_>>().join(",")
}
