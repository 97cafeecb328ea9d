//! RepoLens - chat with GitHub repositories
//!
//! A CLI that routes questions about a GitHub repository to a data agent
//! (live GitHub API access) or a reasoning agent (step-by-step analysis
//! that delegates data requests back to the data agent).
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (missing credentials, failed check, failed answer, etc.)

mod agent;
mod cli;
mod config;
mod diagnostics;
mod github;
mod llm;
mod models;
mod report;
mod router;
mod session;

use agent::RunEvent;
use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, Credentials, CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use models::RepoId;
use report::Transcript;
use session::{Session, TurnReply};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Sample questions offered by `/examples`.
const EXAMPLE_QUERIES: [&str; 6] = [
    "Summarize 'agno-agi/agno' repo",
    "Analyze 'pytorch/pytorch' repository structure",
    "Search for 'machine learning' related code in 'tensorflow/tensorflow'",
    "Summarize recent PRs in 'facebook/react'",
    "List CI/CD workflows in 'kubernetes/kubernetes'",
    "Analyze commit history of 'torvalds/linux'",
];

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up GROQ_API_KEY / GITHUB_ACCESS_TOKEN from .env when present
    dotenv::dotenv().ok();

    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("RepoLens v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("RepoLens failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .repolens.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize models, GitHub API access, and session storage.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the selected mode. Returns the process exit code.
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let credentials = match Credentials::from_env() {
        Ok(credentials) => credentials,
        Err(e) => {
            eprintln!("❌ {}", e);
            eprintln!(
                "   Set {} and {} in your environment or in a .env file.",
                Credentials::GROQ_API_KEY,
                Credentials::GITHUB_ACCESS_TOKEN
            );
            return Ok(1);
        }
    };
    debug!("Credentials: {:?}", credentials);

    let start_repo = args.repo_id()?;

    if args.check {
        return run_check(&config, &credentials, start_repo).await;
    }

    let mut session = Session::new(config, credentials, args.agent.into())?;

    let session_path = args
        .session
        .as_ref()
        .map(|file| session.config().session.resolve(file));
    if let Some(ref path) = session_path {
        if path.exists() {
            session.restore(path)?;
        } else {
            info!("No saved session at {}, starting fresh", path.display());
        }
    }
    if let Some(repo) = start_repo {
        session.set_repo(repo);
    }

    let exit_code = match args.ask {
        Some(ref question) => ask_once(&mut session, question).await,
        None => {
            run_chat(&mut session, &args).await?;
            0
        }
    };

    if let Some(ref path) = session_path {
        session.save(path)?;
    }
    if let Some(ref path) = args.transcript {
        report::write_transcript(&Transcript::from_session(&session), path, args.format)?;
        println!("📝 Transcript written to {}", path.display());
    }

    Ok(exit_code)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

/// Handle --check: probe GitHub and the models, one line per step.
async fn run_check(config: &Config, credentials: &Credentials, repo: Option<RepoId>) -> Result<i32> {
    let probe = match repo {
        Some(repo) => repo,
        None => diagnostics::DEFAULT_PROBE_REPO.parse()?,
    };

    println!("🩺 Checking connectivity (probe repository: {})\n", probe);
    println!("   GitHub API: {}", config.github.api_url);
    println!("   Models: {} / {}\n", config.models.primary.name, config.models.reasoning.name);

    let report = diagnostics::run_checks(config, credentials, &probe).await?;
    for line in &report.lines {
        println!("{}", line);
    }

    if report.exit_code() == 0 {
        println!("\n✅ Check complete.");
    } else {
        eprintln!("\n❌ GitHub rejected the token. Fix GITHUB_ACCESS_TOKEN and try again.");
    }
    Ok(report.exit_code())
}

/// Handle --ask: answer one question and print the reply.
async fn ask_once(session: &mut Session, question: &str) -> i32 {
    let reply = ask_with_progress(session, question).await;
    print_reply(&reply);
    if reply.failed {
        1
    } else {
        0
    }
}

/// Run one turn with a spinner, printing tool activity as it happens.
async fn ask_with_progress(session: &mut Session, message: &str) -> TurnReply {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let spinner = thinking_spinner();

    let reply = {
        let turn = session.ask(message, Some(tx));
        tokio::pin!(turn);
        loop {
            tokio::select! {
                reply = &mut turn => break reply,
                Some(event) = rx.recv() => show_event(&spinner, event),
            }
        }
    };

    while let Ok(event) = rx.try_recv() {
        show_event(&spinner, event);
    }
    spinner.finish_and_clear();
    reply
}

fn thinking_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Thinking...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn show_event(spinner: &ProgressBar, event: RunEvent) {
    match event {
        RunEvent::ToolStarted {
            agent, tool_name, ..
        } => {
            spinner.set_message(format!("{} is running {}...", agent, tool_name));
        }
        RunEvent::ToolCompleted { agent, execution } => {
            let mark = if execution.success { "🔧" } else { "⚠️ " };
            spinner.println(format!(
                "   {} {}: {} ({:.1}s)",
                mark,
                agent,
                execution.display_name(),
                execution.elapsed_ms as f64 / 1000.0
            ));
            spinner.set_message("Thinking...");
        }
    }
}

fn print_reply(reply: &TurnReply) {
    match reply.member {
        Some(member) => println!("\n🤖 {}:\n", member),
        None => println!(),
    }
    println!("{}\n", reply.message.content.trim());
}

/// A line typed at the chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Ask(String),
    New,
    Token(String),
    Repo(String),
    Examples(Option<usize>),
    Export(PathBuf),
    Help,
    Quit,
    Unknown(String),
    Empty,
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    if !line.starts_with('/') {
        return Command::Ask(line.to_string());
    }

    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };
    match name {
        "/new" | "/reset" => Command::New,
        "/token" => Command::Token(rest.to_string()),
        "/repo" => Command::Repo(rest.to_string()),
        "/examples" => Command::Examples(rest.parse().ok()),
        "/export" if !rest.is_empty() => Command::Export(PathBuf::from(rest)),
        "/help" | "/?" => Command::Help,
        "/quit" | "/exit" | "/q" => Command::Quit,
        _ => Command::Unknown(name.to_string()),
    }
}

/// Transcript format for `/export`, guessed from the file extension.
fn export_format(path: &Path, fallback: OutputFormat) -> OutputFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => OutputFormat::Json,
        Some("md") | Some("markdown") => OutputFormat::Markdown,
        _ => fallback,
    }
}

fn print_help() {
    println!("Commands:");
    println!("   /new            start a new chat (clears history and repository)");
    println!("   /token <PAT>    use a different GitHub token for this chat");
    println!("   /repo <o/r>     switch to another repository");
    println!("   /examples [N]   list sample questions, or ask number N");
    println!("   /export <FILE>  write a transcript (.md or .json)");
    println!("   /help           show this help");
    println!("   /quit           leave\n");
}

fn print_examples() {
    println!("Example questions:");
    for (i, query) in EXAMPLE_QUERIES.iter().enumerate() {
        println!("   {}. {}", i + 1, query);
    }
    println!("Ask one with /examples <N>.\n");
}

fn print_banner(session: &Session) {
    let team = session.team();
    println!("🔭 RepoLens v{}", env!("CARGO_PKG_VERSION"));
    println!("   GitHub Agent: {}", team.data.model_id());
    println!("   Reasoning Agent: {}", team.reasoning.model_id());
    match session.repo() {
        Some(repo) => println!("   Repository: {}", repo),
        None => println!("   Repository: (none yet, mention one as owner/repo)"),
    }
    if !session.history().is_empty() {
        println!("   Restored {} earlier messages", session.history().len());
    }
    println!("   Type /help for commands.\n");
}

/// The interactive chat loop.
async fn run_chat(session: &mut Session, args: &Args) -> Result<()> {
    print_banner(session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{}> ", session.repo().map(|r| r.to_string()).unwrap_or_default());
        std::io::stdout().flush().ok();

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            println!();
            break;
        };

        match parse_command(&line) {
            Command::Empty => {}
            Command::Ask(message) => {
                let reply = ask_with_progress(session, &message).await;
                print_reply(&reply);
            }
            Command::New => match session.restart() {
                Ok(()) => println!("✨ Started a new chat.\n"),
                Err(e) => eprintln!("❌ Could not start a new chat: {:#}\n", e),
            },
            Command::Token(token) => match session.replace_github_token(&token) {
                Ok(()) => println!("🔑 GitHub token updated.\n"),
                Err(e) => eprintln!("❌ {:#}\n", e),
            },
            Command::Repo(name) => match name.parse::<RepoId>() {
                Ok(repo) => {
                    session.set_repo(repo);
                    println!("📦 Now looking at {}.\n", name.trim());
                }
                Err(e) => eprintln!("❌ {:#}\n", e),
            },
            Command::Examples(None) => print_examples(),
            Command::Examples(Some(n)) => match n.checked_sub(1).and_then(|i| EXAMPLE_QUERIES.get(i)) {
                Some(query) => {
                    println!("> {}", query);
                    let reply = ask_with_progress(session, query).await;
                    print_reply(&reply);
                }
                None => eprintln!("❌ Pick an example between 1 and {}.\n", EXAMPLE_QUERIES.len()),
            },
            Command::Export(path) => {
                let format = export_format(&path, args.format);
                match report::write_transcript(&Transcript::from_session(session), &path, format) {
                    Ok(()) => println!("📝 Transcript written to {}\n", path.display()),
                    Err(e) => eprintln!("❌ {:#}\n", e),
                }
            }
            Command::Help => print_help(),
            Command::Quit => break,
            Command::Unknown(name) => eprintln!("Unknown command {}. Type /help.\n", name),
        }
    }

    println!("👋 Bye.");
    Ok(())
}
