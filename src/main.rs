// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Culler: AI-assisted image triage
//!
//! Interactive terminal front end over a triage [`Session`].

use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{info, warn};

use culler::classify::classify_batch;
use culler::config::{AppConfig, OracleBackend};
use culler::controller::{Scope, TriageState};
use culler::oracle::{self, CategoryOracle, OllamaClient, UploadOracle};
use culler::scan::{filter_supported, scan_folder};
use culler::session::ActionOutcome;
use culler::{disposal, CategoryLabel, DecisionPoint, Result, Session};

/// Culler CLI - AI-assisted image triage
#[derive(Parser, Debug)]
#[command(name = "culler")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "Sort images into categories with a vision model, then keep or delete them", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json", "jsonl"])]
    format: String,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Review images interactively
    Triage {
        /// Image files to start with
        paths: Vec<PathBuf>,

        /// Folders to scan for images
        #[arg(short, long)]
        folder: Vec<PathBuf>,

        /// Scan folders recursively
        #[arg(short, long)]
        recursive: bool,

        /// Start in category view
        #[arg(long)]
        by_category: bool,

        /// Don't touch files on delete
        #[arg(long)]
        dry_run: bool,

        /// Skip oracle health check on startup
        #[arg(long)]
        skip_health_check: bool,
    },

    /// Classify images and print their categories
    Classify {
        /// Image files or folders
        paths: Vec<PathBuf>,

        /// Scan folders recursively
        #[arg(short, long)]
        recursive: bool,
    },

    /// Show oracle status
    Status,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Some(Commands::Triage { paths, folder, recursive, by_category, dry_run, skip_health_check }) => {
            let sources = Sources { paths, folders: folder, recursive: recursive || config.ingest.recursive };
            run_triage(config, sources, by_category, dry_run, skip_health_check).await
        }
        Some(Commands::Classify { paths, recursive }) => {
            let recursive = recursive || config.ingest.recursive;
            run_classify(config, paths, recursive, &cli.format).await
        }
        Some(Commands::Status) => run_status(config).await,
        Some(Commands::Config { action }) => run_config_command(config, action, &cli.config),
        None => run_triage(config, Sources::default(), false, false, false).await,
    }
}

/// Where the initial images come from
#[derive(Debug, Default)]
struct Sources {
    paths: Vec<PathBuf>,
    folders: Vec<PathBuf>,
    recursive: bool,
}

impl Sources {
    /// Expand into image paths: files filtered by extension, folders scanned
    fn collect(&self, config: &AppConfig) -> Vec<PathBuf> {
        let exts = &config.ingest.extensions;
        let mut files = Vec::new();
        let mut folders = self.folders.clone();

        let (dirs, plain): (Vec<PathBuf>, Vec<PathBuf>) =
            self.paths.iter().cloned().partition(|p| p.is_dir());
        folders.extend(dirs);
        files.extend(filter_supported(plain, exts));

        for folder in &folders {
            match scan_folder(folder, exts, self.recursive) {
                Ok(found) => files.extend(found),
                Err(e) => warn!("Cannot scan {:?}: {}", folder, e),
            }
        }
        files
    }
}

/// Interactive triage loop
async fn run_triage(
    config: AppConfig,
    sources: Sources,
    by_category: bool,
    dry_run: bool,
    skip_health_check: bool,
) -> Result<()> {
    if dry_run {
        warn!("DRY RUN MODE - deleted images stay on disk");
    }

    if !skip_health_check {
        check_oracle(&config).await;
    }

    let oracle = oracle::from_config(&config)?;
    let disposer = disposal::from_config(&config.disposal, dry_run);
    let mut session = Session::new(oracle, disposer, config.oracle.concurrency);
    info!(
        "Oracle: {}, delete: {}",
        session.oracle_name(),
        session.disposer_name()
    );

    session.ingest(sources.collect(&config));
    if by_category {
        session.toggle_category_view(true).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_help();
    render(&session);

    loop {
        prompt("> ");
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(msg) => {
                println!("{}", msg);
                continue;
            }
        };

        match command {
            Command::Add(paths) => {
                let added = session.ingest(Sources { paths, ..Sources::default() }.collect(&config));
                println!("Added {} images", added);
            }
            Command::Folder(dir) => {
                match scan_folder(&dir, &config.ingest.extensions, config.ingest.recursive) {
                    Ok(found) => println!("Added {} images", session.ingest(found)),
                    Err(e) => println!("Cannot scan {}: {}", dir.display(), e),
                }
            }
            Command::Show => {}
            Command::List => print_list(&session),
            Command::CategoryView(on) => {
                if let Some(report) = session.toggle_category_view(on).await {
                    println!(
                        "Classified {} images ({} cached, {} failed)",
                        report.classified, report.cached, report.failed
                    );
                    print_list(&session);
                }
            }
            Command::Select(target) => match resolve_target(&session, &target) {
                Some(label) if session.select_category(label) => {}
                _ => println!("No category '{}'", target),
            },
            Command::Next => {
                if session.next().is_none() {
                    println!("No images to show");
                }
            }
            Command::Keep => {
                let outcome = session.keep();
                handle_outcome(&mut session, outcome, &mut lines).await?;
            }
            Command::Delete => {
                // Moving to the trash is blocking file I/O
                let outcome = tokio::task::block_in_place(|| session.delete());
                handle_outcome(&mut session, outcome, &mut lines).await?;
            }
            Command::Reset => session.reset(),
            Command::Help => print_help(),
            Command::Quit => break,
        }

        render(&session);
    }

    let kept = session.pool().kept().len();
    let deleted = session.pool().deleted().len();
    info!("Session ended: {} kept, {} deleted, {} pending", kept, deleted, session.pool().len());
    Ok(())
}

/// Report a keep/delete and put any decision point to the user
async fn handle_outcome(
    session: &mut Session,
    outcome: Option<ActionOutcome>,
    lines: &mut Lines<BufReader<Stdin>>,
) -> Result<()> {
    let Some(outcome) = outcome else {
        println!("No image selected");
        return Ok(());
    };

    if let Some(err) = &outcome.disposal_error {
        println!("Warning: {}", err);
    }
    if let Some(decision) = outcome.decision {
        let accept = ask_yes_no(lines, &decision.prompt()).await?;
        session.resolve(decision, accept);
        if !accept {
            println!("{}", declined_message(decision));
        }
    }
    Ok(())
}

/// A line typed at the triage prompt
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Add(Vec<PathBuf>),
    Folder(PathBuf),
    Show,
    List,
    CategoryView(bool),
    Select(String),
    Next,
    Keep,
    Delete,
    Reset,
    Help,
    Quit,
}

fn parse_command(line: &str) -> std::result::Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };

    let command = match word.to_lowercase().as_str() {
        "add" | "a" if !rest.is_empty() => {
            Command::Add(rest.split_whitespace().map(PathBuf::from).collect())
        }
        "folder" | "f" if !rest.is_empty() => Command::Folder(PathBuf::from(rest)),
        "show" | "s" => Command::Show,
        "list" | "l" | "ls" => Command::List,
        "cat" | "category" => match rest {
            "on" => Command::CategoryView(true),
            "off" => Command::CategoryView(false),
            _ => return Err("Usage: cat on|off".to_string()),
        },
        "select" | "sel" if !rest.is_empty() => Command::Select(rest.to_string()),
        "next" | "n" => Command::Next,
        "keep" | "k" => Command::Keep,
        "delete" | "d" | "del" => Command::Delete,
        "reset" => Command::Reset,
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        _ => return Err(format!("Unknown command '{}', type 'help'", line)),
    };
    Ok(Some(command))
}

/// A category name, or its 1-based position in the list
fn resolve_target(session: &Session, target: &str) -> Option<CategoryLabel> {
    // "Nature (2)" as printed by the list
    let name = target.split(" (").next().unwrap_or(target).trim();
    if let Ok(n) = name.parse::<usize>() {
        return session.summaries().get(n.checked_sub(1)?).map(|s| s.label);
    }
    name.parse().ok()
}

fn declined_message(decision: DecisionPoint) -> &'static str {
    match decision {
        DecisionPoint::CategoryExhausted(_) => "No more images left in this category",
        DecisionPoint::PoolExhausted => "No more images left",
    }
}

async fn ask_yes_no(lines: &mut Lines<BufReader<Stdin>>, question: &str) -> Result<bool> {
    prompt(&format!("{} [y/N] ", question));
    let answer = lines.next_line().await?.unwrap_or_default();
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn prompt(text: &str) {
    print!("{}", text);
    let _ = std::io::stdout().flush();
}

fn render(session: &Session) {
    print!("{}", render_text(session));
}

fn render_text(session: &Session) -> String {
    match session.state() {
        TriageState::Empty => "No images. Use 'add <files>' or 'folder <dir>'.\n".to_string(),
        TriageState::SelectingCategory => {
            format!("Select a category from the list:\n{}", category_list(session))
        }
        TriageState::Completed(Scope::Category(label)) if !session.summaries().is_empty() => {
            format!(
                "Category '{}' is done. Select another category:\n{}",
                label,
                category_list(session)
            )
        }
        TriageState::Completed(_) => "Nothing left to review. 'reset' starts over.\n".to_string(),
        TriageState::Flat | TriageState::ViewingCategory(_) => {
            let view = session.active_view();
            let Some(current) = session.current() else {
                return String::new();
            };
            let pos = session.controller().position(view.len()).unwrap_or(0) + 1;
            let scope = match session.state() {
                TriageState::ViewingCategory(label) => label.to_string(),
                _ => "All Images".to_string(),
            };
            let mut text = format!(
                "Category: {}\n[{}/{}] {}\n",
                scope,
                pos,
                view.len(),
                current.path.display()
            );
            if let Some(label) = current.category {
                text.push_str(&format!("  classified as {}\n", label));
            }
            text
        }
    }
}

fn print_list(session: &Session) {
    print!("{}", category_list(session));
}

fn category_list(session: &Session) -> String {
    let summaries = session.summaries();
    if summaries.is_empty() {
        return "No categories (category view is off or nothing is pending)\n".to_string();
    }
    summaries
        .iter()
        .enumerate()
        .map(|(i, s)| format!("  {}. {} ({})\n", i + 1, s.label, s.count))
        .collect()
}

fn print_help() {
    println!("Commands:");
    println!("  add <files..>   add images          folder <dir>  add a folder");
    println!("  keep | k        keep current        delete | d    move current to trash");
    println!("  next | n        show next image     show          show current image");
    println!("  cat on|off      category view       select <name|number>");
    println!("  list            list categories     reset         start over");
    println!("  help            this text           quit");
}

/// Warn early if the oracle is unreachable; classification would fall back to Uncategorized
async fn check_oracle(config: &AppConfig) {
    if config.oracle.backend != OracleBackend::Ollama {
        return;
    }
    let client = match OllamaClient::new(&config.oracle.url, Duration::from_secs(config.oracle.timeout_secs)) {
        Ok(c) => c,
        Err(e) => {
            warn!("Cannot create Ollama client: {}", e);
            return;
        }
    };
    match client.health_check().await {
        Ok(()) => match client.model_available(&config.oracle.model).await {
            Ok(true) => info!("Vision model '{}' available", config.oracle.model),
            Ok(false) => warn!("Vision model '{}' not found. Try: ollama pull {}", config.oracle.model, config.oracle.model),
            Err(e) => warn!("Cannot list models: {}", e),
        },
        Err(e) => warn!("{}. Images will be Uncategorized.", e),
    }
}

/// Classify files and folders without starting a session
async fn run_classify(config: AppConfig, paths: Vec<PathBuf>, recursive: bool, format: &str) -> Result<()> {
    let files = Sources { paths, folders: Vec::new(), recursive }.collect(&config);
    let oracle: Arc<dyn CategoryOracle> = oracle::from_config(&config)?;

    let results = classify_batch(oracle.as_ref(), &files, config.oracle.concurrency).await;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&results)?),
        "jsonl" => {
            for r in &results {
                println!("{}", serde_json::to_string(r)?);
            }
        }
        _ => {
            for r in &results {
                let note = if r.failed { " (oracle failed)" } else { "" };
                println!("{}: {}{}", r.path.display(), r.label, note);
            }
            println!("\nClassified {} images", results.len());
        }
    }

    Ok(())
}

/// Run status check
async fn run_status(config: AppConfig) -> Result<()> {
    println!("Culler v{} Status", env!("CARGO_PKG_VERSION"));
    println!("======================");

    match config.oracle.backend {
        OracleBackend::Ollama => {
            let client = OllamaClient::new(&config.oracle.url, Duration::from_secs(10))?;
            match client.health_check().await {
                Ok(()) => println!("Ollama: Running at {}", client.base_url()),
                Err(e) => println!("Ollama: Error - {}", e),
            }
            match client.list_models().await {
                Ok(models) => {
                    println!("\nAvailable models:");
                    for m in &models {
                        let marker = if m.starts_with(config.oracle.model.as_str()) { "→" } else { " " };
                        println!("  {} {}", marker, m);
                    }
                }
                Err(e) => println!("  Error listing models: {}", e),
            }
        }
        OracleBackend::Upload => {
            let oracle = UploadOracle::from_config(&config)?;
            let health = oracle.endpoint().replace("/upload/", "/health");
            match reqwest::get(&health).await {
                Ok(r) if r.status().is_success() => println!("Classification server: Running at {}", oracle.endpoint()),
                Ok(r) => println!("Classification server: status {}", r.status()),
                Err(e) => println!("Classification server: Error - {}", e),
            }
        }
    }

    println!("\nConfiguration:");
    println!("  Vision model: {}", config.oracle.model);
    println!("  Concurrency: {}", config.oracle.concurrency);
    println!("  Extensions: {:?}", config.ingest.extensions);
    println!("  Recycle bin: {}", config.disposal.use_trash);

    Ok(())
}

/// Run config commands
fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Oracle: {:?} at {}", config.oracle.backend, config.oracle.url);
            println!("  Vision model: {}", config.oracle.model);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["culler"]).unwrap();
        assert!(!cli.verbose);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_triage_command() {
        let cli = Cli::try_parse_from([
            "culler", "triage", "a.jpg", "b.png", "--folder", "/tmp/pics", "--by-category", "--dry-run",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Triage { paths, folder, by_category, dry_run, .. }) => {
                assert_eq!(paths, vec![PathBuf::from("a.jpg"), PathBuf::from("b.png")]);
                assert_eq!(folder, vec![PathBuf::from("/tmp/pics")]);
                assert!(by_category);
                assert!(dry_run);
            }
            _ => panic!("Expected Triage command"),
        }
    }

    #[test]
    fn test_cli_classify_json() {
        let cli = Cli::try_parse_from(["culler", "classify", "/tmp/x.jpg", "--format", "json"]).unwrap();
        assert_eq!(cli.format, "json");
        assert!(matches!(cli.command, Some(Commands::Classify { .. })));
        assert!(Cli::try_parse_from(["culler", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("   "), Ok(None));
        assert_eq!(parse_command("k"), Ok(Some(Command::Keep)));
        assert_eq!(parse_command("DELETE"), Ok(Some(Command::Delete)));
        assert_eq!(parse_command("cat on"), Ok(Some(Command::CategoryView(true))));
        assert_eq!(parse_command("cat off"), Ok(Some(Command::CategoryView(false))));
        assert_eq!(
            parse_command("add a.jpg  b.jpg"),
            Ok(Some(Command::Add(vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")])))
        );
        assert_eq!(
            parse_command("select Nature (2)"),
            Ok(Some(Command::Select("Nature (2)".to_string())))
        );
        assert!(parse_command("cat maybe").is_err());
        assert!(parse_command("add").is_err());
        assert!(parse_command("dance").is_err());
    }

    #[tokio::test]
    async fn test_resolve_target() {
        use culler::disposal::DryRunDisposer;
        use culler::oracle::UploadOracle;

        // Unreachable oracle: everything lands in Uncategorized
        let oracle = Arc::new(UploadOracle::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap());
        let mut session = Session::new(oracle, Box::new(DryRunDisposer), 1);
        session.ingest(["/nonexistent/a.jpg"]);
        session.toggle_category_view(true).await;

        assert_eq!(resolve_target(&session, "1"), Some(CategoryLabel::Uncategorized));
        assert_eq!(resolve_target(&session, "Uncategorized (1)"), Some(CategoryLabel::Uncategorized));
        assert_eq!(resolve_target(&session, "nature"), Some(CategoryLabel::Nature));
        assert_eq!(resolve_target(&session, "0"), None);
        assert_eq!(resolve_target(&session, "7"), None);
        assert_eq!(resolve_target(&session, "cats"), None);
    }

    /// Food for names starting with "food", Nature for the rest
    struct NameOracle;

    #[async_trait::async_trait]
    impl CategoryOracle for NameOracle {
        fn name(&self) -> &'static str {
            "name"
        }

        async fn classify(&self, image: &Path) -> Result<CategoryLabel> {
            let food = image
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("food"));
            Ok(if food { CategoryLabel::Food } else { CategoryLabel::Nature })
        }
    }

    #[tokio::test]
    async fn test_render_after_declined_fallback_lists_categories() {
        use culler::disposal::DryRunDisposer;

        let mut session = Session::new(Arc::new(NameOracle), Box::new(DryRunDisposer), 2);
        session.ingest(["food1.jpg", "tree1.jpg", "tree2.jpg"]);
        session.toggle_category_view(true).await;
        assert!(session.select_category(CategoryLabel::Food));

        let decision = session.keep().and_then(|o| o.decision);
        assert_eq!(decision, Some(DecisionPoint::CategoryExhausted(CategoryLabel::Food)));
        session.resolve(DecisionPoint::CategoryExhausted(CategoryLabel::Food), false);

        let text = render_text(&session);
        assert!(text.contains("Category 'Food' is done"));
        assert!(text.contains("1. Nature (2)"));
        assert!(!text.contains("Nothing left to review"));
    }

    #[tokio::test]
    async fn test_render_after_pool_exhausted() {
        use culler::disposal::DryRunDisposer;

        let mut session = Session::new(Arc::new(NameOracle), Box::new(DryRunDisposer), 1);
        session.ingest(["tree1.jpg"]);

        let decision = session.keep().and_then(|o| o.decision);
        assert_eq!(decision, Some(DecisionPoint::PoolExhausted));
        session.resolve(DecisionPoint::PoolExhausted, false);
        assert!(render_text(&session).contains("Nothing left to review"));
    }

    #[test]
    fn test_sources_collect() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"").unwrap();
        let loose = dir.path().join("loose.png");

        let sources = Sources {
            paths: vec![loose.clone(), PathBuf::from("notes.md"), dir.path().to_path_buf()],
            folders: Vec::new(),
            recursive: false,
        };
        let files = sources.collect(&AppConfig::default());
        assert_eq!(files, vec![loose, dir.path().join("a.jpg")]);
    }
}
