use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pubmed_export::config::{default_config_path, find_config_file, load_config, Config, LoggingConfig, LOCAL_CONFIG_FILE};
use pubmed_export::export::ExportSettings;
use pubmed_export::models::{Condition, QueryField, ResultSet};
use pubmed_export::ui::shell::{ShellCommand, HELP};
use pubmed_export::ui::{self, Spinner, Status};
use pubmed_export::{PubMedProvider, SearchMode, SearchOutcome, Session};
use std::fmt::Display;
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// PubMed Export - Build PubMed queries and export the results as a CSV + PDF archive
#[derive(Parser, Debug)]
#[command(name = "pubmed-export")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build PubMed queries and export the results as a CSV + PDF archive", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Request timeout in seconds (overrides provider.timeout_seconds)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a single query string
    #[command(alias = "s")]
    Search {
        /// PubMed query, e.g. "Kawasaki[Title/Abstract] AND Adalimumab[Text]"
        query: String,

        /// Write the archive (to PATH, or to <file_stem>.zip when omitted)
        #[arg(long, short, value_name = "PATH")]
        archive: Option<Option<PathBuf>>,
    },

    /// Assemble a query from terms and conditions, then run it
    #[command(alias = "b")]
    Build {
        /// Query step: FIELD:TEXT (Title, Title/Abstract, Text) or AND / OR
        #[arg(long = "step", short = 's', required = true, value_parser = parse_step)]
        steps: Vec<Step>,

        /// Print the assembled query without searching
        #[arg(long)]
        dry_run: bool,

        /// Write the archive (to PATH, or to <file_stem>.zip when omitted)
        #[arg(long, short, value_name = "PATH")]
        archive: Option<Option<PathBuf>>,
    },

    /// Interactive session reading commands from stdin
    Shell,

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Write a configuration file with default values
    Init {
        /// Destination (default: user config directory)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

/// One step of a built query
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Term(QueryField, String),
    Condition(Condition),
}

fn parse_step(value: &str) -> Result<Step, String> {
    if let Ok(condition) = value.parse::<Condition>() {
        return Ok(Step::Condition(condition));
    }

    let (field, text) = value
        .split_once(':')
        .ok_or_else(|| format!("Expected FIELD:TEXT, AND or OR, got '{}'", value))?;
    let field = field.parse::<QueryField>().map_err(|e| e.to_string())?;
    Ok(Step::Term(field, text.to_string()))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(find_config_file);
    let mut config = load_config(config_path.as_deref()).with_context(|| match &config_path {
        Some(path) => format!("Failed to load config from {}", path.display()),
        None => "Failed to load config".to_string(),
    })?;
    if let Some(timeout) = cli.timeout {
        config.provider.timeout_seconds = timeout;
    }

    init_tracing(cli.verbose, cli.quiet, &config.logging);
    if let Some(path) = &config_path {
        tracing::debug!("Using config file: {}", path.display());
    }

    let out = Printer::new(cli.output, cli.quiet);

    match cli.command {
        Commands::Search { query, archive } => {
            let provider = PubMedProvider::from_config(&config.provider)?;
            let mut session = Session::from_config(&config);

            run_search(&mut session, &provider, Some(&query), &out).await?;
            if let Some(path) = archive {
                write_archive(&session, &config, path.as_deref(), &out)?;
            }
        }

        Commands::Build {
            steps,
            dry_run,
            archive,
        } => {
            let mut session = Session::from_config(&config);
            session.set_mode(SearchMode::Builder);
            for step in steps {
                match step {
                    Step::Term(field, text) => session.add_term(field, &text)?,
                    Step::Condition(condition) => session.add_condition(condition)?,
                };
            }

            if dry_run {
                println!("{}", session.builder().build()?);
                return Ok(());
            }

            let provider = PubMedProvider::from_config(&config.provider)?;
            run_search(&mut session, &provider, None, &out).await?;
            if let Some(path) = archive {
                write_archive(&session, &config, path.as_deref(), &out)?;
            }
        }

        Commands::Shell => {
            let provider = PubMedProvider::from_config(&config.provider)?;
            run_shell(&config, &provider, &out).await?;
        }

        Commands::Config { action } => match action {
            ConfigCommands::Init { path, force } => {
                let path = path
                    .or_else(default_config_path)
                    .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILE));
                init_config(&path, force)?;
                out.status(Status::Success, format!("Wrote {}", path.display()));
            }
            ConfigCommands::Show => {
                let mut shown = config.clone();
                if shown.provider.api_key.is_some() {
                    shown.provider.api_key = Some("********".to_string());
                }
                print!("{}", shown.to_toml()?);
            }
        },
    }

    Ok(())
}

/// Install the tracing subscriber; `RUST_LOG` takes precedence over flags and config.
fn init_tracing(verbose: u8, quiet: bool, logging: &LoggingConfig) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => logging.level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pubmed_export={}", level)));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Run a search and show its outcome; `None` runs the built query.
async fn run_search(
    session: &mut Session,
    provider: &PubMedProvider,
    query: Option<&str>,
    out: &Printer,
) -> Result<SearchOutcome> {
    let spinner = if out.is_table() && std::io::stderr().is_terminal() {
        Spinner::new("Searching PubMed...")
    } else {
        Spinner::hidden()
    };

    let started = Instant::now();
    let result = match query {
        Some(query) => session.search(provider, query).await.map_err(anyhow::Error::from),
        None => session.search_built(provider).await.map_err(anyhow::Error::from),
    };

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            spinner.finish_with_error("Search failed");
            return Err(e);
        }
    };
    spinner.finish_and_clear();

    match outcome {
        SearchOutcome::Found(count) => {
            if out.is_table() && !out.quiet {
                ui::print_search_header(session.last_query().unwrap_or_default(), count, started.elapsed());
            }
            out.results(session.results())?;
        }
        SearchOutcome::NoDetails { .. } => out.status(Status::Warning, outcome.message()),
        SearchOutcome::NoArticles => out.status(Status::Warning, outcome.message()),
    }

    Ok(outcome)
}

/// Export the current results to `path` (or the configured default name)
fn write_archive(session: &Session, config: &Config, path: Option<&Path>, out: &Printer) -> Result<()> {
    let settings = ExportSettings::from_config(config)?;
    let Some(archive) = session.export_archive(&settings)? else {
        out.status(Status::Warning, "No results to download. Run a search first.");
        return Ok(());
    };

    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&archive.file_name));
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, &archive.bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    out.status(
        Status::Download,
        format!(
            "Wrote {} ({} records, {} files, {})",
            path.display(),
            archive.records,
            archive.entries,
            ui::format_file_size(archive.bytes.len() as u64)
        ),
    );
    Ok(())
}

async fn run_shell(config: &Config, provider: &PubMedProvider, out: &Printer) -> Result<()> {
    let mut session = Session::from_config(config);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if !out.quiet {
        ui::print_section("PubMed Export");
        println!("{}", HELP);
    }

    loop {
        if std::io::stdin().is_terminal() {
            print!("{}> ", session.mode());
            std::io::stdout().flush()?;
        }

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match ShellCommand::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                out.status(Status::Error, e);
                continue;
            }
        };

        match command {
            ShellCommand::Nothing => {}
            ShellCommand::Help => println!("{}", HELP),
            ShellCommand::Quit => break,
            ShellCommand::Mode(mode) => {
                session.set_mode(mode);
                out.status(Status::Info, format!("Search mode: {}", mode));
            }
            ShellCommand::Term { field, text } => match session.add_term(field, &text) {
                Ok(rendered) => ui::print_query(&rendered),
                Err(e) => out.status(Status::Error, e),
            },
            ShellCommand::Condition(condition) => match session.add_condition(condition) {
                Ok(rendered) => ui::print_query(&rendered),
                Err(e) => out.status(Status::Error, e),
            },
            ShellCommand::Query => ui::print_query(&session.builder().render()),
            ShellCommand::Search(query) => {
                let query = match (query, session.mode()) {
                    (Some(query), _) => Some(query),
                    (None, SearchMode::Builder) => None,
                    (None, SearchMode::Single) => {
                        out.status(Status::Error, "Usage: search <query>");
                        continue;
                    }
                };
                if let Err(e) = run_search(&mut session, provider, query.as_deref(), out).await {
                    out.status(Status::Error, format!("{:#}", e));
                }
            }
            ShellCommand::Download(path) => {
                if let Err(e) = write_archive(&session, config, path.as_deref(), out) {
                    out.status(Status::Error, format!("{:#}", e));
                }
            }
        }
    }

    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut config = Config::default();
    config.provider.api_key = None;
    config.provider.email = None;
    std::fs::write(path, config.to_toml()?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Where and how results and status lines are printed
#[derive(Debug, Clone, Copy)]
struct Printer {
    format: OutputFormat,
    quiet: bool,
}

impl Printer {
    fn new(format: OutputFormat, quiet: bool) -> Self {
        let format = if format == OutputFormat::Auto {
            if ui::is_terminal() {
                OutputFormat::Table
            } else {
                OutputFormat::Json
            }
        } else {
            format
        };
        Self { format, quiet }
    }

    fn is_table(&self) -> bool {
        self.format == OutputFormat::Table
    }

    /// Status lines go to stdout only in table mode so JSON stays parseable
    fn status(&self, status: Status, msg: impl Display) {
        if self.quiet && status != Status::Error {
            return;
        }
        if self.is_table() {
            ui::print_status(status, msg);
        } else {
            eprintln!("{}", msg);
        }
    }

    fn results(&self, results: &ResultSet) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(results)?);
            }
            OutputFormat::Plain => {
                for (i, record) in results.iter().enumerate() {
                    println!("{}. {}", i + 1, record.title);
                    println!("   {} ({})", record.first_author, record.year);
                    println!("   {} [{}]", record.link, record.access_type);
                }
            }
            OutputFormat::Table | OutputFormat::Auto => {
                println!("{}", ui::records_table(results));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["pubmed-export", "shell"]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert_eq!(cli.output, OutputFormat::Auto);
        assert_eq!(cli.timeout, None);
        assert!(matches!(cli.command, Commands::Shell));
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from([
            "pubmed-export",
            "-vv",
            "--output",
            "json",
            "--timeout",
            "60",
            "--config",
            "/path/to/config.toml",
            "shell",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.timeout, Some(60));
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.toml")));
    }

    #[test]
    fn test_cli_search_command() {
        let cli = Cli::parse_from(["pubmed-export", "search", "kawasaki[Title]"]);
        match cli.command {
            Commands::Search { query, archive } => {
                assert_eq!(query, "kawasaki[Title]");
                assert_eq!(archive, None);
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_archive_flag() {
        let cli = Cli::parse_from(["pubmed-export", "search", "kawasaki", "--archive"]);
        assert!(matches!(cli.command, Commands::Search { archive: Some(None), .. }));

        let cli = Cli::parse_from(["pubmed-export", "search", "kawasaki", "--archive", "out.zip"]);
        match cli.command {
            Commands::Search { archive, .. } => {
                assert_eq!(archive, Some(Some(PathBuf::from("out.zip"))));
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_build_command() {
        let cli = Cli::parse_from([
            "pubmed-export",
            "build",
            "--step",
            "Title/Abstract:Kawasaki",
            "--step",
            "AND",
            "--step",
            "Text:Adalimumab",
            "--dry-run",
        ]);
        match cli.command {
            Commands::Build { steps, dry_run, .. } => {
                assert!(dry_run);
                assert_eq!(
                    steps,
                    vec![
                        Step::Term(QueryField::TitleAbstract, "Kawasaki".to_string()),
                        Step::Condition(Condition::And),
                        Step::Term(QueryField::Text, "Adalimumab".to_string()),
                    ]
                );
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_cli_build_requires_steps() {
        assert!(Cli::try_parse_from(["pubmed-export", "build"]).is_err());
        assert!(Cli::try_parse_from(["pubmed-export", "build", "--step", "Journal:Lancet"]).is_err());
    }

    #[test]
    fn test_cli_config_commands() {
        let cli = Cli::parse_from(["pubmed-export", "config", "init", "--force"]);
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigCommands::Init { path: None, force: true }
            }
        ));

        let cli = Cli::parse_from(["pubmed-export", "config", "show"]);
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigCommands::Show
            }
        ));
    }

    #[test]
    fn test_parse_step() {
        assert_eq!(parse_step("or").unwrap(), Step::Condition(Condition::Or));
        assert_eq!(
            parse_step("title:Kawasaki: a review").unwrap(),
            Step::Term(QueryField::Title, "Kawasaki: a review".to_string())
        );
        assert!(parse_step("Kawasaki").is_err());
    }

    #[test]
    fn test_init_config_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        init_config(&path, false).unwrap();
        let loaded = load_config(Some(path.as_path())).unwrap();
        assert_eq!(loaded.export.batch_size, 20);

        assert!(init_config(&path, false).is_err());
        assert!(init_config(&path, true).is_ok());
    }
}
