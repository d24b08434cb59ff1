// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use docshield::app_config::{Config, LogLevel};
use docshield::app_controller::{Controller, TranslateOptions};
use docshield::database::{PatternKind, PurgeField};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

/// Which cache column a purge pattern is matched against
#[derive(Debug, Clone, ValueEnum)]
enum CliPurgeField {
    Translated,
    Source,
    Both,
}

impl From<CliPurgeField> for PurgeField {
    fn from(field: CliPurgeField) -> Self {
        match field {
            CliPurgeField::Translated => PurgeField::Translated,
            CliPurgeField::Source => PurgeField::Source,
            CliPurgeField::Both => PurgeField::Both,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate documents into PO catalogs
    Translate(TranslateArgs),

    /// Show translation completion per document
    Status {
        /// Single document name
        #[arg(short, long)]
        file: Option<String>,
    },

    /// Inspect or clean the translation cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Repair references corrupted by earlier translation runs
    FixRefs {
        /// Single document name
        #[arg(short, long)]
        file: Option<String>,

        /// Report repairs without writing catalogs
        #[arg(long)]
        dry_run: bool,
    },

    /// Clear fuzzy flags after review
    RemoveFuzzy {
        /// Single document name
        #[arg(short, long)]
        file: Option<String>,
    },

    /// List :ref: display texts and PascalCase terms found in the sources
    GlossaryTerms,

    /// Generate shell completions for docshield
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// Single document name (with or without .rst)
    #[arg(short, long, conflicts_with = "all")]
    file: Option<String>,

    /// Translate every document (default when --file is absent)
    #[arg(long)]
    all: bool,

    /// Retranslate everything, ignoring catalogs and cache
    #[arg(long)]
    force: bool,

    /// Read segments from .pot templates instead of .rst sources
    #[arg(long)]
    from_pot: bool,

    /// Source language code (e.g., 'en')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'sv')
    #[arg(short, long)]
    target_language: Option<String>,

    /// DeepL API key
    #[arg(long, env = "DEEPL_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Hide progress bars
    #[arg(long)]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum CacheCommands {
    /// Entry counts, hits and language pairs
    Stats,

    /// Delete every cached translation
    Clear,

    /// Delete entries unused for a number of days
    Prune {
        #[arg(long, default_value_t = 90)]
        days: i64,
    },

    /// Delete entries whose text matches a pattern
    Purge {
        /// Substring by default
        pattern: String,

        /// Treat the pattern as a regular expression
        #[arg(long, conflicts_with = "wildcard")]
        regex: bool,

        /// Treat the pattern as a wildcard (* and ?)
        #[arg(long)]
        wildcard: bool,

        /// Column to match
        #[arg(long, value_enum, default_value = "translated")]
        field: CliPurgeField,

        /// Report what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,
    },

    /// Delete entries whose translation contains a text
    DeleteContaining { text: String },
}

/// docshield - markup-safe machine translation of reStructuredText documentation
#[derive(Parser, Debug)]
#[command(name = "docshield")]
#[command(version)]
#[command(about = "Markup-safe machine translation of RST documentation into PO catalogs")]
#[command(long_about = "docshield extracts paragraphs from reStructuredText sources, shields inline markup,
translates the text with DeepL and writes gettext PO catalogs.

EXAMPLES:
    docshield translate --all                       # Translate every document
    docshield translate -f circulation              # Translate one document
    docshield translate --from-pot -t de            # Use Sphinx templates, German target
    docshield status                                # Completion per document
    docshield cache purge '%word%' --dry-run        # Preview a cache purge
    docshield fix-refs --dry-run                    # Preview reference repairs
    docshield completions bash > docshield.bash     # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        // Accept everything; log::set_max_level does the filtering
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Prefix and ANSI colour for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("ERROR", "\x1B[1;31m"),
            Level::Warn => ("WARN ", "\x1B[1;33m"),
            Level::Info => ("INFO ", "\x1B[1;32m"),
            Level::Debug => ("DEBUG", "\x1B[1;36m"),
            Level::Trace => ("TRACE", "\x1B[1;35m"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (prefix, colour) = Self::style_for_level(record.level());
            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", colour, now, prefix, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the config is loaded
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "docshield", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(level) = &cli.log_level {
        log::set_max_level(LogLevel::from(level.clone()).to_level_filter());
    }

    let mut config = Config::load_or_create(&cli.config)?;
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone().into();
    }
    log::set_max_level(config.log_level.to_level_filter());

    match cli.command {
        Commands::Translate(args) => run_translate(config, args).await,
        Commands::Status { file } => {
            config.validate().context("Configuration validation failed")?;
            let controller = Controller::with_config(config)?;
            let report = controller.status(file.as_deref())?;
            println!("{}", report);
            Ok(())
        }
        Commands::Cache { command } => run_cache(config, command).await,
        Commands::FixRefs { file, dry_run } => {
            let controller = Controller::with_config(config)?;
            let reports = controller.fix_refs(file.as_deref(), dry_run)?;
            for report in &reports {
                println!("{}", report.catalog.display());
                for (msgid, before, after) in &report.changes {
                    println!("  msgid: {}\n  - {}\n  + {}", msgid, before, after);
                }
            }
            let total: usize = reports.iter().map(|r| r.changes.len()).sum();
            if dry_run {
                println!("{} translation(s) would be repaired", total);
            } else {
                println!("Repaired {} translation(s)", total);
            }
            Ok(())
        }
        Commands::RemoveFuzzy { file } => {
            let controller = Controller::with_config(config)?;
            let cleared = controller.remove_fuzzy(file.as_deref())?;
            let total: usize = cleared.iter().map(|(_, count)| count).sum();
            println!("Cleared {} fuzzy flag(s) in {} catalog(s)", total, cleared.len());
            Ok(())
        }
        Commands::GlossaryTerms => {
            let controller = Controller::with_config(config)?;
            for term in controller.glossary_terms()? {
                println!("{}", term);
            }
            Ok(())
        }
        Commands::Completions { .. } => Ok(()),
    }
}

async fn run_translate(mut config: Config, args: TranslateArgs) -> Result<()> {
    if let Some(source) = args.source_language {
        config.source_language = source;
    }
    if let Some(target) = args.target_language {
        config.target_language = target;
    }
    if let Some(key) = args.api_key.filter(|k| !k.trim().is_empty()) {
        config.translation.set_api_key(key.trim());
    }
    config
        .validate_for_translation()
        .context("Configuration validation failed")?;

    let interrupt = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupt);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current segment");
            flag.store(true, Ordering::SeqCst);
        }
    });

    if args.file.is_none() && !args.all {
        info!("No --file given, translating all documents");
    }
    let options = TranslateOptions {
        file: args.file,
        force: args.force,
        from_pot: args.from_pot,
        show_progress: !args.no_progress,
    };

    let controller = Controller::with_config(config)?;
    let summary = controller.translate(&options, interrupt).await?;
    println!("{}", summary);

    if let Some(error) = summary.aborted {
        return Err(error.into());
    }
    Ok(())
}

async fn run_cache(config: Config, command: CacheCommands) -> Result<()> {
    let controller = Controller::with_config(config)?;
    match command {
        CacheCommands::Stats => println!("{}", controller.cache_stats().await?),
        CacheCommands::Clear => println!("Deleted {} cache entries", controller.cache_clear().await?),
        CacheCommands::Prune { days } => {
            println!("Deleted {} entries unused for {} days", controller.cache_prune(days).await?, days)
        }
        CacheCommands::Purge {
            pattern,
            regex,
            wildcard,
            field,
            dry_run,
        } => {
            let kind = if regex {
                PatternKind::Regex
            } else if wildcard {
                PatternKind::Wildcard
            } else {
                PatternKind::Substring
            };
            let report = controller.cache_purge(&pattern, kind, field.into(), dry_run).await?;
            for sample in &report.samples {
                println!("  {}", sample);
            }
            if report.dry_run {
                println!("{} entries would be deleted", report.matched);
            } else {
                println!("Deleted {} entries", report.matched);
            }
        }
        CacheCommands::DeleteContaining { text } => {
            println!("Deleted {} entries", controller.cache_delete_containing(&text).await?)
        }
    }
    Ok(())
}
