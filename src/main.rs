// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use docbabel::app_config::{Config, LogLevel, TranslationProvider};
use docbabel::app_controller::Controller;
use docbabel::file_utils::FileManager;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Ollama,
    OpenAI,
    Azure,
    Anthropic,
    LMStudio,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Azure => TranslationProvider::Azure,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
        }
    }
}

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

/// Options shared by every command that reads the configuration
#[derive(Parser, Debug, Clone)]
struct CommonArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Input document or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Directory for translated documents (defaults to the input's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Source language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Style profile ('professional' or 'minimal')
    #[arg(long)]
    profile: Option<String>,

    /// Use stub translations instead of calling a provider
    #[arg(long)]
    offline: bool,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Parser, Debug)]
struct ExtractArgs {
    /// Input document
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Where to write the extracted structure (defaults to `<stem>.structure.json`)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Parser, Debug)]
struct ResumeArgs {
    /// Session id printed by an earlier run
    #[arg(value_name = "SESSION_ID")]
    session_id: String,

    /// Output document path (.docx or .txt)
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Use stub translations instead of calling a provider
    #[arg(long)]
    offline: bool,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a document or every document in a directory
    Translate(TranslateArgs),

    /// Extract a document's structure without translating it
    Extract(ExtractArgs),

    /// Continue a stored session from its last completed stage
    Resume(ResumeArgs),

    /// Generate shell completions for docbabel
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// docbabel - structure-preserving document translation with AI
#[derive(Parser, Debug)]
#[command(name = "docbabel")]
#[command(version)]
#[command(about = "AI-powered document translation that keeps structure and styling")]
#[command(long_about = "docbabel extracts .docx and .txt documents into a structured model, \
translates every element with an AI provider, applies a style profile and writes the result \
back in the same format.

EXAMPLES:
    docbabel translate report.docx                     # Translate using default config
    docbabel translate -t fr -f report.docx            # Translate to French, overwrite output
    docbabel translate -p openai -m gpt-4o report.docx # Use specific provider and model
    docbabel translate --profile minimal docs/         # Process an entire directory
    docbabel translate --offline notes.txt             # Stub translations, no provider needed
    docbabel extract report.docx                       # Print the outline, write the structure
    docbabel resume d212cbd859d2_20250621_125824 out.docx
    docbabel completions bash > docbabel.bash          # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED PROVIDERS:
    ollama    - Local Ollama server (default)
    openai    - OpenAI API (requires API key)
    azure     - Azure OpenAI deployment (requires API key and endpoint)
    anthropic - Anthropic Claude API (requires API key)
    lmstudio  - LM Studio local server (OpenAI-compatible on http://localhost:1234/v1)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation, filtered by the global max level
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the configuration says otherwise
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "docbabel", &mut std::io::stdout());
            Ok(())
        }
        Commands::Translate(args) => run_translate(args).await,
        Commands::Extract(args) => run_extract(args),
        Commands::Resume(args) => run_resume(args).await,
    }
}

/// Load or create the configuration and apply the log level
fn load_config(common: &CommonArgs) -> Result<Config> {
    if let Some(level) = &common.log_level {
        log::set_max_level(LogLevel::from(level.clone()).to_level_filter());
    }

    let config_path = &common.config_path;
    if !config_path.exists() {
        warn!("Config file not found at {:?}, creating default config.", config_path);
    }
    let mut config = Config::load_or_create(config_path)
        .with_context(|| format!("Failed to load config file: {:?}", config_path))?;

    match &common.log_level {
        Some(level) => config.log_level = level.clone().into(),
        None => log::set_max_level(config.log_level.to_level_filter()),
    }

    Ok(config)
}

fn validate(config: &Config, offline: bool) -> Result<()> {
    if offline {
        config.validate_document_settings()
    } else {
        config.validate()
    }
    .context("Configuration validation failed")
}

/// Cancel the controller's runs on Ctrl-C
fn install_interrupt_handler(controller: &Controller) {
    let token = controller.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling after the current stage");
            token.cancel();
        }
    });
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    let mut config = load_config(&options.common)?;

    // Override config with CLI options if provided
    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }
    if let Some(model) = &options.model {
        config.translation.set_model(model.clone());
    }
    if let Some(source_lang) = &options.source_language {
        config.source_language = source_lang.clone();
    }
    if let Some(target_lang) = &options.target_language {
        config.target_language = target_lang.clone();
    }
    if let Some(profile) = &options.profile {
        config.style.profile = profile.clone();
    }

    validate(&config, options.offline)?;

    let controller = Controller::with_config(config)?.offline(options.offline);
    install_interrupt_handler(&controller);

    if options.input_path.is_file() {
        let output_dir = match &options.output_dir {
            Some(dir) => dir.clone(),
            None => options
                .input_path
                .parent()
                .unwrap_or(Path::new("."))
                .to_path_buf(),
        };
        if let Some(result) = controller
            .run(options.input_path.clone(), output_dir, options.force_overwrite)
            .await?
        {
            info!("Session {}: {}", result.session_id, result.summary());
        }
    } else if options.input_path.is_dir() {
        let summary = controller
            .run_folder(
                options.input_path.clone(),
                options.output_dir.clone(),
                options.force_overwrite,
            )
            .await?;
        if summary.failed > 0 {
            return Err(anyhow!("{} of {} documents failed", summary.failed, summary.total()));
        }
    } else {
        return Err(anyhow!("Input path does not exist: {:?}", options.input_path));
    }

    Ok(())
}

fn run_extract(options: ExtractArgs) -> Result<()> {
    let config = load_config(&options.common)?;
    let controller = Controller::with_config(config)?;

    let extraction = controller.extract(&options.input_path)?;
    println!("{}", extraction.outline.render());

    let output = options.output.unwrap_or_else(|| {
        let stem = options
            .input_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".to_string());
        options
            .input_path
            .with_file_name(format!("{}.structure.json", stem))
    });
    FileManager::write_json(&output, &extraction.model)?;

    info!(
        "Extracted {} blocks from {} to {}",
        extraction.model.len(),
        options.input_path.display(),
        output.display()
    );
    Ok(())
}

async fn run_resume(options: ResumeArgs) -> Result<()> {
    let config = load_config(&options.common)?;
    validate(&config, options.offline)?;

    let controller = Controller::with_config(config)?.offline(options.offline);
    install_interrupt_handler(&controller);

    let result = controller.resume(&options.session_id, &options.output).await?;
    info!("Session {}: {}", result.session_id, result.summary());
    Ok(())
}
