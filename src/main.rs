use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use subtrans::interactive::{derive_output_path, run_interactive_wizard};
use subtrans::{
    Config, ConsoleObserver, JobController, JobOutcome, Language, LanguagePair,
};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "subtrans")]
#[command(version, about = "Translate SRT subtitles with DeepL")]
#[command(long_about = "Translate every entry of an SRT subtitle file through the DeepL API, keeping all timings intact.")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Translate a subtitle file
    Translate {
        /// Input .srt file
        input: PathBuf,

        /// Output file (defaults to <name>.<target>.srt next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Source language code (e.g., EN, JA, DE)
        #[arg(short, long, default_value = "EN")]
        from: String,

        /// Target language code
        #[arg(short, long)]
        to: String,

        /// Worker threads for this run
        #[arg(long)]
        threads: Option<usize>,
    },

    /// List supported languages
    Languages,

    /// Show or change the stored configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Guided translation
    Interactive,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current configuration
    Show,
    /// Store a DeepL API key
    SetKey { key: String },
    /// Remove the stored API key
    DeleteKey,
    /// Store the worker thread count
    SetThreads { threads: usize },
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Command::Translate {
            input,
            output,
            from,
            to,
            threads,
        } => {
            let pair = LanguagePair::parse(&from, &to)?;
            let output = output.unwrap_or_else(|| derive_output_path(&input, pair.target));
            let mut config = Config::load().context("Failed to load configuration")?;
            if let Some(threads) = threads {
                config.threads = threads;
            }
            translate(&input, &output, pair, config)
        }
        Command::Languages => {
            for language in Language::ALL {
                println!("  {}  {}", language.code(), language.name());
            }
            Ok(())
        }
        Command::Config { action } => configure(action),
        Command::Interactive => {
            let wizard = run_interactive_wizard()?;
            translate(&wizard.input, &wizard.output, wizard.pair, wizard.config)
        }
    }
}

fn translate(input: &Path, output: &Path, pair: LanguagePair, config: Config) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    info!("Input:    {}", input.display());
    info!("Output:   {}", output.display());
    info!("Language: {}", pair);

    let quota_limit = config.quota_limit;
    let controller = Arc::new(JobController::new(config).context("Failed to start worker pool")?);

    let stopper = controller.clone();
    ctrlc::set_handler(move || {
        warn!("Interrupt received, stopping after the current entry...");
        stopper.stop();
    })
    .context("Failed to install Ctrl+C handler")?;

    let observer = Arc::new(ConsoleObserver::new(quota_limit));
    controller
        .start(input, output, pair, observer)
        .context("Could not start translation")?;

    let outcome = controller
        .wait()
        .context("Translation worker stopped unexpectedly")?;
    print_summary(&outcome, output, controller.quota_snapshot());

    match outcome {
        JobOutcome::Failed { error, .. } => anyhow::bail!(error),
        _ => Ok(()),
    }
}

fn configure(action: ConfigAction) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;

    match action {
        ConfigAction::Show => {
            let key = if config.has_credential() { "set" } else { "not set" };
            println!("  API key:     {}", key);
            println!("  API URL:     {}", config.api_url);
            println!("  Threads:     {}", config.threads);
            println!("  Quota limit: {}", config.quota_limit);
            println!("  Pacing:      {}ms", config.pacing_ms);
            return Ok(());
        }
        ConfigAction::SetKey { key } => {
            if key.trim().is_empty() {
                anyhow::bail!("API key is missing. Please provide a valid API key.");
            }
            config.api_key = Some(key.trim().to_string());
        }
        ConfigAction::DeleteKey => {
            if config.api_key.take().is_none() {
                anyhow::bail!("No API key found to delete.");
            }
        }
        ConfigAction::SetThreads { threads } => {
            config.threads = threads;
        }
    }

    config.validate()?;
    let path = config.save().context("Failed to save configuration")?;
    println!("Saved configuration to {}", path.display());
    Ok(())
}

fn print_summary(outcome: &JobOutcome, output: &Path, (limit, used): (u64, u64)) {
    let summary = outcome.summary();
    let status = match outcome {
        JobOutcome::Completed(_) => "Translation completed",
        JobOutcome::Cancelled(_) => "Translation cancelled",
        JobOutcome::Failed { .. } => "Translation failed",
    };

    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("  {}", status);
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("  Output:      {}", output.display());
    println!(
        "  Entries:     {}/{}",
        summary.entries_processed, summary.total_entries
    );
    println!("  Failed:      {}", summary.entries_failed);
    println!("  Characters:  {}", summary.characters_translated);
    println!("  Quota used:  {}/{}", used, limit);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_translate() {
        let cli = Cli::try_parse_from([
            "subtrans", "translate", "movie.srt", "--from", "en", "--to", "de",
        ])
        .unwrap();
        match cli.command {
            Command::Translate { input, from, to, output, threads } => {
                assert_eq!(input, PathBuf::from("movie.srt"));
                assert_eq!(from, "en");
                assert_eq!(to, "de");
                assert!(output.is_none());
                assert!(threads.is_none());
            }
            _ => panic!("expected translate"),
        }
    }

    #[test]
    fn test_cli_requires_target() {
        assert!(Cli::try_parse_from(["subtrans", "translate", "movie.srt"]).is_err());
    }

    #[test]
    fn test_cli_config_actions() {
        let cli = Cli::try_parse_from(["subtrans", "config", "set-threads", "8"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config {
                action: ConfigAction::SetThreads { threads: 8 }
            }
        ));
    }
}
