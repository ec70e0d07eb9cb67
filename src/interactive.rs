use crate::config::Config;
use crate::language::{Language, LanguagePair};
use console::style;
use dialoguer::{Confirm, Input, Password, Select};
use std::fs;
use std::path::{Path, PathBuf};

pub struct InteractiveResult {
    pub input: PathBuf,
    pub output: PathBuf,
    pub pair: LanguagePair,
    pub config: Config,
}

pub fn run_interactive_wizard() -> anyhow::Result<InteractiveResult> {
    print_header();

    // Step 1: Check/Setup API Key
    let config = setup_api_key()?;

    // Step 2: Select subtitle file
    let input = select_source_file()?;

    // Step 3: Languages
    let source = select_language("Select source language:", Language::English)?;
    let target = select_language("Select target language:", Language::German)?;
    if source == target {
        println!(
            "{} Source and target language are the same",
            style("!").yellow()
        );
    }
    let pair = LanguagePair::new(source, target);

    // Step 4: Output path
    let default_output = derive_output_path(&input, target);
    let output: String = Input::new()
        .with_prompt("Output file")
        .default(default_output.display().to_string())
        .interact_text()?;
    let output = PathBuf::from(output);

    // Step 5: Confirm
    print_summary(&input, &output, &pair);

    if !Confirm::new()
        .with_prompt("Start translation?")
        .default(true)
        .interact()?
    {
        anyhow::bail!("Cancelled by user");
    }

    println!();

    Ok(InteractiveResult {
        input,
        output,
        pair,
        config,
    })
}

fn print_header() {
    println!();
    println!(
        "{}",
        style("╔═══════════════════════════════════════════════════╗").cyan()
    );
    println!(
        "{}",
        style("║          subtrans - Subtitle Translator           ║").cyan()
    );
    println!(
        "{}",
        style("╚═══════════════════════════════════════════════════╝").cyan()
    );
    println!();
}

fn setup_api_key() -> anyhow::Result<Config> {
    let mut config = Config::load()?;

    if config.has_credential() {
        println!("{} API key configured", style("✓").green());
        return Ok(config);
    }

    println!("{} DeepL API key not found", style("!").yellow());
    println!("  Get one at: https://www.deepl.com/pro#developer\n");

    let api_key = Password::new()
        .with_prompt("Enter your DeepL API key")
        .interact()?;

    if api_key.trim().is_empty() {
        anyhow::bail!("API key is required");
    }

    config.api_key = Some(api_key.trim().to_string());

    if Confirm::new()
        .with_prompt("Save API key to config file?")
        .default(true)
        .interact()?
    {
        let path = config.save()?;
        println!(
            "{} API key saved to {}\n",
            style("✓").green(),
            path.display()
        );
    }

    Ok(config)
}

fn select_source_file() -> anyhow::Result<PathBuf> {
    println!("\n{}", style("Select subtitle file:").bold());

    let files = scan_subtitle_files(Path::new("."))?;

    if files.is_empty() {
        println!("  No .srt files found in current directory.\n");
        return prompt_existing_path();
    }

    let mut items: Vec<String> = files
        .iter()
        .map(|f| {
            let size = fs::metadata(f)
                .map(|m| format_size(m.len()))
                .unwrap_or_else(|_| "?".to_string());
            format!("{} ({})", f.display(), size)
        })
        .collect();
    items.push("Enter custom path...".to_string());

    let selection = Select::new()
        .with_prompt("Choose a file")
        .items(&items)
        .default(0)
        .interact()?;

    if selection == files.len() {
        prompt_existing_path()
    } else {
        Ok(files[selection].clone())
    }
}

fn prompt_existing_path() -> anyhow::Result<PathBuf> {
    let path: String = Input::new()
        .with_prompt("Enter file path")
        .interact_text()?;
    let path = PathBuf::from(path);
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    Ok(path)
}

fn scan_subtitle_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && crate::subtitle::ensure_supported(&path).is_ok() {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn select_language(prompt: &str, default: Language) -> anyhow::Result<Language> {
    let items: Vec<String> = Language::ALL.iter().map(|l| l.to_string()).collect();
    let default_idx = Language::ALL
        .iter()
        .position(|l| *l == default)
        .unwrap_or(0);

    let selection = Select::new()
        .with_prompt(prompt)
        .items(&items)
        .default(default_idx)
        .interact()?;

    Ok(Language::ALL[selection])
}

/// `movie.srt` translated to German becomes `movie.de.srt`.
pub fn derive_output_path(input: &Path, target: Language) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default();
    let mut output = input.to_path_buf();
    output.set_file_name(format!(
        "{}.{}.srt",
        stem.to_string_lossy(),
        target.code().to_lowercase()
    ));
    output
}

fn print_summary(input: &Path, output: &Path, pair: &LanguagePair) {
    println!("\n{}", style("═══ Summary ═══").bold());
    println!("  Input:     {}", style(input.display()).cyan());
    println!("  Output:    {}", style(output.display()).cyan());
    println!("  From:      {}", pair.source);
    println!("  To:        {}", pair.target);
    println!();
}
