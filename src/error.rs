use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubtransError {
    #[error("No API key found. Please provide a valid DeepL API key.")]
    MissingCredential,

    #[error("Unsupported subtitle format: {0}. Only .srt files are supported")]
    UnsupportedFormat(String),

    #[error("Malformed subtitle file: {0}")]
    Format(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("A translation job is already active")]
    JobActive,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Config write error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, SubtransError>;
