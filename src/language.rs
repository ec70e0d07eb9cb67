//! The fixed set of languages the translation endpoint accepts.

use crate::error::{Result, SubtransError};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Afrikaans,
    Arabic,
    German,
    English,
    Spanish,
    French,
    Italian,
    Japanese,
    Dutch,
    Polish,
    Portuguese,
    Russian,
    Chinese,
}

impl Language {
    pub const ALL: [Language; 13] = [
        Language::Afrikaans,
        Language::Arabic,
        Language::German,
        Language::English,
        Language::Spanish,
        Language::French,
        Language::Italian,
        Language::Japanese,
        Language::Dutch,
        Language::Polish,
        Language::Portuguese,
        Language::Russian,
        Language::Chinese,
    ];

    /// Two-letter code sent to the API.
    pub fn code(&self) -> &'static str {
        match self {
            Language::Afrikaans => "AF",
            Language::Arabic => "AR",
            Language::German => "DE",
            Language::English => "EN",
            Language::Spanish => "ES",
            Language::French => "FR",
            Language::Italian => "IT",
            Language::Japanese => "JA",
            Language::Dutch => "NL",
            Language::Polish => "PL",
            Language::Portuguese => "PT",
            Language::Russian => "RU",
            Language::Chinese => "ZH",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::Afrikaans => "Afrikaans",
            Language::Arabic => "Arabic",
            Language::German => "German",
            Language::English => "English",
            Language::Spanish => "Spanish",
            Language::French => "French",
            Language::Italian => "Italian",
            Language::Japanese => "Japanese",
            Language::Dutch => "Dutch",
            Language::Polish => "Polish",
            Language::Portuguese => "Portuguese",
            Language::Russian => "Russian",
            Language::Chinese => "Chinese",
        }
    }

    fn iso639_3(&self) -> &'static str {
        match self {
            Language::Afrikaans => "AFR",
            Language::Arabic => "ARA",
            Language::German => "DEU",
            Language::English => "ENG",
            Language::Spanish => "SPA",
            Language::French => "FRA",
            Language::Italian => "ITA",
            Language::Japanese => "JPN",
            Language::Dutch => "DUT",
            Language::Polish => "POL",
            Language::Portuguese => "POR",
            Language::Russian => "RUS",
            Language::Chinese => "CHI",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

impl FromStr for Language {
    type Err = SubtransError;

    /// Accepts two-letter codes and three-letter ISO 639-3 aliases, any case.
    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_uppercase();
        Language::ALL
            .iter()
            .copied()
            .find(|lang| lang.code() == upper || lang.iso639_3() == upper)
            .ok_or_else(|| SubtransError::UnsupportedLanguage(s.to_string()))
    }
}

/// Source and target language of one job. Fixed for the job's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguagePair {
    pub source: Language,
    pub target: Language,
}

impl LanguagePair {
    pub fn new(source: Language, target: Language) -> Self {
        Self { source, target }
    }

    /// Validate both codes against the supported set.
    pub fn parse(source: &str, target: &str) -> Result<Self> {
        Ok(Self::new(source.parse()?, target.parse()?))
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source.code(), self.target.code())
    }
}
