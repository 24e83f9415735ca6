use std::path::{Path, PathBuf};

use qa_common::topics::DEFAULT_SUGGESTIONS_PER_TOPIC;

use crate::error::AppError;

const MAX_SUGGESTIONS_PER_TOPIC: usize = 50;

/// Application configuration loaded explicitly from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the JSON question/answer data file.
    pub corpus_path: String,
    /// Suggestions shown per topic when a `search_topics` call gives no limit.
    pub suggestions_per_topic: usize,
}

impl Config {
    /// Required:
    /// - `QA_CORPUS_PATH`: path to the corpus JSON file (e.g. `data/qa_data.json`)
    ///
    /// Optional:
    /// - `QA_SUGGESTIONS_PER_TOPIC` (default: 5, max: 50)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let corpus_path = lookup("QA_CORPUS_PATH").ok_or_else(|| {
            AppError::Config("QA_CORPUS_PATH environment variable is required".to_string())
        })?;

        if !Path::new(&corpus_path).is_file() {
            return Err(AppError::Config(format!(
                "corpus file not found: {corpus_path}"
            )));
        }

        let suggestions_per_topic = match lookup("QA_SUGGESTIONS_PER_TOPIC") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| {
                    AppError::Config(format!(
                        "QA_SUGGESTIONS_PER_TOPIC must be a positive integer, got '{raw}'"
                    ))
                })?
                .min(MAX_SUGGESTIONS_PER_TOPIC),
            None => DEFAULT_SUGGESTIONS_PER_TOPIC,
        };

        Ok(Self {
            corpus_path,
            suggestions_per_topic,
        })
    }

    pub fn corpus_path(&self) -> PathBuf {
        Path::new(&self.corpus_path).to_path_buf()
    }
}
