/// Reload service for the question corpus.
///
/// Fingerprints the corpus file with SHA-256 and rebuilds the corpus only when
/// the digest changes. Used at startup and on demand via the `reload_corpus`
/// MCP tool.
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::info;

use crate::config::Config;
use crate::error::AppError;
use qa_common::corpus::{Corpus, parse_corpus};
use qa_common::error::CommonError;

/// A freshly loaded corpus and the digest of the bytes it came from.
pub struct LoadedCorpus {
    pub corpus: Corpus,
    pub digest: String,
}

pub struct ReloadService {
    config: Config,
}

impl ReloadService {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Read, fingerprint, parse and validate the corpus file.
    pub fn load(&self) -> Result<LoadedCorpus, AppError> {
        let path = self.config.corpus_path();
        let bytes = read_file(&path)?;
        let digest = digest_hex(&bytes);

        let content = String::from_utf8(bytes).map_err(|e| {
            AppError::Config(format!("corpus file {} is not utf-8: {e}", path.display()))
        })?;
        let corpus = parse_corpus(&content, &path.display().to_string())?;
        info!(
            path = %path.display(),
            questions = corpus.len(),
            topics = corpus.topics().len(),
            digest = %digest,
            "corpus loaded"
        );

        Ok(LoadedCorpus { corpus, digest })
    }

    /// Digest of the corpus file as it is on disk now.
    pub fn current_digest(&self) -> Result<String, AppError> {
        let bytes = read_file(&self.config.corpus_path())?;
        Ok(digest_hex(&bytes))
    }

    /// Reload when the file no longer matches `known_digest`.
    /// Returns `None` if already up to date.
    pub fn reload_if_changed(&self, known_digest: &str) -> Result<Option<LoadedCorpus>, AppError> {
        let digest = self.current_digest()?;
        if digest == known_digest {
            info!(digest = %digest, "corpus unchanged, skipping reload");
            return Ok(None);
        }

        info!(old = %known_digest, new = %digest, "corpus changed, reloading");
        self.load().map(Some)
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, AppError> {
    std::fs::read(path).map_err(|source| {
        AppError::Common(CommonError::Io {
            path: path.display().to_string(),
            source,
        })
    })
}

fn digest_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
