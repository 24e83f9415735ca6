/// Query matcher over the question corpus.
///
/// Stages, each returning early on a decisive outcome:
/// 0. no corpus: empty result; blank query: "not found"
/// 1. denylisted personal/compensation terms: fixed deflection
/// 2. content-word overlap scoring, best strictly-higher score wins
/// 3. below `SUBSTRING_FALLBACK_BELOW`: first question containing the whole query
/// 4. above `MIN_ACCEPT_SCORE`: the stage 2 winner, otherwise "not found"
use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::corpus::{Corpus, QuestionEntry};
use crate::normalize::normalize;

pub const DEFLECTION_MESSAGE: &str = "Não encontrei informações específicas sobre sua pergunta no Manual de Procedimentos. Tente reformular sua pergunta ou selecione sugestões no painel lateral.";

pub const NOT_FOUND_MESSAGE: &str = "Não encontrei uma resposta exata para sua pergunta. Tente usar as sugestões no painel lateral ou reformule sua pergunta.";

/// Matched against the normalized query as raw substrings. Accented terms are
/// kept as written and so never match a normalized query.
pub const DENYLIST: &[&str] = &[
    "fabricio",
    "joão",
    "maria",
    "josé",
    "ana",
    "carlos",
    "pedro",
    "paulo",
    "lucas",
    "quanto ganha",
    "salário de",
    "telefone de",
    "endereço de",
    "idade de",
    "casado com",
    "namorada de",
    "esposa de",
];

/// Removed from both token sets before scoring. Accented entries are kept as
/// written, so "é" in a normalized query survives as the content word "e".
pub const STOPWORDS: &[&str] = &[
    "o", "a", "os", "as", "um", "uma", "de", "da", "do", "das", "dos", "em", "na", "no", "nas",
    "nos", "para", "por", "com", "como", "quando", "onde", "que", "qual", "quais", "quem", "é",
    "são", "foi", "será", "tem", "ter", "fazer", "feito", "pode", "posso", "devo", "deve",
];

pub const SUBSTRING_FALLBACK_BELOW: f64 = 0.6;
pub const MIN_ACCEPT_SCORE: f64 = 0.3;

/// Queries with more content words than this need at least
/// `SPARSE_QUERY_MIN_OVERLAP` of them shared with a question.
const SPARSE_QUERY_WORDS: usize = 3;
const SPARSE_QUERY_MIN_OVERLAP: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    NoCorpus,
    Deflected,
    Matched,
    SubstringFallback,
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// `None` only when there was no corpus to search.
    pub answer: Option<String>,
    pub matched_entry: Option<QuestionEntry>,
    pub kind: MatchKind,
    /// Overlap score of `matched_entry`; for "not found" the best score seen.
    /// 0.0 when scoring did not run or the entry is not a scoring candidate.
    pub score: f64,
}

impl MatchResult {
    fn empty() -> Self {
        Self {
            answer: None,
            matched_entry: None,
            kind: MatchKind::NoCorpus,
            score: 0.0,
        }
    }

    fn message(kind: MatchKind, text: &str, score: f64) -> Self {
        Self {
            answer: Some(text.to_string()),
            matched_entry: None,
            kind,
            score,
        }
    }

    fn entry(kind: MatchKind, entry: &QuestionEntry, score: f64) -> Self {
        Self {
            answer: Some(entry.answer.clone()),
            matched_entry: Some(entry.clone()),
            kind,
            score,
        }
    }
}

/// Matching policy: the denylist and stopword set.
#[derive(Debug, Clone)]
pub struct Matcher {
    denylist: Vec<String>,
    stopwords: HashSet<String>,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(DENYLIST.iter().copied(), STOPWORDS.iter().copied())
    }
}

impl Matcher {
    pub fn new<D, S>(denylist: D, stopwords: S) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            denylist: denylist.into_iter().map(Into::into).collect(),
            stopwords: stopwords.into_iter().map(Into::into).collect(),
        }
    }

    pub fn answer(&self, query: &str, corpus: Option<&Corpus>) -> MatchResult {
        let Some(corpus) = corpus.filter(|c| !c.is_empty()) else {
            return MatchResult::empty();
        };

        let query_norm = normalize(query);
        if query_norm.trim().is_empty() {
            return MatchResult::message(MatchKind::NotFound, NOT_FOUND_MESSAGE, 0.0);
        }

        if let Some(term) = self.denylist.iter().find(|t| query_norm.contains(t.as_str())) {
            debug!(term = %term, "query deflected by denylist");
            return MatchResult::message(MatchKind::Deflected, DEFLECTION_MESSAGE, 0.0);
        }

        let query_words = self.content_words(&query_norm);

        let mut best: Option<&QuestionEntry> = None;
        let mut best_score = 0.0_f64;

        for entry in corpus.entries() {
            let Some(score) = self.overlap_score(&query_words, &entry.question) else {
                continue;
            };
            if score > best_score {
                best_score = score;
                best = Some(entry);
            }
        }

        if best_score < SUBSTRING_FALLBACK_BELOW {
            if let Some(entry) = corpus
                .entries()
                .iter()
                .find(|e| normalize(&e.question).contains(query_norm.as_str()))
            {
                let score = self
                    .overlap_score(&query_words, &entry.question)
                    .unwrap_or(0.0);
                debug!(id = %entry.id, score, best_score, "substring fallback match");
                return MatchResult::entry(MatchKind::SubstringFallback, entry, score);
            }
        }

        match best {
            Some(entry) if best_score > MIN_ACCEPT_SCORE => {
                debug!(id = %entry.id, score = best_score, "overlap match");
                MatchResult::entry(MatchKind::Matched, entry, best_score)
            }
            _ => {
                debug!(best_score, "no match");
                MatchResult::message(MatchKind::NotFound, NOT_FOUND_MESSAGE, best_score)
            }
        }
    }

    /// Share of the query's content words found in `question`, or `None` when
    /// the entry is not a candidate (no shared words, or a sparse overlap on a
    /// long query).
    fn overlap_score(&self, query_words: &HashSet<&str>, question: &str) -> Option<f64> {
        let question_norm = normalize(question);
        let entry_words = self.content_words(&question_norm);
        if query_words.is_empty() || entry_words.is_empty() {
            return None;
        }

        let common = query_words.intersection(&entry_words).count();
        if common == 0 {
            return None;
        }
        if query_words.len() > SPARSE_QUERY_WORDS && common < SPARSE_QUERY_MIN_OVERLAP {
            return None;
        }
        Some(common as f64 / query_words.len() as f64)
    }

    /// Whitespace tokens with surrounding punctuation trimmed, stopwords removed.
    fn content_words<'a>(&self, normalized: &'a str) -> HashSet<&'a str> {
        normalized
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|w| !w.is_empty() && !self.stopwords.contains(*w))
            .collect()
    }
}

/// Match `query` against `corpus` with the default policy.
pub fn answer(query: &str, corpus: Option<&Corpus>) -> MatchResult {
    Matcher::default().answer(query, corpus)
}
