/// Typed question/answer corpus.
///
/// The corpus is loaded once from the JSON data file, validated, and then shared
/// read-only (`Arc<Corpus>`). There is no mutation API; a reload builds a new
/// `Corpus` and swaps it in whole.
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Deserializer};
use tracing::warn;

use crate::error::CommonError;

/// A single pre-authored question and its answer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuestionEntry {
    /// Unique within a corpus. Integer ids in the data file are kept as their decimal text.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub question: String,
    pub answer: String,
    pub topic: String,
}

impl QuestionEntry {
    pub fn new(
        id: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            answer: answer.into(),
            topic: topic.into(),
        }
    }
}

/// A topic and the positions of its entries in the corpus sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub name: String,
    entry_indices: Vec<usize>,
}

impl Topic {
    pub fn len(&self) -> usize {
        self.entry_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_indices.is_empty()
    }
}

/// Mismatch between the metadata declared in the data file and what the
/// question list actually contains. Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    TotalMismatch { declared: usize, actual: usize },
    TopicCountMismatch { topic: String, declared: usize, actual: usize },
    UndeclaredTopic { topic: String },
    EmptyDeclaredTopic { topic: String },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TotalMismatch { declared, actual } => write!(
                f,
                "total_questions is {declared} but {actual} questions are present"
            ),
            Self::TopicCountMismatch {
                topic,
                declared,
                actual,
            } => write!(
                f,
                "topic '{topic}' declares {declared} questions but has {actual}"
            ),
            Self::UndeclaredTopic { topic } => {
                write!(f, "topic '{topic}' is used by questions but not declared")
            }
            Self::EmptyDeclaredTopic { topic } => {
                write!(f, "topic '{topic}' is declared but has no questions")
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CorpusFile {
    #[serde(default)]
    total_questions: Option<usize>,
    #[serde(default)]
    last_updated: Option<String>,
    #[serde(default)]
    topics: BTreeMap<String, DeclaredTopic>,
    #[serde(default)]
    questions: Vec<QuestionEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct DeclaredTopic {
    #[serde(default)]
    count: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Corpus {
    entries: Vec<QuestionEntry>,
    topics: Vec<Topic>,
    topic_index: HashMap<String, usize>,
    total_questions: usize,
    last_updated: Option<String>,
    declared_total: Option<usize>,
    declared_topics: BTreeMap<String, Option<usize>>,
}

impl Corpus {
    /// Build a corpus from entries in their display order.
    ///
    /// Fails on duplicate ids and on entries with an empty id or question.
    pub fn new(
        entries: Vec<QuestionEntry>,
        last_updated: Option<String>,
    ) -> Result<Self, CommonError> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if entry.id.trim().is_empty() {
                return Err(CommonError::InvalidEntry {
                    id: entry.id.clone(),
                    message: "id must not be empty".to_string(),
                });
            }
            if entry.question.trim().is_empty() {
                return Err(CommonError::InvalidEntry {
                    id: entry.id.clone(),
                    message: "question must not be empty".to_string(),
                });
            }
            if !seen.insert(entry.id.as_str()) {
                return Err(CommonError::DuplicateId(entry.id.clone()));
            }
        }

        let mut topics: Vec<Topic> = Vec::new();
        let mut topic_index: HashMap<String, usize> = HashMap::new();
        for (i, entry) in entries.iter().enumerate() {
            let slot = *topic_index.entry(entry.topic.clone()).or_insert_with(|| {
                topics.push(Topic {
                    name: entry.topic.clone(),
                    entry_indices: Vec::new(),
                });
                topics.len() - 1
            });
            topics[slot].entry_indices.push(i);
        }

        Ok(Self {
            total_questions: entries.len(),
            entries,
            topics,
            topic_index,
            last_updated,
            declared_total: None,
            declared_topics: BTreeMap::new(),
        })
    }

    /// Parse the JSON data file layout: `total_questions`, `last_updated`,
    /// `topics` (name -> `{count}`) and the authoritative `questions` array.
    pub fn from_json_str(content: &str) -> Result<Self, CommonError> {
        let file: CorpusFile = serde_json::from_str(content)?;
        let mut corpus = Self::new(file.questions, file.last_updated)?;
        if let Some(total) = file.total_questions {
            corpus.total_questions = total;
        }
        corpus.declared_total = file.total_questions;
        corpus.declared_topics = file
            .topics
            .into_iter()
            .map(|(name, declared)| (name, declared.count))
            .collect();
        Ok(corpus)
    }

    pub fn entries(&self) -> &[QuestionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Declared `total_questions`, or the question count when the file omits it.
    pub fn total_questions(&self) -> usize {
        self.total_questions
    }

    pub fn last_updated(&self) -> Option<&str> {
        self.last_updated.as_deref()
    }

    /// Topics in order of first appearance in the question list.
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    /// Exact-name topic lookup.
    pub fn topic(&self, name: &str) -> Option<&Topic> {
        self.topic_index.get(name).map(|&i| &self.topics[i])
    }

    pub fn topic_entries<'a>(
        &'a self,
        topic: &'a Topic,
    ) -> impl Iterator<Item = &'a QuestionEntry> + 'a {
        topic.entry_indices.iter().map(|&i| &self.entries[i])
    }

    /// Compare declared metadata against the question list.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if let Some(declared) = self.declared_total {
            if declared != self.entries.len() {
                issues.push(ValidationIssue::TotalMismatch {
                    declared,
                    actual: self.entries.len(),
                });
            }
        }

        if self.declared_topics.is_empty() {
            return issues;
        }

        for (name, declared) in &self.declared_topics {
            let actual = self.topic(name).map_or(0, Topic::len);
            if actual == 0 {
                issues.push(ValidationIssue::EmptyDeclaredTopic {
                    topic: name.clone(),
                });
                continue;
            }
            if let Some(declared) = *declared {
                if declared != actual {
                    issues.push(ValidationIssue::TopicCountMismatch {
                        topic: name.clone(),
                        declared,
                        actual,
                    });
                }
            }
        }

        for topic in &self.topics {
            if !self.declared_topics.contains_key(&topic.name) {
                issues.push(ValidationIssue::UndeclaredTopic {
                    topic: topic.name.clone(),
                });
            }
        }

        issues
    }
}

/// Parse corpus JSON read from `source` and warn about each validation issue.
pub fn parse_corpus(content: &str, source: &str) -> Result<Corpus, CommonError> {
    let corpus = Corpus::from_json_str(content)?;
    let issues = corpus.validate();
    for issue in &issues {
        warn!(source, %issue, "corpus validation issue");
    }
    Ok(corpus)
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "total_questions": 3,
        "last_updated": "2024-11-05 10:30",
        "topics": {
            "Financeiro": {"count": 2, "questions": []},
            "Logística": {"count": 1, "questions": []}
        },
        "questions": [
            {"id": 1, "question": "Como funciona o pagamento?", "answer": "A1", "topic": "Financeiro"},
            {"id": "log-1", "question": "Qual o prazo de entrega?", "answer": "A2", "topic": "Logística"},
            {"id": 3, "question": "Aceitam cartão de crédito?", "answer": "A3", "topic": "Financeiro"}
        ]
    }"#;

    #[test]
    fn parse_sample() {
        let corpus = Corpus::from_json_str(SAMPLE).expect("sample should parse");
        assert_eq!(corpus.len(), 3);
        assert_eq!(corpus.total_questions(), 3);
        assert_eq!(corpus.last_updated(), Some("2024-11-05 10:30"));
        assert_eq!(corpus.entries()[0].id, "1");
        assert_eq!(corpus.entries()[1].id, "log-1");
        assert!(corpus.validate().is_empty());
    }

    #[test]
    fn topics_keep_first_appearance_order() {
        let corpus = Corpus::from_json_str(SAMPLE).expect("sample should parse");
        let names: Vec<&str> = corpus.topics().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Financeiro", "Logística"]);

        let financeiro = corpus.topic("Financeiro").expect("topic exists");
        let ids: Vec<&str> = corpus
            .topic_entries(financeiro)
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, ["1", "3"]);
    }

    #[test]
    fn missing_metadata_defaults() {
        let corpus = Corpus::from_json_str(
            r#"{"questions": [{"id": 7, "question": "Q", "answer": "A", "topic": "T"}]}"#,
        )
        .expect("should parse");
        assert_eq!(corpus.total_questions(), 1);
        assert_eq!(corpus.last_updated(), None);
        assert!(corpus.validate().is_empty());

        let empty = Corpus::from_json_str("{}").expect("empty object parses");
        assert!(empty.is_empty());
        assert!(empty.topics().is_empty());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = Corpus::from_json_str(
            r#"{"questions": [
                {"id": 1, "question": "Q1", "answer": "A", "topic": "T"},
                {"id": "1", "question": "Q2", "answer": "B", "topic": "T"}
            ]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, CommonError::DuplicateId(id) if id == "1"));
    }

    #[test]
    fn rejects_empty_question() {
        let err = Corpus::new(vec![QuestionEntry::new("1", "  ", "A", "T")], None).unwrap_err();
        assert!(matches!(err, CommonError::InvalidEntry { .. }));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = Corpus::from_json_str(r#"{"questions": [{"id": 1}]}"#).unwrap_err();
        assert!(matches!(err, CommonError::Json(_)));
    }

    #[test]
    fn validate_reports_count_mismatches() {
        let corpus = Corpus::from_json_str(
            r#"{
                "total_questions": 5,
                "topics": {"A": {"count": 3}, "Vazio": {"count": 0}},
                "questions": [
                    {"id": 1, "question": "Q1", "answer": "x", "topic": "A"},
                    {"id": 2, "question": "Q2", "answer": "y", "topic": "B"}
                ]
            }"#,
        )
        .expect("should parse");

        let issues = corpus.validate();
        assert!(issues.contains(&ValidationIssue::TotalMismatch {
            declared: 5,
            actual: 2
        }));
        assert!(issues.contains(&ValidationIssue::TopicCountMismatch {
            topic: "A".to_string(),
            declared: 3,
            actual: 1
        }));
        assert!(issues.contains(&ValidationIssue::EmptyDeclaredTopic {
            topic: "Vazio".to_string()
        }));
        assert!(issues.contains(&ValidationIssue::UndeclaredTopic {
            topic: "B".to_string()
        }));
        assert_eq!(corpus.total_questions(), 5);
    }

    #[test]
    fn parse_corpus_keeps_issues_non_fatal() {
        let corpus = parse_corpus(
            r#"{"total_questions": 9, "questions": [
                {"id": 1, "question": "Q1", "answer": "x", "topic": "A"}
            ]}"#,
            "inline",
        )
        .expect("mismatched totals still load");
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.validate().len(), 1);

        let err = parse_corpus("{not json", "inline").unwrap_err();
        assert!(matches!(err, CommonError::Json(_)));
    }
}
