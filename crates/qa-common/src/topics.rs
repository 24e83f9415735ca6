/// Topic browsing: suggestion lists grouped by topic.
use crate::corpus::{Corpus, QuestionEntry, Topic};
use crate::normalize::normalize;

pub const DEFAULT_SUGGESTIONS_PER_TOPIC: usize = 5;
const SUGGESTION_LABEL_CHARS: usize = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub id: String,
    pub question: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSuggestions {
    pub topic: String,
    /// Questions in this topic that matched the search, before truncation.
    pub matched: usize,
    pub suggestions: Vec<Suggestion>,
}

/// Group suggestions by topic, filtered by a free-text search.
///
/// An empty search keeps every topic. Otherwise the search text is lowercased
/// and a topic is kept whole when its normalized name contains it, or reduced
/// to the questions whose normalized text contains it. Each topic lists at
/// most `per_topic` suggestions.
pub fn search_topics(corpus: &Corpus, text: &str, per_topic: usize) -> Vec<TopicSuggestions> {
    let needle = text.to_lowercase();

    corpus
        .topics()
        .iter()
        .filter_map(|topic| {
            let entries: Vec<&QuestionEntry> = if needle.is_empty()
                || normalize(&topic.name).contains(needle.as_str())
            {
                corpus.topic_entries(topic).collect()
            } else {
                corpus
                    .topic_entries(topic)
                    .filter(|e| normalize(&e.question).contains(needle.as_str()))
                    .collect()
            };

            if entries.is_empty() {
                return None;
            }

            Some(TopicSuggestions {
                topic: topic.name.clone(),
                matched: entries.len(),
                suggestions: entries
                    .into_iter()
                    .take(per_topic)
                    .map(suggestion)
                    .collect(),
            })
        })
        .collect()
}

/// Case-insensitive topic lookup (accents included: "logistica" finds "Logística").
pub fn find_topic<'a>(corpus: &'a Corpus, name: &str) -> Option<&'a Topic> {
    if let Some(topic) = corpus.topic(name) {
        return Some(topic);
    }
    let wanted = normalize(name.trim());
    corpus
        .topics()
        .iter()
        .find(|t| normalize(&t.name) == wanted)
}

/// Sidebar button text: the first 60 characters followed by "...".
pub fn suggestion_label(question: &str) -> String {
    let head: String = question.chars().take(SUGGESTION_LABEL_CHARS).collect();
    format!("{head}...")
}

fn suggestion(entry: &QuestionEntry) -> Suggestion {
    Suggestion {
        id: entry.id.clone(),
        question: entry.question.clone(),
        label: suggestion_label(&entry.question),
    }
}
