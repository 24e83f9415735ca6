use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::matcher::MatchKind;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AskQuestionParams {
    /// The question, in free text.
    pub question: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchTopicsParams {
    /// Text to look for in topic names and questions. Omit to list every topic.
    pub text: Option<String>,
    /// Maximum suggestions per topic (default from configuration, max: 50).
    pub per_topic: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListTopicParams {
    /// Topic name such as "Financeiro" (case and accents are ignored).
    pub topic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnswerSource {
    pub id: String,
    pub question: String,
    pub topic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AskQuestionResponse {
    pub answer: Option<String>,
    pub outcome: MatchKind,
    /// Overlap score of the returned entry, or the best score seen on a miss.
    pub score: f64,
    /// Present when the answer came from a corpus entry.
    pub source: Option<AnswerSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SuggestionInfo {
    pub id: String,
    pub question: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TopicSuggestionsInfo {
    pub topic: String,
    pub matched: usize,
    pub suggestions: Vec<SuggestionInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchTopicsResponse {
    pub topics: Vec<TopicSuggestionsInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QuestionSummary {
    pub id: String,
    pub question: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TopicListResponse {
    pub topic: String,
    pub question_count: usize,
    pub questions: Vec<QuestionSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CorpusInfoResponse {
    pub total_questions: usize,
    pub question_count: usize,
    pub topic_count: usize,
    /// "N/A" when the data file carries no timestamp.
    pub last_updated: String,
    pub digest: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReloadCorpusResponse {
    pub reloaded: bool,
    pub digest: String,
    pub question_count: usize,
}
