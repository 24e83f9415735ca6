/// MCP server over the question/answer corpus.
///
/// Exposes five tools:
/// - `ask_question`: Match a free-text question against the corpus
/// - `search_topics`: Suggestion lists per topic, optionally filtered
/// - `list_topic`: Every question in one topic
/// - `corpus_info`: Corpus metadata
/// - `reload_corpus`: Re-read the corpus file if it changed
use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use tokio::sync::RwLock;
use tracing::info;

use crate::config::Config;
use crate::error::AppError;
use crate::reload::{LoadedCorpus, ReloadService};
use qa_common::corpus::Corpus;
use qa_common::matcher::Matcher;
use qa_common::mcp_api::{
    AnswerSource, AskQuestionParams, AskQuestionResponse, CorpusInfoResponse, ListTopicParams,
    QuestionSummary, ReloadCorpusResponse, SearchTopicsParams, SearchTopicsResponse,
    SuggestionInfo, TopicListResponse, TopicSuggestionsInfo,
};
use qa_common::topics;

const MAX_SUGGESTIONS_PER_TOPIC: u32 = 50;

/// The corpus is swapped whole on reload; readers clone the `Arc` and
/// release the lock before matching.
pub struct AppState {
    pub corpus: Arc<Corpus>,
    pub digest: String,
}

#[derive(Clone)]
pub struct QaLookupServer {
    state: Arc<RwLock<AppState>>,
    matcher: Arc<Matcher>,
    reload_service: Arc<ReloadService>,
    suggestions_per_topic: usize,
    tool_router: ToolRouter<QaLookupServer>,
}

impl QaLookupServer {
    pub fn new(loaded: LoadedCorpus, config: Config) -> Self {
        let state = Arc::new(RwLock::new(AppState {
            corpus: Arc::new(loaded.corpus),
            digest: loaded.digest,
        }));

        Self {
            state,
            matcher: Arc::new(Matcher::default()),
            suggestions_per_topic: config.suggestions_per_topic,
            reload_service: Arc::new(ReloadService::new(config)),
            tool_router: Self::tool_router(),
        }
    }

    async fn corpus(&self) -> Arc<Corpus> {
        Arc::clone(&self.state.read().await.corpus)
    }
}

#[tool_router]
impl QaLookupServer {
    #[tool(description = "Answer a question from the procedures manual. Returns the best-matching pre-authored answer and the topic it came from.")]
    async fn ask_question(
        &self,
        Parameters(params): Parameters<AskQuestionParams>,
    ) -> Result<Json<AskQuestionResponse>, String> {
        let question = params.question.trim().to_string();
        if question.is_empty() {
            return Err("question must not be empty".to_string());
        }

        let corpus = self.corpus().await;
        let result = self.matcher.answer(&question, Some(corpus.as_ref()));
        info!(
            outcome = ?result.kind,
            score = result.score,
            source = result.matched_entry.as_ref().map(|e| e.id.as_str()),
            "question answered"
        );

        Ok(Json(AskQuestionResponse {
            answer: result.answer,
            outcome: result.kind,
            score: result.score,
            source: result.matched_entry.map(|e| AnswerSource {
                id: e.id,
                question: e.question,
                topic: e.topic,
            }),
        }))
    }

    #[tool(description = "List suggested questions grouped by topic. Optional text filters topics by name or questions by content.")]
    async fn search_topics(
        &self,
        Parameters(params): Parameters<SearchTopicsParams>,
    ) -> Result<Json<SearchTopicsResponse>, String> {
        let text = params.text.as_deref().map(str::trim).unwrap_or_default();
        let per_topic = params
            .per_topic
            .map(|n| n.clamp(1, MAX_SUGGESTIONS_PER_TOPIC) as usize)
            .unwrap_or(self.suggestions_per_topic);

        let corpus = self.corpus().await;
        let topics = topics::search_topics(&corpus, text, per_topic)
            .into_iter()
            .map(|t| TopicSuggestionsInfo {
                topic: t.topic,
                matched: t.matched,
                suggestions: t
                    .suggestions
                    .into_iter()
                    .map(|s| SuggestionInfo {
                        id: s.id,
                        question: s.question,
                        label: s.label,
                    })
                    .collect(),
            })
            .collect();

        Ok(Json(SearchTopicsResponse { topics }))
    }

    #[tool(description = "List every question in a topic (e.g. 'Financeiro'). Case and accents are ignored.")]
    async fn list_topic(
        &self,
        Parameters(params): Parameters<ListTopicParams>,
    ) -> Result<Json<TopicListResponse>, String> {
        let name = params.topic.trim().to_string();
        if name.is_empty() {
            return Err("topic must not be empty".to_string());
        }

        let corpus = self.corpus().await;
        let topic = topics::find_topic(&corpus, &name).ok_or_else(|| {
            let available: Vec<&str> = corpus.topics().iter().map(|t| t.name.as_str()).collect();
            format!(
                "{}. Available topics: {}",
                AppError::UnknownTopic(name.clone()),
                available.join(", ")
            )
        })?;

        let questions: Vec<QuestionSummary> = corpus
            .topic_entries(topic)
            .map(|e| QuestionSummary {
                id: e.id.clone(),
                question: e.question.clone(),
            })
            .collect();

        Ok(Json(TopicListResponse {
            topic: topic.name.clone(),
            question_count: questions.len(),
            questions,
        }))
    }

    #[tool(description = "Show corpus metadata: question and topic counts, last update, content digest.")]
    async fn corpus_info(&self) -> Result<Json<CorpusInfoResponse>, String> {
        let state = self.state.read().await;
        let corpus = &state.corpus;

        Ok(Json(CorpusInfoResponse {
            total_questions: corpus.total_questions(),
            question_count: corpus.len(),
            topic_count: corpus.topics().len(),
            last_updated: corpus.last_updated().unwrap_or("N/A").to_string(),
            digest: state.digest.clone(),
        }))
    }

    #[tool(description = "Re-read the corpus file and swap it in if its content changed.")]
    async fn reload_corpus(&self) -> Result<Json<ReloadCorpusResponse>, String> {
        info!("reload_corpus tool invoked");

        let known_digest = self.state.read().await.digest.clone();
        let service = Arc::clone(&self.reload_service);
        let known = known_digest.clone();
        let loaded = tokio::task::spawn_blocking(move || service.reload_if_changed(&known))
            .await
            .map_err(|e| format!("reload task failed: {e}"))?
            .map_err(|e| format!("reload failed: {e}"))?;

        let mut state = self.state.write().await;
        let reloaded = match loaded {
            Some(loaded) => install_if_current(&mut state, &known_digest, loaded),
            None => false,
        };

        Ok(Json(ReloadCorpusResponse {
            reloaded,
            digest: state.digest.clone(),
            question_count: state.corpus.len(),
        }))
    }
}

/// Swap in `loaded` unless another reload already replaced the corpus
/// read as `known_digest`.
fn install_if_current(state: &mut AppState, known_digest: &str, loaded: LoadedCorpus) -> bool {
    if state.digest != known_digest {
        info!(
            current = %state.digest,
            discarded = %loaded.digest,
            "corpus replaced by a concurrent reload, discarding"
        );
        return false;
    }
    state.corpus = Arc::new(loaded.corpus);
    state.digest = loaded.digest;
    info!(questions = state.corpus.len(), "in-memory corpus replaced");
    true
}

#[tool_handler]
impl ServerHandler for QaLookupServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "qa-lookup".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Question/answer lookup over a fixed procedures manual. Use ask_question for \
                 free-text questions, search_topics and list_topic to browse suggested \
                 questions, corpus_info for metadata, and reload_corpus after the data file \
                 is replaced."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qa_common::matcher::{MatchKind, DEFLECTION_MESSAGE, NOT_FOUND_MESSAGE};

    const CORPUS: &str = r#"{
        "total_questions": 3,
        "last_updated": "2024-11-05",
        "topics": {"Financeiro": {"count": 2}, "Logística": {"count": 1}},
        "questions": [
            {"id": 1, "question": "Como funciona o pagamento?", "answer": "A1", "topic": "Financeiro"},
            {"id": 2, "question": "Qual o prazo de entrega?", "answer": "A2", "topic": "Logística"},
            {"id": 3, "question": "Aceitam cartão de crédito?", "answer": "A3", "topic": "Financeiro"}
        ]
    }"#;

    fn server_for(file: &tempfile::NamedTempFile) -> QaLookupServer {
        let config = Config {
            corpus_path: file.path().to_string_lossy().to_string(),
            suggestions_per_topic: 5,
        };
        let loaded = ReloadService::new(config.clone()).load().expect("load corpus");
        QaLookupServer::new(loaded, config)
    }

    fn corpus_file(content: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        std::fs::write(file.path(), content).expect("write corpus");
        file
    }

    fn ask(question: &str) -> Parameters<AskQuestionParams> {
        Parameters(AskQuestionParams {
            question: question.to_string(),
        })
    }

    #[test]
    fn tools_publish_output_schemas() {
        let tools = QaLookupServer::tool_router().list_all();
        for name in [
            "ask_question",
            "search_topics",
            "list_topic",
            "corpus_info",
            "reload_corpus",
        ] {
            let tool = tools
                .iter()
                .find(|t| t.name == name)
                .unwrap_or_else(|| panic!("missing tool: {name}"));
            assert!(
                tool.output_schema.is_some(),
                "tool {name} should publish output_schema"
            );
        }
    }

    #[tokio::test]
    async fn ask_question_returns_answer_and_source() {
        let file = corpus_file(CORPUS);
        let server = server_for(&file);

        let Json(response) = server
            .ask_question(ask("como e o pagamento"))
            .await
            .expect("tool call");
        assert_eq!(response.answer.as_deref(), Some("A1"));
        assert_eq!(response.outcome, MatchKind::Matched);
        let source = response.source.expect("source");
        assert_eq!(source.id, "1");
        assert_eq!(source.topic, "Financeiro");
    }

    #[tokio::test]
    async fn ask_question_deflects_and_misses() {
        let file = corpus_file(CORPUS);
        let server = server_for(&file);

        let Json(response) = server
            .ask_question(ask("Quanto ganha o Fabrício?"))
            .await
            .expect("tool call");
        assert_eq!(response.answer.as_deref(), Some(DEFLECTION_MESSAGE));
        assert!(response.source.is_none());

        let Json(response) = server
            .ask_question(ask("e o a de"))
            .await
            .expect("tool call");
        assert_eq!(response.answer.as_deref(), Some(NOT_FOUND_MESSAGE));
        assert_eq!(response.outcome, MatchKind::NotFound);
    }

    #[tokio::test]
    async fn ask_question_rejects_blank_input() {
        let file = corpus_file(CORPUS);
        let server = server_for(&file);
        let err = server.ask_question(ask("   ")).await.err().expect("should fail");
        assert_eq!(err, "question must not be empty");
    }

    #[tokio::test]
    async fn search_and_list_topics() {
        let file = corpus_file(CORPUS);
        let server = server_for(&file);

        let Json(all) = server
            .search_topics(Parameters(SearchTopicsParams {
                text: None,
                per_topic: Some(1),
            }))
            .await
            .expect("tool call");
        assert_eq!(all.topics.len(), 2);
        assert_eq!(all.topics[0].matched, 2);
        assert_eq!(all.topics[0].suggestions.len(), 1);
        assert_eq!(all.topics[0].suggestions[0].label, "Como funciona o pagamento?...");

        let Json(listed) = server
            .list_topic(Parameters(ListTopicParams {
                topic: "logistica".to_string(),
            }))
            .await
            .expect("tool call");
        assert_eq!(listed.topic, "Logística");
        assert_eq!(listed.question_count, 1);

        let err = server
            .list_topic(Parameters(ListTopicParams {
                topic: "RH".to_string(),
            }))
            .await
            .err()
            .expect("unknown topic");
        assert!(err.starts_with("unknown topic: RH"));
        assert!(err.contains("Financeiro, Logística"));
    }

    #[tokio::test]
    async fn corpus_info_and_reload() {
        let file = corpus_file(CORPUS);
        let server = server_for(&file);

        let Json(info) = server.corpus_info().await.expect("tool call");
        assert_eq!(info.total_questions, 3);
        assert_eq!(info.topic_count, 2);
        assert_eq!(info.last_updated, "2024-11-05");

        let Json(unchanged) = server.reload_corpus().await.expect("tool call");
        assert!(!unchanged.reloaded);
        assert_eq!(unchanged.digest, info.digest);

        std::fs::write(
            file.path(),
            r#"{"questions": [{"id": 9, "question": "Horario da loja?", "answer": "9h", "topic": "Lojas"}]}"#,
        )
        .expect("rewrite corpus");

        let Json(reloaded) = server.reload_corpus().await.expect("tool call");
        assert!(reloaded.reloaded);
        assert_eq!(reloaded.question_count, 1);

        let Json(response) = server
            .ask_question(ask("horario da loja"))
            .await
            .expect("tool call");
        assert_eq!(response.answer.as_deref(), Some("9h"));

        let Json(info) = server.corpus_info().await.expect("tool call");
        assert_eq!(info.last_updated, "N/A");
        assert_eq!(info.total_questions, 1);
    }

    #[test]
    fn stale_reload_does_not_replace_newer_corpus() {
        let newer = Corpus::from_json_str(CORPUS).expect("corpus");
        let mut state = AppState {
            corpus: Arc::new(newer),
            digest: "newer".to_string(),
        };
        let stale = LoadedCorpus {
            corpus: Corpus::default(),
            digest: "stale".to_string(),
        };

        assert!(!install_if_current(&mut state, "older", stale));
        assert_eq!(state.digest, "newer");
        assert_eq!(state.corpus.len(), 3);

        let fresh = LoadedCorpus {
            corpus: Corpus::default(),
            digest: "fresh".to_string(),
        };
        assert!(install_if_current(&mut state, "newer", fresh));
        assert_eq!(state.digest, "fresh");
        assert!(state.corpus.is_empty());
    }
}
