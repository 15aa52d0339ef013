//! Question answering: retrieval → source map → context → answer.
//!
//! The primary path asks the [`QueryGenerator`] for SQL, validates it, and
//! runs it against the [`StructuredStore`]. If any step fails, or the query
//! returns no rows, keyword retrieval over the pre-loaded rows and fetched
//! documents takes over. Either way exactly one answer-generation call is
//! made.

use std::future::Future;
use std::time::Instant;

use serde::Serialize;
use tracing::{Span, debug, info, instrument, warn};
use uuid::Uuid;

use medsource_extract::Fetcher;
use medsource_shared::{DefaultsConfig, MedSourceError, Result, ScrapedDocument, SideEffectRecord};
use medsource_storage::Storage;

use crate::context::build_context;
use crate::llm::{AnswerGenerator, QueryGenerator, SYSTEM_PROMPT};
use crate::query::validate_generated_query;
use crate::retrieval::{filter_by_medication, search_documents, search_rows};
use crate::source_map::{SourceMap, build_source_map};
use crate::sources::medication_urls;

// ---------------------------------------------------------------------------
// Collaborator seams
// ---------------------------------------------------------------------------

/// Read access to the structured side-effect table.
pub trait StructuredStore: Send + Sync {
    /// Every row of `table`.
    fn load_table(&self, table: &str) -> impl Future<Output = Result<Vec<SideEffectRecord>>> + Send;

    /// Run an already-validated query, keeping at most `limit` rows.
    fn run_query(
        &self,
        sql: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<SideEffectRecord>>> + Send;
}

impl StructuredStore for Storage {
    async fn load_table(&self, table: &str) -> Result<Vec<SideEffectRecord>> {
        self.load_side_effects(table).await
    }

    async fn run_query(&self, sql: &str, limit: usize) -> Result<Vec<SideEffectRecord>> {
        self.query_side_effects(sql, limit).await
    }
}

/// Progress callback for reporting `ask` status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once all pages have been fetched.
    fn documents_fetched(&self, fetched: usize, failed: usize);
    /// Called when the answer is ready.
    fn done(&self, answer: &QuestionAnswer);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn documents_fetched(&self, _fetched: usize, _failed: usize) {}
    fn done(&self, _answer: &QuestionAnswer) {}
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Retrieval limits.
#[derive(Debug, Clone)]
pub struct AnswerOptions {
    /// Table generated queries must target.
    pub table: String,
    /// Max rows kept by keyword retrieval.
    pub row_top_k: usize,
    /// Max documents kept by keyword retrieval.
    pub doc_top_k: usize,
    /// Max rows kept from a generated query.
    pub query_row_limit: usize,
}

impl From<&DefaultsConfig> for AnswerOptions {
    fn from(defaults: &DefaultsConfig) -> Self {
        Self {
            table: defaults.table.clone(),
            row_top_k: defaults.row_top_k,
            doc_top_k: defaults.doc_top_k,
            query_row_limit: defaults.query_row_limit,
        }
    }
}

impl Default for AnswerOptions {
    fn default() -> Self {
        Self::from(&DefaultsConfig::default())
    }
}

/// Which retrieval path produced the evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalPath {
    /// A generated query ran and returned rows.
    StructuredQuery,
    /// Keyword retrieval over pre-loaded rows and documents.
    KeywordFallback,
}

/// Everything produced for one question.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionAnswer {
    pub question_id: Uuid,
    /// Generated answer, or `"LLM error: ..."` if generation failed.
    pub answer: String,
    pub rows: Vec<SideEffectRecord>,
    pub documents: Vec<ScrapedDocument>,
    pub source_map: SourceMap,
    pub path: RetrievalPath,
}

/// Input to [`ask`].
#[derive(Debug, Clone)]
pub struct AskRequest {
    pub question: String,
    pub medication: String,
    /// Fetched after the default publisher pages.
    pub extra_urls: Vec<String>,
    /// Whether to fetch the drugs.com, Mayo Clinic and MedlinePlus pages.
    pub default_sources: bool,
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// The store and language-model collaborators plus retrieval limits.
pub struct Agent<S, Q, A> {
    store: S,
    query_gen: Q,
    answer_gen: A,
    options: AnswerOptions,
}

impl<S, Q, A> Agent<S, Q, A>
where
    S: StructuredStore,
    Q: QueryGenerator,
    A: AnswerGenerator,
{
    pub fn new(store: S, query_gen: Q, answer_gen: A, options: AnswerOptions) -> Self {
        Self {
            store,
            query_gen,
            answer_gen,
            options,
        }
    }

    /// Answer `question` from `rows` (already filtered to the medication, or
    /// not) and `docs`.
    ///
    /// Never fails: retrieval problems fall back to keyword search, and a
    /// failed answer call becomes an `"LLM error: ..."` answer.
    #[instrument(
        skip_all,
        fields(question_id = tracing::field::Empty, medication = medication.unwrap_or_default())
    )]
    pub async fn answer_question(
        &self,
        rows: &[SideEffectRecord],
        docs: &[ScrapedDocument],
        question: &str,
        medication: Option<&str>,
    ) -> QuestionAnswer {
        let question_id = Uuid::now_v7();
        Span::current().record("question_id", tracing::field::display(question_id));

        let (rows, documents, path) = match self.structured_query(question, medication).await {
            Some(hits) => (hits, docs.to_vec(), RetrievalPath::StructuredQuery),
            None => {
                warn!("falling back to keyword retrieval");
                let candidates = filter_by_medication(rows, medication);
                (
                    search_rows(&candidates, question, self.options.row_top_k),
                    search_documents(docs, question, self.options.doc_top_k),
                    RetrievalPath::KeywordFallback,
                )
            }
        };

        let source_map = build_source_map(&rows, &documents);
        let context = build_context(&rows, &documents, &source_map);
        let user_message = format!("Question: {question}\n\nContext:\n{context}");

        let answer = match self.answer_gen.generate(SYSTEM_PROMPT, &user_message).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "answer generation failed");
                llm_error_text(e)
            }
        };

        info!(
            ?path,
            rows = rows.len(),
            documents = documents.len(),
            phrases = source_map.len(),
            "answer ready"
        );

        QuestionAnswer {
            question_id,
            answer,
            rows,
            documents,
            source_map,
            path,
        }
    }

    /// Generate, validate and run a query. `None` means "use the fallback".
    async fn structured_query(
        &self,
        question: &str,
        medication: Option<&str>,
    ) -> Option<Vec<SideEffectRecord>> {
        let raw = match self.query_gen.generate_query(question, medication).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "query generation failed");
                return None;
            }
        };

        let sql = match validate_generated_query(&raw, &self.options.table) {
            Ok(sql) => sql,
            Err(e) => {
                warn!(error = %e, "rejected generated query");
                return None;
            }
        };

        debug!(%sql, "running generated query");
        match self.store.run_query(&sql, self.options.query_row_limit).await {
            Ok(hits) if hits.is_empty() => {
                debug!("generated query returned no rows");
                None
            }
            Ok(hits) => Some(hits),
            Err(e) => {
                warn!(error = %e, "generated query failed");
                None
            }
        }
    }
}

fn llm_error_text(err: MedSourceError) -> String {
    match err {
        MedSourceError::Llm(_) => err.to_string(),
        other => format!("LLM error: {other}"),
    }
}

/// Run the full `ask` workflow.
///
/// 1. Load the structured table (fatal on failure)
/// 2. Keep rows for the medication
/// 3. Fetch the publisher pages plus any extra URLs
/// 4. Answer the question
#[instrument(skip_all, fields(medication = %request.medication))]
pub async fn ask<S, Q, A>(
    agent: &Agent<S, Q, A>,
    fetcher: &Fetcher,
    request: &AskRequest,
    progress: &dyn ProgressReporter,
) -> Result<QuestionAnswer>
where
    S: StructuredStore,
    Q: QueryGenerator,
    A: AnswerGenerator,
{
    let start = Instant::now();

    let question = request.question.trim();
    if question.is_empty() {
        return Err(MedSourceError::validation("question must not be empty"));
    }
    let medication = request.medication.trim();
    if medication.is_empty() {
        return Err(MedSourceError::validation("medication name must not be empty"));
    }

    progress.phase("Loading structured data");
    let all_rows = agent.store.load_table(&agent.options.table).await?;
    let rows = filter_by_medication(&all_rows, Some(medication));
    info!(total = all_rows.len(), matching = rows.len(), "structured rows loaded");

    let mut urls = if request.default_sources {
        medication_urls(medication)
    } else {
        Vec::new()
    };
    urls.extend(request.extra_urls.iter().cloned());

    progress.phase("Fetching web sources");
    let docs = fetcher.fetch_all(&urls).await;
    let failed = docs.iter().filter(|d| d.is_failed()).count();
    progress.documents_fetched(docs.len() - failed, failed);

    progress.phase("Generating answer");
    let answer = agent
        .answer_question(&rows, &docs, question, Some(medication))
        .await;

    info!(
        question_id = %answer.question_id,
        duration_ms = start.elapsed().as_millis(),
        "ask completed"
    );
    progress.done(&answer);

    Ok(answer)
}
