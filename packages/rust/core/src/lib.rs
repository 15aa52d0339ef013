//! Retrieval, source attribution, and answer orchestration for medsource.
//!
//! This crate ties together the structured store, the page fetcher, and the
//! language model into the question/answer workflow (`ask`).

pub mod context;
pub mod llm;
pub mod pipeline;
pub mod query;
pub mod retrieval;
pub mod source_map;
pub mod sources;

pub use context::{EXCERPT_CAP, EvidenceContext, build_context};
pub use llm::{AnswerGenerator, OpenRouterClient, QueryGenerator, SYSTEM_PROMPT};
pub use pipeline::{
    Agent, AnswerOptions, AskRequest, ProgressReporter, QuestionAnswer, RetrievalPath,
    SilentProgress, StructuredStore, ask,
};
pub use query::validate_generated_query;
pub use retrieval::{filter_by_medication, search_documents, search_rows};
pub use source_map::{SourceMap, build_source_map};
pub use sources::medication_urls;
