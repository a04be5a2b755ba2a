//! 研究层：状态、查询抽取、来源聚合、Finalizer 与循环状态机

pub mod events;
pub mod extractor;
pub mod finalize;
pub mod graph;
pub mod prompts;
pub mod sources;
pub mod state;
pub mod thinking;

pub use events::{ResearchEvent, Stage};
pub use extractor::{QueryExtractor, QueryTarget};
pub use finalize::{dedup_source_lines, extract_source_urls, finalize_summary};
pub use graph::{
    fallback_query, route_research, Researcher, ResearchRun, StepOutcome,
    SEARCH_FAILURE_SENTINEL, SUMMARY_FAILURE_PLACEHOLDER,
};
pub use sources::{deduplicate_and_format_sources, format_source_urls, CHARS_PER_TOKEN, MAX_TOKENS_PER_SOURCE};
pub use state::{ResearchOutcome, ResearchState};
pub use thinking::strip_thinking_tokens;
