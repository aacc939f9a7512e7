//! Advisor agent runtime.
//!
//! Turns one user question into one advisor reply through a fixed loop:
//!
//! 1. **Routing** - decide whether the question maps to a data query
//! 2. **Retrieval** - run the query and render a Spanish data summary
//! 3. **Prompting** - combine persona, summary, and question
//! 4. **Generation** - stream the model reply and condense it
//!
//! # Safety Principle
//!
//! The model never touches the database. Retrieval is deterministic SQL,
//! and the model only rephrases what retrieval found.

pub mod llm;
pub mod pipeline;

pub use llm::{LlmClient, LlmError, OllamaClient};
pub use pipeline::{AdvisorPipeline, DB_UNAVAILABLE_REPLY};
