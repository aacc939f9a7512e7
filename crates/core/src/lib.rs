pub mod config;
pub mod domain;
pub mod prompt;
pub mod reply;
pub mod retrieval;
pub mod routing;

pub use domain::advisor::{AdvisorDomain, AdvisorProfile};
pub use domain::conversation::{ChatMessage, Conversation, Role};
pub use domain::query::{ParamKind, QueryKind, QueryParams};
pub use routing::RoutedQuery;
