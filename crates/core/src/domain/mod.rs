pub mod advisor;
pub mod conversation;
pub mod query;
