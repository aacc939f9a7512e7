use async_trait::async_trait;
use thiserror::Error;

use asesor_core::retrieval::{CampaignPlan, LoanProfile};

pub mod advisor_data;

pub use advisor_data::SqlAdvisorDataRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl RepositoryError {
    /// True when the database itself is unreachable, as opposed to a
    /// failure of one statement against a healthy connection.
    pub fn is_connection_failure(&self) -> bool {
        match self {
            Self::Database(error) => matches!(
                error,
                sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
            ),
            Self::Decode(_) => false,
        }
    }
}

/// Read-side queries behind every advisor answer. One implementation per
/// backing store; the agent pipeline only sees this trait.
#[async_trait]
pub trait AdvisorDataRepository: Send + Sync {
    async fn financing_options(&self) -> Result<Vec<String>, RepositoryError>;

    async fn loan_profiles(&self) -> Result<Vec<LoanProfile>, RepositoryError>;

    async fn required_documents(&self) -> Result<Vec<String>, RepositoryError>;

    async fn campaign_plan_near_budget(
        &self,
        budget: f64,
    ) -> Result<Option<CampaignPlan>, RepositoryError>;

    async fn average_price(&self, category: &str) -> Result<Option<f64>, RepositoryError>;

    async fn competitor_count(&self, location: &str) -> Result<i64, RepositoryError>;

    async fn international_markets(&self) -> Result<Vec<String>, RepositoryError>;
}
