use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use asesor_core::domain::advisor::AdvisorDomain;
use asesor_core::domain::conversation::Conversation;
use asesor_core::domain::query::{QueryKind, QueryParams};
use asesor_core::prompt::build_prompt;
use asesor_core::reply;
use asesor_core::retrieval;
use asesor_core::routing;
use asesor_db::repositories::{AdvisorDataRepository, RepositoryError};

use crate::llm::{LlmClient, LlmError};

/// User-facing reply when the database cannot be reached at all.
pub const DB_UNAVAILABLE_REPLY: &str = "Error al conectar con la base de datos.";

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("database is unavailable: {0}")]
    Connection(#[source] RepositoryError),
    #[error(transparent)]
    Generation(#[from] LlmError),
    #[error("conversation has no user question")]
    MissingQuestion,
    #[error("the model returned an empty reply")]
    EmptyGeneration,
}

/// One pipeline serves every advisor domain; the domain value selects the
/// persona, the keyword table, and the data queries.
pub struct AdvisorPipeline {
    repository: Arc<dyn AdvisorDataRepository>,
    llm: Arc<dyn LlmClient>,
}

impl AdvisorPipeline {
    pub fn new(repository: Arc<dyn AdvisorDataRepository>, llm: Arc<dyn LlmClient>) -> Self {
        Self { repository, llm }
    }

    /// Produce the advisor reply for the newest user question.
    ///
    /// This is the only place pipeline errors become user-facing text;
    /// every inner stage stays typed.
    pub async fn respond(
        &self,
        domain: AdvisorDomain,
        conversation: &Conversation,
        params: &QueryParams,
    ) -> String {
        match self.answer(domain, conversation, params).await {
            Ok(text) => text,
            Err(AdvisorError::Connection(error)) => {
                warn!(
                    event_name = "advisor.pipeline.db_unavailable",
                    domain = domain.slug(),
                    error = %error,
                    "retrieval lost the database",
                );
                DB_UNAVAILABLE_REPLY.to_string()
            }
            Err(AdvisorError::MissingQuestion) | Err(AdvisorError::EmptyGeneration) => {
                reply::EMPTY_REPLY_APOLOGY.to_string()
            }
            Err(AdvisorError::Generation(error)) => {
                warn!(
                    event_name = "advisor.pipeline.generation_failed",
                    domain = domain.slug(),
                    error = %error,
                    "model generation failed",
                );
                format!("Error inesperado: {error}")
            }
        }
    }

    async fn answer(
        &self,
        domain: AdvisorDomain,
        conversation: &Conversation,
        params: &QueryParams,
    ) -> Result<String, AdvisorError> {
        let question =
            conversation.latest_user_message().ok_or(AdvisorError::MissingQuestion)?;

        let data_summary = self.retrieve(domain, question, params).await?;
        debug!(
            event_name = "advisor.pipeline.prompt_built",
            domain = domain.slug(),
            grounded = data_summary.is_some(),
            "prompt assembled",
        );
        let prompt = build_prompt(domain, data_summary.as_deref(), question);

        let raw = self.llm.generate(&prompt).await?;
        reply::condense(&raw).ok_or(AdvisorError::EmptyGeneration)
    }

    /// Map the question to a data summary, or `None` for a
    /// knowledge-only answer.
    async fn retrieve(
        &self,
        domain: AdvisorDomain,
        question: &str,
        params: &QueryParams,
    ) -> Result<Option<String>, AdvisorError> {
        let Some(query) = routing::route(domain, question, params) else {
            debug!(
                event_name = "advisor.retrieval.no_route",
                domain = domain.slug(),
                "question has no data route",
            );
            return Ok(None);
        };

        match self.run_query(query, params).await {
            Ok(summary) => Ok(summary),
            Err(error) if error.is_connection_failure() => Err(AdvisorError::Connection(error)),
            Err(error) => {
                warn!(
                    event_name = "advisor.retrieval.query_failed",
                    domain = domain.slug(),
                    query = ?query,
                    error = %error,
                    "data query failed, falling back to knowledge",
                );
                Ok(None)
            }
        }
    }

    async fn run_query(
        &self,
        query: QueryKind,
        params: &QueryParams,
    ) -> Result<Option<String>, RepositoryError> {
        match query {
            QueryKind::FinancingOptions => {
                let options = self.repository.financing_options().await?;
                Ok(retrieval::financing_options_summary(&options))
            }
            QueryKind::LoanQualification => {
                let profiles = self.repository.loan_profiles().await?;
                Ok(retrieval::loan_qualification_summary(&profiles))
            }
            QueryKind::RequiredDocuments => {
                let documents = self.repository.required_documents().await?;
                Ok(retrieval::required_documents_summary(&documents))
            }
            QueryKind::CampaignPlan => {
                let (Some(product), Some(objective), Some(budget)) =
                    (params.product.as_deref(), params.objective.as_deref(), params.budget)
                else {
                    return Ok(None);
                };
                let plan = self.repository.campaign_plan_near_budget(budget).await?;
                Ok(plan.map(|plan| retrieval::campaign_summary(product, objective, budget, &plan)))
            }
            QueryKind::AveragePrice => {
                let Some(category) = params.category.as_deref() else {
                    return Ok(None);
                };
                let average = self.repository.average_price(category).await?;
                Ok(retrieval::average_price_summary(category, average))
            }
            QueryKind::CompetitorCount => {
                let Some(location) = params.location.as_deref() else {
                    return Ok(None);
                };
                let count = self.repository.competitor_count(location).await?;
                Ok(Some(retrieval::competitor_count_summary(location, count)))
            }
            QueryKind::InternationalMarkets => {
                let markets = self.repository.international_markets().await?;
                Ok(retrieval::international_markets_summary(&markets))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use asesor_core::domain::conversation::ChatMessage;
    use asesor_db::repositories::SqlAdvisorDataRepository;
    use asesor_db::{connect_with_settings, migrations, DbPool, DemoSeedDataset};

    use crate::llm::OllamaClient;

    use super::*;

    struct ScriptedLlm {
        reply: &'static str,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        fn new(reply: &'static str) -> Arc<Self> {
            Arc::new(Self { reply, prompts: Mutex::new(Vec::new()) })
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().expect("a prompt was sent")
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.to_string())
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl LlmClient for FailingLlm {
        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            Err(LlmError::Stream("conexión rechazada".to_string()))
        }
    }

    async fn seeded_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");
        DemoSeedDataset::load(&pool).await.expect("load demo seed");
        pool
    }

    fn pipeline_with(pool: &DbPool, llm: Arc<dyn LlmClient>) -> AdvisorPipeline {
        AdvisorPipeline::new(Arc::new(SqlAdvisorDataRepository::new(pool.clone())), llm)
    }

    fn ask(question: &str) -> Conversation {
        let mut conversation = Conversation::new();
        conversation.push(ChatMessage::user(question));
        conversation
    }

    #[tokio::test]
    async fn grounded_question_builds_data_prompt() {
        let pool = seeded_pool().await;
        let llm = ScriptedLlm::new("Considera un microcrédito para empezar.");
        let pipeline = pipeline_with(&pool, llm.clone());

        let conversation =
            ask("¿Qué opciones de financiamiento existen para mi negocio pequeño?");
        let reply = pipeline
            .respond(AdvisorDomain::Financial, &conversation, &QueryParams::default())
            .await;

        assert_eq!(reply, "Considera un microcrédito para empezar.");

        let prompt = llm.last_prompt();
        assert!(prompt.contains("Datos relevantes:"));
        assert!(prompt.contains(
            "Opciones de financiamiento para negocios pequeños: Arrendamiento, Crédito PyME, Microcrédito"
        ));
        assert!(prompt.ends_with("Respuesta del asesor:\n"));

        pool.close().await;
    }

    #[tokio::test]
    async fn unmatched_question_uses_knowledge_prompt() {
        let pool = seeded_pool().await;
        let llm = ScriptedLlm::new("Una respuesta general.");
        let pipeline = pipeline_with(&pool, llm.clone());

        let conversation = ask("¿Cómo puedo motivar a mis empleados?");
        pipeline.respond(AdvisorDomain::Financial, &conversation, &QueryParams::default()).await;

        let prompt = llm.last_prompt();
        assert!(prompt.contains("basada en tu conocimiento"));
        assert!(!prompt.contains("Datos relevantes:"));

        pool.close().await;
    }

    #[tokio::test]
    async fn campaign_question_quotes_the_user_budget() {
        let pool = seeded_pool().await;
        let llm = ScriptedLlm::new("Aquí tienes un plan de campaña.");
        let pipeline = pipeline_with(&pool, llm.clone());

        let conversation = ask("Quiero crear una campaña de marketing para mi producto");
        let params = QueryParams {
            product: Some("Mezcal artesanal".to_string()),
            objective: Some("Aumentar ventas".to_string()),
            budget: Some(450.0),
            ..QueryParams::default()
        };
        pipeline.respond(AdvisorDomain::Marketing, &conversation, &params).await;

        let prompt = llm.last_prompt();
        assert!(prompt.contains("presupuesto $450.00"));
        assert!(prompt.contains("Facebook, Instagram"));
        assert!(prompt.ends_with("Respuesta del experto:\n"));

        pool.close().await;
    }

    #[tokio::test]
    async fn empty_reply_becomes_the_apology() {
        let pool = seeded_pool().await;
        let llm = ScriptedLlm::new("   \n  ");
        let pipeline = pipeline_with(&pool, llm);

        let conversation = ask("¿Califico para un préstamo?");
        let reply = pipeline
            .respond(AdvisorDomain::Financial, &conversation, &QueryParams::default())
            .await;

        assert_eq!(reply, reply::EMPTY_REPLY_APOLOGY);

        pool.close().await;
    }

    #[tokio::test]
    async fn long_replies_are_trimmed_to_three_paragraphs() {
        let pool = seeded_pool().await;
        let llm = ScriptedLlm::new("Uno.\n\nDos.\n\nTres.\n\nCuatro.\n\nCinco.");
        let pipeline = pipeline_with(&pool, llm);

        let conversation = ask("¿Qué documentos necesito para solicitar un préstamo?");
        let reply = pipeline
            .respond(AdvisorDomain::Financial, &conversation, &QueryParams::default())
            .await;

        assert_eq!(reply, "Uno.\n\nDos.\n\nTres.");

        pool.close().await;
    }

    #[tokio::test]
    async fn missing_question_becomes_the_apology() {
        let pool = seeded_pool().await;
        let llm = ScriptedLlm::new("No debería llamarse.");
        let pipeline = pipeline_with(&pool, llm);

        let reply = pipeline
            .respond(AdvisorDomain::Market, &Conversation::new(), &QueryParams::default())
            .await;

        assert_eq!(reply, reply::EMPTY_REPLY_APOLOGY);

        pool.close().await;
    }

    #[tokio::test]
    async fn closed_pool_reports_database_unavailable() {
        let pool = seeded_pool().await;
        let llm = ScriptedLlm::new("No debería llamarse.");
        let pipeline = pipeline_with(&pool, llm);
        pool.close().await;

        let conversation =
            ask("¿Qué opciones de financiamiento existen para mi negocio pequeño?");
        let reply = pipeline
            .respond(AdvisorDomain::Financial, &conversation, &QueryParams::default())
            .await;

        assert_eq!(reply, DB_UNAVAILABLE_REPLY);
    }

    #[tokio::test]
    async fn failed_query_falls_back_to_knowledge_prompt() {
        let pool = seeded_pool().await;
        sqlx::query("DROP TABLE agente_financiero").execute(&pool).await.expect("drop table");

        let llm = ScriptedLlm::new("Respuesta desde conocimiento general.");
        let pipeline = pipeline_with(&pool, llm.clone());

        let conversation =
            ask("¿Qué opciones de financiamiento existen para mi negocio pequeño?");
        let reply = pipeline
            .respond(AdvisorDomain::Financial, &conversation, &QueryParams::default())
            .await;

        assert_eq!(reply, "Respuesta desde conocimiento general.");

        let prompt = llm.last_prompt();
        assert!(prompt.contains("basada en tu conocimiento"));
        assert!(!prompt.contains("Datos relevantes:"));

        pool.close().await;
    }

    #[tokio::test]
    async fn stalled_model_times_out_as_an_unexpected_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
        let address = listener.local_addr().expect("listener address");
        // Accept connections and hold them open without ever answering.
        let hold = tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                open.push(socket);
            }
        });

        let pool = seeded_pool().await;
        let llm = Arc::new(OllamaClient::new(format!("http://{address}"), "llama3.2:3b", 1));
        let pipeline = pipeline_with(&pool, llm);

        let conversation = ask("¿Califico para un préstamo?");
        let reply = pipeline
            .respond(AdvisorDomain::Financial, &conversation, &QueryParams::default())
            .await;

        assert_eq!(reply, "Error inesperado: llm generation timed out after 1s");

        hold.abort();
        pool.close().await;
    }

    #[tokio::test]
    async fn generation_failure_is_reported_as_unexpected() {
        let pool = seeded_pool().await;
        let pipeline = pipeline_with(&pool, Arc::new(FailingLlm));

        let conversation = ask("¿Cuál es el precio promedio de un producto similar al mío?");
        let params =
            QueryParams { category: Some("Alimentos".to_string()), ..QueryParams::default() };
        let reply = pipeline.respond(AdvisorDomain::Market, &conversation, &params).await;

        assert!(reply.starts_with("Error inesperado:"));
        assert!(reply.contains("conexión rechazada"));

        pool.close().await;
    }
}
