//! Browser chat surface for the three advisors.
//!
//! Routes:
//! - `GET /` lists the advisors.
//! - `GET /{slug}` shows an advisor's chat page, restoring the transcript
//!   when a `session` query parameter names a known session.
//! - `POST /{slug}` submits a question. A question that routes to a data
//!   query with missing inputs re-renders the form with those fields; once
//!   everything is present the pipeline answers and the transcript grows by
//!   one user and one assistant turn.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Form, Path, Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use tera::Tera;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};
use uuid::Uuid;

use asesor_agent::AdvisorPipeline;
use asesor_core::domain::query::clean_text;
use asesor_core::routing;
use asesor_core::{AdvisorDomain, ChatMessage, Conversation, ParamKind, QueryParams, Role};

/// Sessions kept in memory at once. Inserting past the cap drops the least
/// recently used session, which is how a server-side conversation ends.
const MAX_SESSIONS: usize = 1024;

struct SessionEntry {
    conversations: HashMap<AdvisorDomain, Conversation>,
    last_active: u64,
}

/// Bounded LRU store of per-session advisor conversations. Recency is a
/// logical clock bumped on every touch, so eviction order is deterministic.
#[derive(Default)]
struct SessionStore {
    entries: HashMap<Uuid, SessionEntry>,
    clock: u64,
}

impl SessionStore {
    /// Fetch or create a session, marking it as the most recently used.
    fn touch(&mut self, session: Uuid) -> &mut SessionEntry {
        if !self.entries.contains_key(&session) {
            self.evict_to_cap(MAX_SESSIONS);
        }
        self.clock += 1;
        let clock = self.clock;
        let entry = self
            .entries
            .entry(session)
            .or_insert_with(|| SessionEntry { conversations: HashMap::new(), last_active: 0 });
        entry.last_active = clock;
        entry
    }

    fn get(&self, session: &Uuid) -> Option<&SessionEntry> {
        self.entries.get(session)
    }

    fn evict_to_cap(&mut self, cap: usize) {
        while self.entries.len() >= cap {
            let Some(stalest) = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_active)
                .map(|(id, _)| *id)
            else {
                return;
            };
            debug!(
                event_name = "advisor.session.evicted",
                session = %stalest,
                "session store is full, dropping the least recently used session",
            );
            self.entries.remove(&stalest);
        }
    }
}

#[derive(Clone)]
pub struct ChatState {
    pipeline: Arc<AdvisorPipeline>,
    sessions: Arc<Mutex<SessionStore>>,
    templates: Arc<Tera>,
}

impl ChatState {
    pub fn new(pipeline: Arc<AdvisorPipeline>) -> Self {
        Self {
            pipeline,
            sessions: Arc::new(Mutex::new(SessionStore::default())),
            templates: Arc::new(init_templates()),
        }
    }
}

pub fn router(state: ChatState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/{slug}", get(advisor_page).post(ask_advisor))
        .with_state(state)
}

// Embedded copies keep the binary self-contained when the templates
// directory is not shipped alongside it.
fn init_templates() -> Tera {
    let mut templates = match Tera::new("templates/advisor/**/*") {
        Ok(templates) => templates,
        Err(error) => {
            warn!(event_name = "system.templates.load_failed", error = %error);
            Tera::default()
        }
    };
    templates
        .add_raw_template("index.html", include_str!("../../../templates/advisor/index.html"))
        .ok();
    templates
        .add_raw_template("chat.html", include_str!("../../../templates/advisor/chat.html"))
        .ok();
    templates
}

#[derive(Debug, Default, Deserialize)]
struct SessionQuery {
    #[serde(default)]
    session: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
struct AskForm {
    #[serde(default)]
    session: Option<Uuid>,
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    categoria: Option<String>,
    #[serde(default)]
    ubicacion: Option<String>,
    #[serde(default)]
    producto: Option<String>,
    #[serde(default)]
    objetivo: Option<String>,
    #[serde(default)]
    presupuesto: Option<String>,
}

#[derive(Debug, Serialize)]
struct FieldContext {
    name: &'static str,
    label: &'static str,
    numeric: bool,
    value: String,
}

#[derive(Debug, Serialize)]
struct TranscriptEntry {
    role: &'static str,
    speaker: String,
    paragraphs: Vec<String>,
}

type PageResult = Result<Html<String>, (StatusCode, Html<String>)>;

async fn index(State(state): State<ChatState>) -> PageResult {
    let advisors: Vec<serde_json::Value> = AdvisorDomain::ALL
        .iter()
        .map(|domain| {
            let profile = domain.profile();
            serde_json::json!({
                "slug": profile.slug,
                "banner": profile.banner,
                "subtitle": profile.subtitle,
            })
        })
        .collect();

    let mut context = tera::Context::new();
    context.insert("advisors", &advisors);
    render(&state.templates, "index.html", &context)
}

async fn advisor_page(
    State(state): State<ChatState>,
    Path(slug): Path<String>,
    Query(query): Query<SessionQuery>,
) -> PageResult {
    let Some(domain) = AdvisorDomain::from_slug(&slug) else {
        return Err(not_found());
    };

    let session = query.session.unwrap_or_else(Uuid::new_v4);
    let transcript = current_transcript(&state, session, domain).await;

    render_chat(&state.templates, domain, session, "", None, &[], &transcript)
}

async fn ask_advisor(
    State(state): State<ChatState>,
    Path(slug): Path<String>,
    Form(form): Form<AskForm>,
) -> PageResult {
    let Some(domain) = AdvisorDomain::from_slug(&slug) else {
        return Err(not_found());
    };

    let session = form.session.unwrap_or_else(Uuid::new_v4);

    let Some(question) = clean_text(form.question.clone()) else {
        let transcript = current_transcript(&state, session, domain).await;
        return render_chat(
            &state.templates,
            domain,
            session,
            "",
            Some("Escribe una pregunta antes de enviar."),
            &[],
            &transcript,
        );
    };

    let params = params_from_form(&form);
    let required = routing::required_params(domain, &question);
    if required.iter().any(|kind| !params.has(*kind)) {
        let fields = field_contexts(required, &form);
        let transcript = current_transcript(&state, session, domain).await;
        return render_chat(&state.templates, domain, session, &question, None, &fields, &transcript);
    }

    // The lock is dropped while the model generates so other sessions can
    // keep chatting; the snapshot already contains the new user turn.
    let snapshot = {
        let mut sessions = state.sessions.lock().await;
        let entry = sessions.touch(session);
        let conversation = entry.conversations.entry(domain).or_insert_with(Conversation::new);
        conversation.push(ChatMessage::user(question));
        conversation.clone()
    };

    let reply = state.pipeline.respond(domain, &snapshot, &params).await;

    let transcript = {
        let mut sessions = state.sessions.lock().await;
        let entry = sessions.touch(session);
        let conversation = entry.conversations.entry(domain).or_insert_with(Conversation::new);
        conversation.push(ChatMessage::assistant(reply));
        transcript_entries(domain, conversation)
    };

    render_chat(&state.templates, domain, session, "", None, &[], &transcript)
}

async fn current_transcript(
    state: &ChatState,
    session: Uuid,
    domain: AdvisorDomain,
) -> Vec<TranscriptEntry> {
    let sessions = state.sessions.lock().await;
    sessions
        .get(&session)
        .and_then(|entry| entry.conversations.get(&domain))
        .map(|conversation| transcript_entries(domain, conversation))
        .unwrap_or_default()
}

fn params_from_form(form: &AskForm) -> QueryParams {
    QueryParams {
        category: clean_text(form.categoria.clone()),
        location: clean_text(form.ubicacion.clone()),
        product: clean_text(form.producto.clone()),
        objective: clean_text(form.objetivo.clone()),
        // A zero budget counts as not provided, like an untouched numeric
        // field.
        budget: form
            .presupuesto
            .as_deref()
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|value| *value != 0.0),
    }
}

fn field_contexts(required: &[ParamKind], form: &AskForm) -> Vec<FieldContext> {
    required
        .iter()
        .map(|kind| FieldContext {
            name: kind.field_name(),
            label: kind.prompt_label(),
            numeric: kind.is_numeric(),
            value: submitted_value(*kind, form),
        })
        .collect()
}

fn submitted_value(kind: ParamKind, form: &AskForm) -> String {
    let raw = match kind {
        ParamKind::Category => form.categoria.as_deref(),
        ParamKind::Location => form.ubicacion.as_deref(),
        ParamKind::Product => form.producto.as_deref(),
        ParamKind::Objective => form.objetivo.as_deref(),
        ParamKind::Budget => form.presupuesto.as_deref(),
    };
    raw.unwrap_or_default().trim().to_string()
}

fn transcript_entries(domain: AdvisorDomain, conversation: &Conversation) -> Vec<TranscriptEntry> {
    conversation
        .messages()
        .iter()
        .map(|message| TranscriptEntry {
            role: match message.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            speaker: match message.role {
                Role::User => "Tú".to_string(),
                Role::Assistant => domain.display_name().to_string(),
            },
            paragraphs: message.content.split("\n\n").map(str::to_string).collect(),
        })
        .collect()
}

fn render_chat(
    templates: &Tera,
    domain: AdvisorDomain,
    session: Uuid,
    question: &str,
    notice: Option<&str>,
    required_fields: &[FieldContext],
    transcript: &[TranscriptEntry],
) -> PageResult {
    let profile = domain.profile();
    let mut context = tera::Context::new();
    context.insert("banner", profile.banner);
    context.insert("subtitle", profile.subtitle);
    context.insert("slug", profile.slug);
    context.insert("session", &session.to_string());
    context.insert("question", question);
    context.insert("notice", &notice);
    context.insert("required_fields", required_fields);
    context.insert("transcript", transcript);
    render(templates, "chat.html", &context)
}

fn render(templates: &Tera, template: &str, context: &tera::Context) -> PageResult {
    match templates.render(template, context) {
        Ok(html) => Ok(Html(html)),
        Err(error) => {
            error!(event_name = "advisor.chat.render_failed", template, error = %error);
            Err(internal_error())
        }
    }
}

fn not_found() -> (StatusCode, Html<String>) {
    (StatusCode::NOT_FOUND, Html("<h1>Asesor no encontrado</h1>".to_string()))
}

fn internal_error() -> (StatusCode, Html<String>) {
    (StatusCode::INTERNAL_SERVER_ERROR, Html("<h1>Error interno</h1>".to_string()))
}
