use serde::{Deserialize, Serialize};

/// The three advisor personas served by the shared pipeline.
///
/// Everything that differs between them (keyword predicates, SQL, data
/// summaries, prompt wording) is looked up through this enum, so adding an
/// advisor means adding data, not a new code path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisorDomain {
    Financial,
    Marketing,
    Market,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdvisorProfile {
    pub display_name: &'static str,
    pub slug: &'static str,
    pub banner: &'static str,
    pub subtitle: &'static str,
    pub opener_with_data: &'static str,
    pub opener_knowledge: &'static str,
    pub answer_label: &'static str,
}

const FINANCIAL_PROFILE: AdvisorProfile = AdvisorProfile {
    display_name: "Agente Financiero",
    slug: "financiero",
    banner: "Agente Financiero 💰",
    subtitle: "Haz tus preguntas financieras y recibe asesoramiento experto.",
    opener_with_data: "Eres un asesor financiero experto que proporciona respuestas detalladas basadas en los datos proporcionados.",
    opener_knowledge: "Eres un asesor financiero experto.",
    answer_label: "Respuesta del asesor:",
};

const MARKETING_PROFILE: AdvisorProfile = AdvisorProfile {
    display_name: "Agente de Marketing",
    slug: "marketing",
    banner: "Agente de Marketing 📣",
    subtitle: "Haz tus preguntas sobre marketing y recibe consejos expertos.",
    opener_with_data: "Eres un experto en marketing que proporciona consejos y estrategias basadas en datos.",
    opener_knowledge: "Eres un experto en marketing.",
    answer_label: "Respuesta del experto:",
};

const MARKET_PROFILE: AdvisorProfile = AdvisorProfile {
    display_name: "Agente de Mercado",
    slug: "mercado",
    banner: "Agente de Mercado 📊",
    subtitle: "Realiza consultas sobre el mercado y obtén análisis especializados.",
    opener_with_data: "Eres un analista de mercado experto que proporciona insights basados en datos.",
    opener_knowledge: "Eres un analista de mercado experto.",
    answer_label: "Respuesta del analista:",
};

impl AdvisorDomain {
    pub const ALL: [AdvisorDomain; 3] =
        [AdvisorDomain::Financial, AdvisorDomain::Marketing, AdvisorDomain::Market];

    pub fn profile(&self) -> &'static AdvisorProfile {
        match self {
            AdvisorDomain::Financial => &FINANCIAL_PROFILE,
            AdvisorDomain::Marketing => &MARKETING_PROFILE,
            AdvisorDomain::Market => &MARKET_PROFILE,
        }
    }

    pub fn display_name(&self) -> &'static str {
        self.profile().display_name
    }

    /// URL path segment for this advisor (`/financiero`, `/marketing`, `/mercado`).
    pub fn slug(&self) -> &'static str {
        self.profile().slug
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|domain| domain.slug() == slug)
    }
}
