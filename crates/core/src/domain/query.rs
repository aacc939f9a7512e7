use serde::{Deserialize, Serialize};

/// Canonical data questions the advisors know how to answer from SQL.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    FinancingOptions,
    LoanQualification,
    RequiredDocuments,
    CampaignPlan,
    AveragePrice,
    CompetitorCount,
    InternationalMarkets,
}

/// Extra inputs a routed query may need beyond the question text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Category,
    Location,
    Product,
    Objective,
    Budget,
}

impl ParamKind {
    /// Form field name used by the web UI.
    pub fn field_name(&self) -> &'static str {
        match self {
            ParamKind::Category => "categoria",
            ParamKind::Location => "ubicacion",
            ParamKind::Product => "producto",
            ParamKind::Objective => "objetivo",
            ParamKind::Budget => "presupuesto",
        }
    }

    /// Label shown when the user is asked for this input.
    pub fn prompt_label(&self) -> &'static str {
        match self {
            ParamKind::Category => "Ingresa la categoría de tu producto:",
            ParamKind::Location => "Ingresa tu ubicación geográfica:",
            ParamKind::Product => "Ingresa el nombre de tu producto:",
            ParamKind::Objective => "Ingresa el objetivo de tu campaña:",
            ParamKind::Budget => "Ingresa tu presupuesto:",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ParamKind::Budget)
    }
}

/// Optional inputs collected from the user alongside the question.
///
/// Surfaces are expected to normalize blank text to `None` before building
/// this, so presence checks reduce to `is_some`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryParams {
    pub category: Option<String>,
    pub location: Option<String>,
    pub product: Option<String>,
    pub objective: Option<String>,
    pub budget: Option<f64>,
}

impl QueryParams {
    pub fn has(&self, kind: ParamKind) -> bool {
        match kind {
            ParamKind::Category => self.category.is_some(),
            ParamKind::Location => self.location.is_some(),
            ParamKind::Product => self.product.is_some(),
            ParamKind::Objective => self.objective.is_some(),
            ParamKind::Budget => self.budget.is_some(),
        }
    }
}

/// Trim surface input and drop blanks, so `QueryParams` only ever holds
/// values the user actually provided.
pub fn clean_text(value: Option<String>) -> Option<String> {
    value.map(|text| text.trim().to_string()).filter(|text| !text.is_empty())
}
