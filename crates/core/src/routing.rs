use crate::domain::advisor::AdvisorDomain;
use crate::domain::query::{ParamKind, QueryKind, QueryParams};

/// Keyword rule that routes an utterance to one data query.
///
/// Rules are checked in order and the first keyword match wins. When the
/// matched rule needs params the user did not provide, routing stops there
/// instead of trying later rules, so the reply falls back to the advisor's
/// general knowledge.
#[derive(Clone, Copy, Debug)]
pub struct Predicate {
    keywords: &'static [&'static str],
    required_params: &'static [ParamKind],
    query: QueryKind,
}

impl Predicate {
    pub fn query(&self) -> QueryKind {
        self.query
    }

    pub fn required_params(&self) -> &'static [ParamKind] {
        self.required_params
    }

    fn matches(&self, normalized_utterance: &str) -> bool {
        self.keywords.iter().all(|keyword| normalized_utterance.contains(keyword))
    }
}

const FINANCIAL_PREDICATES: &[Predicate] = &[
    Predicate {
        keywords: &["financiamiento", "negocio pequeño"],
        required_params: &[],
        query: QueryKind::FinancingOptions,
    },
    Predicate {
        keywords: &["califico para un préstamo"],
        required_params: &[],
        query: QueryKind::LoanQualification,
    },
    Predicate {
        keywords: &["documentos necesito", "préstamo"],
        required_params: &[],
        query: QueryKind::RequiredDocuments,
    },
];

const MARKETING_PREDICATES: &[Predicate] = &[Predicate {
    keywords: &["crear", "campaña de marketing"],
    required_params: &[ParamKind::Product, ParamKind::Objective, ParamKind::Budget],
    query: QueryKind::CampaignPlan,
}];

const MARKET_PREDICATES: &[Predicate] = &[
    Predicate {
        keywords: &["precio promedio", "producto similar"],
        required_params: &[ParamKind::Category],
        query: QueryKind::AveragePrice,
    },
    Predicate {
        keywords: &["competitivo", "mi zona"],
        required_params: &[ParamKind::Location],
        query: QueryKind::CompetitorCount,
    },
    Predicate {
        keywords: &["mercados internacionales", "interesados"],
        required_params: &[],
        query: QueryKind::InternationalMarkets,
    },
];

pub fn predicates(domain: AdvisorDomain) -> &'static [Predicate] {
    match domain {
        AdvisorDomain::Financial => FINANCIAL_PREDICATES,
        AdvisorDomain::Marketing => MARKETING_PREDICATES,
        AdvisorDomain::Market => MARKET_PREDICATES,
    }
}

/// Result of matching an utterance against a domain's predicate table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoutedQuery {
    pub query: QueryKind,
    pub required_params: &'static [ParamKind],
}

/// First predicate whose keywords all appear in the utterance, if any.
///
/// This ignores params on purpose: surfaces call it before submission to
/// learn which extra inputs to collect from the user.
pub fn match_predicate(domain: AdvisorDomain, utterance: &str) -> Option<RoutedQuery> {
    let normalized = normalize(utterance);
    predicates(domain)
        .iter()
        .find(|predicate| predicate.matches(&normalized))
        .map(|predicate| RoutedQuery {
            query: predicate.query,
            required_params: predicate.required_params,
        })
}

/// Route an utterance to a runnable query.
///
/// Returns `None` when no keywords match or when the matched predicate is
/// missing required params; both cases mean "answer without data".
pub fn route(domain: AdvisorDomain, utterance: &str, params: &QueryParams) -> Option<QueryKind> {
    let routed = match_predicate(domain, utterance)?;
    routed.required_params.iter().all(|kind| params.has(*kind)).then_some(routed.query)
}

/// Extra inputs the surface should collect for this utterance.
pub fn required_params(domain: AdvisorDomain, utterance: &str) -> &'static [ParamKind] {
    match_predicate(domain, utterance).map(|routed| routed.required_params).unwrap_or(&[])
}

// Keyword tables include accented Spanish, so lowercasing must be
// Unicode-aware rather than ASCII-only.
fn normalize(utterance: &str) -> String {
    utterance.to_lowercase()
}
