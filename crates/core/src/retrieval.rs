use std::collections::BTreeSet;

/// One `agente_financiero` row projected for loan qualification.
#[derive(Clone, Debug, PartialEq)]
pub struct LoanProfile {
    pub debt_level: String,
    pub monthly_income: f64,
}

/// Best-matching `agente_marketing` row for a campaign request.
#[derive(Clone, Debug, PartialEq)]
pub struct CampaignPlan {
    pub platforms: String,
    pub ad_type: String,
    pub strategies: String,
    pub budget: f64,
}

pub fn financing_options_summary(options: &[String]) -> Option<String> {
    join_unique_trimmed(options)
        .map(|joined| format!("Opciones de financiamiento para negocios pequeños: {joined}"))
}

pub fn loan_qualification_summary(profiles: &[LoanProfile]) -> Option<String> {
    if profiles.is_empty() {
        return None;
    }

    let low_count = profiles.iter().filter(|profile| profile.debt_level == "Bajo").count();
    let low_pct = low_count as f64 / profiles.len() as f64 * 100.0;
    let average_income =
        profiles.iter().map(|profile| profile.monthly_income).sum::<f64>() / profiles.len() as f64;

    Some(format!(
        "El nivel de endeudamiento promedio es {low_pct:.2}% bajo. Los ingresos mensuales promedio son ${average_income:.2}."
    ))
}

pub fn required_documents_summary(documents: &[String]) -> Option<String> {
    join_unique_trimmed(documents)
        .map(|joined| format!("Documentos necesarios para pedir un préstamo: {joined}"))
}

/// The sentence quotes the user's budget, not the matched row's.
pub fn campaign_summary(product: &str, objective: &str, budget: f64, plan: &CampaignPlan) -> String {
    format!(
        "Para tu producto '{product}' con el objetivo '{objective}' y presupuesto ${budget:.2}, se recomienda usar plataformas '{}', tipo de anuncio '{}' y estrategias '{}'.",
        plan.platforms, plan.ad_type, plan.strategies
    )
}

pub fn average_price_summary(category: &str, average_price: Option<f64>) -> Option<String> {
    average_price.map(|price| {
        format!(
            "El precio promedio de productos similares en la categoría '{category}' es ${price:.2}."
        )
    })
}

pub fn competitor_count_summary(location: &str, competitors: i64) -> String {
    format!("En tu zona ({location}), hay {competitors} competidores en tu categoría de producto.")
}

pub fn international_markets_summary(markets: &[String]) -> Option<String> {
    join_unique_trimmed(markets)
        .map(|joined| format!("Mercados internacionales potenciales: {joined}."))
}

/// Split comma-separated values across rows, trim each entry, and join the
/// distinct remainder in sorted order so summaries are deterministic.
fn join_unique_trimmed(values: &[String]) -> Option<String> {
    let unique: BTreeSet<&str> = values
        .iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect();

    if unique.is_empty() {
        return None;
    }

    Some(unique.into_iter().collect::<Vec<_>>().join(", "))
}
