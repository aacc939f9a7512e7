use crate::domain::advisor::AdvisorDomain;

/// Render the generation prompt for one advisor turn.
///
/// Two shapes exist: one that grounds the model in a retrieved data summary
/// and one that asks it to answer from general knowledge. Both end with the
/// persona's answer label so the model continues in the advisor's voice.
pub fn build_prompt(domain: AdvisorDomain, data_summary: Option<&str>, question: &str) -> String {
    let profile = domain.profile();

    match data_summary {
        Some(data) => format!(
            r#"{opener}

Datos relevantes:
{data}

Pregunta del usuario:
{question}

Proporciona una respuesta concisa y práctica, limitada a un máximo de 3 párrafos. No incluyas ninguna metadata ni información adicional.

{label}
"#,
            opener = profile.opener_with_data,
            data = data,
            question = question,
            label = profile.answer_label,
        ),
        None => format!(
            r#"{opener} Proporciona una respuesta concisa y práctica a la siguiente pregunta, basada en tu conocimiento. No incluyas ninguna metadata ni información adicional.

Pregunta del usuario:
{question}

Proporciona una respuesta concisa y práctica, limitada a un máximo de 3 párrafos.

{label}
"#,
            opener = profile.opener_knowledge,
            question = question,
            label = profile.answer_label,
        ),
    }
}
