/// Canned reply used whenever generation produced nothing usable.
pub const EMPTY_REPLY_APOLOGY: &str =
    "Lo siento, no pude generar una respuesta adecuada. Por favor, intenta con otra pregunta.";

/// Replies are capped to the first paragraphs so advisors stay concise even
/// when the model rambles past the prompt's instruction.
pub const MAX_REPLY_PARAGRAPHS: usize = 3;

/// Trim the accumulated generation and cap it at [`MAX_REPLY_PARAGRAPHS`].
///
/// Returns `None` when nothing but whitespace came back; callers decide how
/// to apologize.
pub fn condense(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    Some(limit_paragraphs(trimmed, MAX_REPLY_PARAGRAPHS))
}

fn limit_paragraphs(text: &str, max_paragraphs: usize) -> String {
    text.split("\n\n").take(max_paragraphs).collect::<Vec<_>>().join("\n\n")
}
