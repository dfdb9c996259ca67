use crate::translation::client::TranslationRequest;
use crate::utils::clean_text;

pub fn build_translation_prompt(request: &TranslationRequest) -> String {
    let mut prompt = match &request.source_lang {
        Some(source) => format!(
            "Translate the following {} text to {}.",
            source, request.target_lang
        ),
        None => format!(
            "Translate the following text to {}. Detect the source language yourself.",
            request.target_lang
        ),
    };

    prompt.push_str(
        "\nReply with the translation only: no explanations, no alternatives, no surrounding quotes.",
    );
    prompt.push_str("\nKeep numbers, codes, URLs and placeholders unchanged.\n\n");
    prompt.push('"');
    prompt.push_str(&request.text);
    prompt.push('"');

    prompt
}

/// Flattens the model output onto one line and drops quotes the model
/// echoed from the prompt.
pub fn clean_translation(source: &str, raw: &str) -> String {
    let cleaned = clean_text(raw);
    let source = source.trim();

    let echoed_quotes = cleaned.len() >= 2
        && cleaned.starts_with('"')
        && cleaned.ends_with('"')
        && !(source.starts_with('"') && source.ends_with('"'));

    if echoed_quotes {
        cleaned[1..cleaned.len() - 1].trim().to_string()
    } else {
        cleaned
    }
}
