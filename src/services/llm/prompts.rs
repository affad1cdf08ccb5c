//! Prompt text for the direct completion backend.

pub const TRANSLATOR_SYSTEM: &str = "You are a real-time meeting interpreter. Translate the English sentence provided by the user into natural, fluent Simplified Chinese, preserving tone and paragraph structure. Reply with the translation only.";

pub const TRANSCRIPT_TRANSLATOR_SYSTEM: &str = "You are a professional simultaneous interpretation assistant. Translate the English transcript provided by the user into natural, fluent Simplified Chinese, keeping the original meaning and line breaks.";

pub const QUESTION_DETECTOR_SYSTEM: &str = "You are a question detector. Analyze the given text and determine if it is a question that expects an answer. Respond with only 'true' or 'false'.";

pub const ANSWER_SEPARATOR: &str = "---SEPARATOR---";

/// Context entries forwarded to the answer call.
pub const ANSWER_CONTEXT_LIMIT: usize = 5;

pub fn question_prompt(text: &str) -> String {
    format!(
        "Question: {}\n\nPlease provide a helpful answer in both English and Chinese (Simplified), separated by '{}'.",
        text, ANSWER_SEPARATOR
    )
}

pub fn context_line(english: &str, chinese: Option<&str>) -> String {
    match chinese.filter(|c| !c.is_empty()) {
        Some(chinese) => format!("Previous: {} ({})", english, chinese),
        None => format!("Previous: {}", english),
    }
}
