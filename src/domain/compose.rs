//! Prompt composition for the oracle.

pub const TRUNCATION_MARKER: &str = "\n[Context truncated...]";

const COMPARISON_PREAMBLE: &str = "Please provide a technical analysis and second opinion:";
const COMPARISON_STRUCTURE: &[&str] = &[
    "Please structure your response with:",
    "1. Your analysis and understanding",
    "2. Recommendations or approach",
    "3. Any concerns or considerations",
    "4. Alternative approaches (if applicable)",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryComposer {
    max_context_length: usize,
}

impl QueryComposer {
    pub fn new(max_context_length: usize) -> Self {
        Self { max_context_length }
    }

    pub fn max_context_length(&self) -> usize {
        self.max_context_length
    }

    /// Builds the full prompt. `context` is measured and cut in characters.
    pub fn compose(&self, query: &str, context: &str, comparison_mode: bool) -> String {
        let context = self.truncate_context(context);

        let mut parts: Vec<&str> = Vec::new();
        if comparison_mode {
            parts.push(COMPARISON_PREAMBLE);
            parts.push("");
        }
        if !context.is_empty() {
            parts.push("Context:");
            parts.push(&context);
            parts.push("");
        }
        parts.push("Question/Topic:");
        parts.push(query);
        if comparison_mode {
            parts.push("");
            parts.extend_from_slice(COMPARISON_STRUCTURE);
        }

        let prompt = parts.join("\n");
        tracing::debug!(chars = prompt.chars().count(), "composed prompt");
        prompt
    }

    fn truncate_context(&self, context: &str) -> String {
        match context.char_indices().nth(self.max_context_length) {
            Some((cut, _)) => {
                tracing::debug!(max = self.max_context_length, "context truncated");
                format!("{}{}", &context[..cut], TRUNCATION_MARKER)
            }
            None => context.to_owned(),
        }
    }
}
