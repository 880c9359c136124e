//! System prompts for each operation.

use crate::types::Language;

pub(crate) fn suggestion(language: Language) -> String {
    format!("You are a {language} expert. Provide concise code suggestions.")
}

pub(crate) fn tests(context: &str) -> String {
    format!("Generate unit tests for the following code:\n\n{context}")
}

pub(crate) fn explanation(language: Language) -> String {
    format!(
        "Explain this {language} code in detail:\n\n1. Purpose\n2. Key components\n3. Data flow\n4. Potential issues"
    )
}

pub(crate) fn architecture_review(language: Language) -> String {
    format!(
        "Review this {language} system architecture. Evaluate:\n\
         1. Modularity\n\
         2. Separation of concerns\n\
         3. Scalability\n\
         4. Common anti-patterns\n\
         Provide specific recommendations."
    )
}
