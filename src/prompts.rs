//! Prompts for cover-text generation.
//!
//! Kept in one place so the wording can be changed without touching the
//! call logic in [`crate::pipeline::llm`], and so tests can inspect it.
//! Callers can override the system prompt via
//! [`crate::config::AssemblyConfig::system_prompt`].

/// Default system prompt for the cover body text.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You write the introductory text printed on the cover page of a merged business document.

Follow these rules precisely:

1. CONTENT
   - Write 2 to 3 paragraphs in a formal, professional register
   - Describe the purpose of the document set based only on the description given
   - Do not invent names, figures, dates or commitments that were not provided

2. LANGUAGE
   - Answer in the same language as the description

3. OUTPUT FORMAT
   - Plain text only: no Markdown, no headings, no bullet points, no emphasis
   - Separate paragraphs with a single blank line
   - Do NOT repeat the title
   - Do NOT add commentary, greetings or signatures
   - Start directly with the first paragraph"#;

/// Build the user message for a cover request.
pub fn cover_user_prompt(title: &str, description: &str) -> String {
    let title = title.trim();
    let description = description.trim();
    if title.is_empty() {
        format!("Description of the documents:\n\"\"\"{description}\"\"\"")
    } else {
        format!("Document title: {title}\n\nDescription of the documents:\n\"\"\"{description}\"\"\"")
    }
}
