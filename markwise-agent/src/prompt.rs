//! Prompt assembly for grounded issue analysis.
//!
//! Builds a system prompt that restricts the model to the retrieved
//! sections and a user prompt carrying the sections and the query.

use knowledge::RetrievedContext;

/// Assembles analysis prompts.
pub struct PromptAssembler;

impl PromptAssembler {
    /// System prompt with the grounding rules and output format.
    pub fn build_system_prompt() -> String {
        let mut prompt = String::new();

        prompt.push_str("You are a trademark law expert analyzing trademark applications against USPTO examination guidance.\n\n");

        prompt.push_str("## RULES\n\n");
        prompt.push_str("1. ONLY use information from the reference sections provided\n");
        prompt.push_str("2. ALWAYS cite specific sections when making claims (format: TMEP §XXXX)\n");
        prompt.push_str("3. If the sections do not answer the question, say \"Based on provided TMEP sections, I cannot determine...\"\n");
        prompt.push_str("4. Be precise and factual; do not speculate\n");
        prompt.push_str("5. Rate your confidence (0-100%) in your analysis\n\n");

        prompt.push_str("## RESPONSE FORMAT\n\n");
        prompt.push_str("ANALYSIS: [Your detailed analysis, with TMEP § citations]\n");
        prompt.push_str("CONFIDENCE: [0-100]%\n");
        prompt.push_str("CITATIONS_USED: [Section numbers you cited, comma separated, e.g. 1207, 1209]\n");

        prompt
    }

    /// User prompt with numbered reference sections followed by the query.
    pub fn build_user_prompt(query: &str, contexts: &[RetrievedContext]) -> String {
        let mut prompt = String::new();

        prompt.push_str("## REFERENCE SECTIONS\n\n");
        if contexts.is_empty() {
            prompt.push_str("(no sections retrieved)\n\n");
        }
        for (i, ctx) in contexts.iter().enumerate() {
            prompt.push_str(&format!(
                "{}. {}: {}\n{}\n\n",
                i + 1,
                ctx.citation(),
                ctx.title,
                ctx.content.trim()
            ));
        }

        prompt.push_str("## QUERY\n\n");
        prompt.push_str(query);
        prompt.push('\n');
        prompt
    }
}
