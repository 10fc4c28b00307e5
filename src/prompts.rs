//! Prompts for the structured-extraction call.
//!
//! All prompt text lives here so unit tests can inspect it without a model.
//! Callers can override the system message via
//! [`crate::config::ExtractionConfig::system_prompt`]; the user message is
//! always built by [`extraction_prompt`] because it carries the schema the
//! response is validated against.

use crate::schema::schema_template;

/// Default system message for structured extraction.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an assistant specialised in extracting structured data from meal plans written by nutritionists. Always reply with valid JSON only, following the schema you are given.";

/// Rules appended after the document and before the schema.
pub const EXTRACTION_RULES: &str = r#"INSTRUCTIONS:
1. Extract the meals for every day of the week, Monday to Sunday (lunedì–domenica).
2. For every meal identify:
   - the main items ("principale") with their quantities
   - the alternatives ("alternative"), when present, with their quantities
3. Extract the nutritionist's general advice and notes into "note/consigli".
4. If a meal is marked as free (e.g. "PASTO LIBERO"), record that as a main item of that meal.
5. If the plan describes one generic meal structure, replicate it for every day of the week.
6. If the document has no information for a meal (e.g. "spuntino_mattina"), leave its "principale" and "alternative" lists empty. Never omit the meal key.
7. Every day from Monday to Sunday must appear in the JSON output. If the document gives no meals for a day, the day must still appear with empty meals, or with rest/free indications if present.
8. Keep food names and quantities exactly as written in the document; do not convert units."#;

/// Build the user message: document, rules, schema, output constraints.
pub fn extraction_prompt(markdown: &str) -> String {
    let schema = serde_json::to_string_pretty(&schema_template()).unwrap_or_default();
    format!(
        "Analyse the following meal plan in markdown format and extract its information as structured JSON.\n\n\
MEAL PLAN CONTENT:\n{markdown}\n\n\
{EXTRACTION_RULES}\n\n\
REQUIRED JSON FORMAT:\n{schema}\n\n\
IMPORTANT:\n\
- Return **exactly** the JSON object, with no introductory or closing text.\n\
- Do NOT include any comment, explanation or heading. Only valid JSON."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MealKind;

    #[test]
    fn prompt_embeds_markdown_verbatim() {
        let md = "# Lunedì\n| Colazione | Latte 200ml |";
        let p = extraction_prompt(md);
        assert!(p.contains(md));
    }

    #[test]
    fn prompt_embeds_schema_keys() {
        let p = extraction_prompt("x");
        for kind in MealKind::ALL {
            assert!(p.contains(kind.wire_key()), "missing {}", kind.wire_key());
        }
        assert!(p.contains("\"giorni\""));
        assert!(p.contains("\"note/consigli\""));
        assert!(p.contains("\"principale\""));
        assert!(p.contains("\"quantita\""));
    }

    #[test]
    fn prompt_states_rules() {
        let p = extraction_prompt("x");
        assert!(p.contains("Monday to Sunday"));
        assert!(p.contains("PASTO LIBERO"));
        assert!(p.contains("Never omit the meal key"));
        assert!(p.contains("Only valid JSON"));
    }

    #[test]
    fn markdown_precedes_schema() {
        let p = extraction_prompt("MARKER-123");
        let md_at = p.find("MARKER-123").unwrap();
        let schema_at = p.find("REQUIRED JSON FORMAT").unwrap();
        assert!(md_at < schema_at);
    }
}
