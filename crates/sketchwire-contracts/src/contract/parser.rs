use serde::{Deserialize, Serialize};

use super::delimiters::{
    EXPLANATION_END, EXPLANATION_START, HTML_END, HTML_START, REACT_END, REACT_START,
};

pub const HTML_PLACEHOLDER: &str = "<!-- No HTML generated -->";
pub const REACT_PLACEHOLDER: &str = "// No React code generated";
pub const EXPLANATION_PLACEHOLDER: &str = "No explanation provided.";

pub const MALFORMED_OUTPUT_MESSAGE: &str =
    "Failed to generate valid code structure. The model output was malformed.";

/// One successful generation or refinement round. A new result always replaces
/// the previous one wholesale; there is no partial merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedResult {
    pub html: String,
    pub react: String,
    pub explanation: String,
}

/// Extract the three delimited sections from raw model output.
///
/// Sections are located independently: first start marker, then the first end
/// marker after it, interior trimmed. The HTML and React sections are the
/// load-bearing pair: if both are absent the output did not honor the
/// contract and parsing fails. A single missing primary section is patched
/// with its placeholder, as is a missing explanation; partial output is more
/// useful to the user than a hard failure.
pub fn parse_generated_markup(raw: &str) -> Result<GeneratedResult, String> {
    let html = extract_section(raw, HTML_START, HTML_END);
    let react = extract_section(raw, REACT_START, REACT_END);

    if html.is_none() && react.is_none() {
        return Err(MALFORMED_OUTPUT_MESSAGE.to_string());
    }

    let explanation = extract_section(raw, EXPLANATION_START, EXPLANATION_END);

    Ok(GeneratedResult {
        html: html.unwrap_or_else(|| HTML_PLACEHOLDER.to_string()),
        react: react.unwrap_or_else(|| REACT_PLACEHOLDER.to_string()),
        explanation: explanation.unwrap_or_else(|| EXPLANATION_PLACEHOLDER.to_string()),
    })
}

fn extract_section(raw: &str, start_marker: &str, end_marker: &str) -> Option<String> {
    let start = raw.find(start_marker)? + start_marker.len();
    let rest = &raw[start..];
    let end = rest.find(end_marker)?;
    Some(rest[..end].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn well_formed() -> String {
        [
            "<<<HTML_START>>>",
            "<p>hi</p>",
            "<<<HTML_END>>>",
            "<<<REACT_START>>>",
            "const C=()=>null;",
            "<<<REACT_END>>>",
            "<<<EXPLANATION_START>>>",
            "Done",
            "<<<EXPLANATION_END>>>",
        ]
        .join("\n")
    }

    #[test]
    fn parses_all_three_sections_trimmed() {
        let result = parse_generated_markup(&well_formed()).unwrap();
        assert_eq!(result.html, "<p>hi</p>");
        assert_eq!(result.react, "const C=()=>null;");
        assert_eq!(result.explanation, "Done");
    }

    #[test]
    fn tolerates_prose_and_whitespace_around_sections() {
        let raw = format!(
            "Sure! Here is the code you asked for.\n\n{}\n\nLet me know if you need more.",
            well_formed()
        );
        let result = parse_generated_markup(&raw).unwrap();
        assert_eq!(result.html, "<p>hi</p>");
        assert_eq!(result.react, "const C=()=>null;");
    }

    #[test]
    fn sections_span_multiple_lines() {
        let raw = "<<<HTML_START>>>\n<div>\n  <span>a</span>\n</div>\n<<<HTML_END>>>\n\
                   <<<REACT_START>>>\nconst A = () => (\n  <div />\n);\n<<<REACT_END>>>";
        let result = parse_generated_markup(raw).unwrap();
        assert_eq!(result.html, "<div>\n  <span>a</span>\n</div>");
        assert_eq!(result.react, "const A = () => (\n  <div />\n);");
        assert_eq!(result.explanation, EXPLANATION_PLACEHOLDER);
    }

    #[test]
    fn missing_both_primary_sections_is_a_structural_failure() {
        let raw = "I'm sorry, I can't help with that sketch.";
        let err = parse_generated_markup(raw).unwrap_err();
        assert_eq!(err, MALFORMED_OUTPUT_MESSAGE);

        let explanation_only =
            "<<<EXPLANATION_START>>>\nThe sketch was unreadable.\n<<<EXPLANATION_END>>>";
        assert!(parse_generated_markup(explanation_only).is_err());
    }

    #[test]
    fn html_only_substitutes_react_and_explanation_placeholders() {
        let raw = "<<<HTML_START>>>\n<p>hi</p>\n<<<HTML_END>>>";
        let result = parse_generated_markup(raw).unwrap();
        assert_eq!(result.html, "<p>hi</p>");
        assert_eq!(result.react, REACT_PLACEHOLDER);
        assert_eq!(result.explanation, EXPLANATION_PLACEHOLDER);
    }

    #[test]
    fn react_only_substitutes_html_placeholder() {
        let raw = "<<<REACT_START>>>\nconst C=()=>null;\n<<<REACT_END>>>";
        let result = parse_generated_markup(raw).unwrap();
        assert_eq!(result.html, HTML_PLACEHOLDER);
        assert_eq!(result.react, "const C=()=>null;");
    }

    #[test]
    fn truncated_section_without_end_marker_is_ignored() {
        let raw = "<<<HTML_START>>>\n<p>cut off mid-stream";
        assert!(parse_generated_markup(raw).is_err());

        let raw = format!(
            "<<<REACT_START>>>\nconst C=()=>null;\n<<<REACT_END>>>\n{raw}"
        );
        let result = parse_generated_markup(&raw).unwrap();
        assert_eq!(result.html, HTML_PLACEHOLDER);
    }

    #[test]
    fn parsing_is_idempotent() {
        let raw = well_formed();
        let first = parse_generated_markup(&raw).unwrap();
        let second = parse_generated_markup(&raw).unwrap();
        assert_eq!(first, second);
    }
}
