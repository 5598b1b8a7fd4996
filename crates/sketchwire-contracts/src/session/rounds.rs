use similar::TextDiff;

use crate::contract::GeneratedResult;

/// In-memory record of one successful generation or refinement round.
///
/// Rounds live only for the session; nothing here touches disk. The diff is
/// against the previous round's HTML so the surface can show what a
/// refinement actually changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundRecord {
    pub index: u64,
    pub instruction: Option<String>,
    pub result: GeneratedResult,
    pub html_diff: Option<Vec<String>>,
}

impl RoundRecord {
    pub(crate) fn new(
        index: u64,
        instruction: Option<String>,
        result: GeneratedResult,
        previous_html: Option<&str>,
    ) -> Self {
        let html_diff = html_diff(previous_html, &result.html);
        Self {
            index,
            instruction,
            result,
            html_diff,
        }
    }
}

fn html_diff(prev: Option<&str>, curr: &str) -> Option<Vec<String>> {
    let prev = prev?;
    let diff = TextDiff::from_lines(prev, curr);
    let rendered = diff.unified_diff().header("prev", "curr").to_string();
    Some(rendered.lines().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(html: &str) -> GeneratedResult {
        GeneratedResult {
            html: html.to_string(),
            react: "const C=()=>null;".to_string(),
            explanation: "ok".to_string(),
        }
    }

    #[test]
    fn first_round_has_no_diff() {
        let round = RoundRecord::new(1, None, result("<p>a</p>"), None);
        assert!(round.html_diff.is_none());
    }

    #[test]
    fn later_rounds_diff_against_previous_html() {
        let round = RoundRecord::new(
            2,
            Some("make it blue".to_string()),
            result("<p>blue</p>"),
            Some("<p>a</p>"),
        );
        let diff = round.html_diff.unwrap();
        assert!(diff.iter().any(|line| line == "-<p>a</p>"));
        assert!(diff.iter().any(|line| line == "+<p>blue</p>"));
    }
}
