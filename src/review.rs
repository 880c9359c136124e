//! Architecture-review parsing.
//!
//! [`parse_architecture_review`] turns the model's free-text critique into
//! an [`ArchitectureReview`]. Parsing is total: every section is extracted
//! independently and a missing section yields its zero value, never an
//! error. The expected response layout is:
//!
//! ```text
//! Score: 7/10
//! Issues:
//! - Controllers talk to the database directly
//! - No error boundary around the job runner
//! Recommendations:
//! - Introduce a repository layer
//! ```
//!
//! `Component: <name>` tokens and `a -> b` / `a depends on b` relations
//! anywhere in the text feed a best-effort Mermaid diagram.

use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::Regex;

use crate::types::ArchitectureReview;

const ISSUES_HEADER: &str = "Issues:";
const RECOMMENDATIONS_HEADER: &str = "Recommendations:";
const ENTRY_SEPARATOR: &str = "\n- ";

static SCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Score: ([0-9]+)/10").expect("valid score pattern"));

static COMPONENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Component: (\w+)").expect("valid component pattern"));

static RELATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\w+)\s*(?:->|depends on)\s*(\w+)").expect("valid relation pattern")
});

/// Parse a free-text architecture review. Never fails.
pub fn parse_architecture_review(text: &str) -> ArchitectureReview {
    ArchitectureReview {
        score: parse_score(text),
        issues: issues_section(text).map(split_entries).unwrap_or_default(),
        recommendations: section_after(text, RECOMMENDATIONS_HEADER)
            .map(split_entries)
            .unwrap_or_default(),
        diagram: build_diagram(text),
    }
}

/// First `Score: N/10`, clamped to 10. Zero when absent or unparsable.
fn parse_score(text: &str) -> u8 {
    SCORE
        .captures(text)
        .and_then(|caps| caps[1].parse::<u64>().ok())
        .map(|score| score.min(10) as u8)
        .unwrap_or(0)
}

fn section_after<'a>(text: &'a str, header: &str) -> Option<&'a str> {
    text.find(header).map(|idx| &text[idx + header.len()..])
}

/// Text after `Issues:` up to a following `Recommendations:` line.
fn issues_section(text: &str) -> Option<&str> {
    let rest = section_after(text, ISSUES_HEADER)?;
    let end = rest
        .find(&format!("\n{RECOMMENDATIONS_HEADER}"))
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

fn split_entries(section: &str) -> Vec<String> {
    section
        .split(ENTRY_SEPARATOR)
        .map(|entry| entry.trim())
        .map(|entry| entry.strip_prefix("- ").unwrap_or(entry).trim())
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Mermaid `graph TD` of mentioned components and relations, or `None`
/// when the text names neither.
fn build_diagram(text: &str) -> Option<String> {
    let nodes: IndexSet<&str> = COMPONENT
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();
    let edges: IndexSet<(&str, &str)> = RELATION
        .captures_iter(text)
        .filter_map(|caps| Some((caps.get(1)?.as_str(), caps.get(2)?.as_str())))
        .collect();

    if nodes.is_empty() && edges.is_empty() {
        return None;
    }

    let mut diagram = String::from("graph TD\n");
    for node in &nodes {
        diagram.push_str(&format!("    {node}\n"));
    }
    for (from, to) in &edges {
        diagram.push_str(&format!("    {from} --> {to}\n"));
    }
    Some(diagram)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_layout() {
        let review =
            parse_architecture_review("Score: 7/10\nIssues:\n- A\n- B\nRecommendations:\n- C");
        assert_eq!(review.score, 7);
        assert_eq!(review.issues, vec!["A", "B"]);
        assert_eq!(review.recommendations, vec!["C"]);
    }

    #[test]
    fn no_markers_yields_zero_values() {
        let review = parse_architecture_review("The code looks fine overall.");
        assert_eq!(review, ArchitectureReview::default());
    }

    #[test]
    fn score_is_clamped() {
        assert_eq!(parse_score("Score: 12/10"), 10);
        assert_eq!(parse_score("Score: 99999999999999999999999/10"), 0);
        assert_eq!(parse_score("Score: 3 / 10"), 0);
    }

    #[test]
    fn first_score_wins() {
        assert_eq!(parse_score("Score: 4/10 ... revised Score: 8/10"), 4);
    }

    #[test]
    fn only_ascii_digits_form_a_score() {
        assert_eq!(parse_score("Score: \u{0667}/10, then Score: 8/10"), 8);
    }

    #[test]
    fn issues_without_recommendations_run_to_end() {
        let review = parse_architecture_review("Issues:\n- tight coupling\n- no tests\n");
        assert_eq!(review.issues, vec!["tight coupling", "no tests"]);
        assert!(review.recommendations.is_empty());
    }

    #[test]
    fn empty_issue_section() {
        let review = parse_architecture_review("Issues:\nRecommendations:\n- split modules");
        assert!(review.issues.is_empty());
        assert_eq!(review.recommendations, vec!["split modules"]);
    }

    #[test]
    fn blank_entries_are_discarded() {
        let review = parse_architecture_review("Recommendations:\n- \n- keep\n-   \n");
        assert_eq!(review.recommendations, vec!["keep"]);
    }

    #[test]
    fn diagram_from_components_and_relations() {
        let text = "Component: Api\nComponent: Store\nApi -> Store\nWorker depends on Store\n";
        let diagram = build_diagram(text).expect("diagram");
        assert_eq!(
            diagram,
            "graph TD\n    Api\n    Store\n    Api --> Store\n    Worker --> Store\n"
        );
    }

    #[test]
    fn diagram_deduplicates() {
        let text = "Component: Api\nComponent: Api\nApi -> Db\nApi -> Db";
        let diagram = build_diagram(text).expect("diagram");
        assert_eq!(diagram.matches("Api --> Db").count(), 1);
        assert_eq!(diagram.lines().filter(|l| l.trim() == "Api").count(), 1);
    }

    #[test]
    fn no_diagram_without_structure() {
        assert!(build_diagram("Score: 5/10").is_none());
    }
}
