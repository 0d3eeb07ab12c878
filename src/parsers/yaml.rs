use crate::error::Result;
use chrono::Local;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.*?)\]\((.*?)\)").expect("valid link pattern"));
static HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#+\s+(.*?)$").expect("valid header pattern"));
static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("valid paragraph pattern"));
static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(?:[-*]|\d+\.)\s").expect("valid list pattern"));
static TABLE_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\|.*\|$").expect("valid table pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YamlLink {
    pub text: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YamlMetadata {
    pub headers: Vec<String>,
    pub paragraphs_count: usize,
    pub lists_count: usize,
    pub tables_count: usize,
}

/// Structured view of a Markdown document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YamlDocument {
    pub timestamp: String,
    pub title: String,
    /// Full Markdown, formatting preserved
    pub content: String,
    pub links: Vec<YamlLink>,
    pub images: Vec<String>,
    pub metadata: YamlMetadata,
}

impl YamlDocument {
    pub fn from_markdown(markdown: &str) -> Self {
        let links = LINK
            .captures_iter(markdown)
            .map(|c| YamlLink {
                text: c[1].to_string(),
                url: c[2].to_string(),
            })
            .collect();
        let headers: Vec<String> = HEADER
            .captures_iter(markdown)
            .map(|c| c[1].trim_end().to_string())
            .collect();
        let paragraphs_count = PARAGRAPH_BREAK
            .split(markdown)
            .filter(|p| !p.trim().is_empty())
            .count();

        Self {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            title: headers
                .first()
                .cloned()
                .unwrap_or_else(|| "No Title".to_string()),
            content: markdown.to_string(),
            links,
            images: Vec::new(),
            metadata: YamlMetadata {
                headers,
                paragraphs_count,
                lists_count: LIST_ITEM.find_iter(markdown).count(),
                tables_count: TABLE_ROW.find_iter(markdown).count(),
            },
        }
    }
}

/// Render Markdown as a YAML document
pub fn markdown_to_yaml(markdown: &str) -> Result<String> {
    Ok(serde_yaml::to_string(&YamlDocument::from_markdown(markdown))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# Guide\n\nIntro with [docs](https://x.com) and [local](a.md).\n\n## Steps\n\n- one\n- two\n1. first\n\n| a | b |\n|---|---|\n| 1 | 2 |\n";

    #[test]
    fn test_structure() {
        let doc = YamlDocument::from_markdown(SAMPLE);
        assert_eq!(doc.title, "Guide");
        assert_eq!(doc.metadata.headers, vec!["Guide", "Steps"]);
        assert_eq!(
            doc.links,
            vec![
                YamlLink { text: "docs".into(), url: "https://x.com".into() },
                YamlLink { text: "local".into(), url: "a.md".into() },
            ]
        );
        assert_eq!(doc.metadata.lists_count, 3);
        assert_eq!(doc.metadata.tables_count, 3);
        assert_eq!(doc.metadata.paragraphs_count, 5);
        assert!(doc.images.is_empty());
        assert_eq!(doc.content, SAMPLE);
    }

    #[test]
    fn test_untitled() {
        assert_eq!(YamlDocument::from_markdown("just text").title, "No Title");
    }

    #[test]
    fn test_yaml_round_trip_keeps_content() {
        let yaml = markdown_to_yaml(SAMPLE).unwrap();
        let parsed: YamlDocument = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.content, SAMPLE);
        assert!(yaml.starts_with("timestamp:"));
    }
}
