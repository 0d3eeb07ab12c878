use crate::parsers::html::ContentNode;
use regex::Regex;
use scraper::{ElementRef, Node, Selector};
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));
static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid blank-run pattern"));

/// Elements that never contribute text
const SKIPPED: [&str; 8] = [
    "script", "style", "noscript", "template", "svg", "button", "head", "iframe",
];

/// Elements rendered as separate blocks
const BLOCKS: [&str; 12] = [
    "div", "section", "article", "main", "header", "footer", "aside", "nav", "figure",
    "figcaption", "details", "summary",
];

/// Converts selected content to Markdown
#[derive(Debug)]
pub struct MarkdownConverter {
    /// Subtrees removed before conversion
    strip: Selector,
}

impl MarkdownConverter {
    pub fn new(strip: Selector) -> Self {
        Self { strip }
    }

    /// Convert a content node to ATX-style Markdown
    ///
    /// The navigation list is skipped so its entries never reach the output.
    /// Links keep their original targets.
    pub fn to_markdown(&self, node: Option<ContentNode<'_>>) -> String {
        match node {
            Some(node) => tidy(&self.element(node.element())),
            None => String::new(),
        }
    }

    fn element(&self, el: ElementRef<'_>) -> String {
        let name = el.value().name();
        if SKIPPED.contains(&name) {
            return String::new();
        }
        if self.strip.matches(&el) {
            ::log::info!("Removed navigation menu before conversion");
            return String::new();
        }

        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name[1..].parse::<usize>().unwrap_or(1);
                let text = single_line(&self.children(el));
                if text.is_empty() {
                    return String::new();
                }
                format!("\n\n{} {}\n\n", "#".repeat(level), text)
            }
            "p" => block(self.children(el).trim()),
            "br" => "\n".to_string(),
            "hr" => "\n\n---\n\n".to_string(),
            "ul" => self.list(el, false),
            "ol" => self.list(el, true),
            "pre" => code_block(el),
            "code" => inline_code(&el.text().collect::<String>()),
            "strong" | "b" => wrap_inline(&self.children(el), "**"),
            "em" | "i" => wrap_inline(&self.children(el), "*"),
            "del" | "s" => wrap_inline(&self.children(el), "~~"),
            "a" => {
                let text = single_line(&self.children(el));
                match el.value().attr("href") {
                    Some(href) => format!("[{}]({})", text, href),
                    None => text,
                }
            }
            "img" => {
                let alt = el.value().attr("alt").unwrap_or("");
                match el.value().attr("src") {
                    Some(src) => format!("![{}]({})", alt, src),
                    None => String::new(),
                }
            }
            "blockquote" => {
                let inner = tidy(&self.children(el));
                let quoted = inner
                    .lines()
                    .map(|l| if l.is_empty() { ">".to_string() } else { format!("> {l}") })
                    .collect::<Vec<_>>()
                    .join("\n");
                block(&quoted)
            }
            "table" => self.table(el),
            _ if BLOCKS.contains(&name) => block(&self.children(el)),
            _ => self.children(el),
        }
    }

    fn children(&self, el: ElementRef<'_>) -> String {
        let mut out = String::new();
        for child in el.children() {
            match child.value() {
                Node::Text(text) => {
                    let collapsed = WHITESPACE.replace_all(text, " ");
                    if out.is_empty() || out.ends_with('\n') {
                        out.push_str(collapsed.trim_start());
                    } else {
                        out.push_str(&collapsed);
                    }
                }
                Node::Element(_) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        out.push_str(&self.element(child_el));
                    }
                }
                _ => {}
            }
        }
        out
    }

    fn list(&self, el: ElementRef<'_>, ordered: bool) -> String {
        let mut out = String::new();
        let mut index = 1;
        for item in el.children().filter_map(ElementRef::wrap) {
            if item.value().name() != "li" || self.strip.matches(&item) {
                continue;
            }
            let content = tidy(&self.children(item));
            let mut lines = content.lines().filter(|l| !l.trim().is_empty());
            let Some(first) = lines.next() else {
                continue;
            };
            let marker = if ordered {
                format!("{index}. ")
            } else {
                "- ".to_string()
            };
            index += 1;

            out.push_str(&marker);
            out.push_str(first);
            out.push('\n');
            let indent = " ".repeat(marker.len());
            for line in lines {
                out.push_str(&indent);
                out.push_str(line);
                out.push('\n');
            }
        }
        block(&out)
    }

    fn table(&self, el: ElementRef<'_>) -> String {
        let mut rows: Vec<Vec<String>> = Vec::new();
        for row in el.descendants().filter_map(ElementRef::wrap) {
            if row.value().name() != "tr" {
                continue;
            }
            let cells = row
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|c| matches!(c.value().name(), "th" | "td"))
                .map(|c| single_line(&self.children(c)).replace('|', "\\|"))
                .collect::<Vec<_>>();
            if !cells.is_empty() {
                rows.push(cells);
            }
        }

        let Some(columns) = rows.iter().map(Vec::len).max() else {
            return String::new();
        };
        let render = |cells: &[String]| {
            let mut padded = cells.to_vec();
            padded.resize(columns, String::new());
            format!("| {} |\n", padded.join(" | "))
        };

        let mut out = render(rows[0].as_slice());
        out.push_str(&format!("|{}\n", " --- |".repeat(columns)));
        for row in &rows[1..] {
            out.push_str(&render(row.as_slice()));
        }
        block(&out)
    }
}

fn block(content: &str) -> String {
    let content = content.trim_matches('\n');
    if content.trim().is_empty() {
        return String::new();
    }
    format!("\n\n{}\n\n", content)
}

fn single_line(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

fn wrap_inline(content: &str, marker: &str) -> String {
    let content = content.trim();
    if content.is_empty() {
        return String::new();
    }
    format!("{marker}{content}{marker}")
}

/// Code span delimited by one more backtick than the longest run inside
fn inline_code(code: &str) -> String {
    if code.is_empty() {
        return String::new();
    }
    let longest_run = code
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest_run + 1);
    if code.starts_with('`') || code.ends_with('`') {
        format!("{fence} {code} {fence}")
    } else {
        format!("{fence}{code}{fence}")
    }
}

fn code_block(el: ElementRef<'_>) -> String {
    let language = el
        .children()
        .filter_map(ElementRef::wrap)
        .find(|c| c.value().name() == "code")
        .and_then(|code| {
            code.value()
                .classes()
                .find_map(|c| c.strip_prefix("language-").map(str::to_string))
        })
        .unwrap_or_default();
    let code = el.text().collect::<String>();
    format!("\n\n```{}\n{}\n```\n\n", language, code.trim_matches('\n'))
}

/// Normalize line endings outside code fences and collapse blank runs
fn tidy(markdown: &str) -> String {
    let mut in_fence = false;
    let mut lines = Vec::new();
    for line in markdown.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            lines.push(line.trim_end());
        } else if in_fence {
            lines.push(line);
        } else {
            lines.push(line.trim_end());
        }
    }
    BLANK_RUNS
        .replace_all(&lines.join("\n"), "\n\n")
        .trim_matches('\n')
        .to_string()
}

/// Drop the first `count` lines when there are more than `count`
pub fn drop_leading_lines(text: &str, count: usize) -> String {
    if count == 0 {
        return text.to_string();
    }
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() > count {
        ::log::info!("Removed the first {} lines", count);
        lines[count..].join("\n")
    } else {
        text.to_string()
    }
}
