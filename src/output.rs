use crate::config::{OutputFormat, ScraperConfig};
use crate::error::{Result, ScrapeError};
use crate::parsers::PayloadKind;
use crate::parsers::links::markdown_files;
use crate::parsers::yaml::markdown_to_yaml;
use crate::results::{MarkdownDocument, Page};
use crate::utils::sanitize_filename;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// What happened to a document handed to the writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Markdown files written, in order
    Written(Vec<PathBuf>),
    /// Same body as the previous save; nothing written
    Duplicate,
}

/// Writes the files of one library folder
///
/// Layout: `<folder>/md/<stem>.md`, `<folder>/html/<stem>.html` and
/// `<folder>/yaml/<stem>.yaml`. Only the immediately previous body is
/// remembered for duplicate detection.
#[derive(Debug)]
pub struct OutputWriter {
    folder: PathBuf,
    keep_html: bool,
    split_by_heading: bool,
    last_hash: Option<Vec<u8>>,
    stems: HashSet<String>,
}

impl OutputWriter {
    pub fn new(folder: impl Into<PathBuf>, config: &ScraperConfig) -> Self {
        Self {
            folder: folder.into(),
            keep_html: config.wants(OutputFormat::Html),
            split_by_heading: config.split_by_heading,
            last_hash: None,
            stems: HashSet::new(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn md_dir(&self) -> PathBuf {
        self.folder.join("md")
    }

    pub fn html_dir(&self) -> PathBuf {
        self.folder.join("html")
    }

    pub fn yaml_dir(&self) -> PathBuf {
        self.folder.join("yaml")
    }

    /// File stem for a page titled `title`
    ///
    /// The sanitized title is used unless it is empty or already written in
    /// this folder; then `fallback`, then numbered variants of it.
    pub fn stem_for(&self, title: &str, fallback: &str) -> String {
        let title = sanitize_filename(title);
        if !title.is_empty() && !self.stems.contains(&title) {
            return title;
        }
        if !self.stems.contains(fallback) {
            return fallback.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{fallback}_{n}");
            if !self.stems.contains(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Persist one page
    pub fn save(&mut self, doc: &MarkdownDocument, stem: &str, page: &Page) -> Result<SaveOutcome> {
        let hash = Sha256::digest(doc.body.as_bytes()).to_vec();
        if self.last_hash.as_ref() == Some(&hash) {
            ::log::info!("Skipping {}: same content as the previous page", doc.source_url);
            return Ok(SaveOutcome::Duplicate);
        }

        let md_dir = self.md_dir();
        create_dir(&md_dir)?;

        let sections = if self.split_by_heading {
            split_sections(&doc.body)
        } else {
            Vec::new()
        };

        let mut written = Vec::new();
        if sections.len() >= 2 {
            for (index, (heading, body)) in sections.iter().enumerate() {
                let name = format!("{}_{:02}_{}.md", stem, index + 1, sanitize_filename(heading));
                written.push(write_file(&md_dir.join(name), body)?);
            }
            ::log::info!("Split '{}' into {} files", doc.title, written.len());
        } else {
            written.push(write_file(&md_dir.join(format!("{stem}.md")), &doc.body)?);
        }

        if self.keep_html {
            if PayloadKind::detect(&page.body) == PayloadKind::Html {
                let html_dir = self.html_dir();
                create_dir(&html_dir)?;
                write_file(&html_dir.join(format!("{stem}.html")), &page.body)?;
            } else {
                ::log::debug!("No HTML to keep for {}", page.url);
            }
        }

        self.last_hash = Some(hash);
        self.stems.insert(stem.to_string());
        Ok(SaveOutcome::Written(written))
    }

    /// Convert every Markdown file of the folder into a YAML document
    pub fn write_yaml(&self) -> Result<usize> {
        let md_dir = self.md_dir();
        if !md_dir.is_dir() {
            return Ok(0);
        }

        let yaml_dir = self.yaml_dir();
        create_dir(&yaml_dir)?;

        let mut count = 0;
        for file in markdown_files(&md_dir)? {
            let Some(stem) = file.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let markdown = fs::read_to_string(&file).map_err(|e| ScrapeError::io(&file, e))?;
            let yaml = markdown_to_yaml(&markdown)?;
            write_file(&yaml_dir.join(format!("{stem}.yaml")), &yaml)?;
            count += 1;
        }
        ::log::info!("Wrote {} YAML files to {}", count, yaml_dir.display());
        Ok(count)
    }
}

fn create_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| ScrapeError::io(dir, e))
}

fn write_file(path: &Path, contents: &str) -> Result<PathBuf> {
    fs::write(path, contents).map_err(|e| ScrapeError::io(path, e))?;
    ::log::info!("Saved {}", path.display());
    Ok(path.to_path_buf())
}

/// Split a body at its top-level `# ` headings outside code fences
///
/// Text before the first heading stays with the first section.
pub fn split_sections(body: &str) -> Vec<(String, String)> {
    let mut sections: Vec<(String, Vec<&str>)> = Vec::new();
    let mut preamble = Vec::new();
    let mut in_fence = false;

    for line in body.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        let heading = (!in_fence)
            .then(|| line.strip_prefix("# "))
            .flatten()
            .map(str::trim)
            .filter(|h| !h.is_empty());

        if let Some(heading) = heading {
            let mut lines = std::mem::take(&mut preamble);
            lines.push(line);
            sections.push((heading.to_string(), lines));
            continue;
        }
        match sections.last_mut() {
            Some((_, lines)) => lines.push(line),
            None => preamble.push(line),
        }
    }

    sections
        .into_iter()
        .map(|(heading, lines)| (heading, lines.join("\n").trim().to_string()))
        .collect()
}
