use crate::error::{Result, ScrapeError};
use regex::{Captures, Regex};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Inline Markdown link: `[text](target)`
static INLINE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)]*)\)").expect("valid link pattern"));

/// Whether a link target points off-site
pub fn is_external(target: &str) -> bool {
    let target = target.trim();
    target.starts_with("http://") || target.starts_with("https://")
}

/// Replace external link targets with an empty target
///
/// Internal links (relative or already empty) are left byte-for-byte intact,
/// which makes the rewrite idempotent. Returns the rewritten text and the
/// number of links whose target changed.
pub fn normalize_links(markdown: &str) -> (String, usize) {
    let mut changed = 0;
    let rewritten = INLINE_LINK.replace_all(markdown, |caps: &Captures<'_>| {
        if is_external(&caps[2]) {
            changed += 1;
            format!("[{}]()", &caps[1])
        } else {
            caps[0].to_string()
        }
    });
    (rewritten.into_owned(), changed)
}

/// Rewrite the links of one Markdown file in place
pub fn normalize_file(path: &Path) -> Result<usize> {
    let link_fix_failed = |source| ScrapeError::LinkFixFailed {
        path: path.to_path_buf(),
        source,
    };

    let content = fs::read_to_string(path).map_err(link_fix_failed)?;
    let (rewritten, changed) = normalize_links(&content);
    if changed > 0 {
        fs::write(path, rewritten).map_err(link_fix_failed)?;
    }
    ::log::debug!("Modified {} links in {}", changed, path.display());
    Ok(changed)
}

/// All `*.md` files below `dir`, sorted
pub fn markdown_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let entries = fs::read_dir(&current).map_err(|e| ScrapeError::io(&current, e))?;
        for entry in entries {
            let path = entry.map_err(|e| ScrapeError::io(&current, e))?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "md") {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Rewrite the links of every Markdown file below `dir`
///
/// A file that cannot be rewritten is logged and skipped; the remaining
/// files are still processed. Returns the total number of changed links.
pub fn normalize_directory(dir: &Path) -> Result<usize> {
    if !dir.is_dir() {
        ::log::error!("Directory not found: {}", dir.display());
        return Ok(0);
    }

    let files = markdown_files(dir)?;
    ::log::info!("Found {} markdown files to process", files.len());

    let mut total = 0;
    for file in &files {
        match normalize_file(file) {
            Ok(changed) => total += changed,
            Err(e) => ::log::error!("{}", e),
        }
    }

    ::log::info!(
        "Modified a total of {} links in {} files",
        total,
        files.len()
    );
    Ok(total)
}
