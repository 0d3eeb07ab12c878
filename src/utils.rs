use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Convert a title or path segment to a filename
///
/// Strips `\ / * ? : " < > |`, trims, and replaces whitespace runs with `_`.
pub fn sanitize_filename(name: &str) -> String {
    let stripped: String = name
        .chars()
        .filter(|c| !matches!(c, '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|'))
        .collect();
    WHITESPACE_RUN
        .replace_all(stripped.trim(), "_")
        .into_owned()
}

fn path_segments(url: &Url) -> Vec<&str> {
    url.path()
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect()
}

/// Folder name for a library when no explicit name is given
///
/// Second-to-last path segment when the path has at least three segments,
/// else the last one.
pub fn derive_folder(url: &Url) -> Option<String> {
    let segments = path_segments(url);
    let segment = if segments.len() >= 3 {
        segments[segments.len() - 2]
    } else {
        *segments.last()?
    };
    Some(sanitize_filename(segment)).filter(|s| !s.is_empty())
}

/// Folder for a library inside the output directory
///
/// The explicit name when it sanitizes to a usable name, else the folder
/// derived from the URL, else `library`.
pub fn library_folder(name: Option<&str>, url: &Url) -> String {
    name.map(sanitize_filename)
        .filter(|s| is_plain_name(s))
        .or_else(|| derive_folder(url).filter(|s| is_plain_name(s)))
        .unwrap_or_else(|| "library".to_string())
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".."
}

/// File stem for a page: its last path segment, `index` for the root
pub fn file_stem(url: &Url) -> String {
    path_segments(url)
        .last()
        .map(|s| sanitize_filename(s))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "index".to_string())
}

/// Library name used when only a URL is given on the command line
pub fn library_name_from_url(url: &Url) -> String {
    path_segments(url)
        .last()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "library".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_sanitize_filename() {
        let cases = [
            ("Getting Started", "Getting_Started"),
            ("a\\b/c*d?e:f\"g<h>i|j", "abcdefghij"),
            ("  spaced \t out\n name ", "spaced_out_name"),
            ("2.1-bytecode-interpreter", "2.1-bytecode-interpreter"),
            ("", ""),
        ];
        for (input, expected) in cases {
            assert_eq!(sanitize_filename(input), expected, "input: {input:?}");
        }
    }

    #[test]
    fn test_derive_folder() {
        assert_eq!(
            derive_folder(&url("https://example.com/python/cpython/2.1-bytecode")),
            Some("cpython".to_string())
        );
        assert_eq!(
            derive_folder(&url("https://example.com/python/cpython")),
            Some("cpython".to_string())
        );
        assert_eq!(
            derive_folder(&url("https://example.com/cpython/")),
            Some("cpython".to_string())
        );
        assert_eq!(derive_folder(&url("https://example.com/")), None);
    }

    #[test]
    fn test_library_folder_stays_inside_output() {
        let lib = url("https://example.com/org/lib");
        assert_eq!(library_folder(Some("My Lib"), &lib), "My_Lib");
        assert_eq!(library_folder(Some("../x"), &lib), "..x");
        assert_eq!(library_folder(Some(".."), &lib), "lib");
        assert_eq!(library_folder(Some("/"), &lib), "lib");
        assert_eq!(library_folder(None, &lib), "lib");
        assert_eq!(library_folder(None, &url("https://example.com/")), "library");
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem(&url("https://example.com/org/lib/1-overview")), "1-overview");
        assert_eq!(file_stem(&url("https://example.com/org/lib/?q=1")), "lib");
        assert_eq!(file_stem(&url("https://example.com")), "index");
    }

    #[test]
    fn test_library_name_from_url() {
        assert_eq!(library_name_from_url(&url("https://example.com/org/lib")), "lib");
        assert_eq!(library_name_from_url(&url("https://example.com/")), "library");
    }
}
