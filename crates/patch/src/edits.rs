//! SEARCH/REPLACE block edits, the fallback for models that do not speak
//! the patch format.
//!
//! ~~~text
//! ```diff
//! src/lib.rs
//! <<<<<<< SEARCH
//! old text
//! =======
//! new text
//! >>>>>>> REPLACE
//! ```
//! ~~~

use regex_lite::Regex;

// The header line before the SEARCH marker is optional in both forms
const FENCED_BLOCK: &str =
    r"(?s)```diff\n(?:(.*?)\n)??<<<<<<< SEARCH\n(.*?)=======\n(.*?)>>>>>>> REPLACE\n```";
const BARE_BLOCK: &str =
    r"(?s)(?:^|(.*?)\n)<<<<<<< SEARCH\n(.*?)=======\n(.*?)>>>>>>> REPLACE";

/// One SEARCH/REPLACE block with surrounding whitespace trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditBlock {
    /// Whatever preceded the SEARCH marker, usually a file name
    pub header: String,
    pub search: String,
    pub replace: String,
}

/// Extract edit blocks, preferring ```diff fenced ones and falling back to
/// bare blocks when no fenced block is present.
pub fn parse_edit_blocks(diff_text: &str) -> Vec<EditBlock> {
    let fenced = collect_blocks(FENCED_BLOCK, diff_text);
    if !fenced.is_empty() {
        return fenced;
    }
    collect_blocks(BARE_BLOCK, diff_text)
}

fn collect_blocks(pattern: &str, text: &str) -> Vec<EditBlock> {
    let Ok(re) = Regex::new(pattern) else {
        return Vec::new();
    };
    re.captures_iter(text)
        .map(|caps| {
            let group = |i| caps.get(i).map_or("", |m| m.as_str());
            EditBlock {
                header: group(1).trim().to_string(),
                search: group(2).trim().to_string(),
                replace: group(3).trim().to_string(),
            }
        })
        .collect()
}

/// Apply every block in `diff_text` to `original`.
///
/// A non-empty search text replaces *every* occurrence, literally. An empty
/// search text appends the replacement on a new line. Blocks whose search
/// text is absent are skipped. Text without any block is returned unchanged.
pub fn apply_edits(original: &str, diff_text: &str) -> String {
    let mut result = original.to_string();
    for block in parse_edit_blocks(diff_text) {
        if block.search.is_empty() {
            result.push('\n');
            result.push_str(&block.replace);
        } else if result.contains(&block.search) {
            result = result.replace(&block.search, &block.replace);
        } else {
            tracing::debug!(search = %block.search, "search text not found, block skipped");
        }
    }
    result
}
