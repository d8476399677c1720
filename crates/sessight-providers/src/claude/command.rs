use regex::Regex;
use std::sync::LazyLock;

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#[ \t]+(\S.*?)[ \t]*$").expect("valid heading regex"));

/// Headings that label a section of an expanded prompt rather than a command
const GENERIC_HEADINGS: &[&str] = &[
    "context",
    "notes",
    "note",
    "example",
    "examples",
    "overview",
    "summary",
    "background",
    "instructions",
    "usage",
];

/// Name of the slash command an expanded prompt came from.
///
/// Only the first top-level markdown heading is considered. It is lowercased
/// with whitespace runs collapsed to `-`.
pub fn command_name(text: &str) -> Option<String> {
    let heading = HEADING.captures(text)?.get(1)?.as_str();
    let name = heading
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase();

    if name.is_empty() || GENERIC_HEADINGS.contains(&name.as_str()) {
        return None;
    }
    Some(name)
}
