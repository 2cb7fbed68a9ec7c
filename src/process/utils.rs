use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("tag regex"));
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Remove `<...>` markup.
pub fn strip_tags(raw: &str) -> String {
    TAG_RE.replace_all(raw, "").into_owned()
}

/// Collapse whitespace runs to one space and trim both ends.
pub fn collapse_whitespace(raw: &str) -> String {
    WS_RE.replace_all(raw, " ").trim().to_string()
}

/// Tag stripping followed by whitespace collapsing. Idempotent.
pub fn clean_name(raw: &str) -> String {
    collapse_whitespace(&strip_tags(raw))
}

/// Cell text the way it is lifted out of HTML: control whitespace and
/// non-breaking spaces become plain spaces, then the ends are trimmed.
pub fn clean_cell_text(raw: &str) -> String {
    raw.replace(['\r', '\n', '\t', '\u{a0}'], " ")
        .trim()
        .to_string()
}
