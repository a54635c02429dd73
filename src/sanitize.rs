//! Markup stripping and entity decoding for extracted feed fields.
//!
//! Feed fields are frequently HTML fragments, sometimes escaped once or twice
//! over. [`sanitize`] reduces them to a single line of plain text.
//!
//! Runs of escaped ampersands (`&amp;amp;amp;...`) are folded in one step so
//! deep escaping costs one pass, not one pass per level. Whatever still changes
//! after [`MAX_PASSES`] passes is flattened: leftover markup and entity
//! characters are dropped rather than decoded further.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use tracing::debug;

/// Upper bound on reduction passes over a single fragment.
pub const MAX_PASSES: usize = 8;

static CDATA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").unwrap());
static SCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script\s*>").unwrap());
static STYLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style\s*>").unwrap());
static COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static AMP_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)&(?:amp;|#0*38;|#x0*26;)+").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Reduce a markup fragment to normalized plain text.
///
/// Script and style blocks are dropped with their contents, remaining tags are
/// stripped, entities are decoded, and whitespace runs collapse to one space.
/// The passes repeat until the text stops changing, so entity-escaped markup
/// such as `&lt;b&gt;bold&lt;/b&gt;` ends up as `bold` and
/// `sanitize(sanitize(x)) == sanitize(x)` for every input.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(sanitize("<p>Hello &amp; <b>World</b></p>"), "Hello & World");
/// assert_eq!(sanitize(""), "");
/// ```
pub fn sanitize(fragment: &str) -> String {
    reduce(fragment, MAX_PASSES)
}

fn reduce(fragment: &str, max_passes: usize) -> String {
    let mut current = fragment.to_string();
    for _ in 0..max_passes {
        let next = single_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
    let next = single_pass(&current);
    if next == current {
        return current;
    }
    debug!(max_passes, bytes = next.len(), "Fragment still changing; flattening");
    flatten(&next)
}

/// Final fallback: no tags, no `<`, `>` or `&` left, so another pass is a no-op.
fn flatten(text: &str) -> String {
    let text = TAG_RE.replace_all(text, "");
    let text: String = text.chars().filter(|c| !matches!(c, '<' | '>' | '&')).collect();
    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}

fn single_pass(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let text = CDATA_RE.replace_all(text, "$1");
    let text = SCRIPT_RE.replace_all(&text, "");
    let text = STYLE_RE.replace_all(&text, "");
    let text = COMMENT_RE.replace_all(&text, "");
    let text = TAG_RE.replace_all(&text, "");
    let text = AMP_RUN_RE.replace_all(&text, "&");
    let text: Cow<'_, str> = html_escape::decode_html_entities(&text);
    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}
