//! Candidate payload extraction from raw assistant text.
//!
//! Locates the JSON block a model embedded in its reply. Strategies are
//! tried in a fixed order and the first match wins:
//!
//! 1. triple-backtick fenced code block (a ```` ```json ```` fence is
//!    preferred over a plain one)
//! 2. `<pre>`/`<code>` HTML block, with `&quot;`/`&amp;` decoded
//! 3. first balanced `{...}` object in the plain text
//!
//! This stage only selects text. No JSON parsing happens here; a candidate
//! that looks brace-shaped but is garbage gets rejected by the validator.

use std::ops::Range;

use tracing::debug;

/// Which strategy located the candidate block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Triple-backtick fenced code block.
    FencedBlock,
    /// `<pre>` or `<code>` HTML block.
    HtmlBlock,
    /// Bare balanced `{...}` object in plain text.
    BareObject,
}

/// A candidate payload located inside raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// The candidate JSON text: inner block content, trimmed, with HTML
    /// entities decoded when the source was an HTML block.
    pub candidate: String,
    /// Byte span of the full matched block (fences and tags included) in
    /// the original text. Always on character boundaries of that text.
    pub span: Range<usize>,
    /// The strategy that matched.
    pub strategy: ExtractionStrategy,
}

/// Locates the first candidate JSON block in `text`.
///
/// Returns `None` when no plausible block exists; prose-only turns are the
/// common case and not an error.
#[must_use]
pub fn extract_candidate(text: &str) -> Option<Extraction> {
    let extraction = fenced_block(text)
        .or_else(|| html_block(text))
        .or_else(|| bare_object(text))?;
    debug!(
        strategy = ?extraction.strategy,
        span_start = extraction.span.start,
        span_len = extraction.span.len(),
        "payload candidate located"
    );
    Some(extraction)
}

fn fenced_block(text: &str) -> Option<Extraction> {
    fenced_with_opener(text, "```json").or_else(|| fenced_with_opener(text, "```"))
}

fn fenced_with_opener(text: &str, opener: &str) -> Option<Extraction> {
    let start = text.find(opener)?;
    let inner_start = start + opener.len();
    let close_rel = text[inner_start..].find("```")?;
    let candidate = text[inner_start..inner_start + close_rel].trim().to_owned();
    if candidate.is_empty() {
        return None;
    }
    Some(Extraction {
        candidate,
        span: start..inner_start + close_rel + 3,
        strategy: ExtractionStrategy::FencedBlock,
    })
}

fn html_block(text: &str) -> Option<Extraction> {
    tagged_block(text, "<pre", "</pre>").or_else(|| tagged_block(text, "<code", "</code>"))
}

fn tagged_block(text: &str, open_prefix: &str, close_tag: &str) -> Option<Extraction> {
    let open_at = text.find(open_prefix)?;
    let tag_end_rel = text[open_at..].find('>')?;
    let inner_start = open_at + tag_end_rel + 1;
    let close_rel = text[inner_start..].find(close_tag)?;
    let inner = strip_code_wrapper(&text[inner_start..inner_start + close_rel]);
    let candidate = decode_entities(inner).trim().to_owned();
    if candidate.is_empty() {
        return None;
    }
    Some(Extraction {
        candidate,
        span: open_at..inner_start + close_rel + close_tag.len(),
        strategy: ExtractionStrategy::HtmlBlock,
    })
}

// <pre><code>…</code></pre> is the common rendering; unwrap the inner tag.
fn strip_code_wrapper(inner: &str) -> &str {
    let trimmed = inner.trim();
    if let Some(rest) = trimmed.strip_prefix("<code")
        && let Some(gt) = rest.find('>')
        && let Some(body) = rest[gt + 1..].strip_suffix("</code>")
    {
        return body;
    }
    trimmed
}

/// Minimal entity decoding: only the two entities that break JSON when a
/// payload is pasted into an HTML block. Anything fancier belongs to a real
/// HTML parser, which this deliberately is not.
fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"").replace("&amp;", "&")
}

/// Scans from the first `{` to its balancing `}`, skipping braces inside
/// JSON string literals (including escaped quotes). Trailing prose after the
/// object is never captured, and an unbalanced object yields no candidate.
fn bare_object(text: &str) -> Option<Extraction> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    // Brace/quote/backslash are ASCII, so byte-wise scanning keeps every
    // index on a character boundary.
    for (offset, byte) in text.as_bytes()[start..].iter().copied().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + 1;
                    return Some(Extraction {
                        candidate: text[start..end].to_owned(),
                        span: start..end,
                        strategy: ExtractionStrategy::BareObject,
                    });
                }
            }
            _ => {}
        }
    }
    None
}
