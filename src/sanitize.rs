//! Payload block removal for user-facing display.

use crate::extract::Extraction;

/// Returns `text` with the matched payload block cut out, for display.
///
/// Removal is span-based, so fenced, HTML, and bare-object matches are all
/// handled the same way: the full block (fences and tags included) is
/// spliced out and the result trimmed. When nothing was extracted the input
/// comes back byte-identical, untrimmed. Display text is not required to
/// round-trip back to the original.
#[must_use]
pub fn sanitize_text(text: &str, extraction: Option<&Extraction>) -> String {
    let Some(extraction) = extraction else {
        return text.to_owned();
    };
    let span = &extraction.span;
    if span.start > span.end
        || span.end > text.len()
        || !text.is_char_boundary(span.start)
        || !text.is_char_boundary(span.end)
    {
        // Span did not come from this text; leave it alone.
        return text.to_owned();
    }
    let mut display = String::with_capacity(text.len() - span.len());
    display.push_str(&text[..span.start]);
    display.push_str(&text[span.end..]);
    display.trim().to_owned()
}
