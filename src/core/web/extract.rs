use scraper::{ElementRef, Html};

const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Visible text of an HTML document.
///
/// Text inside `script`, `style`, `noscript` and `template` is dropped, runs
/// of whitespace collapse to one space, and the result is cut to at most
/// `max_chars` characters.
pub fn extract_text(html: &str, max_chars: usize) -> String {
    let document = Html::parse_document(html);
    let mut raw = String::with_capacity(html.len() / 2);
    collect_text(document.root_element(), &mut raw);

    let mut text = String::with_capacity(raw.len());
    for word in raw.split_whitespace() {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(word);
    }

    truncate_chars(text, max_chars)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            if SKIPPED_ELEMENTS.contains(&child_element.value().name()) {
                continue;
            }
            collect_text(child_element, out);
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        }
    }
}

pub(crate) fn truncate_chars(mut text: String, max_chars: usize) -> String {
    if let Some((byte_index, _)) = text.char_indices().nth(max_chars) {
        text.truncate(byte_index);
    }
    text
}
