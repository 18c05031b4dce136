//! Text cleaning helpers shared by the extractors.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// Elements whose subtrees never contribute visible text.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "header", "footer", "nav", "aside", "form", "button", "iframe", "noscript",
    "svg", "path",
];

static COPY_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bcopy\b").expect("valid regex"));
static LINE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+$").expect("valid regex"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]").expect("valid regex"));

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clean a metadata value: collapse whitespace, drop the `⋅ Storybook` suffix and `API / ` prefix.
pub fn clean_text(text: &str) -> String {
    let collapsed = collapse_whitespace(text);
    let without_suffix = collapsed
        .strip_suffix("⋅ Storybook")
        .unwrap_or(&collapsed)
        .trim_end();
    without_suffix
        .strip_prefix("API / ")
        .unwrap_or(without_suffix)
        .trim()
        .to_string()
}

/// Clean documentation prose: collapse whitespace, drop "Copy" button labels and bare line numbers.
pub fn clean_content_text(text: &str) -> String {
    let collapsed = collapse_whitespace(text);
    let without_copy = COPY_WORD.replace_all(&collapsed, "");
    let cleaned = collapse_whitespace(&without_copy);
    if LINE_NUMBER.is_match(&cleaned) {
        return String::new();
    }
    cleaned
}

/// Remove anything that looks like a markup tag and collapse whitespace.
pub fn strip_markup(text: &str) -> String {
    collapse_whitespace(&TAG.replace_all(text, " "))
}

/// First sentence of `text`, cut at `max_chars` on a word boundary with an ellipsis.
pub fn first_sentence_title(text: &str, max_chars: usize) -> String {
    let first = SENTENCE_END.split(text).next().unwrap_or("").trim();
    if first.chars().count() <= max_chars {
        return first.to_string();
    }
    let cut: String = first.chars().take(max_chars).collect();
    let head = match cut.rfind(' ') {
        Some(pos) => &cut[..pos],
        None => cut.as_str(),
    };
    format!("{head}...")
}

/// Whitespace-normalized text of an element, skipping non-content subtrees.
pub fn element_visible_text(el: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    collect_visible(el, &mut parts);
    collapse_whitespace(&parts.join(" "))
}

/// Individual visible text nodes under `el`, each whitespace-normalized.
pub fn visible_text_nodes(el: ElementRef<'_>) -> Vec<String> {
    let mut parts = Vec::new();
    collect_visible(el, &mut parts);
    parts
        .into_iter()
        .map(|p| collapse_whitespace(&p))
        .filter(|p| !p.is_empty())
        .collect()
}

fn collect_visible(el: ElementRef<'_>, out: &mut Vec<String>) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            let text: &str = text;
            if !text.trim().is_empty() {
                out.push(text.to_string());
            }
        } else if let Some(child_el) = ElementRef::wrap(child) {
            if !SKIPPED_TAGS.contains(&child_el.value().name()) {
                collect_visible(child_el, out);
            }
        }
    }
}

/// Visible text of a document.
///
/// When `main_selectors` are given and yield text, only those regions are used;
/// otherwise the body (or the whole document) is read.
pub fn visible_text(doc: &Html, main_selectors: &[String]) -> String {
    let selected: Vec<String> = main_selectors
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .flat_map(|sel| {
            doc.select(&sel)
                .map(element_visible_text)
                .collect::<Vec<_>>()
        })
        .filter(|t| !t.is_empty())
        .collect();
    if !selected.is_empty() {
        return selected.join(" ");
    }

    static BODY: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("body").expect("valid selector"));
    let target = doc.select(&BODY).next().unwrap_or_else(|| doc.root_element());
    element_visible_text(target)
}

/// Leading `max_chars` characters of `text`.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_strips_storybook_artifacts() {
        assert_eq!(clean_text("  Button   ⋅ Storybook "), "Button");
        assert_eq!(clean_text("API / Tooltip"), "Tooltip");
        assert_eq!(clean_text("Plain\n\ttitle"), "Plain title");
    }

    #[test]
    fn content_cleaning_drops_copy_and_line_numbers() {
        assert_eq!(clean_content_text("Use primary buttons  Copy"), "Use primary buttons");
        assert_eq!(clean_content_text(" 12 "), "");
        assert_eq!(clean_content_text("Copyright stays"), "Copyright stays");
    }

    #[test]
    fn titles_are_first_sentence_truncated_on_words() {
        assert_eq!(
            first_sentence_title("Use one primary action. Secondary actions go elsewhere.", 60),
            "Use one primary action"
        );
        let long = "Always provide a visible label for every input field even when a placeholder exists";
        let title = first_sentence_title(long, 60);
        assert!(title.ends_with("..."));
        assert!(title.chars().count() <= 63);
        assert!(!title.contains("placeholder"));
    }

    #[test]
    fn visible_text_skips_chrome() {
        let doc = Html::parse_document(
            r#"<html><body>
                <nav>Menu</nav>
                <main><h1>Button</h1><script>var x = 1;</script><p>Triggers an action.</p>
                <button>Click me</button></main>
                <footer>Copyright</footer>
            </body></html>"#,
        );
        assert_eq!(visible_text(&doc, &[]), "Button Triggers an action.");
        assert_eq!(visible_text(&doc, &["h1".to_string()]), "Button");
        assert_eq!(
            visible_text(&doc, &[".missing".to_string()]),
            "Button Triggers an action."
        );
    }

    #[test]
    fn markup_is_stripped() {
        assert_eq!(strip_markup("<b>Size</b> of the <i>button</i>"), "Size of the button");
    }
}
