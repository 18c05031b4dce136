//! Usage guidelines, code examples, and preview content.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use docgraph_shared::{CodeExample, GuidelineKind, Priority, UsageGuideline};

use crate::text::{
    clean_content_text, collapse_whitespace, element_visible_text, first_sentence_title,
    visible_text_nodes,
};

const CODE_BLOCK_SELECTORS: &[&str] = &[
    "pre code",
    ".sb-code",
    ".docs-code",
    "[data-testid='code-block']",
    ".language-typescript",
    ".language-javascript",
    ".language-tsx",
    ".language-jsx",
];

const GUIDELINE_SECTION_SELECTORS: &[&str] = &[
    ".docs-guidelines",
    ".sb-guidelines",
    "[data-section='guidelines']",
];

const GUIDELINE_CARD_SELECTORS: &[&str] = &[
    ".guideline-card",
    ".docs-card",
    ".sb-card",
    "[data-type='guideline']",
];

const KNOWN_LANGUAGE_CLASSES: &[&str] = &["typescript", "javascript", "tsx", "jsx", "html", "css"];

const TITLE_MAX_CHARS: usize = 60;
const CONTEXT_SIBLINGS: usize = 5;
const DESCRIPTION_MAX_CHARS: usize = 200;

static NEGATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:don'?t|don’t|avoid|never|shouldn'?t|shouldn’t|must not)\b|[✗❌👎]")
        .expect("valid regex")
});
static AFFIRMATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:do|should|always|must|recommended)\b|[✓✅👍]").expect("valid regex")
});
static BEST_PRACTICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:best practices?|tips?|notes?)\b").expect("valid regex")
});
static DO_DONT_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:do|don'?t|don’t|avoid|never|always|should|shouldn'?t|must|must not)\b|[✓✗❌✅👍👎]",
    )
    .expect("valid regex")
});

static HEADINGS_H2_H3: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2, h3").expect("valid selector"));
static LIST_ITEMS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("ul li, ol li").expect("valid selector"));
static PARAGRAPHS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("valid selector"));
static CARD_TITLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h3, h4, h5, .card-title, .guideline-title").expect("valid selector")
});
static CARD_DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("p, .card-description, .guideline-description").expect("valid selector")
});
static STORY_ROOT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#storybook-root").expect("valid selector"));
static CANVAS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".sb-show-main, .sb-main-centered, .sb-main-fullscreen")
        .expect("valid selector")
});

/// Classify guideline prose by its wording.
pub fn classify_guideline(text: &str) -> GuidelineKind {
    if NEGATION.is_match(text) {
        GuidelineKind::Dont
    } else if AFFIRMATION.is_match(text) {
        GuidelineKind::Do
    } else if BEST_PRACTICE.is_match(text) {
        GuidelineKind::BestPractice
    } else {
        GuidelineKind::Guideline
    }
}

fn guideline(title: String, description: String, priority: Priority) -> UsageGuideline {
    let kind = classify_guideline(&format!("{title} {description}"));
    UsageGuideline {
        title,
        description,
        kind,
        priority,
    }
}

/// Extract usage guidelines: the guidelines section first, then do/don't statements anywhere.
pub fn extract_usage_guidelines(doc: &Html) -> Vec<UsageGuideline> {
    let mut guidelines = Vec::new();

    if let Some(section_html) = find_guidelines_section(doc) {
        let section = Html::parse_fragment(&section_html);
        guidelines.extend(parse_guideline_lists(&section));
        guidelines.extend(parse_guideline_cards(&section));
        guidelines.extend(parse_guideline_paragraphs(&section));
    }

    guidelines.extend(scan_do_dont(doc));
    let guidelines = dedupe_guidelines(guidelines);
    debug!(count = guidelines.len(), "extracted guidelines");
    guidelines
}

fn priority_rank(priority: Priority) -> u8 {
    match priority {
        Priority::High => 2,
        Priority::Normal => 1,
        Priority::Low => 0,
    }
}

/// One guideline per description text. The first occurrence keeps its place and
/// takes the highest priority seen for that text.
fn dedupe_guidelines(guidelines: Vec<UsageGuideline>) -> Vec<UsageGuideline> {
    let mut index_by_text: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<UsageGuideline> = Vec::with_capacity(guidelines.len());

    for guideline in guidelines {
        match index_by_text.get(&guideline.description) {
            Some(&i) => {
                if priority_rank(guideline.priority) > priority_rank(unique[i].priority) {
                    unique[i].priority = guideline.priority;
                }
            }
            None => {
                index_by_text.insert(guideline.description.clone(), unique.len());
                unique.push(guideline);
            }
        }
    }
    unique
}

/// Markup of the guidelines section, by class/attribute or by the element after a
/// "Guidelines" heading.
fn find_guidelines_section(doc: &Html) -> Option<String> {
    for selector in GUIDELINE_SECTION_SELECTORS {
        let Ok(sel) = Selector::parse(selector) else {
            continue;
        };
        if let Some(el) = doc.select(&sel).next() {
            return Some(el.html());
        }
    }

    doc.select(&HEADINGS_H2_H3)
        .filter(|h| {
            h.text()
                .collect::<String>()
                .to_lowercase()
                .contains("guidelines")
        })
        .find_map(|h| h.next_siblings().find_map(ElementRef::wrap))
        .map(|el| el.html())
}

fn parse_guideline_lists(section: &Html) -> Vec<UsageGuideline> {
    section
        .select(&LIST_ITEMS)
        .map(|li| clean_content_text(&li.text().collect::<String>()))
        .filter(|text| !text.is_empty())
        .map(|text| {
            guideline(
                first_sentence_title(&text, TITLE_MAX_CHARS),
                text,
                Priority::Normal,
            )
        })
        .collect()
}

fn parse_guideline_cards(section: &Html) -> Vec<UsageGuideline> {
    let mut out = Vec::new();
    for selector in GUIDELINE_CARD_SELECTORS {
        let Ok(sel) = Selector::parse(selector) else {
            continue;
        };
        for card in section.select(&sel) {
            let title = card
                .select(&CARD_TITLE)
                .next()
                .map(|el| clean_content_text(&el.text().collect::<String>()))
                .unwrap_or_default();
            let description = card
                .select(&CARD_DESCRIPTION)
                .next()
                .map(|el| clean_content_text(&el.text().collect::<String>()))
                .unwrap_or_default();
            if title.is_empty() && description.is_empty() {
                continue;
            }
            let title = if title.is_empty() {
                first_sentence_title(&description, TITLE_MAX_CHARS)
            } else {
                title
            };
            let description = if description.is_empty() {
                title.clone()
            } else {
                description
            };
            out.push(guideline(title, description, Priority::Normal));
        }
    }
    out
}

fn parse_guideline_paragraphs(section: &Html) -> Vec<UsageGuideline> {
    section
        .select(&PARAGRAPHS)
        .map(|p| clean_content_text(&p.text().collect::<String>()))
        .filter(|text| text.chars().count() > 20)
        .map(|text| {
            guideline(
                first_sentence_title(&text, TITLE_MAX_CHARS),
                text,
                Priority::Normal,
            )
        })
        .collect()
}

/// Document-wide do/don't statements, kept only when they classify as do or dont.
fn scan_do_dont(doc: &Html) -> Vec<UsageGuideline> {
    visible_text_nodes(doc.root_element())
        .into_iter()
        .map(|t| clean_content_text(&t))
        .filter(|t| t.chars().count() >= 10 && DO_DONT_MARKER.is_match(t))
        .filter_map(|text| {
            let kind = classify_guideline(&text);
            matches!(kind, GuidelineKind::Do | GuidelineKind::Dont).then(|| UsageGuideline {
                title: first_sentence_title(&text, TITLE_MAX_CHARS),
                description: text,
                kind,
                priority: Priority::High,
            })
        })
        .collect()
}

/// Extract code samples. Each element is reported once even when several selectors match it.
pub fn extract_code_examples(doc: &Html) -> Vec<CodeExample> {
    let mut seen = HashSet::new();
    let mut examples = Vec::new();

    for selector in CODE_BLOCK_SELECTORS {
        let Ok(sel) = Selector::parse(selector) else {
            continue;
        };
        for el in doc.select(&sel) {
            if !seen.insert(el.id()) {
                continue;
            }
            let code = el.text().collect::<String>().trim().to_string();
            if code.chars().count() < 10 {
                continue;
            }

            let language = detect_language(el, &code);
            let (title, description) = code_context(el);
            examples.push(CodeExample {
                title: title.unwrap_or_else(|| format!("Code Example {}", examples.len() + 1)),
                code,
                language,
                description,
            });
        }
    }

    debug!(count = examples.len(), "extracted code examples");
    examples
}

fn language_from_classes(el: ElementRef<'_>, allow_bare: bool) -> Option<String> {
    el.value().classes().find_map(|cls| {
        if let Some(lang) = cls.strip_prefix("language-") {
            Some(lang.to_string())
        } else if allow_bare && KNOWN_LANGUAGE_CLASSES.contains(&cls) {
            Some(cls.to_string())
        } else {
            None
        }
    })
}

fn detect_language(el: ElementRef<'_>, code: &str) -> String {
    if let Some(lang) = language_from_classes(el, true) {
        return lang;
    }
    if let Some(lang) = el
        .parent()
        .and_then(ElementRef::wrap)
        .and_then(|p| language_from_classes(p, false))
    {
        return lang;
    }

    let has_markup = code.contains('<') && code.contains('>');
    if code.contains("import") && (code.contains("React") || code.contains("Component")) {
        if code.contains("interface") || code.contains(": ") {
            "typescript".into()
        } else {
            "javascript".into()
        }
    } else if has_markup && code.contains("function") {
        "tsx".into()
    } else if has_markup {
        "jsx".into()
    } else {
        "typescript".into()
    }
}

/// Title from the nearest preceding heading and description from a nearby short paragraph.
fn code_context(el: ElementRef<'_>) -> (Option<String>, Option<String>) {
    // `pre code` blocks carry their context on the `pre`.
    let anchor = el
        .parent()
        .and_then(ElementRef::wrap)
        .filter(|p| p.value().name() == "pre")
        .unwrap_or(el);

    let mut title = None;
    let mut description = None;

    for prev in anchor
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .take(CONTEXT_SIBLINGS)
    {
        let name = prev.value().name();
        if matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6") {
            title = Some(clean_content_text(&prev.text().collect::<String>()))
                .filter(|t| !t.is_empty());
            break;
        }
        if name == "p" && description.is_none() {
            description = short_paragraph(prev);
        }
    }

    if description.is_none() {
        description = anchor
            .next_siblings()
            .find_map(ElementRef::wrap)
            .filter(|next| next.value().name() == "p")
            .and_then(short_paragraph);
    }

    (title, description)
}

fn short_paragraph(p: ElementRef<'_>) -> Option<String> {
    let text = clean_content_text(&p.text().collect::<String>());
    (!text.is_empty() && text.chars().count() < DESCRIPTION_MAX_CHARS).then_some(text)
}

/// Rendered story content from a preview frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewContent {
    pub component_html: Option<String>,
    pub component_text: Option<String>,
    pub canvas_html: Option<String>,
    pub canvas_text: Option<String>,
}

/// Story root and canvas markup/text, when present.
pub fn extract_preview_content(doc: &Html) -> PreviewContent {
    let mut preview = PreviewContent::default();

    if let Some(root) = doc.select(&STORY_ROOT).next() {
        preview.component_html = Some(root.html());
        preview.component_text = Some(collapse_whitespace(&element_visible_text(root)));
    }
    if let Some(canvas) = doc.select(&CANVAS).next() {
        preview.canvas_html = Some(canvas.html());
        preview.canvas_text = Some(collapse_whitespace(&element_visible_text(canvas)));
    }

    preview
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_uses_word_boundaries() {
        assert_eq!(classify_guideline("Don't stack two primary buttons"), GuidelineKind::Dont);
        assert_eq!(classify_guideline("Avoid long labels"), GuidelineKind::Dont);
        assert_eq!(classify_guideline("Always label icon buttons"), GuidelineKind::Do);
        assert_eq!(classify_guideline("Tip: group related actions"), GuidelineKind::BestPractice);
        // "document" and "done" must not read as "do".
        assert_eq!(
            classify_guideline("This document lists what is done"),
            GuidelineKind::Guideline
        );
        assert_eq!(classify_guideline("❌ Nested modals"), GuidelineKind::Dont);
    }

    #[test]
    fn guidelines_from_section_and_document() {
        let doc = Html::parse_document(
            r#"<html><body>
                <h2>Usage Guidelines</h2>
                <div>
                    <ul>
                        <li>Use one primary button per view.</li>
                        <li>Don't disable buttons without explanation.</li>
                    </ul>
                    <div class="docs-card"><h4>Note</h4><p>Labels are sentence case.</p></div>
                    <p>Buttons communicate the action that will occur.</p>
                </div>
                <p>You should always pair icons with text.</p>
            </body></html>"#,
        );

        let guidelines = extract_usage_guidelines(&doc);
        let kinds: Vec<GuidelineKind> = guidelines.iter().map(|g| g.kind).collect();

        assert_eq!(guidelines[0].title, "Use one primary button per view");
        assert_eq!(kinds[0], GuidelineKind::Guideline);
        assert_eq!(kinds[1], GuidelineKind::Dont);
        assert_eq!(guidelines[2].title, "Note");
        assert_eq!(kinds[2], GuidelineKind::BestPractice);
        assert!(
            guidelines
                .iter()
                .any(|g| g.priority == Priority::High && g.kind == GuidelineKind::Do)
        );
    }

    #[test]
    fn section_statements_are_not_repeated_by_the_document_scan() {
        let doc = Html::parse_document(
            r#"<html><body>
                <div class="docs-guidelines">
                    <ul><li>Don't disable buttons without explanation.</li></ul>
                    <div class="docs-card"><h4>Note</h4><p>Labels are sentence case.</p></div>
                </div>
                <p>Never nest one modal inside another.</p>
            </body></html>"#,
        );

        let guidelines = extract_usage_guidelines(&doc);
        let mut seen = HashSet::new();
        for g in &guidelines {
            assert!(seen.insert(g.description.clone()), "duplicate guideline: {}", g.description);
        }
        assert_eq!(guidelines.len(), 3);

        assert_eq!(guidelines[0].description, "Don't disable buttons without explanation.");
        assert_eq!(guidelines[0].kind, GuidelineKind::Dont);
        assert_eq!(guidelines[0].priority, Priority::High);
        assert_eq!(guidelines[1].title, "Note");
        assert_eq!(guidelines[1].priority, Priority::Normal);
        assert_eq!(guidelines[2].description, "Never nest one modal inside another.");
    }

    #[test]
    fn code_examples_dedupe_and_context() {
        let doc = Html::parse_document(
            r#"<html><body>
                <h3>Basic usage</h3>
                <p>Render a button with a label.</p>
                <pre><code class="language-tsx">import { Button } from './Button';
&lt;Button label="Save" /&gt;</code></pre>
                <div class="sb-code">const x = 1; // short helper snippet</div>
                <code class="sb-code">tiny</code>
            </body></html>"#,
        );

        let examples = extract_code_examples(&doc);
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].title, "Basic usage");
        assert_eq!(examples[0].language, "tsx");
        assert_eq!(
            examples[0].description.as_deref(),
            Some("Render a button with a label.")
        );
        assert!(examples[0].code.contains("<Button"));
        assert_eq!(examples[1].language, "typescript");
        assert_eq!(examples[1].title, "Basic usage");
    }

    #[test]
    fn language_heuristics() {
        let cases = [
            ("<pre><code>import React from 'react';\nconst a: number = 1;</code></pre>", "typescript"),
            ("<pre><code>import React from 'react';\nconst a = 1;</code></pre>", "javascript"),
            ("<pre><code>function App() { return &lt;div/&gt;; }</code></pre>", "tsx"),
            ("<pre><code>&lt;Card&gt;&lt;/Card&gt; markup only</code></pre>", "jsx"),
        ];
        for (html, expected) in cases {
            let doc = Html::parse_document(html);
            let examples = extract_code_examples(&doc);
            assert_eq!(examples[0].language, expected, "{html}");
        }
    }

    #[test]
    fn preview_content_reads_story_root() {
        let doc = Html::parse_document(
            r#"<body class="sb-show-main"><div id="storybook-root"><button>Save</button><span>Saved  items</span></div></body>"#,
        );
        let preview = extract_preview_content(&doc);
        assert_eq!(preview.component_text.as_deref(), Some("Saved items"));
        assert!(preview.component_html.unwrap().contains("<button>"));
        assert!(preview.canvas_html.is_some());
    }
}
