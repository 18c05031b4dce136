//! Component metadata and args-table extraction.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use docgraph_shared::{ComponentMetadata, ComponentProperty};

use crate::text::{clean_text, collapse_whitespace};

const TITLE_SELECTORS: &[&str] = &["h1", ".sb-heading", "[data-testid='title']", ".docs-title"];
const DESCRIPTION_SELECTORS: &[&str] = &[
    ".docs-description",
    ".sb-description",
    "p:first-of-type",
    "[data-testid='description']",
];
const CATEGORY_SELECTORS: &[&str] = &[".docs-category", ".sb-category", "[data-category]"];
const TAG_SELECTORS: &[&str] = &[".docs-tags .tag", ".sb-tags .tag", "[data-tags]"];

/// Row selectors for args tables; the first one yielding rows wins.
const PROPERTY_ROW_SELECTORS: &[&str] = &[
    ".sb-argstableBlock tbody tr",
    ".docblock-argstable tbody tr",
    "table[aria-label*='args'] tbody tr",
];

static OPTION_LABELS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("option, label").expect("valid selector"));
static SELECT_CONTROL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("select").expect("valid selector"));
static RADIO_CONTROL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input[type='radio']").expect("valid selector"));

/// Metadata fields with ordered selector candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Description,
    Category,
    Tags,
}

impl Field {
    fn key(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Category => "category",
            Self::Tags => "tags",
        }
    }

    fn defaults(self) -> &'static [&'static str] {
        match self {
            Self::Title => TITLE_SELECTORS,
            Self::Description => DESCRIPTION_SELECTORS,
            Self::Category => CATEGORY_SELECTORS,
            Self::Tags => TAG_SELECTORS,
        }
    }
}

/// Extracts [`ComponentMetadata`] and [`ComponentProperty`] rows from component pages.
#[derive(Debug, Clone, Default)]
pub struct MetadataExtractor {
    overrides: BTreeMap<String, Vec<String>>,
}

impl MetadataExtractor {
    /// Use `overrides` (keyed by `title`, `description`, `category`, `tags`) in place of
    /// the default selectors for those fields.
    pub fn new(overrides: BTreeMap<String, Vec<String>>) -> Self {
        Self { overrides }
    }

    fn selectors_for(&self, field: Field) -> Vec<String> {
        match self.overrides.get(field.key()) {
            Some(custom) if !custom.is_empty() => custom.clone(),
            _ => field.defaults().iter().map(|s| s.to_string()).collect(),
        }
    }

    /// All cleaned, non-empty texts for the first selector of `field` that matches anything.
    fn field_values(&self, doc: &Html, field: Field) -> Vec<String> {
        for selector in self.selectors_for(field) {
            let sel = match Selector::parse(&selector) {
                Ok(sel) => sel,
                Err(e) => {
                    warn!(field = field.key(), %selector, error = ?e, "skipping invalid selector");
                    continue;
                }
            };
            let values: Vec<String> = doc
                .select(&sel)
                .map(|el| clean_text(&el.text().collect::<String>()))
                .filter(|t| !t.is_empty())
                .collect();
            if !values.is_empty() {
                return values;
            }
        }
        Vec::new()
    }

    fn first_value(&self, doc: &Html, field: Field) -> Option<String> {
        self.field_values(doc, field).into_iter().next()
    }

    /// Basic metadata for a component page. The title falls back to `name`.
    pub fn extract_component_metadata(&self, doc: &Html, name: &str, url: &str) -> ComponentMetadata {
        ComponentMetadata {
            name: name.to_string(),
            title: self
                .first_value(doc, Field::Title)
                .unwrap_or_else(|| name.to_string()),
            url: url.to_string(),
            description: self.first_value(doc, Field::Description),
            category: self.first_value(doc, Field::Category),
            tags: self.field_values(doc, Field::Tags),
            last_modified: Utc::now(),
        }
    }

    /// Rows of the component's args table.
    ///
    /// Rows need at least three cells: name, description, default, and optionally a control.
    pub fn extract_properties(&self, doc: &Html) -> Vec<ComponentProperty> {
        for selector in PROPERTY_ROW_SELECTORS {
            let Ok(sel) = Selector::parse(selector) else {
                continue;
            };
            let properties: Vec<ComponentProperty> =
                doc.select(&sel).filter_map(parse_property_row).collect();
            if !properties.is_empty() {
                debug!(%selector, count = properties.len(), "extracted properties");
                return properties;
            }
        }
        Vec::new()
    }
}

fn parse_property_row(row: ElementRef<'_>) -> Option<ComponentProperty> {
    let cells: Vec<ElementRef<'_>> = row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|c| matches!(c.value().name(), "td" | "th"))
        .collect();
    if cells.len() < 3 {
        return None;
    }

    let raw_name = cells[0].text().collect::<String>();
    let required = raw_name.contains('*') || cells[0].value().classes().any(|c| c == "required");
    let name = clean_text(&raw_name).trim_matches(|c: char| c == '*' || c.is_whitespace()).to_string();
    if name.is_empty() {
        return None;
    }

    let default = Some(clean_text(&cells[2].text().collect::<String>())).filter(|d| !d.is_empty());

    let (prop_type, options) = match cells.get(3) {
        Some(control) => control_type_and_options(*control),
        None => ("unknown".to_string(), Vec::new()),
    };

    Some(ComponentProperty {
        name,
        description: clean_text(&cells[1].text().collect::<String>()),
        prop_type,
        default,
        required,
        options,
    })
}

fn control_type_and_options(control: ElementRef<'_>) -> (String, Vec<String>) {
    let options: Vec<String> = control
        .select(&OPTION_LABELS)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .collect();

    let prop_type = if control.select(&SELECT_CONTROL).next().is_some() {
        "select".to_string()
    } else if control.select(&RADIO_CONTROL).next().is_some() {
        "radio".to_string()
    } else {
        let text = clean_text(&control.text().collect::<String>());
        if text.is_empty() { "unknown".to_string() } else { text }
    };

    (prop_type, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARGS_TABLE: &str = r#"<html><body>
        <h1>Button ⋅ Storybook</h1>
        <p>Buttons trigger actions.</p>
        <div class="sb-tags"><span class="tag">inputs</span><span class="tag">actions</span></div>
        <table class="docblock-argstable">
          <thead><tr><th>Name</th><th>Description</th><th>Default</th><th>Control</th></tr></thead>
          <tbody>
            <tr><td>label</td><td>Button text</td><td>-</td><td>text</td></tr>
            <tr><td>variant*</td><td>Visual style</td><td>"primary"</td>
                <td><select><option>primary</option><option>secondary</option></select></td></tr>
            <tr><td>size</td><td>How large should the button be?</td><td>medium</td>
                <td><label>small</label><label>medium</label><label>large</label>
                    <input type="radio" name="size"></td></tr>
            <tr><td>disabled</td><td>Disable interaction</td><td>false</td><td></td></tr>
          </tbody>
        </table>
    </body></html>"#;

    #[test]
    fn four_row_args_table() {
        let doc = Html::parse_document(ARGS_TABLE);
        let props = MetadataExtractor::default().extract_properties(&doc);

        assert_eq!(props.len(), 4);
        assert!(!props[0].required);
        assert!(props[1].required);
        assert_eq!(props[1].name, "variant");
        assert_eq!(props[1].prop_type, "select");
        assert_eq!(props[1].options, vec!["primary", "secondary"]);
        assert_eq!(props[2].prop_type, "radio");
        assert_eq!(props[2].options.len(), 3);
        assert_eq!(props[0].prop_type, "text");
        assert_eq!(props[3].prop_type, "unknown");
        assert_eq!(props[3].default.as_deref(), Some("false"));
    }

    #[test]
    fn rows_with_too_few_cells_are_skipped() {
        let doc = Html::parse_document(
            r#"<table class="sb-argstableBlock"><tbody>
                <tr><td colspan="3">No inputs found for this component.</td></tr>
                <tr><td>onClick</td><td>Click handler</td><td>-</td></tr>
            </tbody></table>"#,
        );
        let props = MetadataExtractor::default().extract_properties(&doc);
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].name, "onClick");
        assert_eq!(props[0].prop_type, "unknown");
    }

    #[test]
    fn metadata_uses_defaults_and_fallbacks() {
        let doc = Html::parse_document(ARGS_TABLE);
        let meta = MetadataExtractor::default().extract_component_metadata(
            &doc,
            "Button",
            "http://localhost:6006/?path=/docs/button--docs",
        );
        assert_eq!(meta.title, "Button");
        assert_eq!(meta.description.as_deref(), Some("Buttons trigger actions."));
        assert_eq!(meta.tags, vec!["inputs", "actions"]);
        assert_eq!(meta.category, None);

        let empty = Html::parse_document("<div></div>");
        let meta = MetadataExtractor::default().extract_component_metadata(&empty, "Card", "u");
        assert_eq!(meta.title, "Card");
        assert!(meta.tags.is_empty());
    }

    #[test]
    fn selector_overrides_replace_defaults() {
        let doc = Html::parse_document(
            r#"<h1>Generic heading</h1><div class="component-name">API / Tooltip</div>"#,
        );
        let mut overrides = BTreeMap::new();
        overrides.insert("title".to_string(), vec!["[[bad".to_string(), ".component-name".to_string()]);
        let meta = MetadataExtractor::new(overrides).extract_component_metadata(&doc, "Tooltip", "u");
        assert_eq!(meta.title, "Tooltip");
    }
}
