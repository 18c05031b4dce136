//! Inter-component dependency analysis over code samples and page markup.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use docgraph_shared::{ComponentDependency, RelationshipType};

use crate::text::visible_text;

static STATIC_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"import\s+(\{[^}]+\}|\*\s+as\s+\w+|\w+)\s+from\s+['"]([^'"]+)['"]"#)
        .expect("valid regex")
});
static DYNAMIC_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:import|require)\s*\(\s*['"]([^'"]+)['"]\s*\)"#).expect("valid regex")
});
static JSX_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(\w+)(?:\s|>|/>)").expect("valid regex"));
static EXTENDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:class|interface)\s+\w+\s+extends\s+(\w+)").expect("valid regex")
});
static IMPLEMENTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"class\s+\w+\s+implements\s+(\w+)").expect("valid regex"));
static CAPITALIZED_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][a-zA-Z]*\b").expect("valid regex"));
static HREF_PATH_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/([a-zA-Z-]+?)(?:--|\?|$)").expect("valid regex"));
static HREF_QUERY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&](?:component|story)=([^&]+)").expect("valid regex"));

const JSX_BUILTINS: &[&str] = &["React", "Fragment", "Suspense"];
const ACRONYMS: &[&str] = &["API", "HTML", "CSS", "DOM", "URL", "JSON", "XML"];
const NAV_LINK_SELECTORS: &[&str] = &[
    "nav a",
    ".navigation a",
    ".sidebar a",
    "[data-testid*=\"nav\"] a",
    ".storybook-nav a",
];

/// Input for the cross-component pass.
#[derive(Debug, Clone)]
pub struct ComponentSource {
    pub name: String,
    /// Page URL; identifies the component when names repeat.
    pub url: String,
    /// Concatenated code samples.
    pub code: String,
    /// Page markup or text.
    pub html: String,
}

fn dependency(
    source: &str,
    target: &str,
    relationship_type: RelationshipType,
    description: String,
) -> ComponentDependency {
    ComponentDependency {
        source: source.to_string(),
        target: target.to_string(),
        relationship_type,
        description: Some(description),
    }
}

/// Dependencies of `component_name` found in its code samples and page markup.
///
/// Unique by `(source, target, relationship_type)`, in first-occurrence order.
pub fn find_component_dependencies(
    component_name: &str,
    code: &str,
    html: &str,
) -> Vec<ComponentDependency> {
    let mut dependencies = Vec::new();

    if !code.is_empty() {
        dependencies.extend(code_dependencies(component_name, code));
    }
    if !html.is_empty() {
        let doc = Html::parse_document(html);
        dependencies.extend(dom_dependencies(component_name, &doc));
    }

    let mut seen = HashSet::new();
    dependencies.retain(|d| seen.insert((d.source.clone(), d.target.clone(), d.relationship_type)));
    dependencies
}

fn code_dependencies(component_name: &str, code: &str) -> Vec<ComponentDependency> {
    let mut out = Vec::new();

    for caps in STATIC_IMPORT.captures_iter(code) {
        let path = &caps[2];
        for item in imported_names(&caps[1]) {
            out.push(dependency(
                component_name,
                &item,
                RelationshipType::Imports,
                format!("Imports {item} from {path}"),
            ));
        }
    }
    let dynamic = DYNAMIC_IMPORT.captures_iter(code).count();
    if dynamic > 0 {
        debug!(dynamic, "dynamic imports carry no component names");
    }

    for caps in JSX_TAG.captures_iter(code) {
        let tag = &caps[1];
        let capitalized = tag.chars().next().is_some_and(char::is_uppercase);
        if capitalized && !JSX_BUILTINS.contains(&tag) && tag != component_name {
            out.push(dependency(
                component_name,
                tag,
                RelationshipType::Uses,
                format!("Uses {tag} component"),
            ));
        }
    }

    for caps in EXTENDS.captures_iter(code).chain(IMPLEMENTS.captures_iter(code)) {
        let parent = &caps[1];
        out.push(dependency(
            component_name,
            parent,
            RelationshipType::Extends,
            format!("Extends {parent}"),
        ));
    }

    out
}

/// Names bound by an import clause: `{ A, B as C, type D }`, `* as NS`, or `Default`.
fn imported_names(clause: &str) -> Vec<String> {
    let clause = clause.trim();
    if let Some(inner) = clause.strip_prefix('{').and_then(|c| c.strip_suffix('}')) {
        return inner
            .split(',')
            .filter_map(|item| {
                let item = item.trim();
                let item = item.strip_prefix("type ").unwrap_or(item).trim();
                let name = item.split_whitespace().next()?;
                Some(name.to_string())
            })
            .collect();
    }
    if let Some(ns) = clause.strip_prefix('*') {
        return ns
            .split_whitespace()
            .last()
            .map(|n| vec![n.to_string()])
            .unwrap_or_default();
    }
    vec![clause.to_string()]
}

fn dom_dependencies(component_name: &str, doc: &Html) -> Vec<ComponentDependency> {
    let mut out = Vec::new();

    for word in documentation_references(doc) {
        if word != component_name {
            out.push(dependency(
                component_name,
                &word,
                RelationshipType::References,
                "Referenced in documentation".to_string(),
            ));
        }
    }

    for name in navigation_references(doc) {
        if name != component_name {
            out.push(dependency(
                component_name,
                &name,
                RelationshipType::Related,
                "Related component in navigation".to_string(),
            ));
        }
    }

    out
}

/// Capitalized words in the visible text that could name a component.
fn documentation_references(doc: &Html) -> Vec<String> {
    let text = visible_text(doc, &[]);
    CAPITALIZED_WORD
        .find_iter(&text)
        .map(|m| m.as_str())
        .filter(|w| w.len() > 2 && !ACRONYMS.contains(w) && !w.ends_with('s'))
        // Short all-caps tokens are abbreviations, not component names.
        .filter(|w| !(w.len() <= 4 && w.chars().all(|c| c.is_ascii_uppercase())))
        .map(str::to_string)
        .collect()
}

fn navigation_references(doc: &Html) -> Vec<String> {
    let mut out = Vec::new();
    for selector in NAV_LINK_SELECTORS {
        let Ok(sel) = Selector::parse(selector) else {
            continue;
        };
        for link in doc.select(&sel) {
            let href = link.value().attr("href").unwrap_or("");
            let text = link.text().collect::<String>();
            if let Some(name) = component_name_from_link(href, text.trim()) {
                out.push(name);
            }
        }
    }
    out
}

/// Component name from a navigation link's href (kebab path segment or query
/// parameter) or, failing that, its capitalized text.
pub fn component_name_from_link(href: &str, text: &str) -> Option<String> {
    if !href.is_empty() {
        if let Some(caps) = HREF_PATH_SEGMENT.captures(href) {
            return Some(kebab_to_pascal(&caps[1]));
        }
        if let Some(caps) = HREF_QUERY.captures(href) {
            return Some(caps[1].to_string());
        }
    }

    let letters: String = text.chars().filter(char::is_ascii_alphabetic).collect();
    let capitalized = letters.chars().next().is_some_and(|c| c.is_ascii_uppercase());
    (capitalized && letters.len() > 2).then_some(letters)
}

fn kebab_to_pascal(kebab: &str) -> String {
    kebab
        .split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect()
}

/// Dependencies of every component, restricted to targets that name another known component.
///
/// Keyed by page URL (the name when a source has none), so components sharing a
/// name such as several `Docs` pages keep separate entries.
pub fn analyze_component_relationships(
    sources: &[ComponentSource],
) -> BTreeMap<String, Vec<ComponentDependency>> {
    let known: HashSet<&str> = sources.iter().map(|s| s.name.as_str()).collect();

    sources
        .iter()
        .filter(|s| !s.name.is_empty())
        .map(|s| {
            let deps = find_component_dependencies(&s.name, &s.code, &s.html)
                .into_iter()
                .filter(|d| known.contains(d.target.as_str()) && d.target != s.name)
                .collect();
            let key = if s.url.is_empty() { &s.name } else { &s.url };
            (key.clone(), deps)
        })
        .collect()
}
