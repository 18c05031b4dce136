//! Core domain types: discovered components, extracted records, and knowledge graphs.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-form JSON property bag used on components, entities and relations.
pub type PropertyMap = BTreeMap<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// A documented component found in the navigation tree.
///
/// Identity is the normalized `url`; two components with the same URL are the same component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Display name taken from the link text (or a placeholder).
    pub name: String,
    /// Absolute, normalized URL of the component page.
    pub url: String,
    /// Selectors that located this component.
    #[serde(default)]
    pub selectors: Vec<String>,
    /// Discovery-time metadata (index, strategy, raw href).
    #[serde(default)]
    pub metadata: PropertyMap,
}

/// A leaf anchor collected from the navigation tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafLink {
    /// Resolved, normalized target URL.
    pub href: String,
    /// Link text, or a `Component_<index>` placeholder when the anchor had none.
    pub display_text: String,
}

/// Raw page content captured for one component during the crawl phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawledPage {
    pub name: String,
    pub url: String,
    /// Markup of the component preview (or the main page when no preview was available).
    pub html: String,
    /// `<meta>` tags and capture diagnostics.
    #[serde(default)]
    pub metadata: PropertyMap,
    pub discovered_at: DateTime<Utc>,
    pub processed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Extracted documentation
// ---------------------------------------------------------------------------

/// Basic metadata extracted from a component page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentMetadata {
    pub name: String,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub last_modified: DateTime<Utc>,
}

/// A configurable property of a component (one args-table row).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentProperty {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub prop_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Guideline classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuidelineKind {
    Do,
    Dont,
    BestPractice,
    Guideline,
}

impl GuidelineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Do => "do",
            Self::Dont => "dont",
            Self::BestPractice => "best_practice",
            Self::Guideline => "guideline",
        }
    }
}

/// Guideline priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

/// A usage guideline or best practice for a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageGuideline {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: GuidelineKind,
    #[serde(default)]
    pub priority: Priority,
}

/// A code sample showing component usage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeExample {
    pub title: String,
    pub code: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Kind of dependency edge between two components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    Imports,
    Uses,
    Extends,
    References,
    Related,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Imports => "imports",
            Self::Uses => "uses",
            Self::Extends => "extends",
            Self::References => "references",
            Self::Related => "related",
        }
    }
}

/// A directed, by-name dependency between components.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentDependency {
    pub source: String,
    pub target: String,
    pub relationship_type: RelationshipType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Everything extracted from one component page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedComponentRecord {
    pub metadata: ComponentMetadata,
    #[serde(default)]
    pub properties: Vec<ComponentProperty>,
    #[serde(default)]
    pub guidelines: Vec<UsageGuideline>,
    #[serde(default)]
    pub examples: Vec<CodeExample>,
    #[serde(default)]
    pub dependencies: Vec<ComponentDependency>,
    /// Leading slice of the page's visible text.
    #[serde(default)]
    pub raw_content_excerpt: String,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Knowledge graph
// ---------------------------------------------------------------------------

/// A knowledge graph node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KgEntity {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default)]
    pub properties: PropertyMap,
}

/// A knowledge graph edge between two entity ids of the same graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KgRelation {
    pub source_id: String,
    pub target_id: String,
    pub relation_type: String,
    #[serde(default)]
    pub properties: PropertyMap,
}

impl KgRelation {
    /// Relation with no properties.
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        relation_type: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            relation_type: relation_type.into(),
            properties: PropertyMap::new(),
        }
    }
}

/// One extracted knowledge graph (per component, or merged).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KgResult {
    #[serde(default)]
    pub entities: Vec<KgEntity>,
    #[serde(default)]
    pub relations: Vec<KgRelation>,
    #[serde(default)]
    pub source_component: String,
    #[serde(default)]
    pub extraction_metadata: PropertyMap,
}

impl KgResult {
    /// An empty graph attributed to `source_component`.
    pub fn empty(source_component: impl Into<String>) -> Self {
        Self {
            source_component: source_component.into(),
            ..Default::default()
        }
    }

    /// Whether every relation endpoint names an entity of this graph.
    pub fn is_well_formed(&self) -> bool {
        let ids: HashSet<&str> = self.entities.iter().map(|e| e.id.as_str()).collect();
        self.relations
            .iter()
            .all(|r| ids.contains(r.source_id.as_str()) && ids.contains(r.target_id.as_str()))
    }

    /// Drop relations with a dangling endpoint. Returns how many were removed.
    pub fn retain_well_formed(&mut self) -> usize {
        let ids: HashSet<String> = self.entities.iter().map(|e| e.id.clone()).collect();
        let before = self.relations.len();
        self.relations
            .retain(|r| ids.contains(&r.source_id) && ids.contains(&r.target_id));
        before - self.relations.len()
    }

    /// The `method` recorded in `extraction_metadata`, if any.
    pub fn method(&self) -> Option<&str> {
        self.extraction_metadata
            .get("method")
            .and_then(|v| v.as_str())
    }
}

/// A `(subject, predicate, object)` statement produced by model-guided extraction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl Triple {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    /// A triple is usable only when no element is blank.
    pub fn is_complete(&self) -> bool {
        !self.subject.trim().is_empty()
            && !self.predicate.trim().is_empty()
            && !self.object.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Run summaries
// ---------------------------------------------------------------------------

/// Why the hierarchy explorer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// No collapsed nodes remained.
    Stable,
    /// Candidates existed but none could be expanded.
    NoProgress,
    /// The iteration ceiling was reached with collapsed nodes left.
    IterationCeiling,
    /// Discovery did not iterate (flat selector scan).
    NotApplicable,
}

/// A component that could not be processed, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentFailure {
    pub name: String,
    pub reason: String,
}

/// Outcome of one crawl run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSummary {
    pub components_discovered: usize,
    pub pages_saved: usize,
    pub termination: Termination,
    pub iterations: u32,
    #[serde(default)]
    pub failures: Vec<ComponentFailure>,
    pub output_directory: String,
}

/// Outcome of one extraction run, persisted as `extraction_summary.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: uuid::Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_pages: usize,
    pub successful_extractions: usize,
    pub kg_extractions: usize,
    pub model_guided: usize,
    pub manual_fallbacks: usize,
    pub merged_entities: usize,
    pub merged_relations: usize,
    #[serde(default)]
    pub failures: Vec<ComponentFailure>,
    #[serde(default)]
    pub components: Vec<String>,
    /// Written artifact file names mapped to their SHA-256 checksums.
    #[serde(default)]
    pub artifacts: BTreeMap<String, String>,
    pub output_directory: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: &str) -> KgEntity {
        KgEntity {
            id: id.into(),
            entity_type: "Component".into(),
            properties: PropertyMap::new(),
        }
    }

    #[test]
    fn guideline_kind_serializes_snake_case() {
        let g = UsageGuideline {
            title: "Keep labels short".into(),
            description: "Keep labels short.".into(),
            kind: GuidelineKind::BestPractice,
            priority: Priority::High,
        };
        let json = serde_json::to_string(&g).expect("serialize");
        assert!(json.contains(r#""type":"best_practice""#));
        assert!(json.contains(r#""priority":"high""#));
    }

    #[test]
    fn property_type_field_is_renamed() {
        let prop = ComponentProperty {
            name: "size".into(),
            description: "Button size".into(),
            prop_type: "select".into(),
            default: Some("medium".into()),
            required: false,
            options: vec![],
        };
        let json = serde_json::to_value(&prop).expect("serialize");
        assert_eq!(json["type"], "select");
        assert_eq!(json["default"], "medium");
    }

    #[test]
    fn retain_well_formed_drops_dangling_edges() {
        let mut kg = KgResult {
            entities: vec![entity("a"), entity("b")],
            relations: vec![
                KgRelation::new("a", "b", "has_property"),
                KgRelation::new("a", "ghost", "has_property"),
            ],
            ..KgResult::empty("Button")
        };
        assert!(!kg.is_well_formed());
        assert_eq!(kg.retain_well_formed(), 1);
        assert!(kg.is_well_formed());
        assert_eq!(kg.relations.len(), 1);
    }

    #[test]
    fn kg_result_roundtrip_keeps_method() {
        let mut kg = KgResult::empty("Button");
        kg.entities.push(entity("component:Button"));
        kg.extraction_metadata
            .insert("method".into(), serde_json::json!("manual_fallback"));

        let json = serde_json::to_string(&kg).expect("serialize");
        let parsed: KgResult = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.method(), Some("manual_fallback"));
        assert_eq!(parsed.entities[0].entity_type, "Component");
    }

    #[test]
    fn crawled_page_tolerates_missing_metadata() {
        let json = r#"{
            "name": "Button",
            "url": "http://localhost:6006/?path=/docs/button--docs",
            "html": "<div id=\"storybook-root\"></div>",
            "discovered_at": "2024-05-01T10:00:00Z",
            "processed_at": "2024-05-01T10:00:01Z"
        }"#;
        let page: CrawledPage = serde_json::from_str(json).expect("deserialize");
        assert!(page.metadata.is_empty());
        assert_eq!(page.name, "Button");
    }
}
