//! Per-component knowledge graph construction.
//!
//! [`KnowledgeGraphBuilder::build`] always produces a [`KgResult`]. The model-guided
//! path runs only for pages with real content. Its triples must pass a quality gate.
//! Every other outcome lands in the deterministic manual fallback.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use scraper::{Html, Selector};
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use docgraph_extraction::strip_markup;
use docgraph_extraction::text::{element_visible_text, visible_text, visible_text_nodes};
use docgraph_shared::{
    ComponentProperty, DocGraphError, ExtractedComponentRecord, ExtractionConfig, KgEntity,
    KgRelation, KgResult, ModelConfig, PropertyMap, Result, Triple,
};

use crate::merge::COMPONENT_URL_KEY;
use crate::model::ModelService;
use crate::schema::{KgSchema, SCHEMA_VERSION};

pub const METHOD_SCHEMA_GUIDED: &str = "schema_guided";
pub const METHOD_MANUAL_FALLBACK: &str = "manual_fallback";

const NO_PREVIEW_MARKER: &str = "Sorry, but you";
const MIN_STORY_TEXT: usize = 50;

static STORY_ROOT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#storybook-root").expect("valid selector"));
static NO_PREVIEW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".sb-nopreview").expect("valid selector"));

/// How graphs are derived.
pub enum ExtractionStrategy<M> {
    /// Ask the model for schema-constrained triples, falling back when needed.
    SchemaGuided(M),
    /// Always use the manual fallback.
    ManualOnly,
}

const CONNECTION_CHECK_PROMPT: &str = "Reply with the single word OK.";

impl<M: ModelService> ExtractionStrategy<M> {
    /// Send one short prompt to the model and downgrade to [`ExtractionStrategy::ManualOnly`]
    /// when it errors or answers with nothing.
    pub async fn verified(self) -> Self {
        let Self::SchemaGuided(model) = self else {
            return self;
        };
        match model.complete(CONNECTION_CHECK_PROMPT).await {
            Ok(reply) if !reply.trim().is_empty() => {
                info!(model = model.model_name(), "model connection verified");
                Self::SchemaGuided(model)
            }
            Ok(_) => {
                warn!(model = model.model_name(), "model returned an empty reply, using manual fallback");
                Self::ManualOnly
            }
            Err(e) => {
                warn!(model = model.model_name(), error = %e, "model unreachable, using manual fallback");
                Self::ManualOnly
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuilderSettings {
    pub min_content_length: usize,
    pub min_entity_count: usize,
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles each retry.
    pub backoff: Duration,
}

impl BuilderSettings {
    pub fn from_config(extraction: &ExtractionConfig, model: &ModelConfig) -> Self {
        Self {
            min_content_length: extraction.min_content_length,
            min_entity_count: extraction.min_entity_count,
            max_attempts: model.max_attempts.max(1),
            backoff: Duration::from_millis(model.backoff_ms),
        }
    }
}

impl Default for BuilderSettings {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default(), &ModelConfig::default())
    }
}

/// Why a component ended in the manual fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    ContentTooShort { length: usize },
    NoPreview,
    ModelDisabled,
    ModelFailed { attempts: u32, error: String },
    BelowQualityGate { entities: usize },
}

impl FallbackReason {
    fn code(&self) -> &'static str {
        match self {
            Self::ContentTooShort { .. } => "content_too_short",
            Self::NoPreview => "no_preview",
            Self::ModelDisabled => "model_disabled",
            Self::ModelFailed { .. } => "model_failed",
            Self::BelowQualityGate { .. } => "below_quality_gate",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContentTooShort { length } => write!(f, "content too short ({length} chars)"),
            Self::NoPreview => write!(f, "page has no component preview"),
            Self::ModelDisabled => write!(f, "model extraction disabled"),
            Self::ModelFailed { attempts, error } => {
                write!(f, "model failed after {attempts} attempt(s): {error}")
            }
            Self::BelowQualityGate { entities } => {
                write!(f, "model graph too small ({entities} entities)")
            }
        }
    }
}

/// What a page offers once parsed. Built synchronously so no parsed
/// document is held across an await point.
#[derive(Debug, Clone, Default)]
struct PageInspection {
    no_preview: bool,
    story_text: Option<String>,
    full_text: String,
    numbers: Vec<String>,
}

fn inspect_page(html: &str) -> PageInspection {
    let doc = Html::parse_document(html);

    let story_text = doc
        .select(&STORY_ROOT)
        .next()
        .map(element_visible_text)
        .filter(|t| !t.is_empty());

    let error_page = doc
        .select(&NO_PREVIEW)
        .any(|el| el.text().collect::<String>().contains(NO_PREVIEW_MARKER));
    let story_len = story_text.as_ref().map_or(0, |t| t.chars().count());

    let mut seen = HashSet::new();
    let numbers = visible_text_nodes(doc.root_element())
        .into_iter()
        .filter(|t| is_numeric_token(t) && seen.insert(t.clone()))
        .collect();

    PageInspection {
        no_preview: error_page && story_len < MIN_STORY_TEXT,
        story_text,
        full_text: visible_text(&doc, &[]),
        numbers,
    }
}

/// Digits with at most one decimal point, e.g. `16`, `0.5`, `2.`.
pub fn is_numeric_token(text: &str) -> bool {
    let text = text.trim();
    let mut digits = 0;
    let mut dots = 0;
    for c in text.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return false,
        }
    }
    digits > 0 && dots <= 1
}

/// Args-table rows that are template placeholders rather than real props.
pub fn is_placeholder_property(prop: &ComponentProperty) -> bool {
    prop.description
        .to_lowercase()
        .contains("short descriptionsummary")
        || prop.name.contains("propertyName")
}

/// Builds one [`KgResult`] per component.
pub struct KnowledgeGraphBuilder<M> {
    strategy: ExtractionStrategy<M>,
    schema: KgSchema,
    settings: BuilderSettings,
}

impl<M: ModelService> KnowledgeGraphBuilder<M> {
    pub fn new(strategy: ExtractionStrategy<M>, settings: BuilderSettings) -> Self {
        Self {
            strategy,
            schema: KgSchema::component_schema(),
            settings,
        }
    }

    pub fn with_schema(mut self, schema: KgSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn uses_model(&self) -> bool {
        matches!(self.strategy, ExtractionStrategy::SchemaGuided(_))
    }

    /// Graph for one component. Never fails; problems route to the manual fallback.
    #[instrument(skip_all, fields(component = %record.metadata.name))]
    pub async fn build(&self, record: &ExtractedComponentRecord, html: &str) -> KgResult {
        let page = inspect_page(html);

        if page.no_preview {
            return self.fallback(record, &page, FallbackReason::NoPreview);
        }
        if html.len() < self.settings.min_content_length {
            let reason = FallbackReason::ContentTooShort { length: html.len() };
            return self.fallback(record, &page, reason);
        }

        let model = match &self.strategy {
            ExtractionStrategy::SchemaGuided(model) => model,
            ExtractionStrategy::ManualOnly => {
                return self.fallback(record, &page, FallbackReason::ModelDisabled);
            }
        };

        let document = prepare_document(record, &page);
        debug!(document_len = document.len(), "prepared extraction document");

        let (triples, attempts) = match self.extract_with_retries(model, &document).await {
            Ok(found) => found,
            Err((attempts, e)) => {
                let reason = FallbackReason::ModelFailed {
                    attempts,
                    error: e.to_string(),
                };
                return self.fallback(record, &page, reason);
            }
        };

        let mut graph = triples_to_graph(&record.metadata.name, &triples, &self.schema);
        if graph.entities.len() < self.settings.min_entity_count {
            let reason = FallbackReason::BelowQualityGate {
                entities: graph.entities.len(),
            };
            return self.fallback(record, &page, reason);
        }

        graph.extraction_metadata = PropertyMap::from([
            ("method".to_string(), json!(METHOD_SCHEMA_GUIDED)),
            ("document_length".to_string(), json!(document.len())),
            ("extraction_model".to_string(), json!(model.model_name())),
            ("schema_version".to_string(), json!(SCHEMA_VERSION)),
            ("attempts".to_string(), json!(attempts)),
            ("triples".to_string(), json!(triples.len())),
            (COMPONENT_URL_KEY.to_string(), json!(record.metadata.url)),
        ]);
        let dropped = graph.retain_well_formed();
        if dropped > 0 {
            debug!(dropped, "removed dangling relations");
        }
        info!(
            entities = graph.entities.len(),
            relations = graph.relations.len(),
            "model-guided graph accepted"
        );
        graph
    }

    /// Bounded retry loop. Errors and empty replies both count as failed attempts.
    async fn extract_with_retries(
        &self,
        model: &M,
        document: &str,
    ) -> std::result::Result<(Vec<Triple>, u32), (u32, DocGraphError)> {
        let max = self.settings.max_attempts.max(1);
        let mut last_error = DocGraphError::Model("no attempt made".into());

        for attempt in 1..=max {
            match model.extract_paths(document, &self.schema).await {
                Ok(triples) => {
                    let complete: Vec<Triple> =
                        triples.into_iter().filter(Triple::is_complete).collect();
                    if !complete.is_empty() {
                        return Ok((complete, attempt));
                    }
                    warn!(attempt, "model returned no usable triples");
                    last_error = DocGraphError::Model("no usable triples".into());
                }
                Err(e) => {
                    warn!(attempt, error = %e, "model extraction attempt failed");
                    last_error = e;
                }
            }
            if attempt < max {
                tokio::time::sleep(self.settings.backoff * 2u32.pow(attempt - 1)).await;
            }
        }
        Err((max, last_error))
    }

    fn fallback(
        &self,
        record: &ExtractedComponentRecord,
        page: &PageInspection,
        reason: FallbackReason,
    ) -> KgResult {
        info!(%reason, "using manual fallback");
        let mut graph = manual_graph(record, &page.numbers);
        graph
            .extraction_metadata
            .insert("fallback_reason".to_string(), json!(reason.code()));
        graph
            .extraction_metadata
            .insert("fallback_detail".to_string(), json!(reason.to_string()));
        graph.retain_well_formed();
        graph
    }
}

/// Prompt body for model-guided extraction. All fields are free of markup.
fn prepare_document(record: &ExtractedComponentRecord, page: &PageInspection) -> String {
    let meta = &record.metadata;
    let description = meta
        .description
        .as_deref()
        .filter(|d| !d.contains(NO_PREVIEW_MARKER))
        .unwrap_or("Component documentation");
    let name = strip_markup(&meta.name);

    let mut doc = String::from(
        "Extract knowledge triples from this component documentation.\n\
         Format: (subject, predicate, object)\n\nComponent Metadata:\n",
    );
    doc.push_str(&format!("- Name: {name}\n"));
    doc.push_str(&format!("- Description: {}\n", strip_markup(description)));
    doc.push_str(&format!(
        "- Category: {}\n",
        strip_markup(meta.category.as_deref().unwrap_or("Uncategorized"))
    ));

    let props: Vec<&ComponentProperty> = record
        .properties
        .iter()
        .filter(|p| !is_placeholder_property(p))
        .collect();
    if !props.is_empty() {
        doc.push_str("\nProperties:\n");
        for p in &props {
            doc.push_str(&format!(
                "- Property: {}\n  Type: {}\n  Description: {}\n  Default: {}\n  Required: {}\n",
                strip_markup(&p.name),
                strip_markup(&p.prop_type),
                strip_markup(&p.description),
                p.default.as_deref().map(strip_markup).unwrap_or_else(|| "None".into()),
                if p.required { "Yes" } else { "No" },
            ));
        }

        doc.push_str("\nExample relations:\n");
        for p in props.iter().take(3) {
            doc.push_str(&format!(
                "- ({name}, has_property, {})\n",
                strip_markup(&p.name)
            ));
        }
        if let Some(p) = props.iter().find(|p| !p.options.is_empty()) {
            doc.push_str(&format!(
                "- ({}, has_value, {})\n",
                strip_markup(&p.name),
                strip_markup(&p.options[0])
            ));
        }
    }

    if !page.numbers.is_empty() {
        doc.push_str("\nNumerical Data Points:\n");
        for value in &page.numbers {
            doc.push_str(&format!("- Value: {value}\n"));
        }
    }

    let content = page.story_text.as_deref().unwrap_or(&page.full_text);
    doc.push_str(&format!(
        "\nDocumentation Content:\n{}\n\n\
         Focus on relationships between components, properties, and values.\n",
        strip_markup(content)
    ));
    doc
}

/// Turn triples into a graph. `type` triples assign entity types; schema relations
/// type their untyped endpoints; every other predicate becomes a relation.
fn triples_to_graph(component: &str, triples: &[Triple], schema: &KgSchema) -> KgResult {
    let mut entities: Vec<KgEntity> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut explicit: HashSet<String> = HashSet::new();
    let mut relations: Vec<KgRelation> = Vec::new();
    let mut relation_keys = HashSet::new();

    let mut node = |id: &str, entities: &mut Vec<KgEntity>| -> usize {
        *index.entry(id.to_string()).or_insert_with(|| {
            entities.push(KgEntity {
                id: id.to_string(),
                entity_type: "Unknown".to_string(),
                properties: PropertyMap::from([("name".to_string(), Value::from(id))]),
            });
            entities.len() - 1
        })
    };

    for t in triples.iter().filter(|t| t.is_complete()) {
        let (subject, predicate, object) = (t.subject.trim(), t.predicate.trim(), t.object.trim());
        let s = node(subject, &mut entities);
        if predicate.eq_ignore_ascii_case("type") {
            entities[s].entity_type = object.to_string();
            explicit.insert(subject.to_string());
            continue;
        }
        let o = node(object, &mut entities);
        if let Some(kind) = schema.relation(predicate) {
            for (i, inferred) in [(s, &kind.source), (o, &kind.target)] {
                if !explicit.contains(&entities[i].id) && entities[i].entity_type == "Unknown" {
                    entities[i].entity_type = inferred.clone();
                }
            }
        }
        if relation_keys.insert((subject.to_string(), object.to_string(), predicate.to_string())) {
            relations.push(KgRelation::new(subject, object, predicate));
        }
    }

    KgResult {
        entities,
        relations,
        source_component: component.to_string(),
        extraction_metadata: PropertyMap::new(),
    }
}

/// Deterministic graph from the structured record plus standalone numbers on the page.
pub fn manual_graph(record: &ExtractedComponentRecord, numbers: &[String]) -> KgResult {
    let name = &record.metadata.name;
    let component_id = format!("component:{name}");

    let mut entities = vec![KgEntity {
        id: component_id.clone(),
        entity_type: "Component".to_string(),
        properties: PropertyMap::from([
            ("name".to_string(), json!(name)),
            (
                "description".to_string(),
                json!(record.metadata.description.clone().unwrap_or_default()),
            ),
            (
                "category".to_string(),
                json!(record.metadata.category.as_deref().unwrap_or("Uncategorized")),
            ),
        ]),
    }];
    let mut relations = Vec::new();
    let mut ids = HashSet::from([component_id.clone()]);

    for prop in record.properties.iter().filter(|p| !is_placeholder_property(p)) {
        let prop_id = format!("property:{name}:{}", prop.name);
        if !ids.insert(prop_id.clone()) {
            continue;
        }
        entities.push(KgEntity {
            id: prop_id.clone(),
            entity_type: "Property".to_string(),
            properties: PropertyMap::from([
                ("name".to_string(), json!(prop.name)),
                ("type".to_string(), json!(prop.prop_type)),
                ("description".to_string(), json!(prop.description)),
                ("default".to_string(), json!(prop.default.as_deref().unwrap_or("None"))),
                ("required".to_string(), json!(prop.required)),
                ("options".to_string(), json!(prop.options)),
            ]),
        });
        relations.push(KgRelation::new(&component_id, &prop_id, "has_property"));

        let numeric_options =
            !prop.options.is_empty() && prop.options.iter().all(|o| is_numeric_token(o));
        if numeric_options {
            for value in &prop.options {
                let value_id = format!("value:{name}:{}:{value}", prop.name);
                if !ids.insert(value_id.clone()) {
                    continue;
                }
                entities.push(KgEntity {
                    id: value_id.clone(),
                    entity_type: "Value".to_string(),
                    properties: PropertyMap::from([
                        ("value".to_string(), json!(value)),
                        ("unit".to_string(), json!("unknown")),
                        ("property".to_string(), json!(prop.name)),
                    ]),
                });
                relations.push(KgRelation::new(&prop_id, &value_id, "has_value"));
            }
        }
    }

    for (idx, value) in numbers.iter().enumerate() {
        let value_id = format!("value:{name}:{idx}");
        entities.push(KgEntity {
            id: value_id.clone(),
            entity_type: "Value".to_string(),
            properties: PropertyMap::from([
                ("value".to_string(), json!(value)),
                ("unit".to_string(), json!("unknown")),
                ("source".to_string(), json!("documentation")),
            ]),
        });
        relations.push(KgRelation::new(&component_id, &value_id, "has_value"));
    }

    KgResult {
        entities,
        relations,
        source_component: name.clone(),
        extraction_metadata: PropertyMap::from([
            ("method".to_string(), json!(METHOD_MANUAL_FALLBACK)),
            (COMPONENT_URL_KEY.to_string(), json!(record.metadata.url)),
        ]),
    }
}

/// Reject records that cannot anchor a graph.
pub fn validate_record(record: &ExtractedComponentRecord) -> Result<()> {
    if record.metadata.name.trim().is_empty() {
        return Err(DocGraphError::validation("component record has an empty name"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockModel;
    use chrono::Utc;
    use docgraph_shared::ComponentMetadata;

    fn prop(name: &str, description: &str, options: &[&str]) -> ComponentProperty {
        ComponentProperty {
            name: name.into(),
            description: description.into(),
            prop_type: "text".into(),
            default: None,
            required: false,
            options: options.iter().map(|o| o.to_string()).collect(),
        }
    }

    fn record(properties: Vec<ComponentProperty>) -> ExtractedComponentRecord {
        ExtractedComponentRecord {
            metadata: ComponentMetadata {
                name: "Button".into(),
                title: "Button".into(),
                url: "http://localhost:6006/?path=/docs/button--docs".into(),
                description: Some("Buttons trigger actions.".into()),
                category: None,
                tags: vec![],
                last_modified: Utc::now(),
            },
            properties,
            guidelines: vec![],
            examples: vec![],
            dependencies: vec![],
            raw_content_excerpt: String::new(),
            timestamp: Utc::now(),
        }
    }

    const PAGE: &str = r#"<html><body><div id="storybook-root">
        <h1>Button</h1>
        <p>Buttons let people take an action with a single tap, such as submitting a form.</p>
        <p>Use the primary variant for the main call to action on a page.</p>
    </div></body></html>"#;

    fn settings() -> BuilderSettings {
        BuilderSettings {
            backoff: Duration::ZERO,
            ..BuilderSettings::default()
        }
    }

    fn three_props() -> Vec<ComponentProperty> {
        vec![
            prop("label", "Button text", &[]),
            prop("size", "How large", &["small", "large"]),
            prop("propertyName", "Placeholder", &[]),
            prop("variant", "Short descriptionSummary goes here", &[]),
            prop("disabled", "Disable interaction", &[]),
        ]
    }

    #[tokio::test]
    async fn connection_check_downgrades_unreachable_models() {
        let healthy = ExtractionStrategy::SchemaGuided(MockModel::empty()).verified().await;
        assert!(matches!(healthy, ExtractionStrategy::SchemaGuided(_)));

        let down = ExtractionStrategy::SchemaGuided(MockModel::failing("connection refused"))
            .verified()
            .await;
        assert!(matches!(down, ExtractionStrategy::ManualOnly));

        let manual = ExtractionStrategy::<MockModel>::ManualOnly.verified().await;
        assert!(matches!(manual, ExtractionStrategy::ManualOnly));
    }

    #[tokio::test]
    async fn zero_triples_three_times_falls_back() {
        let builder = KnowledgeGraphBuilder::new(
            ExtractionStrategy::SchemaGuided(MockModel::empty()),
            settings(),
        );
        let result = builder.build(&record(three_props()), PAGE).await;

        if let ExtractionStrategy::SchemaGuided(model) = &builder.strategy {
            assert_eq!(model.calls(), 3);
        }
        assert_eq!(result.method(), Some(METHOD_MANUAL_FALLBACK));
        let components = result.entities.iter().filter(|e| e.entity_type == "Component").count();
        let properties = result.entities.iter().filter(|e| e.entity_type == "Property").count();
        assert_eq!(components, 1);
        assert_eq!(properties, 3);
        assert_eq!(result.extraction_metadata["fallback_reason"], json!("model_failed"));
        assert!(result.is_well_formed());
    }

    #[tokio::test]
    async fn model_graph_passes_quality_gate() {
        let triples = vec![
            Triple::new("Button", "type", "Component"),
            Triple::new("Button", "has_property", "size"),
            Triple::new("size", "has_value", "large"),
            Triple::new("size", "has_value", "large"),
            Triple::new("", "has_property", "ghost"),
        ];
        let builder = KnowledgeGraphBuilder::new(
            ExtractionStrategy::SchemaGuided(MockModel::returning(triples)),
            settings(),
        );
        let result = builder.build(&record(three_props()), PAGE).await;

        assert_eq!(result.method(), Some(METHOD_SCHEMA_GUIDED));
        let types: Vec<(&str, &str)> = result
            .entities
            .iter()
            .map(|e| (e.id.as_str(), e.entity_type.as_str()))
            .collect();
        assert_eq!(
            types,
            vec![("Button", "Component"), ("size", "Property"), ("large", "Value")]
        );
        assert_eq!(result.relations.len(), 2);
        assert!(result.is_well_formed());
    }

    #[tokio::test]
    async fn retries_recover_after_transient_errors() {
        let model = MockModel::returning(vec![
            Triple::new("Button", "has_property", "size"),
            Triple::new("size", "has_value", "small"),
        ])
        .then(Err("HTTP 503"));
        let builder = KnowledgeGraphBuilder::new(ExtractionStrategy::SchemaGuided(model), settings());
        let result = builder.build(&record(three_props()), PAGE).await;

        assert_eq!(result.method(), Some(METHOD_SCHEMA_GUIDED));
        assert_eq!(result.extraction_metadata["attempts"], json!(2));
    }

    #[tokio::test]
    async fn small_model_graph_is_rejected() {
        let model = MockModel::returning(vec![Triple::new("Button", "has_property", "size")]);
        let builder = KnowledgeGraphBuilder::new(ExtractionStrategy::SchemaGuided(model), settings());
        let result = builder.build(&record(three_props()), PAGE).await;

        assert_eq!(result.method(), Some(METHOD_MANUAL_FALLBACK));
        assert_eq!(result.extraction_metadata["fallback_reason"], json!("below_quality_gate"));
    }

    #[tokio::test]
    async fn short_and_error_pages_skip_the_model() {
        let builder = KnowledgeGraphBuilder::new(
            ExtractionStrategy::SchemaGuided(MockModel::failing("unreachable")),
            settings(),
        );

        let short = builder.build(&record(vec![]), "<p>hi</p>").await;
        assert_eq!(short.extraction_metadata["fallback_reason"], json!("content_too_short"));

        let error_page = r#"<html><body><div class="sb-nopreview"><p>Sorry, but you either
            have no stories or none are selected somehow.</p></div><div id="storybook-root"></div>
            </body></html>"#;
        assert!(inspect_page(error_page).no_preview);
        let result = builder.build(&record(vec![]), error_page).await;
        assert_eq!(result.extraction_metadata["fallback_reason"], json!("no_preview"));

        if let ExtractionStrategy::SchemaGuided(model) = &builder.strategy {
            assert_eq!(model.calls(), 0);
        }
    }

    #[tokio::test]
    async fn manual_only_strategy_never_calls_a_model() {
        let builder: KnowledgeGraphBuilder<MockModel> =
            KnowledgeGraphBuilder::new(ExtractionStrategy::ManualOnly, settings());
        assert!(!builder.uses_model());
        let result = builder.build(&record(three_props()), PAGE).await;
        assert_eq!(result.extraction_metadata["fallback_reason"], json!("model_disabled"));
    }

    #[test]
    fn manual_graph_links_numeric_values() {
        let mut props = vec![prop("columns", "Grid columns", &["2", "3", "4"])];
        props.push(prop("size", "How large", &["small", "12"]));
        let numbers = vec!["16".to_string(), "0.5".to_string()];
        let graph = manual_graph(&record(props), &numbers);

        let values: Vec<&str> = graph
            .entities
            .iter()
            .filter(|e| e.entity_type == "Value")
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(
            values,
            vec![
                "value:Button:columns:2",
                "value:Button:columns:3",
                "value:Button:columns:4",
                "value:Button:0",
                "value:Button:1",
            ]
        );
        assert!(graph.relations.iter().any(|r| r.source_id == "property:Button:columns"
            && r.target_id == "value:Button:columns:3"
            && r.relation_type == "has_value"));
        assert!(graph.is_well_formed());
    }

    #[test]
    fn prepared_document_filters_placeholders_and_markup() {
        let mut props = three_props();
        props[0].description = "<b>Button</b> text".into();
        let page = inspect_page(PAGE);
        let doc = prepare_document(&record(props), &page);

        assert!(doc.contains("- Property: label"));
        assert!(doc.contains("Description: Button text"));
        assert!(!doc.contains("propertyName"));
        assert!(!doc.contains("- Property: variant"));
        assert!(doc.contains("(Button, has_property, label)"));
        assert!(doc.contains("(size, has_value, small)"));
        assert!(doc.contains("Use the primary variant"));
        assert!(!doc.contains('<'));
    }

    #[test]
    fn numeric_tokens() {
        assert!(is_numeric_token("16"));
        assert!(is_numeric_token("0.5"));
        assert!(is_numeric_token(" 2. "));
        assert!(!is_numeric_token("1.2.3"));
        assert!(!is_numeric_token("."));
        assert!(!is_numeric_token("12px"));
    }
}
