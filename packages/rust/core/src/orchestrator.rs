//! Extraction pass over crawled pages.
//!
//! Each page goes through metadata, content and dependency extraction, then the
//! knowledge graph builder. Per-component files are written as they are produced.
//! After the pass the cross-component relationships, the merged graph and the
//! run summary are written. A component that fails is recorded and left out of
//! every aggregate; the run itself still completes.

use std::path::Path;

use chrono::Utc;
use scraper::Html;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use docgraph_extraction::{
    ComponentSource, MetadataExtractor, analyze_component_relationships, excerpt,
    extract_code_examples, extract_preview_content, extract_usage_guidelines,
    find_component_dependencies, visible_text,
};
use docgraph_knowledge::{
    BuilderSettings, ExtractionStrategy, KnowledgeGraphBuilder, METHOD_MANUAL_FALLBACK,
    METHOD_SCHEMA_GUIDED, ModelService, combine, validate_record,
};
use docgraph_shared::{
    AppConfig, ComponentFailure, CrawledPage, DocGraphError, ExtractedComponentRecord,
    ExtractionConfig, KgResult, Result, RunSummary,
};

use crate::artifacts::{ArtifactWriter, component_stem, json_files, read_json};
use crate::progress::ProgressReporter;

pub const COMBINED_KG_FILE: &str = "combined_kg.json";
pub const RELATIONSHIPS_FILE: &str = "component_relationships.json";
pub const SUMMARY_FILE: &str = "extraction_summary.json";

/// A crawled page, or the reason it could not be loaded.
pub type PageInput = (String, Result<CrawledPage>);

/// Runs the per-component pipeline and the cross-component pass.
pub struct ExtractionOrchestrator<M> {
    config: ExtractionConfig,
    metadata: MetadataExtractor,
    builder: KnowledgeGraphBuilder<M>,
}

impl<M: ModelService> ExtractionOrchestrator<M> {
    pub fn new(config: ExtractionConfig, builder: KnowledgeGraphBuilder<M>) -> Self {
        Self {
            metadata: MetadataExtractor::new(config.metadata_selectors.clone()),
            config,
            builder,
        }
    }

    pub fn from_config(config: &AppConfig, strategy: ExtractionStrategy<M>) -> Self {
        let settings = BuilderSettings::from_config(&config.extraction, &config.model);
        Self::new(
            config.extraction.clone(),
            KnowledgeGraphBuilder::new(strategy, settings),
        )
    }

    /// Structured record for one page. Parsing stays synchronous.
    pub fn extract_record(&self, page: &CrawledPage) -> Result<ExtractedComponentRecord> {
        if page.html.trim().is_empty() {
            return Err(DocGraphError::validation("page has no markup"));
        }
        let doc = Html::parse_document(&page.html);

        let mut metadata = self
            .metadata
            .extract_component_metadata(&doc, &page.name, &page.url);
        if metadata.description.is_none() {
            metadata.description = page
                .metadata
                .get("description")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .filter(|d| !d.trim().is_empty());
        }

        let examples = extract_code_examples(&doc);
        let code: Vec<&str> = examples.iter().map(|e| e.code.as_str()).collect();
        let dependencies = find_component_dependencies(&page.name, &code.join("\n"), &page.html);

        let preview = extract_preview_content(&doc);
        let text = preview
            .component_text
            .or(preview.canvas_text)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| visible_text(&doc, &[]));

        let record = ExtractedComponentRecord {
            metadata,
            properties: self.metadata.extract_properties(&doc),
            guidelines: extract_usage_guidelines(&doc),
            examples,
            dependencies,
            raw_content_excerpt: excerpt(&text, self.config.excerpt_length),
            timestamp: Utc::now(),
        };
        validate_record(&record)?;
        Ok(record)
    }

    /// Load every `*.json` page in `input_dir` and process them into `output_dir`.
    #[instrument(skip_all, fields(input = %input_dir.display()))]
    pub async fn process_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        progress: &dyn ProgressReporter,
    ) -> Result<RunSummary> {
        let pages: Vec<PageInput> = json_files(input_dir)?
            .into_iter()
            .map(|path| {
                let label = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                (label, read_json::<CrawledPage>(&path))
            })
            .collect();
        info!(pages = pages.len(), "loaded crawled pages");
        self.process_pages(pages, output_dir, progress).await
    }

    /// Process already-loaded pages. Only an unusable output directory fails the run.
    #[instrument(skip_all, fields(pages = pages.len(), output = %output_dir.display()))]
    pub async fn process_pages(
        &self,
        pages: Vec<PageInput>,
        output_dir: &Path,
        progress: &dyn ProgressReporter,
    ) -> Result<RunSummary> {
        let started_at = Utc::now();
        let run_id = Uuid::now_v7();
        let mut writer = ArtifactWriter::create(output_dir)?;
        info!(%run_id, model = self.builder.uses_model(), "starting extraction");

        let total = pages.len();
        let mut failures = Vec::new();
        let mut components = Vec::new();
        let mut graphs: Vec<KgResult> = Vec::new();
        let mut sources = Vec::new();

        progress.phase("Extracting components");
        for (i, (label, loaded)) in pages.into_iter().enumerate() {
            let page = match loaded {
                Ok(page) => page,
                Err(e) => {
                    error!(file = %label, error = %e, "unreadable crawled page");
                    progress.component_extracted(&label, i + 1, total);
                    failures.push(ComponentFailure {
                        name: label,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            match self.process_page(&page, &mut writer).await {
                Ok((record, kg)) => {
                    let code: Vec<&str> = record.examples.iter().map(|e| e.code.as_str()).collect();
                    sources.push(ComponentSource {
                        name: record.metadata.name.clone(),
                        url: page.url,
                        code: code.join("\n"),
                        html: page.html,
                    });
                    progress.component_extracted(&record.metadata.name, i + 1, total);
                    components.push(record.metadata.name);
                    graphs.push(kg);
                }
                Err(e) => {
                    error!(component = %page.name, error = %e, "component failed");
                    progress.component_extracted(&page.name, i + 1, total);
                    failures.push(ComponentFailure {
                        name: page.name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        progress.phase("Analyzing relationships");
        let relationships = analyze_component_relationships(&sources);
        if let Err(e) = writer.write_json(RELATIONSHIPS_FILE, &relationships) {
            warn!(error = %e, "failed to write relationships");
        }

        progress.phase("Merging graphs");
        let merged = combine(&graphs);
        if let Err(e) = writer.write_json(COMBINED_KG_FILE, &merged) {
            warn!(error = %e, "failed to write merged graph");
        }

        let count_method = |method: &str| graphs.iter().filter(|g| g.method() == Some(method)).count();
        let summary = RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            total_pages: total,
            successful_extractions: components.len(),
            kg_extractions: graphs.iter().filter(|g| !g.entities.is_empty()).count(),
            model_guided: count_method(METHOD_SCHEMA_GUIDED),
            manual_fallbacks: count_method(METHOD_MANUAL_FALLBACK),
            merged_entities: merged.entities.len(),
            merged_relations: merged.relations.len(),
            failures,
            components,
            artifacts: writer.checksums().clone(),
            output_directory: output_dir.display().to_string(),
        };
        writer.write_json(SUMMARY_FILE, &summary)?;

        info!(
            total = summary.total_pages,
            succeeded = summary.successful_extractions,
            failed = summary.failures.len(),
            model_guided = summary.model_guided,
            manual = summary.manual_fallbacks,
            "extraction complete"
        );
        progress.extraction_done(&summary);
        Ok(summary)
    }

    async fn process_page(
        &self,
        page: &CrawledPage,
        writer: &mut ArtifactWriter,
    ) -> Result<(ExtractedComponentRecord, KgResult)> {
        let record = self.extract_record(page)?;
        let kg = self.builder.build(&record, &page.html).await;

        let now = Utc::now();
        writer.write_unique_json(&component_stem(&record.metadata.name, "extracted", now), &record)?;
        writer.write_unique_json(&component_stem(&record.metadata.name, "kg", now), &kg)?;
        Ok((record, kg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::tests::temp_dir;
    use crate::progress::SilentProgress;
    use docgraph_knowledge::testing::MockModel;
    use docgraph_shared::{PropertyMap, Triple};
    use std::collections::BTreeMap;

    fn page(name: &str, body: &str) -> CrawledPage {
        CrawledPage {
            name: name.into(),
            url: format!("http://sb.test/?path=/docs/{}--docs", name.to_lowercase()),
            html: format!("<html><body><div id=\"storybook-root\">{body}</div></body></html>"),
            metadata: PropertyMap::new(),
            discovered_at: Utc::now(),
            processed_at: Utc::now(),
        }
    }

    fn button() -> CrawledPage {
        page(
            "Button",
            r#"<h1>Button</h1>
            <p>Buttons trigger actions and may include an Icon before the label text.</p>
            <table class="docblock-argstable"><tbody>
              <tr><td>label*</td><td>Button text</td><td>-</td><td>text</td></tr>
              <tr><td>size</td><td>How large</td><td>medium</td><td>select</td></tr>
            </tbody></table>
            <pre><code class="language-tsx">import { Icon } from './Icon';
export const WithIcon = () =&gt; &lt;Button&gt;&lt;Icon name="plus"/&gt;Add&lt;/Button&gt;;</code></pre>"#,
        )
    }

    fn icon() -> CrawledPage {
        page(
            "Icon",
            "<h1>Icon</h1><p>Icons are glyphs used across the system to reinforce meaning.</p>\
             <table class=\"docblock-argstable\"><tbody>\
             <tr><td>name</td><td>Glyph name</td><td>-</td><td>text</td></tr></tbody></table>",
        )
    }

    fn orchestrator(strategy: ExtractionStrategy<MockModel>) -> ExtractionOrchestrator<MockModel> {
        let mut config = AppConfig::default();
        config.model.backoff_ms = 0;
        ExtractionOrchestrator::from_config(&config, strategy)
    }

    #[test]
    fn record_extraction_collects_everything() {
        let orch = orchestrator(ExtractionStrategy::ManualOnly);
        let record = orch.extract_record(&button()).unwrap();

        assert_eq!(record.metadata.title, "Button");
        assert_eq!(record.properties.len(), 2);
        assert!(record.properties[0].required);
        assert_eq!(record.examples.len(), 1);
        assert_eq!(record.examples[0].language, "tsx");
        assert!(record.dependencies.iter().any(|d| d.target == "Icon"));
        assert!(record.raw_content_excerpt.starts_with("Button Buttons trigger actions"));

        assert!(orch.extract_record(&page("Empty", "")).is_ok());
        let mut blank = page("Blank", "");
        blank.html.clear();
        assert!(orch.extract_record(&blank).is_err());
    }

    #[tokio::test]
    async fn directory_run_writes_all_artifacts_and_records_failures() {
        let tmp = temp_dir("dg-orchestrator");
        let input = tmp.join("crawler");
        let output = tmp.join("extraction");
        std::fs::create_dir_all(&input).unwrap();
        for (file, page) in [("Button_1.json", button()), ("Icon_1.json", icon())] {
            std::fs::write(input.join(file), serde_json::to_string(&page).unwrap()).unwrap();
        }
        std::fs::write(input.join("Broken_1.json"), "{ not json").unwrap();

        let orch = orchestrator(ExtractionStrategy::ManualOnly);
        let summary = orch
            .process_directory(&input, &output, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(summary.total_pages, 3);
        assert_eq!(summary.successful_extractions, 2);
        assert_eq!(summary.manual_fallbacks, 2);
        assert_eq!(summary.model_guided, 0);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].name, "Broken_1");
        assert_eq!(summary.components, vec!["Button", "Icon"]);

        // 2 records + 2 graphs + relationships + merged graph.
        assert_eq!(summary.artifacts.len(), 6);
        assert!(output.join(SUMMARY_FILE).exists());

        let merged: KgResult = read_json(&output.join(COMBINED_KG_FILE)).unwrap();
        assert_eq!(merged.entities.len(), summary.merged_entities);
        assert!(merged.is_well_formed());
        assert!(merged.entities.iter().any(|e| e.id == "component:Icon"));
        let button_url = "http://sb.test/?path=/docs/button--docs";
        let icon_url = "http://sb.test/?path=/docs/icon--docs";
        assert_eq!(
            merged.extraction_metadata["components"][button_url]["source_component"],
            "Button"
        );

        let relationships: BTreeMap<String, Vec<docgraph_shared::ComponentDependency>> =
            read_json(&output.join(RELATIONSHIPS_FILE)).unwrap();
        assert!(relationships[button_url].iter().any(|d| d.target == "Icon"));
        assert!(relationships[icon_url].iter().all(|d| d.target == "Button"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn model_guided_results_are_counted() {
        let tmp = temp_dir("dg-orchestrator-model");
        let model = MockModel::returning(vec![
            Triple::new("Button", "has_property", "label"),
            Triple::new("Button", "has_property", "size"),
            Triple::new("size", "has_value", "medium"),
        ]);
        let orch = orchestrator(ExtractionStrategy::SchemaGuided(model));
        let pages = vec![("Button".to_string(), Ok(button()))];

        let summary = orch.process_pages(pages, &tmp, &SilentProgress).await.unwrap();
        assert_eq!(summary.model_guided, 1);
        assert_eq!(summary.kg_extractions, 1);
        assert_eq!(summary.merged_entities, 4);

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
