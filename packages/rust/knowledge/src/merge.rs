//! Graph merging across components.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value, json};
use tracing::debug;

use docgraph_shared::{KgEntity, KgRelation, KgResult, PropertyMap};

pub const COMBINED_SOURCE: &str = "combined";

/// `extraction_metadata` key holding the page URL a graph was built from.
pub const COMPONENT_URL_KEY: &str = "component_url";

/// Union of `results`.
///
/// Entities are keyed by id: the first type seen wins and property maps are
/// unioned, later values replacing earlier ones only on shared keys. Relations are
/// unique by `(source_id, target_id, relation_type)`. Each input's
/// `extraction_metadata` is kept under `components.<key>`, the key being the
/// input's [`COMPONENT_URL_KEY`] value or, failing that, its source component, so
/// same-named components from different pages stay apart.
pub fn combine(results: &[KgResult]) -> KgResult {
    let mut entities: Vec<KgEntity> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut relations: Vec<KgRelation> = Vec::new();
    let mut relation_keys: HashSet<(String, String, String)> = HashSet::new();
    let mut components = Map::new();

    for result in results {
        for entity in &result.entities {
            match index.get(&entity.id) {
                Some(&i) => {
                    let existing = &mut entities[i].properties;
                    for (key, value) in &entity.properties {
                        existing.insert(key.clone(), value.clone());
                    }
                }
                None => {
                    index.insert(entity.id.clone(), entities.len());
                    entities.push(entity.clone());
                }
            }
        }

        for relation in &result.relations {
            let key = (
                relation.source_id.clone(),
                relation.target_id.clone(),
                relation.relation_type.clone(),
            );
            if relation_keys.insert(key) {
                relations.push(relation.clone());
            }
        }

        if let Some(key) = component_key(result) {
            let mut metadata: Map<String, Value> =
                result.extraction_metadata.clone().into_iter().collect();
            metadata.insert(
                "source_component".to_string(),
                json!(result.source_component),
            );
            components
                .entry(key)
                .or_insert(Value::Object(metadata));
        }
    }

    let mut merged = KgResult {
        entities,
        relations,
        source_component: COMBINED_SOURCE.to_string(),
        extraction_metadata: PropertyMap::from([
            ("method".to_string(), json!("merged")),
            ("component_count".to_string(), json!(components.len())),
            ("components".to_string(), Value::Object(components)),
        ]),
    };
    let dropped = merged.retain_well_formed();
    debug!(
        entities = merged.entities.len(),
        relations = merged.relations.len(),
        dropped,
        "merged graphs"
    );
    merged
}

fn component_key(result: &KgResult) -> Option<String> {
    let url = result
        .extraction_metadata
        .get(COMPONENT_URL_KEY)
        .and_then(Value::as_str)
        .filter(|u| !u.is_empty());
    match url {
        Some(url) => Some(url.to_string()),
        None if !result.source_component.is_empty() => Some(result.source_component.clone()),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: &str, entity_type: &str, props: &[(&str, &str)]) -> KgEntity {
        KgEntity {
            id: id.into(),
            entity_type: entity_type.into(),
            properties: props.iter().map(|(k, v)| (k.to_string(), json!(v))).collect(),
        }
    }

    fn graph(source: &str, entities: Vec<KgEntity>, relations: Vec<KgRelation>) -> KgResult {
        KgResult {
            entities,
            relations,
            source_component: source.into(),
            extraction_metadata: PropertyMap::from([("method".to_string(), json!("manual_fallback"))]),
        }
    }

    fn sample() -> (KgResult, KgResult) {
        let a = graph(
            "A",
            vec![
                entity("x", "Component", &[("name", "x")]),
                entity("y", "Property", &[("name", "y"), ("type", "text")]),
            ],
            vec![KgRelation::new("x", "y", "has_property")],
        );
        let b = graph(
            "B",
            vec![
                entity("y", "Value", &[("type", "select"), ("unit", "px")]),
                entity("z", "Value", &[("value", "4")]),
            ],
            vec![
                KgRelation::new("y", "z", "has_value"),
                KgRelation::new("x", "y", "has_property"),
            ],
        );
        (a, b)
    }

    #[test]
    fn overlapping_entities_are_unioned() {
        let (a, mut b) = sample();
        b.entities.push(entity("x", "Component", &[]));
        let merged = combine(&[a, b]);

        let ids: Vec<&str> = merged.entities.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y", "z"]);

        let y = &merged.entities[1];
        assert_eq!(y.entity_type, "Property");
        assert_eq!(y.properties["name"], json!("y"));
        assert_eq!(y.properties["type"], json!("select"));
        assert_eq!(y.properties["unit"], json!("px"));

        assert_eq!(merged.relations.len(), 2);
        assert!(merged.is_well_formed());
        assert_eq!(merged.extraction_metadata["component_count"], json!(2));
        assert_eq!(
            merged.extraction_metadata["components"]["B"]["method"],
            json!("manual_fallback")
        );
    }

    #[test]
    fn merging_is_idempotent() {
        let (a, b) = sample();
        let once = combine(&[a.clone(), b.clone()]);
        let twice = combine(&[a.clone(), b.clone(), a, b]);
        assert_eq!(once.entities, twice.entities);
        assert_eq!(once.relations, twice.relations);

        let again = combine(&[once.clone(), once.clone()]);
        assert_eq!(again.entities, once.entities);
        assert_eq!(again.relations, once.relations);
    }

    #[test]
    fn same_named_components_keep_their_metadata() {
        let docs = |url: &str, method: &str| KgResult {
            entities: vec![entity("component:Docs", "Component", &[])],
            relations: vec![],
            source_component: "Docs".into(),
            extraction_metadata: PropertyMap::from([
                ("method".to_string(), json!(method)),
                (COMPONENT_URL_KEY.to_string(), json!(url)),
            ]),
        };
        let merged = combine(&[
            docs("http://sb.test/?path=/docs/button--docs", "manual_fallback"),
            docs("http://sb.test/?path=/docs/select--docs", "schema_guided"),
        ]);

        let components = &merged.extraction_metadata["components"];
        assert_eq!(merged.extraction_metadata["component_count"], json!(2));
        assert_eq!(
            components["http://sb.test/?path=/docs/select--docs"]["method"],
            json!("schema_guided")
        );
        assert_eq!(
            components["http://sb.test/?path=/docs/button--docs"]["source_component"],
            json!("Docs")
        );
    }

    #[test]
    fn empty_input_gives_empty_graph() {
        let merged = combine(&[]);
        assert!(merged.entities.is_empty());
        assert_eq!(merged.source_component, COMBINED_SOURCE);
    }
}
