//! The entity and relation vocabulary offered to model-guided extraction.

use std::collections::HashSet;

use serde::Serialize;

use docgraph_shared::{DocGraphError, Result};

pub const SCHEMA_VERSION: &str = "1.0";

/// A node kind with its expected properties (`name -> type`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityKind {
    pub label: String,
    pub properties: Vec<(String, String)>,
}

/// An edge kind between two declared entity kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationKind {
    pub label: String,
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KgSchema {
    pub entities: Vec<EntityKind>,
    pub relations: Vec<RelationKind>,
}

fn entity(label: &str, properties: &[(&str, &str)]) -> EntityKind {
    EntityKind {
        label: label.to_string(),
        properties: properties
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

fn relation(label: &str, source: &str, target: &str) -> RelationKind {
    RelationKind {
        label: label.to_string(),
        source: source.to_string(),
        target: target.to_string(),
    }
}

impl KgSchema {
    /// Components own properties; properties take values.
    pub fn component_schema() -> Self {
        Self {
            entities: vec![
                entity("Component", &[("name", "string"), ("description", "string")]),
                entity(
                    "Property",
                    &[("name", "string"), ("type", "string"), ("description", "string")],
                ),
                entity("Value", &[("value", "string"), ("unit", "string")]),
            ],
            relations: vec![
                relation("has_property", "Component", "Property"),
                relation("has_value", "Property", "Value"),
            ],
        }
    }

    pub fn entity_types(&self) -> Vec<&str> {
        self.entities.iter().map(|e| e.label.as_str()).collect()
    }

    pub fn relation_types(&self) -> Vec<&str> {
        self.relations.iter().map(|r| r.label.as_str()).collect()
    }

    /// Relation kind named `label`, matched case-insensitively.
    pub fn relation(&self, label: &str) -> Option<&RelationKind> {
        self.relations
            .iter()
            .find(|r| r.label.eq_ignore_ascii_case(label))
    }

    /// Check that labels are non-empty and unique and that every relation
    /// references declared entity kinds.
    pub fn validate(&self) -> Result<()> {
        if self.entities.is_empty() {
            return Err(DocGraphError::validation("schema declares no entity kinds"));
        }

        let mut entity_labels = HashSet::new();
        for kind in &self.entities {
            if kind.label.trim().is_empty() {
                return Err(DocGraphError::validation("entity kind with empty label"));
            }
            if !entity_labels.insert(kind.label.as_str()) {
                return Err(DocGraphError::validation(format!(
                    "duplicate entity kind '{}'",
                    kind.label
                )));
            }
        }

        let mut relation_labels = HashSet::new();
        for kind in &self.relations {
            if kind.label.trim().is_empty() {
                return Err(DocGraphError::validation("relation kind with empty label"));
            }
            if !relation_labels.insert(kind.label.as_str()) {
                return Err(DocGraphError::validation(format!(
                    "duplicate relation kind '{}'",
                    kind.label
                )));
            }
            for endpoint in [&kind.source, &kind.target] {
                if !entity_labels.contains(endpoint.as_str()) {
                    return Err(DocGraphError::validation(format!(
                        "relation '{}' references undeclared entity kind '{endpoint}'",
                        kind.label
                    )));
                }
            }
        }
        Ok(())
    }

    /// Compact textual rendering used in model prompts.
    pub fn describe(&self) -> String {
        let mut out = String::from("Entity types:\n");
        for kind in &self.entities {
            let props: Vec<String> = kind
                .properties
                .iter()
                .map(|(name, ty)| format!("{name}: {ty}"))
                .collect();
            out.push_str(&format!("- {} ({})\n", kind.label, props.join(", ")));
        }
        out.push_str("Relation types:\n");
        for kind in &self.relations {
            out.push_str(&format!("- {}: {} -> {}\n", kind.label, kind.source, kind.target));
        }
        out
    }
}

impl Default for KgSchema {
    fn default() -> Self {
        Self::component_schema()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_schema_is_valid() {
        let schema = KgSchema::component_schema();
        schema.validate().unwrap();
        assert_eq!(schema.entity_types(), vec!["Component", "Property", "Value"]);
        assert_eq!(schema.relation_types(), vec!["has_property", "has_value"]);
        assert_eq!(schema.relation("HAS_VALUE").map(|r| r.source.as_str()), Some("Property"));
    }

    #[test]
    fn undeclared_endpoint_is_rejected() {
        let mut schema = KgSchema::component_schema();
        schema.relations.push(relation("documented_by", "Component", "Page"));
        let err = schema.validate().unwrap_err();
        assert!(err.to_string().contains("Page"));
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut schema = KgSchema::component_schema();
        schema.entities.push(entity("Value", &[]));
        assert!(schema.validate().is_err());
    }

    #[test]
    fn description_lists_every_kind() {
        let text = KgSchema::component_schema().describe();
        assert!(text.contains("- Property (name: string, type: string, description: string)"));
        assert!(text.contains("- has_value: Property -> Value"));
    }
}
