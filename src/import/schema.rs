use roxmltree::Document;
use std::collections::HashSet;
use std::path::Path;

/// Result of the advisory schema check. Validation never blocks an import;
/// the orchestrator only decides how each outcome is logged.
#[derive(Debug, PartialEq)]
pub enum SchemaOutcome {
    /// No schema path configured at all.
    NotConfigured,
    /// A schema path is configured but does not point at a readable
    /// schema file.
    InvalidSchemaPath,
    /// The document uses elements the schema does not declare; one entry
    /// per violation with the line number in the source XML.
    Violations(Vec<(u32, String)>),
    Valid,
}

/// Check a document against the element vocabulary of an XSD file.
///
/// OpenImmo producers vary too much in strictness for full structural
/// validation to be useful here, so the check is deliberately shallow: it
/// collects every `xs:element` name the schema declares and reports
/// document elements outside that vocabulary.
pub fn validate(document: &Document, schema_path: Option<&Path>) -> SchemaOutcome {
    let Some(schema_path) = schema_path else {
        return SchemaOutcome::NotConfigured;
    };

    let Ok(schema_text) = std::fs::read_to_string(schema_path) else {
        return SchemaOutcome::InvalidSchemaPath;
    };
    let Ok(schema) = Document::parse(&schema_text) else {
        return SchemaOutcome::InvalidSchemaPath;
    };

    let vocabulary = declared_elements(&schema);
    if vocabulary.is_empty() {
        return SchemaOutcome::InvalidSchemaPath;
    }

    let mut violations = Vec::new();
    for node in document.descendants().filter(|node| node.is_element()) {
        let name = node.tag_name().name();
        if !vocabulary.contains(name) {
            let position = document.text_pos_at(node.range().start);
            violations.push((position.row, format!("element '{}' is not allowed here", name)));
        }
    }

    if violations.is_empty() {
        SchemaOutcome::Valid
    } else {
        SchemaOutcome::Violations(violations)
    }
}

/// Every element name declared by the schema, either as a standalone
/// `xs:element name="..."` or via a reference.
fn declared_elements(schema: &Document) -> HashSet<String> {
    schema
        .descendants()
        .filter(|node| node.is_element() && node.tag_name().name() == "element")
        .filter_map(|node| node.attribute("name").or_else(|| node.attribute("ref")))
        .map(|name| name.to_string())
        .collect()
}
