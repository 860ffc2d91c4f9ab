//! Schema-driven instruction validation
//!
//! The action/argument contract lives in a JSON Schema document, not in code.
//! The document is compiled once; a broken document is a [`PilotError::Schema`],
//! a broken instruction list is a [`PilotError::Validation`].

use jsonschema::paths::PathChunk;
use jsonschema::{Draft, JSONSchema};
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::core::{PilotError, Result, ToolDefinition};
use crate::instruction::action::{ActionKind, RawInstruction};

/// Schema shipped with the crate
pub const BUILTIN_SCHEMA: &str = include_str!("../../schema/instructions.schema.json");

/// Compiled instruction schema
pub struct InstructionValidator {
    document: Value,
    compiled: JSONSchema,
}

impl std::fmt::Debug for InstructionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstructionValidator").finish_non_exhaustive()
    }
}

impl InstructionValidator {
    /// Compile the embedded schema
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_SCHEMA)
    }

    /// Load and compile a schema document from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PilotError::schema(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Compile a schema document from JSON text
    pub fn from_json(content: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(content)
            .map_err(|e| PilotError::schema(format!("not valid JSON: {}", e)))?;
        Self::from_document(document)
    }

    /// Compile an already parsed schema document
    pub fn from_document(document: Value) -> Result<Self> {
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .should_validate_formats(false)
            .compile(&document)
            .map_err(|e| PilotError::schema(format!("{} (at '{}')", e, e.schema_path)))?;

        for kind in ActionKind::ALL {
            if args_schema(&document, kind).is_none() {
                return Err(PilotError::schema(format!(
                    "missing definitions.{}_args",
                    kind.as_str()
                )));
            }
        }

        Ok(Self { document, compiled })
    }

    /// Validate an instruction sequence, reporting the first offending element.
    pub fn validate(&self, instructions: &Value) -> Result<()> {
        let errors = match self.compiled.validate(instructions) {
            Ok(()) => return Ok(()),
            Err(errors) => errors,
        };

        let first = errors
            .map(|e| {
                let chunks: Vec<String> = e
                    .instance_path
                    .iter()
                    .map(|chunk| match chunk {
                        PathChunk::Property(name) => name.to_string(),
                        PathChunk::Index(idx) => idx.to_string(),
                        PathChunk::Keyword(keyword) => keyword.to_string(),
                    })
                    .collect();
                let index = match e.instance_path.iter().next() {
                    Some(PathChunk::Index(idx)) => *idx,
                    _ => 0,
                };
                (index, chunks, e.to_string())
            })
            .min_by_key(|(index, _, _)| *index);

        match first {
            Some((_, chunks, message)) => {
                let path = if chunks.is_empty() {
                    "root".to_string()
                } else {
                    chunks.join(" -> ")
                };
                Err(PilotError::validation(path, message))
            }
            None => Err(PilotError::validation("root", "schema validation failed")),
        }
    }

    /// Validate one instruction as a single-element sequence
    pub fn validate_one(&self, instruction: &RawInstruction) -> Result<()> {
        self.validate(&Value::Array(vec![instruction.to_value()]))
    }

    /// Function-calling definitions derived from the per-action schemas
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        ActionKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let mut parameters = args_schema(&self.document, kind)?.clone();
                let description = parameters
                    .as_object_mut()
                    .and_then(|obj| obj.remove("description"))
                    .and_then(|d| d.as_str().map(String::from))
                    .unwrap_or_default();
                Some(ToolDefinition::function(
                    kind.as_str(),
                    description,
                    parameters,
                ))
            })
            .collect()
    }
}

fn args_schema(document: &Value, kind: ActionKind) -> Option<&Value> {
    document
        .get("definitions")?
        .get(format!("{}_args", kind.as_str()))
        .filter(|v| v.is_object())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validator() -> InstructionValidator {
        InstructionValidator::builtin().expect("builtin schema compiles")
    }

    #[test]
    fn test_valid_sequence() {
        let payload = json!([
            {"action": "navigate", "args": {"url": "https://example.com"}},
            {"action": "click", "args": {"text": "Contact"}},
            {"action": "fill", "args": {"label": "Name", "text": "John Doe"}},
            {"action": "wait", "args": {"timeout_ms": 2000}},
            {"action": "wait", "args": {"timeout_ms": 2000, "selector": "#done"}},
            {"action": "extract_text", "args": {"selector": "h1"}},
            {"action": "scroll", "args": {"dx": 0, "dy": 600}},
            {"action": "screenshot", "args": {"path": "form_submission.png"}},
            {"action": "done", "args": {}}
        ]);
        validator().validate(&payload).unwrap();
    }

    #[test]
    fn test_missing_action() {
        let bad = json!([{"args": {"url": "https://x"}}]);
        let err = validator().validate(&bad).unwrap_err();
        match &err {
            PilotError::Validation { path, message } => {
                assert_eq!(path, "0");
                assert!(message.contains("\"action\" is a required property"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(err.to_string().contains("action"));
    }

    #[test]
    fn test_missing_required_arg_names_position_and_key() {
        let bad = json!([
            {"action": "navigate", "args": {"url": "https://example.com"}},
            {"action": "extract_text", "args": {}},
            {"action": "fill", "args": {"label": "Email"}}
        ]);
        match validator().validate(&bad).unwrap_err() {
            PilotError::Validation { path, message } => {
                assert_eq!(path, "1 -> args");
                assert!(message.contains("\"selector\""), "{message}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_formats_are_annotations_only() {
        let v = validator();
        v.validate(&json!([{"action": "navigate", "args": {"url": "example.com"}}]))
            .unwrap();
        v.validate(&json!([{"action": "scroll", "args": {"dx": 0.0, "dy": 300.0}}]))
            .unwrap();
    }

    #[test]
    fn test_click_needs_text_or_selector() {
        let bad = json!([{"action": "click", "args": {}}]);
        assert!(matches!(
            validator().validate(&bad),
            Err(PilotError::Validation { path, .. }) if path == "0 -> args"
        ));
    }

    #[test]
    fn test_unknown_action_and_unknown_arg() {
        let v = validator();
        assert!(v
            .validate(&json!([{"action": "hover", "args": {}}]))
            .is_err());
        assert!(v
            .validate(&json!([{"action": "navigate", "args": {"url": "https://x", "tab": 2}}]))
            .is_err());
    }

    #[test]
    fn test_root_must_be_array() {
        match validator().validate(&json!({"action": "done"})).unwrap_err() {
            PilotError::Validation { path, .. } => assert_eq!(path, "root"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_validate_one() {
        let v = validator();
        let good: RawInstruction =
            serde_json::from_value(json!({"action": "wait", "args": {"timeout_ms": 10}})).unwrap();
        v.validate_one(&good).unwrap();

        let bad: RawInstruction =
            serde_json::from_value(json!({"action": "wait", "args": {"timeout_ms": -1}})).unwrap();
        assert!(v.validate_one(&bad).is_err());
    }

    #[test]
    fn test_malformed_schema_is_a_schema_error() {
        assert!(matches!(
            InstructionValidator::from_json("{ not json"),
            Err(PilotError::Schema(_))
        ));
        assert!(matches!(
            InstructionValidator::from_json(r#"{"type": "no-such-type"}"#),
            Err(PilotError::Schema(_))
        ));
        // Compiles, but does not describe the action set
        assert!(matches!(
            InstructionValidator::from_json(r#"{"type": "array"}"#),
            Err(PilotError::Schema(_))
        ));
    }

    #[test]
    fn test_tool_definitions_cover_every_action() {
        let tools = validator().tool_definitions();
        let names: Vec<_> = tools.iter().map(|t| t.function.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["navigate", "click", "fill", "wait", "extract_text", "scroll", "screenshot", "done"]
        );
        let fill = &tools[2].function;
        assert_eq!(fill.description, "Fill an input field, by form label or CSS selector.");
        assert_eq!(fill.parameters["required"], json!(["text"]));
        assert!(fill.parameters.get("description").is_none());
    }
}
