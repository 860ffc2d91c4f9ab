//! Instruction module - what the executor is allowed to do
//!
//! Typed instructions plus the schema-driven validator that guards them.

pub mod action;
pub mod validator;

pub use action::{ActionKind, Instruction, RawInstruction};
pub use validator::{InstructionValidator, BUILTIN_SCHEMA};

use serde_json::Value;

use crate::core::Result;

/// Parse a JSON array of `{action, args}` objects without validating it
pub fn parse_sequence(value: &Value) -> Result<Vec<RawInstruction>> {
    Ok(serde_json::from_value(value.clone())?)
}
