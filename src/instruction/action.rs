//! Instruction types
//!
//! [`RawInstruction`] is the wire form produced by callers and reasoners.
//! [`Instruction`] is the typed form the executor consumes; one variant per
//! action so argument handling is checked by the compiler.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::core::{PilotError, Result, ToolCall};

/// The closed set of actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Navigate,
    Click,
    Fill,
    Wait,
    ExtractText,
    Scroll,
    Screenshot,
    Done,
}

impl ActionKind {
    /// Every action, in schema order
    pub const ALL: [ActionKind; 8] = [
        ActionKind::Navigate,
        ActionKind::Click,
        ActionKind::Fill,
        ActionKind::Wait,
        ActionKind::ExtractText,
        ActionKind::Scroll,
        ActionKind::Screenshot,
        ActionKind::Done,
    ];

    /// Wire name of the action
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Navigate => "navigate",
            ActionKind::Click => "click",
            ActionKind::Fill => "fill",
            ActionKind::Wait => "wait",
            ActionKind::ExtractText => "extract_text",
            ActionKind::Scroll => "scroll",
            ActionKind::Screenshot => "screenshot",
            ActionKind::Done => "done",
        }
    }

    /// Whether a successful run appends an [`crate::core::ExecutionResult`]
    pub fn produces_result(&self) -> bool {
        matches!(self, ActionKind::ExtractText | ActionKind::Screenshot)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = PilotError;

    fn from_str(s: &str) -> Result<Self> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| PilotError::UnsupportedAction(s.to_string()))
    }
}

/// Untyped `{action, args}` instruction as it arrives on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawInstruction {
    pub action: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl RawInstruction {
    pub fn new(action: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            action: action.into(),
            args,
        }
    }

    /// Whether this is the `done` sentinel
    pub fn is_done(&self) -> bool {
        self.action == ActionKind::Done.as_str()
    }

    /// JSON value form, as fed to the validator
    pub fn to_value(&self) -> Value {
        serde_json::json!({ "action": self.action, "args": self.args })
    }

    /// Args rendered for diagnostics
    pub fn args_display(&self) -> String {
        Value::Object(self.args.clone()).to_string()
    }
}

impl From<ToolCall> for RawInstruction {
    fn from(call: ToolCall) -> Self {
        let args = match call.arguments {
            Value::Object(map) => map,
            // Some models send arguments as an encoded JSON string
            Value::String(encoded) => match serde_json::from_str::<Value>(&encoded) {
                Ok(Value::Object(map)) => map,
                _ => Map::new(),
            },
            _ => Map::new(),
        };
        Self::new(call.name, args)
    }
}

impl From<&RawInstruction> for ToolCall {
    fn from(raw: &RawInstruction) -> Self {
        ToolCall::new(raw.action.clone(), Value::Object(raw.args.clone()))
    }
}

/// A schema-valid instruction with typed arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "args", rename_all = "snake_case")]
pub enum Instruction {
    Navigate {
        url: String,
    },
    Click {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
    },
    Fill {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
    },
    Wait {
        #[serde(deserialize_with = "whole_u64")]
        timeout_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
    },
    ExtractText {
        selector: String,
    },
    Scroll {
        #[serde(deserialize_with = "whole_i64")]
        dx: i64,
        #[serde(deserialize_with = "whole_i64")]
        dy: i64,
    },
    Screenshot {
        path: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
    },
    Done {},
}

/// JSON Schema counts `300.0` as an integer, so accept any whole number
fn whole_i64<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    if let Some(n) = number.as_i64() {
        return Ok(n);
    }
    match number.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
            Ok(f as i64)
        }
        _ => Err(D::Error::custom(format!(
            "expected a whole number, got {}",
            number
        ))),
    }
}

fn whole_u64<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let n = whole_i64(deserializer)?;
    u64::try_from(n)
        .map_err(|_| D::Error::custom(format!("expected a non-negative number, got {}", n)))
}

impl Instruction {
    pub fn kind(&self) -> ActionKind {
        match self {
            Instruction::Navigate { .. } => ActionKind::Navigate,
            Instruction::Click { .. } => ActionKind::Click,
            Instruction::Fill { .. } => ActionKind::Fill,
            Instruction::Wait { .. } => ActionKind::Wait,
            Instruction::ExtractText { .. } => ActionKind::ExtractText,
            Instruction::Scroll { .. } => ActionKind::Scroll,
            Instruction::Screenshot { .. } => ActionKind::Screenshot,
            Instruction::Done {} => ActionKind::Done,
        }
    }

    /// Args rendered for diagnostics
    pub fn args_display(&self) -> String {
        serde_json::to_value(self)
            .ok()
            .and_then(|v| v.get("args").map(Value::to_string))
            .unwrap_or_default()
    }
}

impl TryFrom<RawInstruction> for Instruction {
    type Error = PilotError;

    fn try_from(raw: RawInstruction) -> Result<Self> {
        let kind: ActionKind = raw.action.parse()?;
        let value = serde_json::json!({ "action": kind.as_str(), "args": raw.args });
        serde_json::from_value(value)
            .map_err(|e| PilotError::invalid_args(kind.as_str(), e.to_string()))
    }
}

impl From<&Instruction> for RawInstruction {
    fn from(instruction: &Instruction) -> Self {
        let args = match serde_json::to_value(instruction) {
            Ok(Value::Object(mut map)) => match map.remove("args") {
                Some(Value::Object(args)) => args,
                _ => Map::new(),
            },
            _ => Map::new(),
        };
        RawInstruction::new(instruction.kind().as_str(), args)
    }
}
