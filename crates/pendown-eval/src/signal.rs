//! Block execution outcomes.

use crate::value::TypedValue;
use serde::Serialize;

/// How a block's execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessResult {
    Success,
    Break,
    Return,
    Halt,
}

/// The signal produced by every block execution, with an optional payload
/// (the value of `output`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnValue {
    pub result: ProcessResult,
    pub value: Option<TypedValue>,
}

impl ReturnValue {
    pub const SUCCESS: ReturnValue = ReturnValue::bare(ProcessResult::Success);
    pub const BREAK: ReturnValue = ReturnValue::bare(ProcessResult::Break);
    pub const RETURN: ReturnValue = ReturnValue::bare(ProcessResult::Return);
    pub const HALT: ReturnValue = ReturnValue::bare(ProcessResult::Halt);

    const fn bare(result: ProcessResult) -> Self {
        Self {
            result,
            value: None,
        }
    }

    /// A RETURN carrying an output value.
    pub fn output(value: TypedValue) -> Self {
        Self {
            result: ProcessResult::Return,
            value: Some(value),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == ProcessResult::Success
    }

    pub fn is_halt(&self) -> bool {
        self.result == ProcessResult::Halt
    }
}
