// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph variables.

use crate::serialized::SerializedVariable;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which namespace a variable lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableScope {
    /// Graph input
    Input,
    /// Graph output
    Output,
    /// Local variable
    Local,
}

/// A named, typed value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// Name, unique across all scopes of a graph
    pub name: String,
    /// Type name
    pub var_type: String,
    /// Current value
    pub value: Value,
}

impl Variable {
    /// Create a variable
    pub fn new(name: impl Into<String>, var_type: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            var_type: var_type.into(),
            value,
        }
    }
}

impl From<&Variable> for SerializedVariable {
    fn from(v: &Variable) -> Self {
        SerializedVariable(v.name.clone(), v.var_type.clone(), v.value.clone())
    }
}

impl From<&SerializedVariable> for Variable {
    fn from(v: &SerializedVariable) -> Self {
        Variable::new(v.0.clone(), v.1.clone(), v.2.clone())
    }
}
