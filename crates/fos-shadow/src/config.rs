//! Composition Configuration

use serde::{Deserialize, Serialize};

/// Shadow composition options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Local name of slot elements
    pub slot_tag: String,

    /// Reserved boolean attribute marking an element as undistributed
    pub undistributed_attr: String,

    /// Maximum nesting followed when flattening slot assignments
    pub max_flatten_depth: usize,
}

impl Config {
    /// Global style rule that keeps undistributed elements out of rendering.
    pub fn undistributed_style_rule(&self) -> String {
        format!("[{}] {{ display: none !important; }}", self.undistributed_attr)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            slot_tag: "slot".to_string(),
            undistributed_attr: "shady-undistributed".to_string(),
            max_flatten_depth: 32,
        }
    }
}
