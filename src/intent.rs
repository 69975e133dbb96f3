//! Patch intents: what to change, as decided by an external rule engine.
//!
//! The wire shape is the camelCase JSON produced upstream:
//!
//! ```json
//! {
//!   "type": "touch-target",
//!   "targetElement": "button",
//!   "targetSelector": ".btn-base",
//!   "changes": [{ "property": "min-height", "value": "44px", "action": "modify" }],
//!   "priority": 9,
//!   "status": "pending"
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Add,
    #[default]
    Modify,
    Remove,
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeAction::Add => "add",
            ChangeAction::Modify => "modify",
            ChangeAction::Remove => "remove",
        };
        f.write_str(name)
    }
}

/// One property-level edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyChange {
    pub property: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub action: ChangeAction,
}

impl PropertyChange {
    pub fn new(property: impl Into<String>, value: impl Into<String>, action: ChangeAction) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
            action,
        }
    }

    pub fn modify(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(property, value, ChangeAction::Modify)
    }

    pub fn add(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(property, value, ChangeAction::Add)
    }

    pub fn remove(property: impl Into<String>) -> Self {
        Self::new(property, "", ChangeAction::Remove)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchIntent {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Generic element identifier, used when no selector is given.
    #[serde(default)]
    pub target_element: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_selector: Option<String>,
    #[serde(default)]
    pub changes: Vec<PropertyChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl PatchIntent {
    pub fn new(selector: impl Into<String>, changes: Vec<PropertyChange>) -> Self {
        Self {
            kind: None,
            target_element: String::new(),
            target_selector: Some(selector.into()),
            changes,
            priority: None,
            status: None,
        }
    }

    /// Intent addressed only by a generic element identifier.
    pub fn for_element(element: impl Into<String>, changes: Vec<PropertyChange>) -> Self {
        Self {
            target_element: element.into(),
            target_selector: None,
            ..Self::new("", changes)
        }
    }

    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    /// The selector to act on: `targetSelector` when non-blank, else
    /// `targetElement`.
    pub fn target(&self) -> Option<&str> {
        self.target_selector
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| Some(self.target_element.trim()).filter(|s| !s.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_defaults_to_modify() {
        let intent = PatchIntent::from_json(
            r#"{"targetElement":"button","changes":[{"property":"min-height","value":"44px"}]}"#,
        )
        .unwrap();
        assert_eq!(intent.changes[0].action, ChangeAction::Modify);
        assert_eq!(intent.target(), Some("button"));
    }

    #[test]
    fn test_selector_preferred_over_element() {
        let intent = PatchIntent::from_json(
            r#"{
                "type": "touch-target",
                "targetElement": "button",
                "targetSelector": " .btn-base ",
                "changes": [{"property": "padding", "action": "remove"}],
                "priority": 9,
                "status": "pending"
            }"#,
        )
        .unwrap();
        assert_eq!(intent.kind.as_deref(), Some("touch-target"));
        assert_eq!(intent.target(), Some(".btn-base"));
        assert_eq!(intent.changes[0], PropertyChange::remove("padding"));
    }

    #[test]
    fn test_blank_selector_falls_back_to_element() {
        let intent = PatchIntent {
            target_selector: Some("   ".into()),
            ..PatchIntent::for_element("button", vec![])
        };
        assert_eq!(intent.target(), Some("button"));
        assert_eq!(PatchIntent::for_element("", vec![]).target(), None);
    }
}
