// SPDX-License-Identifier: MIT OR Apache-2.0
//! Authored scene content carried by each node.
//!
//! [`SceneForm`] mirrors the form-data record the scene editor produces and the
//! graph file stores under `form_data`:
//!
//! ```json
//! { "scene_type": "INT.", "name": "KITCHEN", "time_description": "NIGHT",
//!   "in_scene": "FADE IN", "out_scene": "CUT TO", "background": "...",
//!   "items": [ { "type": "dialog", "order": 1, "character": "Alice",
//!                "parentheticals": "whispering", "text": "Hello" } ] }
//! ```
//!
//! Renderers consume this shape verbatim, so serialization here is part of the
//! exported JSON contract.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Interior or exterior scene marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SceneType {
    /// Interior
    #[default]
    #[serde(rename = "INT.", alias = "INT")]
    Int,
    /// Exterior
    #[serde(rename = "EXT.", alias = "EXT")]
    Ext,
}

impl SceneType {
    /// Screenplay prefix for this scene type
    pub fn as_str(&self) -> &'static str {
        match self {
            SceneType::Int => "INT.",
            SceneType::Ext => "EXT.",
        }
    }
}

impl fmt::Display for SceneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transition leading into a scene
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InTransition {
    /// No transition
    #[default]
    None,
    /// `FADE IN:`
    FadeIn,
    /// Free-text transition
    Custom(String),
}

impl InTransition {
    /// Text written to the form-data record
    pub fn as_str(&self) -> &str {
        match self {
            InTransition::None => "",
            InTransition::FadeIn => "FADE IN",
            InTransition::Custom(text) => text,
        }
    }

    /// Screenplay line for this transition, if one is printed
    pub fn cue(&self) -> Option<String> {
        match self {
            InTransition::None => None,
            InTransition::FadeIn => Some("FADE IN:".to_string()),
            InTransition::Custom(text) => Some(format!("{text}:")),
        }
    }
}

impl From<String> for InTransition {
    fn from(value: String) -> Self {
        match value.trim() {
            "" | "None" | "Other" => InTransition::None,
            "FADE IN" => InTransition::FadeIn,
            _ => InTransition::Custom(value),
        }
    }
}

impl From<InTransition> for String {
    fn from(value: InTransition) -> Self {
        match value {
            InTransition::Custom(text) => text,
            other => other.as_str().to_string(),
        }
    }
}

/// Transition leading out of a scene
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OutTransition {
    /// No transition
    #[default]
    None,
    /// `CUT TO:`
    CutTo,
    /// `DISSOLVE TO:`
    DissolveTo,
    /// `FADE OUT:`
    FadeOut,
    /// Free-text transition
    Custom(String),
}

impl OutTransition {
    /// Text written to the form-data record
    pub fn as_str(&self) -> &str {
        match self {
            OutTransition::None => "",
            OutTransition::CutTo => "CUT TO",
            OutTransition::DissolveTo => "DISSOLVE TO",
            OutTransition::FadeOut => "FADE OUT",
            OutTransition::Custom(text) => text,
        }
    }

    /// Screenplay line for this transition, if one is printed
    pub fn cue(&self) -> Option<String> {
        match self {
            OutTransition::None => None,
            other => Some(format!("{}:", other.as_str())),
        }
    }
}

impl From<String> for OutTransition {
    fn from(value: String) -> Self {
        match value.trim() {
            "" | "None" | "Other" => OutTransition::None,
            "CUT TO" => OutTransition::CutTo,
            "DISSOLVE TO" => OutTransition::DissolveTo,
            "FADE OUT" => OutTransition::FadeOut,
            _ => OutTransition::Custom(value),
        }
    }
}

impl From<OutTransition> for String {
    fn from(value: OutTransition) -> Self {
        match value {
            OutTransition::Custom(text) => text,
            other => other.as_str().to_string(),
        }
    }
}

/// One line of authored content inside a scene
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentItem {
    /// A character speaking
    Dialog {
        /// Position assigned by the editor (1-based)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        order: Option<u32>,
        /// Speaking character
        #[serde(default)]
        character: String,
        /// Delivery note, printed in parentheses
        #[serde(default)]
        parentheticals: String,
        /// Spoken line
        text: String,
    },
    /// Scene description
    Action {
        /// Position assigned by the editor (1-based)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        order: Option<u32>,
        /// Action text
        text: String,
    },
}

impl ContentItem {
    /// Create a dialog line
    pub fn dialog(character: impl Into<String>, text: impl Into<String>) -> Self {
        ContentItem::Dialog {
            order: None,
            character: character.into(),
            parentheticals: String::new(),
            text: text.into(),
        }
    }

    /// Create an action line
    pub fn action(text: impl Into<String>) -> Self {
        ContentItem::Action {
            order: None,
            text: text.into(),
        }
    }

    /// Set the parenthetical (dialog only)
    pub fn with_parentheticals(mut self, value: impl Into<String>) -> Self {
        if let ContentItem::Dialog { parentheticals, .. } = &mut self {
            *parentheticals = value.into();
        }
        self
    }

    /// Set the editor order
    pub fn with_order(mut self, value: u32) -> Self {
        match &mut self {
            ContentItem::Dialog { order, .. } | ContentItem::Action { order, .. } => {
                *order = Some(value);
            }
        }
        self
    }

    /// Item type tag as written in form data
    pub fn type_label(&self) -> &'static str {
        match self {
            ContentItem::Dialog { .. } => "dialog",
            ContentItem::Action { .. } => "action",
        }
    }

    /// Editor order, if recorded
    pub fn order(&self) -> Option<u32> {
        match self {
            ContentItem::Dialog { order, .. } | ContentItem::Action { order, .. } => *order,
        }
    }

    /// Body text
    pub fn text(&self) -> &str {
        match self {
            ContentItem::Dialog { text, .. } | ContentItem::Action { text, .. } => text,
        }
    }
}

/// Scene data edited through the node form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneForm {
    /// Interior/exterior
    pub scene_type: SceneType,
    /// Scene location name
    pub name: String,
    /// Time of day, e.g. `NIGHT`
    pub time_description: String,
    /// Transition into the scene
    pub in_scene: InTransition,
    /// Transition out of the scene
    pub out_scene: OutTransition,
    /// Setting description
    pub background: String,
    /// Dialog and action lines, in authored order
    pub items: Vec<ContentItem>,
}

impl SceneForm {
    /// Create a form for a named location
    pub fn new(scene_type: SceneType, name: impl Into<String>) -> Self {
        Self {
            scene_type,
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the time of day
    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time_description = time.into();
        self
    }

    /// Set the background description
    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background = background.into();
        self
    }

    /// Set the transitions
    pub fn with_transitions(mut self, in_scene: InTransition, out_scene: OutTransition) -> Self {
        self.in_scene = in_scene;
        self.out_scene = out_scene;
        self
    }

    /// Append a content item
    pub fn with_item(mut self, item: ContentItem) -> Self {
        self.items.push(item);
        self
    }

    /// Location key used for scene continuity: `"{scene_type} {name}"`, trimmed
    pub fn location(&self) -> String {
        format!("{} {}", self.scene_type, self.name).trim().to_string()
    }

    /// Whether the location is only the `INT.`/`EXT.` placeholder
    pub fn has_placeholder_location(&self) -> bool {
        self.name.trim().is_empty()
    }

    /// A form nobody has filled in
    pub fn is_blank(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_wire_strings() {
        assert_eq!(InTransition::from("None".to_string()), InTransition::None);
        assert_eq!(InTransition::from("Other".to_string()), InTransition::None);
        assert_eq!(InTransition::from("FADE IN".to_string()), InTransition::FadeIn);
        assert_eq!(
            InTransition::from("SMASH IN".to_string()),
            InTransition::Custom("SMASH IN".to_string())
        );

        assert_eq!(OutTransition::from("DISSOLVE TO".to_string()), OutTransition::DissolveTo);
        assert_eq!(OutTransition::from(String::new()), OutTransition::None);
        assert_eq!(OutTransition::CutTo.cue().as_deref(), Some("CUT TO:"));
        assert_eq!(
            OutTransition::Custom("MATCH CUT".to_string()).cue().as_deref(),
            Some("MATCH CUT:")
        );
        assert_eq!(OutTransition::None.cue(), None);
    }

    #[test]
    fn test_form_data_shape() {
        let json = r#"{
            "scene_type": "EXT.",
            "name": "ตลาดน้ำ",
            "time_description": "DAY",
            "in_scene": "FADE IN",
            "out_scene": "",
            "background": "Boats drift by.",
            "items": [
                {"type": "dialog", "order": 1, "character": "Alice", "parentheticals": "", "text": "Hi"},
                {"type": "action", "order": 2, "text": "She waves."}
            ]
        }"#;

        let form: SceneForm = serde_json::from_str(json).unwrap();
        assert_eq!(form.scene_type, SceneType::Ext);
        assert_eq!(form.in_scene, InTransition::FadeIn);
        assert_eq!(form.out_scene, OutTransition::None);
        assert_eq!(form.items.len(), 2);
        assert_eq!(form.items[1].type_label(), "action");
        assert_eq!(form.location(), "EXT. ตลาดน้ำ");

        let value = serde_json::to_value(&form).unwrap();
        assert_eq!(value["in_scene"], "FADE IN");
        assert_eq!(value["items"][0]["type"], "dialog");
        assert_eq!(value["items"][0]["order"], 1);
    }

    #[test]
    fn test_empty_form_data_is_blank() {
        let form: SceneForm = serde_json::from_str("{}").unwrap();
        assert!(form.is_blank());
        assert_eq!(form.location(), "INT.");
        assert!(form.has_placeholder_location());
    }

    #[test]
    fn test_unknown_item_type_is_rejected() {
        let json = r#"{"items": [{"type": "song", "text": "la la"}]}"#;
        assert!(serde_json::from_str::<SceneForm>(json).is_err());
    }

    #[test]
    fn test_item_missing_text_is_rejected() {
        let json = r#"{"items": [{"type": "action", "order": 1}]}"#;
        assert!(serde_json::from_str::<SceneForm>(json).is_err());
    }
}
