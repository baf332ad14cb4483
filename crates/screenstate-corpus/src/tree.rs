//! Externally-supplied description of the state hierarchy.
//!
//! The reference description is a JSON object keyed by state name; each node
//! declares its reference images and, optionally, nested substates to any
//! depth:
//!
//! ```json
//! {
//!   "battle": {
//!     "images": [{ "id": "hud", "path": "refs/battle_hud.png" }],
//!     "substates": {
//!       "intro": { "images": [{ "id": "splash", "path": "refs/intro.png" }] }
//!     }
//!   }
//! }
//! ```

use std::fmt;
use std::path::PathBuf;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;

/// A declared reference image: stable identifier plus a path resolved by the
/// image loader (relative to its base directory).
#[derive(Clone, Debug, Deserialize)]
pub struct ImageDecl {
    /// Identifier, unique within the owning state.
    pub id: String,
    /// Image location.
    pub path: PathBuf,
}

/// One node of the state hierarchy.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StateNode {
    /// Reference images declared directly on this node.
    #[serde(default)]
    pub images: Vec<ImageDecl>,
    /// Nested substates, in declaration order.
    #[serde(default)]
    pub substates: StateMap,
}

/// An insertion-ordered map of state name to [`StateNode`].
///
/// Declaration order decides the classifier's scan order, so this type keeps
/// entries in the order they appear in the JSON document. A hash map with
/// unspecified iteration order would make first-match-wins nondeterministic.
#[derive(Clone, Debug, Default)]
pub struct StateMap {
    entries: Vec<(String, StateNode)>,
}

impl StateMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of states at this level.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no states are declared at this level.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate states in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StateNode)> {
        self.entries.iter().map(|(name, node)| (name.as_str(), node))
    }

    /// Look up a state by name.
    pub fn get(&self, name: &str) -> Option<&StateNode> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, node)| node)
    }

    /// Append a state, for programmatic construction. Returns `false` and
    /// leaves the map unchanged when the name is already taken.
    pub fn insert(&mut self, name: impl Into<String>, node: StateNode) -> bool {
        let name = name.into();
        if self.get(&name).is_some() {
            return false;
        }
        self.entries.push((name, node));
        true
    }
}

impl<'de> Deserialize<'de> for StateMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StateMapVisitor;

        impl<'de> Visitor<'de> for StateMapVisitor {
            type Value = StateMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of state name to state node")
            }

            fn visit_map<A>(self, mut access: A) -> Result<StateMap, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut map = StateMap::new();
                while let Some((name, node)) = access.next_entry::<String, StateNode>()? {
                    if !map.insert(name.clone(), node) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate state name `{name}`"
                        )));
                    }
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(StateMapVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_order_preserved() {
        let json = r#"{
            "zulu": {},
            "alpha": {},
            "mike": {}
        }"#;
        let map: StateMap = serde_json::from_str(json).unwrap();
        let names: Vec<&str> = map.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["zulu", "alpha", "mike"]);
    }

    #[test]
    fn test_nested_substates_parse() {
        let json = r#"{
            "battle": {
                "images": [{ "id": "hud", "path": "refs/hud.png" }],
                "substates": {
                    "intro": {
                        "substates": {
                            "confirm": { "images": [{ "id": "ok", "path": "refs/ok.png" }] }
                        }
                    }
                }
            }
        }"#;
        let map: StateMap = serde_json::from_str(json).unwrap();
        let battle = map.get("battle").unwrap();
        assert_eq!(battle.images.len(), 1);
        assert_eq!(battle.images[0].id, "hud");
        let intro = battle.substates.get("intro").unwrap();
        assert!(intro.images.is_empty());
        let confirm = intro.substates.get("confirm").unwrap();
        assert_eq!(confirm.images[0].path, PathBuf::from("refs/ok.png"));
    }

    #[test]
    fn test_duplicate_state_name_rejected() {
        let json = r#"{ "menu": {}, "menu": {} }"#;
        let err = serde_json::from_str::<StateMap>(json).unwrap_err();
        assert!(err.to_string().contains("duplicate state name"));
    }

    #[test]
    fn test_missing_fields_default_empty() {
        let map: StateMap = serde_json::from_str(r#"{ "menu": {} }"#).unwrap();
        let menu = map.get("menu").unwrap();
        assert!(menu.images.is_empty());
        assert!(menu.substates.is_empty());
    }

    #[test]
    fn test_programmatic_insert_rejects_duplicates() {
        let mut map = StateMap::new();
        assert!(map.insert("menu", StateNode::default()));
        assert!(!map.insert("menu", StateNode::default()));
        assert_eq!(map.len(), 1);
    }
}
