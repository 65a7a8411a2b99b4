//! # Insertion Anchors
//!
//! Two document positions computed once per run, before any mutation:
//!
//! - **furtherUp**: where identity-level sections (`name`, `description`,
//!   `url`) go, keeping them next to the coordinates at the top of the
//!   descriptor.
//! - **furtherDown**: where release-machinery sections (`scm`, `licenses`,
//!   `distributionManagement`, `developers`, a created `build`) go,
//!   keeping them grouped ahead of the build definition.
//!
//! Each anchor is the first match of a priority list over the
//! pre-mutation document. Apply steps mutate the tree, so evaluating the
//! lists lazily would make the answer depend on which steps already ran;
//! computing both anchors up front keeps insertion positions stable for
//! the whole run, including across the legacy-repositories cleanup.

use crate::xml::{Document, Position};

/// Anchor positions for creating new top-level sections.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertionAnchors {
    /// Preferred position for `name`, `description`, and `url`.
    pub further_up: Position,
    /// Preferred position for `scm`, `licenses`, `distributionManagement`,
    /// `developers`, and a created `build`.
    pub further_down: Position,
}

impl InsertionAnchors {
    /// Evaluate both priority lists against the pre-mutation document.
    pub fn compute(doc: &Document) -> Self {
        let root = doc.root();

        let further_up = if root.has_child("properties") {
            Position::Before("properties".to_string())
        } else if root.has_child("description") {
            Position::After("description".to_string())
        } else if root.has_child("name") {
            Position::After("name".to_string())
        } else if root.has_child("packaging") {
            Position::After("packaging".to_string())
        } else if root.has_child("version") {
            Position::After("version".to_string())
        } else {
            Position::Last
        };

        let further_down = if root.has_child("build") {
            Position::Before("build".to_string())
        } else if root.has_child("profiles") {
            Position::Before("profiles".to_string())
        } else {
            Position::Last
        };

        InsertionAnchors {
            further_up,
            further_down,
        }
    }
}
