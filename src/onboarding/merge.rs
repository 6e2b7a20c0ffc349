//! Field-level merge of partial documents.
//!
//! The one merge used everywhere: the controller overlays step drafts onto
//! the cumulative record with it, and the store backend applies partial
//! writes with it. Sequential partial writes accumulate; they never replace.

use serde_json::{Map, Value};

/// A JSON document (or partial document) keyed by top-level field name.
pub type Fields = Map<String, Value>;

/// Overlay `patch` onto `target`.
///
/// Every key present in `patch` overwrites the same key in `target`
/// (including explicit `null`s). Keys absent from `patch` are untouched.
pub fn merge_fields(target: &mut Fields, patch: &Fields) {
    for (key, value) in patch {
        target.insert(key.clone(), value.clone());
    }
}
