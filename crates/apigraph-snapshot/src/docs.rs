//! Documentation carried over from reverted items

use apigraph_core::{Documentation, ItemBase};

/// Documentation for the copy of `visited` whose shape comes from `shape`.
///
/// When the visited item is deprecated but the item it reverts to is not,
/// the deprecation is being rolled back and its explanation is dropped.
pub fn reverted_documentation(visited: &ItemBase, shape: &ItemBase, reverted: bool) -> Documentation {
    if reverted && visited.modifiers.deprecated && !shape.modifiers.deprecated {
        visited.documentation.without_deprecation_text()
    } else {
        visited.documentation.clone()
    }
}
