//! Upgrade-safety queries: constructors and initialized state

use crate::syntax::{children, descendants, ParsedSource};

pub(crate) fn has_constructor(parsed: &ParsedSource<'_>) -> bool {
    descendants(parsed.root()).any(|n| n.kind() == "constructor_definition")
}

/// Mutable state variables given a value at declaration, in source order
pub(crate) fn initialized_state_variables(parsed: &ParsedSource<'_>) -> Vec<String> {
    descendants(parsed.root())
        .filter(|n| n.kind() == "state_variable_declaration")
        .filter(|n| n.child_by_field_name("value").is_some())
        .filter(|n| !children(*n).any(|c| matches!(c.kind(), "constant" | "immutable")))
        .map(|n| parsed.field_text(n, "name").to_string())
        .collect()
}
