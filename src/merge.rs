//! Splices framework guidelines into the base prompt.

use regex::{NoExpand, Regex};
use std::sync::LazyLock;

const SLOT_OPEN: &str = "{{SLOT:guidelines}}";
const SLOT_CLOSE: &str = "{{/SLOT:guidelines}}";
const SEPARATOR: &str = "\n\n---\n\n";

static GUIDELINES_SLOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{\{SLOT:guidelines\}\}.*?\{\{/SLOT:guidelines\}\}")
        .expect("slot pattern is valid")
});

/// Replaces the body of the guidelines slot in `base` with `extras`.
///
/// Extras are trimmed and joined by a horizontal rule. The slot markers are
/// kept so the result can be merged again. `base` is returned unchanged when
/// `extras` is empty or it has no slot.
pub fn merge_guidelines(base: &str, extras: &[String]) -> String {
    if extras.is_empty() {
        return base.to_string();
    }

    let joined = extras
        .iter()
        .map(|extra| extra.trim())
        .collect::<Vec<_>>()
        .join(SEPARATOR);
    let replacement = format!("{SLOT_OPEN}\n\n{joined}\n\n{SLOT_CLOSE}");

    GUIDELINES_SLOT
        .replacen(base, 1, NoExpand(&replacement))
        .into_owned()
}
