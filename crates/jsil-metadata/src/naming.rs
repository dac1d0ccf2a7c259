//! Name heuristics for compiler-generated implementation details.

use once_cell::sync::Lazy;
use regex::Regex;

/// `<Scope>mangling__N` names produced for lambdas and iterator state.
static GENERATED_MEMBER_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"<(?P<scope>[^>]*)>(?P<mangling>[^_]*)__(?P<index>[0-9]*)").ok());

/// Name fragments of compiler-internal types and members that are never
/// translated.
const IGNORED_FRAGMENTS: &[&str] = &[
    "<Module>",
    "__SiteContainer",
    "<PrivateImplementationDetails>",
    "Runtime.CompilerServices.CallSite",
    "__CachedAnonymousMethodDelegate",
];

/// Whether a type or member full name denotes an internal implementation
/// detail.
///
/// Lambda bodies, backing fields and display classes are compiler
/// generated but still carry user logic, so they are kept.
#[must_use]
pub fn is_ignored_name(full_name: &str) -> bool {
    if let Some(pattern) = GENERATED_MEMBER_PATTERN.as_ref() {
        if pattern.is_match(full_name) {
            return false;
        }
    }

    if full_name.ends_with("__BackingField") || full_name.contains("__DisplayClass") {
        return false;
    }

    if full_name.starts_with("CS$<") {
        return true;
    }

    IGNORED_FRAGMENTS
        .iter()
        .any(|fragment| full_name.contains(fragment))
}

/// Strip a declaring-type prefix the loader sometimes leaves on member
/// names (`IFoo.Bar`, `Outer/Inner::Baz`).
#[must_use]
pub fn short_member_name(name: &str) -> &str {
    match name.rfind(['.', '/', '+', ':']) {
        Some(idx) if idx >= 1 => &name[idx + 1..],
        _ => name,
    }
}
