//! Centralized limits and thresholds for the translator.
//!
//! Both the instruction translator and the AST visitor are recursive over
//! trees that come from untrusted decompiler output, so each recursion has
//! an explicit ceiling.

// =============================================================================
// Recursion Depth Limits
// =============================================================================

/// Maximum nesting depth of AST nodes visited by a single traversal.
///
/// The visitor bails out with an invariant error instead of overflowing
/// the stack when a rewrite pass accidentally builds an unbounded chain.
pub const MAX_TRAVERSAL_DEPTH: usize = 2_000;

/// Maximum nesting depth of input instruction trees.
pub const MAX_TRANSLATION_DEPTH: u32 = 1_000;

/// Maximum number of base types walked when collecting inheritable proxies.
pub const MAX_BASE_TYPE_CHAIN: usize = 64;

// =============================================================================
// Capacity Limits
// =============================================================================

/// Initial arena capacity for a method body translation.
pub const DEFAULT_ARENA_CAPACITY: usize = 256;
