//! Rewrite passes run over translated functions.

pub mod expand_casts;

pub use expand_casts::ExpandCasts;
