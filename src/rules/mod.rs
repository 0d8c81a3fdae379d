//! Rule compilation and matching for pole.
//!
//! This module handles:
//! - Compiling rule patterns (regular expressions or placeholder globs)
//! - Parsing and rendering secret path templates
//! - Holding the ordered, immutable rule set

pub mod pattern;
pub mod ruleset;
pub mod template;

pub use pattern::{Captures, GlobPattern, Matcher, Segment};
pub use ruleset::{CompiledRule, RuleSet};
pub use template::{Template, TemplatePart};
