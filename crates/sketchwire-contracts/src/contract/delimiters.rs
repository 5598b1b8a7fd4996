//! Section markers the generation model is instructed to echo verbatim.
//!
//! These literals are a wire contract shared by prompt construction
//! (`sketchwire-engine`) and [`super::parser`]. Changing any marker requires a
//! version bump and a matching prompt update; the two sides must never drift.

pub const CONTRACT_VERSION: u64 = 1;

pub const HTML_START: &str = "<<<HTML_START>>>";
pub const HTML_END: &str = "<<<HTML_END>>>";

pub const REACT_START: &str = "<<<REACT_START>>>";
pub const REACT_END: &str = "<<<REACT_END>>>";

pub const EXPLANATION_START: &str = "<<<EXPLANATION_START>>>";
pub const EXPLANATION_END: &str = "<<<EXPLANATION_END>>>";
