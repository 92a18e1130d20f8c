//! stitch, a PEG matcher runtime.
//!
//! Grammars are built as arenas of matcher combinators, executed by a
//! plain recursive-descent match operation, and produce typed parse trees
//! plus whatever values grammar actions compute on the shared value stack.

pub use crate::errors::EngineError;

pub mod chars;
pub mod engine;
pub mod errors;
pub mod grammar;
pub mod input;
pub mod runtime;
pub mod tree;

/// The types almost every consumer needs.
pub mod prelude {
    pub use crate::chars::CharacterSet;
    pub use crate::engine::{parse, ParseFailure, ParseRunner, ParsingResult};
    pub use crate::errors::EngineError;
    pub use crate::grammar::{Grammar, GrammarBuilder, MatcherFlags, RuleId};
    pub use crate::input::{InputBuffer, InputLocation};
    pub use crate::runtime::{ActionContext, ValueStack};
    pub use crate::tree::ParseNode;
}
