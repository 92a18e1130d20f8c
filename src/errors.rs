//! Fatal engine errors and the parse-failure diagnostic.
//!
//! Ordinary parse failures are data, not control flow: the engine returns
//! them inside the parsing result so the caller can inspect the deepest
//! reached location. Everything in this module is for the fatal cases
//! (grammar construction defects, action failures, runtime safety checks)
//! and for rendering a parse failure as a diagnostic when the caller wants
//! one.

use std::sync::Arc;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// The unified error type of the engine. All variants are fatal except
/// [`EngineError::ParseFailed`], which is only ever constructed on request
/// from a parsing result.
#[derive(Error, Diagnostic, Debug)]
pub enum EngineError {
    #[error("parse failed: expected {}", format_expected(.expected))]
    #[diagnostic(code(stitch::parse::failed))]
    ParseFailed {
        expected: Vec<String>,
        found: String,
        #[source_code]
        src: Arc<NamedSource<String>>,
        #[label("{found} found here")]
        span: SourceSpan,
    },

    #[error("action failed in '{path}': {message}")]
    #[diagnostic(code(stitch::action::failed))]
    ActionFailed {
        path: String,
        message: String,
        #[source_code]
        src: Arc<NamedSource<String>>,
        #[label("while matching here")]
        span: SourceSpan,
    },

    #[error("rule reference '{name}' was never defined")]
    #[diagnostic(
        code(stitch::grammar::unresolved_rule),
        help("define the rule before calling build(), or remove the reference")
    )]
    UnresolvedRule { name: String },

    #[error("start rule '{name}' is not defined in this grammar")]
    #[diagnostic(code(stitch::grammar::undefined_start))]
    UndefinedStartRule { name: String },

    #[error("rule '{name}' is defined more than once")]
    #[diagnostic(code(stitch::grammar::duplicate_rule))]
    DuplicateRule { name: String },

    #[error("the inner rule of repetition '{label}' must not match empty input")]
    #[diagnostic(
        code(stitch::runtime::zero_width_repetition),
        help("a repetition over a matcher that succeeds without consuming input would loop forever")
    )]
    ZeroWidthRepetition {
        label: String,
        #[source_code]
        src: Arc<NamedSource<String>>,
        #[label("looping here")]
        span: SourceSpan,
    },

    #[error("recursion limit of {limit} exceeded")]
    #[diagnostic(
        code(stitch::runtime::recursion_limit),
        help("the grammar is likely left-recursive; raise the limit only if rule nesting is genuinely this deep")
    )]
    RecursionLimit { limit: usize },
}

fn format_expected(expected: &[String]) -> String {
    match expected {
        [] => "nothing matched".to_string(),
        [single] => single.clone(),
        many => format!("one of {}", many.join(", ")),
    }
}
