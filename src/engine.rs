//! The driver: seeds the root context, runs the start rule, and packages
//! the outcome.
//!
//! A parse failure is an ordinary outcome, carried inside the result so
//! the caller can inspect the deepest reached location; only grammar
//! defects, action errors, and runtime safety violations surface as
//! `Err`.

use miette::SourceSpan;
use serde::{Deserialize, Serialize};

use crate::chars::EOI;
use crate::errors::EngineError;
use crate::grammar::Grammar;
use crate::input::{InputBuffer, InputLocation};
use crate::runtime::context::{MatcherContext, ParseState};
use crate::runtime::matching::run_matcher;
use crate::tree::ParseNode;

/// Upper bound on nested matcher invocations. Generous for real grammars;
/// a left-recursive grammar hits it instead of blowing the stack.
const DEFAULT_MAX_DEPTH: usize = 1024;

/// Runs parses of one grammar. The grammar itself is immutable and may
/// back any number of runners; each parse gets a fresh root context and
/// value stack.
pub struct ParseRunner<'g, V> {
    grammar: &'g Grammar<V>,
    max_depth: usize,
}

impl<'g, V> ParseRunner<'g, V> {
    pub fn new(grammar: &'g Grammar<V>) -> Self {
        Self {
            grammar,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Runs the start rule against the input and packages the resulting
    /// tree, value-stack snapshot, and failure diagnostic.
    pub fn run(&self, input: InputBuffer) -> Result<ParsingResult<V>, EngineError> {
        let mut state = ParseState::new(&input, self.max_depth);
        let mut root = MatcherContext::at(InputLocation::start(&input));

        let matched = run_matcher(self.grammar, self.grammar.start_rule(), &mut state, &mut root)?;

        let ParseState {
            stack,
            deepest,
            expected,
            ..
        } = state;
        let failure = if matched {
            None
        } else {
            Some(ParseFailure {
                location: deepest,
                expected,
            })
        };
        Ok(ParsingResult {
            matched,
            root: root.sub_nodes.into_iter().next(),
            values: stack.into_values(),
            input,
            failure,
        })
    }
}

/// Parses with the default runner configuration.
pub fn parse<V>(grammar: &Grammar<V>, input: InputBuffer) -> Result<ParsingResult<V>, EngineError> {
    ParseRunner::new(grammar).run(input)
}

/// The outcome of one parse.
#[derive(Debug)]
pub struct ParsingResult<V> {
    pub matched: bool,
    /// The single root child of the root context; `None` on failure or
    /// when the start rule suppresses its node.
    pub root: Option<ParseNode<V>>,
    /// Final value stack, bottom to top.
    pub values: Vec<V>,
    pub input: InputBuffer,
    pub failure: Option<ParseFailure>,
}

/// Where a failed parse got stuck: the deepest input location reached and
/// the labels of the terminal matchers that failed there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseFailure {
    pub location: InputLocation,
    pub expected: Vec<String>,
}

impl<V> ParsingResult<V> {
    /// Renders the parse failure, if any, as a diagnostic over the input.
    pub fn failure_report(&self) -> Option<EngineError> {
        let failure = self.failure.as_ref()?;
        let offset = self.input.byte_offset(failure.location.index);
        let (found, width) = match failure.location.current_char {
            EOI => ("end of input".to_string(), 0),
            c => (format!("'{}'", c), c.len_utf8()),
        };
        Some(EngineError::ParseFailed {
            expected: failure.expected.clone(),
            found,
            src: self.input.to_named_source(),
            span: SourceSpan::from(offset..offset + width),
        })
    }
}
