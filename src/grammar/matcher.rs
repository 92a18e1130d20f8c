//! The matcher sum type and its structural labels.

use std::fmt;
use std::rc::Rc;

use crate::chars::{CharacterSet, ANY, EMPTY, EOI};
use crate::errors::EngineError;
use crate::grammar::{MatcherFlags, RuleId};
use crate::runtime::context::ActionContext;

/// A user-supplied predicate over the current matcher context. Returning
/// `Ok(false)` is an ordinary parse failure; an `Err` aborts the parse.
pub type ActionFn<V> = Rc<dyn Fn(&mut ActionContext<'_, V>) -> Result<bool, EngineError>>;

/// One node of the matcher graph.
pub struct Matcher<V> {
    /// Explicit label; `None` falls back to the structural description.
    pub label: Option<String>,
    pub flags: MatcherFlags,
    pub kind: MatcherKind<V>,
}

/// The closed set of combinators understood by the engine, dispatched by a
/// single match operation. Composites hold arena indices, so cycles
/// through rule references are ordinary data.
pub enum MatcherKind<V> {
    /// A single character. The sentinels are matched per their special
    /// semantics: `ANY` consumes any real character, `EMPTY` succeeds
    /// without consuming, `EOI` succeeds only at the virtual end position.
    Char(char),
    /// Any one character of the set.
    CharSet(CharacterSet),
    /// Any one character in the inclusive range.
    CharRange(char, char),
    /// A fixed character sequence.
    Literal(String),
    /// The first of several fixed character sequences, tried in order,
    /// producing a single leaf.
    FirstOfLiterals(Vec<String>),
    Sequence(Vec<RuleId>),
    /// Ordered choice: first success commits.
    FirstOf(Vec<RuleId>),
    ZeroOrMore(RuleId),
    OneOrMore(RuleId),
    Optional(RuleId),
    /// Positive lookahead.
    Test(RuleId),
    /// Negative lookahead.
    TestNot(RuleId),
    /// A user predicate over the value stack and context snapshot.
    Action(ActionFn<V>),
    /// Lazily resolved reference to another rule.
    Proxy(ProxyTarget),
}

/// Target of a proxy matcher; names resolve to rule ids when the grammar
/// is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyTarget {
    Named(String),
    Resolved(RuleId),
}

impl<V> MatcherKind<V> {
    /// The structural description used when no explicit label is set.
    pub fn default_label(&self) -> String {
        match self {
            MatcherKind::Char(c) => match *c {
                EOI => "EOI".to_string(),
                ANY => "ANY".to_string(),
                EMPTY => "EMPTY".to_string(),
                c => format!("'{}'", c),
            },
            MatcherKind::CharSet(set) => set.to_string(),
            MatcherKind::CharRange(lo, hi) => format!("'{}'..'{}'", lo, hi),
            MatcherKind::Literal(text) => format!("\"{}\"", text),
            MatcherKind::FirstOfLiterals(options) => options
                .iter()
                .map(|text| format!("\"{}\"", text))
                .collect::<Vec<_>>()
                .join(" | "),
            MatcherKind::Sequence(_) => "Sequence".to_string(),
            MatcherKind::FirstOf(_) => "FirstOf".to_string(),
            MatcherKind::ZeroOrMore(_) => "ZeroOrMore".to_string(),
            MatcherKind::OneOrMore(_) => "OneOrMore".to_string(),
            MatcherKind::Optional(_) => "Optional".to_string(),
            MatcherKind::Test(_) => "Test".to_string(),
            MatcherKind::TestNot(_) => "TestNot".to_string(),
            MatcherKind::Action(_) => "Action".to_string(),
            MatcherKind::Proxy(ProxyTarget::Named(name)) => name.clone(),
            MatcherKind::Proxy(ProxyTarget::Resolved(_)) => "Proxy".to_string(),
        }
    }

    /// True for matchers that consume input directly; only these
    /// contribute to the "expected one of" set of a parse failure.
    pub(crate) fn is_terminal(&self) -> bool {
        matches!(
            self,
            MatcherKind::Char(_)
                | MatcherKind::CharSet(_)
                | MatcherKind::CharRange(_, _)
                | MatcherKind::Literal(_)
                | MatcherKind::FirstOfLiterals(_)
        )
    }
}

impl<V> fmt::Debug for MatcherKind<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatcherKind::Action(_) => write!(f, "Action(..)"),
            other => write!(f, "{}", other.default_label()),
        }
    }
}

impl<V> fmt::Debug for Matcher<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matcher")
            .field("label", &self.label)
            .field("flags", &self.flags)
            .field("kind", &self.kind)
            .finish()
    }
}
