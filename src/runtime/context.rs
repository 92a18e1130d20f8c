//! Per-invocation matcher contexts and the view handed to user actions.

use miette::SourceSpan;

use crate::chars::EOI;
use crate::errors::EngineError;
use crate::grammar::{Grammar, MatcherKind, RuleId};
use crate::input::{InputBuffer, InputLocation};
use crate::runtime::ValueStack;
use crate::tree::{self, ParseNode};

/// The frame of one matcher invocation.
///
/// Created on entry, destroyed on return. The accumulator and value slot
/// are private to the invocation and only merged into the parent frame on
/// success, which is what makes try-and-restore structural: a failing
/// matcher simply drops its frame.
#[derive(Debug)]
pub(crate) struct MatcherContext<V> {
    pub start: InputLocation,
    pub current: InputLocation,
    pub sub_nodes: Vec<ParseNode<V>>,
    pub value: Option<V>,
}

impl<V> MatcherContext<V> {
    pub fn at(location: InputLocation) -> Self {
        Self {
            start: location,
            current: location,
            sub_nodes: Vec::new(),
            value: None,
        }
    }
}

/// Parse-wide state threaded through every invocation: the input, the
/// shared value stack, lookahead depth, the invocation trail, and the
/// deepest-failure record.
pub(crate) struct ParseState<'a, V> {
    pub buffer: &'a InputBuffer,
    pub stack: ValueStack<V>,
    pub predicate_depth: usize,
    pub trail: Vec<RuleId>,
    pub max_depth: usize,
    pub deepest: InputLocation,
    pub expected: Vec<String>,
}

impl<'a, V> ParseState<'a, V> {
    pub fn new(buffer: &'a InputBuffer, max_depth: usize) -> Self {
        Self {
            buffer,
            stack: ValueStack::new(),
            predicate_depth: 0,
            trail: Vec::new(),
            max_depth,
            deepest: InputLocation::start(buffer),
            expected: Vec::new(),
        }
    }

    /// Running-maximum tracking of the deepest failed terminal. Disabled
    /// inside predicates, where failing is expected behavior.
    pub fn record_failure(&mut self, location: InputLocation, label: String) {
        if self.predicate_depth > 0 {
            return;
        }
        if location.index > self.deepest.index {
            self.deepest = location;
            self.expected.clear();
        }
        if location.index == self.deepest.index && !self.expected.contains(&label) {
            self.expected.push(label);
        }
    }

    /// Slash-joined labels of the active invocations, rule references
    /// elided (their label is already the target's).
    pub fn path(&self, grammar: &Grammar<V>) -> String {
        let labels: Vec<String> = self
            .trail
            .iter()
            .filter(|id| !matches!(grammar.matcher(**id).kind, MatcherKind::Proxy(_)))
            .map(|id| grammar.label(*id))
            .collect();
        labels.join("/")
    }
}

/// What a grammar action sees: the cursor, the parent accumulator built so
/// far, the value stack, and the value slot of the enclosing invocation.
pub struct ActionContext<'a, V> {
    buffer: &'a InputBuffer,
    current: InputLocation,
    sub_nodes: &'a [ParseNode<V>],
    value: &'a mut Option<V>,
    stack: &'a mut ValueStack<V>,
    path: String,
}

impl<'a, V> ActionContext<'a, V> {
    pub(crate) fn new(
        buffer: &'a InputBuffer,
        current: InputLocation,
        sub_nodes: &'a [ParseNode<V>],
        value: &'a mut Option<V>,
        stack: &'a mut ValueStack<V>,
        path: String,
    ) -> Self {
        Self {
            buffer,
            current,
            sub_nodes,
            value,
            stack,
            path,
        }
    }

    pub fn current_location(&self) -> InputLocation {
        self.current
    }

    pub fn input(&self) -> &InputBuffer {
        self.buffer
    }

    /// Read-only view of the enclosing invocation's accumulator so far.
    pub fn sub_nodes(&self) -> &[ParseNode<V>] {
        self.sub_nodes
    }

    pub fn node_by_path(&self, path: &str) -> Option<&ParseNode<V>> {
        tree::find_node_by_path(self.sub_nodes, path)
    }

    pub fn nodes_by_path(&self, path: &str) -> Vec<&ParseNode<V>> {
        let mut found = Vec::new();
        tree::collect_nodes_by_path(self.sub_nodes, path, &mut found);
        found
    }

    pub fn node_by_label(&self, prefix: &str) -> Option<&ParseNode<V>> {
        tree::find_node_by_label(self.sub_nodes, prefix)
    }

    pub fn nodes_by_label(&self, prefix: &str) -> Vec<&ParseNode<V>> {
        let mut found = Vec::new();
        tree::collect_nodes_by_label(self.sub_nodes, prefix, &mut found);
        found
    }

    pub fn node_text(&self, node: &ParseNode<V>) -> String {
        tree::node_text(node, self.buffer)
    }

    pub fn node_char(&self, node: &ParseNode<V>) -> Option<char> {
        tree::node_char(node, self.buffer)
    }

    /// Attaches a value to the node the enclosing invocation is building.
    pub fn set_value(&mut self, value: V) {
        *self.value = Some(value);
    }

    pub fn stack(&self) -> &ValueStack<V> {
        self.stack
    }

    pub fn stack_mut(&mut self) -> &mut ValueStack<V> {
        self.stack
    }

    /// The rule path of this invocation, for diagnostics.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Builds the fatal action-failure error, tagged with this context's
    /// path and position.
    pub fn fail(&self, message: impl Into<String>) -> EngineError {
        let offset = self.buffer.byte_offset(self.current.index);
        let width = match self.current.current_char {
            EOI => 0,
            c => c.len_utf8(),
        };
        EngineError::ActionFailed {
            path: self.path.clone(),
            message: message.into(),
            src: self.buffer.to_named_source(),
            span: SourceSpan::from(offset..offset + width),
        }
    }
}
