//! Mutable grammar construction, frozen into a [`Grammar`] by `build`.
//!
//! Combinator constructors are infallible and hand out arena indices;
//! everything that can go wrong (duplicate definitions, unresolved rule
//! references, missing start rule) is reported once, at `build`.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::chars::{CharacterSet, ANY, EMPTY, EOI};
use crate::errors::EngineError;
use crate::grammar::{Grammar, Matcher, MatcherFlags, MatcherKind, ProxyTarget, RuleId};
use crate::runtime::context::ActionContext;

pub struct GrammarBuilder<V> {
    matchers: Vec<Matcher<V>>,
    rules: HashMap<String, RuleId>,
    duplicates: Vec<String>,
}

impl<V> Default for GrammarBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> GrammarBuilder<V> {
    pub fn new() -> Self {
        Self {
            matchers: Vec::new(),
            rules: HashMap::new(),
            duplicates: Vec::new(),
        }
    }

    fn push(&mut self, kind: MatcherKind<V>) -> RuleId {
        let id = RuleId(self.matchers.len());
        self.matchers.push(Matcher {
            label: None,
            flags: MatcherFlags::default(),
            kind,
        });
        id
    }

    // ------------------------------------------------------------------
    // Terminal matchers
    // ------------------------------------------------------------------

    /// Matches exactly the character `c`.
    pub fn ch(&mut self, c: char) -> RuleId {
        self.push(MatcherKind::Char(c))
    }

    /// Matches any single real character; fails at end-of-input.
    pub fn any_char(&mut self) -> RuleId {
        self.push(MatcherKind::Char(ANY))
    }

    /// Always succeeds without consuming input.
    pub fn empty(&mut self) -> RuleId {
        self.push(MatcherKind::Char(EMPTY))
    }

    /// Matches the virtual end-of-input position.
    pub fn eoi(&mut self) -> RuleId {
        self.push(MatcherKind::Char(EOI))
    }

    /// Matches any one character of the set.
    pub fn char_set(&mut self, set: CharacterSet) -> RuleId {
        self.push(MatcherKind::CharSet(set))
    }

    /// Matches any one character in `lo..=hi`.
    pub fn char_range(&mut self, lo: char, hi: char) -> RuleId {
        self.push(MatcherKind::CharRange(lo, hi))
    }

    /// Matches the full character sequence.
    pub fn literal(&mut self, text: &str) -> RuleId {
        self.push(MatcherKind::Literal(text.to_string()))
    }

    /// Matches the first of several character sequences, tried in order.
    pub fn first_of_literals(&mut self, options: &[&str]) -> RuleId {
        self.push(MatcherKind::FirstOfLiterals(
            options.iter().map(|s| s.to_string()).collect(),
        ))
    }

    // ------------------------------------------------------------------
    // Composite matchers
    // ------------------------------------------------------------------

    pub fn sequence(&mut self, children: Vec<RuleId>) -> RuleId {
        self.push(MatcherKind::Sequence(children))
    }

    /// Ordered choice over the children.
    pub fn first_of(&mut self, children: Vec<RuleId>) -> RuleId {
        self.push(MatcherKind::FirstOf(children))
    }

    pub fn zero_or_more(&mut self, child: RuleId) -> RuleId {
        self.push(MatcherKind::ZeroOrMore(child))
    }

    pub fn one_or_more(&mut self, child: RuleId) -> RuleId {
        self.push(MatcherKind::OneOrMore(child))
    }

    pub fn optional(&mut self, child: RuleId) -> RuleId {
        self.push(MatcherKind::Optional(child))
    }

    /// Positive lookahead over the child.
    pub fn test(&mut self, child: RuleId) -> RuleId {
        self.push(MatcherKind::Test(child))
    }

    /// Negative lookahead over the child.
    pub fn test_not(&mut self, child: RuleId) -> RuleId {
        self.push(MatcherKind::TestNot(child))
    }

    /// A user predicate evaluated against the current context.
    pub fn action<F>(&mut self, f: F) -> RuleId
    where
        F: Fn(&mut ActionContext<'_, V>) -> Result<bool, EngineError> + 'static,
    {
        self.push(MatcherKind::Action(Rc::new(f)))
    }

    /// A forward (or recursive) reference to the rule named `name`,
    /// resolved at `build`.
    pub fn rule_ref(&mut self, name: &str) -> RuleId {
        self.push(MatcherKind::Proxy(ProxyTarget::Named(name.to_string())))
    }

    // ------------------------------------------------------------------
    // Rule naming and policy flags
    // ------------------------------------------------------------------

    /// Registers `id` as the rule `name` and labels it accordingly
    /// (an explicit label set beforehand wins).
    pub fn define(&mut self, name: &str, id: RuleId) -> RuleId {
        if self.rules.contains_key(name) {
            self.duplicates.push(name.to_string());
            return id;
        }
        self.rules.insert(name.to_string(), id);
        let matcher = &mut self.matchers[id.0];
        if matcher.label.is_none() {
            matcher.label = Some(name.to_string());
        }
        id
    }

    /// Overrides the label carried by nodes this matcher produces. On a
    /// rule reference it overrides the target rule's label.
    pub fn label(&mut self, id: RuleId, label: &str) -> RuleId {
        self.matchers[id.0].label = Some(label.to_string());
        id
    }

    pub fn suppress_node(&mut self, id: RuleId) -> RuleId {
        self.matchers[id.0].flags.suppress_node = true;
        id
    }

    pub fn suppress_subnodes(&mut self, id: RuleId) -> RuleId {
        self.matchers[id.0].flags.suppress_subnodes = true;
        id
    }

    pub fn skip_node(&mut self, id: RuleId) -> RuleId {
        self.matchers[id.0].flags.skip_node = true;
        id
    }

    /// Marks the matcher (and, at `build`, every action reachable inside
    /// it without crossing a rule reference) to bypass action predicates
    /// while in a lookahead.
    pub fn skip_actions_in_predicates(&mut self, id: RuleId) -> RuleId {
        self.matchers[id.0].flags.skip_actions_in_predicates = true;
        id
    }

    // ------------------------------------------------------------------
    // Freezing
    // ------------------------------------------------------------------

    /// Validates the arena and freezes it into an immutable grammar with
    /// `start` as the start rule.
    pub fn build(mut self, start: &str) -> Result<Grammar<V>, EngineError> {
        if let Some(name) = self.duplicates.first() {
            return Err(EngineError::DuplicateRule { name: name.clone() });
        }

        for matcher in &mut self.matchers {
            if let MatcherKind::Proxy(target) = &mut matcher.kind {
                if let ProxyTarget::Named(name) = target {
                    let Some(resolved) = self.rules.get(name.as_str()) else {
                        return Err(EngineError::UnresolvedRule { name: name.clone() });
                    };
                    *target = ProxyTarget::Resolved(*resolved);
                }
            }
        }

        let Some(start) = self.rules.get(start).copied() else {
            return Err(EngineError::UndefinedStartRule {
                name: start.to_string(),
            });
        };

        self.propagate_action_policy();

        Ok(Grammar {
            matchers: self.matchers,
            rules: self.rules,
            start,
        })
    }

    /// Copies `skip_actions_in_predicates` from flagged matchers onto the
    /// actions inside them. The walk stops at rule references and at named
    /// rule roots, so a nested rule's own declaration stays in force.
    fn propagate_action_policy(&mut self) {
        let rule_roots: HashSet<RuleId> = self.rules.values().copied().collect();
        let flagged: Vec<RuleId> = (0..self.matchers.len())
            .map(RuleId)
            .filter(|id| self.matchers[id.0].flags.skip_actions_in_predicates)
            .collect();
        for root in flagged {
            self.mark_actions(root, root, &rule_roots);
        }
    }

    fn mark_actions(&mut self, id: RuleId, origin: RuleId, rule_roots: &HashSet<RuleId>) {
        if id != origin && rule_roots.contains(&id) {
            return;
        }
        if matches!(self.matchers[id.0].kind, MatcherKind::Action(_)) {
            self.matchers[id.0].flags.skip_actions_in_predicates = true;
            return;
        }
        let children: Vec<RuleId> = match &self.matchers[id.0].kind {
            MatcherKind::Sequence(children) | MatcherKind::FirstOf(children) => children.clone(),
            MatcherKind::ZeroOrMore(child)
            | MatcherKind::OneOrMore(child)
            | MatcherKind::Optional(child)
            | MatcherKind::Test(child)
            | MatcherKind::TestNot(child) => vec![*child],
            // Rule references keep the target rule's own policy.
            _ => return,
        };
        for child in children {
            self.mark_actions(child, origin, rule_roots);
        }
    }
}
