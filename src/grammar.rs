//! Grammar construction and the matcher graph.
//!
//! A grammar is an arena of matchers addressed by [`RuleId`]. Rules refer
//! to each other by index, so forward references and recursion are
//! ordinary values; a proxy matcher records a rule name and resolves it
//! when the builder is frozen into a [`Grammar`]. Once built, a grammar is
//! immutable and can back any number of parses.

pub mod builder;
pub mod matcher;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::chars::{CharacterSet, EMPTY};
pub use builder::GrammarBuilder;
pub use matcher::{ActionFn, Matcher, MatcherKind, ProxyTarget};

/// Index of a matcher in the grammar arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleId(pub(crate) usize);

/// Node creation and action policy of a matcher.
///
/// These are compile-time properties of the grammar, read (never written)
/// by the matcher context. `skip_actions_in_predicates` is consulted on
/// the action matcher itself; the builder copies a composite's policy onto
/// the actions inside it without crossing rule boundaries, so the
/// innermost declaration wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherFlags {
    /// Succeed without contributing a parse-tree node; the whole subtree
    /// is dropped.
    pub suppress_node: bool,
    /// Contribute a node but discard its children.
    pub suppress_subnodes: bool,
    /// Contribute no node; promote the children to the parent.
    pub skip_node: bool,
    /// Bypass action predicates while inside a lookahead.
    pub skip_actions_in_predicates: bool,
}

/// An immutable matcher graph with a designated start rule.
pub struct Grammar<V> {
    matchers: Vec<Matcher<V>>,
    rules: HashMap<String, RuleId>,
    start: RuleId,
}

impl<V> std::fmt::Debug for Grammar<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grammar")
            .field("rules", &self.rules)
            .field("start", &self.start)
            .finish_non_exhaustive()
    }
}

impl<V> Grammar<V> {
    pub fn start_rule(&self) -> RuleId {
        self.start
    }

    /// Looks up a named rule.
    pub fn rule(&self, name: &str) -> Option<RuleId> {
        self.rules.get(name).copied()
    }

    pub(crate) fn matcher(&self, id: RuleId) -> &Matcher<V> {
        &self.matchers[id.0]
    }

    /// The label a node produced by this matcher would carry, following
    /// proxy delegation.
    pub fn label(&self, id: RuleId) -> String {
        let matcher = self.matcher(id);
        if let Some(label) = &matcher.label {
            return label.clone();
        }
        if let MatcherKind::Proxy(ProxyTarget::Resolved(target)) = &matcher.kind {
            return self.label(*target);
        }
        matcher.kind.default_label()
    }

    /// The set of first characters on which the matcher can possibly
    /// succeed. Membership of the empty-match sentinel signals that the
    /// matcher can succeed without consuming input. Rule cycles contribute
    /// nothing on re-entry.
    pub fn starter_chars(&self, id: RuleId) -> CharacterSet {
        let mut in_progress = vec![false; self.matchers.len()];
        self.starters(id, &mut in_progress)
    }

    fn starters(&self, id: RuleId, in_progress: &mut [bool]) -> CharacterSet {
        if in_progress[id.0] {
            return CharacterSet::none();
        }
        in_progress[id.0] = true;
        let result = match &self.matcher(id).kind {
            MatcherKind::Char(c) => CharacterSet::of(*c),
            MatcherKind::CharSet(set) => set.clone(),
            MatcherKind::CharRange(lo, hi) => CharacterSet::of_range(*lo, *hi),
            MatcherKind::Literal(text) => match text.chars().next() {
                Some(first) => CharacterSet::of(first),
                None => CharacterSet::of(EMPTY),
            },
            MatcherKind::FirstOfLiterals(options) => {
                options.iter().fold(CharacterSet::none(), |acc, text| {
                    acc.with(text.chars().next().unwrap_or(EMPTY))
                })
            }
            MatcherKind::Sequence(children) => {
                let mut chars = CharacterSet::none();
                let mut all_can_match_empty = true;
                for child in children {
                    let child_starters = self.starters(*child, in_progress);
                    let child_matches_empty = child_starters.contains(EMPTY);
                    chars = chars.union(&child_starters).without(EMPTY);
                    if !child_matches_empty {
                        all_can_match_empty = false;
                        break;
                    }
                }
                if all_can_match_empty {
                    chars = chars.with(EMPTY);
                }
                chars
            }
            MatcherKind::FirstOf(children) => children.iter().fold(
                CharacterSet::none(),
                |acc, child| acc.union(&self.starters(*child, in_progress)),
            ),
            MatcherKind::ZeroOrMore(child) | MatcherKind::Optional(child) => {
                self.starters(*child, in_progress).with(EMPTY)
            }
            MatcherKind::OneOrMore(child) => self.starters(*child, in_progress),
            MatcherKind::Test(child) => self.starters(*child, in_progress).with(EMPTY),
            MatcherKind::TestNot(child) => self
                .starters(*child, in_progress)
                .complement()
                .with(EMPTY),
            MatcherKind::Action(_) => CharacterSet::of(EMPTY),
            MatcherKind::Proxy(ProxyTarget::Resolved(target)) => {
                self.starters(*target, in_progress)
            }
            MatcherKind::Proxy(ProxyTarget::Named(_)) => CharacterSet::none(),
        };
        in_progress[id.0] = false;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chars::{ANY, EOI};

    fn build(f: impl FnOnce(&mut GrammarBuilder<()>) -> RuleId) -> Grammar<()> {
        let mut builder = GrammarBuilder::new();
        let id = f(&mut builder);
        builder.define("S", id);
        builder.build("S").expect("grammar builds")
    }

    #[test]
    fn terminal_starters() {
        let grammar = build(|b| b.ch('a'));
        assert_eq!(grammar.starter_chars(grammar.start_rule()), CharacterSet::of('a'));

        let grammar = build(|b| b.literal("xyz"));
        assert_eq!(grammar.starter_chars(grammar.start_rule()), CharacterSet::of('x'));

        let grammar = build(|b| b.literal(""));
        assert_eq!(grammar.starter_chars(grammar.start_rule()), CharacterSet::of(EMPTY));

        let grammar = build(|b| b.eoi());
        assert_eq!(grammar.starter_chars(grammar.start_rule()), CharacterSet::of(EOI));

        let grammar = build(|b| b.any_char());
        assert_eq!(grammar.starter_chars(grammar.start_rule()), CharacterSet::of(ANY));
    }

    #[test]
    fn sequence_starter_unions_past_empty_matching_children() {
        let grammar = build(|b| {
            let a = b.ch('a');
            let opt_a = b.optional(a);
            let c = b.ch('b');
            b.sequence(vec![opt_a, c])
        });
        let starters = grammar.starter_chars(grammar.start_rule());
        assert!(starters.contains('a'));
        assert!(starters.contains('b'));
        assert!(!starters.contains(EMPTY));
    }

    #[test]
    fn sequence_of_all_empty_matching_children_can_match_empty() {
        let grammar = build(|b| {
            let a = b.ch('a');
            let opt_a = b.optional(a);
            let c = b.ch('b');
            let opt_c = b.optional(c);
            b.sequence(vec![opt_a, opt_c])
        });
        let starters = grammar.starter_chars(grammar.start_rule());
        assert!(starters.contains('a'));
        assert!(starters.contains('b'));
        assert!(starters.contains(EMPTY));
    }

    #[test]
    fn choice_starter_is_the_union_of_the_children() {
        let grammar = build(|b| {
            let a = b.ch('a');
            let c = b.ch('b');
            b.first_of(vec![a, c])
        });
        let starters = grammar.starter_chars(grammar.start_rule());
        assert!(starters.contains('a'));
        assert!(starters.contains('b'));
        assert!(!starters.contains('c'));
    }

    #[test]
    fn negative_lookahead_starter_is_complemented() {
        let grammar = build(|b| {
            let a = b.ch('a');
            b.test_not(a)
        });
        let starters = grammar.starter_chars(grammar.start_rule());
        assert!(!starters.contains('a'));
        assert!(starters.contains('b'));
        assert!(starters.contains(EMPTY));
    }

    #[test]
    fn recursive_rule_starters_terminate() {
        let mut builder: GrammarBuilder<()> = GrammarBuilder::new();
        let open = builder.ch('(');
        let close = builder.ch(')');
        let inner = builder.rule_ref("expr");
        let nested = builder.sequence(vec![open, inner, close]);
        let x = builder.ch('x');
        let expr = builder.first_of(vec![nested, x]);
        builder.define("expr", expr);
        let grammar = builder.build("expr").expect("grammar builds");

        let starters = grammar.starter_chars(grammar.start_rule());
        assert!(starters.contains('('));
        assert!(starters.contains('x'));
        assert!(!starters.contains(')'));
    }

    #[test]
    fn labels_follow_proxies() {
        let mut builder: GrammarBuilder<()> = GrammarBuilder::new();
        let a = builder.ch('a');
        builder.define("item", a);
        let reference = builder.rule_ref("item");
        let labeled = builder.rule_ref("item");
        builder.label(labeled, "alias");
        let seq = builder.sequence(vec![reference, labeled]);
        builder.define("S", seq);
        let grammar = builder.build("S").expect("grammar builds");

        let MatcherKind::Sequence(children) = &grammar.matcher(grammar.rule("S").unwrap()).kind
        else {
            panic!("expected sequence");
        };
        assert_eq!(grammar.label(children[0]), "item");
        assert_eq!(grammar.label(children[1]), "alias");
    }
}
