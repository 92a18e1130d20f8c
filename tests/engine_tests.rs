//! End-to-end matcher semantics: every combinator's contract, the
//! node-creation policy, failure reporting, and grammar validation.

use stitch::chars::CharacterSet;
use stitch::engine::parse;
use stitch::grammar::{Grammar, GrammarBuilder, RuleId};
use stitch::input::InputBuffer;
use stitch::EngineError;

fn single_rule(f: impl FnOnce(&mut GrammarBuilder<()>) -> RuleId) -> Grammar<()> {
    let mut builder = GrammarBuilder::new();
    let id = f(&mut builder);
    builder.define("S", id);
    builder.build("S").expect("grammar builds")
}

fn child_labels(node: &stitch::tree::ParseNode<()>) -> Vec<&str> {
    node.children.iter().map(|c| c.label.as_str()).collect()
}

// ----------------------------------------------------------------------
// Sequences and choices
// ----------------------------------------------------------------------

#[test]
fn sequence_of_two_chars() {
    let grammar = single_rule(|b| {
        let a = b.ch('a');
        let c = b.ch('b');
        b.sequence(vec![a, c])
    });
    let result = parse(&grammar, InputBuffer::from_text("ab")).unwrap();

    assert!(result.matched);
    let root = result.root.expect("tree root");
    assert_eq!(root.label, "S");
    assert_eq!((root.start.index, root.end.index), (0, 2));
    assert_eq!(child_labels(&root), ["'a'", "'b'"]);
}

#[test]
fn choice_takes_the_second_alternative() {
    let grammar = single_rule(|b| {
        let a = b.ch('a');
        let c = b.ch('b');
        b.first_of(vec![a, c])
    });
    let result = parse(&grammar, InputBuffer::from_text("b")).unwrap();

    assert!(result.matched);
    let root = result.root.unwrap();
    assert_eq!(child_labels(&root), ["'b'"]);
}

#[test]
fn choice_commits_to_the_first_success() {
    // "a" before "ab": the shorter alternative wins and the trailing
    // character is left unconsumed, so the sequence with EOI fails.
    let grammar = single_rule(|b| {
        let short = b.literal("a");
        let long = b.literal("ab");
        let choice = b.first_of(vec![short, long]);
        let end = b.eoi();
        b.sequence(vec![choice, end])
    });
    let result = parse(&grammar, InputBuffer::from_text("ab")).unwrap();
    assert!(!result.matched);
}

#[test]
fn failed_alternative_restores_before_the_next_is_tried() {
    let grammar = single_rule(|b| {
        let a1 = b.ch('a');
        let c1 = b.ch('b');
        let ab = b.sequence(vec![a1, c1]);
        let a2 = b.ch('a');
        let c2 = b.ch('c');
        let ac = b.sequence(vec![a2, c2]);
        b.first_of(vec![ab, ac])
    });
    let result = parse(&grammar, InputBuffer::from_text("ac")).unwrap();

    assert!(result.matched);
    let root = result.root.unwrap();
    // One committed alternative, spanning the whole input from zero.
    assert_eq!(root.children.len(), 1);
    let alternative = &root.children[0];
    assert_eq!((alternative.start.index, alternative.end.index), (0, 2));
    assert_eq!(child_labels(&root)[0], "Sequence");
}

// ----------------------------------------------------------------------
// Repetitions and optional
// ----------------------------------------------------------------------

#[test]
fn zero_or_more_matches_empty_input() {
    let grammar = single_rule(|b| {
        let a = b.ch('a');
        b.zero_or_more(a)
    });
    let result = parse(&grammar, InputBuffer::from_text("")).unwrap();

    assert!(result.matched);
    let root = result.root.unwrap();
    assert!(root.children.is_empty());
    assert_eq!((root.start.index, root.end.index), (0, 0));
}

#[test]
fn repeated_sequences_commit_each_iteration() {
    let grammar = single_rule(|b| {
        let a = b.ch('a');
        let c = b.ch('b');
        let pair = b.sequence(vec![a, c]);
        b.zero_or_more(pair)
    });
    let result = parse(&grammar, InputBuffer::from_text("abab")).unwrap();

    assert!(result.matched);
    let root = result.root.unwrap();
    assert_eq!(root.children.len(), 2);
    for (i, child) in root.children.iter().enumerate() {
        assert_eq!(child.label, "Sequence");
        assert_eq!((child.start.index, child.end.index), (i * 2, i * 2 + 2));
    }
}

#[test]
fn one_or_more_requires_a_first_match() {
    let grammar = single_rule(|b| {
        let a = b.ch('a');
        b.one_or_more(a)
    });

    let result = parse(&grammar, InputBuffer::from_text("aaa")).unwrap();
    assert!(result.matched);
    assert_eq!(result.root.unwrap().children.len(), 3);

    let result = parse(&grammar, InputBuffer::from_text("")).unwrap();
    assert!(!result.matched);
}

#[test]
fn repetition_stops_at_the_first_failure() {
    let grammar = single_rule(|b| {
        let a = b.ch('a');
        b.zero_or_more(a)
    });
    let result = parse(&grammar, InputBuffer::from_text("aab")).unwrap();

    assert!(result.matched);
    let root = result.root.unwrap();
    assert_eq!(root.children.len(), 2);
    assert_eq!(root.end.index, 2);
}

#[test]
fn optional_succeeds_either_way() {
    let grammar = single_rule(|b| {
        let a = b.ch('a');
        b.optional(a)
    });

    let result = parse(&grammar, InputBuffer::from_text("a")).unwrap();
    assert!(result.matched);
    assert_eq!(child_labels(&result.root.unwrap()), ["'a'"]);

    let result = parse(&grammar, InputBuffer::from_text("")).unwrap();
    assert!(result.matched);
    let root = result.root.unwrap();
    assert!(root.children.is_empty());
    assert_eq!((root.start.index, root.end.index), (0, 0));
}

#[test]
fn zero_width_repetition_is_a_fatal_grammar_error() {
    let grammar = single_rule(|b| {
        let a = b.ch('a');
        let maybe_a = b.optional(a);
        b.zero_or_more(maybe_a)
    });
    let error = parse(&grammar, InputBuffer::from_text("b")).unwrap_err();
    assert!(matches!(error, EngineError::ZeroWidthRepetition { .. }));
}

// ----------------------------------------------------------------------
// Predicates
// ----------------------------------------------------------------------

#[test]
fn positive_lookahead_contributes_nothing() {
    let grammar = single_rule(|b| {
        let probe = b.ch('a');
        let ahead = b.test(probe);
        let a = b.ch('a');
        b.sequence(vec![ahead, a])
    });
    let result = parse(&grammar, InputBuffer::from_text("a")).unwrap();

    assert!(result.matched);
    let root = result.root.unwrap();
    assert_eq!(child_labels(&root), ["'a'"]);
    assert_eq!((root.start.index, root.end.index), (0, 1));
}

#[test]
fn negative_lookahead_guards_without_consuming() {
    let grammar = single_rule(|b| {
        let forbidden = b.ch('b');
        let guard = b.test_not(forbidden);
        let any = b.any_char();
        b.sequence(vec![guard, any])
    });

    let result = parse(&grammar, InputBuffer::from_text("a")).unwrap();
    assert!(result.matched);
    assert_eq!(result.root.unwrap().children.len(), 1);

    let result = parse(&grammar, InputBuffer::from_text("b")).unwrap();
    assert!(!result.matched);
}

#[test]
fn failures_inside_predicates_stay_out_of_the_diagnostic() {
    let grammar = single_rule(|b| {
        let probe = b.ch('q');
        let ahead = b.test(probe);
        let a = b.ch('a');
        b.sequence(vec![ahead, a])
    });
    let result = parse(&grammar, InputBuffer::from_text("a")).unwrap();

    assert!(!result.matched);
    let failure = result.failure.unwrap();
    assert_eq!(failure.location.index, 0);
    assert!(failure.expected.is_empty());
}

// ----------------------------------------------------------------------
// Terminals
// ----------------------------------------------------------------------

#[test]
fn end_of_input_is_matched_literally() {
    let grammar = single_rule(|b| {
        let a = b.ch('a');
        let end = b.eoi();
        b.sequence(vec![a, end])
    });

    let result = parse(&grammar, InputBuffer::from_text("a")).unwrap();
    assert!(result.matched);
    // The EOI leaf is zero-width.
    let root = result.root.unwrap();
    assert_eq!(child_labels(&root), ["'a'", "EOI"]);
    assert_eq!(root.end.index, 1);

    let result = parse(&grammar, InputBuffer::from_text("ab")).unwrap();
    assert!(!result.matched);
    let failure = result.failure.unwrap();
    assert_eq!(failure.location.index, 1);
    assert_eq!(failure.expected, vec!["EOI".to_string()]);
}

#[test]
fn any_char_fails_only_at_the_end() {
    let grammar = single_rule(|b| b.any_char());

    assert!(parse(&grammar, InputBuffer::from_text("x")).unwrap().matched);
    assert!(!parse(&grammar, InputBuffer::from_text("")).unwrap().matched);
}

#[test]
fn empty_match_consumes_nothing() {
    let grammar = single_rule(|b| {
        let nothing = b.empty();
        let a = b.ch('a');
        b.sequence(vec![nothing, a])
    });
    let result = parse(&grammar, InputBuffer::from_text("a")).unwrap();

    assert!(result.matched);
    let root = result.root.unwrap();
    assert_eq!(child_labels(&root), ["EMPTY", "'a'"]);
    assert_eq!(root.children[0].start.index, root.children[0].end.index);
}

#[test]
fn literal_matches_the_full_sequence_or_nothing() {
    let grammar = single_rule(|b| b.literal("abc"));

    let result = parse(&grammar, InputBuffer::from_text("abc")).unwrap();
    assert!(result.matched);
    let root = result.root.unwrap();
    assert_eq!((root.start.index, root.end.index), (0, 3));
    assert!(root.children.is_empty());

    let result = parse(&grammar, InputBuffer::from_text("abx")).unwrap();
    assert!(!result.matched);
    // Restore means the failure sits at the literal's start.
    assert_eq!(result.failure.unwrap().location.index, 0);
}

#[test]
fn char_range_and_char_set_terminals() {
    let grammar = single_rule(|b| {
        let digit = b.char_range('0', '9');
        let sign = b.char_set(CharacterSet::of_chars(['+', '-']));
        b.sequence(vec![sign, digit])
    });

    assert!(parse(&grammar, InputBuffer::from_text("-7")).unwrap().matched);
    assert!(!parse(&grammar, InputBuffer::from_text("x7")).unwrap().matched);
    assert!(!parse(&grammar, InputBuffer::from_text("-x")).unwrap().matched);
}

#[test]
fn first_of_literals_produces_a_single_leaf() {
    let grammar = single_rule(|b| {
        let keyword = b.first_of_literals(&["let", "letter", "if"]);
        b.label(keyword, "keyword")
    });
    let result = parse(&grammar, InputBuffer::from_text("letter")).unwrap();

    assert!(result.matched);
    let root = result.root.unwrap();
    assert_eq!(root.label, "keyword");
    // Options are tried in order, so the shorter "let" wins.
    assert_eq!(root.end.index, 3);
    assert!(root.children.is_empty());
}

// ----------------------------------------------------------------------
// Failure diagnostics
// ----------------------------------------------------------------------

#[test]
fn deepest_failure_location_is_reported() {
    let grammar = single_rule(|b| {
        let a = b.ch('a');
        let c = b.ch('b');
        b.sequence(vec![a, c])
    });
    let result = parse(&grammar, InputBuffer::from_text("ac")).unwrap();

    assert!(!result.matched);
    assert!(result.root.is_none());
    let failure = result.failure.unwrap();
    assert_eq!(failure.location.index, 1);
    assert_eq!(failure.expected, vec!["'b'".to_string()]);
}

#[test]
fn expected_set_gathers_all_alternatives_at_the_deepest_point() {
    let grammar = single_rule(|b| {
        let a = b.ch('a');
        let x = b.ch('x');
        let y = b.ch('y');
        let tail = b.first_of(vec![x, y]);
        b.sequence(vec![a, tail])
    });
    let result = parse(&grammar, InputBuffer::from_text("az")).unwrap();

    assert!(!result.matched);
    let failure = result.failure.unwrap();
    assert_eq!(failure.location.index, 1);
    assert_eq!(failure.expected, vec!["'x'".to_string(), "'y'".to_string()]);
}

#[test]
fn failure_report_is_a_renderable_diagnostic() {
    let grammar = single_rule(|b| {
        let a = b.ch('a');
        let c = b.ch('b');
        b.sequence(vec![a, c])
    });
    let result = parse(&grammar, InputBuffer::new("test.txt", "ac")).unwrap();

    let report = result.failure_report().expect("failure present");
    let message = report.to_string();
    assert!(message.contains("'b'"), "unexpected message: {message}");

    let matched = parse(&grammar, InputBuffer::from_text("ab")).unwrap();
    assert!(matched.failure_report().is_none());
}

// ----------------------------------------------------------------------
// Node-creation policy
// ----------------------------------------------------------------------

fn flagged_grammar(configure: impl FnOnce(&mut GrammarBuilder<()>, RuleId)) -> Grammar<()> {
    let mut builder = GrammarBuilder::new();
    let a = builder.ch('a');
    let c = builder.ch('b');
    let inner = builder.sequence(vec![a, c]);
    builder.define("inner", inner);
    configure(&mut builder, inner);
    let reference = builder.rule_ref("inner");
    let x = builder.ch('x');
    let outer = builder.sequence(vec![reference, x]);
    builder.define("S", outer);
    builder.build("S").expect("grammar builds")
}

#[test]
fn default_policy_emits_one_node_with_children() {
    let grammar = flagged_grammar(|_, _| {});
    let result = parse(&grammar, InputBuffer::from_text("abx")).unwrap();

    let root = result.root.unwrap();
    assert_eq!(child_labels(&root), ["inner", "'x'"]);
    assert_eq!(child_labels(&root.children[0]), ["'a'", "'b'"]);
}

#[test]
fn suppress_node_drops_the_whole_subtree() {
    let grammar = flagged_grammar(|b, inner| {
        b.suppress_node(inner);
    });
    let result = parse(&grammar, InputBuffer::from_text("abx")).unwrap();

    assert!(result.matched);
    let root = result.root.unwrap();
    assert_eq!(child_labels(&root), ["'x'"]);
    // Input was still consumed by the suppressed rule.
    assert_eq!(root.end.index, 3);
}

#[test]
fn suppress_subnodes_keeps_the_node_and_drops_the_children() {
    let grammar = flagged_grammar(|b, inner| {
        b.suppress_subnodes(inner);
    });
    let result = parse(&grammar, InputBuffer::from_text("abx")).unwrap();

    let root = result.root.unwrap();
    assert_eq!(child_labels(&root), ["inner", "'x'"]);
    let inner = &root.children[0];
    assert!(inner.children.is_empty());
    assert_eq!((inner.start.index, inner.end.index), (0, 2));
}

#[test]
fn skip_node_promotes_the_children_to_the_parent() {
    let grammar = flagged_grammar(|b, inner| {
        b.skip_node(inner);
    });
    let result = parse(&grammar, InputBuffer::from_text("abx")).unwrap();

    let root = result.root.unwrap();
    assert_eq!(child_labels(&root), ["'a'", "'b'", "'x'"]);
}

// ----------------------------------------------------------------------
// Rules, recursion, and construction errors
// ----------------------------------------------------------------------

#[test]
fn recursive_rule_via_forward_reference() {
    let mut builder: GrammarBuilder<()> = GrammarBuilder::new();
    let open = builder.ch('(');
    let inner = builder.rule_ref("expr");
    let close = builder.ch(')');
    let nested = builder.sequence(vec![open, inner, close]);
    builder.skip_node(nested);
    let x = builder.ch('x');
    let expr = builder.first_of(vec![nested, x]);
    builder.define("expr", expr);
    let grammar = builder.build("expr").unwrap();

    let result = parse(&grammar, InputBuffer::from_text("((x))")).unwrap();
    assert!(result.matched);
    let root = result.root.unwrap();
    assert_eq!(root.label, "expr");
    assert_eq!(root.end.index, 5);
    // Two levels of nesting under the root.
    let level_two = root.node_by_path("expr/expr").expect("nested expr");
    assert_eq!((level_two.start.index, level_two.end.index), (2, 3));

    let result = parse(&grammar, InputBuffer::from_text("((x)")).unwrap();
    assert!(!result.matched);
    assert_eq!(result.failure.unwrap().location.index, 4);
}

#[test]
fn proxy_label_overrides_the_target() {
    let mut builder: GrammarBuilder<()> = GrammarBuilder::new();
    let a = builder.ch('a');
    builder.define("item", a);
    let renamed = builder.rule_ref("item");
    builder.label(renamed, "first");
    let plain = builder.rule_ref("item");
    let seq = builder.sequence(vec![renamed, plain]);
    builder.define("S", seq);
    let grammar = builder.build("S").unwrap();

    let result = parse(&grammar, InputBuffer::from_text("aa")).unwrap();
    let root = result.root.unwrap();
    assert_eq!(child_labels(&root), ["first", "item"]);
}

#[test]
fn left_recursion_hits_the_recursion_limit() {
    let mut builder: GrammarBuilder<()> = GrammarBuilder::new();
    let this = builder.rule_ref("L");
    let a = builder.ch('a');
    let body = builder.sequence(vec![this, a]);
    builder.define("L", body);
    let grammar = builder.build("L").unwrap();

    let error = parse(&grammar, InputBuffer::from_text("aaa")).unwrap_err();
    assert!(matches!(error, EngineError::RecursionLimit { .. }));
}

#[test]
fn unresolved_rule_reference_fails_the_build() {
    let mut builder: GrammarBuilder<()> = GrammarBuilder::new();
    let missing = builder.rule_ref("missing");
    builder.define("S", missing);
    let error = builder.build("S").unwrap_err();
    assert!(matches!(error, EngineError::UnresolvedRule { name } if name == "missing"));
}

#[test]
fn undefined_start_rule_fails_the_build() {
    let mut builder: GrammarBuilder<()> = GrammarBuilder::new();
    let a = builder.ch('a');
    builder.define("S", a);
    let error = builder.build("start").unwrap_err();
    assert!(matches!(error, EngineError::UndefinedStartRule { name } if name == "start"));
}

#[test]
fn duplicate_rule_definition_fails_the_build() {
    let mut builder: GrammarBuilder<()> = GrammarBuilder::new();
    let a = builder.ch('a');
    let c = builder.ch('b');
    builder.define("S", a);
    builder.define("S", c);
    let error = builder.build("S").unwrap_err();
    assert!(matches!(error, EngineError::DuplicateRule { name } if name == "S"));
}

#[test]
fn one_grammar_backs_many_parses() {
    let grammar = single_rule(|b| {
        let a = b.ch('a');
        b.one_or_more(a)
    });
    for input in ["a", "aa", "aaa"] {
        let result = parse(&grammar, InputBuffer::from_text(input)).unwrap();
        assert!(result.matched);
        assert_eq!(result.root.unwrap().children.len(), input.len());
    }
}
