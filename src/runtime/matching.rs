//! The match operation for every combinator.
//!
//! The contract, recursively preserved: on success the parent cursor has
//! advanced by exactly the characters consumed and (unless suppressed)
//! exactly one node was appended to the parent accumulator; on failure the
//! parent context is untouched. Each invocation works in its own
//! [`MatcherContext`] and merges into the parent only on success, so
//! restore-on-failure is dropping the frame.

use miette::SourceSpan;

use crate::chars::{ANY, EMPTY};
use crate::errors::EngineError;
use crate::grammar::{Grammar, MatcherKind, ProxyTarget, RuleId};
use crate::input::InputLocation;
use crate::runtime::context::{ActionContext, MatcherContext, ParseState};
use crate::tree::ParseNode;

pub(crate) fn run_matcher<V>(
    grammar: &Grammar<V>,
    id: RuleId,
    state: &mut ParseState<'_, V>,
    parent: &mut MatcherContext<V>,
) -> Result<bool, EngineError> {
    run_labeled(grammar, id, state, parent, None)
}

fn run_labeled<V>(
    grammar: &Grammar<V>,
    id: RuleId,
    state: &mut ParseState<'_, V>,
    parent: &mut MatcherContext<V>,
    label_override: Option<&str>,
) -> Result<bool, EngineError> {
    if state.trail.len() >= state.max_depth {
        return Err(EngineError::RecursionLimit {
            limit: state.max_depth,
        });
    }
    state.trail.push(id);
    let entry = parent.current;
    let result = dispatch(grammar, id, state, parent, label_override);
    state.trail.pop();

    if let Ok(false) = result {
        if grammar.matcher(id).kind.is_terminal() {
            let label = match label_override {
                Some(label) => label.to_string(),
                None => grammar.label(id),
            };
            state.record_failure(entry, label);
        }
    }
    result
}

fn dispatch<V>(
    grammar: &Grammar<V>,
    id: RuleId,
    state: &mut ParseState<'_, V>,
    parent: &mut MatcherContext<V>,
    label_override: Option<&str>,
) -> Result<bool, EngineError> {
    let matcher = grammar.matcher(id);
    match &matcher.kind {
        MatcherKind::Char(c) => Ok(match_char(grammar, id, *c, state, parent, label_override)),
        MatcherKind::CharSet(set) => Ok(match_single(grammar, id, state, parent, label_override, |c| {
            set.contains(c)
        })),
        MatcherKind::CharRange(lo, hi) => {
            let (lo, hi) = (*lo, *hi);
            Ok(match_single(grammar, id, state, parent, label_override, |c| {
                lo <= c && c <= hi
            }))
        }
        MatcherKind::Literal(text) => {
            Ok(match_literal(grammar, id, text, state, parent, label_override))
        }
        MatcherKind::FirstOfLiterals(options) => {
            for option in options {
                if match_literal(grammar, id, option, state, parent, label_override) {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        MatcherKind::Sequence(children) => {
            let mut ctx = MatcherContext::at(parent.current);
            for child in children {
                if !run_matcher(grammar, *child, state, &mut ctx)? {
                    return Ok(false);
                }
            }
            succeed(grammar, id, parent, label_override, ctx);
            Ok(true)
        }
        MatcherKind::FirstOf(children) => {
            let mut ctx = MatcherContext::at(parent.current);
            for child in children {
                if run_matcher(grammar, *child, state, &mut ctx)? {
                    succeed(grammar, id, parent, label_override, ctx);
                    return Ok(true);
                }
            }
            Ok(false)
        }
        MatcherKind::ZeroOrMore(child) => {
            match_repetition(grammar, id, *child, false, state, parent, label_override)
        }
        MatcherKind::OneOrMore(child) => {
            match_repetition(grammar, id, *child, true, state, parent, label_override)
        }
        MatcherKind::Optional(child) => {
            let mut ctx = MatcherContext::at(parent.current);
            run_matcher(grammar, *child, state, &mut ctx)?;
            succeed(grammar, id, parent, label_override, ctx);
            Ok(true)
        }
        MatcherKind::Test(child) => match_predicate(grammar, *child, false, state, parent),
        MatcherKind::TestNot(child) => match_predicate(grammar, *child, true, state, parent),
        MatcherKind::Action(action) => {
            if state.predicate_depth > 0 && matcher.flags.skip_actions_in_predicates {
                return Ok(true);
            }
            let path = state.path(grammar);
            let mut ctx = ActionContext::new(
                state.buffer,
                parent.current,
                &parent.sub_nodes,
                &mut parent.value,
                &mut state.stack,
                path,
            );
            action(&mut ctx)
        }
        MatcherKind::Proxy(ProxyTarget::Resolved(target)) => {
            let label = label_override.or(matcher.label.as_deref());
            run_labeled(grammar, *target, state, parent, label)
        }
        MatcherKind::Proxy(ProxyTarget::Named(name)) => {
            Err(EngineError::UnresolvedRule { name: name.clone() })
        }
    }
}

// ----------------------------------------------------------------------
// Terminal matching
// ----------------------------------------------------------------------

fn match_char<V>(
    grammar: &Grammar<V>,
    id: RuleId,
    c: char,
    state: &mut ParseState<'_, V>,
    parent: &mut MatcherContext<V>,
    label_override: Option<&str>,
) -> bool {
    let location = parent.current;
    let next = match c {
        EMPTY => Some(location),
        ANY if location.at_end() => None,
        ANY => Some(location.advance(state.buffer)),
        // EOI compares like any character; advancing at the end position
        // is a no-op, so the generic arm covers it.
        c if location.current_char == c => Some(location.advance(state.buffer)),
        _ => None,
    };
    let Some(next) = next else {
        return false;
    };
    let mut ctx = MatcherContext::at(location);
    ctx.current = next;
    succeed(grammar, id, parent, label_override, ctx);
    true
}

fn match_single<V>(
    grammar: &Grammar<V>,
    id: RuleId,
    state: &mut ParseState<'_, V>,
    parent: &mut MatcherContext<V>,
    label_override: Option<&str>,
    accepts: impl Fn(char) -> bool,
) -> bool {
    if !accepts(parent.current.current_char) {
        return false;
    }
    let mut ctx = MatcherContext::at(parent.current);
    ctx.current = ctx.current.advance(state.buffer);
    succeed(grammar, id, parent, label_override, ctx);
    true
}

fn match_literal<V>(
    grammar: &Grammar<V>,
    id: RuleId,
    text: &str,
    state: &mut ParseState<'_, V>,
    parent: &mut MatcherContext<V>,
    label_override: Option<&str>,
) -> bool {
    let mut location = parent.current;
    for expected in text.chars() {
        if location.current_char != expected {
            return false;
        }
        location = location.advance(state.buffer);
    }
    let mut ctx = MatcherContext::at(parent.current);
    ctx.current = location;
    succeed(grammar, id, parent, label_override, ctx);
    true
}

// ----------------------------------------------------------------------
// Composite matching
// ----------------------------------------------------------------------

fn match_repetition<V>(
    grammar: &Grammar<V>,
    id: RuleId,
    child: RuleId,
    at_least_one: bool,
    state: &mut ParseState<'_, V>,
    parent: &mut MatcherContext<V>,
    label_override: Option<&str>,
) -> Result<bool, EngineError> {
    let mut ctx = MatcherContext::at(parent.current);
    let mut matched_any = false;
    loop {
        let before = ctx.current.index;
        if !run_matcher(grammar, child, state, &mut ctx)? {
            break;
        }
        // A successful iteration that consumed nothing would iterate
        // forever; the grammar is defective.
        if ctx.current.index == before {
            return Err(zero_width_error(grammar, id, state, ctx.current));
        }
        matched_any = true;
    }
    if at_least_one && !matched_any {
        return Ok(false);
    }
    succeed(grammar, id, parent, label_override, ctx);
    Ok(true)
}

fn match_predicate<V>(
    grammar: &Grammar<V>,
    child: RuleId,
    negate: bool,
    state: &mut ParseState<'_, V>,
    parent: &mut MatcherContext<V>,
) -> Result<bool, EngineError> {
    let mut ctx = MatcherContext::at(parent.current);
    state.predicate_depth += 1;
    let result = run_matcher(grammar, child, state, &mut ctx);
    state.predicate_depth -= 1;
    // The lookahead context is discarded whole: no node, no advance.
    let matched = result?;
    Ok(matched != negate)
}

/// Commits a successful invocation into the parent: advances the cursor
/// and applies the node-creation policy.
fn succeed<V>(
    grammar: &Grammar<V>,
    id: RuleId,
    parent: &mut MatcherContext<V>,
    label_override: Option<&str>,
    ctx: MatcherContext<V>,
) {
    parent.current = ctx.current;
    let flags = grammar.matcher(id).flags;
    if flags.suppress_node {
        return;
    }
    if flags.skip_node {
        parent.sub_nodes.extend(ctx.sub_nodes);
        return;
    }
    let children = if flags.suppress_subnodes {
        Vec::new()
    } else {
        ctx.sub_nodes
    };
    let label = match label_override {
        Some(label) => label.to_string(),
        None => grammar.label(id),
    };
    parent.sub_nodes.push(ParseNode {
        label,
        start: ctx.start,
        end: ctx.current,
        children,
        value: ctx.value,
    });
}

fn zero_width_error<V>(
    grammar: &Grammar<V>,
    id: RuleId,
    state: &ParseState<'_, V>,
    location: InputLocation,
) -> EngineError {
    let offset = state.buffer.byte_offset(location.index);
    EngineError::ZeroWidthRepetition {
        label: grammar.label(id),
        src: state.buffer.to_named_source(),
        span: SourceSpan::from(offset..offset),
    }
}
