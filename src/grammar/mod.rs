//! Grammar description: a declarative tree of [Rule] values interpreted by
//! the [crate::engine] at parse time, rather than a bespoke hand-written
//! parsing function per rule.
//!
//! Rule references resolve through a name-keyed table owned by [Grammar],
//! so mutually recursive rules (e.g. `expr` referring back to itself through
//! `primary` and parentheses) don't need cyclic ownership.

pub mod st;

use regex::Regex;
use std::collections::HashMap;

/// Repetition applied to a sub-pattern inside a [Rule::Seq]. Resets to
/// `Exact(1)` after the sub-pattern it governs; it does not propagate past
/// the single slot it precedes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quantifier {
    /// Match exactly `n` times.
    Exact(usize),
    /// Zero or one occurrence; never fails.
    Optional,
    /// Zero or more occurrences (greedy, stops at first inner failure).
    ZeroOrMore,
    /// One or more occurrences; fails overall if zero iterations succeed.
    OneOrMore,
}

/// A grammar value. Named rules are looked up by string key in
/// [Grammar::rules]; a name beginning with `_` is anonymous and its match
/// flattens into the parent's child list instead of introducing a tagged
/// node.
#[derive(Clone)]
pub enum Rule {
    /// Match a string exactly; consumed, no node emitted.
    Literal(&'static str),
    /// Like [Rule::Literal] but the match must be a whole word (not
    /// immediately followed by an identifier continuation character).
    Keyword(&'static str),
    /// Match the longest prefix satisfying a compiled regular expression;
    /// emits its matched text as a leaf.
    Regex(Regex),
    /// Invoke another rule by name.
    Ref(&'static str),
    /// Ordered sequence; each element matched in turn, each preceded by its
    /// own quantifier.
    Seq(Vec<(Quantifier, Rule)>),
    /// Ordered choice; the first alternative that fully matches commits
    /// (no longest-match semantics).
    Choice(Vec<Rule>),
    /// Positive lookahead: succeed iff the inner rule matches; consumes
    /// nothing and emits nothing.
    And(Box<Rule>),
    /// Negative lookahead: succeed iff the inner rule does NOT match;
    /// consumes nothing and emits nothing.
    Not(Box<Rule>),
    /// A comment delimited by `open`/`close` that may nest arbitrarily deep.
    /// Not expressible as a regular expression, so it gets its own terminal
    /// kind rather than being folded into [Rule::Regex]; matched, consumed,
    /// emits no node. Used only as (part of) a grammar's comment pattern.
    NestedComment(&'static str, &'static str),
}

/// Grammar: a root rule name plus a table of named rules, along with the
/// whitespace/comment skipping configuration shared by every sub-pattern
/// match attempt.
pub struct Grammar {
    pub(crate) rules: HashMap<&'static str, Rule>,
    pub(crate) root: &'static str,
    pub(crate) whitespace: Option<Regex>,
    pub(crate) comment: Option<Rule>,
}

impl Grammar {
    pub fn builder() -> GrammarBuilder {
        GrammarBuilder::default()
    }

    pub fn rule(&self, name: &str) -> &Rule {
        self.rules.get(name).unwrap_or_else(|| {
            panic!("grammar rule `{name}` referenced but not defined");
        })
    }

    pub fn root(&self) -> &'static str {
        self.root
    }
}

#[derive(Default)]
pub struct GrammarBuilder {
    rules: HashMap<&'static str, Rule>,
    root: Option<&'static str>,
    whitespace: Option<Regex>,
    comment: Option<Rule>,
}

impl GrammarBuilder {
    pub fn rule(mut self, name: &'static str, value: Rule) -> Self {
        self.rules.insert(name, value);
        self
    }

    pub fn root(mut self, name: &'static str) -> Self {
        self.root = Some(name);
        self
    }

    pub fn whitespace(mut self, pattern: &str) -> Self {
        self.whitespace = Some(Regex::new(pattern).expect("invalid whitespace regex"));
        self
    }

    /// Set the comment-skipping rule. Per spec this must itself be a grammar
    /// value (a regex or an alternation of regexes/literals) describing one
    /// comment; the engine re-applies it until it no longer matches.
    pub fn comment(mut self, value: Rule) -> Self {
        self.comment = Some(value);
        self
    }

    pub fn build(self) -> Grammar {
        let root = self.root.expect("grammar root rule not set");
        assert!(
            self.rules.contains_key(root),
            "grammar root `{root}` is not a defined rule"
        );
        Grammar {
            rules: self.rules,
            root,
            whitespace: self.whitespace,
            comment: self.comment,
        }
    }
}

// Small constructor helpers so grammar definitions (see `st.rs`) read as a
// flat table rather than nested `Rule::Variant` boilerplate.

pub fn lit(s: &'static str) -> Rule {
    Rule::Literal(s)
}
pub fn kw(s: &'static str) -> Rule {
    Rule::Keyword(s)
}
pub fn re(pattern: &str) -> Rule {
    Rule::Regex(Regex::new(pattern).unwrap_or_else(|e| panic!("invalid regex {pattern:?}: {e}")))
}
pub fn rf(name: &'static str) -> Rule {
    Rule::Ref(name)
}
pub fn choice(alternatives: Vec<Rule>) -> Rule {
    Rule::Choice(alternatives)
}
pub fn and(inner: Rule) -> Rule {
    Rule::And(Box::new(inner))
}
pub fn not(inner: Rule) -> Rule {
    Rule::Not(Box::new(inner))
}
pub fn seq(items: Vec<(Quantifier, Rule)>) -> Rule {
    Rule::Seq(items)
}
pub fn nested_comment(open: &'static str, close: &'static str) -> Rule {
    Rule::NestedComment(open, close)
}

/// Quantifier `1` (exactly once) — the default for a bare sequence slot.
pub fn one(r: Rule) -> (Quantifier, Rule) {
    (Quantifier::Exact(1), r)
}
/// Quantifier `0` (optional).
pub fn opt(r: Rule) -> (Quantifier, Rule) {
    (Quantifier::Optional, r)
}
/// Quantifier `-1` (zero or more).
pub fn star(r: Rule) -> (Quantifier, Rule) {
    (Quantifier::ZeroOrMore, r)
}
/// Quantifier `-2` (one or more).
pub fn plus(r: Rule) -> (Quantifier, Rule) {
    (Quantifier::OneOrMore, r)
}
