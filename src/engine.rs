//! The parser engine: a backtracking recursive-descent interpreter over a
//! [Grammar], producing an [ast::Node] tree.
//!
//! Matching is expressed as ordinary functions returning `Result<(usize,
//! Vec<Node>), ()>` rather than a family of trait-object combinators — with
//! position threaded by value, a failed attempt simply discards its
//! `Result` and the caller retries from the position it already held. No
//! explicit snapshot/restore bookkeeping is needed; Rust's ownership model
//! gives it to us for free.

use crate::ast::Node;
use crate::error::SyntaxError;
use crate::grammar::{Grammar, Quantifier, Rule};
use std::cell::Cell;

struct Engine<'g> {
    grammar: &'g Grammar,
    source: &'g str,
    /// The furthest position reached by any match attempt, successful or
    /// not. Used to localize the error when the overall parse fails — the
    /// "minimum remaining-text length ever observed" of spec §4.2.
    max_parsed: Cell<usize>,
}

type MatchResult = Result<(usize, Vec<Node>), ()>;

impl<'g> Engine<'g> {
    fn bump(&self, pos: usize) {
        if pos > self.max_parsed.get() {
            self.max_parsed.set(pos);
        }
    }

    /// Skip leading whitespace and comments at `pos`, iterating until
    /// neither pattern matches any further.
    fn skip(&self, pos: usize) -> usize {
        let mut cur = pos;
        loop {
            let mut advanced = false;
            if let Some(ws) = &self.grammar.whitespace {
                if let Some(m) = ws.find(&self.source[cur..]) {
                    if m.start() == 0 && m.end() > 0 {
                        cur += m.end();
                        advanced = true;
                    }
                }
            }
            if let Some(comment) = &self.grammar.comment {
                // Matched through `match_comment`, never `match_rule`: the
                // comment rule is itself skipped over, so re-entering `skip`
                // at the same position would recurse forever.
                if let Ok((end, _)) = self.match_comment(comment, cur) {
                    if end > cur {
                        cur = end;
                        advanced = true;
                    }
                }
            }
            if !advanced {
                break;
            }
        }
        cur
    }

    /// Match the grammar's comment rule without skipping, since the comment
    /// rule is what `skip` uses to decide what to skip. A `Choice` of
    /// comment alternatives (e.g. block and line comments) recurses into
    /// this same skip-free matcher rather than into `match_rule`/`match_core`,
    /// which would call back into `skip` at an unchanged position and
    /// recurse forever.
    fn match_comment(&self, rule: &Rule, pos: usize) -> MatchResult {
        match rule {
            Rule::Choice(alts) => {
                for alt in alts {
                    if let Ok(result) = self.match_comment(alt, pos) {
                        return Ok(result);
                    }
                }
                Err(())
            }
            Rule::Literal(s) => self.match_literal(s, pos),
            Rule::Keyword(s) => self.match_keyword(s, pos),
            Rule::Regex(re) => self.match_regex(re, pos),
            Rule::NestedComment(open, close) => self.match_nested_comment(open, close, pos),
            // A comment pattern is always one of the leaf kinds above (or a
            // choice of them); the remaining kinds never appear as a
            // comment rule in practice.
            Rule::Ref(_) | Rule::Seq(_) | Rule::And(_) | Rule::Not(_) => Err(()),
        }
    }

    /// Entry point for matching any sub-pattern: skips whitespace/comments
    /// first, as required on every entry to a sub-pattern.
    fn match_rule(&self, rule: &Rule, pos: usize) -> MatchResult {
        let pos = self.skip(pos);
        self.bump(pos);
        self.match_core(rule, pos)
    }

    fn match_core(&self, rule: &Rule, pos: usize) -> MatchResult {
        match rule {
            Rule::Literal(s) => self.match_literal(s, pos),
            Rule::Keyword(s) => self.match_keyword(s, pos),
            Rule::Regex(re) => self.match_regex(re, pos),
            Rule::Ref(name) => self.match_ref(name, pos),
            Rule::Seq(items) => self.match_seq(items, pos),
            Rule::Choice(alts) => self.match_choice(alts, pos),
            Rule::And(inner) => match self.match_rule(inner, pos) {
                Ok(_) => Ok((pos, Vec::new())),
                Err(()) => Err(()),
            },
            Rule::Not(inner) => match self.match_rule(inner, pos) {
                Ok(_) => Err(()),
                Err(()) => Ok((pos, Vec::new())),
            },
            Rule::NestedComment(open, close) => self.match_nested_comment(open, close, pos),
        }
    }

    /// Depth-counting scan for a comment that may nest: every occurrence of
    /// `open` increments depth, every `close` decrements it, and the match
    /// succeeds when depth returns to zero. Regexes cannot express this.
    fn match_nested_comment(&self, open: &str, close: &str, pos: usize) -> MatchResult {
        if !self.source[pos..].starts_with(open) {
            return Err(());
        }
        let mut depth = 1usize;
        let mut cur = pos + open.len();
        loop {
            if cur >= self.source.len() {
                return Err(());
            }
            let tail = &self.source[cur..];
            if tail.starts_with(open) {
                depth += 1;
                cur += open.len();
            } else if tail.starts_with(close) {
                depth -= 1;
                cur += close.len();
                if depth == 0 {
                    return Ok((cur, Vec::new()));
                }
            } else {
                let ch_len = tail.chars().next().map(char::len_utf8).unwrap_or(1);
                cur += ch_len;
            }
        }
    }

    fn match_literal(&self, s: &str, pos: usize) -> MatchResult {
        if self.source[pos..].starts_with(s) {
            Ok((pos + s.len(), Vec::new()))
        } else {
            Err(())
        }
    }

    fn match_keyword(&self, s: &str, pos: usize) -> MatchResult {
        let rest = &self.source[pos..];
        if rest.len() < s.len() || !rest.as_bytes()[..s.len()].eq_ignore_ascii_case(s.as_bytes()) {
            return Err(());
        }
        let boundary_ok = match rest.as_bytes().get(s.len()) {
            Some(c) => !(c.is_ascii_alphanumeric() || *c == b'_'),
            None => true,
        };
        if boundary_ok {
            Ok((pos + s.len(), Vec::new()))
        } else {
            Err(())
        }
    }

    fn match_regex(&self, re: &regex::Regex, pos: usize) -> MatchResult {
        match re.find(&self.source[pos..]) {
            Some(m) if m.start() == 0 => {
                let end = pos + m.end();
                self.bump(end);
                Ok((end, vec![Node::leaf(m.as_str(), pos, end)]))
            }
            _ => Err(()),
        }
    }

    fn match_ref(&self, name: &'static str, pos: usize) -> MatchResult {
        let rule = self.grammar.rule(name);
        let (end, children) = self.match_rule(rule, pos)?;
        if name.starts_with('_') {
            Ok((end, children))
        } else {
            Ok((end, vec![Node::inner(name, pos, end, children)]))
        }
    }

    fn match_seq(&self, items: &[(Quantifier, Rule)], pos: usize) -> MatchResult {
        let mut cur = pos;
        let mut children = Vec::new();
        for (quantifier, rule) in items {
            match quantifier {
                Quantifier::Exact(n) => {
                    for _ in 0..*n {
                        let (end, c) = self.match_rule(rule, cur)?;
                        cur = end;
                        children.extend(c);
                    }
                }
                Quantifier::Optional => {
                    if let Ok((end, c)) = self.match_rule(rule, cur) {
                        cur = end;
                        children.extend(c);
                    }
                }
                Quantifier::ZeroOrMore => {
                    while let Ok((end, c)) = self.match_rule(rule, cur) {
                        let made_progress = end > cur;
                        cur = end;
                        children.extend(c);
                        if !made_progress {
                            break;
                        }
                    }
                }
                Quantifier::OneOrMore => {
                    let mut iterations = 0usize;
                    loop {
                        match self.match_rule(rule, cur) {
                            Ok((end, c)) => {
                                iterations += 1;
                                let made_progress = end > cur;
                                cur = end;
                                children.extend(c);
                                if !made_progress {
                                    break;
                                }
                            }
                            Err(()) => break,
                        }
                    }
                    if iterations == 0 {
                        return Err(());
                    }
                }
            }
        }
        Ok((cur, children))
    }

    fn match_choice(&self, alts: &[Rule], pos: usize) -> MatchResult {
        for alt in alts {
            if let Ok(result) = self.match_rule(alt, pos) {
                return Ok(result);
            }
        }
        Err(())
    }
}

/// Parse `source` against `grammar`, producing the root [Node] or a
/// [SyntaxError] pinpointing the earliest position the grammar could not
/// account for.
pub fn parse(grammar: &Grammar, source: &str) -> Result<Node, SyntaxError> {
    let engine = Engine {
        grammar,
        source,
        max_parsed: Cell::new(0),
    };
    let root = grammar.root();
    match engine.match_rule(&Rule::Ref(root), 0) {
        Ok((end, mut children)) => {
            let trailing = engine.skip(end);
            if trailing == source.len() {
                Ok(children
                    .pop()
                    .unwrap_or_else(|| Node::inner(root, 0, trailing, Vec::new())))
            } else {
                Err(SyntaxError::new(
                    source.as_bytes(),
                    trailing,
                    "unconsumed trailing input",
                ))
            }
        }
        Err(()) => Err(SyntaxError::new(
            source.as_bytes(),
            engine.max_parsed.get(),
            "unexpected input",
        )),
    }
}
