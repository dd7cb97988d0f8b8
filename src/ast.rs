//! The syntax tree produced by the parser engine.
//!
//! A [Node] is either a leaf token string or an internal node tagged with the
//! name of the rule that matched it, holding an ordered list of children.
//! This is the heterogeneous-tree encoding called for by the design notes:
//! a tagged variant rather than a dynamically-typed tree of mixed values.

use ptree::TreeItem;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt::{Debug, Formatter};

#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// A matched token, e.g. an identifier, a numeric literal, an operator symbol.
    Leaf { text: String, start: usize, end: usize },
    /// A named-rule match. `tag` is the rule identifier; underscore-prefixed
    /// rule names never appear here because anonymous matches are flattened
    /// into the parent's children at parse time.
    Inner {
        tag: &'static str,
        start: usize,
        end: usize,
        children: Vec<Node>,
    },
}

impl Node {
    pub fn leaf(text: impl Into<String>, start: usize, end: usize) -> Self {
        Node::Leaf {
            text: text.into(),
            start,
            end,
        }
    }

    pub fn inner(tag: &'static str, start: usize, end: usize, children: Vec<Node>) -> Self {
        Node::Inner {
            tag,
            start,
            end,
            children,
        }
    }

    pub fn start(&self) -> usize {
        match self {
            Node::Leaf { start, .. } => *start,
            Node::Inner { start, .. } => *start,
        }
    }

    pub fn end(&self) -> usize {
        match self {
            Node::Leaf { end, .. } => *end,
            Node::Inner { end, .. } => *end,
        }
    }

    pub fn tag(&self) -> Option<&'static str> {
        match self {
            Node::Leaf { .. } => None,
            Node::Inner { tag, .. } => Some(tag),
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Leaf { .. } => &[],
            Node::Inner { children, .. } => children,
        }
    }

    /// Concatenated leaf text covered by this node, in source order, joined
    /// by single spaces. Used wherever a subtree needs a flat textual form.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Leaf { text, .. } => {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(text);
            }
            Node::Inner { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// First direct child tagged `tag`, if any.
    pub fn child(&self, tag: &str) -> Option<&Node> {
        self.children().iter().find(|c| c.tag() == Some(tag))
    }

    /// All direct children tagged `tag`.
    pub fn children_tagged<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Node> {
        self.children().iter().filter(move |c| c.tag() == Some(tag))
    }

    /// Depth-first search (self included) for the first node tagged `tag`.
    pub fn find(&self, tag: &str) -> Option<&Node> {
        if self.tag() == Some(tag) {
            return Some(self);
        }
        self.children().iter().find_map(|c| c.find(tag))
    }

    /// Depth-first search (self included) for every node tagged `tag`.
    pub fn find_all<'a>(&'a self, tag: &'a str, out: &mut Vec<&'a Node>) {
        if self.tag() == Some(tag) {
            out.push(self);
        }
        for child in self.children() {
            child.find_all(tag, out);
        }
    }

    pub fn is_empty_inner(&self) -> bool {
        matches!(self, Node::Inner { children, .. } if children.is_empty())
    }
}

impl Debug for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Node::Leaf { text, start, end } => write!(f, "{:?}#{}-{}", text, start, end),
            Node::Inner {
                tag,
                start,
                end,
                children,
            } => {
                let mut s = f.debug_struct(tag);
                s.field("span", &(start, end));
                if !children.is_empty() {
                    s.field("children", children);
                }
                s.finish()
            }
        }
    }
}

impl TreeItem for Node {
    type Child = Node;

    fn write_self<W: std::io::Write>(&self, f: &mut W, _: &ptree::Style) -> std::io::Result<()> {
        match self {
            Node::Leaf { text, start, end } => write!(f, "{:?} # {}-{}", text, start, end),
            Node::Inner { tag, start, end, .. } => write!(f, "{} # {}-{}", tag, start, end),
        }
    }

    fn children(&self) -> Cow<[Self::Child]> {
        Cow::from(self.children())
    }
}

impl Node {
    /// Pretty-print the tree to stdout using `ptree`, mirroring the AST-only
    /// CLI mode.
    pub fn print(&self) -> std::io::Result<()> {
        ptree::print_tree(self)
    }
}
