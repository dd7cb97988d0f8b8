//! Graphviz DOT rendering (§4.7): one digraph, one `subgraph cluster_<state>`
//! per PDG, for visualizing control/data dependency structure.

use crate::ast::Node;
use crate::pdg::{EdgeKind, Label, Pdg, StatementType};
use std::fmt::Write;

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn node_id(state_id: &str, node_id: usize) -> String {
    format!("n_{}_{}", state_id.replace(|c: char| !c.is_alphanumeric(), "_"), node_id)
}

fn label_text(label: Option<Label>) -> &'static str {
    match label {
        Some(Label::Then) => "then",
        Some(Label::Elsif) => "elsif",
        Some(Label::Else) => "else",
        None => "",
    }
}

/// Render a parse tree as a parent-child digraph, for `--ast-only` output
/// to a non-terminal sink.
pub fn render_ast(tree: &Node) -> String {
    let mut out = String::new();
    writeln!(out, "digraph ast {{").unwrap();
    let mut next_id = 0usize;
    render_ast_node(&mut out, tree, &mut next_id);
    writeln!(out, "}}").unwrap();
    out
}

fn render_ast_node(out: &mut String, node: &Node, next_id: &mut usize) -> usize {
    let id = *next_id;
    *next_id += 1;
    let label = match node {
        Node::Leaf { text, .. } => escape(text),
        Node::Inner { tag, .. } => escape(tag),
    };
    writeln!(out, "  n{} [label=\"{}\"];", id, label).unwrap();
    for child in node.children() {
        let child_id = render_ast_node(out, child, next_id);
        writeln!(out, "  n{} -> n{};", id, child_id).unwrap();
    }
    id
}

/// Render every PDG into one `digraph`.
pub fn render(pdgs: &[Pdg]) -> String {
    let mut out = String::new();
    writeln!(out, "digraph pdg {{").unwrap();
    for pdg in pdgs {
        writeln!(out, "  subgraph cluster_{} {{", pdg.state_id.replace(|c: char| !c.is_alphanumeric(), "_")).unwrap();
        writeln!(out, "    label = \"state {}\";", escape(&pdg.state_id)).unwrap();
        for n in &pdg.nodes {
            let shape = match n.statement_type {
                StatementType::Condition => "diamond",
                StatementType::Assignment => "box",
            };
            writeln!(
                out,
                "    {} [label=\"{}\", shape={}];",
                node_id(&pdg.state_id, n.id),
                escape(&n.statement_text),
                shape
            )
            .unwrap();
        }
        for e in &pdg.edges {
            match &e.kind {
                EdgeKind::Control { label } => {
                    writeln!(
                        out,
                        "    {} -> {} [style=solid, label=\"{}\"];",
                        node_id(&pdg.state_id, e.from),
                        node_id(&pdg.state_id, e.to),
                        label_text(*label),
                    )
                    .unwrap();
                }
                EdgeKind::Data { variable } => {
                    writeln!(
                        out,
                        "    {} -> {} [style=dashed, label=\"{}\"];",
                        node_id(&pdg.state_id, e.from),
                        node_id(&pdg.state_id, e.to),
                        escape(variable),
                    )
                    .unwrap();
                }
            }
        }
        writeln!(out, "  }}").unwrap();
    }
    writeln!(out, "}}").unwrap();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::parse;
    use crate::grammar::st;
    use crate::pdg;

    #[test]
    fn renders_one_cluster_per_state_with_styled_edges() {
        let src = "CASE st OF 10: IF A=1 THEN X := 1; END_IF; END_CASE;";
        let tree = parse(&st::grammar(false), src).unwrap();
        let pdgs = pdg::build(&tree);
        let dot = render(&pdgs);
        assert!(dot.starts_with("digraph pdg {"));
        assert!(dot.contains("subgraph cluster_10"));
        assert!(dot.contains("style=solid"));
    }

    #[test]
    fn empty_pdg_set_yields_empty_digraph() {
        let dot = render(&[]);
        assert_eq!(dot, "digraph pdg {\n}\n");
    }

    #[test]
    fn ast_render_links_every_child_to_its_parent() {
        let tree = Node::inner("expr", 0, 3, vec![Node::leaf("A", 0, 1), Node::leaf("+", 1, 2), Node::leaf("B", 2, 3)]);
        let dot = render_ast(&tree);
        assert!(dot.starts_with("digraph ast {"));
        assert_eq!(dot.matches("->").count(), 3);
    }
}
