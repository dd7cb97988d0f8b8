//! XML rendering (§4.7, primary output format). Hand-written with
//! `std::fmt::Write` rather than a dependency, matching the teacher
//! library's own `impl_grammar` string-building idiom.

use crate::ast::Node;
use crate::invariant::{InvariantTemplate, TemplateKind};
use crate::pdg::{EdgeKind, Pdg};
use crate::serialize::{AnalysisSummary, Diagnostic};
use crate::variable::VariableTable;
use std::fmt::Write;

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn hyphenate(tag: &str) -> String {
    tag.replace('_', "-")
}

struct Writer {
    pretty: bool,
    depth: usize,
    buf: String,
}

impl Writer {
    fn new(pretty: bool) -> Self {
        Writer { pretty, depth: 0, buf: String::new() }
    }

    fn newline_indent(&mut self) {
        if self.pretty {
            self.buf.push('\n');
            for _ in 0..self.depth {
                self.buf.push_str("  ");
            }
        }
    }

    fn attrs(&mut self, attrs: &[(&str, String)]) {
        for (k, v) in attrs {
            write!(self.buf, " {}=\"{}\"", k, escape(v)).unwrap();
        }
    }

    fn open(&mut self, tag: &str, attrs: &[(&str, String)]) {
        self.newline_indent();
        write!(self.buf, "<{}", tag).unwrap();
        self.attrs(attrs);
        self.buf.push('>');
        self.depth += 1;
    }

    fn close(&mut self, tag: &str) {
        self.depth -= 1;
        self.newline_indent();
        write!(self.buf, "</{}>", tag).unwrap();
    }

    fn self_close(&mut self, tag: &str, attrs: &[(&str, String)]) {
        self.newline_indent();
        write!(self.buf, "<{}", tag).unwrap();
        self.attrs(attrs);
        self.buf.push_str("/>");
    }

    fn text(&mut self, s: &str) {
        self.buf.push_str(&escape(s));
    }
}

fn render_node(w: &mut Writer, node: &Node) {
    match node {
        Node::Leaf { text, .. } => w.text(text),
        Node::Inner { tag, children, .. } => {
            let tag = hyphenate(tag);
            if children.is_empty() {
                w.self_close(&tag, &[]);
            } else {
                w.open(&tag, &[]);
                for child in children {
                    render_node(w, child);
                }
                w.close(&tag);
            }
        }
    }
}

fn render_summary(w: &mut Writer, summary: &AnalysisSummary) {
    w.self_close(
        "analysis-summary",
        &[
            ("sensing-count", summary.sensing_count.to_string()),
            ("configuration-count", summary.configuration_count.to_string()),
            ("actuation-count", summary.actuation_count.to_string()),
            ("internal-count", summary.internal_count.to_string()),
            ("state-count", summary.state_count.to_string()),
            ("single-template-count", summary.single_template_count.to_string()),
            ("multi-template-count", summary.multi_template_count.to_string()),
            ("inter-template-count", summary.inter_template_count.to_string()),
        ],
    );
}

fn render_pdg_analysis(w: &mut Writer, vars: &VariableTable, pdgs: &[Pdg]) {
    w.open("pdg-analysis", &[]);
    for pdg in pdgs {
        w.open("state", &[("id", pdg.state_id.clone())]);

        w.open("variables", &[]);
        let mut names: Vec<&str> = pdg
            .nodes
            .iter()
            .flat_map(|n| n.reads.iter().chain(n.writes.iter()))
            .map(|s| s.as_str())
            .collect();
        names.sort();
        names.dedup();
        for name in names {
            if let Some(v) = vars.get(name) {
                w.self_close(
                    "variable",
                    &[
                        ("name", v.name.clone()),
                        ("role", v.role.to_string()),
                        ("data-type", v.data_type.clone()),
                    ],
                );
            }
        }
        w.close("variables");

        w.open("nodes", &[]);
        for n in &pdg.nodes {
            w.self_close(
                "node",
                &[
                    ("id", n.id.to_string()),
                    (
                        "type",
                        match n.statement_type {
                            crate::pdg::StatementType::Assignment => "assignment".to_string(),
                            crate::pdg::StatementType::Condition => "condition".to_string(),
                        },
                    ),
                    ("text", n.statement_text.clone()),
                    ("reads", n.reads.join(",")),
                    ("writes", n.writes.join(",")),
                ],
            );
        }
        w.close("nodes");

        w.open("edges", &[]);
        for e in &pdg.edges {
            match &e.kind {
                EdgeKind::Control { label } => {
                    let label = label
                        .map(|l| match l {
                            crate::pdg::Label::Then => "then",
                            crate::pdg::Label::Elsif => "elsif",
                            crate::pdg::Label::Else => "else",
                        })
                        .unwrap_or("")
                        .to_string();
                    w.self_close(
                        "edge",
                        &[
                            ("from", e.from.to_string()),
                            ("to", e.to.to_string()),
                            ("type", "control".to_string()),
                            ("label", label),
                        ],
                    );
                }
                EdgeKind::Data { variable } => {
                    w.self_close(
                        "edge",
                        &[
                            ("from", e.from.to_string()),
                            ("to", e.to.to_string()),
                            ("type", "data".to_string()),
                            ("variable", variable.clone()),
                        ],
                    );
                }
            }
        }
        w.close("edges");

        w.close("state");
    }
    w.close("pdg-analysis");
}

fn template_state_id(t: &InvariantTemplate) -> &str {
    match &t.kind {
        TemplateKind::Single { state_id, .. } => state_id,
        TemplateKind::Multi { state_id, .. } => state_id,
        TemplateKind::Inter { source_state, .. } => source_state,
    }
}

fn render_template(w: &mut Writer, index: usize, t: &InvariantTemplate) {
    match &t.kind {
        TemplateKind::Single { sensing_var, operator, structure, .. } => {
            w.self_close(
                "invariant",
                &[
                    ("id", index.to_string()),
                    ("type", "single".to_string()),
                    ("sensing-var", sensing_var.clone()),
                    ("operator", operator.clone()),
                    ("structure", structure.clone()),
                    ("confidence", t.confidence.to_string()),
                ],
            );
        }
        TemplateKind::Multi { sensing_vars, configuration_vars, structure, .. } => {
            w.self_close(
                "invariant",
                &[
                    ("id", index.to_string()),
                    ("type", "multi".to_string()),
                    ("sensing-vars", sensing_vars.join(",")),
                    ("configuration-vars", configuration_vars.join(",")),
                    ("structure", structure.clone()),
                    ("confidence", t.confidence.to_string()),
                ],
            );
        }
        TemplateKind::Inter {
            dest_state,
            state_variable,
            transition_condition,
            condition_variables,
            structure,
            ..
        } => {
            w.self_close(
                "invariant",
                &[
                    ("id", index.to_string()),
                    ("type", "inter".to_string()),
                    ("dest-state", dest_state.clone()),
                    ("state-variable", state_variable.clone()),
                    ("transition-condition", transition_condition.clone()),
                    ("condition-variables", condition_variables.join(",")),
                    ("structure", structure.clone()),
                    ("confidence", t.confidence.to_string()),
                ],
            );
        }
    }
}

fn render_templates(w: &mut Writer, pdgs: &[Pdg], templates: &[InvariantTemplate]) {
    w.open("invariant-templates", &[]);
    for pdg in pdgs {
        w.open("state", &[("id", pdg.state_id.clone())]);
        for (index, t) in templates
            .iter()
            .enumerate()
            .filter(|(_, t)| template_state_id(t) == pdg.state_id.as_str())
        {
            render_template(w, index, t);
        }
        w.close("state");
    }
    w.close("invariant-templates");
}

fn render_diagnostics(w: &mut Writer, diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    w.open("diagnostics", &[]);
    for d in diagnostics {
        w.self_close("diagnostic", &[("message", d.message.clone())]);
    }
    w.close("diagnostics");
}

/// Render only the parse tree, for `--ast-only` output to a non-terminal
/// sink.
pub fn render_ast(tree: &Node, pretty: bool) -> String {
    let mut w = Writer::new(pretty);
    w.buf.push_str("<?xml version=\"1.0\"?>");
    render_node(&mut w, tree);
    if pretty {
        w.buf.push('\n');
    }
    w.buf
}

/// Render the full analysis result to XML. Deterministic for a given
/// `pretty` flag and input: no iteration over unordered maps.
pub fn render(
    tree: &Node,
    vars: &VariableTable,
    pdgs: &[Pdg],
    templates: &[InvariantTemplate],
    summary: &AnalysisSummary,
    diagnostics: &[Diagnostic],
    pretty: bool,
) -> String {
    let mut w = Writer::new(pretty);
    w.buf.push_str("<?xml version=\"1.0\"?>");
    w.open("iec-source", &[]);
    render_summary(&mut w, summary);
    w.open("program", &[]);
    render_node(&mut w, tree);
    w.close("program");
    render_pdg_analysis(&mut w, vars, pdgs);
    render_templates(&mut w, pdgs, templates);
    render_diagnostics(&mut w, diagnostics);
    w.close("iec-source");
    if pretty {
        w.buf.push('\n');
    }
    w.buf
}
