//! Program Dependency Graph construction: one [Pdg] per `CASE` arm (state),
//! with control edges (governing-predicate-of) and data edges
//! (definition-reaches-use), built per §4.4.

use crate::ast::Node;
use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Which branch of its governing condition a control edge's target lies in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Then,
    Elsif,
    Else,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementType {
    Assignment,
    Condition,
}

#[derive(Debug, Clone, Serialize)]
pub struct PdgNode {
    pub id: usize,
    pub statement_type: StatementType,
    pub statement_text: String,
    pub reads: Vec<String>,
    pub writes: Vec<String>,
    pub ast_ref: Node,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Control { label: Option<Label> },
    Data { variable: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct PdgEdge {
    pub from: usize,
    pub to: usize,
    pub kind: EdgeKind,
}

#[derive(Serialize)]
pub struct Pdg {
    pub state_id: String,
    pub state_variable: String,
    pub nodes: Vec<PdgNode>,
    pub edges: Vec<PdgEdge>,
}

impl Pdg {
    pub fn node(&self, id: usize) -> Option<&PdgNode> {
        self.nodes.get(id)
    }

    /// The surviving control predecessors of `id` (after pruning, at most
    /// one) together with the label on that edge.
    pub fn control_predecessors(&self, id: usize) -> Vec<(usize, Option<Label>)> {
        self.edges
            .iter()
            .filter_map(|e| match &e.kind {
                EdgeKind::Control { label } if e.to == id => Some((e.from, *label)),
                _ => None,
            })
            .collect()
    }

    pub fn data_predecessors(&self, id: usize) -> Vec<(usize, &str)> {
        self.edges
            .iter()
            .filter_map(|e| match &e.kind {
                EdgeKind::Data { variable } if e.to == id => Some((e.from, variable.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Walk up the chain of immediate control predecessors from `id` to the
    /// PDG root, collecting each predicate node's parenthesized printed
    /// condition and the set of variables it reads, innermost first.
    pub fn control_chain(&self, id: usize) -> (Vec<String>, Vec<String>) {
        let mut conditions = Vec::new();
        let mut seen_vars = HashSet::new();
        let mut variables = Vec::new();
        let mut current = id;
        loop {
            let preds = self.control_predecessors(current);
            let Some(&(parent_id, _)) = preds.first() else {
                break;
            };
            if let Some(parent) = self.node(parent_id) {
                conditions.push(format!("({})", parent.statement_text));
                for v in &parent.reads {
                    if seen_vars.insert(v.clone()) {
                        variables.push(v.clone());
                    }
                }
            }
            current = parent_id;
        }
        (conditions, variables)
    }
}

static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Variables textually read within an expression subtree, in source order,
/// deduplicated.
pub fn variables_in(expr: &Node) -> Vec<String> {
    let mut idents = Vec::new();
    expr.find_all("identifier", &mut idents);
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for ident in idents {
        let text = ident.text();
        if IDENTIFIER_RE.is_match(&text) && seen.insert(text.clone()) {
            out.push(text);
        }
    }
    out
}

static OPEN_SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([(\[]) +").unwrap());
static CLOSE_SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r" +([)\].,])").unwrap());

/// Reconstruct readable (not round-trip) text for an expression or
/// statement subtree: leaves joined by single spaces, then spaces adjacent
/// to bracket/grouping punctuation squeezed out.
pub fn print_expr(node: &Node) -> String {
    let raw = node.text();
    let step1 = OPEN_SPACE_RE.replace_all(&raw, "$1");
    let step2 = CLOSE_SPACE_RE.replace_all(&step1, "$1");
    step2.into_owned()
}

struct Builder<'a> {
    nodes: &'a mut Vec<PdgNode>,
    edges: &'a mut Vec<PdgEdge>,
    next_id: usize,
}

impl<'a> Builder<'a> {
    fn emit(&mut self, kind: StatementType, ast_ref: Node, reads: Vec<String>, writes: Vec<String>, ctx: &[(usize, Label)]) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        let statement_text = print_expr(&ast_ref);
        for &(ancestor, label) in ctx {
            self.edges.push(PdgEdge {
                from: ancestor,
                to: id,
                kind: EdgeKind::Control { label: Some(label) },
            });
        }
        self.nodes.push(PdgNode {
            id,
            statement_type: kind,
            statement_text,
            reads,
            writes,
            ast_ref,
        });
        id
    }

    fn process_block(&mut self, statements: &[Node], ctx: Vec<(usize, Label)>) {
        for stmt in statements {
            match stmt.tag() {
                Some("assignment") => {
                    let Some(ident) = stmt.child("identifier") else { continue };
                    let Some(expr) = stmt.child("expr") else { continue };
                    let write_var = ident.text();
                    let reads = variables_in(expr);
                    self.emit(StatementType::Assignment, stmt.clone(), reads, vec![write_var], &ctx);
                }
                Some("if_stmt") => self.build_if(stmt, &ctx),
                _ => {}
            }
        }
    }

    fn build_if(&mut self, if_node: &Node, ctx: &[(usize, Label)]) {
        let Some(cond_expr) = if_node.child("expr") else { return };
        let reads = variables_in(cond_expr);
        let cond_id = self.emit(StatementType::Condition, cond_expr.clone(), reads, Vec::new(), ctx);

        if let Some(then_block) = if_node.child("then_block") {
            let mut then_ctx = ctx.to_vec();
            then_ctx.push((cond_id, Label::Then));
            self.process_block(then_block.children(), then_ctx);
        }

        let mut chain_ctx = ctx.to_vec();
        chain_ctx.push((cond_id, Label::Elsif));

        for elsif in if_node.children_tagged("elsif_clause") {
            let Some(elsif_expr) = elsif.child("expr") else { continue };
            let elsif_reads = variables_in(elsif_expr);
            let elsif_id = self.emit(StatementType::Condition, elsif_expr.clone(), elsif_reads, Vec::new(), &chain_ctx);
            if let Some(then_block) = elsif.child("then_block") {
                let mut then_ctx = chain_ctx.clone();
                then_ctx.push((elsif_id, Label::Then));
                self.process_block(then_block.children(), then_ctx);
            }
            chain_ctx.push((elsif_id, Label::Elsif));
        }

        if let Some(else_block) = if_node.child("else_block") {
            let mut else_ctx = chain_ctx.clone();
            if let Some(last) = else_ctx.last_mut() {
                last.1 = Label::Else;
            }
            self.process_block(else_block.children(), else_ctx);
        }
    }
}

/// Cascade-then-prune: every node with more than one control predecessor
/// keeps only those not themselves reachable from another predecessor via a
/// direct control edge, leaving an antichain (in practice exactly one
/// immediate enclosing predicate).
fn prune_control_edges(edges: &mut Vec<PdgEdge>) {
    let direct: HashSet<(usize, usize)> = edges
        .iter()
        .filter(|e| matches!(e.kind, EdgeKind::Control { .. }))
        .map(|e| (e.from, e.to))
        .collect();

    let mut predecessors: HashMap<usize, Vec<usize>> = HashMap::new();
    for e in edges.iter() {
        if matches!(e.kind, EdgeKind::Control { .. }) {
            predecessors.entry(e.to).or_default().push(e.from);
        }
    }

    let mut to_remove: HashSet<(usize, usize)> = HashSet::new();
    for (target, preds) in &predecessors {
        if preds.len() < 2 {
            continue;
        }
        for &p1 in preds {
            for &p2 in preds {
                if p1 != p2 && direct.contains(&(p1, p2)) {
                    to_remove.insert((p1, *target));
                }
            }
        }
    }

    edges.retain(|e| !matches!(e.kind, EdgeKind::Control { .. }) || !to_remove.contains(&(e.from, e.to)));
}

/// Last-writer-wins reaching-definition synthesis, processed in increasing
/// node-id (source) order.
fn synthesize_data_edges(nodes: &[PdgNode], edges: &mut Vec<PdgEdge>) {
    let mut last_def: HashMap<String, usize> = HashMap::new();
    for n in nodes {
        for v in &n.reads {
            if let Some(&def_id) = last_def.get(v) {
                edges.push(PdgEdge {
                    from: def_id,
                    to: n.id,
                    kind: EdgeKind::Data { variable: v.clone() },
                });
            }
        }
        for v in &n.writes {
            last_def.insert(v.clone(), n.id);
        }
    }
}

fn build_one(state_id: String, state_variable: String, then_block: &Node) -> Pdg {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    {
        let mut builder = Builder {
            nodes: &mut nodes,
            edges: &mut edges,
            next_id: 0,
        };
        builder.process_block(then_block.children(), Vec::new());
    }
    prune_control_edges(&mut edges);
    synthesize_data_edges(&nodes, &mut edges);
    Pdg {
        state_id,
        state_variable,
        nodes,
        edges,
    }
}

/// Build one [Pdg] per numeric state id named in the program's top-level
/// `CASE` statement. A program with no `CASE` yields an empty set.
///
/// Each `case_element` is independent (same read-only state variable name,
/// own output PDGs), so construction is parallelized across them; the
/// result is sorted by `state_id` afterward so output ordering stays
/// deterministic regardless of scheduling.
pub fn build(program: &Node) -> Vec<Pdg> {
    let Some(case_stmt) = program.find("case_stmt") else {
        return Vec::new();
    };
    let Some(state_var_node) = case_stmt.child("identifier") else {
        return Vec::new();
    };
    let state_variable = state_var_node.text();

    let case_elements: Vec<&Node> = case_stmt.children_tagged("case_element").collect();
    let mut pdgs: Vec<Pdg> = case_elements
        .par_iter()
        .flat_map_iter(|case_element| {
            let then_block = case_element.child("then_block");
            let state_variable = state_variable.clone();
            case_element
                .children_tagged("int_literal")
                .filter_map(move |id_node| {
                    then_block.map(|block| build_one(id_node.text(), state_variable.clone(), block))
                })
        })
        .collect();
    pdgs.sort_by(|a, b| a.state_id.cmp(&b.state_id));
    pdgs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::parse;
    use crate::grammar::st;

    fn parse_program(src: &str) -> Node {
        parse(&st::grammar(false), src).unwrap()
    }

    #[test]
    fn scenario_one_single_condition_then_assignment() {
        let tree = parse_program(
            "VAR_INPUT H_Sensor : REAL; END_VAR VAR_OUTPUT H_Actuator : BOOL; END_VAR \
             CASE st OF 10: IF H_Sensor <= 100 THEN H_Actuator := FALSE; END_IF; END_CASE;",
        );
        let pdgs = build(&tree);
        assert_eq!(pdgs.len(), 1);
        let pdg = &pdgs[0];
        assert_eq!(pdg.state_id, "10");
        assert_eq!(pdg.nodes.len(), 2);
        assert_eq!(pdg.nodes[0].statement_type, StatementType::Condition);
        assert_eq!(pdg.nodes[0].reads, vec!["H_Sensor".to_string()]);
        assert_eq!(pdg.nodes[1].writes, vec!["H_Actuator".to_string()]);
        let control: Vec<_> = pdg
            .edges
            .iter()
            .filter(|e| matches!(e.kind, EdgeKind::Control { .. }))
            .collect();
        assert_eq!(control.len(), 1);
        assert_eq!(control[0].from, 0);
        assert_eq!(control[0].to, 1);
    }

    #[test]
    fn nested_if_leaves_one_immediate_predecessor_after_pruning() {
        let tree = parse_program(
            "CASE st OF 10: IF A=1 THEN IF B=2 THEN st := 20; END_IF; END_IF; END_CASE;",
        );
        let pdgs = build(&tree);
        let pdg = &pdgs[0];
        // node 0 = A=1 condition, node 1 = B=2 condition, node 2 = st:=20
        let preds = pdg.control_predecessors(2);
        assert_eq!(preds.len(), 1);
        assert_eq!(preds[0].0, 1);
        let (conditions, vars) = pdg.control_chain(2);
        assert_eq!(conditions, vec!["(B = 2)".to_string(), "(A = 1)".to_string()]);
        assert!(vars.contains(&"A".to_string()));
        assert!(vars.contains(&"B".to_string()));
    }

    #[test]
    fn else_branch_is_governed_by_nearest_condition_only() {
        let tree = parse_program(
            "CASE st OF 10: IF A=1 THEN X := 1; ELSIF B=2 THEN X := 2; ELSE X := 3; END_IF; END_CASE;",
        );
        let pdgs = build(&tree);
        let pdg = &pdgs[0];
        // nodes: 0=A=1, 1=X:=1, 2=B=2, 3=X:=2, 4=X:=3 (in else)
        let preds = pdg.control_predecessors(4);
        assert_eq!(preds.len(), 1);
        assert_eq!(preds[0].0, 2);
        assert!(matches!(preds[0].1, Some(Label::Else)));
    }

    #[test]
    fn data_edge_connects_last_writer_to_reader() {
        let tree = parse_program("CASE st OF 10: X := 1; Y := X + 1; END_CASE;");
        let pdgs = build(&tree);
        let pdg = &pdgs[0];
        let data: Vec<_> = pdg
            .edges
            .iter()
            .filter(|e| matches!(e.kind, EdgeKind::Data { .. }))
            .collect();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].from, 0);
        assert_eq!(data[0].to, 1);
    }

    #[test]
    fn expression_printer_squeezes_bracket_spacing() {
        let tree = parse_program(
            "VAR_INPUT H_Target : REAL; H_Offset : REAL; END_VAR \
             CASE st OF 10: IF H_Sensor <= (H_Target + H_Offset) THEN X := 1; END_IF; END_CASE;",
        );
        let pdgs = build(&tree);
        let cond_text = &pdgs[0].nodes[0].statement_text;
        assert!(cond_text.contains("(H_Target + H_Offset)"));
    }

    #[test]
    fn case_with_no_statements_yields_empty_pdg() {
        let tree = parse_program("CASE st OF 10: END_CASE;");
        let pdgs = build(&tree);
        assert_eq!(pdgs.len(), 1);
        assert!(pdgs[0].nodes.is_empty());
    }

    #[test]
    fn program_without_case_yields_no_pdgs() {
        let tree = parse_program("VAR X : BOOL; END_VAR");
        assert!(build(&tree).is_empty());
    }
}
