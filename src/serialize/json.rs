//! JSON rendering (§4.7): same shape as the XML output, produced from
//! `serde` derive impls on the public data model types rather than a
//! hand-rolled writer.

use crate::ast::Node;
use crate::invariant::InvariantTemplate;
use crate::pdg::Pdg;
use crate::serialize::{AnalysisSummary, Diagnostic};
use crate::variable::VariableTable;
use serde::Serialize;

#[derive(Serialize)]
struct Document<'a> {
    analysis_summary: &'a AnalysisSummary,
    program: &'a Node,
    states: Vec<StateView<'a>>,
    diagnostics: &'a [Diagnostic],
}

#[derive(Serialize)]
struct StateView<'a> {
    id: &'a str,
    variables: Vec<&'a crate::variable::Variable>,
    nodes: &'a [crate::pdg::PdgNode],
    edges: &'a [crate::pdg::PdgEdge],
    invariants: Vec<&'a InvariantTemplate>,
}

fn template_state_id(t: &InvariantTemplate) -> &str {
    use crate::invariant::TemplateKind;
    match &t.kind {
        TemplateKind::Single { state_id, .. } => state_id,
        TemplateKind::Multi { state_id, .. } => state_id,
        TemplateKind::Inter { source_state, .. } => source_state,
    }
}

/// Render only the parse tree, for `--ast-only` output to a non-terminal
/// sink.
pub fn render_ast(tree: &Node, pretty: bool) -> Result<String, crate::error::SerializationError> {
    let result = if pretty {
        serde_json::to_string_pretty(tree)
    } else {
        serde_json::to_string(tree)
    };
    result.map_err(|e| crate::error::SerializationError::new(e.to_string()))
}

/// Render the full analysis result to JSON. `pretty` selects
/// `serde_json::to_string_pretty`.
pub fn render(
    tree: &Node,
    vars: &VariableTable,
    pdgs: &[Pdg],
    templates: &[InvariantTemplate],
    summary: &AnalysisSummary,
    diagnostics: &[Diagnostic],
    pretty: bool,
) -> Result<String, crate::error::SerializationError> {
    let states = pdgs
        .iter()
        .map(|pdg| {
            let mut names: Vec<&str> = pdg
                .nodes
                .iter()
                .flat_map(|n| n.reads.iter().chain(n.writes.iter()))
                .map(|s| s.as_str())
                .collect();
            names.sort();
            names.dedup();
            let variables = names.into_iter().filter_map(|name| vars.get(name)).collect();
            let invariants = templates
                .iter()
                .filter(|t| template_state_id(t) == pdg.state_id.as_str())
                .collect();
            StateView {
                id: &pdg.state_id,
                variables,
                nodes: &pdg.nodes,
                edges: &pdg.edges,
                invariants,
            }
        })
        .collect();

    let doc = Document {
        analysis_summary: summary,
        program: tree,
        states,
        diagnostics,
    };

    let result = if pretty {
        serde_json::to_string_pretty(&doc)
    } else {
        serde_json::to_string(&doc)
    };
    result.map_err(|e| crate::error::SerializationError::new(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::parse;
    use crate::grammar::st;
    use crate::invariant;
    use crate::pdg;

    #[test]
    fn renders_valid_json_containing_state_and_invariants() {
        let src = "VAR_OUTPUT X : BOOL; END_VAR CASE st OF 10: X := FALSE; END_CASE;";
        let tree = parse(&st::grammar(false), src).unwrap();
        let vars = VariableTable::build(&tree);
        let pdgs = pdg::build(&tree);
        let templates = invariant::extract_all(&pdgs, &vars);
        let summary = AnalysisSummary::compute(&vars, &pdgs, &templates);
        let json = render(&tree, &vars, &pdgs, &templates, &summary, &[], false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["states"][0]["id"], "10");
        assert!(value["states"][0]["invariants"].as_array().unwrap().len() >= 1);
    }
}
