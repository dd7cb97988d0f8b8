//! Rendering of the public data model (parse tree, PDGs, invariant
//! templates) to XML, JSON, and Graphviz DOT. Each renderer is a pure
//! function: no renderer mutates or reorders its input beyond the
//! deterministic `state_id` sort already applied by [crate::pdg::build].

pub mod dot;
pub mod json;
pub mod xml;

use crate::invariant::InvariantTemplate;
use crate::pdg::Pdg;
use crate::variable::VariableTable;
use serde::Serialize;
use std::collections::HashMap;

/// Counts attached to the top of the XML/JSON output (§3 ambient additions).
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub sensing_count: usize,
    pub configuration_count: usize,
    pub actuation_count: usize,
    pub internal_count: usize,
    pub state_count: usize,
    pub single_template_count: usize,
    pub multi_template_count: usize,
    pub inter_template_count: usize,
}

impl AnalysisSummary {
    pub fn compute(vars: &VariableTable, pdgs: &[Pdg], templates: &[InvariantTemplate]) -> Self {
        use crate::invariant::TemplateKind;
        use crate::variable::Role;

        let mut sensing_count = 0;
        let mut configuration_count = 0;
        let mut actuation_count = 0;
        let mut internal_count = 0;
        for v in vars.variables() {
            match v.role {
                Role::Sensing => sensing_count += 1,
                Role::Configuration => configuration_count += 1,
                Role::Actuation => actuation_count += 1,
                Role::Internal => internal_count += 1,
            }
        }

        let mut single_template_count = 0;
        let mut multi_template_count = 0;
        let mut inter_template_count = 0;
        for t in templates {
            match t.kind {
                TemplateKind::Single { .. } => single_template_count += 1,
                TemplateKind::Multi { .. } => multi_template_count += 1,
                TemplateKind::Inter { .. } => inter_template_count += 1,
            }
        }

        AnalysisSummary {
            sensing_count,
            configuration_count,
            actuation_count,
            internal_count,
            state_count: pdgs.len(),
            single_template_count,
            multi_template_count,
            inter_template_count,
        }
    }
}

/// A non-fatal note collected during classification/PDG build (§7:
/// declaration gap, `UNKNOWN` data type). Never changes exit-code behavior.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub message: String,
}

/// Scan the built variable table and PDGs for non-fatal conditions worth
/// surfacing: declaration gaps (a variable read/written by a PDG node with
/// no matching entry in the table) and `UNKNOWN` data types.
pub fn collect_diagnostics(vars: &VariableTable, pdgs: &[Pdg]) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for v in vars.variables() {
        if v.data_type == "UNKNOWN" {
            out.push(Diagnostic {
                message: format!("variable '{}' has an unrecognized data type", v.name),
            });
        }
    }
    let mut seen_gaps: HashMap<String, ()> = HashMap::new();
    for pdg in pdgs {
        for node in &pdg.nodes {
            for name in node.reads.iter().chain(node.writes.iter()) {
                if vars.get(name).is_none() && seen_gaps.insert(name.clone(), ()).is_none() {
                    out.push(Diagnostic {
                        message: format!("'{}' is referenced but not declared", name),
                    });
                }
            }
        }
    }
    out
}
