//! Invariant template extraction (§4.5): three independent passes over each
//! [Pdg] producing hole-bearing (`[#]`) templates for downstream trace
//! mining. Every emitted template carries a fixed default confidence of
//! `1.0` — refinement happens downstream, not here.

use crate::pdg::{Pdg, StatementType};
use crate::variable::{Role, VariableTable};
use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TemplateKind {
    /// A condition on a single sensing variable implying an actuation
    /// value, or (sentinel `sensing_var == "STATE"`) a state-unconditional
    /// actuation.
    Single {
        state_id: String,
        sensing_var: String,
        operator: String,
        structure: String,
    },
    /// The full backward-reachable set of sensing/configuration variables
    /// governing an actuation.
    Multi {
        state_id: String,
        sensing_vars: Vec<String>,
        configuration_vars: Vec<String>,
        structure: String,
    },
    /// A state-transition guard.
    Inter {
        source_state: String,
        dest_state: String,
        state_variable: String,
        transition_condition: String,
        condition_variables: Vec<String>,
        structure: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct InvariantTemplate {
    pub kind: TemplateKind,
    pub confidence: f64,
}

fn template(kind: TemplateKind) -> InvariantTemplate {
    InvariantTemplate { kind, confidence: 1.0 }
}

static ASSIGNED_VALUE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r":=\s*(.+)$").unwrap());

fn assigned_value(statement_text: &str) -> String {
    ASSIGNED_VALUE_RE
        .captures(statement_text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

fn push_dedup(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

/// Pass A: unconditional actuations.
fn pass_a(pdg: &Pdg, vars: &VariableTable) -> Vec<InvariantTemplate> {
    let mut out = Vec::new();
    for n in &pdg.nodes {
        if n.statement_type != StatementType::Assignment {
            continue;
        }
        let Some(v) = n.writes.first() else { continue };
        if v == &pdg.state_variable {
            continue;
        }
        if vars.role_of(v) != Role::Actuation {
            continue;
        }
        if !pdg.control_predecessors(n.id).is_empty() {
            continue;
        }
        let value = assigned_value(&n.statement_text);
        out.push(template(TemplateKind::Single {
            state_id: pdg.state_id.clone(),
            sensing_var: "STATE".to_string(),
            operator: "=".to_string(),
            structure: format!("In State {}, {} = {}", pdg.state_id, v, value),
        }));
    }
    out
}

/// Pass B: inter-state transition guards.
fn pass_b(pdg: &Pdg) -> Vec<InvariantTemplate> {
    let mut out = Vec::new();
    for n in &pdg.nodes {
        if n.statement_type != StatementType::Assignment {
            continue;
        }
        if n.writes.first() != Some(&pdg.state_variable) {
            continue;
        }
        let dest_state = assigned_value(&n.statement_text);
        let (mut conditions, variables) = pdg.control_chain(n.id);
        conditions.reverse();
        let transition_condition = if conditions.is_empty() {
            "TRUE".to_string()
        } else {
            conditions.join(" AND ")
        };
        let structure = format!(
            "IF {} THEN {} := {}",
            transition_condition, pdg.state_variable, dest_state
        );
        out.push(template(TemplateKind::Inter {
            source_state: pdg.state_id.clone(),
            dest_state,
            state_variable: pdg.state_variable.clone(),
            transition_condition,
            condition_variables: variables,
            structure,
        }));
    }
    out
}

/// Find the operator of the innermost comparison subtree of `condition`
/// whose operands mention `var`.
fn comparison_operator_for(condition: &crate::ast::Node, var: &str) -> Option<String> {
    let mut candidates = Vec::new();
    condition.find_all("cmp_expr", &mut candidates);
    for cmp in candidates {
        let children = cmp.children();
        if children.len() < 3 {
            continue; // a cmp_expr with no operator is just a passthrough add_expr
        }
        if crate::pdg::variables_in(cmp).iter().any(|v| v == var) {
            return Some(children[1].text());
        }
    }
    None
}

fn visit_backward(
    pdg: &Pdg,
    vars: &VariableTable,
    id: usize,
    visited: &mut HashSet<usize>,
    sensing: &mut Vec<String>,
    configuration: &mut Vec<String>,
) {
    let mut ancestors: Vec<usize> = pdg.control_predecessors(id).into_iter().map(|(a, _)| a).collect();
    ancestors.extend(pdg.data_predecessors(id).into_iter().map(|(a, _)| a));
    for ancestor_id in ancestors {
        if !visited.insert(ancestor_id) {
            continue;
        }
        if let Some(ancestor) = pdg.node(ancestor_id) {
            for v in &ancestor.reads {
                match vars.role_of(v) {
                    Role::Sensing => push_dedup(sensing, v),
                    Role::Configuration => push_dedup(configuration, v),
                    _ => {}
                }
            }
        }
        visit_backward(pdg, vars, ancestor_id, visited, sensing, configuration);
    }
}

/// Pass C: per-actuation conditional rules (single-variable and
/// multi-variable).
fn pass_c(pdg: &Pdg, vars: &VariableTable) -> Vec<InvariantTemplate> {
    let mut out = Vec::new();
    for n in &pdg.nodes {
        if n.statement_type != StatementType::Assignment {
            continue;
        }
        let Some(a) = n.writes.first() else { continue };
        if a == &pdg.state_variable {
            continue;
        }
        if vars.role_of(a) != Role::Actuation {
            continue;
        }
        let actuation_value = assigned_value(&n.statement_text);

        if let Some(&(cond_id, _)) = pdg.control_predecessors(n.id).first() {
            if let Some(cond_node) = pdg.node(cond_id) {
                for s in &cond_node.reads {
                    if vars.role_of(s) != Role::Sensing {
                        continue;
                    }
                    if let Some(op) = comparison_operator_for(&cond_node.ast_ref, s) {
                        out.push(template(TemplateKind::Single {
                            state_id: pdg.state_id.clone(),
                            sensing_var: s.clone(),
                            operator: op.clone(),
                            structure: format!("IF {} {} [#] THEN {} = {}", s, op, a, actuation_value),
                        }));
                    }
                }
            }
        }

        let mut visited = HashSet::new();
        visited.insert(n.id);
        let mut sensing_vars = Vec::new();
        let mut configuration_vars = Vec::new();
        for v in &n.reads {
            match vars.role_of(v) {
                Role::Sensing => push_dedup(&mut sensing_vars, v),
                Role::Configuration => push_dedup(&mut configuration_vars, v),
                _ => {}
            }
        }
        visit_backward(pdg, vars, n.id, &mut visited, &mut sensing_vars, &mut configuration_vars);
        if sensing_vars.is_empty() && configuration_vars.is_empty() {
            continue;
        }
        let condition_text = pdg
            .control_predecessors(n.id)
            .first()
            .and_then(|&(id, _)| pdg.node(id))
            .map(|c| c.statement_text.clone())
            .unwrap_or_default();
        let structure = format!("IF {} THEN {}", condition_text, n.statement_text);
        out.push(template(TemplateKind::Multi {
            state_id: pdg.state_id.clone(),
            sensing_vars,
            configuration_vars,
            structure,
        }));
    }
    out
}

/// Run all three passes over one PDG.
pub fn extract(pdg: &Pdg, vars: &VariableTable) -> Vec<InvariantTemplate> {
    let mut out = pass_a(pdg, vars);
    out.extend(pass_b(pdg));
    out.extend(pass_c(pdg, vars));
    out
}

/// Run extraction over every PDG in parallel — one of the two places this
/// analysis is explicitly safe and worthwhile to parallelize, since each
/// PDG's templates are independent of every other's.
pub fn extract_all(pdgs: &[Pdg], vars: &VariableTable) -> Vec<InvariantTemplate> {
    pdgs.par_iter().flat_map(|pdg| extract(pdg, vars)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::parse;
    use crate::grammar::st;
    use crate::pdg;

    fn analyze(src: &str) -> (Vec<Pdg>, VariableTable) {
        let tree = parse(&st::grammar(false), src).unwrap();
        let vars = VariableTable::build(&tree);
        let pdgs = pdg::build(&tree);
        (pdgs, vars)
    }

    #[test]
    fn scenario_one_yields_single_and_multi_no_inter() {
        let (pdgs, vars) = analyze(
            "VAR_INPUT H_Sensor : REAL; END_VAR VAR_OUTPUT H_Actuator : BOOL; END_VAR \
             CASE st OF 10: IF H_Sensor <= 100 THEN H_Actuator := FALSE; END_IF; END_CASE;",
        );
        let templates = extract(&pdgs[0], &vars);
        let singles: Vec<_> = templates
            .iter()
            .filter(|t| matches!(t.kind, TemplateKind::Single { .. }))
            .collect();
        let multis: Vec<_> = templates
            .iter()
            .filter(|t| matches!(t.kind, TemplateKind::Multi { .. }))
            .collect();
        let inters: Vec<_> = templates
            .iter()
            .filter(|t| matches!(t.kind, TemplateKind::Inter { .. }))
            .collect();
        assert_eq!(singles.len(), 1);
        assert_eq!(multis.len(), 1);
        assert!(inters.is_empty());
        if let TemplateKind::Single { sensing_var, operator, structure, .. } = &singles[0].kind {
            assert_eq!(sensing_var, "H_Sensor");
            assert_eq!(operator, "<=");
            assert_eq!(structure, "IF H_Sensor <= [#] THEN H_Actuator = FALSE");
        }
        if let TemplateKind::Multi { sensing_vars, configuration_vars, .. } = &multis[0].kind {
            assert_eq!(sensing_vars, &vec!["H_Sensor".to_string()]);
            assert!(configuration_vars.is_empty());
        }
    }

    #[test]
    fn scenario_two_multi_collects_configuration_vars() {
        let (pdgs, vars) = analyze(
            "VAR_INPUT H_Sensor : REAL; END_VAR \
             VAR_OUTPUT H_Actuator : BOOL; END_VAR \
             VAR H_Target : REAL; H_Offset : REAL; END_VAR \
             CASE st OF 10: IF H_Sensor <= (H_Target + H_Offset) THEN H_Actuator := FALSE; END_IF; END_CASE;",
        );
        let templates = extract(&pdgs[0], &vars);
        let multi = templates
            .iter()
            .find_map(|t| match &t.kind {
                TemplateKind::Multi { sensing_vars, configuration_vars, structure, .. } => {
                    Some((sensing_vars.clone(), configuration_vars.clone(), structure.clone()))
                }
                _ => None,
            })
            .unwrap();
        assert_eq!(multi.0, vec!["H_Sensor".to_string()]);
        assert_eq!(multi.1, vec!["H_Target".to_string(), "H_Offset".to_string()]);
        assert!(multi.2.contains("(H_Target + H_Offset)"));
    }

    #[test]
    fn scenario_three_inter_template_conjunction() {
        let (pdgs, vars) = analyze("CASE st OF 10: IF A=1 AND B=2 THEN st := 20; END_IF; END_CASE;");
        let templates = extract(&pdgs[0], &vars);
        let inter = templates
            .iter()
            .find_map(|t| match &t.kind {
                TemplateKind::Inter {
                    source_state,
                    dest_state,
                    transition_condition,
                    condition_variables,
                    ..
                } => Some((
                    source_state.clone(),
                    dest_state.clone(),
                    transition_condition.clone(),
                    condition_variables.clone(),
                )),
                _ => None,
            })
            .unwrap();
        assert_eq!(inter.0, "10");
        assert_eq!(inter.1, "20");
        assert_eq!(inter.2, "(A = 1 AND B = 2)");
        assert!(inter.3.contains(&"A".to_string()));
        assert!(inter.3.contains(&"B".to_string()));
    }

    #[test]
    fn scenario_four_nested_inter_template() {
        let (pdgs, vars) = analyze(
            "CASE st OF 10: IF A=1 THEN IF B=2 THEN st := 20; END_IF; END_IF; END_CASE;",
        );
        let templates = extract(&pdgs[0], &vars);
        let transition_condition = templates
            .iter()
            .find_map(|t| match &t.kind {
                TemplateKind::Inter { transition_condition, .. } => Some(transition_condition.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(transition_condition, "(A = 1) AND (B = 2)");
    }

    #[test]
    fn scenario_five_unconditional_actuation() {
        let (pdgs, vars) = analyze("VAR_OUTPUT X : BOOL; END_VAR CASE st OF 10: X := FALSE; END_CASE;");
        let templates = extract(&pdgs[0], &vars);
        let single = templates
            .iter()
            .find_map(|t| match &t.kind {
                TemplateKind::Single { sensing_var, structure, .. } => Some((sensing_var.clone(), structure.clone())),
                _ => None,
            })
            .unwrap();
        assert_eq!(single.0, "STATE");
        assert_eq!(single.1, "In State 10, X = FALSE");
    }

    #[test]
    fn unconditional_direct_assignment_still_yields_a_multi_template() {
        let (pdgs, vars) = analyze(
            "VAR_INPUT H_Sensor : REAL; END_VAR VAR_OUTPUT H_Actuator : REAL; END_VAR \
             CASE st OF 10: H_Actuator := H_Sensor; END_CASE;",
        );
        let templates = extract(&pdgs[0], &vars);
        let sensing_vars = templates
            .iter()
            .find_map(|t| match &t.kind {
                TemplateKind::Multi { sensing_vars, .. } => Some(sensing_vars.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(sensing_vars, vec!["H_Sensor".to_string()]);
    }
}
