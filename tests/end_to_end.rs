//! Full-pipeline (parse -> classify -> PDG -> invariant -> serialize)
//! coverage of spec.md §8's numbered end-to-end scenarios and boundaries.
//! Unit-level coverage of individual stages lives alongside each module.

use st_pdg_miner::invariant::TemplateKind;
use st_pdg_miner::{analyze, AnalysisError};

#[test]
fn scenario_one_single_condition_governs_one_actuation() {
    let src = "VAR_INPUT H_Sensor : REAL; END_VAR VAR_OUTPUT H_Actuator : BOOL; END_VAR \
               CASE st OF 10: IF H_Sensor <= 100 THEN H_Actuator := FALSE; END_IF; END_CASE;";
    let result = analyze(src, false).unwrap();
    assert_eq!(result.pdgs.len(), 1);
    let pdg = &result.pdgs[0];
    assert_eq!(pdg.nodes.len(), 2);
    assert_eq!(pdg.nodes[0].reads, vec!["H_Sensor".to_string()]);
    assert_eq!(pdg.nodes[1].writes, vec!["H_Actuator".to_string()]);

    let singles: Vec<_> = result
        .templates
        .iter()
        .filter(|t| matches!(t.kind, TemplateKind::Single { .. }))
        .collect();
    assert_eq!(singles.len(), 1);
    if let TemplateKind::Single { structure, .. } = &singles[0].kind {
        assert_eq!(structure, "IF H_Sensor <= [#] THEN H_Actuator = FALSE");
    }
    assert!(!result.templates.iter().any(|t| matches!(t.kind, TemplateKind::Inter { .. })));

    let xml = result.to_xml(false);
    assert!(xml.contains("type=\"single\""));
    let json = result.to_json(false).unwrap();
    assert!(json.contains("\"states\""));
}

#[test]
fn scenario_two_configuration_variables_appear_in_multi_template() {
    let src = "VAR_INPUT H_Sensor : REAL; END_VAR \
               VAR_OUTPUT H_Actuator : BOOL; END_VAR \
               VAR H_Target : REAL; H_Offset : REAL; END_VAR \
               CASE st OF 10: IF H_Sensor <= (H_Target + H_Offset) THEN H_Actuator := FALSE; END_IF; END_CASE;";
    let result = analyze(src, false).unwrap();
    let multi = result
        .templates
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
fn scenario_three_conjoined_condition_produces_inter_template() {
    let src = "CASE st OF 10: IF A=1 AND B=2 THEN st := 20; END_IF; END_CASE;";
    let result = analyze(src, false).unwrap();
    let inter = result
        .templates
        .iter()
        .find_map(|t| match &t.kind {
            TemplateKind::Inter { source_state, dest_state, transition_condition, condition_variables, .. } => {
                Some((source_state.clone(), dest_state.clone(), transition_condition.clone(), condition_variables.clone()))
            }
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
fn scenario_four_nested_conditions_conjoin_in_outer_to_inner_order() {
    let src = "CASE st OF 10: IF A=1 THEN IF B=2 THEN st := 20; END_IF; END_IF; END_CASE;";
    let result = analyze(src, false).unwrap();
    let guard = result
        .templates
        .iter()
        .find_map(|t| match &t.kind {
            TemplateKind::Inter { transition_condition, .. } => Some(transition_condition.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(guard, "(A = 1) AND (B = 2)");
}

#[test]
fn scenario_five_unconditional_actuation_uses_state_sentinel() {
    let src = "VAR_OUTPUT X : BOOL; END_VAR CASE st OF 10: X := FALSE; END_CASE;";
    let result = analyze(src, false).unwrap();
    let single = result
        .templates
        .iter()
        .find_map(|t| match &t.kind {
            TemplateKind::Single { sensing_var, structure, .. } if sensing_var == "STATE" => Some(structure.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(single, "In State 10, X = FALSE");
}

#[test]
fn scenario_six_invalid_program_reports_the_offending_line() {
    let src = "PROGRAM p\nVAR END_VAR\nFOO\nEND_PROGRAM";
    let err = analyze(src, false).unwrap_err();
    match err {
        AnalysisError::Syntax(e) => assert_eq!(e.position.line, 3),
        other => panic!("expected a syntax error, got a {other}"),
    }
}

#[test]
fn empty_input_yields_empty_everything_no_error() {
    let result = analyze("", false).unwrap();
    assert!(result.tree.children().is_empty());
    assert!(result.pdgs.is_empty());
    assert!(result.templates.is_empty());
    assert!(result.diagnostics.is_empty());
}

#[test]
fn program_without_case_yields_no_pdgs_or_templates() {
    let result = analyze("VAR X : BOOL; END_VAR", false).unwrap();
    assert!(result.pdgs.is_empty());
    assert!(result.templates.is_empty());
}

#[test]
fn case_arm_with_no_statements_yields_a_pdg_with_no_nodes() {
    let result = analyze("CASE st OF 10: END_CASE;", false).unwrap();
    assert_eq!(result.pdgs.len(), 1);
    assert!(result.pdgs[0].nodes.is_empty());
    assert!(result.templates.is_empty());
}

#[test]
fn five_level_nested_if_produces_a_five_conjunct_inter_guard() {
    let src = "CASE st OF 10: \
        IF A=1 THEN IF B=2 THEN IF C=3 THEN IF D=4 THEN IF E=5 THEN st := 20; \
        END_IF; END_IF; END_IF; END_IF; END_IF; END_CASE;";
    let result = analyze(src, false).unwrap();
    let guard = result
        .templates
        .iter()
        .find_map(|t| match &t.kind {
            TemplateKind::Inter { transition_condition, .. } => Some(transition_condition.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(guard.matches("AND").count(), 4);
    assert_eq!(guard, "(A = 1) AND (B = 2) AND (C = 3) AND (D = 4) AND (E = 5)");
}

#[test]
fn nested_comments_pragma_enables_comment_nesting() {
    let src = "(* @NESTEDCOMMENTS := 'Yes' *)\n(* outer (* inner *) still outer *) CASE st OF 10: X := 1; END_CASE;";
    let result = analyze(src, false).unwrap();
    assert_eq!(result.pdgs.len(), 1);
}

#[test]
fn pragma_cli_override_enables_nesting_without_the_directive() {
    let src = "(* outer (* inner *) still outer *) CASE st OF 10: X := 1; END_CASE;";
    assert!(analyze(src, false).is_err());
    assert!(analyze(src, true).is_ok());
}

#[test]
fn dot_output_has_one_cluster_per_state() {
    let src = "CASE st OF 10: X := 1; 20: Y := 2; END_CASE;";
    let result = analyze(src, false).unwrap();
    let dot = result.to_dot();
    assert!(dot.contains("cluster_10"));
    assert!(dot.contains("cluster_20"));
}
