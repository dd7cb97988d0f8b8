//! Variable classification: assigns each declared identifier a [Role] by a
//! priority-ordered set of scope rules then name-pattern rules, and its
//! declared [data type](Variable::data_type) by a bounded-depth walk of its
//! declaration subtree.

use crate::ast::Node;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Declaration section a variable was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Input,
    Output,
    Var,
}

/// The role a variable plays in the control program, used to select which
/// invariant templates it can participate in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Sensing,
    Configuration,
    Actuation,
    Internal,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Sensing => "sensing",
            Role::Configuration => "configuration",
            Role::Actuation => "actuation",
            Role::Internal => "internal",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Variable {
    pub name: String,
    pub role: Role,
    pub data_type: String,
    pub scope: Scope,
    pub initial_value: Option<String>,
}

// Name-pattern rules (§4.3). Checked case-insensitively against the whole
// identifier. The overlap between SENSING ("...level") and CONFIGURATION
// ("...level") on suffix `level` is deliberate: for scope `var` the sensing
// rule wins because it is tried first; for scope `input` the configuration
// rule wins because it preempts the scope-input default of `sensing`.
static SENSING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)sensor|^l_|input|(level|position|reading|detected|actual)$").unwrap()
});
static ACTUATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^s_|actuator|_start|(command|output|motor|valve|pump)$").unwrap()
});
static CONFIGURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)target|offset|threshold|limit|setpoint|tolerance|tol|level").unwrap()
});

/// Assign a role by the priority order from §4.3: scope rules first, then
/// (for scope `var`) name-pattern rules, then default `internal`.
pub fn classify(scope: Scope, name: &str) -> Role {
    match scope {
        Scope::Output => Role::Actuation,
        Scope::Input => {
            if CONFIGURATION_RE.is_match(name) {
                Role::Configuration
            } else {
                Role::Sensing
            }
        }
        Scope::Var => {
            if SENSING_RE.is_match(name) {
                Role::Sensing
            } else if ACTUATION_RE.is_match(name) {
                Role::Actuation
            } else if CONFIGURATION_RE.is_match(name) {
                Role::Configuration
            } else {
                Role::Internal
            }
        }
    }
}

const CATEGORY_TAGS: [&str; 3] = ["numeric_type", "bit_string_type", "real_type"];
const SPECIFIC_TAGS: [&str; 10] = [
    "type_bool",
    "type_int",
    "type_dint",
    "type_sint",
    "type_uint",
    "type_ulint",
    "type_real",
    "type_lreal",
    "type_word",
    "type_dword",
];

fn specific_tag_to_name(tag: &str) -> &'static str {
    match tag {
        "type_bool" => "BOOL",
        "type_int" => "INT",
        "type_dint" => "DINT",
        "type_sint" => "SINT",
        "type_uint" => "UINT",
        "type_ulint" => "ULINT",
        "type_real" => "REAL",
        "type_lreal" => "LREAL",
        "type_word" => "WORD",
        "type_dword" => "DWORD",
        _ => "UNKNOWN",
    }
}

fn category_default(tag: &str) -> &'static str {
    match tag {
        "numeric_type" => "INT",
        "bit_string_type" => "BOOL",
        "real_type" => "REAL",
        _ => "UNKNOWN",
    }
}

fn find_tagged_within_depth<'a>(node: &'a Node, tags: &[&str], max_depth: usize) -> Option<&'a Node> {
    if max_depth == 0 {
        return None;
    }
    if let Some(t) = node.tag() {
        if tags.contains(&t) {
            return Some(node);
        }
    }
    for child in node.children() {
        if let Some(found) = find_tagged_within_depth(child, tags, max_depth - 1) {
            return Some(found);
        }
    }
    None
}

/// Walk a `declaration` node's `type_expr` child for a category tag, then a
/// specific type tag nested within it (search depth bounded at 5 to
/// terminate on malformed declarations).
pub fn extract_data_type(declaration: &Node) -> String {
    let Some(type_expr) = declaration.child("type_expr") else {
        return "UNKNOWN".to_string();
    };
    let Some(category) = find_tagged_within_depth(type_expr, &CATEGORY_TAGS, 5) else {
        return "UNKNOWN".to_string();
    };
    match find_tagged_within_depth(category, &SPECIFIC_TAGS, 5) {
        Some(specific) => specific_tag_to_name(specific.tag().unwrap()).to_string(),
        None => category_default(category.tag().unwrap()).to_string(),
    }
}

/// The full set of declared variables for a program, keyed by name.
#[derive(Serialize)]
pub struct VariableTable {
    by_name: HashMap<String, Variable>,
}

impl VariableTable {
    pub fn build(program: &Node) -> Self {
        let mut by_name = HashMap::new();
        collect_sections(program, "var_input_section", Scope::Input, &mut by_name);
        collect_sections(program, "var_output_section", Scope::Output, &mut by_name);
        collect_sections(program, "var_section", Scope::Var, &mut by_name);
        collect_sections(program, "var_global_section", Scope::Var, &mut by_name);
        VariableTable { by_name }
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.by_name.get(name)
    }

    /// A variable absent from the table is a declaration gap: treated as
    /// `internal`, not an error (§7).
    pub fn role_of(&self, name: &str) -> Role {
        self.by_name.get(name).map(|v| v.role).unwrap_or(Role::Internal)
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

fn collect_sections(
    program: &Node,
    section_tag: &str,
    scope: Scope,
    out: &mut HashMap<String, Variable>,
) {
    let mut sections = Vec::new();
    program.find_all(section_tag, &mut sections);
    for section in sections {
        for decl in section.children_tagged("declaration") {
            let data_type = extract_data_type(decl);
            let initial_value = decl.child("literal").map(|l| l.text());
            let Some(ident_list) = decl.child("ident_list") else {
                continue;
            };
            for ident in ident_list.children_tagged("identifier") {
                let name = ident.text();
                let role = classify(scope, &name);
                out.insert(
                    name.clone(),
                    Variable {
                        name,
                        role,
                        data_type: data_type.clone(),
                        scope,
                        initial_value: initial_value.clone(),
                    },
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_scope_is_always_actuation() {
        assert_eq!(classify(Scope::Output, "anything"), Role::Actuation);
    }

    #[test]
    fn input_scope_configuration_pattern_preempts_sensing() {
        assert_eq!(classify(Scope::Input, "H_Level"), Role::Configuration);
        assert_eq!(classify(Scope::Input, "H_Sensor"), Role::Sensing);
    }

    #[test]
    fn var_scope_sensing_pattern_preempts_configuration_on_level() {
        // "level" matches both the sensing suffix group and the
        // configuration contains-group; scope `var` checks sensing first.
        assert_eq!(classify(Scope::Var, "tank_level"), Role::Sensing);
    }

    #[test]
    fn var_scope_falls_back_through_actuation_then_configuration_then_internal() {
        assert_eq!(classify(Scope::Var, "s_valve"), Role::Actuation);
        assert_eq!(classify(Scope::Var, "h_threshold"), Role::Configuration);
        assert_eq!(classify(Scope::Var, "counter"), Role::Internal);
    }

    #[test]
    fn data_type_extraction_falls_back_to_category_default() {
        let leaf = Node::leaf("INT", 0, 3);
        let specific = Node::inner("type_int", 0, 3, vec![leaf]);
        let category = Node::inner("numeric_type", 0, 3, vec![specific]);
        let type_expr = Node::inner("type_expr", 0, 3, vec![category]);
        let decl = Node::inner("declaration", 0, 3, vec![type_expr]);
        assert_eq!(extract_data_type(&decl), "INT");
    }

    #[test]
    fn missing_type_expr_yields_unknown() {
        let decl = Node::inner("declaration", 0, 0, vec![]);
        assert_eq!(extract_data_type(&decl), "UNKNOWN");
    }
}
