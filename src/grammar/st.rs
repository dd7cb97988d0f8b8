//! The concrete IEC 61131-3 Structured Text grammar: declaration sections,
//! an expression precedence ladder, `IF`/`ELSIF`/`ELSE`, and a top-level
//! `CASE` statement. This is one particular [Grammar] value built from the
//! primitives in the parent module — the engine itself knows nothing about
//! ST specifically.
//!
//! Every token that can appear in printed statement/condition text (the
//! comparison, arithmetic and boolean operators, `:=`, and the bracket
//! punctuation the printer squeezes spaces around) is matched with
//! [re] rather than [lit]/[kw] so that it survives as a leaf; everything
//! else (section keywords, statement terminators) is consumed silently.

use super::{choice, kw, lit, nested_comment, one, opt, re, rf, seq, star, Grammar, Rule};

fn flat_comment() -> Rule {
    choice(vec![re(r"(?s)^\(\*.*?\*\)"), re(r"^\{[^}]*\}")])
}

fn nested_comment_rule() -> Rule {
    choice(vec![nested_comment("(*", "*)"), re(r"^\{[^}]*\}")])
}

fn type_tag(name: &'static str, keyword: &'static str) -> (&'static str, Rule) {
    (name, re(&format!(r"(?i)^{keyword}\b")))
}

/// Build the grammar. `nested_comments` selects the `@NESTEDCOMMENTS`
/// pragma's comment-skipping behavior (see [crate::pragma]).
pub fn grammar(nested_comments: bool) -> Grammar {
    let comment = if nested_comments {
        nested_comment_rule()
    } else {
        flat_comment()
    };

    let mut builder = Grammar::builder()
        .whitespace(r"^[ \t\r\n]+")
        .comment(comment)
        .rule("identifier", re(r"^[A-Za-z_][A-Za-z0-9_]*"))
        .rule("int_literal", re(r"^[0-9]+"))
        .rule("number_literal", re(r"^[0-9]+(\.[0-9]+)?"))
        .rule("bool_literal", re(r"(?i)^(TRUE|FALSE)\b"))
        .rule("literal", choice(vec![rf("number_literal"), rf("bool_literal")]))
        .rule(
            "ident_list",
            seq(vec![
                one(rf("identifier")),
                star(seq(vec![one(lit(",")), one(rf("identifier"))])),
            ]),
        );

    for (name, rule) in [
        type_tag("type_bool", "BOOL"),
        type_tag("type_int", "INT"),
        type_tag("type_dint", "DINT"),
        type_tag("type_sint", "SINT"),
        type_tag("type_uint", "UINT"),
        type_tag("type_ulint", "ULINT"),
        type_tag("type_real", "REAL"),
        type_tag("type_lreal", "LREAL"),
        type_tag("type_word", "WORD"),
        type_tag("type_dword", "DWORD"),
    ] {
        builder = builder.rule(name, rule);
    }

    builder
        .rule(
            "numeric_type",
            choice(vec![
                rf("type_dint"),
                rf("type_sint"),
                rf("type_ulint"),
                rf("type_uint"),
                rf("type_int"),
            ]),
        )
        .rule(
            "bit_string_type",
            choice(vec![rf("type_dword"), rf("type_word"), rf("type_bool")]),
        )
        .rule("real_type", choice(vec![rf("type_lreal"), rf("type_real")]))
        .rule(
            "type_expr",
            choice(vec![rf("numeric_type"), rf("bit_string_type"), rf("real_type")]),
        )
        .rule(
            "declaration",
            seq(vec![
                one(rf("ident_list")),
                one(lit(":")),
                one(rf("type_expr")),
                opt(seq(vec![one(re(r"^:=")), one(rf("literal"))])),
                one(lit(";")),
            ]),
        )
        .rule(
            "var_input_section",
            seq(vec![one(kw("VAR_INPUT")), star(rf("declaration")), one(kw("END_VAR"))]),
        )
        .rule(
            "var_output_section",
            seq(vec![one(kw("VAR_OUTPUT")), star(rf("declaration")), one(kw("END_VAR"))]),
        )
        .rule(
            "var_global_section",
            seq(vec![one(kw("VAR_GLOBAL")), star(rf("declaration")), one(kw("END_VAR"))]),
        )
        .rule(
            "var_section",
            seq(vec![one(kw("VAR")), star(rf("declaration")), one(kw("END_VAR"))]),
        )
        .rule(
            "decl_section",
            choice(vec![
                rf("var_input_section"),
                rf("var_output_section"),
                rf("var_global_section"),
                rf("var_section"),
            ]),
        )
        .rule(
            "primary",
            choice(vec![
                seq(vec![one(re(r"^\(")), one(rf("expr")), one(re(r"^\)"))]),
                rf("literal"),
                rf("identifier"),
            ]),
        )
        .rule(
            "unary_expr",
            choice(vec![
                seq(vec![
                    one(choice(vec![re(r"(?i)^NOT\b"), re(r"^-")])),
                    one(rf("unary_expr")),
                ]),
                rf("primary"),
            ]),
        )
        .rule(
            "mul_expr",
            seq(vec![
                one(rf("unary_expr")),
                star(seq(vec![
                    one(choice(vec![re(r"^\*"), re(r"^/"), re(r"(?i)^MOD\b")])),
                    one(rf("unary_expr")),
                ])),
            ]),
        )
        .rule(
            "add_expr",
            seq(vec![
                one(rf("mul_expr")),
                star(seq(vec![one(choice(vec![re(r"^\+"), re(r"^-")])), one(rf("mul_expr"))])),
            ]),
        )
        .rule(
            "cmp_expr",
            seq(vec![
                one(rf("add_expr")),
                star(seq(vec![
                    one(choice(vec![
                        re(r"^<="),
                        re(r"^>="),
                        re(r"^<>"),
                        re(r"^<"),
                        re(r"^>"),
                        re(r"^="),
                    ])),
                    one(rf("add_expr")),
                ])),
            ]),
        )
        .rule(
            "and_expr",
            seq(vec![
                one(rf("cmp_expr")),
                star(seq(vec![
                    one(choice(vec![re(r"^&"), re(r"(?i)^AND\b")])),
                    one(rf("cmp_expr")),
                ])),
            ]),
        )
        .rule(
            "expr",
            seq(vec![
                one(rf("and_expr")),
                star(seq(vec![one(re(r"(?i)^OR\b")), one(rf("and_expr"))])),
            ]),
        )
        .rule(
            "assignment",
            seq(vec![
                one(rf("identifier")),
                one(re(r"^:=")),
                one(rf("expr")),
                one(lit(";")),
            ]),
        )
        .rule("then_block", seq(vec![star(rf("statement"))]))
        .rule(
            "elsif_clause",
            seq(vec![
                one(kw("ELSIF")),
                one(rf("expr")),
                one(kw("THEN")),
                one(rf("then_block")),
            ]),
        )
        .rule("else_block", seq(vec![one(kw("ELSE")), star(rf("statement"))]))
        .rule(
            "if_stmt",
            seq(vec![
                one(kw("IF")),
                one(rf("expr")),
                one(kw("THEN")),
                one(rf("then_block")),
                star(rf("elsif_clause")),
                opt(rf("else_block")),
                one(kw("END_IF")),
                one(lit(";")),
            ]),
        )
        .rule(
            "case_element",
            seq(vec![
                one(rf("int_literal")),
                star(seq(vec![one(lit(",")), one(rf("int_literal"))])),
                one(lit(":")),
                one(rf("then_block")),
            ]),
        )
        .rule("case_else", seq(vec![one(kw("ELSE")), one(rf("then_block"))]))
        .rule(
            "case_stmt",
            seq(vec![
                one(kw("CASE")),
                one(rf("identifier")),
                one(kw("OF")),
                star(rf("case_element")),
                opt(rf("case_else")),
                one(kw("END_CASE")),
                one(lit(";")),
            ]),
        )
        .rule(
            "statement",
            choice(vec![rf("if_stmt"), rf("case_stmt"), rf("assignment")]),
        )
        .rule(
            "program",
            seq(vec![
                opt(seq(vec![one(kw("PROGRAM")), one(rf("identifier"))])),
                star(rf("decl_section")),
                star(rf("statement")),
                opt(kw("END_PROGRAM")),
            ]),
        )
        .root("program")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::parse;

    #[test]
    fn empty_input_parses_to_an_empty_program() {
        let g = grammar(false);
        let tree = parse(&g, "").unwrap();
        assert_eq!(tree.tag(), Some("program"));
        assert!(tree.children().is_empty());
    }

    #[test]
    fn full_program_wrapper_is_optional() {
        let g = grammar(false);
        let src = "CASE st OF 10: X := 1; END_CASE;";
        assert!(parse(&g, src).is_ok());
    }

    #[test]
    fn end_to_end_scenario_one_parses() {
        let g = grammar(false);
        let src = "VAR_INPUT H_Sensor : REAL; END_VAR \
                    VAR_OUTPUT H_Actuator : BOOL; END_VAR \
                    CASE st OF 10: IF H_Sensor <= 100 THEN H_Actuator := FALSE; END_IF; END_CASE;";
        let tree = parse(&g, src).unwrap();
        assert!(tree.find("case_stmt").is_some());
        assert!(tree.find("if_stmt").is_some());
    }

    #[test]
    fn nested_if_reaches_five_levels() {
        let g = grammar(false);
        let src = "CASE st OF 10: \
            IF A=1 THEN IF B=2 THEN IF C=3 THEN IF D=4 THEN IF E=5 THEN st := 20; \
            END_IF; END_IF; END_IF; END_IF; END_IF; END_CASE;";
        assert!(parse(&g, src).is_ok());
    }

    #[test]
    fn invalid_program_is_a_syntax_error_at_the_offending_line() {
        let g = grammar(false);
        let src = "PROGRAM p\nVAR END_VAR\nFOO\nEND_PROGRAM";
        let err = parse(&g, src).unwrap_err();
        assert_eq!(err.position.line, 3);
    }

    #[test]
    fn nested_comments_pragma_allows_comment_within_comment() {
        let g = grammar(true);
        let src = "(* outer (* inner *) still outer *) CASE st OF 10: X := 1; END_CASE;";
        assert!(parse(&g, src).is_ok());
    }
}
