//! Static analysis of IEC 61131-3 Structured Text: a declarative-grammar
//! parser, a per-state Program Dependency Graph builder, and an invariant
//! template extractor for downstream trace mining.
//!
//! [analyze] is the single entry point: source text in, an [AnalysisResult]
//! (or a fatal [AnalysisError]) out. The library only emits `tracing`
//! events — it never installs a subscriber; that's the CLI's job.

pub mod ast;
pub mod engine;
pub mod error;
pub mod grammar;
pub mod invariant;
pub mod pdg;
pub mod position;
pub mod pragma;
pub mod serialize;
pub mod variable;

pub use ast::Node;
pub use error::{AnalysisError, SerializationError, SyntaxError};

/// The complete output of one analysis run.
pub struct AnalysisResult {
    pub tree: Node,
    pub variables: variable::VariableTable,
    pub pdgs: Vec<pdg::Pdg>,
    pub templates: Vec<invariant::InvariantTemplate>,
    pub summary: serialize::AnalysisSummary,
    pub diagnostics: Vec<serialize::Diagnostic>,
}

impl AnalysisResult {
    pub fn to_xml(&self, pretty: bool) -> String {
        serialize::xml::render(
            &self.tree,
            &self.variables,
            &self.pdgs,
            &self.templates,
            &self.summary,
            &self.diagnostics,
            pretty,
        )
    }

    pub fn to_json(&self, pretty: bool) -> Result<String, SerializationError> {
        serialize::json::render(
            &self.tree,
            &self.variables,
            &self.pdgs,
            &self.templates,
            &self.summary,
            &self.diagnostics,
            pretty,
        )
    }

    pub fn to_dot(&self) -> String {
        serialize::dot::render(&self.pdgs)
    }
}

/// Run the full pipeline: pragma scan, parse, classify, build PDGs, extract
/// invariant templates. `force_nested_comments` overrides the pragma scan's
/// own verdict (the CLI's `--pragma` flag).
pub fn analyze(source: &str, force_nested_comments: bool) -> Result<AnalysisResult, AnalysisError> {
    let pragma_config = pragma::scan(source);
    let nested_comments = force_nested_comments || pragma_config.nested_comments;
    let st_grammar = grammar::st::grammar(nested_comments);

    let tree = {
        let span = tracing::info_span!("parse");
        let _enter = span.enter();
        let tree = engine::parse(&st_grammar, source)?;
        tracing::debug!(nodes = tree.children().len(), "parsed top-level program");
        tree
    };

    let variables = {
        let span = tracing::info_span!("classify");
        let _enter = span.enter();
        let table = variable::VariableTable::build(&tree);
        tracing::debug!(count = table.len(), "classified variables");
        table
    };

    let pdgs = {
        let span = tracing::info_span!("build_pdg");
        let _enter = span.enter();
        let pdgs = pdg::build(&tree);
        tracing::debug!(states = pdgs.len(), "built program dependency graphs");
        pdgs
    };

    let templates = {
        let span = tracing::info_span!("extract_invariants");
        let _enter = span.enter();
        let templates = invariant::extract_all(&pdgs, &variables);
        tracing::debug!(count = templates.len(), "extracted invariant templates");
        templates
    };

    let diagnostics = serialize::collect_diagnostics(&variables, &pdgs);
    for d in &diagnostics {
        tracing::warn!(message = %d.message, "non-fatal diagnostic");
    }

    let summary = serialize::AnalysisSummary::compute(&variables, &pdgs, &templates);

    Ok(AnalysisResult {
        tree,
        variables,
        pdgs,
        templates,
        summary,
        diagnostics,
    })
}
