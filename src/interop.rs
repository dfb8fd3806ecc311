//! Conversion to oxigraph's RDF model and N-Quads output.

use std::io::Write;

use oxigraph::model::{
    BlankNode as OxBlankNode, GraphName, Literal as OxLiteral, NamedNode, Quad, Term,
};

use crate::error::InteropError;
use crate::model::{CompleteStatement, Context, Literal, Resource, Uri, Value};

fn term_error(term: impl ToString, err: impl ToString) -> InteropError {
    InteropError::Term {
        term: term.to_string(),
        message: err.to_string(),
    }
}

fn named(uri: &Uri) -> Result<NamedNode, InteropError> {
    NamedNode::new(uri.as_str()).map_err(|e| term_error(uri, e))
}

fn blank(id: &str) -> Result<OxBlankNode, InteropError> {
    OxBlankNode::new(id).map_err(|e| term_error(format!("_:{id}"), e))
}

fn literal(lit: &Literal) -> Result<OxLiteral, InteropError> {
    if let Some(datatype) = lit.datatype() {
        return Ok(OxLiteral::new_typed_literal(lit.value(), named(datatype)?));
    }
    if let Some(language) = lit.language() {
        return OxLiteral::new_language_tagged_literal(lit.value(), language)
            .map_err(|e| term_error(lit, e));
    }
    Ok(OxLiteral::new_simple_literal(lit.value()))
}

fn object_term(value: &Value) -> Result<Term, InteropError> {
    Ok(match value {
        Value::Resource(Resource::Uri(uri)) => Term::from(named(uri)?),
        Value::Resource(Resource::Blank(b)) => Term::from(blank(b.id())?),
        Value::Literal(lit) => Term::from(literal(lit)?),
    })
}

/// One quad per context, or a single default-graph quad.
pub fn to_quads(statement: &CompleteStatement) -> Result<Vec<Quad>, InteropError> {
    let predicate = named(statement.predicate())?;
    let object = object_term(statement.object())?;
    let mut graphs: Vec<GraphName> = Vec::new();
    for ctx in statement.contexts() {
        if let Context::Named(uri) = ctx {
            graphs.push(GraphName::NamedNode(named(uri)?));
        }
    }
    if graphs.is_empty() {
        graphs.push(GraphName::DefaultGraph);
    }
    graphs
        .into_iter()
        .map(|graph| {
            Ok(match statement.subject() {
                Resource::Uri(uri) => Quad::new(named(uri)?, predicate.clone(), object.clone(), graph),
                Resource::Blank(b) => Quad::new(blank(b.id())?, predicate.clone(), object.clone(), graph),
            })
        })
        .collect()
}

/// Write `statements` as N-Quads, returning the number of quads written.
pub fn write_nquads<'a, W: Write>(
    out: &mut W,
    statements: impl IntoIterator<Item = &'a CompleteStatement>,
) -> Result<usize, InteropError> {
    let mut written = 0;
    for statement in statements {
        for quad in to_quads(statement)? {
            writeln!(out, "{quad} .").map_err(|source| InteropError::Io { source })?;
            written += 1;
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlankNode;

    fn uri(s: &str) -> Uri {
        Uri::new(s).unwrap()
    }

    #[test]
    fn one_quad_per_context() {
        let st = CompleteStatement::new(
            uri("http://ex.org/emil"),
            uri("http://ex.org/knows"),
            uri("http://ex.org/johan"),
            vec![
                Context::named(uri("urn:ctx:public")),
                Context::named(uri("urn:ctx:private")),
            ],
        );
        assert_eq!(to_quads(&st).unwrap().len(), 2);
        let default = st.with_contexts(Vec::new());
        let quads = to_quads(&default).unwrap();
        assert_eq!(quads.len(), 1);
        assert!(quads[0].graph_name.is_default_graph());
    }

    #[test]
    fn nquads_output_has_one_line_per_quad() {
        let st = CompleteStatement::in_default_graph(
            BlankNode::new("b0").unwrap(),
            uri("http://ex.org/nick"),
            Literal::with_language("Empa", "sv").unwrap(),
        );
        let mut out = Vec::new();
        let n = write_nquads(&mut out, [&st]).unwrap();
        assert_eq!(n, 1);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "_:b0 <http://ex.org/nick> \"Empa\"@sv .\n");
    }

    #[test]
    fn invalid_blank_id_is_an_interop_error() {
        let st = CompleteStatement::in_default_graph(
            BlankNode::new("not/valid").unwrap(),
            uri("http://ex.org/p"),
            Literal::plain("x"),
        );
        assert!(matches!(to_quads(&st), Err(InteropError::Term { .. })));
    }
}
