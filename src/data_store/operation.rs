use std::fmt;

use crate::model::RdfTriple;

/// A write operation performed against the semantic repository.
///
/// Operations are recorded in the [`Journal`](super::journal::Journal) only
/// after the backend accepted them, and are never modified afterwards. Their
/// `Display` form is what ends up in the audit log when a commit fails, so it
/// has to carry everything an operator needs to compensate by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// RDF data downloaded from `url` and loaded into `context`.
    AddRdfData {
        url: String,
        base_uri: String,
        context: String,
    },
    /// A single triple added to `context`.
    AddTriple { triple: RdfTriple, context: String },
    /// A single triple removed from `context`.
    RemoveTriple { triple: RdfTriple, context: String },
    /// Every triple of `context` removed.
    ClearContext { context: String },
}

impl Operation {
    /// The named graph the operation was applied to.
    pub fn context(&self) -> &str {
        match self {
            Operation::AddRdfData { context, .. }
            | Operation::AddTriple { context, .. }
            | Operation::RemoveTriple { context, .. }
            | Operation::ClearContext { context } => context,
        }
    }

    pub fn is_add_rdf_data(&self) -> bool {
        matches!(self, Operation::AddRdfData { .. })
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::AddRdfData {
                url,
                base_uri,
                context,
            } => write!(
                f,
                "AddRdfData [url={}, baseUri={}, context={}]",
                url, base_uri, context
            ),
            Operation::AddTriple { triple, context } => {
                write!(f, "AddRdfTriple [triple={}, context={}]", triple, context)
            }
            Operation::RemoveTriple { triple, context } => {
                write!(f, "RemoveRdfTriple [triple={}, context={}]", triple, context)
            }
            Operation::ClearContext { context } => write!(f, "ClearContext [context={}]", context),
        }
    }
}
