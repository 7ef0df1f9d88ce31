use parking_lot::Mutex;

use crate::data_store::operation::Operation;

/// Ordered, append-only record of the write operations of one branch.
///
/// The journal is shared between a managed connection, which appends to it,
/// and the resource participant, which votes and audits from it. It lives as
/// long as the managed connection and is cleared on every cleanup.
#[derive(Debug, Default)]
pub struct Journal {
    operations: Mutex<Vec<Operation>>,
}

impl Journal {
    /// Creates a new, empty `Journal`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an operation. Insertion order is preserved.
    pub fn append(&self, operation: Operation) {
        self.operations.lock().push(operation);
    }

    pub fn len(&self) -> usize {
        self.operations.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.lock().is_empty()
    }

    /// Drops every recorded operation.
    pub fn clear(&self) {
        self.operations.lock().clear();
    }

    /// Returns a copy of the recorded operations, in call order.
    pub fn snapshot(&self) -> Vec<Operation> {
        self.operations.lock().clone()
    }

    /// Returns the context of the single described service registered by this
    /// branch, if that is all the branch did.
    ///
    /// That is the case iff the journal is non-empty and every operation is an
    /// `AddRdfData` into one and the same context.
    pub fn single_service_context(&self) -> Option<String> {
        let operations = self.operations.lock();
        let mut context: Option<&str> = None;
        for operation in operations.iter() {
            if !operation.is_add_rdf_data() {
                return None;
            }
            match context {
                None => context = Some(operation.context()),
                Some(seen) if seen == operation.context() => {}
                Some(_) => return None,
            }
        }
        context.map(str::to_string)
    }

    /// Renders the journal the way it is written to the audit log.
    pub fn render(&self) -> String {
        let operations = self.operations.lock();
        let rendered: Vec<String> = operations.iter().map(ToString::to_string).collect();
        format!("[{}]", rendered.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RdfTriple;

    fn add_data(context: &str) -> Operation {
        Operation::AddRdfData {
            url: "file:///tmp/service.owl".into(),
            base_uri: "http://example.org/".into(),
            context: context.into(),
        }
    }

    #[test]
    fn empty_journal_has_no_service_context() {
        assert_eq!(Journal::new().single_service_context(), None);
    }

    #[test]
    fn one_context_of_add_rdf_data_is_a_service_registration() {
        let journal = Journal::new();
        journal.append(add_data("http://example.org/ctxS"));
        journal.append(add_data("http://example.org/ctxS"));
        assert_eq!(
            journal.single_service_context().as_deref(),
            Some("http://example.org/ctxS")
        );
    }

    #[test]
    fn mixed_operations_are_not_a_service_registration() {
        let journal = Journal::new();
        journal.append(add_data("http://example.org/ctxS"));
        journal.append(Operation::AddTriple {
            triple: RdfTriple::new("urn:s", "urn:p", "urn:o"),
            context: "http://example.org/ctxS".into(),
        });
        assert_eq!(journal.single_service_context(), None);
    }

    #[test]
    fn two_contexts_are_not_a_service_registration() {
        let journal = Journal::new();
        journal.append(add_data("http://example.org/ctxA"));
        journal.append(add_data("http://example.org/ctxB"));
        assert_eq!(journal.single_service_context(), None);
    }

    #[test]
    fn render_lists_operations_in_order() {
        let journal = Journal::new();
        journal.append(Operation::ClearContext {
            context: "urn:a".into(),
        });
        journal.append(Operation::ClearContext {
            context: "urn:b".into(),
        });
        assert_eq!(
            journal.render(),
            "[ClearContext [context=urn:a], ClearContext [context=urn:b]]"
        );
        journal.clear();
        assert!(journal.is_empty());
    }
}
