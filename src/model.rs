use std::fmt;

/// An RDF triple whose components are all URIs.
///
/// Components are kept as plain strings; whether they are well-formed URIs is
/// checked by the backend adapter when the triple is written, not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RdfTriple {
    subject: String,
    predicate: String,
    object: String,
}

impl RdfTriple {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn predicate(&self) -> &str {
        &self.predicate
    }

    pub fn object(&self) -> &str {
        &self.object
    }
}

impl fmt::Display for RdfTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.subject, self.predicate, self.object)
    }
}

/// One row of a SPARQL SELECT result.
///
/// Bindings keep the order in which the backend reported them. Unbound
/// variables are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparqlSelectTuple {
    bindings: Vec<(String, String)>,
}

impl SparqlSelectTuple {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to `value`, replacing an earlier binding of the same name.
    pub fn set_value(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.bindings.iter_mut().find(|(n, _)| *n == name) {
            Some(binding) => binding.1 = value,
            None => self.bindings.push((name, value)),
        }
    }

    /// Builder-style variant of [`SparqlSelectTuple::set_value`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_value(name, value);
        self
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for SparqlSelectTuple {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut tuple = SparqlSelectTuple::new();
        for (name, value) in iter {
            tuple.set_value(name, value);
        }
        tuple
    }
}

impl fmt::Display for SparqlSelectTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.bindings.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuple_keeps_binding_order_and_replaces_duplicates() {
        let tuple = SparqlSelectTuple::new()
            .with("service", "urn:a")
            .with("inpuid", "urn:b")
            .with("service", "urn:c");
        assert_eq!(tuple.names().collect::<Vec<_>>(), vec!["service", "inpuid"]);
        assert_eq!(tuple.value("service"), Some("urn:c"));
        assert_eq!(tuple.value("missing"), None);
        assert_eq!(tuple.to_string(), "{service=urn:c, inpuid=urn:b}");
    }
}
