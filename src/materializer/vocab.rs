//! Namespaces and terms of the service ontologies.

pub const NAMESPACE_XSD: &str = "http://www.w3.org/2001/XMLSchema#";
pub const NAMESPACE_RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const NAMESPACE_RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const NAMESPACE_OWL: &str = "http://www.w3.org/2002/07/owl#";

pub const NAMESPACE_UDFRS: &str = "http://www.udfr.org/onto#";
pub const NAMESPACE_FILE: &str = "http://darceo.psnc.pl/ontologies/dArceoFile.owl#";
pub const NAMESPACE_PROCESS: &str = "http://www.daml.org/services/owl-s/1.2/Process.owl#";
pub const NAMESPACE_SERVICE: &str = "http://www.daml.org/services/owl-s/1.2/Service.owl#";
pub const NAMESPACE_SERVICE_PROCESS: &str = "http://darceo.psnc.pl/ontologies/dArceoProcess.owl#";
pub const NAMESPACE_SERVICE_REGISTRY: &str = "http://darceo.psnc.pl/ontologies/dArceoService.owl#";

/// `(prefix, namespace)` pairs declared in front of every ontology query.
pub const PREFIXES: &[(&str, &str)] = &[
    ("xsd", NAMESPACE_XSD),
    ("rdf", NAMESPACE_RDF),
    ("rdfs", NAMESPACE_RDFS),
    ("owl", NAMESPACE_OWL),
    ("udfrs", NAMESPACE_UDFRS),
    ("dArceoFile", NAMESPACE_FILE),
    ("process", NAMESPACE_PROCESS),
    ("service", NAMESPACE_SERVICE),
    ("dArceoProcess", NAMESPACE_SERVICE_PROCESS),
    ("dArceoService", NAMESPACE_SERVICE_REGISTRY),
];

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// Class of every file format in the format registry.
pub const FILE_FORMAT: &str = "http://www.udfr.org/onto#FileFormat";

/// Process parameter whose value comes from another input.
pub const PROCESS_INPUT_PARAMETER: &str = "http://www.daml.org/services/owl-s/1.2/Process.owl#Input";
/// Process parameter bound locally, from the input file.
pub const PROCESS_LOCAL_PARAMETER: &str = "http://www.daml.org/services/owl-s/1.2/Process.owl#Local";

pub const FILE_TRANSFORMATION: &str =
    "http://darceo.psnc.pl/ontologies/dArceoService.owl#FileTransformation";
pub const FILE_IN: &str = "http://darceo.psnc.pl/ontologies/dArceoService.owl#fileIn";
pub const FILE_OUT: &str = "http://darceo.psnc.pl/ontologies/dArceoService.owl#fileOut";
pub const PERFORMED_BY: &str = "http://darceo.psnc.pl/ontologies/dArceoService.owl#performedBy";
