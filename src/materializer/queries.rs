//! SPARQL templates the materializer evaluates over the working repository.
//!
//! Every template takes the IRIs it is parameterized with and returns a
//! complete query. Result column names are fixed and exported as constants.

use std::fmt::Write;

use crate::materializer::vocab::PREFIXES;

pub const VAR_SERVICE: &str = "service";
pub const VAR_INPUT_PUID: &str = "inpuid";
pub const VAR_OUTPUT_CLASS: &str = "outclass";
pub const VAR_INPUT_FILE_CONDITION: &str = "infilecond";
pub const VAR_IN_OUT_FORMAT_CONDITION: &str = "inoutfmtcond";
pub const VAR_OUTPUT_FORMAT: &str = "outfmt";
pub const VAR_OUTPUT_PUID: &str = "outpuid";
pub const VAR_TYPE: &str = "type";
pub const VAR_TRANSFORMATION: &str = "transformation";
pub const VAR_PREVIOUS: &str = "previous";
pub const VAR_SUBSEQUENT: &str = "subsequent";

fn prefixed() -> String {
    let mut query = String::new();
    for (prefix, namespace) in PREFIXES {
        // writing to a String cannot fail
        let _ = write!(query, "PREFIX {}: <{}> ", prefix, namespace);
    }
    query
}

/// For every service described in `context`: its input format, its output
/// class and the two conditions the output may depend on. The
/// input/output-format condition is optional.
pub fn services_in_out(context: &str) -> String {
    let mut query = prefixed();
    let _ = write!(
        query,
        "SELECT ?{service} ?{inpuid} ?{outclass} ?{infilecond} ?{inoutfmtcond} \
         FROM <{context}> \
         WHERE {{ \
         ?{service} rdf:type service:Service; service:describedBy ?process. \
         ?process rdf:type process:AtomicProcess; process:hasResult ?result. \
         ?result process:inCondition ?condition; process:withOutput ?binding. \
         ?condition dArceoProcess:inputFileCondition ?{infilecond}. \
         OPTIONAL {{ ?condition dArceoProcess:inputOutputFormatCondition ?{inoutfmtcond} }} . \
         ?{infilecond} dArceoProcess:inputFileFormat ?{inpuid}. \
         ?binding process:valueType ?{outclass}. \
         }}\n",
        service = VAR_SERVICE,
        inpuid = VAR_INPUT_PUID,
        outclass = VAR_OUTPUT_CLASS,
        infilecond = VAR_INPUT_FILE_CONDITION,
        inoutfmtcond = VAR_IN_OUT_FORMAT_CONDITION,
        context = context,
    );
    query
}

/// File formats a file class is restricted to.
pub fn file_format_of_class(class: &str) -> String {
    let mut query = prefixed();
    let _ = write!(
        query,
        "SELECT ?{outfmt} WHERE {{ \
         <{class}> rdfs:subClassOf [ owl:onProperty dArceoFile:fileFormat ; owl:hasValue ?{outfmt}]. \
         }}\n",
        outfmt = VAR_OUTPUT_FORMAT,
        class = class,
    );
    query
}

/// Format of the input file bound to the local parameter `local_param`.
pub fn output_puid_from_local(input_file_condition: &str, local_param: &str) -> String {
    let mut query = prefixed();
    let _ = write!(
        query,
        "SELECT ?{outpuid} WHERE {{ \
         <{cond}> dArceoProcess:toLocalParam <{param}> ; dArceoProcess:inputFileFormat ?{outpuid}. \
         }}\n",
        outpuid = VAR_OUTPUT_PUID,
        cond = input_file_condition,
        param = local_param,
    );
    query
}

/// Output formats selected by the input parameter `input_param`.
pub fn output_puid_from_input(in_out_format_condition: &str, input_param: &str) -> String {
    let mut query = prefixed();
    let _ = write!(
        query,
        "SELECT ?{outpuid} WHERE {{ \
         <{cond}> dArceoProcess:inputParam <{param}> ; dArceoProcess:outputFormat ?{outpuid}. \
         }}\n",
        outpuid = VAR_OUTPUT_PUID,
        cond = in_out_format_condition,
        param = input_param,
    );
    query
}

/// Every recorded transformation, with whatever links it has.
pub fn all_transformations() -> String {
    let mut query = prefixed();
    let _ = write!(
        query,
        "SELECT ?{service} ?{transformation} ?{inpuid} ?{outpuid} ?{previous} ?{subsequent} WHERE {{ \
         ?{transformation} rdf:type dArceoService:FileTransformation. \
         OPTIONAL {{ ?{transformation} dArceoService:fileIn ?{inpuid} }} . \
         OPTIONAL {{ ?{transformation} dArceoService:fileOut ?{outpuid} }} . \
         OPTIONAL {{ ?{transformation} dArceoService:performedBy ?{service} }} . \
         OPTIONAL {{ ?{transformation} dArceoService:previousTransformation ?{previous} }} . \
         OPTIONAL {{ ?{transformation} dArceoService:subsequentTransformation ?{subsequent} }} . \
         }}\n",
        service = VAR_SERVICE,
        transformation = VAR_TRANSFORMATION,
        inpuid = VAR_INPUT_PUID,
        outpuid = VAR_OUTPUT_PUID,
        previous = VAR_PREVIOUS,
        subsequent = VAR_SUBSEQUENT,
    );
    query
}

/// Every `rdf:type` of `instance`.
pub fn rdf_types_of(instance: &str) -> String {
    format!(
        "SELECT ?{} WHERE {{ <{}> <{}> ?{} }}",
        VAR_TYPE,
        instance,
        crate::materializer::vocab::RDF_TYPE,
        VAR_TYPE
    )
}

/// Whether `instance` is typed as `class`.
pub fn has_rdf_type(instance: &str, class: &str) -> String {
    format!(
        "ASK {{ <{}> <{}> <{}> }}",
        instance,
        crate::materializer::vocab::RDF_TYPE,
        class
    )
}
