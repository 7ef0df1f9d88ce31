//! Derivation of file-transformation facts from service descriptions.
//!
//! When a branch did nothing but register one described service, the
//! service's RDF documents are replayed into an isolated working repository,
//! the service ontology is queried there, and every file transformation the
//! service can perform is written to the main repository as a named
//! `FileTransformation` resource:
//!
//! ```text
//! <svcTransformation1> rdf:type            dArceoService:FileTransformation
//! <svcTransformation1> dArceoService:fileIn      <input format>
//! <svcTransformation1> dArceoService:fileOut     <output format>
//! <svcTransformation1> dArceoService:performedBy <svc>
//! ```

pub mod queries;
pub mod vocab;

use ahash::AHashMap as HashMap;
use log::{debug, error, info};

use crate::client::{ScratchRepository, TripleStoreClient};
use crate::data_store::operation::Operation;
use crate::errors::{RdfXaError, Result};
use crate::model::{RdfTriple, SparqlSelectTuple};
use queries::{
    VAR_INPUT_FILE_CONDITION, VAR_INPUT_PUID, VAR_IN_OUT_FORMAT_CONDITION, VAR_OUTPUT_CLASS,
    VAR_OUTPUT_FORMAT, VAR_OUTPUT_PUID, VAR_SERVICE, VAR_TYPE,
};

/// Hands out per-service transformation numbers, starting at 1.
#[derive(Debug, Default)]
pub struct TransformationCounter {
    counters: HashMap<String, u32>,
}

impl TransformationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, service: &str) -> u32 {
        let counter = self.counters.entry(service.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }
}

/// One derived transformation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformation {
    pub name: String,
    pub service: String,
    pub input: String,
    pub output: String,
}

/// What a materialization pass wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializationReport {
    pub context: String,
    pub transformations: Vec<Transformation>,
}

/// Derives the IRI of the singleton instance of `class`.
///
/// The local name is taken after the first `#`, or else after the last `/`,
/// or else after the last `:`; its first letter is lower-cased and
/// `Instance` is appended: `http://x.org/o#PdfFile` becomes
/// `http://x.org/o#pdfFileInstance`.
pub fn class_to_instance(class: &str) -> Result<String> {
    let separator = class
        .find('#')
        .or_else(|| class.rfind('/'))
        .or_else(|| class.rfind(':'))
        .ok_or_else(|| {
            RdfXaError::Materialization(format!("No separator character found in URI: {}", class))
        })?;
    let (namespace, local) = class.split_at(separator + 1);
    let mut chars = local.chars();
    let local = match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    Ok(format!("{}{}Instance", namespace, local))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParameterKind {
    Input,
    Local,
    Direct,
}

fn classify(types: &[SparqlSelectTuple]) -> ParameterKind {
    for row in types {
        match row.value(VAR_TYPE) {
            Some(vocab::PROCESS_INPUT_PARAMETER) => return ParameterKind::Input,
            Some(vocab::PROCESS_LOCAL_PARAMETER) => return ParameterKind::Local,
            _ => {}
        }
    }
    ParameterKind::Direct
}

fn required<'a>(row: &'a SparqlSelectTuple, name: &str) -> Result<&'a str> {
    row.value(name).ok_or_else(|| {
        RdfXaError::Materialization(format!("variable `{}` is unbound in {}", name, row))
    })
}

fn working_commit(e: RdfXaError) -> RdfXaError {
    RdfXaError::Materialization(format!("cannot commit to the working repository: {}", e))
}

/// Derives and writes the transformations of the service registered in
/// `context`.
///
/// `operations` is the branch journal; its `AddRdfData` entries are replayed
/// into a fresh working repository obtained from `scratch`. Transformations
/// are written to `target` without being committed, so they become part of
/// the branch being completed.
pub struct Materializer<'a> {
    scratch: &'a dyn ScratchRepository,
}

impl<'a> Materializer<'a> {
    pub fn new(scratch: &'a dyn ScratchRepository) -> Self {
        Self { scratch }
    }

    /// Runs one materialization pass.
    ///
    /// The working repository is cleaned and shut down on every path. When
    /// several steps fail, the first failure is returned and the rest are
    /// logged.
    pub fn run(
        &self,
        target: &mut dyn TripleStoreClient,
        context: &str,
        operations: &[Operation],
    ) -> Result<MaterializationReport> {
        debug!("materializing transformations of context {}", context);
        let mut working = self.scratch.open().map_err(|e| {
            RdfXaError::Materialization(format!("cannot open the working repository: {}", e))
        })?;

        let mut report = MaterializationReport {
            context: context.to_string(),
            transformations: Vec::new(),
        };
        let derived = Pass {
            working: working.as_mut(),
            target,
            context,
            counter: TransformationCounter::new(),
            report: &mut report,
        }
        .run(operations);
        if let Err(e) = &derived {
            error!("materialization of context {} failed: {}", context, e);
        }

        let cleaned = Self::clean(working.as_mut(), context);
        if let Err(e) = &cleaned {
            error!("cannot clean the working repository: {}", e);
        }
        let shut_down = self.scratch.shut_down();
        if let Err(e) = &shut_down {
            error!("cannot shut down the working repository: {}", e);
        }

        derived.and(cleaned).and(shut_down.map_err(|e| {
            RdfXaError::Materialization(format!("cannot shut down the working repository: {}", e))
        }))?;
        info!(
            "derived {} transformations from context {}",
            report.transformations.len(),
            context
        );
        Ok(report)
    }

    fn clean(working: &mut dyn TripleStoreClient, context: &str) -> Result<()> {
        let steps = working
            .clear_context(context)
            .and_then(|()| working.commit())
            .and_then(|()| working.disconnect());
        steps.map_err(|e| {
            RdfXaError::Materialization(format!("cannot clean the working repository: {}", e))
        })
    }
}

struct Pass<'p> {
    working: &'p mut dyn TripleStoreClient,
    target: &'p mut dyn TripleStoreClient,
    context: &'p str,
    counter: TransformationCounter,
    report: &'p mut MaterializationReport,
}

impl Pass<'_> {
    fn run(mut self, operations: &[Operation]) -> Result<()> {
        for operation in operations {
            if let Operation::AddRdfData {
                url,
                base_uri,
                context,
            } = operation
            {
                self.working.add_rdf_data(url, base_uri, context)?;
                self.working.commit().map_err(working_commit)?;
            }
        }

        let mut instances: HashMap<String, String> = HashMap::new();
        let services = self
            .working
            .execute_sparql_select_query(&queries::services_in_out(self.context))?;
        for row in &services {
            let service = required(row, VAR_SERVICE)?;
            let input = required(row, VAR_INPUT_PUID)?;
            let output_class = required(row, VAR_OUTPUT_CLASS)?;

            if !instances.contains_key(output_class) {
                let instance = class_to_instance(output_class)?;
                self.working.add_rdf_triple(
                    &RdfTriple::new(instance.as_str(), vocab::RDF_TYPE, output_class),
                    self.context,
                )?;
                self.working.commit().map_err(working_commit)?;
                instances.insert(output_class.to_string(), instance);
            }

            let formats = self
                .working
                .execute_sparql_select_query(&queries::file_format_of_class(output_class))?;
            for format_row in &formats {
                let output = required(format_row, VAR_OUTPUT_FORMAT)?;
                if !self
                    .working
                    .execute_sparql_ask_query(&queries::has_rdf_type(output, vocab::FILE_FORMAT))?
                {
                    debug!("the type of file {} is incorrect", output);
                    continue;
                }
                let types = self
                    .working
                    .execute_sparql_select_query(&queries::rdf_types_of(output))?;
                match classify(&types) {
                    ParameterKind::Input => {
                        let Some(condition) = row.value(VAR_IN_OUT_FORMAT_CONDITION) else {
                            debug!("{} has no input/output format condition", service);
                            continue;
                        };
                        let resolved = self.working.execute_sparql_select_query(
                            &queries::output_puid_from_input(condition, output),
                        )?;
                        for resolved_row in &resolved {
                            let resolved_output = required(resolved_row, VAR_OUTPUT_PUID)?;
                            self.record(service, input, resolved_output)?;
                        }
                    }
                    ParameterKind::Local => {
                        let condition = required(row, VAR_INPUT_FILE_CONDITION)?;
                        let resolved = self.working.execute_sparql_select_query(
                            &queries::output_puid_from_local(condition, output),
                        )?;
                        for resolved_row in &resolved {
                            let resolved_output = required(resolved_row, VAR_OUTPUT_PUID)?;
                            if resolved_output == input {
                                self.record(service, input, resolved_output)?;
                            }
                        }
                    }
                    ParameterKind::Direct => self.record(service, input, output)?,
                }
            }
        }
        Ok(())
    }

    fn record(&mut self, service: &str, input: &str, output: &str) -> Result<()> {
        let name = format!("{}Transformation{}", service, self.counter.next(service));
        let triples = [
            RdfTriple::new(name.as_str(), vocab::RDF_TYPE, vocab::FILE_TRANSFORMATION),
            RdfTriple::new(name.as_str(), vocab::FILE_IN, input),
            RdfTriple::new(name.as_str(), vocab::FILE_OUT, output),
            RdfTriple::new(name.as_str(), vocab::PERFORMED_BY, service),
        ];
        for triple in &triples {
            self.target.add_rdf_triple(triple, self.context)?;
        }
        debug!("{} transforms {} into {}", name, input, output);
        self.report.transformations.push(Transformation {
            name,
            service: service.to_string(),
            input: input.to_string(),
            output: output.to_string(),
        });
        Ok(())
    }
}
