// Declare the common module *within this test crate*
mod common;

use common::{setup_materializing_connection, Call, Failure, MockClient, MockScratch, MockState};
use rdfxa::materializer::{class_to_instance, queries, vocab};
use rdfxa::prelude::*;
use rdfxa::Materializer;

const CTX: &str = "http://example.org/ctxS";
const SERVICE: &str = "http://example.org/svc/Convert";
const INPUT: &str = "http://example.org/fmt/P1";
const OUTPUT_CLASS: &str = "http://example.org/onto#ImageFile";
const FILE_CONDITION: &str = "http://example.org/svc/inputFileCondition";
const FORMAT_CONDITION: &str = "http://example.org/svc/inOutFormatCondition";
const DIRECT: &str = "http://example.org/fmt/F1";
const BY_INPUT: &str = "http://example.org/fmt/F2";
const BY_LOCAL: &str = "http://example.org/fmt/F3";
const NOT_A_FORMAT: &str = "http://example.org/fmt/F4";

fn service_row() -> SparqlSelectTuple {
    SparqlSelectTuple::new()
        .with(queries::VAR_SERVICE, SERVICE)
        .with(queries::VAR_INPUT_PUID, INPUT)
        .with(queries::VAR_OUTPUT_CLASS, OUTPUT_CLASS)
        .with(queries::VAR_INPUT_FILE_CONDITION, FILE_CONDITION)
        .with(queries::VAR_IN_OUT_FORMAT_CONDITION, FORMAT_CONDITION)
}

fn rows(var: &str, values: &[&str]) -> Vec<SparqlSelectTuple> {
    values
        .iter()
        .map(|v| SparqlSelectTuple::new().with(var, *v))
        .collect()
}

/// Scripts a service whose output class is restricted to four formats: one
/// used as is, one selected by an input parameter, one bound to a local
/// parameter, and one that is not typed as a file format.
fn script_service(state: &MockState) {
    state.respond(queries::services_in_out(CTX), vec![service_row()]);
    state.respond(
        queries::file_format_of_class(OUTPUT_CLASS),
        rows(
            queries::VAR_OUTPUT_FORMAT,
            &[DIRECT, BY_INPUT, BY_LOCAL, NOT_A_FORMAT],
        ),
    );
    state.answer(queries::has_rdf_type(NOT_A_FORMAT, vocab::FILE_FORMAT), false);
    state.respond(
        queries::rdf_types_of(BY_INPUT),
        rows(queries::VAR_TYPE, &[vocab::PROCESS_INPUT_PARAMETER]),
    );
    state.respond(
        queries::rdf_types_of(BY_LOCAL),
        rows(
            queries::VAR_TYPE,
            &["http://example.org/onto#Other", vocab::PROCESS_LOCAL_PARAMETER],
        ),
    );
    state.respond(
        queries::output_puid_from_input(FORMAT_CONDITION, BY_INPUT),
        rows(
            queries::VAR_OUTPUT_PUID,
            &["http://example.org/fmt/O1", "http://example.org/fmt/O2"],
        ),
    );
    state.respond(
        queries::output_puid_from_local(FILE_CONDITION, BY_LOCAL),
        rows(queries::VAR_OUTPUT_PUID, &[INPUT, "http://example.org/fmt/P9"]),
    );
}

fn registration() -> Vec<Operation> {
    vec![
        Operation::AddRdfData {
            url: "file:///tmp/service.owl".into(),
            base_uri: "".into(),
            context: CTX.into(),
        },
        Operation::AddRdfData {
            url: "file:///tmp/formats.owl".into(),
            base_uri: "http://example.org/".into(),
            context: CTX.into(),
        },
    ]
}

#[test]
fn test_transformations_are_derived_per_format() {
    let scratch = MockScratch::new();
    script_service(&scratch.state);
    let target_state = MockState::new();
    let mut target = MockClient::new(target_state.clone(), DurabilityPolicy::OnCommit);

    let report = Materializer::new(scratch.as_ref())
        .run(&mut target, CTX, &registration())
        .unwrap();

    assert_eq!(report.context, CTX);
    let derived: Vec<(&str, &str, &str)> = report
        .transformations
        .iter()
        .map(|t| (t.name.as_str(), t.input.as_str(), t.output.as_str()))
        .collect();
    let names: Vec<String> = (1..=4)
        .map(|n| format!("{}Transformation{}", SERVICE, n))
        .collect();
    assert_eq!(
        derived,
        vec![
            (names[0].as_str(), INPUT, DIRECT),
            (names[1].as_str(), INPUT, "http://example.org/fmt/O1"),
            (names[2].as_str(), INPUT, "http://example.org/fmt/O2"),
            (names[3].as_str(), INPUT, INPUT),
        ]
    );

    // four facts per transformation, all uncommitted on the target
    let written = target_state.added_triples();
    assert_eq!(written.len(), 16);
    assert!(written.iter().all(|(_, ctx)| ctx == CTX));
    assert_eq!(
        written[..4]
            .iter()
            .map(|(t, _)| t.clone())
            .collect::<Vec<_>>(),
        vec![
            RdfTriple::new(names[0].as_str(), vocab::RDF_TYPE, vocab::FILE_TRANSFORMATION),
            RdfTriple::new(names[0].as_str(), vocab::FILE_IN, INPUT),
            RdfTriple::new(names[0].as_str(), vocab::FILE_OUT, DIRECT),
            RdfTriple::new(names[0].as_str(), vocab::PERFORMED_BY, SERVICE),
        ]
    );
    assert_eq!(target_state.commits(), 0);
}

#[test]
fn test_registration_is_replayed_and_cleaned_up() {
    let scratch = MockScratch::new();
    let target_state = MockState::new();
    let mut target = MockClient::new(target_state.clone(), DurabilityPolicy::OnCommit);

    let report = Materializer::new(scratch.as_ref())
        .run(&mut target, CTX, &registration())
        .unwrap();
    assert!(report.transformations.is_empty());

    let calls = scratch.state.calls();
    assert!(matches!(calls[0], Call::AddRdfData { .. }));
    assert_eq!(calls[1], Call::Commit);
    assert!(matches!(calls[2], Call::AddRdfData { .. }));
    assert_eq!(calls[3], Call::Commit);
    assert_eq!(
        calls[calls.len() - 3..].to_vec(),
        vec![
            Call::ClearContext(CTX.to_string()),
            Call::Commit,
            Call::Disconnect
        ]
    );
    assert_eq!(scratch.opened(), 1);
    assert_eq!(scratch.state.shut_downs(), 1);
    assert!(target_state.calls().is_empty());
}

#[test]
fn test_output_class_instance_is_typed_once() {
    let scratch = MockScratch::new();
    let other_service = service_row().with(queries::VAR_SERVICE, "http://example.org/svc/Other");
    scratch.state.respond(
        queries::services_in_out(CTX),
        vec![service_row(), other_service],
    );
    let mut target = MockClient::new(MockState::new(), DurabilityPolicy::OnCommit);

    Materializer::new(scratch.as_ref())
        .run(&mut target, CTX, &registration())
        .unwrap();

    let instance = class_to_instance(OUTPUT_CLASS).unwrap();
    assert_eq!(instance, "http://example.org/onto#imageFileInstance");
    assert_eq!(
        scratch.state.added_triples(),
        vec![(
            RdfTriple::new(instance, vocab::RDF_TYPE, OUTPUT_CLASS),
            CTX.to_string()
        )]
    );
}

#[test]
fn test_input_parameter_without_condition_is_skipped() {
    let scratch = MockScratch::new();
    script_service(&scratch.state);
    let row = SparqlSelectTuple::new()
        .with(queries::VAR_SERVICE, SERVICE)
        .with(queries::VAR_INPUT_PUID, INPUT)
        .with(queries::VAR_OUTPUT_CLASS, OUTPUT_CLASS)
        .with(queries::VAR_INPUT_FILE_CONDITION, FILE_CONDITION);
    scratch
        .state
        .respond(queries::services_in_out(CTX), vec![row]);
    let mut target = MockClient::new(MockState::new(), DurabilityPolicy::OnCommit);

    let report = Materializer::new(scratch.as_ref())
        .run(&mut target, CTX, &registration())
        .unwrap();
    let outputs: Vec<_> = report
        .transformations
        .iter()
        .map(|t| t.output.as_str())
        .collect();
    assert_eq!(outputs, vec![DIRECT, INPUT]);
}

#[test]
fn test_first_failure_wins() {
    let scratch = MockScratch::new();
    scratch.state.fail(Failure::Select);
    scratch.state.fail(Failure::ShutDown);
    let mut target = MockClient::new(MockState::new(), DurabilityPolicy::OnCommit);

    let err = Materializer::new(scratch.as_ref())
        .run(&mut target, CTX, &registration())
        .unwrap_err();
    assert!(matches!(err, RdfXaError::Connection(_)), "unexpected {:?}", err);

    // cleanup still ran
    assert!(
        scratch
            .state
            .calls()
            .contains(&Call::ClearContext(CTX.to_string()))
    );
    assert_eq!(scratch.state.shut_downs(), 1);
}

#[test]
fn test_shut_down_failure_is_reported() {
    let scratch = MockScratch::new();
    scratch.state.fail(Failure::ShutDown);
    let mut target = MockClient::new(MockState::new(), DurabilityPolicy::OnCommit);

    let err = Materializer::new(scratch.as_ref())
        .run(&mut target, CTX, &registration())
        .unwrap_err();
    assert!(matches!(err, RdfXaError::Materialization(_)));
}

#[test]
fn test_working_commit_failure_is_a_materialization_error() {
    let scratch = MockScratch::new();
    scratch.state.fail(Failure::Commit);
    let mut target = MockClient::new(MockState::new(), DurabilityPolicy::OnCommit);

    let err = Materializer::new(scratch.as_ref())
        .run(&mut target, CTX, &registration())
        .unwrap_err();
    assert!(matches!(err, RdfXaError::Materialization(_)));
    assert_eq!(scratch.state.shut_downs(), 1);
}

#[test]
fn test_closing_a_registration_writes_into_the_branch() {
    let (managed, state, scratch) = setup_materializing_connection();
    script_service(&scratch.state);
    let xa = managed.xa_resource();
    let xid = common::xid(1);

    xa.start(&xid, XaFlags::NOFLAGS).unwrap();
    let conn = managed.get_connection();
    conn.add_rdf_data("file:///tmp/service.owl", "", CTX).unwrap();
    conn.close().unwrap();
    xa.end(&xid, XaFlags::SUCCESS).unwrap();

    // derived facts are not journaled
    assert_eq!(managed.journal().len(), 1);
    assert_eq!(state.added_triples().len(), 16);
    assert_eq!(state.commits(), 0);

    assert_eq!(xa.prepare(&xid).unwrap(), Vote::Ok);
    xa.commit(&xid, false).unwrap();
    assert_eq!(state.commits(), 1);
    managed.cleanup().unwrap();
}
