//! Adapter over an [Oxigraph](https://github.com/oxigraph/oxigraph) store.
//!
//! An [`OxigraphRepository`] owns the store and can be shut down and
//! initialized again; on-disk repositories only guarantee durability across
//! such a cycle. [`OxigraphClient`]s stage their writes and apply them in one
//! store transaction on commit. Queries always see committed data only.

use std::fs;
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use oxigraph::io::{GraphFormat, GraphParser};
use oxigraph::model::{GraphName, NamedNode, Quad, Term};
use oxigraph::sparql::{Query, QueryResults, Update};
use oxigraph::store::{StorageError, Store};
use parking_lot::RwLock;
use url::Url;

use crate::client::{ClientFactory, DurabilityPolicy, ScratchRepository, TripleStoreClient};
use crate::errors::{RdfXaError, Result};
use crate::model::{RdfTriple, SparqlSelectTuple};

struct RepositoryInner {
    name: String,
    path: Option<PathBuf>,
    store: RwLock<Option<Store>>,
}

/// One named Oxigraph repository, in memory or in a directory.
///
/// Cloning is cheap; clones share the store.
#[derive(Clone)]
pub struct OxigraphRepository {
    inner: Arc<RepositoryInner>,
}

impl OxigraphRepository {
    /// A repository that lives as long as it is initialized.
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self::with_path(name.into(), None)
    }

    /// A repository stored in `path`. The directory is created on first
    /// initialization.
    pub fn on_disk(name: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self::with_path(name.into(), Some(path.as_ref().to_path_buf()))
    }

    fn with_path(name: String, path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(RepositoryInner {
                name,
                path,
                store: RwLock::new(None),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.store.read().is_some()
    }

    pub fn durability_policy(&self) -> DurabilityPolicy {
        match self.inner.path {
            Some(_) => DurabilityPolicy::ShutdownReinitialize,
            None => DurabilityPolicy::OnCommit,
        }
    }

    /// Opens the store unless it is open already.
    pub fn initialize(&self) -> Result<()> {
        let mut store = self.inner.store.write();
        if store.is_some() {
            return Ok(());
        }
        let opened = match &self.inner.path {
            Some(path) => {
                fs::create_dir_all(path).map_err(|e| {
                    RdfXaError::Connection(format!("cannot create {}: {}", path.display(), e))
                })?;
                Store::open(path)
            }
            None => Store::new(),
        }
        .map_err(|e| {
            RdfXaError::Connection(format!("cannot initialize repository {}: {}", self.inner.name, e))
        })?;
        debug!("initialized repository {}", self.inner.name);
        *store = Some(opened);
        Ok(())
    }

    /// Flushes and closes the store. An in-memory store loses its data.
    pub fn shut_down(&self) -> Result<()> {
        let Some(store) = self.inner.store.write().take() else {
            return Ok(());
        };
        if self.inner.path.is_some() {
            store.flush().map_err(|e| {
                RdfXaError::Connection(format!("cannot flush repository {}: {}", self.inner.name, e))
            })?;
        }
        debug!("shut down repository {}", self.inner.name);
        Ok(())
    }

    fn store(&self) -> Result<Store> {
        if let Some(store) = self.inner.store.read().as_ref() {
            return Ok(store.clone());
        }
        self.initialize()?;
        self.inner
            .store
            .read()
            .as_ref()
            .cloned()
            .ok_or_else(|| RdfXaError::Connection(format!("repository {} is shut down", self.inner.name)))
    }

    /// Creates a connected client.
    pub fn client(&self) -> Result<OxigraphClient> {
        let mut client = OxigraphClient::new(self.clone());
        client.connect()?;
        Ok(client)
    }

    /// Number of committed quads.
    pub fn len(&self) -> Result<usize> {
        self.store()?
            .len()
            .map_err(|e| RdfXaError::Connection(e.to_string()))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl ClientFactory for OxigraphRepository {
    fn create_client(&self) -> Result<Box<dyn TripleStoreClient>> {
        Ok(Box::new(self.client()?))
    }
}

impl ScratchRepository for OxigraphRepository {
    fn open(&self) -> Result<Box<dyn TripleStoreClient>> {
        self.initialize()?;
        Ok(Box::new(self.client()?))
    }

    fn shut_down(&self) -> Result<()> {
        OxigraphRepository::shut_down(self)
    }
}

#[derive(Debug, Clone)]
enum StagedWrite {
    Insert(Quad),
    Remove(Quad),
    Clear(NamedNode),
}

/// Client of an [`OxigraphRepository`].
///
/// Reconnects on demand after `disconnect`.
pub struct OxigraphClient {
    repository: OxigraphRepository,
    connected: bool,
    staged: Vec<StagedWrite>,
}

impl OxigraphClient {
    pub fn new(repository: OxigraphRepository) -> Self {
        Self {
            repository,
            connected: false,
            staged: Vec::new(),
        }
    }

    pub fn repository(&self) -> &OxigraphRepository {
        &self.repository
    }

    /// Number of writes waiting for `commit`.
    pub fn pending_writes(&self) -> usize {
        self.staged.len()
    }

    fn store(&mut self) -> Result<Store> {
        if !self.connected {
            self.connect()?;
        }
        self.repository.store()
    }

    fn context(context: &str) -> Result<NamedNode> {
        NamedNode::new(context).map_err(|_| RdfXaError::ContextNameSyntax(context.to_string()))
    }

    fn triple_component(component: &str) -> Result<NamedNode> {
        NamedNode::new(component).map_err(|_| RdfXaError::RdfTripleSyntax(component.to_string()))
    }

    fn quad(triple: &RdfTriple, context: &str) -> Result<Quad> {
        let graph = Self::context(context)?;
        Ok(Quad::new(
            Self::triple_component(triple.subject())?,
            Self::triple_component(triple.predicate())?,
            Self::triple_component(triple.object())?,
            GraphName::NamedNode(graph),
        ))
    }
}

fn download_error(url: &str, reason: impl ToString) -> RdfXaError {
    RdfXaError::RdfDownload {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

/// Reads the document at `url`: a `file:` URL, an `http(s):` URL or a path.
fn fetch(url: &str) -> Result<Vec<u8>> {
    if url.starts_with("http://") || url.starts_with("https://") {
        return fetch_remote(url);
    }
    let path = if url.starts_with("file:") {
        Url::parse(url)
            .ok()
            .and_then(|parsed| parsed.to_file_path().ok())
            .ok_or_else(|| download_error(url, "not a local file URL"))?
    } else {
        PathBuf::from(url)
    };
    fs::read(&path).map_err(|e| download_error(url, e))
}

#[cfg(feature = "remote-rdf")]
fn fetch_remote(url: &str) -> Result<Vec<u8>> {
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| download_error(url, e))?;
    let body = response.bytes().map_err(|e| download_error(url, e))?;
    Ok(body.to_vec())
}

#[cfg(not(feature = "remote-rdf"))]
fn fetch_remote(url: &str) -> Result<Vec<u8>> {
    Err(download_error(url, "remote RDF documents are not supported"))
}

/// Syntax of the document at `url`, from its extension. RDF/XML otherwise.
fn format_of(url: &str) -> GraphFormat {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next().unwrap_or(path);
    file.rsplit_once('.')
        .and_then(|(_, extension)| GraphFormat::from_extension(&extension.to_lowercase()))
        .unwrap_or(GraphFormat::RdfXml)
}

/// Parses a query. Without a `FROM` clause the default graph is the union of
/// all contexts.
fn parse_query(query: &str) -> Result<Query> {
    let mut parsed =
        Query::parse(query, None).map_err(|e| RdfXaError::MalformedQuery(e.to_string()))?;
    if parsed.dataset().is_default_dataset() {
        parsed.dataset_mut().set_default_graph_as_union();
    }
    Ok(parsed)
}

fn term_value(term: &Term) -> String {
    match term {
        Term::NamedNode(node) => node.as_str().to_string(),
        Term::BlankNode(node) => node.as_str().to_string(),
        Term::Literal(literal) => literal.value().to_string(),
        #[allow(unreachable_patterns)]
        other => other.to_string(),
    }
}

impl TripleStoreClient for OxigraphClient {
    fn connect(&mut self) -> Result<()> {
        self.repository.initialize()?;
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        if !self.staged.is_empty() {
            debug!(
                "discarding {} uncommitted writes to {}",
                self.staged.len(),
                self.repository.name()
            );
        }
        self.staged.clear();
        self.connected = false;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if self.staged.is_empty() {
            return Ok(());
        }
        let store = self
            .store()
            .map_err(|e| RdfXaError::Commit(e.to_string()))?;
        let staged = &self.staged;
        store
            .transaction(|mut transaction| {
                for write in staged {
                    match write {
                        StagedWrite::Insert(quad) => {
                            transaction.insert(quad)?;
                        }
                        StagedWrite::Remove(quad) => {
                            transaction.remove(quad)?;
                        }
                        StagedWrite::Clear(graph) => transaction.clear_graph(graph.as_ref())?,
                    }
                }
                Ok::<(), StorageError>(())
            })
            .map_err(|e| RdfXaError::Commit(e.to_string()))?;
        debug!("committed {} writes to {}", self.staged.len(), self.repository.name());
        self.staged.clear();
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.staged.clear();
        Ok(())
    }

    fn durability_policy(&self) -> DurabilityPolicy {
        self.repository.durability_policy()
    }

    fn flush(&mut self) -> Result<()> {
        if self.repository.durability_policy() == DurabilityPolicy::OnCommit {
            return Ok(());
        }
        info!("flushing repository {} to disk", self.repository.name());
        self.repository
            .shut_down()
            .map_err(|e| RdfXaError::Flush(format!("shutdown failed: {}", e)))?;
        self.repository
            .initialize()
            .map_err(|e| RdfXaError::Flush(format!("reinitialization failed: {}", e)))
    }

    fn add_rdf_data(&mut self, url: &str, base_uri: &str, context: &str) -> Result<()> {
        let graph = Self::context(context)?;
        let document = fetch(url)?;
        let parse_error = |reason: String| RdfXaError::RdfParse {
            url: url.to_string(),
            reason,
        };
        let mut parser = GraphParser::from_format(format_of(url));
        if !base_uri.is_empty() {
            parser = parser
                .with_base_iri(base_uri)
                .map_err(|e| parse_error(e.to_string()))?;
        }
        let triples = parser
            .read_triples(BufReader::new(Cursor::new(document)))
            .map_err(|e| parse_error(e.to_string()))?;
        let mut quads = Vec::new();
        for triple in triples {
            let triple = triple.map_err(|e| parse_error(e.to_string()))?;
            quads.push(StagedWrite::Insert(triple.in_graph(graph.clone())));
        }
        debug!("staged {} triples from {} into {}", quads.len(), url, context);
        self.staged.extend(quads);
        Ok(())
    }

    fn add_rdf_triple(&mut self, triple: &RdfTriple, context: &str) -> Result<()> {
        let quad = Self::quad(triple, context)?;
        self.staged.push(StagedWrite::Insert(quad));
        Ok(())
    }

    fn remove_rdf_triple(&mut self, triple: &RdfTriple, context: &str) -> Result<()> {
        let quad = Self::quad(triple, context)?;
        self.staged.push(StagedWrite::Remove(quad));
        Ok(())
    }

    fn clear_context(&mut self, context: &str) -> Result<()> {
        let graph = Self::context(context)?;
        self.staged.push(StagedWrite::Clear(graph));
        Ok(())
    }

    fn execute_sparql_select_query(&mut self, query: &str) -> Result<Vec<SparqlSelectTuple>> {
        let parsed = parse_query(query)?;
        let results = self
            .store()?
            .query(parsed)
            .map_err(|e| RdfXaError::Connection(e.to_string()))?;
        let QueryResults::Solutions(solutions) = results else {
            return Err(RdfXaError::MalformedQuery(format!("not a SELECT query: {}", query)));
        };
        let mut tuples = Vec::new();
        for solution in solutions {
            let solution = solution.map_err(|e| RdfXaError::Connection(e.to_string()))?;
            tuples.push(
                solution
                    .iter()
                    .map(|(variable, term)| (variable.as_str(), term_value(term)))
                    .collect(),
            );
        }
        Ok(tuples)
    }

    fn execute_sparql_ask_query(&mut self, query: &str) -> Result<bool> {
        let parsed = parse_query(query)?;
        match self
            .store()?
            .query(parsed)
            .map_err(|e| RdfXaError::Connection(e.to_string()))?
        {
            QueryResults::Boolean(answer) => Ok(answer),
            _ => Err(RdfXaError::MalformedQuery(format!("not an ASK query: {}", query))),
        }
    }

    fn execute_sparql_update_data(&mut self, update: &str) -> Result<()> {
        let parsed =
            Update::parse(update, None).map_err(|e| RdfXaError::MalformedQuery(e.to_string()))?;
        self.store()?
            .update(parsed)
            .map_err(|e| RdfXaError::Connection(e.to_string()))
    }

    fn invalidate(&mut self) -> Result<()> {
        if !self.staged.is_empty() {
            warn!(
                "invalidating a client of {} with {} uncommitted writes",
                self.repository.name(),
                self.staged.len()
            );
        }
        self.disconnect()
    }
}
