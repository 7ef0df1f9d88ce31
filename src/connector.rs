use std::sync::Arc;

use log::debug;

use crate::client::{ClientFactory, ScratchRepository};
use crate::config::ConnectorConfig;
use crate::errors::Result;
use crate::lock_manager::LockManager;
use crate::managed_connection::ManagedConnection;

/// Log target of the audit trail: journaled operations and branches that
/// need manual reconciliation.
pub const AUDIT_TARGET: &str = "rdfxa::audit";

/// rdfxa Prelude
pub mod prelude {
    pub use crate::client::*;
    pub use crate::commit_strategy::*;
    pub use crate::config::ConnectorConfig;
    pub use crate::connection::*;
    pub use crate::connector::*;
    pub use crate::data_store::journal::*;
    pub use crate::data_store::operation::*;
    pub use crate::errors::*;
    pub use crate::lock_manager::*;
    pub use crate::managed_connection::*;
    pub use crate::model::*;
    pub use crate::participant::*;
    pub use crate::twopc::*;
}

/// The entry point of the connector.
///
/// Every managed connection created by a connector shares its lock manager,
/// so all of them serialize their writes to the one main repository. Each
/// gets a fresh client, journal and resource participant.
pub struct Connector {
    config: ConnectorConfig,
    locks: Arc<LockManager>,
    factory: Arc<dyn ClientFactory>,
    scratch: Option<Arc<dyn ScratchRepository>>,
}

impl Connector {
    /// Creates a connector over the clients produced by `factory`.
    ///
    /// `scratch` is the working repository for materialization; it is ignored
    /// when the configuration disables deriving transformations.
    pub fn new(
        config: ConnectorConfig,
        factory: Arc<dyn ClientFactory>,
        scratch: Option<Arc<dyn ScratchRepository>>,
    ) -> Result<Self> {
        config.validate()?;
        let locks = Arc::new(LockManager::with_timeout(config.lock_timeout()));
        let scratch = if config.derive_transformations {
            scratch
        } else {
            None
        };
        Ok(Self {
            config,
            locks,
            factory,
            scratch,
        })
    }

    /// Creates a connector over Oxigraph repositories, on disk when the
    /// configuration names a data directory, in memory otherwise.
    #[cfg(feature = "oxigraph")]
    pub fn open(config: ConnectorConfig) -> Result<Self> {
        use crate::backend::OxigraphRepository;

        config.validate()?;
        let repository = |name: &str, dir: Option<std::path::PathBuf>| match dir {
            Some(dir) => OxigraphRepository::on_disk(name, dir),
            None => OxigraphRepository::in_memory(name),
        };
        let main = repository(&config.repository_name, config.repository_dir());
        main.initialize()?;
        let working = repository(
            &config.working_repository_name,
            config.working_repository_dir(),
        );
        debug!(
            "opened repository {} with working repository {}",
            main.name(),
            working.name()
        );
        Self::new(config, Arc::new(main), Some(Arc::new(working)))
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn lock_manager(&self) -> &Arc<LockManager> {
        &self.locks
    }

    /// Creates a managed connection with a freshly connected client.
    pub fn create_managed_connection(&self) -> Result<Arc<ManagedConnection>> {
        let client = self.factory.create_client()?;
        let managed = ManagedConnection::new(client, self.locks.clone(), self.scratch.clone());
        debug!("connector created managed connection {}", managed.id());
        Ok(managed)
    }
}
