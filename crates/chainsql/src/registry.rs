//! Connection registry.
//!
//! A [`Registry`] owns one [`ChainDb`] per configuration record and hands them
//! out by index or name. It is an ordinary value: construct it where the
//! application composes its services and pass it (or a [`SharedRegistry`])
//! to whoever needs a handle.
//!
//! `build` compares a fingerprint of the merged configuration with the one
//! the current handles were built from. An unchanged configuration is a no-op;
//! a changed one replaces every handle. Every record is validated before any
//! connection is opened, and the old handles survive a failed rebuild.

use crate::client::{Connector, DefaultConnector};
use crate::config::{DbKey, RegistryConfig};
use crate::db::ChainDb;
use crate::error::{ChainError, ChainResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Owns the handles built from one [`RegistryConfig`].
pub struct Registry {
    connector: Arc<dyn Connector>,
    fingerprint: Option<String>,
    config: Option<RegistryConfig>,
    dbs: Vec<ChainDb>,
    names: HashMap<String, usize>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("fingerprint", &self.fingerprint)
            .field("dbs", &self.dbs)
            .finish_non_exhaustive()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_default_connector()
    }
}

impl Registry {
    /// An unbuilt registry that opens connections through `connector`.
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            fingerprint: None,
            config: None,
            dbs: Vec::new(),
            names: HashMap::new(),
        }
    }

    /// An unbuilt registry using the built-in backends.
    pub fn with_default_connector() -> Self {
        Self::new(Arc::new(DefaultConnector))
    }

    /// Build (or rebuild) the handles.
    ///
    /// Returns `false` when the configuration is unchanged and the existing
    /// handles were kept, `true` when handles were (re)created.
    pub fn build(&mut self, config: impl Into<RegistryConfig>) -> ChainResult<bool> {
        let config = config.into();
        config.validate()?;
        let fingerprint = config.fingerprint()?;
        if self.fingerprint.as_deref() == Some(fingerprint.as_str()) {
            return Ok(false);
        }

        let mut dbs = Vec::new();
        let mut names = HashMap::new();
        for (index, (name, record)) in config.entries().into_iter().enumerate() {
            let key = match name {
                Some(name) => {
                    names.insert(name.to_string(), index);
                    name.to_string()
                }
                None => index.to_string(),
            };
            dbs.push(ChainDb::open_keyed(key, record.clone(), self.connector.as_ref())?);
        }

        #[cfg(feature = "tracing")]
        tracing::info!(
            target: "chainsql.registry",
            handles = dbs.len(),
            fingerprint = %fingerprint,
            rebuilt = self.fingerprint.is_some(),
            "registry built"
        );

        self.dbs = dbs;
        self.names = names;
        self.config = Some(config);
        self.fingerprint = Some(fingerprint);
        Ok(true)
    }

    /// The handle at `key`: an index, or a name from a named configuration.
    pub fn get_db(&self, key: impl Into<DbKey>) -> ChainResult<&ChainDb> {
        let key = key.into();
        let index = self.resolve(&key)?;
        Ok(&self.dbs[index])
    }

    /// Mutable access to the handle at `key`, needed to run chains.
    pub fn get_db_mut(&mut self, key: impl Into<DbKey>) -> ChainResult<&mut ChainDb> {
        let key = key.into();
        let index = self.resolve(&key)?;
        Ok(&mut self.dbs[index])
    }

    fn resolve(&self, key: &DbKey) -> ChainResult<usize> {
        let index = match key {
            DbKey::Index(i) => Some(*i),
            DbKey::Name(name) => self.names.get(name).copied(),
        };
        index
            .filter(|i| *i < self.dbs.len())
            .ok_or_else(|| ChainError::not_found(key.to_string()))
    }

    /// All handles, in index order.
    pub fn dbs(&self) -> &[ChainDb] {
        &self.dbs
    }

    pub fn len(&self) -> usize {
        self.dbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dbs.is_empty()
    }

    pub fn is_built(&self) -> bool {
        self.fingerprint.is_some()
    }

    /// Fingerprint of the configuration the current handles were built from.
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    pub fn config(&self) -> Option<&RegistryConfig> {
        self.config.as_ref()
    }

    /// Drop every handle and return to the unbuilt state.
    pub fn teardown(&mut self) {
        self.dbs.clear();
        self.names.clear();
        self.config = None;
        self.fingerprint = None;
    }
}

/// A [`Registry`] behind a mutex, for applications that share it across threads.
///
/// `build` holds the lock across the fingerprint comparison and the swap, so
/// concurrent callers never observe a half-built registry. Handles are lent
/// out only for the duration of a closure.
#[derive(Debug, Default)]
pub struct SharedRegistry {
    inner: Mutex<Registry>,
}

impl SharedRegistry {
    pub fn new(registry: Registry) -> Self {
        Self {
            inner: Mutex::new(registry),
        }
    }

    pub fn build(&self, config: impl Into<RegistryConfig>) -> ChainResult<bool> {
        self.lock()?.build(config)
    }

    /// Run `f` with exclusive access to the handle at `key`.
    pub fn with_db<T>(
        &self,
        key: impl Into<DbKey>,
        f: impl FnOnce(&mut ChainDb) -> ChainResult<T>,
    ) -> ChainResult<T> {
        let mut registry = self.lock()?;
        f(registry.get_db_mut(key)?)
    }

    pub fn fingerprint(&self) -> ChainResult<Option<String>> {
        Ok(self.lock()?.fingerprint().map(str::to_string))
    }

    pub fn teardown(&self) -> ChainResult<()> {
        self.lock()?.teardown();
        Ok(())
    }

    fn lock(&self) -> ChainResult<MutexGuard<'_, Registry>> {
        self.inner
            .lock()
            .map_err(|_| ChainError::Other("registry lock poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Connection, Row};
    use crate::config::DbConfig;
    use crate::error::DriverError;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullConnection;

    impl Connection for NullConnection {
        fn execute(&mut self, _: &str) -> Result<u64, DriverError> {
            Ok(0)
        }
        fn query(&mut self, _: &str) -> Result<Vec<Row>, DriverError> {
            Ok(Vec::new())
        }
        fn last_insert_id(&mut self) -> Option<String> {
            None
        }
        fn begin(&mut self) -> Result<(), DriverError> {
            Ok(())
        }
        fn commit(&mut self) -> Result<(), DriverError> {
            Ok(())
        }
        fn rollback(&mut self) -> Result<(), DriverError> {
            Ok(())
        }
        fn in_transaction(&self) -> bool {
            false
        }
    }

    #[derive(Default)]
    struct CountingConnector {
        opened: AtomicUsize,
    }

    impl Connector for CountingConnector {
        fn open(&self, config: &DbConfig) -> ChainResult<Box<dyn Connection>> {
            if config.name == "unreachable" {
                return Err(ChainError::connection("refused"));
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(NullConnection))
        }
    }

    fn registry() -> (Arc<CountingConnector>, Registry) {
        let connector = Arc::new(CountingConnector::default());
        (connector.clone(), Registry::new(connector))
    }

    #[test]
    fn single_record_is_index_zero() {
        let (_, mut registry) = registry();
        assert!(!registry.is_built());
        assert!(registry.build(DbConfig::new("test1")).unwrap());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get_db(0).unwrap().config().name, "test1");
        assert_eq!(registry.get_db(0).unwrap().key(), "0");
    }

    #[test]
    fn list_is_index_addressable() {
        let (_, mut registry) = registry();
        registry
            .build(vec![DbConfig::new("test1"), DbConfig::new("test2")])
            .unwrap();
        assert_eq!(registry.get_db(0).unwrap().config().name, "test1");
        assert_eq!(registry.get_db(1).unwrap().config().name, "test2");
        let err = registry.get_db(2).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Database[2] not found.");
    }

    #[test]
    fn named_records_resolve_by_name_and_index() {
        let (_, mut registry) = registry();
        let mut named = BTreeMap::new();
        named.insert("reports".to_string(), DbConfig::new("reports_db"));
        named.insert("app".to_string(), DbConfig::new("app_db"));
        registry.build(named).unwrap();

        assert_eq!(registry.get_db("reports").unwrap().config().name, "reports_db");
        assert_eq!(registry.get_db(0).unwrap().key(), "app");
        assert_eq!(
            registry.get_db("missing").unwrap_err().to_string(),
            "Database[missing] not found."
        );
    }

    #[test]
    fn unchanged_config_is_not_rebuilt() {
        let (connector, mut registry) = registry();
        let config = vec![DbConfig::new("a"), DbConfig::new("b")];
        assert!(registry.build(config.clone()).unwrap());
        let fingerprint = registry.fingerprint().unwrap().to_string();
        assert!(!registry.build(config).unwrap());
        assert_eq!(connector.opened.load(Ordering::SeqCst), 2);
        assert_eq!(registry.fingerprint(), Some(fingerprint.as_str()));
    }

    #[test]
    fn changed_config_rebuilds_every_handle() {
        let (connector, mut registry) = registry();
        registry.build(DbConfig::new("a")).unwrap();
        assert!(registry.build(DbConfig::new("a").port(3307)).unwrap());
        assert_eq!(connector.opened.load(Ordering::SeqCst), 2);
        assert_eq!(registry.get_db(0).unwrap().config().port, 3307);
    }

    #[test]
    fn invalid_record_fails_before_any_connection() {
        let (connector, mut registry) = registry();
        let err = registry
            .build(vec![DbConfig::new("a"), DbConfig::default()])
            .unwrap_err();
        assert_eq!(err.to_string(), "DB_NAME not configured.");
        assert_eq!(connector.opened.load(Ordering::SeqCst), 0);
        assert!(!registry.is_built());
    }

    #[test]
    fn failed_rebuild_keeps_previous_handles() {
        let (_, mut registry) = registry();
        registry.build(DbConfig::new("a")).unwrap();
        let before = registry.fingerprint().map(str::to_string);

        let err = registry.build(DbConfig::new("unreachable")).unwrap_err();
        assert!(matches!(err, ChainError::Connection(_)));
        assert_eq!(registry.fingerprint().map(str::to_string), before);
        assert_eq!(registry.get_db(0).unwrap().config().name, "a");
    }

    #[test]
    fn teardown_releases_handles() {
        let (_, mut registry) = registry();
        registry.build(DbConfig::new("a")).unwrap();
        registry.teardown();
        assert!(registry.is_empty());
        assert!(!registry.is_built());
        assert!(registry.get_db(0).unwrap_err().is_not_found());
        assert!(registry.build(DbConfig::new("a")).unwrap());
    }

    #[test]
    fn shared_registry_lends_handles() {
        let (_, registry) = registry();
        let shared = SharedRegistry::new(registry);
        assert!(shared.build(DbConfig::new("a")).unwrap());
        assert!(!shared.build(DbConfig::new("a")).unwrap());

        let sql = shared
            .with_db(0, |db| db.where_("id = 1").delete_sql("user"))
            .unwrap();
        assert_eq!(sql, "DELETE FROM `user` WHERE id = 1");
        assert!(shared.with_db(1, |_| Ok(())).unwrap_err().is_not_found());

        shared.teardown().unwrap();
        assert_eq!(shared.fingerprint().unwrap(), None);
    }

    #[test]
    fn shared_registry_builds_once_across_threads() {
        let connector = Arc::new(CountingConnector::default());
        let shared = Arc::new(SharedRegistry::new(Registry::new(connector.clone())));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                std::thread::spawn(move || shared.build(DbConfig::new("a")).unwrap())
            })
            .collect();
        let rebuilt = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|rebuilt| *rebuilt)
            .count();
        assert_eq!(rebuilt, 1);
        assert_eq!(connector.opened.load(Ordering::SeqCst), 1);
    }
}
