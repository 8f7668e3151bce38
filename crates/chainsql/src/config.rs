//! Connection configuration.
//!
//! A [`DbConfig`] is one connection record. Missing fields fall back to the
//! defaults (engine `mysql`, charset `utf8`, port `3306`, no options); only the
//! database name is required. A [`RegistryConfig`] holds one record, an
//! ordered list of records, or a set of named records.
//!
//! # TOML
//!
//! ```toml
//! [[databases]]
//! engine = "sqlite"
//! name = "app.db"
//! log_file = "sql.log"
//!
//! [[databases]]
//! host = "127.0.0.1"
//! name = "reports"
//! username = "${DB_USER}"
//! password = "${DB_PASSWORD}"
//! ```
//!
//! `[database]` (one record) and `[databases.<name>]` (named records) are also
//! accepted. `${VAR}` references in string fields are expanded from the
//! environment.

use crate::error::{ChainError, ChainResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_CHARSET: &str = "utf8";
pub const DEFAULT_PORT: u16 = 3306;

/// Database engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[default]
    Mysql,
    Sqlite,
}

impl Engine {
    pub fn as_str(self) -> &'static str {
        match self {
            Engine::Mysql => "mysql",
            Engine::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One connection record, merged with defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DbConfig {
    pub engine: Engine,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub charset: String,
    pub username: String,
    pub password: String,
    /// Driver-specific options. The SQLite backend applies each as a PRAGMA.
    pub options: BTreeMap<String, Value>,
    /// Append every executed statement to this file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            engine: Engine::default(),
            host: String::new(),
            port: DEFAULT_PORT,
            name: String::new(),
            charset: DEFAULT_CHARSET.to_string(),
            username: String::new(),
            password: String::new(),
            options: BTreeMap::new(),
            log_file: None,
        }
    }
}

impl DbConfig {
    /// A record for database `name` with every other field defaulted.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A SQLite record; `name` is a file path or `:memory:`.
    pub fn sqlite(name: impl Into<String>) -> Self {
        Self::new(name).engine(Engine::Sqlite)
    }

    pub fn engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Derived connection string.
    pub fn dsn(&self) -> String {
        match self.engine {
            Engine::Mysql => format!(
                "mysql:host={};port={};dbname={}",
                self.host, self.port, self.name
            ),
            Engine::Sqlite => format!("sqlite:{}", self.name),
        }
    }

    /// Fail fast on records that cannot produce a connection.
    pub fn validate(&self) -> ChainResult<()> {
        if self.name.trim().is_empty() {
            return Err(ChainError::config("DB_NAME not configured."));
        }
        Ok(())
    }

    fn expand_env(&mut self) -> ChainResult<()> {
        for field in [
            &mut self.host,
            &mut self.name,
            &mut self.charset,
            &mut self.username,
            &mut self.password,
        ] {
            *field = expand_env_vars(field)?;
        }
        for value in self.options.values_mut() {
            if let Value::String(s) = value {
                *s = expand_env_vars(s)?;
            }
        }
        if let Some(path) = self.log_file.as_mut() {
            *path = PathBuf::from(expand_env_vars(&path.to_string_lossy())?);
        }
        Ok(())
    }
}

/// Address of a handle in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DbKey {
    Index(usize),
    Name(String),
}

impl Default for DbKey {
    fn default() -> Self {
        DbKey::Index(0)
    }
}

impl From<usize> for DbKey {
    fn from(value: usize) -> Self {
        DbKey::Index(value)
    }
}

impl From<&str> for DbKey {
    fn from(value: &str) -> Self {
        DbKey::Name(value.to_string())
    }
}

impl From<String> for DbKey {
    fn from(value: String) -> Self {
        DbKey::Name(value)
    }
}

impl From<&DbKey> for DbKey {
    fn from(value: &DbKey) -> Self {
        value.clone()
    }
}

impl fmt::Display for DbKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbKey::Index(i) => write!(f, "{i}"),
            DbKey::Name(n) => f.write_str(n),
        }
    }
}

/// Everything the registry is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegistryConfig {
    /// One record, addressed as index 0.
    Single(DbConfig),
    /// Records addressed by position.
    List(Vec<DbConfig>),
    /// Records addressed by name, or by position in name order.
    Named(BTreeMap<String, DbConfig>),
}

impl From<DbConfig> for RegistryConfig {
    fn from(value: DbConfig) -> Self {
        RegistryConfig::Single(value)
    }
}

impl From<Vec<DbConfig>> for RegistryConfig {
    fn from(value: Vec<DbConfig>) -> Self {
        RegistryConfig::List(value)
    }
}

impl From<BTreeMap<String, DbConfig>> for RegistryConfig {
    fn from(value: BTreeMap<String, DbConfig>) -> Self {
        RegistryConfig::Named(value)
    }
}

impl RegistryConfig {
    /// Records in index order, with their names when they have one.
    pub fn entries(&self) -> Vec<(Option<&str>, &DbConfig)> {
        match self {
            RegistryConfig::Single(config) => vec![(None, config)],
            RegistryConfig::List(configs) => configs.iter().map(|c| (None, c)).collect(),
            RegistryConfig::Named(configs) => configs
                .iter()
                .map(|(name, c)| (Some(name.as_str()), c))
                .collect(),
        }
    }

    pub fn validate(&self) -> ChainResult<()> {
        self.entries()
            .into_iter()
            .try_for_each(|(_, config)| config.validate())
    }

    /// SHA-256 of the canonical JSON form, hex encoded.
    pub fn fingerprint(&self) -> ChainResult<String> {
        let canonical =
            serde_json::to_vec(self).map_err(|e| ChainError::config(e.to_string()))?;
        Ok(hex::encode(Sha256::digest(&canonical)))
    }

    /// Parse TOML text (see the module docs for the accepted layout).
    pub fn from_toml_str(raw: &str) -> ChainResult<Self> {
        let file: ConfigFile =
            toml::from_str(raw).map_err(|e| ChainError::config(format!("invalid config: {e}")))?;
        let mut config = file.into_registry_config()?;
        config.expand_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ChainResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ChainError::config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw).map_err(|e| match e {
            ChainError::Config(msg) => {
                ChainError::config(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    fn expand_env(&mut self) -> ChainResult<()> {
        match self {
            RegistryConfig::Single(config) => config.expand_env(),
            RegistryConfig::List(configs) => configs.iter_mut().try_for_each(DbConfig::expand_env),
            RegistryConfig::Named(configs) => {
                configs.values_mut().try_for_each(DbConfig::expand_env)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    database: Option<DbConfig>,
    databases: Option<DatabasesSection>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DatabasesSection {
    List(Vec<DbConfig>),
    Named(BTreeMap<String, DbConfig>),
}

impl ConfigFile {
    fn into_registry_config(self) -> ChainResult<RegistryConfig> {
        match (self.database, self.databases) {
            (Some(single), None) => Ok(RegistryConfig::Single(single)),
            (None, Some(DatabasesSection::List(list))) if !list.is_empty() => {
                Ok(RegistryConfig::List(list))
            }
            (None, Some(DatabasesSection::Named(named))) if !named.is_empty() => {
                Ok(RegistryConfig::Named(named))
            }
            (Some(_), Some(_)) => Err(ChainError::config(
                "use either [database] or [databases], not both",
            )),
            _ => Err(ChainError::config("no database configured")),
        }
    }
}

fn expand_env_vars(input: &str) -> ChainResult<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut key = String::new();
            let mut closed = false;
            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                key.push(ch);
            }

            if !closed {
                return Err(ChainError::config(format!(
                    "unterminated env var reference: ${{{key}}}"
                )));
            }
            if key.is_empty() {
                return Err(ChainError::config("invalid env var reference: ${}"));
            }

            let v = std::env::var(&key).map_err(|_| {
                ChainError::config(format!("missing env var for config expansion: {key}"))
            })?;
            out.push_str(&v);
            continue;
        }

        out.push(c);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_merged() {
        let config: DbConfig = toml::from_str(r#"name = "test1""#).unwrap();
        assert_eq!(config.engine, Engine::Mysql);
        assert_eq!(config.port, 3306);
        assert_eq!(config.charset, "utf8");
        assert!(config.options.is_empty());
        assert_eq!(config.dsn(), "mysql:host=;port=3306;dbname=test1");
    }

    #[test]
    fn sqlite_dsn() {
        assert_eq!(DbConfig::sqlite(":memory:").dsn(), "sqlite::memory:");
    }

    #[test]
    fn missing_name_fails() {
        let err = DbConfig::default().validate().unwrap_err();
        assert_eq!(err.to_string(), "DB_NAME not configured.");
    }

    #[test]
    fn parses_list() {
        let config = RegistryConfig::from_toml_str(
            r#"
            [[databases]]
            host = "localhost"
            name = "test1"

            [[databases]]
            host = "127.0.0.1"
            name = "test2"
            port = 3307
            "#,
        )
        .unwrap();
        let entries = config.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].1.name, "test2");
        assert_eq!(entries[1].1.port, 3307);
    }

    #[test]
    fn parses_single_and_named() {
        let single = RegistryConfig::from_toml_str(
            r#"
            [database]
            engine = "sqlite"
            name = ":memory:"
            "#,
        )
        .unwrap();
        assert!(matches!(single, RegistryConfig::Single(_)));

        let named = RegistryConfig::from_toml_str(
            r#"
            [databases.reports]
            name = "reports"

            [databases.main]
            name = "main"
            "#,
        )
        .unwrap();
        let entries = named.entries();
        assert_eq!(entries[0].0, Some("main"));
        assert_eq!(entries[1].0, Some("reports"));
    }

    #[test]
    fn rejects_unknown_fields_and_missing_name() {
        assert!(RegistryConfig::from_toml_str("[database]\nnmae = \"x\"").is_err());
        let err = RegistryConfig::from_toml_str("[database]\nhost = \"x\"").unwrap_err();
        assert_eq!(err.to_string(), "DB_NAME not configured.");
    }

    #[test]
    fn expands_env_vars() {
        // SAFETY: test-only variable with a unique name.
        unsafe { std::env::set_var("CHAINSQL_TEST_DB_NAME", "from_env") };
        let config =
            RegistryConfig::from_toml_str("[database]\nname = \"${CHAINSQL_TEST_DB_NAME}\"")
                .unwrap();
        assert_eq!(config.entries()[0].1.name, "from_env");
    }

    #[test]
    fn unterminated_env_var_fails() {
        assert!(expand_env_vars("${OOPS").is_err());
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = RegistryConfig::from(DbConfig::new("test1"));
        let b = RegistryConfig::from(DbConfig::new("test1"));
        let c = RegistryConfig::from(DbConfig::new("test2"));
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        assert_ne!(a.fingerprint().unwrap(), c.fingerprint().unwrap());
        assert_eq!(a.fingerprint().unwrap().len(), 64);
    }
}
