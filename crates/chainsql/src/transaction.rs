//! Transaction helpers.
//!
//! [`ChainDb::begin_transaction`], [`ChainDb::commit`] and
//! [`ChainDb::rollback`] pass straight through to the connection. The
//! [`transaction!`](crate::transaction!) macro and [`run`] wrap a block so it
//! commits on `Ok` and rolls back on `Err`. Transactions do not nest.
//!
//! # Example
//!
//! ```
//! # #[cfg(feature = "sqlite")]
//! # fn main() -> chainsql::ChainResult<()> {
//! use chainsql::{ChainDb, DbConfig, DefaultConnector};
//! use serde_json::json;
//!
//! let mut db = ChainDb::open(DbConfig::sqlite(":memory:"), &DefaultConnector)?;
//! db.sql("CREATE TABLE account (id INTEGER PRIMARY KEY, balance INTEGER)")?;
//!
//! chainsql::transaction!(&mut db, tx, {
//!     tx.data(json!({"balance": 100})).insert("account")?;
//!     tx.data(json!({"balance": 50})).insert("account")?;
//!     Ok(())
//! })?;
//! assert_eq!(db.count_rows("account")?, 2);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "sqlite"))]
//! # fn main() {}
//! ```

use crate::db::ChainDb;
use crate::error::{ChainError, ChainResult};

/// Runs the given block inside a transaction on a [`ChainDb`].
///
/// - Begins with `begin_transaction()`.
/// - Commits on `Ok(_)`.
/// - Rolls back on `Err(_)` and returns the block's error.
///
/// The block sees the handle as `$tx` and must evaluate to
/// `chainsql::ChainResult<T>`.
#[macro_export]
macro_rules! transaction {
    ($db:expr, $tx:ident, $body:block) => {
        $crate::transaction::run($db, |$tx: &mut $crate::ChainDb| -> $crate::ChainResult<_> {
            $body
        })
    };
}

/// Run `f` between `BEGIN` and `COMMIT`, rolling back if it fails.
///
/// A failed rollback is reported together with the original error.
pub fn run<T>(
    db: &mut ChainDb,
    f: impl FnOnce(&mut ChainDb) -> ChainResult<T>,
) -> ChainResult<T> {
    db.begin_transaction()?;
    match f(db) {
        Ok(value) => {
            db.commit()?;
            Ok(value)
        }
        Err(error) => match db.rollback() {
            Ok(()) => Err(error),
            Err(rollback_err) => Err(ChainError::Other(format!(
                "{error} (rollback failed: {rollback_err})"
            ))),
        },
    }
}
