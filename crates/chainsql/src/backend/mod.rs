//! Built-in [`Connection`](crate::Connection) backends.

#[cfg(feature = "sqlite")]
pub mod sqlite;
