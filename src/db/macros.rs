//! Database dispatch macros for reducing code duplication.
//!
//! Every schema operation exists once per backend (`postgres`, `mysql`,
//! `sqlite` submodules of [`crate::db::schema`]). These macros generate the
//! match over [`DbPool`](crate::db::pool::DbPool) variants so each call site
//! stays a single line.

/// Macro for generating database dispatch match arms.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(pool, {
///     MySql(p) => do_mysql(p),
///     Postgres(p) => do_postgres(p),
///     SQLite(p) => do_sqlite(p),
/// });
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($pool:expr, { $($variant:ident($p:ident) => $body:expr),+ $(,)? }) => {
        match $pool {
            $(
                $crate::db::pool::DbPool::$variant($p) => $body,
            )+
        }
    };
}

/// Call the same-named async function in each backend module.
///
/// `dispatch_backend!(pool, fetch_columns(table))` expands to a match that
/// awaits `postgres::fetch_columns(p, table)`, `mysql::fetch_columns(p, table)`
/// or `sqlite::fetch_columns(p, table)`. The backend modules must be in scope
/// at the call site.
#[macro_export]
macro_rules! dispatch_backend {
    ($pool:expr, $func:ident($($arg:expr),* $(,)?)) => {
        $crate::impl_db_dispatch!($pool, {
            MySql(p) => mysql::$func(p, $($arg),*).await,
            Postgres(p) => postgres::$func(p, $($arg),*).await,
            SQLite(p) => sqlite::$func(p, $($arg),*).await,
        })
    };
}
