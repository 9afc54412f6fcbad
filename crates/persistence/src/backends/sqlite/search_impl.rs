//! Search implementation for the SQLite backend.
//!
//! Search SQL runs on a blocking worker that owns a pooled connection. The
//! async side keeps the connection's interrupt handle: if the caller drops
//! the search future, or the configured timeout elapses, SQLite is
//! interrupted and the worker gives the connection back. The handle is
//! withdrawn before the connection re-enters the pool. The count and the
//! page are read inside one transaction so `total` always describes the
//! snapshot the page came from.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, ErrorCode, InterruptHandle};
use tracing::{debug, warn};

use crate::core::{SearchProvider, SearchResult};
use crate::error::{BackendError, SearchError, StorageError, StorageResult};
use crate::search::resolve_filters;
use crate::types::SearchQuery;

use super::SqliteBackend;
use super::search::{QueryBuilder, SqlFragment};
use super::storage::RecordRow;

/// Interrupt handle of a connection lent to a blocking worker.
type HandleSlot = Arc<Mutex<Option<InterruptHandle>>>;

/// A pooled connection lent to a blocking worker.
///
/// The interrupt handle is withdrawn before the connection returns to the
/// pool, so a late interrupt cannot reach whoever checks it out next.
struct LentConnection {
    conn: PooledConnection<SqliteConnectionManager>,
    cancelled: Arc<AtomicBool>,
    slot: HandleSlot,
}

impl Drop for LentConnection {
    fn drop(&mut self) {
        self.slot.lock().take();
    }
}

/// Interrupts the running statement unless disarmed before drop.
struct InterruptGuard {
    slot: HandleSlot,
    cancelled: Arc<AtomicBool>,
    armed: bool,
}

impl InterruptGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.cancelled.store(true, Ordering::SeqCst);
        // Held across the interrupt: the worker cannot release the connection meanwhile.
        if let Some(handle) = self.slot.lock().as_ref() {
            handle.interrupt();
            warn!("Search abandoned; interrupting SQLite");
        }
    }
}

/// Maps an interrupted statement to `Cancelled`.
fn sql_error(err: rusqlite::Error) -> StorageError {
    if err.sqlite_error_code() == Some(ErrorCode::OperationInterrupted) {
        StorageError::Search(SearchError::Cancelled)
    } else {
        err.into()
    }
}

fn check_cancelled(cancelled: &AtomicBool) -> StorageResult<()> {
    if cancelled.load(Ordering::SeqCst) {
        return Err(StorageError::Search(SearchError::Cancelled));
    }
    Ok(())
}

fn query_count(conn: &Connection, fragment: &SqlFragment) -> StorageResult<u64> {
    let count: i64 = conn
        .query_row(&fragment.sql, fragment.bind().as_slice(), |row| row.get(0))
        .map_err(sql_error)?;
    Ok(count as u64)
}

impl SqliteBackend {
    fn lend_connection(&self) -> StorageResult<(LentConnection, InterruptGuard)> {
        let conn = self.get_connection()?;
        let cancelled = Arc::new(AtomicBool::new(false));
        let slot: HandleSlot = Arc::new(Mutex::new(Some(conn.get_interrupt_handle())));

        let guard = InterruptGuard {
            slot: Arc::clone(&slot),
            cancelled: Arc::clone(&cancelled),
            armed: true,
        };
        Ok((LentConnection { conn, cancelled, slot }, guard))
    }

    /// Runs `work` on a blocking worker, interrupting it on drop or timeout.
    ///
    /// `work` receives a flag that is raised once the caller has given up;
    /// it should check the flag between statements.
    pub(crate) async fn run_interruptible<T, F>(&self, work: F) -> StorageResult<T>
    where
        F: FnOnce(&mut Connection, &AtomicBool) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let (mut lent, guard) = self.lend_connection()?;
        let task = tokio::task::spawn_blocking(move || {
            let result = work(&mut lent.conn, &lent.cancelled);
            drop(lent);
            result
        });

        let timeout_ms = self.config().search_timeout_ms;
        match tokio::time::timeout(Duration::from_millis(timeout_ms), task).await {
            Ok(Ok(result)) => {
                guard.disarm();
                result
            }
            Ok(Err(join_error)) => {
                guard.disarm();
                Err(StorageError::Backend(BackendError::Internal {
                    backend_name: "sqlite".to_string(),
                    message: format!("search worker failed: {}", join_error),
                    source: None,
                }))
            }
            Err(_) => {
                drop(guard);
                warn!(timeout_ms, "Search timed out");
                Err(StorageError::Search(SearchError::Timeout { timeout_ms }))
            }
        }
    }
}

#[async_trait]
impl SearchProvider for SqliteBackend {
    async fn search(&self, query: &SearchQuery) -> StorageResult<SearchResult> {
        query.validate()?;
        let filters = resolve_filters(query)?;

        let resource_type = query.resource_type;
        let builder = QueryBuilder::new(resource_type);
        let count_sql = builder.count_query(&filters);
        let page_sql = builder.page_query(&filters, query.page_size, query.offset);

        let result = self
            .run_interruptible(move |conn, cancelled| {
                let tx = conn.transaction().map_err(sql_error)?;

                check_cancelled(cancelled)?;
                let total = query_count(&tx, &count_sql)?;

                check_cancelled(cancelled)?;
                let rows = {
                    let mut stmt = tx.prepare(&page_sql.sql).map_err(sql_error)?;
                    stmt.query_map(page_sql.bind().as_slice(), RecordRow::from_row)
                        .map_err(sql_error)?
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(sql_error)?
                };
                tx.commit().map_err(sql_error)?;

                let resources = rows
                    .into_iter()
                    .map(|row| row.into_resource(resource_type))
                    .collect::<StorageResult<Vec<_>>>()?;
                Ok(SearchResult::new(resources, total))
            })
            .await?;

        debug!(
            resource_type = %query.resource_type,
            filters = query.filters.len(),
            total = result.total,
            returned = result.resources.len(),
            "Search completed"
        );
        Ok(result)
    }

    async fn search_count(&self, query: &SearchQuery) -> StorageResult<u64> {
        query.validate()?;
        let filters = resolve_filters(query)?;
        let count_sql = QueryBuilder::new(query.resource_type).count_query(&filters);

        self.run_interruptible(move |conn, cancelled| {
            check_cancelled(cancelled)?;
            query_count(conn, &count_sql)
        })
        .await
    }
}
