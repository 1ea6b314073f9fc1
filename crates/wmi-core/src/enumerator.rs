//! Enum - forward-only cursor over query results

use std::fmt;
use std::rc::Rc;

use crate::error::{WmiError, WmiResult};
use crate::instance::Instance;
use crate::mapper::{self, Record};
use crate::provider::Handle;
use crate::service::Connection;

/// Single-pass cursor over the objects a query or class walk produced.
///
/// Once the cursor reports end of sequence it keeps doing so. A fetch
/// failure is yielded once as `QueryExecution`, after which the cursor is
/// exhausted. Instances already handed out stay valid after the cursor is
/// closed.
pub struct Enum {
    handle: Option<Handle>,
    conn: Rc<Connection>,
    query: String,
    exhausted: bool,
}

impl Enum {
    pub(crate) fn new(conn: Rc<Connection>, handle: Handle, query: String) -> Self {
        Self {
            handle: Some(handle),
            conn,
            query,
            exhausted: false,
        }
    }

    /// Query text (or class name) this cursor walks
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Whether end of sequence was reached
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Advance and map the next row into a record.
    ///
    /// `Ok(None)` signals exhaustion.
    pub fn next_object<T: Record>(&mut self) -> WmiResult<Option<T>> {
        match self.next() {
            Some(row) => mapper::populate(&row?).map(Some),
            None => Ok(None),
        }
    }

    /// Release the cursor. Safe to call more than once.
    pub fn close(&mut self) {
        self.exhausted = true;
        if let Some(handle) = self.handle.take() {
            tracing::trace!(handle = handle.get(), query = %self.query, "releasing enumerator");
            if let Err(err) = self.conn.provider.release(handle) {
                tracing::warn!(handle = handle.get(), "failed to release enumerator: {}", err);
            }
        }
    }

    fn advance(&mut self) -> WmiResult<Option<Instance>> {
        let handle = match self.handle {
            Some(handle) if self.conn.is_open() => handle,
            _ => return Err(WmiError::HandleInvalid),
        };

        let next = self.conn.provider.next(handle).map_err(|e| {
            e.lift(|source| WmiError::QueryExecution {
                query: self.query.clone(),
                source,
            })
        })?;

        Ok(next.map(|object| Instance::from_raw(self.conn.clone(), object)))
    }
}

impl Iterator for Enum {
    type Item = WmiResult<Instance>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }

        match self.advance() {
            Ok(Some(instance)) => Some(Ok(instance)),
            Ok(None) => {
                self.exhausted = true;
                None
            }
            Err(err) => {
                tracing::debug!(query = %self.query, "enumeration failed: {}", err);
                self.exhausted = true;
                Some(Err(err))
            }
        }
    }
}

impl std::iter::FusedIterator for Enum {}

impl Drop for Enum {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Enum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Enum")
            .field("query", &self.query)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}
