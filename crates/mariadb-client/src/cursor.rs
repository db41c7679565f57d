//! Lazy, forward-only access to a pending result set.

use std::io::{Read, Write};
use std::sync::Arc;

use mariadb_core::{ColumnInfo, Result, Row, Value};

use crate::session::Session;
use crate::types::ColumnDef;

/// Identifies the result a cursor was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CursorKey {
    pub(crate) session_id: u64,
    pub(crate) connection_id: u32,
    pub(crate) serial: u64,
}

/// Lifecycle of a [`ResultCursor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Rows may still be fetched
    Open,
    /// End of results was reached (or the server aborted the stream)
    Consumed,
    /// Remaining rows were skipped with [`Session::discard`]
    Discarded,
    /// The session closed or lost its connection while the cursor was open
    Invalidated,
}

impl CursorState {
    pub const fn name(self) -> &'static str {
        match self {
            CursorState::Open => "open",
            CursorState::Consumed => "consumed",
            CursorState::Discarded => "discarded",
            CursorState::Invalidated => "invalidated",
        }
    }
}

/// Handle over the rows of one query result.
///
/// The cursor owns the column metadata; rows are pulled from the session one
/// at a time with [`ResultCursor::next`] or [`Session::fetch_next`]. A
/// cursor cannot be rewound, and once it leaves [`CursorState::Open`] every
/// further fetch is a state error.
#[derive(Debug)]
pub struct ResultCursor {
    key: CursorKey,
    columns: Vec<ColumnDef>,
    info: Arc<ColumnInfo>,
    position: u64,
    state: CursorState,
}

impl ResultCursor {
    pub(crate) fn new(key: CursorKey, columns: Vec<ColumnDef>) -> Self {
        let info = Arc::new(ColumnInfo::new(
            columns.iter().map(|c| c.name.clone()).collect(),
        ));
        Self {
            key,
            columns,
            info,
            position: 0,
            state: CursorState::Open,
        }
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Column names shared with every row this cursor yields.
    pub fn column_info(&self) -> Arc<ColumnInfo> {
        Arc::clone(&self.info)
    }

    /// Number of rows fetched so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == CursorState::Open
    }

    pub fn is_consumed(&self) -> bool {
        self.state == CursorState::Consumed
    }

    /// Fetch the next row; `Ok(None)` marks the end of the result.
    #[allow(clippy::should_implement_trait)]
    pub fn next<S: Read + Write>(&mut self, session: &mut Session<S>) -> Result<Option<Row>> {
        session.fetch_next(self)
    }

    /// Iterate over the remaining rows.
    ///
    /// The iterator stops after the first error.
    pub fn rows<'a, S: Read + Write>(&'a mut self, session: &'a mut Session<S>) -> Rows<'a, S> {
        Rows {
            cursor: self,
            session,
            done: false,
        }
    }

    pub(crate) fn key(&self) -> CursorKey {
        self.key
    }

    pub(crate) fn set_state(&mut self, state: CursorState) {
        self.state = state;
    }

    pub(crate) fn make_row(&mut self, values: Vec<Value>) -> Row {
        self.position += 1;
        Row::with_columns(Arc::clone(&self.info), values)
    }
}

/// Borrowing iterator returned by [`ResultCursor::rows`].
pub struct Rows<'a, S> {
    cursor: &'a mut ResultCursor,
    session: &'a mut Session<S>,
    done: bool,
}

impl<S: Read + Write> Iterator for Rows<'_, S> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.session.fetch_next(self.cursor) {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
