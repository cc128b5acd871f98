//! Stream Cursor
//!
//! Lazy, paginated enumeration over the engine cursor.

use std::collections::VecDeque;
use std::iter::FusedIterator;
use std::sync::Arc;

use tracing::debug;

use super::query::{build_query, Projected, Query, ReturnShape};
use super::CacheHandle;
use crate::engine::{Engine, MatchSpec, Row};
use crate::error::{CacheError, QueryError, Result};

/// Rows fetched per engine call unless the caller overrides it.
pub const DEFAULT_PAGE_SIZE: usize = 20;

// == Stream Options ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    /// Rows per batch, must be positive
    pub page_size: usize,
    /// Reshapes each result; None keeps a caller projection as raw rows
    pub return_shape: Option<ReturnShape>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            return_shape: None,
        }
    }
}

impl StreamOptions {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_shape(mut self, shape: ReturnShape) -> Self {
        self.return_shape = Some(shape);
        self
    }
}

#[derive(Debug)]
struct Plan {
    engine: Arc<Engine>,
    spec: MatchSpec,
    shape: Option<ReturnShape>,
    page_size: usize,
}

// == Query Stream ==
/// A restartable stream of query results.
///
/// Nothing runs until it is iterated; every iteration opens a fresh cursor.
#[derive(Debug, Clone)]
pub struct QueryStream {
    plan: Arc<Plan>,
}

impl QueryStream {
    /// Opens a new cursor from the first key.
    pub fn iter(&self) -> StreamCursor {
        StreamCursor {
            plan: self.plan.clone(),
            buffer: VecDeque::new(),
            position: Position::Start,
        }
    }

    pub fn spec(&self) -> &MatchSpec {
        &self.plan.spec
    }
}

impl IntoIterator for QueryStream {
    type Item = Result<Projected>;
    type IntoIter = StreamCursor;

    fn into_iter(self) -> StreamCursor {
        self.iter()
    }
}

impl IntoIterator for &QueryStream {
    type Item = Result<Projected>;
    type IntoIter = StreamCursor;

    fn into_iter(self) -> StreamCursor {
        self.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Position {
    Start,
    After(String),
    Done,
}

// == Stream Cursor ==
/// Single pass over a [`QueryStream`], fetching one page at a time.
///
/// Engine failures come out as one `QueryError` item, after which the
/// cursor is exhausted. Dropping it early releases nothing on the engine
/// side since the engine keeps no cursor state.
#[derive(Debug)]
pub struct StreamCursor {
    plan: Arc<Plan>,
    buffer: VecDeque<Row>,
    position: Position,
}

impl StreamCursor {
    fn fetch(&mut self) -> Result<()> {
        let after = match &self.position {
            Position::Start => None,
            Position::After(key) => Some(key.as_str()),
            Position::Done => return Ok(()),
        };

        let page = self
            .plan
            .engine
            .select_page(&self.plan.spec, after, self.plan.page_size)
            .map_err(|err| QueryError::rejected("stream", &self.plan.spec, err.to_string()))?;

        debug!(
            "Fetched page of {} rows, more={}",
            page.rows.len(),
            page.continuation.is_some()
        );
        self.buffer.extend(page.rows);
        self.position = match page.continuation {
            Some(key) => Position::After(key),
            None => Position::Done,
        };
        Ok(())
    }
}

impl Iterator for StreamCursor {
    type Item = Result<Projected>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.buffer.pop_front() {
                let item = Projected::from_row(self.plan.shape, row).map_err(|message| {
                    CacheError::from(QueryError::rejected("stream", &self.plan.spec, message))
                });
                if item.is_err() {
                    self.buffer.clear();
                    self.position = Position::Done;
                }
                return Some(item);
            }
            if self.position == Position::Done {
                return None;
            }
            if let Err(err) = self.fetch() {
                self.position = Position::Done;
                return Some(Err(err));
            }
        }
    }
}

impl FusedIterator for StreamCursor {}

impl CacheHandle {
    // == Stream ==
    /// Builds a lazy stream over the results of `query`.
    ///
    /// Only the page size is checked here; predicate errors surface while
    /// iterating, as a `QueryError` item.
    pub fn stream(&self, query: &Query, opts: &StreamOptions) -> Result<QueryStream> {
        let translated = build_query(query, opts.return_shape);
        if opts.page_size == 0 {
            return Err(QueryError::rejected("stream", query, "page_size must be positive").into());
        }

        Ok(QueryStream {
            plan: Arc::new(Plan {
                engine: self.engine.clone(),
                spec: translated.spec,
                shape: translated.shape,
                page_size: opts.page_size,
            }),
        })
    }
}
