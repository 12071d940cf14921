// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Asynchronous device queries.
//!
//! A query is idle until begun, running until finished, then pending until a
//! non-blocking poll finds its result available. At most one query of each
//! kind runs at a time.

use vigil_core::api::QueryKind;
use vigil_core::handle::{QueryId, QueryKey, Registry};
use vigil_core::{ContextId, GraphicsDevice, ObjectKind, StateError};

use crate::context::GraphicsContext;

/// The lifecycle state of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryStatus {
    /// Allocated and never begun.
    Idle,
    /// Begun and not yet finished.
    Running,
    /// Finished; the result has not been seen available yet.
    Pending,
    /// Finished with the given result.
    Available(u64),
}

#[derive(Debug)]
pub(crate) struct QueryRecord {
    kind: QueryKind,
    status: QueryStatus,
}

#[derive(Debug)]
pub(crate) struct QueryState {
    registry: Registry<QueryKey, QueryRecord>,
    running: [Option<QueryId>; QueryKind::ALL.len()],
}

impl QueryState {
    pub(crate) fn new(context: ContextId) -> Self {
        Self {
            registry: Registry::new(context, ObjectKind::Query),
            running: [None; QueryKind::ALL.len()],
        }
    }

    /// Polls a pending query and caches its result once available.
    fn poll(&mut self, device: &dyn GraphicsDevice, query: &QueryId) -> Result<QueryStatus, StateError> {
        let record = self.registry.get_mut(query)?;
        if record.status == QueryStatus::Pending && device.query_result_available(query.name())? {
            let result = device.query_result(query.name())?;
            log::trace!("Query {} resolved to {result}", query.name());
            record.status = QueryStatus::Available(result);
        }
        Ok(record.status)
    }
}

/// Asynchronous timer and occlusion queries.
///
/// Obtained from [`GraphicsContext::queries`].
pub struct Queries<'a> {
    pub(crate) ctx: &'a mut GraphicsContext,
}

impl Queries<'_> {
    /// Allocates an idle query of `kind`.
    pub fn allocate(&mut self, kind: QueryKind) -> Result<QueryId, StateError> {
        let GraphicsContext {
            device, queries, ..
        } = &mut *self.ctx;
        let name = device.gen_query()?;
        Ok(queries.registry.create(
            name,
            QueryRecord {
                kind,
                status: QueryStatus::Idle,
            },
        ))
    }

    /// Begins `query`. Beginning a finished query discards its previous result.
    /// ## Errors
    /// * `StateError::QueryAlreadyRunning` - If a query of the same kind is running.
    pub fn begin(&mut self, query: &QueryId) -> Result<(), StateError> {
        let GraphicsContext {
            device, queries, ..
        } = &mut *self.ctx;
        let kind = queries.registry.get(query)?.kind;
        if let Some(running) = queries.running[kind.index()] {
            return Err(StateError::QueryAlreadyRunning {
                kind,
                running: running.name(),
            });
        }
        device.begin_query(kind, query.name())?;
        queries.running[kind.index()] = Some(*query);
        queries.registry.get_mut(query)?.status = QueryStatus::Running;
        Ok(())
    }

    /// Finishes `query`.
    /// ## Errors
    /// * `StateError::QueryNotRunning` - If `query` is not the running query of its kind.
    pub fn finish(&mut self, query: &QueryId) -> Result<(), StateError> {
        let GraphicsContext {
            device, queries, ..
        } = &mut *self.ctx;
        let kind = queries.registry.get(query)?.kind;
        if queries.running[kind.index()] != Some(*query) {
            return Err(StateError::QueryNotRunning {
                kind,
                name: query.name(),
            });
        }
        device.end_query(kind)?;
        queries.running[kind.index()] = None;
        queries.registry.get_mut(query)?.status = QueryStatus::Pending;
        Ok(())
    }

    /// Polls whether the result of `query` is available. Never blocks.
    pub fn is_result_available(&mut self, query: &QueryId) -> Result<bool, StateError> {
        let GraphicsContext {
            device, queries, ..
        } = &mut *self.ctx;
        let status = queries.poll(device.as_ref(), query)?;
        Ok(matches!(status, QueryStatus::Available(_)))
    }

    /// Returns the result of `query`, or `None` while it is not available. Never blocks.
    pub fn result(&mut self, query: &QueryId) -> Result<Option<u64>, StateError> {
        let GraphicsContext {
            device, queries, ..
        } = &mut *self.ctx;
        match queries.poll(device.as_ref(), query)? {
            QueryStatus::Available(result) => Ok(Some(result)),
            _ => Ok(None),
        }
    }

    /// Returns the cached status of `query` without polling the device.
    pub fn status(&self, query: &QueryId) -> Result<QueryStatus, StateError> {
        Ok(self.ctx.queries.registry.get(query)?.status)
    }

    /// Returns the kind of `query`.
    pub fn kind(&self, query: &QueryId) -> Result<QueryKind, StateError> {
        Ok(self.ctx.queries.registry.get(query)?.kind)
    }

    /// Returns the running query of `kind`.
    pub fn running(&self, kind: QueryKind) -> Option<QueryId> {
        self.ctx.queries.running[kind.index()]
    }

    /// Deletes `query`, ending it first if it is running.
    pub fn delete(&mut self, query: &QueryId) -> Result<(), StateError> {
        let GraphicsContext {
            device, queries, ..
        } = &mut *self.ctx;
        let kind = queries.registry.get(query)?.kind;
        if queries.running[kind.index()] == Some(*query) {
            device.end_query(kind)?;
            queries.running[kind.index()] = None;
        }
        device.delete_query(query.name())?;
        queries.registry.mark_deleted(query)?;
        Ok(())
    }
}
