//! Scripted in-memory [`RemoteEventSource`] for tests.
#![allow(clippy::unwrap_used)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use iam_domain::{BlockRange, EventRecord};
use tokio::sync::Notify;

use crate::{error::EventSourceError, source::RemoteEventSource};

#[derive(Default)]
struct ScriptState {
    head: u64,
    events: Vec<EventRecord>,
    query_failures: VecDeque<(Option<u64>, EventSourceError)>,
    head_failures: VecDeque<EventSourceError>,
    queries: Vec<BlockRange>,
    head_calls: usize,
    stalled_queries: usize,
    gate: Option<Arc<QueryGate>>,
}

/// Holds one query open until the test releases it.
#[derive(Default)]
pub struct QueryGate {
    entered: Notify,
    release: Notify,
}

impl QueryGate {
    /// Resolves once the gated query has started.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

/// Serves a fixed event log up to a movable head, with injectable failures.
#[derive(Default)]
pub struct ScriptedEventSource {
    state: Mutex<ScriptState>,
}

impl ScriptedEventSource {
    pub fn new(head: u64) -> Self {
        let source = Self::default();
        source.state.lock().unwrap().head = head;
        source
    }

    pub fn with_events(self, events: impl IntoIterator<Item = EventRecord>) -> Self {
        self.state.lock().unwrap().events.extend(events);
        self
    }

    pub fn set_head(&self, head: u64) {
        self.state.lock().unwrap().head = head;
    }

    pub fn push_event(&self, event: EventRecord) {
        self.state.lock().unwrap().events.push(event);
    }

    /// Fail the next query, whatever range it asks for.
    pub fn fail_next_query(&self, error: EventSourceError) {
        self.state
            .lock()
            .unwrap()
            .query_failures
            .push_back((None, error));
    }

    /// Fail the next query that starts at `from_block`.
    pub fn fail_query_from(&self, from_block: u64, error: EventSourceError) {
        self.state
            .lock()
            .unwrap()
            .query_failures
            .push_back((Some(from_block), error));
    }

    /// The next `count` queries never answer.
    pub fn stall_queries(&self, count: usize) {
        self.state.lock().unwrap().stalled_queries += count;
    }

    /// Park the next query until [`QueryGate::release`] is called.
    pub fn park_next_query(&self) -> Arc<QueryGate> {
        let gate = Arc::new(QueryGate::default());
        self.state.lock().unwrap().gate = Some(Arc::clone(&gate));
        gate
    }

    pub fn fail_next_head(&self, error: EventSourceError) {
        self.state.lock().unwrap().head_failures.push_back(error);
    }

    /// Every range queried so far, failed attempts included.
    pub fn queries(&self) -> Vec<BlockRange> {
        self.state.lock().unwrap().queries.clone()
    }

    pub fn head_calls(&self) -> usize {
        self.state.lock().unwrap().head_calls
    }
}

#[async_trait]
impl RemoteEventSource for ScriptedEventSource {
    async fn latest_block_number(&self) -> Result<u64, EventSourceError> {
        let mut state = self.state.lock().unwrap();
        state.head_calls += 1;
        match state.head_failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(state.head),
        }
    }

    async fn query_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<EventRecord>, EventSourceError> {
        let (stalled, gate) = {
            let mut state = self.state.lock().unwrap();
            state.queries.push(BlockRange::new(from_block, to_block));
            let stalled = state.stalled_queries > 0;
            if stalled {
                state.stalled_queries -= 1;
            }
            (stalled, state.gate.take())
        };

        if stalled {
            std::future::pending::<()>().await;
        }
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        let mut state = self.state.lock().unwrap();

        let failure = state
            .query_failures
            .iter()
            .position(|(from, _)| from.is_none_or(|from| from == from_block));
        if let Some(position) = failure
            && let Some((_, error)) = state.query_failures.remove(position)
        {
            return Err(error);
        }

        let mut events: Vec<EventRecord> = state
            .events
            .iter()
            .filter(|event| (from_block..=to_block).contains(&event.block_number))
            .cloned()
            .collect();
        events.sort_by(EventRecord::chain_order);
        Ok(events)
    }
}
