//! Shared per-family query state.
//!
//! One [`FamilyStore`] exists per [`Family`] for the life of a [`Stores`]
//! value, and every consumer of that family reads the same state. Each
//! `begin` hands out a [`Ticket`] carrying a sequence number; a completion
//! whose ticket is older than the latest `begin` (or a `reset`) is dropped,
//! so a slow stale response cannot overwrite a newer one. Completions that
//! share the current ticket are last-write-wins.

use crate::normalizer::{Envelope, Schema};
use crate::schemas;
use std::fmt;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Programme,
    Reunion,
    Participants,
    ValueBets,
    Combinations,
    DailyBets,
}

impl Family {
    pub const ALL: [Family; 6] = [
        Family::Programme,
        Family::Reunion,
        Family::Participants,
        Family::ValueBets,
        Family::Combinations,
        Family::DailyBets,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Family::Programme => "programme",
            Family::Reunion => "reunion",
            Family::Participants => "participants",
            Family::ValueBets => "value-bets",
            Family::Combinations => "combinations",
            Family::DailyBets => "daily-bets",
        }
    }

    /// Schema whose empty envelope stands in for the result after a failure.
    pub fn schema(&self) -> Schema {
        match self {
            Family::Programme => schemas::programme(),
            Family::Reunion => schemas::reunion(),
            Family::Participants => schemas::participants(),
            Family::ValueBets => schemas::value_bets(),
            Family::Combinations => schemas::combinations(),
            Family::DailyBets => schemas::daily_top_bets(),
        }
    }

    fn index(&self) -> usize {
        match self {
            Family::Programme => 0,
            Family::Reunion => 1,
            Family::Participants => 2,
            Family::ValueBets => 3,
            Family::Combinations => 4,
            Family::DailyBets => 5,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    pub loading: bool,
    pub error: Option<String>,
    pub result: Option<Envelope>,
    sequence: u64,
}

impl QueryState {
    fn initial(sequence: u64) -> Self {
        Self {
            loading: false,
            error: None,
            result: None,
            sequence,
        }
    }

    /// Sequence number of the latest `begin` or `reset`.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Proof of a `begin`; completions must present it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct Ticket(u64);

impl Ticket {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

pub struct FamilyStore {
    family: Family,
    state: watch::Sender<QueryState>,
    empty: Envelope,
}

impl FamilyStore {
    pub fn new(family: Family) -> Self {
        let (state, _) = watch::channel(QueryState::initial(0));
        Self {
            family,
            state,
            empty: family.schema().empty(),
        }
    }

    pub fn family(&self) -> Family {
        self.family
    }

    /// Mark a request in flight. The previous result stays readable.
    pub fn begin(&self) -> Ticket {
        let mut sequence = 0;
        self.state.send_modify(|s| {
            s.sequence += 1;
            s.loading = true;
            s.error = None;
            sequence = s.sequence;
        });
        Ticket(sequence)
    }

    /// Publish a result. Returns `false` when the ticket is stale and the
    /// result was discarded.
    pub fn succeed(&self, ticket: Ticket, envelope: Envelope) -> bool {
        let applied = self.state.send_if_modified(|s| {
            if s.sequence != ticket.0 {
                return false;
            }
            s.loading = false;
            s.error = None;
            s.result = Some(envelope);
            true
        });
        if !applied {
            debug!("{}: discarded stale success #{}", self.family, ticket.0);
        }
        applied
    }

    /// Record a failure; the result becomes the family's empty envelope.
    pub fn fail(&self, ticket: Ticket, message: impl Into<String>) -> bool {
        self.fail_with(ticket, message, self.empty.clone())
    }

    /// Like `fail`, with an explicit empty envelope for families that serve
    /// more than one response shape.
    pub fn fail_with(&self, ticket: Ticket, message: impl Into<String>, empty: Envelope) -> bool {
        let message = message.into();
        let applied = self.state.send_if_modified(|s| {
            if s.sequence != ticket.0 {
                return false;
            }
            s.loading = false;
            s.error = Some(message);
            s.result = Some(empty);
            true
        });
        if !applied {
            debug!("{}: discarded stale failure #{}", self.family, ticket.0);
        }
        applied
    }

    /// Clear `loading` for an abandoned request, keeping the previous result
    /// and error. Stale tickets are ignored.
    pub fn cancel(&self, ticket: Ticket) -> bool {
        self.state.send_if_modified(|s| {
            if s.sequence != ticket.0 || !s.loading {
                return false;
            }
            s.loading = false;
            true
        })
    }

    /// `begin` wrapped in a guard that cancels the ticket if it is dropped
    /// before completing.
    pub fn start(&self) -> InFlight<'_> {
        InFlight {
            store: self,
            ticket: Some(self.begin()),
        }
    }

    /// Back to the initial state. In-flight tickets become stale.
    pub fn reset(&self) {
        self.state.send_modify(|s| {
            *s = QueryState::initial(s.sequence + 1);
        });
    }

    pub fn state(&self) -> QueryState {
        self.state.borrow().clone()
    }

    pub fn loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn result(&self) -> Option<Envelope> {
        self.state.borrow().result.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState> {
        self.state.subscribe()
    }
}

/// A request in flight for one family. Completing consumes the guard;
/// dropping it uncompleted (the caller's future was dropped) clears
/// `loading` under the same ticket.
pub struct InFlight<'a> {
    store: &'a FamilyStore,
    ticket: Option<Ticket>,
}

impl InFlight<'_> {
    pub fn sequence(&self) -> u64 {
        self.ticket.map_or(0, |t| t.0)
    }

    pub fn succeed(mut self, envelope: Envelope) -> bool {
        match self.ticket.take() {
            Some(ticket) => self.store.succeed(ticket, envelope),
            None => false,
        }
    }

    pub fn fail_with(mut self, message: impl Into<String>, empty: Envelope) -> bool {
        match self.ticket.take() {
            Some(ticket) => self.store.fail_with(ticket, message, empty),
            None => false,
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            if self.store.cancel(ticket) {
                debug!("{}: request #{} dropped before completion", self.store.family, ticket.0);
            }
        }
    }
}

/// All family stores. Build one per process (or per test) and share it.
pub struct Stores {
    families: Vec<FamilyStore>,
}

impl Stores {
    pub fn new() -> Self {
        Self {
            families: Family::ALL.iter().map(|f| FamilyStore::new(*f)).collect(),
        }
    }

    pub fn get(&self, family: Family) -> &FamilyStore {
        &self.families[family.index()]
    }

    pub fn reset_all(&self) {
        for store in &self.families {
            store.reset();
        }
    }
}

impl Default for Stores {
    fn default() -> Self {
        Self::new()
    }
}
