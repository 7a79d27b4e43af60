//! Current-selection state of one dashboard.
//!
//! Every asynchronous operation is started with a [`Ticket`] stamped with the selection
//! generation. Results are only stored when their ticket still matches, so a late answer for a
//! previously selected symbol is never shown against the new one. The in-flight request itself
//! is not cancelled.

use crate::domain::analysis::Analysis;
use crate::domain::stock::HistoryPoint;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    symbol: String,
}

impl Ticket {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionSession {
    #[serde(skip)]
    generation: u64,
    #[serde(skip)]
    history_pending: u32,
    #[serde(skip)]
    analysis_pending: u32,
    symbol: Option<String>,
    history_loading: bool,
    analysis_loading: bool,
    history: Option<Vec<HistoryPoint>>,
    analysis: Option<Analysis>,
}

impl SelectionSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    pub fn analysis(&self) -> Option<&Analysis> {
        self.analysis.as_ref()
    }

    pub fn history(&self) -> Option<&[HistoryPoint]> {
        self.history.as_deref()
    }

    pub fn is_analysis_loading(&self) -> bool {
        self.analysis_loading
    }

    pub fn is_history_loading(&self) -> bool {
        self.history_loading
    }

    /// Switches the selection and drops everything shown for the previous symbol.
    /// Re-selecting the current symbol also resets, like a fresh click would.
    pub fn select(&mut self, symbol: impl Into<String>) -> Ticket {
        let symbol = symbol.into();
        self.generation += 1;
        self.symbol = Some(symbol.clone());
        self.history = None;
        self.analysis = None;
        self.history_pending = 0;
        self.analysis_pending = 0;
        self.sync_loading_flags();
        Ticket {
            generation: self.generation,
            symbol,
        }
    }

    pub fn begin_history(&mut self) -> Option<Ticket> {
        let ticket = self.ticket_for_current()?;
        self.history_pending += 1;
        self.sync_loading_flags();
        Some(ticket)
    }

    /// Returns `false` when the result is stale and was discarded.
    pub fn finish_history(&mut self, ticket: &Ticket, points: Vec<HistoryPoint>) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(symbol = %ticket.symbol, "discarding stale history");
            return false;
        }
        self.history = Some(points);
        self.history_pending = self.history_pending.saturating_sub(1);
        self.sync_loading_flags();
        true
    }

    /// Ends a history load that produced nothing. Stale tickets are ignored.
    pub fn fail_history(&mut self, ticket: &Ticket) {
        if self.is_current(ticket) {
            self.history_pending = self.history_pending.saturating_sub(1);
            self.sync_loading_flags();
        }
    }

    pub fn begin_analysis(&mut self) -> Option<Ticket> {
        let ticket = self.ticket_for_current()?;
        self.analysis = None;
        self.analysis_pending += 1;
        self.sync_loading_flags();
        Some(ticket)
    }

    /// Returns `false` when the result is stale and was discarded.
    pub fn finish_analysis(&mut self, ticket: &Ticket, analysis: Analysis) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(symbol = %ticket.symbol, "discarding stale analysis");
            return false;
        }
        if analysis.symbol != ticket.symbol {
            tracing::warn!(
                symbol = %ticket.symbol,
                labelled = %analysis.symbol,
                "discarding analysis labelled with another symbol"
            );
            self.fail_analysis(ticket);
            return false;
        }
        self.analysis = Some(analysis);
        self.analysis_pending = self.analysis_pending.saturating_sub(1);
        self.sync_loading_flags();
        true
    }

    /// Ends an analysis that produced nothing. Stale tickets are ignored.
    pub fn fail_analysis(&mut self, ticket: &Ticket) {
        if self.is_current(ticket) {
            self.analysis_pending = self.analysis_pending.saturating_sub(1);
            self.sync_loading_flags();
        }
    }

    // Overlapping operations on one selection keep the flag up until the last one ends.
    fn sync_loading_flags(&mut self) {
        self.history_loading = self.history_pending > 0;
        self.analysis_loading = self.analysis_pending > 0;
    }

    fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.generation == self.generation
            && self.symbol.as_deref() == Some(ticket.symbol.as_str())
    }

    fn ticket_for_current(&self) -> Option<Ticket> {
        self.symbol.as_ref().map(|symbol| Ticket {
            generation: self.generation,
            symbol: symbol.clone(),
        })
    }
}
