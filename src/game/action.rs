//! Action Correlation
//!
//! The server asks for decisions with `action_request` frames carrying an
//! index → description map. At most one prompt is outstanding; a newer
//! request silently replaces an unanswered one. Responses are checked
//! against the current prompt before anything reaches the wire.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::network::connection::TransportError;
use crate::network::protocol::ClientMessage;

/// Selection index → human-readable description, in index order.
pub type Selections = BTreeMap<u32, String>;

/// The single outstanding prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingAction {
    /// Sequence number of the request within this correlator.
    pub prompt_id: u64,
    selections: Selections,
}

impl PendingAction {
    /// Offered choices.
    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    /// Whether `index` is one of the offered choices.
    #[inline]
    pub fn offers(&self, index: u32) -> bool {
        self.selections.contains_key(&index)
    }

    /// Description of a choice.
    pub fn describe(&self, index: u32) -> Option<&str> {
        self.selections.get(&index).map(String::as_str)
    }
}

/// A response that does not match the current prompt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StaleActionError {
    /// No prompt is outstanding (never requested, already answered, or the match ended).
    #[error("no action is pending")]
    NoPendingAction,
    /// The index is not offered by the current prompt.
    #[error("selection {index} is not offered by the pending action")]
    UnknownSelection {
        /// Rejected index.
        index: u32,
    },
}

/// Failure of [`ActionCorrelator::respond`].
#[derive(Debug, Clone, Error)]
pub enum RespondError {
    /// Rejected locally; nothing was sent.
    #[error(transparent)]
    Stale(#[from] StaleActionError),
    /// Accepted, but the frame could not be queued.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Outbound path for client frames.
pub trait FrameSink {
    /// Queue a frame for sending.
    fn send(&self, message: &ClientMessage) -> Result<(), TransportError>;
}

/// Tracks the outstanding prompt for one match.
#[derive(Debug, Default)]
pub struct ActionCorrelator {
    pending: Option<PendingAction>,
    requests_seen: u64,
}

impl ActionCorrelator {
    /// Create an idle correlator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new prompt, replacing any unanswered one.
    pub fn on_request(&mut self, selections: Selections) -> &PendingAction {
        self.requests_seen += 1;
        if let Some(previous) = self.pending.take() {
            debug!(
                "Prompt {} superseded by prompt {} before an answer",
                previous.prompt_id, self.requests_seen
            );
        }
        if selections.is_empty() {
            warn!("Prompt {} offers no selections", self.requests_seen);
        }

        self.pending.insert(PendingAction {
            prompt_id: self.requests_seen,
            selections,
        })
    }

    /// Answer the current prompt with `index`.
    ///
    /// On success the prompt is consumed and an `action_response` is queued
    /// on `sink`. The prompt is consumed even if queuing fails.
    pub fn respond(&mut self, index: u32, sink: &impl FrameSink) -> Result<(), RespondError> {
        let pending = self
            .pending
            .as_ref()
            .ok_or(StaleActionError::NoPendingAction)?;

        if !pending.offers(index) {
            warn!(
                "Rejecting selection {} for prompt {}: not offered",
                index, pending.prompt_id
            );
            return Err(StaleActionError::UnknownSelection { index }.into());
        }

        info!(
            "Answering prompt {} with {} ({})",
            pending.prompt_id,
            index,
            pending.describe(index).unwrap_or_default()
        );
        self.pending = None;
        sink.send(&ClientMessage::ActionResponse {
            selected_index: index,
        })?;
        Ok(())
    }

    /// Current prompt, if any.
    pub fn pending(&self) -> Option<&PendingAction> {
        self.pending.as_ref()
    }

    /// Drop the current prompt without answering it.
    pub fn discard(&mut self) -> Option<PendingAction> {
        let dropped = self.pending.take();
        if let Some(action) = &dropped {
            debug!("Discarding unanswered prompt {}", action.prompt_id);
        }
        dropped
    }
}
