//! Deck Validation
//!
//! Size and copy caps are enforced on every `add`; the remaining rules
//! (exact size, a basic creature, an energy type) are only checked at
//! submission so a half-built draft is always representable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::catalog::CardDefinition;
use crate::game::energy::EnergyType;

/// Cards in a complete deck.
pub const MAX_DECK_SIZE: usize = 20;

/// Copies allowed of any one card.
pub const MAX_SAME_CARD: usize = 2;

/// Reason reported when no basic creature is present.
pub const REASON_NO_BASIC: &str = "needs at least one basic creature";

/// Reason reported when the draft is not exactly [`MAX_DECK_SIZE`] cards.
pub const REASON_WRONG_SIZE: &str = "needs 20 cards";

/// Reason reported when no energy type was chosen.
pub const REASON_NO_ENERGY: &str = "choose an energy type";

/// Rejected `add`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    /// Card already at [`MAX_SAME_CARD`] copies.
    #[error("at most 2 copies of {name} are allowed")]
    TooManyCopies {
        /// Card name.
        name: String,
    },

    /// Draft already holds [`MAX_DECK_SIZE`] cards.
    #[error("a deck holds at most 20 cards")]
    DeckFull,
}

/// Rejected submission, with every failing rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("deck is not ready: {}", .reasons.join(", "))]
pub struct ValidationError {
    /// Human-readable reasons, in check order.
    pub reasons: Vec<String>,
}

/// Outcome of [`DeckDraft::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// True when nothing failed.
    pub ok: bool,
    /// Failing rules, in check order.
    pub reasons: Vec<String>,
}

/// Deck body handed to the persistence service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckPayload {
    /// Card names in draft order.
    pub cards: Vec<String>,
    /// Chosen energy type.
    pub energy: EnergyType,
}

/// A deck under construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeckDraft {
    cards: Vec<CardDefinition>,
}

impl DeckDraft {
    /// Empty draft.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies of `name` in the draft.
    pub fn count(&self, name: &str) -> usize {
        self.cards.iter().filter(|c| c.name == name).count()
    }

    /// Total cards.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether the draft is empty.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Whether the draft is at [`MAX_DECK_SIZE`].
    pub fn is_full(&self) -> bool {
        self.cards.len() >= MAX_DECK_SIZE
    }

    /// Card names in insertion order.
    pub fn card_names(&self) -> Vec<String> {
        self.cards.iter().map(|c| c.name.clone()).collect()
    }

    /// Name → copies, for display.
    pub fn groups(&self) -> BTreeMap<&str, usize> {
        let mut groups = BTreeMap::new();
        for card in &self.cards {
            *groups.entry(card.name.as_str()).or_insert(0) += 1;
        }
        groups
    }

    /// Whether `card` may be added without breaking a cap.
    pub fn can_add(&self, card: &CardDefinition) -> bool {
        self.check_add(card).is_ok()
    }

    fn check_add(&self, card: &CardDefinition) -> Result<(), DraftError> {
        if self.count(&card.name) >= MAX_SAME_CARD {
            return Err(DraftError::TooManyCopies {
                name: card.name.clone(),
            });
        }
        if self.is_full() {
            return Err(DraftError::DeckFull);
        }
        Ok(())
    }

    /// Add one copy of `card`.
    pub fn add(&mut self, card: &CardDefinition) -> Result<(), DraftError> {
        self.check_add(card)?;
        self.cards.push(card.clone());
        debug!("Added {} ({}/{})", card.name, self.cards.len(), MAX_DECK_SIZE);
        Ok(())
    }

    /// Remove the most recently added copy of `name`.
    pub fn remove(&mut self, name: &str) -> Option<CardDefinition> {
        let index = self.cards.iter().rposition(|c| c.name == name)?;
        Some(self.cards.remove(index))
    }

    /// Check the submission rules without consuming the draft.
    pub fn validate(&self, energy: Option<EnergyType>) -> ValidationReport {
        let mut reasons = Vec::new();

        if !self.cards.iter().any(CardDefinition::is_basic_creature) {
            reasons.push(REASON_NO_BASIC.to_string());
        }
        if self.cards.len() != MAX_DECK_SIZE {
            reasons.push(REASON_WRONG_SIZE.to_string());
        }
        if energy.is_none() {
            reasons.push(REASON_NO_ENERGY.to_string());
        }

        ValidationReport {
            ok: reasons.is_empty(),
            reasons,
        }
    }

    /// Produce the persistence payload, or every reason it cannot be built.
    pub fn submit(&self, energy: Option<EnergyType>) -> Result<DeckPayload, ValidationError> {
        let report = self.validate(energy);
        match energy {
            Some(energy) if report.ok => {
                info!("Deck ready: {} cards, {} energy", self.cards.len(), energy);
                Ok(DeckPayload {
                    cards: self.card_names(),
                    energy,
                })
            }
            _ => Err(ValidationError {
                reasons: report.reasons,
            }),
        }
    }
}
