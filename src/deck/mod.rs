//! Deck Building
//!
//! Card catalog, draft validation and the persistence service calls that
//! store decks. None of it touches the game connection.
//!
//! ## Module Structure
//!
//! - `catalog`: Card definitions from the card listing
//! - `validator`: Draft caps and submission rules
//! - `api`: Persistence service request and record shapes

pub mod api;
pub mod catalog;
pub mod validator;

pub use api::{DeckRecord, DeckRequest, Method};
pub use catalog::{CardCatalog, CardCategory, CardDefinition, CatalogError};
pub use validator::{
    DeckDraft, DeckPayload, DraftError, ValidationError, ValidationReport, MAX_DECK_SIZE,
    MAX_SAME_CARD,
};
