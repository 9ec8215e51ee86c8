//! # Pocket Duel Client
//!
//! Session protocol client and state mirror for Pocket Duel, a turn-based
//! two-player card game played against an authoritative server over a
//! WebSocket.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    POCKET DUEL CLIENT                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  identity.rs     - Session identity generation + storage     │
//! │  config.rs       - Client configuration                      │
//! │                                                              │
//! │  network/        - Transport and protocol                    │
//! │  ├── protocol.rs - Envelope kinds, decode/encode             │
//! │  ├── connection.rs - WebSocket connection + lifecycle        │
//! │  └── session.rs  - Session object, single dispatch path      │
//! │                                                              │
//! │  game/           - Authoritative-state mirror                │
//! │  ├── state.rs    - MatchState snapshots                      │
//! │  ├── action.rs   - Pending action correlation                │
//! │  └── energy.rs   - Energy type tags                          │
//! │                                                              │
//! │  deck/           - Deck construction (no connection needed)  │
//! │  ├── catalog.rs  - Card definitions                          │
//! │  ├── validator.rs- Draft rules and submission                │
//! │  └── api.rs      - Persistence service shapes                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Mirror Guarantee
//!
//! The client never computes game outcomes. Match state is replaced
//! wholesale by every `state_update` frame and player choices are only
//! forwarded as indices into the server's own prompt.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod deck;
pub mod game;
pub mod identity;
pub mod network;

// Re-export commonly used types
pub use config::ClientConfig;
pub use deck::validator::{DeckDraft, DeckPayload, ValidationReport, MAX_DECK_SIZE, MAX_SAME_CARD};
pub use game::action::{ActionCorrelator, PendingAction};
pub use game::energy::EnergyType;
pub use game::state::{Creature, GameStateModel, MatchState, PlayerView};
pub use identity::{IdentityStore, SessionIdentity};
pub use network::protocol::{ClientMessage, MessageKind, ServerMessage};
pub use network::session::{Session, SessionError, SessionEvent};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
