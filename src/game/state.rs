//! Match State Mirror
//!
//! Client-side copy of the authoritative match state. Every `state_update`
//! replaces the mirror wholesale; nothing here merges, diffs or derives
//! game outcomes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::game::energy::EnergyType;

// =============================================================================
// SNAPSHOT TYPES
// =============================================================================

/// One creature in play (active slot or bench).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creature {
    /// Card name.
    pub name: String,
    /// Remaining health.
    #[serde(rename = "hp")]
    pub current_health: u32,
    /// Printed health.
    #[serde(rename = "max_hp")]
    pub max_health: u32,
    /// Attached energies, in attachment order.
    #[serde(rename = "energies", default)]
    pub attached_energies: Vec<EnergyType>,
}

impl Creature {
    /// Whether `current_health <= max_health` holds.
    #[inline]
    pub fn is_consistent(&self) -> bool {
        self.current_health <= self.max_health
    }

    /// Damage taken so far.
    #[inline]
    pub fn damage(&self) -> u32 {
        self.max_health.saturating_sub(self.current_health)
    }

    /// Count attached energies of one type.
    pub fn energy_count(&self, energy: EnergyType) -> usize {
        self.attached_energies.iter().filter(|e| **e == energy).count()
    }
}

/// One side of the table as seen by this client.
///
/// Hand and deck are counts only; the opponent's cards are never revealed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    /// Display name (the server currently uses the session identity).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Cards in hand.
    pub hand_size: u32,
    /// Cards left in deck.
    pub deck_size: u32,
    /// Active creature, if any.
    #[serde(rename = "active_pokemon", default)]
    pub active_creature: Option<Creature>,
    /// Bench, in slot order.
    #[serde(default)]
    pub bench: Vec<Creature>,
}

impl PlayerView {
    /// Active creature followed by the bench.
    pub fn creatures(&self) -> impl Iterator<Item = &Creature> {
        self.active_creature.iter().chain(self.bench.iter())
    }
}

/// Full match snapshot, exactly as sent by the server.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchState {
    /// Game identifier, when the server includes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
    /// Turn counter.
    #[serde(rename = "turn")]
    pub turn_number: u32,
    /// Whose turn it is.
    pub active_player: String,
    /// This client's side.
    #[serde(rename = "your_info")]
    pub self_view: PlayerView,
    /// The opponent's side.
    #[serde(rename = "opponent_info")]
    pub opponent_view: PlayerView,
}

impl MatchState {
    /// First creature whose health exceeds its maximum, if any.
    pub fn first_inconsistent_creature(&self) -> Option<&Creature> {
        self.self_view
            .creatures()
            .chain(self.opponent_view.creatures())
            .find(|c| !c.is_consistent())
    }

    /// Whether `player` (a session identity or display name) is to act.
    pub fn is_turn_of(&self, player: &str) -> bool {
        self.active_player == player
    }
}

// =============================================================================
// GAME STATE MODEL
// =============================================================================

/// Shared snapshot handed to observers.
pub type Snapshot = Option<Arc<MatchState>>;

/// Owner of the current snapshot.
///
/// Observers subscribe with [`GameStateModel::subscribe`] and are woken on
/// every [`GameStateModel::apply`], even when the new snapshot equals the old.
#[derive(Debug)]
pub struct GameStateModel {
    current: watch::Sender<Snapshot>,
}

impl GameStateModel {
    /// Create an empty model.
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self { current }
    }

    /// Replace the current snapshot and notify observers.
    pub fn apply(&mut self, update: MatchState) -> Arc<MatchState> {
        let previous_turn = self.current.borrow().as_ref().map(|s| s.turn_number);
        if let Some(previous) = previous_turn {
            if update.turn_number < previous {
                warn!(
                    "Server moved turn backwards ({} -> {}), mirroring anyway",
                    previous, update.turn_number
                );
            }
        }

        if let Some(creature) = update.first_inconsistent_creature() {
            warn!(
                "Creature {} has {} hp, above its maximum of {}, mirroring anyway",
                creature.name, creature.current_health, creature.max_health
            );
        }

        debug!("Applying snapshot for turn {}", update.turn_number);
        let snapshot = Arc::new(update);
        self.current.send_replace(Some(Arc::clone(&snapshot)));
        snapshot
    }

    /// Last applied snapshot, or `None` before the first update.
    pub fn current(&self) -> Snapshot {
        self.current.borrow().clone()
    }

    /// Drop the snapshot (match over or connection closed).
    pub fn clear(&mut self) {
        if self.current.borrow().is_some() {
            debug!("Discarding match state");
        }
        self.current.send_replace(None);
    }

    /// Observe snapshot replacements.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.current.subscribe()
    }
}

impl Default for GameStateModel {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn creature(name: &str, hp: u32, max_hp: u32) -> Creature {
        Creature {
            name: name.to_string(),
            current_health: hp,
            max_health: max_hp,
            attached_energies: vec![],
        }
    }

    fn snapshot(turn: u32, active: &str, opponent_hand: u32) -> MatchState {
        MatchState {
            game_id: None,
            turn_number: turn,
            active_player: active.to_string(),
            self_view: PlayerView {
                hand_size: 5,
                deck_size: 14,
                active_creature: Some(creature("Pikachu", 60, 60)),
                ..Default::default()
            },
            opponent_view: PlayerView {
                hand_size: opponent_hand,
                deck_size: 13,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_decode_server_shape() {
        let json = r#"{
            "game_id": "g-1",
            "turn": 3,
            "active_player": "client_a",
            "your_info": {
                "name": "client_a",
                "hand_size": 4,
                "deck_size": 12,
                "active_pokemon": {"name": "Pikachu", "hp": 40, "max_hp": 60, "energies": ["LIGHTNING", "LIGHTNING"]},
                "bench": [{"name": "Mew", "hp": 70, "max_hp": 70, "energies": []}]
            },
            "opponent_info": {
                "name": "client_b",
                "hand_size": 6,
                "deck_size": 11,
                "active_pokemon": null,
                "bench": []
            }
        }"#;

        let state: MatchState = serde_json::from_str(json).unwrap();
        assert_eq!(state.turn_number, 3);
        assert!(state.is_turn_of("client_a"));

        let active = state.self_view.active_creature.as_ref().unwrap();
        assert_eq!(active.damage(), 20);
        assert_eq!(active.energy_count(EnergyType::Lightning), 2);
        assert_eq!(state.self_view.creatures().count(), 2);
        assert!(state.opponent_view.active_creature.is_none());
        assert!(state.first_inconsistent_creature().is_none());
    }

    #[test]
    fn test_inconsistent_creature_detected() {
        let mut state = snapshot(1, "a", 5);
        state.opponent_view.bench.push(creature("Broken", 90, 50));
        assert_eq!(state.first_inconsistent_creature().unwrap().name, "Broken");
    }

    #[test]
    fn test_apply_keeps_health_above_maximum() {
        let mut model = GameStateModel::new();
        let mut healed = snapshot(4, "a", 5);
        healed.self_view.active_creature = Some(creature("Sprout", 110, 70));

        model.apply(healed.clone());

        let current = model.current().unwrap();
        assert_eq!(*current, healed);
        assert_eq!(current.self_view.active_creature.as_ref().unwrap().current_health, 110);
    }

    #[test]
    fn test_current_is_none_before_first_update() {
        let model = GameStateModel::new();
        assert!(model.current().is_none());
    }

    #[test]
    fn test_apply_replaces_wholesale() {
        let mut model = GameStateModel::new();
        let updates = [snapshot(1, "a", 7), snapshot(1, "b", 6), snapshot(2, "a", 3)];

        for update in updates {
            model.apply(update.clone());
            assert_eq!(*model.current().unwrap(), update);
        }
    }

    #[test]
    fn test_apply_drops_fields_missing_from_new_snapshot() {
        let mut model = GameStateModel::new();
        let mut first = snapshot(1, "a", 5);
        first.opponent_view.bench.push(creature("Mew", 70, 70));
        model.apply(first);

        let second = snapshot(2, "b", 5);
        model.apply(second.clone());

        let current = model.current().unwrap();
        assert!(current.opponent_view.bench.is_empty());
        assert_eq!(*current, second);
    }

    #[test]
    fn test_observers_notified_on_every_apply() {
        let mut model = GameStateModel::new();
        let mut observer = model.subscribe();

        model.apply(snapshot(1, "a", 5));
        assert!(observer.has_changed().unwrap());
        observer.borrow_and_update();

        // Identical snapshot still counts as a redraw.
        model.apply(snapshot(1, "a", 5));
        assert!(observer.has_changed().unwrap());
        assert_eq!(observer.borrow_and_update().as_ref().unwrap().turn_number, 1);
    }

    #[test]
    fn test_clear() {
        let mut model = GameStateModel::new();
        model.apply(snapshot(4, "a", 2));
        model.clear();
        assert!(model.current().is_none());
    }
}
