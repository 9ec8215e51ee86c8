//! Card Catalog
//!
//! Card definitions as served by the persistence service's card listing.
//! Only the fields deck building needs are kept.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire value of `type` for basic creature cards.
pub const BASIC_CREATURE_TYPE: &str = "basic_pokemon";

/// Top-level card category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardCategory {
    /// Creature card.
    #[serde(rename = "pokemon")]
    Creature,
    /// Item card.
    Goods,
    /// Supporter card.
    Trainer,
}

/// One card definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDefinition {
    /// Unique card name; decks reference cards by it.
    pub name: String,
    /// Category.
    pub category: CardCategory,
    /// Creature stage, e.g. `basic_pokemon` or `stage1_pokemon`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub card_type: Option<String>,
    /// Printed HP, creatures only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hp: Option<u32>,
    /// Creature element, creatures only.
    #[serde(rename = "pokemon_type", default, skip_serializing_if = "Option::is_none")]
    pub creature_type: Option<String>,
}

impl CardDefinition {
    /// A non-creature card.
    pub fn item(name: impl Into<String>, category: CardCategory) -> Self {
        Self {
            name: name.into(),
            category,
            card_type: None,
            hp: None,
            creature_type: None,
        }
    }

    /// A basic creature card.
    pub fn basic_creature(name: impl Into<String>, hp: u32) -> Self {
        Self {
            name: name.into(),
            category: CardCategory::Creature,
            card_type: Some(BASIC_CREATURE_TYPE.to_string()),
            hp: Some(hp),
            creature_type: None,
        }
    }

    /// Whether this card can start a match as the active creature.
    pub fn is_basic_creature(&self) -> bool {
        self.category == CardCategory::Creature
            && self.card_type.as_deref() == Some(BASIC_CREATURE_TYPE)
    }
}

/// Catalog errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Listing is not a JSON array of cards.
    #[error("invalid card listing: {0}")]
    Decode(#[from] serde_json::Error),

    /// Two cards share a name.
    #[error("duplicate card name: {0}")]
    DuplicateName(String),
}

/// All cards available for deck building, in listing order.
#[derive(Clone, Debug, Default)]
pub struct CardCatalog {
    cards: Vec<CardDefinition>,
    by_name: HashMap<String, usize>,
}

impl CardCatalog {
    /// Build a catalog, rejecting duplicate names.
    pub fn new(cards: Vec<CardDefinition>) -> Result<Self, CatalogError> {
        let mut by_name = HashMap::with_capacity(cards.len());
        for (i, card) in cards.iter().enumerate() {
            if by_name.insert(card.name.clone(), i).is_some() {
                return Err(CatalogError::DuplicateName(card.name.clone()));
            }
        }
        Ok(Self { cards, by_name })
    }

    /// Parse a card listing response body.
    pub fn from_json(body: &str) -> Result<Self, CatalogError> {
        let cards: Vec<CardDefinition> = serde_json::from_str(body)?;
        Self::new(cards)
    }

    /// Look up a card by name.
    pub fn get(&self, name: &str) -> Option<&CardDefinition> {
        self.by_name.get(name).map(|&i| &self.cards[i])
    }

    /// Cards in listing order.
    pub fn iter(&self) -> impl Iterator<Item = &CardDefinition> {
        self.cards.iter()
    }

    /// Number of cards.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"[
        {"id": 1, "name": "Sprout", "category": "pokemon", "type": "basic_pokemon", "hp": 70, "pokemon_type": "grass"},
        {"id": 2, "name": "Bloom", "category": "pokemon", "type": "stage1_pokemon", "hp": 120, "pokemon_type": "grass"},
        {"id": 3, "name": "Potion", "category": "goods"},
        {"id": 4, "name": "Professor", "category": "trainer"}
    ]"#;

    #[test]
    fn test_listing_decode() {
        let catalog = CardCatalog::from_json(LISTING).unwrap();
        assert_eq!(catalog.len(), 4);

        let sprout = catalog.get("Sprout").unwrap();
        assert!(sprout.is_basic_creature());
        assert_eq!(sprout.hp, Some(70));
        assert_eq!(sprout.creature_type.as_deref(), Some("grass"));

        assert!(!catalog.get("Bloom").unwrap().is_basic_creature());
        assert!(!catalog.get("Potion").unwrap().is_basic_creature());
        assert_eq!(catalog.get("Professor").unwrap().category, CardCategory::Trainer);
        assert!(catalog.get("Missing").is_none());
    }

    #[test]
    fn test_listing_order_kept() {
        let catalog = CardCatalog::from_json(LISTING).unwrap();
        let names: Vec<_> = catalog.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Sprout", "Bloom", "Potion", "Professor"]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = CardCatalog::new(vec![
            CardDefinition::item("Potion", CardCategory::Goods),
            CardDefinition::item("Potion", CardCategory::Goods),
        ]);
        assert!(matches!(result, Err(CatalogError::DuplicateName(name)) if name == "Potion"));
    }

    #[test]
    fn test_bad_listing() {
        assert!(matches!(CardCatalog::from_json("{}"), Err(CatalogError::Decode(_))));
        assert!(CardCatalog::from_json(r#"[{"name": "X", "category": "spell"}]"#).is_err());
    }
}
