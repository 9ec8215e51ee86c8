//! Energy Types
//!
//! Energy tags appear in two places: attached to creatures in state
//! snapshots (upper-case on the wire) and as the chosen energy of a deck
//! (lower-case). Both spellings decode to the same variant.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Energy type tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyType {
    /// Grass
    #[serde(alias = "GRASS")]
    Grass,
    /// Fire
    #[serde(alias = "FIRE")]
    Fire,
    /// Water
    #[serde(alias = "WATER")]
    Water,
    /// Lightning
    #[serde(alias = "LIGHTNING")]
    Lightning,
    /// Psychic
    #[serde(alias = "PSYCHIC")]
    Psychic,
    /// Fighting
    #[serde(alias = "FIGHTING")]
    Fighting,
    /// Darkness
    #[serde(alias = "DARKNESS")]
    Darkness,
    /// Metal
    #[serde(alias = "METAL")]
    Metal,
}

impl EnergyType {
    /// Every energy type, in wire order.
    pub const ALL: [EnergyType; 8] = [
        EnergyType::Grass,
        EnergyType::Fire,
        EnergyType::Water,
        EnergyType::Lightning,
        EnergyType::Psychic,
        EnergyType::Fighting,
        EnergyType::Darkness,
        EnergyType::Metal,
    ];

    /// Lower-case wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            EnergyType::Grass => "grass",
            EnergyType::Fire => "fire",
            EnergyType::Water => "water",
            EnergyType::Lightning => "lightning",
            EnergyType::Psychic => "psychic",
            EnergyType::Fighting => "fighting",
            EnergyType::Darkness => "darkness",
            EnergyType::Metal => "metal",
        }
    }

    /// Look up a type by name, ignoring case.
    pub fn from_name(name: &str) -> Option<EnergyType> {
        Self::ALL
            .into_iter()
            .find(|energy| energy.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for EnergyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_spellings_decode() {
        let upper: Vec<EnergyType> = serde_json::from_str(r#"["GRASS", "METAL"]"#).unwrap();
        let lower: Vec<EnergyType> = serde_json::from_str(r#"["grass", "metal"]"#).unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper, vec![EnergyType::Grass, EnergyType::Metal]);
    }

    #[test]
    fn test_serializes_lowercase() {
        let json = serde_json::to_string(&EnergyType::Lightning).unwrap();
        assert_eq!(json, r#""lightning""#);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(EnergyType::from_name("Psychic"), Some(EnergyType::Psychic));
        assert_eq!(EnergyType::from_name(" water "), Some(EnergyType::Water));
        assert_eq!(EnergyType::from_name("colorless"), None);
    }
}
