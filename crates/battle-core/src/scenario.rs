//! Match rules configuration.
//!
//! A `Scenario` is loaded from JSON. Every field has a default, so a partial
//! document (or `{}`) is a valid configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading a scenario
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("invalid scenario document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unit limit must be at least 1")]
    ZeroUnitLimit,
}

/// Rules for one match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Last playable day; when it passes the seat with the most buildings wins
    pub day_limit: Option<u32>,
    /// Funds each seat begins with
    pub starting_funds: u32,
    /// Funds earned per owned building at the start of each turn
    pub income_per_property: u32,
    /// Units gain rank by destroying enemies
    pub rank_up: bool,
    /// Maximum units a seat may field
    pub unit_limit: usize,
    /// Hit points restored per turn on a friendly building
    pub repair_hp: u32,
    /// Resupplying units never burn fuel
    pub resuppliers_infinite_fuel: bool,
    /// Seed for per-order damage seeds; drawn from entropy when absent
    pub seed: Option<u64>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            day_limit: None,
            starting_funds: 0,
            income_per_property: 1000,
            rank_up: true,
            unit_limit: 50,
            repair_hp: 20,
            resuppliers_infinite_fuel: true,
            seed: None,
        }
    }
}

impl Scenario {
    /// Load a scenario from a JSON document
    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = serde_json::from_str(json)?;
        if scenario.unit_limit == 0 {
            return Err(ScenarioError::ZeroUnitLimit);
        }
        Ok(scenario)
    }

    pub fn to_json(&self) -> Result<String, ScenarioError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let scenario = Scenario::from_json("{}").unwrap();
        assert_eq!(scenario, Scenario::default());
        assert_eq!(scenario.income_per_property, 1000);
        assert_eq!(scenario.unit_limit, 50);
    }

    #[test]
    fn test_partial_document() {
        let scenario = Scenario::from_json(r#"{"starting_funds": 5000, "day_limit": 12}"#).unwrap();
        assert_eq!(scenario.starting_funds, 5000);
        assert_eq!(scenario.day_limit, Some(12));
        assert!(scenario.rank_up);
    }

    #[test]
    fn test_rejects_bad_documents() {
        assert!(matches!(
            Scenario::from_json(r#"{"unit_limit": 0}"#),
            Err(ScenarioError::ZeroUnitLimit)
        ));
        assert!(matches!(
            Scenario::from_json("not json"),
            Err(ScenarioError::Parse(_))
        ));
    }
}
