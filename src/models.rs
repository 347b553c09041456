use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ExecError;

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombinationType {
    Tierce,
    Quinte,
}

impl CombinationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CombinationType::Tierce => "tierce",
            CombinationType::Quinte => "quinte",
        }
    }
}

impl fmt::Display for CombinationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CombinationType {
    type Err = ExecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tierce" | "tiercé" => Ok(CombinationType::Tierce),
            "quinte" | "quinté" => Ok(CombinationType::Quinte),
            other => Err(ExecError::validation(format!(
                "unknown combination type {other:?} (expected tierce or quinte)"
            ))),
        }
    }
}

// ============================================================================
// Provider programme views
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgrammeResponse {
    pub programme: Programme,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Programme {
    pub date: Option<i64>,
    pub reunions: Vec<Reunion>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Reunion {
    pub num_officiel: u32,
    pub nature: String,
    pub courses: Vec<Course>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Course {
    pub num_ordre: u32,
    pub libelle: String,
    pub heure_depart: Option<i64>,
    pub nombre_declares_partants: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticipantsResponse {
    pub participants: Vec<Participant>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Participant {
    pub num_pmu: u32,
    pub nom: String,
    pub driver: Option<String>,
    pub statut: Option<String>,
}

// ============================================================================
// Betting analytics views
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StakeSummary {
    pub count: u64,
    pub total_stake: f64,
    pub bankroll_usage: String,
    pub total_expected_value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueBet {
    pub horse_number: Option<u32>,
    pub horse_name: Option<String>,
    pub odds: Option<f64>,
    pub probability: Option<f64>,
    pub expected_value: Option<f64>,
    pub kelly_fraction: Option<f64>,
    pub stake: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValueBetsResponse {
    pub race_id: u64,
    pub bankroll: f64,
    pub value_bets: Vec<ValueBet>,
    pub best_bet: Option<ValueBet>,
    pub total_value_bets: u64,
    pub summary: StakeSummary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Combination {
    pub horses: Vec<u32>,
    pub probability: Option<f64>,
    pub odds: Option<f64>,
    pub expected_value: Option<f64>,
    pub stake: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CombinationSummary {
    pub count: u64,
    pub total_stake: f64,
    pub average_probability: String,
    pub best_expected_value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CombinationsResponse {
    pub race_id: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub ordre: bool,
    pub combinations: Vec<Combination>,
    pub best_combination: Option<Combination>,
    pub total_combinations: u64,
    pub summary: CombinationSummary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailySummary {
    pub count: u64,
    pub total_stake: f64,
    pub bankroll_usage: String,
    pub total_expected_value: String,
    pub average_roi: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyTopBetsResponse {
    pub date: String,
    pub bankroll: f64,
    pub top_bets: Vec<ValueBet>,
    pub best_bet: Option<ValueBet>,
    pub total_races_analyzed: u64,
    pub summary: DailySummary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyTopCombinationsResponse {
    pub date: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub top_combinations: Vec<Combination>,
    pub best_combination: Option<Combination>,
    pub total_combinations: u64,
}

// ============================================================================
// Backend payloads
// ============================================================================

/// Identifies a race on the backend from its provider coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceLocator {
    pub date: String,
    pub reunion: u32,
    pub course: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualBet {
    pub date: String,
    pub race_id: u64,
    pub horse_number: u32,
    pub bet_type: String,
    pub stake: Decimal,
    pub odds: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KellyBet {
    pub date: String,
    pub race_id: u64,
    pub horse_number: u32,
    pub odds: Decimal,
    pub probability: Decimal,
    pub bankroll: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualCombination {
    pub date: String,
    pub race_id: u64,
    #[serde(rename = "type")]
    pub kind: CombinationType,
    pub horses: Vec<u32>,
    pub ordre: bool,
    pub stake: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::normalize;
    use crate::schemas;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_combination_type_from_str() {
        assert_eq!("tierce".parse::<CombinationType>().unwrap(), CombinationType::Tierce);
        assert_eq!("QUINTE".parse::<CombinationType>().unwrap(), CombinationType::Quinte);
        assert!(matches!(
            "quarte".parse::<CombinationType>(),
            Err(ExecError::Validation(_))
        ));
    }

    #[test]
    fn test_empty_value_bets_envelope_decodes() {
        let view: ValueBetsResponse = schemas::value_bets().empty().decode().unwrap();
        assert_eq!(view.race_id, 0);
        assert!(view.value_bets.is_empty());
        assert!(view.best_bet.is_none());
        assert_eq!(view.summary.bankroll_usage, "0%");
    }

    #[test]
    fn test_combinations_envelope_decodes() {
        let raw = json!({
            "race_id": 42,
            "type": "quinte",
            "combinations": [{"horses": [1, 4, 7, 2, 9], "probability": 0.012}],
            "best_combination": {"horses": [1, 4, 7, 2, 9]},
            "total_combinations": 1
        });
        let view: CombinationsResponse = normalize(&raw, &schemas::combinations()).decode().unwrap();
        assert_eq!(view.kind, "quinte");
        assert_eq!(view.combinations[0].horses, vec![1, 4, 7, 2, 9]);
        assert_eq!(view.summary.average_probability, "0%");
    }

    #[test]
    fn test_programme_envelope_decodes() {
        let raw = json!({
            "programme": {
                "reunions": [{"numOfficiel": 1, "courses": [{"numOrdre": 4, "libelle": "PRIX DE L'ARC"}]}]
            }
        });
        let view: ProgrammeResponse = normalize(&raw, &schemas::programme()).decode().unwrap();
        assert_eq!(view.programme.reunions[0].num_officiel, 1);
        assert_eq!(view.programme.reunions[0].courses[0].num_ordre, 4);
    }

    #[test]
    fn test_participants_envelope_decodes() {
        let raw = json!({
            "participants": [
                {"numPmu": 7, "nom": "GALOPIN DU CHENE", "driver": "M. Abrivard", "statut": "PARTANT"},
                {"numPmu": 8, "nom": "ROI DU LUPIN", "statut": "NON_PARTANT"}
            ]
        });
        let view: ParticipantsResponse = normalize(&raw, &schemas::participants()).decode().unwrap();
        assert_eq!(view.participants.len(), 2);
        assert_eq!(view.participants[0].num_pmu, 7);
        assert_eq!(view.participants[0].driver.as_deref(), Some("M. Abrivard"));
        assert!(view.participants[1].driver.is_none());

        let empty: ParticipantsResponse = schemas::participants().empty().decode().unwrap();
        assert!(empty.participants.is_empty());
    }

    #[test]
    fn test_daily_top_bets_envelope_decodes() {
        let raw = json!({
            "date": "2026-10-17",
            "bankroll": 1000,
            "top_bets": [{"horse_number": 5, "odds": 6.5, "stake": 12.0}],
            "best_bet": {"horse_number": 5, "odds": 6.5},
            "total_races_analyzed": 9,
            "summary": {"count": 1, "total_stake": 12.0, "average_roi": "14%"}
        });
        let view: DailyTopBetsResponse = normalize(&raw, &schemas::daily_top_bets()).decode().unwrap();
        assert_eq!(view.top_bets[0].horse_number, Some(5));
        assert_eq!(view.best_bet.unwrap().odds, Some(6.5));
        assert_eq!(view.total_races_analyzed, 9);
        assert_eq!(view.summary.average_roi, "14%");
        assert_eq!(view.summary.bankroll_usage, "0%");

        let empty: DailyTopBetsResponse = schemas::daily_top_bets().empty().decode().unwrap();
        assert!(empty.best_bet.is_none());
        assert_eq!(empty.summary.count, 0);
    }

    #[test]
    fn test_daily_top_combinations_envelope_decodes() {
        let raw = json!({
            "date": "2026-10-17",
            "type": "tierce",
            "top_combinations": [{"horses": [2, 5, 11], "expected_value": 1.4}],
            "total_combinations": 1
        });
        let view: DailyTopCombinationsResponse =
            normalize(&raw, &schemas::daily_top_combinations()).decode().unwrap();
        assert_eq!(view.kind, "tierce");
        assert_eq!(view.top_combinations[0].horses, vec![2, 5, 11]);
        assert!(view.best_combination.is_none());
        assert_eq!(view.total_combinations, 1);
    }

    #[test]
    fn test_manual_combination_payload() {
        let payload = ManualCombination {
            date: "2026-10-17".to_string(),
            race_id: 42,
            kind: CombinationType::Tierce,
            horses: vec![3, 1, 8],
            ordre: true,
            stake: dec!(2.5),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["type"], json!("tierce"));
        assert_eq!(value["horses"], json!([3, 1, 8]));
        assert!(value["stake"].is_number());
    }
}
