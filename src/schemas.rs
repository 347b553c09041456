//! Field sets consumers may rely on, one schema per response family.

use crate::normalizer::Schema;

pub fn programme() -> Schema {
    Schema::new().object(
        "programme",
        Schema::new()
            .scalar("date")
            .number("timezoneOffset", 0)
            .array("reunions"),
    )
}

pub fn reunion() -> Schema {
    Schema::new()
        .number("numOfficiel", 0)
        .number("numExterne", 0)
        .scalar("dateReunion")
        .string("nature", "")
        .record("hippodrome")
        .record("pays")
        .array("courses")
}

pub fn participants() -> Schema {
    Schema::new().array("participants").array("ecuries")
}

fn stake_summary() -> Schema {
    Schema::new()
        .number("count", 0)
        .number("total_stake", 0)
        .string("bankroll_usage", "0%")
        .string("total_expected_value", "0%")
}

pub fn value_bets() -> Schema {
    Schema::new()
        .number("race_id", 0)
        .number("bankroll", 0)
        .array("value_bets")
        .record("best_bet")
        .number("total_value_bets", 0)
        .object("summary", stake_summary())
}

pub fn combinations() -> Schema {
    Schema::new()
        .number("race_id", 0)
        .string("type", "")
        .boolean("ordre", false)
        .array("combinations")
        .record("best_combination")
        .number("total_combinations", 0)
        .object(
            "summary",
            Schema::new()
                .number("count", 0)
                .number("total_stake", 0)
                .string("average_probability", "0%")
                .string("best_expected_value", "0%"),
        )
}

pub fn daily_top_bets() -> Schema {
    Schema::new()
        .string("date", "")
        .number("bankroll", 0)
        .array("top_bets")
        .record("best_bet")
        .number("total_races_analyzed", 0)
        .object("summary", stake_summary().string("average_roi", "0%"))
}

pub fn daily_top_combinations() -> Schema {
    Schema::new()
        .string("date", "")
        .string("type", "")
        .array("top_combinations")
        .record("best_combination")
        .number("total_combinations", 0)
}

pub fn race_resolution() -> Schema {
    Schema::new()
        .boolean("success", false)
        .number("race_id", 0)
        .string("message", "")
}

pub fn manual_bets_summary() -> Schema {
    Schema::new().string("date", "").object(
        "summary",
        Schema::new()
            .number("total_bets", 0)
            .number("total_stake", 0)
            .number("total_return", 0)
            .number("profit", 0)
            .string("roi", "0%"),
    )
}

/// Envelope of the backend's betting endpoints: `{success, message, data}`.
pub fn backend_result() -> Schema {
    Schema::new()
        .boolean("success", false)
        .string("message", "")
        .any("data")
}
