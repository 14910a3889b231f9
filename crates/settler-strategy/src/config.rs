//! Tunable parameters for estimation, planning, and negotiation.
//!
//! [`StrategyConfig`] is deserialized as the `strategy` section of the
//! brain's YAML configuration. Every field has a default, so an empty
//! section (or none at all) yields a playable agent.

use serde::{Deserialize, Serialize};

/// Which planning strategy the brain uses. Chosen once at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannerKind {
    /// Score each buildable candidate on its own.
    OnePly,
    /// Also credit the best follow-up a candidate enables.
    #[default]
    TwoPly,
}

/// Strategy parameters shared by the tracker, planner, and negotiator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Planning search depth.
    #[serde(default)]
    pub planner: PlannerKind,

    /// Roll bound for every estimate; longer estimates report a cutoff.
    #[serde(default = "default_eta_cutoff")]
    pub eta_cutoff: u32,

    /// Victory points needed to win.
    #[serde(default = "default_winning_score")]
    pub winning_score: u32,

    /// Road hops searched from a player's network for settlement spots.
    #[serde(default = "default_settlement_search_hops")]
    pub settlement_search_hops: u32,

    /// Whether ships are part of the game.
    #[serde(default)]
    pub ships_enabled: bool,

    /// Utility per victory point a piece grants.
    #[serde(default = "default_vp_weight")]
    pub vp_weight: i64,

    /// Utility per roll of speedup a piece grants.
    #[serde(default = "default_speedup_weight")]
    pub speedup_weight: i64,

    /// Utility per opponent racing for the same spot.
    #[serde(default = "default_threat_weight")]
    pub threat_weight: i64,

    /// Utility lost per roll of estimated time to build.
    #[serde(default = "default_eta_weight")]
    pub eta_weight: i64,

    /// Flat utility of a development card purchase.
    #[serde(default = "default_dev_card_value")]
    pub dev_card_value: i64,

    /// Percentage of the follow-up utility credited by two-ply planning.
    #[serde(default = "default_lookahead_percent")]
    pub lookahead_percent: i64,

    /// Pulses to wait for answers when a human was offered a trade.
    #[serde(default = "default_human_response_pulses")]
    pub human_response_pulses: u64,

    /// Pulses to wait for answers when only agents were offered a trade.
    #[serde(default = "default_bot_response_pulses")]
    pub bot_response_pulses: u64,

    /// Maximum trade offers we make in one turn.
    #[serde(default = "default_max_offers_per_turn")]
    pub max_offers_per_turn: u32,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            planner: PlannerKind::default(),
            eta_cutoff: default_eta_cutoff(),
            winning_score: default_winning_score(),
            settlement_search_hops: default_settlement_search_hops(),
            ships_enabled: false,
            vp_weight: default_vp_weight(),
            speedup_weight: default_speedup_weight(),
            threat_weight: default_threat_weight(),
            eta_weight: default_eta_weight(),
            dev_card_value: default_dev_card_value(),
            lookahead_percent: default_lookahead_percent(),
            human_response_pulses: default_human_response_pulses(),
            bot_response_pulses: default_bot_response_pulses(),
            max_offers_per_turn: default_max_offers_per_turn(),
        }
    }
}

const fn default_eta_cutoff() -> u32 {
    40
}

const fn default_winning_score() -> u32 {
    10
}

const fn default_settlement_search_hops() -> u32 {
    2
}

const fn default_vp_weight() -> i64 {
    100
}

const fn default_speedup_weight() -> i64 {
    4
}

const fn default_threat_weight() -> i64 {
    10
}

const fn default_eta_weight() -> i64 {
    5
}

const fn default_dev_card_value() -> i64 {
    45
}

const fn default_lookahead_percent() -> i64 {
    50
}

const fn default_human_response_pulses() -> u64 {
    30
}

const fn default_bot_response_pulses() -> u64 {
    5
}

const fn default_max_offers_per_turn() -> u32 {
    4
}
