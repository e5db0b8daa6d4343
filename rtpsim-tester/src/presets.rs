//! Built-in game and run configurations.
use rtpsim_engine::{
    GameConfigDoc, GameType, JackpotDoc, PrizeLevelDoc, SimulationConfigDoc,
};

use crate::logic::ConfigBundle;

fn fixed(level: i64, name: &str, match_condition: i64, prize: f64) -> PrizeLevelDoc {
    PrizeLevelDoc {
        level,
        name: name.to_string(),
        match_condition,
        fixed_prize: Some(prize),
        prize_percentage: None,
    }
}

fn pool_share(level: i64, name: &str, match_condition: i64, percentage: f64) -> PrizeLevelDoc {
    PrizeLevelDoc {
        level,
        name: name.to_string(),
        match_condition,
        fixed_prize: None,
        prize_percentage: Some(percentage),
    }
}

fn lotto_6_42() -> ConfigBundle {
    ConfigBundle {
        game_config: GameConfigDoc {
            name: "Lotto 6/42".to_string(),
            game_type: GameType::Lottery,
            description: Some("Six from forty-two with a seller-funded progressive jackpot".to_string()),
            number_range: (1, 42),
            selection_count: 6,
            ticket_price: 20.0,
            prize_levels: vec![
                pool_share(1, "Jackpot", 6, 0.9),
                fixed(2, "Second Prize", 5, 5000.0),
                fixed(3, "Third Prize", 4, 200.0),
                fixed(4, "Fourth Prize", 3, 20.0),
                fixed(5, "Fifth Prize", 2, 5.0),
            ],
            jackpot: JackpotDoc {
                enabled: true,
                initial_amount: 100_000.0,
                contribution_rate: 0.15,
                post_return_contribution_rate: 0.3,
                return_rate: 0.9,
                jackpot_fixed_prize: None,
                min_jackpot: 100_000.0,
            },
        },
        simulation_config: SimulationConfigDoc {
            rounds: 1000,
            players_range: (100, 500),
            bets_range: (1, 5),
            seed: Some(42),
        },
    }
}

fn single_bet() -> ConfigBundle {
    ConfigBundle {
        game_config: GameConfigDoc {
            name: "Single Bet".to_string(),
            game_type: GameType::Lottery,
            description: Some("One player placing one bet".to_string()),
            number_range: (1, 10),
            selection_count: 3,
            ticket_price: 2.0,
            prize_levels: vec![fixed(1, "All Three", 3, 100.0), fixed(2, "Two", 2, 4.0)],
            jackpot: JackpotDoc::default(),
        },
        simulation_config: SimulationConfigDoc {
            rounds: 1,
            players_range: (1, 1),
            bets_range: (1, 1),
            seed: Some(1),
        },
    }
}

fn pick_3() -> ConfigBundle {
    ConfigBundle {
        game_config: GameConfigDoc {
            name: "Pick 3".to_string(),
            game_type: GameType::Lottery,
            description: Some("Three from twenty with a small jackpot".to_string()),
            number_range: (1, 20),
            selection_count: 3,
            ticket_price: 1.0,
            prize_levels: vec![
                pool_share(1, "Top Prize", 3, 0.8),
                fixed(2, "Two Numbers", 2, 3.0),
            ],
            jackpot: JackpotDoc {
                enabled: true,
                initial_amount: 500.0,
                jackpot_fixed_prize: Some(50.0),
                min_jackpot: 500.0,
                ..JackpotDoc::default()
            },
        },
        simulation_config: SimulationConfigDoc {
            rounds: 5000,
            players_range: (5, 20),
            bets_range: (1, 4),
            seed: Some(7),
        },
    }
}

fn no_jackpot() -> ConfigBundle {
    ConfigBundle {
        game_config: GameConfigDoc {
            name: "No Jackpot 5/35".to_string(),
            game_type: GameType::Lottery,
            description: Some("Top tier pays a share of each round's sales".to_string()),
            number_range: (1, 35),
            selection_count: 5,
            ticket_price: 5.0,
            prize_levels: vec![
                pool_share(1, "Sales Share", 5, 0.5),
                fixed(2, "Four", 4, 250.0),
                fixed(3, "Three", 3, 10.0),
            ],
            jackpot: JackpotDoc::default(),
        },
        simulation_config: SimulationConfigDoc {
            rounds: 2000,
            players_range: (20, 80),
            bets_range: (1, 3),
            seed: Some(2024),
        },
    }
}

pub fn get_preset(name: &str) -> Option<ConfigBundle> {
    match name.to_lowercase().as_str() {
        "lotto-6-42" | "lotto" => Some(lotto_6_42()),
        "single-bet" | "single" => Some(single_bet()),
        "pick-3" | "pick3" => Some(pick_3()),
        "no-jackpot" => Some(no_jackpot()),
        _ => None,
    }
}

pub fn list_presets() -> Vec<(&'static str, &'static str)> {
    vec![
        ("lotto-6-42", "Lotto 6/42 with progressive jackpot (1000 rounds)"),
        ("single-bet", "One player, one bet, one round"),
        ("pick-3", "Pick 3 of 20 with small jackpot and fixed bonus"),
        ("no-jackpot", "5/35 with top tier paid from round sales"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtpsim_engine::EngineSettings;

    #[test]
    fn every_listed_preset_validates() {
        for (key, _) in list_presets() {
            let bundle = get_preset(key).unwrap_or_else(|| panic!("preset {key} missing"));
            bundle
                .game_config
                .validate()
                .unwrap_or_else(|err| panic!("preset {key} invalid: {err}"));
            bundle
                .simulation_config
                .validate(&EngineSettings::default())
                .unwrap_or_else(|err| panic!("preset {key} run invalid: {err}"));
        }
    }

    #[test]
    fn aliases_resolve_case_insensitively() {
        assert!(get_preset("LOTTO").is_some());
        assert!(get_preset("pick3").is_some());
        assert!(get_preset("unknown").is_none());
    }
}
