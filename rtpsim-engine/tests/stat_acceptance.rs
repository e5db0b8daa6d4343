use rtpsim_engine::numbers::fraction;
use rtpsim_engine::{
    EngineSettings, GameConfigDoc, GameType, JackpotDoc, PrizeLevelDoc, RunStatus,
    SimulationConfigDoc, SimulationId, SimulationRunner, match_probability,
};
use std::sync::Arc;

const ROUNDS: i64 = 20_000;
const TOLERANCE: f64 = 0.015;

fn pick_two_of_ten() -> GameConfigDoc {
    GameConfigDoc {
        name: "Pick 2 of 10".to_string(),
        game_type: GameType::Lottery,
        description: None,
        number_range: (1, 10),
        selection_count: 2,
        ticket_price: 1.0,
        prize_levels: vec![
            PrizeLevelDoc {
                level: 1,
                name: "Both".to_string(),
                match_condition: 2,
                fixed_prize: Some(20.0),
                prize_percentage: None,
            },
            PrizeLevelDoc {
                level: 2,
                name: "One".to_string(),
                match_condition: 1,
                fixed_prize: Some(1.0),
                prize_percentage: None,
            },
        ],
        jackpot: JackpotDoc::default(),
    }
}

#[test]
fn tier_frequencies_track_hypergeometric_odds() {
    let rules = Arc::new(pick_two_of_ten().validate().expect("valid game"));
    let params = SimulationConfigDoc {
        rounds: ROUNDS,
        players_range: (1, 1),
        bets_range: (1, 1),
        seed: Some(2024),
    }
    .validate(&EngineSettings::default())
    .expect("valid simulation");
    let runner = SimulationRunner::new(SimulationId::new(), rules, params);
    let handle = runner.handle();
    assert_eq!(runner.run(), RunStatus::Completed);
    let summary = handle.result().expect("summary");

    // One bet per player, so winners per player equals winners per bet.
    for tier in &summary.prize_summary {
        let observed = fraction(tier.winners_count, summary.real_time.total_players);
        assert!(
            (observed - tier.theoretical_probability).abs() <= TOLERANCE,
            "tier {} drifted: observed {observed:.4}, expected {:.4}",
            tier.level,
            tier.theoretical_probability
        );
        assert!((tier.probability - observed).abs() < f64::EPSILON);
    }
    assert!((summary.prize_summary[0].theoretical_probability - match_probability(10, 2, 2)).abs() < 1e-12);
}

#[test]
fn long_run_rtp_approaches_fixed_prize_expectation() {
    let rules = Arc::new(pick_two_of_ten().validate().expect("valid game"));
    let params = SimulationConfigDoc {
        rounds: ROUNDS,
        players_range: (1, 3),
        bets_range: (1, 3),
        seed: Some(99),
    }
    .validate(&EngineSettings::default())
    .expect("valid simulation");
    let runner = SimulationRunner::new(SimulationId::new(), rules, params);
    let handle = runner.handle();
    runner.run();
    let summary = handle.result().expect("summary");

    // 20/45 + 16/45 = 0.8
    assert!((summary.theoretical_fixed_rtp - 0.8).abs() < 1e-12);
    assert!(
        (summary.average_rtp - summary.theoretical_fixed_rtp).abs() <= 0.05,
        "average rtp {:.4} strayed from {:.4}",
        summary.average_rtp,
        summary.theoretical_fixed_rtp
    );
}
