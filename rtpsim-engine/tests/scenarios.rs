use rtpsim_engine::constants::RECENT_RTP_WINDOW;
use rtpsim_engine::numbers::{decimal_to_f64, ratio};
use rtpsim_engine::{
    EngineSettings, GameConfigDoc, GameType, JackpotDoc, PrizeLevelDoc, RoundSimulator,
    RunStatus, SimulationConfigDoc, SimulationId, SimulationRunner, SummaryView,
};
use rust_decimal::Decimal;
use std::sync::Arc;

fn lotto_6_42() -> GameConfigDoc {
    let tier = |level: i64, name: &str, matches: i64, fixed: f64| PrizeLevelDoc {
        level,
        name: name.to_string(),
        match_condition: matches,
        fixed_prize: Some(fixed),
        prize_percentage: None,
    };
    GameConfigDoc {
        name: "Lotto 6/42".to_string(),
        game_type: GameType::Lottery,
        description: Some("six from forty-two with a progressive jackpot".to_string()),
        number_range: (1, 42),
        selection_count: 6,
        ticket_price: 20.0,
        prize_levels: vec![
            PrizeLevelDoc {
                level: 1,
                name: "Jackpot".to_string(),
                match_condition: 6,
                fixed_prize: None,
                prize_percentage: Some(0.9),
            },
            tier(2, "Second", 5, 5000.0),
            tier(3, "Third", 4, 200.0),
            tier(4, "Fourth", 3, 20.0),
            tier(5, "Fifth", 2, 5.0),
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
    }
}

fn runner(game: &GameConfigDoc, simulation: &SimulationConfigDoc) -> SimulationRunner {
    let rules = Arc::new(game.validate().expect("valid game"));
    let params = simulation
        .validate(&EngineSettings::default())
        .expect("valid simulation");
    SimulationRunner::new(SimulationId::new(), rules, params)
}

fn run_to_summary(game: &GameConfigDoc, simulation: &SimulationConfigDoc) -> SummaryView {
    let runner = runner(game, simulation);
    let handle = runner.handle();
    assert_eq!(runner.run(), RunStatus::Completed);
    handle.result().expect("terminal run has a summary")
}

fn lotto_simulation() -> SimulationConfigDoc {
    SimulationConfigDoc {
        rounds: 1000,
        players_range: (10, 50),
        bets_range: (1, 5),
        seed: Some(42),
    }
}

#[test]
fn lotto_run_replays_with_same_seed() {
    let first = run_to_summary(&lotto_6_42(), &lotto_simulation());
    let second = run_to_summary(&lotto_6_42(), &lotto_simulation());

    assert_eq!(first.total_rounds, 1000);
    assert_eq!(first.real_time.total_bet_amount, second.real_time.total_bet_amount);
    assert_eq!(first.real_time.total_payout, second.real_time.total_payout);
    assert_eq!(first.real_time.jackpot_hits, second.real_time.jackpot_hits);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap(),
        "summaries must serialize byte-for-byte identically"
    );
    assert_eq!(first.prize_summary.len(), 5);
    assert!(first.real_time.total_bet_amount > Decimal::ZERO);
}

#[test]
fn different_seeds_diverge() {
    let first = run_to_summary(&lotto_6_42(), &lotto_simulation());
    let mut other = lotto_simulation();
    other.seed = Some(43);
    let second = run_to_summary(&lotto_6_42(), &other);
    assert_ne!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn single_bet_round_charges_one_ticket() {
    let game = GameConfigDoc {
        name: "single".to_string(),
        game_type: GameType::Lottery,
        description: None,
        number_range: (1, 10),
        selection_count: 3,
        ticket_price: 2.0,
        prize_levels: vec![
            PrizeLevelDoc {
                level: 1,
                name: "All three".to_string(),
                match_condition: 3,
                fixed_prize: Some(100.0),
                prize_percentage: None,
            },
            PrizeLevelDoc {
                level: 2,
                name: "Two".to_string(),
                match_condition: 2,
                fixed_prize: Some(4.0),
                prize_percentage: None,
            },
        ],
        jackpot: JackpotDoc::default(),
    };
    let simulation = SimulationConfigDoc {
        rounds: 1,
        players_range: (1, 1),
        bets_range: (1, 1),
        seed: Some(1),
    };
    let summary = run_to_summary(&game, &simulation);
    let price = Decimal::from(2);
    assert_eq!(summary.total_bets, 1);
    assert_eq!(summary.real_time.total_players, 1);
    assert_eq!(summary.real_time.total_bet_amount, price);
    assert_eq!(summary.real_time.total_sales_amount, price);
    let expected = decimal_to_f64(ratio(summary.real_time.total_payout, price));
    assert!((summary.average_rtp - expected).abs() < f64::EPSILON);
    assert!(summary.rtp_variance.abs() < f64::EPSILON);
}

#[test]
fn stopping_mid_run_freezes_snapshot() {
    let mut runner = runner(&lotto_6_42(), &lotto_simulation());
    let handle = runner.handle();
    for _ in 0..5 {
        assert_eq!(runner.step(), RunStatus::Running);
    }
    handle.stop();
    assert_eq!(runner.step(), RunStatus::Stopped);

    let frozen = handle.progress();
    assert_eq!(frozen.status, RunStatus::Stopped);
    assert_eq!(frozen.progress.current_round, 5);
    assert_eq!(frozen.progress.total_rounds, 1000);
    std::thread::sleep(std::time::Duration::from_millis(5));
    assert_eq!(handle.progress(), frozen);

    let summary = handle.result().expect("stopped run has a summary");
    assert_eq!(summary.status, RunStatus::Stopped);
    assert_eq!(summary.total_rounds, 5);
    assert_eq!(summary.configured_rounds, 1000);
}

#[test]
fn recent_window_keeps_last_ten_rounds() {
    let mut runner = runner(&lotto_6_42(), &lotto_simulation());
    let handle = runner.handle();
    for played in 1..=25_usize {
        runner.step();
        let recent = handle.progress().progress.real_time_stats.recent_rtps;
        assert_eq!(recent.len(), played.min(RECENT_RTP_WINDOW));
    }
    let trend = handle.chart_data().rtp_trend;
    let recent = handle.progress().progress.real_time_stats.recent_rtps;
    assert_eq!(trend.len(), 25);
    assert_eq!(recent.as_slice(), &trend[15..]);
}

#[test]
fn average_rtp_weights_rounds_by_wager() {
    let rules = Arc::new(lotto_6_42().validate().expect("valid"));
    let params = lotto_simulation()
        .validate(&EngineSettings::default())
        .expect("valid");
    let mut sim = RoundSimulator::new(rules, params, 42);
    let mut wagered = Decimal::ZERO;
    let mut paid = Decimal::ZERO;
    for _ in 0..200 {
        let round = sim.play_round().expect("round");
        assert!(round.rtp >= Decimal::ZERO);
        wagered += round.total_bet_amount;
        paid += round.total_payout;
    }

    let mut simulation = lotto_simulation();
    simulation.rounds = 200;
    let summary = run_to_summary(&lotto_6_42(), &simulation);
    assert_eq!(summary.real_time.total_bet_amount, wagered);
    assert_eq!(summary.real_time.total_payout, paid);
    assert!((summary.average_rtp - decimal_to_f64(ratio(paid, wagered))).abs() < 1e-12);
}
