use rtpsim_engine::{
    EngineSettings, GameConfigDoc, GameType, JackpotDoc, PrizeLevelDoc, RegistryError, RunStatus,
    SimulationConfigDoc, SimulationRegistry,
};
use std::sync::Arc;
use std::thread;

fn pick_three() -> GameConfigDoc {
    GameConfigDoc {
        name: "Pick 3".to_string(),
        game_type: GameType::Lottery,
        description: None,
        number_range: (1, 20),
        selection_count: 3,
        ticket_price: 1.0,
        prize_levels: vec![
            PrizeLevelDoc {
                level: 1,
                name: "Top".to_string(),
                match_condition: 3,
                fixed_prize: None,
                prize_percentage: Some(0.8),
            },
            PrizeLevelDoc {
                level: 2,
                name: "Two".to_string(),
                match_condition: 2,
                fixed_prize: Some(3.0),
                prize_percentage: None,
            },
        ],
        jackpot: JackpotDoc {
            enabled: true,
            initial_amount: 500.0,
            min_jackpot: 500.0,
            ..JackpotDoc::default()
        },
    }
}

fn simulation(seed: u64) -> SimulationConfigDoc {
    SimulationConfigDoc {
        rounds: 300,
        players_range: (5, 20),
        bets_range: (1, 4),
        seed: Some(seed),
    }
}

#[test]
fn concurrent_runs_stay_isolated() {
    let registry = Arc::new(SimulationRegistry::new(EngineSettings {
        max_concurrent_runs: 8,
        ..EngineSettings::default()
    }));
    let seeds = [1_u64, 2, 3, 1];

    let starters: Vec<_> = seeds
        .iter()
        .map(|&seed| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                registry
                    .start(&pick_three(), &simulation(seed))
                    .expect("run accepted")
                    .simulation_id
            })
        })
        .collect();
    let ids: Vec<_> = starters
        .into_iter()
        .map(|starter| starter.join().expect("starter thread"))
        .collect();

    for id in &ids {
        assert_eq!(registry.wait(*id).expect("worker joined"), RunStatus::Completed);
    }
    let summaries: Vec<String> = ids
        .iter()
        .map(|id| serde_json::to_string(&registry.result(*id).expect("summary")).unwrap())
        .collect();

    // Runs 0 and 3 share a seed; the others do not.
    assert_eq!(summaries[0], summaries[3]);
    assert_ne!(summaries[0], summaries[1]);
    assert_ne!(summaries[1], summaries[2]);

    let listing = registry.list();
    assert_eq!(listing.len(), 4);
    assert!(listing.iter().all(|run| run.status == RunStatus::Completed));
    assert_eq!(registry.active_runs(), 0);
}

#[test]
fn progress_can_be_polled_while_running() {
    let registry = SimulationRegistry::default();
    let mut long = simulation(9);
    long.rounds = 2_000_000;
    let ack = registry.start(&pick_three(), &long).expect("run accepted");

    let mut last_round = 0;
    for _ in 0..20 {
        let progress = registry.progress(ack.simulation_id).expect("known run");
        assert!(progress.progress.current_round >= last_round);
        last_round = progress.progress.current_round;
        assert!(progress.progress.real_time_stats.recent_rtps.len() <= 10);
        thread::sleep(std::time::Duration::from_millis(2));
    }

    registry.stop(ack.simulation_id).expect("known run");
    assert_eq!(
        registry.wait(ack.simulation_id).expect("worker joined"),
        RunStatus::Stopped
    );
    let summary = registry.result(ack.simulation_id).expect("summary");
    assert!(summary.total_rounds < 2_000_000);
    assert_eq!(
        summary.total_rounds,
        registry
            .progress(ack.simulation_id)
            .expect("known run")
            .progress
            .current_round
    );
}

#[test]
fn arithmetic_overflow_ends_run_in_error() {
    let registry = SimulationRegistry::default();
    let mut game = pick_three();
    game.ticket_price = 5e28;
    game.jackpot = JackpotDoc::default();
    let mut sim = simulation(4);
    sim.bets_range = (2, 2);
    let ack = registry.start(&game, &sim).expect("documents are valid");

    assert_eq!(registry.wait(ack.simulation_id).unwrap(), RunStatus::Error);
    let progress = registry.progress(ack.simulation_id).unwrap();
    assert_eq!(progress.status, RunStatus::Error);
    assert!(progress.error.as_deref().unwrap_or_default().contains("overflow"));
    let summary = registry.result(ack.simulation_id).unwrap();
    assert_eq!(summary.status, RunStatus::Error);
    assert!(summary.error.is_some());
}

#[test]
fn overflowing_running_totals_end_run_in_error() {
    let registry = SimulationRegistry::default();
    let mut game = pick_three();
    game.ticket_price = 4e28;
    game.jackpot = JackpotDoc::default();
    game.prize_levels[0].prize_percentage = None;
    game.prize_levels[0].fixed_prize = Some(10.0);
    let sim = SimulationConfigDoc {
        rounds: 5,
        players_range: (1, 1),
        bets_range: (1, 1),
        seed: Some(6),
    };
    let ack = registry.start(&game, &sim).expect("documents are valid");

    assert_eq!(
        registry.wait(ack.simulation_id).expect("worker joined"),
        RunStatus::Error
    );
    let summary = registry.result(ack.simulation_id).expect("summary");
    assert_eq!(summary.status, RunStatus::Error);
    assert_eq!(summary.total_rounds, 1);
    assert!(summary.error.unwrap_or_default().contains("total bet amount"));
    assert_eq!(registry.active_runs(), 0);
}

#[test]
fn validation_failures_issue_no_id() {
    let registry = SimulationRegistry::default();
    let mut game = pick_three();
    game.prize_levels[1].match_condition = 3;
    let err = registry.start(&game, &simulation(1)).unwrap_err();
    assert!(matches!(err, RegistryError::Validation(_)));
    assert!(err.to_string().contains("prize_levels[1].match_condition"));
    assert!(registry.list().is_empty());
}
