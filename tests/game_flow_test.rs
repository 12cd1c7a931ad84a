//! End-to-end lifecycle tests for two-human games, driven by a manual
//! clock so every timer is deterministic.

use broadside::{
    Coord, EventKind, GameConfig, GameError, GameId, GameMode, GameService, GameStatus,
    ManualClock, Orientation, PlacementError, Ship, ShipKind, ShotResult, WinReason,
};
use chrono::Utc;
use std::sync::Arc;

fn fleet() -> Vec<Ship> {
    vec![
        Ship::new(ShipKind::Carrier, Coord::new(0, 0), Orientation::Horizontal),
        Ship::new(ShipKind::Battleship, Coord::new(0, 2), Orientation::Horizontal),
        Ship::new(ShipKind::Cruiser, Coord::new(0, 4), Orientation::Horizontal),
        Ship::new(ShipKind::Submarine, Coord::new(0, 6), Orientation::Horizontal),
        Ship::new(ShipKind::Destroyer, Coord::new(0, 8), Orientation::Horizontal),
    ]
}

fn service() -> (GameService, ManualClock) {
    let clock = ManualClock::new(Utc::now());
    let config = GameConfig::default().with_seed(11);
    let service = GameService::with_clock(config, Arc::new(clock.clone()));
    (service, clock)
}

/// Drives a fresh pvp game to the start of battle with known fleets.
async fn battle(service: &GameService, clock: &ManualClock) -> GameId {
    let game = service.create_game("p1", GameMode::Pvp).unwrap();
    let id = game.id.clone();
    service.join_game(&id, "p2").unwrap();

    let out = service.set_ready(&id, "p1", true).unwrap();
    assert!(!out.countdown_started);
    let out = service.set_ready(&id, "p2", true).unwrap();
    assert!(out.countdown_started);

    clock.advance_ms(*service.config().countdown_ms());
    let out = service.advance_from_countdown(&id).unwrap();
    assert!(out.advanced);

    let out = service.commit_placement(&id, "p1", fleet()).await.unwrap();
    assert!(!out.battle_started);
    let out = service.commit_placement(&id, "p2", fleet()).await.unwrap();
    assert!(out.battle_started);

    let record = service.store().get(&id).unwrap();
    assert_eq!(record.status, GameStatus::Battle);
    assert!(record.current_turn_player_id.is_some());
    id
}

#[tokio::test]
async fn pvp_lifecycle_reaches_battle() {
    let (service, clock) = service();
    battle(&service, &clock).await;
}

#[tokio::test]
async fn create_starts_in_lobby_with_owner_seated() {
    let (service, _clock) = service();
    let game = service.create_game("p1", GameMode::Pvp).unwrap();
    assert_eq!(game.status, GameStatus::Lobby);
    assert_eq!(game.players.len(), 1);
    assert_eq!(game.players[0].id, "p1");
    // The owner's starter fleet is already seeded.
    assert_eq!(game.boards["p1"].ships.len(), 5);
}

#[tokio::test]
async fn rejoin_is_idempotent() {
    let (service, _clock) = service();
    let game = service.create_game("p1", GameMode::Pvp).unwrap();
    let out = service.join_game(&game.id, "p1").unwrap();
    assert!(out.rejoined);
    let record = service.store().get(&game.id).unwrap();
    assert_eq!(record.players.len(), 1);
}

#[tokio::test]
async fn third_player_is_rejected() {
    let (service, _clock) = service();
    let game = service.create_game("p1", GameMode::Pvp).unwrap();
    service.join_game(&game.id, "p2").unwrap();
    assert_eq!(service.join_game(&game.id, "p3"), Err(GameError::GameFull));
}

#[tokio::test]
async fn joining_outside_the_lobby_is_a_phase_error() {
    let (service, _clock) = service();
    let game = service.create_game("p1", GameMode::Pvp).unwrap();
    service.join_game(&game.id, "p2").unwrap();
    service.set_ready(&game.id, "p1", true).unwrap();
    service.set_ready(&game.id, "p2", true).unwrap();
    assert_eq!(
        service.join_game(&game.id, "p3"),
        Err(GameError::Phase {
            expected: GameStatus::Lobby,
            actual: GameStatus::Countdown,
        })
    );
}

#[tokio::test]
async fn ready_from_a_stranger_is_rejected() {
    let (service, _clock) = service();
    let game = service.create_game("p1", GameMode::Pvp).unwrap();
    assert_eq!(
        service.set_ready(&game.id, "ghost", true),
        Err(GameError::UnknownPlayer {
            player_id: "ghost".to_string(),
        })
    );
}

#[tokio::test]
async fn unknown_game_is_not_found() {
    let (service, _clock) = service();
    assert_eq!(
        service.get_game("game-nope", "p1"),
        Err(GameError::NotFound {
            id: "game-nope".to_string(),
        })
    );
}

#[tokio::test]
async fn countdown_cannot_be_skipped() {
    let (service, clock) = service();
    let game = service.create_game("p1", GameMode::Pvp).unwrap();
    service.join_game(&game.id, "p2").unwrap();
    service.set_ready(&game.id, "p1", true).unwrap();
    service.set_ready(&game.id, "p2", true).unwrap();

    assert_eq!(
        service.advance_from_countdown(&game.id),
        Err(GameError::TimerNotExpired {
            phase: GameStatus::Countdown,
        })
    );

    clock.advance_ms(*service.config().countdown_ms());
    assert!(service.advance_from_countdown(&game.id).unwrap().advanced);
    // A second poll is a harmless no-op.
    assert!(!service.advance_from_countdown(&game.id).unwrap().advanced);
}

#[tokio::test]
async fn countdown_advance_in_the_lobby_is_a_phase_error() {
    let (service, _clock) = service();
    let game = service.create_game("p1", GameMode::Pvp).unwrap();
    assert_eq!(
        service.advance_from_countdown(&game.id),
        Err(GameError::Phase {
            expected: GameStatus::Countdown,
            actual: GameStatus::Lobby,
        })
    );
}

#[tokio::test]
async fn commit_outside_placement_is_a_phase_error() {
    let (service, _clock) = service();
    let game = service.create_game("p1", GameMode::Pvp).unwrap();
    assert_eq!(
        service.commit_placement(&game.id, "p1", fleet()).await,
        Err(GameError::Phase {
            expected: GameStatus::Placement,
            actual: GameStatus::Lobby,
        })
    );
}

#[tokio::test]
async fn invalid_commit_leaves_the_record_untouched() {
    let (service, clock) = service();
    let game = service.create_game("p1", GameMode::Pvp).unwrap();
    service.join_game(&game.id, "p2").unwrap();
    service.set_ready(&game.id, "p1", true).unwrap();
    service.set_ready(&game.id, "p2", true).unwrap();
    clock.advance_ms(*service.config().countdown_ms());
    service.advance_from_countdown(&game.id).unwrap();

    let before = service.store().get(&game.id).unwrap();
    let mut bad = fleet();
    bad.pop();
    assert_eq!(
        service.commit_placement(&game.id, "p1", bad).await,
        Err(GameError::InvalidPlacement(PlacementError::MissingShip {
            kind: ShipKind::Destroyer,
        }))
    );
    assert_eq!(service.store().get(&game.id).unwrap(), before);
}

#[tokio::test]
async fn repeat_commit_is_idempotent() {
    let (service, clock) = service();
    let id = battle(&service, &clock).await;

    let before = service.store().get(&id).unwrap();
    let count = service.store().event_count(&id);
    let out = service.commit_placement(&id, "p1", fleet()).await.unwrap();
    assert!(out.already_committed);
    assert!(!out.battle_started);
    assert_eq!(service.store().get(&id).unwrap(), before);
    assert_eq!(service.store().event_count(&id), count);
}

#[tokio::test]
async fn placement_expiry_auto_commits_stragglers() {
    let (service, clock) = service();
    let game = service.create_game("p1", GameMode::Pvp).unwrap();
    service.join_game(&game.id, "p2").unwrap();
    service.set_ready(&game.id, "p1", true).unwrap();
    service.set_ready(&game.id, "p2", true).unwrap();
    clock.advance_ms(*service.config().countdown_ms());
    service.advance_from_countdown(&game.id).unwrap();

    service
        .commit_placement(&game.id, "p1", fleet())
        .await
        .unwrap();

    assert_eq!(
        service.advance_from_placement(&game.id).await,
        Err(GameError::TimerNotExpired {
            phase: GameStatus::Placement,
        })
    );

    clock.advance_ms(*service.config().placement_ms());
    assert!(service.advance_from_placement(&game.id).await.unwrap().advanced);

    let record = service.store().get(&game.id).unwrap();
    assert_eq!(record.status, GameStatus::Battle);
    assert!(record.player("p2").unwrap().placement_committed);
    // The straggler still has a board: the starter fleet from joining.
    assert_eq!(record.boards["p2"].ships.len(), 5);

    let page = service.list_game_events(&game.id, 100, None).unwrap();
    assert!(
        page.events
            .iter()
            .any(|e| e.kind == EventKind::PlacementAutoCommitted)
    );
}

#[tokio::test]
async fn firing_out_of_turn_changes_nothing() {
    let (service, clock) = service();
    let id = battle(&service, &clock).await;

    let record = service.store().get(&id).unwrap();
    let holder = record.current_turn_player_id.clone().unwrap();
    let other = record.opponent_id(&holder).unwrap();

    let count = service.store().event_count(&id);
    assert_eq!(
        service.fire_shot(&id, &other, Coord::new(0, 0)).await,
        Err(GameError::NotYourTurn)
    );
    assert_eq!(service.store().get(&id).unwrap(), record);
    assert_eq!(service.store().event_count(&id), count);
}

#[tokio::test]
async fn out_of_bounds_and_duplicate_shots_are_rejected() {
    let (service, clock) = service();
    let id = battle(&service, &clock).await;

    let record = service.store().get(&id).unwrap();
    let holder = record.current_turn_player_id.clone().unwrap();
    let other = record.opponent_id(&holder).unwrap();

    assert_eq!(
        service.fire_shot(&id, &holder, Coord::new(10, 0)).await,
        Err(GameError::OutOfBounds {
            coord: Coord::new(10, 0),
        })
    );

    // Holder fires at (9, 9), the turn passes, and the opponent passes
    // it back; a repeat at (9, 9) is then a duplicate.
    service.fire_shot(&id, &holder, Coord::new(9, 9)).await.unwrap();
    service.fire_shot(&id, &other, Coord::new(9, 9)).await.unwrap();
    assert_eq!(
        service.fire_shot(&id, &holder, Coord::new(9, 9)).await,
        Err(GameError::DuplicateShot {
            coord: Coord::new(9, 9),
        })
    );
}

#[tokio::test]
async fn destroying_the_fleet_wins_the_game() {
    let (service, clock) = service();
    let id = battle(&service, &clock).await;

    let record = service.store().get(&id).unwrap();
    let attacker = record.current_turn_player_id.clone().unwrap();
    let defender = record.opponent_id(&attacker).unwrap();

    let targets: Vec<Coord> = fleet().iter().flat_map(|s| s.cells()).collect();
    let mut misses = (0..10)
        .map(|x| Coord::new(x, 1))
        .chain((0..10).map(|x| Coord::new(x, 3)));

    for (i, &target) in targets.iter().enumerate() {
        let out = service.fire_shot(&id, &attacker, target).await.unwrap();
        assert!(out.result.is_hit());
        if i + 1 == targets.len() {
            assert!(out.game_over);
        } else {
            assert!(!out.game_over);
            // The defender burns their turn on open water.
            let miss = misses.next().unwrap();
            let out = service.fire_shot(&id, &defender, miss).await.unwrap();
            assert_eq!(out.result, ShotResult::Miss);
        }
    }

    let record = service.store().get(&id).unwrap();
    assert_eq!(record.status, GameStatus::Finished);
    assert_eq!(record.winner_player_id, Some(attacker.clone()));
    assert_eq!(record.win_reason, Some(WinReason::Elimination));
    assert_eq!(record.current_turn_player_id, None);

    // The finished game accepts no further shots.
    assert_eq!(
        service.fire_shot(&id, &attacker, Coord::new(9, 0)).await,
        Err(GameError::Phase {
            expected: GameStatus::Battle,
            actual: GameStatus::Finished,
        })
    );
}

#[tokio::test]
async fn repeated_timeouts_forfeit_the_game() {
    let (service, clock) = service();
    let id = battle(&service, &clock).await;

    let first_holder = service
        .store()
        .get(&id)
        .unwrap()
        .current_turn_player_id
        .clone()
        .unwrap();

    // An unexpired turn is a no-op poll.
    let out = service.advance_turn_if_expired(&id).await.unwrap();
    assert!(!out.advanced);

    let turn_ms = *service.config().turn_ms();
    // Expiries alternate holders; the first holder hits the limit of 3
    // on the fifth expiry.
    for expiry in 1..=4 {
        clock.advance_ms(turn_ms);
        let out = service.advance_turn_if_expired(&id).await.unwrap();
        assert!(out.advanced, "expiry {} should advance", expiry);
        assert!(!out.forfeited);
    }
    clock.advance_ms(turn_ms);
    let out = service.advance_turn_if_expired(&id).await.unwrap();
    assert!(out.advanced);
    assert!(out.forfeited);

    let record = service.store().get(&id).unwrap();
    assert_eq!(record.status, GameStatus::Finished);
    assert_eq!(record.win_reason, Some(WinReason::TimeoutForfeit));
    assert_eq!(
        record.winner_player_id,
        record.opponent_id(&first_holder)
    );
    assert_eq!(record.player(&first_holder).unwrap().timeout_count, 3);

    // Polling a finished game self-heals to a no-op.
    let out = service.advance_turn_if_expired(&id).await.unwrap();
    assert!(!out.advanced);
    assert!(!out.forfeited);
}

#[tokio::test]
async fn a_shot_resets_the_timeout_streak() {
    let (service, clock) = service();
    let id = battle(&service, &clock).await;

    let first_holder = service
        .store()
        .get(&id)
        .unwrap()
        .current_turn_player_id
        .clone()
        .unwrap();
    let other = service
        .store()
        .get(&id)
        .unwrap()
        .opponent_id(&first_holder)
        .unwrap();

    let turn_ms = *service.config().turn_ms();
    clock.advance_ms(turn_ms);
    service.advance_turn_if_expired(&id).await.unwrap();
    assert_eq!(
        service.store().get(&id).unwrap().player(&first_holder).unwrap().timeout_count,
        1
    );

    // The other player shoots; the turn returns; this time the first
    // holder fires instead of idling.
    service.fire_shot(&id, &other, Coord::new(9, 9)).await.unwrap();
    service
        .fire_shot(&id, &first_holder, Coord::new(9, 9))
        .await
        .unwrap();
    assert_eq!(
        service.store().get(&id).unwrap().player(&first_holder).unwrap().timeout_count,
        0
    );
}

#[tokio::test]
async fn forfeit_hands_the_win_to_the_opponent() {
    let (service, clock) = service();
    let id = battle(&service, &clock).await;

    service.forfeit_game(&id, "p1").unwrap();
    let record = service.store().get(&id).unwrap();
    assert_eq!(record.status, GameStatus::Finished);
    assert_eq!(record.winner_player_id, Some("p2".to_string()));
    assert_eq!(record.win_reason, Some(WinReason::Forfeit));

    // Forfeiting twice is a phase error.
    assert_eq!(
        service.forfeit_game(&id, "p2"),
        Err(GameError::Phase {
            expected: GameStatus::Battle,
            actual: GameStatus::Finished,
        })
    );
}

#[tokio::test]
async fn lobby_forfeit_with_no_opponent_records_no_winner() {
    let (service, _clock) = service();
    let game = service.create_game("p1", GameMode::Pvp).unwrap();
    service.forfeit_game(&game.id, "p1").unwrap();

    let record = service.store().get(&game.id).unwrap();
    assert_eq!(record.status, GameStatus::Finished);
    assert_eq!(record.winner_player_id, None);
    assert_eq!(record.win_reason, Some(WinReason::Forfeit));
}

#[tokio::test]
async fn countdown_forfeit_is_rejected() {
    let (service, _clock) = service();
    let game = service.create_game("p1", GameMode::Pvp).unwrap();
    service.join_game(&game.id, "p2").unwrap();
    service.set_ready(&game.id, "p1", true).unwrap();
    service.set_ready(&game.id, "p2", true).unwrap();
    assert!(matches!(
        service.forfeit_game(&game.id, "p1"),
        Err(GameError::Phase { .. })
    ));
}

#[tokio::test]
async fn views_redact_the_opponents_fleet() {
    let (service, clock) = service();
    let id = battle(&service, &clock).await;

    let view = service.get_game(&id, "p1").unwrap();
    assert_eq!(view.boards["p1"].ships.len(), 5);
    assert!(view.boards["p2"].ships.is_empty());

    let view = service.get_game(&id, "p2").unwrap();
    assert!(view.boards["p1"].ships.is_empty());
    assert_eq!(view.boards["p2"].ships.len(), 5);
}

#[tokio::test]
async fn hover_is_shown_to_the_opponent_until_stale() {
    let (service, clock) = service();
    let id = battle(&service, &clock).await;

    let record = service.store().get(&id).unwrap();
    let holder = record.current_turn_player_id.clone().unwrap();
    let other = record.opponent_id(&holder).unwrap();

    // Only the turn-holder may hover, and only on the board.
    assert_eq!(
        service.set_hover(&id, &other, Coord::new(3, 3)),
        Err(GameError::NotYourTurn)
    );
    assert_eq!(
        service.set_hover(&id, &holder, Coord::new(0, 10)),
        Err(GameError::OutOfBounds {
            coord: Coord::new(0, 10),
        })
    );

    service.set_hover(&id, &holder, Coord::new(3, 3)).unwrap();
    let view = service.get_game(&id, &other).unwrap();
    assert_eq!(view.enemy_hover_coord, Some(Coord::new(3, 3)));
    // The hoverer never sees their own cursor echoed back.
    let view = service.get_game(&id, &holder).unwrap();
    assert_eq!(view.enemy_hover_coord, None);

    clock.advance_ms(*service.config().hover_staleness_ms() + 1);
    let view = service.get_game(&id, &other).unwrap();
    assert_eq!(view.enemy_hover_coord, None);
}

#[tokio::test]
async fn hover_clears_when_the_turn_passes() {
    let (service, clock) = service();
    let id = battle(&service, &clock).await;

    let record = service.store().get(&id).unwrap();
    let holder = record.current_turn_player_id.clone().unwrap();
    let other = record.opponent_id(&holder).unwrap();

    service.set_hover(&id, &holder, Coord::new(3, 3)).unwrap();
    service.fire_shot(&id, &holder, Coord::new(9, 9)).await.unwrap();

    assert_eq!(service.store().get(&id).unwrap().hover, None);
    let view = service.get_game(&id, &other).unwrap();
    assert_eq!(view.enemy_hover_coord, None);
}

#[tokio::test]
async fn event_log_is_gapless_and_paginates() {
    let (service, clock) = service();
    let id = battle(&service, &clock).await;

    let total = service.store().event_count(&id);
    assert!(total > 0);

    let mut seqs = Vec::new();
    let mut cursor = None;
    loop {
        let page = service.list_game_events(&id, 3, cursor).unwrap();
        assert!(page.events.len() <= 3);
        seqs.extend(page.events.iter().map(|e| e.seq));
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    assert_eq!(seqs.len(), total);
    assert_eq!(seqs, (1..=total as u64).collect::<Vec<u64>>());

    let page = service.list_game_events(&id, 100, None).unwrap();
    assert_eq!(page.events[0].kind, EventKind::GameCreated);
    assert_eq!(
        page.events.last().unwrap().kind,
        EventKind::BattleStarted
    );
}

#[tokio::test]
async fn list_games_orders_newest_first() {
    let (service, clock) = service();
    let a = service.create_game("p1", GameMode::Pvp).unwrap();
    clock.advance_ms(1_000);
    let b = service.create_game("p1", GameMode::Pvp).unwrap();

    let summaries = service.list_games();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].id, b.id);
    assert_eq!(summaries[1].id, a.id);
}
