use std::time::{Duration, Instant};

use tilepop::{
    GameConfig, Grid, MatchFinder, Phase, Position, RenderBatch, RoundController, RoundEvent,
    RngTileSource, Selection, SequenceSource, SpecialKind, TickOutcome, TileSource,
};

fn board() -> Grid {
    let mut rows: Vec<Vec<u8>> = (0..8)
        .map(|r| (0..8).map(|c| if (r + c) % 2 == 0 { 0 } else { 2 }).collect())
        .collect();
    for (r, c) in [(3, 3), (2, 3), (3, 4), (4, 3), (4, 2)] {
        rows[r][c] = 1;
    }
    let refs: Vec<&[u8]> = rows.iter().map(Vec::as_slice).collect();
    Grid::from_rows(&refs, 4).unwrap()
}

fn scripted() -> RoundController<SequenceSource> {
    let source = SequenceSource::new(vec![3]).with_picks(vec![0]);
    RoundController::with_grid(GameConfig::default(), board(), source).unwrap()
}

fn count_round_ends(events: &[RoundEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, RoundEvent::RoundEnded { .. }))
        .count()
}

/// Acknowledge batches until the resolution settles.
fn settle<S: TileSource>(rc: &mut RoundController<S>) {
    let mut played: Vec<RenderBatch> = Vec::new();
    while rc.animation_in_flight() {
        rc.flush(&mut played);
        rc.on_animation_batch_complete().unwrap();
    }
    rc.flush(&mut played);
}

#[test]
fn test_ten_idle_ticks_end_round_once() {
    let now = Instant::now();
    let mut rc = scripted();
    rc.begin();
    rc.start(now);
    assert_eq!(rc.level(), 1);

    let outcomes: Vec<TickOutcome> = (0..10).map(|_| rc.on_tick()).collect();
    assert_eq!(outcomes[0], TickOutcome::Counted(9));
    assert_eq!(outcomes[9], TickOutcome::RoundEnded);
    assert_eq!(rc.on_tick(), TickOutcome::Ignored);

    let events = rc.drain_events();
    assert_eq!(count_round_ends(&events), 1);
    assert_eq!(rc.level(), 2);
    assert_eq!(rc.phase(), Phase::LevelIntro);
    assert!(!rc.timer_running());
}

#[test]
fn test_selection_scores_after_both_batches() {
    let now = Instant::now();
    let mut rc = scripted();
    rc.begin();
    rc.start(now);
    let later = now + Duration::from_secs(1);

    let sel = rc.on_cell_selected(Position::new(3, 3), later).unwrap();
    assert_eq!(sel, Selection::Removed(5));
    assert_eq!(rc.phase(), Phase::Resolving);
    assert_eq!(rc.score(), 0);
    // input is closed while resolving
    assert_eq!(
        rc.on_cell_selected(Position::new(0, 0), later).unwrap(),
        Selection::Ignored
    );

    settle(&mut rc);
    assert_eq!(rc.score(), 10);
    assert_eq!(rc.phase(), Phase::Playing);
    assert!(rc.grid().is_full());
    assert!(rc.can_interact(later));
}

#[test]
fn test_round_end_deferred_until_resolution_finishes() {
    let now = Instant::now();
    let mut rc = scripted();
    rc.begin();
    rc.start(now);
    let later = now + Duration::from_secs(1);
    rc.on_cell_selected(Position::new(3, 3), later).unwrap();

    for n in 1..=10 {
        assert_eq!(rc.on_tick(), TickOutcome::Deferred(n));
    }
    assert_eq!(count_round_ends(&rc.drain_events()), 0);
    assert_eq!(rc.level(), 1);

    settle(&mut rc);
    let events = rc.drain_events();
    assert_eq!(count_round_ends(&events), 1);
    assert!(events.iter().any(|e| matches!(e, RoundEvent::Cleared { cells: 5, score: 10 })));
    assert_eq!(rc.level(), 2);
    assert_eq!(rc.phase(), Phase::LevelIntro);
}

/// Pop the first qualifying region on the board. Returns false if none exists.
fn pop_any<S: TileSource>(rc: &mut RoundController<S>, now: Instant) -> bool {
    let finder = MatchFinder::new(rc.config().match_threshold).unwrap();
    let target = rc.grid().positions().find(|&p| {
        finder
            .find_region(rc.grid(), p)
            .is_ok_and(|r| finder.qualifies(&r))
    });
    let Some(pos) = target else {
        return false;
    };
    let removed = matches!(rc.on_cell_selected(pos, now), Ok(Selection::Removed(_)));
    settle(rc);
    removed
}

#[test]
fn test_markers_never_touch_hero() {
    for seed in 0..40u64 {
        let config = GameConfig {
            score_per_clear: 100,
            seed: Some(seed),
            ..GameConfig::default()
        };
        let mut rc = RoundController::new(config, RngTileSource::new(4, Some(seed))).unwrap();
        rc.begin();
        let hero = rc.hero();
        let mut placed = 0;
        for _ in 0..3 {
            let now = Instant::now();
            rc.start(now);
            pop_any(&mut rc, now + Duration::from_secs(1));
            while rc.phase() == Phase::Playing {
                rc.on_tick();
            }
            for event in rc.drain_events() {
                if let RoundEvent::MarkersPlaced { key, locked_door } = event {
                    let (Some(key), Some(door)) = (key, locked_door) else {
                        panic!("seed {seed}: marker missing");
                    };
                    assert_ne!(key, door);
                    assert!(!key.is_adjacent(hero), "seed {seed}: key {key} next to hero {hero}");
                    assert!(!door.is_adjacent(hero), "seed {seed}: door {door} next to hero {hero}");
                    placed += 1;
                }
            }
        }
        assert!(placed >= 1, "seed {seed}");
    }
}

#[test]
fn test_gate_respects_level_score() {
    // one pop scores 25 with this config; entering level 2 needs more than 20
    let config = GameConfig {
        score_per_clear: 25,
        ..GameConfig::default()
    };
    let source = SequenceSource::new(vec![3]).with_picks(vec![0]);
    let mut rc = RoundController::with_grid(config, board(), source).unwrap();
    rc.begin();
    let now = Instant::now();
    rc.start(now);
    assert!(pop_any(&mut rc, now + Duration::from_secs(1)));
    while rc.phase() == Phase::Playing {
        rc.on_tick();
    }
    assert_eq!(rc.level(), 2);
    assert!(rc.grid().find_special(SpecialKind::Key).is_some());
    assert!(rc.grid().find_special(SpecialKind::LockedDoor).is_some());
}
