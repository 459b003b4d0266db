use npc_core::Vec3;
use npc_nav::{MovementRecovery, RecoveryConfig, RecoveryStep, RecoveryStrategy};

fn stuck_agent() -> MovementRecovery {
    let mut recovery = MovementRecovery::new(RecoveryConfig::default());
    recovery.set_target(Vec3::new(50.0, 64.0, 50.0));
    recovery
}

/// Feed a motionless position every tick and collect the strategies issued.
fn run_motionless(recovery: &mut MovementRecovery, ticks: u64) -> Vec<RecoveryStrategy> {
    let pos = Vec3::new(0.5, 64.0, 0.5);
    let mut issued = Vec::new();
    for tick in 0..ticks {
        if let RecoveryStep::Recover(strategy) = recovery.observe(tick, pos) {
            issued.push(strategy);
            recovery.resolve(strategy, false);
        }
    }
    issued
}

#[test]
fn zero_displacement_escalates_in_strict_order() {
    let mut recovery = stuck_agent();
    let issued = run_motionless(&mut recovery, 20 + 60 * 5 + 1);

    assert_eq!(
        issued,
        vec![
            RecoveryStrategy::Repath,
            RecoveryStrategy::Repath,
            RecoveryStrategy::RandomOffset,
            RecoveryStrategy::Unembed,
            RecoveryStrategy::EmergencyTeleport,
        ]
    );
    // The emergency rung ends the episode.
    assert_eq!(recovery.failures(), 0);
    assert_eq!(recovery.last_strategy(), None);
}

#[test]
fn ladder_never_regresses_within_an_episode() {
    let mut recovery = stuck_agent();
    let issued = run_motionless(&mut recovery, 20 + 60 * 4 + 1);

    let mut seen_random_offset = false;
    for pair in issued.windows(2) {
        assert!(pair[0] <= pair[1], "regressed from {:?} to {:?}", pair[0], pair[1]);
    }
    for strategy in issued {
        if strategy == RecoveryStrategy::RandomOffset {
            seen_random_offset = true;
        }
        if seen_random_offset {
            assert_ne!(strategy, RecoveryStrategy::Repath);
        }
    }
}

#[test]
fn progress_resets_the_episode() {
    let mut recovery = stuck_agent();
    let pos = Vec3::new(0.5, 64.0, 0.5);
    for tick in 0..=80 {
        recovery.observe(tick, pos);
    }
    assert_eq!(recovery.failures(), 1);

    let moved = Vec3::new(3.5, 64.0, 0.5);
    assert_eq!(recovery.observe(100, moved), RecoveryStep::Progressing);
    assert_eq!(recovery.failures(), 0);
    assert_eq!(recovery.stall_ticks(), 0);
}

#[test]
fn successful_intervention_clears_to_progressing() {
    let mut recovery = stuck_agent();
    let pos = Vec3::new(0.5, 64.0, 0.5);
    let mut tick = 0;
    loop {
        if let RecoveryStep::Recover(strategy) = recovery.observe(tick, pos) {
            if strategy == RecoveryStrategy::Unembed {
                recovery.resolve(strategy, true);
                break;
            }
            recovery.resolve(strategy, false);
        }
        tick += 1;
        assert!(tick < 10_000, "never reached the unembed rung");
    }

    assert_eq!(recovery.failures(), 0);
    assert!(!recovery.is_stuck());
}

#[test]
fn arrival_clears_target() {
    let mut recovery = MovementRecovery::default();
    recovery.set_target(Vec3::new(1.0, 64.0, 1.0));
    assert_eq!(
        recovery.observe(5, Vec3::new(1.2, 64.0, 1.0)),
        RecoveryStep::Arrived
    );
    assert_eq!(recovery.target(), None);
    assert_eq!(recovery.observe(6, Vec3::ZERO), RecoveryStep::Idle);
}

#[test]
fn samples_only_at_interval() {
    let mut recovery = stuck_agent();
    let pos = Vec3::ZERO;
    assert_eq!(recovery.observe(0, pos), RecoveryStep::Progressing);
    for tick in 1..20 {
        assert_eq!(recovery.observe(tick, pos), RecoveryStep::Idle);
    }
    assert_eq!(
        recovery.observe(20, pos),
        RecoveryStep::Stalled { stall_ticks: 20 }
    );
}

#[test]
fn reaching_a_detour_resumes_the_destination() {
    let destination = Vec3::new(10.5, 64.0, 0.5);
    let detour = Vec3::new(0.5, 64.0, 5.5);
    let mut recovery = MovementRecovery::default();
    recovery.set_target(destination);
    recovery.begin_detour(detour);

    assert_eq!(recovery.target(), Some(destination));
    assert_eq!(recovery.heading(), Some(detour));
    assert_eq!(
        recovery.observe(10, Vec3::new(0.5, 64.0, 5.0)),
        RecoveryStep::Resume(destination)
    );
    assert_eq!(recovery.detour(), None);
    assert_eq!(recovery.heading(), Some(destination));
}

#[test]
fn detours_need_a_destination_and_end_with_the_episode() {
    let mut recovery = MovementRecovery::default();
    recovery.begin_detour(Vec3::new(1.0, 64.0, 1.0));
    assert_eq!(recovery.heading(), None);

    let mut recovery = stuck_agent();
    recovery.begin_detour(Vec3::new(3.0, 64.0, 3.0));
    recovery.resolve(RecoveryStrategy::EmergencyTeleport, true);
    assert_eq!(recovery.detour(), None);
    assert_eq!(recovery.target(), Some(Vec3::new(50.0, 64.0, 50.0)));
}
