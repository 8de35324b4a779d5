// tests/env_invariants_tests.rs
//
// State invariants under long random rollouts, including restarts.

use prospector::constants::*;
use prospector::observation::{ASTEROID_BASE, ASTEROID_STRIDE, PRICE_DELTA_INDEX, INVENTORY_INDEX};
use prospector::{EngineConfig, Policy, ProspectorEnv, RandomPolicy};

fn check_state(env: &ProspectorEnv) {
    let ship = env.ship();
    assert!((0.0..=FUEL_MAX).contains(&ship.fuel), "fuel {}", ship.fuel);
    assert!((0.0..=HULL_MAX).contains(&ship.hull), "hull {}", ship.hull);
    assert!((0.0..=HEAT_MAX).contains(&ship.heat), "heat {}", ship.heat);
    assert!((0.0..=TOOL_MAX).contains(&ship.tool_condition));
    assert!((0.0..=ALERT_MAX).contains(&ship.alert));
    assert!(ship.time_remaining >= 0.0 && ship.time_remaining <= env.config().time_max);
    assert!(ship.cargo.iter().all(|&c| c >= 0.0));
    assert!(ship.cargo_sum() <= CARGO_MAX + 1e-3, "cargo {}", ship.cargo_sum());
    assert!(ship.credits >= 0.0);

    let world = env.world();
    for (c, m) in world.market.commodities.iter().enumerate() {
        assert!(
            (PRICE_MIN[c]..=PRICE_MAX[c]).contains(&m.price),
            "commodity {c} price {}",
            m.price
        );
        assert!(m.inventory >= 0.0);
    }
    for field in &world.asteroids {
        for a in field.iter().flatten() {
            let truth: f32 = a.true_comp.iter().sum();
            let est: f32 = a.comp_est.iter().sum();
            assert!((truth - 1.0).abs() < 1e-4);
            assert!((est - 1.0).abs() < 1e-4);
            assert!((0.0..=1.0).contains(&a.depletion));
            assert!((0.0..=1.0).contains(&a.scan_conf));
        }
    }
}

fn check_observation(values: &[f32]) {
    assert_eq!(values.len(), OBS_DIM);
    for (i, &v) in values.iter().enumerate() {
        assert!(v.is_finite(), "obs[{i}] not finite");
        if (PRICE_DELTA_INDEX..INVENTORY_INDEX).contains(&i) {
            assert!((-1.0..=1.0).contains(&v), "obs[{i}] = {v}");
        } else {
            assert!((0.0..=1.0).contains(&v), "obs[{i}] = {v}");
        }
    }
    let selected = (0..MAX_ASTEROIDS)
        .filter(|a| values[ASTEROID_BASE + ASTEROID_STRIDE * a + 10] > 0.5)
        .count();
    assert!(selected <= 1);
}

#[test]
fn random_rollouts_respect_bounds() {
    for seed in [0u64, 1, 7, 123] {
        let mut env = ProspectorEnv::new(EngineConfig::short(600.0), seed);
        let (obs, _) = env.reset(Some(seed));
        check_observation(&obs.values);
        let mut policy = RandomPolicy::with_range(seed + 1000, -5, 75);

        let mut ticks = 0u64;
        let mut episodes = 0;
        while ticks < 1500 {
            let action = policy.act(&env.observe());
            let r = env.step_raw(action).unwrap();
            ticks += r.info.dt as u64;
            assert!(r.reward.is_finite());
            assert!(r.info.dt >= 1);
            assert!(!(r.terminated && r.truncated));
            check_observation(r.observation.as_slice());
            check_state(&env);
            if r.done() {
                episodes += 1;
                env.reset(Some(seed + episodes));
            }
        }
    }
}

#[test]
fn invalid_codes_are_flagged_and_executed_as_hold() {
    let mut env = ProspectorEnv::new(EngineConfig::default(), 9);
    env.reset(Some(9));
    for raw in [-1i64, 69, 70, 255, 1 << 40] {
        let r = env.step_raw(raw).unwrap();
        assert!(r.info.invalid_action, "{raw}");
        assert_eq!(r.info.action, 6);
        assert_eq!(r.info.action_received, raw);
        assert_eq!(r.info.dt, 1);
    }
}

#[test]
fn info_metrics_are_consistent() {
    let mut env = ProspectorEnv::new(EngineConfig::default(), 21);
    env.reset(Some(21));
    let mut policy = RandomPolicy::new(21);
    let mut elapsed = 0.0f32;
    for _ in 0..300 {
        let r = env.step_raw(policy.act(&env.observe())).unwrap();
        elapsed += r.info.dt as f32;
        assert_eq!(r.info.time_remaining, env.ship().time_remaining);
        assert!((r.info.net_profit - (env.ship().credits - env.ship().total_spend)).abs() < 1e-3);
        assert!(r.info.fuel_used >= 0.0);
        assert!((0.0..=1.0).contains(&r.info.cargo_utilization_avg));
        if r.done() {
            break;
        }
    }
    assert_eq!(env.tick() as f32, elapsed);
}
