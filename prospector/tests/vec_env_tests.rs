// tests/vec_env_tests.rs
//
// Batched stepping must match independent single-instance stepping exactly.

use prospector::{EngineConfig, EnvError, ProspectorEnv, Suite, VecEnv, OBS_DIM};

#[test]
fn batched_matches_individual_envs() {
    let cfg = EngineConfig::short(400.0);
    let seeds = [3u64, 14, 15, 92];
    let actions: Vec<Vec<i64>> = seeds.iter().map(|&s| Suite::A.actions(250, s + 1000)).collect();

    let mut vec_env = VecEnv::new(seeds.len(), cfg, 0);
    let obs = vec_env.reset_all(Some(&seeds));
    assert_eq!(obs.len(), seeds.len() * OBS_DIM);

    let mut singles: Vec<ProspectorEnv> = seeds
        .iter()
        .map(|&s| {
            let mut env = ProspectorEnv::new(cfg, s);
            env.reset(Some(s));
            env
        })
        .collect();

    for (i, env) in singles.iter().enumerate() {
        assert_eq!(&obs[i * OBS_DIM..(i + 1) * OBS_DIM], env.observe().as_slice());
    }

    let mut restarts = vec![0u64; seeds.len()];
    for t in 0..250 {
        let step_actions: Vec<i64> = actions.iter().map(|a| a[t]).collect();
        let batch = vec_env.step_raw(&step_actions).unwrap();
        assert_eq!(batch.len(), seeds.len());

        for (i, env) in singles.iter_mut().enumerate() {
            let r = env.step_raw(step_actions[i]).unwrap();
            assert_eq!(batch.observation(i), r.observation.as_slice(), "t={t} env={i}");
            assert_eq!(batch.rewards[i], r.reward);
            assert_eq!(batch.terminated[i], r.terminated);
            assert_eq!(batch.truncated[i], r.truncated);
            assert_eq!(batch.infos[i], r.info);

            if r.done() {
                restarts[i] += 1;
                let next = seeds[i] + restarts[i];
                env.reset(Some(next));
                let (row, _) = vec_env.reset_one(i, Some(next)).unwrap();
                assert_eq!(row.as_slice(), env.observe().as_slice());
            }
        }
    }
    assert!(restarts.iter().any(|&r| r > 0), "short budget should force restarts");
}

#[test]
fn default_seeds_follow_base_seed() {
    let mut vec_env = VecEnv::new(3, EngineConfig::default(), 100);
    assert_eq!(vec_env.seeds(), vec![100, 101, 102]);
    let a = vec_env.reset_all(None);
    let b = vec_env.reset_all(None);
    assert_eq!(a, b);

    let mut single = ProspectorEnv::new(EngineConfig::default(), 101);
    single.reset(Some(101));
    assert_eq!(&a[OBS_DIM..2 * OBS_DIM], single.observe().as_slice());
}

#[test]
fn batch_errors_leave_every_instance_untouched() {
    let mut vec_env = VecEnv::new(2, EngineConfig::default(), 0);
    assert_eq!(vec_env.step(&[6, 6]), Err(EnvError::NotReset));

    vec_env.reset_all(None);
    assert_eq!(
        vec_env.step(&[6]),
        Err(EnvError::BatchSizeMismatch {
            expected: 2,
            got: 1
        })
    );

    // Finish instance 1 only; the next batch must fail before instance 0 moves.
    let batch = vec_env.step(&[6, 68]).unwrap();
    assert!(!batch.done(0));
    assert!(batch.done(1));
    assert_eq!(vec_env.dones(), vec![false, true]);

    let tick_before = vec_env.env(0).unwrap().tick();
    assert_eq!(vec_env.step(&[6, 6]), Err(EnvError::EpisodeDone));
    assert_eq!(vec_env.env(0).unwrap().tick(), tick_before);

    vec_env.reset_one(1, None).unwrap();
    assert!(vec_env.step(&[6, 6]).is_ok());
    assert!(vec_env.reset_one(5, None).is_none());
}
