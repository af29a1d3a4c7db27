//! Dynamic-programming agents plan their way across the 4x4 grid world
//! from exploration data alone.
use rlab_core::dummy::DummyGridEnv;
use rlab_core::Env;
use rlab_tabular_agent::{PolicyIter, PolicyIterConfig, ValueIter, ValueIterConfig};

const EXPLORATION_STEPS: usize = 20_000;
const MAX_ROLLOUT_STEPS: usize = 30;

#[test]
fn value_iteration_plans_a_path_to_the_goal() {
    fastrand::seed(11);
    let mut agent = ValueIter::new(DummyGridEnv::new(), ValueIterConfig::default().gamma(0.9));

    for _ in 0..EXPLORATION_STEPS {
        let (_, _, done) = agent.random_step();
        if done {
            agent.env_mut().restart_environment();
        }
    }

    let record = agent.update_values();
    assert!(record.get_scalar("delta").unwrap() <= 1e-3);

    agent.env_mut().restart_environment();
    let mut outcome = None;
    for _ in 0..MAX_ROLLOUT_STEPS {
        let (_, reward, done) = agent.step();
        if done {
            outcome = Some(reward);
            break;
        }
    }
    assert_eq!(outcome, Some(200.0), "rollout must end at the goal cell");
}

#[test]
fn policy_iteration_plans_a_path_to_the_goal() {
    fastrand::seed(13);
    let mut agent = PolicyIter::new(DummyGridEnv::new(), PolicyIterConfig::default().gamma(0.9));

    for _ in 0..EXPLORATION_STEPS {
        let (_, _, done) = agent.random_step();
        if done {
            agent.env_mut().restart_environment();
        }
    }

    agent.evaluate_policy();

    // Policy stability: one more improvement pass changes nothing.
    let policy = agent.policy().clone();
    agent.improve_policy();
    assert_eq!(agent.policy(), &policy);

    agent.env_mut().restart_environment();
    let mut outcome = None;
    for _ in 0..MAX_ROLLOUT_STEPS {
        let (_, reward, done) = agent.step();
        if done {
            outcome = Some(reward);
            break;
        }
    }
    assert_eq!(outcome, Some(200.0), "rollout must end at the goal cell");
}
