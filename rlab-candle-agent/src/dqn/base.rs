//! DQN agent.
use super::{config::DqnConfig, explorer::EpsilonGreedy, model::QNet};
use crate::util::{smooth_l1_loss, track, CriticLoss};
use anyhow::Result;
use candle_core::{shape::D, Device, Tensor};
use candle_nn::loss::mse;
use log::trace;
use rand::{rngs::StdRng, SeedableRng};
use rlab_core::{
    replay_buffer::{ReplayBuffer, Transition},
    Agent, AgentKind, VectorEnv,
};
use std::{fs, path::Path};

/// Deep Q-Network agent.
///
/// Per learning step: select an action (epsilon-greedy over the online
/// network, or a supplied random action), execute it, append the transition
/// to the replay buffer, and, once the buffer holds more than a batch of
/// transitions, regress the online network toward the target network's TD
/// targets. Every `sync_interval` executed learning steps the target
/// network is overwritten wholesale with the online parameters; partial
/// copies never happen.
///
/// [`Dqn::eval_step`] bypasses exploration, the replay buffer, and the
/// gradient path entirely.
pub struct Dqn<E: VectorEnv> {
    env: E,
    qnet: QNet,
    qnet_tgt: QNet,
    replay_buffer: ReplayBuffer<Vec<f32>, usize>,
    explorer: EpsilonGreedy,
    gamma: f64,
    batch_size: usize,
    sync_interval: usize,
    critic_loss: CriticLoss,
    n_steps: usize,
    obs_dim: usize,
    device: Device,
    rng: StdRng,
    config: DqnConfig,
}

impl<E: VectorEnv> Dqn<E> {
    /// Constructs the agent around an environment.
    ///
    /// The target network starts as an exact copy of the online network.
    pub fn build(env: E, config: DqnConfig) -> Result<Self> {
        let device: Device = config.device.into();
        let qnet = QNet::build(&config.qnet_config, &device)?;
        let qnet_tgt = QNet::build(&config.qnet_config, &device)?;
        track(qnet_tgt.varmap(), qnet.varmap(), 1.0)?;

        let obs_dim = env.obs_dim();
        Ok(Self {
            env,
            qnet,
            qnet_tgt,
            replay_buffer: ReplayBuffer::build(&config.replay_buffer_config),
            explorer: config.explorer.clone(),
            gamma: config.gamma,
            batch_size: config.batch_size,
            sync_interval: config.sync_interval,
            critic_loss: config.critic_loss,
            n_steps: 0,
            obs_dim,
            device,
            rng: StdRng::seed_from_u64(config.seed),
            config,
        })
    }

    /// Performs one learning step with an epsilon-greedy action.
    ///
    /// Returns the new state, the reward, and whether the episode ended.
    pub fn step(&mut self) -> Result<(Vec<f32>, f32, bool)> {
        let act = if self.explorer.is_random(&mut self.rng) {
            self.env.random_action()
        } else {
            self.greedy_action()?
        };
        self.learn_step(act)
    }

    /// Performs one learning step with a uniformly random action.
    pub fn random_step(&mut self) -> Result<(Vec<f32>, f32, bool)> {
        let act = self.env.random_action();
        self.learn_step(act)
    }

    /// Performs one pure-inference step with the greedy action; nothing is
    /// recorded and no learning happens.
    pub fn eval_step(&mut self) -> Result<(Vec<f32>, f32, bool)> {
        let act = self.greedy_action()?;
        let (new_state, reward, done) = self.env.execute_action(&act);
        Ok((new_state, reward, done))
    }

    fn greedy_action(&self) -> Result<usize> {
        let obs = self.env.current_state();
        let obs = Tensor::from_vec(obs, (1, self.obs_dim), &self.device)?;
        let q = self.qnet.forward(&obs)?;
        let act = q.argmax(D::Minus1)?.to_vec1::<u32>()?[0];
        Ok(act as usize)
    }

    fn learn_step(&mut self, act: usize) -> Result<(Vec<f32>, f32, bool)> {
        let origin = self.env.current_state();
        let (new_state, reward, done) = self.env.execute_action(&act);
        self.replay_buffer.push(Transition {
            obs: origin,
            act,
            reward,
            next_obs: new_state.clone(),
            is_done: done,
        });

        if self.replay_buffer.len() > self.batch_size {
            let loss = self.backward_pass()?;
            trace!("loss_critic = {}", loss);
        }

        self.n_steps += 1;
        if self.n_steps % self.sync_interval == 0 {
            trace!("sync target network at step {}", self.n_steps);
            track(self.qnet_tgt.varmap(), self.qnet.varmap(), 1.0)?;
        }

        Ok((new_state, reward, done))
    }

    /// One minibatch regression of the online network toward
    /// `reward + gamma * max_a' Q_tgt(new_state, a')`, zeroed where the
    /// episode ended.
    fn backward_pass(&mut self) -> Result<f32> {
        let batch = self.replay_buffer.batch(self.batch_size)?;
        let batch_size = batch.len();

        let obs = Tensor::from_vec(
            batch.obs.concat(),
            (batch_size, self.obs_dim),
            &self.device,
        )?;
        let next_obs = Tensor::from_vec(
            batch.next_obs.concat(),
            (batch_size, self.obs_dim),
            &self.device,
        )?;
        let act = {
            let act: Vec<i64> = batch.act.iter().map(|a| *a as i64).collect();
            Tensor::from_vec(act, (batch_size, 1), &self.device)?
        };
        let reward = Tensor::from_vec(batch.reward, (batch_size,), &self.device)?;
        let not_done = {
            let not_done: Vec<f32> = batch
                .is_done
                .iter()
                .map(|done| if *done { 0.0 } else { 1.0 })
                .collect();
            Tensor::from_vec(not_done, (batch_size,), &self.device)?
        };

        let pred = self
            .qnet
            .forward(&obs)?
            .gather(&act, D::Minus1)?
            .squeeze(D::Minus1)?;

        let tgt = {
            let q = {
                let x = self.qnet_tgt.forward(&next_obs)?;
                let y = x.argmax(D::Minus1)?;
                x.gather(&y.unsqueeze(D::Minus1)?, D::Minus1)?
                    .squeeze(D::Minus1)?
            };
            (reward + ((not_done * self.gamma)? * q)?)?
        }
        .detach();

        let loss = match self.critic_loss {
            CriticLoss::Mse => mse(&pred, &tgt)?,
            CriticLoss::SmoothL1 => smooth_l1_loss(&pred, &tgt)?,
        };
        self.qnet.backward_step(&loss)?;

        Ok(loss.to_scalar::<f32>()?)
    }

    /// Saves the online and target network parameters into the given
    /// directory.
    pub fn save_params<T: AsRef<Path>>(&self, path: T) -> Result<()> {
        fs::create_dir_all(&path)?;
        self.qnet
            .save(path.as_ref().join("qnet.safetensors").as_path())?;
        self.qnet_tgt
            .save(path.as_ref().join("qnet_tgt.safetensors").as_path())?;
        Ok(())
    }

    /// Loads previously persisted parameters into the online network and
    /// copies them into the target network, e.g. for evaluation-only runs.
    ///
    /// A missing or malformed parameter file is reported to the caller; the
    /// randomly initialized network is never silently used instead.
    pub fn load_params<T: AsRef<Path>>(&mut self, path: T) -> Result<()> {
        self.qnet
            .load(path.as_ref().join("qnet.safetensors").as_path())?;
        track(self.qnet_tgt.varmap(), self.qnet.varmap(), 1.0)?;
        Ok(())
    }

    /// Number of transitions currently held by the replay buffer.
    pub fn replay_buffer_len(&self) -> usize {
        self.replay_buffer.len()
    }

    /// The online network.
    pub fn qnet(&self) -> &QNet {
        &self.qnet
    }

    /// The target network.
    pub fn qnet_tgt(&self) -> &QNet {
        &self.qnet_tgt
    }

    /// Current epsilon of the exploration schedule.
    pub fn eps(&self) -> f64 {
        self.explorer.eps()
    }

    /// The wrapped environment.
    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }
}

impl<E: VectorEnv> Agent for Dqn<E> {
    fn kind(&self) -> AgentKind {
        AgentKind::Dqn
    }

    fn reset(&mut self) {
        self.qnet =
            QNet::build(&self.config.qnet_config, &self.device).expect("failed to rebuild Q-network");
        self.qnet_tgt =
            QNet::build(&self.config.qnet_config, &self.device).expect("failed to rebuild Q-network");
        track(self.qnet_tgt.varmap(), self.qnet.varmap(), 1.0)
            .expect("failed to synchronize the target network");
        self.replay_buffer = ReplayBuffer::build(&self.config.replay_buffer_config);
        self.explorer = self.config.explorer.clone();
        self.n_steps = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mlp::{Activation, MlpConfig},
        opt::OptimizerConfig,
        util::varmaps_equal,
    };
    use rlab_core::dummy::DummyVecEnv;
    use rlab_core::Env;

    fn config(sync_interval: usize) -> DqnConfig {
        let mlp_config = MlpConfig::new(1, vec![4], 2, Activation::None);
        let mut config = DqnConfig::new(1, 2)
            .batch_size(2)
            .sync_interval(sync_interval)
            .gamma(0.9);
        config.qnet_config.mlp_config = mlp_config;
        config.qnet_config.opt_config = OptimizerConfig::Adam { lr: 0.01 };
        config
    }

    fn agent(sync_interval: usize) -> Dqn<DummyVecEnv> {
        Dqn::build(DummyVecEnv::new(), config(sync_interval)).unwrap()
    }

    fn run_learning_steps(agent: &mut Dqn<DummyVecEnv>, n: usize) {
        for _ in 0..n {
            let (_, _, done) = agent.random_step().unwrap();
            if done {
                agent.env_mut().restart_environment();
            }
        }
    }

    #[test]
    fn target_starts_as_an_exact_copy() {
        let agent = agent(1000);
        assert!(varmaps_equal(agent.qnet().varmap(), agent.qnet_tgt().varmap()).unwrap());
    }

    #[test]
    fn target_syncs_exactly_at_the_interval() {
        let mut agent = agent(5);

        // Gradient steps run from the third step on, so online and target
        // diverge until the fifth step copies the online parameters over.
        run_learning_steps(&mut agent, 4);
        assert!(!varmaps_equal(agent.qnet().varmap(), agent.qnet_tgt().varmap()).unwrap());

        run_learning_steps(&mut agent, 1);
        assert!(varmaps_equal(agent.qnet().varmap(), agent.qnet_tgt().varmap()).unwrap());
    }

    #[test]
    fn gradient_steps_wait_for_the_buffer() {
        let mut agent = agent(1000);
        run_learning_steps(&mut agent, 2);
        // Two transitions, batch size two: no gradient step has run yet.
        assert!(varmaps_equal(agent.qnet().varmap(), agent.qnet_tgt().varmap()).unwrap());
        assert_eq!(agent.replay_buffer_len(), 2);
    }

    #[test]
    fn eval_steps_do_not_learn_or_record() {
        let mut agent = agent(1);
        for _ in 0..3 {
            let (_, _, done) = agent.eval_step().unwrap();
            if done {
                agent.env_mut().restart_environment();
            }
        }
        assert_eq!(agent.replay_buffer_len(), 0);
        assert!(varmaps_equal(agent.qnet().varmap(), agent.qnet_tgt().varmap()).unwrap());
    }

    #[test]
    fn params_round_trip_through_disk() {
        use tempdir::TempDir;

        let dir = TempDir::new("dqn_params").unwrap();
        let mut trained = agent(1000);
        run_learning_steps(&mut trained, 16);
        trained.save_params(dir.path()).unwrap();

        let mut fresh = agent(1000);
        assert!(!varmaps_equal(fresh.qnet().varmap(), trained.qnet().varmap()).unwrap());
        fresh.load_params(dir.path()).unwrap();
        assert!(varmaps_equal(fresh.qnet().varmap(), trained.qnet().varmap()).unwrap());
    }

    #[test]
    fn missing_params_are_reported() {
        let mut agent = agent(1000);
        assert!(agent.load_params("/nonexistent/params").is_err());
    }

    #[test]
    fn reset_discards_learned_state() {
        let mut agent = agent(1000);
        run_learning_steps(&mut agent, 8);
        agent.reset();
        assert_eq!(agent.replay_buffer_len(), 0);
        assert!(varmaps_equal(agent.qnet().varmap(), agent.qnet_tgt().varmap()).unwrap());
    }
}
