//! DDPG agent.
use super::{
    config::DdpgConfig,
    model::{ActorNet, CriticNet},
    noise::OuNoise,
};
use crate::util::track;
use anyhow::Result;
use candle_core::{Device, Tensor};
use candle_nn::loss::mse;
use log::trace;
use rlab_core::{
    replay_buffer::{ReplayBuffer, Transition},
    Agent, AgentKind, ContinuousEnv,
};
use std::{fs, path::Path};

/// Deep Deterministic Policy Gradient agent.
///
/// Actions are the deterministic actor output plus Ornstein-Uhlenbeck
/// noise scaled by the caller-supplied epsilon, clipped to the action
/// bounds. Once the replay buffer holds more than a batch of transitions,
/// every step performs one gradient update of the critic (TD regression
/// through the target networks) and the actor (deterministic policy
/// gradient through the critic), followed by a Polyak blend of both target
/// networks; targets are never overwritten by a periodic copy.
pub struct Ddpg<E: ContinuousEnv> {
    env: E,
    actor: ActorNet,
    actor_tgt: ActorNet,
    critic: CriticNet,
    critic_tgt: CriticNet,
    replay_buffer: ReplayBuffer<Vec<f32>, Vec<f32>>,
    noise: OuNoise,
    gamma: f64,
    tau: f64,
    batch_size: usize,
    obs_dim: usize,
    act_dim: usize,
    device: Device,
    config: DdpgConfig,
}

impl<E: ContinuousEnv> Ddpg<E> {
    /// Constructs the agent around an environment.
    ///
    /// Both target networks start as exact copies of their online
    /// counterparts.
    pub fn build(env: E, config: DdpgConfig) -> Result<Self> {
        let device: Device = config.device.into();
        let actor = ActorNet::build(&config.actor_config, &device)?;
        let actor_tgt = ActorNet::build(&config.actor_config, &device)?;
        track(actor_tgt.varmap(), actor.varmap(), 1.0)?;
        let critic = CriticNet::build(&config.critic_config, &device)?;
        let critic_tgt = CriticNet::build(&config.critic_config, &device)?;
        track(critic_tgt.varmap(), critic.varmap(), 1.0)?;

        let obs_dim = env.obs_dim();
        let act_dim = env.act_dim();
        Ok(Self {
            env,
            actor,
            actor_tgt,
            critic,
            critic_tgt,
            replay_buffer: ReplayBuffer::build(&config.replay_buffer_config),
            noise: OuNoise::new(config.ou_noise.clone(), act_dim),
            gamma: config.gamma,
            tau: config.tau,
            batch_size: config.batch_size,
            obs_dim,
            act_dim,
            device,
            config,
        })
    }

    /// Performs one learning step.
    ///
    /// `epsilon` scales the exploration noise added to the actor's action
    /// and typically decays over the course of training; it is distinct
    /// from the noise process's own parameters.
    ///
    /// Returns the new state, the reward, and whether the episode ended.
    pub fn step(&mut self, epsilon: f32) -> Result<(Vec<f32>, f32, bool)> {
        let mut act = self.actor_action()?;
        let noise = self.noise.sample()?;
        let (low, high) = self.env.action_bounds();
        for (a, n) in act.iter_mut().zip(noise.iter()) {
            *a = (*a + epsilon * n).clamp(low, high);
        }

        let (origin, reward, new_state, done) = self.env.execute_action(&act);
        self.replay_buffer.push(Transition {
            obs: origin,
            act,
            reward,
            next_obs: new_state.clone(),
            is_done: done,
        });

        if self.replay_buffer.len() > self.batch_size {
            let (loss_critic, loss_actor) = self.backward_pass()?;
            trace!("loss_critic = {}, loss_actor = {}", loss_critic, loss_actor);
        }

        Ok((new_state, reward, done))
    }

    /// Performs one pure-inference step with the noiseless actor action;
    /// nothing is recorded and no learning happens.
    pub fn eval_step(&mut self) -> Result<(Vec<f32>, f32, bool)> {
        let act = self.actor_action()?;
        let (_, reward, new_state, done) = self.env.execute_action(&act);
        Ok((new_state, reward, done))
    }

    fn actor_action(&self) -> Result<Vec<f32>> {
        let obs = self.env.current_state();
        let obs = Tensor::from_vec(obs, (1, self.obs_dim), &self.device)?;
        let act = self.actor.forward(&obs)?.squeeze(0)?.to_vec1::<f32>()?;
        Ok(act)
    }

    /// One gradient update of the critic and the actor on independent
    /// losses, followed by the Polyak blend of both target networks.
    fn backward_pass(&mut self) -> Result<(f32, f32)> {
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
        let act = Tensor::from_vec(
            batch.act.concat(),
            (batch_size, self.act_dim),
            &self.device,
        )?;
        let reward = Tensor::from_vec(batch.reward, (batch_size, 1), &self.device)?;
        let not_done = {
            let not_done: Vec<f32> = batch
                .is_done
                .iter()
                .map(|done| if *done { 0.0 } else { 1.0 })
                .collect();
            Tensor::from_vec(not_done, (batch_size, 1), &self.device)?
        };

        let critic_loss = {
            let q = self.critic.forward(&obs, &act)?;
            let next_act = self.actor_tgt.forward(&next_obs)?.detach();
            let next_q = self.critic_tgt.forward(&next_obs, &next_act)?;
            let tgt = (reward + ((not_done * self.gamma)? * next_q)?)?.detach();
            mse(&q, &tgt)?
        };

        let actor_loss = self
            .critic
            .forward(&obs, &self.actor.forward(&obs)?)?
            .mean_all()?
            .neg()?;

        self.actor.backward_step(&actor_loss)?;
        self.critic.backward_step(&critic_loss)?;

        track(self.actor_tgt.varmap(), self.actor.varmap(), self.tau)?;
        track(self.critic_tgt.varmap(), self.critic.varmap(), self.tau)?;

        Ok((
            critic_loss.to_scalar::<f32>()?,
            actor_loss.to_scalar::<f32>()?,
        ))
    }

    /// Saves the online actor and critic parameters into the given
    /// directory.
    pub fn save_params<T: AsRef<Path>>(&self, path: T) -> Result<()> {
        fs::create_dir_all(&path)?;
        self.actor
            .save(path.as_ref().join("actor.safetensors").as_path())?;
        self.critic
            .save(path.as_ref().join("critic.safetensors").as_path())?;
        Ok(())
    }

    /// Loads previously persisted parameters into the online networks and
    /// copies them into the targets, e.g. for evaluation-only runs.
    ///
    /// Missing or malformed parameter files are reported to the caller; the
    /// randomly initialized networks are never silently used instead.
    pub fn load_params<T: AsRef<Path>>(&mut self, path: T) -> Result<()> {
        self.actor
            .load(path.as_ref().join("actor.safetensors").as_path())?;
        self.critic
            .load(path.as_ref().join("critic.safetensors").as_path())?;
        track(self.actor_tgt.varmap(), self.actor.varmap(), 1.0)?;
        track(self.critic_tgt.varmap(), self.critic.varmap(), 1.0)?;
        Ok(())
    }

    /// Number of transitions currently held by the replay buffer.
    pub fn replay_buffer_len(&self) -> usize {
        self.replay_buffer.len()
    }

    /// The online actor.
    pub fn actor(&self) -> &ActorNet {
        &self.actor
    }

    /// The target actor.
    pub fn actor_tgt(&self) -> &ActorNet {
        &self.actor_tgt
    }

    /// The online critic.
    pub fn critic(&self) -> &CriticNet {
        &self.critic
    }

    /// The target critic.
    pub fn critic_tgt(&self) -> &CriticNet {
        &self.critic_tgt
    }

    /// The wrapped environment.
    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }
}

impl<E: ContinuousEnv> Agent for Ddpg<E> {
    fn kind(&self) -> AgentKind {
        AgentKind::Ddpg
    }

    fn reset(&mut self) {
        self.actor =
            ActorNet::build(&self.config.actor_config, &self.device).expect("failed to rebuild actor");
        self.actor_tgt =
            ActorNet::build(&self.config.actor_config, &self.device).expect("failed to rebuild actor");
        track(self.actor_tgt.varmap(), self.actor.varmap(), 1.0)
            .expect("failed to synchronize the target actor");
        self.critic = CriticNet::build(&self.config.critic_config, &self.device)
            .expect("failed to rebuild critic");
        self.critic_tgt = CriticNet::build(&self.config.critic_config, &self.device)
            .expect("failed to rebuild critic");
        track(self.critic_tgt.varmap(), self.critic.varmap(), 1.0)
            .expect("failed to synchronize the target critic");
        self.replay_buffer = ReplayBuffer::build(&self.config.replay_buffer_config);
        self.noise.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ddpg::model::{ActorNetConfig, CriticNetConfig},
        mlp::{Activation, MlpConfig},
        opt::OptimizerConfig,
        util::varmaps_equal,
    };
    use rlab_core::dummy::DummyContinuousEnv;
    use rlab_core::replay_buffer::ReplayBufferConfig;

    fn config(tau: f64) -> DdpgConfig {
        let mut config = DdpgConfig::new(1, 1)
            .tau(tau)
            .batch_size(4)
            .gamma(0.9)
            .replay_buffer_config(ReplayBufferConfig::default().capacity(64));
        config.actor_config = ActorNetConfig::new(
            MlpConfig::new(1, vec![4], 1, Activation::Tanh),
            OptimizerConfig::Adam { lr: 0.01 },
        );
        config.critic_config = CriticNetConfig::new(
            MlpConfig::new(2, vec![4], 1, Activation::None),
            OptimizerConfig::Adam { lr: 0.01 },
        );
        config
    }

    fn agent(tau: f64) -> Ddpg<DummyContinuousEnv> {
        Ddpg::build(DummyContinuousEnv::new(), config(tau)).unwrap()
    }

    fn run_learning_steps(agent: &mut Ddpg<DummyContinuousEnv>, n: usize, epsilon: f32) {
        for _ in 0..n {
            let (_, _, done) = agent.step(epsilon).unwrap();
            if done {
                agent.env_mut().restart_environment();
            }
        }
    }

    #[test]
    fn targets_start_as_exact_copies() {
        let agent = agent(0.001);
        assert!(varmaps_equal(agent.actor().varmap(), agent.actor_tgt().varmap()).unwrap());
        assert!(varmaps_equal(agent.critic().varmap(), agent.critic_tgt().varmap()).unwrap());
    }

    #[test]
    fn full_tau_makes_targets_track_exactly() {
        let mut agent = agent(1.0);
        run_learning_steps(&mut agent, 8, 0.1);
        assert!(varmaps_equal(agent.actor().varmap(), agent.actor_tgt().varmap()).unwrap());
        assert!(varmaps_equal(agent.critic().varmap(), agent.critic_tgt().varmap()).unwrap());
    }

    fn snapshot(varmap: &candle_nn::VarMap) -> Vec<(String, Vec<f32>)> {
        let mut values: Vec<(String, Vec<f32>)> = varmap
            .data()
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| {
                let t = v.as_tensor().flatten_all().unwrap().to_vec1::<f32>().unwrap();
                (k.clone(), t)
            })
            .collect();
        values.sort_by(|a, b| a.0.cmp(&b.0));
        values
    }

    #[test]
    fn zero_tau_leaves_targets_unchanged() {
        let mut agent = agent(0.0);
        let actor_tgt_before = snapshot(agent.actor_tgt().varmap());
        let critic_tgt_before = snapshot(agent.critic_tgt().varmap());

        run_learning_steps(&mut agent, 8, 0.1);

        assert_eq!(snapshot(agent.actor_tgt().varmap()), actor_tgt_before);
        assert_eq!(snapshot(agent.critic_tgt().varmap()), critic_tgt_before);

        // The online networks did learn.
        assert!(!varmaps_equal(agent.actor().varmap(), agent.actor_tgt().varmap()).unwrap());
    }

    #[test]
    fn fractional_tau_blends_targets() {
        let mut agent = agent(0.5);
        run_learning_steps(&mut agent, 8, 0.1);
        assert!(!varmaps_equal(agent.actor().varmap(), agent.actor_tgt().varmap()).unwrap());
    }

    #[test]
    fn actor_actions_are_tanh_bounded() {
        let agent = agent(0.001);
        let act = agent.actor_action().unwrap();
        assert_eq!(act.len(), 1);
        assert!(act[0] >= -1.0 && act[0] <= 1.0);
    }

    #[test]
    fn noisy_steps_survive_large_epsilon() {
        // Noise scaled far beyond the action bounds still produces legal,
        // clipped actions.
        let mut agent = agent(0.001);
        run_learning_steps(&mut agent, 8, 10.0);
        assert!(agent.replay_buffer_len() > 0);
    }

    #[test]
    fn eval_steps_do_not_learn_or_record() {
        let mut agent = agent(0.001);
        for _ in 0..4 {
            let (_, _, done) = agent.eval_step().unwrap();
            if done {
                agent.env_mut().restart_environment();
            }
        }
        assert_eq!(agent.replay_buffer_len(), 0);
        assert!(varmaps_equal(agent.actor().varmap(), agent.actor_tgt().varmap()).unwrap());
    }

    #[test]
    fn params_round_trip_through_disk() {
        use tempdir::TempDir;

        let dir = TempDir::new("ddpg_params").unwrap();
        let mut trained = agent(0.001);
        run_learning_steps(&mut trained, 8, 0.1);
        trained.save_params(dir.path()).unwrap();

        let mut fresh = agent(0.001);
        fresh.load_params(dir.path()).unwrap();
        assert!(varmaps_equal(fresh.actor().varmap(), trained.actor().varmap()).unwrap());
        assert!(varmaps_equal(fresh.critic().varmap(), trained.critic().varmap()).unwrap());
        // Targets follow the loaded parameters.
        assert!(varmaps_equal(fresh.actor_tgt().varmap(), trained.actor().varmap()).unwrap());
    }

    #[test]
    fn reset_discards_learned_state() {
        let mut agent = agent(0.001);
        run_learning_steps(&mut agent, 8, 0.1);
        agent.reset();
        assert_eq!(agent.replay_buffer_len(), 0);
        assert!(varmaps_equal(agent.actor().varmap(), agent.actor_tgt().varmap()).unwrap());
    }
}
