#![warn(missing_docs)]
//! Deep RL agents implemented with [candle](https://crates.io/crates/candle-core).
//!
//! [`dqn::Dqn`] learns a discrete action-value network with a periodically
//! synchronized target network; [`ddpg::Ddpg`] learns a continuous
//! deterministic actor and critic with Polyak-averaged targets. Both replay
//! experience through [`rlab_core::replay_buffer::ReplayBuffer`].
pub mod ddpg;
pub mod dqn;
pub mod mlp;
pub mod opt;
pub mod util;

use serde::{Deserialize, Serialize};

/// Device for running candle computations.
///
/// This enum exists because [`candle_core::Device`] does not support
/// serialization.
#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq)]
pub enum Device {
    /// The main CPU device.
    Cpu,

    /// A CUDA device.
    Cuda(usize),
}

impl From<Device> for candle_core::Device {
    fn from(device: Device) -> Self {
        match device {
            Device::Cpu => candle_core::Device::Cpu,
            Device::Cuda(n) => candle_core::Device::new_cuda(n).expect("CUDA device unavailable"),
        }
    }
}
