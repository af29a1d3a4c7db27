//! Utilities shared by the deep agents.
use anyhow::{anyhow, Result};
use candle_core::{DType, Tensor};
use candle_nn::VarMap;
use log::trace;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// Critic loss type.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
pub enum CriticLoss {
    /// Mean squared error.
    Mse,

    /// Smooth L1 loss.
    SmoothL1,
}

/// Applies a soft update on variables, identified by their names:
///
/// `dest = tau * src + (1.0 - tau) * dest`
///
/// With `tau = 1.0` this is a full copy of the source variables, the
/// mechanism behind periodic target-network synchronization; fractional
/// `tau` is the Polyak-averaged blend applied after every gradient step.
pub fn track(dest: &VarMap, src: &VarMap, tau: f64) -> Result<()> {
    trace!("track, tau = {}", tau);
    let dest = dest.data().lock().unwrap();
    let src = src.data().lock().unwrap();

    for (k_dest, v_dest) in dest.iter() {
        let v_src = src
            .get(k_dest)
            .ok_or_else(|| anyhow!("variable {} is missing in the source", k_dest))?;
        let t_src = v_src.as_tensor();
        let t_dest = v_dest.as_tensor();
        let t_dest = ((tau * t_src)? + (1.0 - tau) * t_dest)?;
        v_dest.set(&t_dest)?;
    }

    Ok(())
}

/// Whether two variable maps hold elementwise identical tensors.
pub fn varmaps_equal(a: &VarMap, b: &VarMap) -> Result<bool> {
    let a = a.data().lock().unwrap();
    let b = b.data().lock().unwrap();

    if a.len() != b.len() {
        return Ok(false);
    }
    for (k, v_a) in a.iter() {
        let v_b = match b.get(k) {
            Some(v) => v,
            None => return Ok(false),
        };
        let t_a: Vec<f32> = v_a.as_tensor().flatten_all()?.to_vec1()?;
        let t_b: Vec<f32> = v_b.as_tensor().flatten_all()?.to_vec1()?;
        if t_a != t_b {
            return Ok(false);
        }
    }
    Ok(true)
}

/// See <https://pytorch.org/docs/stable/generated/torch.nn.SmoothL1Loss.html>.
pub fn smooth_l1_loss(x: &Tensor, y: &Tensor) -> Result<Tensor, candle_core::Error> {
    let device = x.device();
    let d = (x - y)?.abs()?;
    let m1 = d.lt(1.0)?.to_dtype(DType::F32)?.to_device(device)?;
    let m2 = Tensor::try_from(1f32)?
        .to_device(device)?
        .broadcast_sub(&m1)?;
    (((0.5 * m1)? * d.powf(2.0)?)? + m2 * (d - 0.5)?)?.mean_all()
}
