use candle_core::{Module, Tensor};
use candle_nn::{conv2d, Conv2d, VarBuilder};

use crate::{
  error::Result,
  graph::{GraphBuilder, NodeId},
  utils::same_padding,
};

/// Appends `x + scaling_factor * conv2(relu(conv1(x)))` to `graph`.
pub fn res_block(
  graph: &mut GraphBuilder,
  x: NodeId,
  prefix: &str,
  feature_size: usize,
  kernel_size: usize,
  scaling_factor: f64,
) -> Result<NodeId> {
  let y = graph.conv2d(format!("{prefix}/conv1"), x, feature_size, kernel_size)?;
  let y = graph.relu(format!("{prefix}/relu"), y)?;
  let y = graph.conv2d(format!("{prefix}/conv2"), y, feature_size, kernel_size)?;
  let y = graph.scale(format!("{prefix}/scale"), y, scaling_factor)?;
  graph.add(format!("{prefix}/add"), y, x)
}

#[derive(Clone)]
pub struct ResBlock {
  conv1: Conv2d,
  conv2: Conv2d,
  scaling_factor: f64,
}

impl ResBlock {
  pub fn new(
    feature_size: usize,
    kernel_size: usize,
    scaling_factor: f64,
    vb: VarBuilder,
  ) -> Result<Self> {
    let config = same_padding(kernel_size);

    let conv1 = conv2d(feature_size, feature_size, kernel_size, config, vb.pp("conv1"))?;
    let conv2 = conv2d(feature_size, feature_size, kernel_size, config, vb.pp("conv2"))?;

    Ok(Self {
      conv1,
      conv2,
      scaling_factor,
    })
  }

  pub fn scaling_factor(&self) -> f64 {
    self.scaling_factor
  }

  /// Folds the residual scaling into `conv2`, leaving a factor of 1.
  pub fn fold_scaling(&self) -> Result<Self> {
    let weight = (self.conv2.weight() * self.scaling_factor)?;
    let bias = match self.conv2.bias() {
      Some(bias) => Some((bias * self.scaling_factor)?),
      None => None,
    };

    Ok(Self {
      conv1: self.conv1.clone(),
      conv2: Conv2d::new(weight, bias, *self.conv2.config()),
      scaling_factor: 1.,
    })
  }
}

impl Module for ResBlock {
  fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
    let mut branch = self.conv1.forward(x)?;
    branch = branch.relu()?;
    branch = self.conv2.forward(&branch)?;

    if self.scaling_factor != 1. {
      branch = (branch * self.scaling_factor)?;
    }

    branch + x
  }
}
