use candle_core::{Module, Tensor};
use candle_nn::{conv2d, Conv2d, VarBuilder};

use crate::{
  error::{Error, Result},
  graph::{GraphBuilder, NodeId},
  utils::{same_padding, TensorExt},
};

/// Pixel shuffle factors, one per sub-pixel stage.
///
/// Powers of two are reached with repeated ×2 stages, anything else with a
/// single stage of the full factor.
pub fn shuffle_factors(scale: usize) -> Vec<usize> {
  match scale {
    0 | 1 => vec![],
    s if s.is_power_of_two() => vec![2; s.trailing_zeros() as usize],
    s => vec![s],
  }
}

fn stage_filters(feature_size: usize, factor: usize) -> Result<usize> {
  feature_size
    .checked_mul(factor)
    .and_then(|filters| filters.checked_mul(factor))
    .ok_or(Error::Config("scale is too large for the feature size"))
}

pub fn upsample(
  graph: &mut GraphBuilder,
  x: NodeId,
  scale: usize,
  feature_size: usize,
  channels: usize,
  kernel_size: usize,
) -> Result<NodeId> {
  if scale == 0 {
    return Err(Error::Config("scale must be a positive integer"));
  }

  let mut x = x;
  for (i, factor) in shuffle_factors(scale).into_iter().enumerate() {
    x = graph.conv2d(
      format!("upsample_{i}/conv"),
      x,
      stage_filters(feature_size, factor)?,
      kernel_size,
    )?;
    x = graph.pixel_shuffle(format!("upsample_{i}/pixel_shuffle"), x, factor)?;
  }

  graph.conv2d("output", x, channels, kernel_size)
}

#[derive(Clone)]
struct SubPixelStage {
  conv: Conv2d,
  factor: usize,
}

#[derive(Clone)]
pub struct Upsampler {
  stages: Vec<SubPixelStage>,
  output: Conv2d,
}

impl Upsampler {
  pub fn new(
    scale: usize,
    feature_size: usize,
    channels: usize,
    kernel_size: usize,
    vb: VarBuilder,
  ) -> Result<Self> {
    if scale == 0 {
      return Err(Error::Config("scale must be a positive integer"));
    }

    let config = same_padding(kernel_size);

    let stages = shuffle_factors(scale)
      .into_iter()
      .enumerate()
      .map(|(i, factor)| -> Result<SubPixelStage> {
        let conv = conv2d(
          feature_size,
          stage_filters(feature_size, factor)?,
          kernel_size,
          config,
          vb.pp(format!("stages.{i}.conv")),
        )?;
        Ok(SubPixelStage { conv, factor })
      })
      .collect::<Result<Vec<_>>>()?;

    let output = conv2d(feature_size, channels, kernel_size, config, vb.pp("output"))?;

    Ok(Self { stages, output })
  }
}

impl Module for Upsampler {
  fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
    let mut x = x.clone();

    for stage in &self.stages {
      x = stage.conv.forward(&x)?;
      x = x.pixel_shuffle(stage.factor)?;
    }

    self.output.forward(&x)
  }
}
