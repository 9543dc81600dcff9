use candle_core::{Module, Tensor};
use candle_nn::{conv2d, Conv2d, VarBuilder};

use super::{res_block, upsample, ResBlock, Upsampler};
use crate::{
  config::EdsrConfig,
  error::Result,
  graph::{Graph, GraphBuilder, Shape},
  utils::same_padding,
};

pub const MODEL_NAME: &str = "EDSR";

/// Assembles the symbolic EDSR graph described by `config`.
pub fn build_graph(config: &EdsrConfig) -> Result<Graph> {
  config.validate()?;

  tracing::info!(
    "Building {MODEL_NAME} graph: x{} upscale, {} residual blocks, {} features",
    config.scale,
    config.num_layers,
    config.feature_size
  );

  let mut graph = GraphBuilder::new(MODEL_NAME);

  let input = graph.input(
    "input",
    Shape::new(config.channels, config.img_size, config.img_size),
  );

  let x = graph.conv2d("conv1", input, config.feature_size, config.kernel_size)?;
  let x = graph.relu("conv1/relu", x)?;
  let skip = x;

  let mut x = x;
  for i in 0..config.num_layers {
    x = res_block(
      &mut graph,
      x,
      &format!("res_block_{i}"),
      config.feature_size,
      config.kernel_size,
      config.scaling_factor,
    )?;
  }
  tracing::debug!("Appended {} residual blocks", config.num_layers);

  let x = graph.conv2d("conv2", x, config.feature_size, config.kernel_size)?;
  let x = graph.add("add", x, skip)?;

  let output = upsample(
    &mut graph,
    x,
    config.scale,
    config.feature_size,
    config.channels,
    config.kernel_size,
  )?;

  let graph = graph.finish(output)?;
  tracing::info!(
    "{MODEL_NAME} graph has {} layers and {} parameters",
    graph.nodes().len(),
    graph.param_count()
  );

  Ok(graph)
}

pub struct Edsr {
  conv1: Conv2d,
  res_blocks: Vec<ResBlock>,
  conv2: Conv2d,
  upsample: Upsampler,
}

impl Edsr {
  pub fn new(config: &EdsrConfig, vb: VarBuilder) -> Result<Self> {
    config.validate()?;

    let conv = same_padding(config.kernel_size);

    let conv1 = conv2d(
      config.channels,
      config.feature_size,
      config.kernel_size,
      conv,
      vb.pp("conv1"),
    )?;

    let res_blocks = (0..config.num_layers)
      .map(|i| {
        ResBlock::new(
          config.feature_size,
          config.kernel_size,
          config.scaling_factor,
          vb.pp(format!("res_blocks.{i}")),
        )
      })
      .collect::<Result<Vec<_>>>()?;

    let conv2 = conv2d(
      config.feature_size,
      config.feature_size,
      config.kernel_size,
      conv,
      vb.pp("conv2"),
    )?;

    let upsample = Upsampler::new(
      config.scale,
      config.feature_size,
      config.channels,
      config.kernel_size,
      vb.pp("upsample"),
    )?;

    Ok(Self {
      conv1,
      res_blocks,
      conv2,
      upsample,
    })
  }

  pub fn res_blocks(&self) -> &[ResBlock] {
    &self.res_blocks
  }

  /// Folds every residual block's scaling into its last convolution.
  pub fn fold_scaling(&self) -> Result<Self> {
    let res_blocks = self
      .res_blocks
      .iter()
      .map(ResBlock::fold_scaling)
      .collect::<Result<Vec<_>>>()?;

    Ok(Self {
      conv1: self.conv1.clone(),
      res_blocks,
      conv2: self.conv2.clone(),
      upsample: self.upsample.clone(),
    })
  }
}

impl Module for Edsr {
  fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
    let skip = self.conv1.forward(x)?.relu()?;

    let mut x = skip.clone();
    for block in &self.res_blocks {
      x = block.forward(&x)?;
    }

    x = self.conv2.forward(&x)?;
    x = (x + skip)?;

    self.upsample.forward(&x)
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use candle_core::{Device, Tensor};

  use super::*;
  use crate::{
    config::{CHANNEL, IMG_SIZE},
    context::ExecutionContext,
  };

  fn small(scale: usize) -> EdsrConfig {
    EdsrConfig::new(scale)
      .with_num_layers(2)
      .with_feature_size(8)
      .with_img_size(6)
  }

  #[test]
  fn default_model() {
    let graph = build_graph(&EdsrConfig::new(2)).unwrap();

    assert_eq!(graph.name(), MODEL_NAME);
    assert_eq!(graph.inputs().len(), 1);
    assert_eq!(graph.outputs().len(), 1);
    assert_eq!(graph.input_shape(), Shape::new(CHANNEL, IMG_SIZE, IMG_SIZE));
    assert_eq!(
      graph.output_shape(),
      Shape::new(CHANNEL, IMG_SIZE * 2, IMG_SIZE * 2)
    );
    assert_eq!(graph.count("ScalarMul"), 32);
    // conv1 + 2 per block + conv2 + one x2 stage + output projection
    assert_eq!(graph.count("Conv2D"), 1 + 64 + 1 + 1 + 1);
    assert_eq!(graph.count("Add"), 33);
    assert_eq!(graph.param_count(), 40_729_603);
  }

  #[test]
  fn output_size_ignores_depth() {
    for scale in 1..=4 {
      let shapes: Vec<Shape> = [0, 1, 5]
        .into_iter()
        .map(|layers| {
          build_graph(&small(scale).with_num_layers(layers))
            .unwrap()
            .output_shape()
        })
        .collect();

      assert!(shapes.iter().all(|&s| s == Shape::new(CHANNEL, 6 * scale, 6 * scale)));
    }
  }

  #[test]
  fn topology_is_deterministic() {
    let config = EdsrConfig::new(3).with_num_layers(4);

    let a = build_graph(&config).unwrap();
    let b = build_graph(&config).unwrap();

    assert_eq!(a.topology(), b.topology());
    let names = |g: &Graph| g.nodes().iter().map(|n| n.name.clone()).collect::<Vec<_>>();
    assert_eq!(names(&a), names(&b));
  }

  #[test]
  fn global_skip_starts_after_entry_conv() {
    let graph = build_graph(&small(2)).unwrap();
    let nodes = graph.nodes();

    let add = nodes.iter().find(|n| n.name == "add").unwrap();
    let skip = &nodes[add.inputs[1]];
    assert_eq!(skip.name, "conv1/relu");
    assert_eq!(nodes[add.inputs[0]].name, "conv2");
  }

  #[test]
  fn invalid_config_fails() {
    assert!(build_graph(&EdsrConfig::new(0)).is_err());
    assert!(build_graph(&EdsrConfig::new(2).with_kernel_size(2)).is_err());

    let ctx = ExecutionContext::cpu();
    assert!(Edsr::new(&EdsrConfig::new(0), ctx.var_builder()).is_err());
  }

  #[test]
  fn oversized_scale_is_an_error() {
    for scale in [6_000_001, u32::MAX as usize] {
      assert!(build_graph(&EdsrConfig::new(scale)).is_err(), "x{scale}");
    }
  }

  #[test]
  fn forward_matches_graph() -> Result<()> {
    for scale in [1, 2, 3] {
      let config = small(scale);
      let ctx = ExecutionContext::cpu();
      let model = Edsr::new(&config, ctx.var_builder())?;
      let graph = build_graph(&config)?;

      let x = Tensor::randn(0f32, 1., graph.input_shape().dims4(2), &Device::Cpu)?;
      let y = model.forward(&x)?;

      assert_eq!(y.dims4()?, graph.output_shape().dims4(2));
      assert_eq!(ctx.param_count(), graph.param_count());
      assert_eq!(model.res_blocks().len(), config.num_layers);
    }
    Ok(())
  }

  #[test]
  fn folded_model_matches() -> Result<()> {
    let config = small(2);
    let ctx = ExecutionContext::cpu();
    let model = Edsr::new(&config, ctx.var_builder())?;
    let folded = model.fold_scaling()?;

    assert!(folded.res_blocks().iter().all(|b| b.scaling_factor() == 1.));

    let x = Tensor::randn(0f32, 1., (1, CHANNEL, 6, 6), &Device::Cpu)?;
    let a = model.forward(&x)?.flatten_all()?.to_vec1::<f32>()?;
    let b = folded.forward(&x)?.flatten_all()?.to_vec1::<f32>()?;
    for (a, b) in a.iter().zip(&b) {
      assert_abs_diff_eq!(a, b, epsilon = 1e-3);
    }
    Ok(())
  }
}
