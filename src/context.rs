use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};

use crate::error::Result;

/// Device plus the parameters created on it.
///
/// Everything built through [`ExecutionContext::var_builder`] shares one
/// [`VarMap`]; dropping the context releases those parameters.
pub struct ExecutionContext {
  device: Device,
  varmap: VarMap,
}

impl ExecutionContext {
  pub fn new(device: Device) -> Self {
    Self {
      device,
      varmap: VarMap::new(),
    }
  }

  pub fn cpu() -> Self {
    Self::new(Device::Cpu)
  }

  /// CUDA device 0 when built with the `cuda` feature and a GPU is present.
  pub fn best_available() -> Result<Self> {
    let device = Device::cuda_if_available(0)?;
    tracing::info!("Using device {:?}", device);
    Ok(Self::new(device))
  }

  pub fn device(&self) -> &Device {
    &self.device
  }

  /// Missing parameters are created with random initialization.
  pub fn var_builder(&self) -> VarBuilder<'static> {
    VarBuilder::from_varmap(&self.varmap, DType::F32, &self.device)
  }

  pub fn param_count(&self) -> usize {
    self
      .varmap
      .all_vars()
      .iter()
      .map(|var| var.elem_count())
      .sum()
  }
}

impl Drop for ExecutionContext {
  fn drop(&mut self) {
    tracing::debug!(
      "Releasing execution context with {} parameters",
      self.param_count()
    );
  }
}
