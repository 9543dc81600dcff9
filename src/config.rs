use crate::error::{Error, Result};

/// Height and width of the low-resolution input patch.
pub const IMG_SIZE: usize = 48;
/// Color channels of both the input and the output image.
pub const CHANNEL: usize = 3;
/// Side length of every convolution kernel.
pub const KERNEL: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct EdsrConfig {
  pub scale: usize,
  pub num_layers: usize,
  pub feature_size: usize,
  pub scaling_factor: f64,
  pub img_size: usize,
  pub channels: usize,
  pub kernel_size: usize,
}

impl EdsrConfig {
  pub fn new(scale: usize) -> Self {
    Self {
      scale,
      num_layers: 32,
      feature_size: 256,
      scaling_factor: 0.1,
      img_size: IMG_SIZE,
      channels: CHANNEL,
      kernel_size: KERNEL,
    }
  }

  pub fn with_num_layers(mut self, num_layers: usize) -> Self {
    self.num_layers = num_layers;
    self
  }

  pub fn with_feature_size(mut self, feature_size: usize) -> Self {
    self.feature_size = feature_size;
    self
  }

  pub fn with_scaling_factor(mut self, scaling_factor: f64) -> Self {
    self.scaling_factor = scaling_factor;
    self
  }

  pub fn with_img_size(mut self, img_size: usize) -> Self {
    self.img_size = img_size;
    self
  }

  pub fn with_channels(mut self, channels: usize) -> Self {
    self.channels = channels;
    self
  }

  pub fn with_kernel_size(mut self, kernel_size: usize) -> Self {
    self.kernel_size = kernel_size;
    self
  }

  pub fn validate(&self) -> Result<()> {
    if self.scale == 0 {
      return Err(Error::Config("scale must be a positive integer"));
    }
    if self.feature_size == 0 {
      return Err(Error::Config("feature_size must be positive"));
    }
    if self.channels == 0 {
      return Err(Error::Config("channels must be positive"));
    }
    if self.img_size == 0 {
      return Err(Error::Config("img_size must be positive"));
    }
    // "same" padding is kernel_size / 2 on each side
    if self.kernel_size % 2 == 0 {
      return Err(Error::Config("kernel_size must be odd"));
    }
    if !self.scaling_factor.is_finite() {
      return Err(Error::Config("scaling_factor must be finite"));
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_follow_the_paper() {
    let config = EdsrConfig::new(2);

    assert_eq!(config.num_layers, 32);
    assert_eq!(config.feature_size, 256);
    assert_eq!(config.scaling_factor, 0.1);
    assert_eq!(config.img_size, IMG_SIZE);
    assert_eq!(config.channels, CHANNEL);
    assert_eq!(config.kernel_size, KERNEL);
    assert!(config.validate().is_ok());
  }

  #[test]
  fn rejects_invalid_values() {
    assert!(EdsrConfig::new(0).validate().is_err());
    assert!(EdsrConfig::new(2).with_feature_size(0).validate().is_err());
    assert!(EdsrConfig::new(2).with_channels(0).validate().is_err());
    assert!(EdsrConfig::new(2).with_img_size(0).validate().is_err());
    assert!(EdsrConfig::new(2).with_kernel_size(4).validate().is_err());
    assert!(EdsrConfig::new(2)
      .with_scaling_factor(f64::NAN)
      .validate()
      .is_err());
  }

  #[test]
  fn zero_layers_is_valid() {
    assert!(EdsrConfig::new(3).with_num_layers(0).validate().is_ok());
  }
}
