use candle_core::Tensor;
use candle_nn::Conv2dConfig;

pub trait TensorExt {
  /// Rearranges `(N, C·r², H, W)` into `(N, C, H·r, W·r)`.
  fn pixel_shuffle(&self, upscale_factor: usize) -> Result<Self, candle_core::Error>
  where
    Self: Sized;
}

impl TensorExt for Tensor {
  fn pixel_shuffle(&self, upscale_factor: usize) -> Result<Self, candle_core::Error> {
    let (n, c, h, w) = self.dims4()?;
    let r = upscale_factor;

    if r == 0 {
      Err(candle_core::Error::Msg("pixel_shuffle factor must be positive".to_owned()).bt())
    } else if r == 1 {
      Ok(self.clone())
    } else if c % (r * r) != 0 {
      Err(
        candle_core::Error::Msg(format!(
          "pixel_shuffle: {c} channels are not divisible by {}",
          r * r
        ))
        .bt(),
      )
    } else {
      let out_c = c / (r * r);
      self
        .reshape(vec![n, out_c, r, r, h, w])?
        .permute(vec![0, 1, 4, 2, 5, 3])?
        .contiguous()?
        .reshape((n, out_c, h * r, w * r))
    }
  }
}

/// Stride 1 convolution that keeps the spatial size for odd kernels.
pub fn same_padding(kernel_size: usize) -> Conv2dConfig {
  Conv2dConfig {
    padding: kernel_size / 2,
    ..Default::default()
  }
}

#[cfg(test)]
mod tests {
  use candle_core::{Device, Tensor};

  use super::*;

  #[test]
  fn pixel_shuffle_interleaves_channels() -> candle_core::Result<()> {
    let x = Tensor::arange(0f32, 8., &Device::Cpu)?.reshape((1, 8, 1, 1))?;
    let y = x.pixel_shuffle(2)?;

    assert_eq!(y.dims4()?, (1, 2, 2, 2));
    assert_eq!(
      y.squeeze(0)?.to_vec3::<f32>()?,
      vec![
        vec![vec![0., 1.], vec![2., 3.]],
        vec![vec![4., 5.], vec![6., 7.]],
      ]
    );
    Ok(())
  }

  #[test]
  fn pixel_shuffle_spreads_each_pixel() -> candle_core::Result<()> {
    // channel k of pixel (i, j) lands on (i*2 + k/2, j*2 + k%2)
    let x = Tensor::arange(0f32, 16., &Device::Cpu)?.reshape((1, 4, 2, 2))?;
    let y = x.pixel_shuffle(2)?.squeeze(0)?.squeeze(0)?;

    assert_eq!(
      y.to_vec2::<f32>()?,
      vec![
        vec![0., 4., 1., 5.],
        vec![8., 12., 9., 13.],
        vec![2., 6., 3., 7.],
        vec![10., 14., 11., 15.],
      ]
    );
    Ok(())
  }

  #[test]
  fn pixel_shuffle_rejects_bad_factors() -> candle_core::Result<()> {
    let x = Tensor::zeros((1, 6, 2, 2), candle_core::DType::F32, &Device::Cpu)?;

    assert!(x.pixel_shuffle(0).is_err());
    assert!(x.pixel_shuffle(2).is_err());
    assert_eq!(x.pixel_shuffle(1)?.dims4()?, (1, 6, 2, 2));
    Ok(())
  }

  #[test]
  fn same_padding_is_half_the_kernel() {
    assert_eq!(same_padding(3).padding, 1);
    assert_eq!(same_padding(5).padding, 2);
    assert_eq!(same_padding(1).padding, 0);
  }
}
