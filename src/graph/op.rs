use std::fmt;

use crate::error::{Error, Result};

/// Symbolic feature map shape, NCHW with the batch left open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
  pub channels: usize,
  pub height: usize,
  pub width: usize,
}

impl Shape {
  pub fn new(channels: usize, height: usize, width: usize) -> Self {
    Self {
      channels,
      height,
      width,
    }
  }

  pub fn dims4(&self, batch: usize) -> (usize, usize, usize, usize) {
    (batch, self.channels, self.height, self.width)
  }
}

impl fmt::Display for Shape {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "(None, {}, {}, {})",
      self.channels, self.height, self.width
    )
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
  Relu,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
  Input(Shape),
  /// "same" padded, stride 1, with bias
  Conv2d {
    filters: usize,
    kernel_size: usize,
  },
  Activation(Activation),
  Add,
  ScalarMul(f64),
  PixelShuffle(usize),
}

impl Op {
  pub fn kind(&self) -> &'static str {
    match self {
      Op::Input(_) => "InputLayer",
      Op::Conv2d { .. } => "Conv2D",
      Op::Activation(Activation::Relu) => "ReLU",
      Op::Add => "Add",
      Op::ScalarMul(_) => "ScalarMul",
      Op::PixelShuffle(_) => "PixelShuffle",
    }
  }

  fn arity(&self) -> usize {
    match self {
      Op::Input(_) => 0,
      Op::Add => 2,
      _ => 1,
    }
  }

  pub fn infer_shape(&self, layer: &str, inputs: &[Shape]) -> Result<Shape> {
    if inputs.len() != self.arity() {
      return Err(Error::shape(
        layer,
        format!(
          "{} expects {} input(s), got {}",
          self.kind(),
          self.arity(),
          inputs.len()
        ),
      ));
    }

    match *self {
      Op::Input(shape) => Ok(shape),

      Op::Conv2d {
        filters,
        kernel_size,
      } => {
        if filters == 0 || kernel_size % 2 == 0 {
          return Err(Error::shape(
            layer,
            format!("unsupported convolution {filters} filters / kernel {kernel_size}"),
          ));
        }
        Ok(Shape {
          channels: filters,
          ..inputs[0]
        })
      }

      Op::Activation(_) | Op::ScalarMul(_) => Ok(inputs[0]),

      Op::Add => {
        if inputs[0] != inputs[1] {
          return Err(Error::shape(
            layer,
            format!("cannot add {} and {}", inputs[0], inputs[1]),
          ));
        }
        Ok(inputs[0])
      }

      Op::PixelShuffle(factor) => {
        let x = inputs[0];
        let area = checked_mul(layer, &[factor, factor])?;
        if factor == 0 || x.channels % area != 0 {
          return Err(Error::shape(
            layer,
            format!(
              "{} channels cannot be shuffled by a factor of {factor}",
              x.channels
            ),
          ));
        }
        Ok(Shape::new(
          x.channels / area,
          checked_mul(layer, &[x.height, factor])?,
          checked_mul(layer, &[x.width, factor])?,
        ))
      }
    }
  }

  pub fn param_count(&self, layer: &str, inputs: &[Shape]) -> Result<usize> {
    match (self, inputs) {
      (
        Op::Conv2d {
          filters,
          kernel_size,
        },
        [x],
      ) => checked_mul(layer, &[*kernel_size, *kernel_size, x.channels, *filters])?
        .checked_add(*filters)
        .ok_or_else(|| Error::shape(layer, "parameter count overflows usize")),
      _ => Ok(0),
    }
  }
}

/// Product of `factors`, or a shape error naming `layer` on overflow.
fn checked_mul(layer: &str, factors: &[usize]) -> Result<usize> {
  factors
    .iter()
    .try_fold(1usize, |acc, &f| acc.checked_mul(f))
    .ok_or_else(|| Error::shape(layer, format!("{factors:?} overflows usize")))
}
