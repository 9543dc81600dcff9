//! Symbolic computation graph.
//!
//! Layers are appended to a [`GraphBuilder`] in topological order. Every
//! append runs shape inference, so a finished [`Graph`] only ever holds
//! consistent shapes. No tensor values are involved.

mod diagram;
mod op;
mod summary;

use smallvec::SmallVec;

pub use diagram::*;
pub use op::*;
pub use summary::*;

use crate::error::{Error, Result};

pub type NodeId = usize;

#[derive(Debug, Clone)]
pub struct Node {
  pub id: NodeId,
  pub name: String,
  pub op: Op,
  pub inputs: SmallVec<[NodeId; 2]>,
  pub shape: Shape,
  pub params: usize,
}

pub struct GraphBuilder {
  name: String,
  nodes: Vec<Node>,
  total_params: usize,
}

impl GraphBuilder {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      nodes: Vec::new(),
      total_params: 0,
    }
  }

  pub fn input(&mut self, name: impl Into<String>, shape: Shape) -> NodeId {
    let id = self.nodes.len();
    self.nodes.push(Node {
      id,
      name: name.into(),
      op: Op::Input(shape),
      inputs: SmallVec::new(),
      shape,
      params: 0,
    });
    id
  }

  pub fn apply(&mut self, name: impl Into<String>, op: Op, inputs: &[NodeId]) -> Result<NodeId> {
    let name = name.into();

    if let Some(&missing) = inputs.iter().find(|&&i| i >= self.nodes.len()) {
      return Err(Error::shape(&name, format!("unknown input node #{missing}")));
    }

    let shapes: SmallVec<[Shape; 2]> = inputs.iter().map(|&i| self.nodes[i].shape).collect();
    let shape = op.infer_shape(&name, &shapes)?;
    let params = op.param_count(&name, &shapes)?;
    self.total_params = self
      .total_params
      .checked_add(params)
      .ok_or_else(|| Error::shape(&name, "total parameter count overflows usize"))?;

    let id = self.nodes.len();
    self.nodes.push(Node {
      id,
      name,
      op,
      inputs: inputs.into(),
      shape,
      params,
    });
    Ok(id)
  }

  pub fn conv2d(
    &mut self,
    name: impl Into<String>,
    x: NodeId,
    filters: usize,
    kernel_size: usize,
  ) -> Result<NodeId> {
    self.apply(
      name,
      Op::Conv2d {
        filters,
        kernel_size,
      },
      &[x],
    )
  }

  pub fn relu(&mut self, name: impl Into<String>, x: NodeId) -> Result<NodeId> {
    self.apply(name, Op::Activation(Activation::Relu), &[x])
  }

  pub fn scale(&mut self, name: impl Into<String>, x: NodeId, factor: f64) -> Result<NodeId> {
    self.apply(name, Op::ScalarMul(factor), &[x])
  }

  pub fn add(&mut self, name: impl Into<String>, a: NodeId, b: NodeId) -> Result<NodeId> {
    self.apply(name, Op::Add, &[a, b])
  }

  pub fn pixel_shuffle(
    &mut self,
    name: impl Into<String>,
    x: NodeId,
    factor: usize,
  ) -> Result<NodeId> {
    self.apply(name, Op::PixelShuffle(factor), &[x])
  }

  /// # Panics
  ///
  /// If `id` was not produced by this builder.
  pub fn shape(&self, id: NodeId) -> Shape {
    self.nodes[id].shape
  }

  pub fn finish(self, output: NodeId) -> Result<Graph> {
    if output >= self.nodes.len() {
      return Err(Error::shape(&self.name, format!("unknown output node #{output}")));
    }

    let inputs: Vec<NodeId> = self
      .nodes
      .iter()
      .filter(|node| matches!(node.op, Op::Input(_)))
      .map(|node| node.id)
      .collect();

    let &[input] = inputs.as_slice() else {
      return Err(Error::shape(
        &self.name,
        format!("a model needs exactly one input, found {}", inputs.len()),
      ));
    };

    Ok(Graph {
      name: self.name,
      nodes: self.nodes,
      input,
      output,
      total_params: self.total_params,
    })
  }
}

/// A finished, immutable model graph with one input and one output.
#[derive(Debug, Clone)]
pub struct Graph {
  name: String,
  nodes: Vec<Node>,
  input: NodeId,
  output: NodeId,
  total_params: usize,
}

impl Graph {
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn nodes(&self) -> &[Node] {
    &self.nodes
  }

  pub fn inputs(&self) -> &[NodeId] {
    std::slice::from_ref(&self.input)
  }

  pub fn outputs(&self) -> &[NodeId] {
    std::slice::from_ref(&self.output)
  }

  pub fn input_shape(&self) -> Shape {
    self.nodes[self.input].shape
  }

  pub fn output_shape(&self) -> Shape {
    self.nodes[self.output].shape
  }

  pub fn param_count(&self) -> usize {
    self.total_params
  }

  /// Layer types in insertion order.
  pub fn topology(&self) -> Vec<&'static str> {
    self.nodes.iter().map(|node| node.op.kind()).collect()
  }

  pub fn count(&self, kind: &str) -> usize {
    self.nodes.iter().filter(|node| node.op.kind() == kind).count()
  }

  pub fn summary(&self) -> Summary<'_> {
    Summary::new(self)
  }
}
