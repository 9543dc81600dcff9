use std::fmt;

use super::Graph;

const HEADERS: [&str; 4] = ["Layer (type)", "Output Shape", "Param #", "Connected to"];
const GAP: usize = 3;

/// Layer table of a [`Graph`], rendered through [`fmt::Display`].
pub struct Summary<'a> {
  graph: &'a Graph,
}

impl<'a> Summary<'a> {
  pub fn new(graph: &'a Graph) -> Self {
    Self { graph }
  }

  fn rows(&self) -> Vec<[String; 4]> {
    let nodes = self.graph.nodes();

    nodes
      .iter()
      .map(|node| {
        let connected = node
          .inputs
          .iter()
          .map(|&i| nodes[i].name.as_str())
          .collect::<Vec<_>>()
          .join(", ");

        [
          format!("{} ({})", node.name, node.op.kind()),
          node.shape.to_string(),
          node.params.to_string(),
          connected,
        ]
      })
      .collect()
  }
}

impl fmt::Display for Summary<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let rows = self.rows();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
      for (width, cell) in widths.iter_mut().zip(row) {
        *width = (*width).max(cell.len());
      }
    }
    let total_width = widths.iter().sum::<usize>() + GAP * (widths.len() - 1);

    let write_row = |f: &mut fmt::Formatter<'_>, cells: [&str; 4]| -> fmt::Result {
      let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join(&" ".repeat(GAP));
      writeln!(f, "{}", line.trim_end())
    };

    writeln!(f, "Model: \"{}\"", self.graph.name())?;
    writeln!(f, "{}", "_".repeat(total_width))?;
    write_row(f, HEADERS)?;
    writeln!(f, "{}", "=".repeat(total_width))?;

    for (i, row) in rows.iter().enumerate() {
      if i > 0 {
        writeln!(f, "{}", "_".repeat(total_width))?;
      }
      write_row(f, [row[0].as_str(), row[1].as_str(), row[2].as_str(), row[3].as_str()])?;
    }

    let total = self.graph.param_count();
    writeln!(f, "{}", "=".repeat(total_width))?;
    writeln!(f, "Total params: {total}")?;
    writeln!(f, "Trainable params: {total}")?;
    writeln!(f, "Non-trainable params: 0")?;
    write!(f, "{}", "_".repeat(total_width))
  }
}

#[cfg(test)]
mod tests {
  use crate::graph::{GraphBuilder, Shape};

  #[test]
  fn lists_every_layer_and_totals() {
    let mut g = GraphBuilder::new("toy");
    let x = g.input("input", Shape::new(1, 4, 4));
    let y = g.conv2d("conv", x, 4, 3).unwrap();
    let y = g.pixel_shuffle("shuffle", y, 2).unwrap();
    let graph = g.finish(y).unwrap();

    let text = graph.summary().to_string();

    assert!(text.starts_with("Model: \"toy\""));
    assert!(text.contains("input (InputLayer)"));
    assert!(text.contains("conv (Conv2D)"));
    assert!(text.contains("shuffle (PixelShuffle)"));
    assert!(text.contains("(None, 1, 8, 8)"));
    assert!(text.contains("Total params: 40"));
    assert!(text.contains("Trainable params: 40"));
    assert!(text.contains("Non-trainable params: 0"));
  }

  #[test]
  fn shows_both_sides_of_an_addition() {
    let mut g = GraphBuilder::new("skip");
    let x = g.input("input", Shape::new(2, 4, 4));
    let y = g.relu("relu", x).unwrap();
    let y = g.add("merge", y, x).unwrap();
    let graph = g.finish(y).unwrap();

    let text = graph.summary().to_string();
    let merge = text.lines().find(|line| line.contains("merge")).unwrap();

    assert!(merge.ends_with("relu, input"));
  }
}
