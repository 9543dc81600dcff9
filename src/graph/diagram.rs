use std::{
  fmt::{self, Write as _},
  fs::File,
  io::{BufWriter, Write},
  path::Path,
};

use super::{Graph, Node};
use crate::error::Result;

const MARGIN: usize = 20;
const BOX_WIDTH: usize = 460;
const BOX_HEIGHT: usize = 44;
const ROW_GAP: usize = 24;
const SKIP_LANE: usize = 120;

fn escape(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for c in text.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&apos;"),
      c => out.push(c),
    }
  }
  out
}

fn row_top(id: usize) -> usize {
  MARGIN + id * (BOX_HEIGHT + ROW_GAP)
}

fn input_label(graph: &Graph, node: &Node) -> String {
  if node.inputs.is_empty() {
    return node.shape.to_string();
  }

  let shapes: Vec<String> = node
    .inputs
    .iter()
    .map(|&i| graph.nodes()[i].shape.to_string())
    .collect();
  if shapes.len() == 1 {
    shapes.concat()
  } else {
    format!("[{}]", shapes.join(", "))
  }
}

fn render(graph: &Graph, svg: &mut String) -> fmt::Result {
  let nodes = graph.nodes();
  let width = MARGIN * 2 + BOX_WIDTH + SKIP_LANE;
  let height = MARGIN * 2 + nodes.len() * (BOX_HEIGHT + ROW_GAP);
  let center = MARGIN + BOX_WIDTH / 2;
  let right = MARGIN + BOX_WIDTH;

  writeln!(
    svg,
    r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}" font-family="monospace" font-size="12">"#
  )?;
  writeln!(svg, "<title>{}</title>", escape(graph.name()))?;
  writeln!(
    svg,
    r#"<defs><marker id="arrow" viewBox="0 0 10 10" refX="10" refY="5" markerWidth="6" markerHeight="6" orient="auto-start-reverse"><path d="M 0 0 L 10 5 L 0 10 z"/></marker></defs>"#
  )?;

  for node in nodes {
    for &src in &node.inputs {
      let from_bottom = row_top(src) + BOX_HEIGHT;
      let to_top = row_top(node.id);

      if src + 1 == node.id {
        writeln!(
          svg,
          r#"<line x1="{center}" y1="{from_bottom}" x2="{center}" y2="{to_top}" stroke="black" marker-end="url(#arrow)"/>"#
        )?;
      } else {
        let y1 = row_top(src) + BOX_HEIGHT / 2;
        let y2 = row_top(node.id) + BOX_HEIGHT / 2;
        let bend = right + (SKIP_LANE / 4).max(((y2 - y1) / 8).min(SKIP_LANE - MARGIN));
        writeln!(
          svg,
          r#"<path d="M {right} {y1} C {bend} {y1}, {bend} {y2}, {right} {y2}" fill="none" stroke="gray" marker-end="url(#arrow)"/>"#
        )?;
      }
    }
  }

  for node in nodes {
    let top = row_top(node.id);
    writeln!(
      svg,
      r#"<g id="node-{id}"><rect x="{MARGIN}" y="{top}" width="{BOX_WIDTH}" height="{BOX_HEIGHT}" rx="4" fill="white" stroke="black"/>"#,
      id = node.id,
    )?;
    writeln!(
      svg,
      r#"<text x="{center}" y="{}" text-anchor="middle">{}: {}</text>"#,
      top + 17,
      escape(&node.name),
      node.op.kind(),
    )?;
    writeln!(
      svg,
      r#"<text x="{center}" y="{}" text-anchor="middle">input: {} | output: {}</text></g>"#,
      top + 35,
      escape(&input_label(graph, node)),
      node.shape,
    )?;
  }

  svg.push_str("</svg>\n");
  Ok(())
}

/// Renders `graph` top to bottom, one box per layer with names and shapes.
pub fn render_svg(graph: &Graph) -> String {
  let mut svg = String::new();
  render(graph, &mut svg).expect("formatting into a String is infallible");
  svg
}

pub fn write_svg(graph: &Graph, path: impl AsRef<Path>) -> Result<()> {
  let path = path.as_ref();
  let mut buffered_file_write = BufWriter::new(File::create(path)?);

  buffered_file_write.write_all(render_svg(graph).as_bytes())?;
  buffered_file_write.flush()?;

  tracing::info!("Model diagram written to {}", path.display());
  Ok(())
}
