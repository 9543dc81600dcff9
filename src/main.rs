mod cli;
mod setup;

use clap::Parser;

use edsr_rs::{
  config::EdsrConfig,
  graph::write_svg,
  model::build_graph,
  Result,
};

use crate::{cli::Cli, setup::setup_tracing};

const DIAGRAM_PATH: &str = "model.svg";

fn main() -> Result<()> {
  let args = Cli::parse();
  setup_tracing()?;

  let config = EdsrConfig::new(args.scale as usize);
  let graph = build_graph(&config)?;

  println!("{}", graph.summary());
  write_svg(&graph, DIAGRAM_PATH)?;

  Ok(())
}
