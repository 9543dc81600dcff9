use clap::Parser;

#[derive(Parser)]
#[command(version, author)]
#[command(about = "Build the EDSR super-resolution network, print its summary and draw it", long_about = None)]
pub struct Cli {
  #[arg(short, long, help = "Upscale ratio, a positive integer")]
  #[arg(value_name = "SCALE", value_parser = clap::value_parser!(u32).range(1..))]
  pub scale: u32,
}
