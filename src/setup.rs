use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use edsr_rs::Result;

/// Logs go to stderr, stdout is reserved for the model summary.
pub fn setup_tracing() -> Result<()> {
  let subscriber = FmtSubscriber::builder()
    .with_max_level(Level::INFO)
    .with_target(false)
    .with_writer(std::io::stderr)
    .finish();

  tracing::subscriber::set_global_default(subscriber)?;
  Ok(())
}
