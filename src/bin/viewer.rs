/*
 * Flocking Simulation - Interactive Viewer
 *
 * Opens a window with the flock following the mouse cursor.
 * Logging honours RUST_LOG.
 */

use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    flocking::viewer::run();
}
