//! # Voxel Desktop Application Entry Point
//!
//! Entry point for the native application. It simply calls into the
//! library's `run()` function to initialize and start the engine.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release
//! ```

fn main() {
    voxel_desktop::run();
}
