#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Desktop
//!
//! A bounded voxel world renderer with embeddable app surfaces, built with Rust and WGPU.
//!
//! The world is a single fixed region of voxel cells. The player flies a free
//! camera through it, places and removes blocks, and can focus flat app quads
//! anchored in the world. All voxel and app instances live in fixed-capacity
//! GPU mirrors that are patched in place each frame; nothing is re-meshed or
//! reallocated at runtime.
//!
//! ## Key Modules
//!
//! * `application_state` - Application lifecycle, window, and input plumbing
//! * `core` - Shared single-threaded container primitives
//! * `engine_state` - The world model, camera, and rendering systems
//!
//! ## Architecture
//!
//! The engine is single-threaded and frame-driven. Each frame samples input,
//! advances the camera, recomputes the selected cell, applies edits, drains
//! the world's slot deltas into the GPU mirrors, and draws.
//!
//! ## Usage
//!
//! ```rust,no_run
//! fn main() {
//!     voxel_desktop::run();
//! }
//! ```

use application_state::{
    graphics_resources_builder::{GraphicsBuilder, MaybeGraphics},
    ApplicationState,
};

use winit::event_loop::EventLoop;

use log::info;

mod application_state;
pub mod core;
pub mod engine_state;

/// Initializes logging and runs the application event loop until exit.
pub fn run() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized");
    let event_loop = EventLoop::with_user_event().build().unwrap();

    let mut state: ApplicationState = ApplicationState {
        graphics: MaybeGraphics::Builder(GraphicsBuilder::new(event_loop.create_proxy())),
        state: None,
    };

    let _ = event_loop.run_app(&mut state);
}
