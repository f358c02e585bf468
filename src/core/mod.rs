//! # Core Module
//!
//! Shared container primitives used throughout the engine. The engine is
//! single-threaded and frame-driven, so only the single-threaded variants
//! exist here.
//!
//! ## Key Components
//! - `StResource`: Single-threaded reference-counted resource with interior mutability
//! - `StSystem`: Single-threaded shared handle to a boxed system
//!
//! ## Usage
//! ```rust
//! use voxel_desktop::core::{StResource, StSystem};
//!
//! let counter = StResource::new(0);
//! *counter.get_mut() += 1;
//! assert_eq!(*counter.get(), 1);
//!
//! let system = StSystem::new(Box::new(42u32));
//! assert_eq!(**system.get(), 42);
//! ```

pub mod st_resource;
pub mod st_system;

pub use st_resource::StResource;
pub use st_system::StSystem;
