pub mod cloud;
pub mod colour;
pub mod config;
pub mod controller;
pub mod error;
pub mod function;
pub mod gradient;
pub mod grid;
pub mod interp;
pub mod plugin;
pub mod transition;
pub mod types;

pub use controller::{DisplayMode, SurfaceController};
pub use plugin::SurfacePlotPlugin;
