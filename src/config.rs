use std::path::PathBuf;

use crate::{colour::Colour, types::Value};

/// Whether a zoom-only transition recolours samples as they move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZoomRecolour {
    /// Keep the colours from before the zoom; the value range is left untouched.
    #[default]
    Suppress,
    /// Rescale the value range by the zoom ratio and recolour on every tick.
    Recolour,
}

/// Tunables for the surface engine.
///
/// ```rust,ignore
/// let config = SurfaceConfig {
///     resolution: 0.25,
///     zoom_recolour: ZoomRecolour::Recolour,
///     ..Default::default()
/// };
/// let controller = SurfaceController::new(config);
/// ```
#[derive(Debug, Clone)]
pub struct SurfaceConfig {
    /// Lower limit of the sampled domain on both axes.
    pub domain_min: Value,
    /// Width of the sampled domain on both axes.
    pub domain_length: Value,
    /// Multiplier from domain units to display units for x and y.
    pub spread: Value,
    /// Radius of a function-sample marker, in display units.
    pub marker_radius: Value,

    /// Initial sample spacing.
    pub resolution: Value,
    /// Smallest accepted sample spacing. Default: `0.05`.
    pub min_resolution: Value,
    /// Largest accepted sample spacing. Default: `0.55`.
    pub max_resolution: Value,
    /// Spacings below this use [`dense_step_count`](SurfaceConfig::dense_step_count).
    pub dense_resolution: Value,

    /// Ticks per transition. Default: `100`.
    pub step_count: usize,
    /// Ticks per transition on dense grids. Default: `3`.
    pub dense_step_count: usize,
    /// Seconds from the first to the last tick of a transition. Default: `2`.
    pub animation_duration: f64,
    /// Delay before the first tick after a function or resolution change.
    pub function_delay: f64,
    /// Delay before the first tick after an offset or zoom change.
    pub adjust_delay: f64,

    /// Initial base-10 exponent of the z-scale.
    pub z_unit: Value,
    pub min_z_unit: Value,
    pub max_z_unit: Value,

    /// Largest accepted absolute offset on either axis. Default: `500`.
    pub offset_limit: Value,
    /// Range of the coarse offset control, in tens. Default: `50`.
    pub coarse_offset_limit: i32,
    /// Range of the fine offset control. Default: `10`.
    pub fine_offset_limit: i32,

    /// Colour of the smallest sampled values.
    pub min_colour: Colour,
    /// Colour of the largest sampled values.
    pub max_colour: Colour,

    pub zoom_recolour: ZoomRecolour,

    /// Directory the bundled point-cloud files are read from.
    pub point_cloud_dir: PathBuf,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            domain_min: -10.,
            domain_length: 20.,
            spread: 2.,
            marker_radius: 0.1,
            resolution: 0.15,
            min_resolution: 0.05,
            max_resolution: 0.55,
            dense_resolution: 0.15,
            step_count: 100,
            dense_step_count: 3,
            animation_duration: 2.,
            function_delay: 0.3,
            adjust_delay: 0.5,
            z_unit: 0.,
            min_z_unit: -2.,
            max_z_unit: 2.,
            offset_limit: 500.,
            coarse_offset_limit: 50,
            fine_offset_limit: 10,
            min_colour: Colour::LAWN_GREEN,
            max_colour: Colour::ORANGE_RED,
            zoom_recolour: ZoomRecolour::default(),
            point_cloud_dir: PathBuf::from("."),
        }
    }
}

impl SurfaceConfig {
    /// Upper limit of the sampled domain.
    pub fn domain_max(&self) -> Value {
        self.domain_min + self.domain_length
    }

    /// Ticks used for a transition on a grid with spacing `resolution`.
    pub fn step_count_for(&self, resolution: Value) -> usize {
        if resolution < self.dense_resolution {
            self.dense_step_count
        } else {
            self.step_count
        }
    }
}
