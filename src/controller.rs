use std::path::Path;

use tracing::{debug, info, warn};

use crate::{
    cloud::{PointCloud, PointCloudLayout, PointCloudLoader, PointCloudRegistry},
    colour::Colour,
    config::{SurfaceConfig, ZoomRecolour},
    error::{Result, SurfacePlotError},
    function::{FunctionRegistry, SurfaceFunction},
    gradient::{GradientKey, GradientTable},
    grid::SampleGrid,
    transition::{SampleSink, SampleUpdate, Transition, TransitionPlan},
    types::{FunctionTransform, Value, ValueRange},
};

/// What the controller is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Function samples on the grid, with axis guides.
    Function,
    /// Markers from a point-cloud file; the grid is empty.
    PointCloud,
}

/// Coarse and fine slider positions that together make up one axis offset.
///
/// ```text
/// offset = coarse * 10 + fine
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OffsetControls {
    pub coarse: i32,
    pub fine: i32,
}

impl OffsetControls {
    pub fn new(coarse: i32, fine: i32) -> Self {
        Self { coarse, fine }
    }

    /// The offset these controls select, each control clamped to its configured range.
    pub fn offset(&self, config: &SurfaceConfig) -> Value {
        let coarse = self
            .coarse
            .clamp(-config.coarse_offset_limit, config.coarse_offset_limit);
        let fine = self
            .fine
            .clamp(-config.fine_offset_limit, config.fine_offset_limit);
        (coarse * 10 + fine) as Value
    }
}

/// Owns all engine state and drives it from parameter changes and clock ticks.
///
/// Every parameter change that affects the surface installs a fresh [`Transition`],
/// replacing whatever was running; deltas are computed from the values displayed at
/// that instant, so a half-finished transition continues smoothly from where it was.
///
/// ```text
///                 select_function / set_offsets / set_z_unit / set_resolution
///               ┌──────────────┐
///               ▼              │
///  new() ──► Function ─────────┘
///               │  ▲
///  select_point_cloud      select_function / set_resolution (grid rebuilt)
///               ▼  │
///            PointCloud
/// ```
#[derive(Debug)]
pub struct SurfaceController {
    config: SurfaceConfig,
    functions: FunctionRegistry,
    clouds: PointCloudRegistry,
    function: SurfaceFunction,
    transform: FunctionTransform,
    resolution: Value,
    step_count: usize,
    grid: SampleGrid,
    gradient: GradientTable,
    min_colour: Colour,
    max_colour: Colour,
    range: Option<ValueRange>,
    mode: DisplayMode,
    cloud: PointCloud,
    transition: Option<Transition>,
    layout_generation: u64,
}

impl SurfaceController {
    /// Builds the grid at the configured resolution and starts animating towards the
    /// first registered function.
    pub fn new(config: SurfaceConfig) -> Result<Self> {
        let clouds = PointCloudRegistry::builtin(config.point_cloud_dir.clone());
        Self::with_registries(config, FunctionRegistry::builtin(), clouds)
    }

    pub fn with_registries(
        config: SurfaceConfig,
        functions: FunctionRegistry,
        clouds: PointCloudRegistry,
    ) -> Result<Self> {
        let function = functions
            .first()
            .cloned()
            .ok_or_else(|| SurfacePlotError::UnknownFunction(String::new()))?;
        let resolution = clamp_parameter(
            "resolution",
            config.resolution,
            config.min_resolution,
            config.max_resolution,
        )?;
        let z_unit = clamp_parameter(
            "z_unit",
            config.z_unit,
            config.min_z_unit,
            config.max_z_unit,
        )?;

        let mut controller = Self {
            transform: FunctionTransform::default().with_z_unit(z_unit),
            resolution,
            step_count: config.step_count_for(resolution),
            grid: SampleGrid::default(),
            gradient: GradientTable::new(config.min_colour, config.max_colour),
            min_colour: config.min_colour,
            max_colour: config.max_colour,
            range: None,
            mode: DisplayMode::Function,
            cloud: PointCloud::default(),
            transition: None,
            layout_generation: 0,
            function,
            functions,
            clouds,
            config,
        };
        controller.rebuild_grid()?;
        controller.retarget(controller.config.function_delay);
        Ok(controller)
    }

    /// Registered functions in name order.
    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.functions
    }

    pub fn point_clouds(&self) -> &PointCloudRegistry {
        &self.clouds
    }

    pub fn point_clouds_mut(&mut self) -> &mut PointCloudRegistry {
        &mut self.clouds
    }

    /// Selects a registered function by name.
    /// See [`set_function`](SurfaceController::set_function).
    pub fn select_function(&mut self, name: &str) -> Result<()> {
        let function = self.functions.get(name)?.clone();
        self.set_function(function)
    }

    /// Displays `function`, leaving point-cloud mode first if necessary, and animates
    /// every sample towards its new value with recolouring.
    pub fn set_function(&mut self, function: SurfaceFunction) -> Result<()> {
        info!(function = function.name(), "selected function");
        self.function = function;
        if self.mode == DisplayMode::PointCloud {
            self.enter_function_mode()?;
        }
        self.retarget(self.config.function_delay);
        Ok(())
    }

    /// Loads a registered point cloud and switches to point-cloud mode.
    ///
    /// On failure the controller stays in its previous mode and state.
    pub fn select_point_cloud(&mut self, name: &str) -> Result<()> {
        let path = self.clouds.path_of(name)?;
        let layout = self.clouds.get(name)?.layout;
        self.load_point_cloud(path, layout)
    }

    /// Loads a point-cloud file in the given layout and switches to point-cloud mode.
    ///
    /// On failure the controller stays in its previous mode and state.
    pub fn load_point_cloud(
        &mut self,
        path: impl AsRef<Path>,
        layout: PointCloudLayout,
    ) -> Result<()> {
        let loader = PointCloudLoader::new(self.config.spread, self.config.marker_radius);
        let cloud = loader.load(path, layout)?;
        self.show_point_cloud(cloud);
        Ok(())
    }

    /// Replaces every function marker with `cloud`.
    pub fn show_point_cloud(&mut self, cloud: PointCloud) {
        info!(markers = cloud.len(), "displaying point cloud");
        self.grid.clear();
        self.transition = None;
        self.range = None;
        self.cloud = cloud;
        self.mode = DisplayMode::PointCloud;
        self.layout_generation += 1;
    }

    /// Sets the sample spacing, rebuilds the grid and animates from zero to the function.
    ///
    /// Dense grids (spacing below the configured threshold) animate in fewer steps.
    /// Returns the spacing actually applied after clamping.
    pub fn set_resolution(&mut self, resolution: Value) -> Result<Value> {
        let resolution = clamp_parameter(
            "resolution",
            resolution,
            self.config.min_resolution,
            self.config.max_resolution,
        )?;
        self.resolution = resolution;
        self.step_count = self.config.step_count_for(resolution);
        if self.mode == DisplayMode::PointCloud {
            self.enter_function_mode()?;
        } else {
            self.rebuild_grid()?;
        }
        self.retarget(self.config.function_delay);
        Ok(resolution)
    }

    /// Pans the function under the grid. Offsets are clamped to the configured limit.
    pub fn set_offsets(&mut self, x_offset: Value, y_offset: Value) -> Result<()> {
        let limit = self.config.offset_limit;
        let x_offset = clamp_parameter("x_offset", x_offset, -limit, limit)?;
        let y_offset = clamp_parameter("y_offset", y_offset, -limit, limit)?;
        self.transform.x_offset = x_offset;
        self.transform.y_offset = y_offset;
        self.retarget(self.config.adjust_delay);
        Ok(())
    }

    /// Pans using coarse and fine control positions for each axis.
    pub fn set_offset_controls(&mut self, x: OffsetControls, y: OffsetControls) -> Result<()> {
        self.set_offsets(x.offset(&self.config), y.offset(&self.config))
    }

    /// Sets the z-scale to `10^z_unit`.
    ///
    /// The function is not re-evaluated; displayed values are rescaled by the ratio of
    /// new to old zoom. Whether colours follow depends on [`ZoomRecolour`].
    pub fn set_z_unit(&mut self, z_unit: Value) -> Result<()> {
        let z_unit = clamp_parameter(
            "z_unit",
            z_unit,
            self.config.min_z_unit,
            self.config.max_z_unit,
        )?;
        let old_zoom = self.transform.z_zoom();
        self.transform = self.transform.with_z_unit(z_unit);
        let ratio = self.transform.z_zoom() / old_zoom;

        if self.grid.is_empty() {
            return Ok(());
        }
        let recolour = match self.config.zoom_recolour {
            ZoomRecolour::Suppress => None,
            ZoomRecolour::Recolour => {
                self.range = self.range.map(|range| range.scaled(ratio));
                self.range
            }
        };
        let plan = TransitionPlan::plan_zoom(self.grid.samples(), ratio, self.step_count);
        debug!(ratio, steps = self.step_count, "starting zoom transition");
        self.transition = Some(Transition::new(
            plan,
            recolour,
            self.config.adjust_delay,
            self.config.animation_duration,
        ));
        Ok(())
    }

    /// Recolours the gradient in place and immediately recolours every function sample
    /// from its current value, reporting each sample to `sink`.
    pub fn set_gradient_endpoints<S: SampleSink + ?Sized>(
        &mut self,
        min_colour: Colour,
        max_colour: Colour,
        sink: &mut S,
    ) {
        self.min_colour = min_colour;
        self.max_colour = max_colour;
        self.gradient.refresh(min_colour, max_colour);
        self.recolour(sink);
    }

    /// Recomputes every sample's colour key from its current value against the current range.
    pub fn recolour<S: SampleSink + ?Sized>(&mut self, sink: &mut S) {
        let Some(range) = self.range else {
            return;
        };
        // Built in `with_registries` and only ever refreshed in place afterwards.
        debug_assert!(self.gradient.is_built());
        let lattice = self.grid.lattice();
        for ((ix, iy), sample) in self.grid.samples_mut().indexed_iter_mut() {
            sample.colour_key = GradientKey::for_value(sample.current_z, range);
            sink.on_tick(SampleUpdate {
                index: [ix, iy],
                coordinate: lattice.coordinate(ix, iy),
                z: sample.current_z,
                colour_key: sample.colour_key,
                colour: self.gradient.get(sample.colour_key).unwrap_or(Colour::BLACK),
            });
        }
    }

    /// Advances the running transition's clock by `dt` seconds and applies due ticks.
    /// Returns the number of ticks applied.
    pub fn advance<S: SampleSink + ?Sized>(&mut self, dt: f64, sink: &mut S) -> usize {
        let Some(transition) = self.transition.as_mut() else {
            return 0;
        };
        let ticks = transition.advance(dt, &mut self.grid, &self.gradient, sink);
        if transition.is_finished() {
            debug!("transition finished");
            self.transition = None;
        }
        ticks
    }

    /// Applies the next tick of the running transition regardless of the clock.
    /// Returns `false` if nothing is running.
    pub fn tick<S: SampleSink + ?Sized>(&mut self, sink: &mut S) -> bool {
        let Some(transition) = self.transition.as_mut() else {
            return false;
        };
        let stepped = transition.step(&mut self.grid, &self.gradient, sink);
        if transition.is_finished() {
            self.transition = None;
        }
        stepped
    }

    /// Applies every remaining tick of the running transition at once.
    pub fn finish<S: SampleSink + ?Sized>(&mut self, sink: &mut S) -> usize {
        let mut ticks = 0;
        while self.tick(sink) {
            ticks += 1;
        }
        ticks
    }

    /// Colour a sample holding `value` would get under the current range.
    pub fn colour_of(&self, value: Value) -> Result<Colour> {
        let range = self.range.ok_or(SurfacePlotError::EmptyGrid)?;
        self.gradient.get(GradientKey::for_value(value, range))
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn current_function(&self) -> &SurfaceFunction {
        &self.function
    }

    pub fn transform(&self) -> &FunctionTransform {
        &self.transform
    }

    pub fn resolution(&self) -> Value {
        self.resolution
    }

    /// Ticks used by transitions at the current resolution.
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn grid(&self) -> &SampleGrid {
        &self.grid
    }

    pub fn gradient(&self) -> &GradientTable {
        &self.gradient
    }

    /// Current `(min_colour, max_colour)` endpoints.
    pub fn gradient_endpoints(&self) -> (Colour, Colour) {
        (self.min_colour, self.max_colour)
    }

    /// Range of the most recent resample; `None` while the grid is empty.
    pub fn value_range(&self) -> Option<ValueRange> {
        self.range
    }

    pub fn point_cloud(&self) -> &PointCloud {
        &self.cloud
    }

    pub fn transition(&self) -> Option<&Transition> {
        self.transition.as_ref()
    }

    pub fn is_animating(&self) -> bool {
        self.transition.is_some()
    }

    /// Incremented whenever the set of markers is replaced, so renderers know to respawn.
    pub fn layout_generation(&self) -> u64 {
        self.layout_generation
    }

    /// Axis guides are shown alongside function samples only.
    pub fn axes_visible(&self) -> bool {
        self.mode == DisplayMode::Function
    }

    /// Sizes of the three axis boxes (along z, y and x), in display units.
    ///
    /// Each axis is `(domain_length + 2) * spread` long and one marker radius thick.
    pub fn axis_extents(&self) -> [[Value; 3]; 3] {
        let long = (self.config.domain_length + 2.) * self.config.spread;
        let short = self.config.marker_radius;
        [[short, short, long], [short, long, short], [long, short, short]]
    }

    fn enter_function_mode(&mut self) -> Result<()> {
        info!("returning to function display");
        self.cloud = PointCloud::default();
        self.mode = DisplayMode::Function;
        self.rebuild_grid()
    }

    fn rebuild_grid(&mut self) -> Result<()> {
        let (min, max) = (self.config.domain_min, self.config.domain_max());
        self.grid.rebuild(min, max, min, max, self.resolution)?;
        self.transition = None;
        self.layout_generation += 1;
        Ok(())
    }

    /// Resamples the current function and installs a recolouring transition towards it.
    fn retarget(&mut self, delay: f64) {
        let Some(range) = self
            .grid
            .resample_targets(&self.transform, self.function.function())
        else {
            return;
        };
        self.range = Some(range);
        let plan = TransitionPlan::plan(
            self.grid.samples(),
            self.grid.targets(),
            self.step_count,
        );
        debug!(
            function = self.function.name(),
            steps = self.step_count,
            min = range.min,
            max = range.max,
            "starting transition"
        );
        self.transition = Some(Transition::new(
            plan,
            Some(range),
            delay,
            self.config.animation_duration,
        ));
    }
}

/// Rejects non-finite values and clamps finite ones into `[min, max]`.
fn clamp_parameter(name: &'static str, value: Value, min: Value, max: Value) -> Result<Value> {
    if !value.is_finite() {
        return Err(SurfacePlotError::NonFiniteParameter(name));
    }
    let clamped = value.clamp(min, max);
    if clamped != value {
        warn!(
            parameter = name,
            requested = value,
            clamped,
            "parameter out of range, clamped"
        );
    }
    Ok(clamped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn offset_controls_compose_coarse_and_fine() {
        let config = SurfaceConfig::default();
        assert_eq!(OffsetControls::new(3, -4).offset(&config), 26.);
        assert_eq!(OffsetControls::new(-50, -10).offset(&config), -510.);
        assert_eq!(OffsetControls::new(99, 99).offset(&config), 510.);
    }

    #[test]
    fn clamp_parameter_rejects_nan_and_clamps() {
        assert!(matches!(
            clamp_parameter("r", Value::NAN, 0., 1.),
            Err(SurfacePlotError::NonFiniteParameter("r"))
        ));
        assert_relative_eq!(clamp_parameter("r", 3., 0., 1.).unwrap(), 1.);
        assert_relative_eq!(clamp_parameter("r", 0.4, 0., 1.).unwrap(), 0.4);
    }

    #[test]
    fn axis_extents_follow_domain() {
        let controller = SurfaceController::new(SurfaceConfig {
            resolution: 0.5,
            ..Default::default()
        })
        .unwrap();
        let [z_axis, _, x_axis] = controller.axis_extents();
        assert_relative_eq!(z_axis[2], 44.);
        assert_relative_eq!(x_axis[1], 0.1);
    }
}
