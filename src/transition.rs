use ndarray::{Array2, ArrayView2, Zip};
use tracing::warn;

use crate::{
    colour::Colour,
    gradient::{GradientKey, GradientTable},
    grid::{SampleGrid, SampleState},
    types::{GridCoordinate, Value, ValueRange},
};

/// Float slack when converting elapsed time into a tick count.
const CLOCK_EPSILON: f64 = 1e-9;

/// One sample's new state after a tick, handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleUpdate {
    /// Grid index `[ix, iy]` of the sample.
    pub index: [usize; 2],
    pub coordinate: GridCoordinate,
    pub z: Value,
    pub colour_key: GradientKey,
    pub colour: Colour,
}

/// Receives per-sample updates. Implemented for every `FnMut(SampleUpdate)`.
pub trait SampleSink {
    fn on_tick(&mut self, update: SampleUpdate);
}

impl<F: FnMut(SampleUpdate)> SampleSink for F {
    fn on_tick(&mut self, update: SampleUpdate) {
        self(update)
    }
}

/// Per-sample z increments for one transition, indexed `[ix, iy]` like the grid.
#[derive(Debug, Clone)]
pub struct TransitionPlan {
    deltas: Array2<Value>,
    step_count: usize,
}

impl TransitionPlan {
    /// Plans a move from each sample's current value to its target:
    ///
    /// ```text
    /// delta = (target - current_z) / step_count
    /// ```
    pub fn plan(
        samples: ArrayView2<'_, SampleState>,
        targets: ArrayView2<'_, Value>,
        step_count: usize,
    ) -> Self {
        let step_count = step_count.max(1);
        let n = step_count as Value;
        let deltas = Zip::from(samples)
            .and(targets)
            .par_map_collect(|sample, target| (target - sample.current_z) / n);
        Self { deltas, step_count }
    }

    /// Plans a rescale of every current value by `zoom_ratio` (new zoom over old zoom):
    ///
    /// ```text
    /// delta = current_z * (zoom_ratio - 1) / step_count
    /// ```
    pub fn plan_zoom(
        samples: ArrayView2<'_, SampleState>,
        zoom_ratio: Value,
        step_count: usize,
    ) -> Self {
        let step_count = step_count.max(1);
        let n = step_count as Value;
        let deltas = samples.map(|sample| sample.current_z * (zoom_ratio - 1.) / n);
        Self { deltas, step_count }
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn deltas(&self) -> ArrayView2<'_, Value> {
        self.deltas.view()
    }

    /// Applies one tick: adds each delta to its sample and reports the result to `sink`.
    ///
    /// With `recolour` set, each sample's colour key is recomputed from its new value
    /// against that range; otherwise samples keep their current key.
    /// A plan whose shape no longer matches the grid is ignored.
    pub fn step<S: SampleSink + ?Sized>(
        &self,
        grid: &mut SampleGrid,
        recolour: Option<ValueRange>,
        gradient: &GradientTable,
        sink: &mut S,
    ) {
        if self.deltas.dim() != grid.samples().dim() {
            warn!(
                plan = ?self.deltas.dim(),
                grid = ?grid.samples().dim(),
                "transition plan does not match grid, skipping tick"
            );
            return;
        }
        // Callers build the table before any plan is stepped.
        debug_assert!(gradient.is_built(), "gradient table must be built before stepping");

        let lattice = grid.lattice();
        Zip::indexed(grid.samples_mut())
            .and(&self.deltas)
            .for_each(|(ix, iy), sample, delta| {
                sample.current_z += delta;
                if let Some(range) = recolour {
                    sample.colour_key = GradientKey::for_value(sample.current_z, range);
                }
                sink.on_tick(SampleUpdate {
                    index: [ix, iy],
                    coordinate: lattice.coordinate(ix, iy),
                    z: sample.current_z,
                    colour_key: sample.colour_key,
                    colour: gradient.get(sample.colour_key).unwrap_or(Colour::BLACK),
                });
            });
    }
}

/// A running transition: a [`TransitionPlan`] driven by a fixed-interval tick clock.
///
/// Tick `k` (1-based) is due once `delay + k * tick_interval` seconds have elapsed,
/// where `tick_interval = duration / step_count`. There is no pause or cancel;
/// a newer transition simply replaces this one.
///
/// ```text
/// |-- delay --|-- tick 1 --|-- tick 2 --| ... |-- tick n --|
/// ```
#[derive(Debug, Clone)]
pub struct Transition {
    plan: TransitionPlan,
    recolour: Option<ValueRange>,
    delay: f64,
    tick_interval: f64,
    elapsed: f64,
    ticks_done: usize,
}

impl Transition {
    pub fn new(
        plan: TransitionPlan,
        recolour: Option<ValueRange>,
        delay: f64,
        duration: f64,
    ) -> Self {
        let tick_interval = duration.max(0.) / plan.step_count() as f64;
        Self {
            plan,
            recolour,
            delay: delay.max(0.),
            tick_interval,
            elapsed: 0.,
            ticks_done: 0,
        }
    }

    pub fn plan(&self) -> &TransitionPlan {
        &self.plan
    }

    /// The range colours are recomputed against, or `None` if this transition keeps colours.
    pub fn recolour(&self) -> Option<ValueRange> {
        self.recolour
    }

    pub fn ticks_remaining(&self) -> usize {
        self.plan.step_count() - self.ticks_done
    }

    pub fn is_finished(&self) -> bool {
        self.ticks_remaining() == 0
    }

    /// Advances the clock by `dt` seconds and returns how many ticks became due.
    pub fn advance_clock(&mut self, dt: f64) -> usize {
        self.elapsed += dt.max(0.);
        let since_start = self.elapsed - self.delay;
        if since_start < 0. {
            return 0;
        }
        let due = if self.tick_interval > 0. {
            ((since_start / self.tick_interval) + CLOCK_EPSILON).floor() as usize
        } else {
            self.plan.step_count()
        };
        due.min(self.plan.step_count()).saturating_sub(self.ticks_done)
    }

    /// Applies one tick if any remain. Returns `false` once the transition is finished.
    pub fn step<S: SampleSink + ?Sized>(
        &mut self,
        grid: &mut SampleGrid,
        gradient: &GradientTable,
        sink: &mut S,
    ) -> bool {
        if self.is_finished() {
            return false;
        }
        self.plan.step(grid, self.recolour, gradient, sink);
        self.ticks_done += 1;
        true
    }

    /// Advances the clock by `dt` and applies every tick that became due.
    /// Returns the number of ticks applied.
    pub fn advance<S: SampleSink + ?Sized>(
        &mut self,
        dt: f64,
        grid: &mut SampleGrid,
        gradient: &GradientTable,
        sink: &mut S,
    ) -> usize {
        let due = self.advance_clock(dt);
        for _ in 0..due {
            self.step(grid, gradient, sink);
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FunctionTransform;
    use approx::assert_relative_eq;

    fn grid_with_targets() -> SampleGrid {
        let mut grid = SampleGrid::new(-1., 1., -1., 1., 0.5).unwrap();
        let surface = |x: Value, y: Value| 3. * x - y * y;
        grid.resample_targets(&FunctionTransform::default(), &surface).unwrap();
        grid
    }

    #[test]
    fn plan_divides_distance_by_steps() {
        let mut grid = grid_with_targets();
        grid.samples_mut()[[0, 0]].current_z = 1.;
        let plan = TransitionPlan::plan(grid.samples(), grid.targets(), 4);
        // target at (-1, -1) is -4
        assert_relative_eq!(plan.deltas()[[0, 0]], (-4. - 1.) / 4.);
        assert_eq!(plan.step_count(), 4);
    }

    #[test]
    fn stepping_every_tick_reaches_targets() {
        let mut grid = grid_with_targets();
        let gradient = GradientTable::new(Colour::LAWN_GREEN, Colour::ORANGE_RED);
        let plan = TransitionPlan::plan(grid.samples(), grid.targets(), 100);
        for _ in 0..100 {
            plan.step(&mut grid, None, &gradient, &mut |_: SampleUpdate| {});
        }
        let targets = grid.targets().to_owned();
        Zip::from(grid.samples()).and(&targets).for_each(|sample, target| {
            assert_relative_eq!(sample.current_z, *target, epsilon = 1e-9);
        });
    }

    #[test]
    fn recolouring_tracks_new_values() {
        let mut grid = grid_with_targets();
        let range = ValueRange { min: -4., max: 3. };
        let gradient = GradientTable::new(Colour::LAWN_GREEN, Colour::ORANGE_RED);
        let plan = TransitionPlan::plan(grid.samples(), grid.targets(), 1);

        let mut updates = Vec::new();
        plan.step(&mut grid, Some(range), &gradient, &mut |u: SampleUpdate| updates.push(u));
        assert_eq!(updates.len(), grid.len());

        // (1, 0) holds the maximum, (-1, -1) the minimum
        let max = updates.iter().find(|u| u.index == [4, 2]).unwrap();
        assert_relative_eq!(max.z, 3.);
        assert_eq!(max.colour_key, GradientKey::FIRST);
        assert_eq!(max.colour, Colour::ORANGE_RED);
        let min = updates.iter().find(|u| u.index == [0, 0]).unwrap();
        assert_eq!(min.colour_key, GradientKey::LAST);
        assert_eq!(min.coordinate, GridCoordinate::new(-1., -1.));
    }

    #[test]
    fn without_recolour_keys_are_kept() {
        let mut grid = grid_with_targets();
        grid.samples_mut().fill(SampleState {
            current_z: 0.,
            colour_key: GradientKey::from_ramp_position(0.3),
        });
        let gradient = GradientTable::new(Colour::LAWN_GREEN, Colour::ORANGE_RED);
        let plan = TransitionPlan::plan(grid.samples(), grid.targets(), 2);
        plan.step(&mut grid, None, &gradient, &mut |_: SampleUpdate| {});
        assert!(grid
            .samples()
            .iter()
            .all(|s| s.colour_key == GradientKey::from_ramp_position(0.3)));
    }

    #[test]
    fn zoom_plan_scales_current_values() {
        let mut grid = SampleGrid::new(0., 0., 0., 0., 1.).unwrap();
        grid.samples_mut()[[0, 0]].current_z = 10.;
        let gradient = GradientTable::new(Colour::LAWN_GREEN, Colour::ORANGE_RED);
        let plan = TransitionPlan::plan_zoom(grid.samples(), 10., 100);
        assert_relative_eq!(plan.deltas()[[0, 0]], 0.9, epsilon = 1e-12);
        for _ in 0..100 {
            plan.step(&mut grid, None, &gradient, &mut |_: SampleUpdate| {});
        }
        assert_relative_eq!(grid.samples()[[0, 0]].current_z, 100., epsilon = 1e-9);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "gradient table must be built")]
    fn stepping_with_unbuilt_gradient_is_caught() {
        let mut grid = grid_with_targets();
        let plan = TransitionPlan::plan(grid.samples(), grid.targets(), 2);
        plan.step(&mut grid, None, &GradientTable::default(), &mut |_: SampleUpdate| {});
    }

    #[test]
    fn mismatched_plan_is_ignored() {
        let mut grid = grid_with_targets();
        let plan = TransitionPlan::plan(grid.samples(), grid.targets(), 3);
        grid.rebuild(0., 1., 0., 1., 1.).unwrap();
        let gradient = GradientTable::new(Colour::LAWN_GREEN, Colour::ORANGE_RED);
        let mut count = 0;
        plan.step(&mut grid, None, &gradient, &mut |_: SampleUpdate| count += 1);
        assert_eq!(count, 0);
    }

    #[test]
    fn clock_waits_for_delay_then_ticks_at_interval() {
        let mut grid = grid_with_targets();
        let gradient = GradientTable::new(Colour::LAWN_GREEN, Colour::ORANGE_RED);
        let plan = TransitionPlan::plan(grid.samples(), grid.targets(), 100);
        // 2 seconds over 100 ticks: one tick every 0.02s
        let mut transition = Transition::new(plan, None, 0.3, 2.);
        let mut ignore = |_: SampleUpdate| {};
        let mut advance = |dt: f64| transition.advance(dt, &mut grid, &gradient, &mut ignore);
        assert_eq!(advance(0.29), 0);
        assert_eq!(advance(0.01), 0);
        assert_eq!(advance(0.02), 1);
        assert_eq!(advance(0.1), 5);
        assert_eq!(transition.ticks_remaining(), 94);
    }

    #[test]
    fn transition_runs_exactly_step_count_ticks() {
        let mut grid = grid_with_targets();
        let gradient = GradientTable::new(Colour::LAWN_GREEN, Colour::ORANGE_RED);
        let plan = TransitionPlan::plan(grid.samples(), grid.targets(), 3);
        let mut transition = Transition::new(plan, None, 0.5, 2.);

        let mut ignore = |_: SampleUpdate| {};
        let mut ticks = 0;
        ticks += transition.advance(0.4, &mut grid, &gradient, &mut ignore);
        assert_eq!(ticks, 0);
        ticks += transition.advance(60., &mut grid, &gradient, &mut ignore);
        assert_eq!(ticks, 3);
        assert!(transition.is_finished());
        assert_eq!(transition.advance(1., &mut grid, &gradient, &mut ignore), 0);
        assert!(!transition.step(&mut grid, &gradient, &mut ignore));

        let targets = grid.targets().to_owned();
        Zip::from(grid.samples()).and(&targets).for_each(|sample, target| {
            assert_relative_eq!(sample.current_z, *target, epsilon = 1e-9);
        });
    }
}
