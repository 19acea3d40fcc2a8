use ndarray::{Array2, ArrayView2, Zip};
use tracing::debug;

use crate::{
    error::{Result, SurfacePlotError},
    function::evaluate,
    gradient::GradientKey,
    types::{CompiledFunction, FunctionTransform, GridCoordinate, Point, Value, ValueRange},
};

/// Mutable per-sample state: the displayed value and the gradient entry it is coloured with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleState {
    pub current_z: Value,
    pub colour_key: GradientKey,
}

impl Default for SampleState {
    fn default() -> Self {
        Self {
            current_z: 0.,
            colour_key: GradientKey::FIRST,
        }
    }
}

/// Placement of a sample lattice: its lower corner and spacing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lattice {
    pub x_min: Value,
    pub y_min: Value,
    pub resolution: Value,
}

impl Lattice {
    /// Domain coordinate of sample `[ix, iy]`.
    #[inline]
    pub fn coordinate(&self, ix: usize, iy: usize) -> GridCoordinate {
        GridCoordinate::new(
            self.x_min + ix as Value * self.resolution,
            self.y_min + iy as Value * self.resolution,
        )
    }
}

/// A rectangular lattice of samples over `[x_min, x_max] × [y_min, y_max]`.
///
/// The lattice has `size_x × size_y` samples spaced `resolution` apart, with
/// sample `[ix, iy]` at `(x_min + ix * resolution, y_min + iy * resolution)`.
///
/// Both `samples` and `targets` are indexed `[ix, iy]`.
#[derive(Debug, Clone)]
pub struct SampleGrid {
    lattice: Lattice,
    samples: Array2<SampleState>,
    targets: Array2<Value>,
}

impl Default for SampleGrid {
    fn default() -> Self {
        Self {
            lattice: Lattice {
                x_min: 0.,
                y_min: 0.,
                resolution: 1.,
            },
            samples: Array2::default((0, 0)),
            targets: Array2::zeros((0, 0)),
        }
    }
}

impl SampleGrid {
    /// Creates a grid swept over the given domain. See [`rebuild`](SampleGrid::rebuild).
    pub fn new(
        x_min: Value,
        x_max: Value,
        y_min: Value,
        y_max: Value,
        resolution: Value,
    ) -> Result<Self> {
        let mut grid = Self::default();
        grid.rebuild(x_min, x_max, y_min, y_max, resolution)?;
        Ok(grid)
    }

    /// Discards every sample and sweeps a fresh lattice from the minimum of each axis
    /// in steps of `resolution`, stopping at the last step not past the maximum:
    /// `floor((max - min) / resolution) + 1` samples per axis. All new samples start at `z = 0`.
    ///
    /// Returns [`SurfacePlotError::InvalidResolution`] unless `resolution` is finite and positive.
    pub fn rebuild(
        &mut self,
        x_min: Value,
        x_max: Value,
        y_min: Value,
        y_max: Value,
        resolution: Value,
    ) -> Result<()> {
        if !(resolution.is_finite() && resolution > 0.) {
            return Err(SurfacePlotError::InvalidResolution(resolution));
        }
        let size_x = sweep_len(x_min, x_max, resolution);
        let size_y = sweep_len(y_min, y_max, resolution);

        self.lattice = Lattice {
            x_min,
            y_min,
            resolution,
        };
        self.samples = Array2::default((size_x, size_y));
        self.targets = Array2::zeros((size_x, size_y));

        debug!(size_x, size_y, resolution, "rebuilt sample grid");
        Ok(())
    }

    /// Removes every sample, leaving an empty grid.
    pub fn clear(&mut self) {
        self.samples = Array2::default((0, 0));
        self.targets = Array2::zeros((0, 0));
    }

    /// Evaluates `function` at every sample and stores the results as targets.
    ///
    /// Evaluation is parallelised with Rayon; the range is then gathered in a
    /// single sequential pass where the first sample seeds both bounds.
    /// Returns `None` for an empty grid.
    pub fn resample_targets(
        &mut self,
        transform: &FunctionTransform,
        function: &CompiledFunction,
    ) -> Option<ValueRange> {
        let lattice = self.lattice;
        Zip::indexed(&mut self.targets).par_for_each(|(ix, iy), target| {
            *target = evaluate(lattice.coordinate(ix, iy), transform, function);
        });

        let mut values = self.targets.iter().copied();
        let mut range = ValueRange::seeded(values.next()?);
        values.for_each(|v| range.include(v));

        debug!(
            min = range.min,
            max = range.max,
            samples = self.len(),
            "resampled targets"
        );
        Some(range)
    }

    /// Number of samples along X and Y.
    pub fn shape(&self) -> [usize; 2] {
        let (size_x, size_y) = self.samples.dim();
        [size_x, size_y]
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn resolution(&self) -> Value {
        self.lattice.resolution
    }

    pub fn lattice(&self) -> Lattice {
        self.lattice
    }

    /// Domain coordinate of sample `[ix, iy]`.
    #[inline]
    pub fn coordinate(&self, ix: usize, iy: usize) -> GridCoordinate {
        self.lattice.coordinate(ix, iy)
    }

    /// Index of the sample at `coord`, if `coord` is one of this grid's coordinates.
    pub fn index_of(&self, coord: GridCoordinate) -> Option<[usize; 2]> {
        let [size_x, size_y] = self.shape();
        let Lattice {
            x_min,
            y_min,
            resolution,
        } = self.lattice;
        let ix = ((coord.x - x_min) / resolution).round();
        let iy = ((coord.y - y_min) / resolution).round();
        if ix < 0. || iy < 0. || ix as usize >= size_x || iy as usize >= size_y {
            return None;
        }
        let (ix, iy) = (ix as usize, iy as usize);
        (self.coordinate(ix, iy) == coord).then_some([ix, iy])
    }

    /// All coordinates in index order.
    pub fn coordinates(&self) -> impl Iterator<Item = GridCoordinate> + '_ {
        self.samples
            .indexed_iter()
            .map(|((ix, iy), _)| self.coordinate(ix, iy))
    }

    pub fn sample(&self, ix: usize, iy: usize) -> Option<&SampleState> {
        self.samples.get((ix, iy))
    }

    pub fn sample_at(&self, coord: GridCoordinate) -> Option<&SampleState> {
        let [ix, iy] = self.index_of(coord)?;
        self.sample(ix, iy)
    }

    pub fn samples(&self) -> ArrayView2<'_, SampleState> {
        self.samples.view()
    }

    pub fn samples_mut(&mut self) -> &mut Array2<SampleState> {
        &mut self.samples
    }

    /// Values from the most recent [`resample_targets`](SampleGrid::resample_targets).
    pub fn targets(&self) -> ArrayView2<'_, Value> {
        self.targets.view()
    }

    /// Display position of sample `[ix, iy]`: x and y scaled by `spread`, z as sampled.
    pub fn marker_position(&self, ix: usize, iy: usize, spread: Value) -> Option<Point> {
        let state = self.sample(ix, iy)?;
        let coord = self.coordinate(ix, iy);
        Some(Point::new(coord.x * spread, coord.y * spread, state.current_z))
    }
}

/// Number of samples in a sweep from `min` that never steps past `max`.
fn sweep_len(min: Value, max: Value, step: Value) -> usize {
    let span = max - min;
    if span < 0. {
        return 0;
    }
    (span / step).floor() as usize + 1
}
