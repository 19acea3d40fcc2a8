use std::{fmt, sync::Arc};

use crate::{
    error::{Result, SurfacePlotError},
    types::{CompiledFunction, FunctionTransform, GridCoordinate, Value},
};

/// Samples `function` at `coord` under `transform`.
///
/// Offsets move the function underneath a fixed sampling lattice, so panning never
/// changes which coordinates exist:
///
/// ```text
/// z = f(x - x_offset, y - y_offset) * z_zoom
/// ```
#[inline]
pub fn evaluate(
    coord: GridCoordinate,
    transform: &FunctionTransform,
    function: &CompiledFunction,
) -> Value {
    function(coord.x - transform.x_offset, coord.y - transform.y_offset) * transform.z_zoom()
}

/// A named, shareable surface function.
#[derive(Clone)]
pub struct SurfaceFunction {
    name: String,
    function: Arc<CompiledFunction>,
}

impl SurfaceFunction {
    pub fn new<F>(name: impl Into<String>, function: F) -> Self
    where
        F: Fn(Value, Value) -> Value + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            function: Arc::new(function),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn function(&self) -> &CompiledFunction {
        self.function.as_ref()
    }

    pub fn sample(&self, x: Value, y: Value) -> Value {
        (self.function)(x, y)
    }
}

impl fmt::Debug for SurfaceFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceFunction").field("name", &self.name).finish()
    }
}

/// Functions available for display, kept sorted by name.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: Vec<SurfaceFunction>,
}

impl FunctionRegistry {
    /// The five example surfaces, `Function1` through `Function5`.
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        registry.insert(SurfaceFunction::new("Function1", |x, y| {
            2.75 / ((x / 3.).powi(2) * (y / 3.).powi(2)).exp()
        }));
        registry.insert(SurfaceFunction::new("Function2", |x, y| {
            (x.powi(2) + y.powi(2)).abs().sqrt().sin()
        }));
        registry.insert(SurfaceFunction::new("Function3", |x, y| {
            2. * ((x / 1.5).powi(3) + (y / 1.5).powi(3)).abs().sqrt().sin()
        }));
        registry.insert(SurfaceFunction::new("Function4", |x, y| {
            -2. * x * y * (-(x / 4.).powi(2) - (y / 4.).powi(2)).exp()
        }));
        registry.insert(SurfaceFunction::new("Function5", |x, y| {
            0.5 * (x.abs() + y.abs()).cos() * (x.abs() + y.abs())
        }));
        registry
    }

    /// Adds `function`, replacing any existing function with the same name.
    pub fn insert(&mut self, function: SurfaceFunction) {
        match self
            .functions
            .binary_search_by(|f| f.name().cmp(function.name()))
        {
            Ok(i) => self.functions[i] = function,
            Err(i) => self.functions.insert(i, function),
        }
    }

    pub fn get(&self, name: &str) -> Result<&SurfaceFunction> {
        self.functions
            .iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| SurfacePlotError::UnknownFunction(name.to_string()))
    }

    pub fn first(&self) -> Option<&SurfaceFunction> {
        self.functions.first()
    }

    /// Functions in name order.
    pub fn iter(&self) -> impl Iterator<Item = &SurfaceFunction> {
        self.functions.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.iter().map(SurfaceFunction::name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn evaluate_applies_offset_then_zoom() {
        let f = SurfaceFunction::new("plane", |x, y| x + 10. * y);
        let transform = FunctionTransform::new(1., -2., 1.);
        let z = evaluate(GridCoordinate::new(3., 4.), &transform, f.function());
        // (3 - 1) + 10 * (4 + 2) = 62, zoomed by 10
        assert_relative_eq!(z, 620.);
    }

    #[test]
    fn panning_shifts_function_under_lattice() {
        let f = SurfaceFunction::new("bump", |x, y| (-(x * x + y * y)).exp());
        let centred = FunctionTransform::default();
        let panned = FunctionTransform::new(2., 0., 0.);
        let peak = evaluate(GridCoordinate::new(0., 0.), &centred, f.function());
        let moved = evaluate(GridCoordinate::new(2., 0.), &panned, f.function());
        assert_relative_eq!(peak, moved);
    }

    #[test]
    fn builtin_functions_are_ordered() {
        let registry = FunctionRegistry::builtin();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(
            names,
            ["Function1", "Function2", "Function3", "Function4", "Function5"]
        );
        assert_relative_eq!(registry.get("Function1").unwrap().sample(0., 0.), 2.75);
        assert_relative_eq!(registry.get("Function4").unwrap().sample(0., 5.), 0.);
        assert!(matches!(
            registry.get("Function9"),
            Err(SurfacePlotError::UnknownFunction(_))
        ));
    }

    #[test]
    fn insert_replaces_same_name() {
        let mut registry = FunctionRegistry::builtin();
        registry.insert(SurfaceFunction::new("Function2", |_, _| 7.));
        registry.insert(SurfaceFunction::new("Bowl", |x, y| x * x + y * y));
        assert_eq!(registry.len(), 6);
        assert_eq!(registry.first().unwrap().name(), "Bowl");
        assert_eq!(registry.get("Function2").unwrap().sample(1., 1.), 7.);
    }
}
