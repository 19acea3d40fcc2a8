use bevy::prelude::*;

use crate::{
    config::SurfaceConfig,
    controller::SurfaceController,
    transition::{SampleSink, SampleUpdate},
};

/// System sets for the surface plot pipeline.
///
/// Renderers should read [`SampleUpdates`] after [`SurfacePlotSet::Advance`]:
///
/// ```rust,ignore
/// app.add_systems(Update, move_markers.in_set(SurfacePlotSet::Apply));
/// ```
///
/// ```text
/// Advance  →  SampleUpdates filled  →  Apply  →  [your systems]
/// ```
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SurfacePlotSet {
    /// Advances the running transition by the frame's delta time.
    Advance,
    /// Consumers of [`SampleUpdates`] run here.
    Apply,
}

/// The engine state, shared with UI and rendering systems.
///
/// ```rust,ignore
/// fn on_key(keys: Res<ButtonInput<KeyCode>>, mut plot: ResMut<SurfacePlot>) {
///     if keys.just_pressed(KeyCode::Digit2) {
///         plot.select_function("Function2").ok();
///     }
/// }
/// ```
#[derive(Resource, Deref, DerefMut)]
pub struct SurfacePlot(pub SurfaceController);

/// Sample updates produced during the current frame. Cleared at the start of every
/// [`SurfacePlotSet::Advance`].
#[derive(Resource, Default, Debug)]
pub struct SampleUpdates {
    pub updates: Vec<SampleUpdate>,
}

impl SampleSink for SampleUpdates {
    fn on_tick(&mut self, update: SampleUpdate) {
        self.updates.push(update);
    }
}

/// Bevy plugin that owns a [`SurfaceController`] and ticks its transitions from [`Time`].
///
/// Panics while building if the controller rejects [`SurfacePlotPlugin::config`].
///
/// ```text
/// parameter change (any system, via ResMut<SurfacePlot>)
///   → Transition installed
///   → ticks applied each frame      (SurfacePlotSet::Advance)
///   → SampleUpdates filled
///   → your renderer moves markers   (SurfacePlotSet::Apply)
/// ```
#[derive(Default)]
pub struct SurfacePlotPlugin {
    pub config: SurfaceConfig,
}

impl Plugin for SurfacePlotPlugin {
    fn build(&self, app: &mut App) {
        // Without a controller every system reading `SurfacePlot` would fail later with
        // a less useful message, so reject a bad configuration here.
        let controller = SurfaceController::new(self.config.clone())
            .unwrap_or_else(|e| panic!("invalid surface plot configuration: {e}"));
        app.insert_resource(SurfacePlot(controller))
            .init_resource::<SampleUpdates>();

        #[cfg(feature = "auto_advance")]
        app.configure_sets(
            Update,
            (SurfacePlotSet::Advance, SurfacePlotSet::Apply).chain(),
        )
        .add_systems(
            Update,
            advance_transitions.in_set(SurfacePlotSet::Advance),
        );
    }
}

/// Clears last frame's [`SampleUpdates`] and applies every tick that became due.
///
/// Registered automatically with the `auto_advance` feature; otherwise schedule it yourself.
pub fn advance_transitions(
    time: Res<Time>,
    mut plot: ResMut<SurfacePlot>,
    mut updates: ResMut<SampleUpdates>,
) {
    updates.updates.clear();
    plot.advance(time.delta_secs_f64(), &mut *updates);
}
