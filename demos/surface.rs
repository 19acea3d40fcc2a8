use bevy::prelude::*;
use bevy_infinite_grid::{InfiniteGridBundle, InfiniteGridPlugin, InfiniteGridSettings};
use bevy_panorbit_camera::{PanOrbitCamera, PanOrbitCameraPlugin};
use bevy_surface_plot::{
    SurfacePlotPlugin,
    colour::Colour,
    config::SurfaceConfig,
    controller::OffsetControls,
    gradient::GradientKey,
    plugin::{SampleUpdates, SurfacePlot, SurfacePlotSet},
    types::Point,
};
use tracing::{info, warn};

const HELP: &str = "\
1-5         select function
arrows      pan (shift for fine steps)
= / -       zoom z in / out
[ / ]       finer / coarser grid
P           next point cloud
G           swap gradient colours";

fn main() {
    App::new()
        .add_plugins((
            DefaultPlugins,
            SurfacePlotPlugin {
                config: SurfaceConfig {
                    point_cloud_dir: "assets/clouds".into(),
                    ..Default::default()
                },
            },
            PanOrbitCameraPlugin,
            InfiniteGridPlugin,
        ))
        .init_resource::<Controls>()
        .init_resource::<Markers>()
        .add_systems(Startup, setup)
        .add_systems(
            Update,
            handle_keys
                .after(SurfacePlotSet::Advance)
                .before(SurfacePlotSet::Apply),
        )
        .add_systems(
            Update,
            (refresh_palette, respawn_markers, move_markers)
                .chain()
                .in_set(SurfacePlotSet::Apply),
        )
        .run();
}

/// Engine space is z-up; Bevy is y-up.
fn to_world(p: Point) -> Vec3 {
    Vec3::new(p.x as f32, p.z as f32, p.y as f32)
}

fn to_color(c: Colour) -> Color {
    Color::srgba(c.red, c.green, c.blue, c.alpha)
}

#[derive(Component)]
struct SampleMarker;

#[derive(Component)]
struct CloudMarker;

#[derive(Component)]
struct AxisGuide;

/// One material per gradient entry, indexed by [`GradientKey::index`].
#[derive(Resource)]
struct Palette {
    materials: Vec<Handle<StandardMaterial>>,
    axis: Handle<StandardMaterial>,
    sphere: Handle<Mesh>,
    dirty: bool,
}

impl Palette {
    fn material(&self, key: GradientKey) -> Handle<StandardMaterial> {
        self.materials.get(key.index()).cloned().unwrap_or_default()
    }
}

/// Spawned sample entities, indexed `ix * size_y + iy`.
#[derive(Resource, Default)]
struct Markers {
    generation: Option<u64>,
    size_y: usize,
    samples: Vec<Entity>,
}

#[derive(Resource, Default)]
struct Controls {
    x: OffsetControls,
    y: OffsetControls,
    z_unit: f64,
    next_cloud: usize,
}

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    plot: Res<SurfacePlot>,
) {
    info!("{HELP}");

    commands.spawn(InfiniteGridBundle {
        settings: InfiniteGridSettings {
            fadeout_distance: 400.0,
            ..Default::default()
        },
        ..Default::default()
    });

    commands.spawn((
        Camera3d::default(),
        PanOrbitCamera {
            button_orbit: MouseButton::Right,
            button_pan: MouseButton::Middle,
            ..default()
        },
        Transform::from_xyz(40., 30., 40.).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: light_consts::lux::FULL_DAYLIGHT,
            ..Default::default()
        },
        Transform::default().with_rotation(Quat::from_rotation_x(-45.0_f32.to_radians())),
    ));

    commands.insert_resource(Palette {
        materials: palette_materials(&plot, &mut materials),
        axis: materials.add(StandardMaterial {
            base_color: to_color(Colour::BLACK),
            ..Default::default()
        }),
        sphere: meshes.add(Sphere::new(1.)),
        dirty: false,
    });
}

fn palette_materials(
    plot: &SurfacePlot,
    materials: &mut Assets<StandardMaterial>,
) -> Vec<Handle<StandardMaterial>> {
    plot.gradient()
        .iter()
        .map(|(_, colour)| {
            materials.add(StandardMaterial {
                base_color: to_color(colour),
                ..Default::default()
            })
        })
        .collect()
}

fn handle_keys(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut controls: ResMut<Controls>,
    mut plot: ResMut<SurfacePlot>,
    mut updates: ResMut<SampleUpdates>,
    mut palette: ResMut<Palette>,
) {
    let controls = &mut *controls;
    let result = (|| {
        for (i, key) in [
            KeyCode::Digit1,
            KeyCode::Digit2,
            KeyCode::Digit3,
            KeyCode::Digit4,
            KeyCode::Digit5,
        ]
        .into_iter()
        .enumerate()
        {
            if keyboard.just_pressed(key) {
                let name = plot.functions().names().nth(i).map(str::to_string);
                if let Some(name) = name {
                    plot.select_function(&name)?;
                }
            }
        }

        let fine = keyboard.pressed(KeyCode::ShiftLeft) || keyboard.pressed(KeyCode::ShiftRight);
        let mut panned = false;
        for (key, dx, dy) in [
            (KeyCode::ArrowLeft, -1, 0),
            (KeyCode::ArrowRight, 1, 0),
            (KeyCode::ArrowDown, 0, -1),
            (KeyCode::ArrowUp, 0, 1),
        ] {
            if keyboard.just_pressed(key) {
                let (x, y) = (&mut controls.x, &mut controls.y);
                if fine {
                    x.fine += dx;
                    y.fine += dy;
                } else {
                    x.coarse += dx;
                    y.coarse += dy;
                }
                panned = true;
            }
        }
        if panned {
            plot.set_offset_controls(controls.x, controls.y)?;
        }

        if keyboard.just_pressed(KeyCode::Equal) || keyboard.just_pressed(KeyCode::Minus) {
            let step = if keyboard.just_pressed(KeyCode::Equal) {
                0.5
            } else {
                -0.5
            };
            let config = plot.config();
            controls.z_unit =
                (controls.z_unit + step).clamp(config.min_z_unit, config.max_z_unit);
            plot.set_z_unit(controls.z_unit)?;
        }

        if keyboard.just_pressed(KeyCode::BracketLeft)
            || keyboard.just_pressed(KeyCode::BracketRight)
        {
            let step = if keyboard.just_pressed(KeyCode::BracketLeft) {
                -0.05
            } else {
                0.05
            };
            let resolution = plot.resolution() + step;
            plot.set_resolution(resolution)?;
        }

        if keyboard.just_pressed(KeyCode::KeyP) {
            let names: Vec<String> = plot
                .point_clouds()
                .iter()
                .map(|(name, _)| name.to_string())
                .collect();
            if !names.is_empty() {
                let name = &names[controls.next_cloud % names.len()];
                controls.next_cloud += 1;
                plot.select_point_cloud(name)?;
            }
        }

        if keyboard.just_pressed(KeyCode::KeyG) {
            let (min_colour, max_colour) = plot.gradient_endpoints();
            plot.set_gradient_endpoints(max_colour, min_colour, &mut *updates);
            palette.dirty = true;
        }
        Ok::<_, bevy_surface_plot::error::SurfacePlotError>(())
    })();

    if let Err(e) = result {
        warn!("{e}");
    }
}

/// Replaces the per-key materials after the gradient changed. Sample markers pick up
/// the new handles from the recolour updates; cloud markers are reassigned here.
fn refresh_palette(
    mut palette: ResMut<Palette>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    plot: Res<SurfacePlot>,
    mut clouds: Query<&mut MeshMaterial3d<StandardMaterial>, With<CloudMarker>>,
) {
    if !palette.dirty {
        return;
    }
    palette.materials = palette_materials(&plot, &mut materials);
    palette.dirty = false;
    let material = palette.material(GradientKey::LAST);
    for mut handle in clouds.iter_mut() {
        handle.0 = material.clone();
    }
}

fn respawn_markers(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    palette: Res<Palette>,
    plot: Res<SurfacePlot>,
    mut markers: ResMut<Markers>,
    existing: Query<Entity, Or<(With<SampleMarker>, With<CloudMarker>, With<AxisGuide>)>>,
) {
    let generation = plot.layout_generation();
    if markers.generation == Some(generation) {
        return;
    }
    for entity in existing.iter() {
        commands.entity(entity).despawn();
    }

    let config = plot.config();
    let grid = plot.grid();
    let [_, size_y] = grid.shape();
    let radius = config.marker_radius as f32;
    let mut samples = Vec::with_capacity(grid.len());
    for ((ix, iy), state) in grid.samples().indexed_iter() {
        let Some(position) = grid.marker_position(ix, iy, config.spread) else {
            continue;
        };
        let entity = commands
            .spawn((
                SampleMarker,
                Mesh3d(palette.sphere.clone()),
                MeshMaterial3d(palette.material(state.colour_key)),
                Transform::from_translation(to_world(position)).with_scale(Vec3::splat(radius)),
            ))
            .id();
        samples.push(entity);
    }

    for marker in &plot.point_cloud().markers {
        commands.spawn((
            CloudMarker,
            Mesh3d(palette.sphere.clone()),
            MeshMaterial3d(palette.material(marker.colour_key)),
            Transform::from_translation(to_world(marker.position))
                .with_scale(Vec3::splat(marker.radius as f32)),
        ));
    }

    if plot.axes_visible() {
        for [x, y, z] in plot.axis_extents() {
            let size = to_world(Point::new(x, y, z));
            commands.spawn((
                AxisGuide,
                Mesh3d(meshes.add(Cuboid::new(size.x, size.y, size.z))),
                MeshMaterial3d(palette.axis.clone()),
                Transform::default(),
            ));
        }
    }

    *markers = Markers {
        generation: Some(generation),
        size_y,
        samples,
    };
}

fn move_markers(
    updates: Res<SampleUpdates>,
    plot: Res<SurfacePlot>,
    palette: Res<Palette>,
    markers: Res<Markers>,
    mut query: Query<(&mut Transform, &mut MeshMaterial3d<StandardMaterial>), With<SampleMarker>>,
) {
    let spread = plot.config().spread;
    for update in &updates.updates {
        let [ix, iy] = update.index;
        let Some(&entity) = markers.samples.get(ix * markers.size_y + iy) else {
            continue;
        };
        let Ok((mut transform, mut material)) = query.get_mut(entity) else {
            continue;
        };
        let position = Point::new(
            update.coordinate.x * spread,
            update.coordinate.y * spread,
            update.z,
        );
        transform.translation = to_world(position);
        material.0 = palette.material(update.colour_key);
    }
}
