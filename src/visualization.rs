//! Interactive 3D browser for explored states using kiss3d.

use kiss3d::prelude::*;
use rustc_hash::FxHashMap;

use slidegraph::explorer::{StateId, StateSpace};
use slidegraph::grid::{Extent, Placement};
use slidegraph::pieces::PieceId;

const PALETTE: [(f32, f32, f32); 8] = [
    (1.0, 0.2, 0.2), // red
    (0.2, 1.0, 0.2), // green
    (0.2, 0.2, 1.0), // blue
    (1.0, 1.0, 0.2), // yellow
    (1.0, 0.2, 1.0), // magenta
    (0.2, 1.0, 1.0), // cyan
    (1.0, 0.6, 0.2), // orange
    (0.6, 0.4, 1.0), // violet
];

/// Display color for a piece; ids past the palette wrap around.
fn piece_color(id: PieceId) -> Color {
    let (r, g, b) = PALETTE[id.0 as usize % PALETTE.len()];
    Color::new(r, g, b, 1.0)
}

fn obstacle_color() -> Color {
    Color::new(0.35, 0.35, 0.35, 1.0)
}

/// A cube in the scene. Obstacles have no piece and never explode.
struct RenderedCube {
    node: SceneNode3d,
    base_position: Vec3,
    piece: Option<PieceId>,
}

/// World position of a cell, with the board centred on the origin.
fn cell_position(extent: Extent, (x, y, z): (i32, i32, i32)) -> Vec3 {
    Vec3::new(
        x as f32 - (extent.width as f32 - 1.0) / 2.0,
        y as f32 - (extent.height as f32 - 1.0) / 2.0,
        z as f32 - (extent.depth as f32 - 1.0) / 2.0,
    )
}

/// Adds one cube per piece cell and per forbidden cell.
///
/// Returns the cubes and each piece's centroid in world space.
fn build_scene(
    scene: &mut SceneNode3d,
    placement: &Placement,
) -> (Vec<RenderedCube>, FxHashMap<PieceId, Vec3>) {
    const CUBE_SIZE: f32 = 0.9;

    let extent = placement.extent();
    let mut cubes = Vec::new();
    let mut centroids = FxHashMap::default();

    for piece in placement.pieces() {
        let mut sum = Vec3::ZERO;
        for cell in piece.cells() {
            let base_position = cell_position(extent, cell);
            sum += base_position;
            let node = scene
                .add_cube(CUBE_SIZE, CUBE_SIZE, CUBE_SIZE)
                .set_color(piece_color(piece.id()))
                .set_position(base_position);
            cubes.push(RenderedCube {
                node,
                base_position,
                piece: Some(piece.id()),
            });
        }
        centroids.insert(piece.id(), sum / piece.footprint().cell_count() as f32);
    }

    for &cell in placement.board().forbidden() {
        let base_position = cell_position(extent, cell);
        let node = scene
            .add_cube(CUBE_SIZE, CUBE_SIZE, CUBE_SIZE)
            .set_color(obstacle_color())
            .set_position(base_position);
        cubes.push(RenderedCube {
            node,
            base_position,
            piece: None,
        });
    }

    (cubes, centroids)
}

fn title(space: &StateSpace, current: StateId) -> String {
    format!(
        "State {}/{} ({} neighbors) - [Left/Right] navigate, [N] follow edge, [Up/Down] explode, [R] reset",
        current + 1,
        space.state_count(),
        space.neighbors(current).len()
    )
}

/// Opens a window for browsing the states of `space`.
pub fn display(space: StateSpace) {
    pollster::block_on(display_async(space));
}

async fn display_async(space: StateSpace) {
    let state_count = space.state_count();
    let mut current = space.initial();
    // index into the current state's neighbor list used by [N]
    let mut next_edge = 0usize;

    let mut window = Window::new(&title(&space, current)).await;

    let extent = space.states()[current].extent();
    let longest = extent.width.max(extent.height).max(extent.depth) as f32;
    let mut camera = OrbitCamera3d::default();
    camera.set_dist(longest * 2.0 + 4.0);

    let mut scene = SceneNode3d::empty();
    scene
        .add_light(Light::point(100.0))
        .set_position(Vec3::new(longest * 2.0, longest * 2.0, longest * 2.0));

    let (mut cubes, mut centroids) = build_scene(&mut scene, &space.states()[current]);

    let mut explosion_amount: f32 = 0.0;
    const EXPLOSION_SPEED: f32 = 0.05;
    let mut needs_rebuild = false;

    loop {
        for event in window.events().iter() {
            if let kiss3d::event::WindowEvent::Key(key, action, _) = event.value {
                use kiss3d::event::{Action, Key};
                if action == Action::Press {
                    match key {
                        Key::Up => explosion_amount += EXPLOSION_SPEED,
                        Key::Down => {
                            explosion_amount = (explosion_amount - EXPLOSION_SPEED).max(0.0)
                        }
                        Key::R => explosion_amount = 0.0,
                        Key::Right => {
                            current = (current + 1) % state_count;
                            next_edge = 0;
                            needs_rebuild = true;
                        }
                        Key::Left => {
                            current = current.checked_sub(1).unwrap_or(state_count - 1);
                            next_edge = 0;
                            needs_rebuild = true;
                        }
                        Key::N => {
                            let neighbors = space.neighbors(current);
                            if !neighbors.is_empty() {
                                current = neighbors[next_edge % neighbors.len()];
                                next_edge += 1;
                                needs_rebuild = true;
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        if needs_rebuild {
            for mut cube in cubes.drain(..) {
                cube.node.remove();
            }
            (cubes, centroids) = build_scene(&mut scene, &space.states()[current]);
            window.set_title(&title(&space, current));
            needs_rebuild = false;
        }

        for cube in &mut cubes {
            let offset = cube
                .piece
                .and_then(|id| centroids.get(&id))
                .map_or(Vec3::ZERO, |centroid| centroid.normalize_or_zero());
            cube.node
                .set_position(cube.base_position + offset * explosion_amount * 2.0);
        }

        if !window.render_3d(&mut scene, &mut camera).await {
            break;
        }
    }
}
