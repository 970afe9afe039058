use cgmath::Vector2;
use rand::Rng;
use rand::rngs::StdRng;
use rapier2d::prelude::RigidBodyHandle;

use crate::config::{SceneConfig, degrees_to_radians};
use crate::physics::{PhysicsWorld, RectSpec};
use crate::platform::InputStrategy;
use crate::render::{BodySprite, BodyStyle};

/// An axis-aligned box in page pixels, as measured from the DOM.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Where the obstacle comes from. The web build measures a page element.
pub trait ObstacleSource {
    fn measure(&mut self) -> anyhow::Result<Option<PageRect>>;
}

/// Used where there is no page to measure.
pub struct NoObstacle;

impl ObstacleSource for NoObstacle {
    fn measure(&mut self) -> anyhow::Result<Option<PageRect>> {
        Ok(None)
    }
}

/// Pointer state for the drag/nudge/click interplay.
#[derive(Debug, Default, Clone, Copy)]
struct DragState {
    dragging: bool,
    /// Clicks are ignored until this time (ms) after a drag ends.
    suppress_until: Option<f64>,
}

/// Handles to the static bodies built at startup, kept for inspection.
#[derive(Debug, Clone, Copy)]
pub struct Boundaries {
    pub roof: RigidBodyHandle,
    pub floor: RigidBodyHandle,
    pub right: RigidBodyHandle,
    pub left: RigidBodyHandle,
}

/// Owns the world and all the state the event handlers share.
pub struct SceneController {
    config: SceneConfig,
    width: f32,
    height: f32,
    strategy: InputStrategy,
    world: PhysicsWorld,
    squares: Vec<RigidBodyHandle>,
    boundaries: Boundaries,
    mobile_roof: Option<RigidBodyHandle>,
    obstacle: Option<RigidBodyHandle>,
    obstacle_due: Option<f64>,
    obstacle_source: Box<dyn ObstacleSource>,
    drag: DragState,
    rng: StdRng,
}

impl SceneController {
    /// Build the world: randomized gravity, the falling stack and the walls.
    /// `height` is the measured canvas height; the padding is applied here.
    pub fn new(
        config: SceneConfig,
        width: f32,
        height: f32,
        strategy: InputStrategy,
        obstacle_source: Box<dyn ObstacleSource>,
        mut rng: StdRng,
        now_ms: f64,
    ) -> Self {
        let height = height + config.height_padding;
        let gravity = Vector2::new(
            rng.gen_range(config.gravity_x.clone()),
            rng.gen_range(config.gravity_y.clone()),
        );
        let mut world = PhysicsWorld::new(gravity);
        log::info!("gravity set to ({:.3}, {:.3})", gravity.x, gravity.y);

        let boundaries = add_walls(&mut world, &config, width, height);

        let mut scene = Self {
            width,
            height,
            strategy,
            world,
            squares: Vec::new(),
            boundaries,
            mobile_roof: None,
            obstacle: None,
            obstacle_due: strategy
                .places_obstacle()
                .then(|| now_ms + config.obstacle_delay_ms),
            obstacle_source,
            drag: DragState::default(),
            rng,
            config,
        };
        scene.add_stack();

        if strategy.adds_mobile_roof() {
            let wall = scene.config.wall_width;
            scene.mobile_roof = Some(scene.world.add_static_rect(hidden_rect(
                scene.width / 2.0,
                -wall / 2.0,
                scene.width,
                wall,
            )));
        }

        log::info!(
            "scene ready: {}x{} canvas, {} squares, {:?} input",
            width,
            height,
            scene.squares.len(),
            strategy
        );
        scene
    }

    /// Lay the squares out like a composite stack: each body is placed by the
    /// top-left of its bounding box, columns advance by that box's width and
    /// rows by the tallest box of the row.
    fn add_stack(&mut self) {
        let top = if self.strategy.is_mobile() {
            self.config.stack_top_mobile
        } else {
            self.config.stack_top_desktop
        };

        let mut y = top;
        for _ in 0..self.config.stack_rows {
            let mut x = 0.0;
            let mut row_height: f32 = 0.0;
            for _ in 0..self.config.stack_columns {
                let size = self.random_size();
                let angle = self.random_angle();
                let extent = size * (angle.cos().abs() + angle.sin().abs());
                let center = Vector2::new(x + extent / 2.0, y + extent / 2.0);
                let handle = self.world.add_dynamic_rect(self.square_spec(center, size, angle));
                self.squares.push(handle);
                x += extent;
                row_height = row_height.max(extent);
            }
            y += row_height;
        }
    }

    fn random_size(&mut self) -> f32 {
        self.rng.gen_range(self.config.square_size.clone())
    }

    fn random_angle(&mut self) -> f32 {
        degrees_to_radians(self.rng.gen_range(self.config.square_angle.clone()))
    }

    fn square_spec(&self, center: Vector2<f32>, size: f32, angle: f32) -> RectSpec {
        RectSpec {
            center,
            size: Vector2::new(size, size),
            angle,
            restitution: self.config.restitution,
            style: BodyStyle::square(&self.config),
        }
    }

    /// Add a random square centered at `position` to the world and the registry.
    pub fn spawn_square(&mut self, position: Vector2<f32>) -> RigidBodyHandle {
        let size = self.random_size();
        let angle = self.random_angle();
        let handle = self.world.add_dynamic_rect(self.square_spec(position, size, angle));
        self.squares.push(handle);
        log::debug!("spawned square {:?} at ({}, {})", handle, position.x, position.y);
        handle
    }

    /// Resolve due timers. Errors from measuring the page are returned as-is.
    pub fn poll(&mut self, now_ms: f64) -> anyhow::Result<()> {
        if let Some(until) = self.drag.suppress_until {
            if now_ms >= until {
                self.drag.suppress_until = None;
            }
        }

        match self.obstacle_due {
            Some(due) if now_ms >= due => {
                self.obstacle_due = None;
                if let Some(rect) = self.obstacle_source.measure()? {
                    self.add_obstacle(rect);
                }
            }
            _ => {}
        }
        Ok(())
    }

    pub fn add_obstacle(&mut self, rect: PageRect) -> RigidBodyHandle {
        let handle = self.world.add_static_rect(hidden_rect(
            rect.left + rect.width / 2.0,
            rect.top + rect.height / 2.0,
            rect.width,
            rect.height,
        ));
        log::info!("obstacle placed at {:?}", rect);
        self.obstacle = Some(handle);
        handle
    }

    /// Tilt: gravity follows the acceleration including gravity, y flipped.
    pub fn on_device_motion(&mut self, ax: f32, ay: f32) {
        let scale = self.config.motion_scale;
        self.world.set_gravity(Vector2::new(ax * scale, -ay * scale));
    }

    pub fn pointer_down(&mut self, position: Vector2<f32>) {
        if self.world.start_drag(position).is_some() {
            self.drag.dragging = true;
        }
    }

    /// Drags the held body, or nudges the square under the pointer upward.
    pub fn pointer_move(&mut self, position: Vector2<f32>) {
        if self.drag.dragging {
            self.world.move_drag(position);
            return;
        }

        let Some(target) = self.world.query_point(&self.squares, position) else {
            return;
        };
        let Some(mass) = self.world.mass(target) else {
            return;
        };
        let magnitude = self.config.nudge_factor * mass;
        self.world.apply_force(target, Vector2::new(0.0, -magnitude));
    }

    /// Ends a drag, or spawns a square at `position` if no drag ended recently.
    pub fn pointer_up(&mut self, position: Vector2<f32>, now_ms: f64) -> Option<RigidBodyHandle> {
        if self.drag.dragging {
            self.world.end_drag();
            self.drag.dragging = false;
            self.drag.suppress_until = Some(now_ms + self.config.drag_suppression_ms);
        }

        if self.drag.suppress_until.is_some_and(|until| now_ms < until) {
            return None;
        }
        Some(self.spawn_square(position))
    }

    pub fn step(&mut self) {
        self.world.step();
    }

    pub fn sprites(&self) -> Vec<BodySprite> {
        self.world.sprites()
    }

    pub fn gravity(&self) -> Vector2<f32> {
        self.world.gravity()
    }

    pub fn squares(&self) -> &[RigidBodyHandle] {
        &self.squares
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn boundaries(&self) -> Boundaries {
        self.boundaries
    }

    pub fn mobile_roof(&self) -> Option<RigidBodyHandle> {
        self.mobile_roof
    }

    pub fn obstacle(&self) -> Option<RigidBodyHandle> {
        self.obstacle
    }

    pub fn strategy(&self) -> InputStrategy {
        self.strategy
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.dragging
    }

    /// Canvas size with the height padding applied.
    pub fn dimensions(&self) -> (f32, f32) {
        (self.width, self.height)
    }
}

fn hidden_rect(x: f32, y: f32, width: f32, height: f32) -> RectSpec {
    RectSpec {
        center: Vector2::new(x, y),
        size: Vector2::new(width, height),
        angle: 0.0,
        restitution: 0.0,
        style: BodyStyle::hidden(),
    }
}

fn add_walls(world: &mut PhysicsWorld, config: &SceneConfig, width: f32, height: f32) -> Boundaries {
    let wall = config.wall_width;
    Boundaries {
        roof: world.add_static_rect(hidden_rect(width / 2.0, -1.5 * height, width, wall)),
        floor: world.add_static_rect(hidden_rect(width / 2.0, height + wall / 2.0, width, wall)),
        // side walls reach far past the canvas so nothing escapes sideways
        right: world.add_static_rect(hidden_rect(width + wall / 2.0, height / 2.0, wall, height * 100.0)),
        left: world.add_static_rect(hidden_rect(-wall / 2.0, height / 2.0, wall, height * 100.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    struct FixedObstacle(Option<PageRect>, u32);

    impl ObstacleSource for FixedObstacle {
        fn measure(&mut self) -> anyhow::Result<Option<PageRect>> {
            self.1 += 1;
            Ok(self.0)
        }
    }

    struct BrokenObstacle;

    impl ObstacleSource for BrokenObstacle {
        fn measure(&mut self) -> anyhow::Result<Option<PageRect>> {
            anyhow::bail!("Element not found: #about-card")
        }
    }

    fn build(strategy: InputStrategy, seed: u64) -> SceneController {
        SceneController::new(
            SceneConfig::default(),
            800.0,
            600.0,
            strategy,
            Box::new(NoObstacle),
            StdRng::seed_from_u64(seed),
            0.0,
        )
    }

    fn assert_near(actual: Vector2<f32>, expected: Vector2<f32>) {
        assert!(
            (actual.x - expected.x).abs() < 1e-2 && (actual.y - expected.y).abs() < 1e-2,
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn initial_gravity_is_within_bounds() {
        for seed in 0..50 {
            let g = build(InputStrategy::Pointer, seed).gravity();
            assert!((-0.2..=0.2).contains(&g.x), "gravity.x {}", g.x);
            assert!((0.2..=2.0).contains(&g.y), "gravity.y {}", g.y);
        }
    }

    #[test]
    fn stack_squares_have_valid_size_and_rotation() {
        let scene = build(InputStrategy::Pointer, 7);
        assert_eq!(scene.squares().len(), 160);
        for &square in scene.squares() {
            let size = scene.world().size(square).unwrap();
            assert_eq!(size.x, size.y);
            assert!((5.0..=60.0).contains(&size.x), "size {}", size.x);
            let angle = scene.world().angle(square).unwrap();
            assert!(angle >= -1e-6 && angle <= std::f32::consts::FRAC_PI_4 + 1e-6, "angle {angle}");
        }
    }

    #[test]
    fn desktop_stack_starts_above_the_canvas() {
        let scene = build(InputStrategy::Pointer, 3);
        let first = scene.world().position(scene.squares()[0]).unwrap();
        assert!(first.y < 0.0);
        assert!(first.y >= -500.0);
        assert!(first.x > 0.0);

        let mobile = build(InputStrategy::Tilt, 3);
        let first = mobile.world().position(mobile.squares()[0]).unwrap();
        assert!(first.y > 50.0);
    }

    #[test]
    fn walls_enclose_the_canvas() {
        let scene = build(InputStrategy::Pointer, 1);
        let (w, h) = scene.dimensions();
        assert_eq!(h, 605.0);
        let b = scene.boundaries();
        let world = scene.world();

        assert_near(world.position(b.roof).unwrap(), Vector2::new(w / 2.0, -1.5 * h));
        assert_near(world.position(b.floor).unwrap(), Vector2::new(w / 2.0, h + 25.0));
        assert_near(world.position(b.right).unwrap(), Vector2::new(w + 25.0, h / 2.0));
        assert_near(world.position(b.left).unwrap(), Vector2::new(-25.0, h / 2.0));
        assert_eq!(world.size(b.floor).unwrap(), Vector2::new(w, 50.0));
        assert_eq!(world.size(b.left).unwrap(), Vector2::new(50.0, h * 100.0));
        for handle in [b.roof, b.floor, b.right, b.left] {
            assert_eq!(world.is_static(handle), Some(true));
        }
        assert!(world.sprites().iter().filter(|s| !s.style.visible).count() >= 4);
    }

    #[test]
    fn tilt_adds_mobile_roof_and_follows_motion() {
        let mut scene = build(InputStrategy::Tilt, 2);
        let roof = scene.mobile_roof().expect("mobile roof");
        assert_near(scene.world().position(roof).unwrap(), Vector2::new(400.0, -25.0));

        scene.on_device_motion(2.0, -9.8);
        let g = scene.gravity();
        assert!((g.x - 1.2).abs() < 1e-5);
        assert!((g.y - 5.88).abs() < 1e-5);
    }

    #[test]
    fn static_strategy_has_no_roof_or_obstacle() {
        let mut scene = build(InputStrategy::Static, 2);
        assert!(scene.mobile_roof().is_none());
        scene.poll(10_000.0).unwrap();
        assert!(scene.obstacle().is_none());
    }

    #[test]
    fn obstacle_is_placed_after_delay_on_desktop_only() {
        let card = PageRect { left: 100.0, top: 200.0, width: 300.0, height: 120.0 };
        let mut desktop = SceneController::new(
            SceneConfig::default(),
            800.0,
            600.0,
            InputStrategy::Pointer,
            Box::new(FixedObstacle(Some(card), 0)),
            StdRng::seed_from_u64(9),
            1_000.0,
        );
        let bodies = desktop.world().body_count();

        desktop.poll(1_299.0).unwrap();
        assert!(desktop.obstacle().is_none());

        desktop.poll(1_300.0).unwrap();
        let obstacle = desktop.obstacle().expect("obstacle");
        assert_near(desktop.world().position(obstacle).unwrap(), Vector2::new(250.0, 260.0));
        assert_eq!(desktop.world().size(obstacle).unwrap(), Vector2::new(300.0, 120.0));
        assert_eq!(desktop.world().body_count(), bodies + 1);

        desktop.poll(5_000.0).unwrap();
        assert_eq!(desktop.world().body_count(), bodies + 1);

        let mut mobile = SceneController::new(
            SceneConfig::default(),
            800.0,
            600.0,
            InputStrategy::Tilt,
            Box::new(FixedObstacle(Some(card), 0)),
            StdRng::seed_from_u64(9),
            0.0,
        );
        mobile.poll(5_000.0).unwrap();
        assert!(mobile.obstacle().is_none());
    }

    #[test]
    fn obstacle_measurement_errors_propagate() {
        let mut scene = SceneController::new(
            SceneConfig::default(),
            800.0,
            600.0,
            InputStrategy::Pointer,
            Box::new(BrokenObstacle),
            StdRng::seed_from_u64(4),
            0.0,
        );
        let err = scene.poll(300.0).unwrap_err();
        assert!(err.to_string().contains("#about-card"));
    }

    #[test]
    fn click_spawns_exactly_one_square() {
        let mut scene = build(InputStrategy::Pointer, 5);
        let squares = scene.squares().len();
        let bodies = scene.world().body_count();

        let release = Vector2::new(420.0, 300.0);
        let spawned = scene.pointer_up(release, 0.0).expect("spawned");

        assert_eq!(scene.squares().len(), squares + 1);
        assert_eq!(scene.world().body_count(), bodies + 1);
        assert_eq!(*scene.squares().last().unwrap(), spawned);
        assert_near(scene.world().position(spawned).unwrap(), release);
        let size = scene.world().size(spawned).unwrap().x;
        assert!((5.0..=60.0).contains(&size));
    }

    #[test]
    fn release_after_drag_spawns_nothing() {
        let mut scene = build(InputStrategy::Pointer, 5);
        let release = Vector2::new(420.0, 300.0);
        let target = scene.spawn_square(release);
        let squares = scene.squares().len();

        scene.pointer_down(release);
        assert!(scene.is_dragging());
        assert_eq!(scene.world().dragged_body(), Some(target));
        scene.pointer_move(Vector2::new(430.0, 310.0));
        scene.step();

        assert!(scene.pointer_up(Vector2::new(430.0, 310.0), 1_000.0).is_none());
        assert!(!scene.is_dragging());
        assert_eq!(scene.squares().len(), squares);

        // still inside the suppression window
        assert!(scene.pointer_up(Vector2::new(10.0, 10.0), 1_499.0).is_none());

        scene.poll(1_500.0).unwrap();
        assert!(scene.pointer_up(Vector2::new(10.0, 10.0), 1_500.0).is_some());
        assert_eq!(scene.squares().len(), squares + 1);
    }

    #[test]
    fn hovering_nudges_square_upward() {
        let mut scene = build(InputStrategy::Pointer, 6);
        scene.on_device_motion(0.0, 0.0);
        let target = scene.spawn_square(Vector2::new(400.0, 300.0));

        scene.pointer_move(Vector2::new(400.0, 300.0));
        scene.step();
        assert!(scene.world().velocity(target).unwrap().y < 0.0);
    }

    #[test]
    fn hovering_while_dragging_does_not_nudge() {
        let mut scene = build(InputStrategy::Pointer, 6);
        scene.on_device_motion(0.0, 0.0);
        let held = scene.spawn_square(Vector2::new(200.0, 300.0));
        let other = scene.spawn_square(Vector2::new(600.0, 300.0));

        scene.pointer_down(Vector2::new(200.0, 300.0));
        assert_eq!(scene.world().dragged_body(), Some(held));
        scene.pointer_move(Vector2::new(600.0, 300.0));
        assert_eq!(scene.world().velocity(other).unwrap().y, 0.0);
    }
}
