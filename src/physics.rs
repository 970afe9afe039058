use cgmath::Vector2;
use rapier2d::prelude::*;
use std::collections::HashMap;

use crate::render::{BodySprite, BodyStyle};

/// Canvas pixels per simulation meter. Rapier is tuned for meter-sized bodies.
pub const PIXELS_PER_METER: f32 = 50.0;
/// Length of one fixed step in milliseconds (60 Hz).
pub const STEP_MS: f32 = 1000.0 / 60.0;
/// Gravity is expressed in canvas units where 1.0 means 0.001 px/ms².
const GRAVITY_SCALE: f32 = 0.001;

fn to_meters(px: Vector2<f32>) -> Vector<Real> {
    vector![px.x / PIXELS_PER_METER, px.y / PIXELS_PER_METER]
}

fn to_pixels(m: &Vector<Real>) -> Vector2<f32> {
    Vector2::new(m.x * PIXELS_PER_METER, m.y * PIXELS_PER_METER)
}

/// Per-body data the engine does not track for us
#[derive(Debug, Clone)]
struct BodyData {
    size: Vector2<f32>,
    style: BodyStyle,
}

/// A rectangle to insert, in canvas pixels. `center` is the body's position.
#[derive(Debug, Clone, Copy)]
pub struct RectSpec {
    pub center: Vector2<f32>,
    pub size: Vector2<f32>,
    pub angle: f32,
    pub restitution: f32,
    pub style: BodyStyle,
}

/// The joint that follows the pointer while a body is dragged.
#[derive(Debug, Clone, Copy)]
struct DragJoint {
    anchor: RigidBodyHandle,
    joint: ImpulseJointHandle,
    body: RigidBodyHandle,
}

/// Wrapper around the Rapier2D world, in canvas pixel coordinates (y grows downward)
pub struct PhysicsWorld {
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    gravity: Vector2<f32>,
    integration_parameters: IntegrationParameters,
    body_data: HashMap<RigidBodyHandle, BodyData>,
    /// Insertion order, used for hit-testing and drawing.
    order: Vec<RigidBodyHandle>,
    drag: Option<DragJoint>,
    steps: u64,
}

impl PhysicsWorld {
    pub fn new(gravity: Vector2<f32>) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = STEP_MS / 1000.0;

        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            gravity,
            integration_parameters,
            body_data: HashMap::new(),
            order: Vec::new(),
            drag: None,
            steps: 0,
        }
    }

    pub fn gravity(&self) -> Vector2<f32> {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vector2<f32>) {
        self.gravity = gravity;
    }

    /// Number of bodies in the world, drag anchors excluded
    pub fn body_count(&self) -> usize {
        self.body_data.len()
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn add_static_rect(&mut self, rect: RectSpec) -> RigidBodyHandle {
        self.insert_rect(RigidBodyBuilder::fixed(), rect)
    }

    pub fn add_dynamic_rect(&mut self, rect: RectSpec) -> RigidBodyHandle {
        self.insert_rect(RigidBodyBuilder::dynamic(), rect)
    }

    fn insert_rect(&mut self, builder: RigidBodyBuilder, rect: RectSpec) -> RigidBodyHandle {
        let rigid_body = builder
            .translation(to_meters(rect.center))
            .rotation(rect.angle)
            .build();
        let handle = self.rigid_body_set.insert(rigid_body);

        let half = to_meters(rect.size / 2.0);
        let collider = ColliderBuilder::cuboid(half.x, half.y)
            .restitution(rect.restitution)
            .build();
        self.collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);

        self.body_data.insert(handle, BodyData { size: rect.size, style: rect.style });
        self.order.push(handle);
        handle
    }

    /// Advance the simulation by one fixed step
    pub fn step(&mut self) {
        let physics_hooks = ();
        let event_handler = ();

        let gravity = to_meters(self.gravity * GRAVITY_SCALE * 1_000_000.0);

        self.physics_pipeline.step(
            &gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &physics_hooks,
            &event_handler,
        );
        self.steps += 1;
    }

    pub fn position(&self, handle: RigidBodyHandle) -> Option<Vector2<f32>> {
        self.rigid_body_set.get(handle).map(|b| to_pixels(b.translation()))
    }

    pub fn angle(&self, handle: RigidBodyHandle) -> Option<f32> {
        self.rigid_body_set.get(handle).map(|b| b.rotation().angle())
    }

    pub fn size(&self, handle: RigidBodyHandle) -> Option<Vector2<f32>> {
        self.body_data.get(&handle).map(|d| d.size)
    }

    pub fn is_static(&self, handle: RigidBodyHandle) -> Option<bool> {
        self.rigid_body_set.get(handle).map(|b| b.is_fixed())
    }

    pub fn mass(&self, handle: RigidBodyHandle) -> Option<f32> {
        self.rigid_body_set.get(handle).map(|b| b.mass())
    }

    pub fn velocity(&self, handle: RigidBodyHandle) -> Option<Vector2<f32>> {
        self.rigid_body_set.get(handle).map(|b| to_pixels(b.linvel()))
    }

    /// Apply a force for the duration of one step, given in px·mass/ms².
    pub fn apply_force(&mut self, handle: RigidBodyHandle, force: Vector2<f32>) {
        if let Some(rigid_body) = self.rigid_body_set.get_mut(handle) {
            // impulse = F·dt, with the px/ms velocity change expressed in m/s
            let impulse = to_meters(force * STEP_MS * 1000.0);
            rigid_body.apply_impulse(impulse, true);
        }
    }

    /// First body in `candidates` whose shape contains `point`.
    pub fn query_point(
        &self,
        candidates: &[RigidBodyHandle],
        point: Vector2<f32>,
    ) -> Option<RigidBodyHandle> {
        let p = to_meters(point);
        let p = point![p.x, p.y];
        candidates.iter().copied().find(|&handle| {
            self.rigid_body_set.get(handle).is_some_and(|body| {
                body.colliders().iter().any(|&c| {
                    self.collider_set
                        .get(c)
                        .is_some_and(|collider| collider.shape().contains_point(collider.position(), &p))
                })
            })
        })
    }

    /// Pin the first dynamic body under `point` to a kinematic anchor with a rigid
    /// revolute joint, so it follows the pointer exactly.
    pub fn start_drag(&mut self, point: Vector2<f32>) -> Option<RigidBodyHandle> {
        if self.drag.is_some() {
            return None;
        }
        let dynamic: Vec<RigidBodyHandle> = self
            .order
            .iter()
            .copied()
            .filter(|&h| self.rigid_body_set.get(h).is_some_and(|b| b.is_dynamic()))
            .collect();
        let body = self.query_point(&dynamic, point)?;

        let target = to_meters(point);
        let local = self.rigid_body_set.get(body)?
            .position()
            .inverse_transform_point(&point![target.x, target.y]);

        let anchor = self.rigid_body_set.insert(
            RigidBodyBuilder::kinematic_position_based()
                .translation(target)
                .build(),
        );
        let joint = RevoluteJointBuilder::new()
            .local_anchor1(point![0.0, 0.0])
            .local_anchor2(local)
            .build();
        let joint = self.impulse_joint_set.insert(anchor, body, joint, true);

        self.drag = Some(DragJoint { anchor, joint, body });
        Some(body)
    }

    pub fn move_drag(&mut self, point: Vector2<f32>) {
        let Some(drag) = self.drag else { return };
        if let Some(anchor) = self.rigid_body_set.get_mut(drag.anchor) {
            anchor.set_next_kinematic_translation(to_meters(point));
        }
        if let Some(body) = self.rigid_body_set.get_mut(drag.body) {
            body.wake_up(true);
        }
    }

    /// Release the drag joint. Returns the body that was held.
    pub fn end_drag(&mut self) -> Option<RigidBodyHandle> {
        let drag = self.drag.take()?;
        self.impulse_joint_set.remove(drag.joint, true);
        self.rigid_body_set.remove(
            drag.anchor,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        Some(drag.body)
    }

    pub fn dragged_body(&self) -> Option<RigidBodyHandle> {
        self.drag.map(|d| d.body)
    }

    /// Snapshot of every body for the renderer
    pub fn sprites(&self) -> Vec<BodySprite> {
        self.order
            .iter()
            .filter_map(|handle| {
                let body = self.rigid_body_set.get(*handle)?;
                let data = self.body_data.get(handle)?;
                Some(BodySprite {
                    center: to_pixels(body.translation()),
                    size: data.size,
                    angle: body.rotation().angle(),
                    style: data.style,
                })
            })
            .collect()
    }
}
