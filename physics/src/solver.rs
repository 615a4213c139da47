use crate::{
    arena::Arena,
    body::{Body, BodyHandle},
    collider::Material,
    config::SolverConfig,
};
use glam::{Mat3, Vec3};

// contacts within ~45 degrees of vertical count as ground
const GROUND_NORMAL_Y: f32 = 0.7;

/// A solid contact prepared for resolution. Penetration shrinks as
/// positional correction is applied over the iterations.
#[derive(Copy, Clone, Debug)]
pub(crate) struct SolverContact {
    pub body_a: BodyHandle,
    /// `None` for contacts against the voxel world.
    pub body_b: Option<BodyHandle>,
    pub point: Vec3,
    pub normal: Vec3,
    pub penetration: f32,
    pub friction: f32,
    pub restitution: f32,
}

impl SolverContact {
    pub fn new(
        body_a: BodyHandle,
        body_b: Option<BodyHandle>,
        point: Vec3,
        normal: Vec3,
        penetration: f32,
        material_a: Material,
        material_b: Material,
    ) -> Self {
        Self {
            body_a,
            body_b,
            point,
            normal,
            penetration,
            friction: (material_a.friction * material_b.friction).sqrt(),
            restitution: material_a.restitution.min(material_b.restitution),
        }
    }
}

pub(crate) fn resolve(bodies: &mut Arena<Body>, contact: &mut SolverContact, config: &SolverConfig) {
    match contact.body_b {
        Some(body_b) => {
            if let Some((a, b)) = bodies.get2_mut(contact.body_a, body_b) {
                resolve_pair(a, b, contact, config);
            }
        }
        None => {
            if let Some(a) = bodies.get_mut(contact.body_a) {
                resolve_voxel(a, contact, config);
            }
        }
    }
}

fn solver_inv_inertia(body: &Body) -> Mat3 {
    if body.solver_inv_mass() > 0.0 {
        body.inv_inertia_tensor_world()
    } else {
        Mat3::ZERO
    }
}

fn resolve_pair(body_a: &mut Body, body_b: &mut Body, contact: &mut SolverContact, config: &SolverConfig) {
    let inv_mass_a = body_a.solver_inv_mass();
    let inv_mass_b = body_b.solver_inv_mass();
    let total_inv_mass = inv_mass_a + inv_mass_b;
    if total_inv_mass <= 0.0 {
        return;
    }
    let normal = contact.normal;

    // positional correction, distributed by inverse mass
    let correction = (contact.penetration - config.slop).max(0.0) * config.correction_percent;
    if correction > 0.0 {
        let push = normal * (correction / total_inv_mass);
        body_a.position -= push * inv_mass_a;
        body_b.position += push * inv_mass_b;
        contact.penetration -= correction;
    }

    let point = contact.point;
    let inv_inertia_world_a = solver_inv_inertia(body_a);
    let inv_inertia_world_b = solver_inv_inertia(body_b);
    let ra = point - body_a.centre_of_mass_world();
    let rb = point - body_b.centre_of_mass_world();

    // closing speed along the normal, positive when approaching
    let vab = body_a.velocity_at_point(point) - body_b.velocity_at_point(point);
    let closing = vab.dot(normal);
    if closing <= 0.0 {
        return;
    }

    let restitution = if closing < config.restitution_velocity_threshold {
        0.0
    } else {
        contact.restitution
    };

    let angular_j_a = (inv_inertia_world_a * ra.cross(normal)).cross(ra);
    let angular_j_b = (inv_inertia_world_b * rb.cross(normal)).cross(rb);
    let angular_factor = (angular_j_a + angular_j_b).dot(normal);

    let impulse_j = (1.0 + restitution) * closing / (total_inv_mass + angular_factor);
    let vec_impulse_j = normal * impulse_j;
    apply(body_a, -vec_impulse_j, point);
    apply(body_b, vec_impulse_j, point);

    // friction works on the post-bounce tangential velocity
    let vab = body_a.velocity_at_point(point) - body_b.velocity_at_point(point);
    let vel_tan = vab - normal * normal.dot(vab);
    let tan_speed = vel_tan.length();
    if tan_speed <= f32::EPSILON || contact.friction <= 0.0 {
        return;
    }
    let tangent = vel_tan / tan_speed;

    let inertia_a = (inv_inertia_world_a * ra.cross(tangent)).cross(ra);
    let inertia_b = (inv_inertia_world_b * rb.cross(tangent)).cross(rb);
    let inv_inertia = (inertia_a + inertia_b).dot(tangent);

    // Coulomb clamp against the normal impulse
    let impulse_friction = (tan_speed / (total_inv_mass + inv_inertia)).min(contact.friction * impulse_j);
    let vec_impulse_friction = tangent * impulse_friction;
    apply(body_a, -vec_impulse_friction, point);
    apply(body_b, vec_impulse_friction, point);
}

fn apply(body: &mut Body, impulse: Vec3, point: Vec3) {
    if body.solver_inv_mass() > 0.0 {
        body.apply_contact_impulse(impulse, point);
    }
}

/// Single body response against a voxel cell. The normal points from the
/// body into the cell.
fn resolve_voxel(body: &mut Body, contact: &mut SolverContact, config: &SolverConfig) {
    let inv_mass = body.solver_inv_mass();
    if inv_mass <= 0.0 {
        return;
    }
    let normal = contact.normal;

    let correction =
        (contact.penetration - config.slop).max(0.0) * config.voxel_correction_percent;
    if correction > 0.0 {
        body.position -= normal * correction;
        contact.penetration -= correction;
    }

    let velocity = body.linear_velocity;
    let closing = velocity.dot(normal);
    if closing <= 0.0 {
        return;
    }
    let restitution = if closing < config.restitution_velocity_threshold {
        0.0
    } else {
        contact.restitution
    };

    // reflect the normal component, then slow the sliding component
    let normal_change = (1.0 + restitution) * closing;
    let tangential = velocity - normal * closing;
    let tan_speed = tangential.length();
    let friction_change = tan_speed.min(contact.friction * normal_change);
    let mut delta_v = -normal * normal_change;
    if tan_speed > f32::EPSILON {
        delta_v -= tangential * (friction_change / tan_speed);
    }
    body.apply_contact_impulse(delta_v / inv_mass, contact.point);
}

/// Marks movement bodies standing on the contact as grounded for the next
/// movement update.
pub(crate) fn latch_grounded(bodies: &mut Arena<Body>, contact: &SolverContact) {
    let normal = contact.normal;
    // the normal points from a to b, so a stands on b when it points down
    if normal.y < -GROUND_NORMAL_Y {
        set_contact_grounded(bodies, contact.body_a);
    }
    if normal.y > GROUND_NORMAL_Y {
        if let Some(body_b) = contact.body_b {
            set_contact_grounded(bodies, body_b);
        }
    }
}

fn set_contact_grounded(bodies: &mut Arena<Body>, handle: BodyHandle) {
    if let Some(body) = bodies.get_mut(handle) {
        // a body launching off the contact is not standing on it
        if body.linear_velocity.y > 0.01 {
            return;
        }
        if let Some(movement) = body.movement.as_mut() {
            movement.state.contact_grounded = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyKind;

    fn contact(a: BodyHandle, b: Option<BodyHandle>, normal: Vec3, penetration: f32) -> SolverContact {
        SolverContact::new(
            a,
            b,
            Vec3::ZERO,
            normal,
            penetration,
            Material::new(0.5, 0.0),
            Material::new(0.5, 0.0),
        )
    }

    #[test]
    fn test_static_body_receives_no_correction() {
        let mut bodies = Arena::new();
        let a = bodies.insert(
            Body::dynamic(1.0)
                .with_position(Vec3::new(0.0, 0.5, 0.0))
                .with_linear_velocity(Vec3::new(0.0, -2.0, 0.0)),
        );
        let b = bodies.insert(Body::new(BodyKind::Static).with_position(Vec3::new(0.0, -0.5, 0.0)));
        let mut c = contact(a, Some(b), Vec3::NEG_Y, 0.11);
        c.point = Vec3::ZERO;

        resolve(&mut bodies, &mut c, &SolverConfig::default());

        let body_a = bodies.get(a).unwrap();
        let body_b = bodies.get(b).unwrap();
        assert!((body_a.position().y - 0.52).abs() < 1e-5);
        assert!((c.penetration - 0.09).abs() < 1e-5);
        assert_eq!(body_b.position(), Vec3::new(0.0, -0.5, 0.0));
        // inelastic, the closing speed is removed
        assert!(body_a.linear_velocity().y.abs() < 1e-4);
    }

    #[test]
    fn test_separating_bodies_keep_velocity() {
        let mut bodies = Arena::new();
        let a = bodies.insert(Body::dynamic(1.0).with_linear_velocity(Vec3::new(-1.0, 0.0, 0.0)));
        let b = bodies.insert(Body::dynamic(1.0).with_position(Vec3::X));
        let mut c = contact(a, Some(b), Vec3::X, 0.0);
        resolve(&mut bodies, &mut c, &SolverConfig::default());
        assert_eq!(bodies.get(a).unwrap().linear_velocity(), Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_equal_masses_exchange_momentum() {
        let mut bodies = Arena::new();
        let a = bodies.insert(
            Body::dynamic(1.0)
                .with_position(Vec3::new(-0.5, 0.0, 0.0))
                .with_linear_velocity(Vec3::new(3.0, 0.0, 0.0)),
        );
        let b = bodies.insert(Body::dynamic(1.0).with_position(Vec3::new(0.5, 0.0, 0.0)));
        let mut c = SolverContact::new(
            a,
            Some(b),
            Vec3::ZERO,
            Vec3::X,
            0.0,
            Material::new(0.0, 1.0),
            Material::new(0.0, 1.0),
        );
        resolve(&mut bodies, &mut c, &SolverConfig::default());
        let va = bodies.get(a).unwrap().linear_velocity();
        let vb = bodies.get(b).unwrap().linear_velocity();
        assert!(va.x.abs() < 1e-4);
        assert!((vb.x - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_voxel_contact_stops_fall() {
        let mut bodies = Arena::new();
        let a = bodies.insert(Body::dynamic(2.0).with_linear_velocity(Vec3::new(1.0, -4.0, 0.0)));
        let mut c = contact(a, None, Vec3::NEG_Y, 0.2);
        c.point = bodies.get(a).unwrap().position();
        resolve(&mut bodies, &mut c, &SolverConfig::default());

        let body = bodies.get(a).unwrap();
        assert!(body.position().y > 0.0);
        assert!(body.linear_velocity().y.abs() < 1e-4);
        // friction 0.5 against a 4 m/s stop fully cancels 1 m/s of sliding
        assert!(body.linear_velocity().x.abs() < 1e-4);
    }

    #[test]
    fn test_ground_latch() {
        let mut bodies = Arena::new();
        let a = bodies.insert(Body::dynamic(1.0).with_movement(Default::default()));
        let b = bodies.insert(Body::new(BodyKind::Static));
        latch_grounded(&mut bodies, &contact(a, Some(b), Vec3::NEG_Y, 0.1));
        assert!(bodies.get(a).unwrap().movement().unwrap().state.contact_grounded);

        let c = bodies.insert(Body::dynamic(1.0).with_movement(Default::default()));
        latch_grounded(&mut bodies, &contact(c, Some(b), Vec3::X, 0.1));
        assert!(!bodies.get(c).unwrap().movement().unwrap().state.contact_grounded);
    }
}
