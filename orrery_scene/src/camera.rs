use glam::Vec3;

/// Exponential smoothing factor applied to queued orbit/zoom input each
/// 60 Hz-equivalent frame.
pub const DAMPING_FACTOR: f32 = 0.05;

/// Keeps the orbit from flipping over the poles.
const MAX_PITCH: f32 = 1.55;

const MIN_RIG_DISTANCE: f32 = 1e-4;

/// Zoom distance limits the rig enforces. Transitions swap these when the
/// view settles on a new state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceBounds {
    pub min: f32,
    pub max: f32,
}

impl DistanceBounds {
    /// Free-roam limits while parked at the overview.
    pub const OVERVIEW: Self = Self {
        min: 1.0,
        max: 200.0,
    };

    /// Limits while docked on an entity, tightened around its stand-off
    /// distance so the user cannot zoom through the focused body.
    pub fn focused(standoff: f32) -> Self {
        let min = (standoff * 0.4).max(Self::OVERVIEW.min);
        let max = (standoff * 4.0).clamp(min, Self::OVERVIEW.max);
        Self { min, max }
    }

    pub fn clamp(&self, distance: f32) -> f32 {
        distance.clamp(self.min, self.max)
    }
}

/// Interactive orbit rig: a target point plus a spherical eye offset, with
/// damped input and distance bounds. The rig only moves on its own while
/// `enabled`; transitions drive it directly through [`OrbitRig::set_pose`].
#[derive(Debug, Clone)]
pub struct OrbitRig {
    target: Vec3,
    distance: f32,
    yaw: f32,
    pitch: f32,
    enabled: bool,
    bounds: DistanceBounds,
    pending_yaw: f32,
    pending_pitch: f32,
    pending_zoom: f32,
}

impl OrbitRig {
    pub fn new(eye: Vec3, target: Vec3) -> Self {
        let mut rig = Self {
            target,
            distance: MIN_RIG_DISTANCE,
            yaw: 0.0,
            pitch: 0.0,
            enabled: true,
            bounds: DistanceBounds::OVERVIEW,
            pending_yaw: 0.0,
            pending_pitch: 0.0,
            pending_zoom: 0.0,
        };
        rig.set_pose(eye, target);
        rig
    }

    /// Current eye position recomposed from the spherical state.
    pub fn eye(&self) -> Vec3 {
        let offset = Vec3::new(
            self.pitch.cos() * self.yaw.sin(),
            self.pitch.sin(),
            self.pitch.cos() * self.yaw.cos(),
        );
        self.target + offset * self.distance
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn bounds(&self) -> DistanceBounds {
        self.bounds
    }

    /// Swaps the zoom limits and pulls the current distance inside them.
    pub fn set_bounds(&mut self, bounds: DistanceBounds) {
        self.bounds = bounds;
        self.distance = bounds.clamp(self.distance);
    }

    /// Places the rig exactly at the given pose, decomposing it into the
    /// spherical state. Distance is not clamped here; transitions may pass
    /// through poses outside the settled bounds.
    pub fn set_pose(&mut self, eye: Vec3, target: Vec3) {
        self.target = target;
        let offset = eye - target;
        let distance = offset.length();
        if distance < MIN_RIG_DISTANCE {
            self.distance = MIN_RIG_DISTANCE;
            return;
        }
        self.distance = distance;
        self.pitch = (offset.y / distance).clamp(-1.0, 1.0).asin();
        self.yaw = offset.x.atan2(offset.z);
    }

    /// Queues orbit input (radians). Ignored while the rig is disabled.
    pub fn apply_orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        if !self.enabled {
            return;
        }
        self.pending_yaw += delta_yaw;
        self.pending_pitch += delta_pitch;
    }

    /// Queues zoom input in log-scale steps; positive moves the eye closer.
    pub fn apply_zoom(&mut self, steps: f32) {
        if !self.enabled {
            return;
        }
        self.pending_zoom += steps;
    }

    /// Consumes a damped share of the queued input. Disabled rigs drop their
    /// queue so stale drags cannot fire after a transition re-enables them.
    pub fn update(&mut self, dt: f32) {
        if !self.enabled {
            self.pending_yaw = 0.0;
            self.pending_pitch = 0.0;
            self.pending_zoom = 0.0;
            return;
        }
        let blend = 1.0 - (1.0 - DAMPING_FACTOR).powf(dt.max(0.0) * 60.0);
        let yaw_step = self.pending_yaw * blend;
        let pitch_step = self.pending_pitch * blend;
        let zoom_step = self.pending_zoom * blend;
        self.pending_yaw -= yaw_step;
        self.pending_pitch -= pitch_step;
        self.pending_zoom -= zoom_step;

        self.yaw += yaw_step;
        self.pitch = (self.pitch + pitch_step).clamp(-MAX_PITCH, MAX_PITCH);
        self.distance = self.bounds.clamp(self.distance * (-zoom_step).exp());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pose_round_trips_through_spherical_state() {
        let eye = Vec3::new(3.0, 4.0, 12.0);
        let target = Vec3::new(1.0, -2.0, 5.0);
        let rig = OrbitRig::new(eye, target);
        assert!((rig.eye() - eye).length() < 1e-4);
        assert!((rig.target() - target).length() < 1e-6);
    }

    #[test]
    fn damped_orbit_converges_on_queued_input() {
        let mut rig = OrbitRig::new(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO);
        rig.apply_orbit(1.0, 0.0);
        for _ in 0..600 {
            rig.update(1.0 / 60.0);
        }
        let offset = rig.eye() - rig.target();
        // yaw of one radian swings the eye off the +Z axis.
        let expected = Vec3::new(1f32.sin(), 0.0, 1f32.cos()) * 10.0;
        assert!((offset - expected).length() < 1e-2);
    }

    #[test]
    fn disabled_rig_ignores_and_drops_input() {
        let mut rig = OrbitRig::new(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO);
        rig.set_enabled(false);
        rig.apply_orbit(2.0, 1.0);
        rig.apply_zoom(3.0);
        let before = rig.eye();
        rig.update(1.0 / 60.0);
        assert_eq!(rig.eye(), before);

        // Input queued while disabled must not replay after re-enabling.
        rig.set_enabled(true);
        rig.update(1.0 / 60.0);
        assert!((rig.eye() - before).length() < 1e-6);
    }

    #[test]
    fn zoom_respects_distance_bounds() {
        let mut rig = OrbitRig::new(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO);
        rig.set_bounds(DistanceBounds { min: 4.0, max: 20.0 });
        rig.apply_zoom(50.0);
        for _ in 0..600 {
            rig.update(1.0 / 60.0);
        }
        assert!((rig.distance() - 4.0).abs() < 1e-3);

        rig.apply_zoom(-50.0);
        for _ in 0..600 {
            rig.update(1.0 / 60.0);
        }
        assert!((rig.distance() - 20.0).abs() < 1e-3);
    }

    #[test]
    fn focused_bounds_wrap_the_standoff() {
        let bounds = DistanceBounds::focused(5.0);
        assert!(bounds.min >= DistanceBounds::OVERVIEW.min);
        assert!(bounds.min < 5.0 && 5.0 < bounds.max);
        assert!(bounds.max <= DistanceBounds::OVERVIEW.max);

        let sun = DistanceBounds::focused(15.0);
        assert!(sun.min < 15.0 && 15.0 < sun.max);
    }

    #[test]
    fn pitch_stays_short_of_the_poles() {
        let mut rig = OrbitRig::new(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO);
        rig.apply_orbit(0.0, 100.0);
        for _ in 0..600 {
            rig.update(1.0 / 60.0);
        }
        let offset = rig.eye() - rig.target();
        assert!(offset.y < rig.distance());
    }
}
