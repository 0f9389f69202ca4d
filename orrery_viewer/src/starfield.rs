//! Background star scatter and the transient shooting-star field. Pure
//! simulation state; the render module owns the GPU buffers built from it.

use glam::Vec3;
use rand::Rng;

pub const STAR_COUNT: usize = 5000;
pub const STAR_FIELD_EXTENT: f32 = 1000.0;

const SHOOTING_STAR_LIFETIME_SECS: f32 = 2.0;
const SPAWN_INTERVAL_MIN_SECS: f32 = 3.0;
const SPAWN_INTERVAL_MAX_SECS: f32 = 8.0;
const SPAWN_CHANCE: f64 = 0.5;
const SPAWN_REGION_EXTENT: f32 = 300.0;
const SPEED_MIN: f32 = 80.0;
const SPEED_MAX: f32 = 160.0;
const DRIFT_ANGLE_MIN_RAD: f32 = std::f32::consts::FRAC_PI_6;
const DRIFT_ANGLE_MAX_RAD: f32 = std::f32::consts::FRAC_PI_3;

/// A fixed point of light far behind the holder field.
#[derive(Debug, Clone, Copy)]
pub struct Star {
    pub position: Vec3,
    pub brightness: f32,
}

pub fn scatter_stars<R: Rng + ?Sized>(rng: &mut R) -> Vec<Star> {
    (0..STAR_COUNT)
        .map(|_| Star {
            position: Vec3::new(
                rng.gen_range(-STAR_FIELD_EXTENT..=STAR_FIELD_EXTENT),
                rng.gen_range(-STAR_FIELD_EXTENT..=STAR_FIELD_EXTENT),
                rng.gen_range(-STAR_FIELD_EXTENT..=STAR_FIELD_EXTENT),
            ),
            brightness: rng.gen_range(0.3..=1.0),
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub struct ShootingStar {
    pub position: Vec3,
    pub velocity: Vec3,
    age: f32,
}

impl ShootingStar {
    /// Fades linearly from full to transparent over the lifetime.
    pub fn alpha(&self) -> f32 {
        (1.0 - self.age / SHOOTING_STAR_LIFETIME_SECS).clamp(0.0, 1.0)
    }

    fn is_expired(&self) -> bool {
        self.age >= SHOOTING_STAR_LIFETIME_SECS
    }
}

/// Rolls a spawn attempt every few seconds; half of the attempts produce a
/// streak that crosses part of the scene and burns out after two seconds.
pub struct ShootingStarField {
    stars: Vec<ShootingStar>,
    next_attempt_in: f32,
}

impl ShootingStarField {
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            stars: Vec::new(),
            next_attempt_in: roll_interval(rng),
        }
    }

    pub fn active(&self) -> &[ShootingStar] {
        &self.stars
    }

    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R, dt: f32) {
        for star in &mut self.stars {
            star.age += dt;
            star.position += star.velocity * dt;
        }
        self.stars.retain(|star| !star.is_expired());

        self.next_attempt_in -= dt;
        while self.next_attempt_in <= 0.0 {
            if rng.gen_bool(SPAWN_CHANCE) {
                self.stars.push(spawn_star(rng));
            }
            self.next_attempt_in += roll_interval(rng);
        }
    }
}

fn roll_interval<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    rng.gen_range(SPAWN_INTERVAL_MIN_SECS..=SPAWN_INTERVAL_MAX_SECS)
}

// Streaks start in the upper half of the spawn region and drift down and to
// the right at a 30..60 degree slope, so they always read as a diagonal
// against the fixed backdrop.
fn spawn_star<R: Rng + ?Sized>(rng: &mut R) -> ShootingStar {
    let position = Vec3::new(
        rng.gen_range(-SPAWN_REGION_EXTENT..=SPAWN_REGION_EXTENT),
        rng.gen_range(0.0..=SPAWN_REGION_EXTENT),
        rng.gen_range(-SPAWN_REGION_EXTENT..=SPAWN_REGION_EXTENT),
    );
    let angle = rng.gen_range(DRIFT_ANGLE_MIN_RAD..=DRIFT_ANGLE_MAX_RAD);
    let direction = Vec3::new(angle.cos(), -angle.sin(), 0.0);
    ShootingStar {
        position,
        velocity: direction * rng.gen_range(SPEED_MIN..=SPEED_MAX),
        age: 0.0,
    }
}
