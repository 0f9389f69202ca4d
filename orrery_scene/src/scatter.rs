use glam::Vec3;
use rand::Rng;

/// Tunables for the rejection-sampled scatter around the sun. Defaults match
/// the shipped universe layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterConfig {
    /// Shell radius for a weightless entity.
    pub base_radius: f32,
    /// How strongly a holding percentage drags the shell toward the center.
    pub weight_pull: f32,
    /// Nothing spawns closer to the origin than this, sun clearance included.
    pub min_radius: f32,
    /// Full width of the uniform jitter applied to the shell radius.
    pub radius_jitter: f32,
    /// Full width of the uniform per-axis noise applied to each candidate.
    pub axis_noise: f32,
    /// Candidates closer than this to any occupied point are rejected.
    pub min_separation: f32,
    /// Rejection attempts before giving up on separation.
    pub max_attempts: u32,
    /// Extra radius available to the fallback point once attempts run out.
    pub fallback_bonus: f32,
}

impl Default for ScatterConfig {
    fn default() -> Self {
        Self {
            base_radius: 50.0,
            weight_pull: 20.0,
            min_radius: 15.0,
            radius_jitter: 10.0,
            axis_noise: 10.0,
            min_separation: 5.0,
            max_attempts: 50,
            fallback_bonus: 30.0,
        }
    }
}

impl ScatterConfig {
    fn base_for(&self, percentage: Option<f32>) -> f32 {
        match percentage {
            Some(pct) => self.base_radius - pct.max(0.0) * self.weight_pull,
            None => self.base_radius,
        }
    }
}

/// Produces a position for a new entity that keeps `min_separation` from
/// every occupied point, resampling up to the attempt cap. An exhausted cap
/// yields a fallback at an enlarged radius; overlap there is accepted rather
/// than reported as an error.
pub fn generate_position<R: Rng + ?Sized>(
    rng: &mut R,
    config: &ScatterConfig,
    occupied: &[Vec3],
    percentage: Option<f32>,
) -> Vec3 {
    for _ in 0..config.max_attempts {
        let radius = shell_radius(rng, config, percentage);
        let candidate = point_on_shell(rng, config, radius);
        let crowded = occupied
            .iter()
            .any(|point| point.distance(candidate) < config.min_separation);
        if !crowded {
            return candidate;
        }
    }

    let bonus = rng.gen::<f32>() * config.fallback_bonus;
    let radius = (config.base_for(percentage) + bonus).max(config.min_radius);
    point_on_shell(rng, config, radius)
}

fn shell_radius<R: Rng + ?Sized>(
    rng: &mut R,
    config: &ScatterConfig,
    percentage: Option<f32>,
) -> f32 {
    let jitter = (rng.gen::<f32>() - 0.5) * config.radius_jitter;
    (config.base_for(percentage) + jitter).max(config.min_radius)
}

/// Uniform point on the shell: azimuth uniform in [0, 2π), cos of the polar
/// angle uniform on [-1, 1], then per-axis noise so shells do not read as
/// sampled surfaces.
fn point_on_shell<R: Rng + ?Sized>(rng: &mut R, config: &ScatterConfig, radius: f32) -> Vec3 {
    let theta = rng.gen::<f32>() * std::f32::consts::TAU;
    let cos_phi = rng.gen::<f32>() * 2.0 - 1.0;
    let sin_phi = (1.0 - cos_phi * cos_phi).max(0.0).sqrt();
    let nx = (rng.gen::<f32>() - 0.5) * config.axis_noise;
    let ny = (rng.gen::<f32>() - 0.5) * config.axis_noise;
    let nz = (rng.gen::<f32>() - 0.5) * config.axis_noise;
    Vec3::new(
        radius * sin_phi * theta.cos() + nx,
        radius * sin_phi * theta.sin() + ny,
        radius * cos_phi + nz,
    )
}
