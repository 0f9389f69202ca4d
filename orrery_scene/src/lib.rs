//! Scene state for the holder orrery: orbit camera, camera flights,
//! planet registry, batched population, scatter placement, and picking.
//! Everything here is plain state advanced by a per-frame tick so the
//! renderer stays a thin consumer.

pub mod camera;
pub mod flight;
pub mod pick;
pub mod populate;
pub mod registry;
pub mod scatter;

pub use camera::{DistanceBounds, OrbitRig, DAMPING_FACTOR};
pub use flight::{
    CameraTransition, FlightController, FocusTarget, SettleEvent, ViewState, OVERVIEW_EYE,
    PLANET_STANDOFF, SUN_STANDOFF, TRANSITION_SECS,
};
pub use pick::{pick_target, ray_from_ndc, PickRay, SUN_RADIUS};
pub use populate::{BatchOutcome, PopulationQueue, TexturePoolView, BATCH_SIZE};
pub use registry::{
    size_for_percentage, PlanetEntity, PlanetRegistry, UpsertOutcome, MAX_PLANET_SIZE,
    MIN_PLANET_SIZE,
};
pub use scatter::{generate_position, ScatterConfig};
