use glam::Vec3;
use log::warn;

use crate::camera::{DistanceBounds, OrbitRig};

/// Wall-clock length of every camera transition.
pub const TRANSITION_SECS: f32 = 1.0;

/// Stand-off floor when docking on a regular planet.
pub const PLANET_STANDOFF: f32 = 5.0;

/// Stand-off floor when docking on the sun at the world origin.
pub const SUN_STANDOFF: f32 = 15.0;

/// Camera pose the overview state parks at.
pub const OVERVIEW_EYE: Vec3 = Vec3::new(0.0, 0.0, 10.0);

/// Stand-off distance grows with the focused entity's radius.
const STANDOFF_PER_SIZE: f32 = 3.0;

/// Which scene anchor a focus request points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusTarget {
    Sun,
    Planet(String),
}

/// Exactly one view state is active at any time. Only settling transitions
/// mutate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    Overview,
    Focused(FocusTarget),
}

/// Fired by [`FlightController::tick`] when a transition completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleEvent {
    FocusSettled(FocusTarget),
    OverviewSettled,
}

/// In-flight interpolation between two camera poses. At most one exists at a
/// time; a superseding request restarts from the partial pose rather than
/// blending destinations.
#[derive(Debug, Clone)]
pub struct CameraTransition {
    start_eye: Vec3,
    start_target: Vec3,
    end_eye: Vec3,
    end_target: Vec3,
    elapsed: f32,
    duration: f32,
    destination: ViewState,
}

impl CameraTransition {
    pub fn destination(&self) -> &ViewState {
        &self.destination
    }

    pub fn end_target(&self) -> Vec3 {
        self.end_target
    }
}

fn ease_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

fn standoff_for(target: &FocusTarget, size_hint: Option<f32>) -> f32 {
    match target {
        FocusTarget::Sun => SUN_STANDOFF,
        FocusTarget::Planet(_) => {
            let hinted = size_hint.unwrap_or(0.0).max(0.0) * STANDOFF_PER_SIZE;
            hinted.max(PLANET_STANDOFF)
        }
    }
}

/// Owns the view state and the single in-flight transition, and drives the
/// orbit rig between the overview pose and per-entity poses. Requests that
/// arrive before the rig exists are logged no-ops.
#[derive(Debug)]
pub struct FlightController {
    view_state: ViewState,
    transition: Option<CameraTransition>,
    overview_eye: Vec3,
}

impl Default for FlightController {
    fn default() -> Self {
        Self::new()
    }
}

impl FlightController {
    pub fn new() -> Self {
        Self::with_overview_eye(OVERVIEW_EYE)
    }

    pub fn with_overview_eye(overview_eye: Vec3) -> Self {
        Self {
            view_state: ViewState::Overview,
            transition: None,
            overview_eye,
        }
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view_state
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    /// Destination of the in-flight transition, if any.
    pub fn pending_destination(&self) -> Option<&ViewState> {
        self.transition.as_ref().map(|t| &t.destination)
    }

    /// Starts a flight that docks on `target`. Any in-flight transition is
    /// superseded; the camera continues from its partial pose. The stand-off
    /// grows with `size_hint` and never drops below the per-kind floor.
    pub fn focus_on(
        &mut self,
        rig: Option<&mut OrbitRig>,
        position: Vec3,
        target: FocusTarget,
        size_hint: Option<f32>,
    ) {
        let Some(rig) = rig else {
            warn!("focus requested before the camera rig was ready; ignoring");
            return;
        };

        let standoff = standoff_for(&target, size_hint);
        let chord = position - rig.eye();
        // A zero-length chord docks the camera on the +Z side of the target,
        // where the overview pose lives.
        let approach = chord.try_normalize().unwrap_or(Vec3::NEG_Z);
        let end_eye = position - approach * standoff;

        rig.set_enabled(false);
        self.transition = Some(CameraTransition {
            start_eye: rig.eye(),
            start_target: rig.target(),
            end_eye,
            end_target: position,
            elapsed: 0.0,
            duration: TRANSITION_SECS,
            destination: ViewState::Focused(target),
        });
    }

    /// Starts the symmetric flight back to the overview pose with the orbit
    /// target re-centered at the world origin.
    pub fn return_to_overview(&mut self, rig: Option<&mut OrbitRig>) {
        let Some(rig) = rig else {
            warn!("overview return requested before the camera rig was ready; ignoring");
            return;
        };

        rig.set_enabled(false);
        self.transition = Some(CameraTransition {
            start_eye: rig.eye(),
            start_target: rig.target(),
            end_eye: self.overview_eye,
            end_target: Vec3::ZERO,
            elapsed: 0.0,
            duration: TRANSITION_SECS,
            destination: ViewState::Overview,
        });
    }

    /// Halts any in-flight transition where it stands. The camera keeps its
    /// last interpolated pose and the rig is handed back to the user.
    pub fn cancel(&mut self, rig: Option<&mut OrbitRig>) {
        if self.transition.take().is_some() {
            if let Some(rig) = rig {
                rig.set_enabled(true);
            }
        }
    }

    /// Advances the active transition. On completion the settled view state
    /// is written, the rig re-enabled, and its distance bounds swapped to the
    /// per-state policy.
    pub fn tick(&mut self, rig: Option<&mut OrbitRig>, dt: f32) -> Option<SettleEvent> {
        let rig = rig?;
        let transition = self.transition.as_mut()?;

        transition.elapsed += dt.max(0.0);
        let eased = ease_out_cubic(transition.elapsed / transition.duration);
        let eye = transition.start_eye.lerp(transition.end_eye, eased);
        let target = transition.start_target.lerp(transition.end_target, eased);
        rig.set_pose(eye, target);

        if transition.elapsed < transition.duration {
            return None;
        }

        rig.set_pose(transition.end_eye, transition.end_target);
        let destination = transition.destination.clone();
        let bounds = match &destination {
            ViewState::Overview => DistanceBounds::OVERVIEW,
            ViewState::Focused(_) => {
                DistanceBounds::focused((transition.end_eye - transition.end_target).length())
            }
        };
        rig.set_bounds(bounds);
        rig.set_enabled(true);
        self.transition = None;

        let event = match &destination {
            ViewState::Overview => SettleEvent::OverviewSettled,
            ViewState::Focused(target) => SettleEvent::FocusSettled(target.clone()),
        };
        self.view_state = destination;
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overview_rig() -> OrbitRig {
        OrbitRig::new(OVERVIEW_EYE, Vec3::ZERO)
    }

    fn run_to_settle(
        flight: &mut FlightController,
        rig: &mut OrbitRig,
        max_steps: usize,
    ) -> Option<SettleEvent> {
        for _ in 0..max_steps {
            if let Some(event) = flight.tick(Some(rig), 0.1) {
                return Some(event);
            }
        }
        None
    }

    #[test]
    fn ease_out_cubic_is_clamped_and_monotonic() {
        assert_eq!(ease_out_cubic(-1.0), 0.0);
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert_eq!(ease_out_cubic(2.0), 1.0);
        assert!((ease_out_cubic(0.5) - 0.875).abs() < 1e-6);
        let mut last = 0.0;
        for step in 0..=100 {
            let eased = ease_out_cubic(step as f32 / 100.0);
            assert!(eased >= last);
            last = eased;
        }
    }

    #[test]
    fn focus_settles_at_the_standoff_distance() {
        let mut flight = FlightController::new();
        let mut rig = overview_rig();
        let planet = Vec3::new(20.0, 3.0, -4.0);

        flight.focus_on(
            Some(&mut rig),
            planet,
            FocusTarget::Planet("wallet-alpha".to_string()),
            Some(1.0),
        );
        assert!(flight.is_transitioning());
        assert!(!rig.enabled());

        let event = run_to_settle(&mut flight, &mut rig, 20).expect("transition settles");
        assert_eq!(
            event,
            SettleEvent::FocusSettled(FocusTarget::Planet("wallet-alpha".to_string()))
        );
        assert_eq!(
            flight.view_state(),
            &ViewState::Focused(FocusTarget::Planet("wallet-alpha".to_string()))
        );
        assert!(rig.enabled());
        assert!((rig.target() - planet).length() < 1e-4);
        // size hint 1.0 gives 3.0, below the 5.0 planet floor.
        assert!(((rig.eye() - planet).length() - PLANET_STANDOFF).abs() < 1e-3);
        assert!(rig.bounds().min < PLANET_STANDOFF && PLANET_STANDOFF < rig.bounds().max);
    }

    #[test]
    fn large_size_hint_raises_the_standoff() {
        let mut flight = FlightController::new();
        let mut rig = overview_rig();
        let planet = Vec3::new(-30.0, 0.0, 0.0);

        flight.focus_on(
            Some(&mut rig),
            planet,
            FocusTarget::Planet("wallet-whale".to_string()),
            Some(3.0),
        );
        run_to_settle(&mut flight, &mut rig, 20).expect("transition settles");
        assert!(((rig.eye() - planet).length() - 9.0).abs() < 1e-3);
    }

    #[test]
    fn sun_focus_uses_the_larger_floor() {
        let mut flight = FlightController::new();
        let mut rig = overview_rig();

        flight.focus_on(Some(&mut rig), Vec3::ZERO, FocusTarget::Sun, None);
        run_to_settle(&mut flight, &mut rig, 20).expect("transition settles");
        assert!(((rig.eye() - Vec3::ZERO).length() - SUN_STANDOFF).abs() < 1e-3);
        assert_eq!(flight.view_state(), &ViewState::Focused(FocusTarget::Sun));
    }

    #[test]
    fn superseding_focus_lands_on_the_second_target() {
        let mut flight = FlightController::new();
        let mut rig = overview_rig();
        let first = Vec3::new(25.0, 0.0, 0.0);
        let second = Vec3::new(0.0, 0.0, -40.0);

        flight.focus_on(
            Some(&mut rig),
            first,
            FocusTarget::Planet("wallet-first".to_string()),
            None,
        );
        for _ in 0..3 {
            assert!(flight.tick(Some(&mut rig), 0.1).is_none());
        }
        let partial = rig.eye();

        flight.focus_on(
            Some(&mut rig),
            second,
            FocusTarget::Planet("wallet-second".to_string()),
            None,
        );
        // Superseding keeps the partial pose as the new start; no teleport.
        assert_eq!(rig.eye(), partial);
        assert!(flight.is_transitioning());

        let event = run_to_settle(&mut flight, &mut rig, 20).expect("transition settles");
        assert_eq!(
            event,
            SettleEvent::FocusSettled(FocusTarget::Planet("wallet-second".to_string()))
        );
        assert!(((rig.eye() - second).length() - PLANET_STANDOFF).abs() < 1e-3);
        assert!((rig.target() - second).length() < 1e-4);
    }

    #[test]
    fn overview_return_always_lands_at_the_origin_pose() {
        let mut flight = FlightController::new();
        let mut rig = overview_rig();

        flight.focus_on(
            Some(&mut rig),
            Vec3::new(18.0, 2.0, 7.0),
            FocusTarget::Planet("wallet-alpha".to_string()),
            None,
        );
        // Interrupt the outbound flight halfway.
        for _ in 0..5 {
            flight.tick(Some(&mut rig), 0.1);
        }
        flight.return_to_overview(Some(&mut rig));
        assert!(!rig.enabled());

        let event = run_to_settle(&mut flight, &mut rig, 20).expect("transition settles");
        assert_eq!(event, SettleEvent::OverviewSettled);
        assert_eq!(flight.view_state(), &ViewState::Overview);
        assert!(rig.enabled());
        assert!((rig.target() - Vec3::ZERO).length() < 1e-5);
        assert!((rig.eye() - OVERVIEW_EYE).length() < 1e-4);
        assert_eq!(rig.bounds(), DistanceBounds::OVERVIEW);
    }

    #[test]
    fn cancel_keeps_the_partial_pose_and_reenables_controls() {
        let mut flight = FlightController::new();
        let mut rig = overview_rig();

        flight.focus_on(
            Some(&mut rig),
            Vec3::new(20.0, 0.0, 0.0),
            FocusTarget::Planet("wallet-alpha".to_string()),
            None,
        );
        for _ in 0..4 {
            flight.tick(Some(&mut rig), 0.1);
        }
        let partial_eye = rig.eye();
        let partial_target = rig.target();

        flight.cancel(Some(&mut rig));
        assert!(!flight.is_transitioning());
        assert!(rig.enabled());
        assert_eq!(rig.eye(), partial_eye);
        assert_eq!(rig.target(), partial_target);
        // A cancelled flight never settled, so the view state is unchanged.
        assert_eq!(flight.view_state(), &ViewState::Overview);
    }

    #[test]
    fn requests_without_a_rig_are_noops() {
        let mut flight = FlightController::new();
        flight.focus_on(
            None,
            Vec3::new(1.0, 2.0, 3.0),
            FocusTarget::Planet("wallet-alpha".to_string()),
            None,
        );
        assert!(!flight.is_transitioning());
        assert_eq!(flight.view_state(), &ViewState::Overview);

        flight.return_to_overview(None);
        assert!(!flight.is_transitioning());
        assert!(flight.tick(None, 0.1).is_none());
    }

    #[test]
    fn halfway_pose_follows_the_cubic_curve() {
        let mut flight = FlightController::new();
        let mut rig = overview_rig();
        let start_eye = rig.eye();
        let planet = Vec3::new(40.0, 0.0, 10.0);

        flight.focus_on(
            Some(&mut rig),
            planet,
            FocusTarget::Planet("wallet-alpha".to_string()),
            None,
        );
        flight.tick(Some(&mut rig), 0.5);

        let chord = (planet - start_eye).normalize();
        let end_eye = planet - chord * PLANET_STANDOFF;
        let expected = start_eye.lerp(end_eye, 0.875);
        assert!((rig.eye() - expected).length() < 1e-3);
    }
}
