//! Owns everything the renderer draws: the holder registry, the staged
//! population queue, camera rig and flights, customizations, and the feed
//! connection readout. One `advance` call per frame moves all of it.

use std::collections::{HashMap, HashSet};
use std::f32::consts::TAU;

use glam::{Mat4, Quat, Vec2, Vec3};
use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;

use orrery_data::{Customization, HolderRecord, RawHolderRow, normalize_rows, short_wallet};
use orrery_scene::{
    FlightController, FocusTarget, OrbitRig, OVERVIEW_EYE, PickRay, PlanetRegistry,
    PopulationQueue, ScatterConfig, SettleEvent, TexturePoolView, ViewState, pick_target,
    ray_from_ndc,
};
use orrery_stream::{CustomizationEntry, CustomizationSet, HolderSnapshot};

use crate::feed::FeedEvent;

/// Idle spin of the holder field in radians per second.
const IDLE_SPIN_RATE: f32 = 0.3;

/// Feed link state as shown in the status panel. Holder data survives a
/// lost link; the panel says so instead of blanking the scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Offline,
    Connecting { attempt: u32 },
    Connected { producer: String },
    Lost { reason: String },
}

pub struct UniverseScene {
    rng: StdRng,
    scatter: ScatterConfig,
    registry: PlanetRegistry,
    queue: PopulationQueue,
    flight: FlightController,
    rig: Option<OrbitRig>,
    pool: TexturePoolView,
    customizations: HashMap<String, Customization>,
    token_name: String,
    notice: Option<String>,
    connection: ConnectionStatus,
    last_snapshot_seq: Option<u64>,
    last_customization_seq: Option<u64>,
    idle_spin: f32,
}

impl UniverseScene {
    pub fn new(
        pool: TexturePoolView,
        token_name: impl Into<String>,
        seed: Option<u64>,
        with_rig: bool,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            scatter: ScatterConfig::default(),
            registry: PlanetRegistry::new(),
            queue: PopulationQueue::new(),
            flight: FlightController::new(),
            rig: with_rig.then(|| OrbitRig::new(OVERVIEW_EYE, Vec3::ZERO)),
            pool,
            customizations: HashMap::new(),
            token_name: token_name.into(),
            notice: None,
            connection: ConnectionStatus::Offline,
            last_snapshot_seq: None,
            last_customization_seq: None,
            idle_spin: 0.0,
        }
    }

    pub fn registry(&self) -> &PlanetRegistry {
        &self.registry
    }

    pub fn view_state(&self) -> &ViewState {
        self.flight.view_state()
    }

    pub fn connection(&self) -> &ConnectionStatus {
        &self.connection
    }

    pub fn token_name(&self) -> &str {
        &self.token_name
    }

    pub fn idle_spin(&self) -> f32 {
        self.idle_spin
    }

    pub fn progress(&self) -> (usize, usize) {
        self.queue.progress()
    }

    pub fn population_idle(&self) -> bool {
        self.queue.is_idle()
    }

    /// Sticky banner for degraded-but-running conditions, e.g. a texture
    /// directory that produced nothing but fallback swatches.
    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    pub fn camera_pose(&self) -> (Vec3, Vec3) {
        match &self.rig {
            Some(rig) => (rig.eye(), rig.target()),
            None => (OVERVIEW_EYE, Vec3::ZERO),
        }
    }

    pub fn orbit_input(&mut self, delta_yaw: f32, delta_pitch: f32) {
        if let Some(rig) = self.rig.as_mut() {
            rig.apply_orbit(delta_yaw, delta_pitch);
        }
    }

    pub fn zoom_input(&mut self, steps: f32) {
        if let Some(rig) = self.rig.as_mut() {
            rig.apply_zoom(steps);
        }
    }

    /// Applies rows read from a snapshot file: the normalization pass
    /// computes percentages, drops dust and duplicates, and ranks by amount.
    pub fn apply_raw_rows(&mut self, rows: &[RawHolderRow]) {
        let outcome = normalize_rows(rows);
        if outcome.dropped_total() > 0 {
            info!(
                "normalization dropped {} rows ({} invalid, {} below threshold, {} duplicates)",
                outcome.dropped_total(),
                outcome.dropped_invalid,
                outcome.dropped_below_threshold,
                outcome.dropped_duplicates
            );
        }
        if outcome.records.is_empty() && !rows.is_empty() {
            warn!("holder rows contained nothing usable; keeping current scene");
            return;
        }
        self.stage_records(outcome.records);
    }

    /// Applies a feed snapshot. The producer already normalized and ranked
    /// its rows, so this only validates the envelope: stale sequence numbers
    /// are ignored, bad rows are skipped, duplicate wallets keep their first
    /// occurrence.
    pub fn apply_snapshot(&mut self, snapshot: HolderSnapshot) {
        if let Some(last) = self.last_snapshot_seq {
            if snapshot.seq <= last {
                warn!(
                    "ignoring stale holder snapshot seq {} (already at {last})",
                    snapshot.seq
                );
                return;
            }
        }
        self.last_snapshot_seq = Some(snapshot.seq);

        if let Some(name) = snapshot
            .token_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
        {
            self.token_name = name.to_string();
        }

        let row_count = snapshot.rows.len();
        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(row_count);
        for row in snapshot.rows {
            if !seen.insert(row.wallet_address.clone()) {
                continue;
            }
            match HolderRecord::new(row.wallet_address, row.token_amount, row.percentage) {
                Ok(record) => records.push(record),
                Err(err) => warn!("skipping malformed holder row: {err:#}"),
            }
        }

        if records.is_empty() && row_count > 0 {
            warn!("snapshot seq {} contained nothing usable; keeping current scene", snapshot.seq);
            return;
        }
        info!(
            "holder snapshot seq {}: {} records staged",
            snapshot.seq,
            records.len()
        );
        self.stage_records(records);
    }

    /// Upserts per-wallet appearance overrides. Live entities are updated
    /// immediately; the map keeps entries for wallets that spawn later.
    pub fn apply_customization_set(&mut self, set: CustomizationSet) {
        if let Some(last) = self.last_customization_seq {
            if set.seq <= last {
                warn!(
                    "ignoring stale customization set seq {} (already at {last})",
                    set.seq
                );
                return;
            }
        }
        self.last_customization_seq = Some(set.seq);

        let entries: Vec<Customization> = set
            .entries
            .into_iter()
            .filter_map(customization_from_wire)
            .collect();
        debug!(
            "customization set seq {}: {} usable entries",
            set.seq,
            entries.len()
        );
        self.apply_customizations(entries);
    }

    /// Applies customizations loaded from a file. File loads carry no
    /// sequence number, so they bypass the feed's staleness guard.
    pub fn apply_customizations(&mut self, entries: Vec<Customization>) {
        for entry in &entries {
            self.customizations
                .insert(entry.wallet_address.clone(), entry.clone());
        }
        let touched = self.registry.apply_customizations(&entries, &self.pool);
        debug!(
            "{} customizations applied, {touched} live entities updated",
            entries.len()
        );
    }

    pub fn apply_feed_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Connecting { addr, attempt } => {
                debug!("feed connecting to {addr} (attempt {attempt})");
                self.connection = ConnectionStatus::Connecting { attempt };
            }
            FeedEvent::Connected(hello) => {
                info!(
                    "feed connected: {} ({} {})",
                    hello.producer,
                    hello.protocol,
                    hello.build.as_deref().unwrap_or("unversioned")
                );
                // A fresh hello starts a fresh sequence domain; a restarted
                // producer counts from 1 again.
                self.last_snapshot_seq = None;
                self.last_customization_seq = None;
                self.connection = ConnectionStatus::Connected {
                    producer: hello.producer,
                };
            }
            FeedEvent::Snapshot(snapshot) => self.apply_snapshot(snapshot),
            FeedEvent::Customizations(set) => self.apply_customization_set(set),
            FeedEvent::Heartbeat(beat) => {
                debug!("feed heartbeat seq {} at {}ms", beat.seq, beat.host_time_ms);
            }
            FeedEvent::ProtocolError(message) => {
                warn!("feed protocol error: {message}");
            }
            FeedEvent::Disconnected { reason } => {
                // Holder data stays on screen; only the link state changes.
                warn!("feed disconnected: {reason}");
                self.connection = ConnectionStatus::Lost { reason };
            }
        }
    }

    /// One frame of scene time: a population batch, the camera flight, the
    /// damped orbit rig, and the idle spin of the holder field. The spin
    /// holds still from the moment a focus flight starts until the camera
    /// returns to the overview, so a dock target never drifts mid-flight.
    pub fn advance(&mut self, dt: f32) {
        if !self.queue.is_idle() {
            self.queue.tick(
                &mut self.rng,
                &self.scatter,
                &mut self.registry,
                &self.pool,
                &self.customizations,
            );
            if self.queue.is_idle() {
                let (placed, expected) = self.queue.progress();
                info!("population complete: {placed}/{expected} holders placed");
            }
        }

        if let Some(event) = self.flight.tick(self.rig.as_mut(), dt) {
            match &event {
                SettleEvent::FocusSettled(FocusTarget::Sun) => info!("camera docked on the sun"),
                SettleEvent::FocusSettled(FocusTarget::Planet(wallet)) => {
                    info!("camera docked on {}", short_wallet(wallet));
                }
                SettleEvent::OverviewSettled => info!("camera returned to overview"),
            }
        }

        if let Some(rig) = self.rig.as_mut() {
            rig.update(dt);
        }

        let parked_overview = matches!(self.flight.view_state(), ViewState::Overview)
            && !self.flight.is_transitioning();
        if parked_overview {
            self.idle_spin = (self.idle_spin + IDLE_SPIN_RATE * dt) % TAU;
        }
    }

    pub fn focus_sun(&mut self) {
        self.flight
            .focus_on(self.rig.as_mut(), Vec3::ZERO, FocusTarget::Sun, None);
    }

    pub fn focus_wallet(&mut self, wallet: &str) {
        let Some(entity) = self.registry.entity(wallet) else {
            warn!("focus requested for unknown wallet {wallet}; ignoring");
            return;
        };
        let position = self.world_position(entity.position);
        let size = entity.size;
        let target = FocusTarget::Planet(entity.wallet_address.clone());
        self.flight
            .focus_on(self.rig.as_mut(), position, target, Some(size));
    }

    pub fn return_to_overview(&mut self) {
        self.flight.return_to_overview(self.rig.as_mut());
    }

    pub fn cancel_flight(&mut self) {
        self.flight.cancel(self.rig.as_mut());
    }

    /// Steps the focus through holders in rank order, wrapping at both ends.
    /// While a flight is in progress the step counts from its destination,
    /// so rapid presses walk the ranking instead of re-targeting the start.
    pub fn cycle_focus(&mut self, step: i32) {
        let ranked: Vec<String> = self
            .registry
            .by_rank()
            .iter()
            .map(|entity| entity.wallet_address.clone())
            .collect();
        if ranked.is_empty() {
            return;
        }

        let reference = self
            .flight
            .pending_destination()
            .unwrap_or_else(|| self.flight.view_state())
            .clone();
        let current = match &reference {
            ViewState::Focused(FocusTarget::Planet(wallet)) => {
                ranked.iter().position(|candidate| candidate == wallet)
            }
            _ => None,
        };

        let len = ranked.len() as i32;
        let next = match current {
            Some(index) => (index as i32 + step).rem_euclid(len),
            None if step >= 0 => 0,
            None => len - 1,
        };
        let wallet = ranked[next as usize].clone();
        self.focus_wallet(&wallet);
    }

    /// Resolves a click against the spun holder field. A hit starts a focus
    /// flight; empty sky returns to the overview unless already parked there.
    pub fn handle_click(&mut self, ndc: Vec2, view_projection: Mat4) {
        let Some(ray) = ray_from_ndc(ndc, view_projection.inverse()) else {
            warn!("click at ndc {ndc:?} produced no usable ray; ignoring");
            return;
        };
        // The registry stores unspun positions; counter-rotate the ray into
        // that frame instead of rotating every entity.
        let unspin = Quat::from_rotation_y(-self.idle_spin);
        let local_ray = PickRay {
            origin: unspin * ray.origin,
            direction: unspin * ray.direction,
        };

        match pick_target(&local_ray, &self.registry) {
            Some(FocusTarget::Sun) => self.focus_sun(),
            Some(FocusTarget::Planet(wallet)) => self.focus_wallet(&wallet),
            None => {
                let parked_overview = matches!(self.flight.view_state(), ViewState::Overview)
                    && !self.flight.is_transitioning();
                if !parked_overview {
                    self.return_to_overview();
                }
            }
        }
    }

    /// Status panel feed: token, link, population, snapshot seq, camera, and
    /// any notice.
    pub fn status_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("{} orrery", self.token_name)];
        lines.push(match &self.connection {
            ConnectionStatus::Offline => "feed: offline snapshot".to_string(),
            ConnectionStatus::Connecting { attempt } => {
                format!("feed: connecting (attempt {attempt})")
            }
            ConnectionStatus::Connected { producer } => format!("feed: {producer}"),
            ConnectionStatus::Lost { reason } => {
                format!("feed lost: {reason} (showing last data)")
            }
        });

        let (placed, expected) = self.queue.progress();
        if placed < expected {
            lines.push(format!("populating {placed}/{expected}"));
        } else {
            lines.push(format!("holders: {}", self.registry.len()));
        }
        if let Some(seq) = self.last_snapshot_seq {
            lines.push(format!("snapshot seq {seq}"));
        }

        lines.push(if self.flight.is_transitioning() {
            "camera: in flight".to_string()
        } else {
            match self.flight.view_state() {
                ViewState::Overview => "camera: overview".to_string(),
                ViewState::Focused(FocusTarget::Sun) => "camera: sun".to_string(),
                ViewState::Focused(FocusTarget::Planet(wallet)) => {
                    format!("camera: {}", short_wallet(wallet))
                }
            }
        });

        if let Some(notice) = &self.notice {
            lines.push(format!("! {notice}"));
        }
        lines
    }

    /// Holder table feed: top `limit` holders by rank, the focused one
    /// marked.
    pub fn holder_lines(&self, limit: usize) -> Vec<String> {
        if self.registry.is_empty() {
            return Vec::new();
        }
        let focused_wallet = match self.flight.view_state() {
            ViewState::Focused(FocusTarget::Planet(wallet)) => Some(wallet.as_str()),
            _ => None,
        };
        let mut lines = vec![format!("top holders ({})", self.registry.len())];
        for (index, entity) in self.registry.by_rank().iter().take(limit).enumerate() {
            let marker = if focused_wallet == Some(entity.wallet_address.as_str()) {
                '>'
            } else {
                ' '
            };
            let name = entity
                .nickname
                .clone()
                .unwrap_or_else(|| short_wallet(&entity.wallet_address));
            lines.push(format!(
                "{marker}{:>2}. {} {:.2}%",
                index + 1,
                name,
                entity.percentage
            ));
        }
        lines
    }

    /// Focus panel feed: empty unless the camera is settled on an entity.
    pub fn focus_lines(&self) -> Vec<String> {
        if self.flight.is_transitioning() {
            return Vec::new();
        }
        match self.flight.view_state() {
            ViewState::Overview => Vec::new(),
            ViewState::Focused(FocusTarget::Sun) => vec![
                self.token_name.clone(),
                "central sun".to_string(),
                format!("{} holders in orbit", self.registry.len()),
            ],
            ViewState::Focused(FocusTarget::Planet(wallet)) => {
                let Some(entity) = self.registry.entity(wallet) else {
                    return Vec::new();
                };
                let mut lines = Vec::new();
                if let Some(nickname) = &entity.nickname {
                    lines.push(nickname.clone());
                }
                lines.push(short_wallet(wallet));
                lines.push(format!("{:.2} {}", entity.token_amount, self.token_name));
                lines.push(format!("{:.4}% of supply", entity.percentage));
                lines
            }
        }
    }

    fn world_position(&self, local: Vec3) -> Vec3 {
        Quat::from_rotation_y(self.idle_spin) * local
    }

    /// Stages a full-replacement holder set: wallets missing from it retire
    /// immediately, the rest flow through the batched populator. A focus
    /// aimed at a retired wallet flies home.
    fn stage_records(&mut self, records: Vec<HolderRecord>) {
        let live: HashSet<String> = records
            .iter()
            .map(|record| record.wallet_address.clone())
            .collect();
        let retired = self.registry.retire_absent(&live);
        if retired > 0 {
            info!("retired {retired} holders absent from the new snapshot");
        }
        self.queue.enqueue_snapshot(records);
        self.reconcile_focus();
    }

    fn reconcile_focus(&mut self) {
        let stale_planet = |state: &ViewState, registry: &PlanetRegistry| match state {
            ViewState::Focused(FocusTarget::Planet(wallet)) => !registry.contains(wallet),
            _ => false,
        };
        let needs_return = match self.flight.pending_destination() {
            Some(destination) => stale_planet(destination, &self.registry),
            None => stale_planet(self.flight.view_state(), &self.registry),
        };
        if needs_return {
            info!("focused holder left the snapshot; returning to overview");
            self.return_to_overview();
        }
    }
}

fn customization_from_wire(entry: CustomizationEntry) -> Option<Customization> {
    Customization {
        wallet_address: entry.wallet_address,
        nickname: entry.nickname,
        skin_index: entry.skin_index.map(|slot| slot as usize),
    }
    .sanitized()
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_stream::{Hello, HolderRow};

    const FRAME: f32 = 1.0 / 60.0;

    fn scene(with_rig: bool) -> UniverseScene {
        UniverseScene::new(
            TexturePoolView::new(vec![true, true, false]),
            "ORB",
            Some(42),
            with_rig,
        )
    }

    fn wire_row(wallet: &str, amount: f64, percentage: f64) -> HolderRow {
        HolderRow {
            wallet_address: wallet.to_string(),
            token_amount: amount,
            percentage,
        }
    }

    fn snapshot(seq: u64, rows: Vec<HolderRow>) -> HolderSnapshot {
        HolderSnapshot {
            seq,
            generated_at_ms: 1_000 + seq,
            token_name: None,
            rows,
        }
    }

    fn drain(scene: &mut UniverseScene) {
        while !scene.population_idle() {
            scene.advance(FRAME);
        }
    }

    #[test]
    fn snapshot_populates_and_replacement_retires() {
        let mut scene = scene(true);
        scene.apply_snapshot(snapshot(
            1,
            vec![
                wire_row("wallet-a", 600.0, 60.0),
                wire_row("wallet-b", 400.0, 40.0),
            ],
        ));
        drain(&mut scene);
        assert_eq!(scene.registry().len(), 2);
        assert_eq!(scene.progress(), (2, 2));

        scene.apply_snapshot(snapshot(2, vec![wire_row("wallet-a", 1_000.0, 100.0)]));
        assert!(!scene.registry().contains("wallet-b"));
        drain(&mut scene);
        assert_eq!(scene.registry().len(), 1);
        let entity = scene.registry().entity("wallet-a").expect("kept");
        assert_eq!(entity.percentage, 100.0);
    }

    #[test]
    fn stale_snapshot_sequences_are_ignored() {
        let mut scene = scene(false);
        scene.apply_snapshot(snapshot(5, vec![wire_row("wallet-new", 10.0, 100.0)]));
        drain(&mut scene);

        scene.apply_snapshot(snapshot(4, vec![wire_row("wallet-old", 10.0, 100.0)]));
        assert!(scene.registry().contains("wallet-new"));
        assert!(!scene.registry().contains("wallet-old"));
        assert!(scene.population_idle());
    }

    #[test]
    fn reconnect_restarts_the_sequence_domain() {
        let mut scene = scene(false);
        scene.apply_snapshot(snapshot(9, vec![wire_row("wallet-old", 10.0, 100.0)]));
        drain(&mut scene);

        // A restarted producer greets again and counts from 1.
        scene.apply_feed_event(FeedEvent::Connected(Hello::new("holder_feed", None)));
        scene.apply_snapshot(snapshot(1, vec![wire_row("wallet-new", 10.0, 100.0)]));
        drain(&mut scene);
        assert!(scene.registry().contains("wallet-new"));
        assert!(!scene.registry().contains("wallet-old"));
    }

    #[test]
    fn malformed_rows_are_skipped_not_fatal() {
        let mut scene = scene(false);
        scene.apply_snapshot(snapshot(
            1,
            vec![
                wire_row("wallet-ok", 10.0, 50.0),
                wire_row("", 10.0, 25.0),
                wire_row("wallet-bad", f64::NAN, 25.0),
                wire_row("wallet-ok", 99.0, 1.0),
            ],
        ));
        drain(&mut scene);
        assert_eq!(scene.registry().len(), 1);
        // First occurrence wins over the duplicate row.
        let entity = scene.registry().entity("wallet-ok").expect("spawned");
        assert_eq!(entity.token_amount, 10.0);
    }

    #[test]
    fn fully_unusable_snapshot_keeps_current_scene() {
        let mut scene = scene(false);
        scene.apply_snapshot(snapshot(1, vec![wire_row("wallet-a", 10.0, 100.0)]));
        drain(&mut scene);

        scene.apply_snapshot(snapshot(2, vec![wire_row("", f64::NAN, -3.0)]));
        assert_eq!(scene.registry().len(), 1);
        assert!(scene.registry().contains("wallet-a"));
    }

    #[test]
    fn raw_rows_flow_through_normalization() {
        let mut scene = scene(false);
        let rows = vec![
            RawHolderRow {
                wallet_address: "whale".to_string(),
                amount: 1_000_000.0,
            },
            RawHolderRow {
                wallet_address: "dust".to_string(),
                amount: 50.0,
            },
        ];
        scene.apply_raw_rows(&rows);
        drain(&mut scene);
        assert!(scene.registry().contains("whale"));
        assert!(!scene.registry().contains("dust"));
    }

    #[test]
    fn customizations_convert_and_reach_live_entities() {
        let mut scene = scene(false);
        scene.apply_snapshot(snapshot(1, vec![wire_row("wallet-a", 10.0, 100.0)]));
        drain(&mut scene);

        scene.apply_customization_set(CustomizationSet {
            seq: 1,
            entries: vec![
                CustomizationEntry {
                    wallet_address: "wallet-a".to_string(),
                    nickname: Some("  Flagship  ".to_string()),
                    skin_index: Some(1),
                },
                CustomizationEntry {
                    wallet_address: "wallet-later".to_string(),
                    nickname: Some("Early Bird".to_string()),
                    skin_index: None,
                },
            ],
        });
        let entity = scene.registry().entity("wallet-a").expect("live");
        assert_eq!(entity.nickname.as_deref(), Some("Flagship"));
        assert_eq!(entity.texture_slot, 1);

        // The stored entry applies when its wallet spawns later.
        scene.apply_snapshot(snapshot(
            2,
            vec![
                wire_row("wallet-a", 10.0, 50.0),
                wire_row("wallet-later", 10.0, 50.0),
            ],
        ));
        drain(&mut scene);
        let late = scene.registry().entity("wallet-later").expect("spawned");
        assert_eq!(late.nickname.as_deref(), Some("Early Bird"));

        // A stale set is ignored wholesale.
        scene.apply_customization_set(CustomizationSet {
            seq: 1,
            entries: vec![CustomizationEntry {
                wallet_address: "wallet-a".to_string(),
                nickname: Some("Renamed".to_string()),
                skin_index: None,
            }],
        });
        let entity = scene.registry().entity("wallet-a").expect("live");
        assert_eq!(entity.nickname.as_deref(), Some("Flagship"));
    }

    #[test]
    fn disconnect_keeps_stale_data_and_reports_it() {
        let mut scene = scene(false);
        scene.apply_snapshot(snapshot(1, vec![wire_row("wallet-a", 10.0, 100.0)]));
        drain(&mut scene);

        scene.apply_feed_event(FeedEvent::Disconnected {
            reason: "connection reset".to_string(),
        });
        assert_eq!(scene.registry().len(), 1);
        assert_eq!(
            scene.connection(),
            &ConnectionStatus::Lost {
                reason: "connection reset".to_string()
            }
        );
        let status = scene.status_lines().join("\n");
        assert!(status.contains("showing last data"));
    }

    #[test]
    fn idle_spin_pauses_for_focus_and_resumes_after_return() {
        let mut scene = scene(true);
        scene.apply_snapshot(snapshot(1, vec![wire_row("wallet-a", 10.0, 100.0)]));
        drain(&mut scene);

        for _ in 0..60 {
            scene.advance(FRAME);
        }
        let spun = scene.idle_spin();
        assert!(spun > 0.2, "overview spin should accumulate, got {spun}");

        // The spin freezes the moment the flight starts, not at settle.
        scene.focus_wallet("wallet-a");
        scene.advance(FRAME);
        assert_eq!(scene.idle_spin(), spun);

        for _ in 0..120 {
            scene.advance(FRAME);
        }
        assert!(matches!(
            scene.view_state(),
            ViewState::Focused(FocusTarget::Planet(_))
        ));
        assert_eq!(scene.idle_spin(), spun);

        scene.return_to_overview();
        for _ in 0..120 {
            scene.advance(FRAME);
        }
        assert_eq!(scene.view_state(), &ViewState::Overview);
        assert!(scene.idle_spin() > spun);
    }

    #[test]
    fn focus_on_unknown_wallet_is_a_noop() {
        let mut scene = scene(true);
        scene.focus_wallet("wallet-ghost");
        assert_eq!(scene.view_state(), &ViewState::Overview);
        assert!(scene.focus_lines().is_empty());
    }

    #[test]
    fn retiring_the_focused_holder_flies_home() {
        let mut scene = scene(true);
        scene.apply_snapshot(snapshot(
            1,
            vec![
                wire_row("wallet-a", 600.0, 60.0),
                wire_row("wallet-b", 400.0, 40.0),
            ],
        ));
        drain(&mut scene);

        scene.focus_wallet("wallet-b");
        for _ in 0..120 {
            scene.advance(FRAME);
        }
        assert_eq!(
            scene.view_state(),
            &ViewState::Focused(FocusTarget::Planet("wallet-b".to_string()))
        );

        scene.apply_snapshot(snapshot(2, vec![wire_row("wallet-a", 600.0, 100.0)]));
        for _ in 0..120 {
            scene.advance(FRAME);
        }
        assert_eq!(scene.view_state(), &ViewState::Overview);
    }

    #[test]
    fn cycle_focus_walks_the_ranking_and_wraps() {
        let mut scene = scene(true);
        scene.apply_snapshot(snapshot(
            1,
            vec![
                wire_row("wallet-mid", 300.0, 30.0),
                wire_row("wallet-top", 500.0, 50.0),
                wire_row("wallet-low", 200.0, 20.0),
            ],
        ));
        drain(&mut scene);

        scene.cycle_focus(1);
        let first = scene.flight_destination_wallet();
        assert_eq!(first.as_deref(), Some("wallet-top"));

        // Stepping before the flight settles counts from its destination.
        scene.cycle_focus(1);
        assert_eq!(
            scene.flight_destination_wallet().as_deref(),
            Some("wallet-mid")
        );
        scene.cycle_focus(-1);
        assert_eq!(
            scene.flight_destination_wallet().as_deref(),
            Some("wallet-top")
        );
        scene.cycle_focus(-1);
        assert_eq!(
            scene.flight_destination_wallet().as_deref(),
            Some("wallet-low")
        );
    }

    #[test]
    fn click_focuses_the_spun_planet_it_hits() {
        let mut scene = scene(true);
        scene.apply_snapshot(snapshot(1, vec![wire_row("wallet-a", 10.0, 100.0)]));
        drain(&mut scene);
        for _ in 0..90 {
            scene.advance(FRAME);
        }
        assert!(scene.idle_spin() > 0.0);

        let local = scene.registry().entity("wallet-a").expect("spawned").position;
        let world = Quat::from_rotation_y(scene.idle_spin()) * local;
        // Camera sits beyond the planet on the ray away from the origin, so
        // a center click hits the planet before the sun.
        let eye = world + world.normalize() * 20.0;
        let view = Mat4::look_at_rh(eye, world, Vec3::Y);
        let proj = Mat4::perspective_rh(75f32.to_radians(), 16.0 / 9.0, 0.1, 1_000.0);

        scene.handle_click(Vec2::ZERO, proj * view);
        assert_eq!(
            scene.flight_destination_wallet().as_deref(),
            Some("wallet-a")
        );
    }

    #[test]
    fn empty_sky_click_returns_home_only_when_away() {
        let mut scene = scene(true);
        scene.apply_snapshot(snapshot(1, vec![wire_row("wallet-a", 10.0, 100.0)]));
        drain(&mut scene);

        // Parked at the overview: nothing should start.
        let eye = Vec3::new(500.0, 500.0, 500.0);
        let view = Mat4::look_at_rh(eye, eye + Vec3::X, Vec3::Y);
        let proj = Mat4::perspective_rh(75f32.to_radians(), 16.0 / 9.0, 0.1, 1_000.0);
        scene.handle_click(Vec2::ZERO, proj * view);
        assert!(scene.flight_destination_wallet().is_none());
        assert_eq!(scene.view_state(), &ViewState::Overview);

        // Focused: the same click flies home.
        scene.focus_wallet("wallet-a");
        for _ in 0..120 {
            scene.advance(FRAME);
        }
        scene.handle_click(Vec2::ZERO, proj * view);
        for _ in 0..120 {
            scene.advance(FRAME);
        }
        assert_eq!(scene.view_state(), &ViewState::Overview);
    }

    #[test]
    fn panel_lines_reflect_population_and_focus() {
        let mut scene = scene(true);
        scene.apply_snapshot(snapshot(
            1,
            vec![
                wire_row("9h3kQabAtUKcnQDkSDme7KSZZLSWNsEq7NronquWwHDy", 600.0, 60.0),
                wire_row("wallet-b", 400.0, 40.0),
            ],
        ));
        let status = scene.status_lines().join("\n");
        assert!(status.contains("populating 0/2"));

        drain(&mut scene);
        let status = scene.status_lines().join("\n");
        assert!(status.contains("holders: 2"));
        assert!(status.contains("camera: overview"));

        let holders = scene.holder_lines(8);
        assert_eq!(holders.len(), 3);
        assert!(holders[1].contains("9h3kQa...wHDy"));
        assert!(holders[1].contains("60.00%"));

        scene.focus_wallet("wallet-b");
        for _ in 0..120 {
            scene.advance(FRAME);
        }
        let focus = scene.focus_lines();
        assert!(focus.iter().any(|line| line == "wallet-b"));
        assert!(focus.iter().any(|line| line.contains("400.00 ORB")));
        let holders = scene.holder_lines(8);
        assert!(holders[2].starts_with('>'));
    }

    impl UniverseScene {
        fn flight_destination_wallet(&self) -> Option<String> {
            match self.flight.pending_destination() {
                Some(ViewState::Focused(FocusTarget::Planet(wallet))) => Some(wallet.clone()),
                _ => None,
            }
        }
    }
}
