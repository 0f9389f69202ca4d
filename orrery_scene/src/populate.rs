use std::collections::{HashMap, VecDeque};

use rand::Rng;

use orrery_data::{Customization, HolderRecord};

use crate::registry::PlanetRegistry;
use crate::scatter::{generate_position, ScatterConfig};

/// Records materialized per tick. One tick runs per rendered frame, so the
/// batch size bounds how much scene mutation a single frame absorbs.
pub const BATCH_SIZE: usize = 25;

/// Load states of the shared planet texture pool, indexed by slot. Slots
/// that failed to decode keep a procedural swatch in the atlas, so a slot
/// is always drawable; "loaded" means the real asset arrived.
#[derive(Debug, Clone)]
pub struct TexturePoolView {
    loaded: Vec<bool>,
}

impl TexturePoolView {
    pub fn new(loaded: Vec<bool>) -> Self {
        Self { loaded }
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }

    pub fn is_loaded(&self, slot: usize) -> bool {
        self.loaded.get(slot).copied().unwrap_or(false)
    }

    pub fn any_loaded(&self) -> bool {
        self.loaded.iter().any(|flag| *flag)
    }

    /// Round-robin slot for the nth spawned entity. Starts from
    /// `spawn_index % len` and walks forward past failed slots, wrapping.
    /// When nothing in the pool loaded, the natural slot is kept and the
    /// renderer shows its swatch.
    pub fn slot_for(&self, spawn_index: usize) -> usize {
        if self.loaded.is_empty() {
            return 0;
        }
        let natural = spawn_index % self.loaded.len();
        for offset in 0..self.loaded.len() {
            let slot = (natural + offset) % self.loaded.len();
            if self.loaded[slot] {
                return slot;
            }
        }
        natural
    }
}

/// Counts of what one batch tick did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    pub created: usize,
    pub refreshed: usize,
}

/// Feeds holder records into the registry a batch per frame, in input
/// order, so a large snapshot never stalls a single frame. A record whose
/// wallet already has an entity refreshes it in place instead of spawning
/// a twin.
#[derive(Debug, Default)]
pub struct PopulationQueue {
    pending: VecDeque<HolderRecord>,
    total_expected: usize,
    placed: usize,
}

impl PopulationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages a fresh snapshot, discarding whatever the previous one still
    /// had queued. Retiring entities absent from the snapshot is the
    /// caller's job before enqueueing.
    pub fn enqueue_snapshot(&mut self, records: Vec<HolderRecord>) {
        self.total_expected = records.len();
        self.placed = 0;
        self.pending = records.into();
    }

    /// Records whose entity is live this cycle versus the snapshot total,
    /// for the loading readout.
    pub fn progress(&self) -> (usize, usize) {
        (self.placed, self.total_expected)
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Processes at most one batch. Newly placed positions join the
    /// occupied set immediately so later records in the same batch scatter
    /// away from them.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        config: &ScatterConfig,
        registry: &mut PlanetRegistry,
        pool: &TexturePoolView,
        customizations: &HashMap<String, Customization>,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let mut occupied = registry.positions();
        for _ in 0..BATCH_SIZE {
            let Some(record) = self.pending.pop_front() else {
                break;
            };
            if registry.contains(&record.wallet_address) {
                registry.refresh(&record);
                outcome.refreshed += 1;
            } else {
                let position = generate_position(
                    rng,
                    config,
                    &occupied,
                    Some(record.percentage as f32),
                );
                let custom = customizations.get(&record.wallet_address);
                let slot = custom
                    .and_then(|entry| entry.skin_index)
                    .filter(|slot| pool.is_loaded(*slot))
                    .unwrap_or_else(|| pool.slot_for(registry.spawn_count()));
                let nickname = custom.and_then(|entry| entry.nickname.clone());
                registry.spawn(&record, position, slot, nickname);
                occupied.push(position);
                outcome.created += 1;
            }
            self.placed += 1;
        }
        outcome
    }
}
