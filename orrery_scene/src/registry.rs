use std::collections::{BTreeMap, HashSet};

use glam::Vec3;
use orrery_data::{Customization, HolderRecord};

use crate::populate::TexturePoolView;

/// Radius of the smallest planet.
pub const MIN_PLANET_SIZE: f32 = 0.5;

/// Radius of the largest planet.
pub const MAX_PLANET_SIZE: f32 = 3.0;

/// Maps a holding percentage onto a planet radius. Monotonic in the
/// percentage and bounded to the configured size range; out-of-range input
/// is clamped rather than rejected.
pub fn size_for_percentage(percentage: f64) -> f32 {
    let share = (percentage.clamp(0.0, 100.0) / 100.0) as f32;
    MIN_PLANET_SIZE + share * (MAX_PLANET_SIZE - MIN_PLANET_SIZE)
}

/// One rendered holder planet. The position is assigned once at spawn and
/// never recomputed; refreshes only touch the holding figures and size.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanetEntity {
    pub wallet_address: String,
    pub token_amount: f64,
    pub percentage: f64,
    pub size: f32,
    pub position: Vec3,
    pub texture_slot: usize,
    pub nickname: Option<String>,
    pub spawn_index: usize,
}

/// What [`PlanetRegistry::spawn`] did with the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Refreshed,
}

/// Live entity table keyed by wallet address. Wallet uniqueness is the
/// map key invariant; the spawn counter preserves insertion order for the
/// texture round-robin.
#[derive(Debug, Default)]
pub struct PlanetRegistry {
    entities: BTreeMap<String, PlanetEntity>,
    spawned: usize,
}

impl PlanetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn contains(&self, wallet: &str) -> bool {
        self.entities.contains_key(wallet)
    }

    pub fn entity(&self, wallet: &str) -> Option<&PlanetEntity> {
        self.entities.get(wallet)
    }

    /// Entities in wallet order (deterministic for overlays and tests).
    pub fn iter(&self) -> impl Iterator<Item = &PlanetEntity> {
        self.entities.values()
    }

    /// Entities ranked by holding percentage, largest first, wallets
    /// breaking ties. Drives the holder table and focus cycling.
    pub fn by_rank(&self) -> Vec<&PlanetEntity> {
        let mut ranked: Vec<&PlanetEntity> = self.entities.values().collect();
        ranked.sort_by(|a, b| {
            b.percentage
                .total_cmp(&a.percentage)
                .then_with(|| a.wallet_address.cmp(&b.wallet_address))
        });
        ranked
    }

    /// Occupied points for the scatter's rejection test.
    pub fn positions(&self) -> Vec<Vec3> {
        self.entities.values().map(|entity| entity.position).collect()
    }

    /// Count of entities ever spawned; the next spawn takes this index.
    pub fn spawn_count(&self) -> usize {
        self.spawned
    }

    /// Creates the entity on first sight of a wallet, or refreshes the
    /// existing one in place: holding figures and size follow the record,
    /// while position, texture slot, and nickname stay as assigned.
    pub fn spawn(
        &mut self,
        record: &HolderRecord,
        position: Vec3,
        texture_slot: usize,
        nickname: Option<String>,
    ) -> UpsertOutcome {
        if self.refresh(record) {
            return UpsertOutcome::Refreshed;
        }
        let entity = PlanetEntity {
            wallet_address: record.wallet_address.clone(),
            token_amount: record.token_amount,
            percentage: record.percentage,
            size: size_for_percentage(record.percentage),
            position,
            texture_slot,
            nickname,
            spawn_index: self.spawned,
        };
        self.spawned += 1;
        self.entities.insert(record.wallet_address.clone(), entity);
        UpsertOutcome::Created
    }

    /// Updates an existing entity from a fresh record. Returns false when
    /// the wallet has no live entity.
    pub fn refresh(&mut self, record: &HolderRecord) -> bool {
        let Some(entity) = self.entities.get_mut(&record.wallet_address) else {
            return false;
        };
        entity.token_amount = record.token_amount;
        entity.percentage = record.percentage;
        entity.size = size_for_percentage(record.percentage);
        true
    }

    /// Drops every entity whose wallet is absent from the latest
    /// fully-replacing snapshot. Returns how many were retired.
    pub fn retire_absent(&mut self, live_wallets: &HashSet<String>) -> usize {
        let before = self.entities.len();
        self.entities
            .retain(|wallet, _| live_wallets.contains(wallet));
        before - self.entities.len()
    }

    /// Merges appearance overrides into live entities. Nicknames are
    /// replaced wholesale; skins only apply when they name a loaded pool
    /// slot. Returns how many entities were touched.
    pub fn apply_customizations(
        &mut self,
        entries: &[Customization],
        pool: &TexturePoolView,
    ) -> usize {
        let mut touched = 0;
        for entry in entries {
            let Some(entity) = self.entities.get_mut(&entry.wallet_address) else {
                continue;
            };
            entity.nickname = entry.nickname.clone();
            if let Some(slot) = entry.skin_index {
                if pool.is_loaded(slot) {
                    entity.texture_slot = slot;
                }
            }
            touched += 1;
        }
        touched
    }
}
