// CLASSIFICATION: COMMUNITY
// Filename: source.rs v0.1
// Author: Cohesix Codex
// Date Modified: 2026-10-17

//! Where entity snapshots and live leaf values come from.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::entity::{Entity, Snapshot};
use crate::error::{MirrorError, Result};
use crate::index::Leaf;
use crate::rng::TinyRng;
use crate::value::{DataType, ValueRank, Variant};

/// Publisher of entity snapshots.
pub trait SnapshotSource: Send {
    /// Monotonically increasing marker of the newest snapshot.
    fn generation(&mut self) -> Result<u64>;
    /// Fetch the newest snapshot.
    fn latest(&mut self) -> Result<Snapshot>;
}

/// In-memory snapshot source. Clones share state, so a handle kept by the
/// caller can publish while the updater polls.
#[derive(Debug, Clone, Default)]
pub struct SharedSnapshots {
    inner: Arc<Mutex<Snapshot>>,
}

impl SharedSnapshots {
    pub fn new(initial: Snapshot) -> Self {
        Self {
            inner: Arc::new(Mutex::new(initial)),
        }
    }

    /// Replace the entity list and advance the generation.
    pub fn publish(&self, entities: Vec<Entity>) -> Result<u64> {
        let mut snapshot = self.inner.lock().map_err(|_| MirrorError::LockPoisoned)?;
        snapshot.revision += 1;
        snapshot.entities = entities;
        Ok(snapshot.revision)
    }
}

impl SnapshotSource for SharedSnapshots {
    fn generation(&mut self) -> Result<u64> {
        Ok(self
            .inner
            .lock()
            .map_err(|_| MirrorError::LockPoisoned)?
            .revision)
    }

    fn latest(&mut self) -> Result<Snapshot> {
        Ok(self
            .inner
            .lock()
            .map_err(|_| MirrorError::LockPoisoned)?
            .clone())
    }
}

/// Snapshot source reading a JSON or TOML document whose `revision` field
/// serves as the generation.
///
/// The document read for [`SnapshotSource::generation`] is kept and handed
/// out by the following [`SnapshotSource::latest`], so both answers come
/// from the same revision even if the file is rewritten in between.
#[derive(Debug, Clone)]
pub struct FileSnapshots {
    path: PathBuf,
    loaded: Option<Snapshot>,
}

impl FileSnapshots {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            loaded: None,
        }
    }
}

impl SnapshotSource for FileSnapshots {
    fn generation(&mut self) -> Result<u64> {
        let snapshot = Snapshot::load(&self.path)?;
        let revision = snapshot.revision;
        self.loaded = Some(snapshot);
        Ok(revision)
    }

    fn latest(&mut self) -> Result<Snapshot> {
        match self.loaded.take() {
            Some(snapshot) => Ok(snapshot),
            None => Snapshot::load(&self.path),
        }
    }
}

/// Supplier of fresh leaf values.
pub trait ValueSource: Send {
    /// Produce the next value for `leaf`, shaped by its declared type.
    fn sample(&mut self, leaf: &Leaf) -> Result<Variant>;
}

const ALPHABET: &[u8] = b"abcdefghijkmnpqrstuvwxyzABCDEFGHIJKLMNPQRSTUVWXYZ123456789";
const STRING_LEN: usize = 8;
const ARRAY_LEN: usize = 4;

/// Random values: integral numbers in `[min, max)`, coin-flip booleans
/// and short strings over an alphabet without look-alike characters.
#[derive(Debug, Clone)]
pub struct SimulatedValues {
    rng: TinyRng,
    min: i64,
    max: i64,
}

impl SimulatedValues {
    pub fn new(seed: u64, min: f64, max: f64) -> Self {
        Self {
            rng: TinyRng::new(seed),
            min: min.floor() as i64,
            max: max.floor() as i64,
        }
    }

    fn scalar(&mut self, leaf: &Leaf) -> Result<Variant> {
        let number = self.rng.gen_range(self.min, self.max);
        let value = match leaf.data_type {
            DataType::Boolean => Variant::Boolean(self.rng.next_bool()),
            DataType::String => {
                let text = (0..STRING_LEN)
                    .map(|_| ALPHABET[(self.rng.next_u32() as usize) % ALPHABET.len()] as char)
                    .collect();
                Variant::String(text)
            }
            DataType::Double => Variant::Double(number as f64),
            DataType::Float => Variant::Float(number as f32),
            DataType::Int64 => Variant::Int64(number),
            DataType::Int32 => Variant::Int32(
                i32::try_from(number)
                    .map_err(|_| MirrorError::transient(leaf.id, "sample outside int32"))?,
            ),
            DataType::UInt32 => Variant::UInt32(
                u32::try_from(number)
                    .map_err(|_| MirrorError::transient(leaf.id, "sample outside uint32"))?,
            ),
        };
        Ok(value)
    }
}

impl Default for SimulatedValues {
    fn default() -> Self {
        Self::new(0x5eed, 0.0, 99.0)
    }
}

impl ValueSource for SimulatedValues {
    fn sample(&mut self, leaf: &Leaf) -> Result<Variant> {
        match leaf.value_rank {
            ValueRank::Scalar => self.scalar(leaf),
            ValueRank::OneDimension => (0..ARRAY_LEN)
                .map(|_| self.scalar(leaf))
                .collect::<Result<Vec<_>>>()
                .map(Variant::Array),
            ValueRank::TwoDimensions => (0..2)
                .map(|_| {
                    (0..2)
                        .map(|_| self.scalar(leaf))
                        .collect::<Result<Vec<_>>>()
                        .map(Variant::Array)
                })
                .collect::<Result<Vec<_>>>()
                .map(Variant::Array),
        }
    }
}
