//! Typed input rows and their grouping into analysis units.
//!
//! Raw neighbor tables encode "no neighbor" as the integer `0`. That sentinel is
//! converted into [`Neighbor::None`] at the deserialization boundary so nothing
//! downstream compares cell ids against zero.

use std::collections::BTreeMap;

use log::{debug, trace};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{AnalysisError, Result};

pub type CellId = u32;
pub type Tick = u32;
pub type Seed = u32;

/// One entry of a cell's neighbor list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Neighbor {
    /// The owning cell touches nothing at this tick
    None,
    Cell(CellId),
}

impl Neighbor {
    /// Decode the raw table value, where `0` stands for "no neighbor".
    pub fn from_raw(raw: u32) -> Self {
        if raw == 0 {
            Neighbor::None
        } else {
            Neighbor::Cell(raw)
        }
    }

    pub fn to_raw(self) -> u32 {
        match self {
            Neighbor::None => 0,
            Neighbor::Cell(id) => id,
        }
    }

    pub fn cell(self) -> Option<CellId> {
        match self {
            Neighbor::None => None,
            Neighbor::Cell(id) => Some(id),
        }
    }
}

impl From<u32> for Neighbor {
    fn from(raw: u32) -> Self {
        Neighbor::from_raw(raw)
    }
}

impl Serialize for Neighbor {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.to_raw())
    }
}

impl<'de> Deserialize<'de> for Neighbor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        u32::deserialize(deserializer).map(Neighbor::from_raw)
    }
}

// `NEIGHBOR` tables carry a single id per row, `NEIGHBORS` tables a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(Neighbor),
    Many(Vec<Neighbor>),
}

fn deserialize_neighbors<'de, D>(deserializer: D) -> std::result::Result<Vec<Neighbor>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(n) => vec![n],
        OneOrMany::Many(v) => v,
    })
}

/// Per-cell spatial/adjacency record for one tick of one replicate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdjacencyRecord {
    #[serde(rename = "KEY", default)]
    pub key: String,
    #[serde(rename = "SEED")]
    pub seed: Seed,
    #[serde(rename = "TICK")]
    pub tick: Tick,
    #[serde(rename = "ID")]
    pub cell_id: CellId,
    #[serde(
        rename = "NEIGHBORS",
        alias = "NEIGHBOR",
        deserialize_with = "deserialize_neighbors"
    )]
    pub neighbors: Vec<Neighbor>,
    #[serde(rename = "CX")]
    pub cx: f64,
    #[serde(rename = "CY")]
    pub cy: f64,
    #[serde(rename = "CZ", default, skip_serializing_if = "Option::is_none")]
    pub cz: Option<f64>,
    #[serde(rename = "DEPTH", default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<i64>,
    #[serde(rename = "PHASE", default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

impl AdjacencyRecord {
    /// Record with raw neighbor ids (`0` = none) and a planar centroid.
    pub fn new(
        key: &str,
        seed: Seed,
        tick: Tick,
        cell_id: CellId,
        raw_neighbors: &[u32],
        cx: f64,
        cy: f64,
    ) -> Self {
        Self {
            key: key.to_string(),
            seed,
            tick,
            cell_id,
            neighbors: raw_neighbors.iter().copied().map(Neighbor::from_raw).collect(),
            cx,
            cy,
            cz: None,
            depth: None,
            phase: None,
        }
    }

    pub fn with_depth(mut self, depth: i64) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    pub fn with_cz(mut self, cz: f64) -> Self {
        self.cz = Some(cz);
        self
    }

    /// Neighboring cell ids, sentinel entries dropped.
    pub fn neighbor_cells(&self) -> impl Iterator<Item = CellId> + '_ {
        self.neighbors.iter().filter_map(|n| n.cell())
    }

    pub fn unit_key(&self) -> UnitKey {
        UnitKey {
            key: self.key.clone(),
            seed: self.seed,
            tick: self.tick,
        }
    }

    pub fn centroid(&self) -> Vec<f64> {
        match self.cz {
            Some(cz) => vec![self.cx, self.cy, cz],
            None => vec![self.cx, self.cy],
        }
    }
}

/// Identifies one analysis unit: a tick of a replicate of a condition.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitKey {
    pub key: String,
    pub seed: Seed,
    pub tick: Tick,
}

impl std::fmt::Display for UnitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{:04}/{:06}", self.key, self.seed, self.tick)
    }
}

/// Split a flat table into per-unit groups, ordered by (key, seed, tick).
pub fn group_units(records: Vec<AdjacencyRecord>) -> BTreeMap<UnitKey, Vec<AdjacencyRecord>> {
    let total = records.len();
    let mut units: BTreeMap<UnitKey, Vec<AdjacencyRecord>> = BTreeMap::new();
    for record in records {
        units.entry(record.unit_key()).or_default().push(record);
    }
    debug!("Grouped {} records into {} units", total, units.len());
    units
}

/// Collapse rows that share a cell id within one unit.
///
/// Flattened `NEIGHBOR` tables repeat a cell once per neighbor; the merged
/// record carries the union of neighbor entries. Rows for the same cell that
/// disagree on the centroid are rejected.
pub fn collapse_rows(records: &[AdjacencyRecord]) -> Result<Vec<AdjacencyRecord>> {
    let mut merged: BTreeMap<CellId, AdjacencyRecord> = BTreeMap::new();
    for record in records {
        match merged.get_mut(&record.cell_id) {
            Some(existing) => {
                let same_place = approx::relative_eq!(existing.cx, record.cx)
                    && approx::relative_eq!(existing.cy, record.cy);
                if !same_place {
                    return Err(AnalysisError::DuplicateCell {
                        tick: record.tick,
                        cell_id: record.cell_id,
                    });
                }
                for n in &record.neighbors {
                    if !existing.neighbors.contains(n) {
                        existing.neighbors.push(*n);
                    }
                }
                trace!("Merged repeated row for cell {}", record.cell_id);
            }
            None => {
                merged.insert(record.cell_id, record.clone());
            }
        }
    }
    Ok(merged.into_values().collect())
}

/// Feature values of one cell at one tick of one replicate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    #[serde(rename = "KEY")]
    pub key: String,
    #[serde(rename = "SEED")]
    pub seed: Seed,
    #[serde(rename = "ID")]
    pub id: CellId,
    #[serde(rename = "TICK")]
    pub tick: Tick,
    #[serde(flatten)]
    pub features: BTreeMap<String, f64>,
}

impl FeatureRow {
    pub fn new(key: &str, seed: Seed, id: CellId, tick: Tick) -> Self {
        Self {
            key: key.to_string(),
            seed,
            id,
            tick,
            features: BTreeMap::new(),
        }
    }

    pub fn with_feature(mut self, name: &str, value: f64) -> Self {
        self.features.insert(name.to_string(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.features.get(name).copied()
    }
}

/// Flat reference population per feature (no key, seed or tick).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceTable {
    pub features: BTreeMap<String, Vec<f64>>,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feature(mut self, name: &str, values: Vec<f64>) -> Self {
        self.features.insert(name.to_string(), values);
        self
    }

    pub fn values(&self, name: &str) -> Option<&[f64]> {
        self.features.get(name).map(|v| v.as_slice())
    }

    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.features.keys().map(|k| k.as_str())
    }
}
