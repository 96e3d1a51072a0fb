//! Run results consumed by plotting and replay tools.

use crate::ant::Outcome;
use crate::grid::Point;
use crate::stats::CostReport;
use anyhow::{Context, Result};
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Final path of one ant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AntRecord {
    pub path: Vec<Point>,
    pub cost: f64,
    pub outcome: Outcome,
}

/// Summary of one colony iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: usize,
    /// Lowest cost found during this iteration.
    pub iteration_best_cost: f64,
    /// Lowest cost found so far in the run.
    pub best_cost: f64,
    pub cost: CostReport,
    pub n_done: usize,
    pub n_aborted: usize,
    /// Number of edges holding pheromone after the update.
    pub n_edges: usize,
}

/// Result of a colony run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub seed: u64,
    pub alpha: f64,
    pub beta: f64,

    pub best_path: Option<Vec<Point>>,
    pub best_cost: f64,

    /// Final paths of all ants, in colony order.
    pub ants: Vec<AntRecord>,
    /// Cheapest ants of the final iteration, by ascending cost.
    pub top_ants: Vec<AntRecord>,

    pub iterations: Vec<IterationRecord>,
}

impl RunReport {
    /// Write the report to a MessagePack file.
    pub fn save<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, self).context("failed to serialize report")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }

    /// Read a report previously written by [`RunReport::save`].
    pub fn load<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        let report = decode::from_read(&mut reader).context("failed to deserialize report")?;
        Ok(report)
    }
}

/// The `k` cheapest records, by ascending cost (stable for ties).
pub fn cheapest(ants: &[AntRecord], k: usize) -> Vec<AntRecord> {
    let mut sorted = ants.to_vec();
    sorted.sort_by(|a, b| a.cost.total_cmp(&b.cost));
    sorted.truncate(k);
    sorted
}
