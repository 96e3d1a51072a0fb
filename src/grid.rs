//! Lattice covering the rectangular planning domain.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Relative tolerance (in units of the lattice step) for lattice membership
/// and radius comparisons.
const TOL: f64 = 1e-9;

/// Largest number of lattice points along one axis.
const MAX_AXIS_LEN: f64 = 1e9;

/// Point of the plane.
///
/// Deserializes from a two-element array `[x, y]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(point: Point) -> Self {
        [point.x, point.y]
    }
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    // Adding 0.0 maps -0.0 to 0.0 so both compare and hash alike.
    fn bits(&self) -> (u64, u64) {
        ((self.x + 0.0).to_bits(), (self.y + 0.0).to_bits())
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for Point {}

impl Hash for Point {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

/// Integer index of a lattice point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Site {
    pub col: usize,
    pub row: usize,
}

/// Square lattice sampling `[0, width] x [0, height]` every `step` units.
#[derive(Debug, Clone)]
pub struct Grid {
    step: f64,
    n_cols: usize,
    n_rows: usize,
    n_sites: usize,
}

impl Grid {
    pub fn new(width: f64, height: f64, step: f64) -> Result<Self> {
        if !(step.is_finite() && step > 0.0) {
            bail!("step must be positive, but is {step}");
        }
        if !(width.is_finite() && width >= 0.0 && height.is_finite() && height >= 0.0) {
            bail!("domain must have non-negative size, but is {width} x {height}");
        }

        let n_cols = axis_len(width, step)?;
        let n_rows = axis_len(height, step)?;
        let n_sites = n_cols
            .checked_mul(n_rows)
            .with_context(|| format!("lattice of {n_cols} x {n_rows} points is too large"))?;

        Ok(Self {
            step,
            n_cols,
            n_rows,
            n_sites,
        })
    }

    /// Number of lattice points.
    pub fn len(&self) -> usize {
        self.n_sites
    }

    /// Coordinates of a lattice site.
    pub fn point(&self, site: Site) -> Point {
        Point::new(site.col as f64 * self.step, site.row as f64 * self.step)
    }

    /// Lattice site a point lies on, if any.
    pub fn site_of(&self, point: &Point) -> Option<Site> {
        let col = (point.x / self.step).round();
        let row = (point.y / self.step).round();
        if col < 0.0 || row < 0.0 {
            return None;
        }
        let site = Site {
            col: col as usize,
            row: row as usize,
        };
        if site.col >= self.n_cols || site.row >= self.n_rows {
            return None;
        }
        if self.point(site).distance(point) > TOL * self.step {
            return None;
        }
        Some(site)
    }

    /// Whether a point lies inside the sampled domain.
    pub fn contains(&self, point: &Point) -> bool {
        let x_max = (self.n_cols - 1) as f64 * self.step;
        let y_max = (self.n_rows - 1) as f64 * self.step;
        let tol = TOL * self.step;
        (-tol..=x_max + tol).contains(&point.x) && (-tol..=y_max + tol).contains(&point.y)
    }

    /// All lattice sites `q` with `0 < |point - q| <= radius`, in row-major order.
    pub fn neighbors(&self, point: &Point, radius: f64) -> Vec<Site> {
        let mut sites = Vec::new();
        let (Some(cols), Some(rows)) = (
            index_window(point.x, radius, self.step, self.n_cols),
            index_window(point.y, radius, self.step, self.n_rows),
        ) else {
            return sites;
        };

        let max_dist = radius + TOL * self.step;
        for row in rows {
            for col in cols.clone() {
                let site = Site { col, row };
                let dist = point.distance(&self.point(site));
                if dist > 0.0 && dist <= max_dist {
                    sites.push(site);
                }
            }
        }
        sites
    }
}

/// Number of lattice points sampling `[0, size]` every `step` units.
fn axis_len(size: f64, step: f64) -> Result<usize> {
    let n_steps = (size / step + TOL).floor();
    if n_steps >= MAX_AXIS_LEN {
        bail!("{size} / {step} exceeds {MAX_AXIS_LEN} lattice points");
    }
    Ok(n_steps as usize + 1)
}

/// Range of lattice indices along one axis within `radius` of `coord`.
fn index_window(
    coord: f64,
    radius: f64,
    step: f64,
    n_idx: usize,
) -> Option<std::ops::RangeInclusive<usize>> {
    let lo = ((coord - radius) / step - TOL).ceil().max(0.0);
    let hi = ((coord + radius) / step + TOL).floor();
    if hi < 0.0 || lo > hi {
        return None;
    }
    let hi = (hi as usize).min(n_idx - 1);
    let lo = lo as usize;
    if lo > hi {
        return None;
    }
    Some(lo..=hi)
}
