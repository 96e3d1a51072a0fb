use crate::grid::Point;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Planning domain parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DomainConfig {
    /// Width of the domain.
    pub width: f64,
    /// Height of the domain.
    pub height: f64,
    /// Lattice spacing.
    pub step: f64,
    /// Maximum distance between consecutive path points.
    pub radius: f64,
}

/// Colony parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColonyConfig {
    /// Start of every path.
    pub initial_point: Point,
    /// Target of every path (must be a lattice point).
    pub final_point: Point,

    /// Number of ants per iteration.
    pub n_ants: usize,
    /// Number of iterations.
    pub n_iterations: usize,
    /// Maximum number of moves per path.
    pub max_step: usize,

    /// Exclude the preceding point from the candidates.
    #[serde(default)]
    pub exclude_previous: bool,

    /// Exponent on visibility (drawn in `[0, 1)` if absent).
    pub alpha: Option<f64>,
    /// Exponent on pheromone (drawn in `[0, 1)` if absent).
    pub beta: Option<f64>,

    /// Random seed (drawn from the OS if absent).
    pub seed: Option<u64>,
}

/// Pheromone field parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PheromoneConfig {
    /// Level of edges never reinforced.
    pub initial_level: f64,
    /// Fraction of pheromone lost every iteration.
    pub evaporation_rate: f64,
    /// Numerator of the deposit `learning_rate / cost`.
    pub learning_rate: f64,
}

/// Output parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Number of cheapest ants kept in the report.
    pub top_k: usize,
}

/// Path planning configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub domain: DomainConfig,
    pub colony: ColonyConfig,
    pub pheromone: PheromoneConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&contents)
    }

    /// Parse and validate a [`Config`] from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let domain = &self.domain;
        check_num(domain.width, 0.0..1e6).context("invalid domain width")?;
        check_num(domain.height, 0.0..1e6).context("invalid domain height")?;
        if domain.width <= 0.0 || domain.height <= 0.0 {
            bail!("domain must have positive size");
        }
        check_num(domain.step, f64::EPSILON..=domain.width.min(domain.height))
            .context("invalid lattice step")?;
        check_num(domain.width / domain.step, 0.0..=1e6)
            .context("invalid number of lattice columns")?;
        check_num(domain.height / domain.step, 0.0..=1e6)
            .context("invalid number of lattice rows")?;
        check_num(domain.radius, domain.step..=domain.width.max(domain.height))
            .context("invalid neighbor radius")?;

        let colony = &self.colony;
        check_point(&colony.initial_point).context("invalid initial point")?;
        check_point(&colony.final_point).context("invalid final point")?;
        if colony.initial_point == colony.final_point {
            bail!("initial and final points must differ");
        }
        check_num(colony.n_ants, 1..100_000).context("invalid number of ants")?;
        check_num(colony.n_iterations, 1..100_000).context("invalid number of iterations")?;
        check_num(colony.max_step, 1..1_000_000).context("invalid maximum number of steps")?;
        if let Some(alpha) = colony.alpha {
            check_num(alpha, 0.0..=10.0).context("invalid alpha")?;
        }
        if let Some(beta) = colony.beta {
            check_num(beta, 0.0..=10.0).context("invalid beta")?;
        }

        let pheromone = &self.pheromone;
        check_num(pheromone.initial_level, f64::MIN_POSITIVE..1e6)
            .context("invalid initial pheromone level")?;
        check_num(pheromone.evaporation_rate, 0.0..=1.0).context("invalid evaporation rate")?;
        check_num(pheromone.learning_rate, 0.0..1e6).context("invalid learning rate")?;

        check_num(self.output.top_k, 0..=colony.n_ants).context("invalid top_k")?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            domain: DomainConfig {
                width: 2.0,
                height: 4.0,
                step: 0.5,
                radius: 0.8,
            },
            colony: ColonyConfig {
                initial_point: Point::new(0.0, 0.0),
                final_point: Point::new(2.0, 3.5),
                n_ants: 25,
                n_iterations: 10,
                max_step: 250,
                exclude_previous: false,
                alpha: None,
                beta: None,
                seed: None,
            },
            pheromone: PheromoneConfig {
                initial_level: 0.01,
                evaporation_rate: 0.1,
                learning_rate: 0.8,
            },
            output: OutputConfig { top_k: 3 },
        }
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_point(point: &Point) -> Result<()> {
    if !point.is_finite() {
        bail!("point must have finite coordinates, but is {point:?}");
    }
    Ok(())
}
