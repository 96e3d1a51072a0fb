use crate::ant::{Abort, Ant, Outcome};
use crate::config::Config;
use crate::grid::{Grid, Point, Site};
use crate::pheromone::{Edge, PheromoneField};
use crate::report::{AntRecord, IterationRecord, RunReport, cheapest};
use crate::stats::CostAccumulator;
use anyhow::{Context, Result, bail};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::Uniform;
use rayon::prelude::*;

/// Path construction parameters, fixed for a whole run.
#[derive(Debug, Clone)]
struct Walk {
    radius: f64,
    alpha: f64,
    beta: f64,
    max_step: usize,
    exclude_previous: bool,
    final_site: Site,
}

/// Ant colony optimization engine.
///
/// Every iteration each ant builds a path from the initial point to the final
/// point reading a frozen pheromone field, then the field is reinforced with
/// all the paths at once.
pub struct Colony {
    grid: Grid,
    field: PheromoneField,
    ants: Vec<Ant>,
    walk: Walk,

    n_iterations: usize,
    top_k: usize,
    seed: u64,

    best_path: Option<Vec<Point>>,
    best_cost: f64,
    iterations: Vec<IterationRecord>,
}

impl Colony {
    /// Create a new `Colony` from a configuration and a random seed.
    ///
    /// The seed drives the draw of `alpha` and `beta` (when not configured)
    /// and one independent random stream per ant.
    pub fn new(cfg: &Config, seed: u64) -> Result<Self> {
        cfg.validate().context("invalid configuration")?;

        let domain = &cfg.domain;
        let grid = Grid::new(domain.width, domain.height, domain.step)
            .context("failed to construct grid")?;

        let colony = &cfg.colony;
        let (initial_site, final_site) =
            resolve_endpoints(&grid, colony.initial_point, colony.final_point, domain.radius)
                .context("invalid configuration")?;

        let mut rng = ChaCha12Rng::seed_from_u64(seed);
        let unit_dist = Uniform::new(0.0, 1.0)?;
        let alpha = colony.alpha.unwrap_or_else(|| unit_dist.sample(&mut rng));
        let beta = colony.beta.unwrap_or_else(|| unit_dist.sample(&mut rng));

        let ants = (0..colony.n_ants)
            .map(|i_ant| {
                let mut rng = ChaCha12Rng::seed_from_u64(seed);
                rng.set_stream(i_ant as u64 + 1);
                Ant::new(colony.initial_point, initial_site, rng)
            })
            .collect();

        let pheromone = &cfg.pheromone;
        let field = PheromoneField::new(
            pheromone.initial_level,
            pheromone.evaporation_rate,
            pheromone.learning_rate,
        );

        let walk = Walk {
            radius: domain.radius,
            alpha,
            beta,
            max_step: colony.max_step,
            exclude_previous: colony.exclude_previous,
            final_site,
        };

        Ok(Self {
            grid,
            field,
            ants,
            walk,
            n_iterations: colony.n_iterations,
            top_k: cfg.output.top_k,
            seed,
            best_path: None,
            best_cost: f64::INFINITY,
            iterations: Vec::with_capacity(colony.n_iterations),
        })
    }

    /// Perform all iterations and return the resulting report.
    pub fn run(&mut self) -> RunReport {
        log::info!("grid has {} lattice points", self.grid().len());
        log::info!("alpha = {:.6}, beta = {:.6}", self.alpha(), self.beta());

        for i_iter in 0..self.n_iterations {
            self.perform_iteration();

            let progress = 100.0 * (i_iter + 1) as f64 / self.n_iterations as f64;
            log::info!("completed {progress:06.2}% (best cost {:.6})", self.best_cost());
        }

        self.report()
    }

    pub fn ants(&self) -> &[Ant] {
        &self.ants
    }

    pub fn best_path(&self) -> Option<&[Point]> {
        self.best_path.as_deref()
    }

    pub fn best_cost(&self) -> f64 {
        self.best_cost
    }

    pub fn field(&self) -> &PheromoneField {
        &self.field
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn alpha(&self) -> f64 {
        self.walk.alpha
    }

    pub fn beta(&self) -> f64 {
        self.walk.beta
    }

    /// Build the current report without running further iterations.
    pub fn report(&self) -> RunReport {
        let ants: Vec<_> = self
            .ants()
            .iter()
            .map(|ant| AntRecord {
                path: ant.path().to_vec(),
                cost: ant.cost(),
                outcome: ant.outcome(),
            })
            .collect();
        RunReport {
            seed: self.seed,
            alpha: self.alpha(),
            beta: self.beta(),
            best_path: self.best_path().map(<[Point]>::to_vec),
            best_cost: self.best_cost(),
            top_ants: cheapest(&ants, self.top_k),
            ants,
            iterations: self.iterations.clone(),
        }
    }

    fn perform_iteration(&mut self) {
        // Construction phase: the field is only borrowed immutably.
        let (grid, field, walk) = (&self.grid, &self.field, &self.walk);
        self.ants
            .par_iter_mut()
            .for_each(|ant| construct_path(ant, grid, field, walk));

        let mut cost_acc = CostAccumulator::new();
        let mut iteration_best_cost = f64::INFINITY;
        let mut n_done = 0;
        for ant in &self.ants {
            let cost = ant.cost();
            cost_acc.add(cost);
            if ant.outcome() == Outcome::Done {
                n_done += 1;
            }
            // A path that never left the start is not a candidate.
            if cost <= 0.0 {
                continue;
            }
            iteration_best_cost = iteration_best_cost.min(cost);
            if cost < self.best_cost {
                self.best_cost = cost;
                self.best_path = Some(ant.path().to_vec());
            }
        }

        // Update phase.
        self.field
            .reinforce(self.ants.iter().map(|ant| (ant.path(), ant.cost())));

        let record = IterationRecord {
            iteration: self.iterations.len(),
            iteration_best_cost,
            best_cost: self.best_cost,
            cost: cost_acc.report(),
            n_done,
            n_aborted: self.ants.len() - n_done,
            n_edges: self.field().len(),
        };
        log::debug!("{record:?}");
        self.iterations.push(record);
    }
}

fn resolve_endpoints(
    grid: &Grid,
    initial_point: Point,
    final_point: Point,
    radius: f64,
) -> Result<(Option<Site>, Site)> {
    let Some(final_site) = grid.site_of(&final_point) else {
        bail!("final point {final_point:?} is not a lattice point");
    };
    if !grid.contains(&initial_point) {
        bail!("initial point {initial_point:?} is outside the domain");
    }
    if grid.neighbors(&initial_point, radius).is_empty() {
        bail!("initial point {initial_point:?} has no lattice point within {radius}");
    }
    let initial_site = grid.site_of(&initial_point);
    if initial_site == Some(final_site) {
        bail!("initial point {initial_point:?} lies on the final point {final_point:?}");
    }
    Ok((initial_site, final_site))
}

/// Build one path from the ant's initial point.
fn construct_path(ant: &mut Ant, grid: &Grid, field: &PheromoneField, walk: &Walk) {
    ant.reset();
    let mut step = 0;

    loop {
        let current = ant.current();
        let mut candidates = grid.neighbors(&current, walk.radius);

        if walk.exclude_previous && step > 1 {
            if let Some(previous) = ant.previous() {
                let forward: Vec<_> = candidates
                    .iter()
                    .copied()
                    .filter(|&site| grid.point(site) != previous)
                    .collect();
                // Allow backtracking out of dead ends.
                if !forward.is_empty() {
                    candidates = forward;
                }
            }
        }

        if candidates.is_empty() {
            log::warn!("no candidates at {current:?} after {step} steps");
            ant.finish(Outcome::Aborted(Abort::NoCandidates));
            return;
        }

        let points: Vec<_> = candidates.iter().map(|&site| grid.point(site)).collect();
        let weights: Vec<_> = points
            .iter()
            .map(|&next| {
                let pheromone = field.level_of(&Edge::new(current, next));
                desirability(pheromone, current.distance(&next), walk.alpha, walk.beta)
            })
            .collect();
        let probs = probabilities(&weights);

        let draw: f64 = ant.rng.random();
        let i_next = sample_index(&probs, draw);
        let next = points[i_next];
        ant.advance(next, candidates[i_next], current.distance(&next));
        step += 1;

        if ant.site() == Some(walk.final_site) {
            ant.finish(Outcome::Done);
            return;
        }
        if step == walk.max_step {
            ant.finish(Outcome::Aborted(Abort::StepLimit));
            return;
        }
    }
}

/// Desirability `pheromone^beta * (1 / distance)^alpha` of a move.
pub fn desirability(pheromone: f64, distance: f64, alpha: f64, beta: f64) -> f64 {
    let visibility = 1.0 / distance;
    pheromone.powf(beta) * visibility.powf(alpha)
}

/// Normalize weights into a probability distribution.
///
/// Falls back to a uniform distribution when the weights sum to zero or to a
/// non-finite value.
pub fn probabilities(weights: &[f64]) -> Vec<f64> {
    let n = weights.len();
    let sum: f64 = weights.iter().sum();
    if !(sum.is_finite() && sum > 0.0) {
        return vec![1.0 / n as f64; n];
    }
    weights.iter().map(|w| w / sum).collect()
}

/// Inverse-CDF sampling: first index whose cumulative probability is at least
/// `draw`.
///
/// Returns the last index when rounding keeps the total below `draw`.
pub fn sample_index(probs: &[f64], draw: f64) -> usize {
    probs
        .iter()
        .scan(0.0, |cum, &prob| {
            *cum += prob;
            Some(*cum)
        })
        .position(|cum| cum >= draw)
        .unwrap_or(probs.len().saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::SQRT_2;

    fn small_config() -> Config {
        let mut cfg = Config::default();
        cfg.domain.width = 2.0;
        cfg.domain.height = 2.0;
        cfg.domain.step = 1.0;
        cfg.domain.radius = SQRT_2;
        cfg.colony.initial_point = Point::new(0.0, 0.0);
        cfg.colony.final_point = Point::new(2.0, 2.0);
        cfg.colony.n_ants = 1;
        cfg.colony.n_iterations = 1;
        cfg.output.top_k = 1;
        cfg
    }

    fn path_length(path: &[Point]) -> f64 {
        path.windows(2).map(|pair| pair[0].distance(&pair[1])).sum()
    }

    #[test]
    fn probabilities_sum_to_one() {
        let probs = probabilities(&[0.3, 1.2, 5.0, 1e-4]);
        let sum: f64 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!(probs.iter().all(|&p| p >= 0.0));
    }

    #[test]
    fn zero_weights_fall_back_to_uniform() {
        assert_eq!(probabilities(&[0.0, 0.0, 0.0, 0.0]), vec![0.25; 4]);
        assert_eq!(probabilities(&[f64::INFINITY, 1.0]), vec![0.5; 2]);
    }

    #[test]
    fn single_candidate_is_always_selected() {
        let probs = probabilities(&[0.7]);
        for draw in [0.0, 0.3, 0.999_999_9] {
            assert_eq!(sample_index(&probs, draw), 0);
        }
    }

    #[test]
    fn sample_index_uses_cumulative_probabilities() {
        let probs = [0.25, 0.25, 0.5];
        assert_eq!(sample_index(&probs, 0.1), 0);
        assert_eq!(sample_index(&probs, 0.25), 0);
        assert_eq!(sample_index(&probs, 0.3), 1);
        assert_eq!(sample_index(&probs, 0.5), 1);
        assert_eq!(sample_index(&probs, 0.75), 2);
        assert_eq!(sample_index(&[0.3, 0.3, 0.3], 0.95), 2);
    }

    #[test]
    fn equal_desirabilities_sample_uniformly() {
        let weights: Vec<_> = (0..4).map(|_| desirability(0.01, 1.0, 0.4, 0.6)).collect();
        let probs = probabilities(&weights);

        let mut rng = ChaCha12Rng::seed_from_u64(42);
        let n_draws = 40_000;
        let mut counts = [0usize; 4];
        for _ in 0..n_draws {
            counts[sample_index(&probs, rng.random())] += 1;
        }
        for count in counts {
            let freq = count as f64 / n_draws as f64;
            assert!((freq - 0.25).abs() < 0.02, "frequency {freq} is not close to 0.25");
        }
    }

    #[test]
    fn desirability_favors_pheromone_and_short_moves() {
        assert!(desirability(0.5, 1.0, 0.5, 0.5) > desirability(0.01, 1.0, 0.5, 0.5));
        assert!(desirability(0.01, 1.0, 0.5, 0.5) > desirability(0.01, SQRT_2, 0.5, 0.5));
        assert_eq!(desirability(0.01, 2.0, 0.0, 0.0), 1.0);
    }

    #[test]
    fn small_grid_cost_matches_path() {
        let mut colony = Colony::new(&small_config(), 1).unwrap();
        let report = colony.run();

        let ant = &colony.ants()[0];
        assert_eq!(ant.outcome(), Outcome::Done);
        assert_eq!(ant.path()[0], Point::new(0.0, 0.0));
        assert_eq!(*ant.path().last().unwrap(), Point::new(2.0, 2.0));
        assert!(ant.cost() >= 2.0 * SQRT_2 - 1e-12);

        let best_path = colony.best_path().unwrap();
        assert!((colony.best_cost() - path_length(best_path)).abs() < 1e-9);
        assert!(
            best_path
                .windows(2)
                .all(|pair| pair[0].distance(&pair[1]) <= SQRT_2 + 1e-9)
        );
        assert_eq!(report.best_cost, colony.best_cost());
        assert_eq!(report.top_ants.len(), 1);
    }

    #[test]
    fn paths_start_at_initial_and_done_paths_end_at_final() {
        let cfg = Config::default();
        let mut colony = Colony::new(&cfg, 3).unwrap();
        colony.run();

        for ant in colony.ants() {
            assert_eq!(ant.path()[0], cfg.colony.initial_point);
            assert!((ant.cost() - path_length(ant.path())).abs() < 1e-9);
            match ant.outcome() {
                Outcome::Done => {
                    assert_eq!(*ant.path().last().unwrap(), cfg.colony.final_point)
                }
                Outcome::Aborted(Abort::StepLimit) => {
                    assert_eq!(ant.path().len(), cfg.colony.max_step + 1)
                }
                outcome => panic!("unexpected outcome {outcome:?}"),
            }
        }
        assert!(colony.field().len() > 0);
    }

    #[test]
    fn best_cost_never_increases() {
        let mut cfg = Config::default();
        cfg.colony.n_iterations = 8;
        let mut colony = Colony::new(&cfg, 11).unwrap();
        let report = colony.run();

        assert_eq!(report.iterations.len(), 8);
        for pair in report.iterations.windows(2) {
            assert!(pair[1].best_cost <= pair[0].best_cost);
        }
        for record in &report.iterations {
            assert!(record.best_cost <= record.iteration_best_cost);
        }
        let last = report.iterations.last().unwrap();
        assert_eq!(last.best_cost, report.best_cost);
    }

    #[test]
    fn same_seed_gives_same_run() {
        let mut cfg = Config::default();
        cfg.colony.n_ants = 6;
        cfg.colony.n_iterations = 4;

        let mut colony_a = Colony::new(&cfg, 2024).unwrap();
        let mut colony_b = Colony::new(&cfg, 2024).unwrap();
        let report_a = colony_a.run();
        let report_b = colony_b.run();

        assert_eq!(report_a.alpha, report_b.alpha);
        assert_eq!(report_a.beta, report_b.beta);
        assert_eq!(report_a.ants, report_b.ants);
        assert_eq!(report_a.best_path, report_b.best_path);
        assert_eq!(report_a.best_cost, report_b.best_cost);
    }

    #[test]
    fn configured_exponents_are_used() {
        let mut cfg = Config::default();
        cfg.colony.alpha = Some(0.3);
        cfg.colony.beta = Some(0.9);
        let colony = Colony::new(&cfg, 5).unwrap();
        assert_eq!(colony.alpha(), 0.3);
        assert_eq!(colony.beta(), 0.9);

        cfg.colony.alpha = None;
        cfg.colony.beta = None;
        let colony = Colony::new(&cfg, 5).unwrap();
        assert!((0.0..1.0).contains(&colony.alpha()));
        assert!((0.0..1.0).contains(&colony.beta()));
    }

    #[test]
    fn exclude_previous_prevents_immediate_backtracking() {
        let mut cfg = Config::default();
        cfg.colony.exclude_previous = true;
        cfg.colony.n_ants = 4;
        cfg.colony.n_iterations = 2;
        let mut colony = Colony::new(&cfg, 9).unwrap();
        colony.run();

        for ant in colony.ants() {
            let path = ant.path();
            for k in 2..path.len() - 1 {
                assert_ne!(path[k + 1], path[k - 1]);
            }
        }
    }

    #[test]
    fn isolated_point_aborts_without_candidates() {
        let grid = Grid::new(2.0, 2.0, 1.0).unwrap();
        let field = PheromoneField::new(0.01, 0.1, 0.8);
        let walk = Walk {
            radius: 0.5,
            alpha: 0.5,
            beta: 0.5,
            max_step: 10,
            exclude_previous: false,
            final_site: Site { col: 2, row: 2 },
        };
        let start = Point::new(0.0, 0.0);
        let mut ant = Ant::new(
            start,
            Some(Site { col: 0, row: 0 }),
            ChaCha12Rng::seed_from_u64(0),
        );
        construct_path(&mut ant, &grid, &field, &walk);

        assert_eq!(ant.outcome(), Outcome::Aborted(Abort::NoCandidates));
        assert_eq!(ant.path(), &[start]);
        assert_eq!(ant.cost(), 0.0);
    }

    #[test]
    fn step_limit_aborts_long_walks() {
        let mut cfg = Config::default();
        cfg.colony.max_step = 3;
        cfg.colony.n_ants = 5;
        let mut colony = Colony::new(&cfg, 4).unwrap();
        let report = colony.run();

        // (0, 0) to (2, 3.5) needs at least seven moves.
        for ant in &report.ants {
            assert_eq!(ant.outcome, Outcome::Aborted(Abort::StepLimit));
            assert_eq!(ant.path.len(), 4);
        }
        assert!(report.best_cost.is_finite());
    }

    #[test]
    fn invalid_endpoints_are_rejected() {
        let mut cfg = Config::default();
        cfg.colony.final_point = Point::new(1.25, 3.5);
        let err = Colony::new(&cfg, 0).err().unwrap();
        assert!(format!("{err:#}").contains("not a lattice point"));

        let mut cfg = Config::default();
        cfg.colony.initial_point = Point::new(-3.0, 0.0);
        assert!(Colony::new(&cfg, 0).is_err());
    }

    #[test]
    fn start_on_final_site_is_rejected() {
        let mut cfg = Config::default();
        cfg.colony.initial_point = Point::new(2.0 + 1e-12, 3.5);
        let err = Colony::new(&cfg, 0).err().unwrap();
        assert!(format!("{err:#}").contains("lies on the final point"));
    }

    #[test]
    fn off_lattice_start_is_an_anchor() {
        let mut cfg = Config::default();
        cfg.colony.initial_point = Point::new(0.2, 0.3);
        cfg.colony.n_ants = 3;
        let mut colony = Colony::new(&cfg, 8).unwrap();
        colony.run();

        for ant in colony.ants() {
            assert_eq!(ant.path()[0], Point::new(0.2, 0.3));
            assert!(colony.grid().site_of(&ant.path()[1]).is_some());
        }
    }
}
