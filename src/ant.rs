use crate::grid::{Point, Site};
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

/// Reason an ant stopped before reaching the final point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Abort {
    /// The step limit was reached.
    StepLimit,
    /// The current point had no candidate to move to.
    NoCandidates,
}

/// State of an ant's path construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Building,
    Done,
    Aborted(Abort),
}

/// Path builder of the colony.
///
/// Keeps the path walked in the current iteration, its accumulated length
/// and its own random number stream.
pub struct Ant {
    initial_point: Point,
    initial_site: Option<Site>,

    path: Vec<Point>,
    cost: f64,
    site: Option<Site>,
    outcome: Outcome,

    pub(crate) rng: ChaCha12Rng,
}

impl Ant {
    pub fn new(initial_point: Point, initial_site: Option<Site>, rng: ChaCha12Rng) -> Self {
        Self {
            initial_point,
            initial_site,
            path: vec![initial_point],
            cost: 0.0,
            site: initial_site,
            outcome: Outcome::Building,
            rng,
        }
    }

    /// Return to the initial point with an empty path.
    pub fn reset(&mut self) {
        self.path.clear();
        self.path.push(self.initial_point);
        self.cost = 0.0;
        self.site = self.initial_site;
        self.outcome = Outcome::Building;
    }

    /// Move to the next point, adding `distance` to the cost.
    pub fn advance(&mut self, next: Point, site: Site, distance: f64) {
        self.path.push(next);
        self.cost += distance;
        self.site = Some(site);
    }

    pub(crate) fn finish(&mut self, outcome: Outcome) {
        self.outcome = outcome;
    }

    pub fn path(&self) -> &[Point] {
        &self.path
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Current position.
    pub fn current(&self) -> Point {
        self.path[self.path.len() - 1]
    }

    /// Lattice site of the current position (`None` on an off-lattice start).
    pub fn site(&self) -> Option<Site> {
        self.site
    }

    /// Position before the current one, if any.
    pub fn previous(&self) -> Option<Point> {
        let len = self.path.len();
        (len >= 2).then(|| self.path[len - 2])
    }
}
