//! Pheromone levels on directed grid edges.

use crate::grid::Point;
use std::collections::HashMap;

/// Directed edge between two points.
///
/// `(a, b)` and `(b, a)` are distinct edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: Point,
    pub to: Point,
}

impl Edge {
    pub fn new(from: Point, to: Point) -> Self {
        Self { from, to }
    }
}

/// Sparse pheromone field.
///
/// Edges that were never reinforced read as `default_level`. The field is
/// only mutated through [`PheromoneField::reinforce`], which requires
/// exclusive access: ants read a frozen field while building their paths and
/// the whole update is committed at once afterwards.
#[derive(Debug, Clone)]
pub struct PheromoneField {
    levels: HashMap<Edge, f64>,
    default_level: f64,
    evaporation_rate: f64,
    learning_rate: f64,
}

impl PheromoneField {
    pub fn new(default_level: f64, evaporation_rate: f64, learning_rate: f64) -> Self {
        Self {
            levels: HashMap::new(),
            default_level,
            evaporation_rate,
            learning_rate,
        }
    }

    /// Pheromone level of an edge.
    pub fn level_of(&self, edge: &Edge) -> f64 {
        self.levels
            .get(edge)
            .copied()
            .unwrap_or(self.default_level)
    }

    /// Number of edges holding an explicit level.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Evaporate every known edge and deposit pheromone along the given paths.
    ///
    /// Each `(path, cost)` adds `learning_rate / cost` to every edge it
    /// traverses, once per traversal. Paths with a non-positive or non-finite
    /// cost deposit nothing. Edges first traversed in this update enter the
    /// field starting from the evaporated default level.
    pub fn reinforce<'a, I>(&mut self, trails: I)
    where
        I: IntoIterator<Item = (&'a [Point], f64)>,
    {
        let mut deposits: HashMap<Edge, f64> = HashMap::new();
        for (path, cost) in trails {
            if !(cost.is_finite() && cost > 0.0) {
                continue;
            }
            let amount = self.learning_rate / cost;
            for pair in path.windows(2) {
                *deposits.entry(Edge::new(pair[0], pair[1])).or_insert(0.0) += amount;
            }
        }

        let keep = 1.0 - self.evaporation_rate;
        let mut levels: HashMap<Edge, f64> = self
            .levels
            .iter()
            .map(|(&edge, &old)| (edge, keep * old))
            .collect();
        for (edge, amount) in deposits {
            *levels.entry(edge).or_insert(keep * self.default_level) += amount;
        }

        self.levels = levels;
    }
}
