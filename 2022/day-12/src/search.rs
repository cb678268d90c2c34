use bitvec::prelude::*;
use std::collections::VecDeque;

use crate::heightmap::{HeightMap, Square};

/// A square waiting in the frontier, `depth` edges away from its seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontierEntry {
    pub square: usize,
    pub depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The dequeued square had already been visited.
    Skipped,
    /// The square was visited and its unvisited neighbours were enqueued.
    Expanded(FrontierEntry),
    Reached(FrontierEntry),
    /// The frontier ran dry without reaching a goal.
    Exhausted,
}

/// Breadth-first search over the cached adjacency of a [`HeightMap`].
///
/// Squares may be enqueued more than once; only their first dequeue counts.
/// Every edge costs one step, so the first goal dequeued is the closest one
/// to any of the seeds.
pub struct PathFinder<'a, G> {
    map: &'a HeightMap,
    is_goal: G,
    queue: VecDeque<FrontierEntry>,
    visited: BitVec,
}

impl<'a, G> PathFinder<'a, G>
where
    G: Fn(&Square) -> bool,
{
    /// Seeds that do not index a square of `map` are ignored.
    pub fn new(map: &'a HeightMap, seeds: impl IntoIterator<Item = usize>, is_goal: G) -> Self {
        let queue = seeds
            .into_iter()
            .filter(|&square| square < map.len())
            .map(|square| FrontierEntry { square, depth: 0 })
            .collect();

        Self {
            map,
            is_goal,
            queue,
            visited: bitvec![0; map.len()],
        }
    }

    pub fn step(&mut self) -> Step {
        let Some(current) = self.queue.pop_front() else {
            return Step::Exhausted;
        };

        if self.visited[current.square] {
            return Step::Skipped;
        }
        self.visited.set(current.square, true);

        let square = self.map.square(current.square);
        if (self.is_goal)(square) {
            return Step::Reached(current);
        }

        for &next in square.reachable() {
            if !self.visited[next] {
                self.queue.push_back(FrontierEntry {
                    square: next,
                    depth: current.depth + 1,
                });
            }
        }

        Step::Expanded(current)
    }

    /// Steps until a goal is reached or the frontier is exhausted.
    pub fn run(mut self) -> Option<FrontierEntry> {
        loop {
            match self.step() {
                Step::Reached(entry) => {
                    tracing::debug!(square = entry.square, depth = entry.depth, "goal reached");
                    return Some(entry);
                }
                Step::Exhausted => {
                    tracing::debug!(visited = self.visited.count_ones(), "frontier exhausted");
                    return None;
                }
                Step::Skipped | Step::Expanded(_) => {}
            }
        }
    }
}

/// Fewest steps from any seed to a square satisfying `is_goal`, or `None`
/// when no goal can be reached.
#[tracing::instrument(skip_all)]
pub fn shortest_distance<G>(
    map: &HeightMap,
    seeds: impl IntoIterator<Item = usize>,
    is_goal: G,
) -> Option<usize>
where
    G: Fn(&Square) -> bool,
{
    PathFinder::new(map, seeds, is_goal)
        .run()
        .map(|entry| entry.depth)
}
