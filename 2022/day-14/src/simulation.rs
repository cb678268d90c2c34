use crate::cave::{Cave, Point, Tile};

/// Candidate moves of a falling grain, in priority order.
const FALL: [Point; 3] = [Point::new(0, 1), Point::new(-1, 1), Point::new(1, 1)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Moved(Point),
    /// Every candidate is blocked: the grain rests where it is.
    Blocked,
    /// The grain left the modelled box and keeps falling forever.
    Escaped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grain {
    Settled(Point),
    Escaped,
    /// The source itself is buried, no grain can spawn.
    Choked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The pile reached the source.
    Full,
    /// A grain fell into the void.
    Void,
}

/// Drops grains from the source of a cave it owns until the cave is full or
/// a grain escapes.
#[derive(Debug, Clone)]
pub struct Simulation {
    cave: Cave,
    settled: usize,
}

impl Simulation {
    pub fn new(cave: Cave) -> Self {
        Self { cave, settled: 0 }
    }

    pub fn cave(&self) -> &Cave {
        &self.cave
    }

    pub fn into_cave(self) -> Cave {
        self.cave
    }

    pub fn settled(&self) -> usize {
        self.settled
    }

    /// Where a grain at `position` goes next.
    pub fn fall(&self, position: Point) -> Motion {
        for delta in FALL {
            let next = position + delta;
            match self.cave.tile(next) {
                None => return Motion::Escaped,
                Some(tile) if tile.is_obstacle() => continue,
                Some(_) => return Motion::Moved(next),
            }
        }
        Motion::Blocked
    }

    /// Spawns one grain and follows it until it settles or escapes.
    pub fn drop_grain(&mut self) -> Grain {
        let source = self.cave.source();
        if self.cave.is_blocked(source) {
            return Grain::Choked;
        }

        let mut position = source;
        loop {
            match self.fall(position) {
                Motion::Moved(next) => position = next,
                Motion::Escaped => return Grain::Escaped,
                Motion::Blocked => {
                    self.cave.set(position, Tile::Sand);
                    self.settled += 1;
                    tracing::trace!(settled = self.settled, ?position, "grain settled");
                    return Grain::Settled(position);
                }
            }
        }
    }

    #[tracing::instrument(skip(self), fields(bounds = ?self.cave.bounds()))]
    pub fn run(&mut self) -> Outcome {
        loop {
            match self.drop_grain() {
                Grain::Settled(_) => {}
                Grain::Escaped => {
                    tracing::debug!(settled = self.settled, "grain fell into the void");
                    return Outcome::Void;
                }
                Grain::Choked => {
                    tracing::debug!(settled = self.settled, "pile reached the source");
                    return Outcome::Full;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::cave::{parse_paths, CaveConfig};
    use miette::Result;
    use rstest::rstest;

    const EXAMPLE: &str = "498,4 -> 498,6 -> 496,6
503,4 -> 502,4 -> 502,9 -> 494,9";

    fn simulation(scan: &str, config: CaveConfig) -> Result<Simulation> {
        let cave = Cave::build(&parse_paths(scan)?, &config)?;
        Ok(Simulation::new(cave))
    }

    #[rstest]
    #[case::example(EXAMPLE, Outcome::Void, 24)]
    #[case::gap_below_source("497,5 -> 499,5\n501,5 -> 503,5", Outcome::Void, 0)]
    #[case::ledge("499,3 -> 501,3", Outcome::Void, 1)]
    fn without_floor(
        #[case] scan: &str,
        #[case] outcome: Outcome,
        #[case] settled: usize,
    ) -> Result<()> {
        let mut sim = simulation(scan, CaveConfig::default())?;
        assert_eq!(outcome, sim.run());
        assert_eq!(settled, sim.settled());
        Ok(())
    }

    #[rstest]
    #[case::example(EXAMPLE, 93)]
    // rock far from the pile only sets the floor depth: a 3 row triangle
    #[case::lone_rock("520,1 -> 520,1", 9)]
    fn with_floor(#[case] scan: &str, #[case] settled: usize) -> Result<()> {
        let mut sim = simulation(scan, CaveConfig::default().with_floor())?;
        assert_eq!(Outcome::Full, sim.run());
        assert_eq!(settled, sim.settled());

        let cave = sim.into_cave();
        assert_eq!(settled, cave.count(Tile::Sand));
        assert_eq!(Some(Tile::Sand), cave.tile(cave.source()));
        Ok(())
    }

    #[test]
    fn first_grains_follow_the_example_trace() -> Result<()> {
        let mut sim = simulation(EXAMPLE, CaveConfig::default())?;
        assert_eq!(Grain::Settled(Point::new(500, 8)), sim.drop_grain());
        assert_eq!(Grain::Settled(Point::new(499, 8)), sim.drop_grain());
        assert_eq!(Grain::Settled(Point::new(501, 8)), sim.drop_grain());
        assert_eq!(Grain::Settled(Point::new(500, 7)), sim.drop_grain());
        assert_eq!(Grain::Settled(Point::new(498, 8)), sim.drop_grain());
        assert_eq!(5, sim.settled());
        Ok(())
    }

    #[test]
    fn fall_prefers_down_then_left_then_right() -> Result<()> {
        let cave = Cave::from_layout(
            "\
..+..
.....
##.#.
.###.
.....",
            Point::ZERO,
        )?;
        let sim = Simulation::new(cave);
        assert_eq!(Motion::Moved(Point::new(2, 1)), sim.fall(Point::new(2, 0)));
        assert_eq!(Motion::Moved(Point::new(2, 2)), sim.fall(Point::new(2, 1)));
        assert_eq!(Motion::Blocked, sim.fall(Point::new(2, 2)));
        // both diagonals are free, left wins
        assert_eq!(Motion::Moved(Point::new(2, 2)), sim.fall(Point::new(3, 1)));
        // down and down-left are rock
        assert_eq!(Motion::Moved(Point::new(2, 2)), sim.fall(Point::new(1, 1)));
        assert_eq!(Motion::Moved(Point::new(0, 4)), sim.fall(Point::new(0, 3)));
        assert_eq!(Motion::Escaped, sim.fall(Point::new(0, 4)));
        // down is rock, down-left is outside the box
        assert_eq!(Motion::Escaped, sim.fall(Point::new(0, 1)));
        Ok(())
    }

    #[test]
    fn choked_source_stops_without_settling() -> Result<()> {
        let cave = Cave::from_layout(".+.\n###", Point::new(499, 0))?;
        let mut sim = Simulation::new(cave);

        assert_eq!(Grain::Settled(Point::new(500, 0)), sim.drop_grain());
        assert_eq!(Grain::Choked, sim.drop_grain());
        assert_eq!(Outcome::Full, sim.run());
        assert_eq!(1, sim.settled());
        Ok(())
    }

    #[test]
    fn layout_round_trips_mid_simulation() -> Result<()> {
        let mut sim = simulation(EXAMPLE, CaveConfig::default())?;
        for _ in 0..10 {
            sim.drop_grain();
        }

        let cave = sim.into_cave();
        let parsed = Cave::from_layout(&cave.to_string(), cave.bounds().min)?;
        assert_eq!(cave, parsed);
        assert_eq!(10, parsed.count(Tile::Sand));

        let mut resumed = Simulation::new(parsed);
        assert_eq!(Outcome::Void, resumed.run());
        assert_eq!(14, resumed.settled());
        Ok(())
    }

    #[test]
    fn repeated_runs_agree() -> Result<()> {
        let config = CaveConfig::default().with_floor();
        let mut first = simulation(EXAMPLE, config)?;
        let mut second = simulation(EXAMPLE, config)?;
        assert_eq!(first.run(), second.run());
        assert_eq!(first.settled(), second.settled());
        assert_eq!(first.into_cave(), second.into_cave());
        Ok(())
    }
}
