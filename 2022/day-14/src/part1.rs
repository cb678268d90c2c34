use miette::*;

use crate::cave::{parse_paths, Cave, CaveConfig};
use crate::simulation::Simulation;

/// Grains that come to rest before the first one falls into the void.
#[tracing::instrument]
pub fn process(input: &str) -> Result<String> {
    let paths = parse_paths(input)?;
    let cave = Cave::build(&paths, &CaveConfig::default())?;

    let mut simulation = Simulation::new(cave);
    simulation.run();

    Ok(simulation.settled().to_string())
}
