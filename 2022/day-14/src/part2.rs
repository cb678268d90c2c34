use miette::*;

use crate::cave::{parse_paths, Cave, CaveConfig};
use crate::simulation::{Outcome, Simulation};

/// Grains that come to rest on the floor until the source is buried.
#[tracing::instrument]
pub fn process(input: &str) -> Result<String> {
    let paths = parse_paths(input)?;
    let cave = Cave::build(&paths, &CaveConfig::default().with_floor())?;

    let mut simulation = Simulation::new(cave);
    if simulation.run() != Outcome::Full {
        bail!("sand escaped past the edge of the floor");
    }

    Ok(simulation.settled().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_works() -> Result<()> {
        let input = "498,4 -> 498,6 -> 496,6
503,4 -> 502,4 -> 502,9 -> 494,9
";
        assert_eq!("93", process(input)?);
        Ok(())
    }
}
