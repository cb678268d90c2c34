use miette::*;

use crate::heightmap::{HeightMap, HeightMapError};
use crate::search::shortest_distance;

/// Fewest steps to the destination from any square at the lowest elevation.
#[tracing::instrument]
pub fn process(input: &str) -> Result<String> {
    let map: HeightMap = input.parse()?;

    let steps = shortest_distance(&map, map.lowest(), |square| square.is_destination)
        .ok_or(HeightMapError::Unreachable)?;

    Ok(steps.to_string())
}
