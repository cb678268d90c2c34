pub mod heightmap;
pub mod search;

pub mod part1;
pub mod part2;
