pub mod cave;
pub mod simulation;

pub mod part1;
pub mod part2;
