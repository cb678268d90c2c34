use chumsky::prelude::*;
use glam::{I64Vec2, IVec2};
use itertools::Itertools;
use miette::{Diagnostic, SourceSpan};
use std::fmt;
use thiserror::Error;

/// World coordinates grow rightwards in `x` and downwards in `y`.
pub type Point = IVec2;

/// Rows between the lowest rock and the floor.
pub const FLOOR_OFFSET: i32 = 2;

/// Largest number of tiles a cave may materialise.
pub const MAX_TILES: u64 = 1 << 26;

#[derive(Debug, Error, Diagnostic)]
pub enum CaveError {
    #[error("malformed rock scan: {reason}")]
    #[diagnostic(code(day14::parse))]
    Parse {
        reason: String,
        #[source_code]
        src: String,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("rock segment {from} -> {to} is diagonal")]
    #[diagnostic(
        code(day14::diagonal),
        help("consecutive points of a path must share a row or a column")
    )]
    Diagonal { from: Point, to: Point },

    #[error("cave spanning {min} to {max} is too large to materialise")]
    #[diagnostic(
        code(day14::too_large),
        help("coordinates must fit in an i32 and the padded box must stay within MAX_TILES tiles")
    )]
    TooLarge { min: I64Vec2, max: I64Vec2 },

    #[error("the scan describes no rock")]
    #[diagnostic(
        code(day14::empty_scan),
        help("at least one path is needed to compute the bounding box")
    )]
    EmptyScan,

    #[error("layout has no sand source '+'")]
    #[diagnostic(code(day14::missing_source))]
    MissingSource,

    #[error("layout has more than one sand source")]
    #[diagnostic(code(day14::duplicate_source))]
    DuplicateSource { second: Point },

    #[error("unknown tile {symbol:?} at {at}")]
    #[diagnostic(code(day14::unknown_tile))]
    UnknownTile { symbol: char, at: Point },

    #[error("layout row {row} is blank")]
    #[diagnostic(code(day14::blank_row))]
    BlankRow { row: usize },

    #[error("layout row {row} is {found} tiles wide, expected {expected}")]
    #[diagnostic(code(day14::ragged))]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Tile {
    #[default]
    Air,
    Rock,
    Sand,
    Source,
}

impl Tile {
    pub fn is_obstacle(self) -> bool {
        matches!(self, Tile::Rock | Tile::Sand)
    }

    pub fn symbol(self) -> char {
        match self {
            Tile::Air => '.',
            Tile::Rock => '#',
            Tile::Sand => 'o',
            Tile::Source => '+',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '.' => Some(Tile::Air),
            '#' => Some(Tile::Rock),
            'o' | 'O' => Some(Tile::Sand),
            '+' => Some(Tile::Source),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Floor {
    /// Grains falling past the lowest rock are lost.
    #[default]
    Void,
    /// An endless rock floor [`FLOOR_OFFSET`] rows below the lowest rock.
    Solid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaveConfig {
    pub source: Point,
    /// Columns of air added on both sides of the scanned rock.
    pub margin: u32,
    pub floor: Floor,
}

impl Default for CaveConfig {
    fn default() -> Self {
        Self {
            source: Point::new(500, 0),
            margin: 2,
            floor: Floor::Void,
        }
    }
}

impl CaveConfig {
    pub fn with_floor(self) -> Self {
        Self {
            floor: Floor::Solid,
            ..self
        }
    }

    pub fn with_margin(self, margin: u32) -> Self {
        Self { margin, ..self }
    }
}

/// One line of the scan: a polyline of axis aligned rock segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RockPath {
    pub points: Vec<Point>,
}

impl RockPath {
    /// Every rock coordinate covered by the path, endpoints included.
    pub fn cells(&self) -> Result<Vec<Point>, CaveError> {
        let Some(&first) = self.points.first() else {
            return Ok(Vec::new());
        };

        let mut cells = vec![first];
        for (&from, &to) in self.points.iter().tuple_windows() {
            let delta = to - from;
            if delta.x != 0 && delta.y != 0 {
                return Err(CaveError::Diagonal { from, to });
            }

            let step = delta.signum();
            let length = delta.abs().max_element();
            cells.extend((1..=length).map(|i| from + step * i));
        }
        Ok(cells)
    }
}

fn parser<'a>() -> impl Parser<'a, &'a str, Vec<RockPath>, extra::Err<Rich<'a, char>>> {
    let coord = text::int(10).try_map(|digits: &str, span| {
        digits
            .parse::<i32>()
            .map_err(|e| Rich::custom(span, format!("coordinate {digits}: {e}")))
    });

    let point = coord
        .clone()
        .then_ignore(just(','))
        .then(coord)
        .map(|(x, y)| Point::new(x, y));

    let blank = just(' ').repeated();

    let path = point
        .separated_by(just("->").padded_by(blank.clone()))
        .at_least(1)
        .collect::<Vec<_>>()
        .then_ignore(blank.clone())
        .map(|points| RockPath { points });

    // blank lines between and after paths are allowed
    let separator = text::newline().then_ignore(blank).repeated().at_least(1);

    path.separated_by(separator)
        .allow_trailing()
        .collect::<Vec<_>>()
        .padded()
}

/// Parses the rock scan, one `x,y -> x,y -> ...` path per line.
pub fn parse_paths(input: &str) -> Result<Vec<RockPath>, CaveError> {
    parser().parse(input).into_result().map_err(|errors| {
        let (reason, span): (String, SourceSpan) = errors
            .first()
            .map(|e| (e.to_string(), (e.span().start..e.span().end).into()))
            .unwrap_or_else(|| ("unknown error".to_string(), (0, 0).into()));
        CaveError::Parse {
            reason,
            src: input.to_string(),
            span,
        }
    })
}

/// Inclusive rectangle of world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    pub fn covering(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        points.into_iter().fold(None, |bounds, point| {
            Some(match bounds {
                None => Bounds {
                    min: point,
                    max: point,
                },
                Some(Bounds { min, max }) => Bounds {
                    min: min.min(point),
                    max: max.max(point),
                },
            })
        })
    }

    /// Narrows a wide box back to `i32` coordinates, provided it fits and
    /// holds at most [`MAX_TILES`] tiles.
    pub fn fit(min: I64Vec2, max: I64Vec2) -> Option<Self> {
        if !min.cmple(max).all() {
            return None;
        }
        let size = (max - min + I64Vec2::ONE).as_u64vec2();
        if size.x.checked_mul(size.y)? > MAX_TILES {
            return None;
        }

        let narrow =
            |v: I64Vec2| Some(Point::new(i32::try_from(v.x).ok()?, i32::try_from(v.y).ok()?));

        Some(Bounds {
            min: narrow(min)?,
            max: narrow(max)?,
        })
    }

    pub fn contains(&self, point: Point) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    pub fn width(&self) -> usize {
        (self.max.x - self.min.x + 1) as usize
    }

    pub fn height(&self) -> usize {
        (self.max.y - self.min.y + 1) as usize
    }
}

/// The slice of the cave that can hold sand, materialised as a flat grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cave {
    bounds: Bounds,
    tiles: Vec<Tile>,
    source: Point,
}

impl Cave {
    /// Materialises the bounding box of `paths` and the source, padded by
    /// the configured margin. With a solid floor the box reaches down to the
    /// floor and is wide enough for the pile that can form on it.
    #[tracing::instrument(skip(paths), fields(path_count = paths.len()))]
    pub fn build(paths: &[RockPath], config: &CaveConfig) -> Result<Self, CaveError> {
        let endpoints = paths.iter().flat_map(|path| path.points.iter().copied());
        let scanned = Bounds::covering(endpoints).ok_or(CaveError::EmptyScan)?;
        let covered = Bounds::covering([scanned.min, scanned.max, config.source])
            .ok_or(CaveError::EmptyScan)?;

        // padding is computed wide so that coordinates near the i32 limit
        // are rejected rather than wrapped
        let mut min = covered.min.as_i64vec2();
        let mut max = covered.max.as_i64vec2();
        let margin = i64::from(config.margin);
        min.x -= margin;
        max.x += margin;

        if config.floor == Floor::Solid {
            let source = config.source.as_i64vec2();
            let floor = i64::from(scanned.max.y) + i64::from(FLOOR_OFFSET);
            // the pile is a triangle with its apex on the source
            let spread = floor - source.y;
            min.x = min.x.min(source.x - spread - 1);
            max.x = max.x.max(source.x + spread + 1);
            max.y = floor;
        }

        let bounds = Bounds::fit(min, max).ok_or(CaveError::TooLarge { min, max })?;
        let mut cave = Cave {
            bounds,
            tiles: vec![Tile::Air; bounds.width() * bounds.height()],
            source: config.source,
        };

        for path in paths {
            for rock in path.cells()? {
                cave.set(rock, Tile::Rock);
            }
        }
        let floor = (config.floor == Floor::Solid).then_some(bounds.max.y);
        if let Some(floor) = floor {
            for x in bounds.min.x..=bounds.max.x {
                cave.set(Point::new(x, floor), Tile::Rock);
            }
        }
        cave.set(config.source, Tile::Source);

        tracing::debug!(?bounds, ?floor, "cave materialised");
        Ok(cave)
    }

    /// Parses a rendered layout whose top-left tile sits at `origin`.
    pub fn from_layout(layout: &str, origin: Point) -> Result<Self, CaveError> {
        let mut tiles = Vec::new();
        let mut width = None;
        let mut source = None;
        let mut height = 0;
        let mut blank = None;

        for line in layout.lines() {
            if line.is_empty() {
                blank.get_or_insert(height);
                continue;
            }
            if let Some(row) = blank {
                return Err(CaveError::BlankRow { row });
            }

            let row = height;
            let found = line.chars().count();
            let expected = *width.get_or_insert(found);
            if found != expected {
                return Err(CaveError::Ragged {
                    row,
                    expected,
                    found,
                });
            }

            for (column, symbol) in line.chars().enumerate() {
                let at = origin + Point::new(column as i32, row as i32);
                let tile = Tile::from_symbol(symbol).ok_or(CaveError::UnknownTile { symbol, at })?;
                if tile == Tile::Source && source.replace(at).is_some() {
                    return Err(CaveError::DuplicateSource { second: at });
                }
                tiles.push(tile);
            }
            height += 1;
        }

        let source = source.ok_or(CaveError::MissingSource)?;
        let width = width.unwrap_or_default() as i32;
        Ok(Cave {
            bounds: Bounds {
                min: origin,
                max: origin + Point::new(width - 1, height as i32 - 1),
            },
            tiles,
            source,
        })
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn source(&self) -> Point {
        self.source
    }

    fn index(&self, point: Point) -> Option<usize> {
        if !self.bounds.contains(point) {
            return None;
        }
        let offset = point - self.bounds.min;
        Some(offset.y as usize * self.bounds.width() + offset.x as usize)
    }

    /// `None` outside the modelled box.
    pub fn tile(&self, point: Point) -> Option<Tile> {
        self.index(point).map(|index| self.tiles[index])
    }

    pub fn is_blocked(&self, point: Point) -> bool {
        self.tile(point).is_some_and(Tile::is_obstacle)
    }

    /// Overwrites the tile at `point`; points outside the box are ignored.
    pub(crate) fn set(&mut self, point: Point, tile: Tile) {
        if let Some(index) = self.index(point) {
            self.tiles[index] = tile;
        }
    }

    pub fn count(&self, tile: Tile) -> usize {
        self.tiles.iter().filter(|&&t| t == tile).count()
    }
}

impl fmt::Display for Cave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.tiles.chunks(self.bounds.width()) {
            let line: String = row.iter().map(|tile| tile.symbol()).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
