use miette::{Diagnostic, SourceSpan};
use std::str::FromStr;
use thiserror::Error;

/// Elevation of `'a'`, and of the start square `'S'`.
pub const LOWEST: u8 = 0;
/// Elevation of `'z'`, and of the destination square `'E'`.
pub const HIGHEST: u8 = b'z' - b'a';

#[derive(Debug, Error, Diagnostic)]
pub enum HeightMapError {
    #[error("the height map is empty")]
    #[diagnostic(code(day12::empty))]
    Empty,

    #[error("row {row} has {found} squares, expected {expected}")]
    #[diagnostic(
        code(day12::ragged),
        help("every row of the height map must have the same width")
    )]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row {row} is blank")]
    #[diagnostic(
        code(day12::blank_row),
        help("only trailing blank lines are allowed after the height map")
    )]
    BlankRow { row: usize },

    #[error("unknown elevation code {code:?}")]
    #[diagnostic(
        code(day12::invalid_elevation),
        help("elevations are 'a' to 'z', plus 'S' for the start and 'E' for the destination")
    )]
    InvalidElevation {
        code: char,
        row: usize,
        column: usize,
        #[source_code]
        src: String,
        #[label("row {row}, column {column}")]
        span: SourceSpan,
    },

    #[error("the height map has no start square 'S'")]
    #[diagnostic(code(day12::missing_start))]
    MissingStart,

    #[error("the height map has no destination square 'E'")]
    #[diagnostic(code(day12::missing_destination))]
    MissingDestination,

    #[error("marker {marker:?} appears more than once")]
    #[diagnostic(code(day12::duplicate_marker))]
    DuplicateMarker {
        marker: char,
        #[source_code]
        src: String,
        #[label("second {marker:?}")]
        span: SourceSpan,
    },

    #[error("no path reaches the destination")]
    #[diagnostic(
        code(day12::unreachable),
        help("the destination is walled off by squares more than one unit higher")
    )]
    Unreachable,
}

/// Returns whether a square of elevation `to` can be entered from one of
/// elevation `from`: climbing is capped at one unit, descending is free.
#[inline]
pub fn can_step(from: u8, to: u8) -> bool {
    to <= from + 1
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Square {
    pub row: usize,
    pub column: usize,
    pub elevation: u8,
    pub is_start: bool,
    pub is_destination: bool,
    reachable: Vec<usize>,
}

impl Square {
    /// Indices of the orthogonal neighbours this square can step onto.
    pub fn reachable(&self) -> &[usize] {
        &self.reachable
    }
}

/// Arena of squares stored row by row, addressed by `row * width + column`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeightMap {
    width: usize,
    height: usize,
    squares: Vec<Square>,
    start: usize,
    destination: usize,
}

impl HeightMap {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.squares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.squares.is_empty()
    }

    pub fn squares(&self) -> &[Square] {
        &self.squares
    }

    pub fn square(&self, index: usize) -> &Square {
        &self.squares[index]
    }

    pub fn index_of(&self, row: usize, column: usize) -> Option<usize> {
        (row < self.height && column < self.width).then(|| row * self.width + column)
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn destination(&self) -> usize {
        self.destination
    }

    /// Every square sitting at the lowest elevation, the start included.
    pub fn lowest(&self) -> impl Iterator<Item = usize> + '_ {
        self.squares
            .iter()
            .enumerate()
            .filter(|(_, square)| square.elevation == LOWEST)
            .map(|(index, _)| index)
    }

    /// In-bounds orthogonal neighbours of `index`: up, down, left, right.
    fn orthogonal(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        let (row, column) = (index / self.width, index % self.width);
        [
            row.checked_sub(1).map(|row| (row, column)),
            (row + 1 < self.height).then_some((row + 1, column)),
            column.checked_sub(1).map(|column| (row, column)),
            (column + 1 < self.width).then_some((row, column + 1)),
        ]
        .into_iter()
        .flatten()
        .map(move |(row, column)| row * self.width + column)
    }

    /// Caches the reachable neighbours of every square. Must run once, after
    /// all squares exist.
    fn link(&mut self) {
        for index in 0..self.squares.len() {
            let from = self.squares[index].elevation;
            let reachable: Vec<usize> = self
                .orthogonal(index)
                .filter(|&neighbour| can_step(from, self.squares[neighbour].elevation))
                .collect();
            self.squares[index].reachable = reachable;
        }
    }
}

impl FromStr for HeightMap {
    type Err = HeightMapError;

    #[tracing::instrument(skip_all, fields(bytes = input.len()))]
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut squares = Vec::new();
        let mut width = None;
        let mut height = 0;
        let mut start = None;
        let mut destination = None;
        let mut offset = 0;
        let mut blank = None;

        for raw in input.split_inclusive('\n') {
            let line_offset = offset;
            offset += raw.len();

            let line = raw.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                blank.get_or_insert(height);
                continue;
            }
            if let Some(row) = blank {
                return Err(HeightMapError::BlankRow { row });
            }

            let row = height;
            let found = line.chars().count();
            let expected = *width.get_or_insert(found);
            if found != expected {
                return Err(HeightMapError::Ragged {
                    row,
                    expected,
                    found,
                });
            }

            for (column, (byte, code)) in line.char_indices().enumerate() {
                let span: SourceSpan = (line_offset + byte, code.len_utf8()).into();
                let elevation = match code {
                    'S' => LOWEST,
                    'E' => HIGHEST,
                    'a'..='z' => code as u8 - b'a',
                    _ => {
                        return Err(HeightMapError::InvalidElevation {
                            code,
                            row,
                            column,
                            src: input.to_string(),
                            span,
                        })
                    }
                };

                let index = squares.len();
                let marker = match code {
                    'S' => Some(&mut start),
                    'E' => Some(&mut destination),
                    _ => None,
                };
                if let Some(slot) = marker {
                    if slot.replace(index).is_some() {
                        return Err(HeightMapError::DuplicateMarker {
                            marker: code,
                            src: input.to_string(),
                            span,
                        });
                    }
                }

                squares.push(Square {
                    row,
                    column,
                    elevation,
                    is_start: code == 'S',
                    is_destination: code == 'E',
                    reachable: Vec::new(),
                });
            }

            height += 1;
        }

        let width = width.ok_or(HeightMapError::Empty)?;
        let start = start.ok_or(HeightMapError::MissingStart)?;
        let destination = destination.ok_or(HeightMapError::MissingDestination)?;

        let mut map = HeightMap {
            width,
            height,
            squares,
            start,
            destination,
        };
        map.link();

        tracing::debug!(width, height, "height map linked");
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    const EXAMPLE: &str = "Sabqponm
abcryxxl
accszExk
acctuvwj
abdefghi";

    #[test]
    fn parses_markers_and_elevations() -> miette::Result<()> {
        let map: HeightMap = EXAMPLE.parse()?;
        assert_eq!((8, 5), (map.width(), map.height()));

        let start = map.square(map.start());
        assert_eq!((0, 0), (start.row, start.column));
        assert_eq!(LOWEST, start.elevation);
        assert!(start.is_start);

        let destination = map.square(map.destination());
        assert_eq!((2, 5), (destination.row, destination.column));
        assert_eq!(HIGHEST, destination.elevation);
        assert!(destination.is_destination);

        assert_eq!(b'q' - b'a', map.square(3).elevation);
        Ok(())
    }

    #[test]
    fn neighbours_are_orthogonal_and_climbable() -> miette::Result<()> {
        let map: HeightMap = EXAMPLE.parse()?;
        for square in map.squares() {
            assert!(square.reachable().len() <= 4);
            for &index in square.reachable() {
                let neighbour = map.square(index);
                let distance =
                    square.row.abs_diff(neighbour.row) + square.column.abs_diff(neighbour.column);
                assert_eq!(1, distance);
                assert!(neighbour.elevation <= square.elevation + 1);
            }
        }
        Ok(())
    }

    #[test]
    fn descending_is_free_but_climbing_is_capped() -> miette::Result<()> {
        // 'a' at (0, 1) sits next to 'f' at (0, 2)
        let map: HeightMap = "Saf\nabE".parse()?;
        let low = map.index_of(0, 1).unwrap();
        let high = map.index_of(0, 2).unwrap();

        assert!(map.square(high).reachable().contains(&low));
        assert!(!map.square(low).reachable().contains(&high));

        let below = map.index_of(1, 1).unwrap();
        assert!(map.square(low).reachable().contains(&below));
        assert!(map.square(below).reachable().contains(&low));
        Ok(())
    }

    #[test]
    fn edges_do_not_wrap() -> miette::Result<()> {
        let map: HeightMap = "SE\naa".parse()?;
        let corner = map.square(map.index_of(1, 1).unwrap());
        assert_eq!(&[2], corner.reachable());
        assert_eq!(&[2], map.square(map.start()).reachable());
        assert!(map.index_of(2, 0).is_none());
        assert!(map.index_of(0, 2).is_none());
        Ok(())
    }

    #[test]
    fn tolerates_crlf_and_trailing_newline() -> miette::Result<()> {
        let map: HeightMap = "Sab\r\nabE\r\n".parse()?;
        assert_eq!((3, 2), (map.width(), map.height()));

        let map: HeightMap = "Sab\nabE\n\n\n".parse()?;
        assert_eq!((3, 2), (map.width(), map.height()));
        Ok(())
    }

    #[rstest]
    #[case::empty("", "day12::empty")]
    #[case::blank_lines("\n\n", "day12::empty")]
    #[case::ragged("Sab\nabcE", "day12::ragged")]
    #[case::blank_interior_row("Sab\n\nabE", "day12::blank_row")]
    #[case::leading_blank_row("\nSab\nabE", "day12::blank_row")]
    #[case::invalid_code("Sa#\nabE", "day12::invalid_elevation")]
    #[case::missing_start("aab\nabE", "day12::missing_start")]
    #[case::missing_destination("Sab\nabc", "day12::missing_destination")]
    #[case::duplicate_start("SaS\nabE", "day12::duplicate_marker")]
    #[case::duplicate_destination("SaE\nabE", "day12::duplicate_marker")]
    fn rejects_malformed_maps(#[case] input: &str, #[case] code: &str) {
        let err = input.parse::<HeightMap>().unwrap_err();
        assert_eq!(Some(code.to_string()), err.code().map(|c| c.to_string()));
    }

    #[test]
    fn invalid_elevation_points_at_the_offending_square() {
        let err = "Sab\na#E".parse::<HeightMap>().unwrap_err();
        let HeightMapError::InvalidElevation {
            code,
            row,
            column,
            span,
            ..
        } = &err
        else {
            panic!("unexpected error: {err:?}");
        };
        assert_eq!(('#', 1, 1), (*code, *row, *column));
        assert_eq!(5, span.offset());
        assert_eq!(1, span.len());
    }
}
