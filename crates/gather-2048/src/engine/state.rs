use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Default board edge length.
pub const DEFAULT_SIZE: usize = 4;

/// A direction to move/merge tiles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

impl Move {
    /// All four directions in the canonical Up, Down, Left, Right order.
    pub const ALL: [Move; 4] = [Move::Up, Move::Down, Move::Left, Move::Right];

    /// Row/column delta of one step in this direction.
    #[inline]
    pub fn delta(self) -> (isize, isize) {
        match self {
            Move::Up => (-1, 0),
            Move::Down => (1, 0),
            Move::Left => (0, -1),
            Move::Right => (0, 1),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Move::Up => "up",
            Move::Down => "down",
            Move::Left => "left",
            Move::Right => "right",
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts `up`/`down`/`left`/`right` and the browser key names
/// `ArrowUp` etc., case-insensitively.
impl FromStr for Move {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let name = lower.strip_prefix("arrow").unwrap_or(&lower);
        match name {
            "up" => Ok(Move::Up),
            "down" => Ok(Move::Down),
            "left" => Ok(Move::Left),
            "right" => Ok(Move::Right),
            _ => Err(EngineError::InvalidArgument(format!(
                "unknown direction {s:?}"
            ))),
        }
    }
}

/// 0=Up, 1=Down, 2=Left, 3=Right.
impl TryFrom<u8> for Move {
    type Error = EngineError;

    fn try_from(value: u8) -> Result<Self> {
        Move::ALL
            .get(value as usize)
            .copied()
            .ok_or_else(|| EngineError::InvalidArgument(format!("direction index {value}")))
    }
}

/// Stable identity of a tile. Survives slides; a merge produces a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(pub u64);

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Monotonic tile id allocator owned by a session.
#[derive(Debug, Clone, Default)]
pub struct TileIds {
    next: u64,
}

impl TileIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocator that continues past every id already on `board`.
    pub fn after(board: &Board) -> Self {
        let next = board.tiles().map(|t| t.id.0 + 1).max().unwrap_or(0);
        Self { next }
    }

    #[inline]
    pub fn next_id(&mut self) -> TileId {
        let id = TileId(self.next);
        self.next += 1;
        id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    #[inline]
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// The neighbouring cell in `dir`, or `None` when it would leave a
    /// `size`x`size` grid.
    #[inline]
    pub fn step(self, dir: Move, size: usize) -> Option<Position> {
        let (dr, dc) = dir.delta();
        let row = self.row.checked_add_signed(dr)?;
        let col = self.col.checked_add_signed(dc)?;
        (row < size && col < size).then_some(Position { row, col })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

/// A numbered cell on the board. `value` is always a power of two, at least 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub id: TileId,
    pub value: u32,
    pub position: Position,
}

/// Square grid of tiles, row-major, at most one tile per cell.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Board {
    size: usize,
    cells: Vec<Option<Tile>>,
}

impl Board {
    /// An empty `size`x`size` board.
    ///
    /// ```
    /// use gather_2048::Board;
    /// let b = Board::new(4);
    /// assert_eq!(b.count_empty(), 16);
    /// ```
    ///
    /// # Panics
    ///
    /// If `size * size` overflows `usize`. Use [`Board::try_new`] for sizes
    /// that come from outside.
    pub fn new(size: usize) -> Self {
        match Self::try_new(size) {
            Ok(board) => board,
            Err(e) => panic!("{e}"),
        }
    }

    /// An empty `size`x`size` board, or `InvalidBoard` if the cell count
    /// does not fit in `usize`.
    pub fn try_new(size: usize) -> Result<Self> {
        Ok(Board {
            size,
            cells: vec![None; cell_count(size)?],
        })
    }

    /// Build a board from rows of tile values (0 = empty). Tiles get ids
    /// `0..k` in row-major order.
    ///
    /// ```
    /// use gather_2048::{Board, Position};
    /// let b = Board::from_rows(&[[2, 2, 0, 0], [0; 4], [0; 4], [0, 0, 0, 4]]).unwrap();
    /// assert_eq!(b.get(Position::new(3, 3)).map(|t| t.value), Some(4));
    /// ```
    pub fn from_rows<R: AsRef<[u32]>>(rows: &[R]) -> Result<Self> {
        let size = rows.len();
        let mut values = Vec::with_capacity(cell_count(size)?);
        for (r, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != size {
                return Err(EngineError::InvalidBoard(format!(
                    "row {r} has {} cells, expected {size}",
                    row.len()
                )));
            }
            values.extend_from_slice(row);
        }
        Self::from_values(size, &values)
    }

    /// Build a board from row-major values (0 = empty).
    pub fn from_values(size: usize, values: &[u32]) -> Result<Self> {
        if size == 0 {
            return Err(EngineError::InvalidBoard("board size must be positive".into()));
        }
        let cells = cell_count(size)?;
        if values.len() != cells {
            return Err(EngineError::InvalidBoard(format!(
                "expected {cells} values, got {}",
                values.len()
            )));
        }
        let mut board = Board::try_new(size)?;
        let mut ids = TileIds::new();
        for (idx, &value) in values.iter().enumerate() {
            if value == 0 {
                continue;
            }
            if value < 2 || !value.is_power_of_two() {
                return Err(EngineError::InvalidBoard(format!(
                    "tile value {value} is not a power of two >= 2"
                )));
            }
            let position = Position::new(idx / size, idx % size);
            board.place(Tile {
                id: ids.next_id(),
                value,
                position,
            });
        }
        Ok(board)
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn index(&self, pos: Position) -> usize {
        debug_assert!(pos.row < self.size && pos.col < self.size);
        pos.row * self.size + pos.col
    }

    #[inline]
    pub fn get(&self, pos: Position) -> Option<&Tile> {
        if pos.row >= self.size || pos.col >= self.size {
            return None;
        }
        self.cells[self.index(pos)].as_ref()
    }

    /// Put `tile` at its own position, returning whatever was there.
    pub(crate) fn place(&mut self, tile: Tile) -> Option<Tile> {
        let idx = self.index(tile.position);
        self.cells[idx].replace(tile)
    }

    pub(crate) fn take(&mut self, pos: Position) -> Option<Tile> {
        let idx = self.index(pos);
        self.cells[idx].take()
    }

    /// Iterate over tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> + '_ {
        self.cells.iter().flatten()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles().count()
    }

    /// Empty cells in row-major order.
    pub fn empty_positions(&self) -> Vec<Position> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_none())
            .map(|(idx, _)| Position::new(idx / self.size, idx % self.size))
            .collect()
    }

    pub fn count_empty(&self) -> usize {
        self.cells.iter().filter(|c| c.is_none()).count()
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// Highest tile value on the board, 0 when empty.
    pub fn highest_tile(&self) -> u32 {
        self.tiles().map(|t| t.value).max().unwrap_or(0)
    }

    /// Row-major values, 0 for empty cells.
    pub fn values(&self) -> Vec<u32> {
        self.cells
            .iter()
            .map(|c| c.map(|t| t.value).unwrap_or(0))
            .collect()
    }

    /// True when both boards hold the same values in the same cells,
    /// ignoring tile identity.
    pub fn same_layout(&self, other: &Board) -> bool {
        self.size == other.size && self.values() == other.values()
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::new(DEFAULT_SIZE)
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({}x{}, {:?})", self.size, self.size, self.values())
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<String> = self.values().into_iter().map(format_val).collect();
        let rule = "-".repeat(self.size * 8);
        writeln!(f)?;
        for (r, row) in cells.chunks(self.size.max(1)).enumerate() {
            if r > 0 {
                writeln!(f, "{rule}")?;
            }
            writeln!(f, "{}", row.join("|"))?;
        }
        Ok(())
    }
}

fn format_val(val: u32) -> String {
    match val {
        0 => " ".repeat(7),
        x => format!("{:^7}", x),
    }
}

fn cell_count(size: usize) -> Result<usize> {
    size.checked_mul(size).ok_or_else(|| {
        EngineError::InvalidBoard(format!("board size {size} is too large"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_moves() {
        assert_eq!("up".parse::<Move>().unwrap(), Move::Up);
        assert_eq!("ArrowLeft".parse::<Move>().unwrap(), Move::Left);
        assert_eq!(" RIGHT ".parse::<Move>().unwrap(), Move::Right);
        assert!(matches!(
            "diagonal".parse::<Move>(),
            Err(EngineError::InvalidArgument(_))
        ));
        assert_eq!(Move::try_from(1).unwrap(), Move::Down);
        assert!(Move::try_from(4).is_err());
    }

    #[test]
    fn step_stays_on_grid() {
        let corner = Position::new(0, 0);
        assert_eq!(corner.step(Move::Up, 4), None);
        assert_eq!(corner.step(Move::Left, 4), None);
        assert_eq!(corner.step(Move::Right, 4), Some(Position::new(0, 1)));
        assert_eq!(Position::new(3, 3).step(Move::Down, 4), None);
    }

    #[test]
    fn from_rows_validates() {
        assert!(Board::from_rows(&[[2, 3], [0, 0]]).is_err());
        assert!(Board::from_rows(&[vec![2, 2], vec![0]]).is_err());
        assert!(Board::from_values(0, &[]).is_err());
        let b = Board::from_rows(&[[2, 0], [0, 8]]).unwrap();
        assert_eq!(b.tile_count(), 2);
        assert_eq!(b.highest_tile(), 8);
        assert_eq!(b.empty_positions(), vec![Position::new(0, 1), Position::new(1, 0)]);
        assert_eq!(TileIds::after(&b).next_id(), TileId(2));
    }

    #[test]
    fn oversized_board_is_rejected() {
        let huge = 1usize << (usize::BITS / 2);
        assert!(matches!(Board::try_new(huge), Err(EngineError::InvalidBoard(_))));
        assert!(matches!(Board::from_values(huge, &[]), Err(EngineError::InvalidBoard(_))));
        assert_eq!(Board::try_new(3).unwrap().count_empty(), 9);
    }

    #[test]
    fn display_renders_every_row() {
        let b = Board::from_rows(&[[2, 0], [0, 1024]]).unwrap();
        let text = b.to_string();
        assert!(text.contains("1024"));
        assert_eq!(text.lines().filter(|l| l.contains('|')).count(), 2);
    }
}
