use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::{Board, Move, Position, Tile, TileId, TileIds};

/// What happened to a tile during one move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TileEvent {
    /// Tile `id` slid from `from` to `to` without merging.
    Moved {
        id: TileId,
        from: Position,
        to: Position,
    },
    /// The tile starting at `from` slid into the tile at `at`; both were
    /// replaced by a new tile `id` carrying `value`.
    Merged {
        id: TileId,
        sources: [TileId; 2],
        from: Position,
        at: Position,
        value: u32,
    },
}

/// Result of sliding a board in one direction, before any spawn.
#[derive(Debug, Clone)]
pub struct Slide {
    pub board: Board,
    pub events: Vec<TileEvent>,
    pub score_gained: u64,
    pub merges: usize,
    /// Highest value produced by a merge in this slide, 0 if none.
    pub max_merged: u32,
}

impl Slide {
    /// A slide changed the board when any tile moved or merged.
    #[inline]
    pub fn changed(&self) -> bool {
        !self.events.is_empty()
    }
}

/// Slide/merge tiles in `dir`. No randomness.
///
/// Tiles nearest the target edge are resolved first. Each tile advances one
/// cell at a time until it hits the edge, a tile it cannot merge with, or a
/// tile of equal value that has not merged yet this move, in which case the
/// two become one new tile that is frozen for the rest of the move.
pub fn slide(board: &Board, dir: Move, ids: &mut TileIds) -> Slide {
    let size = board.size();
    let mut next = board.clone();
    let mut merged = vec![false; size * size];
    let mut events = Vec::new();
    let mut score_gained = 0u64;
    let mut merges = 0usize;
    let mut max_merged = 0u32;

    for start in traversal_order(size, dir) {
        let Some(tile) = next.take(start) else {
            continue;
        };
        let mut cur = start;
        let mut consumed = false;
        while let Some(ahead) = cur.step(dir, size) {
            match next.get(ahead).copied() {
                None => cur = ahead,
                Some(target)
                    if target.value == tile.value && !merged[ahead.row * size + ahead.col] =>
                {
                    let Some(value) = merged_value(tile.value) else {
                        break;
                    };
                    let id = ids.next_id();
                    next.place(Tile {
                        id,
                        value,
                        position: ahead,
                    });
                    merged[ahead.row * size + ahead.col] = true;
                    events.push(TileEvent::Merged {
                        id,
                        sources: [tile.id, target.id],
                        from: start,
                        at: ahead,
                        value,
                    });
                    score_gained += u64::from(value);
                    merges += 1;
                    max_merged = max_merged.max(value);
                    consumed = true;
                    break;
                }
                Some(_) => break,
            }
        }
        if consumed {
            continue;
        }
        next.place(Tile {
            position: cur,
            ..tile
        });
        if cur != start {
            events.push(TileEvent::Moved {
                id: tile.id,
                from: start,
                to: cur,
            });
        }
    }

    Slide {
        board: next,
        events,
        score_gained,
        merges,
        max_merged,
    }
}

/// Doubled value of a merging pair; `None` at the top of the `u32` range,
/// where the pair stays unmerged.
fn merged_value(value: u32) -> Option<u32> {
    value.checked_mul(2)
}

fn can_merge(value: u32) -> bool {
    merged_value(value).is_some()
}

/// Like [`slide`] but with a throwaway id allocator, for look-ahead.
pub fn preview(board: &Board, dir: Move) -> Slide {
    let mut scratch = TileIds::after(board);
    slide(board, dir, &mut scratch)
}

/// Cells ordered nearest-to-edge first for a move in `dir`.
fn traversal_order(size: usize, dir: Move) -> Vec<Position> {
    let mut order: Vec<Position> = (0..size)
        .flat_map(|row| (0..size).map(move |col| Position::new(row, col)))
        .collect();
    order.sort_by_key(|p| match dir {
        Move::Up => p.row,
        Move::Down => size - 1 - p.row,
        Move::Left => p.col,
        Move::Right => size - 1 - p.col,
    });
    order
}

/// True if the board is full and no two orthogonally adjacent tiles match.
pub fn is_game_over(board: &Board) -> bool {
    if !board.is_full() {
        return false;
    }
    let size = board.size();
    for tile in board.tiles() {
        for dir in [Move::Right, Move::Down] {
            let neighbour = tile
                .position
                .step(dir, size)
                .and_then(|p| board.get(p));
            if neighbour.is_some_and(|n| n.value == tile.value && can_merge(tile.value)) {
                return false;
            }
        }
    }
    true
}

/// Directions that would change the board, in Up, Down, Left, Right order.
pub fn legal_moves(board: &Board) -> Vec<Move> {
    Move::ALL
        .into_iter()
        .filter(|&dir| preview(board, dir).changed())
        .collect()
}

/// Insert a 2 (90%) or 4 (10%) tile into a uniformly chosen empty cell.
/// Does nothing and returns `None` on a full board.
pub fn spawn_random_tile<R: Rng + ?Sized>(
    board: &mut Board,
    rng: &mut R,
    ids: &mut TileIds,
) -> Option<Tile> {
    let empty = board.empty_positions();
    if empty.is_empty() {
        return None;
    }
    let position = empty[rng.gen_range(0..empty.len())];
    let tile = Tile {
        id: ids.next_id(),
        value: generate_tile_value(rng),
        position,
    };
    board.place(tile);
    Some(tile)
}

pub(crate) fn generate_tile_value<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    if rng.gen_range(0..10) < 9 {
        2
    } else {
        4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn board(rows: &[[u32; 4]]) -> Board {
        Board::from_rows(rows).unwrap()
    }

    fn shifted(rows: &[[u32; 4]], dir: Move) -> Vec<u32> {
        preview(&board(rows), dir).board.values()
    }

    #[test]
    fn pair_merges_left() {
        let b = board(&[[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let mut ids = TileIds::after(&b);
        let s = slide(&b, Move::Left, &mut ids);
        assert!(s.changed());
        assert_eq!(s.score_gained, 4);
        assert_eq!(s.merges, 1);
        assert_eq!(s.board.get(Position::new(0, 0)).map(|t| t.value), Some(4));
        assert_eq!(s.board.tile_count(), 1);
    }

    #[test]
    fn topmost_pair_does_not_merge() {
        let top = 1u32 << 31;
        let b = board(&[[top, top, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let s = preview(&b, Move::Left);
        assert!(!s.changed());
        assert_eq!(s.score_gained, 0);
        assert_eq!(s.board.values()[..2], [top, top]);

        let moved = preview(&b, Move::Right);
        assert_eq!(moved.merges, 0);
        assert_eq!(moved.board.values()[2..4], [top, top]);

        let full = Board::from_values(2, &[top, top, 2, 4]).unwrap();
        assert!(is_game_over(&full));
    }

    #[test]
    fn blocked_tile_does_not_move() {
        let b = board(&[[2, 4, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let s = preview(&b, Move::Left);
        assert!(!s.changed());
        assert_eq!(s.score_gained, 0);
        assert!(s.board.same_layout(&b));
    }

    #[test]
    fn three_in_a_row_merges_nearest_pair_only() {
        let s = preview(&board(&[[2, 2, 2, 0], [0; 4], [0; 4], [0; 4]]), Move::Left);
        assert_eq!(&s.board.values()[..4], &[4, 2, 0, 0]);
        assert_eq!(s.score_gained, 4);
        assert_eq!(s.merges, 1);

        let s = preview(&board(&[[2, 2, 2, 0], [0; 4], [0; 4], [0; 4]]), Move::Right);
        assert_eq!(&s.board.values()[..4], &[0, 0, 2, 4]);
    }

    #[test]
    fn merged_tile_never_merges_again() {
        assert_eq!(
            &shifted(&[[2, 2, 2, 2], [0; 4], [0; 4], [0; 4]], Move::Left)[..4],
            &[4, 4, 0, 0]
        );
        assert_eq!(
            &shifted(&[[4, 2, 2, 0], [0; 4], [0; 4], [0; 4]], Move::Left)[..4],
            &[4, 4, 0, 0]
        );
        assert_eq!(
            &shifted(&[[0, 4, 2, 2], [0; 4], [0; 4], [0; 4]], Move::Right)[..4],
            &[0, 0, 4, 4]
        );
    }

    #[test]
    fn slides_in_all_directions() {
        let rows = [[2, 0, 0, 2], [0, 4, 0, 0], [0, 4, 0, 8], [2, 0, 0, 8]];
        assert_eq!(
            shifted(&rows, Move::Left),
            vec![4, 0, 0, 0, 4, 0, 0, 0, 4, 8, 0, 0, 2, 8, 0, 0]
        );
        assert_eq!(
            shifted(&rows, Move::Right),
            vec![0, 0, 0, 4, 0, 0, 0, 4, 0, 0, 4, 8, 0, 0, 2, 8]
        );
        assert_eq!(
            shifted(&rows, Move::Up),
            vec![4, 8, 0, 2, 0, 0, 0, 16, 0, 0, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(
            shifted(&rows, Move::Down),
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 4, 8, 0, 16]
        );
    }

    #[test]
    fn ids_survive_slides_and_renew_on_merge() {
        let b = board(&[[0, 0, 0, 2], [0, 0, 4, 4], [0; 4], [0; 4]]);
        let before: Vec<TileId> = b.tiles().map(|t| t.id).collect();
        let mut ids = TileIds::after(&b);
        let s = slide(&b, Move::Left, &mut ids);

        let lone = s.board.get(Position::new(0, 0)).unwrap();
        assert_eq!(lone.id, before[0]);
        let merged = s.board.get(Position::new(1, 0)).unwrap();
        assert_eq!(merged.value, 8);
        assert!(!before.contains(&merged.id));
        assert!(s.events.iter().any(|e| matches!(
            e,
            TileEvent::Merged { id, sources, .. }
                if *id == merged.id
                    && sources.contains(&before[1])
                    && sources.contains(&before[2])
        )));
    }

    #[test]
    fn game_over_detection() {
        let checker = board(&[[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        assert!(is_game_over(&checker));
        assert!(legal_moves(&checker).is_empty());

        let vertical_pair = board(&[[2, 4, 2, 4], [2, 8, 4, 2], [8, 4, 2, 4], [4, 2, 4, 2]]);
        assert!(!is_game_over(&vertical_pair));
        assert_eq!(legal_moves(&vertical_pair), vec![Move::Up, Move::Down]);

        let not_full = board(&[[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 0]]);
        assert!(!is_game_over(&not_full));
    }

    #[test]
    fn spawn_fills_board_then_stops() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut b = Board::new(4);
        let mut ids = TileIds::new();
        for _ in 0..16 {
            let tile = spawn_random_tile(&mut b, &mut rng, &mut ids).unwrap();
            assert!(tile.value == 2 || tile.value == 4);
        }
        assert!(b.is_full());
        assert!(spawn_random_tile(&mut b, &mut rng, &mut ids).is_none());
        assert_eq!(b.tile_count(), 16);
    }

    #[test]
    fn spawn_values_are_mostly_twos() {
        let mut rng = StdRng::seed_from_u64(42);
        let fours = (0..10_000)
            .filter(|_| generate_tile_value(&mut rng) == 4)
            .count();
        assert!((700..1300).contains(&fours), "fours = {fours}");
    }
}
