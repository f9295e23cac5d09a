use gather_2048::engine::{Board, Move, preview};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::config::StrategyKind;

/// Preference order for the corner strategy: keep big tiles bottom-left.
const CORNER_ORDER: [Move; 4] = [Move::Down, Move::Left, Move::Right, Move::Up];

/// Pick one of `legal` for `board`. `legal` must be in `Move::ALL` order;
/// returns `None` only when it is empty.
pub(crate) fn select_move<R: Rng + ?Sized>(
    kind: StrategyKind,
    board: &Board,
    legal: &[Move],
    rng: &mut R,
) -> Option<Move> {
    match kind {
        StrategyKind::Random => legal.choose(rng).copied(),
        StrategyKind::Greedy => select_greedy(board, legal),
        StrategyKind::Corner => CORNER_ORDER.into_iter().find(|m| legal.contains(m)),
    }
}

fn select_greedy(board: &Board, legal: &[Move]) -> Option<Move> {
    let mut best: Option<(Move, u64)> = None;
    for &mv in legal {
        let gained = preview(board, mv).score_gained;
        // ties keep the earliest move
        match best {
            Some((_, b)) if gained <= b => {}
            _ => best = Some((mv, gained)),
        }
    }
    best.map(|(mv, _)| mv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gather_2048::engine::legal_moves;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn board(rows: &[&[u32]]) -> Board {
        Board::from_rows(rows).unwrap()
    }

    #[test]
    fn empty_legal_set_has_no_move() {
        let b = board(&[&[2, 4], &[4, 2]]);
        let mut rng = StdRng::seed_from_u64(1);
        for kind in [StrategyKind::Random, StrategyKind::Greedy, StrategyKind::Corner] {
            assert_eq!(select_move(kind, &b, &[], &mut rng), None);
        }
    }

    #[test]
    fn random_only_picks_legal_moves() {
        let b = board(&[&[0, 0, 0, 2], &[0, 0, 0, 0], &[0, 0, 0, 0], &[0, 0, 0, 0]]);
        let legal = legal_moves(&b);
        assert_eq!(legal, vec![Move::Down, Move::Left]);
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..50 {
            let mv = select_move(StrategyKind::Random, &b, &legal, &mut rng).unwrap();
            assert!(legal.contains(&mv));
        }
    }

    #[test]
    fn greedy_prefers_biggest_merge() {
        // Vertical 8+8 beats horizontal 2+2.
        let b = board(&[&[2, 2, 8, 0], &[0, 0, 8, 0], &[0, 0, 0, 0], &[0, 0, 0, 0]]);
        let legal = legal_moves(&b);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            select_move(StrategyKind::Greedy, &b, &legal, &mut rng),
            Some(Move::Up)
        );
    }

    #[test]
    fn greedy_tie_goes_to_first_legal() {
        let b = board(&[&[0, 0], &[0, 2]]);
        let legal = legal_moves(&b);
        assert_eq!(legal, vec![Move::Up, Move::Left]);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            select_move(StrategyKind::Greedy, &b, &legal, &mut rng),
            Some(Move::Up)
        );
    }

    #[test]
    fn corner_follows_preference() {
        let b = board(&[&[0, 0], &[0, 2]]);
        let legal = legal_moves(&b);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            select_move(StrategyKind::Corner, &b, &legal, &mut rng),
            Some(Move::Left)
        );
        assert_eq!(
            select_move(StrategyKind::Corner, &b, &[Move::Up, Move::Right], &mut rng),
            Some(Move::Right)
        );
    }
}
