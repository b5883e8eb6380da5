use std::fmt::{Display, Formatter};
use std::ops::Deref;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::error::{QRError, QRResult};
use super::metadata::Color;
use crate::builder::Matrix;

#[derive(Debug, PartialEq, Eq, Copy, Clone, PartialOrd, Ord, Hash)]
pub struct MaskPattern(u8);

impl MaskPattern {
    pub const COUNT: usize = 8;

    pub fn new(pattern: u8) -> QRResult<Self> {
        if pattern as usize >= Self::COUNT {
            return Err(QRError::InvalidMaskingPattern);
        }
        Ok(Self(pattern))
    }

    pub fn all() -> impl Iterator<Item = MaskPattern> {
        (0..Self::COUNT as u8).map(Self)
    }
}

impl Deref for MaskPattern {
    type Target = u8;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for MaskPattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

mod mask_functions {
    pub fn checkerboard(r: i16, c: i16) -> bool {
        (r + c) & 1 == 0
    }

    pub fn horizontal_lines(r: i16, _: i16) -> bool {
        r & 1 == 0
    }

    pub fn vertical_lines(_: i16, c: i16) -> bool {
        c % 3 == 0
    }

    pub fn diagonal_lines(r: i16, c: i16) -> bool {
        (r + c) % 3 == 0
    }

    pub fn large_checkerboard(r: i16, c: i16) -> bool {
        ((r >> 1) + (c / 3)) & 1 == 0
    }

    pub fn fields(r: i16, c: i16) -> bool {
        ((r * c) & 1) + ((r * c) % 3) == 0
    }

    pub fn diamonds(r: i16, c: i16) -> bool {
        (((r * c) & 1) + ((r * c) % 3)) & 1 == 0
    }

    pub fn meadow(r: i16, c: i16) -> bool {
        (((r + c) & 1) + ((r * c) % 3)) & 1 == 0
    }
}

static MASK_FUNCTIONS: [fn(i16, i16) -> bool; MaskPattern::COUNT] = [
    mask_functions::checkerboard,
    mask_functions::horizontal_lines,
    mask_functions::vertical_lines,
    mask_functions::diagonal_lines,
    mask_functions::large_checkerboard,
    mask_functions::fields,
    mask_functions::diamonds,
    mask_functions::meadow,
];

impl MaskPattern {
    pub fn mask_function(self) -> fn(i16, i16) -> bool {
        MASK_FUNCTIONS[self.0 as usize]
    }
}


// Penalty score
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PenaltyScore {
    pub n1: u32,
    pub n2: u32,
    pub n3: u32,
    pub n4: u32,
    pub total: u32,
}

impl PenaltyScore {
    pub fn compute(m: &Matrix) -> Self {
        let n1 = compute_adjacent_penalty(m);
        let n2 = compute_block_penalty(m);
        let n3 = compute_finder_pattern_penalty(m, true) + compute_finder_pattern_penalty(m, false);
        let n4 = compute_balance_penalty(m);
        Self { n1, n2, n3, n4, total: n1 + n2 + n3 + n4 }
    }
}

fn line(m: &Matrix, i: i16, is_hor: bool) -> Vec<Option<Color>> {
    let w = m.width() as i16;
    (0..w).map(|j| if is_hor { m.get(i, j).value } else { m.get(j, i).value }).collect()
}

// N1: every maximal run of 5 or more same color modules adds 3 + (len - 5)
fn compute_adjacent_penalty(m: &Matrix) -> u32 {
    let w = m.width() as i16;
    let run_penalty = |len: u32| if len >= 5 { len - 2 } else { 0 };
    let mut pen = 0;
    for is_hor in [true, false] {
        for i in 0..w {
            let mut last = None;
            let mut run = 0;
            for clr in line(m, i, is_hor) {
                if clr.is_some() && clr == last {
                    run += 1;
                } else {
                    pen += run_penalty(run);
                    last = clr;
                    run = clr.map_or(0, |_| 1);
                }
            }
            pen += run_penalty(run);
        }
    }
    pen
}

// N2: every 2x2 block of one color adds 3. Overlapping blocks count separately
fn compute_block_penalty(m: &Matrix) -> u32 {
    let mut pen = 0;
    let w = m.width() as i16;
    for r in 0..w - 1 {
        for c in 0..w - 1 {
            let clr = m.get(r, c).value;
            if clr.is_some()
                && clr == m.get(r + 1, c).value
                && clr == m.get(r, c + 1).value
                && clr == m.get(r + 1, c + 1).value
            {
                pen += 3;
            }
        }
    }
    pen
}

// N3: every 1:1:3:1:1 window adds 40. The quiet zone is not inspected
fn compute_finder_pattern_penalty(m: &Matrix, is_hor: bool) -> u32 {
    static PATTERN: [Option<Color>; 7] = [
        Some(Color::Dark),
        Some(Color::Light),
        Some(Color::Dark),
        Some(Color::Dark),
        Some(Color::Dark),
        Some(Color::Light),
        Some(Color::Dark),
    ];
    let w = m.width() as i16;
    let mut pen = 0;
    for i in 0..w {
        let l = line(m, i, is_hor);
        pen += l.windows(7).filter(|win| *win == PATTERN).count() as u32 * 40;
    }
    pen
}

// N4: 10 per full 5% step away from an even dark/light balance
fn compute_balance_penalty(m: &Matrix) -> u32 {
    let dark = m.count_dark_modules() as i64;
    let w = m.width() as i64;
    let total = w * w;
    let k = (20 * dark - 10 * total).abs() / total;
    10 * k as u32
}


// Mask optimizer
//------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskEvaluation {
    pub pattern: MaskPattern,
    pub score: PenaltyScore,
    pub candidate: Matrix,
}

fn score_candidate(eval: &mut MaskEvaluation) {
    eval.candidate.apply_mask(eval.pattern);
    eval.score = PenaltyScore::compute(&eval.candidate);
    log::trace!("Mask {} scored {:?}", eval.pattern, eval.score);
}

// Scores all eight candidates, kept in pattern order
pub fn evaluate_masks(unmasked: &Matrix) -> [MaskEvaluation; MaskPattern::COUNT] {
    let mut evaluations: [MaskEvaluation; MaskPattern::COUNT] =
        std::array::from_fn(|i| MaskEvaluation {
            pattern: MaskPattern(i as u8),
            score: PenaltyScore::default(),
            candidate: unmasked.clone(),
        });

    #[cfg(not(feature = "parallel"))]
    evaluations.iter_mut().for_each(score_candidate);
    #[cfg(feature = "parallel")]
    evaluations.par_iter_mut().for_each(score_candidate);

    evaluations
}

// Lowest total wins. Ties go to the lowest pattern index
pub fn select_best_mask(evaluations: &[MaskEvaluation; MaskPattern::COUNT]) -> &MaskEvaluation {
    let [first, rest @ ..] = evaluations;
    rest.iter().fold(first, |best, e| if e.score.total < best.score.total { e } else { best })
}

#[cfg(test)]
mod mask_tests {
    use super::{evaluate_masks, select_best_mask, MaskEvaluation, MaskPattern, PenaltyScore};
    use crate::builder::Matrix;
    use crate::common::metadata::Version;

    fn eval(p: u8, total: u32) -> MaskEvaluation {
        MaskEvaluation {
            pattern: MaskPattern::new(p).unwrap(),
            score: PenaltyScore { total, ..Default::default() },
            candidate: Matrix::new(Version::new(1).unwrap()),
        }
    }

    fn with_totals(totals: [u32; 8]) -> [MaskEvaluation; 8] {
        std::array::from_fn(|p| eval(p as u8, totals[p]))
    }

    #[test]
    fn test_select_lowest() {
        let evals = with_totals([500, 420, 430, 600, 610, 700, 421, 999]);
        assert_eq!(*select_best_mask(&evals).pattern, 1);
    }

    #[test]
    fn test_tie_goes_to_first() {
        let evals = with_totals([200, 200, 200, 100, 200, 200, 100, 200]);
        assert_eq!(*select_best_mask(&evals).pattern, 3);
        assert_eq!(*select_best_mask(&with_totals([7; 8])).pattern, 0);
    }

    #[test]
    fn test_last_pattern() {
        let evals = with_totals([90, 80, 70, 60, 50, 40, 30, 20]);
        assert_eq!(*select_best_mask(&evals).pattern, 7);
    }

    #[test]
    fn test_evaluate_masks_in_pattern_order() {
        let mut m = Matrix::new(Version::new(1).unwrap());
        m.draw_finder_patterns();
        let evaluations = evaluate_masks(&m);
        for (i, e) in evaluations.iter().enumerate() {
            assert_eq!(*e.pattern as usize, i);
            assert_eq!(e.score, PenaltyScore::compute(&e.candidate));
        }
    }
}
