mod matrix;
mod qr;

pub use matrix::{Matrix, Module, ModuleType};
pub use qr::{Snapshot, Step, QR, QUIET_ZONE_MODULES};

use crate::common::{
    bit_utils::BitStream,
    codec::{analyze, encode},
    ec::ErrorCorrection,
    error::{QRError, QRResult},
    info::{format_info, version_info},
    mask::{evaluate_masks, select_best_mask, MaskPattern},
    metadata::{ECLevel, Version},
};

pub struct QRBuilder<'a> {
    text: &'a str,
    version: Option<Version>,
    ec_level: ECLevel,
    mask: Option<MaskPattern>,
}

impl<'a> QRBuilder<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, version: None, ec_level: ECLevel::M, mask: None }
    }

    pub fn text(&mut self, text: &'a str) -> &mut Self {
        self.text = text;
        self
    }

    pub fn version(&mut self, version: Version) -> &mut Self {
        self.version = Some(version);
        self
    }

    pub fn unset_version(&mut self) -> &mut Self {
        self.version = None;
        self
    }

    pub fn ec_level(&mut self, ec_level: ECLevel) -> &mut Self {
        self.ec_level = ec_level;
        self
    }

    pub fn mask(&mut self, mask: MaskPattern) -> &mut Self {
        self.mask = Some(mask);
        self
    }

    pub fn unset_mask(&mut self) -> &mut Self {
        self.mask = None;
        self
    }

    pub fn metadata(&self) -> String {
        let version = self.version.map_or("None".to_string(), |v| v.to_string());
        let mask = self.mask.map_or("None".to_string(), |m| m.to_string());
        format!("{{ Version: {version}, Ec level: {:?}, Mask: {mask} }}", self.ec_level)
    }
}


// Build pipeline
//------------------------------------------------------------------------------

impl QRBuilder<'_> {
    pub fn build(&self) -> QRResult<QR> {
        log::debug!("Generating QR {}...", self.metadata());
        if self.text.is_empty() {
            return Err(QRError::EmptyData);
        }

        let ecl = self.ec_level;
        let analysis = analyze(self.text, ecl);
        if !analysis.is_valid {
            return Err(QRError::DataTooLarge);
        }
        let version = match self.version {
            Some(v) if v < analysis.minimum_version => {
                log::debug!("Version {v} is below the minimum {}", analysis.minimum_version);
                return Err(QRError::DataTooLarge);
            }
            Some(v) => v,
            None => analysis.minimum_version,
        };
        log::debug!(
            "Analysed {} chars as {:?}, minimum version {}",
            analysis.char_count,
            analysis.mode,
            analysis.minimum_version
        );

        let encoded = encode(self.text, &analysis, version, ecl)?;
        let error_correction = ErrorCorrection::compute(encoded.codewords(), version.ec_block_plan(ecl));

        let mut message = BitStream::new((version.total_codewords() << 3) + version.remainder_bits());
        message.extend(&error_correction.interleaved());
        message.push_bits(0u8, version.remainder_bits());

        let mut snapshots = Vec::with_capacity(10);
        let mut matrix = Matrix::new(version);
        snapshots.push(Snapshot { step: Step::Empty, matrix: matrix.clone() });
        matrix.draw_finder_patterns();
        snapshots.push(Snapshot { step: Step::FinderPatterns, matrix: matrix.clone() });
        matrix.draw_separators();
        snapshots.push(Snapshot { step: Step::Separators, matrix: matrix.clone() });
        matrix.draw_timing_patterns();
        snapshots.push(Snapshot { step: Step::TimingPatterns, matrix: matrix.clone() });
        matrix.draw_alignment_patterns();
        snapshots.push(Snapshot { step: Step::AlignmentPatterns, matrix: matrix.clone() });
        matrix.reserve_info_areas();
        snapshots.push(Snapshot { step: Step::ReservedInfo, matrix: matrix.clone() });

        let placed = matrix.place_data(&message)?;
        log::trace!("Placed {placed} bits");
        snapshots.push(Snapshot { step: Step::DataPlaced, matrix: matrix.clone() });

        let (mask, mask_evaluations) = match self.mask {
            Some(m) => {
                log::debug!("Applying mask {m}...");
                matrix.apply_mask(m);
                (m, Vec::new())
            }
            None => {
                log::debug!("Finding best mask...");
                let evaluations = evaluate_masks(&matrix);
                let best = select_best_mask(&evaluations);
                matrix = best.candidate.clone();
                (best.pattern, Vec::from(evaluations))
            }
        };
        snapshots.push(Snapshot { step: Step::Masked, matrix: matrix.clone() });

        let format_info = format_info(ecl, mask);
        matrix.draw_format_info(format_info);
        snapshots.push(Snapshot { step: Step::FormatStamped, matrix: matrix.clone() });

        let version_info = version_info(version);
        if let Some(info) = version_info {
            matrix.draw_version_info(info);
        }
        snapshots.push(Snapshot { step: Step::VersionStamped, matrix: matrix.clone() });

        let qr = QR {
            version,
            ec_level: ecl,
            mask,
            format_info,
            version_info,
            matrix,
            analysis,
            encoded,
            error_correction,
            message,
            mask_evaluations,
            snapshots,
        };

        let total_modules = version.width() * version.width();
        let dark_modules = qr.count_dark_modules();
        log::info!("QR generated: {}", qr.metadata());
        log::debug!(
            "Data codewords: {}, Ec codewords: {}, Dark cells: {}, Light cells: {}, Balance: {}%",
            version.data_codewords(ecl),
            qr.error_correction.plan.total_ec_codewords(),
            dark_modules,
            total_modules - dark_modules,
            dark_modules * 100 / total_modules
        );

        Ok(qr)
    }
}

#[cfg(test)]
mod builder_tests {
    use test_case::test_case;

    use super::{ModuleType, QRBuilder, Step};
    use crate::common::{
        error::QRError,
        mask::{evaluate_masks, select_best_mask, MaskPattern, PenaltyScore},
        metadata::{ECLevel, Version},
    };

    fn parse_rows(rows: &[&str]) -> Vec<Vec<u8>> {
        rows.iter().map(|r| r.chars().map(|c| (c == '#') as u8).collect()).collect()
    }

    // Symbol for "01234567" at level H
    const NUMERIC_1H: [&str; 21] = [
        "#######..#....#######",
        "#.....#...###.#.....#",
        "#.###.#.#.....#.###.#",
        "#.###.#.###...#.###.#",
        "#.###.#..##...#.###.#",
        "#.....#...###.#.....#",
        "#######.#.#.#.#######",
        ".........###.........",
        "...##.##..##.....##..",
        ".##.#..###..#.#.###.#",
        "......#####.#.#.#.##.",
        ".#.##...#.#.###...#..",
        "..#...##.#.#.#...#.##",
        "........#....#.#.####",
        "#######.###.#..##..#.",
        "#.....#.....##.##.#..",
        "#.###.#.###..###..#.#",
        "#.###.#.##.##...##...",
        "#.###.#....#.##..####",
        "#.....#..#..###.#.#.#",
        "#######..###.##...##.",
    ];

    // Symbol for "01234567" at level M
    const NUMERIC_1M: [&str; 21] = [
        "#######..#.##.#######",
        "#.....#..####.#.....#",
        "#.###.#.#.....#.###.#",
        "#.###.#.##....#.###.#",
        "#.###.#.#.###.#.###.#",
        "#.....#.#...#.#.....#",
        "#######.#.#.#.#######",
        "........#..##........",
        "#.#####..#..#.#####..",
        "...#.#.##.#.#..#.##..",
        "..#...##.#.#.#..#####",
        "....#....#.....####..",
        "...######..#.#..#....",
        "........#.#####..##..",
        "#######..##.#.##.....",
        "#.....#.#.#####...#.#",
        "#.###.#.#...#..#.##..",
        "#.###.#.##..#..#.....",
        "#.###.#.#.##.#..#.#..",
        "#.....#........##.##.",
        "#######.####.#..#.#..",
    ];

    #[test]
    fn test_numeric_1h() {
        let qr = QRBuilder::new("01234567").ec_level(ECLevel::H).build().unwrap();
        assert_eq!(*qr.version(), 1);
        assert_eq!(*qr.mask(), 6);
        assert_eq!(qr.format_info(), 0x0D0C);
        assert_eq!(qr.version_info(), None);
        assert_eq!(qr.encoded().codewords(), [0x10, 0x20, 0x0C, 0x56, 0x61, 0x80, 0xEC, 0x11, 0xEC]);
        let ecc = [
            0x0E, 0x9D, 0x02, 0xC8, 0xC2, 0x94, 0xF3, 0xA7, 0xAD, 0x8D, 0xE2, 0x0A, 0xF4, 0xA5, 0x2B,
            0xAC, 0xDF,
        ];
        assert_eq!(qr.error_correction().ec_blocks, vec![ecc.to_vec()]);
        assert_eq!(qr.final_bits(), parse_rows(&NUMERIC_1H));
    }

    #[test]
    fn test_numeric_1h_scores() {
        let qr = QRBuilder::new("01234567").ec_level(ECLevel::H).build().unwrap();
        let exp = [
            (188, 189, 880, 0, 1257),
            (198, 210, 760, 10, 1178),
            (212, 219, 720, 0, 1151),
            (212, 183, 760, 0, 1155),
            (208, 201, 760, 0, 1169),
            (200, 180, 800, 0, 1180),
            (191, 162, 760, 0, 1113),
            (197, 207, 720, 0, 1124),
        ];
        let scores = qr
            .mask_evaluations()
            .iter()
            .map(|e| {
                let PenaltyScore { n1, n2, n3, n4, total } = e.score;
                (n1, n2, n3, n4, total)
            })
            .collect::<Vec<_>>();
        assert_eq!(scores, exp);
        let patterns = qr.mask_evaluations().iter().map(|e| *e.pattern).collect::<Vec<_>>();
        assert_eq!(patterns, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_numeric_1m() {
        let qr = QRBuilder::new("01234567").ec_level(ECLevel::M).build().unwrap();
        assert_eq!(*qr.mask(), 2);
        assert_eq!(qr.format_info(), 0x5E7C);
        let ecc = [0xA5, 0x24, 0xD4, 0xC1, 0xED, 0x36, 0xC7, 0x87, 0x2C, 0x55];
        assert_eq!(qr.error_correction().ec_blocks, vec![ecc.to_vec()]);
        let best = &qr.mask_evaluations()[2].score;
        assert_eq!((best.n1, best.n2, best.n3, best.n4, best.total), (232, 192, 720, 10, 1154));
        assert_eq!(qr.final_bits(), parse_rows(&NUMERIC_1M));
    }

    #[test]
    fn test_hello_world_1q() {
        let qr = QRBuilder::new("HELLO WORLD").ec_level(ECLevel::Q).build().unwrap();
        assert_eq!(*qr.version(), 1);
        assert_eq!(*qr.mask(), 1);
        assert_eq!(qr.format_info(), 0x3068);
    }

    #[test]
    fn test_empty_data() {
        assert_eq!(QRBuilder::new("").build().unwrap_err(), QRError::EmptyData);
    }

    #[test]
    fn test_data_too_large() {
        let text = "A".repeat(1853);
        let err = QRBuilder::new(&text).ec_level(ECLevel::H).build().unwrap_err();
        assert_eq!(err, QRError::DataTooLarge);
    }

    #[test]
    fn test_forced_version_too_small() {
        let text = "HELLO WORLD, THIS DOES NOT FIT VERSION 1";
        let res = QRBuilder::new(text).version(Version::new(1).unwrap()).build();
        assert_eq!(res.unwrap_err(), QRError::DataTooLarge);
    }

    #[test]
    fn test_forced_version_larger_than_needed() {
        let qr = QRBuilder::new("01234567").version(Version::new(8).unwrap()).build().unwrap();
        assert_eq!(*qr.version(), 8);
        assert_eq!(qr.width(), 49);
        assert_eq!(qr.version_info(), Some(0x085BC));
        assert_eq!(*qr.analysis().minimum_version, 1);
    }

    #[test]
    fn test_forced_mask() {
        let mask = MaskPattern::new(3).unwrap();
        let qr = QRBuilder::new("01234567").ec_level(ECLevel::H).mask(mask).build().unwrap();
        assert_eq!(qr.mask(), mask);
        assert_eq!(qr.format_info(), 0x19D0);
        assert!(qr.mask_evaluations().is_empty());
    }

    #[test]
    fn test_snapshots_in_order() {
        let qr = QRBuilder::new("HELLO WORLD").version(Version::new(7).unwrap()).build().unwrap();
        let steps = qr.snapshots().iter().map(|s| s.step).collect::<Vec<_>>();
        let exp = [
            Step::Empty,
            Step::FinderPatterns,
            Step::Separators,
            Step::TimingPatterns,
            Step::AlignmentPatterns,
            Step::ReservedInfo,
            Step::DataPlaced,
            Step::Masked,
            Step::FormatStamped,
            Step::VersionStamped,
        ];
        assert_eq!(steps, exp);

        let empty = qr.stage(Step::Empty).unwrap();
        assert_eq!(empty.count_modules(ModuleType::Empty), 45 * 45);
        let reserved = qr.stage(Step::ReservedInfo).unwrap();
        assert_eq!(reserved.count_modules(ModuleType::Empty), 0);
        assert_eq!(reserved.count_modules(ModuleType::Version), 36);
        assert_eq!(qr.stage(Step::VersionStamped), Some(qr.matrix()));
    }

    #[test]
    fn test_message_length() {
        let qr = QRBuilder::new("HELLO WORLD").version(Version::new(2).unwrap()).build().unwrap();
        // 44 codewords and 7 remainder bits
        assert_eq!(qr.message().len(), 44 * 8 + 7);
    }

    #[test]
    fn test_mask_evaluation_repeatable() {
        let qr = QRBuilder::new("HELLO WORLD").version(Version::new(7).unwrap()).build().unwrap();
        let placed = qr.stage(Step::DataPlaced).unwrap();
        let first = evaluate_masks(placed);
        let second = evaluate_masks(placed);
        assert_eq!(first, second);
        assert_eq!(first, qr.mask_evaluations());
        assert_eq!(select_best_mask(&first).pattern, qr.mask());
    }

    #[test_case("01234567"; "numeric")]
    #[test_case("HELLO WORLD"; "alphanumeric")]
    #[test_case("Hello, world! 🌏"; "byte")]
    fn test_deterministic(text: &str) {
        let a = QRBuilder::new(text).build().unwrap();
        let b = QRBuilder::new(text).build().unwrap();
        assert_eq!(a.final_bits(), b.final_bits());
        assert_eq!(a.mask(), b.mask());
    }
}
