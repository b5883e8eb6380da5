use std::iter;
use std::ops::Deref;

use super::error::{QRError, QRResult};
use super::galois::{GaloisField, G};

// Error correction block plan
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGroup {
    pub block_count: usize,
    pub data_codewords: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ECBlockPlan {
    ecc_per_block: usize,
    groups: [BlockGroup; 2],
}

impl ECBlockPlan {
    pub fn new(ecc_per_block: usize, group1: (usize, usize), group2: (usize, usize)) -> Self {
        let groups = [group1, group2]
            .map(|(block_count, data_codewords)| BlockGroup { block_count, data_codewords });
        Self { ecc_per_block, groups }
    }

    pub fn ecc_per_block(&self) -> usize {
        self.ecc_per_block
    }

    // Groups in table order. The second group is omitted when it holds no blocks
    pub fn groups(&self) -> impl Iterator<Item = &BlockGroup> {
        self.groups.iter().filter(|g| g.block_count > 0)
    }

    pub fn block_count(&self) -> usize {
        self.groups().map(|g| g.block_count).sum()
    }

    pub fn total_data_codewords(&self) -> usize {
        self.groups().map(|g| g.block_count * g.data_codewords).sum()
    }

    pub fn total_ec_codewords(&self) -> usize {
        self.block_count() * self.ecc_per_block
    }
}

// Reed-Solomon encoder
//------------------------------------------------------------------------------

// Product of (x - a^i) for i in 0..degree, highest power first
pub fn generator_polynomial(degree: usize) -> Vec<u8> {
    let mut poly = vec![G(1)];
    for i in 0..degree {
        let root = G::gen_pow(i);
        let mut next = vec![G(0); poly.len() + 1];
        for (j, &coeff) in poly.iter().enumerate() {
            next[j] += coeff;
            next[j + 1] += coeff * root;
        }
        poly = next;
    }
    poly.into_iter().map(|g| g.0).collect()
}

// Performs polynomial long division with data polynomial(num)
// and generator polynomial(den) to compute remainder polynomial,
// the coefficients of which are the ecc
pub fn ecc(block: &[u8], gen_poly: &[u8]) -> Vec<u8> {
    let gf = GaloisField::get();
    let len = block.len();
    let ecc_count = gen_poly.len() - 1;

    let mut res = block.to_vec();
    res.resize(len + ecc_count, 0);

    for i in 0..len {
        let lead_coeff = res[i];
        if lead_coeff == 0 {
            continue;
        }

        let log_lead_coeff = gf.log(lead_coeff) as usize;
        for (u, &v) in res[i..].iter_mut().zip(gen_poly.iter()) {
            if v != 0 {
                *u ^= gf.exp(gf.log(v) as usize + log_lead_coeff);
            }
        }
        debug_assert_eq!(res[i], 0, "Leading term should cancel");
    }

    res.split_off(len)
}

// Splits data codewords into blocks per the plan's group order
pub fn blockify<'a>(data: &'a [u8], plan: &ECBlockPlan) -> Vec<&'a [u8]> {
    debug_assert!(
        plan.total_data_codewords() == data.len(),
        "Data len doesn't match total size of blocks: Data len {}, Total block size {}",
        data.len(),
        plan.total_data_codewords()
    );

    let mut blocks = Vec::with_capacity(plan.block_count());
    let mut rest = data;
    for g in plan.groups() {
        for _ in 0..g.block_count {
            let (block, tail) = rest.split_at(g.data_codewords);
            blocks.push(block);
            rest = tail;
        }
    }
    blocks
}

// Column-major read across blocks, skipping blocks that are already exhausted
pub fn interleave<T: Copy, V: Deref<Target = [T]>>(blocks: &[V]) -> Vec<T> {
    let max_block_size = blocks.iter().map(|b| b.len()).max().unwrap_or(0);
    let total_size = blocks.iter().map(|b| b.len()).sum::<usize>();
    let mut res = Vec::with_capacity(total_size);
    for i in 0..max_block_size {
        for b in blocks {
            if i < b.len() {
                res.push(b[i]);
            }
        }
    }
    res
}

// Inverse of interleave for a whole symbol. Regroups the data codewords and
// then the ec codewords into one block per plan entry, data first
pub fn deinterleave(codewords: &[u8], plan: &ECBlockPlan) -> Vec<Vec<u8>> {
    let ecc_count = plan.ecc_per_block();
    debug_assert!(
        codewords.len() == plan.total_data_codewords() + plan.total_ec_codewords(),
        "Codeword count doesn't match the plan: Codewords {}, Plan {}",
        codewords.len(),
        plan.total_data_codewords() + plan.total_ec_codewords()
    );

    let sizes = plan
        .groups()
        .flat_map(|g| iter::repeat(g.data_codewords).take(g.block_count))
        .collect::<Vec<_>>();
    let max_size = sizes.iter().copied().max().unwrap_or(0);
    let mut blocks = sizes.iter().map(|s| Vec::with_capacity(s + ecc_count)).collect::<Vec<_>>();

    let mut codewords = codewords.iter().copied();
    for i in 0..max_size {
        for (b, &size) in blocks.iter_mut().zip(&sizes) {
            if i < size {
                b.extend(codewords.next());
            }
        }
    }
    for _ in 0..ecc_count {
        for b in blocks.iter_mut() {
            b.extend(codewords.next());
        }
    }
    blocks
}

// Error correction stage output
//------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCorrection {
    pub plan: ECBlockPlan,
    pub generator: Vec<u8>,
    pub data_blocks: Vec<Vec<u8>>,
    pub ec_blocks: Vec<Vec<u8>>,
}

impl ErrorCorrection {
    pub fn compute(data: &[u8], plan: ECBlockPlan) -> Self {
        let generator = generator_polynomial(plan.ecc_per_block());
        let data_blocks = blockify(data, &plan);
        let ec_blocks = data_blocks.iter().map(|b| ecc(b, &generator)).collect();
        let data_blocks = data_blocks.into_iter().map(<[u8]>::to_vec).collect();
        log::debug!(
            "Computed {} ec blocks of {} codewords",
            plan.block_count(),
            plan.ecc_per_block()
        );
        Self { plan, generator, data_blocks, ec_blocks }
    }

    // Interleaved data codewords followed by interleaved ec codewords
    pub fn interleaved(&self) -> Vec<u8> {
        let mut res = interleave(&self.data_blocks);
        res.extend(interleave(&self.ec_blocks));
        res
    }
}


// Reed-Solomon decoder
//------------------------------------------------------------------------------

// Corrects a block of data codewords followed by its ec codewords in place.
// Returns the number of corrected codewords
pub fn rectify(block: &mut [u8], ecc_count: usize) -> QRResult<usize> {
    let synd = match syndromes(block, ecc_count) {
        Some(s) => s,
        None => return Ok(0),
    };

    // Error locator polynomial
    let sig = berlekamp_massey(&synd);
    let err_count = sig.len() - 1;
    if 2 * err_count > ecc_count {
        log::debug!("Locator degree {err_count} exceeds capacity of {ecc_count} ec codewords");
        return Err(QRError::UncorrectableData);
    }

    let err_loc = chien_search(&sig, block.len());
    if err_loc.len() != err_count {
        log::debug!("Found {} of {err_count} error positions", err_loc.len());
        return Err(QRError::UncorrectableData);
    }

    // Rectify errors by XORing data with magnitude
    let omg = omega(&synd, &sig);
    let len = block.len();
    for (deg, mag) in forney(&omg, &sig, &err_loc) {
        block[len - 1 - deg] ^= mag.0;
    }

    match syndromes(block, ecc_count) {
        None => Ok(err_count),
        Some(_) => Err(QRError::UncorrectableData),
    }
}

// Evaluates r(a^i) for i in 0..ecc_count. None when every syndrome is zero
fn syndromes(block: &[u8], ecc_count: usize) -> Option<Vec<G>> {
    let synd = (0..ecc_count)
        .map(|i| eval_poly(block.iter().rev().map(|&b| G(b)), G::gen_pow(i)))
        .collect::<Vec<_>>();
    synd.iter().any(|s| s.0 != 0).then_some(synd)
}

// Sigma polynomial, lowest degree first and trimmed to its degree
fn berlekamp_massey(synd: &[G]) -> Vec<G> {
    let n = synd.len();
    let mut l = 0usize;
    let mut m = 1usize;
    let mut b = G(1);
    let mut cx = vec![G(0); n + 1];
    let mut bx = vec![G(0); n + 1];
    cx[0] = G(1);
    bx[0] = G(1);

    for k in 0..n {
        // Calculate discrepancy
        let mut d = synd[k];
        for i in 1..=l {
            d += cx[i] * synd[k - i];
        }

        if d.0 == 0 {
            m += 1;
            continue;
        }

        let tx = cx.clone();
        let scale = d / b;
        for i in 0..=n - m {
            cx[i + m] += scale * bx[i];
        }

        if 2 * l <= k {
            bx = tx;
            l = k + 1 - l;
            b = d;
            m = 1;
        } else {
            m += 1;
        }
    }

    cx.truncate(l + 1);
    cx
}

// Degrees whose inverse locator a^-deg is a root of sigma
fn chien_search(sig: &[G], len: usize) -> Vec<usize> {
    (0..len).filter(|&deg| eval_poly(sig.iter().copied(), G::gen_pow(255 - deg)).0 == 0).collect()
}

// Error evaluator S(x) * sigma(x) mod x^n
fn omega(synd: &[G], sig: &[G]) -> Vec<G> {
    let mut omg = vec![G(0); synd.len()];
    for (i, o) in omg.iter_mut().enumerate() {
        for (j, &s) in sig.iter().enumerate().take(i + 1) {
            *o += synd[i - j] * s;
        }
    }
    omg
}

// Magnitude at each error degree: X * omega(X^-1) / sigma'(X^-1)
fn forney(omg: &[G], sig: &[G], err_loc: &[usize]) -> Vec<(usize, G)> {
    // Formal derivative keeps the odd terms in characteristic 2
    let dsig = sig
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, &s)| if i & 1 == 1 { s } else { G(0) })
        .collect::<Vec<_>>();

    err_loc
        .iter()
        .map(|&deg| {
            let xinv = G::gen_pow(255 - deg);
            let omg_x = eval_poly(omg.iter().copied(), xinv);
            let dsig_x = eval_poly(dsig.iter().copied(), xinv);
            (deg, G::gen_pow(deg) * omg_x / dsig_x)
        })
        .collect()
}

// Coefficients lowest degree first
fn eval_poly(poly: impl Iterator<Item = G>, x: G) -> G {
    let mut res = G(0);
    let mut xpow = G(1);
    for coeff in poly {
        res += coeff * xpow;
        xpow *= x;
    }
    res
}

#[cfg(test)]
mod ec_rectifier_tests {
    use rand::{rngs::StdRng, seq::index::sample, Rng, SeedableRng};
    use test_case::test_case;

    use super::{ecc, generator_polynomial, rectify};
    use crate::common::error::QRError;

    fn codeword(data: &[u8], ecc_count: usize) -> Vec<u8> {
        let mut res = data.to_vec();
        res.extend(ecc(data, &generator_polynomial(ecc_count)));
        res
    }

    const DATA: [u8; 11] = [32, 91, 11, 45, 89, 123, 77, 44, 56, 99, 202];

    #[test]
    fn test_codeword() {
        assert_eq!(codeword(&DATA, 4)[11..], [21, 197, 229, 186]);
    }

    #[test]
    fn test_clean_block() {
        let mut blk = codeword(&DATA, 4);
        assert_eq!(rectify(&mut blk, 4), Ok(0));
        assert_eq!(blk[..11], DATA);
    }

    #[test_case(&[(5, 46)]; "one_data")]
    #[test_case(&[(5, 46), (10, 249)]; "two_data")]
    #[test_case(&[(0, 0), (13, 0xFF)]; "data_and_ec")]
    #[test_case(&[(14, 1)]; "last_ec")]
    fn test_rectify(errors: &[(usize, u8)]) {
        let good = codeword(&DATA, 4);
        let mut blk = good.clone();
        for &(i, v) in errors {
            blk[i] = v;
        }
        assert_eq!(rectify(&mut blk, 4), Ok(errors.len()));
        assert_eq!(blk, good);
    }

    #[test_case(&[(0, 138), (2, 161), (4, 243), (5, 46), (6, 231), (8, 146)]; "six_errors")]
    #[test_case(&[(0, 33), (1, 89), (2, 15)]; "three_errors")]
    fn test_rectify_fail(errors: &[(usize, u8)]) {
        let mut blk = codeword(&DATA, 4);
        for &(i, v) in errors {
            blk[i] = v;
        }
        assert_eq!(rectify(&mut blk, 4), Err(QRError::UncorrectableData));
    }

    #[test]
    fn test_numeric_1h_block() {
        let data = [0x10, 0x20, 0x0C, 0x56, 0x61, 0x80, 0xEC, 0x11, 0xEC];
        let good = codeword(&data, 17);
        let mut blk = good.clone();
        for i in [0, 3, 8, 9, 12, 16, 20, 25] {
            blk[i] ^= 0xFF;
        }
        assert_eq!(rectify(&mut blk, 17), Ok(8));
        assert_eq!(blk, good);

        let mut blk = good.clone();
        for b in blk.iter_mut().take(9) {
            *b ^= 0x55;
        }
        assert_eq!(rectify(&mut blk, 17), Err(QRError::UncorrectableData));
    }

    #[test]
    fn test_random_damage() {
        let mut rng = StdRng::seed_from_u64(29);
        for _ in 0..300 {
            let ecc_count = [7, 10, 13, 17, 18, 22, 26, 28, 30][rng.random_range(0..9)];
            let data = (0..rng.random_range(1..=40)).map(|_| rng.random()).collect::<Vec<u8>>();
            let good = codeword(&data, ecc_count);
            let mut blk = good.clone();
            let n = rng.random_range(0..=ecc_count / 2);
            for i in sample(&mut rng, blk.len(), n).iter() {
                blk[i] ^= rng.random_range(1..=255u8);
            }
            assert_eq!(rectify(&mut blk, ecc_count), Ok(n), "Ecc {ecc_count}, Errors {n}");
            assert_eq!(blk, good);
        }
    }
}
