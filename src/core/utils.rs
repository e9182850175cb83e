//! Utility functions for quantum operations.
//!
//! This module contains helper functions for:
//! - Operator expansion to larger systems.
//! - In-place application of a local operator to a state vector.
//! - Bit manipulation for state indices.
//! - Parsing and rendering of bit strings.

use ndarray::{Array1, Array2};
use num_complex::Complex64;

/// Generates the full operator matrix ($2^N \times 2^N$) for the whole system.
///
/// It expands a local operator acting on `targets` (and controlled by `controls`)
/// to an operator on the full system of `num_total_qubits`.
///
/// # Arguments
///
/// * `num_total_qubits` - Total number of qubits in the system.
/// * `matrix` - The matrix representation of the local gate.
/// * `targets` - Indices of the target qubits.
/// * `controls` - Indices of the control qubits.
pub fn expand_operator(
    num_total_qubits: usize,
    matrix: &Array2<Complex64>,
    targets: &[usize],
    controls: &[usize],
) -> Array2<Complex64> {
    let dim = 1 << num_total_qubits;
    let mut full_matrix = Array2::<Complex64>::zeros((dim, dim));
    let control_mask = mask_of(controls);
    let passive_mask = !mask_of(targets);

    for col_idx in 0..dim {
        // Basis states with any control at 0 are left untouched
        if (col_idx & control_mask) != control_mask {
            full_matrix[[col_idx, col_idx]] = Complex64::new(1.0, 0.0);
            continue;
        }
        let small_col = extract_bits(col_idx, targets);
        for small_row in 0..matrix.nrows() {
            let val = matrix[[small_row, small_col]];
            if val.norm_sqr() < f64::EPSILON {
                continue;
            }
            let row_idx = (col_idx & passive_mask) | deposit_bits(small_row, targets);
            full_matrix[[row_idx, col_idx]] = val;
        }
    }
    full_matrix
}

/// Applies a local operator to a state vector without materializing the
/// $2^N \times 2^N$ expansion.
///
/// For every basis index whose target bits are all zero and whose control bits
/// are all one, the $2^k$ amplitudes spanned by the `k` targets are gathered,
/// multiplied by `matrix` and scattered back.
pub fn apply_to_amplitudes(
    amplitudes: &mut Array1<Complex64>,
    matrix: &Array2<Complex64>,
    targets: &[usize],
    controls: &[usize],
) {
    let dim = amplitudes.len();
    let local_dim = matrix.nrows();
    let control_mask = mask_of(controls);
    let target_mask = mask_of(targets);

    let offsets: Vec<usize> = (0..local_dim).map(|i| deposit_bits(i, targets)).collect();
    let mut gathered = vec![Complex64::new(0.0, 0.0); local_dim];

    for base in 0..dim {
        if base & target_mask != 0 || (base & control_mask) != control_mask {
            continue;
        }
        for (slot, &offset) in gathered.iter_mut().zip(&offsets) {
            *slot = amplitudes[base | offset];
        }
        for (row, &offset) in offsets.iter().enumerate() {
            let mut acc = Complex64::new(0.0, 0.0);
            for (col, amp) in gathered.iter().enumerate() {
                acc += matrix[[row, col]] * *amp;
            }
            amplitudes[base | offset] = acc;
        }
    }
}

/// Bitmask with a 1 at every position listed in `indices`.
pub fn mask_of(indices: &[usize]) -> usize {
    indices.iter().fold(0, |mask, &i| mask | (1 << i))
}

/// Gathers the bits of `value` at positions `indices` into the low bits.
pub fn extract_bits(value: usize, indices: &[usize]) -> usize {
    let mut result = 0;
    for (i, &pos) in indices.iter().enumerate() {
        if (value >> pos) & 1 == 1 {
            result |= 1 << i;
        }
    }
    result
}

/// Scatters bits from `compact_value` into the positions specified by `indices`.
pub fn deposit_bits(compact_value: usize, indices: &[usize]) -> usize {
    let mut result = 0;
    for (i, &pos) in indices.iter().enumerate() {
        if (compact_value >> i) & 1 == 1 {
            result |= 1 << pos;
        }
    }
    result
}

/// Find duplicate in a slice of usize
pub fn find_duplicate(indices: &[usize]) -> Option<usize> {
    let mut seen = std::collections::HashSet::new();
    indices.iter().find(|&&idx| !seen.insert(idx)).copied()
}

/// Checks if `U U† = I` within tolerance.
pub fn is_unitary(matrix: &Array2<Complex64>) -> bool {
    let (rows, _) = matrix.dim();
    let eye = Array2::<Complex64>::eye(rows);

    let u_dagger = matrix.t().mapv(|x| x.conj());
    let product = matrix.dot(&u_dagger);

    product
        .iter()
        .zip(eye.iter())
        .all(|(a, b)| (*a - *b).norm() < 1e-6)
}

/// Parses a string of `'0'`/`'1'` characters. Returns `None` on any other
/// character or on an empty string.
pub fn parse_bits(bits: &str) -> Option<Vec<bool>> {
    if bits.is_empty() {
        return None;
    }
    bits.chars()
        .map(|c| match c {
            '0' => Some(false),
            '1' => Some(true),
            _ => None,
        })
        .collect()
}

/// Renders bits as a string of binary digits.
pub fn render_bits(bits: &[bool]) -> String {
    bits.iter().map(|&b| if b { '1' } else { '0' }).collect()
}
