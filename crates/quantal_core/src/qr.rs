//! Givens-rotation QR factorization of the (N+1)xN variables-by-equations
//! Jacobian, and the minimum-norm Newton correction built on its factors.

use nalgebra::{DMatrix, DVector};

/// Apply the Givens rotation that zeroes `b[(l2, col)]` against the pivot
/// `b[(l1, col)]`, accumulating the rotation into `q` and sweeping the
/// remaining columns of `b`. Skipped when both entries are zero.
fn givens(b: &mut DMatrix<f64>, q: &mut DMatrix<f64>, l1: usize, l2: usize, col: usize) {
    let c1 = b[(l1, col)];
    let c2 = b[(l2, col)];
    if c1.abs() + c2.abs() == 0.0 {
        return;
    }

    // Overflow-safe norm of the pair.
    let sn = if c2.abs() >= c1.abs() {
        c2.abs() * (1.0 + (c1 / c2) * (c1 / c2)).sqrt()
    } else {
        c1.abs() * (1.0 + (c2 / c1) * (c2 / c1)).sqrt()
    };
    let s1 = c1 / sn;
    let s2 = c2 / sn;

    for k in 0..q.ncols() {
        let sv1 = q[(l1, k)];
        let sv2 = q[(l2, k)];
        q[(l1, k)] = s1 * sv1 + s2 * sv2;
        q[(l2, k)] = -s2 * sv1 + s1 * sv2;
    }

    for k in col + 1..b.ncols() {
        let sv1 = b[(l1, k)];
        let sv2 = b[(l2, k)];
        b[(l1, k)] = s1 * sv1 + s2 * sv2;
        b[(l2, k)] = -s2 * sv1 + s1 * sv2;
    }

    b[(l1, col)] = sn;
    b[(l2, col)] = 0.0;
}

/// In-place QR factorization by Givens rotations.
///
/// `q` is reset to the identity and accumulates the rotations, so on
/// return `q * b_original == b` with `b` upper-trapezoidal. Because `b`
/// has one more row than columns, the last row of `q` is a unit vector
/// spanning the kernel of the transposed input, which the tracer uses as
/// the tangent to the homotopy curve. Rotations are applied in a fixed
/// column-by-column sweep, so the factorization is deterministic.
pub fn qr_decompose(b: &mut DMatrix<f64>, q: &mut DMatrix<f64>) {
    q.fill_with_identity();
    for m in 0..b.ncols() {
        for k in m + 1..b.nrows() {
            givens(b, q, m, k, m);
        }
    }
}

/// One minimum-norm Newton correction from the factors of
/// [`qr_decompose`].
///
/// Solves the triangular system in place in `y`, forms the correction
/// from the first N rows of `q`, subtracts it from `u`, and returns the
/// correction's 2-norm.
pub fn newton_step(
    q: &DMatrix<f64>,
    b: &DMatrix<f64>,
    u: &mut DVector<f64>,
    y: &mut DVector<f64>,
) -> f64 {
    let n = b.ncols();
    for k in 0..n {
        for l in 0..k {
            y[k] -= b[(l, k)] * y[l];
        }
        y[k] /= b[(k, k)];
    }

    let mut d = 0.0;
    for k in 0..b.nrows() {
        let mut s = 0.0;
        for l in 0..n {
            s += q[(l, k)] * y[l];
        }
        u[k] -= s;
        d += s * s;
    }
    d.sqrt()
}
