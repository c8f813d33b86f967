//! Floating-point tolerance helpers.

/// Default relative tolerance used by [`is_close`].
pub const DEFAULT_REL_TOL: f64 = 1e-9;

/// Default absolute tolerance used by [`is_close`].
pub const DEFAULT_ABS_TOL: f64 = 0.0;

/// Returns `true` if `a` and `b` are equal within the default tolerances.
///
/// Uses the symmetric test `|a - b| <= max(rel_tol * max(|a|, |b|), abs_tol)`.
/// Two infinities of the same sign compare as close.
pub fn is_close(a: f64, b: f64) -> bool {
    is_close_with(a, b, DEFAULT_REL_TOL, DEFAULT_ABS_TOL)
}

/// Returns `true` if `a` and `b` are equal within the given tolerances.
pub fn is_close_with(a: f64, b: f64, rel_tol: f64, abs_tol: f64) -> bool {
    if a == b {
        return true;
    }
    if !a.is_finite() || !b.is_finite() {
        return false;
    }
    let diff = (a - b).abs();
    diff <= (rel_tol * a.abs().max(b.abs())).max(abs_tol)
}
