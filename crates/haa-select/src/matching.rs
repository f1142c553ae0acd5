//! Angular matching between objects.

use haa_core::Momentum;

/// Angular separation `ΔR` between any two objects carrying a four-momentum.
pub fn delta_r<A: Momentum + ?Sized, B: Momentum + ?Sized>(a: &A, b: &B) -> f64 {
    a.p4().delta_r(b.p4())
}

/// Smallest `ΔR` between `a` and any object in `others`, or `None` when empty.
pub fn min_delta_r<'a, A, B, I>(a: &A, others: I) -> Option<f64>
where
    A: Momentum + ?Sized,
    B: Momentum + 'a,
    I: IntoIterator<Item = &'a B>,
{
    others.into_iter().map(|o| delta_r(a, o)).min_by(f64::total_cmp)
}

/// True when `a` lies within `cone` of any object in `others` (`ΔR < cone`).
pub fn overlaps_any<'a, A, B, I>(a: &A, others: I, cone: f64) -> bool
where
    A: Momentum + ?Sized,
    B: Momentum + 'a,
    I: IntoIterator<Item = &'a B>,
{
    others.into_iter().any(|o| delta_r(a, o) < cone)
}
