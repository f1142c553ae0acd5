//! Four-momentum representation in collider coordinates.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Four-momentum stored as `(pt, eta, phi, mass)`.
///
/// This is the common geometric representation for leptons, jets and
/// subjets. Values are immutable once an event is materialized.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct P4 {
    /// Transverse momentum [GeV].
    pub pt: f64,
    /// Pseudorapidity.
    pub eta: f64,
    /// Azimuthal angle [rad].
    pub phi: f64,
    /// Invariant mass [GeV].
    #[serde(default)]
    pub mass: f64,
}

impl P4 {
    /// Construct from `(pt, eta, phi, mass)`.
    pub const fn new(pt: f64, eta: f64, phi: f64, mass: f64) -> Self {
        Self { pt, eta, phi, mass }
    }

    /// Azimuthal difference `self.phi - other.phi` wrapped into `[-π, π)`.
    pub fn delta_phi(&self, other: &P4) -> f64 {
        wrap_phi(self.phi - other.phi)
    }

    /// Angular separation `ΔR = sqrt(Δη² + Δφ²)`.
    pub fn delta_r(&self, other: &P4) -> f64 {
        let deta = self.eta - other.eta;
        let dphi = self.delta_phi(other);
        deta.hypot(dphi)
    }
}

fn wrap_phi(dphi: f64) -> f64 {
    let two_pi = 2.0 * PI;
    let w = (dphi + PI).rem_euclid(two_pi) - PI;
    // rem_euclid can land exactly on 2π for tiny negative inputs
    if w >= PI { w - two_pi } else { w }
}

/// Anything that carries a four-momentum.
pub trait Momentum {
    /// The object's four-momentum.
    fn p4(&self) -> &P4;

    /// Transverse momentum shortcut.
    fn pt(&self) -> f64 {
        self.p4().pt
    }

    /// Pseudorapidity shortcut.
    fn eta(&self) -> f64 {
        self.p4().eta
    }
}

impl Momentum for P4 {
    fn p4(&self) -> &P4 {
        self
    }
}

/// Sort a collection by strictly descending transverse momentum.
///
/// Ties keep their input order (stable sort).
pub fn sort_by_pt_desc<T: Momentum>(objects: &mut [T]) {
    objects.sort_by(|a, b| b.pt().total_cmp(&a.pt()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    #[test]
    fn delta_phi_wraps_across_pi() {
        let a = P4::new(10.0, 0.0, 3.0, 0.0);
        let b = P4::new(10.0, 0.0, -3.0, 0.0);
        assert_abs_diff_eq!(a.delta_phi(&b), 6.0 - 2.0 * PI, epsilon = 1e-12);
        assert_abs_diff_eq!(a.delta_r(&b), 2.0 * PI - 6.0, epsilon = 1e-12);
    }

    #[test]
    fn delta_r_pythagoras() {
        let a = P4::new(30.0, 0.3, 0.0, 0.0);
        let b = P4::new(50.0, 0.0, 0.4, 0.0);
        assert_abs_diff_eq!(a.delta_r(&b), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn sort_descending_pt() {
        let mut v = vec![
            P4::new(20.0, 0.0, 0.0, 0.0),
            P4::new(80.0, 0.0, 0.0, 0.0),
            P4::new(45.0, 0.0, 0.0, 0.0),
        ];
        sort_by_pt_desc(&mut v);
        let pts: Vec<f64> = v.iter().map(|p| p.pt).collect();
        assert_eq!(pts, vec![80.0, 45.0, 20.0]);
    }

    proptest! {
        #[test]
        fn delta_r_symmetric_and_zero_on_self(
            eta1 in -5.0f64..5.0, phi1 in -PI..PI,
            eta2 in -5.0f64..5.0, phi2 in -PI..PI,
        ) {
            let a = P4::new(25.0, eta1, phi1, 0.0);
            let b = P4::new(40.0, eta2, phi2, 5.0);
            prop_assert!((a.delta_r(&b) - b.delta_r(&a)).abs() < 1e-12);
            prop_assert_eq!(a.delta_r(&a), 0.0);
            let dphi = a.delta_phi(&b);
            prop_assert!((-PI..=PI).contains(&dphi));
        }
    }
}
