//! Cross-cleaning of narrow b-jets against the subjets of double-b fat jets.

use haa_core::{FatJet, Jet, Momentum};

use crate::matching::{min_delta_r, overlaps_any};
use crate::selector::Selection;

/// Cone used to decide that a b-jet and a subjet share energy.
pub const SUBJET_CONE: f64 = 0.4;

/// Separation reported when there is nothing to match against.
pub const NO_MATCH_DR: f64 = 999.0;

/// Keep the b-jets lying at `ΔR >= SUBJET_CONE` from every subjet of every fat jet.
///
/// Input order is preserved. With no fat jets every b-jet survives.
pub fn clean_overlaps(b_jets: &[Jet], fat_jets: &[FatJet]) -> Vec<Jet> {
    b_jets
        .iter()
        .filter(|b| {
            let overlap = fat_jets.iter().any(|fj| overlaps_any(*b, &fj.subjets, SUBJET_CONE));
            if overlap {
                tracing::trace!(pt = b.pt(), eta = b.eta(), phi = b.p4().phi, "b-jet overlaps a subjet");
            }
            !overlap
        })
        .cloned()
        .collect()
}

/// Clean a b-jet selection against the selected fat jets.
///
/// The truth half is the truth-matched part of the cleaned reco list, not a
/// separate cleaning of truth objects.
pub fn clean_selection(b_jets: &Selection<Jet>, fat_jets: &Selection<FatJet>) -> Selection<Jet> {
    let mut out = Selection::new(b_jets.truth.is_some());
    for jet in clean_overlaps(&b_jets.reco, &fat_jets.reco) {
        let is_truth = jet.is_signal_truth();
        out.push(jet, is_truth);
    }
    out
}

/// Minimum angular distances from one b-jet to the fat-jet system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Separation {
    /// Closest fat-jet axis.
    pub to_fat_jet: f64,
    /// Closest subjet over all fat jets.
    pub to_subjet: f64,
}

/// Distances from `b` to the nearest fat jet and nearest subjet, [`NO_MATCH_DR`] when absent.
pub fn separation<M: Momentum + ?Sized>(b: &M, fat_jets: &[FatJet]) -> Separation {
    let to_fat_jet = min_delta_r(b, fat_jets).unwrap_or(NO_MATCH_DR);
    let to_subjet =
        min_delta_r(b, fat_jets.iter().flat_map(|fj| fj.subjets.iter())).unwrap_or(NO_MATCH_DR);
    Separation { to_fat_jet, to_subjet }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use haa_core::{P4, SIGNAL_MOTHER_ID};
    use proptest::prelude::*;

    fn bjet(pt: f64, eta: f64, phi: f64) -> Jet {
        Jet { p4: P4::new(pt, eta, phi, 4.0), pass_loose_id: true, csv: 0.9, hadron_flavor: 5, mother_id: 0 }
    }

    fn fat_with(subjets: Vec<P4>) -> FatJet {
        FatJet { p4: P4::new(250.0, 0.0, 0.0, 40.0), double_b: 0.8, subjets, mother_id: 0 }
    }

    #[test]
    fn jet_near_subjet_is_removed() {
        let fj = fat_with(vec![P4::new(60.0, 0.0, 0.0, 5.0)]);
        let out = clean_overlaps(&[bjet(40.0, 0.0, 0.2)], &[fj]);
        assert!(out.is_empty());
    }

    #[test]
    fn jet_outside_cone_survives() {
        let fj = fat_with(vec![P4::new(60.0, 0.0, 0.0, 5.0)]);
        let out = clean_overlaps(&[bjet(40.0, 0.0, 0.5)], &[fj]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn any_subjet_of_any_fat_jet_disqualifies() {
        // the overlapping subjet is not the last one in its list
        let a = fat_with(vec![P4::new(60.0, 0.0, 1.0, 5.0), P4::new(60.0, 0.0, 2.5, 5.0)]);
        let b = fat_with(vec![P4::new(60.0, 1.5, -2.0, 5.0)]);
        let jets = [bjet(40.0, 0.0, 1.1), bjet(30.0, 1.5, -2.1), bjet(20.0, -1.5, -1.0)];
        let out = clean_overlaps(&jets, &[a, b]);
        assert_eq!(out, vec![jets[2].clone()]);
    }

    #[test]
    fn no_fat_jets_keeps_everything() {
        let jets = [bjet(40.0, 0.0, 1.1), bjet(30.0, 1.5, -2.1)];
        assert_eq!(clean_overlaps(&jets, &[]), jets.to_vec());
    }

    #[test]
    fn truth_half_follows_cleaned_reco() {
        let mut sig = bjet(50.0, 0.0, 2.0);
        sig.mother_id = SIGNAL_MOTHER_ID;
        let mut sig_near = bjet(45.0, 0.0, 0.1);
        sig_near.mother_id = SIGNAL_MOTHER_ID;
        let mut bjets = Selection::new(true);
        bjets.push(sig.clone(), true);
        bjets.push(sig_near, true);
        bjets.push(bjet(30.0, 1.0, -2.0), false);
        let mut fats = Selection::new(true);
        fats.push(fat_with(vec![P4::new(60.0, 0.0, 0.0, 5.0)]), false);

        let cleaned = clean_selection(&bjets, &fats);
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned.truth.as_deref(), Some(&[sig][..]));
    }

    #[test]
    fn separation_defaults_without_fat_jets() {
        let s = separation(&bjet(40.0, 0.0, 0.0), &[]);
        assert_eq!(s, Separation { to_fat_jet: NO_MATCH_DR, to_subjet: NO_MATCH_DR });
    }

    #[test]
    fn separation_picks_minimum() {
        let a = fat_with(vec![P4::new(60.0, 0.0, 0.3, 5.0), P4::new(60.0, 0.0, -0.5, 5.0)]);
        let mut b = fat_with(vec![P4::new(60.0, 2.0, 1.0, 5.0)]);
        b.p4 = P4::new(200.0, 0.0, 1.2, 30.0);
        let s = separation(&bjet(40.0, 0.0, 1.0), &[a, b]);
        assert_relative_eq!(s.to_fat_jet, 0.2, epsilon = 1e-12);
        assert_relative_eq!(s.to_subjet, 0.7, epsilon = 1e-12);
    }

    fn arb_p4() -> impl Strategy<Value = P4> {
        (20.0f64..200.0, -2.4f64..2.4, -3.1f64..3.1).prop_map(|(pt, eta, phi)| P4::new(pt, eta, phi, 0.0))
    }

    proptest! {
        #[test]
        fn cleaning_is_subset_and_idempotent(
            jets in prop::collection::vec(arb_p4(), 0..8),
            subjets in prop::collection::vec(arb_p4(), 0..4),
        ) {
            let jets: Vec<Jet> = jets.into_iter().map(|p| bjet(p.pt, p.eta, p.phi)).collect();
            let fats = vec![fat_with(subjets)];
            let once = clean_overlaps(&jets, &fats);
            for j in &once {
                prop_assert!(jets.contains(j));
            }
            let twice = clean_overlaps(&once, &fats);
            prop_assert_eq!(once, twice);
        }
    }
}
