//! Lepton-channel categorization.

use std::fmt;

use haa_core::LeptonFlavor;
use serde::Serialize;

use crate::selector::GoodLepton;

/// Final-state lepton channel of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Two electrons.
    Ee,
    /// Two muons.
    MuMu,
    /// One electron and one muon.
    EMu,
    /// Single electron.
    E,
    /// Single muon.
    Mu,
}

impl Channel {
    /// Every channel, dilepton first.
    pub const ALL: [Channel; 5] = [Channel::Ee, Channel::MuMu, Channel::EMu, Channel::E, Channel::Mu];

    /// Histogram tag of this channel.
    pub const fn as_str(self) -> &'static str {
        match self {
            Channel::Ee => "ee",
            Channel::MuMu => "mumu",
            Channel::EMu => "emu",
            Channel::E => "e",
            Channel::Mu => "mu",
        }
    }

    fn single(flavor: LeptonFlavor) -> Self {
        match flavor {
            LeptonFlavor::Electron => Channel::E,
            LeptonFlavor::Muon => Channel::Mu,
        }
    }

    fn pair(a: LeptonFlavor, b: LeptonFlavor) -> Self {
        match (a, b) {
            (LeptonFlavor::Electron, LeptonFlavor::Electron) => Channel::Ee,
            (LeptonFlavor::Muon, LeptonFlavor::Muon) => Channel::MuMu,
            _ => Channel::EMu,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel from good leptons in selection order.
///
/// One lepton gives a single-lepton channel; two or more use the first two.
/// No lepton means no channel.
pub fn categorize(leptons: &[GoodLepton]) -> Option<Channel> {
    match leptons {
        [] => None,
        [only] => Some(Channel::single(only.flavor)),
        [first, second, ..] => Some(Channel::pair(first.flavor, second.flavor)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haa_core::P4;

    fn lep(id: i32, pt: f64) -> GoodLepton {
        GoodLepton {
            id,
            flavor: LeptonFlavor::from_pdg_id(id).unwrap(),
            p4: P4::new(pt, 0.0, 0.0, 0.0),
        }
    }

    #[test]
    fn single_lepton() {
        assert_eq!(categorize(&[lep(13, 30.0)]), Some(Channel::Mu));
        assert_eq!(categorize(&[lep(-11, 30.0)]), Some(Channel::E));
    }

    #[test]
    fn pairs_ignore_charge() {
        assert_eq!(categorize(&[lep(11, 30.0), lep(-11, 40.0)]), Some(Channel::Ee));
        assert_eq!(categorize(&[lep(-13, 30.0), lep(13, 40.0)]), Some(Channel::MuMu));
        assert_eq!(categorize(&[lep(13, 30.0), lep(-11, 40.0)]), Some(Channel::EMu));
        assert_eq!(categorize(&[lep(11, 30.0), lep(13, 40.0)]), Some(Channel::EMu));
    }

    #[test]
    fn only_first_two_count() {
        let leptons = [lep(13, 30.0), lep(13, 20.0), lep(11, 90.0)];
        assert_eq!(categorize(&leptons), Some(Channel::MuMu));
    }

    #[test]
    fn empty_has_no_channel() {
        assert_eq!(categorize(&[]), None);
    }

    #[test]
    fn tags() {
        let tags: Vec<&str> = Channel::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(tags, ["ee", "mumu", "emu", "e", "mu"]);
        assert_eq!(Channel::MuMu.to_string(), "mumu");
    }
}
