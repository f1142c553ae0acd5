use approx::assert_relative_eq;
use haa_core::{Error, Event, EventId, EventSource, FatJet, Jet, Lepton, P4, Result};
use haa_select::{Analysis, ConstantCalibration, ObjectSelector, book_histograms, resolve_range};

struct Events(Vec<Event>);

impl EventSource for Events {
    fn total_entries(&self) -> usize {
        self.0.len()
    }

    fn get_entry(&mut self, index: usize) -> Result<Event> {
        self.0.get(index).cloned().ok_or_else(|| Error::Validation(format!("entry {index}")))
    }
}

fn electron(pt: f64, eta: f64, phi: f64) -> Lepton {
    Lepton {
        p4: P4::new(pt, eta, phi, 0.0),
        id: 11,
        pass_id_mu: false,
        pass_iso_mu: false,
        pass_id_el: true,
        pass_iso_el: true,
    }
}

fn sample(n: u64) -> Vec<Event> {
    (0..n)
        .map(|i| Event {
            run: 273_000,
            lumi: 10 + (i / 4) as u32,
            event: 5_000 + i,
            n_vtx: 10 + i as u32,
            leptons: if i % 3 == 0 { vec![] } else { vec![electron(35.0, 0.4, 0.0)] },
            jets: (0..(i % 6) as usize)
                .map(|k| Jet {
                    p4: P4::new(100.0 - 10.0 * k as f64, -1.0 + 0.3 * k as f64, 1.0 + 0.8 * k as f64, 6.0),
                    pass_loose_id: true,
                    csv: 0.9,
                    hadron_flavor: 5,
                    mother_id: 0,
                })
                .collect(),
            fat_jets: vec![FatJet {
                p4: P4::new(280.0, 0.0, -1.5, 50.0),
                double_b: 0.8,
                subjets: vec![P4::new(140.0, 0.1, -1.4, 10.0)],
                mother_id: 0,
            }],
            ..Event::default()
        })
        .collect()
}

#[test]
fn data_run_into_histogram_book() {
    let mut events = sample(12);
    events.push(events[4].clone());
    let mut source = Events(events);
    let range = resolve_range(source.total_entries(), 0, -1).unwrap();
    let mut book = book_histograms().unwrap();
    let mut log: Vec<EventId> = Vec::new();

    let mut analysis = Analysis::new(ObjectSelector::new(ConstantCalibration::default(), false));
    let summary = analysis.run(&mut source, range, &mut book, &mut log).unwrap();

    assert_eq!(summary.processed, 12);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.selected, 8);
    assert_eq!(log.len(), 8);

    let nvtx = book.get("nvtx_raw", "all").unwrap();
    assert_eq!(nvtx.entries, 12);
    assert_relative_eq!(nvtx.integral(), 12.0);
    assert_eq!(book.get("nvtx_raw", "e").unwrap().entries, 8);
    assert!(book.get("nvtx_raw", "mumu").is_none());

    let njets = book.get("njets_raw", "nj").unwrap();
    // i % 6 jets per event for i in 0..12: two events each with 0..=5 jets
    assert_relative_eq!(njets.bin_content[0], 2.0);
    assert_relative_eq!(njets.bin_content[4], 2.0);
    assert_relative_eq!(njets.overflow, 2.0);
    assert!(book.get("njets_raw", "nj_true").is_none());

    let dr = book.get("dR", "drmin_b1").unwrap();
    assert_eq!(dr.entries, 10);
    assert!(book.get("pileup", "all").is_none());
}

#[test]
fn partial_range() {
    let mut source = Events(sample(12));
    let range = resolve_range(source.total_entries(), 3, 6).unwrap();
    let mut book = book_histograms().unwrap();
    let mut log: Vec<EventId> = Vec::new();
    let mut analysis = Analysis::new(ObjectSelector::new(ConstantCalibration::default(), false));
    let summary = analysis.run(&mut source, range, &mut book, &mut log).unwrap();
    assert_eq!((summary.first, summary.end, summary.processed), (3, 6, 3));
    let ids: Vec<u64> = log.iter().map(|id| id.event).collect();
    assert_eq!(ids, vec![5_004, 5_005]);
}
