use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use haa_core::{Event, FatJet, HistogramSink, Jet, Lepton, P4};
use haa_select::{Analysis, ConstantCalibration, ObjectSelector, book_histograms};
use std::hint::black_box;

fn make_event(n_jets: usize, seed: u64) -> Event {
    // Deterministic pseudo-kinematics spread over the detector.
    let f = |i: usize, k: f64| (((seed as f64) * 0.37 + i as f64 * k).sin() + 1.0) * 0.5;
    let jets = (0..n_jets)
        .map(|i| Jet {
            p4: P4::new(20.0 + 200.0 * f(i, 1.3), -2.6 + 5.2 * f(i, 2.1), -3.1 + 6.2 * f(i, 0.7), 8.0),
            pass_loose_id: true,
            csv: f(i, 3.3),
            hadron_flavor: if i % 3 == 0 { 5 } else { 0 },
            mother_id: if i % 2 == 0 { 36 } else { 0 },
        })
        .collect();
    let fat_jets = (0..2)
        .map(|i| FatJet {
            p4: P4::new(250.0, -1.0 + 2.0 * f(i, 0.9), -3.1 + 6.2 * f(i, 1.7), 40.0),
            double_b: 0.5 + 0.4 * f(i, 0.3),
            subjets: (0..2).map(|k| P4::new(100.0, f(i + k, 0.5) - 0.5, f(i + k, 1.1) * 6.0 - 3.0, 8.0)).collect(),
            mother_id: 36,
        })
        .collect();
    let lepton = |id: i32, eta: f64, phi: f64| Lepton {
        p4: P4::new(45.0, eta, phi, 0.0),
        id,
        pass_id_mu: true,
        pass_iso_mu: true,
        pass_id_el: true,
        pass_iso_el: true,
    };
    Event {
        run: 1,
        lumi: 1,
        event: seed,
        gen_weight: 1.0,
        n_vtx: 20,
        n_true_pu: 25.0,
        leptons: vec![lepton(13, 0.3, 1.0), lepton(-11, -1.2, -2.0)],
        jets,
        fat_jets,
        ..Event::default()
    }
}

struct NullSink;

impl HistogramSink for NullSink {
    fn fill(&mut self, name: &str, tag: &str, value: f64, weight: f64) {
        black_box((name, tag, value, weight));
    }
}

fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_event");
    let analysis = Analysis::new(ObjectSelector::new(ConstantCalibration::default(), true));

    for n in [4usize, 8, 16, 32] {
        let ev = make_event(n, 12345);
        group.bench_with_input(BenchmarkId::new("select", n), &ev, |b, ev| {
            b.iter(|| black_box(analysis.select(black_box(ev))))
        });
    }
    group.finish();
}

fn bench_process(c: &mut Criterion) {
    let mut group = c.benchmark_group("process_event");
    let events: Vec<Event> = (0..64).map(|i| make_event(8, i)).collect();

    group.bench_function("null_sink", |b| {
        let mut analysis = Analysis::new(ObjectSelector::new(ConstantCalibration::default(), true));
        let mut sink = NullSink;
        b.iter(|| {
            for ev in &events {
                black_box(analysis.process(ev, &mut sink));
            }
        })
    });

    group.bench_function("histogram_book", |b| {
        let mut analysis = Analysis::new(ObjectSelector::new(ConstantCalibration::default(), true));
        let mut book = book_histograms().unwrap();
        b.iter(|| {
            for ev in &events {
                black_box(analysis.process(ev, &mut book));
            }
        })
    });
    group.finish();
}

criterion_group!(benches, bench_select, bench_process);
criterion_main!(benches);
