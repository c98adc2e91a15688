use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pgrc::dspf::{DspfParser, DspfWriter};
use pgrc::layout::{InstancePin, NetGeometry, Port, Via, Wire};
use pgrc::prelude::*;
use pgrc::tech::TechConfig;
use pgrc::Verifier;

/// `straps` M1 rails and M2 straps per net, pins every 5 um on the rails
fn synthetic_grid(straps: i64) -> Layout {
    let pitch = 10_000;
    let span = straps * pitch;
    let mut layout = Layout::new("BENCH", TechConfig::default());

    for (offset, name) in [(0, "VDD"), (pitch / 2, "VSS")] {
        let mut net = NetGeometry::new(name);
        for i in 0..straps {
            let y = i * pitch + offset;
            net.wires.push(Wire::horizontal("M1", y, 0, span, 200));
            for k in 0..(span / 5_000) {
                net.pins.push(InstancePin {
                    instance: format!("c_{}_{}", i, k),
                    pin: name.to_string(),
                    layer: "M1".to_string(),
                    x: k * 5_000 + offset,
                    y,
                });
            }
        }
        for j in 0..straps {
            let x = j * pitch + offset;
            net.wires.push(Wire::vertical("M2", x, 0, span, 400));
            for i in 0..straps {
                net.vias.push(Via {
                    bottom: "M1".to_string(),
                    via: "VIA12".to_string(),
                    x,
                    y: i * pitch + offset,
                });
            }
        }
        net.ports.push(Port {
            name: format!("{}_PIN", name),
            layer: "M2".to_string(),
            x: offset,
            y: span,
        });
        layout.nets.push(net);
    }
    layout
}

fn bench_extract(c: &mut Criterion) {
    let layout = synthetic_grid(40);

    c.bench_function("extract_grid_40", |b| {
        b.iter(|| PgrcCore::extract_layout(black_box(&layout), ExtractOptions::default()));
    });
}

fn bench_write_and_verify(c: &mut Criterion) {
    let layout = synthetic_grid(40);
    let extraction = PgrcCore::extract_layout(&layout, ExtractOptions::default()).unwrap();
    let writer = DspfWriter::new(WriterOptions::default());
    let text = writer.render(&extraction).unwrap();

    c.bench_function("write_dspf_grid_40", |b| {
        b.iter(|| writer.render(black_box(&extraction)));
    });
    c.bench_function("parse_dspf_grid_40", |b| {
        b.iter(|| DspfParser::default().parse_str(black_box(&text)));
    });
    c.bench_function("verify_dspf_grid_40", |b| {
        let verifier = Verifier::new(VerifyOptions::default());
        b.iter(|| verifier.verify_str(black_box(&text)));
    });
}

criterion_group!(benches, bench_extract, bench_write_and_verify);
criterion_main!(benches);
