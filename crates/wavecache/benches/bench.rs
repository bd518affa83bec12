use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::sync::Arc;
use tokio::runtime::Builder;
use wavecache::{
    DataClaimCheck, MemoryBackend, PositionBuffer, TimeRange, TimeseriesType, Waveform,
    WaveformStore, boundary::calculate_data_segment_bounds, claim_check::convert_to_position_buffer,
    windowed::slice_position_buffer,
};

// Samples per benchmark waveform: 40 minutes at 40 Hz.
const SAMPLES: usize = 96_000;
const SAMPLE_RATE: f64 = 40.0;
const DOMAIN: TimeRange = TimeRange::new(0.0, 2_400.0);

fn waveform() -> Waveform {
    Waveform {
        kind: TimeseriesType::Waveform,
        start_time: 0.0,
        end_time: (SAMPLES - 1) as f64 / SAMPLE_RATE,
        sample_rate: SAMPLE_RATE,
        sample_count: SAMPLES,
        samples: (0..SAMPLES).map(|i| (i as f64 * 0.01).sin() * 1_000.0).collect(),
    }
}

fn bench_convert(c: &mut Criterion) {
    let span = waveform();
    let mut group = c.benchmark_group("convert");
    group.throughput(Throughput::Elements(SAMPLES as u64));
    group.bench_function(format!("samples/{SAMPLES}"), |b| {
        b.iter(|| black_box(convert_to_position_buffer(black_box(&span), DOMAIN)));
    });
    group.finish();
}

fn bench_slice(c: &mut Criterion) {
    let buffer: PositionBuffer = match convert_to_position_buffer(&waveform(), DOMAIN) {
        Ok(buffer) => buffer,
        Err(e) => panic!("conversion failed: {e}"),
    };
    let mut group = c.benchmark_group("slice");
    for (name, start, end) in [("full", 0.0, 2_400.0), ("minute", 600.0, 660.0), ("miss", 3_000.0, 3_100.0)] {
        group.bench_function(name, |b| {
            b.iter(|| black_box(slice_position_buffer(black_box(&buffer), start, end, DOMAIN)));
        });
    }
    group.finish();
}

fn bench_bounds(c: &mut Criterion) {
    let rt = match Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => panic!("failed to build runtime: {e}"),
    };
    let span = waveform();
    let claim_check = DataClaimCheck {
        id: "bench".into(),
        start_time_secs: span.start_time,
        end_time_secs: span.end_time,
        sample_rate: span.sample_rate,
        domain_time_range: DOMAIN,
    };
    let store: WaveformStore = WaveformStore::new(Arc::new(MemoryBackend::default()));
    rt.block_on(async {
        let buffer = convert_to_position_buffer(&span, DOMAIN).unwrap();
        store.store(&claim_check.id, buffer).await.unwrap();
    });

    let (store, claim_check) = (&store, &claim_check);
    let mut group = c.benchmark_group("bounds");
    group.throughput(Throughput::Elements(SAMPLES as u64));
    group.bench_function("full", |b| {
        b.to_async(&rt).iter(|| async move {
            black_box(calculate_data_segment_bounds(store, claim_check, None, None).await)
        });
    });
    group.bench_function("minute", |b| {
        b.to_async(&rt).iter(|| async move {
            black_box(
                calculate_data_segment_bounds(store, claim_check, Some(600.0), Some(660.0)).await,
            )
        });
    });
    group.finish();
}

criterion_group!(benches, bench_convert, bench_slice, bench_bounds);
criterion_main!(benches);
