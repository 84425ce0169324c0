use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fragbus::{
    force_unlink, Fragment, FragmentManager, FragmentRecord, SegmentConfig, SegmentManager,
};

fn benchmark_buffer_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("Segment_RoundTrip");

    for payload_size in [256usize, 4096, 65536].iter() {
        group.throughput(Throughput::Bytes(*payload_size as u64));
        group.bench_with_input(
            BenchmarkId::new("write_read_bytes", payload_size),
            payload_size,
            |b, &payload_size| {
                let key = 0xBE0C_0001;
                force_unlink(key).unwrap();
                let manager =
                    SegmentManager::attach(SegmentConfig::new(key, 8, payload_size)).unwrap();
                let payload = vec![0xA5u8; payload_size];
                let mut out = vec![0u8; payload_size];

                b.iter(|| {
                    let buffer = manager.acquire_for_writing(false).unwrap();
                    manager.write(buffer, &payload).unwrap();
                    manager.mark_full(buffer, None).unwrap();

                    let buffer = manager.acquire_for_reading().unwrap();
                    manager.read(buffer, &mut out).unwrap();
                    manager.mark_empty(buffer).unwrap();
                });
            },
        );
    }

    group.finish();
}

fn benchmark_fragment_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("Fragment_RoundTrip");

    for body_words in [16usize, 256, 4096].iter() {
        group.throughput(Throughput::Bytes((*body_words * 8) as u64));
        group.bench_with_input(
            BenchmarkId::new("write_read_fragment", body_words),
            body_words,
            |b, &body_words| {
                let key = 0xBE0C_0002;
                force_unlink(key).unwrap();
                let manager =
                    FragmentManager::attach(SegmentConfig::new(key, 8, (body_words + 8) * 8))
                        .unwrap();
                let mut sent = Fragment::with_ids(1, 0);
                sent.resize_body_bytes(body_words * 8);
                let mut received = Fragment::default();

                b.iter(|| {
                    manager.write_fragment(&sent, false).unwrap();
                    manager.read_fragment(&mut received).unwrap();
                });
            },
        );
    }

    group.finish();
}

fn benchmark_acquire_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("Segment_Acquire");

    group.bench_function("acquire_release_cycle", |b| {
        let key = 0xBE0C_0003;
        force_unlink(key).unwrap();
        let manager = SegmentManager::attach(SegmentConfig::new(key, 64, 64)).unwrap();

        b.iter(|| {
            let buffer = manager.acquire_for_writing(false).unwrap();
            manager.write(buffer, &[1u8; 8]).unwrap();
            manager.mark_full(buffer, None).unwrap();
            let buffer = manager.acquire_for_reading().unwrap();
            let mut out = [0u8; 8];
            manager.read(buffer, &mut out).unwrap();
            manager.mark_empty(buffer).unwrap();
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_buffer_round_trip,
    benchmark_fragment_round_trip,
    benchmark_acquire_contention
);
criterion_main!(benches);
