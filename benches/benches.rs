use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mx2482::{mixer, MemoryPorts, SubgroupPair};

const SAMPLE_RATE: u32 = 48_000;
const CHANNELS: u32 = 24;

fn process_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("process block");

    for block_size in [64, 256, 1024] {
        let mut ports = MemoryPorts::new(SAMPLE_RATE, block_size);
        let (m, mut engine) = mixer(CHANNELS, block_size, SAMPLE_RATE, &mut ports).unwrap();

        for (i, channel) in m.channels().iter().enumerate() {
            channel.set_equalizer_enabled(true);
            channel.set_low_amount(3);
            channel.set_mid_amount(-4);
            channel.set_high_amount(2);
            channel.set_in_subgroup_pair(SubgroupPair::ALL[i % 4], true);
            channel.set_on_main(i % 3 == 0);

            let key = ports.key(&format!("ch{}_in", i + 1)).unwrap();
            for (n, sample) in ports.input_mut(key).iter_mut().enumerate() {
                *sample = ((n + i) as f32 * 0.01).sin() * 0.5;
            }
        }

        group.bench_with_input(
            BenchmarkId::from_parameter(block_size),
            &block_size,
            |b, _| b.iter(|| engine.process(black_box(&mut ports))),
        );
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default();
    targets = process_block
}
criterion_main!(benches);
