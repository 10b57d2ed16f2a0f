use bpsim::cs::ecc::{BeliefPropagationDecoder, ChannelNoise, Modulation, TannerGraph};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, Normal};

/// Channel LLRs of the all-zero codeword over BPSK with Gaussian noise
fn noisy_llr(length: usize, sigma: f64, rng: &mut ChaCha20Rng) -> Vec<f64> {
    let normal = Normal::new(0.0, sigma).unwrap();
    let received: Vec<f64> = (0..length).map(|_| 1.0 + normal.sample(rng)).collect();
    Modulation::Bpsk
        .demodulate(&received, &ChannelNoise::Gaussian { sigma })
        .unwrap()
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("bp_decode");
    let mut rng = ChaCha20Rng::seed_from_u64(1);

    for length in [96, 504, 1008].iter() {
        let graph = TannerGraph::regular(*length, 3, 6, &mut rng).unwrap();
        let mut decoder = BeliefPropagationDecoder::new(graph);
        let words: Vec<Vec<f64>> = (0..32).map(|_| noisy_llr(*length, 0.8, &mut rng)).collect();

        group.throughput(Throughput::Elements(*length as u64));
        group.bench_with_input(BenchmarkId::from_parameter(length), &words, |b, words| {
            let mut i = 0;
            b.iter(|| {
                i = (i + 1) % words.len();
                decoder.decode(black_box(&words[i]), 100).unwrap().iterations
            })
        });
    }
    group.finish();
}

fn bench_demodulate(c: &mut Criterion) {
    let mut group = c.benchmark_group("demodulate");
    let received: Vec<f64> = (0..1024).map(|i| (i as f64 * 0.37).sin() * 8.0).collect();
    let noise = ChannelNoise::Gaussian { sigma: 0.7 };

    for modulation in [Modulation::Bpsk, Modulation::Ask4, Modulation::Ask8] {
        let mut out = vec![0.0; received.len() * modulation.bits_per_symbol()];
        group.bench_function(BenchmarkId::from_parameter(modulation.order()), |b| {
            b.iter(|| {
                modulation
                    .demodulate_into(black_box(&received), &noise, &mut out)
                    .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_decode, bench_demodulate);
criterion_main!(benches);
