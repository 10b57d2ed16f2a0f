//! Monte Carlo estimation of decoder error rates.
//!
//! Every simulated word is the all-zero codeword masked by a random symbol
//! sequence known to the receiver. The masked bits are modulated, sent
//! through the noisy channel, demodulated, unmasked by sign flips and
//! decoded. Any output LLR `<= 0` is a bit error.
//!
//! Words are simulated in rounds of `workers * batch_size`. Each worker owns
//! a forked decoder, its scratch buffers and a `ChaCha20Rng` on its own
//! stream, so a fixed seed and worker count reproduce the same counts.

use crate::cs::ecc::modulation::{apply_offset, ChannelNoise, Modulation};
use crate::cs::ecc::{SoftDecoder, DEFAULT_MAX_ITERATIONS};
use crate::cs::error::{Error, Result};
use crate::math::stable::AlphaStableNoise;
use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;

/// Channel noise family and the meaning of a simulation level
#[derive(Debug, Clone)]
pub enum NoiseModel {
    /// Gaussian noise, levels are Eb/N0 in dB
    Gaussian,
    /// Symmetric alpha-stable noise, levels are the scale `gamma`
    AlphaStable(Arc<AlphaStableNoise>),
}

impl NoiseModel {
    /// Noise scale for `level`: `sigma` for Gaussian noise, `gamma` otherwise.
    ///
    /// For Gaussian noise `sigma^2 = Es 10^(-EbN0 / 10) / (2 bits rate)` with
    /// `Es` the mean symbol energy of `modulation`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Range`] for a non-finite level or a negative `gamma`.
    pub fn scale(&self, level: f64, modulation: Modulation, rate: f64) -> Result<f64> {
        if !level.is_finite() {
            return Err(Error::Range(format!("level must be finite, got {}", level)));
        }
        match self {
            NoiseModel::Gaussian => {
                let bits = modulation.bits_per_symbol() as f64;
                let variance =
                    modulation.average_energy() * 10f64.powf(-level / 10.0) / (2.0 * bits * rate);
                Ok(variance.sqrt())
            }
            NoiseModel::AlphaStable(_) => {
                if level < 0.0 {
                    return Err(Error::Range(format!(
                        "noise scale must be non-negative, got {}",
                        level
                    )));
                }
                Ok(level)
            }
        }
    }

    /// Demodulator view of this model at scale `scale`
    pub fn channel(&self, scale: f64) -> ChannelNoise<'_> {
        match self {
            NoiseModel::Gaussian => ChannelNoise::Gaussian { sigma: scale },
            NoiseModel::AlphaStable(model) => ChannelNoise::AlphaStable {
                model,
                gamma: scale,
            },
        }
    }
}

impl fmt::Display for NoiseModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoiseModel::Gaussian => write!(f, "gaussian (level = Eb/N0 dB)"),
            NoiseModel::AlphaStable(model) => {
                write!(f, "alpha-stable, alpha {} (level = gamma)", model.alpha())
            }
        }
    }
}

/// Stopping rules and parallelism of a simulation
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Decoder iteration budget per word
    pub max_iterations: usize,
    /// Bit errors to collect before a level is finished
    pub min_bit_errors: usize,
    /// Word errors to collect before a level is finished
    pub min_word_errors: usize,
    /// Words after which a level is finished regardless of errors
    pub max_words: usize,
    /// Progress is logged every this many words
    pub report_every: usize,
    /// Seed of the per-worker generators
    pub seed: u64,
    /// Parallel workers
    pub workers: usize,
    /// Words per worker per round
    pub batch_size: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            min_bit_errors: 1000,
            min_word_errors: 100,
            max_words: 10_000_000,
            report_every: 1000,
            seed: 0,
            workers: rayon::current_num_threads(),
            batch_size: 64,
        }
    }
}

impl SimulationConfig {
    /// Set the decoder iteration budget per word
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the bit and word error counts that finish a level
    pub fn with_min_errors(mut self, bit_errors: usize, word_errors: usize) -> Self {
        self.min_bit_errors = bit_errors;
        self.min_word_errors = word_errors;
        self
    }

    /// Set the word cap per level
    pub fn with_max_words(mut self, max_words: usize) -> Self {
        self.max_words = max_words;
        self
    }

    /// Set the progress logging interval in words
    pub fn with_report_every(mut self, report_every: usize) -> Self {
        self.report_every = report_every;
        self
    }

    /// Set the seed shared by all worker generators
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the number of parallel workers
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the words each worker decodes per round
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    fn validate(&self) -> Result<()> {
        let counts = [
            ("max_iterations", self.max_iterations),
            ("min_bit_errors", self.min_bit_errors),
            ("min_word_errors", self.min_word_errors),
            ("max_words", self.max_words),
            ("report_every", self.report_every),
            ("workers", self.workers),
            ("batch_size", self.batch_size),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(Error::InvalidInput(format!("{} must be positive", name)));
            }
        }
        Ok(())
    }
}

/// Error counts collected at one level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointResult {
    /// Eb/N0 in dB or noise scale, see [`NoiseModel`]
    pub level: f64,
    /// Code length
    pub length: usize,
    /// Words decoded
    pub words: usize,
    /// Bits with output LLR `<= 0`
    pub bit_errors: usize,
    /// Words with at least one bit error
    pub word_errors: usize,
    /// Decoder iterations summed over all words
    pub iterations: usize,
}

impl PointResult {
    fn empty(level: f64, length: usize) -> Self {
        PointResult {
            level,
            length,
            words: 0,
            bit_errors: 0,
            word_errors: 0,
            iterations: 0,
        }
    }

    fn merge(&mut self, other: &PointResult) {
        self.words += other.words;
        self.bit_errors += other.bit_errors;
        self.word_errors += other.word_errors;
        self.iterations += other.iterations;
    }

    /// Bit error rate
    pub fn ber(&self) -> f64 {
        if self.words == 0 {
            return 0.0;
        }
        self.bit_errors as f64 / (self.words * self.length) as f64
    }

    /// Word (frame) error rate
    pub fn fer(&self) -> f64 {
        if self.words == 0 {
            return 0.0;
        }
        self.word_errors as f64 / self.words as f64
    }

    /// Average decoder iterations per word
    pub fn mean_iterations(&self) -> f64 {
        if self.words == 0 {
            return 0.0;
        }
        self.iterations as f64 / self.words as f64
    }
}

/// One report row: level, BER, FER, mean iterations, words, bit and word errors
impl fmt::Display for PointResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:8.3} {:12.4e} {:12.4e} {:8.2} {:10} {:10} {:8}",
            self.level,
            self.ber(),
            self.fer(),
            self.mean_iterations(),
            self.words,
            self.bit_errors,
            self.word_errors
        )
    }
}

/// Error rate simulation of one decoder, modulation and noise family
#[derive(Debug)]
pub struct Simulation<D> {
    decoder: D,
    modulation: Modulation,
    noise: NoiseModel,
    config: SimulationConfig,
}

impl<D: SoftDecoder> Simulation<D> {
    /// Set up a simulation around a prototype decoder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when a count in `config` is zero or
    /// the code length is not a multiple of the bits per symbol.
    pub fn new(
        decoder: D,
        modulation: Modulation,
        noise: NoiseModel,
        config: SimulationConfig,
    ) -> Result<Self> {
        config.validate()?;
        if decoder.length() % modulation.bits_per_symbol() != 0 {
            return Err(Error::InvalidInput(format!(
                "code length {} is not a multiple of {} bits per symbol",
                decoder.length(),
                modulation.bits_per_symbol()
            )));
        }
        Ok(Simulation {
            decoder,
            modulation,
            noise,
            config,
        })
    }

    /// Stopping rules and parallelism in use
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Modulation of the transmitted symbols
    pub fn modulation(&self) -> Modulation {
        self.modulation
    }

    /// Noise family, which also fixes the meaning of a level
    pub fn noise(&self) -> &NoiseModel {
        &self.noise
    }

    /// Simulate every level in turn
    pub fn run(&self, levels: &[f64]) -> Result<Vec<PointResult>> {
        levels.iter().map(|&level| self.run_point(level)).collect()
    }

    /// Simulate one level until the error targets or the word cap are reached.
    ///
    /// Workers restart from the configured seed at every level, so
    /// neighbouring levels see the same offsets and noise shapes.
    pub fn run_point(&self, level: f64) -> Result<PointResult> {
        let length = self.decoder.length();
        let scale = self.noise.scale(level, self.modulation, self.decoder.rate())?;
        let config = &self.config;
        debug!("level {}: noise scale {:.6}", level, scale);

        let mut workers: Vec<Worker<D>> = (0..config.workers)
            .map(|w| Worker::new(self.decoder.fork(), self.modulation, config.seed, w as u64))
            .collect();

        let mut total = PointResult::empty(level, length);
        while total.words < config.max_words
            && (total.bit_errors < config.min_bit_errors
                || total.word_errors < config.min_word_errors)
        {
            let remaining = config.max_words - total.words;
            let (modulation, noise) = (self.modulation, &self.noise);
            let tallies = workers
                .par_iter_mut()
                .enumerate()
                .map(|(w, worker)| {
                    let words = remaining
                        .saturating_sub(w * config.batch_size)
                        .min(config.batch_size);
                    worker.run(modulation, noise, scale, config.max_iterations, words, level)
                })
                .collect::<Result<Vec<PointResult>>>()?;

            let before = total.words;
            for tally in &tallies {
                total.merge(tally);
            }
            if total.words / config.report_every > before / config.report_every {
                debug!(
                    "level {}: {} words, {} bit errors, {} word errors",
                    level, total.words, total.bit_errors, total.word_errors
                );
            }
        }

        info!(
            "level {} done: ber {:.4e}, fer {:.4e}, {} words",
            level,
            total.ber(),
            total.fer(),
            total.words
        );
        Ok(total)
    }
}

/// Per-thread decoder, generator and scratch buffers
struct Worker<D> {
    decoder: D,
    rng: ChaCha20Rng,
    /// Transmitted symbol indices, the receiver-known offset
    indices: Vec<usize>,
    offset: Vec<bool>,
    received: Vec<f64>,
    llr: Vec<f64>,
}

impl<D: SoftDecoder> Worker<D> {
    fn new(decoder: D, modulation: Modulation, seed: u64, stream: u64) -> Self {
        let length = decoder.length();
        let symbols = length / modulation.bits_per_symbol();
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        rng.set_stream(stream);
        Worker {
            decoder,
            rng,
            indices: vec![0; symbols],
            offset: vec![false; length],
            received: vec![0.0; symbols],
            llr: vec![0.0; length],
        }
    }

    fn run(
        &mut self,
        modulation: Modulation,
        noise: &NoiseModel,
        scale: f64,
        max_iterations: usize,
        words: usize,
        level: f64,
    ) -> Result<PointResult> {
        let mut tally = PointResult::empty(level, self.llr.len());
        let channel = noise.channel(scale);
        let gaussian = Normal::new(0.0, scale).map_err(|e| Error::Range(e.to_string()))?;
        let symbols = modulation.symbols();

        for _ in 0..words {
            for index in self.indices.iter_mut() {
                *index = self.rng.gen_range(0..symbols.len());
            }
            modulation.offset_bits(&self.indices, &mut self.offset)?;

            for (y, &index) in self.received.iter_mut().zip(&self.indices) {
                let n = match noise {
                    NoiseModel::Gaussian => gaussian.sample(&mut self.rng),
                    NoiseModel::AlphaStable(model) => scale * model.sample(&mut self.rng),
                };
                *y = symbols[index] + n;
            }

            modulation.demodulate_into(&self.received, &channel, &mut self.llr)?;
            apply_offset(&mut self.llr, &self.offset)?;

            let decoded = self.decoder.decode(&self.llr, max_iterations)?;
            let errors = decoded.bit_errors();
            tally.words += 1;
            tally.bit_errors += errors;
            tally.word_errors += usize::from(errors > 0);
            tally.iterations += decoded.iterations;
        }
        Ok(tally)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cs::ecc::{BeliefPropagationDecoder, TannerGraph};
    use approx::assert_relative_eq;

    fn hamming_decoder() -> BeliefPropagationDecoder {
        BeliefPropagationDecoder::new(
            TannerGraph::from_description("0 1 2 4; 1 2 3 5; 0 2 3 6.").unwrap(),
        )
    }

    fn small_config() -> SimulationConfig {
        SimulationConfig::default()
            .with_workers(2)
            .with_batch_size(16)
            .with_seed(5)
    }

    #[test]
    fn test_gaussian_scale() {
        let noise = NoiseModel::Gaussian;
        // Es = 1, one bit per symbol, rate 1/2: sigma^2 = 10^(-EbN0/10)
        assert_relative_eq!(
            noise.scale(0.0, Modulation::Bpsk, 0.5).unwrap(),
            1.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            noise.scale(10.0, Modulation::Bpsk, 0.5).unwrap(),
            0.1f64.sqrt(),
            epsilon = 1e-12
        );
        // Es = 5, two bits per symbol, rate 1/2
        assert_relative_eq!(
            noise.scale(0.0, Modulation::Ask4, 0.5).unwrap(),
            2.5f64.sqrt(),
            epsilon = 1e-12
        );
        assert!(noise.scale(f64::NAN, Modulation::Bpsk, 0.5).is_err());
    }

    #[test]
    fn test_alpha_stable_scale() {
        let noise = NoiseModel::AlphaStable(Arc::new(AlphaStableNoise::new(1.5).unwrap()));
        assert_eq!(noise.scale(0.3, Modulation::Ask8, 0.5).unwrap(), 0.3);
        assert!(matches!(
            noise.scale(-0.3, Modulation::Bpsk, 0.5),
            Err(Error::Range(_))
        ));
    }

    #[test]
    fn test_config_validation() {
        for config in [
            SimulationConfig::default().with_workers(0),
            SimulationConfig::default().with_min_errors(0, 10),
            SimulationConfig::default().with_batch_size(0),
        ] {
            let result =
                Simulation::new(hamming_decoder(), Modulation::Bpsk, NoiseModel::Gaussian, config);
            assert!(matches!(result, Err(Error::InvalidInput(_))));
        }

        // seven bits do not fill 2-bit symbols
        let result = Simulation::new(
            hamming_decoder(),
            Modulation::Ask4,
            NoiseModel::Gaussian,
            SimulationConfig::default(),
        );
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_noiseless_channel_stops_at_word_cap() {
        let noise = NoiseModel::AlphaStable(Arc::new(AlphaStableNoise::new(1.5).unwrap()));
        let config = small_config().with_max_words(200);
        let simulation =
            Simulation::new(hamming_decoder(), Modulation::Bpsk, noise, config).unwrap();

        let result = simulation.run_point(0.0).unwrap();
        assert_eq!(result.words, 200);
        assert_eq!(result.bit_errors, 0);
        assert_eq!(result.word_errors, 0);
        assert_eq!(result.iterations, 200);
        assert_eq!(result.mean_iterations(), 1.0);
    }

    #[test]
    fn test_noisy_channel_reaches_error_targets() {
        let config = small_config().with_min_errors(50, 10).with_max_words(100_000);
        let simulation = Simulation::new(
            hamming_decoder(),
            Modulation::Bpsk,
            NoiseModel::Gaussian,
            config,
        )
        .unwrap();

        let result = simulation.run_point(-3.0).unwrap();
        assert!(result.bit_errors >= 50);
        assert!(result.word_errors >= 10);
        assert!(result.words < 100_000);
        assert!(result.word_errors <= result.words);
        assert!(result.ber() > 0.0 && result.ber() < 0.5);
    }

    #[test]
    fn test_fixed_seed_is_reproducible() {
        let config = small_config().with_min_errors(20, 5);
        let simulation = Simulation::new(
            hamming_decoder(),
            Modulation::Bpsk,
            NoiseModel::Gaussian,
            config,
        )
        .unwrap();

        let first = simulation.run(&[0.0, 2.0]).unwrap();
        let second = simulation.run(&[0.0, 2.0]).unwrap();
        assert_eq!(first, second);
        assert_eq!(first[1].level, 2.0);
    }

    #[test]
    fn test_point_result_rates() {
        let result = PointResult {
            level: 1.5,
            length: 100,
            words: 40,
            bit_errors: 20,
            word_errors: 4,
            iterations: 200,
        };
        assert_relative_eq!(result.ber(), 0.005);
        assert_relative_eq!(result.fer(), 0.1);
        assert_relative_eq!(result.mean_iterations(), 5.0);
        assert!(result.to_string().starts_with("   1.500"));

        let empty = PointResult::empty(0.0, 100);
        assert_eq!(empty.ber(), 0.0);
        assert_eq!(empty.fer(), 0.0);
    }
}
