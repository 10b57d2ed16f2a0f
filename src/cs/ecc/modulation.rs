//! Pulse amplitude modulations and their bit-level demodulation.
//!
//! A block of `m` symbols carries `m * bits_per_symbol` code bits in
//! bit-plane order: bit `k` of symbol `i` is code bit `k * m + i`. For
//! example the 4-level block `[+3 +1 +1 -3 -3]` carries
//! `[0 0 0 1 1 | 1 0 0 1 1]`.
//!
//! The receiver turns every observation `y` into one LLR per bit position:
//!
//! ```text
//! LLR_k(y) = log sum_{s: bit k of s is 0} f(y - s) - log sum_{s: bit k of s is 1} f(y - s)
//! ```
//!
//! where `f` is the noise density.

use crate::cs::ecc::Result;
use crate::cs::error::Error;
use crate::math::stable::AlphaStableNoise;

/// Magnitude of the LLRs produced for a noiseless channel
pub const LLR_LIMIT: f64 = 1e300;

const BPSK_SYMBOLS: [f64; 2] = [-1.0, 1.0];
const BPSK_LABELS: [u8; 2] = [0b1, 0b0];

const ASK4_SYMBOLS: [f64; 4] = [-3.0, -1.0, 1.0, 3.0];
const ASK4_LABELS: [u8; 4] = [0b11, 0b10, 0b00, 0b01];

const ASK8_SYMBOLS: [f64; 8] = [-7.0, -5.0, -3.0, -1.0, 1.0, 3.0, 5.0, 7.0];
const ASK8_LABELS: [u8; 8] = [0b110, 0b111, 0b101, 0b100, 0b000, 0b001, 0b010, 0b011];

/// Amplitude modulation with 2, 4 or 8 levels.
///
/// Bit 0 of a label is its most significant bit and always encodes the sign
/// of the symbol (1 for negative amplitudes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modulation {
    /// Symbols ±1, label 1 for -1
    Bpsk,
    /// Symbols -3, -1, 1, 3 labelled 11, 10, 00, 01
    Ask4,
    /// Symbols -7..7 labelled 110, 111, 101, 100, 000, 001, 010, 011
    Ask8,
}

/// Noise model seen by the demodulator.
///
/// A zero scale describes a noiseless channel and produces hard LLRs of
/// magnitude [`LLR_LIMIT`].
#[derive(Debug, Clone, Copy)]
pub enum ChannelNoise<'a> {
    /// Additive white Gaussian noise with standard deviation `sigma`
    Gaussian {
        /// Noise standard deviation
        sigma: f64,
    },
    /// Symmetric alpha-stable noise with scale `gamma`
    AlphaStable {
        /// Density tables for the stability exponent in use
        model: &'a AlphaStableNoise,
        /// Scale factor
        gamma: f64,
    },
}

impl ChannelNoise<'_> {
    fn scale(&self) -> f64 {
        match *self {
            ChannelNoise::Gaussian { sigma } => sigma,
            ChannelNoise::AlphaStable { gamma, .. } => gamma,
        }
    }

    fn validate(&self) -> Result<()> {
        let scale = self.scale();
        if !scale.is_finite() || scale < 0.0 {
            return Err(Error::Range(format!(
                "noise scale must be finite and non-negative, got {}",
                scale
            )));
        }
        Ok(())
    }
}

impl Modulation {
    /// Modulation with `order` levels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Range`] unless `order` is 2, 4 or 8.
    pub fn from_order(order: usize) -> Result<Self> {
        match order {
            2 => Ok(Modulation::Bpsk),
            4 => Ok(Modulation::Ask4),
            8 => Ok(Modulation::Ask8),
            _ => Err(Error::Range(format!(
                "modulation order must be 2, 4 or 8, got {}",
                order
            ))),
        }
    }

    /// Number of levels `M`
    pub fn order(&self) -> usize {
        self.symbols().len()
    }

    /// `log2(M)`
    pub fn bits_per_symbol(&self) -> usize {
        match self {
            Modulation::Bpsk => 1,
            Modulation::Ask4 => 2,
            Modulation::Ask8 => 3,
        }
    }

    /// Symbol amplitudes in increasing order
    pub fn symbols(&self) -> &'static [f64] {
        match self {
            Modulation::Bpsk => &BPSK_SYMBOLS,
            Modulation::Ask4 => &ASK4_SYMBOLS,
            Modulation::Ask8 => &ASK8_SYMBOLS,
        }
    }

    /// Bit label of symbol `index`, `None` outside the alphabet
    pub fn label(&self, index: usize) -> Option<u8> {
        self.labels().get(index).copied()
    }

    /// Bit `k` of the label of symbol `index`, `None` when either is out of range
    pub fn bit(&self, index: usize, k: usize) -> Option<bool> {
        if k >= self.bits_per_symbol() {
            return None;
        }
        self.label(index).map(|_| self.label_bit(index, k))
    }

    /// Mean symbol energy `(M^2 - 1) / 3`
    pub fn average_energy(&self) -> f64 {
        let symbols = self.symbols();
        symbols.iter().map(|s| s * s).sum::<f64>() / symbols.len() as f64
    }

    /// Amplitudes of the symbols with the given indices.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Range`] for an index outside the alphabet.
    pub fn modulate(&self, indices: &[usize]) -> Result<Vec<f64>> {
        self.check_indices(indices)?;
        let symbols = self.symbols();
        Ok(indices.iter().map(|&i| symbols[i]).collect())
    }

    /// Write the code bits carried by `indices` in bit-plane order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Range`] for an index outside the alphabet or if
    /// `out` does not hold `indices.len() * bits_per_symbol` bits.
    pub fn offset_bits(&self, indices: &[usize], out: &mut [bool]) -> Result<()> {
        let m = indices.len();
        self.check_block(m, out.len())?;
        self.check_indices(indices)?;
        for k in 0..self.bits_per_symbol() {
            for (bit, &index) in out[k * m..(k + 1) * m].iter_mut().zip(indices) {
                *bit = self.label_bit(index, k);
            }
        }
        Ok(())
    }

    /// LLR of bit `k` for the observation `y`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Range`] if `k` is not a bit position of this
    /// modulation or the noise scale is negative or non-finite.
    pub fn llr(&self, y: f64, k: usize, noise: &ChannelNoise<'_>) -> Result<f64> {
        noise.validate()?;
        if k >= self.bits_per_symbol() {
            return Err(Error::Range(format!(
                "bit position {} out of range for {} bits per symbol",
                k,
                self.bits_per_symbol()
            )));
        }
        Ok(self.bit_llr(y, k, noise))
    }

    fn bit_llr(&self, y: f64, k: usize, noise: &ChannelNoise<'_>) -> f64 {
        if noise.scale() == 0.0 {
            return self.hard_llr(y, k);
        }

        match *noise {
            ChannelNoise::Gaussian { sigma } => {
                let scale = -0.5 / (sigma * sigma);
                let mut zero = LogSumExp::default();
                let mut one = LogSumExp::default();
                for (index, &s) in self.symbols().iter().enumerate() {
                    let exponent = scale * (y - s) * (y - s);
                    if self.label_bit(index, k) {
                        one.push(exponent);
                    } else {
                        zero.push(exponent);
                    }
                }
                zero.value() - one.value()
            }
            ChannelNoise::AlphaStable { model, gamma } => {
                if *self == Modulation::Bpsk {
                    // one symbol per subset, the log table is more accurate in the tails
                    return model.log_density(y - 1.0, gamma) - model.log_density(y + 1.0, gamma);
                }
                let (mut zero, mut one) = (0.0, 0.0);
                for (index, &s) in self.symbols().iter().enumerate() {
                    let p = model.density(y - s, gamma);
                    if self.label_bit(index, k) {
                        one += p;
                    } else {
                        zero += p;
                    }
                }
                zero.ln() - one.ln()
            }
        }
    }

    /// Demodulate a block of observations into bit-plane ordered LLRs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Range`] for a negative or non-finite noise scale or
    /// when `out` does not hold `received.len() * bits_per_symbol` values.
    pub fn demodulate_into(
        &self,
        received: &[f64],
        noise: &ChannelNoise<'_>,
        out: &mut [f64],
    ) -> Result<()> {
        noise.validate()?;
        let m = received.len();
        self.check_block(m, out.len())?;
        for k in 0..self.bits_per_symbol() {
            for (llr, &y) in out[k * m..(k + 1) * m].iter_mut().zip(received) {
                *llr = self.bit_llr(y, k, noise);
            }
        }
        Ok(())
    }

    /// Allocating variant of [`demodulate_into`](Self::demodulate_into)
    pub fn demodulate(&self, received: &[f64], noise: &ChannelNoise<'_>) -> Result<Vec<f64>> {
        let mut out = vec![0.0; received.len() * self.bits_per_symbol()];
        self.demodulate_into(received, noise, &mut out)?;
        Ok(out)
    }

    fn hard_llr(&self, y: f64, k: usize) -> f64 {
        let nearest = self
            .symbols()
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (y - **a).abs().total_cmp(&(y - **b).abs()))
            .map_or(0, |(index, _)| index);
        if self.label_bit(nearest, k) {
            -LLR_LIMIT
        } else {
            LLR_LIMIT
        }
    }

    fn labels(&self) -> &'static [u8] {
        match self {
            Modulation::Bpsk => &BPSK_LABELS,
            Modulation::Ask4 => &ASK4_LABELS,
            Modulation::Ask8 => &ASK8_LABELS,
        }
    }

    /// Bit `k` of label `index`, both already known to be in range
    fn label_bit(&self, index: usize, k: usize) -> bool {
        (self.labels()[index] >> (self.bits_per_symbol() - 1 - k)) & 1 == 1
    }

    fn check_indices(&self, indices: &[usize]) -> Result<()> {
        match indices.iter().position(|&i| i >= self.order()) {
            Some(position) => Err(Error::Range(format!(
                "symbol index {} at position {} outside a {}-level alphabet",
                indices[position],
                position,
                self.order()
            ))),
            None => Ok(()),
        }
    }

    fn check_block(&self, symbols: usize, bits: usize) -> Result<()> {
        if symbols * self.bits_per_symbol() != bits {
            return Err(Error::Range(format!(
                "{} symbols carry {} bits, buffer holds {}",
                symbols,
                symbols * self.bits_per_symbol(),
                bits
            )));
        }
        Ok(())
    }
}

/// Flip the sign of every LLR whose offset bit is 1.
///
/// After this the LLRs describe the all-zero codeword that was masked by the
/// offset before transmission.
///
/// # Errors
///
/// Returns [`Error::Range`] if the lengths differ.
pub fn apply_offset(llr: &mut [f64], offset: &[bool]) -> Result<()> {
    if llr.len() != offset.len() {
        return Err(Error::Range(format!(
            "{} LLRs but {} offset bits",
            llr.len(),
            offset.len()
        )));
    }
    for (l, &flip) in llr.iter_mut().zip(offset) {
        if flip {
            *l = -*l;
        }
    }
    Ok(())
}

/// Streaming `log(sum(exp(x_i)))`
#[derive(Debug, Clone, Copy)]
struct LogSumExp {
    max: f64,
    sum: f64,
}

impl Default for LogSumExp {
    fn default() -> Self {
        LogSumExp {
            max: f64::NEG_INFINITY,
            sum: 0.0,
        }
    }
}

impl LogSumExp {
    fn push(&mut self, x: f64) {
        if x == f64::NEG_INFINITY {
            return;
        }
        if x > self.max {
            self.sum = self.sum * (self.max - x).exp() + 1.0;
            self.max = x;
        } else {
            self.sum += (x - self.max).exp();
        }
    }

    fn value(&self) -> f64 {
        self.max + self.sum.ln()
    }
}
