//! Soft-decision decoding of LDPC codes.
//!
//! This module provides:
//! - A parser for the textual parity-check description format
//! - Tanner graphs stored as flat edge arrays
//! - A flooding belief-propagation (sum-product) decoder
//! - 2, 4 and 8 level amplitude modulations with bit LLR demodulation
//!
//! # Examples
//!
//! ```rust
//! use bpsim::cs::ecc::{BeliefPropagationDecoder, TannerGraph};
//!
//! let graph = TannerGraph::from_description("0 1 2 4; 1 2 3 5; 0 2 3 6.").unwrap();
//! let mut decoder = BeliefPropagationDecoder::new(graph);
//!
//! // all-zero codeword with an unreliable, wrong bit 4
//! let llr = [2.0, 2.0, 2.0, 2.0, -0.5, 2.0, 2.0];
//! let decoded = decoder.decode(&llr, 50).unwrap();
//! assert_eq!(decoded.bit_errors(), 0);
//! ```

use crate::cs::error::Error;

/// Result type for decoding operations
pub type Result<T> = std::result::Result<T, Error>;

/// Iterative decoder working on channel LLRs.
///
/// Implementations own their scratch buffers, so one value serves one
/// thread. [`fork`](SoftDecoder::fork) makes another for a second thread.
pub trait SoftDecoder: Send {
    /// Code length in bits
    fn length(&self) -> usize;

    /// Code rate, information bits per code bit
    fn rate(&self) -> f64;

    /// Decode `llr` within `max_iterations` iterations
    fn decode(&mut self, llr: &[f64], max_iterations: usize) -> Result<Decoded<'_>>;

    /// Independent decoder for the same code
    fn fork(&self) -> Self
    where
        Self: Sized;
}

/// Parity-check description format
pub mod description;
/// Belief propagation decoding
pub mod ldpc;
/// Amplitude modulations and LLR computation
pub mod modulation;
/// Tanner graph storage
pub mod tanner;

pub use description::parse_description;
pub use ldpc::{BeliefPropagationDecoder, Decoded, DEFAULT_MAX_ITERATIONS};
pub use modulation::{apply_offset, ChannelNoise, Modulation, LLR_LIMIT};
pub use tanner::TannerGraph;
