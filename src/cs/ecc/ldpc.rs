//! LDPC (Low-Density Parity-Check) belief propagation decoder.
//!
//! LDPC codes are linear block codes with sparse parity-check matrices,
//! introduced by Robert Gallager in 1962 and rediscovered in the 1990s.
//! Iterative belief propagation brings them close to the Shannon limit.
//!
//! This implementation provides:
//! - Flooding sum-product decoding in the tanh domain
//! - Early termination as soon as the hard decision is a codeword
//! - Message buffers reused across calls, one decoder per worker
//!
//! Only decoding is implemented. Simulations transmit the all-zero codeword
//! masked by a receiver-known offset, see [`apply_offset`].
//!
//! [`apply_offset`]: crate::cs::ecc::modulation::apply_offset

use crate::cs::ecc::tanner::TannerGraph;
use crate::cs::ecc::{Result, SoftDecoder};
use crate::cs::error::Error;
use std::sync::Arc;

/// Default iteration budget
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Magnitude of a check message whose incoming product reached ±1.
///
/// `tanh(x / 2)` already rounds to ±1 in `f64` well below this value, so the
/// sentinel behaves as a certain message while staying finite.
pub const SATURATED_CHECK_MESSAGE: f64 = 40.0;

/// Result of one decoding run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decoded<'a> {
    /// Iterations used, `max_iterations` when decoding did not converge
    pub iterations: usize,
    /// Output LLRs, one per variable
    pub llr: &'a [f64],
}

impl Decoded<'_> {
    /// Hard decision on the output LLRs (`true` = 1 bit)
    pub fn hard_decision(&self) -> Vec<bool> {
        self.llr.iter().map(|&l| l < 0.0).collect()
    }

    /// Number of bits not decided as 0 with certainty.
    ///
    /// When the transmitted word is all zero (offset already removed) this is
    /// the bit error count. A zero LLR is counted as an error.
    pub fn bit_errors(&self) -> usize {
        self.llr.iter().filter(|&&l| l <= 0.0).count()
    }
}

/// Sum-product decoder bound to one Tanner graph.
///
/// The graph is shared read-only, the message buffers are owned. Use
/// [`fork`](Self::fork) to obtain an independent decoder for another thread.
#[derive(Debug, Clone)]
pub struct BeliefPropagationDecoder {
    graph: Arc<TannerGraph>,
    /// Variable-to-check messages in the tanh domain, one per edge
    v2c: Vec<f64>,
    /// Check-to-variable messages as LLRs, one per edge
    c2v: Vec<f64>,
    /// Posterior LLRs of the last decoding run
    ollr: Vec<f64>,
}

impl BeliefPropagationDecoder {
    /// Create a decoder with buffers sized for `graph`
    pub fn new(graph: impl Into<Arc<TannerGraph>>) -> Self {
        let graph = graph.into();
        let nedges = graph.nedges();
        let length = graph.length();
        BeliefPropagationDecoder {
            graph,
            v2c: vec![0.0; nedges],
            c2v: vec![0.0; nedges],
            ollr: vec![0.0; length],
        }
    }

    /// The graph this decoder runs on
    pub fn graph(&self) -> &TannerGraph {
        &self.graph
    }

    /// New decoder on the same graph with its own message buffers
    pub fn fork(&self) -> Self {
        Self::new(Arc::clone(&self.graph))
    }

    /// Decode channel LLRs with belief propagation.
    ///
    /// # Arguments
    ///
    /// * `illr` - Channel LLRs, one per variable, negative meaning a 1 bit
    /// * `max_iterations` - Iteration budget
    ///
    /// # Returns
    ///
    /// The iteration count and the output LLRs. Iteration `i` (1-based) first
    /// tests the current LLRs, so a codeword input returns after one
    /// iteration with `llr == illr`. Running out of iterations is not an
    /// error: the caller tests the output with
    /// [`TannerGraph::is_codeword`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Range`] if `illr` has the wrong length or holds NaN.
    pub fn decode(&mut self, illr: &[f64], max_iterations: usize) -> Result<Decoded<'_>> {
        if illr.len() != self.graph.length() {
            return Err(Error::Range(format!(
                "LLR vector has {} entries, code length is {}",
                illr.len(),
                self.graph.length()
            )));
        }
        if illr.iter().any(|l| l.is_nan()) {
            return Err(Error::Range("LLR vector contains NaN".to_string()));
        }

        self.ollr.copy_from_slice(illr);
        for (m, &v) in self.v2c.iter_mut().zip(self.graph.vedges()) {
            *m = (illr[v] / 2.0).tanh();
        }

        for iteration in 0..max_iterations {
            if self.graph.satisfies_all_checks(&self.ollr) {
                return Ok(Decoded {
                    iterations: iteration + 1,
                    llr: &self.ollr,
                });
            }
            self.check_pass();
            self.data_pass(illr);
        }

        Ok(Decoded {
            iterations: max_iterations,
            llr: &self.ollr,
        })
    }

    /// Check-to-variable update.
    ///
    /// Each outgoing message combines the other incoming messages of the
    /// check. Prefix products are stored in `c2v` on the forward sweep and
    /// multiplied by suffix products on the backward sweep, so a check of
    /// degree `d` costs `O(d)` and no division is needed.
    fn check_pass(&mut self) {
        let cedges = self.graph.cedges();
        for bounds in cedges.windows(2) {
            let (start, end) = (bounds[0], bounds[1]);

            let mut prefix = 1.0;
            for e in start..end {
                self.c2v[e] = prefix;
                prefix *= self.v2c[e];
            }

            let mut suffix = 1.0;
            for e in (start..end).rev() {
                let product = self.c2v[e] * suffix;
                suffix *= self.v2c[e];
                self.c2v[e] = check_message(product);
            }
        }
    }

    /// Variable update: posterior LLRs, then extrinsic messages.
    fn data_pass(&mut self, illr: &[f64]) {
        let vedges = self.graph.vedges();

        self.ollr.copy_from_slice(illr);
        for (&v, &m) in vedges.iter().zip(&self.c2v) {
            self.ollr[v] += m;
        }

        for ((out, &v), &m) in self.v2c.iter_mut().zip(vedges).zip(&self.c2v) {
            *out = ((self.ollr[v] - m) / 2.0).tanh();
        }
    }
}

impl SoftDecoder for BeliefPropagationDecoder {
    fn length(&self) -> usize {
        self.graph.length()
    }

    fn rate(&self) -> f64 {
        self.graph.rate()
    }

    fn decode(&mut self, llr: &[f64], max_iterations: usize) -> Result<Decoded<'_>> {
        BeliefPropagationDecoder::decode(self, llr, max_iterations)
    }

    fn fork(&self) -> Self {
        BeliefPropagationDecoder::fork(self)
    }
}

/// `2 atanh(m)`, saturated to a finite value at `|m| >= 1`
fn check_message(product: f64) -> f64 {
    if product >= 1.0 {
        SATURATED_CHECK_MESSAGE
    } else if product <= -1.0 {
        -SATURATED_CHECK_MESSAGE
    } else {
        2.0 * product.atanh()
    }
}
