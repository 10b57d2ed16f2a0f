//! Tanner graph of an LDPC code stored as flat edge arrays.
//!
//! Edges are numbered check by check: the edges of check `c` occupy
//! `cedges[c]..cedges[c + 1]` and `vedges[e]` is the variable node at the
//! other end of edge `e`. Decoder message buffers use the same numbering.

use crate::cs::ecc::description::parse_description;
use crate::cs::error::{Error, Result};
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Immutable bipartite graph between variable nodes and parity checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TannerGraph {
    /// Number of variable nodes (code length)
    length: usize,
    /// Variable index of every edge, concatenated check by check
    vedges: Vec<usize>,
    /// Prefix sums of the check degrees, `nchecks + 1` entries starting at 0
    cedges: Vec<usize>,
}

impl TannerGraph {
    /// Build a graph from per-check variable lists.
    ///
    /// The code length is one more than the largest variable index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when there are no checks or a check
    /// has no variables.
    pub fn from_rows<R: AsRef<[usize]>>(rows: &[R]) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::InvalidInput(
                "a code needs at least one parity check".to_string(),
            ));
        }

        let nedges = rows.iter().map(|r| r.as_ref().len()).sum();
        let mut vedges = Vec::with_capacity(nedges);
        let mut cedges = Vec::with_capacity(rows.len() + 1);
        cedges.push(0);

        for (c, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.is_empty() {
                return Err(Error::InvalidInput(format!("check {} has no variables", c)));
            }
            vedges.extend_from_slice(row);
            cedges.push(vedges.len());
        }

        let length = vedges.iter().max().map_or(0, |&v| v + 1);
        let graph = TannerGraph {
            length,
            vedges,
            cedges,
        };
        debug!(
            "tanner graph: {} variables, {} checks, {} edges, rate {:.4}",
            graph.length,
            graph.nchecks(),
            graph.nedges(),
            graph.rate()
        );
        Ok(graph)
    }

    /// Build a graph from the textual description format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] for a malformed description.
    pub fn from_description(text: &str) -> Result<Self> {
        Self::from_rows(&parse_description(text)?)
    }

    /// Read a description from `reader` and build its graph
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::from_description(&text)
    }

    /// Read a description file and build its graph
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    /// Create a regular code with Gallager's construction.
    ///
    /// The parity-check matrix is a stack of `column_weight` bands. The first
    /// band gives check `i` the variables `i * row_weight .. (i + 1) * row_weight`;
    /// every further band is a random column permutation of the first. Each
    /// variable therefore joins exactly `column_weight` checks and each check
    /// holds `row_weight` distinct variables.
    ///
    /// # Arguments
    ///
    /// * `n` - Code length
    /// * `column_weight` - Checks per variable
    /// * `row_weight` - Variables per check, must divide `n`
    /// * `rng` - Source of the band permutations
    pub fn regular<R: Rng + ?Sized>(
        n: usize,
        column_weight: usize,
        row_weight: usize,
        rng: &mut R,
    ) -> Result<Self> {
        if n == 0 || column_weight == 0 || row_weight == 0 {
            return Err(Error::InvalidInput(
                "code length and weights must be positive".to_string(),
            ));
        }
        if n % row_weight != 0 {
            return Err(Error::InvalidInput(format!(
                "row weight {} does not divide code length {}",
                row_weight, n
            )));
        }

        let band_checks = n / row_weight;
        let mut permutation: Vec<usize> = (0..n).collect();
        let mut rows = Vec::with_capacity(band_checks * column_weight);

        for band in 0..column_weight {
            if band > 0 {
                permutation.shuffle(rng);
            }
            rows.extend(permutation.chunks(row_weight).map(|chunk| {
                let mut row = chunk.to_vec();
                row.sort_unstable();
                row
            }));
        }

        Self::from_rows(&rows)
    }

    /// Number of variable nodes
    pub fn length(&self) -> usize {
        self.length
    }

    /// Number of parity checks
    pub fn nchecks(&self) -> usize {
        self.cedges.len() - 1
    }

    /// Number of edges
    pub fn nedges(&self) -> usize {
        self.vedges.len()
    }

    /// Design rate `(length - nchecks) / length`
    pub fn rate(&self) -> f64 {
        (self.length as f64 - self.nchecks() as f64) / self.length as f64
    }

    /// Variable node of every edge
    pub fn vedges(&self) -> &[usize] {
        &self.vedges
    }

    /// Edge range boundaries of the checks
    pub fn cedges(&self) -> &[usize] {
        &self.cedges
    }

    /// Variables of check `c`, `None` if there is no such check
    pub fn check(&self, c: usize) -> Option<&[usize]> {
        let start = *self.cedges.get(c)?;
        let end = *self.cedges.get(c.checked_add(1)?)?;
        Some(&self.vedges[start..end])
    }

    /// Iterate over the variable lists of all checks
    pub fn checks(&self) -> impl Iterator<Item = &[usize]> + '_ {
        self.cedges
            .windows(2)
            .map(move |w| &self.vedges[w[0]..w[1]])
    }

    /// Number of checks each variable takes part in
    pub fn variable_degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0; self.length];
        for &v in &self.vedges {
            degrees[v] += 1;
        }
        degrees
    }

    /// Whether the hard decision of `llr` satisfies every parity check.
    ///
    /// A negative LLR is read as a 1 bit. A check is satisfied when an even
    /// number of its variables are 1.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Range`] if `llr` does not hold one value per variable.
    pub fn is_codeword(&self, llr: &[f64]) -> Result<bool> {
        if llr.len() != self.length {
            return Err(Error::Range(format!(
                "LLR vector has {} entries, code length is {}",
                llr.len(),
                self.length
            )));
        }
        Ok(self.satisfies_all_checks(llr))
    }

    /// Unchecked variant of [`is_codeword`](Self::is_codeword) for the decoder loop
    pub(crate) fn satisfies_all_checks(&self, llr: &[f64]) -> bool {
        self.checks().all(|row| {
            row.iter().filter(|&&v| llr[v] < 0.0).count() % 2 == 0
        })
    }
}

/// Writes the graph in the description format, one check per line
impl fmt::Display for TannerGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (c, row) in self.checks().enumerate() {
            if c > 0 {
                writeln!(f, ";")?;
            }
            for (i, v) in row.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", v)?;
            }
        }
        writeln!(f, ".")
    }
}
