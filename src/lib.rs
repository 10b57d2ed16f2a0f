pub mod cs;
pub mod math;

pub use cs::ecc::{
    BeliefPropagationDecoder, ChannelNoise, Decoded, Modulation, SoftDecoder, TannerGraph,
};
pub use cs::error::{Error, Result};
pub use math::{AlphaStableNoise, NoiseModel, PointResult, Simulation, SimulationConfig};
