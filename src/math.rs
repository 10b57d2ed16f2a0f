pub mod monte_carlo;
pub mod stable;

pub use monte_carlo::{NoiseModel, PointResult, Simulation, SimulationConfig};
pub use stable::AlphaStableNoise;
