//! Progressive Monte Carlo path tracing core: per-pixel decorrelated
//! random streams, balance-heuristic multiple importance sampling over a
//! direct-luminaire/BSDF mixture, Russian roulette termination, alias
//! method environment importance sampling, and a row-parallel
//! progressive accumulator with sample censoring.
//!
//! Display, tonemapping, encoding and scene I/O all live outside this
//! crate; it only produces per-pixel radiance accumulators.

pub mod alias;
pub mod bvh;
pub mod bxdf;
pub mod direct;
pub mod envmap;
pub mod math;
pub mod renderer;
pub mod rng;
pub mod sampling;
pub mod scene;

pub use alias::AliasTable;
pub use bxdf::{Bxdf, LambertianBrdf, ShadingPoint};
pub use envmap::{ConstantEnvironment, Environment, Image2d, ImageEnvironment};
pub use renderer::{radiance, EstimatorStats, Film, Pixel, RenderSettings, Renderer};
pub use rng::{Pcg32, RandomSource, SplitMix64, XoroshiroPlus128};
pub use scene::{Camera, Luminaire, Scene, SceneBuilder, SceneError, TriangleMesh};
