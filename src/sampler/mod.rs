mod clock;
mod error;
mod gate;
mod sampler;

pub use sampler::Sampler;
