pub mod greedy;
pub mod sampler;
pub mod temperature;
pub mod top_p;

pub use greedy::{DistSampler, GreedySampler};
pub use sampler::{log_softmax_at, softmax, Sampler, SamplerChain, TokenLogit};
pub use temperature::TemperatureSampler;
pub use top_p::TopPSampler;
