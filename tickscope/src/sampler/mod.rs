//! The sampling engine: capture policies, session lifecycle, scheduling.
//!
//! A [`SamplerBuilder`] binds the policies together and hands back a running
//! [`Sampler`]; everything else in this module is a closed policy set
//! dispatched at a single match site.

pub mod builder;
pub mod disambiguator;
pub mod dumper;
pub mod grouper;
pub mod session;

pub use builder::SamplerBuilder;
pub use disambiguator::{ClassMetadata, MethodDescription, MethodDisambiguator};
pub use dumper::ThreadDumper;
pub use grouper::ThreadGrouper;
pub use session::{Sampler, SamplerStats, SamplerStatus};
