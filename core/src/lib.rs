//! Measurement engine for `cfst`.
//!
//! * [`pipeline`]: sequences the stages of a run and ranks the survivors.
//! * [`sampler`]: draws candidate addresses from the configured ranges.
//! * [`scanner`]: TCP reachability probing and point-of-presence lookup.
//! * [`gate`]: rejects endpoints that refuse the test request.
//! * [`benchmark`]: multi-connection download throughput.
//! * [`scoring`]: the ranking formula.
//! * [`event`]: progress events and the sinks that receive them.

pub mod benchmark;
pub mod event;
pub mod gate;
pub mod network;
pub mod pipeline;
pub mod sampler;
pub mod scanner;
pub mod scoring;
