// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "scoring/mod.rs"]
pub mod scoring;

#[path = "audit/mod.rs"]
pub mod audit;
