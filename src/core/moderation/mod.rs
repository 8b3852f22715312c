// Core moderation module - the comment evaluation pipeline.
// Models, the pure decision engine, and the orchestrating service.

pub mod decision;
pub mod moderation_models;
pub mod moderation_service;

pub use moderation_models::*;
pub use moderation_service::*;
