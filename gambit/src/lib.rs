//! A chess game core: rules, sessions, and validated moves from unreliable
//! external move services.

pub mod ai_game;
pub mod orchestrator;
pub mod persistence;
pub mod rules;
pub mod service;
pub mod service_match;
pub mod session;
