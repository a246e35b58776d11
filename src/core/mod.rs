//! Core module - Configuration, published state, and events

pub mod config;
pub mod events;
pub mod state;
