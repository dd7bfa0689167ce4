// src/services/mod.rs
pub mod generator;
pub mod hf_model;
pub mod message_store;
