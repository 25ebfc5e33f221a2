// src/questions/mod.rs
pub mod models;
