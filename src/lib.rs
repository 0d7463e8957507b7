// src/lib.rs

pub mod analysis;
pub mod config;
pub mod error;
pub mod index;
pub mod llm;
pub mod service;
pub mod store;

pub use error::{PlantCareError, Result};
