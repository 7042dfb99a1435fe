pub mod analysis;
pub mod catalog;
pub mod chart;
pub mod config;
pub mod dataset;
pub mod error;
pub mod histogram;
pub mod metadata;
pub mod model;
pub mod population;
pub mod report;
pub mod rng;
pub mod store;
pub mod synthesizer;
pub mod types;
