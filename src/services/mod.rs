pub mod analysis;
pub mod heuristics;
pub mod metadata;
pub mod staging;
