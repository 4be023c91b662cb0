pub mod config;
pub mod due;
pub mod medicine;
pub mod stats;
