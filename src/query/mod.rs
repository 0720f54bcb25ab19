pub mod find;
pub mod show;
pub mod stats;
