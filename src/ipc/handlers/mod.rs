pub mod assignments;
pub mod core;
pub mod grid;
pub mod plan;
pub mod reports;
