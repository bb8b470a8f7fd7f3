pub mod attributes;
pub mod components;
pub mod couplings;
pub mod errors;
pub mod execution;
pub mod parallel;
pub mod persistence;
pub mod types;
pub mod values;
pub mod workspace;

#[cfg(test)]
mod tests;
