pub mod coupling;
pub mod manager;
pub mod validator;

// Re-export commonly used types
pub use coupling::{Coupling, CouplingId};
pub use manager::{CouplingManager, CouplingStats, CouplingUpdateReport};
pub use validator::CouplingValidator;
