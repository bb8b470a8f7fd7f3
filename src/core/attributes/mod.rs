pub mod consumer;
pub mod container;
pub mod producer;

// Re-export commonly used types
pub use consumer::Consumer;
pub use container::{AttributeContainer, ContainerBinder};
pub use producer::Producer;
