pub mod config;
pub mod errors;
pub mod infrastructure;
pub mod logging;
pub mod types;
pub mod utils;

// Re-export commonly used items for convenience
pub use config::{ComponentPath, ConfigurationData, InjectMode};
pub use errors::{AppError, ConfigError, InjectError};
pub use infrastructure::{
    global, Component, Container, FieldSpec, Injected, Instance, Registration, ServiceLifetime,
    Shape,
};
pub use types::{Args, FromValue, Value};
pub use utils::{describe, Describe, Node};
