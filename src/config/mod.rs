pub mod loader;
pub mod model;

// Re-export commonly used types
pub use loader::{ConfigFormat, ConfigLoader};
pub use model::{
    ComponentPath, ConfigurationData, Duplicate, FactoryDescription, InjectMode,
    InjectableDescription, InterfaceDescription,
};
