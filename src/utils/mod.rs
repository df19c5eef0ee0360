pub mod describe;

pub use describe::{describe, Describe, Node};
