pub mod value;

pub use value::{Args, FromValue, Value};
