pub mod methods;
pub use methods::*;
