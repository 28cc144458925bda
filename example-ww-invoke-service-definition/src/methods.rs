mod echo;
pub use echo::*;
mod greet;
pub use greet::*;
mod sum;
pub use sum::*;
