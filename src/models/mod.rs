pub mod candidate;
pub mod proxy;

pub use candidate::*;
pub use proxy::*;
