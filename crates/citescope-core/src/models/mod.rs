pub mod network;
pub mod work;

pub use network::*;
pub use work::*;
