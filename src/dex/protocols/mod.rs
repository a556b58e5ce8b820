pub mod jupiter;
pub mod raydium;

pub use jupiter::{JupiterProtocol, JUPITER_API_URL};
pub use raydium::{RaydiumProtocol, RAYDIUM_API_URL, RAYDIUM_FEE_API_URL};
