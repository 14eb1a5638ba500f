// Contracts Module - Read-only ABIs

pub mod erc20;
pub mod gauge;
pub mod vault_token;

// Public exports
pub use erc20::{Erc20, ERC20_ABI};
pub use gauge::{Gauge, GAUGE_ABI};
pub use vault_token::{VaultToken, VAULTTOKEN_ABI};
