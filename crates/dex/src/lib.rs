pub mod balancer;
pub mod common;
pub mod revert_decoder;

pub use balancer::{BalancerVaultClient, NO_DEADLINE};
pub use common::{ChainClient, DexError, PoolProvider};
pub use revert_decoder::{DecodedRevertError, RevertDecoder, RevertErrorType};
