use ethers::types::{Address, H256};
use serde::{Deserialize, Serialize};

/// 池子中的 Token 信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolToken {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
}

impl PoolToken {
    pub fn new(symbol: impl Into<String>, address: Address, decimals: u8) -> Self {
        Self {
            symbol: symbol.into(),
            address,
            decimals,
        }
    }

    /// 原生代币 (零地址) 不需要授权
    pub fn is_native(&self) -> bool {
        self.address == Address::zero()
    }
}

/// Vault 中注册的流动性池
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultPool {
    /// bytes32 pool id
    pub id: H256,
    /// 池子合约地址
    pub address: Address,
    /// 按 Vault 注册顺序排列的代币
    pub tokens: Vec<PoolToken>,
}

impl VaultPool {
    pub fn new(id: H256, address: Address, tokens: Vec<PoolToken>) -> Self {
        Self { id, address, tokens }
    }

    /// 按符号查找代币下标 (线性查找，大小写敏感)
    pub fn token_index(&self, symbol: &str) -> Option<usize> {
        self.tokens.iter().position(|t| t.symbol == symbol)
    }

    pub fn token(&self, index: usize) -> Option<&PoolToken> {
        self.tokens.get(index)
    }
}
