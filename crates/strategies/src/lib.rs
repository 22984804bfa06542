mod context;
mod engine;
mod error;
mod lock;
mod pair_arbitrage;
mod profit_search;
mod strategy;
mod triangle_arbitrage;

pub use context::*;
pub use engine::{ArbitrageEngine, EngineControl, EngineSettings, EngineSnapshot, EngineState};
pub use error::ArbitrageError;
pub use lock::{FileLock, LockGuard};
pub use pair_arbitrage::PairArbitrage;
pub use profit_search::{aggregate, ProbeSource, ProfitSearch};
pub use strategy::{ArbitrageStrategy, PairOutcome, ScaledAmounts};
pub use triangle_arbitrage::{vault_deltas_to_gains, TriangleArbitrage};
