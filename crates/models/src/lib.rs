mod token;
mod definition;
mod swap;
mod profit;
mod transaction;
pub mod units;

pub use token::*;
pub use definition::*;
pub use swap::*;
pub use profit::*;
pub use transaction::*;
pub use units::UnitsError;
