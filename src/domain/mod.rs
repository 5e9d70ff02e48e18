mod account;
mod customer;
mod loan;
mod money;
mod transaction;

pub use account::*;
pub use customer::*;
pub use loan::*;
pub use money::*;
pub use transaction::*;
