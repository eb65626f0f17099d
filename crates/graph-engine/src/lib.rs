pub mod engine;
pub mod error;
mod graphml;
pub mod store;
pub mod transaction;

pub use engine::GraphDatabase;
pub use error::{GraphError, LoadError, Side};
pub use store::GraphStore;
pub use transaction::{
    Account, AccountId, AggregatedTransactionBetweenSenderReceiver, NewTransaction,
    TransactionFilter,
};
