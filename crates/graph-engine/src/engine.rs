use crate::error::{GraphError, LoadError, Side};
use crate::store::{EdgeAttrs, GraphStore};
use crate::transaction::{
    Account, AccountId, AggregatedTransactionBetweenSenderReceiver, TransactionFilter,
};
use parking_lot::RwLock;
use std::path::Path;
use tracing::{debug, info};

/// Placeholder until fraud scoring exists
const FRAUD_PROBABILITY: f64 = 0.0;

/// Query and mutation engine over the shared transaction graph.
///
/// Reads share the lock; a mutation holds it exclusively for the whole
/// lookup-and-fold, so both edge totals always change together.
#[derive(Debug, Default)]
pub struct GraphDatabase {
    store: RwLock<GraphStore>,
}

impl GraphDatabase {
    pub fn new(store: GraphStore) -> Self {
        Self {
            store: RwLock::new(store),
        }
    }

    /// Load the graph from a GraphML file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let store = GraphStore::load(path)?;

        info!(
            "Graph loaded from {}: {} nodes, {} edges",
            path.display(),
            store.node_count(),
            store.edge_count()
        );

        Ok(Self::new(store))
    }

    pub fn get_account(&self, id: &AccountId) -> Option<Account> {
        account(&self.store.read(), id)
    }

    pub fn list_accounts(&self) -> Vec<Account> {
        self.store
            .read()
            .nodes()
            .map(|(id, node)| Account {
                id: id.clone(),
                customer_id: node.customer_id.clone(),
                fraudulent: node.is_fraud,
                fraud_probability: FRAUD_PROBABILITY,
            })
            .collect()
    }

    pub fn query_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<AggregatedTransactionBetweenSenderReceiver>, GraphError> {
        let store = self.store.read();

        let transactions = store
            .edges()
            .filter(|(sender, receiver, _)| filter.matches(sender, receiver))
            .map(|(sender, receiver, edge)| aggregate(&store, sender, receiver, edge))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "Query {:?} matched {} transactions",
            filter,
            transactions.len()
        );

        Ok(transactions)
    }

    /// Fold a new transfer into the existing sender -> receiver edge
    pub fn record_transaction(
        &self,
        sender_id: &AccountId,
        receiver_id: &AccountId,
        amount: f64,
    ) -> Result<AggregatedTransactionBetweenSenderReceiver, GraphError> {
        let mut store = self.store.write();

        if !store.has_node(sender_id) {
            return Err(GraphError::AccountNotFound {
                side: Side::Sender,
                id: sender_id.clone(),
            });
        }

        if !store.has_node(receiver_id) {
            return Err(GraphError::AccountNotFound {
                side: Side::Receiver,
                id: receiver_id.clone(),
            });
        }

        let edge = store
            .upsert_edge_amount(sender_id, receiver_id, amount)?
            .clone();

        info!(
            "Recorded {amount} from {sender_id} to {receiver_id}: total {} over {} transactions",
            edge.total_amount, edge.total_transactions
        );

        aggregate(&store, sender_id, receiver_id, &edge)
    }

    pub fn export_graphml(&self) -> String {
        self.store.read().export_graphml()
    }

    pub fn node_count(&self) -> usize {
        self.store.read().node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.store.read().edge_count()
    }
}

fn account(store: &GraphStore, id: &AccountId) -> Option<Account> {
    store.node(id).map(|node| Account {
        id: id.clone(),
        customer_id: node.customer_id.clone(),
        fraudulent: node.is_fraud,
        fraud_probability: FRAUD_PROBABILITY,
    })
}

fn aggregate(
    store: &GraphStore,
    sender_id: &AccountId,
    receiver_id: &AccountId,
    edge: &EdgeAttrs,
) -> Result<AggregatedTransactionBetweenSenderReceiver, GraphError> {
    let endpoint = |id: &AccountId| {
        account(store, id)
            .map(|account| Account {
                fraudulent: false,
                ..account
            })
            .ok_or_else(|| GraphError::DanglingEdge {
                sender: sender_id.clone(),
                receiver: receiver_id.clone(),
            })
    };

    Ok(AggregatedTransactionBetweenSenderReceiver {
        sender: endpoint(sender_id)?,
        receiver: endpoint(receiver_id)?,
        total_amount: edge.total_amount,
        total_transactions: edge.total_transactions,
        fraud_probability: FRAUD_PROBABILITY,
    })
}
