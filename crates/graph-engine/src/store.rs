use crate::error::{GraphError, LoadError};
use crate::graphml::{self, GraphmlDocument};
use crate::transaction::AccountId;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Attributes carried by every account node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAttrs {
    pub is_fraud: bool,
    pub customer_id: String,
}

/// Attributes carried by every aggregated sender -> receiver edge
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeAttrs {
    pub total_amount: f64,
    pub total_transactions: u64,
}

#[derive(Debug, Clone)]
struct AccountNode {
    id: AccountId,
    attrs: NodeAttrs,
}

/// In-memory directed transaction graph.
///
/// Holds at most one edge per ordered account pair. Iteration follows
/// load order for both nodes and edges.
#[derive(Debug, Default)]
pub struct GraphStore {
    graph: DiGraph<AccountNode, EdgeAttrs>,
    index: HashMap<AccountId, NodeIndex>,
    pairs: HashMap<(NodeIndex, NodeIndex), EdgeIndex>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and parse a GraphML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let text = fs::read_to_string(path)?;

        Self::from_graphml(&text)
    }

    /// Parse a GraphML document, validating every node and edge
    pub fn from_graphml(text: &str) -> Result<Self, LoadError> {
        let parsed = graphml::parse(text)?;
        let mut store = Self::new();

        for (id, attrs) in parsed.nodes {
            store.add_node(id, attrs)?;
        }

        for (sender, receiver, attrs) in parsed.edges {
            store.add_edge(sender, receiver, attrs)?;
        }

        Ok(store)
    }

    /// Serialize the current state, including every mutation since load
    pub fn export_graphml(&self) -> String {
        GraphmlDocument(self).to_string()
    }

    pub fn add_node(&mut self, id: AccountId, attrs: NodeAttrs) -> Result<(), LoadError> {
        if self.index.contains_key(&id) {
            return Err(LoadError::DuplicateNode(id));
        }

        let idx = self.graph.add_node(AccountNode {
            id: id.clone(),
            attrs,
        });
        self.index.insert(id, idx);

        Ok(())
    }

    pub fn add_edge(
        &mut self,
        sender: AccountId,
        receiver: AccountId,
        attrs: EdgeAttrs,
    ) -> Result<(), LoadError> {
        let endpoint = |id: &AccountId| {
            self.index
                .get(id)
                .copied()
                .ok_or_else(|| LoadError::UnknownEndpoint {
                    sender: sender.clone(),
                    receiver: receiver.clone(),
                    missing: id.clone(),
                })
        };

        let pair = (endpoint(&sender)?, endpoint(&receiver)?);

        if self.pairs.contains_key(&pair) {
            return Err(LoadError::DuplicateEdge { sender, receiver });
        }

        let edge = self.graph.add_edge(pair.0, pair.1, attrs);
        self.pairs.insert(pair, edge);

        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn has_node(&self, id: &AccountId) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &AccountId) -> Option<&NodeAttrs> {
        self.index.get(id).map(|&idx| &self.graph[idx].attrs)
    }

    pub fn has_edge(&self, sender: &AccountId, receiver: &AccountId) -> bool {
        self.edge_index(sender, receiver).is_some()
    }

    pub fn edge(&self, sender: &AccountId, receiver: &AccountId) -> Option<&EdgeAttrs> {
        self.edge_index(sender, receiver)
            .map(|edge| &self.graph[edge])
    }

    /// Fold one more transfer of `delta` into an existing edge.
    ///
    /// Never creates an edge: an unknown pair is an error. Neither total is
    /// written when either would leave its range.
    pub fn upsert_edge_amount(
        &mut self,
        sender: &AccountId,
        receiver: &AccountId,
        delta: f64,
    ) -> Result<&EdgeAttrs, GraphError> {
        let edge = self
            .edge_index(sender, receiver)
            .ok_or_else(|| GraphError::EdgeNotFound {
                sender: sender.clone(),
                receiver: receiver.clone(),
            })?;

        let attrs = &mut self.graph[edge];
        let total_amount = attrs.total_amount + delta;
        let total_transactions = attrs
            .total_transactions
            .checked_add(1)
            .filter(|_| total_amount.is_finite())
            .ok_or_else(|| GraphError::TotalOverflow {
                sender: sender.clone(),
                receiver: receiver.clone(),
            })?;

        attrs.total_amount = total_amount;
        attrs.total_transactions = total_transactions;

        Ok(attrs)
    }

    /// Nodes in load order
    pub fn nodes(&self) -> impl Iterator<Item = (&AccountId, &NodeAttrs)> {
        self.graph
            .node_weights()
            .map(|node| (&node.id, &node.attrs))
    }

    /// Edges in load order as `(sender, receiver, attrs)`
    pub fn edges(&self) -> impl Iterator<Item = (&AccountId, &AccountId, &EdgeAttrs)> {
        self.graph.edge_references().map(|edge| {
            (
                &self.graph[edge.source()].id,
                &self.graph[edge.target()].id,
                edge.weight(),
            )
        })
    }

    fn edge_index(&self, sender: &AccountId, receiver: &AccountId) -> Option<EdgeIndex> {
        let pair = (*self.index.get(sender)?, *self.index.get(receiver)?);

        self.pairs.get(&pair).copied()
    }
}
