use crate::transaction::AccountId;
use std::fmt;
use std::io;
use thiserror::Error;

/// Which end of a transaction a lookup failed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Sender,
    Receiver,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sender => f.write_str("Sender"),
            Self::Receiver => f.write_str("Receiver"),
        }
    }
}

/// Failure while reading the serialized graph at start-up
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read graph file: {0}")]
    Io(#[from] io::Error),

    #[error("malformed GraphML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed GraphML attribute: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("GraphML document has no <graph> element")]
    MissingGraph,

    #[error("only directed graphs are supported")]
    Undirected,

    #[error("<{element}> is missing the `{attribute}` XML attribute")]
    MissingXmlAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("node {0} is declared more than once")]
    DuplicateNode(AccountId),

    #[error("edge {sender} -> {receiver} is declared more than once")]
    DuplicateEdge { sender: AccountId, receiver: AccountId },

    #[error("edge {sender} -> {receiver} references undeclared node {missing}")]
    UnknownEndpoint {
        sender: AccountId,
        receiver: AccountId,
        missing: AccountId,
    },

    #[error("{element} {id} is missing required attribute `{attribute}`")]
    MissingAttribute {
        element: &'static str,
        id: String,
        attribute: &'static str,
    },

    #[error("{element} {id} has invalid `{attribute}` value {value:?}")]
    InvalidValue {
        element: &'static str,
        id: String,
        attribute: &'static str,
        value: String,
    },
}

/// Failure of a query or mutation against a loaded graph
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("{side} {id} not found")]
    AccountNotFound { side: Side, id: AccountId },

    #[error("No transactions recorded between {sender} and {receiver}")]
    EdgeNotFound { sender: AccountId, receiver: AccountId },

    #[error("Totals between {sender} and {receiver} would overflow")]
    TotalOverflow { sender: AccountId, receiver: AccountId },

    #[error("Edge {sender} -> {receiver} references a missing account")]
    DanglingEdge { sender: AccountId, receiver: AccountId },
}
