use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Canonical account identifier.
///
/// Graph node ids are strings; numeric ids arriving over the wire are
/// converted here, once, and never compared as numbers afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for AccountId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for AccountId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(id) => Self(id),
            RawId::Signed(id) => Self(id.to_string()),
            RawId::Unsigned(id) => Self(id.to_string()),
        })
    }
}

/// Account as exposed to clients, projected from a graph node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    pub id: AccountId,
    pub customer_id: String,
    pub fraudulent: bool,
    pub fraud_probability: f64,
}

/// All transfers from one sender to one receiver, folded into a single edge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedTransactionBetweenSenderReceiver {
    pub sender: Account,
    pub receiver: Account,
    pub total_amount: f64,
    pub total_transactions: u64,
    pub fraud_probability: f64,
}

/// Request body for recording a transfer
#[derive(Debug, Clone, Deserialize)]
pub struct NewTransaction {
    pub sender_id: AccountId,
    pub receiver_id: AccountId,
    pub total_amount: f64,
}

/// Sender/receiver filter for transaction queries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub sender_id: Option<AccountId>,
    pub receiver_id: Option<AccountId>,
}

impl TransactionFilter {
    /// Build a filter from raw query values. Empty strings count as absent.
    pub fn new(sender_id: Option<&str>, receiver_id: Option<&str>) -> Self {
        let present = |id: Option<&str>| id.filter(|id| !id.is_empty()).map(AccountId::from);

        Self {
            sender_id: present(sender_id),
            receiver_id: present(receiver_id),
        }
    }

    /// Whether the edge `sender -> receiver` is selected.
    ///
    /// With both ids set only the exact pair matches. Otherwise the sender
    /// must match and a set receiver must not differ, so a receiver-only
    /// filter selects nothing.
    pub fn matches(&self, sender: &AccountId, receiver: &AccountId) -> bool {
        match (&self.sender_id, &self.receiver_id) {
            (Some(want_sender), Some(want_receiver)) => {
                want_sender == sender && want_receiver == receiver
            }
            (want_sender, want_receiver) => {
                let sender_matches = want_sender.as_ref().is_some_and(|id| id == sender);
                let receiver_differs = want_receiver.as_ref().is_some_and(|id| id != receiver);

                sender_matches && !receiver_differs
            }
        }
    }
}
