//! Value transfer recorded inside a block.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A transfer of `amount` from `sender` to `recipient`.
///
/// Transactions carry no signature; the sender `"0"` marks a mining reward.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
}

impl Transaction {
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: u64) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
        }
    }

    /// JSON object with keys in lexicographic order.
    pub fn canonical_json(&self) -> Value {
        let mut object = Map::new();
        object.insert("amount".into(), Value::from(self.amount));
        object.insert("recipient".into(), Value::from(self.recipient.clone()));
        object.insert("sender".into(), Value::from(self.sender.clone()));
        Value::Object(object)
    }
}
