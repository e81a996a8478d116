//! Money transfer between ledger accounts, with compensation.
//!
//! A transfer debits the source and then credits the destination. If the
//! credit fails the debit has already happened, so the action declares a
//! compensation that puts the money back. Debits are keyed by
//! `transfer_id`, which makes a retried attempt skip the debit it already
//! made and lets compensation refund exactly once.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};

use strand_contracts::{
    agent::Params,
    error::{StrandError, StrandResult},
    schema::{FieldSpec, FieldType},
};
use strand_core::{traits::Action, ActionOutput};

#[derive(Debug, Default)]
struct Books {
    balances: BTreeMap<String, i64>,
    frozen: BTreeSet<String>,
    /// Open debits by transfer id: (account, amount).
    debits: BTreeMap<String, (String, i64)>,
}

/// A shared set of account balances. Clones share the same books.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    books: Arc<Mutex<Books>>,
}

impl Ledger {
    pub fn new<'a>(accounts: impl IntoIterator<Item = (&'a str, i64)>) -> Self {
        let ledger = Self::default();
        {
            let mut books = ledger.lock();
            for (account, balance) in accounts {
                books.balances.insert(account.to_string(), balance);
            }
        }
        ledger
    }

    pub fn balance(&self, account: &str) -> Option<i64> {
        self.lock().balances.get(account).copied()
    }

    pub fn balances(&self) -> BTreeMap<String, i64> {
        self.lock().balances.clone()
    }

    /// Sum of every balance. Unchanged by a transfer that succeeded or was
    /// compensated.
    pub fn total(&self) -> i64 {
        self.lock().balances.values().sum()
    }

    /// Credits to a frozen account are refused.
    pub fn freeze(&self, account: &str) {
        self.lock().frozen.insert(account.to_string());
    }

    /// Take `amount` from `account` once per `transfer_id`.
    fn debit(&self, transfer_id: &str, account: &str, amount: i64) -> StrandResult<()> {
        let mut books = self.lock();
        if books.debits.contains_key(transfer_id) {
            return Ok(());
        }
        let balance = books
            .balances
            .get_mut(account)
            .ok_or_else(|| StrandError::execution("transfer", format!("unknown account '{account}'")))?;
        if *balance < amount {
            return Err(StrandError::execution(
                "transfer",
                format!("insufficient funds in '{account}': {balance} < {amount}"),
            ));
        }
        *balance -= amount;
        books
            .debits
            .insert(transfer_id.to_string(), (account.to_string(), amount));
        Ok(())
    }

    fn credit(&self, transfer_id: &str, account: &str, amount: i64) -> StrandResult<()> {
        let mut books = self.lock();
        if books.frozen.contains(account) {
            return Err(StrandError::execution("transfer", format!("account '{account}' is frozen")));
        }
        let balance = books
            .balances
            .get_mut(account)
            .ok_or_else(|| StrandError::execution("transfer", format!("unknown account '{account}'")))?;
        *balance += amount;
        books.debits.remove(transfer_id);
        Ok(())
    }

    /// Undo the open debit of `transfer_id`, if any. Returns the refund.
    fn refund(&self, transfer_id: &str) -> Option<(String, i64)> {
        let mut books = self.lock();
        let (account, amount) = books.debits.remove(transfer_id)?;
        *books.balances.entry(account.clone()).or_insert(0) += amount;
        Some((account, amount))
    }

    // Every mutation completes under a single lock, so a poisoned guard
    // still holds consistent books.
    fn lock(&self) -> MutexGuard<'_, Books> {
        self.books.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Moves `amount` from `from` to `to` in a [`Ledger`].
#[derive(Debug, Clone)]
pub struct Transfer {
    ledger: Ledger,
}

impl Transfer {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }
}

fn transfer_id(params: &Params) -> String {
    params
        .get("transfer_id")
        .and_then(Value::as_str)
        .unwrap_or("transfer")
        .to_string()
}

fn text<'a>(params: &'a Params, key: &str) -> &'a str {
    params.get(key).and_then(Value::as_str).unwrap_or_default()
}

#[async_trait]
impl Action for Transfer {
    fn name(&self) -> &str {
        "transfer"
    }

    fn description(&self) -> &str {
        "Move money between two ledger accounts"
    }

    fn schema(&self) -> Vec<FieldSpec> {
        vec![
            FieldSpec::required("transfer_id", FieldType::String),
            FieldSpec::required("from", FieldType::String),
            FieldSpec::required("to", FieldType::String),
            FieldSpec::required("amount", FieldType::Integer).with_constraints(json!({ "minimum": 1 })),
        ]
    }

    async fn run(&self, params: Params, _context: Params) -> StrandResult<ActionOutput> {
        let id = transfer_id(&params);
        let (from, to) = (text(&params, "from"), text(&params, "to"));
        let amount = params.get("amount").and_then(Value::as_i64).unwrap_or(0);

        self.ledger.debit(&id, from, amount)?;
        self.ledger.credit(&id, to, amount)?;
        info!(transfer_id = %id, from, to, amount, "transfer booked");

        Ok(ActionOutput::from_value(json!({
            "last_transfer": id,
            "transferred": amount,
        })))
    }

    fn compensates(&self) -> bool {
        true
    }

    async fn compensate(
        &self,
        params: Params,
        error: StrandError,
        _context: Params,
    ) -> StrandResult<Params> {
        let id = transfer_id(&params);
        let refunded = self.ledger.refund(&id);
        warn!(transfer_id = %id, error = %error, refunded = refunded.is_some(), "transfer compensated");

        let mut result = Params::new();
        result.insert("transfer_id".to_string(), json!(id));
        match refunded {
            Some((account, amount)) => {
                result.insert("refunded_account".to_string(), json!(account));
                result.insert("refunded_amount".to_string(), json!(amount));
            }
            None => {
                result.insert("refunded_amount".to_string(), json!(0));
            }
        }
        Ok(result)
    }
}
