//! Domain records shared by the stores, the balance engine, and the report engine.
//!
//! # Sign convention
//! Ledger amounts are stored already signed, and every component reads them the
//! same way:
//! - Customer: a sale or charge is positive (debt rises), a payment is negative.
//! - Supplier: a purchase is positive (the shop owes more), a payment to the
//!   supplier is negative.
//! - Cash account: inflow is positive, outflow is negative.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LedgerError;

/// Kind of entity that owns a running balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Customer,
    Supplier,
    CashAccount,
}

impl EntityType {
    pub const ALL: [EntityType; 3] = [
        EntityType::Customer,
        EntityType::Supplier,
        EntityType::CashAccount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Customer => "customer",
            EntityType::Supplier => "supplier",
            EntityType::CashAccount => "cash_account",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "customer" | "customers" => Ok(EntityType::Customer),
            "supplier" | "suppliers" => Ok(EntityType::Supplier),
            "cash_account" | "cash_accounts" | "cashaccount" => Ok(EntityType::CashAccount),
            other => Err(LedgerError::InvalidArgument(format!(
                "unknown entity type: {}",
                other
            ))),
        }
    }
}

/// Financial event kind recorded on the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Sale,
    Payment,
    Purchase,
    Expense,
    Withdrawal,
    Adjustment,
    Transfer,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Sale => "sale",
            EntryKind::Payment => "payment",
            EntryKind::Purchase => "purchase",
            EntryKind::Expense => "expense",
            EntryKind::Withdrawal => "withdrawal",
            EntryKind::Adjustment => "adjustment",
            EntryKind::Transfer => "transfer",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sale" => Ok(EntryKind::Sale),
            "payment" => Ok(EntryKind::Payment),
            "purchase" => Ok(EntryKind::Purchase),
            "expense" => Ok(EntryKind::Expense),
            "withdrawal" => Ok(EntryKind::Withdrawal),
            "adjustment" => Ok(EntryKind::Adjustment),
            "transfer" => Ok(EntryKind::Transfer),
            other => Err(LedgerError::InvalidArgument(format!(
                "unknown entry kind: {}",
                other
            ))),
        }
    }
}

/// Immutable, append-only ledger record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub entity_type: EntityType,
    pub entity_id: i64,
    pub kind: EntryKind,
    pub amount: Decimal,
    pub occurred_at: NaiveDateTime,
    pub related_invoice_id: Option<i64>,
}

/// Cached balance rollup, written only by the balance aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub entity_id: i64,
    pub entity_type: EntityType,
    pub balance: Decimal,
    pub last_recalculated_at: NaiveDateTime,
}

/// Restricts a query to one entity kind, optionally one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityScope {
    pub entity_type: EntityType,
    pub entity_id: Option<i64>,
}

impl EntityScope {
    pub fn of_type(entity_type: EntityType) -> Self {
        Self {
            entity_type,
            entity_id: None,
        }
    }

    pub fn entity(entity_type: EntityType, entity_id: i64) -> Self {
        Self {
            entity_type,
            entity_id: Some(entity_id),
        }
    }

    pub fn matches(&self, entity_type: EntityType, entity_id: i64) -> bool {
        self.entity_type == entity_type && self.entity_id.map_or(true, |id| id == entity_id)
    }
}

/// Customer, supplier, or cash account known to the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: i64,
    pub entity_type: EntityType,
    pub name: String,
}

/// Catalog product with its current stock level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub quantity: i64,
    pub reorder_level: i64,
    pub cost_price: Decimal,
    pub sale_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub unit_cost: Decimal,
}

impl InvoiceLine {
    pub fn revenue(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    pub fn cost(&self) -> Decimal {
        self.unit_cost * Decimal::from(self.quantity)
    }
}

/// Sales invoice issued to a customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub customer_id: i64,
    pub number: String,
    pub issued_at: NaiveDateTime,
    pub due_date: NaiveDate,
    pub total: Decimal,
    pub paid_amount: Decimal,
    pub lines: Vec<InvoiceLine>,
}

impl Invoice {
    /// Amount still owed, never negative
    pub fn outstanding(&self) -> Decimal {
        (self.total - self.paid_amount).max(Decimal::ZERO)
    }
}

/// Operating expense, optionally paid from a cash account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub category: String,
    pub amount: Decimal,
    pub occurred_at: NaiveDateTime,
    pub cash_account_id: Option<i64>,
}
