use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseItem {
    pub description: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct VenueExpense {
    pub id: Uuid,
    pub city_id: Uuid,
    pub venue_id: Uuid,
    pub month: i16,
    pub year: i32,
    #[sqlx(json)]
    pub expenses: Vec<ExpenseItem>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VenueExpense {
    pub fn total(&self) -> Decimal {
        self.expenses.iter().map(|item| item.amount).sum()
    }
}

/// Expense as returned to clients, with its computed total
#[derive(Debug, Clone, Serialize)]
pub struct VenueExpenseView {
    #[serde(flatten)]
    pub expense: VenueExpense,
    pub total: Decimal,
}

impl From<VenueExpense> for VenueExpenseView {
    fn from(expense: VenueExpense) -> Self {
        let total = expense.total();
        Self { expense, total }
    }
}
