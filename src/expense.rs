// Data models for the expense tracker

use serde::{Deserialize, Serialize};

/// A single recorded expense, as stored in the `expenses` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    /// `YYYY-MM-DD`, compared lexicographically
    pub date: String,
    pub amount: f64,
    pub category: String,
    pub subcategory: String,
    pub note: String,
}

/// An expense that has not been persisted yet (no id assigned)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpense {
    pub date: String,
    pub amount: f64,
    pub category: String,
    #[serde(default)]
    pub subcategory: String,
    #[serde(default)]
    pub note: String,
}

impl NewExpense {
    pub fn new(date: impl Into<String>, amount: f64, category: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            amount,
            category: category.into(),
            subcategory: String::new(),
            note: String::new(),
        }
    }

    pub fn with_subcategory(mut self, subcategory: impl Into<String>) -> Self {
        self.subcategory = subcategory.into();
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }
}

/// Per-category aggregate produced by the store's summarize query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    pub total: f64,
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_expense_defaults() {
        let expense = NewExpense::new("2024-01-05", 12.5, "Food & Dining");
        assert_eq!(expense.subcategory, "");
        assert_eq!(expense.note, "");

        let expense = expense.with_subcategory("Groceries").with_note("weekly shop");
        assert_eq!(expense.subcategory, "Groceries");
        assert_eq!(expense.note, "weekly shop");
    }

    #[test]
    fn test_new_expense_deserialize_missing_optionals() {
        let json = r#"{"date":"2024-01-05","amount":12.5,"category":"Travel"}"#;
        let expense: NewExpense = serde_json::from_str(json).unwrap();
        assert_eq!(expense.category, "Travel");
        assert_eq!(expense.subcategory, "");
        assert_eq!(expense.note, "");
    }

    #[test]
    fn test_expense_serialization_keys() {
        let expense = Expense {
            id: 7,
            date: "2024-01-05".to_string(),
            amount: -3.25,
            category: "Shopping".to_string(),
            subcategory: String::new(),
            note: "refund".to_string(),
        };

        let value = serde_json::to_value(&expense).unwrap();
        let obj = value.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(|k| k.as_str()).collect();
        keys.sort();
        assert_eq!(keys, vec!["amount", "category", "date", "id", "note", "subcategory"]);
        assert_eq!(value["amount"], -3.25);
    }
}
