//! Named operations exposed to remote callers.
//!
//! Each tool takes a typed argument struct. Arguments are deserialized from
//! the caller's JSON before anything reaches the store, so a wrong type or a
//! missing required field is rejected here rather than coerced.

use crate::categories::{CATEGORIES_MIME_TYPE, CATEGORIES_URI, CategoryCatalog};
use crate::expense::{CategorySummary, Expense, NewExpense};
use crate::filter::{DateRange, SummaryFilter};
use crate::store::ExpenseStore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use tracing::{info, warn};

pub const ADD_EXPENSE: &str = "add_expense";
pub const LIST_EXPENSES: &str = "list_expenses";
pub const SUMMARIZE: &str = "summarize";

// ---------------------------------------------------------------------------
// Arguments and results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddExpenseArgs {
    pub date: String,
    pub amount: f64,
    pub category: String,
    #[serde(default)]
    pub subcategory: String,
    #[serde(default)]
    pub note: String,
}

impl From<AddExpenseArgs> for NewExpense {
    fn from(args: AddExpenseArgs) -> Self {
        NewExpense::new(args.date, args.amount, args.category)
            .with_subcategory(args.subcategory)
            .with_note(args.note)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ListExpensesArgs {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SummarizeArgs {
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddExpenseResult {
    pub status: String,
    pub id: i64,
}

/// Tool metadata advertised through `tools/list`
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Resource metadata advertised through `resources/list`
#[derive(Debug, Clone, Serialize)]
pub struct ResourceDefinition {
    pub uri: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "mimeType")]
    pub mime_type: &'static str,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure of a tool call or resource read
#[derive(Debug)]
pub enum ToolError {
    /// No tool with this name
    UnknownTool(String),
    /// No resource with this URI
    UnknownResource(String),
    /// Arguments did not match the tool's input shape
    InvalidArguments { tool: String, message: String },
    /// The store (or the category file) failed while serving the call
    Failed(eyre::Report),
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolError::UnknownTool(name) => write!(f, "Unknown tool: {}", name),
            ToolError::UnknownResource(uri) => write!(f, "Unknown resource: {}", uri),
            ToolError::InvalidArguments { tool, message } => {
                write!(f, "Invalid arguments for {}: {}", tool, message)
            }
            ToolError::Failed(e) => write!(f, "{:#}", e),
        }
    }
}

impl std::error::Error for ToolError {}

impl From<eyre::Report> for ToolError {
    fn from(err: eyre::Report) -> Self {
        ToolError::Failed(err)
    }
}

// ---------------------------------------------------------------------------
// Tool surface
// ---------------------------------------------------------------------------

/// Adapter from named tool calls to the expense store
#[derive(Debug, Clone)]
pub struct ExpenseTools {
    store: ExpenseStore,
    catalog: CategoryCatalog,
}

impl ExpenseTools {
    pub fn new(store: ExpenseStore, catalog: CategoryCatalog) -> Self {
        Self { store, catalog }
    }

    pub fn add_expense(&self, args: AddExpenseArgs) -> eyre::Result<AddExpenseResult> {
        let id = self.store.add(&args.into())?;
        Ok(AddExpenseResult {
            status: "success".to_string(),
            id,
        })
    }

    pub fn list_expenses(&self, args: ListExpensesArgs) -> eyre::Result<Vec<Expense>> {
        self.store.list(&DateRange::new(args.start_date, args.end_date))
    }

    pub fn summarize(&self, args: SummarizeArgs) -> eyre::Result<Vec<CategorySummary>> {
        let filter = SummaryFilter::new(DateRange::new(args.start_date, args.end_date)).with_category(args.category);
        self.store.summarize(&filter)
    }

    /// The category list document as a JSON string
    pub fn categories(&self) -> eyre::Result<String> {
        self.catalog.read()
    }

    /// Invoke a tool by name with raw JSON arguments
    pub fn call(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        info!(tool = name, "Tool call");

        let result = self.dispatch(name, arguments);
        if let Err(e) = &result {
            warn!(tool = name, error = %e, "Tool call failed");
        }
        result
    }

    fn dispatch(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        match name {
            ADD_EXPENSE => to_value(self.add_expense(parse_args(name, arguments)?)?),
            LIST_EXPENSES => to_value(self.list_expenses(parse_args(name, arguments)?)?),
            SUMMARIZE => to_value(self.summarize(parse_args(name, arguments)?)?),
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    /// Read a resource by URI
    pub fn read_resource(&self, uri: &str) -> Result<String, ToolError> {
        match uri {
            CATEGORIES_URI => Ok(self.categories()?),
            _ => Err(ToolError::UnknownResource(uri.to_string())),
        }
    }
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, ToolError> {
    let arguments = match arguments {
        Value::Null => json!({}),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

fn to_value<T: Serialize>(result: T) -> Result<Value, ToolError> {
    serde_json::to_value(result).map_err(|e| ToolError::Failed(e.into()))
}

/// Definitions of every tool, in the order they are advertised
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: ADD_EXPENSE,
            description: "Add a new expense entry to the database.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "date": { "type": "string", "description": "Date of the expense (YYYY-MM-DD)" },
                    "amount": { "type": "number" },
                    "category": { "type": "string" },
                    "subcategory": { "type": "string", "default": "" },
                    "note": { "type": "string", "default": "" }
                },
                "required": ["date", "amount", "category"]
            }),
        },
        ToolDefinition {
            name: LIST_EXPENSES,
            description: "List expense entries within an inclusive date range, newest first.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "start_date": { "type": "string", "description": "First date (YYYY-MM-DD), inclusive" },
                    "end_date": { "type": "string", "description": "Last date (YYYY-MM-DD), inclusive" }
                },
                "required": ["start_date", "end_date"]
            }),
        },
        ToolDefinition {
            name: SUMMARIZE,
            description: "Summarize expenses by category within an inclusive date range.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "start_date": { "type": "string" },
                    "end_date": { "type": "string" },
                    "category": { "type": ["string", "null"], "default": null }
                },
                "required": ["start_date", "end_date"]
            }),
        },
    ]
}

/// Definitions of every resource
pub fn resource_definitions() -> Vec<ResourceDefinition> {
    vec![ResourceDefinition {
        uri: CATEGORIES_URI,
        name: "categories",
        description: "Expense categories to choose from when adding an expense.",
        mime_type: CATEGORIES_MIME_TYPE,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_tools() -> (TempDir, ExpenseTools) {
        let temp = TempDir::new().unwrap();
        let store = ExpenseStore::open(temp.path().join("expenses.db")).unwrap();
        let catalog = CategoryCatalog::new(temp.path().join("categories.json"));
        (temp, ExpenseTools::new(store, catalog))
    }

    #[test]
    fn test_add_then_list_scenario() {
        let (_temp, tools) = make_tools();

        let added = tools
            .call(
                ADD_EXPENSE,
                json!({ "date": "2024-01-05", "amount": 12.50, "category": "Food & Dining" }),
            )
            .unwrap();
        assert_eq!(added, json!({ "status": "success", "id": 1 }));

        let listed = tools
            .call(LIST_EXPENSES, json!({ "start_date": "2024-01-01", "end_date": "2024-01-31" }))
            .unwrap();
        assert_eq!(
            listed,
            json!([{
                "id": 1,
                "date": "2024-01-05",
                "amount": 12.5,
                "category": "Food & Dining",
                "subcategory": "",
                "note": ""
            }])
        );
    }

    #[test]
    fn test_summarize_scenario() {
        let (_temp, tools) = make_tools();
        for (date, amount) in [("2024-02-01", 10), ("2024-02-01", 20), ("2024-02-02", 5)] {
            tools
                .call(ADD_EXPENSE, json!({ "date": date, "amount": amount, "category": "Travel" }))
                .unwrap();
        }

        let summary = tools
            .summarize(SummarizeArgs {
                start_date: "2024-02-01".to_string(),
                end_date: "2024-02-28".to_string(),
                category: None,
            })
            .unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].category, "Travel");
        assert_eq!(summary[0].total, 35.0);
        assert_eq!(summary[0].count, 3);
    }

    #[test]
    fn test_empty_results_are_not_errors() {
        let (_temp, tools) = make_tools();

        let listed = tools
            .call(LIST_EXPENSES, json!({ "start_date": "2024-03-01", "end_date": "2024-03-31" }))
            .unwrap();
        assert_eq!(listed, json!([]));

        let summary = tools
            .call(
                SUMMARIZE,
                json!({ "start_date": "2024-03-01", "end_date": "2024-03-31", "category": "Travel" }),
            )
            .unwrap();
        assert_eq!(summary, json!([]));
    }

    #[test]
    fn test_add_with_optional_fields() {
        let (_temp, tools) = make_tools();
        tools
            .call(
                ADD_EXPENSE,
                json!({
                    "date": "2024-01-06",
                    "amount": 4,
                    "category": "Food & Dining",
                    "subcategory": "Coffee",
                    "note": "flat white"
                }),
            )
            .unwrap();

        let listed = tools
            .list_expenses(ListExpensesArgs {
                start_date: "2024-01-06".to_string(),
                end_date: "2024-01-06".to_string(),
            })
            .unwrap();
        assert_eq!(listed[0].subcategory, "Coffee");
        assert_eq!(listed[0].note, "flat white");
        assert_eq!(listed[0].amount, 4.0);
    }

    #[test]
    fn test_invalid_arguments_rejected_before_store() {
        let (_temp, tools) = make_tools();

        let err = tools
            .call(ADD_EXPENSE, json!({ "date": "2024-01-05", "amount": "twelve", "category": "Food" }))
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));

        let err = tools.call(LIST_EXPENSES, json!({ "start_date": "2024-01-01" })).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));

        let err = tools.call(SUMMARIZE, Value::Null).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));

        // Nothing was written
        let listed = tools
            .call(LIST_EXPENSES, json!({ "start_date": "0000", "end_date": "9999" }))
            .unwrap();
        assert_eq!(listed, json!([]));
    }

    #[test]
    fn test_concurrent_add_expense_calls() {
        let (_temp, tools) = make_tools();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let tools = tools.clone();
                std::thread::spawn(move || {
                    (0..25)
                        .map(|i| {
                            let result = tools
                                .call(
                                    ADD_EXPENSE,
                                    json!({ "date": "2024-11-01", "amount": t * 100 + i, "category": "Business" }),
                                )
                                .unwrap();
                            result["id"].as_i64().unwrap()
                        })
                        .collect::<Vec<i64>>()
                })
            })
            .collect();

        let mut all_ids = Vec::new();
        for handle in handles {
            let ids = handle.join().unwrap();
            for pair in ids.windows(2) {
                assert!(pair[0] < pair[1], "ids not increasing within a thread: {:?}", ids);
            }
            all_ids.extend(ids);
        }

        all_ids.sort();
        all_ids.dedup();
        assert_eq!(all_ids.len(), 100);

        let summary = tools
            .call(
                SUMMARIZE,
                json!({ "start_date": "2024-11-01", "end_date": "2024-11-30", "category": "Business" }),
            )
            .unwrap();
        assert_eq!(summary[0]["count"], 100);
    }

    #[test]
    fn test_unknown_tool() {
        let (_temp, tools) = make_tools();
        let err = tools.call("delete_expense", json!({})).unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(ref name) if name == "delete_expense"));
        assert_eq!(err.to_string(), "Unknown tool: delete_expense");
    }

    #[test]
    fn test_store_failure_is_tool_failure() {
        let (temp, tools) = make_tools();
        // Swap the database file for a directory so the next connection fails
        let db_path = temp.path().join("expenses.db");
        std::fs::remove_file(&db_path).unwrap();
        let _ = std::fs::remove_file(temp.path().join("expenses.db-wal"));
        let _ = std::fs::remove_file(temp.path().join("expenses.db-shm"));
        std::fs::create_dir(&db_path).unwrap();

        let err = tools
            .call(ADD_EXPENSE, json!({ "date": "2024-01-05", "amount": 1, "category": "Other" }))
            .unwrap_err();
        assert!(matches!(err, ToolError::Failed(_)));
    }

    #[test]
    fn test_read_categories_resource() {
        let (_temp, tools) = make_tools();
        let body = tools.read_resource(CATEGORIES_URI).unwrap();
        let parsed: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["categories"].as_array().unwrap().len(), 10);
        assert_eq!(parsed["categories"][0], "Food & Dining");
        assert_eq!(parsed["categories"][9], "Other");

        let err = tools.read_resource("expense:///nope").unwrap_err();
        assert!(matches!(err, ToolError::UnknownResource(_)));
    }

    #[test]
    fn test_definitions() {
        let names: Vec<&str> = tool_definitions().iter().map(|t| t.name).collect();
        assert_eq!(names, vec![ADD_EXPENSE, LIST_EXPENSES, SUMMARIZE]);

        let resources = resource_definitions();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].uri, "expense:///categories");
        assert_eq!(resources[0].mime_type, "application/json");
    }
}
