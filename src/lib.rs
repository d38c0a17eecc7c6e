// Expense tracker - SQLite-backed expense store exposed as MCP tools

pub mod categories;
pub mod config;
pub mod expense;
pub mod filter;
pub mod mcp;
pub mod server;
pub mod store;
pub mod tools;

// Re-export main types for convenience
pub use categories::{CategoryCatalog, CategoryList};
pub use config::Config;
pub use expense::{CategorySummary, Expense, NewExpense};
pub use filter::{DateRange, SummaryFilter};
pub use mcp::McpServer;
pub use server::create_router;
pub use store::ExpenseStore;
pub use tools::ExpenseTools;

/// Open the store and build the MCP server for a resolved configuration
pub fn build_server(config: &Config) -> eyre::Result<McpServer> {
    let store = ExpenseStore::open(&config.db_path)?;
    let catalog = CategoryCatalog::new(&config.categories_path);
    Ok(McpServer::new(ExpenseTools::new(store, catalog)))
}
