//! The restricted query planner and executor.
//!
//! The grammar is a small SELECT subset:
//!
//! ```text
//! SELECT [DISTINCT] alias.col[, ...] FROM table alias[, table alias ...]
//!        [WHERE term [AND term ...]]
//! ```
//!
//! with `term` being `alias.col OP value`, `OP` one of `= != < <= > >= LIKE IN`, and
//! `value` a literal, another `alias.col`, a comma list (for `IN`), or a `+`/`-`
//! combination of those. Planning binds each term to its table, derives a per-table time
//! window for partition pruning, and orders tables constrained-first. Execution is a
//! nested-loop join with inner-side indexing on the current join key, streamed through a
//! bounded channel when the caller asks for it.
mod exec;
mod parse;
mod plan;
mod stream;

pub use parse::{parse_query, ColRef, Constraint, Op, Operand, ParsedQuery, QueryTable};
pub use plan::{plan_query, ExecPlan};
pub use stream::QueryHandle;

use ffdb_core::record::CssRecord;
use ffdb_core::Result;

use crate::FFDatabase;

/// Cap on records buffered between a streaming producer and its consumer.
pub const DEFAULT_MAX_MEM_RECORDS: usize = 5000;

impl FFDatabase {
    /// Run a query to completion, returning the rows of `table_name` (an alias or table
    /// name from the query) that satisfy every constraint.
    pub fn query_table(&self, query: &str, table_name: &str) -> Result<Vec<CssRecord>> {
        let parsed = parse_query(query)?;
        let plan = plan_query(self, parsed, table_name)?;
        let mut out = Vec::new();
        exec::run(self, &plan, &mut |rec| {
            out.push(rec);
            true
        })?;
        Ok(out)
    }

    /// `query_table` against the prefix (self-contained) layout.
    pub fn query_prefix(&self, query: &str, table_name: &str) -> Result<Vec<CssRecord>> {
        if self.prefix().is_none() {
            return Err(ffdb_core::FfdbError::InvalidQuery {
                reason: "database was not opened with a prefix".to_string(),
            });
        }
        self.query_table(query, table_name)
    }

    /// Start a streaming query: parsing and planning happen here (a malformed query
    /// fails before any file is touched), then a producer thread fills a bounded queue.
    pub fn query_table_init(&self, query: &str, table_name: &str) -> Result<QueryHandle> {
        let parsed = parse_query(query)?;
        let plan = plan_query(self, parsed, table_name)?;
        stream::spawn(self, plan)
    }

    /// The author restriction and table name of a query's first FROM entry, the way the
    /// classic API reported them.
    pub fn query_table_name(query: &str) -> Result<(Option<String>, String)> {
        let parsed = parse_query(query)?;
        let t = parsed.tables.first().ok_or(ffdb_core::FfdbError::InvalidQuery {
            reason: "query names no table".to_string(),
        })?;
        Ok((t.author.clone(), t.name.clone()))
    }
}
