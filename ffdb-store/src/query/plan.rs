//! Query planning: time windows and join order.
use ffdb_core::errors::FfdbError;
use ffdb_core::gtime;
use ffdb_core::Result;

use super::parse::{Constraint, Op, Operand, ParsedQuery};
use crate::FFDatabase;

/// A planned query, ready to execute.
#[derive(Debug, Clone)]
pub struct ExecPlan {
    pub parsed: ParsedQuery,
    /// FROM positions in evaluation order, most-constrained first.
    pub order: Vec<usize>,
    /// FROM position whose rows the query returns.
    pub target: usize,
    /// Per-table `(tmin, tmax)` windows driving partition pruning.
    pub windows: Vec<(f64, f64)>,
}

/// Bind the parsed query to the database: pick the target table, derive each table's
/// local time window, and order the join constrained-first.
pub fn plan_query(db: &FFDatabase, parsed: ParsedQuery, table_name: &str) -> Result<ExecPlan> {
    if parsed.tables.is_empty() {
        return Err(FfdbError::InvalidQuery {
            reason: "query names no table".to_string(),
        });
    }
    let target = parsed
        .tables
        .iter()
        .position(|t| t.alias == table_name || t.name == table_name)
        .ok_or(FfdbError::InvalidQuery {
            reason: format!("query does not involve table {}", table_name),
        })?;

    let mut windows = vec![(f64::NEG_INFINITY, f64::INFINITY); parsed.tables.len()];
    for c in &parsed.constraints {
        apply_window(c, &parsed, &mut windows);
    }
    // The database's own bounds narrow every window further.
    if let Some((lo, hi)) = db.time_limits() {
        for w in &mut windows {
            w.0 = w.0.max(lo - db.directory_duration());
            w.1 = w.1.min(hi + db.directory_duration());
        }
    }

    // Constrained-first: tables with more literal-bound terms come earlier; the target
    // table wins ties so its rows stream out soonest.
    let mut counts = vec![0usize; parsed.tables.len()];
    for c in &parsed.constraints {
        let touched = c.tables();
        if touched.len() == 1 && c.rhs_is_literal() {
            counts[touched[0]] += 1;
        }
    }
    let mut order: Vec<usize> = (0..parsed.tables.len()).collect();
    order.sort_by_key(|&i| (std::cmp::Reverse(counts[i]), (i != target) as usize, i));

    Ok(ExecPlan {
        parsed,
        order,
        target,
        windows,
    })
}

/// Narrow a table's window from a literal bound on its time-like members.
fn apply_window(c: &Constraint, parsed: &ParsedQuery, windows: &mut [(f64, f64)]) {
    if !c.rhs_is_literal() || c.rhs.len() != 1 {
        return;
    }
    let member_name = {
        let schema = &parsed.tables[c.lhs.table].schema;
        match schema.column(c.lhs.member) {
            Some(col) => col.name.clone(),
            None => return,
        }
    };
    let value = match literal_value(&c.rhs[0]) {
        Some(v) => v,
        None => return,
    };
    let (epoch, is_lower_member) = match member_name.as_str() {
        "time" => (value, true),
        "endtime" => (value, false),
        "ondate" => match gtime::jdate_to_epoch(value as i64) {
            Ok(e) => (e, true),
            Err(_) => return,
        },
        "offdate" => match gtime::jdate_to_epoch(value as i64) {
            Ok(e) => (e, false),
            Err(_) => return,
        },
        _ => return,
    };
    let w = &mut windows[c.lhs.table];
    match c.op {
        Op::Ge | Op::Gt => {
            if is_lower_member {
                w.0 = w.0.max(epoch);
            }
            // A lower bound on the end member does not prune start-keyed partitions.
        }
        Op::Le | Op::Lt => {
            // An upper bound on either time member caps the window.
            w.1 = w.1.min(epoch);
        }
        Op::Eq => {
            if is_lower_member {
                w.0 = w.0.max(epoch);
                w.1 = w.1.min(epoch);
            }
        }
        _ => {}
    }
}

pub(super) fn literal_value(o: &Operand) -> Option<f64> {
    match o {
        Operand::Num(n) => Some(*n),
        Operand::Arith(terms) => {
            let mut sum = 0.0;
            for (sign, t) in terms {
                sum += *sign as f64 * literal_value(t)?;
            }
            Some(sum)
        }
        _ => None,
    }
}
