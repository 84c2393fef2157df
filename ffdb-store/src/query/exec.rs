//! Plan execution: partition walking, row filtering, nested-loop join.
use fnv::{FnvHashMap, FnvHashSet};

use ffdb_core::record::{CssRecord, CssValue};
use ffdb_core::{codec, quark_str, Result};

use super::parse::{ColRef, Constraint, Op, Operand};
use super::plan::ExecPlan;
use crate::table_file;
use crate::FFDatabase;

/// A comparable view of a field or literal.
#[derive(Debug, Clone, PartialEq)]
enum Value {
    Num(f64),
    Str(String),
}

impl Value {
    fn compare(&self, other: &Value) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Value::Num(a), Value::Num(b)) => a.partial_cmp(b),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            // A numeric field against a string literal compares textually.
            (Value::Num(a), Value::Str(b)) => Some(a.to_string().cmp(b)),
            (Value::Str(a), Value::Num(b)) => Some(a.cmp(&b.to_string())),
        }
    }
}

fn field_value(rec: &CssRecord, member: usize) -> Value {
    match rec.value(member) {
        Some(CssValue::Str(s)) => Value::Str(s.clone()),
        Some(CssValue::Quark(q)) => Value::Str(quark_str(*q).to_string()),
        Some(CssValue::LoadDate(d)) => Value::Str(ffdb_core::gtime::format_lddate(*d)),
        Some(v) => v
            .as_f64()
            .map(Value::Num)
            .unwrap_or_else(|| Value::Str(v.to_string())),
        None => Value::Str(String::new()),
    }
}

/// Evaluate an operand against the currently bound rows.
fn eval_operand(o: &Operand, bound: &[Option<&CssRecord>]) -> Option<Value> {
    match o {
        Operand::Num(n) => Some(Value::Num(*n)),
        Operand::Str(s) => Some(Value::Str(s.clone())),
        Operand::Col(c) => bound
            .get(c.table)
            .and_then(|r| *r)
            .map(|r| field_value(r, c.member)),
        Operand::Arith(terms) => {
            let mut sum = 0.0;
            for (sign, t) in terms {
                match eval_operand(t, bound)? {
                    Value::Num(v) => sum += *sign as f64 * v,
                    Value::Str(_) => return None,
                }
            }
            Some(Value::Num(sum))
        }
    }
}

/// SQL LIKE with `%` and `_`.
fn like_match(text: &str, pattern: &str) -> bool {
    fn inner(t: &[u8], p: &[u8]) -> bool {
        match (t.first(), p.first()) {
            (_, None) => t.is_empty(),
            (_, Some(b'%')) => inner(t, &p[1..]) || (!t.is_empty() && inner(&t[1..], p)),
            (Some(_), Some(b'_')) => inner(&t[1..], &p[1..]),
            (Some(tc), Some(pc)) => tc == pc && inner(&t[1..], &p[1..]),
            (None, Some(_)) => false,
        }
    }
    inner(text.as_bytes(), pattern.as_bytes())
}

fn value_text(v: &Value) -> String {
    match v {
        Value::Str(s) => s.clone(),
        Value::Num(n) => n.to_string(),
    }
}

/// Evaluate one term against the bound rows; unbound operands make it vacuously true so
/// it can be re-checked once every involved table is bound.
fn eval_constraint(c: &Constraint, bound: &[Option<&CssRecord>]) -> bool {
    let lhs_rec = match bound.get(c.lhs.table).and_then(|r| *r) {
        Some(r) => r,
        None => return true,
    };
    let lhs = field_value(lhs_rec, c.lhs.member);
    match c.op {
        Op::In => c.rhs.iter().any(|o| match eval_operand(o, bound) {
            Some(v) => values_equal(&lhs, &v),
            None => true,
        }),
        Op::Like => c.rhs.first().map_or(true, |o| match eval_operand(o, bound) {
            Some(v) => like_match(&value_text(&lhs), &value_text(&v)),
            None => true,
        }),
        _ => {
            let rhs = match c.rhs.first().and_then(|o| eval_operand(o, bound)) {
                Some(v) => v,
                None => return true,
            };
            let ord = match lhs.compare(&rhs) {
                Some(o) => o,
                None => return false,
            };
            match c.op {
                Op::Eq => ord == std::cmp::Ordering::Equal,
                Op::Ne => ord != std::cmp::Ordering::Equal,
                Op::Lt => ord == std::cmp::Ordering::Less,
                Op::Le => ord != std::cmp::Ordering::Greater,
                Op::Gt => ord == std::cmp::Ordering::Greater,
                Op::Ge => ord != std::cmp::Ordering::Less,
                Op::Like | Op::In => unreachable!(),
            }
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Num(x), Value::Num(y)) => x == y,
        _ => value_text(a) == value_text(b),
    }
}

/// The DISTINCT key: the selected columns when the query names them, else the whole
/// serialized target row.
fn distinct_key(plan: &ExecPlan, bound: &[Option<&CssRecord>]) -> String {
    if plan.parsed.refs.is_empty() {
        return codec::to_string(bound[plan.target].unwrap());
    }
    let mut key = String::new();
    for r in &plan.parsed.refs {
        if let Some(rec) = bound.get(r.table).and_then(|b| *b) {
            key.push_str(&value_text(&field_value(rec, r.member)));
        }
        key.push('\x1f');
    }
    key
}

/// Run the plan, feeding each resulting target row to `emit`. `emit` returning false
/// stops the walk (the streaming consumer went away).
pub fn run<F: FnMut(CssRecord) -> bool>(
    db: &FFDatabase,
    plan: &ExecPlan,
    emit: &mut F,
) -> Result<()> {
    let ntables = plan.parsed.tables.len();
    let mut seen: FnvHashSet<String> = FnvHashSet::default();

    // The single-table case streams file by file without materializing.
    if ntables == 1 {
        let rows = TableRows::load(db, plan, 0)?;
        for rec in rows.rows {
            let passes = {
                let bound = [Some(&rec)];
                plan.parsed.constraints.iter().all(|c| eval_constraint(c, &bound))
                    && (!plan.parsed.distinct || seen.insert(distinct_key(plan, &bound)))
            };
            if passes && !emit(rec) {
                return Ok(());
            }
        }
        return Ok(());
    }

    // Materialize every table in join order, filtered by its single-table constraints.
    let mut loaded: Vec<Option<TableRows>> = (0..ntables).map(|_| None).collect();
    for &t in &plan.order {
        loaded[t] = Some(TableRows::load(db, plan, t)?);
    }
    let tables: Vec<&TableRows> = plan
        .order
        .iter()
        .map(|&t| loaded[t].as_ref().unwrap())
        .collect();

    // Nested-loop join following the planned order, with an equality index on the inner
    // side where one exists.
    let mut bound: Vec<Option<&CssRecord>> = vec![None; ntables];
    join_level(plan, &tables, 0, &mut bound, &mut seen, emit)?;
    Ok(())
}

fn join_level<'a, F: FnMut(CssRecord) -> bool>(
    plan: &ExecPlan,
    tables: &[&'a TableRows],
    level: usize,
    bound: &mut Vec<Option<&'a CssRecord>>,
    seen: &mut FnvHashSet<String>,
    emit: &mut F,
) -> Result<bool> {
    if level == tables.len() {
        if plan.parsed.distinct && !seen.insert(distinct_key(plan, bound)) {
            return Ok(true);
        }
        let rec = bound[plan.target].unwrap().clone();
        return Ok(emit(rec));
    }
    let table = tables[level];
    let tpos = table.position;

    // Prefer the equality index when a join key to an already-bound table exists.
    let candidates: Vec<usize> = match table.index_lookup(plan, bound) {
        Some(rows) => rows,
        None => (0..table.rows.len()).collect(),
    };

    'rows: for ri in candidates {
        let rec = &table.rows[ri];
        bound[tpos] = Some(rec);
        for c in &plan.parsed.constraints {
            let touched = c.tables();
            if touched.contains(&tpos) && touched.iter().all(|&t| bound[t].is_some()) {
                if !eval_constraint(c, bound) {
                    continue 'rows;
                }
            }
        }
        if !join_level(plan, tables, level + 1, bound, seen, emit)? {
            bound[tpos] = None;
            return Ok(false);
        }
    }
    bound[tpos] = None;
    Ok(true)
}

/// One table's filtered rows, plus an optional equality-join index.
struct TableRows {
    position: usize,
    rows: Vec<CssRecord>,
    /// `(join constraint, index member → row positions)` for the first cross-table
    /// equality term anchored on this table.
    index: Option<(Constraint, FnvHashMap<String, Vec<usize>>)>,
}

impl TableRows {
    fn load(db: &FFDatabase, plan: &ExecPlan, position: usize) -> Result<TableRows> {
        let qt = &plan.parsed.tables[position];
        let (tmin, tmax) = plan.windows[position];
        let mut rows = Vec::new();
        if db.is_static_for_query(&qt.name) {
            rows = db.read_static_table(&qt.name)?;
        } else {
            for path in db.table_files(&qt.name, qt.author.as_deref(), tmin, tmax) {
                if !path.is_file() {
                    continue;
                }
                rows.extend(table_file::read_table_file(&path, &qt.schema)?);
            }
        }
        // Single-table constraints filter at load time.
        let ntables = plan.parsed.tables.len();
        let mut kept = Vec::with_capacity(rows.len());
        for rec in rows {
            let ok = {
                let mut bound: Vec<Option<&CssRecord>> = vec![None; ntables];
                bound[position] = Some(&rec);
                plan.parsed
                    .constraints
                    .iter()
                    .filter(|c| c.tables() == [position])
                    .all(|c| eval_constraint(c, &bound))
            };
            if ok {
                kept.push(rec);
            }
        }

        let mut table = TableRows {
            position,
            rows: kept,
            index: None,
        };
        table.index = table.build_index(plan);
        Ok(table)
    }

    /// Index this table on the member of its first cross-table equality constraint.
    fn build_index(&self, plan: &ExecPlan) -> Option<(Constraint, FnvHashMap<String, Vec<usize>>)> {
        let my_rank = plan.order.iter().position(|&t| t == self.position)?;
        for c in &plan.parsed.constraints {
            if c.op != Op::Eq {
                continue;
            }
            let touched = c.tables();
            if touched.len() != 2 || !touched.contains(&self.position) {
                continue;
            }
            let other = *touched.iter().find(|&&t| t != self.position)?;
            let other_rank = plan.order.iter().position(|&t| t == other)?;
            if other_rank > my_rank {
                continue; // The other side binds after us; the index cannot help.
            }
            let my_member = my_member_of(c, self.position)?;
            let mut map: FnvHashMap<String, Vec<usize>> = FnvHashMap::default();
            for (i, rec) in self.rows.iter().enumerate() {
                map.entry(value_text(&field_value(rec, my_member)))
                    .or_insert_with(Vec::new)
                    .push(i);
            }
            return Some((c.clone(), map));
        }
        None
    }

    /// Candidate rows for the current binding, via the index when usable.
    fn index_lookup(&self, _plan: &ExecPlan, bound: &[Option<&CssRecord>]) -> Option<Vec<usize>> {
        let (c, map) = self.index.as_ref()?;
        // The probe value comes from the side of the constraint bound earlier.
        let probe = if c.lhs.table == self.position {
            eval_operand(c.rhs.first()?, bound)?
        } else {
            let r = bound.get(c.lhs.table).and_then(|r| *r)?;
            field_value(r, c.lhs.member)
        };
        Some(map.get(&value_text(&probe)).cloned().unwrap_or_default())
    }
}

/// This table's member within a two-table equality term.
fn my_member_of(c: &Constraint, position: usize) -> Option<usize> {
    if c.lhs.table == position {
        return Some(c.lhs.member);
    }
    match c.rhs.first() {
        Some(Operand::Col(ColRef { table, member })) if *table == position => Some(*member),
        _ => None,
    }
}
