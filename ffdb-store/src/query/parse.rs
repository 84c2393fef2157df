//! Query text → parsed form.
use std::sync::Arc;

use ffdb_core::errors::FfdbError;
use ffdb_core::schema::{self, CssSchema};
use ffdb_core::Result;

/// A bound column reference: table position in the FROM list, member index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColRef {
    pub table: usize,
    pub member: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    In,
}

impl Op {
    fn from_str(s: &str) -> Option<Op> {
        match s {
            "=" | "==" => Some(Op::Eq),
            "!=" | "<>" => Some(Op::Ne),
            "<" => Some(Op::Lt),
            "<=" => Some(Op::Le),
            ">" => Some(Op::Gt),
            ">=" => Some(Op::Ge),
            "like" => Some(Op::Like),
            "in" => Some(Op::In),
            _ => None,
        }
    }
}

/// One side of a term.
#[derive(Debug, Clone)]
pub enum Operand {
    Num(f64),
    Str(String),
    Col(ColRef),
    /// A `+`/`-` combination of numeric operands, stored as signed terms.
    Arith(Vec<(i32, Operand)>),
}

/// One WHERE term.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub lhs: ColRef,
    pub op: Op,
    /// One operand, or several for `IN`.
    pub rhs: Vec<Operand>,
}

impl Constraint {
    /// The FROM positions this term touches.
    pub fn tables(&self) -> Vec<usize> {
        let mut t = vec![self.lhs.table];
        for o in &self.rhs {
            collect_tables(o, &mut t);
        }
        t.sort_unstable();
        t.dedup();
        t
    }

    /// Whether every right-hand operand is a literal.
    pub fn rhs_is_literal(&self) -> bool {
        self.rhs.iter().all(operand_is_literal)
    }
}

fn collect_tables(o: &Operand, out: &mut Vec<usize>) {
    match o {
        Operand::Col(c) => out.push(c.table),
        Operand::Arith(terms) => {
            for (_, t) in terms {
                collect_tables(t, out);
            }
        }
        _ => {}
    }
}

fn operand_is_literal(o: &Operand) -> bool {
    match o {
        Operand::Num(_) | Operand::Str(_) => true,
        Operand::Col(_) => false,
        Operand::Arith(terms) => terms.iter().all(|(_, t)| operand_is_literal(t)),
    }
}

/// One FROM entry.
#[derive(Debug, Clone)]
pub struct QueryTable {
    pub name: String,
    /// From an `author.table` qualification.
    pub author: Option<String>,
    pub alias: String,
    pub schema: Arc<CssSchema>,
}

#[derive(Debug, Clone)]
pub struct ParsedQuery {
    pub distinct: bool,
    /// Selected columns; empty means every column of the target table.
    pub refs: Vec<ColRef>,
    pub tables: Vec<QueryTable>,
    pub constraints: Vec<Constraint>,
}

fn invalid(reason: impl Into<String>) -> FfdbError {
    FfdbError::InvalidQuery {
        reason: reason.into(),
    }
}

/// Tokenize: words, numbers, quoted strings, and the punctuation the grammar knows.
fn tokenize(query: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = query.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '\'' || c == '"' {
            let quote = c;
            let start = i + 1;
            let mut j = start;
            while j < chars.len() && chars[j] != quote {
                j += 1;
            }
            if j == chars.len() {
                return Err(invalid("unterminated string literal"));
            }
            tokens.push(format!("'{}", chars[start..j].iter().collect::<String>()));
            i = j + 1;
        } else if matches!(c, ',' | '(' | ')' | '+' | '-') {
            // A leading minus glues onto a following digit to form a negative number.
            if c == '-'
                && i + 1 < chars.len()
                && chars[i + 1].is_ascii_digit()
                && tokens
                    .last()
                    .map(|t: &String| {
                        matches!(
                            t.as_str(),
                            "," | "(" | "=" | "!=" | "<" | "<=" | ">" | ">=" | "+" | "-"
                        ) || t.eq_ignore_ascii_case("in")
                            || t.eq_ignore_ascii_case("where")
                            || t.eq_ignore_ascii_case("and")
                    })
                    .unwrap_or(true)
            {
                let mut j = i + 1;
                while j < chars.len()
                    && (chars[j].is_ascii_digit() || chars[j] == '.' || chars[j] == 'e')
                {
                    j += 1;
                }
                tokens.push(chars[i..j].iter().collect());
                i = j;
            } else {
                tokens.push(c.to_string());
                i += 1;
            }
        } else if matches!(c, '=' | '!' | '<' | '>') {
            let mut op = c.to_string();
            if i + 1 < chars.len() && matches!(chars[i + 1], '=' | '>') {
                op.push(chars[i + 1]);
                i += 1;
            }
            tokens.push(op);
            i += 1;
        } else {
            let start = i;
            while i < chars.len()
                && !chars[i].is_whitespace()
                && !matches!(chars[i], ',' | '(' | ')' | '=' | '!' | '<' | '>' | '+' | '-')
            {
                i += 1;
            }
            tokens.push(chars[start..i].iter().collect());
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<String>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(|s| s.as_str())
    }

    fn next(&mut self) -> Option<&str> {
        let t = self.tokens.get(self.pos).map(|s| s.as_str());
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect_kw(&mut self, kw: &str) -> Result<()> {
        match self.next() {
            Some(t) if t.eq_ignore_ascii_case(kw) => Ok(()),
            other => Err(invalid(format!(
                "expected {}, got {}",
                kw.to_uppercase(),
                other.unwrap_or("end of query")
            ))),
        }
    }

    fn at_kw(&self, kw: &str) -> bool {
        self.peek()
            .map(|t| t.eq_ignore_ascii_case(kw))
            .unwrap_or(false)
    }
}

/// Parse and bind a query. Unknown tables and columns are rejected here, before any file
/// is touched.
pub fn parse_query(query: &str) -> Result<ParsedQuery> {
    let mut p = Parser {
        tokens: tokenize(query)?,
        pos: 0,
    };
    p.expect_kw("select")?;
    let distinct = if p.at_kw("distinct") {
        p.next();
        true
    } else {
        false
    };

    // Selected columns, as raw alias.col text until the FROM list binds aliases.
    let mut raw_refs: Vec<String> = Vec::new();
    let mut star = false;
    loop {
        match p.next() {
            Some("*") => {
                star = true;
            }
            Some(tok) if !tok.eq_ignore_ascii_case("from") => {
                raw_refs.push(tok.to_string());
            }
            Some(_) => break, // FROM
            None => return Err(invalid("query ends before FROM")),
        }
        if p.peek() == Some(",") {
            p.next();
            continue;
        }
        if p.at_kw("from") {
            p.expect_kw("from")?;
            break;
        }
        if star {
            p.expect_kw("from")?;
            break;
        }
    }

    // FROM list: `name alias` pairs, the name optionally author-qualified.
    let mut tables: Vec<QueryTable> = Vec::new();
    loop {
        let name_tok = p
            .next()
            .ok_or_else(|| invalid("FROM names no table"))?
            .to_string();
        let (author, name) = match name_tok.split_once('.') {
            Some((a, n)) => (Some(a.to_string()), n.to_string()),
            None => (None, name_tok.clone()),
        };
        let schema =
            schema::lookup(&name).ok_or_else(|| invalid(format!("unknown table {}", name)))?;
        let alias = match p.peek() {
            Some(t)
                if !t.eq_ignore_ascii_case("where")
                    && t != "," =>
            {
                let a = t.to_string();
                p.next();
                a
            }
            _ => name.clone(),
        };
        tables.push(QueryTable {
            name,
            author,
            alias,
            schema,
        });
        if p.peek() == Some(",") {
            p.next();
            continue;
        }
        break;
    }

    let bind_col = |text: &str, tables: &[QueryTable]| -> Result<ColRef> {
        let (alias, member) = text
            .split_once('.')
            .ok_or_else(|| invalid(format!("column reference '{}' is not alias.col", text)))?;
        let table = tables
            .iter()
            .position(|t| t.alias == alias)
            .ok_or_else(|| invalid(format!("unknown alias '{}'", alias)))?;
        let member = tables[table]
            .schema
            .member_index(member)
            .ok_or_else(|| invalid(format!("{} has no column {}", tables[table].name, member)))?;
        Ok(ColRef { table, member })
    };

    let refs: Vec<ColRef> = if star {
        Vec::new()
    } else {
        raw_refs
            .iter()
            .map(|r| bind_col(r, &tables))
            .collect::<Result<_>>()?
    };

    // WHERE terms.
    let mut constraints = Vec::new();
    if p.at_kw("where") {
        p.next();
        loop {
            let lhs_tok = p
                .next()
                .ok_or_else(|| invalid("WHERE ends before a term"))?
                .to_string();
            let lhs = bind_col(&lhs_tok, &tables)?;
            let op_tok = p
                .next()
                .ok_or_else(|| invalid("term has no operator"))?
                .to_ascii_lowercase();
            let op = Op::from_str(&op_tok)
                .ok_or_else(|| invalid(format!("unknown operator '{}'", op_tok)))?;
            let rhs = parse_rhs(&mut p, op, &tables, &bind_col)?;
            constraints.push(Constraint { lhs, op, rhs });
            if p.at_kw("and") {
                p.next();
                continue;
            }
            break;
        }
    }
    if let Some(extra) = p.peek() {
        return Err(invalid(format!("trailing input at '{}'", extra)));
    }

    Ok(ParsedQuery {
        distinct,
        refs,
        tables,
        constraints,
    })
}

fn parse_rhs(
    p: &mut Parser,
    op: Op,
    tables: &[QueryTable],
    bind_col: &dyn Fn(&str, &[QueryTable]) -> Result<ColRef>,
) -> Result<Vec<Operand>> {
    if op == Op::In {
        let parens = p.peek() == Some("(");
        if parens {
            p.next();
        }
        let mut list = Vec::new();
        loop {
            let v = parse_value(p, tables, bind_col)?;
            list.push(v);
            if p.peek() == Some(",") {
                p.next();
                continue;
            }
            break;
        }
        if parens {
            match p.next() {
                Some(")") => {}
                _ => return Err(invalid("IN list is not closed")),
            }
        }
        if list.is_empty() {
            return Err(invalid("IN list is empty"));
        }
        return Ok(list);
    }
    Ok(vec![parse_value(p, tables, bind_col)?])
}

/// `value [± value ...]`.
fn parse_value(
    p: &mut Parser,
    tables: &[QueryTable],
    bind_col: &dyn Fn(&str, &[QueryTable]) -> Result<ColRef>,
) -> Result<Operand> {
    let first = parse_atom(p, tables, bind_col)?;
    let mut terms = vec![(1, first)];
    while matches!(p.peek(), Some("+") | Some("-")) {
        let sign = if p.next() == Some("-") { -1 } else { 1 };
        terms.push((sign, parse_atom(p, tables, bind_col)?));
    }
    if terms.len() == 1 {
        Ok(terms.pop().unwrap().1)
    } else {
        Ok(Operand::Arith(terms))
    }
}

fn parse_atom(
    p: &mut Parser,
    tables: &[QueryTable],
    bind_col: &dyn Fn(&str, &[QueryTable]) -> Result<ColRef>,
) -> Result<Operand> {
    let tok = p
        .next()
        .ok_or_else(|| invalid("term has no value"))?
        .to_string();
    if let Some(stripped) = tok.strip_prefix('\'') {
        return Ok(Operand::Str(stripped.to_string()));
    }
    if let Ok(n) = tok.parse::<f64>() {
        return Ok(Operand::Num(n));
    }
    if tok.contains('.') {
        if let Ok(col) = bind_col(&tok, tables) {
            return Ok(Operand::Col(col));
        }
    }
    // A bare word is a string literal (station names and the like).
    Ok(Operand::Str(tok))
}
