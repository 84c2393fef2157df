//! Fixed-column ASCII read and write of one record against its schema.
//!
//! Serialized lines are strict: every field sits at its declared position with its declared
//! width, fields are separated by single spaces, and a line ends in exactly one newline.
//! Reading tolerates a missing trailing newline and nothing else; a line of the wrong
//! length fails with `WrongFormat` before any field is touched.
use std::io::{BufRead, Write};

use crate::errors::FfdbError;
use crate::gtime;
use crate::quark::quark;
use crate::record::{CssRecord, CssValue};
use crate::schema::{CssColumn, CssType};
use crate::Result;

/// Decode one line into the record. Interns `QuarkInterned` columns and sets `loaded`.
pub fn read_line(rec: &mut CssRecord, line: &str) -> Result<()> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let expected = rec.schema().line_length() - 1;
    if line.len() != expected {
        return Err(FfdbError::WrongFormat {
            table: rec.table_name().to_string(),
            expected,
            got: line.len(),
        });
    }
    if !line.is_ascii() {
        return Err(FfdbError::BadObject {
            reason: format!("{}: line is not ascii", rec.table_name()),
        });
    }
    let schema = rec.schema().clone();
    for (i, col) in schema.columns().iter().enumerate() {
        let field = &line[col.start..col.end];
        let value = parse_field(schema.name(), col, field)?;
        rec.values_mut()[i] = value;
    }
    rec.set_loaded(true);
    Ok(())
}

/// Read the next line from a reader into the record. `Ok(false)` means clean end of file.
pub fn read_from<R: BufRead>(rec: &mut CssRecord, reader: &mut R) -> Result<bool> {
    let mut line = String::with_capacity(rec.schema().line_length());
    let n = reader.read_line(&mut line)?;
    if n == 0 {
        return Ok(false);
    }
    read_line(rec, &line)?;
    Ok(true)
}

/// Serialize the record as one line, newline included.
pub fn to_string(rec: &CssRecord) -> String {
    let schema = rec.schema();
    let mut out = String::with_capacity(schema.line_length());
    for (i, col) in schema.columns().iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format_field(col, &rec.values()[i]));
    }
    out.push('\n');
    out
}

/// Write exactly `line_length` bytes including the newline.
pub fn write<W: Write>(rec: &CssRecord, writer: &mut W) -> Result<()> {
    writer.write_all(to_string(rec).as_bytes())?;
    Ok(())
}

/// Parse one field slice into the column's value type.
pub fn parse_field(table: &str, col: &CssColumn, field: &str) -> Result<CssValue> {
    let text = field.trim();
    let bad = |reason: String| FfdbError::BadObject { reason };
    let num_err = |t: &str| bad(format!("{}.{}: invalid {} '{}'", table, col.name, t, text));
    let v = match col.ctype {
        CssType::String => CssValue::Str(text.to_string()),
        CssType::QuarkInterned => CssValue::Quark(quark(text)),
        CssType::Double => CssValue::Double(text.parse().map_err(|_| num_err("double"))?),
        CssType::Float => CssValue::Float(text.parse().map_err(|_| num_err("float"))?),
        CssType::Int => CssValue::Int(text.parse().map_err(|_| num_err("int"))?),
        CssType::Long => CssValue::Long(text.parse().map_err(|_| num_err("long"))?),
        CssType::Time => CssValue::Time(text.parse().map_err(|_| num_err("time"))?),
        CssType::Date => CssValue::Date(text.parse().map_err(|_| num_err("date"))?),
        CssType::JulianDate => CssValue::JDate(text.parse().map_err(|_| num_err("jdate"))?),
        CssType::LoadDate => CssValue::LoadDate(gtime::parse_lddate(text)?),
        CssType::Bool => CssValue::Bool(matches!(text, "y" | "Y" | "1" | "true")),
    };
    Ok(v)
}

/// Render one field at its declared width. Strings truncate to the field; numerics that
/// overflow their width widen the line, as printf would.
pub fn format_field(col: &CssColumn, value: &CssValue) -> String {
    render(value, col.width(), col.prec, col.left_just)
}

fn render(value: &CssValue, width: usize, prec: Option<usize>, left: bool) -> String {
    match value {
        CssValue::Str(s) => pad_str(s, width, left),
        CssValue::Quark(q) => pad_str(crate::quark_str(*q), width, left),
        CssValue::Bool(b) => pad_str(if *b { "y" } else { "n" }, width, left),
        CssValue::LoadDate(d) => match d {
            Some(dt) => pad_str(&dt.format(gtime::LDDATE_FMT).to_string(), width, left),
            None => pad_str("-", width, left),
        },
        CssValue::Double(v) | CssValue::Time(v) => {
            format!("{:>w$.p$}", v, w = width, p = prec.unwrap_or(6))
        }
        CssValue::Float(v) => format!("{:>w$.p$}", v, w = width, p = prec.unwrap_or(6)),
        CssValue::Int(v) => format!("{:>w$}", v, w = width),
        CssValue::Long(v) | CssValue::Date(v) | CssValue::JDate(v) => {
            format!("{:>w$}", v, w = width)
        }
    }
}

fn pad_str(s: &str, width: usize, left: bool) -> String {
    let s = if s.len() > width {
        s.get(..width).unwrap_or(s)
    } else {
        s
    };
    if left {
        format!("{:<w$}", s, w = width)
    } else {
        format!("{:>w$}", s, w = width)
    }
}

/// Render a value through a printf-style spec such as `%10.2f`, `%-8s` or `%6d`. Only the
/// width/precision/justification parts are honored; the conversion letter is implied by the
/// column type.
pub fn format_with_spec(col: &CssColumn, value: &CssValue, spec: &str) -> String {
    let body = spec.strip_prefix('%').unwrap_or(spec);
    let left = body.starts_with('-');
    let body = body.trim_start_matches('-');
    let digits: String = body.chars().take_while(|c| c.is_ascii_digit()).collect();
    let rest = &body[digits.len()..];
    let width = digits.parse::<usize>().unwrap_or(col.width());
    let prec = rest
        .strip_prefix('.')
        .map(|r| {
            r.chars()
                .take_while(|c| c.is_ascii_digit())
                .collect::<String>()
        })
        .and_then(|p| p.parse::<usize>().ok())
        .or(col.prec);
    render(value, width, prec, left || col.left_just)
}
