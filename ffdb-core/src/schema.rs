//! The schema registry: named, immutable row definitions.
//!
//! A schema is registered once and never mutated; records pin the `Arc` of the schema they
//! were created with, so a later [`redefine`] leaves existing records untouched. The
//! built-in CSS 3.0 catalog is registered lazily on first registry access; user-defined
//! schemas are added with [`define`].
use fnv::FnvHashMap;
use num::FromPrimitive;
use once_cell::sync::Lazy;
use std::sync::{Arc, RwLock};

use crate::errors::FfdbError;
use crate::quark::{quark, Quark};
use crate::schemas;
use crate::Result;

/// The column type codes. The numeric values are the classic CSS codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CssType {
    String = 0,
    Double = 1,
    Float = 2,
    Int = 3,
    Long = 4,
    /// Epoch seconds, serialized `%17.5f`.
    Time = 5,
    /// Calendar date as `YYYYMMDD`.
    Date = 6,
    /// Load date, serialized `%Y-%m-%d %H:%M:%S`.
    LoadDate = 7,
    /// A string column interned through the quark pool on read.
    QuarkInterned = 8,
    Bool = 9,
    /// Julian date as `YYYYDDD`.
    JulianDate = 10,
}

impl CssType {
    pub fn new(code: i32) -> Result<Self> {
        CssType::from_i32(code).ok_or(FfdbError::BadObject {
            reason: format!("unknown column type code {}", code),
        })
    }

    /// Whether the type parses and compares as a number.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            CssType::Double
                | CssType::Float
                | CssType::Int
                | CssType::Long
                | CssType::Time
                | CssType::Date
                | CssType::JulianDate
        )
    }
}

impl std::fmt::Display for CssType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One column of a schema.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CssColumn {
    pub name: String,
    /// First character position of the field on the serialized line.
    pub start: usize,
    /// One past the last character position of the field.
    pub end: usize,
    /// Decimal places for floating columns (`%16.6f` has `prec == Some(6)`).
    pub prec: Option<usize>,
    /// Left-justified on the line (strings); numerics are right-justified.
    pub left_just: bool,
    pub ctype: CssType,
    /// The null literal, exactly as it appears in a serialized field.
    pub null_value: String,
}

impl CssColumn {
    pub fn width(&self) -> usize {
        self.end - self.start
    }

    /// The null literal parsed as a number, for sentinel comparisons.
    pub fn null_f64(&self) -> f64 {
        self.null_value.parse::<f64>().unwrap_or(0.0)
    }

    pub fn null_i64(&self) -> i64 {
        self.null_value.parse::<i64>().unwrap_or(-1)
    }
}

/// An immutable row definition.
#[derive(Debug)]
pub struct CssSchema {
    name: Quark,
    columns: Vec<CssColumn>,
    /// Extra columns live after the serialized ones; they are held in memory but never
    /// written to the record line.
    extra: Vec<CssColumn>,
    /// Serialized line length including the trailing newline.
    line_length: usize,
    /// Index of the primary-key column, when the table has one.
    id_member: Option<usize>,
    by_name: FnvHashMap<Quark, usize>,
}

impl CssSchema {
    pub(crate) fn new(
        name: &str,
        columns: Vec<CssColumn>,
        extra: Vec<CssColumn>,
        id_member: Option<usize>,
    ) -> Arc<CssSchema> {
        let line_length = columns.last().map(|c| c.end + 1).unwrap_or(1);
        let mut by_name = FnvHashMap::default();
        for (i, c) in columns.iter().chain(extra.iter()).enumerate() {
            by_name.insert(quark(&c.name), i);
        }
        Arc::new(CssSchema {
            name: quark(name),
            columns,
            extra,
            line_length,
            id_member,
            by_name,
        })
    }

    pub fn name(&self) -> &'static str {
        crate::quark_str(self.name)
    }

    pub fn name_quark(&self) -> Quark {
        self.name
    }

    /// The serialized columns, in line order.
    pub fn columns(&self) -> &[CssColumn] {
        &self.columns
    }

    /// The in-memory-only extra columns.
    pub fn extra(&self) -> &[CssColumn] {
        &self.extra
    }

    pub fn num_members(&self) -> usize {
        self.columns.len()
    }

    pub fn num_all_members(&self) -> usize {
        self.columns.len() + self.extra.len()
    }

    /// Serialized line length including the trailing newline.
    pub fn line_length(&self) -> usize {
        self.line_length
    }

    pub fn member_index(&self, name: &str) -> Option<usize> {
        self.by_name.get(&quark(name)).copied()
    }

    /// Column metadata by index, spanning serialized then extra columns.
    pub fn column(&self, index: usize) -> Option<&CssColumn> {
        if index < self.columns.len() {
            self.columns.get(index)
        } else {
            self.extra.get(index - self.columns.len())
        }
    }

    pub fn id_member(&self) -> Option<usize> {
        self.id_member
    }

    pub fn id_name(&self) -> Option<&str> {
        self.id_member.map(|i| self.columns[i].name.as_str())
    }

    /// Two definitions are identical when their serialized shape agrees.
    fn same_definition(&self, other: &CssSchema) -> bool {
        if self.columns.len() != other.columns.len() {
            return false;
        }
        self.columns.iter().zip(other.columns.iter()).all(|(a, b)| {
            a.name == b.name
                && a.start == b.start
                && a.end == b.end
                && a.ctype == b.ctype
                && a.null_value == b.null_value
        })
    }
}

static REGISTRY: Lazy<RwLock<FnvHashMap<Quark, Arc<CssSchema>>>> = Lazy::new(|| {
    let mut map = FnvHashMap::default();
    for schema in schemas::builtin_schemas() {
        map.insert(schema.name_quark(), schema);
    }
    RwLock::new(map)
});

/// Register a schema. Fails with `BadObject` if the name is taken by a different
/// definition; re-registering an identical definition is a no-op.
pub fn define(schema: Arc<CssSchema>) -> Result<Arc<CssSchema>> {
    let mut reg = REGISTRY.write().unwrap();
    if let Some(existing) = reg.get(&schema.name_quark()) {
        if existing.same_definition(&schema) {
            return Ok(existing.clone());
        }
        return Err(FfdbError::BadObject {
            reason: format!("table {} is already defined", schema.name()),
        });
    }
    reg.insert(schema.name_quark(), schema.clone());
    Ok(schema)
}

/// Replace an existing definition. Records created earlier keep their old schema pointer.
pub fn redefine(schema: Arc<CssSchema>) -> Arc<CssSchema> {
    let mut reg = REGISTRY.write().unwrap();
    reg.insert(schema.name_quark(), schema.clone());
    schema
}

/// Look up a schema by table name.
pub fn lookup(name: &str) -> Option<Arc<CssSchema>> {
    REGISTRY.read().unwrap().get(&quark(name)).cloned()
}

/// The column descriptions of a table, or `None` when undefined.
pub fn description(name: &str) -> Option<Vec<CssColumn>> {
    lookup(name).map(|s| s.columns().to_vec())
}

/// Every registered table name, sorted.
pub fn all_names() -> Vec<String> {
    let reg = REGISTRY.read().unwrap();
    let mut names: Vec<String> = reg.values().map(|s| s.name().to_string()).collect();
    names.sort();
    names
}

/// Serialized line length of a table including the newline.
pub fn line_length(name: &str) -> Option<usize> {
    lookup(name).map(|s| s.line_length())
}

/// Whether the name is a registered table.
pub fn is_css_table(name: &str) -> bool {
    lookup(name).is_some()
}

/// Whether the table has the named member.
pub fn is_member(name: &str, member: &str) -> bool {
    lookup(name)
        .map(|s| s.member_index(member).is_some())
        .unwrap_or(false)
}
