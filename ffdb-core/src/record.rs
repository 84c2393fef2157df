//! The typed record object.
//!
//! A record is a schema handle plus one value per column, with the null sentinels
//! pre-filled at construction. It carries its source provenance (which account, file and
//! byte offset it came from), the selected/loaded flags, and an optional property map for
//! free-form values clients attach to it.
use chrono::NaiveDateTime;
use fnv::FnvHashMap;
use std::sync::Arc;

use crate::codec;
use crate::errors::FfdbError;
use crate::gtime;
use crate::quark::{quark, quark_str, Quark};
use crate::schema::{self, CssColumn, CssSchema, CssType};
use crate::Result;

/// Where a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// Created in memory; no backing store.
    None,
    /// A flat-file database under a parameter root.
    FlatFile,
    /// A sibling adapter implementing the same table-store contract.
    Relational,
}

/// Record provenance: the account and file a record was read from or written to.
#[derive(Debug, Clone, Copy)]
pub struct RecordSource {
    pub data_source: DataSource,
    /// Account or author name.
    pub user: Quark,
    /// Password for a relational source, or the segment root for a flat-file one.
    pub passwd_or_segroot: Quark,
    pub table_name: Quark,
    pub dir: Quark,
    pub prefix: Quark,
    pub file: Quark,
    /// Byte offset of the record's line within its file.
    pub file_offset: u64,
}

impl Default for RecordSource {
    fn default() -> Self {
        RecordSource {
            data_source: DataSource::None,
            user: Quark::NONE,
            passwd_or_segroot: Quark::NONE,
            table_name: Quark::NONE,
            dir: Quark::NONE,
            prefix: Quark::NONE,
            file: Quark::NONE,
            file_offset: 0,
        }
    }
}

/// A free-form per-record property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Str(String),
    /// An opaque block of bytes (`putBlock`).
    Block(Vec<u8>),
}

/// One typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum CssValue {
    Str(String),
    Double(f64),
    Float(f32),
    Int(i32),
    Long(i64),
    Time(f64),
    Date(i64),
    LoadDate(Option<NaiveDateTime>),
    Quark(Quark),
    Bool(bool),
    JDate(i64),
}

impl CssValue {
    /// The pre-filled null for a column.
    pub fn null_for(col: &CssColumn) -> CssValue {
        match col.ctype {
            CssType::String => CssValue::Str(col.null_value.clone()),
            CssType::Double => CssValue::Double(col.null_f64()),
            CssType::Float => CssValue::Float(col.null_f64() as f32),
            CssType::Int => CssValue::Int(col.null_i64() as i32),
            CssType::Long => CssValue::Long(col.null_i64()),
            CssType::Time => CssValue::Time(col.null_f64()),
            CssType::Date => CssValue::Date(col.null_i64()),
            CssType::LoadDate => CssValue::LoadDate(None),
            CssType::QuarkInterned => CssValue::Quark(quark(&col.null_value)),
            CssType::Bool => CssValue::Bool(false),
            CssType::JulianDate => CssValue::JDate(col.null_i64()),
        }
    }

    /// Numeric view; strings yield `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CssValue::Double(v) | CssValue::Time(v) => Some(*v),
            CssValue::Float(v) => Some(*v as f64),
            CssValue::Int(v) => Some(*v as f64),
            CssValue::Long(v) | CssValue::Date(v) | CssValue::JDate(v) => Some(*v as f64),
            CssValue::Bool(v) => Some(*v as i64 as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CssValue::Long(v) | CssValue::Date(v) | CssValue::JDate(v) => Some(*v),
            CssValue::Int(v) => Some(*v as i64),
            CssValue::Double(v) | CssValue::Time(v) => Some(*v as i64),
            CssValue::Float(v) => Some(*v as i64),
            CssValue::Bool(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// String view; `Str` and `Quark` only.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CssValue::Str(s) => Some(s),
            CssValue::Quark(q) => Some(quark_str(*q)),
            _ => None,
        }
    }
}

impl std::fmt::Display for CssValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CssValue::Str(s) => write!(f, "{}", s),
            CssValue::Double(v) | CssValue::Time(v) => write!(f, "{}", v),
            CssValue::Float(v) => write!(f, "{}", v),
            CssValue::Int(v) => write!(f, "{}", v),
            CssValue::Long(v) | CssValue::Date(v) | CssValue::JDate(v) => write!(f, "{}", v),
            CssValue::LoadDate(d) => write!(f, "{}", gtime::format_lddate(*d)),
            CssValue::Quark(q) => write!(f, "{}", quark_str(*q)),
            CssValue::Bool(b) => write!(f, "{}", if *b { "y" } else { "n" }),
        }
    }
}

/// A typed row with provenance.
#[derive(Debug, Clone)]
pub struct CssRecord {
    schema: Arc<CssSchema>,
    values: Vec<CssValue>,
    pub source: RecordSource,
    selected: bool,
    loaded: bool,
    props: Option<FnvHashMap<String, PropValue>>,
}

impl CssRecord {
    /// Construct a record of the named table with nulls pre-filled.
    pub fn new(table_name: &str) -> Result<CssRecord> {
        let schema = schema::lookup(table_name).ok_or(FfdbError::BadObject {
            reason: format!("unknown table {}", table_name),
        })?;
        Ok(Self::with_schema(schema))
    }

    /// Construct several records of the named table.
    pub fn new_batch(table_name: &str, num: usize) -> Result<Vec<CssRecord>> {
        let schema = schema::lookup(table_name).ok_or(FfdbError::BadObject {
            reason: format!("unknown table {}", table_name),
        })?;
        Ok((0..num)
            .map(|_| Self::with_schema(schema.clone()))
            .collect())
    }

    /// Construct from an already-resolved schema handle. Records pin their schema: a later
    /// `redefine` of the name does not touch this record.
    pub fn with_schema(schema: Arc<CssSchema>) -> CssRecord {
        let n = schema.num_all_members();
        let values = (0..n)
            .map(|i| CssValue::null_for(schema.column(i).unwrap()))
            .collect();
        CssRecord {
            schema,
            values,
            source: RecordSource::default(),
            selected: false,
            loaded: false,
            props: None,
        }
    }

    pub fn schema(&self) -> &Arc<CssSchema> {
        &self.schema
    }

    pub fn table_name(&self) -> &'static str {
        self.schema.name()
    }

    pub fn num_members(&self) -> usize {
        self.schema.num_members()
    }

    pub fn selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, b: bool) {
        self.selected = b;
    }

    pub fn loaded(&self) -> bool {
        self.loaded
    }

    pub fn set_loaded(&mut self, b: bool) {
        self.loaded = b;
    }

    pub fn member_index(&self, name: &str) -> Option<usize> {
        self.schema.member_index(name)
    }

    pub fn member_type(&self, name: &str) -> Option<CssType> {
        self.schema
            .member_index(name)
            .and_then(|i| self.schema.column(i))
            .map(|c| c.ctype)
    }

    pub fn value(&self, index: usize) -> Option<&CssValue> {
        self.values.get(index)
    }

    pub fn value_by_name(&self, name: &str) -> Option<&CssValue> {
        self.member_index(name).and_then(|i| self.values.get(i))
    }

    /// Set a field by index. The value must match the column type.
    pub fn set_value(&mut self, index: usize, value: CssValue) -> Result<()> {
        let col = self.schema.column(index).ok_or(FfdbError::BadObject {
            reason: format!("{}: no member {}", self.table_name(), index),
        })?;
        let ok = matches!(
            (&value, col.ctype),
            (CssValue::Str(_), CssType::String)
                | (CssValue::Double(_), CssType::Double)
                | (CssValue::Float(_), CssType::Float)
                | (CssValue::Int(_), CssType::Int)
                | (CssValue::Long(_), CssType::Long)
                | (CssValue::Time(_), CssType::Time)
                | (CssValue::Date(_), CssType::Date)
                | (CssValue::LoadDate(_), CssType::LoadDate)
                | (CssValue::Quark(_), CssType::QuarkInterned)
                | (CssValue::Bool(_), CssType::Bool)
                | (CssValue::JDate(_), CssType::JulianDate)
        );
        if !ok {
            return Err(FfdbError::BadObject {
                reason: format!(
                    "{}.{}: value type does not match {}",
                    self.table_name(),
                    col.name,
                    col.ctype
                ),
            });
        }
        self.values[index] = value;
        Ok(())
    }

    pub fn set_by_name(&mut self, name: &str, value: CssValue) -> Result<()> {
        let i = self.member_index(name).ok_or(FfdbError::BadObject {
            reason: format!("{}: no member {}", self.table_name(), name),
        })?;
        self.set_value(i, value)
    }

    /// Parse a string into the member's type and set it.
    pub fn set_from_str(&mut self, index: usize, text: &str) -> Result<()> {
        let col = self.schema.column(index).ok_or(FfdbError::BadObject {
            reason: format!("{}: no member {}", self.table_name(), index),
        })?;
        let v = codec::parse_field(self.table_name(), col, text)?;
        self.values[index] = v;
        Ok(())
    }

    /// Convenience numeric setter used all over the measurement code.
    pub fn set_double_member(&mut self, name: &str, value: f64) -> Result<()> {
        let i = self.member_index(name).ok_or(FfdbError::BadObject {
            reason: format!("{}: no member {}", self.table_name(), name),
        })?;
        let col = self.schema.column(i).unwrap();
        let v = match col.ctype {
            CssType::Double => CssValue::Double(value),
            CssType::Float => CssValue::Float(value as f32),
            CssType::Time => CssValue::Time(value),
            CssType::Int => CssValue::Int(value as i32),
            CssType::Long => CssValue::Long(value as i64),
            CssType::Date => CssValue::Date(value as i64),
            CssType::JulianDate => CssValue::JDate(value as i64),
            _ => {
                return Err(FfdbError::BadObject {
                    reason: format!("{}.{} is not numeric", self.table_name(), name),
                })
            }
        };
        self.values[i] = v;
        Ok(())
    }

    pub fn double_member(&self, name: &str) -> Option<f64> {
        self.value_by_name(name).and_then(|v| v.as_f64())
    }

    pub fn long_member(&self, name: &str) -> Option<i64> {
        self.value_by_name(name).and_then(|v| v.as_i64())
    }

    pub fn str_member(&self, name: &str) -> Option<&str> {
        self.value_by_name(name).and_then(|v| v.as_str())
    }

    /// Whether a field still holds its null sentinel.
    pub fn is_null(&self, index: usize) -> bool {
        match self.schema.column(index) {
            Some(col) => self.values[index] == CssValue::null_for(col),
            None => true,
        }
    }

    /// The primary-key value, when the table defines one.
    pub fn id(&self) -> Option<i64> {
        self.schema
            .id_member()
            .and_then(|i| self.values[i].as_i64())
    }

    /// Stamp `lddate` with the current wallclock. Called on every insert and update that
    /// goes through the store.
    pub fn set_lddate_now(&mut self) {
        if let Some(i) = self.member_index("lddate") {
            self.values[i] = CssValue::LoadDate(Some(gtime::now()));
        }
    }

    /// One serialized line including the newline.
    pub fn to_line(&self) -> String {
        codec::to_string(self)
    }

    /// Record identity: primary key when defined, else the full serialized row.
    pub fn same_record(&self, other: &CssRecord) -> bool {
        if !Arc::ptr_eq(&self.schema, &other.schema)
            && self.schema.name_quark() != other.schema.name_quark()
        {
            return false;
        }
        match (self.id(), other.id()) {
            (Some(a), Some(b)) => a == b,
            _ => self.to_line() == other.to_line(),
        }
    }

    /// First record whose member equals the given long value.
    pub fn find<'a>(records: &'a [CssRecord], member: &str, value: i64) -> Option<&'a CssRecord> {
        records
            .iter()
            .find(|r| r.long_member(member) == Some(value))
    }

    /// Stable sort by a named member: numeric columns by value, strings lexicographically.
    pub fn sort_by_member(records: &mut [CssRecord], member: &str) {
        let numeric = records
            .first()
            .and_then(|r| r.member_type(member))
            .map(|t| t.is_numeric())
            .unwrap_or(false);
        if numeric {
            records.sort_by(|a, b| {
                let x = a.double_member(member).unwrap_or(f64::MIN);
                let y = b.double_member(member).unwrap_or(f64::MIN);
                x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal)
            });
        } else {
            records.sort_by(|a, b| {
                let x = a.str_member(member).unwrap_or("");
                let y = b.str_member(member).unwrap_or("");
                x.cmp(y)
            });
        }
    }

    /// Attach a free-form string property.
    pub fn put_value(&mut self, name: &str, value: &str) {
        self.props
            .get_or_insert_with(FnvHashMap::default)
            .insert(name.to_string(), PropValue::Str(value.to_string()));
    }

    /// Attach an opaque block property.
    pub fn put_block(&mut self, name: &str, bytes: Vec<u8>) {
        self.props
            .get_or_insert_with(FnvHashMap::default)
            .insert(name.to_string(), PropValue::Block(bytes));
    }

    pub fn get_value(&self, name: &str) -> Option<&PropValue> {
        self.props.as_ref().and_then(|p| p.get(name))
    }

    pub fn remove_value(&mut self, name: &str) {
        if let Some(p) = self.props.as_mut() {
            p.remove(name);
        }
    }

    /// A member or property rendered through a printf-style spec such as `%10.2f` or
    /// `%-8s`. Members win over properties of the same name.
    pub fn get_string_value(&self, name: &str, spec: &str) -> Option<String> {
        if let Some(i) = self.member_index(name) {
            let col = self.schema.column(i).unwrap();
            return Some(codec::format_with_spec(col, &self.values[i], spec));
        }
        match self.get_value(name) {
            Some(PropValue::Str(s)) => Some(s.clone()),
            _ => None,
        }
    }

    /// Serialize to a self-describing byte buffer (`table name`, newline, record line).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.schema.line_length() + 16);
        out.extend_from_slice(self.table_name().as_bytes());
        out.push(b'\n');
        out.extend_from_slice(self.to_line().as_bytes());
        out
    }

    /// The inverse of [`to_bytes`]. The named schema must still be registered.
    pub fn from_bytes(bytes: &[u8]) -> Result<CssRecord> {
        let text = std::str::from_utf8(bytes).map_err(|_| FfdbError::BadObject {
            reason: "record bytes are not utf-8".to_string(),
        })?;
        let mut parts = text.splitn(2, '\n');
        let name = parts.next().unwrap_or("");
        let line = parts.next().ok_or(FfdbError::BadObject {
            reason: "record bytes carry no line".to_string(),
        })?;
        let mut rec = CssRecord::new(name)?;
        codec::read_line(&mut rec, line)?;
        Ok(rec)
    }

    pub(crate) fn values_mut(&mut self) -> &mut Vec<CssValue> {
        &mut self.values
    }

    pub fn values(&self) -> &[CssValue] {
        &self.values
    }
}
