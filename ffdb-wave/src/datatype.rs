//! The `wfdisc.datatype` tags.
//!
//! Byte order is a property of the tag, never probed from the host: tags starting with
//! `s`, `g`, `t` or `e` are big-endian (Sun lineage), tags starting with `i` or `f` are
//! little-endian (VAX/Intel lineage). `ca` is an ASCII stream and has no byte order.
use ffdb_core::FfdbError;
use ffdb_core::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WfDatatype {
    /// 16-bit signed, big endian.
    S2,
    /// Packed 24-bit signed, big endian.
    S3,
    /// 32-bit signed, big endian.
    S4,
    /// 16-bit signed, little endian.
    I2,
    /// 32-bit signed, little endian.
    I4,
    /// IEEE float, big endian.
    T4,
    /// IEEE float, little endian.
    F4,
    /// Gain-ranged 16-bit (Gulf of Maine), big endian.
    G2,
    /// First-difference compressed, variable-width packed blocks.
    E1,
    /// Run-length / first-difference compressed ASCII.
    Ca,
}

impl WfDatatype {
    pub fn from_tag(tag: &str) -> Result<WfDatatype> {
        let dt = match tag {
            "s2" => WfDatatype::S2,
            "s3" => WfDatatype::S3,
            "s4" => WfDatatype::S4,
            "i2" => WfDatatype::I2,
            "i4" => WfDatatype::I4,
            "t4" => WfDatatype::T4,
            "f4" => WfDatatype::F4,
            "g2" => WfDatatype::G2,
            "e1" => WfDatatype::E1,
            "ca" => WfDatatype::Ca,
            _ => {
                return Err(FfdbError::BadObject {
                    reason: format!("unknown datatype '{}'", tag),
                })
            }
        };
        Ok(dt)
    }

    pub fn tag(self) -> &'static str {
        match self {
            WfDatatype::S2 => "s2",
            WfDatatype::S3 => "s3",
            WfDatatype::S4 => "s4",
            WfDatatype::I2 => "i2",
            WfDatatype::I4 => "i4",
            WfDatatype::T4 => "t4",
            WfDatatype::F4 => "f4",
            WfDatatype::G2 => "g2",
            WfDatatype::E1 => "e1",
            WfDatatype::Ca => "ca",
        }
    }

    /// Bytes per sample for the fixed-width tags; `None` for the compressed ones, whose
    /// byte length cannot be derived from `nsamp`.
    pub fn bytes_per_sample(self) -> Option<usize> {
        match self {
            WfDatatype::S2 | WfDatatype::I2 | WfDatatype::G2 => Some(2),
            WfDatatype::S3 => Some(3),
            WfDatatype::S4 | WfDatatype::I4 | WfDatatype::T4 | WfDatatype::F4 => Some(4),
            WfDatatype::E1 | WfDatatype::Ca => None,
        }
    }

    /// Whether samples decode to floats rather than integers.
    pub fn is_float(self) -> bool {
        matches!(self, WfDatatype::T4 | WfDatatype::F4)
    }

    pub fn big_endian(self) -> bool {
        !matches!(self, WfDatatype::I2 | WfDatatype::I4 | WfDatatype::F4)
    }
}

impl std::fmt::Display for WfDatatype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}
