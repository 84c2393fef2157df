/// Basic error types.
///
/// The enumeration is closed: every failure the flat-file database can report is one of
/// these kinds. `errno` returns the classic numeric code for callers that log or switch on
/// the number rather than the variant.
#[derive(Debug)]
pub enum FfdbError {
    /// The parameter root directory does not exist or is not a directory.
    NoParamRoot { path: String },
    /// The segment (waveform) root directory does not exist or is not a directory.
    NoSegRoot { path: String },
    /// The directory-structure string contains an unknown token.
    BadStructure { structure: String },
    /// A partition or author directory could not be created.
    CreateDirErr { path: String },
    /// A directory could not be opened for listing.
    OpenDirErr { path: String },
    /// A file could not be stat'ed.
    StatFileErr { path: String },
    /// A file could not be opened for reading.
    OpenReadErr { path: String },
    /// A file could not be opened for writing.
    OpenWriteErr { path: String },
    /// The named author is unknown to the database.
    AuthorErr { author: String },
    /// A record line failed to decode; the reader skips it and continues.
    TableReadErr {
        file: String,
        line_no: usize,
        reason: String,
    },
    /// A record could not be serialized or written.
    TableWriteErr { file: String, reason: String },
    /// The author exists but is not writable.
    AuthorWriteErr { author: String },
    /// The query text failed to parse or bind.
    InvalidQuery { reason: String },
    /// An update addressed members that do not exist or disagree in count.
    InvalidUpdate { reason: String },
    /// The record to update carries no file provenance.
    NoUpdateFile { table: String },
    /// The record to delete carries no file provenance.
    NoDeleteFile { table: String },
    /// A time-partitioned operation was attempted on a record without a time member.
    NoTime { table: String },
    /// A bulk import failed.
    ImportErr { path: String, reason: String },
    /// A background thread could not be spawned.
    ThreadErr { reason: String },
    /// The bounded hand-off queue failed.
    SemaphoreErr { reason: String },
    /// A background thread could not be joined.
    JoinErr { reason: String },
    /// An allocation-sized request was out of range.
    AllocErr { reason: String },
    /// No lastid row exists for the requested keyname and none could be created.
    NoLastid { keyname: String },
    /// The configured id batch increment is not positive.
    BadIncrement { keyname: String, increment: i64 },
    /// A line length did not match the schema's line length.
    WrongFormat {
        table: String,
        expected: usize,
        got: usize,
    },
    /// A record or schema handle was used where a different one was required.
    BadObject { reason: String },
    /// IoError from the std library.
    StdIoError(std::io::Error),
}

impl FfdbError {
    /// The classic numeric error code.
    pub fn errno(&self) -> i32 {
        use self::FfdbError::*;
        match self {
            NoParamRoot { .. } => 1,
            NoSegRoot { .. } => 2,
            BadStructure { .. } => 3,
            CreateDirErr { .. } => 4,
            OpenDirErr { .. } => 5,
            StatFileErr { .. } => 6,
            OpenReadErr { .. } => 7,
            OpenWriteErr { .. } => 8,
            AuthorErr { .. } => 9,
            TableReadErr { .. } => 10,
            TableWriteErr { .. } => 11,
            AuthorWriteErr { .. } => 12,
            InvalidQuery { .. } => 13,
            InvalidUpdate { .. } => 14,
            NoUpdateFile { .. } => 15,
            NoDeleteFile { .. } => 16,
            NoTime { .. } => 17,
            ImportErr { .. } => 18,
            ThreadErr { .. } => 19,
            SemaphoreErr { .. } => 20,
            JoinErr { .. } => 22,
            AllocErr { .. } => 23,
            NoLastid { .. } => 24,
            BadIncrement { .. } => 25,
            WrongFormat { .. } => 100,
            BadObject { .. } => 102,
            StdIoError(_) => 0,
        }
    }

    /// A single-line message suitable for log emission.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl From<std::io::Error> for FfdbError {
    fn from(e: std::io::Error) -> Self {
        Self::StdIoError(e)
    }
}

impl std::fmt::Display for FfdbError {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use self::FfdbError::*;
        match self {
            NoParamRoot { path } => write!(fmt, "No parameter root: {}", path),
            NoSegRoot { path } => write!(fmt, "No segment root: {}", path),
            BadStructure { structure } => {
                write!(fmt, "Invalid directory structure: {}", structure)
            }
            CreateDirErr { path } => write!(fmt, "Cannot create directory: {}", path),
            OpenDirErr { path } => write!(fmt, "Cannot open directory: {}", path),
            StatFileErr { path } => write!(fmt, "Cannot stat file: {}", path),
            OpenReadErr { path } => write!(fmt, "Cannot open file for reading: {}", path),
            OpenWriteErr { path } => write!(fmt, "Cannot open file for writing: {}", path),
            AuthorErr { author } => write!(fmt, "Unknown author: {}", author),
            TableReadErr {
                file,
                line_no,
                reason,
            } => write!(fmt, "{}: line {}: {}", file, line_no, reason),
            TableWriteErr { file, reason } => write!(fmt, "Cannot write {}: {}", file, reason),
            AuthorWriteErr { author } => write!(fmt, "Author is not writable: {}", author),
            InvalidQuery { reason } => write!(fmt, "Invalid query: {}", reason),
            InvalidUpdate { reason } => write!(fmt, "Invalid update: {}", reason),
            NoUpdateFile { table } => {
                write!(fmt, "Cannot update {}: record has no file", table)
            }
            NoDeleteFile { table } => {
                write!(fmt, "Cannot delete {}: record has no file", table)
            }
            NoTime { table } => write!(fmt, "Table {} has no time member", table),
            ImportErr { path, reason } => write!(fmt, "Cannot import {}: {}", path, reason),
            ThreadErr { reason } => write!(fmt, "Cannot start query thread: {}", reason),
            SemaphoreErr { reason } => write!(fmt, "Queue error: {}", reason),
            JoinErr { reason } => write!(fmt, "Cannot join query thread: {}", reason),
            AllocErr { reason } => write!(fmt, "Allocation error: {}", reason),
            NoLastid { keyname } => write!(fmt, "No lastid record for keyname: {}", keyname),
            BadIncrement { keyname, increment } => write!(
                fmt,
                "Invalid id increment {} for keyname {}",
                increment, keyname
            ),
            WrongFormat {
                table,
                expected,
                got,
            } => write!(
                fmt,
                "Wrong format for {}: expected {}-char line, got {}",
                table, expected, got
            ),
            BadObject { reason } => write!(fmt, "Bad object: {}", reason),
            StdIoError(x) => write!(fmt, "{}", x),
        }
    }
}

impl From<FfdbError> for String {
    fn from(e: FfdbError) -> String {
        e.to_string()
    }
}

impl std::error::Error for FfdbError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FfdbError::StdIoError(x) => x.source(),
            _ => None,
        }
    }
}
