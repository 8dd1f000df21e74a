// docline-core/src/options.rs
// Collection construction options and file open modes

/// Virtual resource name for a purely in-memory collection
pub const MEMORY: &str = ":memory:";

/// Default primary-key field name
pub const DEFAULT_PRIMARY_KEY: &str = "_id";

/// Options fixed for the lifetime of a collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionOptions {
    /// Field holding each document's primary key
    pub primary_key: String,

    /// Build a missing index on first use during `find`.
    /// When false, querying an unindexed path fails with `NoSuchIndex`.
    pub auto_build_indexes: bool,

    /// Also index documents under a literal top-level key equal to the dotted
    /// path (`{"a.b": 1}` for path `a.b`). Deprecated; warns on use.
    pub dotted_key_fallback: bool,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        CollectionOptions {
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
            auto_build_indexes: true,
            dotted_key_fallback: true,
        }
    }
}

impl CollectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    pub fn with_auto_build_indexes(mut self, auto_build: bool) -> Self {
        self.auto_build_indexes = auto_build;
        self
    }

    pub fn with_dotted_key_fallback(mut self, enabled: bool) -> Self {
        self.dotted_key_fallback = enabled;
        self
    }
}

/// How a backing file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    /// Existing file, read only. Flushing pending changes fails.
    Read,
    /// Read and rewrite; the file is created when missing.
    #[default]
    Append,
    /// Read and rewrite, discarding any previous content.
    Truncate,
}

impl OpenMode {
    /// Parse an fopen-style mode string (`r`, `a+`, `w+`, ...)
    pub fn parse(mode: &str) -> Option<OpenMode> {
        match mode {
            "r" | "r+" | "read" => Some(OpenMode::Read),
            "a" | "a+" | "append" => Some(OpenMode::Append),
            "w" | "w+" | "truncate" => Some(OpenMode::Truncate),
            _ => None,
        }
    }

    pub fn is_writable(&self) -> bool {
        !matches!(self, OpenMode::Read)
    }
}
