//! Database types and enums

use tracing::warn;

/// Supported SQL backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DatabaseType {
    #[default]
    Sqlite,
    Postgres,
}

impl DatabaseType {
    /// Get database type from connection URL
    pub fn from_url(url: &str) -> Self {
        if url.starts_with("sqlite:") {
            DatabaseType::Sqlite
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            DatabaseType::Postgres
        } else {
            warn!("Unknown database URL format, defaulting to SQLite");
            DatabaseType::Sqlite
        }
    }

    /// Bind parameter placeholder for the 1-based `index`
    pub fn placeholder(self, index: usize) -> String {
        match self {
            DatabaseType::Sqlite => "?".to_string(),
            DatabaseType::Postgres => format!("${index}"),
        }
    }

    /// Comma separated placeholders for `count` parameters, numbered from `start`
    pub fn placeholders(self, start: usize, count: usize) -> String {
        (start..start + count)
            .map(|index| self.placeholder(index))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Most bind parameters a single statement may carry
    ///
    /// SQLite's compile-time default since 3.32, and the wire protocol's
    /// 16-bit parameter count for PostgreSQL.
    pub fn max_bind_parameters(self) -> usize {
        match self {
            DatabaseType::Sqlite => 32_766,
            DatabaseType::Postgres => 65_535,
        }
    }

    /// Column type used for the booking counters
    pub fn counter_column_type(self) -> &'static str {
        match self {
            DatabaseType::Sqlite => "INTEGER",
            DatabaseType::Postgres => "BIGINT",
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseType::Sqlite => write!(f, "sqlite"),
            DatabaseType::Postgres => write!(f, "postgres"),
        }
    }
}
