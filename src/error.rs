use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Per-table phase of a generation run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Operation {
    ForeignKeys,
    DescribeTable,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::ForeignKeys => write!(f, "foreign key lookup"),
            Operation::DescribeTable => write!(f, "describe table"),
        }
    }
}

/// Errors raised while generating models.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// Listing tables failed, so nothing can be generated.
    #[error("failed to list tables: {0:#}")]
    ListTables(#[source] anyhow::Error),

    /// Every table of a phase failed, or the introspector reports it has
    /// lost its connection.
    #[error("lost connection during {operation}: {failed} of {attempted} table(s) failed, last error: {last_error}")]
    ConnectionLost {
        operation: Operation,
        attempted: usize,
        failed: usize,
        last_error: String,
    },

    #[error("{operation} failed for table `{table}`: {source:#}")]
    Introspection {
        table: String,
        operation: Operation,
        #[source]
        source: anyhow::Error,
    },

    #[error("unknown database dialect `{0}`")]
    UnknownDialect(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A table that was skipped because one of its phases failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableFailure {
    pub table: String,
    pub operation: Operation,
    pub message: String,
}

impl TableFailure {
    /// Build a failure record from a per-table introspection error.
    pub fn from_error(err: &GenerateError) -> Option<Self> {
        match err {
            GenerateError::Introspection {
                table,
                operation,
                source,
            } => Some(TableFailure {
                table: table.clone(),
                operation: *operation,
                message: format!("{:#}", source),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for TableFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.table, self.operation, self.message)
    }
}
