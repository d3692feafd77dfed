//! Load statement rendering
//!
//! The pipe runs a `COPY INTO` statement whose text has to match exactly.
//! Two details matter:
//!
//! - `PATTERN` is a regular expression, not a shell glob. A glob such as
//!   `*.csv` matches nothing on the warehouse side, so it is rejected here.
//! - the projection starts at `$2`; `$1` of every exported file is a row
//!   number.

use crate::error::{Result, StackError};
use regex::Regex;
use snowpipe_graph::Output;
use tera::{Context, Tera};

/// Files the pipe loads, relative to the stage root
pub const FILE_PATTERN: &str = "jaffle-shop-customers/.*.csv";

/// Source file columns copied after the metadata columns
pub const SOURCE_COLUMNS: &[usize] = &[2, 3];

// Surrounded by newlines; the exported value carries them verbatim
const COPY_TEMPLATE: &str = concat!(
    "\n",
    "COPY INTO \"{{ database }}\".\"{{ schema }}\".\"{{ table }}\" \n",
    "FROM (SELECT metadata$filename, metadata$file_last_modified, sysdate(), {{ columns }} ",
    "FROM @\"{{ database }}\".\"{{ schema }}\".\"{{ stage }}\")\n",
    "FILE_FORMAT = (TYPE = CSV, SKIP_HEADER = 1)\n",
    "PATTERN=\"{{ pattern }}\"\n",
);

/// Identifiers interpolated into the load statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyStatement {
    pub database: String,
    pub schema: String,
    pub table: String,
    pub stage: String,
}

impl CopyStatement {
    pub fn new(
        database: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
        stage: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            schema: schema.into(),
            table: table.into(),
            stage: stage.into(),
        }
    }

    /// Render the statement text
    pub fn render(&self) -> Result<String> {
        check_identifier("database", &self.database)?;
        check_identifier("schema", &self.schema)?;
        check_identifier("table", &self.table)?;
        check_identifier("stage", &self.stage)?;
        validate_pattern(FILE_PATTERN)?;

        let columns = SOURCE_COLUMNS
            .iter()
            .map(|c| format!("${}", c))
            .collect::<Vec<_>>()
            .join(", ");

        let mut context = Context::new();
        context.insert("database", &self.database);
        context.insert("schema", &self.schema);
        context.insert("table", &self.table);
        context.insert("stage", &self.stage);
        context.insert("columns", &columns);
        context.insert("pattern", FILE_PATTERN);

        Ok(Tera::one_off(COPY_TEMPLATE, &context, false)?)
    }
}

/// Load statement as a deferred value over the four resource names
pub fn copy_statement_output(
    database: &Output<String>,
    schema: &Output<String>,
    table: &Output<String>,
    stage: &Output<String>,
) -> Output<String> {
    database
        .zip(schema)
        .zip(table)
        .zip(stage)
        .try_apply(|(((database, schema), table), stage)| {
            CopyStatement::new(database, schema, table, stage).render()
        })
}

/// Reject patterns that are not valid regular expressions
pub fn validate_pattern(pattern: &str) -> Result<()> {
    Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| StackError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

fn check_identifier(kind: &'static str, value: &str) -> Result<()> {
    if value.is_empty() || value.contains('"') {
        return Err(StackError::InvalidIdentifier {
            kind,
            value: value.to_string(),
        });
    }
    Ok(())
}
