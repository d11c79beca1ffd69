//! Command line and environment configuration.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use coinsheet_export::conf::C_PATH_OUTPUT_DEFAULT;
use coinsheet_export::{EnumColumnIdentifier, ExportResult, FrameSqlSource, SpecExportOptions};
use coinsheet_io_xlsx::{C_SHEET_NAME_DEFAULT, SpecXlsxWriteOptions};

/// Query used when none is configured.
pub const C_QUERY_DEFAULT: &str = "SELECT * FROM users";
/// Separator between table specs in `COINSHEET_TABLES`.
pub const C_TABLES_ENV_SEPARATOR: char = ';';

#[derive(Debug, Parser)]
#[command(name = "coinsheet")]
#[command(about = "Export user coin totals to a single-sheet workbook", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one export and print the artifact path
    Export(ArgsExport),

    /// Answer chat messages read from stdin, one per line
    Chat(ArgsExport),
}

/// One `NAME=PATH` table registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecTableSource {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct ArgsExport {
    /// Table to register, as NAME=PATH (.csv, .arrow, .ipc, .feather)
    #[arg(
        long = "table",
        value_name = "NAME=PATH",
        env = "COINSHEET_TABLES",
        value_delimiter = C_TABLES_ENV_SEPARATOR,
        value_parser = parse_table_spec
    )]
    pub tables: Vec<SpecTableSource>,

    /// SQL query producing the exported rows
    #[arg(long, env = "COINSHEET_QUERY", default_value = C_QUERY_DEFAULT)]
    pub query: String,

    /// Output workbook path
    #[arg(short, long, env = "COINSHEET_OUTPUT", default_value = C_PATH_OUTPUT_DEFAULT)]
    pub output: PathBuf,

    /// Column holding coin payloads: a zero-based position or a column name
    #[arg(long, env = "COINSHEET_AGGREGATE_COLUMN", default_value = "5")]
    pub aggregate_column: EnumColumnIdentifier,

    /// Worksheet name
    #[arg(long, env = "COINSHEET_SHEET_NAME", default_value = C_SHEET_NAME_DEFAULT)]
    pub sheet_name: String,
}

impl ArgsExport {
    pub fn to_export_options(&self) -> SpecExportOptions {
        SpecExportOptions {
            path_output: self.output.clone(),
            aggregate_column: self.aggregate_column.clone(),
            write_options: SpecXlsxWriteOptions {
                sheet_name: self.sheet_name.clone(),
                ..Default::default()
            },
            cancel_flag: None,
        }
    }

    /// SQL source with every configured table registered.
    pub fn build_source(&self) -> ExportResult<FrameSqlSource> {
        let mut source = FrameSqlSource::new();
        for table in &self.tables {
            source.register_file(&table.name, &table.path)?;
        }
        Ok(source)
    }
}

/// Parse `NAME=PATH`; both sides must be non-empty after trimming.
pub fn parse_table_spec(s: &str) -> Result<SpecTableSource, String> {
    let Some((c_name, c_path)) = s.split_once('=') else {
        return Err(format!("expected NAME=PATH, got {s:?}"));
    };
    let (c_name, c_path) = (c_name.trim(), c_path.trim());
    if c_name.is_empty() || c_path.is_empty() {
        return Err(format!("expected NAME=PATH, got {s:?}"));
    }
    Ok(SpecTableSource {
        name: c_name.to_string(),
        path: PathBuf::from(c_path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_table_spec() {
        assert_eq!(
            parse_table_spec(" users = data/users.csv ").unwrap(),
            SpecTableSource {
                name: "users".to_string(),
                path: PathBuf::from("data/users.csv"),
            }
        );
        assert!(parse_table_spec("users").is_err());
        assert!(parse_table_spec("=data/users.csv").is_err());
        assert!(parse_table_spec("users=").is_err());
    }

    #[test]
    fn test_cli_export_args() {
        let cli = Cli::try_parse_from([
            "coinsheet",
            "export",
            "--table",
            "users=data/users.csv",
            "--table",
            "groups=data/groups.arrow",
            "--aggregate-column",
            "coins",
            "--sheet-name",
            "Coins",
        ])
        .expect("valid args");

        let Commands::Export(args) = cli.command else {
            panic!("expected export subcommand");
        };
        assert_eq!(args.tables.len(), 2);
        assert_eq!(args.tables[1].name, "groups");

        let options = args.to_export_options();
        assert_eq!(
            options.aggregate_column,
            EnumColumnIdentifier::Name("coins".to_string())
        );
        assert_eq!(options.write_options.sheet_name, "Coins");
    }

    #[test]
    fn test_bad_table_spec_is_rejected() {
        let result = Cli::try_parse_from(["coinsheet", "export", "--table", "users"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_build_source_reports_missing_table() {
        let args = ArgsExport {
            tables: vec![SpecTableSource {
                name: "users".to_string(),
                path: PathBuf::from("/nonexistent/users.csv"),
            }],
            query: C_QUERY_DEFAULT.to_string(),
            output: PathBuf::from(C_PATH_OUTPUT_DEFAULT),
            aggregate_column: EnumColumnIdentifier::Index(5),
            sheet_name: C_SHEET_NAME_DEFAULT.to_string(),
        };
        let Err(err) = args.build_source() else {
            panic!("expected build_source to fail");
        };
        assert!(err.to_string().starts_with("Connection error"));
    }
}
