//! Human-readable, colored change-set rendering.
//!
//! Mirrors a review diff: table creations are green `[+]`, drops red `[-]`,
//! alterations blue `[*]`, with column rows indented underneath.
//! Description edits render as a character-level diff. Styling is skipped
//! entirely when the output is not a terminal.

use std::io;
use std::str::FromStr;

use crossterm::style::Stylize;

use crate::dialect::DialectAdapter;
use crate::diff::{AlterKind, ColumnChangeKind, TableChange, TableChangeKind};
use crate::error::{MigrateError, Result};
use crate::render::ddl;
use crate::schema::Column;
use crate::util::plural;

const CREATE_SYMBOL: &str = "[+]";
const DROP_SYMBOL: &str = "[-]";
const ALTER_SYMBOL: &str = "[*]";

/// Continuation-line padding aligning change details under the first line.
static MULTI_PADDING: std::sync::LazyLock<String> = std::sync::LazyLock::new(|| " ".repeat(23));

/// Output formats for a change set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffFormat {
    Text,
    Sql,
}

impl FromStr for DiffFormat {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(DiffFormat::Text),
            "sql" => Ok(DiffFormat::Sql),
            other => Err(MigrateError::input(format!(
                "unsupported diff format: {}",
                other
            ))),
        }
    }
}

/// Render a change set in the requested format. `color` enables ANSI
/// styling for the text format; pass false when not writing to a TTY.
pub fn format_diff(
    format: DiffFormat,
    adapter: &dyn DialectAdapter,
    changes: &[TableChange],
    out: &mut dyn io::Write,
    color: bool,
) -> Result<()> {
    match format {
        DiffFormat::Text => format_text_diff(adapter, changes, out, &Styler { enabled: color }),
        DiffFormat::Sql => ddl::format_sql(adapter, changes, out),
    }
}

/// ANSI styling that degrades to plain text when disabled.
struct Styler {
    enabled: bool,
}

impl Styler {
    fn green(&self, s: &str) -> String {
        if self.enabled {
            s.green().to_string()
        } else {
            s.to_string()
        }
    }

    fn red(&self, s: &str) -> String {
        if self.enabled {
            s.red().to_string()
        } else {
            s.to_string()
        }
    }

    fn blue(&self, s: &str) -> String {
        if self.enabled {
            s.blue().to_string()
        } else {
            s.to_string()
        }
    }

    fn yellow(&self, s: &str) -> String {
        if self.enabled {
            s.yellow().to_string()
        } else {
            s.to_string()
        }
    }

    fn magenta(&self, s: &str) -> String {
        if self.enabled {
            s.magenta().bold().to_string()
        } else {
            s.to_string()
        }
    }

    fn bold(&self, s: &str) -> String {
        if self.enabled {
            s.bold().to_string()
        } else {
            s.to_string()
        }
    }

    fn dim(&self, s: &str) -> String {
        if self.enabled {
            s.dark_grey().to_string()
        } else {
            s.to_string()
        }
    }

    fn deleted(&self, s: &str) -> String {
        if self.enabled {
            s.red().crossed_out().to_string()
        } else {
            s.to_string()
        }
    }
}

fn safe_nil(val: Option<&str>) -> &str {
    val.unwrap_or("NULL")
}

fn safe_bool(val: Option<bool>) -> &'static str {
    match val {
        None => "NULL",
        Some(true) => "true",
        Some(false) => "false",
    }
}

/// A character-level diff of two strings: the common prefix and suffix stay
/// neutral, the removed middle is struck out, the inserted middle is green.
fn string_diff(styler: &Styler, from: &str, to: &str) -> String {
    let from_chars: Vec<char> = from.chars().collect();
    let to_chars: Vec<char> = to.chars().collect();

    let mut prefix = 0;
    while prefix < from_chars.len()
        && prefix < to_chars.len()
        && from_chars[prefix] == to_chars[prefix]
    {
        prefix += 1;
    }
    let mut suffix = 0;
    while suffix < from_chars.len() - prefix
        && suffix < to_chars.len() - prefix
        && from_chars[from_chars.len() - 1 - suffix] == to_chars[to_chars.len() - 1 - suffix]
    {
        suffix += 1;
    }

    let collect = |chars: &[char]| chars.iter().collect::<String>();
    let mut out = String::new();
    out.push_str(&styler.yellow(&collect(&from_chars[..prefix])));
    out.push_str(&styler.deleted(&collect(&from_chars[prefix..from_chars.len() - suffix])));
    out.push_str(&styler.green(&collect(&to_chars[prefix..to_chars.len() - suffix])));
    out.push_str(&styler.yellow(&collect(&from_chars[from_chars.len() - suffix..])));
    out
}

fn native_type_display(adapter: &dyn DialectAdapter, column: &Column) -> String {
    adapter
        .to_native_type(column)
        .unwrap_or_else(|| "NULL".to_string())
}

fn write_column_row(
    adapter: &dyn DialectAdapter,
    styler: &Styler,
    column: &Column,
    out: &mut dyn io::Write,
) -> Result<()> {
    writeln!(
        out,
        "{}{} {}",
        styler.bold(&format!("{:<15} ", column.name)),
        format!("{:<8}", column.column_type.as_str()),
        styler.dim(&native_type_display(adapter, column))
    )?;
    Ok(())
}

fn format_text_diff(
    adapter: &dyn DialectAdapter,
    changes: &[TableChange],
    out: &mut dyn io::Write,
    styler: &Styler,
) -> Result<()> {
    writeln!(
        out,
        "{}\n",
        styler.bold("The following changes need to be applied to bring your database up-to-date:")
    )?;

    for change in changes {
        match change.kind {
            TableChangeKind::Create => {
                let count = change.table_ref.columns.len();
                write!(
                    out,
                    "{}{}{}",
                    styler.green(&format!("{} Create ", CREATE_SYMBOL)),
                    styler.magenta(&change.table),
                    styler.green(&format!(
                        " with {} {}:\n",
                        count,
                        plural(count, "column", "columns")
                    ))
                )?;
                for column in &change.table_ref.columns {
                    write!(out, "{}", styler.green(&format!("    {} ", CREATE_SYMBOL)))?;
                    write_column_row(adapter, styler, column, out)?;
                }
            }
            TableChangeKind::Drop => {
                let count = change.table_ref.columns.len();
                write!(
                    out,
                    "{}{}{}",
                    styler.red(&format!("{} Drop ", DROP_SYMBOL)),
                    styler.magenta(&change.table),
                    styler.red(&format!(
                        " with {} {}:\n",
                        count,
                        plural(count, "column", "columns")
                    ))
                )?;
                for column in &change.table_ref.columns {
                    write!(out, "{}", styler.red(&format!("    {} ", DROP_SYMBOL)))?;
                    write_column_row(adapter, styler, column, out)?;
                }
            }
            TableChangeKind::Alter => {
                write!(
                    out,
                    "{}{}",
                    styler.blue(&format!("{} Alter ", ALTER_SYMBOL)),
                    styler.magenta(&change.table)
                )?;
                if !change.columns.is_empty() {
                    let count = change.columns.len();
                    write!(
                        out,
                        "{}",
                        styler.blue(&format!(
                            " with {} {}:\n",
                            count,
                            plural(count, "column", "columns")
                        ))
                    )?;
                    format_alter_columns(adapter, styler, change, out)?;
                } else if let Some(description) = &change.description {
                    write!(
                        out,
                        "{}{}{}{}",
                        styler.blue(" with description changed from "),
                        styler.yellow(safe_nil(description.from.as_deref())),
                        styler.blue(" to "),
                        styler.yellow(safe_nil(description.to.as_deref()))
                    )?;
                }
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

fn alter_value_display(
    adapter: &dyn DialectAdapter,
    styler: &Styler,
    kind: AlterKind,
    column: &Column,
) -> String {
    let driver = adapter.driver();
    match kind {
        AlterKind::TypeChanged => format!(
            "{}{}",
            styler.yellow(column.column_type.as_str()),
            styler.dim(&format!(" ({})", native_type_display(adapter, column)))
        ),
        AlterKind::DefaultChanged => styler.yellow(safe_nil(column.default_for(driver))),
        AlterKind::DescriptionChanged => styler.yellow(safe_nil(column.description.as_deref())),
        AlterKind::NullableChanged => styler.yellow(safe_bool(column.nullable)),
    }
}

fn format_alter_columns(
    adapter: &dyn DialectAdapter,
    styler: &Styler,
    change: &TableChange,
    out: &mut dyn io::Write,
) -> Result<()> {
    for column_change in &change.columns {
        let symbol = match column_change.kind {
            ColumnChangeKind::Create => CREATE_SYMBOL,
            ColumnChangeKind::Drop => DROP_SYMBOL,
            ColumnChangeKind::Alter => ALTER_SYMBOL,
        };
        write!(
            out,
            "{}{}",
            styler.blue(&format!("    {} ", symbol)),
            styler.bold(&format!("{:<15} ", column_change.name))
        )?;
        match column_change.kind {
            ColumnChangeKind::Create => {
                writeln!(
                    out,
                    "add column {}{}",
                    styler.yellow(column_change.column.column_type.as_str()),
                    styler.dim(&format!(
                        " ({})",
                        native_type_display(adapter, &column_change.column)
                    ))
                )?;
            }
            ColumnChangeKind::Drop => {
                writeln!(out, "drop column")?;
            }
            ColumnChangeKind::Alter => {
                let mut lines = Vec::new();
                for kind in &column_change.changes {
                    let mut line = kind.to_string();
                    if *kind == AlterKind::DescriptionChanged {
                        let previous = column_change
                            .previous
                            .as_ref()
                            .and_then(|c| c.description.as_deref())
                            .unwrap_or("NULL");
                        let current = column_change.column.description.as_deref().unwrap_or("NULL");
                        line.push_str(": ");
                        line.push_str(&string_diff(styler, previous, current));
                    } else {
                        line.push_str(" from ");
                        if let Some(previous) = &column_change.previous {
                            line.push_str(&alter_value_display(adapter, styler, *kind, previous));
                        }
                        line.push_str(" to ");
                        line.push_str(&alter_value_display(
                            adapter,
                            styler,
                            *kind,
                            &column_change.column,
                        ));
                    }
                    lines.push(line);
                }
                match lines.split_first() {
                    Some((first, rest)) => {
                        writeln!(out, "{}", first)?;
                        for line in rest {
                            writeln!(out, "{} {}", *MULTI_PADDING, line)?;
                        }
                    }
                    None => {
                        writeln!(out, "{}", styler.red("missing changes"))?;
                    }
                }
            }
        }
    }
    if let Some(description) = &change.description {
        writeln!(
            out,
            "\n{}{}",
            styler.blue("    table description changed from "),
            string_diff(
                styler,
                safe_nil(description.from.as_deref()),
                safe_nil(description.to.as_deref())
            )
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{Driver, PostgresAdapter};
    use crate::diff::diff;
    use crate::schema::{Database, DialectValues, GenericType, Schema, Table};

    fn plain() -> Styler {
        Styler { enabled: false }
    }

    fn render(changes: &[TableChange]) -> String {
        let mut out = Vec::new();
        format_diff(
            DiffFormat::Text,
            &PostgresAdapter::new(),
            changes,
            &mut out,
            false,
        )
        .unwrap();
        String::from_utf8(out).unwrap()
    }

    fn schema(tables: Vec<Table>) -> Schema {
        Schema {
            schema_url: None,
            version: "1".to_string(),
            database: Database {
                url: "postgres://localhost/app".to_string(),
            },
            tables,
        }
    }

    fn column(name: &str, column_type: GenericType) -> Column {
        Column {
            name: name.to_string(),
            column_type,
            ..Default::default()
        }
    }

    fn table(name: &str, columns: Vec<Column>) -> Table {
        Table {
            name: name.to_string(),
            description: None,
            columns,
        }
    }

    #[test]
    fn test_diff_format_parse() {
        assert_eq!("text".parse::<DiffFormat>().unwrap(), DiffFormat::Text);
        assert_eq!("sql".parse::<DiffFormat>().unwrap(), DiffFormat::Sql);
        assert!("xml".parse::<DiffFormat>().is_err());
    }

    #[test]
    fn test_string_diff_plain() {
        let styler = plain();
        assert_eq!(string_diff(&styler, "primary id", "primary key"), "primary idkey");
        assert_eq!(string_diff(&styler, "same", "same"), "same");
        assert_eq!(string_diff(&styler, "", "new"), "new");
    }

    #[test]
    fn test_string_diff_colored_marks_segments() {
        let styler = Styler { enabled: true };
        let out = string_diff(&styler, "abcd", "abxd");
        // strikethrough marks the deleted segment
        assert!(out.contains("\u{1b}[9m"));
        // and the unchanged/inserted segments carry color codes
        assert!(out.matches('\u{1b}').count() > 2);
    }

    #[test]
    fn test_text_create_table() {
        let adapter = PostgresAdapter::new();
        let desired = schema(vec![table(
            "users",
            vec![column("id", GenericType::Int), column("email", GenericType::String)],
        )]);
        let existing = schema(vec![]);
        let changes = diff(&adapter, &desired, &existing).unwrap();

        let out = render(&changes);
        assert!(out.contains("[+] Create users with 2 columns:"));
        assert!(out.contains("id"));
        assert!(out.contains("int8"));
        assert!(out.contains("email"));
    }

    #[test]
    fn test_text_drop_table_pluralization() {
        let adapter = PostgresAdapter::new();
        let desired = schema(vec![]);
        let existing = schema(vec![table("old", vec![column("id", GenericType::Int)])]);
        let changes = diff(&adapter, &desired, &existing).unwrap();

        let out = render(&changes);
        assert!(out.contains("[-] Drop old with 1 column:"));
    }

    #[test]
    fn test_text_alter_column_changes() {
        let adapter = PostgresAdapter::new();
        let mut desired_col = column("a", GenericType::Int);
        desired_col.default = Some(DialectValues::for_driver(Driver::Postgres, "2"));
        let mut existing_col = column("a", GenericType::Int);
        existing_col.default = Some(DialectValues::for_driver(Driver::Postgres, "1"));

        let desired = schema(vec![table("t", vec![desired_col])]);
        let existing = schema(vec![table("t", vec![existing_col])]);
        let changes = diff(&adapter, &desired, &existing).unwrap();

        let out = render(&changes);
        assert!(out.contains("[*] Alter t with 1 column:"));
        assert!(out.contains("default changed from 1 to 2"));
    }

    #[test]
    fn test_text_description_only_table_change() {
        let adapter = PostgresAdapter::new();
        let mut desired_table = table("t", vec![column("a", GenericType::String)]);
        desired_table.description = Some("audit".to_string());
        let desired = schema(vec![desired_table]);
        let existing = schema(vec![table("t", vec![column("a", GenericType::String)])]);
        let changes = diff(&adapter, &desired, &existing).unwrap();

        let out = render(&changes);
        assert!(out.contains("[*] Alter t with description changed from NULL to audit"));
    }

    #[test]
    fn test_text_output_has_no_ansi_when_disabled() {
        let adapter = PostgresAdapter::new();
        let desired = schema(vec![table("users", vec![column("id", GenericType::Int)])]);
        let existing = schema(vec![]);
        let changes = diff(&adapter, &desired, &existing).unwrap();

        let out = render(&changes);
        assert!(!out.contains('\u{1b}'));
    }
}
