//! Printing extracted values as a table, either aligned for reading
//! on a terminal (bold titles), or tab-separated for other programs.

//! Values are printed via `Display` without escaping, which is fine
//! for numbers and quantity names.

use std::{fmt::Display, io::Write};

use anyhow::{bail, Result};
use yansi::{Paint, Style};

const TITLE_STYLE: Style = Style::new().bold();

/// Columns have a fixed width (except the last one, which is not
/// padded), so rows can be written as they are produced. Values wider
/// than their column are still followed by a space.
pub struct TerminalTable {
    widths: Vec<usize>,
    titles: Vec<String>,
    /// Tab-separated, without padding or ANSI sequences
    pub tsv_mode: bool,
}

impl TerminalTable {
    /// `widths` gives the widths of all but the last column.
    pub fn new<S: Display>(widths: &[usize], titles: &[S], tsv_mode: bool) -> Result<Self> {
        if widths.len() + 1 != titles.len() {
            bail!(
                "need one width less than titles, got {} widths for {} titles",
                widths.len(),
                titles.len()
            )
        }
        Ok(Self {
            widths: widths.to_owned(),
            titles: titles.iter().map(ToString::to_string).collect(),
            tsv_mode,
        })
    }

    fn write_row<V: Display>(
        &self,
        row: &[V],
        style: Option<Style>,
        out: &mut impl Write,
    ) -> Result<()> {
        if row.len() != self.titles.len() {
            bail!(
                "row has {} values, table has {} columns",
                row.len(),
                self.titles.len()
            )
        }
        let mut line = String::new();
        for (i, value) in row.iter().enumerate() {
            let s = value.to_string();
            if self.tsv_mode {
                if i > 0 {
                    line.push('\t');
                }
                line.push_str(&s);
                continue;
            }
            let len = s.chars().count();
            match style {
                Some(style) => line.push_str(&s.paint(style).to_string()),
                None => line.push_str(&s),
            }
            if let Some(&width) = self.widths.get(i) {
                let padding = width.saturating_sub(len).max(1);
                line.extend(std::iter::repeat(' ').take(padding));
            }
        }
        line.push('\n');
        out.write_all(line.as_bytes())?;
        Ok(())
    }

    pub fn write_title_row(&self, out: &mut impl Write) -> Result<()> {
        let style = if self.tsv_mode {
            None
        } else {
            Some(TITLE_STYLE)
        };
        self.write_row(&self.titles, style, out)
    }

    pub fn write_data_row<V: Display>(&self, row: &[V], out: &mut impl Write) -> Result<()> {
        self.write_row(row, None, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(table: &TerminalTable, rows: &[[&str; 3]]) -> String {
        let mut out = Vec::new();
        for row in rows {
            table.write_data_row(row, &mut out).unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn t_padding() {
        let table = TerminalTable::new(&[4, 3], &["t", "a", "b"], false).unwrap();
        assert_eq!(
            written(&table, &[["1", "2", "3"], ["10000", "20", "30"]]),
            "1   2  3\n10000 20 30\n"
        );
    }

    #[test]
    fn t_tsv() {
        let table = TerminalTable::new(&[4, 3], &["t", "a", "b"], true).unwrap();
        assert_eq!(written(&table, &[["1", "2", "3"]]), "1\t2\t3\n");
        let mut out = Vec::new();
        table.write_title_row(&mut out).unwrap();
        assert_eq!(out, b"t\ta\tb\n");
    }

    #[test]
    fn t_column_count() {
        assert!(TerminalTable::new(&[4], &["t", "a", "b"], true).is_err());
        let table = TerminalTable::new(&[4], &["t", "a"], true).unwrap();
        assert!(table.write_data_row(&["1"], &mut Vec::<u8>::new()).is_err());
    }
}
