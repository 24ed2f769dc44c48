use crate::cert::CertificateColumn;
use std::fmt::Display;

/// Types that can render a value for a list column
pub trait GetColumnValue {
    fn get_column_value(&self, column: &CertificateColumn) -> String;
}

impl<T: GetColumnValue + ?Sized> GetColumnValue for &T {
    fn get_column_value(&self, column: &CertificateColumn) -> String {
        (**self).get_column_value(column)
    }
}

/// Output format configuration
#[derive(Clone, Debug)]
pub struct OutputFormat {
    pub raw: bool,
}

/// Rows of cells for the given records and columns
pub fn build_table_data<T>(records: &[T], columns: &[CertificateColumn]) -> Vec<Vec<String>>
where
    T: GetColumnValue,
{
    records
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|col| record.get_column_value(col))
                .collect()
        })
        .collect()
}

impl OutputFormat {
    pub fn new(raw: bool) -> Self {
        Self { raw }
    }

    /// Records as a table; the header row is omitted in raw mode
    pub fn print_records<T>(&self, records: &[T], columns: &[CertificateColumn])
    where
        T: GetColumnValue,
    {
        let mut data = Vec::with_capacity(records.len() + 1);
        if !self.raw {
            data.push(columns.iter().map(|c| c.header().to_string()).collect());
        }
        data.extend(build_table_data(records, columns));
        self.print_table(&data);
    }

    pub fn print_table<T>(&self, data: &[Vec<T>])
    where
        T: Display + AsRef<str>,
    {
        for line in self.render_table(data) {
            println!("{line}");
        }
    }

    pub fn print_list<T>(&self, items: &[T])
    where
        T: Display,
    {
        for item in items {
            println!("{item}");
        }
    }

    pub fn print_key_value<K, V>(&self, pairs: &[(K, V)])
    where
        K: Display,
        V: Display,
    {
        let data: Vec<Vec<String>> = pairs
            .iter()
            .map(|(k, v)| vec![k.to_string(), v.to_string()])
            .collect();

        self.print_table(&data);
    }

    /// Tab-separated when raw, otherwise column-aligned like `column -t`
    fn render_table<T>(&self, data: &[Vec<T>]) -> Vec<String>
    where
        T: Display + AsRef<str>,
    {
        if self.raw {
            return data
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|cell| cell.as_ref())
                        .collect::<Vec<_>>()
                        .join("\t")
                })
                .collect();
        }

        let num_cols = data.iter().map(Vec::len).max().unwrap_or(0);
        let mut col_widths = vec![0; num_cols];
        for row in data {
            for (i, cell) in row.iter().enumerate() {
                col_widths[i] = col_widths[i].max(cell.as_ref().chars().count());
            }
        }

        data.iter()
            .map(|row| {
                let cells: Vec<String> = row
                    .iter()
                    .enumerate()
                    .map(|(i, cell)| {
                        if i == row.len() - 1 {
                            cell.to_string()
                        } else {
                            format!("{:<width$}", cell.as_ref(), width = col_widths[i])
                        }
                    })
                    .collect();
                cells.join("  ")
            })
            .collect()
    }
}
