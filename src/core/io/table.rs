use std::io::{self, Write};

/// Column value formats of the GATK report, mirrored in the `#:GATKTable`
/// header line.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ColumnFormat {
    String,
    Char,
    Float4,
    Float2,
    Uint64,
}

impl ColumnFormat {
    fn spec(self) -> &'static str {
        match self {
            ColumnFormat::String | ColumnFormat::Char => "%s",
            ColumnFormat::Float4 => "%.4f",
            ColumnFormat::Float2 => "%.2f",
            ColumnFormat::Uint64 => "%d",
        }
    }

    fn right_aligned(self) -> bool {
        matches!(self, ColumnFormat::Float4 | ColumnFormat::Float2 | ColumnFormat::Uint64)
    }
}

#[derive(Clone, Debug)]
pub enum Cell {
    Str(String),
    Char(char),
    Float(f64),
    Uint(u64),
}

impl Cell {
    fn render(&self, format: ColumnFormat) -> String {
        match (self, format) {
            (Cell::Str(x), _) => x.clone(),
            (Cell::Char(x), _) => x.to_string(),
            (Cell::Float(x), ColumnFormat::Float4) => format!("{:.4}", x),
            (Cell::Float(x), _) => format!("{:.2}", x),
            (Cell::Uint(x), _) => x.to_string(),
        }
    }
}

/// One `#:GATKTable` block: column metadata plus rows, rendered with
/// two-pass width computation (strings left-aligned, numbers right-aligned).
pub struct GatkTable {
    name: String,
    description: String,
    columns: Vec<(String, ColumnFormat)>,
    rows: Vec<Vec<Cell>>,
}

impl GatkTable {
    pub fn new(name: &str, description: &str, columns: &[(&str, ColumnFormat)]) -> Self {
        GatkTable {
            name: name.to_owned(),
            description: description.to_owned(),
            columns: columns.iter().map(|&(name, format)| (name.to_owned(), format)).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row(&mut self, cells: Vec<Cell>) {
        debug_assert_eq!(cells.len(), self.columns.len());
        self.rows.push(cells);
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn render(&self, out: &mut impl Write) -> io::Result<()> {
        let formats: Vec<String> = self.columns.iter().map(|&(_, format)| format.spec().to_owned()).collect();
        writeln!(out, "#:GATKTable:{}:{}:{}:;", self.columns.len(), self.rows.len(), formats.join(":"))?;
        writeln!(out, "#:GATKTable:{}:{}", self.name, self.description)?;

        // first pass: column widths over header and rendered cells
        let mut widths: Vec<usize> = self.columns.iter().map(|(name, _)| name.len()).collect();
        let rendered: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(i, cell)| {
                        let text = cell.render(self.columns[i].1);
                        widths[i] = widths[i].max(text.len());
                        text
                    })
                    .collect()
            })
            .collect();

        let header: Vec<String> =
            self.columns.iter().enumerate().map(|(i, (name, _))| format!("{:<1$}", name, widths[i])).collect();
        writeln!(out, "{}", header.join("  ").trim_end())?;

        for row in &rendered {
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(i, text)| {
                    if self.columns[i].1.right_aligned() {
                        format!("{:>1$}", text, widths[i])
                    } else {
                        format!("{:<1$}", text, widths[i])
                    }
                })
                .collect();
            writeln!(out, "{}", cells.join("  ").trim_end())?;
        }
        writeln!(out)
    }
}

/// Renders the full report: version line, then every table.
pub fn write_report(out: &mut impl Write, tables: &[GatkTable]) -> io::Result<()> {
    writeln!(out, "#:GATKReport.v1.1:{}", tables.len())?;
    for table in tables {
        table.render(out)?;
    }
    Ok(())
}
