use chrono::{Datelike, NaiveDate};
use log::{debug, info};
use rust_xlsxwriter::{
    Color, ExcelDateTime, Format, FormatBorder, Table, TableColumn, TableStyle, Workbook,
    Worksheet,
};

use crate::error::ExportError;
use crate::row::{Field, Row};

/// Name of the downloaded file.
pub const EXPORT_FILENAME: &str = "data.xlsx";

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub const TABLE_NAME: &str = "ExportTable";

/// Exported columns: the dataset order without product_name.
pub const EXPORT_FIELDS: [Field; 9] = [
    Field::OrderId,
    Field::OrderDate,
    Field::CustomerName,
    Field::ShipMode,
    Field::State,
    Field::Category,
    Field::Quantity,
    Field::Sales,
    Field::Profit,
];

/// Columns that receive a filter-aware subtotal in the totals row.
pub const TOTAL_FIELDS: [Field; 3] = [Field::Quantity, Field::Sales, Field::Profit];

/// Columns recoloured when the row's profit is negative.
pub const HIGHLIGHT_FIELDS: [Field; 2] = [Field::OrderId, Field::Profit];

pub const HEADER_FILL: u32 = 0xFFFF00;
pub const NEGATIVE_FILL: u32 = 0xFF0000;
pub const NEGATIVE_FONT: u32 = 0xFFFFFF;
pub const TOTAL_FILL: u32 = 0xF39C12;
pub const TOTAL_FONT: u32 = 0x17202A;

const DATE_FORMAT: &str = "yyyy-mm-dd";

// Excel SUBTOTAL function number for SUM that skips filtered-out rows.
const SUBTOTAL_SUM_VISIBLE: u16 = 109;

#[derive(Clone, Debug, PartialEq)]
pub enum CellContent {
    Empty,
    Text(String),
    Date(NaiveDate),
    Number(f64),
    /// A formula plus the value it evaluates to for the rows written.
    Formula { formula: String, cached: f64 },
}

/// Thin border sides.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Borders {
    pub top: bool,
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
}

impl Borders {
    pub const TOP_BOTTOM: Borders = Borders {
        top: true,
        bottom: true,
        left: false,
        right: false,
    };

    pub const LEFT_RIGHT: Borders = Borders {
        top: false,
        bottom: false,
        left: true,
        right: true,
    };
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CellStyle {
    pub fill: Option<u32>,
    pub font_color: Option<u32>,
    pub bold: bool,
    pub borders: Borders,
}

impl CellStyle {
    pub fn header() -> Self {
        CellStyle {
            fill: Some(HEADER_FILL),
            font_color: None,
            bold: true,
            borders: Borders::TOP_BOTTOM,
        }
    }

    pub fn negative_profit() -> Self {
        CellStyle {
            fill: Some(NEGATIVE_FILL),
            font_color: Some(NEGATIVE_FONT),
            bold: false,
            borders: Borders::LEFT_RIGHT,
        }
    }

    pub fn totals() -> Self {
        CellStyle {
            fill: Some(TOTAL_FILL),
            font_color: Some(TOTAL_FONT),
            bold: true,
            borders: Borders::LEFT_RIGHT,
        }
    }

    fn to_format(self) -> Format {
        let mut format = Format::new();
        if self.bold {
            format = format.set_bold();
        }
        if let Some(fill) = self.fill {
            format = format.set_background_color(Color::RGB(fill));
        }
        if let Some(color) = self.font_color {
            format = format.set_font_color(Color::RGB(color));
        }
        if self.borders.top {
            format = format.set_border_top(FormatBorder::Thin);
        }
        if self.borders.bottom {
            format = format.set_border_bottom(FormatBorder::Thin);
        }
        if self.borders.left {
            format = format.set_border_left(FormatBorder::Thin);
        }
        if self.borders.right {
            format = format.set_border_right(FormatBorder::Thin);
        }
        format
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SheetCell {
    pub content: CellContent,
    pub style: CellStyle,
}

impl SheetCell {
    fn new(content: CellContent, style: CellStyle) -> Self {
        SheetCell { content, style }
    }
}

/// Built-in table look applied to the export table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TablePreset {
    Medium2,
}

impl TablePreset {
    fn to_style(self) -> TableStyle {
        match self {
            TablePreset::Medium2 => TableStyle::Medium2,
        }
    }
}

/// The named table laid over the whole written range (zero-based, inclusive).
#[derive(Clone, Debug, PartialEq)]
pub struct TableSpec {
    pub name: String,
    pub last_row: u32,
    pub last_col: u16,
    pub style: TablePreset,
    pub banded_rows: bool,
    pub banded_columns: bool,
    pub first_column: bool,
    pub last_column: bool,
}

impl TableSpec {
    /// A1-style reference, e.g. `A1:I5`.
    pub fn range_ref(&self) -> String {
        format!(
            "A1:{}{}",
            column_to_letter(self.last_col + 1),
            self.last_row + 1
        )
    }
}

/// Everything the workbook will contain, before any bytes are written.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportSheet {
    pub headers: Vec<String>,
    /// Header row, then one row per exported record, then the totals row.
    pub rows: Vec<Vec<SheetCell>>,
    pub table: TableSpec,
}

impl ExportSheet {
    pub fn data_rows(&self) -> &[Vec<SheetCell>] {
        &self.rows[1..self.rows.len() - 1]
    }

    pub fn totals_row(&self) -> &[SheetCell] {
        &self.rows[self.rows.len() - 1]
    }
}

/// A finished workbook ready to stream to the client.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportFile {
    pub filename: &'static str,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExportOutcome {
    File(ExportFile),
    /// Nothing to export; no download should happen.
    Empty,
}

/// Build the sheet model for the visible rows.
///
/// Returns `Ok(None)` for an empty row set. Any non-finite currency value
/// aborts the whole build.
pub fn build_sheet(rows: &[Row]) -> Result<Option<ExportSheet>, ExportError> {
    if rows.is_empty() {
        return Ok(None);
    }

    let headers: Vec<String> = EXPORT_FIELDS.iter().map(|f| f.name().to_string()).collect();
    let mut sheet_rows: Vec<Vec<SheetCell>> = Vec::with_capacity(rows.len() + 2);

    sheet_rows.push(
        headers
            .iter()
            .map(|h| SheetCell::new(CellContent::Text(h.clone()), CellStyle::header()))
            .collect(),
    );

    for (index, row) in rows.iter().enumerate() {
        for field in [Field::Sales, Field::Profit] {
            if !row.get(field).as_f64().is_some_and(f64::is_finite) {
                return Err(ExportError::NonFinite { row: index, field });
            }
        }
        sheet_rows.push(data_row(row));
    }

    sheet_rows.push(totals_row(rows));

    let last_row = (sheet_rows.len() - 1) as u32;
    let table = TableSpec {
        name: TABLE_NAME.to_string(),
        last_row,
        last_col: (EXPORT_FIELDS.len() - 1) as u16,
        style: TablePreset::Medium2,
        banded_rows: true,
        banded_columns: false,
        first_column: false,
        last_column: false,
    };

    Ok(Some(ExportSheet {
        headers,
        rows: sheet_rows,
        table,
    }))
}

fn data_row(row: &Row) -> Vec<SheetCell> {
    let edge_style = if row.has_negative_profit() {
        CellStyle::negative_profit()
    } else {
        CellStyle {
            borders: Borders::LEFT_RIGHT,
            ..Default::default()
        }
    };

    EXPORT_FIELDS
        .iter()
        .map(|&field| {
            let content = match field {
                Field::OrderDate => CellContent::Date(row.order_date),
                Field::Quantity => CellContent::Number(row.quantity as f64),
                Field::Sales => CellContent::Number(row.sales),
                Field::Profit => CellContent::Number(row.profit),
                _ => CellContent::Text(row.get(field).to_string()),
            };
            let style = if HIGHLIGHT_FIELDS.contains(&field) {
                edge_style
            } else {
                CellStyle::default()
            };
            SheetCell::new(content, style)
        })
        .collect()
}

fn totals_row(rows: &[Row]) -> Vec<SheetCell> {
    // Data occupies spreadsheet rows 2..=N+1.
    let first = 2;
    let last = rows.len() as u32 + 1;

    EXPORT_FIELDS
        .iter()
        .enumerate()
        .map(|(col, &field)| {
            let content = if col == 0 {
                CellContent::Text("Total".to_string())
            } else if TOTAL_FIELDS.contains(&field) {
                CellContent::Formula {
                    formula: subtotal_formula(col as u16, first, last),
                    cached: rows.iter().filter_map(|r| r.get(field).as_f64()).sum(),
                }
            } else {
                CellContent::Empty
            };
            SheetCell::new(content, CellStyle::totals())
        })
        .collect()
}

/// `=SUBTOTAL(109,G2:G4)` for zero-based column 6 over rows 2 to 4.
pub fn subtotal_formula(col: u16, first_row: u32, last_row: u32) -> String {
    let letter = column_to_letter(col + 1);
    format!(
        "=SUBTOTAL({},{}{}:{}{})",
        SUBTOTAL_SUM_VISIBLE, letter, first_row, letter, last_row
    )
}

/// Serialize a sheet model to XLSX bytes.
pub fn write_xlsx(sheet: &ExportSheet) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();

    for (r, cells) in sheet.rows.iter().enumerate() {
        for (c, cell) in cells.iter().enumerate() {
            write_cell(&mut worksheet, r as u32, c as u16, cell)?;
        }
    }

    let header_format = CellStyle::header().to_format();
    let columns: Vec<TableColumn> = sheet
        .headers
        .iter()
        .map(|h| {
            TableColumn::new()
                .set_header(h)
                .set_header_format(header_format.clone())
        })
        .collect();

    let spec = &sheet.table;
    let table = Table::new()
        .set_name(&spec.name)
        .set_style(spec.style.to_style())
        .set_banded_rows(spec.banded_rows)
        .set_banded_columns(spec.banded_columns)
        .set_first_column(spec.first_column)
        .set_last_column(spec.last_column)
        .set_columns(&columns);
    worksheet.add_table(0, 0, spec.last_row, spec.last_col, &table)?;

    workbook.push_worksheet(worksheet);

    let buffer = workbook.save_to_buffer()?;
    Ok(buffer)
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &SheetCell,
) -> Result<(), ExportError> {
    let format = cell.style.to_format();
    match &cell.content {
        CellContent::Empty => {
            worksheet.write_blank(row, col, &format)?;
        }
        CellContent::Text(text) => {
            worksheet.write_string_with_format(row, col, text, &format)?;
        }
        CellContent::Number(value) => {
            worksheet.write_number_with_format(row, col, *value, &format)?;
        }
        CellContent::Date(date) => {
            let datetime =
                ExcelDateTime::from_ymd(date.year() as u16, date.month() as u8, date.day() as u8)?;
            let format = format.set_num_format(DATE_FORMAT);
            worksheet.write_datetime_with_format(row, col, &datetime, &format)?;
        }
        CellContent::Formula { formula, cached } => {
            worksheet.write_formula_with_format(row, col, formula.as_str(), &format)?;
            worksheet.set_formula_result(row, col, cached.to_string());
        }
    }
    Ok(())
}

/// Turn the visible rows into a downloadable workbook.
///
/// An empty row set is not an error: it yields `ExportOutcome::Empty` and no
/// file. Any failure discards the partial workbook.
pub fn export(rows: &[Row]) -> Result<ExportOutcome, ExportError> {
    let Some(sheet) = build_sheet(rows)? else {
        debug!("export requested with no visible rows");
        return Ok(ExportOutcome::Empty);
    };

    let bytes = write_xlsx(&sheet)?;
    info!(
        "exported {} rows to {} ({} bytes, table {})",
        rows.len(),
        EXPORT_FILENAME,
        bytes.len(),
        sheet.table.range_ref()
    );

    Ok(ExportOutcome::File(ExportFile {
        filename: EXPORT_FILENAME,
        content_type: XLSX_CONTENT_TYPE,
        bytes,
    }))
}

/// Convert column number to letter (A=1, B=2, etc.)
///
/// # Examples
/// ```
/// use dashboard::export::column_to_letter;
///
/// assert_eq!(column_to_letter(1), "A");
/// assert_eq!(column_to_letter(26), "Z");
/// assert_eq!(column_to_letter(27), "AA");
/// ```
pub fn column_to_letter(col: u16) -> String {
    let mut name = String::new();
    let mut n = col;

    while n > 0 {
        n -= 1;
        name.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
    }

    name
}
