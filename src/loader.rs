use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, info};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::LoadError;
use crate::row::{Dataset, Field, FieldKind, Row, parse_finite, parse_integer};

/// The published superstore extract the dashboard is built around.
pub const DEFAULT_SOURCE: &str =
    "https://raw.githubusercontent.com/Moh-Ozzi/My-public-data-sources/main/cleaned_superstore.csv";

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// Round a currency amount to cents, ties to even.
///
/// Matches what the grid displays, so the values a user sees and the values
/// written by the export agree.
pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Parse an order date, discarding any time-of-day component.
pub fn parse_order_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Some(datetime.date());
        }
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|datetime| datetime.date_naive())
}

/// Load the dataset from any CSV byte stream.
///
/// Only the ten known columns are kept; anything else in the file is ignored.
/// Column order in the file does not matter.
pub fn from_reader<R: Read>(reader: R) -> Result<Dataset, LoadError> {
    let mut csv = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

    let headers = csv.headers()?.clone();
    let positions = column_positions(&headers)?;

    let mut rows = Vec::new();
    for record in csv.records() {
        let record = record?;
        rows.push(parse_row(&record, &positions)?);
    }

    debug!("parsed {} rows", rows.len());
    Ok(Dataset::new(rows))
}

/// Load the dataset from a CSV file on disk.
///
/// # Examples
/// ```no_run
/// use dashboard::loader::from_csv;
///
/// match from_csv("superstore.csv") {
///     Ok(dataset) => println!("Loaded {} rows", dataset.len()),
///     Err(e) => eprintln!("Error loading CSV: {}", e),
/// }
/// ```
pub fn from_csv(filepath: impl AsRef<Path>) -> Result<Dataset, LoadError> {
    let file = File::open(filepath)?;
    from_reader(BufReader::new(file))
}

/// Fetch the dataset over HTTP(S). A non-success status is a load failure.
#[cfg(feature = "web")]
pub async fn from_url(url: &str) -> Result<Dataset, LoadError> {
    let fetch_error = |reason: String| LoadError::Fetch {
        url: url.to_string(),
        reason,
    };

    let response = reqwest::get(url)
        .await
        .map_err(|e| fetch_error(e.to_string()))?
        .error_for_status()
        .map_err(|e| fetch_error(e.to_string()))?;
    let body = response
        .bytes()
        .await
        .map_err(|e| fetch_error(e.to_string()))?;

    debug!("fetched {} bytes from {}", body.len(), url);
    from_reader(&body[..])
}

/// Load from a URL or a local `.csv` path, whichever `source` names.
///
/// This runs once at startup; any error means no dataset is served.
pub async fn load_dataset(source: &str) -> Result<Dataset, LoadError> {
    info!("loading dataset from {}", source);

    let dataset = if source.starts_with("http://") || source.starts_with("https://") {
        load_remote(source).await?
    } else {
        let path = Path::new(source);
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());

        match extension.as_deref() {
            Some("csv") => from_csv(path)?,
            _ => return Err(LoadError::UnsupportedSource(source.to_string())),
        }
    };

    info!("loaded {} rows", dataset.len());
    Ok(dataset)
}

#[cfg(feature = "web")]
async fn load_remote(url: &str) -> Result<Dataset, LoadError> {
    from_url(url).await
}

#[cfg(not(feature = "web"))]
async fn load_remote(url: &str) -> Result<Dataset, LoadError> {
    Err(LoadError::Fetch {
        url: url.to_string(),
        reason: "remote sources require the 'web' feature".to_string(),
    })
}

// Index of each known field within a record, in `Field::ALL` order.
fn column_positions(headers: &StringRecord) -> Result<[usize; 10], LoadError> {
    let mut positions = [0usize; 10];
    let mut missing = Vec::new();

    for (slot, field) in positions.iter_mut().zip(Field::ALL) {
        match headers.iter().position(|h| h == field.name()) {
            Some(index) => *slot = index,
            None => missing.push(field.name().to_string()),
        }
    }

    if missing.is_empty() {
        Ok(positions)
    } else {
        Err(LoadError::MissingColumns(missing))
    }
}

fn parse_row(record: &StringRecord, positions: &[usize; 10]) -> Result<Row, LoadError> {
    let line = record.position().map(|p| p.line()).unwrap_or(0);
    let cell = |field: Field| record.get(positions[field as usize]).unwrap_or("");
    let malformed = |field: Field| LoadError::Malformed {
        line,
        field,
        value: cell(field).to_string(),
    };

    let number = |field: Field| -> Result<f64, LoadError> {
        debug_assert_eq!(field.kind(), FieldKind::Number);
        parse_finite(cell(field))
            .map(round_currency)
            .ok_or_else(|| malformed(field))
    };

    Ok(Row {
        order_id: cell(Field::OrderId).to_string(),
        order_date: parse_order_date(cell(Field::OrderDate))
            .ok_or_else(|| malformed(Field::OrderDate))?,
        product_name: cell(Field::ProductName).to_string(),
        customer_name: cell(Field::CustomerName).to_string(),
        ship_mode: cell(Field::ShipMode).to_string(),
        state: cell(Field::State).to_string(),
        category: cell(Field::Category).to_string(),
        quantity: parse_integer(cell(Field::Quantity)).ok_or_else(|| malformed(Field::Quantity))?,
        sales: number(Field::Sales)?,
        profit: number(Field::Profit)?,
    })
}
