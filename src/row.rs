use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::error::ViewError;

/// The ten columns of the dataset, in source order.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    OrderId,
    OrderDate,
    ProductName,
    CustomerName,
    ShipMode,
    State,
    Category,
    Quantity,
    Sales,
    Profit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Date,
    Integer,
    Number,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::OrderId,
        Field::OrderDate,
        Field::ProductName,
        Field::CustomerName,
        Field::ShipMode,
        Field::State,
        Field::Category,
        Field::Quantity,
        Field::Sales,
        Field::Profit,
    ];

    /// Column name as it appears in the CSV header and the export header.
    pub fn name(self) -> &'static str {
        match self {
            Field::OrderId => "order_id",
            Field::OrderDate => "order_date",
            Field::ProductName => "product_name",
            Field::CustomerName => "customer_name",
            Field::ShipMode => "ship_mode",
            Field::State => "state",
            Field::Category => "category",
            Field::Quantity => "quantity",
            Field::Sales => "sales",
            Field::Profit => "profit",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::OrderDate => FieldKind::Date,
            Field::Quantity => FieldKind::Integer,
            Field::Sales | Field::Profit => FieldKind::Number,
            _ => FieldKind::Text,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self.kind(), FieldKind::Integer | FieldKind::Number)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One order line. Immutable once loaded; grid edits work on copies.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Row {
    pub order_id: String,
    pub order_date: NaiveDate,
    pub product_name: String,
    pub customer_name: String,
    pub ship_mode: String,
    pub state: String,
    pub category: String,
    pub quantity: i64,
    pub sales: f64,
    pub profit: f64,
}

/// Borrowed view of a single cell, used by filtering and sorting.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Date(NaiveDate),
    Integer(i64),
    Number(f64),
}

impl FieldValue<'_> {
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            FieldValue::Integer(i) => Some(i as f64),
            FieldValue::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Total order within one column. Mixed kinds never meet in practice
    /// since both sides always come from the same field.
    pub fn compare(&self, other: &FieldValue<'_>) -> Ordering {
        match (self, other) {
            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
            (FieldValue::Date(a), FieldValue::Date(b)) => a.cmp(b),
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a.cmp(b),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => self.to_string().cmp(&other.to_string()),
            },
        }
    }
}

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Number(n) => write!(f, "{}", n),
        }
    }
}

impl Row {
    pub fn get(&self, field: Field) -> FieldValue<'_> {
        match field {
            Field::OrderId => FieldValue::Text(&self.order_id),
            Field::OrderDate => FieldValue::Date(self.order_date),
            Field::ProductName => FieldValue::Text(&self.product_name),
            Field::CustomerName => FieldValue::Text(&self.customer_name),
            Field::ShipMode => FieldValue::Text(&self.ship_mode),
            Field::State => FieldValue::Text(&self.state),
            Field::Category => FieldValue::Text(&self.category),
            Field::Quantity => FieldValue::Integer(self.quantity),
            Field::Sales => FieldValue::Number(self.sales),
            Field::Profit => FieldValue::Number(self.profit),
        }
    }

    /// Overwrite one field from its text form, as typed into a grid cell.
    pub fn set(&mut self, field: Field, raw: &str) -> Result<(), ViewError> {
        let invalid = || ViewError::InvalidEdit {
            field,
            value: raw.to_string(),
        };
        let value = raw.trim();

        match field {
            Field::OrderId => self.order_id = value.to_string(),
            Field::ProductName => self.product_name = value.to_string(),
            Field::CustomerName => self.customer_name = value.to_string(),
            Field::ShipMode => self.ship_mode = value.to_string(),
            Field::State => self.state = value.to_string(),
            Field::Category => self.category = value.to_string(),
            Field::OrderDate => {
                self.order_date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())?
            }
            Field::Quantity => self.quantity = parse_integer(value).ok_or_else(invalid)?,
            Field::Sales => self.sales = parse_finite(value).ok_or_else(invalid)?,
            Field::Profit => self.profit = parse_finite(value).ok_or_else(invalid)?,
        }
        Ok(())
    }

    pub fn has_negative_profit(&self) -> bool {
        self.profit < 0.0
    }
}

/// Accepts `"3"` as well as integral floats such as `"3.0"`.
pub(crate) fn parse_integer(s: &str) -> Option<i64> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(i);
    }
    let f = parse_finite(s)?;
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

pub(crate) fn parse_finite(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// The loaded table. Read-only after the loader hands it over.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    rows: Vec<Row>,
}

impl Dataset {
    pub fn new(rows: Vec<Row>) -> Self {
        Dataset { rows }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_row(order_id: &str, quantity: i64, sales: f64, profit: f64) -> Row {
        Row {
            order_id: order_id.to_string(),
            order_date: NaiveDate::from_ymd_opt(2016, 11, 8).unwrap(),
            product_name: "Bush Somerset Collection Bookcase".to_string(),
            customer_name: "Claire Gute".to_string(),
            ship_mode: "Second Class".to_string(),
            state: "Kentucky".to_string(),
            category: "Furniture".to_string(),
            quantity,
            sales,
            profit,
        }
    }

    #[test]
    fn field_names_match_csv_headers() {
        assert_eq!(Field::from_name("ship_mode"), Some(Field::ShipMode));
        assert_eq!(Field::from_name("Ship Mode"), None);
        assert_eq!(Field::Profit.to_string(), "profit");
        assert!(Field::Quantity.is_numeric());
        assert!(!Field::OrderDate.is_numeric());
    }

    #[test]
    fn set_parses_by_field_kind() {
        let mut row = sample_row("CA-1", 2, 10.0, 1.0);
        row.set(Field::Quantity, " 7 ").unwrap();
        row.set(Field::Profit, "-3.5").unwrap();
        row.set(Field::OrderDate, "2017-01-02").unwrap();
        row.set(Field::State, "Ohio").unwrap();

        assert_eq!(row.quantity, 7);
        assert_eq!(row.profit, -3.5);
        assert_eq!(row.order_date, NaiveDate::from_ymd_opt(2017, 1, 2).unwrap());
        assert_eq!(row.state, "Ohio");
        assert!(row.has_negative_profit());
    }

    #[test]
    fn set_rejects_bad_numbers() {
        let mut row = sample_row("CA-1", 2, 10.0, 1.0);
        let err = row.set(Field::Sales, "lots").unwrap_err();
        assert_eq!(
            err,
            ViewError::InvalidEdit {
                field: Field::Sales,
                value: "lots".to_string()
            }
        );
        assert!(row.set(Field::Quantity, "2.5").is_err());
        assert!(row.set(Field::Profit, "NaN").is_err());
        assert_eq!(row.sales, 10.0);
    }

    #[test]
    fn integral_floats_are_integers() {
        assert_eq!(parse_integer("3.0"), Some(3));
        assert_eq!(parse_integer("-4"), Some(-4));
        assert_eq!(parse_integer("x"), None);
    }

    #[test]
    fn compare_orders_within_a_column() {
        let a = sample_row("A", 1, 2.0, -5.0);
        let b = sample_row("B", 3, 1.0, 5.0);
        assert_eq!(a.get(Field::Profit).compare(&b.get(Field::Profit)), Ordering::Less);
        assert_eq!(a.get(Field::Quantity).compare(&b.get(Field::Quantity)), Ordering::Less);
        assert_eq!(a.get(Field::OrderId).compare(&b.get(Field::OrderId)), Ordering::Less);
        assert_eq!(a.get(Field::Sales).compare(&b.get(Field::Sales)), Ordering::Greater);
    }
}
