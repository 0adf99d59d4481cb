//! Explicit grid view state and the pure resolver that turns it into the
//! visible row set.
//!
//! The browser owns nothing but a `ViewState`; every request carries it in
//! full, so resolving rows needs no server-side session.

use serde::{Deserialize, Serialize};

use crate::error::ViewError;
use crate::row::{Dataset, Field, FieldValue, Row};

/// Filters, sort keys, page and in-place edits currently applied to the grid.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewState {
    pub filters: Vec<ColumnFilter>,
    pub sort: Vec<SortKey>,
    pub page: usize,
    pub edits: Vec<CellEdit>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnFilter {
    pub field: Field,
    pub condition: FilterCondition,
}

/// One column filter, shaped like the grid's own filter model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "filterType", rename_all = "camelCase")]
pub enum FilterCondition {
    Text {
        #[serde(rename = "type")]
        op: TextOp,
        #[serde(default)]
        filter: String,
    },
    Number {
        #[serde(rename = "type")]
        op: NumberOp,
        #[serde(default)]
        filter: Option<f64>,
        #[serde(default, rename = "filterTo")]
        filter_to: Option<f64>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextOp {
    Contains,
    NotContains,
    Equals,
    NotEqual,
    StartsWith,
    EndsWith,
    Blank,
    NotBlank,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NumberOp {
    Equals,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    InRange,
    Blank,
    NotBlank,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: Field,
    pub direction: SortDirection,
}

/// A value typed into a grid cell. `row` is the dataset position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellEdit {
    pub row: usize,
    pub field: Field,
    pub value: String,
}

/// A row as the grid currently shows it, with its dataset position.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VisibleRow {
    pub index: usize,
    #[serde(flatten)]
    pub row: Row,
}

impl FilterCondition {
    fn validate(&self, field: Field) -> Result<(), ViewError> {
        match self {
            FilterCondition::Number { .. } if !field.is_numeric() => {
                Err(ViewError::FilterNotSupported { field })
            }
            _ => Ok(()),
        }
    }

    pub fn matches(&self, value: FieldValue<'_>) -> bool {
        match self {
            FilterCondition::Text { op, filter } => {
                let cell = value.to_string().to_lowercase();
                let needle = filter.to_lowercase();
                match op {
                    TextOp::Contains => cell.contains(&needle),
                    TextOp::NotContains => !cell.contains(&needle),
                    TextOp::Equals => cell == needle,
                    TextOp::NotEqual => cell != needle,
                    TextOp::StartsWith => cell.starts_with(&needle),
                    TextOp::EndsWith => cell.ends_with(&needle),
                    TextOp::Blank => cell.trim().is_empty(),
                    TextOp::NotBlank => !cell.trim().is_empty(),
                }
            }
            FilterCondition::Number {
                op,
                filter,
                filter_to,
            } => {
                let Some(cell) = value.as_f64() else {
                    return matches!(op, NumberOp::Blank);
                };
                match op {
                    NumberOp::Blank => false,
                    NumberOp::NotBlank => true,
                    // An operand the user has not typed yet leaves the column unfiltered.
                    _ if filter.is_none() => true,
                    NumberOp::InRange => match (filter, filter_to) {
                        (Some(from), Some(to)) => cell > *from && cell < *to,
                        _ => true,
                    },
                    _ => {
                        let target = filter.unwrap_or_default();
                        match op {
                            NumberOp::Equals => cell == target,
                            NumberOp::NotEqual => cell != target,
                            NumberOp::LessThan => cell < target,
                            NumberOp::LessThanOrEqual => cell <= target,
                            NumberOp::GreaterThan => cell > target,
                            NumberOp::GreaterThanOrEqual => cell >= target,
                            _ => true,
                        }
                    }
                }
            }
        }
    }
}

impl ViewState {
    pub fn validate(&self, dataset: &Dataset) -> Result<(), ViewError> {
        for filter in &self.filters {
            filter.condition.validate(filter.field)?;
        }
        for edit in &self.edits {
            if edit.row >= dataset.len() {
                return Err(ViewError::UnknownRow {
                    index: edit.row,
                    len: dataset.len(),
                });
            }
        }
        Ok(())
    }
}

/// Resolve the visible row set: edits, then filters, then sort.
///
/// Pagination is deliberately not applied here. The result is every row the
/// current filter admits, across all pages, and that is what gets exported.
pub fn resolve(dataset: &Dataset, view: &ViewState) -> Result<Vec<VisibleRow>, ViewError> {
    view.validate(dataset)?;

    let mut rows: Vec<VisibleRow> = dataset
        .rows()
        .iter()
        .enumerate()
        .map(|(index, row)| VisibleRow {
            index,
            row: row.clone(),
        })
        .collect();

    for edit in &view.edits {
        rows[edit.row].row.set(edit.field, &edit.value)?;
    }

    rows.retain(|visible| {
        view.filters
            .iter()
            .all(|f| f.condition.matches(visible.row.get(f.field)))
    });

    if !view.sort.is_empty() {
        rows.sort_by(|a, b| {
            view.sort
                .iter()
                .map(|key| {
                    let ordering = a.row.get(key.field).compare(&b.row.get(key.field));
                    match key.direction {
                        SortDirection::Asc => ordering,
                        SortDirection::Desc => ordering.reverse(),
                    }
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    Ok(rows)
}

/// Number of pages needed for `total` rows. An empty view still has one page.
pub fn page_count(total: usize, page_size: usize) -> usize {
    total.div_ceil(page_size.max(1)).max(1)
}

/// The slice of `rows` shown on `page`, clamped to the last page.
pub fn page_of<T>(rows: &[T], page: usize, page_size: usize) -> (usize, &[T]) {
    let page_size = page_size.max(1);
    let page = page.min(page_count(rows.len(), page_size) - 1);
    let start = (page * page_size).min(rows.len());
    let end = (start + page_size).min(rows.len());
    (page, &rows[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::tests::sample_row;

    fn dataset() -> Dataset {
        let mut rows = vec![
            sample_row("CA-1", 2, 261.96, 41.91),
            sample_row("CA-2", 3, 731.94, 219.58),
            sample_row("US-3", 5, 957.58, -383.03),
            sample_row("CA-4", 2, 22.37, 2.52),
            sample_row("US-5", 7, 48.86, 14.17),
        ];
        rows[1].state = "California".to_string();
        rows[2].state = "Florida".to_string();
        rows[4].state = "California".to_string();
        Dataset::new(rows)
    }

    fn ids(rows: &[VisibleRow]) -> Vec<&str> {
        rows.iter().map(|r| r.row.order_id.as_str()).collect()
    }

    fn number(field: Field, op: NumberOp, filter: f64) -> ColumnFilter {
        ColumnFilter {
            field,
            condition: FilterCondition::Number {
                op,
                filter: Some(filter),
                filter_to: None,
            },
        }
    }

    #[test]
    fn default_view_is_the_whole_dataset_in_order() {
        let rows = resolve(&dataset(), &ViewState::default()).unwrap();
        assert_eq!(ids(&rows), ["CA-1", "CA-2", "US-3", "CA-4", "US-5"]);
        assert_eq!(rows[2].index, 2);
    }

    #[test]
    fn text_filters_ignore_case() {
        let view = ViewState {
            filters: vec![ColumnFilter {
                field: Field::State,
                condition: FilterCondition::Text {
                    op: TextOp::Contains,
                    filter: "CALIF".to_string(),
                },
            }],
            ..Default::default()
        };
        let rows = resolve(&dataset(), &view).unwrap();
        assert_eq!(ids(&rows), ["CA-2", "US-5"]);
    }

    #[test]
    fn number_filters_combine_with_and() {
        let view = ViewState {
            filters: vec![
                number(Field::Quantity, NumberOp::GreaterThanOrEqual, 3.0),
                number(Field::Profit, NumberOp::GreaterThan, 0.0),
            ],
            ..Default::default()
        };
        let rows = resolve(&dataset(), &view).unwrap();
        assert_eq!(ids(&rows), ["CA-2", "US-5"]);
    }

    #[test]
    fn in_range_excludes_bounds() {
        let view = ViewState {
            filters: vec![ColumnFilter {
                field: Field::Quantity,
                condition: FilterCondition::Number {
                    op: NumberOp::InRange,
                    filter: Some(2.0),
                    filter_to: Some(7.0),
                },
            }],
            ..Default::default()
        };
        let rows = resolve(&dataset(), &view).unwrap();
        assert_eq!(ids(&rows), ["CA-2", "US-3"]);
    }

    #[test]
    fn number_filter_on_text_column_is_rejected() {
        let view = ViewState {
            filters: vec![number(Field::State, NumberOp::Equals, 1.0)],
            ..Default::default()
        };
        assert_eq!(
            resolve(&dataset(), &view),
            Err(ViewError::FilterNotSupported { field: Field::State })
        );
    }

    #[test]
    fn multi_key_sort_is_stable() {
        let view = ViewState {
            sort: vec![
                SortKey {
                    field: Field::Quantity,
                    direction: SortDirection::Asc,
                },
                SortKey {
                    field: Field::Sales,
                    direction: SortDirection::Desc,
                },
            ],
            ..Default::default()
        };
        let rows = resolve(&dataset(), &view).unwrap();
        assert_eq!(ids(&rows), ["CA-1", "CA-4", "CA-2", "US-3", "US-5"]);
    }

    #[test]
    fn edits_apply_before_filtering() {
        let view = ViewState {
            filters: vec![number(Field::Profit, NumberOp::LessThan, 0.0)],
            edits: vec![CellEdit {
                row: 0,
                field: Field::Profit,
                value: "-1.50".to_string(),
            }],
            ..Default::default()
        };
        let source = dataset();
        let rows = resolve(&source, &view).unwrap();
        assert_eq!(ids(&rows), ["CA-1", "US-3"]);
        assert_eq!(rows[0].row.profit, -1.5);
        assert_eq!(source.rows()[0].profit, 41.91);
    }

    #[test]
    fn edits_out_of_range_are_rejected() {
        let view = ViewState {
            edits: vec![CellEdit {
                row: 99,
                field: Field::State,
                value: "Ohio".to_string(),
            }],
            ..Default::default()
        };
        assert_eq!(
            resolve(&dataset(), &view),
            Err(ViewError::UnknownRow { index: 99, len: 5 })
        );
    }

    #[test]
    fn pagination_clamps_to_last_page() {
        let rows: Vec<usize> = (0..45).collect();
        assert_eq!(page_count(rows.len(), 20), 3);
        assert_eq!(page_of(&rows, 0, 20).1.len(), 20);

        let (page, last) = page_of(&rows, 9, 20);
        assert_eq!(page, 2);
        assert_eq!(last, &rows[40..]);

        let empty: Vec<usize> = Vec::new();
        assert_eq!(page_count(0, 20), 1);
        assert_eq!(page_of(&empty, 3, 20), (0, &empty[..]));
    }

    #[test]
    fn view_state_reads_grid_json() {
        let json = r#"{
            "filters": [
                {"field": "profit", "condition": {"filterType": "number", "type": "inRange", "filter": -10, "filterTo": 10}},
                {"field": "category", "condition": {"filterType": "text", "type": "equals", "filter": "Furniture"}}
            ],
            "sort": [{"field": "sales", "direction": "desc"}],
            "page": 2
        }"#;
        let view: ViewState = serde_json::from_str(json).unwrap();

        assert_eq!(view.page, 2);
        assert!(view.edits.is_empty());
        assert_eq!(
            view.filters[0].condition,
            FilterCondition::Number {
                op: NumberOp::InRange,
                filter: Some(-10.0),
                filter_to: Some(10.0),
            }
        );
        assert_eq!(view.sort[0].direction, SortDirection::Desc);
    }
}
