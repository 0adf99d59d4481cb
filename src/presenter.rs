use lazy_static::lazy_static;
use log::debug;
use serde::Serialize;
use std::sync::Arc;

use crate::error::ViewError;
use crate::row::{Dataset, Field, Row};
use crate::view::{self, ViewState, VisibleRow};

/// Rows per grid page.
pub const PAGE_SIZE: usize = 20;

/// Background applied by the negative-profit rule.
pub const NEGATIVE_PROFIT_COLOR: &str = "#FD1C03";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterKind {
    Text,
    Number,
}

/// Declarative column options sent to the browser grid.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    pub field: Field,
    pub filter: FilterKind,
    pub sortable: bool,
    pub editable: bool,
    pub right_aligned: bool,
    /// Background the cell takes when the row's profit is negative.
    pub highlight_color: Option<&'static str>,
}

impl ColumnDef {
    fn text(field: Field) -> Self {
        ColumnDef {
            field,
            filter: FilterKind::Text,
            sortable: true,
            editable: true,
            right_aligned: false,
            highlight_color: None,
        }
    }

    fn number(field: Field) -> Self {
        ColumnDef {
            filter: FilterKind::Number,
            right_aligned: true,
            ..Self::text(field)
        }
    }

    fn highlighted(mut self) -> Self {
        self.highlight_color = Some(NEGATIVE_PROFIT_COLOR);
        self
    }

    pub fn is_highlighted(&self, row: &Row) -> bool {
        self.highlight_color.is_some() && row.has_negative_profit()
    }
}

lazy_static! {
    /// Grid column order. Note state comes before ship_mode here, unlike the source data.
    pub static ref COLUMN_DEFS: Vec<ColumnDef> = vec![
        ColumnDef::text(Field::OrderId).highlighted(),
        ColumnDef::text(Field::OrderDate),
        ColumnDef::text(Field::ProductName),
        ColumnDef::text(Field::CustomerName),
        ColumnDef::text(Field::State),
        ColumnDef::text(Field::ShipMode),
        ColumnDef::text(Field::Category),
        ColumnDef::number(Field::Quantity),
        ColumnDef::number(Field::Sales),
        ColumnDef::number(Field::Profit).highlighted(),
    ];
}

#[derive(Clone, Debug, Serialize)]
pub struct GridRow {
    #[serde(flatten)]
    pub visible: VisibleRow,
    /// Fields whose cells carry the negative-profit style.
    pub highlighted: Vec<Field>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridPage {
    pub columns: &'static [ColumnDef],
    pub rows: Vec<GridRow>,
    pub page: usize,
    pub page_count: usize,
    pub page_size: usize,
    pub total_rows: usize,
}

/// Renders the dataset through a client's view state.
///
/// Holds the dataset behind an `Arc`; it never changes after startup, so one
/// presenter serves every request without locking.
#[derive(Clone, Debug)]
pub struct GridPresenter {
    dataset: Arc<Dataset>,
    page_size: usize,
}

impl GridPresenter {
    pub fn new(dataset: Arc<Dataset>, page_size: usize) -> Self {
        GridPresenter {
            dataset,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn columns(&self) -> &'static [ColumnDef] {
        &COLUMN_DEFS
    }

    /// All rows matching the view's filters, in sort order, across every page.
    pub fn visible_rows(&self, view: &ViewState) -> Result<Vec<VisibleRow>, ViewError> {
        view::resolve(&self.dataset, view)
    }

    /// The single page the grid should display for `view`.
    pub fn render(&self, view: &ViewState) -> Result<GridPage, ViewError> {
        let visible = self.visible_rows(view)?;
        let total_rows = visible.len();
        let (page, shown) = view::page_of(&visible, view.page, self.page_size);

        let rows = shown
            .iter()
            .map(|visible| GridRow {
                highlighted: highlighted_fields(&visible.row),
                visible: visible.clone(),
            })
            .collect();

        debug!(
            "rendered page {} of {} rows ({} filters, {} sort keys)",
            page,
            total_rows,
            view.filters.len(),
            view.sort.len()
        );

        Ok(GridPage {
            columns: self.columns(),
            rows,
            page,
            page_count: view::page_count(total_rows, self.page_size),
            page_size: self.page_size,
            total_rows,
        })
    }
}

pub fn highlighted_fields(row: &Row) -> Vec<Field> {
    COLUMN_DEFS
        .iter()
        .filter(|column| column.is_highlighted(row))
        .map(|column| column.field)
        .collect()
}
