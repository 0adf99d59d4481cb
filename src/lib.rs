/*!
# Superstore Dashboard

A single-page orders dashboard: a sortable, filterable, paginated grid over a
fixed CSV dataset, with an export of the rows currently visible to a styled
spreadsheet.

## Overview

The dataset is loaded once at startup and never changes. The browser keeps
its grid state (filters, sort order, page, in-place edits) and sends it with
every request, so the server resolves rows with a pure function and holds no
per-client state.

## Architecture

### Frontend Layer
- **Technologies**: HTML, JavaScript
- **Key Components**:
  - Grid - Renders one page of rows, sort toggles and per-column filters
  - Download button - Posts the current view state to the export endpoint

### Backend Layer
- **Technologies**: Rust, axum
- **Core Components**:
  - Dataset Loader - Fetches and normalizes the CSV (currency rounding, dates)
  - View Resolver - Applies edits, filters and sort to produce the visible rows
  - Grid Presenter - Column definitions, negative-profit styling, pagination
  - Export Transformer - Builds the workbook with header, highlights and a
    filter-aware totals row inside a named table

## Export format

- 9 columns (product_name is dropped), one header row, one row per visible
  record and a totals row
- Identifier and profit cells turn red when profit is negative
- Totals use `SUBTOTAL(109, ...)` so they follow spreadsheet-side filtering
- The whole range is a named table with banded rows

## Modules

- **row**: Row and Field types, the read-only dataset
- **loader**: CSV loading and normalization
- **view**: View state and the visible-row resolver
- **presenter**: Grid column definitions and page rendering
- **export**: Spreadsheet export
- **error**: Error types
- **config**: Command-line configuration (feature `web`)
- **app**: Routing and request handlers (feature `web`)

## REST API Endpoints

- `GET /` - The dashboard page
- `GET /api/columns` - Grid column definitions
- `POST /api/rows` - One page of rows for a view state
- `POST /api/export` - The visible rows as `data.xlsx`
*/

pub mod error;
pub mod export;
pub mod loader;
pub mod presenter;
pub mod row;
pub mod view;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod config;

/// Re-export the everyday types to make them easier to use
pub use error::*;
pub use export::{ExportFile, ExportOutcome, export};
pub use presenter::GridPresenter;
pub use row::{Dataset, Field, Row};
pub use view::{ViewState, VisibleRow};
