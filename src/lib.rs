/*!
# Container Export Dashboard

A browser-based dashboard over Korea → Jakarta container shipment data, built in Rust.

## Overview

The dashboard loads a shipment spreadsheet once, keeps it in memory, and lets a
user who passes the id allow-list rank exporters or importers by container
volume, narrow the ranking by category, threshold and business description,
and drill into one company's partners, routes and container lines.

## Architecture

### Data Layer
- **record**: `ShipmentRecord`, `Party` and the fixed column-header contract
- **loader**: Excel (calamine) and CSV readers that validate the header row
- **cache**: lazily loaded, shared, read-only copy of the table with invalidation

### Analysis Layer
- **analysis**: rankings (`rank`, `business_filter`), company drill-downs
  (`company_profile`) and the dataset overview
- **downloader**: CSV/XLSX export of a ranking

### Session Layer
- **session**: per-session screen state machine and the session store
- **login**: allow-list gate, login/logout handlers and auth middleware

### Web Layer (feature `web`)
- **views**: handlebars pages
- **app**: axum router and request handlers

## Screens

`LoggedOut → Overview → {SearchResults, CompanyAnalysis} → Overview`

## HTTP Endpoints

- `GET /` - current screen (`?home` resets to the overview first)
- `POST /login`, `POST /logout`, `POST /home`
- `POST /search`, `POST /business`, `POST /analyze`
- `GET /api/state` - session snapshot as JSON
- `GET /api/companies` - picker options
- `GET /api/export?format=csv|xlsx` - current ranking as a file
*/

pub mod analysis;
pub mod cache;
pub mod config;
pub mod downloader;
pub mod error;
pub mod loader;
pub mod login;
pub mod record;
pub mod session;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod views;

pub use analysis::{CompanyProfile, Overview, RankedRow, RankedSummary};
pub use cache::DatasetCache;
pub use config::Config;
pub use error::{DashboardError, DataLoadError};
pub use login::{AuthOutcome, Gatekeeper};
pub use record::{ALL, Party, ShipmentRecord, Table};
pub use session::{DashboardSession, FilterCriteria, Screen, SessionStore};
