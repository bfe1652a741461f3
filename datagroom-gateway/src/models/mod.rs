//! Wire types exchanged with the Datagroom Gateway.
//!
//! The Gateway owns these shapes; every field the tools do not strictly need
//! is defaulted so that partial payloads still decode.

pub mod dataset;
pub mod query;
pub mod schema;

pub use dataset::{DatasetEntry, DatasetInfo, DatasetList, Perms};
pub use query::{Filter, Row, SortDirection, Sorter, ViewPage, ViewQuery};
pub use schema::{ColumnAttr, ViewColumns};
