//! Core types and trait definitions for the student roster.
//!
//! No database or spreadsheet dependencies: everything here is a plain data
//! type or a pure function. Storage backends implement
//! [`store::RosterStore`].

// Store impls use native `async fn`; the trait spells out the `Send` bounds.
#![allow(async_fn_in_trait)]

pub mod category;
pub mod cell;
pub mod error;
pub mod filter;
pub mod import;
pub mod ordering;
pub mod record;
pub mod store;
pub mod view;

pub use error::{Error, Result};
pub use record::{IDENTIFIER, NAME_COLUMN};
