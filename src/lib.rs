//! Client-side data layer for a paginated story feed whose comment trees
//! are fetched incrementally.
//!
//! - [`item`] - items, wire payloads and the merge-safe item arena
//! - [`store`] - pagination, the stories store and "load more replies"
//! - [`source`] - the network contract and its HTTP implementation
//! - [`display`] - reply labels, indentation and text fitting
//! - [`config`] - the optional TOML config file

pub mod config;
pub mod display;
pub mod item;
pub mod source;
pub mod store;
