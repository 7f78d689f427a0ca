//! Core of the Vanguard announcement platform.
//!
//! The list-shaping pieces ([`pagination`], [`threading`], [`cluster`]) are pure
//! functions over data fetched elsewhere. [`storage`] holds posts, comments and
//! reactions; [`notify`] announces published posts.

pub mod cluster;
pub mod config;
pub mod form;
pub mod models;
pub mod notify;
pub mod pagination;
pub mod reactions;
pub mod storage;
pub mod threading;
