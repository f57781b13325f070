//! coursesync client - HTTP access to the course data API.
//!
//! [`CatalogClient`] implements the
//! [`CatalogGateway`](coursesync_core::traits::CatalogGateway) trait: one GET per
//! entity kind and scope, decoded into core models.

pub mod catalog;

pub use catalog::CatalogClient;
