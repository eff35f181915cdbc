//! `docket-core` — shared building blocks for the document crates.
//!
//! Identifiers, tenant scoping and the domain error type. No IO lives here.

pub mod entity;
pub mod error;
pub mod id;
pub mod scope;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{CompanyId, UserId};
pub use scope::{Scope, Visibility};
pub use value_object::ValueObject;
