//! The two conversion directions.
//!
//! Both are pure tree walks: a decoded document in, a new document out.
//! The reverse direction additionally takes a [`RunContext`](crate::model::RunContext)
//! for the metadata it has to invent.

pub mod forward;
pub mod reverse;

pub use forward::insomnia_to_postman;
pub use reverse::{postman_to_insomnia, pretty_body, variables_to_environment};
