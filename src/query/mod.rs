//! Query and update path resolution
//!
//! Callers write filters and updates as JSON documents using dotted paths
//! or nested-object shorthand; the resolver turns them into typed, flat
//! operations for the storage client.

mod ast;
mod errors;
mod resolver;

pub use ast::{Clause, Filter, FilterOp, Predicate, Update};
pub use errors::{QueryError, QueryErrorCode, QueryResult};
pub use resolver::PathResolver;
