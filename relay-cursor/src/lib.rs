//! # relay-cursor
//!
//! Keyset pagination for ordered relational result sets, exposed as Relay
//! connections.
//!
//! ## Features
//!
//! - **Opaque cursors**: Relay array-connection cursors over integer keys
//! - **Scopes**: `first`/`last`/`before`/`after` validated and turned into a
//!   bounded, ordered keyset query that over-fetches one sentinel row
//! - **Connections**: edges and page info assembled from the fetched rows
//!   without a separate count query
//! - **Backends**: PostgreSQL through sqlx and an in-memory table for tests
//!
//! ## Example
//!
//! ```rust,ignore
//! use relay_cursor::prelude::*;
//!
//! #[derive(sqlx::FromRow)]
//! struct Post {
//!     id: i64,
//!     title: String,
//! }
//!
//! impl CursorRecord for Post {
//!     fn cursor_key(&self) -> CursorKey {
//!         self.id
//!     }
//! }
//!
//! async fn posts(pool: &PgPool, args: ConnectionArguments) -> Result<Connection<Post>> {
//!     let config = PaginationConfig::load()?;
//!     let scope = Scope::with_config(args, &config);
//!     paginate(SelectBuilder::new("posts").on(pool), &scope).await
//! }
//! ```

pub mod config;
pub mod connection;
pub mod cursor;
pub mod error;
pub mod query;
pub mod scope;

pub use config::PaginationConfig;
pub use connection::{build_connection, paginate, Connection, Edge, PageInfo};
pub use cursor::{decode_cursor, encode_cursor, ConnectionCursor, CursorKey, CursorRecord};
pub use error::{Error, Result};
pub use scope::{apply_order, apply_scope, ConnectionArguments, Limit, Scope, ORDER_ON_CREATED_AT};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::PaginationConfig;
    pub use crate::connection::{build_connection, paginate, Connection, Edge, PageInfo};
    pub use crate::cursor::{
        decode_cursor, encode_cursor, ConnectionCursor, CursorKey, CursorRecord,
    };
    pub use crate::error::{Error, Result};
    pub use crate::query::{
        Columns, FetchRows, FilterCondition, FilterOperator, FilterValue, MemoryTable,
        OrderDirection, PgSelect, QueryBuilder, SelectBuilder,
    };
    pub use crate::scope::{
        apply_order, apply_scope, ConnectionArguments, Limit, Scope, ORDER_ON_CREATED_AT,
    };

    pub use sqlx::PgPool;
}
