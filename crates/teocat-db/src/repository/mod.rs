//! # Repository Module
//!
//! Database repository implementations for the TeoCat ledger.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Service (SaleService::create)                                         │
//! │       │                                                                 │
//! │       │  db.products().try_decrement_stock(&mut tx, id, qty)           │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── get_by_id(&self, id)              ← reads on the pool            │
//! │  ├── fetch(conn, id)                   ← reads inside a transaction   │
//! │  └── apply_stock_delta(conn, id, d)    ← writes inside a transaction  │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Connection Discipline
//! Write methods (and reads that must see uncommitted state) take a
//! `&mut SqliteConnection` so they compose into one transaction. Plain
//! lookups run on the pool. With an in-memory database the pool has a
//! single connection, so a service must never hold a pool read open while
//! its transaction is running.
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Product lookups and stock updates
//! - [`purchase::PurchaseRepository`] - Purchase headers and line items
//! - [`sale::SaleRepository`] - Sale headers, product lines, service lines

pub mod product;
pub mod purchase;
pub mod sale;
