//! # teocat-db: Database Layer for the TeoCat Ledger
//!
//! This crate provides SQLite storage and the transactional services for
//! the TeoCat inventory/financial ledger. It uses sqlx for async access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      TeoCat Ledger Data Flow                            │
//! │                                                                         │
//! │  Caller (HTTP adapter, job, test)                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     teocat-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Services    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │               │    │               │    │  (embedded)  │  │   │
//! │  │   │ PurchaseServ. │───►│ ProductRepo   │    │              │  │   │
//! │  │   │ SaleService   │    │ PurchaseRepo  │    │ 001_init.sql │  │   │
//! │  │   │ (transactions)│    │ SaleRepo      │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │              WAL mode, foreign keys enabled                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (product, purchase, sale)
//! - [`service`] - Transactional Purchase/Sale aggregates + error envelope
//!
//! ## Usage
//!
//! ```rust,ignore
//! use teocat_db::{Database, DbConfig, PurchaseService};
//!
//! let db = Database::new(DbConfig::new("path/to/teocat.db")).await?;
//!
//! let purchases = PurchaseService::new(db.clone());
//! let created = purchases.create(request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::DbError;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::product::ProductRepository;
pub use repository::purchase::PurchaseRepository;
pub use repository::sale::SaleRepository;

// Service re-exports for convenience
pub use service::error::{ErrorCode, ServiceError, ServiceResult};
pub use service::purchase::PurchaseService;
pub use service::sale::SaleService;
