//! # pointy-store: Persistence Layer for Pointy POS
//!
//! Connects the pure [`pointy_core`] engine to durable storage through a
//! small gateway contract.
//!
//! ## Data Flow
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      PosService (this crate)                     │
//! │                                                                  │
//! │   operation ──► engine (optimistic apply) ──► WriteOp batch      │
//! │                         │                        │               │
//! │                         │ rollback on error      ▼               │
//! │                         │                 lower to paths         │
//! │                         │                        │               │
//! │                         └───────◄────────  Gateway.write_batch   │
//! │                                                  │               │
//! │                               ┌──────────────────┴─────────┐     │
//! │                               │   LocalGateway (fallback)  │     │
//! │                               │   path → JSON tree + file  │     │
//! │                               └────────────────────────────┘     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`gateway`] - The `Gateway` trait, change subscriptions, and the
//!   lowering of [`pointy_core::WriteOp`]s to document paths
//! - [`local`] - The in-process fallback backend
//! - [`config`] - TOML + environment configuration
//! - [`service`] - `PosService`, the optimistic-command wrapper
//! - [`error`] - Store error types

pub mod config;
pub mod error;
pub mod gateway;
pub mod local;
pub mod service;

pub use config::{Backend, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use gateway::{paths, Change, Gateway, Subscription};
pub use local::LocalGateway;
pub use service::PosService;
