//! # Adept API Server
//!
//! HTTP API for Adept, an AI-assisted project management service.
//!
//! ## Architecture
//!
//! The server is built with Axum and provides:
//! - JWT authentication (access + refresh tokens)
//! - Project, task, and team membership CRUD with role-based access
//! - Email invitations with single-use tokens
//! - AI task decomposition (Grok, with a deterministic mock fallback)
//! - Read-only analytics for dashboards
//!
//! Domain models and auth primitives live in the `adept-shared` crate; this
//! crate owns HTTP concerns: routing, request validation, error mapping,
//! and the AI adapter.

pub mod ai;
pub mod app;
pub mod config;
pub mod error;
pub mod routes;
