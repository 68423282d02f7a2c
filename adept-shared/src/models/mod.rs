/// Database models for Adept
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `user`: User accounts and authentication
/// - `project`: Projects owned by users
/// - `membership`: User-project relationships with roles
/// - `task`: Tasks within projects (Kanban workflow)
/// - `invitation`: Token-based project invitations

pub mod invitation;
pub mod membership;
pub mod project;
pub mod task;
pub mod user;
