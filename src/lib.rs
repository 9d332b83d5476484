//! # contextify
//!
//! Incrementally index directory trees into a vector store for
//! retrieval-augmented prompting.
//!
//! Each configured *context* names one or more root directories and a
//! basename regex. `contextify scan` walks the roots, hashes every match,
//! and compares the hashes with what the store already holds: new files
//! are chunked and embedded, changed files are replaced, unchanged files
//! cost nothing, and files that vanished are removed. `contextify query`
//! embeds a question and returns the nearest chunks of one context.
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌──────────────┐   ┌──────────┐
//! │  scan    │──▶│ plan (core)   │──▶│ sync (core)  │──▶│  SQLite  │
//! │ walkdir  │   │ new/changed/… │   │ extract+embed│   │  records │
//! └──────────┘   └───────────────┘   └──────────────┘   └────┬─────┘
//!                                                            │
//!                                           query ◀──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`scan`] | Tree scanner and content hashing |
//! | [`extract`] | Plain text, PDF and DOCX extraction |
//! | [`embedding`] | HTTP embedding client |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema setup |
//! | [`sqlite_store`] | SQLite vector store |
//! | [`sync`] | `scan` command orchestration |
//! | [`search`] | `query` command |
//! | [`sources`] | `sources` command |
//! | [`progress`] | stderr progress reporting |

pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod migrate;
pub mod progress;
pub mod scan;
pub mod search;
pub mod sources;
pub mod sqlite_store;
pub mod sync;
