//! Process-wide lazy singletons with exactly-once, failure-tolerant
//! initialization.
//!
//! This crate provides three layers over the same primitive:
//!
//! - [`Holder<T>`]: a write-once slot; you pass the constructor at the call
//!   site (`get_or_init`, `get_or_try_init`).
//! - [`Singleton<T>`]: a holder that carries its constructor, so access is a
//!   zero-argument `instance()` call (or plain `Deref`).
//! - [`TrySingleton<T, E>`]: the same for constructors that can fail, with
//!   [`InitError`] reporting and retry on a later call.
//!
//! All of them guarantee that under concurrent first access the constructor
//! runs on exactly one thread, every caller receives a reference to that one
//! value, and no caller can observe a partially constructed value. After the
//! first access, reads are a single atomic load; during the construction race,
//! losing threads sleep on a `parking_lot_core` futex rather than spinning.
//!
//! A failing constructor never poisons the cell: the error goes to the caller
//! whose attempt ran it, waiters re-race for the construction lock, and a
//! later call retries from scratch.
//!
//! # Examples
//!
//! ```rust
//! use once_singleton::Singleton;
//!
//! static GREETING: Singleton<String> = Singleton::new(|| "hello".to_string());
//!
//! // Constructed on first access, shared ever after.
//! assert_eq!(GREETING.instance(), "hello");
//! assert!(std::ptr::eq(GREETING.instance(), GREETING.instance()));
//! ```
//!
//! Fallible construction with retry:
//!
//! ```rust
//! use once_singleton::{InitError, TrySingleton};
//!
//! static PORT: TrySingleton<u16, std::num::ParseIntError> =
//!    TrySingleton::new(|| "8080".parse());
//!
//! assert_eq!(PORT.instance(), Ok(&8080));
//! ```
//!
//! With the default `async-tokio-mt` feature, [`Holder`] also supports async
//! constructors via `get_or_init_async` / `get_or_try_init_async`.

/// Errors for fallible access.
mod error;

/// The write-once storage slot.
mod holder;

/// Constructor-carrying singleton cells.
mod singleton;

/// Internal construction-race state machine.
mod state;

pub use error::InitError;
pub use holder::Holder;
pub use singleton::{Singleton, TrySingleton};
