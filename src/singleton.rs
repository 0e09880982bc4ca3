//! Constructor-carrying singleton cells.
//!
//! [`Singleton<T>`] pairs a [`Holder`] with the function that builds its
//! value, so access is a zero-argument call: the classic `getInstance()`
//! shape, minus the global mutable pointer. [`TrySingleton<T, E>`] is the
//! same cell for constructors that can fail.

use core::fmt;
use core::ops::Deref;
use std::time::Duration;

use crate::error::InitError;
use crate::holder::Holder;

/// A process-wide value constructed on first access.
///
/// The constructor is fixed at cell creation, runs at most once no matter how
/// many threads reach the cell first, and its result lives as long as the
/// cell. Typically declared as a `static`:
///
/// ```rust
/// use once_singleton::Singleton;
///
/// static REGISTRY: Singleton<Vec<&'static str>> = Singleton::new(|| vec!["core"]);
///
/// // First access constructs; every later access returns the same value.
/// assert_eq!(REGISTRY.instance()[0], "core");
/// assert!(std::ptr::eq(REGISTRY.instance(), REGISTRY.instance()));
/// ```
///
/// This is the double-checked design: after the first construction, access is
/// a single atomic load with no lock traffic. Callers that lose the initial
/// race block until the winner publishes, then return its value.
pub struct Singleton<T> {
   cell: Holder<T>,
   construct: fn() -> T,
}

impl<T> Singleton<T> {
   /// Creates the cell with the constructor it will run on first access.
   #[inline]
   #[must_use]
   pub const fn new(construct: fn() -> T) -> Self {
      Self {
         cell: Holder::new(),
         construct,
      }
   }

   /// Returns the instance, constructing it if this is the first access.
   ///
   /// Blocks while another thread is mid-construction. All callers, on all
   /// threads, get a reference to the same value.
   #[inline]
   pub fn instance(&self) -> &T {
      self.cell.get_or_init(self.construct)
   }

   /// Returns the instance only if it has already been constructed.
   #[inline]
   pub fn get(&self) -> Option<&T> {
      self.cell.get()
   }

   /// Whether the instance has been constructed. Never blocks.
   #[inline]
   pub fn is_ready(&self) -> bool {
      self.cell.is_ready()
   }

   /// Drops the instance and returns it, restoring the never-constructed
   /// state. Exclusive access only; meant for tests that reset process-wide
   /// state between runs.
   #[inline]
   pub fn reset(&mut self) -> Option<T> {
      self.cell.take()
   }
}

impl<T> Deref for Singleton<T> {
   type Target = T;

   /// Equivalent to [`instance`](Self::instance): constructs on first use.
   #[inline]
   fn deref(&self) -> &T {
      self.instance()
   }
}

impl<T: fmt::Debug> fmt::Debug for Singleton<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("Singleton").field("cell", &self.cell).finish()
   }
}

/// A process-wide value whose constructor can fail.
///
/// Behaves like [`Singleton`], except a failed construction is reported to
/// the caller that triggered it and the cell reverts to unconstructed, so a
/// later call retries. Once a construction succeeds, the constructor is never
/// run again; subsequent calls return the cached instance even if the
/// constructor would now fail.
///
/// ```rust
/// use once_singleton::TrySingleton;
///
/// static LOOKUP: TrySingleton<Vec<u32>, String> =
///    TrySingleton::new(|| Ok((0..4).collect()));
///
/// assert_eq!(LOOKUP.instance().unwrap().len(), 4);
/// ```
pub struct TrySingleton<T, E> {
   cell: Holder<T>,
   construct: fn() -> Result<T, E>,
}

impl<T, E> TrySingleton<T, E> {
   /// Creates the cell with the fallible constructor it will run on first
   /// successful access.
   #[inline]
   #[must_use]
   pub const fn new(construct: fn() -> Result<T, E>) -> Self {
      Self {
         cell: Holder::new(),
         construct,
      }
   }

   /// Returns the instance, constructing it if no attempt has succeeded yet.
   ///
   /// On construction failure the error is returned wrapped in
   /// [`InitError::Construction`] and the cell stays unconstructed.
   #[inline]
   pub fn instance(&self) -> Result<&T, InitError<E>> {
      self.cell
         .get_or_try_init(self.construct)
         .map_err(InitError::Construction)
   }

   /// As [`instance`](Self::instance), but waits at most `timeout` for a
   /// competing thread's construction before giving up with
   /// [`InitError::TimedOut`].
   #[inline]
   pub fn instance_for(&self, timeout: Duration) -> Result<&T, InitError<E>> {
      self.cell.get_or_try_init_for(self.construct, timeout)
   }

   /// Returns the instance only if a construction has already succeeded.
   #[inline]
   pub fn get(&self) -> Option<&T> {
      self.cell.get()
   }

   /// Whether a construction has succeeded. Never blocks.
   #[inline]
   pub fn is_ready(&self) -> bool {
      self.cell.is_ready()
   }

   /// Drops the instance and returns it, restoring the never-constructed
   /// state. Exclusive access only; meant for tests.
   #[inline]
   pub fn reset(&mut self) -> Option<T> {
      self.cell.take()
   }
}

impl<T: fmt::Debug, E> fmt::Debug for TrySingleton<T, E> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("TrySingleton")
         .field("cell", &self.cell)
         .finish()
   }
}
