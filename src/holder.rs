//! Once-initialized storage for a process-wide value.
//!
//! [`Holder<T>`] owns the slot a singleton lives in: untouched until the first
//! successful construction, then home to exactly one `T` for as long as the
//! holder exists. It is the storage layer under [`Singleton`] and
//! [`TrySingleton`], and is usable directly when the constructor is more
//! convenient at the call site than baked into the cell.
//!
//! All initializing methods share the same shape: an unlocked ready check,
//! then the construction lock, then a second check under the lock (another
//! thread may have finished while we waited). A failing initializer leaves the
//! holder untouched so a later call can retry.
//!
//! [`Singleton`]: crate::singleton::Singleton
//! [`TrySingleton`]: crate::singleton::TrySingleton

use core::cell::UnsafeCell;
use core::sync::atomic::Ordering;
use core::{fmt, mem};
use std::time::{Duration, Instant};

#[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
use core::future::Future;

use crate::error::InitError;
use crate::state::{InitState, LockTimedOut};

/// A slot that is written at most once and then shared immutably.
///
/// `Holder` is `const`-constructible, so it works as a `static`:
///
/// ```rust
/// use once_singleton::Holder;
///
/// static CONFIG: Holder<String> = Holder::new();
///
/// CONFIG.get_or_init(|| "production".to_string());
/// assert_eq!(CONFIG.get(), Some(&"production".to_string()));
/// ```
///
/// Concurrent initializers are arbitrated so the closure runs exactly once;
/// every caller gets a reference to the one value the winner constructed.
pub struct Holder<T> {
   value: UnsafeCell<mem::MaybeUninit<T>>,
   state: InitState,
}

// SAFETY: a shared `Holder` hands out `&T` across threads (T: Sync) and moves
// the value in from whichever thread wins construction, or out via `take`
// (T: Send).
unsafe impl<T: Sync + Send> Sync for Holder<T> {}
// SAFETY: sending the holder sends the owned value with it.
unsafe impl<T: Send> Send for Holder<T> {}

impl<T> Holder<T> {
   /// Creates an empty holder.
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self {
         value: UnsafeCell::new(mem::MaybeUninit::uninit()),
         state: InitState::new(),
      }
   }

   /// Creates a holder that already contains `value` (eager initialization).
   #[inline]
   #[must_use]
   pub const fn ready(value: T) -> Self {
      Self {
         value: UnsafeCell::new(mem::MaybeUninit::new(value)),
         state: InitState::ready(),
      }
   }

   /// Whether a value has been published. Never blocks.
   #[inline]
   pub fn is_ready(&self) -> bool {
      // Acquire pairs with the Release publish so a true result also means
      // the value itself is visible.
      self.state.is_ready(Ordering::Acquire)
   }

   /// Returns the value if one has been published. Never blocks.
   #[inline]
   pub fn get(&self) -> Option<&T> {
      if self.is_ready() {
         // SAFETY: is_ready() saw READY with Acquire ordering.
         Some(unsafe { self.get_unchecked() })
      } else {
         None
      }
   }

   /// Mutable access to the value if one has been published. Never blocks.
   #[inline]
   pub fn get_mut(&mut self) -> Option<&mut T> {
      if self.is_ready() {
         // SAFETY: the value is initialized and `&mut self` is exclusive.
         Some(unsafe { (*self.value.get()).assume_init_mut() })
      } else {
         None
      }
   }

   /// Returns the value without checking that it was published.
   ///
   /// # Safety
   ///
   /// The holder must be initialized, and the caller must have observed that
   /// with `Acquire` ordering (e.g. via [`is_ready`](Self::is_ready)).
   #[inline]
   pub unsafe fn get_unchecked(&self) -> &T {
      debug_assert!(self.is_ready(), "get_unchecked on an empty Holder");
      (*self.value.get()).assume_init_ref()
   }

   /// Returns the value, running `f` to construct it if the holder is empty.
   ///
   /// Under concurrent calls, `f` runs on exactly one thread; the rest block
   /// until the value is published and then return it. Every call for the
   /// lifetime of the holder returns a reference to that same value.
   #[inline]
   pub fn get_or_init<F>(&self, f: F) -> &T
   where
      F: FnOnce() -> T,
   {
      if let Some(value) = self.get() {
         return value;
      }
      self.construct(f);
      // SAFETY: construct() only returns once a value is published.
      unsafe { self.get_unchecked() }
   }

   /// As [`get_or_init`](Self::get_or_init), with a fallible constructor.
   ///
   /// If `f` returns `Err`, the error goes to the caller that ran it, the
   /// holder stays empty, and any thread that was blocked on us re-races for
   /// the construction lock. A failure is never cached: a later call runs its
   /// constructor again.
   pub fn get_or_try_init<F, E>(&self, f: F) -> Result<&T, E>
   where
      F: FnOnce() -> Result<T, E>,
   {
      if let Some(value) = self.get() {
         return Ok(value);
      }
      self.try_construct(f)?;
      debug_assert!(self.is_ready());
      // SAFETY: try_construct succeeded, so a value is published.
      Ok(unsafe { self.get_unchecked() })
   }

   /// As [`get_or_try_init`](Self::get_or_try_init), but waits at most
   /// `timeout` for a competing thread to release the construction lock.
   ///
   /// Returns [`InitError::TimedOut`] if the lock was still held when the
   /// timeout expired; the holder may be initialized by the other thread
   /// shortly after, so callers are free to try again.
   pub fn get_or_try_init_for<F, E>(&self, f: F, timeout: Duration) -> Result<&T, InitError<E>>
   where
      F: FnOnce() -> Result<T, E>,
   {
      if let Some(value) = self.get() {
         return Ok(value);
      }
      self.try_construct_until(f, Instant::now() + timeout)?;
      debug_assert!(self.is_ready());
      // SAFETY: try_construct_until succeeded, so a value is published.
      Ok(unsafe { self.get_unchecked() })
   }

   /// Async variant of [`get_or_init`](Self::get_or_init).
   ///
   /// Only one task's future runs; competing tasks yield to the runtime while
   /// they wait rather than blocking the worker thread.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub async fn get_or_init_async<F, Fut>(&self, f: F) -> &T
   where
      F: FnOnce() -> Fut,
      Fut: Future<Output = T>,
   {
      if let Some(value) = self.get() {
         return value;
      }
      self.construct_async(f).await;
      // SAFETY: construct_async() only returns once a value is published.
      unsafe { self.get_unchecked() }
   }

   /// Async variant of [`get_or_try_init`](Self::get_or_try_init), with the
   /// same failure-rollback semantics.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub async fn get_or_try_init_async<F, Fut, E>(&self, f: F) -> Result<&T, E>
   where
      F: FnOnce() -> Fut,
      Fut: Future<Output = Result<T, E>>,
   {
      if let Some(value) = self.get() {
         return Ok(value);
      }
      self.try_construct_async(f).await?;
      debug_assert!(self.is_ready());
      // SAFETY: try_construct_async succeeded, so a value is published.
      Ok(unsafe { self.get_unchecked() })
   }

   /// Removes and returns the value, leaving the holder empty.
   ///
   /// Requires exclusive access, so it never races with readers. This is the
   /// reset hook for tests that reuse process-wide state between runs.
   pub fn take(&mut self) -> Option<T> {
      if self.state.unset() {
         // SAFETY: the state said READY and is now UNINIT, so the slot holds
         // an initialized value that nothing else can read anymore.
         Some(unsafe { (*self.value.get()).assume_init_read() })
      } else {
         None
      }
   }

   // --- cold construction paths ---

   #[cold]
   fn construct<F>(&self, f: F)
   where
      F: FnOnce() -> T,
   {
      let Some(guard) = self.state.lock() else {
         return; // another thread published while we waited
      };
      // SAFETY: the guard gives us exclusive access to the slot.
      unsafe { (*self.value.get()).write(f()) };
      guard.commit();
   }

   #[cold]
   fn try_construct<F, E>(&self, f: F) -> Result<(), E>
   where
      F: FnOnce() -> Result<T, E>,
   {
      let Some(guard) = self.state.lock() else {
         return Ok(()); // another thread published while we waited
      };
      // On Err the guard drops here, reverting the state for the next caller.
      let value = f()?;
      // SAFETY: the guard gives us exclusive access to the slot.
      unsafe { (*self.value.get()).write(value) };
      guard.commit();
      Ok(())
   }

   #[cold]
   fn try_construct_until<F, E>(&self, f: F, deadline: Instant) -> Result<(), InitError<E>>
   where
      F: FnOnce() -> Result<T, E>,
   {
      let guard = match self.state.lock_until(deadline) {
         Ok(None) => return Ok(()), // another thread published while we waited
         Ok(Some(guard)) => guard,
         Err(LockTimedOut) => return Err(InitError::TimedOut),
      };
      let value = f().map_err(InitError::Construction)?;
      // SAFETY: the guard gives us exclusive access to the slot.
      unsafe { (*self.value.get()).write(value) };
      guard.commit();
      Ok(())
   }

   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   #[cold]
   async fn construct_async<F, Fut>(&self, f: F)
   where
      F: FnOnce() -> Fut,
      Fut: Future<Output = T>,
   {
      let Some(guard) = self.state.lock_async().await else {
         return;
      };
      // SAFETY: the guard gives us exclusive access to the slot.
      unsafe { (*self.value.get()).write(f().await) };
      guard.commit();
   }

   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   #[cold]
   async fn try_construct_async<F, Fut, E>(&self, f: F) -> Result<(), E>
   where
      F: FnOnce() -> Fut,
      Fut: Future<Output = Result<T, E>>,
   {
      let Some(guard) = self.state.lock_async().await else {
         return Ok(());
      };
      // On Err (or a cancelled future) the guard drops, reverting the state.
      let value = f().await?;
      // SAFETY: the guard gives us exclusive access to the slot.
      unsafe { (*self.value.get()).write(value) };
      guard.commit();
      Ok(())
   }
}

impl<T> Default for Holder<T> {
   #[inline]
   fn default() -> Self {
      Self::new()
   }
}

impl<T> From<T> for Holder<T> {
   #[inline]
   fn from(value: T) -> Self {
      Self::ready(value)
   }
}

impl<T: fmt::Debug> fmt::Debug for Holder<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_tuple("Holder");
      match self.get() {
         Some(value) => d.field(value),
         None => d.field(&format_args!("<empty>")),
      };
      d.finish()
   }
}

impl<T> Drop for Holder<T> {
   fn drop(&mut self) {
      if self.is_ready() {
         // SAFETY: initialized, exclusive access, and never read again.
         unsafe { self.value.get_mut().assume_init_drop() };
      }
   }
}
