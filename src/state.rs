//! Construction-race state machine shared by the holder types.
//!
//! A holder's lifecycle is tracked in a single `AtomicU8` holding one of four
//! values:
//!
//! - `UNINIT`: no value, nobody constructing.
//! - `BUSY`: one thread holds the construction lock.
//! - `BUSY_PARKED`: as `BUSY`, plus at least one thread is parked on the word.
//! - `READY`: the value is constructed and published.
//!
//! `READY` is written with `Release` ordering and every fast-path read of the
//! word uses `Acquire`, so a thread that observes `READY` also observes the
//! fully constructed value. Losers of the construction race sleep on the word
//! via `parking_lot_core`'s futex-style park/unpark instead of spinning.
//!
//! Construction failure moves the word back to `UNINIT` and wakes all parked
//! threads so they can race for the lock again; `READY` is terminal.

use core::mem;
use core::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

use parking_lot_core::{ParkResult, DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};

const UNINIT: u8 = 0;
const BUSY: u8 = 1;
const BUSY_PARKED: u8 = 2;
const READY: u8 = 3;

/// Returned by [`InitState::lock_until`] when the deadline passes while
/// another thread still holds the construction lock.
pub(crate) struct LockTimedOut;

/// Atomic construction-race state for a holder.
#[repr(transparent)]
pub(crate) struct InitState(AtomicU8);

impl InitState {
   /// State for a holder with no value.
   #[inline]
   pub(crate) const fn new() -> Self {
      Self(AtomicU8::new(UNINIT))
   }

   /// State for a holder constructed with a value already in place.
   #[inline]
   pub(crate) const fn ready() -> Self {
      Self(AtomicU8::new(READY))
   }

   /// The unlocked fast-path check: is the value published?
   #[inline]
   pub(crate) fn is_ready(&self, ordering: Ordering) -> bool {
      self.0.load(ordering) == READY
   }

   /// Moves the word back to `UNINIT`, returning whether it was `READY`.
   ///
   /// Only sound while no other thread can touch the holder, i.e. from
   /// `&mut self` methods on the owning type.
   #[inline]
   pub(crate) fn unset(&self) -> bool {
      self.0.swap(UNINIT, Ordering::Release) == READY
   }

   /// Address the parked threads sleep on. Must match between park and unpark.
   #[inline]
   fn futex_key(&self) -> usize {
      self.0.as_ptr() as usize
   }

   #[inline]
   fn wake_all(&self) {
      // SAFETY: the key is the address of our atomic, the same address used
      // for every park on this state.
      unsafe {
         parking_lot_core::unpark_all(self.futex_key(), DEFAULT_UNPARK_TOKEN);
      }
   }

   /// Parks the calling thread until the word moves off `expected` (or a
   /// spurious wake). Returns `false` only if `deadline` passed first.
   fn wait(&self, expected: u8, deadline: Option<Instant>) -> bool {
      // SAFETY: see `wake_all`; the validation closure re-checks the word so
      // we never sleep past a state change that raced with the park.
      let result = unsafe {
         parking_lot_core::park(
            self.futex_key(),
            || self.0.load(Ordering::Acquire) == expected,
            || {},
            |_, _| {},
            DEFAULT_PARK_TOKEN,
            deadline,
         )
      };
      !matches!(result, ParkResult::TimedOut)
   }

   /// One acquisition attempt without sleeping.
   ///
   /// - `Ok(None)`: the value is already published.
   /// - `Ok(Some(guard))`: we won the race and hold the construction lock.
   /// - `Err(word)`: another thread holds the lock. If `publish_wait` was set,
   ///   `word` is `BUSY_PARKED` and the caller may park on it.
   fn lock_step(&self, publish_wait: bool) -> Result<Option<InitGuard<'_>>, u8> {
      let mut current = self.0.load(Ordering::Acquire);
      loop {
         match current {
            READY => return Ok(None),
            UNINIT => {
               match self.0.compare_exchange_weak(
                  UNINIT,
                  BUSY,
                  Ordering::Acquire,
                  Ordering::Acquire,
               ) {
                  Ok(_) => return Ok(Some(InitGuard { state: self })),
                  Err(actual) => {
                     current = actual;
                     std::hint::spin_loop();
                  }
               }
            }
            BUSY if publish_wait => {
               // Tell the lock holder someone needs a wake on release.
               match self.0.compare_exchange_weak(
                  BUSY,
                  BUSY_PARKED,
                  Ordering::Relaxed,
                  Ordering::Acquire,
               ) {
                  Ok(_) => return Err(BUSY_PARKED),
                  Err(actual) => {
                     current = actual;
                     std::hint::spin_loop();
                  }
               }
            }
            held => return Err(held),
         }
      }
   }

   /// Acquires the construction lock, blocking while another thread holds it.
   ///
   /// Returns `None` if the value became published while we waited.
   pub(crate) fn lock(&self) -> Option<InitGuard<'_>> {
      loop {
         match self.lock_step(true) {
            Ok(guard) => return guard,
            Err(held) => {
               self.wait(held, None);
            }
         }
      }
   }

   /// As [`lock`](Self::lock), but gives up once `deadline` passes.
   pub(crate) fn lock_until(
      &self,
      deadline: Instant,
   ) -> Result<Option<InitGuard<'_>>, LockTimedOut> {
      loop {
         match self.lock_step(true) {
            Ok(guard) => return Ok(guard),
            Err(held) => {
               if Instant::now() >= deadline {
                  return Err(LockTimedOut);
               }
               if !self.wait(held, Some(deadline)) {
                  // The park timed out. The lock may have been released right
                  // at the deadline, so make one last non-waiting attempt.
                  return match self.lock_step(false) {
                     Ok(guard) => Ok(guard),
                     Err(_) => Err(LockTimedOut),
                  };
               }
            }
         }
      }
   }

   /// Acquires the construction lock from async context.
   ///
   /// Yields to the runtime while the lock is contended, on the assumption
   /// that the lock holder is a task on the same runtime. On a multi-thread
   /// runtime, falls back to a real park via `block_in_place` once yielding
   /// has not helped.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub(crate) async fn lock_async(&self) -> Option<InitGuard<'_>> {
      #[allow(clippy::never_loop)]
      loop {
         for _ in 0..16 {
            match self.lock_step(false) {
               Ok(guard) => return guard,
               Err(held) => {
                  for _ in 0..32 {
                     tokio::task::yield_now().await;
                     if self.0.load(Ordering::Relaxed) != held {
                        break;
                     }
                  }
               }
            }
         }

         #[cfg(feature = "async-tokio-mt")]
         {
            return match self.lock_step(true) {
               Ok(guard) => guard,
               Err(held) => tokio::task::block_in_place(|| {
                  self.wait(held, None);
                  self.lock()
               }),
            };
         }
      }
   }
}

/// RAII lock over a holder mid-construction.
///
/// [`commit`](Self::commit) publishes the value; dropping the guard instead
/// (initializer failed or panicked) reverts the state to uninitialized so a
/// later caller can retry. Both paths wake every parked thread.
pub(crate) struct InitGuard<'a> {
   state: &'a InitState,
}

impl InitGuard<'_> {
   /// Publishes the constructed value and consumes the guard.
   ///
   /// The `Release` swap orders the value write before any `Acquire` load
   /// that observes `READY`.
   #[inline]
   pub(crate) fn commit(self) {
      let prev = self.state.0.swap(READY, Ordering::Release);
      debug_assert!(prev == BUSY || prev == BUSY_PARKED);
      if prev == BUSY_PARKED {
         self.state.wake_all();
      }
      mem::forget(self); // Drop would revert the state we just published
   }
}

impl Drop for InitGuard<'_> {
   fn drop(&mut self) {
      // Construction did not complete. Revert so the parked threads race for
      // the lock again rather than waiting on a value that never arrives.
      let prev = self.state.0.swap(UNINIT, Ordering::Release);
      debug_assert!(prev == BUSY || prev == BUSY_PARKED);
      if prev == BUSY_PARKED {
         self.state.wake_all();
      }
   }
}
