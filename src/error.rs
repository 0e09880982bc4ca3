//! Errors surfaced by fallible singleton access.

use core::fmt;
use std::error::Error;

/// Why a fallible access to a singleton did not produce a value.
///
/// `Construction` carries the constructor's own error; it is reported only to
/// the caller whose attempt ran the constructor, and the cell stays
/// uninitialized so a later call retries. `TimedOut` means a bounded wait
/// expired while another thread still held the construction lock; the cell
/// may become initialized moments later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError<E> {
   /// The constructor ran and failed.
   Construction(E),
   /// The wait for the construction lock exceeded its deadline.
   TimedOut,
}

impl<E: fmt::Display> fmt::Display for InitError<E> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      match self {
         Self::Construction(err) => write!(f, "singleton construction failed: {err}"),
         Self::TimedOut => f.write_str("timed out waiting for singleton construction"),
      }
   }
}

impl<E: Error + 'static> Error for InitError<E> {
   fn source(&self) -> Option<&(dyn Error + 'static)> {
      match self {
         Self::Construction(err) => Some(err),
         Self::TimedOut => None,
      }
   }
}
