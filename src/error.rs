//! Errors the operator core raises on its own account.
//!
//! Operators are generic over the error type of the sources they consume.
//! When an operator has to originate an error itself (an aggregate over an
//! empty sequence, a duplicate key while building a map) it requires
//! `Err: From<RxError>` and converts.

use thiserror::Error;

/// Errors produced by operators rather than forwarded from upstream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RxError {
  /// An aggregate without a seed saw no elements.
  #[error("sequence contains no elements")]
  EmptySequence,

  /// A map-building consumer saw the same key twice.
  #[error("an element with the same key has already been collected")]
  DuplicateKey,
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn display() {
    assert_eq!(RxError::EmptySequence.to_string(), "sequence contains no elements");
    assert!(RxError::DuplicateKey.to_string().contains("same key"));
  }
}
