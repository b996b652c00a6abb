//! Error types for `tensio-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The geographic identity of a prediction row must not be blank.
  #[error("region must not be empty")]
  EmptyRegion,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
