//! Media items and the downloadable resources attached to them.
//!
//! A [`MediaItem`] is one search hit from the Search Provider. Resolving it
//! yields a [`ResourceBundle`]: the entries of a single [`ResourceKind`].

mod types;

pub use types::*;
