// src/fetch/mod.rs

//! Build-package fetching.
//!
//! [`package`] downloads the source archive over HTTP, dispatches on its
//! `Content-Type` to an extractor in [`extract`], and yields a
//! [`BuildContext`] rooted inside a fresh temporary directory.

pub mod extract;
pub mod package;

pub use package::{create_build_context, ArchiveKind, BuildContext, BuildPackageOptions};
