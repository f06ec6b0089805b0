//! Package source configuration.
//!
//! Resolves which feeds and folders packages are fetched from, following
//! the `NuGet.Config` hierarchy of a project.

pub mod error;
pub mod nuget_config;
pub mod settings;
pub mod source;

#[cfg(test)]
pub mod test_utils;
