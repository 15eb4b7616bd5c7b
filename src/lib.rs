//! Create and delete Kubernetes resources from manifests
//!
//! Manifests are YAML or JSON texts with one or more documents. A document
//! is either a single resource or a list of resources (`kind: List` or
//! `kind: <Kind>List`). Every resource is sent to the API server on its
//! own, in the order of the manifest.
//!
//! ```no_run
//! use kube_manifest_apply::{create_from_yaml, ApplyOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = kube::Client::try_default().await?;
//! let options = ApplyOptions::default().namespace("staging");
//! create_from_yaml(client, "deployment.yaml", options).await?;
//! # Ok(())
//! # }
//! ```
//!
//! If some resources cannot be applied then the remaining ones are applied
//! nevertheless and all failures are returned together as
//! [`FailToExecuteError`]. Its textual form contains the response of the
//! API server for every failure, e.g.
//!
//! ```text
//! Error from server (Conflict): {"kind":"Status",...,"code":409}
//! ```

pub mod batch;
pub mod dispatch;
pub mod error;
pub mod expand;
pub mod manifest;
pub mod resolve;
pub mod transport;


use std::path::Path;

use serde_json::Value;

pub use batch::{ApplyOptions, Applier};
pub use dispatch::Verb;
pub use error::{Error, FailToExecuteError, Failure, KindResolutionError, ParseError, Result, ServerError};
pub use manifest::{Document, Manifest};
pub use resolve::KindRegistry;
pub use transport::Transport;

/// Creates the resources of the given manifest file.
pub async fn create_from_yaml<T: Transport>(
    transport: T,
    path: impl AsRef<Path>,
    options: ApplyOptions,
) -> Result<()> {
    Applier::new(transport)
        .with_options(options)
        .create_from_yaml(path)
        .await
}

/// Deletes the resources of the given manifest file.
pub async fn delete_from_yaml<T: Transport>(
    transport: T,
    path: impl AsRef<Path>,
    options: ApplyOptions,
) -> Result<()> {
    Applier::new(transport)
        .with_options(options)
        .delete_from_yaml(path)
        .await
}

/// Creates the resources of every manifest file in the given directory.
pub async fn create_from_directory<T: Transport>(
    transport: T,
    dir: impl AsRef<Path>,
    options: ApplyOptions,
) -> Result<()> {
    Applier::new(transport)
        .with_options(options)
        .create_from_directory(dir)
        .await
}

/// Creates or deletes the resources of an already decoded document.
pub async fn operate_from_value<T: Transport>(
    transport: T,
    value: Value,
    verb: Verb,
    options: ApplyOptions,
) -> Result<()> {
    Applier::new(transport)
        .with_options(options)
        .operate_from_value(value, verb)
        .await
}
