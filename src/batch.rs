//! Applying whole manifests
//!
//! An [`Applier`] parses a manifest, expands its lists and sends every
//! resulting object to the API server, strictly one after another and in
//! the order of the manifest. Later objects may depend on earlier ones,
//! e.g. a deployment on the namespace it is created in.
//!
//! Failures of single objects do not stop the batch. They are collected
//! and returned together as [`FailToExecuteError`] once every object was
//! attempted. Only a manifest which cannot be parsed aborts before
//! anything is sent.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use kube::api::{DeleteParams, PostParams};
use kube::Client;
use serde_json::Value;
use tracing::{debug, info};

use crate::dispatch::{Applied, Dispatcher, Verb};
use crate::error::{Error, FailToExecuteError, Failure, Result};
use crate::expand::expand;
use crate::manifest::{parse, Document};
use crate::resolve::KindRegistry;
use crate::transport::Transport;

/// Options for applying manifests
#[derive(Clone, Debug, Default)]
pub struct ApplyOptions {
    /// Namespace which replaces the namespace of every namespaced object
    pub namespace: Option<String>,
    /// Logs every applied object at level `info`
    pub verbose: bool,
    /// Parameters of create requests, e.g. `dry_run` or `field_manager`
    pub post_params: PostParams,
    /// Parameters of delete requests
    pub delete_params: DeleteParams,
}

impl ApplyOptions {
    /// Places every namespaced object in the given namespace.
    #[must_use]
    pub fn namespace(mut self, namespace: &str) -> Self {
        self.namespace = Some(namespace.to_owned());
        self
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Validates create requests on the server without persisting them.
    #[must_use]
    pub fn dry_run(mut self) -> Self {
        self.post_params.dry_run = true;
        self
    }

    #[must_use]
    pub fn field_manager(mut self, field_manager: &str) -> Self {
        self.post_params.field_manager = Some(field_manager.to_owned());
        self
    }

    #[must_use]
    pub fn delete_params(mut self, delete_params: DeleteParams) -> Self {
        self.delete_params = delete_params;
        self
    }
}

/// Creates and deletes the objects of manifests
pub struct Applier<T = Client> {
    transport: T,
    registry: Arc<KindRegistry>,
    options: ApplyOptions,
}

impl Applier<Client> {
    /// Creates an [`Applier`] for the cluster of the inferred configuration.
    ///
    /// The configuration is read from the kubeconfig or, inside a pod,
    /// from the service account.
    pub async fn try_default() -> kube::Result<Self> {
        Ok(Applier::new(Client::try_default().await?))
    }
}

impl<T: Transport> Applier<T> {
    /// Creates an [`Applier`] with the builtin kinds and default options.
    pub fn new(transport: T) -> Self {
        Applier {
            transport,
            registry: KindRegistry::builtin(),
            options: ApplyOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ApplyOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the table of known kinds, e.g. to add custom resources.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<KindRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn options(&self) -> &ApplyOptions {
        &self.options
    }

    /// Creates the objects of the given manifest file.
    pub async fn create_from_yaml(&self, path: impl AsRef<Path>) -> Result<()> {
        self.operate_from_yaml(path.as_ref(), Verb::Create).await
    }

    /// Deletes the objects of the given manifest file.
    pub async fn delete_from_yaml(&self, path: impl AsRef<Path>) -> Result<()> {
        self.operate_from_yaml(path.as_ref(), Verb::Delete).await
    }

    /// Creates the objects of the given manifest text.
    pub async fn create_from_str(&self, text: &str) -> Result<()> {
        self.operate_from_str(text, Verb::Create).await
    }

    /// Deletes the objects of the given manifest text.
    pub async fn delete_from_str(&self, text: &str) -> Result<()> {
        self.operate_from_str(text, Verb::Delete).await
    }

    /// Applies a single document which was already decoded.
    ///
    /// List documents are expanded like in manifest files.
    pub async fn operate_from_value(&self, value: Value, verb: Verb) -> Result<()> {
        let documents = Document::from_value(value)?.into_iter().collect();
        Ok(self.run(documents, verb).await?)
    }

    /// Creates the objects of every `.yaml` and `.yml` file in the given
    /// directory.
    ///
    /// The files are applied in the order of their names. Failures of all
    /// files are returned together; a file which cannot be parsed aborts
    /// the whole directory.
    pub async fn create_from_directory(&self, dir: impl AsRef<Path>) -> Result<()> {
        let mut failures = Vec::new();

        for path in manifest_files(dir.as_ref()).await? {
            match self.create_from_yaml(&path).await {
                Ok(()) => {}
                Err(Error::FailToExecute(error)) => failures.extend(error.into_failures()),
                Err(error) => return Err(error),
            }
        }

        finish(failures).map_err(Error::from)
    }

    async fn operate_from_yaml(&self, path: &Path, verb: Verb) -> Result<()> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| Error::ReadManifest {
                path: path.to_owned(),
                source,
            })?;
        let documents = parse(&text).map_err(|source| Error::Parse {
            path: Some(path.to_owned()),
            source,
        })?;
        Ok(self.run(documents, verb).await?)
    }

    async fn operate_from_str(&self, text: &str, verb: Verb) -> Result<()> {
        let documents = parse(text)?;
        Ok(self.run(documents, verb).await?)
    }

    /// Applies the documents in order.
    ///
    /// Every object is attempted, regardless of earlier failures.
    pub async fn run(&self, documents: Vec<Document>, verb: Verb) -> Result<(), FailToExecuteError> {
        let dispatcher = Dispatcher::new(
            &self.transport,
            &self.registry,
            &self.options.post_params,
            &self.options.delete_params,
        );
        let namespace = self.options.namespace.as_deref();

        let mut failures = Vec::new();
        for document in documents {
            for manifest in expand(document, namespace) {
                match dispatcher.apply(manifest, verb).await {
                    Ok(applied) => self.report(&applied),
                    Err(failure) => failures.push(failure),
                }
            }
        }

        finish(failures)
    }

    fn report(&self, applied: &Applied) {
        if self.options.verbose {
            info!("{}", applied);
        } else {
            debug!(operation = %applied.operation, "{}", applied);
        }
    }
}

fn finish(failures: Vec<Failure>) -> Result<(), FailToExecuteError> {
    if failures.is_empty() {
        Ok(())
    } else {
        Err(FailToExecuteError::new(failures))
    }
}

async fn manifest_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let read_error = |source: std::io::Error| Error::ReadDirectory {
        path: dir.to_owned(),
        source,
    };

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_error)?;
    while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
        let path = entry.path();
        let is_manifest = matches!(
            path.extension().and_then(|extension| extension.to_str()),
            Some("yaml") | Some("yml")
        );
        if is_manifest && tokio::fs::metadata(&path).await.map_err(read_error)?.is_file() {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}
