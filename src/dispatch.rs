//! Sending single manifests to the API server

use std::fmt;

use kube::api::{DeleteParams, DynamicObject, PostParams};
use kube::core::Request;
use kube::Resource;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{BoxError, Failure, ServerError};
use crate::manifest::Manifest;
use crate::resolve::{KindRegistry, Resolution};
use crate::transport::Transport;

/// Namespace of namespaced objects which do not declare one
pub const DEFAULT_NAMESPACE: &str = "default";

/// The operation family applied to every document of a batch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verb {
    Create,
    Delete,
}

impl Verb {
    /// Returns the past tense, e.g. `created`.
    pub fn past_tense(self) -> &'static str {
        match self {
            Verb::Create => "created",
            Verb::Delete => "deleted",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verb::Create => f.write_str("create"),
            Verb::Delete => f.write_str("delete"),
        }
    }
}

/// A document which was successfully applied
#[derive(Clone, Debug)]
pub struct Applied {
    pub verb: Verb,
    pub kind: String,
    /// Name of the invoked operation, e.g. `create_namespaced_pod`
    pub operation: String,
    /// The object returned by the API server
    pub object: Value,
}

impl Applied {
    /// Returns the `status` of the returned object as text.
    ///
    /// Deletions return either the deleted object or a `Status` object;
    /// in both cases the `status` field is rendered.
    pub fn status(&self) -> String {
        match self.object.get("status") {
            None | Some(Value::Null) => String::from("None"),
            Some(Value::String(status)) => status.clone(),
            Some(status) => status.to_string(),
        }
    }
}

impl fmt::Display for Applied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}. status='{}'", self.kind, self.verb.past_tense(), self.status())
    }
}

/// Result of applying a single document
pub type Outcome = Result<Applied, Failure>;

/// Applies single manifests with a transport
pub struct Dispatcher<'a, T> {
    transport: &'a T,
    registry: &'a KindRegistry,
    post_params: &'a PostParams,
    delete_params: &'a DeleteParams,
}

impl<'a, T: Transport> Dispatcher<'a, T> {
    pub fn new(
        transport: &'a T,
        registry: &'a KindRegistry,
        post_params: &'a PostParams,
        delete_params: &'a DeleteParams,
    ) -> Self {
        Dispatcher {
            transport,
            registry,
            post_params,
            delete_params,
        }
    }

    /// Creates or deletes the object described by the manifest.
    ///
    /// Namespaced objects without a namespace are placed in
    /// [`DEFAULT_NAMESPACE`]. Every failure, including errors of the
    /// transport, is returned as [`Failure`].
    pub async fn apply(&self, mut manifest: Manifest, verb: Verb) -> Outcome {
        let resolution = self.registry.resolve(&manifest)?;
        let kind = resolution.api_resource.kind.clone();
        let name = manifest.name().unwrap_or_default().to_owned();

        let namespace = if resolution.namespaced {
            let namespace = manifest
                .namespace()
                .unwrap_or(DEFAULT_NAMESPACE)
                .to_owned();
            manifest.set_namespace(&namespace);
            Some(namespace)
        } else {
            manifest.clear_namespace();
            None
        };

        let operation = resolution.operation_name(verb);
        debug!(
            client = %resolution.client,
            %operation,
            %name,
            namespace = namespace.as_deref().unwrap_or_default(),
            "dispatching"
        );

        let request = self
            .request(&resolution, namespace.as_deref(), &manifest, verb)
            .map_err(|error| error.into_failure(&kind, &name))?;

        let response = self
            .transport
            .execute(request)
            .await
            .map_err(|source| Failure::Transport {
                kind: kind.clone(),
                name: name.clone(),
                source,
            })?;

        if !response.status.is_success() {
            let error = ServerError {
                status: response.status,
                body: response.body,
            };
            warn!(%operation, %name, "{}", error);
            return Err(Failure::Server(error));
        }

        let object = match serde_json::from_str(&response.body) {
            Ok(object) => object,
            Err(error) => {
                debug!(%operation, %name, %error, "response body is not a JSON object");
                Value::Null
            }
        };
        Ok(Applied {
            verb,
            kind,
            operation,
            object,
        })
    }

    fn request(
        &self,
        resolution: &Resolution,
        namespace: Option<&str>,
        manifest: &Manifest,
        verb: Verb,
    ) -> Result<http::Request<Vec<u8>>, RequestError> {
        let request = Request::new(DynamicObject::url_path(&resolution.api_resource, namespace));

        match verb {
            Verb::Create => {
                let body = serde_json::to_vec(manifest.as_object())
                    .map_err(|error| RequestError::Build(error.into()))?;
                request
                    .create(self.post_params, body)
                    .map_err(|error| RequestError::Build(error.into()))
            }
            Verb::Delete => {
                let name = manifest.name().ok_or(RequestError::MissingName)?;
                request
                    .delete(name, self.delete_params)
                    .map_err(|error| RequestError::Build(error.into()))
            }
        }
    }
}

enum RequestError {
    MissingName,
    Build(BoxError),
}

impl RequestError {
    fn into_failure(self, kind: &str, name: &str) -> Failure {
        match self {
            RequestError::MissingName => Failure::MissingName {
                kind: kind.to_owned(),
            },
            RequestError::Build(source) => Failure::BuildRequest {
                kind: kind.to_owned(),
                name: name.to_owned(),
                source,
            },
        }
    }
}
