//! Clients for interacting with the Kubernetes API
//!
//! These clients simplify testing.

use std::fmt::Debug;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, DeleteParams, PostParams};
use kube::{Client, Resource};
use kube_manifest_apply::{Applier, ApplyOptions, Verb};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::runtime::Runtime;
use uuid::Uuid;

/// Result of applying a manifest
pub type ApplyResult = kube_manifest_apply::Result<()>;

/// Trait combo which must be satisfied to read and delete a resource
pub trait ClusterResource: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug {}
impl<T: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug> ClusterResource for T {}

/// [`ClusterResource`] which lives in a namespace
pub trait NamespacedResource: ClusterResource + Resource<Scope = NamespaceResourceScope> {}
impl<T: ClusterResource + Resource<Scope = NamespaceResourceScope>> NamespacedResource for T {}

/// A client for interacting with the Kubernetes API
///
/// [`TestKubeClient`] is a synchronous version of [`KubeClient`] which
/// additionally panics on erroneous results of the helper methods. The
/// results of applying manifests are returned unchanged because they are
/// the subject of the tests.
pub struct TestKubeClient {
    runtime: Runtime,
    kube_client: KubeClient,
}

impl TestKubeClient {
    /// Creates a [`TestKubeClient`].
    pub fn new() -> TestKubeClient {
        super::init_tracing();
        let runtime = Runtime::new().expect("Tokio runtime could not be created");
        let kube_client = runtime.block_on(async {
            KubeClient::new()
                .await
                .expect("Kubernetes client could not be created")
        });
        TestKubeClient {
            runtime,
            kube_client,
        }
    }

    /// Creates the resources of the given fixture file.
    pub fn create_from_yaml(&self, fixture: &str, options: ApplyOptions) -> ApplyResult {
        self.runtime
            .block_on(self.kube_client.applier(options).create_from_yaml(fixture_path(fixture)))
    }

    /// Deletes the resources of the given fixture file.
    pub fn delete_from_yaml(&self, fixture: &str, options: ApplyOptions) -> ApplyResult {
        self.runtime
            .block_on(self.kube_client.applier(options).delete_from_yaml(fixture_path(fixture)))
    }

    /// Creates the resources of the given manifest text.
    pub fn create_from_str(&self, manifest: &str, options: ApplyOptions) -> ApplyResult {
        self.runtime
            .block_on(self.kube_client.applier(options).create_from_str(manifest))
    }

    /// Deletes the resources of the given manifest text.
    pub fn delete_from_str(&self, manifest: &str, options: ApplyOptions) -> ApplyResult {
        self.runtime
            .block_on(self.kube_client.applier(options).delete_from_str(manifest))
    }

    /// Creates or deletes the resources of the given document.
    pub fn operate_from_value(&self, value: Value, verb: Verb) -> ApplyResult {
        self.runtime.block_on(
            self.kube_client
                .applier(ApplyOptions::default())
                .operate_from_value(value, verb),
        )
    }

    /// Searches for a named resource in the given namespace.
    pub fn find<K>(&self, name: &str, namespace: &str) -> Option<K>
    where
        K: NamespacedResource,
    {
        let api = Api::namespaced(self.kube_client.client.clone(), namespace);
        self.runtime.block_on(async {
            KubeClient::find(&api, name)
                .await
                .expect("Resource could not be retrieved")
        })
    }

    /// Searches for a named cluster-scoped resource.
    pub fn find_cluster_scoped<K>(&self, name: &str) -> Option<K>
    where
        K: ClusterResource,
    {
        let api = Api::all(self.kube_client.client.clone());
        self.runtime.block_on(async {
            KubeClient::find(&api, name)
                .await
                .expect("Resource could not be retrieved")
        })
    }

    /// Verifies that the named resource disappears within two minutes.
    pub fn verify_deleted<K>(&self, name: &str, namespace: &str)
    where
        K: NamespacedResource,
    {
        let api = Api::namespaced(self.kube_client.client.clone(), namespace);
        self.runtime.block_on(async {
            KubeClient::verify_deleted::<K>(&api, name)
                .await
                .expect("Resource was not deleted")
        })
    }

    /// Verifies that the named cluster-scoped resource disappears within
    /// two minutes.
    pub fn verify_cluster_scoped_deleted<K>(&self, name: &str)
    where
        K: ClusterResource,
    {
        let api = Api::all(self.kube_client.client.clone());
        self.runtime.block_on(async {
            KubeClient::verify_deleted::<K>(&api, name)
                .await
                .expect("Resource was not deleted")
        })
    }

    /// Deletes the named resource and ignores whether it exists.
    pub fn delete<K>(&self, name: &str, namespace: &str)
    where
        K: NamespacedResource,
    {
        let api = Api::namespaced(self.kube_client.client.clone(), namespace);
        self.runtime.block_on(async {
            KubeClient::delete::<K>(&api, name)
                .await
                .expect("Resource could not be deleted")
        })
    }

    /// Deletes the named cluster-scoped resource and ignores whether it
    /// exists.
    pub fn delete_cluster_scoped<K>(&self, name: &str)
    where
        K: ClusterResource,
    {
        let api = Api::all(self.kube_client.client.clone());
        self.runtime.block_on(async {
            KubeClient::delete::<K>(&api, name)
                .await
                .expect("Resource could not be deleted")
        })
    }

    /// Creates a namespace with a unique name which starts with the given
    /// prefix and returns the name.
    pub fn create_unique_namespace(&self, prefix: &str) -> String {
        self.runtime.block_on(async {
            self.kube_client
                .create_unique_namespace(prefix)
                .await
                .expect("Namespace could not be created")
        })
    }
}

/// A client for interacting with the Kubernetes API
///
/// [`KubeClient`] wraps a [`Client`][kube::Client].
pub struct KubeClient {
    client: Client,
}

impl KubeClient {
    /// Creates a [`KubeClient`].
    pub async fn new() -> Result<KubeClient> {
        let client = Client::try_default().await?;
        Ok(KubeClient { client })
    }

    /// Returns an applier with the given options which shares the
    /// connection of this client.
    pub fn applier(&self, options: ApplyOptions) -> Applier {
        Applier::new(self.client.clone()).with_options(options)
    }

    /// Searches for a named resource.
    pub async fn find<K: ClusterResource>(api: &Api<K>, name: &str) -> Result<Option<K>> {
        Ok(api.get_opt(name).await?)
    }

    /// Deletes the named resource if it exists.
    pub async fn delete<K: ClusterResource>(api: &Api<K>, name: &str) -> Result<()> {
        if api.get_opt(name).await?.is_some() {
            api.delete(name, &DeleteParams::default()).await?;
        }
        Ok(())
    }

    /// Polls the named resource until it is gone.
    pub async fn verify_deleted<K: ClusterResource>(api: &Api<K>, name: &str) -> Result<()> {
        let timeout_secs = 120;

        for _ in 0..timeout_secs {
            if api.get_opt(name).await?.is_none() {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        Err(anyhow!(
            "Resource [{}] was not deleted within {} seconds.",
            name,
            timeout_secs
        ))
    }

    /// Creates a namespace named after the given prefix and a UUID.
    pub async fn create_unique_namespace(&self, prefix: &str) -> Result<String> {
        let name = format!("{}-{}", prefix, Uuid::new_v4());
        let namespace = Namespace {
            metadata: ObjectMeta {
                name: Some(name.clone()),
                ..ObjectMeta::default()
            },
            ..Namespace::default()
        };
        let api: Api<Namespace> = Api::all(self.client.clone());
        api.create(&PostParams::default(), &namespace).await?;
        Ok(name)
    }
}

/// Returns the path of a manifest in `tests/manifests`.
pub fn fixture_path(fixture: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("manifests")
        .join(fixture)
}

/// Reads a manifest from `tests/manifests`.
pub fn read_fixture(fixture: &str) -> String {
    std::fs::read_to_string(fixture_path(fixture)).expect("Fixture could not be read")
}

/// Replaces `metadata/name` of a single-document manifest with the given
/// prefix followed by a UUID and returns the manifest and the name.
pub fn with_unique_name(yaml: &str, prefix: &str) -> (String, String) {
    let mut manifest: serde_yaml::Value =
        serde_yaml::from_str(yaml).expect("String is not a well-formed YAML");
    let name = format!("{}-{}", prefix, Uuid::new_v4());
    manifest["metadata"]["name"] = name.clone().into();
    let yaml = serde_yaml::to_string(&manifest).expect("YAML could not be serialized");
    (yaml, name)
}
