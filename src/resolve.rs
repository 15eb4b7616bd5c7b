//! Resolution of `apiVersion` and `kind` to API operations
//!
//! Every kind which can be applied is listed in a [`KindRegistry`]. The
//! builtin registry covers the stable Kubernetes API groups; further kinds,
//! e.g. custom resources, can be registered explicitly.

use std::collections::HashMap;
use std::sync::Arc;

use k8s_openapi::api;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions;
use k8s_openapi::kube_aggregator::pkg::apis::apiregistration;
use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope};
use kube::core::ApiResource;
use once_cell::sync::Lazy;

use crate::dispatch::Verb;
use crate::error::KindResolutionError;
use crate::manifest::Manifest;

static BUILTIN: Lazy<Arc<KindRegistry>> = Lazy::new(|| Arc::new(KindRegistry::with_builtin_kinds()));

/// Scope of a resource type known at compile time
pub trait StaticScope {
    const NAMESPACED: bool;
}

impl StaticScope for NamespaceResourceScope {
    const NAMESPACED: bool = true;
}

impl StaticScope for ClusterResourceScope {
    const NAMESPACED: bool = false;
}

/// How a document is sent to the API server
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub api_resource: ApiResource,
    pub namespaced: bool,
    /// Name of the API group client, e.g. `AppsV1Api`
    pub client: String,
    /// Snake-cased kind, e.g. `replication_controller`
    pub operation: String,
}

impl Resolution {
    /// Returns the name of the operation, e.g. `create_namespaced_deployment`.
    pub fn operation_name(&self, verb: Verb) -> String {
        let prefix = if self.namespaced { "namespaced_" } else { "" };
        format!("{}_{}{}", verb, prefix, self.operation)
    }
}

#[derive(Clone, Debug)]
struct Entry {
    api_resource: ApiResource,
    namespaced: bool,
}

/// Table of the kinds which can be applied, keyed by `apiVersion` and `kind`
#[derive(Clone, Debug, Default)]
pub struct KindRegistry {
    entries: HashMap<(String, String), Entry>,
}

impl KindRegistry {
    /// Returns the shared registry of builtin kinds.
    pub fn builtin() -> Arc<KindRegistry> {
        BUILTIN.clone()
    }

    /// Creates a registry containing the builtin kinds.
    pub fn with_builtin_kinds() -> KindRegistry {
        let mut registry = KindRegistry::default();

        registry
            .register::<api::core::v1::ConfigMap>()
            .register::<api::core::v1::Endpoints>()
            .register::<api::core::v1::Event>()
            .register::<api::core::v1::LimitRange>()
            .register::<api::core::v1::Namespace>()
            .register::<api::core::v1::Node>()
            .register::<api::core::v1::PersistentVolume>()
            .register::<api::core::v1::PersistentVolumeClaim>()
            .register::<api::core::v1::Pod>()
            .register::<api::core::v1::PodTemplate>()
            .register::<api::core::v1::ReplicationController>()
            .register::<api::core::v1::ResourceQuota>()
            .register::<api::core::v1::Secret>()
            .register::<api::core::v1::Service>()
            .register::<api::core::v1::ServiceAccount>();

        registry
            .register::<api::apps::v1::ControllerRevision>()
            .register::<api::apps::v1::DaemonSet>()
            .register::<api::apps::v1::Deployment>()
            .register::<api::apps::v1::ReplicaSet>()
            .register::<api::apps::v1::StatefulSet>()
            .register::<api::batch::v1::CronJob>()
            .register::<api::batch::v1::Job>()
            .register::<api::autoscaling::v1::HorizontalPodAutoscaler>()
            .register::<api::autoscaling::v2::HorizontalPodAutoscaler>()
            .register::<api::policy::v1::PodDisruptionBudget>();

        registry
            .register::<api::networking::v1::Ingress>()
            .register::<api::networking::v1::IngressClass>()
            .register::<api::networking::v1::NetworkPolicy>()
            .register::<api::discovery::v1::EndpointSlice>()
            .register::<api::events::v1::Event>()
            .register::<api::coordination::v1::Lease>()
            .register::<api::node::v1::RuntimeClass>()
            .register::<api::scheduling::v1::PriorityClass>();

        registry
            .register::<api::rbac::v1::ClusterRole>()
            .register::<api::rbac::v1::ClusterRoleBinding>()
            .register::<api::rbac::v1::Role>()
            .register::<api::rbac::v1::RoleBinding>()
            .register::<api::certificates::v1::CertificateSigningRequest>()
            .register::<api::admissionregistration::v1::MutatingWebhookConfiguration>()
            .register::<api::admissionregistration::v1::ValidatingWebhookConfiguration>();

        registry
            .register::<api::storage::v1::CSIDriver>()
            .register::<api::storage::v1::CSINode>()
            .register::<api::storage::v1::StorageClass>()
            .register::<api::storage::v1::VolumeAttachment>()
            .register::<apiextensions::v1::CustomResourceDefinition>()
            .register::<apiregistration::v1::APIService>();

        registry
    }

    /// Registers a kind from `k8s-openapi`.
    pub fn register<K>(&mut self) -> &mut Self
    where
        K: k8s_openapi::Resource,
        K::Scope: StaticScope,
    {
        let api_resource = ApiResource {
            group: K::GROUP.to_owned(),
            version: K::VERSION.to_owned(),
            api_version: K::API_VERSION.to_owned(),
            kind: K::KIND.to_owned(),
            plural: K::URL_PATH_SEGMENT.to_owned(),
        };
        self.register_api_resource(api_resource, <K::Scope as StaticScope>::NAMESPACED)
    }

    /// Registers a kind which is not known at compile time, e.g. a custom
    /// resource.
    pub fn register_api_resource(&mut self, api_resource: ApiResource, namespaced: bool) -> &mut Self {
        let key = (api_resource.api_version.clone(), api_resource.kind.clone());
        self.entries.insert(
            key,
            Entry {
                api_resource,
                namespaced,
            },
        );
        self
    }

    /// Determines how the given document is sent to the API server.
    pub fn resolve(&self, manifest: &Manifest) -> Result<Resolution, KindResolutionError> {
        let api_version = manifest.api_version().unwrap_or_default();
        let kind = manifest.kind().unwrap_or_default();

        let entry = self
            .entries
            .get(&(api_version.to_owned(), kind.to_owned()))
            .ok_or_else(|| KindResolutionError {
                api_version: api_version.to_owned(),
                kind: kind.to_owned(),
            })?;

        Ok(Resolution {
            api_resource: entry.api_resource.clone(),
            namespaced: entry.namespaced,
            client: client_name(api_version),
            operation: snake_case(kind),
        })
    }
}

/// Derives the name of the generated API client from the `apiVersion`.
///
/// `apps/v1` is served by `AppsV1Api`, `v1` by `CoreV1Api` and
/// `rbac.authorization.k8s.io/v1` by `RbacAuthorizationV1Api`.
pub fn client_name(api_version: &str) -> String {
    let (group, version) = match api_version.split_once('/') {
        Some((group, version)) => (group.to_owned(), version),
        None => (String::from("core"), api_version),
    };

    let group = match group.rfind(".k8s.io") {
        Some(index) => format!("{}{}", &group[..index], &group[index + ".k8s.io".len()..]),
        None => group,
    };

    let group: String = group.split('.').map(capitalize).collect();
    format!("{}{}Api", group, capitalize(version))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Converts a kind into snake case, e.g. `APIService` into `api_service`.
///
/// A word boundary precedes every uppercase letter which follows a
/// lowercase letter or digit, or which starts a capitalized word after
/// an acronym.
pub fn snake_case(kind: &str) -> String {
    let chars: Vec<char> = kind.chars().collect();
    let mut snake = String::with_capacity(kind.len() + 4);

    for (index, &current) in chars.iter().enumerate() {
        if index > 0 && current.is_ascii_uppercase() {
            let previous = chars[index - 1];
            let next_is_lower = chars
                .get(index + 1)
                .map_or(false, |next| next.is_ascii_lowercase());
            if previous.is_ascii_lowercase() || previous.is_ascii_digit() || next_is_lower {
                snake.push('_');
            }
        }
        snake.extend(current.to_lowercase());
    }

    snake
}
