//! Expansion of list documents into their items

use crate::manifest::{Document, ListKind, Manifest};

/// Flattens a document into the manifests which are sent to the API server.
///
/// Items of a list inherit the `apiVersion` of the list if they do not
/// declare their own; items of a `<Kind>List` are of kind `<Kind>`. Only
/// one level is expanded, so a list nested in a list stays a single
/// manifest of kind `*List`.
///
/// If a namespace override is given then it replaces `metadata/namespace`
/// of every returned manifest.
pub fn expand(document: Document, namespace_override: Option<&str>) -> Vec<Manifest> {
    let mut manifests = match document {
        Document::Object(manifest) => vec![manifest],
        Document::List(list) => {
            let api_version = list.api_version;
            let kind = list.kind;
            list.items
                .into_iter()
                .map(|mut item| {
                    if item.api_version().is_none() {
                        item.set_api_version(&api_version);
                    }
                    if let ListKind::Homogeneous(kind) = &kind {
                        item.set_kind(kind);
                    }
                    item
                })
                .collect()
        }
    };

    if let Some(namespace) = namespace_override {
        for manifest in &mut manifests {
            manifest.set_namespace(namespace);
        }
    }

    manifests
}
