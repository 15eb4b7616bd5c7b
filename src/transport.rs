//! Access to the Kubernetes API server
//!
//! Requests are sent as raw HTTP requests so that error responses reach
//! the caller exactly as the API server produced them.

use futures::future::{BoxFuture, FutureExt};
use http::StatusCode;
use http_body_util::BodyExt;
use kube::Client;

/// Response of the API server
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Sends requests to the API server
///
/// [`Client`] is the production implementation. It is already
/// authenticated; the transport neither manages credentials nor the
/// lifecycle of connections.
pub trait Transport: Send + Sync {
    /// Sends the request and returns the response, whatever its status.
    ///
    /// Errors are reserved for requests which did not produce a response.
    fn execute(&self, request: http::Request<Vec<u8>>) -> BoxFuture<'_, kube::Result<RawResponse>>;
}

impl Transport for Client {
    fn execute(&self, request: http::Request<Vec<u8>>) -> BoxFuture<'_, kube::Result<RawResponse>> {
        async move {
            let response = self.send(request.map(Into::into)).await?;
            let status = response.status();
            let bytes = response.into_body().collect().await?.to_bytes();
            let body = String::from_utf8_lossy(&bytes).into_owned();
            tracing::trace!(%status, %body, "response received");
            Ok(RawResponse { status, body })
        }
        .boxed()
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: http::Request<Vec<u8>>) -> BoxFuture<'_, kube::Result<RawResponse>> {
        (**self).execute(request)
    }
}
