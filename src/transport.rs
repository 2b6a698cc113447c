//! Transport contracts and the default reqwest-backed service client.
//!
//! [`ServiceClient`] is the courier's only dependency on an HTTP stack. The engine hands each
//! attempt to the client as a [`PreparedCall`] and expects the raw response body back, or an
//! [`AttemptError`] classifying the failure as a cancellation (timeout/abort) or anything else.
//! The client owns nothing across attempts; every call's request state is dropped on every exit
//! path by ordinary drop glue.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// self
use crate::{
	_prelude::*,
	descriptor::{Method, OperationDescriptor},
	error::{AttemptError, ConfigError},
};

/// Boxed future returned by [`ServiceClient::invoke`].
pub type InvokeFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>, AttemptError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing one service call.
///
/// Implementations must be `Send + Sync + 'static` so one client can be shared by many
/// concurrent invocations behind `Arc<C>`, and the returned future must be `Send` so engine
/// futures can hop executors. A timeout or external abort must surface as
/// [`AttemptError::Cancelled`]; every other failure keeps its own classification.
pub trait ServiceClient
where
	Self: 'static + Send + Sync,
{
	/// Executes a single prepared call, returning the raw response body.
	fn invoke<'a>(&'a self, call: PreparedCall<'a>) -> InvokeFuture<'a>;
}

/// One ready-to-send operation, borrowed from the descriptor for the duration of an attempt.
#[derive(Clone, Debug)]
pub struct PreparedCall<'a> {
	/// Fully resolved operation URL.
	pub url: Url,
	/// HTTP-style method.
	pub method: Method,
	/// JSON request payload.
	pub payload: &'a serde_json::Value,
	/// Auxiliary string arguments appended to the query string.
	pub aux_args: &'a BTreeMap<String, String>,
	/// Per-attempt deadline.
	pub timeout: Duration,
}
impl<'a> PreparedCall<'a> {
	/// Resolves a descriptor against a service base address.
	pub fn new(
		base: &Url,
		descriptor: &'a OperationDescriptor,
		timeout: Duration,
	) -> Result<Self, ConfigError> {
		let url = base
			.join(&descriptor.path())
			.map_err(|source| ConfigError::InvalidBaseAddress { source })?;

		Ok(Self {
			url,
			method: descriptor.method(),
			payload: descriptor.payload(),
			aux_args: descriptor.aux_args(),
			timeout,
		})
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// `GET` operations flatten the top-level payload fields into the query string alongside the
/// auxiliary arguments; `POST` operations send the payload as a JSON body. Reqwest timeouts are
/// reported as [`AttemptError::Cancelled`] so the engine logs them at diagnostic severity.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestServiceClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestServiceClient {
	/// Wraps an existing [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestServiceClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestServiceClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ServiceClient for ReqwestServiceClient {
	fn invoke<'a>(&'a self, call: PreparedCall<'a>) -> InvokeFuture<'a> {
		let client = self.0.clone();

		Box::pin(async move {
			let mut url = call.url;

			{
				let mut pairs = url.query_pairs_mut();

				for (key, value) in call.aux_args {
					pairs.append_pair(key, value);
				}
				if call.method == Method::Get
					&& let Some(fields) = call.payload.as_object()
				{
					for (key, value) in fields {
						pairs.append_pair(key, &query_value(value));
					}
				}
			}

			let request = match call.method {
				Method::Get => client.get(url),
				Method::Post => client.post(url).json(call.payload),
			};
			let response = request.timeout(call.timeout).send().await?;
			let status = response.status();

			if !status.is_success() {
				return Err(AttemptError::Status { status: status.as_u16() });
			}

			Ok(response.bytes().await?.to_vec())
		})
	}
}

#[cfg(feature = "reqwest")]
fn query_value(value: &serde_json::Value) -> String {
	match value {
		serde_json::Value::String(text) => text.clone(),
		other => other.to_string(),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn descriptor() -> OperationDescriptor {
		OperationDescriptor::builder("ITwoFactorService", "AddAuthenticator")
			.build()
			.expect("Descriptor fixture should build successfully.")
	}

	#[test]
	fn prepared_call_resolves_against_base() {
		let base = Url::parse("https://api.example.com/").expect("Base URL fixture should parse.");
		let descriptor = descriptor();
		let call = PreparedCall::new(&base, &descriptor, Duration::from_secs(30))
			.expect("Prepared call should resolve successfully.");

		assert_eq!(
			call.url.as_str(),
			"https://api.example.com/ITwoFactorService/AddAuthenticator/v1/"
		);
		assert_eq!(call.method, Method::Post);
	}

	#[test]
	fn prepared_call_rejects_opaque_bases() {
		let base = Url::parse("mailto:ops@example.com").expect("Opaque URL fixture should parse.");
		let descriptor = descriptor();

		assert!(PreparedCall::new(&base, &descriptor, Duration::from_secs(30)).is_err());
	}
}
