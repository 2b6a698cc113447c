//! Immutable descriptions of single remote operations.
//!
//! An [`OperationDescriptor`] captures everything the engine needs to issue one call: the
//! service interface, endpoint, version, HTTP method, a JSON-encoded payload, and auxiliary
//! string arguments appended to the query string. Descriptors are constructed per call through
//! the validating [`OperationDescriptorBuilder`] and never mutated afterwards; the engine adds
//! per-call credential material by copy, not in place.

// crates.io
use serde_json::Value;
// self
use crate::{_prelude::*, error::ConfigError};

/// HTTP-style method the remote service expects for an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
	/// Parameters travel in the query string.
	Get,
	/// Parameters travel in the request body.
	Post,
}
impl Method {
	/// Returns a stable label suitable for traces.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Immutable value describing one remote call.
#[derive(Clone, Debug)]
pub struct OperationDescriptor {
	service: String,
	endpoint: String,
	version: u8,
	method: Method,
	payload: Value,
	aux_args: BTreeMap<String, String>,
}
impl OperationDescriptor {
	/// Starts a builder for the given service interface and endpoint.
	pub fn builder(
		service: impl Into<String>,
		endpoint: impl Into<String>,
	) -> OperationDescriptorBuilder {
		OperationDescriptorBuilder {
			service: service.into(),
			endpoint: endpoint.into(),
			version: 1,
			method: Method::Post,
			payload: Ok(Value::Null),
			aux_args: BTreeMap::new(),
		}
	}

	/// Service interface the operation belongs to.
	pub fn service(&self) -> &str {
		&self.service
	}

	/// Endpoint name within the service interface.
	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}

	/// Endpoint version.
	pub fn version(&self) -> u8 {
		self.version
	}

	/// HTTP-style method for the operation.
	pub fn method(&self) -> Method {
		self.method
	}

	/// JSON-encoded request payload.
	pub fn payload(&self) -> &Value {
		&self.payload
	}

	/// Auxiliary string arguments appended to the query string.
	pub fn aux_args(&self) -> &BTreeMap<String, String> {
		&self.aux_args
	}

	/// Relative path of the operation under a service base address.
	pub fn path(&self) -> String {
		format!("{}/{}/v{}/", self.service, self.endpoint, self.version)
	}

	/// Returns a copy with one auxiliary argument added or replaced.
	pub(crate) fn with_aux_arg(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
		let mut copy = self.clone();

		copy.aux_args.insert(key.into(), value.into());

		copy
	}
}

/// Validating builder for [`OperationDescriptor`] values.
#[derive(Debug)]
pub struct OperationDescriptorBuilder {
	service: String,
	endpoint: String,
	version: u8,
	method: Method,
	payload: Result<Value, ConfigError>,
	aux_args: BTreeMap<String, String>,
}
impl OperationDescriptorBuilder {
	/// Sets the HTTP-style method (defaults to `POST`).
	pub fn method(mut self, method: Method) -> Self {
		self.method = method;

		self
	}

	/// Sets the endpoint version (defaults to 1).
	pub fn version(mut self, version: u8) -> Self {
		self.version = version;

		self
	}

	/// Serializes the typed request payload into the descriptor.
	pub fn payload<T>(mut self, payload: &T) -> Self
	where
		T: ?Sized + Serialize,
	{
		self.payload = serde_path_to_error::serialize(payload, serde_json::value::Serializer)
			.map_err(|source| ConfigError::PayloadEncode { source });

		self
	}

	/// Adds one auxiliary string argument.
	pub fn aux_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.aux_args.insert(key.into(), value.into());

		self
	}

	/// Validates the descriptor and freezes it.
	///
	/// Empty service or endpoint names and unencodable payloads are caller programming errors;
	/// they fail here, before any retry budget exists to consume.
	pub fn build(self) -> Result<OperationDescriptor> {
		if self.service.is_empty() {
			return Err(ConfigError::EmptyField { field: "service" }.into());
		}
		if self.endpoint.is_empty() {
			return Err(ConfigError::EmptyField { field: "endpoint" }.into());
		}

		let payload = self.payload?;

		Ok(OperationDescriptor {
			service: self.service,
			endpoint: self.endpoint,
			version: self.version,
			method: self.method,
			payload,
			aux_args: self.aux_args,
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn builder_validates_names() {
		assert!(OperationDescriptor::builder("", "AddAuthenticator").build().is_err());
		assert!(OperationDescriptor::builder("ITwoFactorService", "").build().is_err());
	}

	#[test]
	fn builder_freezes_payload_and_path() {
		let descriptor = OperationDescriptor::builder("ITwoFactorService", "AddAuthenticator")
			.method(Method::Post)
			.version(2)
			.payload(&json!({ "device_identifier": "device-1" }))
			.aux_arg("lang", "en")
			.build()
			.expect("Descriptor fixture should build successfully.");

		assert_eq!(descriptor.path(), "ITwoFactorService/AddAuthenticator/v2/");
		assert_eq!(descriptor.payload()["device_identifier"], "device-1");
		assert_eq!(descriptor.aux_args().get("lang").map(String::as_str), Some("en"));
	}

	#[test]
	fn aux_arg_injection_copies_instead_of_mutating() {
		let descriptor = OperationDescriptor::builder("ITwoFactorService", "AddAuthenticator")
			.build()
			.expect("Descriptor fixture should build successfully.");
		let enriched = descriptor.with_aux_arg("access_token", "token-1");

		assert!(descriptor.aux_args().is_empty());
		assert_eq!(enriched.aux_args().get("access_token").map(String::as_str), Some("token-1"));
	}
}
