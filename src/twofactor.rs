//! Mobile authenticator enrollment operations built on the invocation engine.
//!
//! These are the crate's two concrete operation instantiations: registering a new mobile
//! authenticator for an account and activating it with its first generated code. Both target the
//! service's two-factor interface and inherit the full invocation contract (precondition gate,
//! rate-limited dispatch, bounded retries) from [`Invoker::perform`].

// crates.io
use time::OffsetDateTime;
// self
use crate::{
	_prelude::*,
	descriptor::{Method, OperationDescriptor},
	engine::{Invoker, Outcome},
	error::ConfigError,
	transport::ServiceClient,
};

/// Service interface every enrollment operation targets.
pub const TWO_FACTOR_SERVICE: &str = "ITwoFactorService";

/// Authenticator kind registered by [`Invoker::begin_enrollment`]: a mobile device.
const AUTHENTICATOR_TYPE: u8 = 1;

/// Request payload for the begin-enrollment operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeginEnrollmentRequest {
	/// Caller's clock as a unix timestamp.
	pub authenticator_time: u64,
	/// Authenticator kind; always 1 for mobile devices.
	pub authenticator_type: u8,
	/// Unique device identifier the authenticator is bound to.
	pub device_identifier: String,
	/// Account the authenticator is registered for.
	pub account_id: u64,
}

/// Response payload for the begin-enrollment operation.
///
/// Every field is optional or defaulted: the service omits fields freely depending on the
/// enrollment status, and a structurally valid but unhappy response must still decode so the
/// caller can inspect `status` instead of burning retry budget on it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeginEnrollmentResponse {
	/// Service status code for the enrollment.
	#[serde(default)]
	pub status: i32,
	/// Shared code-generation secret.
	#[serde(default)]
	pub shared_secret: Option<String>,
	/// Identity secret used for confirmations.
	#[serde(default)]
	pub identity_secret: Option<String>,
	/// Serial number assigned to the authenticator.
	#[serde(default)]
	pub serial_number: Option<String>,
	/// One-time code that can revoke the authenticator later.
	#[serde(default)]
	pub revocation_code: Option<String>,
	/// Provisioning URI for authenticator apps.
	#[serde(default)]
	pub uri: Option<String>,
	/// Service clock at enrollment time, as a unix timestamp.
	#[serde(default)]
	pub server_time: u64,
	/// Account name echoed back by the service.
	#[serde(default)]
	pub account_name: Option<String>,
}

/// Request payload for the finalize-enrollment operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeEnrollmentRequest {
	/// Activation code delivered out of band (e.g. by SMS).
	pub activation_code: String,
	/// First code generated by the new authenticator.
	pub authenticator_code: String,
	/// Clock the authenticator code was generated at, as a unix timestamp.
	pub authenticator_time: u64,
	/// Account the authenticator is registered for.
	pub account_id: u64,
}

/// Response payload for the finalize-enrollment operation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeEnrollmentResponse {
	/// Whether the authenticator is now active.
	#[serde(default)]
	pub success: bool,
	/// Whether the service wants another code before activating.
	#[serde(default)]
	pub want_more: bool,
	/// Service clock, as a unix timestamp.
	#[serde(default)]
	pub server_time: u64,
	/// Service status code for the activation.
	#[serde(default)]
	pub status: i32,
}

impl<C> Invoker<C>
where
	C: ?Sized + ServiceClient,
{
	/// Registers a new mobile authenticator for the account.
	///
	/// `device_identifier` must be non-empty; violating that is a caller programming error that
	/// fails immediately, never through the retry path.
	pub async fn begin_enrollment(
		&self,
		account_id: u64,
		device_identifier: &str,
	) -> Result<Outcome<BeginEnrollmentResponse>> {
		if device_identifier.is_empty() {
			return Err(ConfigError::EmptyField { field: "device_identifier" }.into());
		}

		let request = BeginEnrollmentRequest {
			authenticator_time: unix_now(),
			authenticator_type: AUTHENTICATOR_TYPE,
			device_identifier: device_identifier.into(),
			account_id,
		};
		let descriptor = OperationDescriptor::builder(TWO_FACTOR_SERVICE, "AddAuthenticator")
			.method(Method::Post)
			.payload(&request)
			.build()?;

		self.perform(&descriptor).await
	}

	/// Activates a pending authenticator with its first generated code.
	///
	/// `activation_code` and `authenticator_code` must be non-empty and `authenticator_time`
	/// non-zero; violations fail immediately, never through the retry path.
	pub async fn finalize_enrollment(
		&self,
		account_id: u64,
		activation_code: &str,
		authenticator_code: &str,
		authenticator_time: u64,
	) -> Result<Outcome<FinalizeEnrollmentResponse>> {
		if activation_code.is_empty() {
			return Err(ConfigError::EmptyField { field: "activation_code" }.into());
		}
		if authenticator_code.is_empty() {
			return Err(ConfigError::EmptyField { field: "authenticator_code" }.into());
		}
		if authenticator_time == 0 {
			return Err(ConfigError::ZeroField { field: "authenticator_time" }.into());
		}

		let request = FinalizeEnrollmentRequest {
			activation_code: activation_code.into(),
			authenticator_code: authenticator_code.into(),
			authenticator_time,
			account_id,
		};
		let descriptor =
			OperationDescriptor::builder(TWO_FACTOR_SERVICE, "FinalizeAddAuthenticator")
				.method(Method::Post)
				.payload(&request)
				.build()?;

		self.perform(&descriptor).await
	}
}

fn unix_now() -> u64 {
	u64::try_from(OffsetDateTime::now_utc().unix_timestamp()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn unix_now_is_past_2020() {
		assert!(unix_now() > 1_577_836_800);
	}

	#[test]
	fn responses_tolerate_sparse_bodies() {
		let begin: BeginEnrollmentResponse = serde_json::from_str("{\"status\":2}")
			.expect("Sparse begin-enrollment body should decode.");

		assert_eq!(begin.status, 2);
		assert!(begin.shared_secret.is_none());

		let finalize: FinalizeEnrollmentResponse = serde_json::from_str("{\"success\":true}")
			.expect("Sparse finalize-enrollment body should decode.");

		assert!(finalize.success);
		assert!(!finalize.want_more);
	}
}
