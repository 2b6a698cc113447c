//! Session readiness and credential contracts consumed by the precondition gate.

// self
use crate::_prelude::*;

/// Read-only view of the caller's session, consulted before any network attempt.
///
/// A session that is not ready, or that has no token, is an expected and frequent state (the
/// account may simply not be logged on yet). The engine short-circuits both to
/// [`Outcome::Unavailable`](crate::engine::Outcome::Unavailable) without consuming any retry
/// budget, touching the rate limiter, or emitting a warning.
pub trait SessionState: Send + Sync {
	/// Returns `true` when the session is connected and logged on.
	fn is_ready(&self) -> bool;

	/// Returns the current bearer credential, if one is present.
	fn access_token(&self) -> Option<AccessToken>;
}

/// Redacted bearer credential wrapper keeping token material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken(String);
impl AccessToken {
	/// Wraps a new credential string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` when the wrapped credential is empty.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl AsRef<str> for AccessToken {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("AccessToken").field(&"<redacted>").finish()
	}
}
impl Display for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Fixed session snapshot.
///
/// Useful for single-shot tools and tests; production callers usually implement
/// [`SessionState`] over their live connection state instead.
#[derive(Clone, Debug, Default)]
pub struct StaticSession {
	ready: bool,
	token: Option<AccessToken>,
}
impl StaticSession {
	/// Builds a ready session holding the provided credential.
	pub fn ready(token: impl Into<String>) -> Self {
		Self { ready: true, token: Some(AccessToken::new(token)) }
	}

	/// Builds a disconnected session with no credential.
	pub fn offline() -> Self {
		Self::default()
	}

	/// Builds a connected session whose credential has not been issued yet.
	pub fn ready_without_token() -> Self {
		Self { ready: true, token: None }
	}
}
impl SessionState for StaticSession {
	fn is_ready(&self) -> bool {
		self.ready
	}

	fn access_token(&self) -> Option<AccessToken> {
		self.token.clone()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn token_formatters_redact() {
		let token = AccessToken::new("super-secret");

		assert_eq!(format!("{token:?}"), "AccessToken(\"<redacted>\")");
		assert_eq!(format!("{token}"), "<redacted>");
		assert_eq!(token.expose(), "super-secret");
	}

	#[test]
	fn static_session_snapshots() {
		let ready = StaticSession::ready("token-1");

		assert!(ready.is_ready());
		assert_eq!(ready.access_token().map(|token| token.expose().to_owned()).as_deref(), Some("token-1"));

		let offline = StaticSession::offline();

		assert!(!offline.is_ready());
		assert!(offline.access_token().is_none());

		let tokenless = StaticSession::ready_without_token();

		assert!(tokenless.is_ready());
		assert!(tokenless.access_token().is_none());
	}
}
