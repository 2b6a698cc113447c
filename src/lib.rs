//! Rust’s resilient Web API courier—precondition-gated, rate-limited, retry-bounded service
//! invocations with transport-aware observability in one crate built for production.
//!
//! The crate is organized around one generic [`Invoker`](engine::Invoker): callers describe a
//! remote operation with an [`OperationDescriptor`](descriptor::OperationDescriptor) and receive
//! an [`Outcome`](engine::Outcome) that is either a fully decoded response, `Unavailable` (the
//! session was not ready, no attempt was made), or `Exhausted` (the full retry budget failed).
//! Individual attempt failures never escape the engine.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod descriptor;
pub mod diag;
pub mod engine;
pub mod error;
pub mod limiter;
pub mod obs;
pub mod session;
pub mod transport;
pub mod twofactor;

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration,
	};

	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
