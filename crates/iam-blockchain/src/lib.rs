mod config;
mod config_error;
mod contract_events;
mod error;
mod error_classification;
mod evm;
mod fetcher;
mod rpc_executor;
mod rpc_rate_limiter;
mod source;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use config::{
    CONTRACT_ADDRESS_ENV, EventSourceConfig, EventSourceConfigRaw, FetcherConfigRaw, RPC_URL_ENV,
};
pub use config_error::ConfigError;
pub use contract_events::{AccessLogged, access_logged_signature, decode_access_log};
pub use error::{EventSourceError, EventSourceInitError};
pub use error_classification::{is_transient_rpc_error, rpc_backoff_hint};
pub use evm::EvmEventSource;
pub use fetcher::{FetchError, FetchOutcome, FetcherConfig, RangeFetcher};
pub use rpc_executor::{RetryPolicy, RetryPolicyRaw};
pub use source::RemoteEventSource;
