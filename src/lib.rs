pub mod event;
pub mod rewrite;

#[cfg(target_arch = "wasm32")]
pub mod eip1193;

use async_trait::async_trait;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use rewrite::ChainRewrite;

/// A single EIP-1193 request. Params are kept opaque; the shim only ever
/// looks inside them for the typed-data signing methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<Value>>,
}

impl Request {
    pub fn new(method: impl Into<String>, params: Option<Vec<Value>>) -> Self {
        Request {
            method: method.into(),
            params,
        }
    }
}

/// Callback registered through [`WalletProvider::on`]. Event payloads are
/// delivered as plain JSON values. Not `Send` on wasm, where listeners end
/// up capturing JS callbacks.
#[cfg(target_arch = "wasm32")]
pub type Listener = Box<dyn FnMut(Value)>;
#[cfg(not(target_arch = "wasm32"))]
pub type Listener = Box<dyn FnMut(Value) + Send>;

/// JSON-RPC error object as wallets return it from `request`.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("(code: {code}, message: {message}, data: {data:?})")]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Error, Debug)]
pub enum ShimError {
    /// Typed-data signing request whose payload cannot be rewritten
    #[error("malformed typed-data payload: {0}")]
    MalformedSigningPayload(String),

    #[error(transparent)]
    JsonRpcError(#[from] JsonRpcError),

    #[error(transparent)]
    /// Serde JSON Error
    SerdeJson(#[from] serde_json::Error),

    /// Thrown if no window.ethereum is found in DOM
    #[error("No ethereum found")]
    JsNoEthereum,

    #[error("JsValue error")]
    JsValueError(String),

    #[error("Communication error")]
    CommunicationError,
}

/// The minimal capability surface of an EIP-1193 provider: an asynchronous
/// request/response call and event subscription. The browser-injected
/// `window.ethereum` object is one implementation; [`ProviderShim`] is
/// another, which is what makes the wrapper a drop-in replacement.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait WalletProvider {
    async fn request(&self, args: Request) -> Result<Value, ShimError>;

    fn on(&self, event: &str, listener: Listener) -> Result<(), ShimError>;
}

/// Wraps a [`WalletProvider`] and rewrites a fixed chain-id substitution in
/// flight: typed-data signing payloads on the way out, `eth_chainId`
/// responses and `connect`/`chainChanged` event payloads on the way in.
/// Every other method and event passes through untouched.
///
/// Holds no state between calls; each request and each delivered event is
/// transformed independently.
#[derive(Debug, Clone)]
pub struct ProviderShim<P> {
    provider: Option<P>,
    rewrite: ChainRewrite,
}

impl<P: WalletProvider> ProviderShim<P> {
    pub fn new(provider: P) -> Self {
        Self::with_rewrite(Some(provider), ChainRewrite::default())
    }

    /// A shim with no upstream provider. Requests resolve to `Value::Null`
    /// and subscriptions are accepted but never fire.
    pub fn absent() -> Self {
        Self::with_rewrite(None, ChainRewrite::default())
    }

    pub fn with_rewrite(provider: Option<P>, rewrite: ChainRewrite) -> Self {
        ProviderShim { provider, rewrite }
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl<P> WalletProvider for ProviderShim<P>
where
    P: WalletProvider + Sync,
{
    async fn request(&self, args: Request) -> Result<Value, ShimError> {
        trace!("request {:?}", args);
        let outbound = self.rewrite.request(&args)?;
        let response = match &self.provider {
            Some(provider) => provider.request(outbound).await?,
            None => Value::Null,
        };
        trace!("response {} {:?}", args.method, response);
        // The original request decides the response rewrite, not the
        // rewritten one.
        Ok(self.rewrite.response(&args.method, response))
    }

    fn on(&self, event: &str, listener: Listener) -> Result<(), ShimError> {
        debug!("subscribe {}", event);
        match &self.provider {
            Some(provider) => provider.on(event, self.rewrite.adapt_listener(event, listener)),
            None => Ok(()),
        }
    }
}
