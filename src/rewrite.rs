use log::trace;
use serde_json::{json, Value};

use crate::{event::WalletEvent, Listener, Request, ShimError};

type RequestRewrite = fn(&ChainRewrite, &Request) -> Result<Request, ShimError>;
type ResponseRewrite = fn(&ChainRewrite, Value) -> Value;

/// The fixed chain-id substitution applied by the shim. The defaults are the
/// network identifiers this crate exists for; there is no general mapping
/// rule behind them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainRewrite {
    /// Chain id the wallet reports, as a hex string
    pub wallet_chain_id: &'static str,
    /// Chain id handed to the page instead
    pub public_chain_id: &'static str,
    /// Chain id injected into typed-data signing domains
    pub signing_chain_id: u64,
}

impl Default for ChainRewrite {
    fn default() -> Self {
        ChainRewrite {
            wallet_chain_id: "0x1519",
            public_chain_id: "0x1",
            signing_chain_id: 5401,
        }
    }
}

impl ChainRewrite {
    /// Rewrites an outbound request, or returns it unchanged when no rewrite
    /// is registered for its method. Never mutates the original.
    pub fn request(&self, original: &Request) -> Result<Request, ShimError> {
        match request_rewrite(&original.method) {
            Some(rewrite) => rewrite(self, original),
            None => Ok(original.clone()),
        }
    }

    /// Rewrites an inbound response. `method` is the method of the request
    /// as the page issued it, before any outbound rewrite.
    pub fn response(&self, method: &str, response: Value) -> Value {
        match response_rewrite(method) {
            Some(rewrite) => rewrite(self, response),
            None => response,
        }
    }

    /// Wraps `listener` in the adapter registered for `event`. Events with
    /// no adapter get the listener back unmodified.
    pub fn adapt_listener(&self, event: &str, listener: Listener) -> Listener {
        match WalletEvent::from_name(event) {
            Some(WalletEvent::Connect) => self.connect_listener(listener),
            Some(WalletEvent::ChainChanged) => self.chain_changed_listener(listener),
            _ => listener,
        }
    }

    fn chain_changed_listener(&self, mut listener: Listener) -> Listener {
        let (wallet, public) = (self.wallet_chain_id, self.public_chain_id);
        Box::new(move |chain_id: Value| {
            if chain_id.as_str() == Some(wallet) {
                trace!("chainChanged [{}] to [{}]", wallet, public);
                listener(Value::String(public.to_owned()));
            } else {
                listener(chain_id);
            }
        })
    }

    fn connect_listener(&self, mut listener: Listener) -> Listener {
        let (wallet, public) = (self.wallet_chain_id, self.public_chain_id);
        Box::new(move |connect_info: Value| {
            if connect_info.get("chainId").and_then(Value::as_str) == Some(wallet) {
                trace!("connect [{}] to [{}]", wallet, public);
                listener(json!({ "chainId": public }));
            } else {
                listener(connect_info);
            }
        })
    }
}

/// Whether subscriptions for `event` get a payload-rewriting adapter.
/// Everything else keeps the original listener.
pub fn rewrites_event(event: &str) -> bool {
    matches!(
        WalletEvent::from_name(event),
        Some(WalletEvent::Connect | WalletEvent::ChainChanged)
    )
}

fn request_rewrite(method: &str) -> Option<RequestRewrite> {
    match method {
        "eth_signTypedData" | "eth_signTypedData_v4" => Some(rewrite_typed_data),
        _ => None,
    }
}

fn response_rewrite(method: &str) -> Option<ResponseRewrite> {
    match method {
        "eth_chainId" => Some(rewrite_chain_id),
        _ => None,
    }
}

/// Parses the typed-data document in `params[1]`, pins `domain.chainId` to
/// the signing chain id and re-serializes. `params[0]` (the signer address)
/// is carried over untouched.
fn rewrite_typed_data(rewrite: &ChainRewrite, original: &Request) -> Result<Request, ShimError> {
    let params = original.params.as_deref().unwrap_or_default();
    let raw = params
        .get(1)
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("params[1] must be a JSON document string"))?;
    let mut document: Value =
        serde_json::from_str(raw).map_err(|e| malformed(&e.to_string()))?;
    let domain = document
        .get_mut("domain")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| malformed("document has no domain object"))?;
    domain.insert("chainId".to_owned(), Value::from(rewrite.signing_chain_id));

    let account = params.first().cloned().unwrap_or(Value::Null);
    let rewritten = Request::new(
        original.method.clone(),
        Some(vec![account, Value::String(serde_json::to_string(&document)?)]),
    );
    trace!("changed request {:?}", rewritten);
    Ok(rewritten)
}

fn rewrite_chain_id(rewrite: &ChainRewrite, response: Value) -> Value {
    if response.as_str() == Some(rewrite.wallet_chain_id) {
        trace!(
            "eth_chainId [{}] to [{}]",
            rewrite.wallet_chain_id,
            rewrite.public_chain_id
        );
        Value::String(rewrite.public_chain_id.to_owned())
    } else {
        response
    }
}

fn malformed(reason: &str) -> ShimError {
    ShimError::MalformedSigningPayload(reason.to_owned())
}
