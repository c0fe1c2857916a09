use gloo_utils::format::JsValueSerdeExt;
use thiserror::Error;
use wasm_bindgen::JsValue;

use crate::{JsonRpcError, ShimError};

#[derive(Error, Debug)]
/// Error thrown when talking to the injected provider
pub enum Eip1193Error {
    /// Thrown if the request failed
    #[error("JsValue error")]
    JsValueError(String),

    /// Thrown if no window.ethereum is found in DOM
    #[error("No ethereum found")]
    JsNoEthereum,

    #[error(transparent)]
    /// Thrown if the response could not be parsed
    JsonRpcError(#[from] JsonRpcError),

    #[error(transparent)]
    /// Serde JSON Error
    SerdeJson(#[from] serde_json::Error),

    #[error("Communication error")]
    CommunicationError,
}

impl From<JsValue> for Eip1193Error {
    fn from(src: JsValue) -> Self {
        if let Ok(message) = src.into_serde::<JsonRpcError>() {
            Eip1193Error::JsonRpcError(message)
        } else {
            Eip1193Error::JsValueError(format!("{:?}", src))
        }
    }
}

impl From<Eip1193Error> for ShimError {
    fn from(src: Eip1193Error) -> Self {
        match src {
            Eip1193Error::JsValueError(s) => ShimError::JsValueError(s),
            Eip1193Error::JsNoEthereum => ShimError::JsNoEthereum,
            Eip1193Error::JsonRpcError(e) => ShimError::JsonRpcError(e),
            Eip1193Error::SerdeJson(e) => ShimError::SerdeJson(e),
            Eip1193Error::CommunicationError => ShimError::CommunicationError,
        }
    }
}
