use crate::eip1193::error::Eip1193Error;
use wasm_bindgen::{closure::Closure, prelude::wasm_bindgen, JsValue};

#[wasm_bindgen]
extern "C" {
    #[derive(Clone, Debug)]
    /// An EIP-1193 provider object. Available by convention at `window.ethereum`
    pub(crate) type Ethereum;

    #[wasm_bindgen(catch, method)]
    pub(crate) async fn request(_: &Ethereum, args: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method)]
    pub(crate) fn on(_: &Ethereum, eventName: &str, listener: &Closure<dyn FnMut(JsValue)>);

    #[wasm_bindgen(method, js_name = "on")]
    pub(crate) fn on_raw(_: &Ethereum, eventName: &str, listener: &js_sys::Function);

    #[wasm_bindgen(method, js_name = "removeListener")]
    pub(crate) fn remove_listener(_: &Ethereum, eventName: &str, listener: &js_sys::Function);
}

impl Ethereum {
    pub(crate) fn default_opt() -> Result<Self, Eip1193Error> {
        if let Ok(Some(eth)) = get_provider_js() {
            Ok(eth)
        } else {
            Err(Eip1193Error::JsNoEthereum)
        }
    }
}

#[wasm_bindgen(
    inline_js = "export function get_provider_js() {return window.ethereum} export function set_provider_js(p) {window.ethereum = p}"
)]
extern "C" {
    #[wasm_bindgen(catch)]
    fn get_provider_js() -> Result<Option<Ethereum>, JsValue>;

    pub(crate) fn set_provider_js(provider: &JsValue);
}
