pub mod error;
pub mod ethereum;

use crate::{
    rewrite::rewrites_event, Listener, ProviderShim, Request, ShimError, WalletProvider,
};
use async_trait::async_trait;
use error::Eip1193Error;
use ethereum::{set_provider_js, Ethereum};
use futures::channel::oneshot;
use gloo_utils::format::JsValueSerdeExt;
use log::{debug, error};
use serde_json::Value;
use std::rc::Rc;
use unsafe_send_sync::UnsafeSendSync;
use wasm_bindgen::{closure::Closure, JsValue};
use wasm_bindgen_futures::{future_to_promise, spawn_local};

#[derive(Clone)]
pub struct Eip1193 {
    // Captured once at construction. install() replaces the page global, so
    // resolving window.ethereum per call would hand the shim back itself.
    provider: UnsafeSendSync<Ethereum>,
}

impl Eip1193 {
    /// Wraps whatever sits at `window.ethereum` right now.
    pub fn new() -> Result<Self, ShimError> {
        Ok(Self::wrapping(Ethereum::default_opt()?))
    }

    pub(crate) fn wrapping(provider: Ethereum) -> Self {
        Eip1193 {
            provider: UnsafeSendSync::new(provider),
        }
    }

    pub fn is_available() -> bool {
        Ethereum::default_opt().is_ok()
    }
}

#[async_trait(?Send)]
impl WalletProvider for Eip1193 {
    /// Sends the request to the captured provider object in Js
    async fn request(&self, args: Request) -> Result<Value, ShimError> {
        let (sender, receiver) = oneshot::channel();

        let ethereum = (*self.provider).clone();
        spawn_local(async move {
            let res = match JsValue::from_serde(&args) {
                Ok(payload) => match ethereum.request(payload).await {
                    Ok(r) => match js_sys::JSON::stringify(&r) {
                        // stringify yields undefined for void results
                        Ok(r) => Ok(r.as_string().unwrap_or_else(|| "null".to_owned())),
                        Err(err) => Err(err.into()),
                    },
                    Err(e) => Err(e.into()),
                },
                Err(e) => Err(Eip1193Error::SerdeJson(e)),
            };
            _ = sender.send(res);
        });

        let res = receiver
            .await
            .map_err(|_| Eip1193Error::CommunicationError)?;
        Ok(serde_json::from_str(&res?)?)
    }

    fn on(&self, event: &str, mut listener: Listener) -> Result<(), ShimError> {
        let closure = Closure::wrap(Box::new(move |value: JsValue| {
            listener(value.into_serde().unwrap_or(Value::Null));
        }) as Box<dyn FnMut(JsValue)>);
        self.provider.on(event, &closure);
        closure.forget();
        Ok(())
    }
}

/// Replaces `window.ethereum` with a wrapper object whose `request` and `on`
/// run through a [`ProviderShim`] around the injected provider, and whose
/// `removeListener` forwards to it. Call once at page start, before anything
/// else touches the provider. With no injected provider present this does
/// nothing.
pub fn install() -> Result<(), ShimError> {
    console_error_panic_hook::set_once();
    _ = console_log::init_with_level(log::Level::Trace);

    let Ok(ethereum) = Ethereum::default_opt() else {
        debug!("no injected provider to wrap");
        return Ok(());
    };

    // Every closure below closes over this pre-replacement object; after
    // set_provider_js the global names the wrapper, not the wallet.
    let shim = Rc::new(ProviderShim::new(Eip1193::wrapping(ethereum.clone())));
    let wrapper = js_sys::Object::new();

    let request_shim = Rc::clone(&shim);
    let request_fn =
        Closure::<dyn FnMut(JsValue) -> js_sys::Promise>::new(move |args: JsValue| {
            let shim = Rc::clone(&request_shim);
            future_to_promise(async move {
                let request: Request = serde_wasm_bindgen::from_value(args)
                    .map_err(|e| JsValue::from_str(&e.to_string()))?;
                let response = shim
                    .request(request)
                    .await
                    .map_err(|e| JsValue::from_str(&e.to_string()))?;
                JsValue::from_serde(&response).map_err(|e| JsValue::from_str(&e.to_string()))
            })
        });
    js_sys::Reflect::set(&wrapper, &JsValue::from_str("request"), request_fn.as_ref())
        .map_err(Eip1193Error::from)?;
    request_fn.forget();

    let subscribe_shim = Rc::clone(&shim);
    let subscribe_provider = ethereum.clone();
    let on_fn = Closure::<dyn FnMut(String, js_sys::Function)>::new(
        move |event: String, callback: js_sys::Function| {
            if rewrites_event(&event) {
                let listener: Listener = Box::new(move |payload: Value| {
                    let js = JsValue::from_serde(&payload).unwrap_or(JsValue::NULL);
                    _ = callback.call1(&JsValue::NULL, &js);
                });
                if let Err(e) = subscribe_shim.on(&event, listener) {
                    error!("subscription for {event} failed: {e}");
                }
            } else {
                // Identity events keep the page's own callback, so a later
                // removeListener still matches by reference.
                subscribe_provider.on_raw(&event, &callback);
            }
        },
    );
    js_sys::Reflect::set(&wrapper, &JsValue::from_str("on"), on_fn.as_ref())
        .map_err(Eip1193Error::from)?;
    on_fn.forget();

    // Adapters for rewritten events are not removable this way; the page
    // never holds their reference.
    let remove_provider = ethereum.clone();
    let remove_fn = Closure::<dyn FnMut(String, js_sys::Function)>::new(
        move |event: String, callback: js_sys::Function| {
            remove_provider.remove_listener(&event, &callback);
        },
    );
    js_sys::Reflect::set(
        &wrapper,
        &JsValue::from_str("removeListener"),
        remove_fn.as_ref(),
    )
    .map_err(Eip1193Error::from)?;
    remove_fn.forget();

    set_provider_js(&wrapper);
    Ok(())
}

#[cfg(test)]
#[cfg(target_arch = "wasm32")]
mod tests {
    use super::*;
    use serde_json::json;
    use std::{cell::RefCell, rc::Rc};
    use wasm_bindgen::JsCast;
    use wasm_bindgen_test::*;

    struct StubWallet {
        value: JsValue,
        requests: Rc<RefCell<Vec<String>>>,
        subscriptions: Rc<RefCell<Vec<(String, js_sys::Function)>>>,
        removals: Rc<RefCell<Vec<(String, js_sys::Function)>>>,
    }

    /// Builds a plain JS object standing in for an injected wallet: requests
    /// resolve to `response`, subscriptions and removals are recorded.
    fn stub_wallet(response: &'static str) -> StubWallet {
        let stub = js_sys::Object::new();
        let requests = Rc::new(RefCell::new(Vec::new()));
        let subscriptions = Rc::new(RefCell::new(Vec::new()));
        let removals = Rc::new(RefCell::new(Vec::new()));

        let seen = Rc::clone(&requests);
        let request_fn =
            Closure::<dyn FnMut(JsValue) -> js_sys::Promise>::new(move |args: JsValue| {
                let method = js_sys::Reflect::get(&args, &JsValue::from_str("method"))
                    .ok()
                    .and_then(|m| m.as_string())
                    .unwrap_or_default();
                seen.borrow_mut().push(method);
                js_sys::Promise::resolve(&JsValue::from_str(response))
            });
        js_sys::Reflect::set(&stub, &JsValue::from_str("request"), request_fn.as_ref()).unwrap();
        request_fn.forget();

        let subs = Rc::clone(&subscriptions);
        let on_fn = Closure::<dyn FnMut(String, js_sys::Function)>::new(
            move |event: String, listener: js_sys::Function| {
                subs.borrow_mut().push((event, listener));
            },
        );
        js_sys::Reflect::set(&stub, &JsValue::from_str("on"), on_fn.as_ref()).unwrap();
        on_fn.forget();

        let dropped = Rc::clone(&removals);
        let remove_fn = Closure::<dyn FnMut(String, js_sys::Function)>::new(
            move |event: String, listener: js_sys::Function| {
                dropped.borrow_mut().push((event, listener));
            },
        );
        js_sys::Reflect::set(&stub, &JsValue::from_str("removeListener"), remove_fn.as_ref())
            .unwrap();
        remove_fn.forget();

        StubWallet {
            value: stub.into(),
            requests,
            subscriptions,
            removals,
        }
    }

    #[wasm_bindgen_test]
    async fn install_keeps_delegating_to_the_original_provider() {
        // arrange
        let stub = stub_wallet("0x1519");
        set_provider_js(&stub.value);

        // act
        install().unwrap();
        let wrapper = Ethereum::default_opt().unwrap();
        let args = JsValue::from_serde(&json!({ "method": "eth_chainId" })).unwrap();
        let response = wrapper.request(args).await.unwrap();

        // assert: the pre-replacement wallet answered, and the chain id got
        // rewritten on the way back
        assert_eq!(*stub.requests.borrow(), vec!["eth_chainId".to_owned()]);
        assert_eq!(response.as_string().unwrap(), "0x1");
    }

    #[wasm_bindgen_test]
    fn known_event_subscriptions_get_a_rewriting_adapter() {
        // arrange
        let stub = stub_wallet("0x0");
        set_provider_js(&stub.value);
        install().unwrap();
        let wrapper = Ethereum::default_opt().unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let callback = Closure::<dyn FnMut(JsValue)>::new(move |payload: JsValue| {
            sink.borrow_mut().push(payload.as_string().unwrap_or_default());
        });

        // act
        wrapper.on_raw("chainChanged", callback.as_ref().unchecked_ref());
        let (event, adapter) = {
            let subs = stub.subscriptions.borrow();
            subs[0].clone()
        };
        adapter.call1(&JsValue::NULL, &JsValue::from_str("0x1519")).unwrap();
        adapter.call1(&JsValue::NULL, &JsValue::from_str("0x5")).unwrap();

        // assert: the wallet got an adapter, not the page callback, and the
        // adapter rewrites before delivering
        assert_eq!(event, "chainChanged");
        assert_ne!(JsValue::from(adapter), callback.as_ref().clone());
        assert_eq!(*seen.borrow(), vec!["0x1".to_owned(), "0x5".to_owned()]);
    }

    #[wasm_bindgen_test]
    fn identity_subscriptions_and_removal_keep_the_pages_callback() {
        // arrange
        let stub = stub_wallet("0x0");
        set_provider_js(&stub.value);
        install().unwrap();
        let wrapper = Ethereum::default_opt().unwrap();
        let callback = Closure::<dyn FnMut(JsValue)>::new(|_: JsValue| {});
        let page_fn: &js_sys::Function = callback.as_ref().unchecked_ref();

        // act
        wrapper.on_raw("accountsChanged", page_fn);
        wrapper.remove_listener("accountsChanged", page_fn);

        // assert: both calls reached the wallet with the very same function
        let subs = stub.subscriptions.borrow();
        let removed = stub.removals.borrow();
        assert_eq!(subs[0].0, "accountsChanged");
        assert_eq!(JsValue::from(subs[0].1.clone()), JsValue::from(page_fn.clone()));
        assert_eq!(removed[0].0, "accountsChanged");
        assert_eq!(JsValue::from(removed[0].1.clone()), JsValue::from(page_fn.clone()));
    }

    #[wasm_bindgen_test]
    fn install_without_provider_is_a_noop() {
        set_provider_js(&JsValue::UNDEFINED);
        install().unwrap();
        assert!(!Eip1193::is_available());
    }
}
