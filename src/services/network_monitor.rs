// ============================================================================
// NETWORK STATE MONITOR
// ============================================================================
// Sigue la conectividad online/offline y avisa a los suscriptores en cada
// transición. El monitor del navegador lleva los eventos `online` / `offline`
// de window a un ConnectivityHub; los tests manejan el hub directamente.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkStatus {
    Online,
    Offline,
    Unknown,
}

pub type ConnectivityHandler = Rc<dyn Fn(NetworkStatus)>;

/// Vista de la conectividad basada en suscripciones.
pub trait Connectivity {
    fn status(&self) -> NetworkStatus;

    fn is_online(&self) -> bool {
        matches!(self.status(), NetworkStatus::Online)
    }

    /// Llama a `handler` en cada cambio hasta que la suscripción devuelta se
    /// suelte o se cancele.
    fn on_connectivity_change(&self, handler: ConnectivityHandler) -> Subscription;
}

/// Se desuscribe al soltarse
#[must_use = "dropping the subscription unsubscribes the handler"]
pub struct Subscription {
    hub: Weak<ConnectivityHub>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Lo hace Drop
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.listeners.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }
}

/// Estado actual más la lista de suscriptores
pub struct ConnectivityHub {
    status: Cell<NetworkStatus>,
    listeners: RefCell<Vec<(u64, ConnectivityHandler)>>,
    next_id: Cell<u64>,
}

impl ConnectivityHub {
    pub fn new(initial: NetworkStatus) -> Rc<Self> {
        Rc::new(Self {
            status: Cell::new(initial),
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        })
    }

    /// Guarda el nuevo estado y avisa a los suscriptores si cambió.
    pub fn set_status(&self, status: NetworkStatus) {
        let previous = self.status.replace(status);
        if previous == status {
            return;
        }

        match status {
            NetworkStatus::Online => log::info!("🌐 [NETWORK] ONLINE"),
            NetworkStatus::Offline => log::warn!("📴 [NETWORK] OFFLINE"),
            NetworkStatus::Unknown => log::debug!("❔ [NETWORK] estado desconocido"),
        }

        // Los handlers pueden (des)suscribirse: se llaman sobre una copia
        let handlers: Vec<ConnectivityHandler> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in handlers {
            handler(status);
        }
    }

    pub fn subscribe(self: &Rc<Self>, handler: ConnectivityHandler) -> Subscription {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.listeners.borrow_mut().push((id, handler));
        Subscription {
            hub: Rc::downgrade(self),
            id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl Connectivity for Rc<ConnectivityHub> {
    fn status(&self) -> NetworkStatus {
        self.status.get()
    }

    fn on_connectivity_change(&self, handler: ConnectivityHandler) -> Subscription {
        self.subscribe(handler)
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserNetworkMonitor;

#[cfg(target_arch = "wasm32")]
mod browser {
    use std::rc::Rc;

    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use web_sys::{window, Event};

    use super::{Connectivity, ConnectivityHandler, ConnectivityHub, NetworkStatus, Subscription};

    /// Lleva los eventos `online` / `offline` de window a un hub.
    /// Los listeners se registran una vez y se quitan al soltar el monitor.
    pub struct BrowserNetworkMonitor {
        hub: Rc<ConnectivityHub>,
        online_closure: Option<Closure<dyn FnMut(Event)>>,
        offline_closure: Option<Closure<dyn FnMut(Event)>>,
    }

    impl BrowserNetworkMonitor {
        pub fn new() -> Self {
            let initial = match window() {
                Some(w) if w.navigator().on_line() => NetworkStatus::Online,
                Some(_) => NetworkStatus::Offline,
                None => NetworkStatus::Unknown,
            };
            let mut monitor = Self {
                hub: ConnectivityHub::new(initial),
                online_closure: None,
                offline_closure: None,
            };
            monitor.register_listeners();
            monitor
        }

        pub fn hub(&self) -> Rc<ConnectivityHub> {
            self.hub.clone()
        }

        fn register_listeners(&mut self) {
            let Some(window) = window() else {
                log::warn!("⚠️ [NETWORK] sin window, no hay eventos de conectividad");
                return;
            };

            let online_closure = Closure::wrap(Box::new({
                let hub = self.hub.clone();
                move |_event: Event| hub.set_status(NetworkStatus::Online)
            }) as Box<dyn FnMut(Event)>);

            let offline_closure = Closure::wrap(Box::new({
                let hub = self.hub.clone();
                move |_event: Event| hub.set_status(NetworkStatus::Offline)
            }) as Box<dyn FnMut(Event)>);

            let _ = window.add_event_listener_with_callback(
                "online",
                online_closure.as_ref().unchecked_ref(),
            );
            let _ = window.add_event_listener_with_callback(
                "offline",
                offline_closure.as_ref().unchecked_ref(),
            );

            self.online_closure = Some(online_closure);
            self.offline_closure = Some(offline_closure);
            log::info!("✅ [NETWORK] listeners online/offline registrados");
        }
    }

    impl Default for BrowserNetworkMonitor {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Connectivity for BrowserNetworkMonitor {
        fn status(&self) -> NetworkStatus {
            self.hub.status()
        }

        fn on_connectivity_change(&self, handler: ConnectivityHandler) -> Subscription {
            self.hub.subscribe(handler)
        }
    }

    impl Drop for BrowserNetworkMonitor {
        fn drop(&mut self) {
            if let Some(window) = window() {
                if let Some(closure) = self.online_closure.take() {
                    let _ = window.remove_event_listener_with_callback(
                        "online",
                        closure.as_ref().unchecked_ref(),
                    );
                }
                if let Some(closure) = self.offline_closure.take() {
                    let _ = window.remove_event_listener_with_callback(
                        "offline",
                        closure.as_ref().unchecked_ref(),
                    );
                }
            }
            log::info!("🔌 [NETWORK] monitor liberado");
        }
    }
}
