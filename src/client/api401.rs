use parking_lot::RwLock;

use crate::core::errors::LOGIN_REQUIRED_MESSAGE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

type ToastFn = Box<dyn Fn(&str, ToastKind) + Send + Sync>;
type OpenLoginFn = Box<dyn Fn() + Send + Sync>;

/// Callbacks run whenever the API answers 401: show a toast, then open the login prompt.
///
/// Nothing happens until both are registered.
#[derive(Default)]
pub struct Api401Handlers {
    handlers: RwLock<Option<(ToastFn, OpenLoginFn)>>,
}

impl Api401Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the pair of callbacks.
    pub fn set<T, L>(&self, toast: T, open_login: L)
    where
        T: Fn(&str, ToastKind) + Send + Sync + 'static,
        L: Fn() + Send + Sync + 'static,
    {
        *self.handlers.write() = Some((Box::new(toast), Box::new(open_login)));
    }

    /// Run the callbacks for a response status. Returns true when it was a handled 401.
    pub fn handle(&self, status: u16) -> bool {
        if status != 401 {
            return false;
        }
        match &*self.handlers.read() {
            Some((toast, open_login)) => {
                toast(LOGIN_REQUIRED_MESSAGE, ToastKind::Error);
                open_login();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn only_401_with_registered_handlers_fires() {
        let hooks = Api401Handlers::new();
        assert!(!hooks.handle(401));

        let toasts = Arc::new(Mutex::new(Vec::new()));
        let opened = Arc::new(AtomicUsize::new(0));
        let (t, o) = (toasts.clone(), opened.clone());
        hooks.set(
            move |msg, kind| t.lock().unwrap().push((msg.to_string(), kind)),
            move || {
                o.fetch_add(1, Ordering::SeqCst);
            },
        );

        assert!(!hooks.handle(403));
        assert!(hooks.handle(401));
        assert_eq!(opened.load(Ordering::SeqCst), 1);
        assert_eq!(
            toasts.lock().unwrap().as_slice(),
            &[("You need to log in to continue.".to_string(), ToastKind::Error)]
        );
    }
}
