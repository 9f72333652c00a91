//! The declarative UI runtime, seen from the reloader.
//!
//! The reloader never looks inside the runtime: it loads an entry point,
//! drops compiled components, enumerates top-level objects and installs the
//! path interceptor. Windows are handles; closing one does not free it,
//! `release` does.

use crate::resource::Interceptor;

/// A top-level window owned by the runtime.
pub trait Window: Sized {
    fn close(&mut self);

    /// Every window parented (directly or not) under this one.
    fn find_descendant_windows(&self) -> Vec<Self>;

    /// Whether both handles point at the same window.
    fn is_same(&self, other: &Self) -> bool;

    /// Free the window. Called after `close`.
    fn release(self);
}

/// One of the runtime's root objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootObject<W> {
    Window(W),
    /// Anything that is not a window (a plain item, a model, ...)
    Other,
}

impl<W> RootObject<W> {
    pub fn into_window(self) -> Option<W> {
        match self {
            Self::Window(window) => Some(window),
            Self::Other => None,
        }
    }
}

pub trait Runtime {
    type Window: Window;

    /// Instantiate the entry point. Load failures are the runtime's to
    /// report; the reloader only checks the resulting root objects.
    fn load_entry(&mut self, url: &str);

    /// Forget compiled components so edited files are read again.
    fn clear_compiled_cache(&mut self);

    fn root_objects(&self) -> Vec<RootObject<Self::Window>>;

    /// Install the hook consulted for every resource path the runtime
    /// resolves. Called once at startup.
    fn register_url_interceptor(&mut self, interceptor: Interceptor);
}
