//! A runtime without a UI.
//!
//! Stands in for the declarative UI runtime in the CLI: loading an entry
//! resolves it through the interceptor, reads the file, and exposes one
//! root window describing it. Compiled files are cached until
//! [`Runtime::clear_compiled_cache`], so a reload that skips the cache
//! clear keeps showing stale content, like the real thing.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use crate::reload::{RootObject, Runtime, Window};
use crate::resource::{Interceptor, Resolved, SCHEME};

type Windows = Rc<RefCell<Vec<HeadlessWindow>>>;

/// What "compiling" a file produces here.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Component {
    lines: usize,
}

impl Component {
    /// `None` for a file with no content.
    fn compile(text: &str) -> Option<Self> {
        let lines = text.lines().filter(|line| !line.trim().is_empty()).count();
        (lines > 0).then_some(Self { lines })
    }
}

#[derive(Default)]
pub struct HeadlessRuntime {
    interceptor: Option<Interceptor>,
    compiled: FxHashMap<PathBuf, Component>,
    windows: Windows,
    next_id: u64,
    loads: usize,
}

impl HeadlessRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `load_entry` calls so far.
    pub fn loads(&self) -> usize {
        self.loads
    }

    /// Open root windows, oldest first.
    pub fn windows(&self) -> Vec<HeadlessWindow> {
        self.windows.borrow().clone()
    }

    /// Local file an entry URL loads from.
    fn resolve(&self, url: &str) -> Option<PathBuf> {
        match self.interceptor.as_ref().map(|i| i.resolve(url)) {
            Some(Resolved::Redirected(path)) => Some(path),
            // A virtual path outside the table has no file behind it
            _ if url.starts_with(&format!("{SCHEME}:")) => None,
            _ => Some(PathBuf::from(url.strip_prefix("file://").unwrap_or(url))),
        }
    }

    fn compile(&mut self, source: &Path) -> Option<Component> {
        if let Some(component) = self.compiled.get(source) {
            crate::debug!("reload"; "cached {}", source.display());
            return Some(component.clone());
        }

        let text = match fs::read_to_string(source) {
            Ok(text) => text,
            Err(e) => {
                crate::log!("error"; "unable to read `{}`: {}", source.display(), e);
                return None;
            }
        };
        let Some(component) = Component::compile(&text) else {
            crate::log!("error"; "`{}` is empty", source.display());
            return None;
        };
        self.compiled.insert(source.to_path_buf(), component.clone());
        Some(component)
    }
}

impl Runtime for HeadlessRuntime {
    type Window = HeadlessWindow;

    fn load_entry(&mut self, url: &str) {
        self.loads += 1;

        let Some(source) = self.resolve(url) else {
            crate::log!("error"; "`{}` is not in the resource table", url);
            return;
        };
        let Some(component) = self.compile(&source) else {
            return;
        };

        self.next_id += 1;
        let window = HeadlessWindow {
            id: self.next_id,
            url: url.to_string(),
            source,
            lines: component.lines,
            windows: Rc::downgrade(&self.windows),
        };
        crate::debug!("reload"; "window #{} from {}", window.id, window.source.display());
        self.windows.borrow_mut().push(window);
    }

    fn clear_compiled_cache(&mut self) {
        self.compiled.clear();
    }

    fn root_objects(&self) -> Vec<RootObject<HeadlessWindow>> {
        self.windows
            .borrow()
            .iter()
            .cloned()
            .map(RootObject::Window)
            .collect()
    }

    fn register_url_interceptor(&mut self, interceptor: Interceptor) {
        self.interceptor = Some(interceptor);
    }
}

/// Handle to a root window of a [`HeadlessRuntime`].
#[derive(Debug, Clone)]
pub struct HeadlessWindow {
    id: u64,
    url: String,
    source: PathBuf,
    lines: usize,
    windows: Weak<RefCell<Vec<HeadlessWindow>>>,
}

impl HeadlessWindow {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Entry URL the window was loaded from.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// File actually read.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Non-blank lines in the source.
    pub fn lines(&self) -> usize {
        self.lines
    }
}

impl Window for HeadlessWindow {
    fn close(&mut self) {
        crate::debug!("reload"; "close window #{}", self.id);
    }

    fn find_descendant_windows(&self) -> Vec<Self> {
        Vec::new()
    }

    fn is_same(&self, other: &Self) -> bool {
        self.id == other.id
    }

    fn release(self) {
        crate::debug!("reload"; "release window #{}", self.id);
        if let Some(windows) = self.windows.upgrade() {
            windows.borrow_mut().retain(|window| window.id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::resource::{ResourceEntry, ResourceTable, SharedTable};

    fn make_runtime(dir: &TempDir) -> (HeadlessRuntime, SharedTable) {
        let local = dir.path().join("main.qml");
        fs::write(&local, "Window {\n\n  title: \"a\"\n}\n").unwrap();

        let table = SharedTable::new();
        table.install(ResourceTable::from_entries(vec![ResourceEntry {
            virtual_path: "res:/main.qml".to_string(),
            local_path: local,
            suffix: "qml".to_string(),
            ignored: false,
        }]));

        let mut runtime = HeadlessRuntime::new();
        runtime.register_url_interceptor(table.interceptor());
        (runtime, table)
    }

    #[test]
    fn test_load_through_interceptor() {
        let dir = TempDir::new().unwrap();
        let (mut runtime, _table) = make_runtime(&dir);

        runtime.load_entry("res:/main.qml");

        let windows = runtime.windows();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].url(), "res:/main.qml");
        assert_eq!(windows[0].source(), dir.path().join("main.qml"));
        assert_eq!(windows[0].lines(), 3);
    }

    #[test]
    fn test_unmapped_virtual_path_loads_nothing() {
        let dir = TempDir::new().unwrap();
        let (mut runtime, _table) = make_runtime(&dir);

        runtime.load_entry("res:/missing.qml");

        assert!(runtime.root_objects().is_empty());
        assert_eq!(runtime.loads(), 1);
    }

    #[test]
    fn test_release_removes_root() {
        let dir = TempDir::new().unwrap();
        let (mut runtime, _table) = make_runtime(&dir);
        runtime.load_entry("res:/main.qml");

        let Some(mut window) = runtime.root_objects().pop().and_then(RootObject::into_window)
        else {
            panic!("expected a window");
        };
        window.close();
        window.release();

        assert!(runtime.windows().is_empty());
    }

    #[test]
    fn test_compiled_cache_until_cleared() {
        let dir = TempDir::new().unwrap();
        let (mut runtime, _table) = make_runtime(&dir);
        runtime.load_entry("res:/main.qml");

        fs::write(dir.path().join("main.qml"), "Window {}\n").unwrap();
        runtime.load_entry("res:/main.qml");
        assert_eq!(runtime.windows()[1].lines(), 3);

        runtime.clear_compiled_cache();
        runtime.load_entry("res:/main.qml");
        assert_eq!(runtime.windows()[2].lines(), 1);
    }

    #[test]
    fn test_empty_file_yields_no_window() {
        let dir = TempDir::new().unwrap();
        let (mut runtime, _table) = make_runtime(&dir);
        fs::write(dir.path().join("main.qml"), "\n  \n").unwrap();

        runtime.load_entry("res:/main.qml");
        assert!(runtime.windows().is_empty());
    }

    #[test]
    fn test_plain_file_url() {
        let dir = TempDir::new().unwrap();
        let (mut runtime, _table) = make_runtime(&dir);
        let path = dir.path().join("main.qml");

        runtime.load_entry(&format!("file://{}", path.display()));
        assert_eq!(runtime.windows().len(), 1);
    }
}
