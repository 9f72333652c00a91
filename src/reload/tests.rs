use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use super::*;
use crate::resource::Interceptor;

const QUANTUM: Duration = Duration::from_millis(200);
const ENTRY: &str = "res:/main.qml";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Close(&'static str),
    Release(&'static str),
    ClearCache,
    Load(String),
    Intercept,
}

type Log = Rc<RefCell<Vec<Call>>>;
type Roots = Rc<RefCell<Vec<RootObject<MockWindow>>>>;

#[derive(Clone)]
struct MockWindow {
    name: &'static str,
    children: Vec<&'static str>,
    log: Log,
    roots: Roots,
}

impl Window for MockWindow {
    fn close(&mut self) {
        self.log.borrow_mut().push(Call::Close(self.name));
    }

    fn find_descendant_windows(&self) -> Vec<Self> {
        self.children
            .iter()
            .map(|&name| MockWindow {
                name,
                children: Vec::new(),
                log: Rc::clone(&self.log),
                roots: Rc::clone(&self.roots),
            })
            .collect()
    }

    fn is_same(&self, other: &Self) -> bool {
        self.name == other.name
    }

    fn release(self) {
        self.log.borrow_mut().push(Call::Release(self.name));
        self.roots
            .borrow_mut()
            .retain(|obj| !matches!(obj, RootObject::Window(w) if w.name == self.name));
    }
}

/// Loading builds `next` (root name, child names); `None` loads nothing.
struct MockRuntime {
    log: Log,
    roots: Roots,
    next: Option<(&'static str, Vec<&'static str>)>,
}

impl MockRuntime {
    fn new() -> Self {
        Self {
            log: Log::default(),
            roots: Roots::default(),
            next: Some(("main", Vec::new())),
        }
    }

    fn window(&self, name: &'static str, children: Vec<&'static str>) -> MockWindow {
        MockWindow {
            name,
            children,
            log: Rc::clone(&self.log),
            roots: Rc::clone(&self.roots),
        }
    }

    fn push_window(&self, name: &'static str, children: Vec<&'static str>) {
        let window = self.window(name, children);
        self.roots.borrow_mut().push(RootObject::Window(window));
    }

    fn calls(&self) -> Vec<Call> {
        self.log.borrow().clone()
    }

    fn loads(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Load(_)))
            .count()
    }
}

impl Runtime for MockRuntime {
    type Window = MockWindow;

    fn load_entry(&mut self, url: &str) {
        self.log.borrow_mut().push(Call::Load(url.to_string()));
        if let Some((name, children)) = self.next.clone() {
            self.push_window(name, children);
        }
    }

    fn clear_compiled_cache(&mut self) {
        self.log.borrow_mut().push(Call::ClearCache);
    }

    fn root_objects(&self) -> Vec<RootObject<MockWindow>> {
        self.roots.borrow().clone()
    }

    fn register_url_interceptor(&mut self, _interceptor: Interceptor) {
        self.log.borrow_mut().push(Call::Intercept);
    }
}

fn make_orchestrator() -> ReloadOrchestrator<MockRuntime> {
    let mut orchestrator = ReloadOrchestrator::new(QUANTUM);
    orchestrator.set_entry_url(ENTRY);
    orchestrator
}

#[test]
fn test_reload_without_entry_url() {
    let mut runtime = MockRuntime::new();
    runtime.push_window("main", vec!["dialog"]);
    let mut orchestrator = ReloadOrchestrator::<MockRuntime>::new(QUANTUM);
    let now = Instant::now();

    assert_eq!(
        orchestrator.reload(now),
        Err(ConfigurationError::MissingEntryUrl)
    );
    assert_eq!(orchestrator.state(), ReloadState::Idle);
    assert_eq!(orchestrator.next_deadline(), None);
    assert_eq!(orchestrator.fire_due(&mut runtime, now + QUANTUM), None);
    assert!(runtime.calls().is_empty());
}

#[test]
fn test_burst_coalesces_into_one_reload() {
    let mut runtime = MockRuntime::new();
    let mut orchestrator = make_orchestrator();
    let t0 = Instant::now();

    for i in 0..5 {
        orchestrator.reload(t0 + Duration::from_millis(i * 20)).unwrap();
        assert_eq!(orchestrator.state(), ReloadState::PendingDebounce);
    }

    let last = t0 + Duration::from_millis(80);
    assert_eq!(orchestrator.fire_due(&mut runtime, last + QUANTUM / 2), None);
    assert_eq!(
        orchestrator.fire_due(&mut runtime, last + QUANTUM),
        Some(ReloadOutcome::Reloaded)
    );
    assert_eq!(orchestrator.fire_due(&mut runtime, last + QUANTUM * 2), None);

    assert_eq!(runtime.loads(), 1);
    assert_eq!(orchestrator.state(), ReloadState::Idle);
}

#[test]
fn test_teardown_closes_descendants_before_root() {
    let mut runtime = MockRuntime::new();
    runtime.push_window("main", vec!["dialog", "popup"]);
    let mut orchestrator = make_orchestrator();
    let now = Instant::now();

    orchestrator.reload(now).unwrap();
    orchestrator.fire_due(&mut runtime, now + QUANTUM);

    assert_eq!(
        runtime.calls(),
        vec![
            Call::Close("dialog"),
            Call::Close("popup"),
            Call::Close("main"),
            Call::Release("main"),
            Call::ClearCache,
            Call::Load(ENTRY.to_string()),
        ]
    );
}

#[test]
fn test_last_window_is_the_root() {
    let mut runtime = MockRuntime::new();
    runtime.push_window("splash", Vec::new());
    runtime.roots.borrow_mut().push(RootObject::Other);
    runtime.push_window("main", Vec::new());
    let mut orchestrator = make_orchestrator();
    let now = Instant::now();

    orchestrator.reload(now).unwrap();
    orchestrator.fire_due(&mut runtime, now + QUANTUM);

    let calls = runtime.calls();
    assert!(calls.contains(&Call::Release("main")));
    assert!(!calls.contains(&Call::Close("splash")));
}

#[test]
fn test_reloaded_window_becomes_tracked_root() {
    let mut runtime = MockRuntime::new();
    runtime.next = Some(("fresh", vec!["child"]));
    let mut orchestrator = make_orchestrator();
    let mut now = Instant::now();

    orchestrator.reload(now).unwrap();
    now += QUANTUM;
    orchestrator.fire_due(&mut runtime, now);
    runtime.log.borrow_mut().clear();

    // Something else shows up after the tracked root
    runtime.push_window("tooltip", Vec::new());

    orchestrator.reload(now).unwrap();
    now += QUANTUM;
    orchestrator.fire_due(&mut runtime, now);

    let calls = runtime.calls();
    assert_eq!(calls[0], Call::Close("child"));
    assert_eq!(calls[1], Call::Close("fresh"));
    assert_eq!(calls[2], Call::Release("fresh"));
    assert!(!calls.contains(&Call::Close("tooltip")));
}

#[test]
fn test_empty_root_objects_warns() {
    let mut runtime = MockRuntime::new();
    runtime.next = None;
    let mut orchestrator = make_orchestrator();
    let now = Instant::now();

    orchestrator.reload(now).unwrap();
    let outcome = orchestrator.fire_due(&mut runtime, now + QUANTUM);

    assert_eq!(
        outcome,
        Some(ReloadOutcome::Empty(ReloadIntegrityWarning {
            entry_url: ENTRY.to_string()
        }))
    );
    assert!(outcome.is_some_and(|o| o.reloaded()));
    assert_eq!(orchestrator.state(), ReloadState::Idle);
    assert_eq!(runtime.loads(), 1);
}

#[test]
fn test_entry_cleared_before_timer_fires() {
    let mut runtime = MockRuntime::new();
    runtime.push_window("main", Vec::new());
    let mut orchestrator = make_orchestrator();
    let now = Instant::now();

    orchestrator.reload(now).unwrap();
    orchestrator.set_entry_url("");
    let outcome = orchestrator.fire_due(&mut runtime, now + QUANTUM);

    assert_eq!(
        outcome,
        Some(ReloadOutcome::Misconfigured(
            ConfigurationError::MissingEntryUrl
        ))
    );
    assert_eq!(orchestrator.state(), ReloadState::Idle);
    assert!(runtime.calls().is_empty());
}

#[test]
fn test_request_while_reloading_is_dropped() {
    let mut orchestrator = make_orchestrator();
    orchestrator.session.state = ReloadState::Reloading;

    assert_eq!(orchestrator.reload(Instant::now()), Ok(()));
    assert_eq!(orchestrator.next_deadline(), None);
    assert_eq!(orchestrator.state(), ReloadState::Reloading);
}

#[test]
fn test_reloading_flag_cleared_after_reload() {
    let mut runtime = MockRuntime::new();
    let mut orchestrator = make_orchestrator();
    let flag = orchestrator.reloading_flag();
    let now = Instant::now();

    orchestrator.reload(now).unwrap();
    assert!(!flag.load(Ordering::SeqCst));
    orchestrator.fire_due(&mut runtime, now + QUANTUM);

    assert!(!flag.load(Ordering::SeqCst));
    assert!(!orchestrator.is_reloading());
}

#[test]
fn test_close_all_off_keeps_descendants() {
    let mut runtime = MockRuntime::new();
    runtime.push_window("main", vec!["dialog", "popup"]);
    let mut orchestrator = make_orchestrator();
    assert!(orchestrator.close_all_on_reload());
    orchestrator.set_close_all_on_reload(false);
    let now = Instant::now();

    orchestrator.reload(now).unwrap();
    orchestrator.fire_due(&mut runtime, now + QUANTUM);

    assert_eq!(
        runtime.calls(),
        vec![
            Call::Close("main"),
            Call::Release("main"),
            Call::ClearCache,
            Call::Load(ENTRY.to_string()),
        ]
    );
}

#[test]
fn test_destroyed_tracked_root_not_torn_down() {
    let mut runtime = MockRuntime::new();
    runtime.next = Some(("fresh", Vec::new()));
    let mut orchestrator = make_orchestrator();
    let mut now = Instant::now();

    orchestrator.reload(now).unwrap();
    now += QUANTUM;
    orchestrator.fire_due(&mut runtime, now);

    // The runtime drops the tracked root on its own and shows another window
    runtime.roots.borrow_mut().clear();
    runtime.push_window("other", Vec::new());
    runtime.log.borrow_mut().clear();

    orchestrator.reload(now).unwrap();
    now += QUANTUM;
    orchestrator.fire_due(&mut runtime, now);

    let calls = runtime.calls();
    assert_eq!(calls[0], Call::Close("other"));
    assert_eq!(calls[1], Call::Release("other"));
    assert!(!calls.contains(&Call::Close("fresh")));
}
