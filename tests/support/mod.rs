#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use docmost_shell::catalog::{ElementLocator, PageBuiltin, SyntheticInput};
use docmost_shell::error::SurfaceError;
use docmost_shell::probe::{
    ElementFinder, ExecutionRequest, InputSynthesizer, KeyPhase, KeyTarget, ProbeContext,
    ProbeFault,
};
use docmost_shell::surface::{SurfaceFactory, SurfaceState, TargetSurface};

/// One call made on a [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Reload,
    ForceReload,
    SetZoom(f64),
    GoBack,
    GoForward,
    LoadUrl(String),
    OpenDevTools,
    CloseDevTools,
    Probe(ExecutionRequest),
}

pub type CallLog = Arc<Mutex<Vec<SurfaceCall>>>;

/// A surface that records what the dispatcher asks of it.
pub struct RecordingSurface {
    pub log: CallLog,
    pub state: SurfaceState,
    pub zoom: f64,
    pub back: bool,
    pub forward: bool,
    pub devtools: bool,
    pub fail_probe: bool,
}

impl RecordingSurface {
    pub fn new() -> (Self, CallLog) {
        let log = CallLog::default();
        (
            Self {
                log: log.clone(),
                state: SurfaceState::Ready,
                zoom: 1.0,
                back: false,
                forward: false,
                devtools: false,
                fail_probe: false,
            },
            log,
        )
    }

    fn record(&self, call: SurfaceCall) {
        self.log.lock().unwrap().push(call);
    }
}

impl TargetSurface for RecordingSurface {
    fn state(&self) -> SurfaceState {
        self.state
    }

    fn reload(&mut self) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::Reload);
        Ok(())
    }

    fn reload_bypassing_cache(&mut self) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::ForceReload);
        Ok(())
    }

    fn zoom_factor(&self) -> Result<f64, SurfaceError> {
        Ok(self.zoom)
    }

    fn set_zoom_factor(&mut self, factor: f64) -> Result<(), SurfaceError> {
        self.zoom = factor;
        self.record(SurfaceCall::SetZoom(factor));
        Ok(())
    }

    fn can_go_back(&self) -> Result<bool, SurfaceError> {
        Ok(self.back)
    }

    fn go_back(&mut self) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::GoBack);
        Ok(())
    }

    fn can_go_forward(&self) -> Result<bool, SurfaceError> {
        Ok(self.forward)
    }

    fn go_forward(&mut self) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::GoForward);
        Ok(())
    }

    fn load_url(&mut self, url: &str) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::LoadUrl(url.to_string()));
        Ok(())
    }

    fn is_devtools_open(&self) -> Result<bool, SurfaceError> {
        Ok(self.devtools)
    }

    fn open_devtools(&mut self) -> Result<(), SurfaceError> {
        self.devtools = true;
        self.record(SurfaceCall::OpenDevTools);
        Ok(())
    }

    fn close_devtools(&mut self) -> Result<(), SurfaceError> {
        self.devtools = false;
        self.record(SurfaceCall::CloseDevTools);
        Ok(())
    }

    fn run_in_context(&mut self, request: ExecutionRequest) -> Result<(), SurfaceError> {
        if self.fail_probe {
            return Err(SurfaceError::Closed);
        }
        self.record(SurfaceCall::Probe(request));
        Ok(())
    }
}

/// Opens recording surfaces and remembers which URLs it was asked for.
#[derive(Default)]
pub struct RecordingFactory {
    pub opened: Arc<Mutex<Vec<String>>>,
    pub logs: Arc<Mutex<Vec<CallLog>>>,
}

impl SurfaceFactory for RecordingFactory {
    fn open(&mut self, url: &str) -> Result<Box<dyn TargetSurface>, SurfaceError> {
        self.opened.lock().unwrap().push(url.to_string());
        let (surface, log) = RecordingSurface::new();
        self.logs.lock().unwrap().push(log);
        Ok(Box::new(surface))
    }
}

/// Where a synthetic key event ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    pub phase: KeyPhase,
    pub target: KeyTarget,
    pub input: SyntheticInput,
}

/// A page reduced to the selectors that currently match something.
#[derive(Default)]
pub struct FakeDocument {
    present: HashSet<String>,
    /// Selectors that appear only after one of these openers is clicked.
    hidden_until_opened: Vec<(String, String)>,
    invalid: HashSet<String>,
    pub clicked: Vec<String>,
    pub keys: Vec<KeyRecord>,
    pub builtins: Vec<PageBuiltin>,
    pub settled_ms: Vec<u128>,
}

impl FakeDocument {
    pub fn with(selectors: &[&str]) -> Self {
        Self {
            present: selectors.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn reveal(mut self, opener: &str, hidden: &str) -> Self {
        self.present.insert(opener.to_string());
        self.hidden_until_opened
            .push((opener.to_string(), hidden.to_string()));
        self
    }

    pub fn reject(mut self, selector: &str) -> Self {
        self.invalid.insert(selector.to_string());
        self
    }
}

impl ElementFinder for FakeDocument {
    type Handle = String;

    fn resolve(&mut self, locator: &ElementLocator) -> Result<Option<String>, ProbeFault> {
        let css = locator.css();
        if self.invalid.contains(css) {
            return Err(ProbeFault(format!("'{css}' is not a valid selector")));
        }
        Ok(self.present.contains(css).then(|| css.to_string()))
    }

    fn activate(&mut self, handle: &String) -> Result<(), ProbeFault> {
        self.clicked.push(handle.clone());
        let revealed: Vec<String> = self
            .hidden_until_opened
            .iter()
            .filter(|(opener, _)| opener == handle)
            .map(|(_, hidden)| hidden.clone())
            .collect();
        self.present.extend(revealed);
        Ok(())
    }

    fn settle(&mut self, delay: std::time::Duration) {
        self.settled_ms.push(delay.as_millis());
    }
}

impl InputSynthesizer for FakeDocument {
    fn dispatch(
        &mut self,
        phase: KeyPhase,
        input: &SyntheticInput,
        target: KeyTarget,
    ) -> Result<(), ProbeFault> {
        self.keys.push(KeyRecord {
            phase,
            target,
            input: input.clone(),
        });
        Ok(())
    }
}

impl ProbeContext for FakeDocument {
    fn run_builtin(&mut self, builtin: PageBuiltin) -> Result<(), ProbeFault> {
        self.builtins.push(builtin);
        Ok(())
    }
}
