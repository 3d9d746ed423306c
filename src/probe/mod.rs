//! The remote probe: the part of dispatch that runs inside the editor page.
//!
//! The host never looks at the page. It hands an [`ExecutionRequest`] to the
//! surface; everything that depends on the page's structure happens here,
//! against whatever [`ProbeContext`] the page offers. [`Probe::run`] is the
//! algorithm over those traits; [`script::ScriptedPage`] is the context for
//! pages reachable only through JavaScript evaluation.

pub mod script;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::action::Action;
use crate::catalog::{CatalogEntry, ElementLocator, PageBuiltin, SyntheticInput};

/// What crosses the trust boundary: one catalog entry, by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub action: Action,
    pub entry: CatalogEntry,
}

impl ExecutionRequest {
    pub fn new(action: Action, entry: &CatalogEntry) -> Self {
        Self {
            action,
            entry: entry.clone(),
        }
    }
}

/// Anything the page throws at the probe. Never leaves the probe.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ProbeFault(pub String);

/// Finds elements in the live page.
pub trait ElementFinder {
    type Handle;

    /// Resolve one locator. `Ok(None)` means "no element right now".
    fn resolve(&mut self, locator: &ElementLocator) -> Result<Option<Self::Handle>, ProbeFault>;

    /// Primary interaction on a resolved element (a click).
    fn activate(&mut self, handle: &Self::Handle) -> Result<(), ProbeFault>;

    /// Give the page `delay` to react before the next lookup.
    fn settle(&mut self, _delay: Duration) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPhase {
    Press,
    Release,
}

impl KeyPhase {
    pub fn event_type(self) -> &'static str {
        match self {
            KeyPhase::Press => "keydown",
            KeyPhase::Release => "keyup",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTarget {
    /// The element holding input focus, or the document root if none.
    Focused,
    /// The document root.
    Document,
}

/// Delivers synthetic keyboard events inside the page.
pub trait InputSynthesizer {
    fn dispatch(
        &mut self,
        phase: KeyPhase,
        input: &SyntheticInput,
        target: KeyTarget,
    ) -> Result<(), ProbeFault>;
}

/// Everything the probe needs from a page.
pub trait ProbeContext: ElementFinder + InputSynthesizer {
    fn run_builtin(&mut self, builtin: PageBuiltin) -> Result<(), ProbeFault>;
}

/// How a probe run ended. Only ever observed inside the page (and by tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Candidate at this index was activated.
    Activated { candidate: usize },
    /// The opener was activated and, after settling, this candidate was.
    Revealed { candidate: usize },
    /// No candidate matched; the fallback shortcut was synthesized.
    Synthesized,
    Builtin,
    /// Nothing matched and there was nothing to fall back to.
    NoEffect,
    /// The page raised an error that was swallowed.
    Absorbed,
}

pub struct Probe;

impl Probe {
    pub fn run<C: ProbeContext>(request: &ExecutionRequest, cx: &mut C) -> ProbeOutcome {
        let entry = &request.entry;
        let outcome = match run_entry(entry, cx) {
            Ok(outcome) => outcome,
            Err(fault) => {
                trace!(action = %request.action, %fault, "probe fault absorbed");
                ProbeOutcome::Absorbed
            }
        };

        for locators in &entry.also {
            let _ = activate_first(cx, locators);
        }

        trace!(action = %request.action, ?outcome, "probe finished");
        outcome
    }
}

fn run_entry<C: ProbeContext>(
    entry: &CatalogEntry,
    cx: &mut C,
) -> Result<ProbeOutcome, ProbeFault> {
    if let Some(builtin) = entry.builtin {
        cx.run_builtin(builtin)?;
        return Ok(ProbeOutcome::Builtin);
    }

    if let Some(candidate) = activate_first(cx, &entry.candidates)? {
        return Ok(ProbeOutcome::Activated { candidate });
    }

    if let Some(reveal) = &entry.reveal {
        if activate_first(cx, &reveal.opener)?.is_some() {
            cx.settle(Duration::from_millis(reveal.settle_ms));
            return Ok(match activate_first(cx, &entry.candidates)? {
                Some(candidate) => ProbeOutcome::Revealed { candidate },
                None => ProbeOutcome::NoEffect,
            });
        }
    }

    match &entry.fallback {
        Some(input) => {
            synthesize(cx, input);
            Ok(ProbeOutcome::Synthesized)
        }
        None => Ok(ProbeOutcome::NoEffect),
    }
}

/// First match wins. A locator the page refuses to evaluate counts as no
/// match.
fn activate_first<C: ProbeContext>(
    cx: &mut C,
    locators: &[ElementLocator],
) -> Result<Option<usize>, ProbeFault> {
    for (index, locator) in locators.iter().enumerate() {
        match cx.resolve(locator) {
            Ok(Some(handle)) => {
                cx.activate(&handle)?;
                return Ok(Some(index));
            }
            Ok(None) => {}
            Err(fault) => trace!(%locator, %fault, "locator rejected"),
        }
    }
    Ok(None)
}

/// Press and release on the focused element, then on the document root.
fn synthesize<C: ProbeContext>(cx: &mut C, input: &SyntheticInput) {
    for target in [KeyTarget::Focused, KeyTarget::Document] {
        for phase in [KeyPhase::Press, KeyPhase::Release] {
            if let Err(fault) = cx.dispatch(phase, input, target) {
                trace!(?phase, ?target, %fault, "synthetic key rejected");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Modifiers;

    /// Just enough of a page: a set of matching selectors and a log.
    #[derive(Default)]
    struct Page {
        present: Vec<&'static str>,
        broken: Vec<&'static str>,
        log: Vec<String>,
    }

    impl ElementFinder for Page {
        type Handle = String;

        fn resolve(&mut self, locator: &ElementLocator) -> Result<Option<String>, ProbeFault> {
            if self.broken.iter().any(|b| *b == locator.css()) {
                return Err(ProbeFault("SyntaxError".into()));
            }
            Ok(self
                .present
                .iter()
                .any(|p| *p == locator.css())
                .then(|| locator.css().to_string()))
        }

        fn activate(&mut self, handle: &String) -> Result<(), ProbeFault> {
            self.log.push(format!("click {handle}"));
            Ok(())
        }
    }

    impl InputSynthesizer for Page {
        fn dispatch(
            &mut self,
            phase: KeyPhase,
            input: &SyntheticInput,
            target: KeyTarget,
        ) -> Result<(), ProbeFault> {
            self.log
                .push(format!("{} {} {:?}", phase.event_type(), input.key, target));
            Ok(())
        }
    }

    impl ProbeContext for Page {
        fn run_builtin(&mut self, builtin: PageBuiltin) -> Result<(), ProbeFault> {
            self.log.push(format!("builtin {builtin:?}"));
            Ok(())
        }
    }

    fn request(entry: CatalogEntry) -> ExecutionRequest {
        ExecutionRequest::new(Action::SharePage, &entry)
    }

    #[test]
    fn broken_locator_is_skipped_not_fatal() {
        let mut page = Page {
            present: vec!["#b"],
            broken: vec!["#a:::"],
            ..Default::default()
        };
        let entry = CatalogEntry::new(vec![
            ElementLocator::new("#a:::"),
            ElementLocator::new("#b"),
        ]);
        assert_eq!(
            Probe::run(&request(entry), &mut page),
            ProbeOutcome::Activated { candidate: 1 }
        );
    }

    #[test]
    fn no_match_without_fallback_does_nothing() {
        let mut page = Page::default();
        let entry = CatalogEntry::new(vec![ElementLocator::new("#share")]);
        assert_eq!(Probe::run(&request(entry), &mut page), ProbeOutcome::NoEffect);
        assert!(page.log.is_empty());
    }

    #[test]
    fn reveal_opens_the_menu_then_retries() {
        let mut page = Page {
            present: vec!["#menu"],
            ..Default::default()
        };
        let entry = CatalogEntry::new(vec![ElementLocator::new("#export")])
            .reveal_via(vec![ElementLocator::new("#menu")])
            .with_fallback("x", Modifiers::meta());
        assert_eq!(Probe::run(&request(entry), &mut page), ProbeOutcome::NoEffect);
        assert_eq!(page.log, vec!["click #menu"]);
    }

    #[test]
    fn companions_run_after_the_main_entry() {
        let mut page = Page {
            present: vec!["#sidebar", "#comments"],
            ..Default::default()
        };
        let entry = CatalogEntry::new(vec![ElementLocator::new("#sidebar")])
            .also(vec![ElementLocator::new("#missing"), ElementLocator::new("#comments")]);
        Probe::run(&request(entry), &mut page);
        assert_eq!(page.log, vec!["click #sidebar", "click #comments"]);
    }

    #[test]
    fn builtin_runs_without_locators() {
        let mut page = Page::default();
        let entry = CatalogEntry::builtin(PageBuiltin::CopyLocation);
        assert_eq!(Probe::run(&request(entry), &mut page), ProbeOutcome::Builtin);
        assert_eq!(page.log, vec!["builtin CopyLocation"]);
    }
}
