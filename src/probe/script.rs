//! A [`ProbeContext`] for pages that can only evaluate JavaScript.
//!
//! Each step of a run becomes one small self-contained expression: a lookup,
//! a click, one keyboard event or the clipboard builtin. Nothing is left
//! behind on `window` between steps, so a navigation mid-run only makes
//! later lookups miss.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::catalog::{ElementLocator, PageBuiltin, SyntheticInput};
use crate::probe::{
    ElementFinder, InputSynthesizer, KeyPhase, KeyTarget, ProbeContext, ProbeFault,
};

/// `true` when the selector matches, `false` when it does not, the error
/// message when the page rejects it.
const LOOKUP_FN: &str = "(function (selector) { \
try { return document.querySelector(selector) !== null; } \
catch (e) { return String((e && e.message) || e); } })";

/// `true` once clicked, `false` if the element is gone.
const CLICK_FN: &str = "(function (selector) { \
var el = document.querySelector(selector); \
if (!el) return false; el.click(); return true; })";

const KEY_FN: &str = "(function (type, init, focused) { \
var target = focused ? (document.activeElement || document) : document; \
target.dispatchEvent(new KeyboardEvent(type, init)); return true; })";

const COPY_LOCATION_FN: &str = "(function () { \
navigator.clipboard.writeText(window.location.href).catch(function () {}); \
return true; })";

/// Runs one expression in the page and hands back its value.
pub trait PageEvaluator {
    fn evaluate(&mut self, source: &str) -> Result<Value, ProbeFault>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KeyEventInit<'a> {
    key: &'a str,
    code: String,
    key_code: u32,
    which: u32,
    ctrl_key: bool,
    meta_key: bool,
    shift_key: bool,
    alt_key: bool,
    bubbles: bool,
    cancelable: bool,
}

impl<'a> KeyEventInit<'a> {
    fn new(input: &'a SyntheticInput) -> Self {
        let key_code = key_code(&input.key);
        Self {
            key: &input.key,
            code: physical_code(&input.key),
            key_code,
            which: key_code,
            ctrl_key: input.modifiers.ctrl,
            meta_key: input.modifiers.meta,
            shift_key: input.modifiers.shift,
            alt_key: input.modifiers.alt,
            bubbles: true,
            cancelable: true,
        }
    }
}

fn key_code(key: &str) -> u32 {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => c.to_ascii_uppercase() as u32,
        _ => 0,
    }
}

/// `KeyboardEvent.code` for the US layout key producing `key`.
fn physical_code(key: &str) -> String {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => format!("Key{}", c.to_ascii_uppercase()),
        (Some(c), None) if c.is_ascii_digit() => format!("Digit{c}"),
        (Some('\\'), None) => "Backslash".to_string(),
        _ => key.to_string(),
    }
}

fn call(function: &str, args: &[Value]) -> String {
    let rendered: Vec<String> = args.iter().map(Value::to_string).collect();
    format!("{function}({})", rendered.join(","))
}

/// A page driven one evaluated expression at a time.
pub struct ScriptedPage<E> {
    evaluator: E,
}

impl<E: PageEvaluator> ScriptedPage<E> {
    pub fn new(evaluator: E) -> Self {
        Self { evaluator }
    }

    pub fn into_inner(self) -> E {
        self.evaluator
    }
}

impl<E: PageEvaluator> ElementFinder for ScriptedPage<E> {
    type Handle = ElementLocator;

    fn resolve(&mut self, locator: &ElementLocator) -> Result<Option<ElementLocator>, ProbeFault> {
        let source = call(LOOKUP_FN, &[Value::from(locator.css())]);
        match self.evaluator.evaluate(&source)? {
            Value::Bool(true) => Ok(Some(locator.clone())),
            Value::Bool(false) | Value::Null => Ok(None),
            Value::String(reason) => Err(ProbeFault(reason)),
            other => Err(ProbeFault(format!("unexpected lookup result {other}"))),
        }
    }

    fn activate(&mut self, handle: &ElementLocator) -> Result<(), ProbeFault> {
        let source = call(CLICK_FN, &[Value::from(handle.css())]);
        match self.evaluator.evaluate(&source)? {
            Value::Bool(true) => Ok(()),
            _ => Err(ProbeFault(format!("{handle} disappeared before the click"))),
        }
    }

    fn settle(&mut self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

impl<E: PageEvaluator> InputSynthesizer for ScriptedPage<E> {
    fn dispatch(
        &mut self,
        phase: KeyPhase,
        input: &SyntheticInput,
        target: KeyTarget,
    ) -> Result<(), ProbeFault> {
        let init = serde_json::to_value(KeyEventInit::new(input))
            .map_err(|e| ProbeFault(e.to_string()))?;
        let source = call(
            KEY_FN,
            &[
                Value::from(phase.event_type()),
                init,
                Value::Bool(target == KeyTarget::Focused),
            ],
        );
        self.evaluator.evaluate(&source).map(|_| ())
    }
}

impl<E: PageEvaluator> ProbeContext for ScriptedPage<E> {
    fn run_builtin(&mut self, builtin: PageBuiltin) -> Result<(), ProbeFault> {
        match builtin {
            PageBuiltin::CopyLocation => self.evaluator.evaluate(&call(COPY_LOCATION_FN, &[]))?,
        };
        Ok(())
    }
}
