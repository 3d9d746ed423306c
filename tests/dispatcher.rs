mod support;

use std::sync::Arc;

use docmost_shell::action::Action;
use docmost_shell::catalog::{Catalog, CatalogProfile};
use docmost_shell::dispatcher::{DispatchEvent, Dispatcher, HostCommand};
use docmost_shell::surface::SurfaceState;
use support::{RecordingFactory, RecordingSurface, SurfaceCall};

const BASE: &str = "https://work.example.com/";

fn dispatcher_with(surface: RecordingSurface, profile: CatalogProfile) -> Dispatcher {
    let mut dispatcher = Dispatcher::new(Arc::new(Catalog::for_profile(profile)), BASE);
    dispatcher.attach(Box::new(surface));
    dispatcher
}

#[test]
fn zoom_in_clamps_at_maximum() {
    let (mut surface, log) = RecordingSurface::new();
    surface.zoom = 2.95;
    let mut dispatcher = dispatcher_with(surface, CatalogProfile::Classic);

    dispatcher.dispatch("zoomIn");
    dispatcher.dispatch("zoomIn");

    assert_eq!(
        *log.lock().unwrap(),
        vec![SurfaceCall::SetZoom(3.0), SurfaceCall::SetZoom(3.0)]
    );
}

#[test]
fn zoom_out_clamps_at_minimum_and_reset_restores() {
    let (mut surface, log) = RecordingSurface::new();
    surface.zoom = 0.35;
    let mut dispatcher = dispatcher_with(surface, CatalogProfile::Classic);

    dispatcher.dispatch("zoomOut");
    dispatcher.dispatch("zoomReset");

    assert_eq!(
        *log.lock().unwrap(),
        vec![SurfaceCall::SetZoom(0.3), SurfaceCall::SetZoom(1.0)]
    );
}

#[test]
fn go_back_only_when_history_allows() {
    let (surface, log) = RecordingSurface::new();
    let mut dispatcher = dispatcher_with(surface, CatalogProfile::Classic);
    dispatcher.dispatch("goBack");
    dispatcher.dispatch("goForward");
    assert!(log.lock().unwrap().is_empty());

    let (mut surface, log) = RecordingSurface::new();
    surface.back = true;
    let mut dispatcher = dispatcher_with(surface, CatalogProfile::Classic);
    dispatcher.dispatch("goBack");
    assert_eq!(*log.lock().unwrap(), vec![SurfaceCall::GoBack]);
}

#[test]
fn go_home_loads_the_base_url() {
    let (surface, log) = RecordingSurface::new();
    let mut dispatcher = dispatcher_with(surface, CatalogProfile::Classic);
    dispatcher.dispatch("goHome");
    assert_eq!(
        *log.lock().unwrap(),
        vec![SurfaceCall::LoadUrl(BASE.to_string())]
    );
}

#[test]
fn devtools_toggles() {
    let (surface, log) = RecordingSurface::new();
    let mut dispatcher = dispatcher_with(surface, CatalogProfile::Classic);
    dispatcher.dispatch("toggleDevTools");
    dispatcher.dispatch("toggleDevTools");
    assert_eq!(
        *log.lock().unwrap(),
        vec![SurfaceCall::OpenDevTools, SurfaceCall::CloseDevTools]
    );
}

#[test]
fn direct_controls_never_reach_the_probe() {
    let (surface, log) = RecordingSurface::new();
    let mut dispatcher = dispatcher_with(surface, CatalogProfile::Classic);
    for action in Action::ALL.iter().filter(|a| a.is_direct_control()) {
        dispatcher.dispatch_action(*action);
    }
    assert!(
        !log.lock()
            .unwrap()
            .iter()
            .any(|call| matches!(call, SurfaceCall::Probe(_)))
    );
}

#[test]
fn probe_request_carries_the_catalog_entry() {
    let (surface, log) = RecordingSurface::new();
    let catalog = Catalog::editor();
    let expected = catalog.entry_for(Action::Bold).unwrap().clone();
    let mut dispatcher = dispatcher_with(surface, CatalogProfile::Editor);
    let mut events = dispatcher.subscribe();

    dispatcher.dispatch("bold");

    let calls = log.lock().unwrap();
    let [SurfaceCall::Probe(request)] = calls.as_slice() else {
        panic!("expected one probe request, got {calls:?}");
    };
    assert_eq!(request.action, Action::Bold);
    assert_eq!(request.entry, expected);
    assert_eq!(
        events.try_recv().unwrap(),
        DispatchEvent::ProbeSent {
            action: Action::Bold,
            state: SurfaceState::Ready
        }
    );
}

#[test]
fn action_outside_the_profile_is_ignored() {
    let (surface, log) = RecordingSurface::new();
    let mut dispatcher = dispatcher_with(surface, CatalogProfile::Classic);
    let mut events = dispatcher.subscribe();

    dispatcher.dispatch("bold");

    assert!(log.lock().unwrap().is_empty());
    assert_eq!(
        events.try_recv().unwrap(),
        DispatchEvent::NotInCatalog {
            action: Action::Bold
        }
    );
}

#[test]
fn unknown_and_surfaceless_dispatch_is_quiet() {
    let mut dispatcher = Dispatcher::new(Arc::new(Catalog::classic()), BASE);
    dispatcher.dispatch("definitelyNotAnAction");
    dispatcher.dispatch("reload");
    dispatcher.dispatch("newPage");
    assert_eq!(dispatcher.surface_state(), SurfaceState::Absent);
}

#[test]
fn loading_surface_still_receives_actions() {
    let (mut surface, log) = RecordingSurface::new();
    surface.state = SurfaceState::Loading;
    let mut dispatcher = dispatcher_with(surface, CatalogProfile::Classic);
    dispatcher.dispatch("reload");
    assert_eq!(*log.lock().unwrap(), vec![SurfaceCall::Reload]);
}

#[test]
fn surface_failure_becomes_an_event() {
    let (mut surface, _log) = RecordingSurface::new();
    surface.fail_probe = true;
    let mut dispatcher = dispatcher_with(surface, CatalogProfile::Classic);
    let mut events = dispatcher.subscribe();

    dispatcher.dispatch("quickSearch");

    assert!(matches!(
        events.try_recv().unwrap(),
        DispatchEvent::SurfaceFailed {
            action: Some(Action::QuickSearch),
            ..
        }
    ));
}

#[test]
fn new_base_url_replaces_the_surface() {
    let factory = RecordingFactory::default();
    let opened = factory.opened.clone();
    let logs = factory.logs.clone();
    let (old, old_log) = RecordingSurface::new();

    let mut dispatcher =
        Dispatcher::new(Arc::new(Catalog::classic()), BASE).with_factory(Box::new(factory));
    dispatcher.attach(Box::new(old));
    let mut events = dispatcher.subscribe();

    let next = "https://other.example.com/";
    assert!(
        dispatcher
            .handle(HostCommand::SetBaseUrl(next.to_string()))
            .is_continue()
    );
    dispatcher.dispatch("goHome");

    assert_eq!(*opened.lock().unwrap(), vec![next.to_string()]);
    assert!(old_log.lock().unwrap().is_empty());
    let logs = logs.lock().unwrap();
    assert_eq!(
        *logs[0].lock().unwrap(),
        vec![SurfaceCall::LoadUrl(next.to_string())]
    );
    assert_eq!(dispatcher.base_url(), next);
    assert_eq!(
        events.try_recv().unwrap(),
        DispatchEvent::SurfaceReplaced {
            url: next.to_string()
        }
    );
}

#[test]
fn new_base_url_without_factory_navigates_in_place() {
    let (surface, log) = RecordingSurface::new();
    let mut dispatcher = dispatcher_with(surface, CatalogProfile::Classic);
    dispatcher.set_base_url("https://other.example.com/".to_string());
    assert_eq!(
        *log.lock().unwrap(),
        vec![SurfaceCall::LoadUrl("https://other.example.com/".to_string())]
    );
}
