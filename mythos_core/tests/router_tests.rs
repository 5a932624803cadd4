//! Integration tests for the fragment router

use mythos_core::router::{RouteName, views};
use mythos_core::{
    AuthHandle, CacheManager, Location, MemoryLocation, RouteOutcome, Router, RouterConfig, User,
    ViewMode, auth_channel,
};
use mythos_test_utils::{MockDocumentStore, RecordingOutlet, RecordingRenderer, seed_pantheon};
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    store: MockDocumentStore,
    renderer: RecordingRenderer,
    outlet: RecordingOutlet,
    location: Arc<MemoryLocation>,
    auth: AuthHandle,
    router: Arc<Router>,
}

fn fixture_with(config: RouterConfig) -> Fixture {
    let store = MockDocumentStore::new();
    seed_pantheon(&store);
    let cache = Arc::new(CacheManager::in_memory(Arc::new(store.clone())));
    let renderer = RecordingRenderer::new();
    let outlet = RecordingOutlet::new();
    let location = Arc::new(MemoryLocation::new());
    let (auth, signal) = auth_channel();

    let router = Router::new(
        cache,
        Arc::new(renderer.clone()),
        Arc::new(outlet.clone()),
        location.clone(),
        signal,
        config,
    )
    .unwrap();

    Fixture {
        store,
        renderer,
        outlet,
        location,
        auth,
        router: Arc::new(router),
    }
}

/// Router with auth already resolved as anonymous
fn fixture() -> Fixture {
    let f = fixture_with(RouterConfig::default());
    f.auth.resolve(None);
    f
}

async fn visit(f: &Fixture, path: &str) -> RouteOutcome {
    f.router.navigate(path);
    f.router.handle_route().await
}

async fn wait_for_mount(outlet: &RecordingOutlet, expected: &str) {
    for _ in 0..200 {
        if outlet.current().as_deref() == Some(expected) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("outlet never showed {expected:?}, last was {:?}", outlet.current());
}

#[tokio::test]
async fn test_handle_route_deferred_until_auth_resolves() {
    let f = fixture_with(RouterConfig::default());
    f.router.navigate("/mythology/greek");

    assert_eq!(f.router.handle_route().await, RouteOutcome::Deferred);
    assert_eq!(f.renderer.call_count(), 0);
    assert_eq!(f.outlet.mount_count(), 0);

    f.auth.resolve(None);
    assert_eq!(
        f.router.on_auth_changed().await,
        RouteOutcome::Rendered(RouteName::Mythology)
    );
    assert_eq!(f.renderer.call_count(), 1);
}

#[tokio::test]
async fn test_run_handles_deferred_route_exactly_once() {
    let f = fixture_with(RouterConfig::default());
    let runner = {
        let router = f.router.clone();
        tokio::spawn(async move { router.run().await })
    };

    f.router.navigate("/mythology/norse");
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(f.renderer.call_count(), 0);

    f.auth.resolve(None);
    wait_for_mount(&f.outlet, "<detail>Norse</detail>").await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(f.renderer.call_count(), 1);

    runner.abort();
}

#[tokio::test]
async fn test_run_follows_location_changes() {
    let f = fixture();
    let runner = {
        let router = f.router.clone();
        tokio::spawn(async move { router.run().await })
    };

    wait_for_mount(&f.outlet, "<grid>Greek,Norse</grid>").await;

    f.router.navigate("/mythology/greek/deities/zeus");
    wait_for_mount(&f.outlet, "<detail>Zeus</detail>").await;

    assert!(f.router.go_back());
    wait_for_mount(&f.outlet, "<grid>Greek,Norse</grid>").await;

    runner.abort();
}

#[tokio::test]
async fn test_run_rehandles_route_on_sign_in() {
    let f = fixture_with(RouterConfig {
        require_login: true,
        ..RouterConfig::default()
    });
    f.router.navigate("/mythology/greek");
    f.auth.resolve(None);

    let runner = {
        let router = f.router.clone();
        tokio::spawn(async move { router.run().await })
    };
    wait_for_mount(&f.outlet, &views::login_required()).await;

    f.auth.sign_in(User::new("u1"));
    wait_for_mount(&f.outlet, "<detail>Greek</detail>").await;

    runner.abort();
}

#[tokio::test]
async fn test_run_sign_out_during_first_load_hides_protected_content() {
    let f = fixture_with(RouterConfig {
        require_login: true,
        ..RouterConfig::default()
    });
    f.store.set_delay(Duration::from_millis(200));
    f.router.navigate("/mythology/greek");
    f.auth.resolve(Some(User::new("u1")));

    let runner = {
        let router = f.router.clone();
        tokio::spawn(async move { router.run().await })
    };
    wait_for_mount(&f.outlet, &views::loading()).await;

    f.auth.sign_out();
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(f.outlet.current(), Some(views::login_required()));

    runner.abort();
}

#[tokio::test]
async fn test_home_variants_render_mythology_index() {
    let f = fixture();

    for path in ["", "/", "#", "#/"] {
        let outcome = visit(&f, path).await;
        assert_eq!(outcome, RouteOutcome::Rendered(RouteName::Home), "{path:?}");
    }

    let call = f.renderer.calls().pop().unwrap();
    assert_eq!(call.mode, ViewMode::Grid);
    assert_eq!(call.entities.len(), 2);
    // Index list fetched once, then served from cache
    assert_eq!(f.store.list_fetches(), 1);
}

#[tokio::test]
async fn test_entity_route_renders_detail() {
    let f = fixture();

    let outcome = visit(&f, "/mythology/greek/deities/zeus").await;
    assert_eq!(outcome, RouteOutcome::Rendered(RouteName::Entity));

    assert_eq!(
        f.outlet.mounted(),
        vec![views::loading(), "<detail>Zeus</detail>".to_string()]
    );
    let history = f.router.get_history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].path, "#/mythology/greek/deities/zeus");

    let current = f.router.current_route().unwrap();
    assert_eq!(current.values(), vec!["greek", "deities", "zeus"]);
}

#[tokio::test]
async fn test_entity_from_other_mythology_is_not_found() {
    let f = fixture();

    let outcome = visit(&f, "/mythology/norse/deities/zeus").await;
    assert_eq!(outcome, RouteOutcome::NotFound);
    assert_eq!(
        f.outlet.current().unwrap(),
        views::not_found("#/mythology/norse/deities/zeus")
    );
    assert!(f.router.get_history().is_empty());
}

#[tokio::test]
async fn test_missing_entity_is_not_found() {
    let f = fixture();
    assert_eq!(
        visit(&f, "/mythology/greek/deities/prometheus").await,
        RouteOutcome::NotFound
    );
    assert_eq!(f.renderer.call_count(), 0);
}

#[tokio::test]
async fn test_unmatched_fragment_renders_404_without_loading() {
    let f = fixture();

    assert_eq!(visit(&f, "/pantheon/greek").await, RouteOutcome::NotFound);
    assert_eq!(f.outlet.mounted(), vec![views::not_found("#/pantheon/greek")]);
    assert_eq!(f.store.fetch_count(), 0);
    assert!(f.router.get_history().is_empty());
}

#[tokio::test]
async fn test_category_route_renders_grid_of_mythology_members() {
    let f = fixture();

    let outcome = visit(&f, "/mythology/norse/deities").await;
    assert_eq!(outcome, RouteOutcome::Rendered(RouteName::Category));
    assert_eq!(f.outlet.current().unwrap(), "<grid>Odin,Thor</grid>");
}

#[tokio::test]
async fn test_search_matches_name_case_insensitively() {
    let f = fixture();

    let outcome = visit(&f, "/search?q=TH&collection=deities").await;
    assert_eq!(outcome, RouteOutcome::Rendered(RouteName::Search));
    assert_eq!(f.outlet.current().unwrap(), "<list>Thor</list>");
}

#[tokio::test]
async fn test_search_uses_default_collection_and_field_filters() {
    let f = fixture();

    visit(&f, "/search?mythology=greek").await;
    assert_eq!(f.outlet.current().unwrap(), "<list>Hera,Zeus</list>");

    visit(&f, "/search?collection=creatures&q=fen").await;
    assert_eq!(f.outlet.current().unwrap(), "<list>Fenrir</list>");
}

#[tokio::test]
async fn test_transport_failure_renders_error_view() {
    let f = fixture();
    f.store.fail_with("store unreachable");

    let outcome = visit(&f, "/mythology/greek").await;
    let RouteOutcome::Failed(message) = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert!(message.contains("store unreachable"));
    assert!(f.outlet.current().unwrap().contains("store unreachable"));
    assert!(f.router.get_history().is_empty());
}

#[tokio::test]
async fn test_render_failure_renders_error_view() {
    let f = fixture();
    f.renderer.fail_with("template exploded");

    let outcome = visit(&f, "/mythology/greek").await;
    assert!(matches!(outcome, RouteOutcome::Failed(ref m) if m.contains("template exploded")));
    assert!(f.outlet.current().unwrap().contains("view-error"));
}

#[tokio::test]
async fn test_protected_routes_require_login() {
    let f = fixture_with(RouterConfig {
        require_login: true,
        ..RouterConfig::default()
    });
    f.auth.resolve(None);

    assert_eq!(
        visit(&f, "/mythology/greek").await,
        RouteOutcome::LoginRequired
    );
    assert_eq!(f.outlet.current().unwrap(), views::login_required());
    assert_eq!(f.store.fetch_count(), 0);

    assert_eq!(visit(&f, "/").await, RouteOutcome::Rendered(RouteName::Home));

    f.auth.sign_in(User::new("u1"));
    assert_eq!(
        visit(&f, "/mythology/greek").await,
        RouteOutcome::Rendered(RouteName::Mythology)
    );
}

#[tokio::test]
async fn test_history_is_bounded_to_most_recent() {
    let f = fixture_with(RouterConfig {
        max_history: 3,
        ..RouterConfig::default()
    });
    f.auth.resolve(None);

    let paths = [
        "/mythology/greek",
        "/mythology/norse",
        "/mythology/greek/deities",
        "/mythology/norse/deities",
        "/mythology/greek/creatures",
        "/mythology/norse/creatures",
        "/mythology/greek/deities/zeus",
        "/mythology/norse/deities/odin",
    ];
    for path in paths {
        visit(&f, path).await;
    }

    let history: Vec<String> = f.router.get_history().into_iter().map(|e| e.path).collect();
    assert_eq!(
        history,
        vec![
            "#/mythology/norse/creatures",
            "#/mythology/greek/deities/zeus",
            "#/mythology/norse/deities/odin",
        ]
    );
}

#[tokio::test]
async fn test_latest_navigation_wins() {
    let f = fixture();
    f.store
        .set_document_delay("deities", "zeus", Duration::from_millis(100));

    f.router.navigate("/mythology/greek/deities/zeus");
    let slow = {
        let router = f.router.clone();
        tokio::spawn(async move { router.handle_route().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    let outcome = visit(&f, "/mythology/norse/deities/odin").await;
    assert_eq!(outcome, RouteOutcome::Rendered(RouteName::Entity));

    assert_eq!(slow.await.unwrap(), RouteOutcome::Superseded);
    assert_eq!(f.outlet.current().unwrap(), "<detail>Odin</detail>");
    let history = f.router.get_history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].path, "#/mythology/norse/deities/odin");
}

#[tokio::test]
async fn test_without_navigation_token_late_render_overwrites() {
    let f = fixture_with(RouterConfig {
        latest_navigation_wins: false,
        ..RouterConfig::default()
    });
    f.auth.resolve(None);
    f.store
        .set_document_delay("deities", "zeus", Duration::from_millis(100));

    f.router.navigate("/mythology/greek/deities/zeus");
    let slow = {
        let router = f.router.clone();
        tokio::spawn(async move { router.handle_route().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    visit(&f, "/mythology/norse/deities/odin").await;

    assert_eq!(
        slow.await.unwrap(),
        RouteOutcome::Rendered(RouteName::Entity)
    );
    assert_eq!(f.outlet.current().unwrap(), "<detail>Zeus</detail>");
}

#[tokio::test]
async fn test_go_back_delegates_to_location() {
    let f = fixture();
    f.router.navigate("/mythology/greek");
    f.router.navigate("/search");

    assert!(f.router.go_back());
    assert_eq!(f.location.fragment(), "#/mythology/greek");
    // Observational history is untouched
    assert!(f.router.get_history().is_empty());
}

#[tokio::test]
async fn test_navigate_normalizes_fragment() {
    let f = fixture();
    f.router.navigate("/search");
    assert_eq!(f.location.fragment(), "#/search");
    f.router.navigate("#/mythology/greek");
    assert_eq!(f.location.fragment(), "#/mythology/greek");
}

#[tokio::test]
async fn test_render_home_uses_single_list_call() {
    let f = fixture();
    let markup = f.router.render_home().await.unwrap();
    assert_eq!(markup, "<grid>Greek,Norse</grid>");
    assert_eq!(f.store.list_fetches(), 1);
    assert_eq!(f.store.document_fetches(), 0);
}
