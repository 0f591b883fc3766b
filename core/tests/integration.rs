//! Full CRUD lifecycle for the blocking client against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then exercises every blocking
//! operation over real HTTP. The mirror shares the server's store, so each
//! client observation is cross-checked against what the server actually
//! persisted.

use std::net::SocketAddr;
use std::time::Duration;

use dashku_core::{
    ClientConfig, Dashboard, DashkuError, DomainObject, ScreenWidth, SyncDashku, Widget,
};
use mock_server::Mirror;

const API_KEY: &str = "k1";
const USER_ID: &str = "u-1";

/// Boot the mock server on a random port and hand back its address and
/// mirror. The server thread lives for the rest of the test process.
fn start_server() -> (SocketAddr, Mirror) {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    let (router, mirror) = mock_server::seeded(&[(API_KEY, USER_ID)]);
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, router).await
        })
        .unwrap();
    });

    (addr, mirror)
}

fn client(addr: SocketAddr) -> SyncDashku {
    SyncDashku::new(ClientConfig::new(API_KEY, addr.ip().to_string(), addr.port()).unwrap())
}

#[test]
fn crud_lifecycle() {
    let (addr, mirror) = start_server();
    let client = client(addr);

    // Step 1: list — should be empty.
    let dashboards = client.get_dashboards().unwrap();
    assert!(dashboards.is_empty(), "expected empty list");

    // Step 2: create a dashboard. Server-assigned fields merge back in and
    // the dirty set clears.
    let mut dashboard = Dashboard::new();
    dashboard.set_name("ops");
    dashboard.set_css("body { background: #111; }");
    dashboard.set_screen_width(ScreenWidth::Fluid);
    assert_eq!(dashboard.dirty().len(), 3);

    client.create_dashboard(&mut dashboard).unwrap();
    let id = dashboard.id().expect("server assigned id").to_string();
    assert!(!id.is_empty());
    assert!(dashboard.dirty().is_empty(), "dirty set clears on create");
    assert_eq!(dashboard.name(), "ops");
    assert_eq!(dashboard.screen_width(), ScreenWidth::Fluid);
    assert_eq!(dashboard.user_id(), Some(USER_ID));
    assert!(dashboard.created_at().is_some());

    // Step 3: the mirror agrees with what the client observed.
    assert_eq!(mirror.get_dashboards().len(), 1);
    let persisted = mirror.get_dashboard(&id).unwrap();
    assert_eq!(persisted.name, "ops");
    assert_eq!(persisted.screen_width, "fluid");

    // Step 4: get returns the same object.
    let fetched = client.get_dashboard(&id).unwrap();
    assert_eq!(fetched, dashboard);

    // Step 5: mutate three fields and update; only the diff goes out, and
    // the dirty set clears on success.
    dashboard.set_name("spo");
    dashboard.set_css("body { background: #222; }");
    dashboard.set_screen_width(ScreenWidth::Fixed);
    assert_eq!(dashboard.dirty().len(), 3);

    client.update_dashboard(&mut dashboard).unwrap();
    assert!(dashboard.dirty().is_empty(), "dirty set clears on update");
    assert_eq!(dashboard.name(), "spo");

    let fetched = client.get_dashboard(&id).unwrap();
    assert_eq!(fetched.name(), "spo");
    assert_eq!(fetched.css(), "body { background: #222; }");
    assert_eq!(fetched.screen_width(), ScreenWidth::Fixed);
    assert_eq!(mirror.get_dashboard(&id).unwrap().name, "spo");

    // Step 6: updating with zero dirty fields sends an empty diff and
    // changes nothing.
    client.update_dashboard(&mut dashboard).unwrap();
    assert_eq!(client.get_dashboard(&id).unwrap().name(), "spo");

    // Step 7: widget lifecycle nested under the dashboard.
    let mut widget = Widget::new();
    widget.set_name("Big Number");
    widget.set_height(180);
    widget.set_width(200);
    widget.set_script_type("javascript");
    widget.set_html("<div id='bigNumber'></div>");

    client.create_widget(&id, &mut widget).unwrap();
    let widget_id = widget.id().expect("server assigned widget id").to_string();
    assert!(widget.dirty().is_empty());
    assert_eq!(widget.user_id(), Some(USER_ID));

    let fetched = client.get_dashboard(&id).unwrap();
    assert_eq!(fetched.widgets().len(), 1);
    assert_eq!(fetched.widgets()[0].name(), "Big Number");

    widget.set_height(400);
    client.update_widget(&id, &mut widget).unwrap();
    assert_eq!(widget.height(), 400);
    assert_eq!(widget.width(), 200, "untouched fields survive the diff");
    assert!(widget.dirty().is_empty());

    client.delete_widget(&id, &widget_id).unwrap();
    assert!(client.get_dashboard(&id).unwrap().widgets().is_empty());

    // Step 8: fire-and-forget transmission, recorded server-side.
    let payload = serde_json::json!({
        "amount": 30,
        "total": 100,
        "colours": {"amount": "#51FF00", "total": "#FF002B"}
    });
    client.transmit(&id, &payload).unwrap();
    let received = mirror.transmissions(&id);
    assert_eq!(received.len(), 1);
    assert_eq!(received[0], payload);

    // A non-object payload never reaches the wire.
    let err = client.transmit(&id, &serde_json::json!([1, 2])).unwrap_err();
    assert!(matches!(err, DashkuError::Encoding(_)));

    // Step 9: delete, then every read misses.
    client.delete_dashboard(&id).unwrap();
    let err = client.get_dashboard(&id).unwrap_err();
    assert!(matches!(err, DashkuError::NotFound));
    let err = client.delete_dashboard(&id).unwrap_err();
    assert!(matches!(err, DashkuError::NotFound));
    assert!(client.get_dashboards().unwrap().is_empty());
    assert!(mirror.get_dashboards().is_empty());
}

#[test]
fn unknown_api_key_is_surfaced_as_server_error() {
    let (addr, _mirror) = start_server();
    let client =
        SyncDashku::new(ClientConfig::new("wrong-key", addr.ip().to_string(), addr.port()).unwrap());

    let err = client.get_dashboards().unwrap_err();
    match err {
        DashkuError::Server { status, .. } => assert_eq!(status, 401),
        other => panic!("expected Server, got {other:?}"),
    }
}

#[test]
fn mirror_flush_clears_persisted_state() {
    let (addr, mirror) = start_server();
    let client = client(addr);

    let mut dashboard = Dashboard::new();
    dashboard.set_name("ephemeral");
    client.create_dashboard(&mut dashboard).unwrap();
    let id = dashboard.id().unwrap().to_string();

    mirror.flush();
    let err = client.get_dashboard(&id).unwrap_err();
    assert!(matches!(err, DashkuError::NotFound));
}

#[test]
fn zero_timeout_times_out_before_the_network() {
    let (addr, _mirror) = start_server();
    let mut client = client(addr);

    client.set_timeout(Duration::ZERO);
    let err = client.get_dashboards().unwrap_err();
    assert!(matches!(err, DashkuError::Timeout));

    // Restoring the timeout restores service.
    client.set_timeout(Duration::from_millis(2000));
    assert!(client.get_dashboards().is_ok());
}
