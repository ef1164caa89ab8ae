use std::sync::Arc;

use serde_json::json;
use sppg_core::AppError;
use sppg_domain::{
    ColumnSpec, EndpointStrategy, EntitySchema, EntitySchemaInput, FilterSpec, FilterValue,
};

use super::{FetchOutcome, ListController, ListMachine, ListPhase};
use crate::catalog::sppg_registry;
use crate::test_support::{FakeGateway, FixedTokenProvider, page, signed_in};

fn distribution_schema() -> Arc<EntitySchema> {
    let mut input = EntitySchemaInput::new("distributions", "Distribusi", "/admin/distributions");
    input.list_endpoints = vec![
        EndpointStrategy::new("primary", "/admin/distributions")
            .unwrap_or_else(|_| unreachable!()),
        EndpointStrategy::new("legacy", "/distributions").unwrap_or_else(|_| unreachable!()),
    ];
    input.columns = vec![ColumnSpec::text("school", "Sekolah").unwrap_or_else(|_| unreachable!())];
    input.filters = vec![
        FilterSpec::select("region", "Wilayah", Vec::new()).unwrap_or_else(|_| unreachable!()),
        FilterSpec::select("status", "Status", Vec::new()).unwrap_or_else(|_| unreachable!()),
    ];
    input.page_size = 2;
    Arc::new(EntitySchema::new(input).unwrap_or_else(|_| unreachable!()))
}

fn five_rows() -> Vec<serde_json::Value> {
    (1..=5)
        .map(|id| json!({"id": id, "school": format!("SDN {id}")}))
        .collect()
}

#[tokio::test]
async fn mount_loads_the_first_page() {
    let gateway = FakeGateway::new();
    gateway
        .push_list(Ok(page(
            vec![json!({"id": 1}), json!({"id": 2})],
            Some(4),
        )))
        .await;
    let controller = ListController::new(distribution_schema(), gateway.clone(), signed_in());

    let state = controller.mount().await.unwrap_or_else(|_| unreachable!());
    assert_eq!(state.phase(), ListPhase::Ready);
    assert_eq!(state.rows().len(), 2);
    assert_eq!(state.total_count(), Some(4));
    assert!(!state.is_exhausted());

    let requests = gateway.list_requests.lock().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/admin/distributions");
    assert_eq!(
        requests[0].query,
        vec![
            ("page".to_owned(), "1".to_owned()),
            ("limit".to_owned(), "2".to_owned())
        ]
    );
    assert_eq!(requests[0].token.as_str(), "token-admin");
}

#[tokio::test]
async fn superseded_filter_response_is_discarded() {
    let gateway = FakeGateway::new();
    gateway.push_list(Ok(page(vec![json!({"id": 0})], None))).await;
    gateway
        .push_list(Ok(page(vec![json!({"id": 1, "region": "a"})], None)))
        .await;
    gateway
        .push_list(Ok(page(vec![json!({"id": 2, "region": "b"})], None)))
        .await;
    let controller = ListController::new(distribution_schema(), gateway.clone(), signed_in());
    assert!(controller.mount().await.is_ok());

    let slow_gate = gateway.gate("a").await;
    let slow = controller.set_filter("region", Some(FilterValue::exact("a")));
    let fast = async {
        let result = controller
            .set_filter("region", Some(FilterValue::exact("b")))
            .await;
        slow_gate.notify_one();
        result
    };
    let (slow_result, fast_result) = tokio::join!(slow, fast);
    assert!(slow_result.is_ok());
    assert!(fast_result.is_ok());

    let state = controller.snapshot().await;
    assert_eq!(state.phase(), ListPhase::Ready);
    assert_eq!(state.rows().len(), 1);
    assert_eq!(state.rows()[0].get("region"), Some(&json!("b")));
    assert_eq!(
        state.query().active_filters.get("region"),
        Some(&FilterValue::exact("b"))
    );
}

#[test]
fn machine_applies_only_the_latest_sequence() {
    let mut machine = ListMachine::new(distribution_schema());
    let mount = machine
        .begin_mount()
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!());
    assert_eq!(
        machine.on_fetch_success(mount.seq, page(vec![json!({"id": 0})], None)),
        FetchOutcome::Applied
    );

    let first = machine
        .begin_set_filter("region", Some(FilterValue::exact("a")))
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!());
    let second = machine
        .begin_set_filter("region", Some(FilterValue::exact("b")))
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!());
    assert!(second.seq > first.seq);
    assert_eq!(machine.state().phase(), ListPhase::Loading);
    assert_eq!(machine.state().rows().len(), 1);

    assert_eq!(
        machine.on_fetch_success(second.seq, page(vec![json!({"region": "b"})], None)),
        FetchOutcome::Applied
    );
    assert_eq!(
        machine.on_fetch_success(first.seq, page(vec![json!({"region": "a"})], None)),
        FetchOutcome::Stale
    );
    assert_eq!(
        machine.on_fetch_failure(first.seq, AppError::Network("late".to_owned())),
        FetchOutcome::Stale
    );
    assert_eq!(machine.state().rows()[0].get("region"), Some(&json!("b")));
    assert!(machine.state().error().is_none());
}

#[tokio::test]
async fn removing_filters_keeps_search_and_restarts_at_page_one() {
    let gateway = FakeGateway::new();
    let first_page = || page(vec![json!({"id": 1}), json!({"id": 2})], Some(6));
    for _ in 0..4 {
        gateway.push_list(Ok(first_page())).await;
    }
    gateway
        .push_list(Ok(page(vec![json!({"id": 3}), json!({"id": 4})], Some(6))))
        .await;
    gateway.push_list(Ok(first_page())).await;
    gateway.push_list(Ok(first_page())).await;
    let controller = ListController::new(distribution_schema(), gateway.clone(), signed_in());

    assert!(controller.mount().await.is_ok());
    assert!(
        controller
            .set_filter("region", Some(FilterValue::exact("a")))
            .await
            .is_ok()
    );
    assert!(
        controller
            .set_filter("status", Some(FilterValue::exact("open")))
            .await
            .is_ok()
    );
    assert!(controller.set_search("budi").await.is_ok());
    let more = controller.load_more().await.unwrap_or_else(|_| unreachable!());
    assert_eq!(more.query().page.page, 2);

    let state = controller
        .set_filter("region", None)
        .await
        .unwrap_or_else(|_| unreachable!());
    let keys: Vec<&str> = state.query().active_filters.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["status"]);
    assert_eq!(state.query().search_text.as_deref(), Some("budi"));
    assert_eq!(state.query().page.page, 1);
    assert_eq!(state.rows().len(), 2);

    let state = controller
        .clear_filters()
        .await
        .unwrap_or_else(|_| unreachable!());
    assert!(state.query().active_filters.is_empty());
    assert_eq!(state.query().search_text.as_deref(), Some("budi"));
    assert_eq!(state.phase(), ListPhase::Ready);

    let requests = gateway.list_requests.lock().await;
    assert_eq!(requests.len(), 7);
    assert_eq!(
        requests[5].query,
        vec![
            ("search".to_owned(), "budi".to_owned()),
            ("status".to_owned(), "open".to_owned()),
            ("page".to_owned(), "1".to_owned()),
            ("limit".to_owned(), "2".to_owned())
        ]
    );
    assert_eq!(
        requests[6].query,
        vec![
            ("search".to_owned(), "budi".to_owned()),
            ("page".to_owned(), "1".to_owned()),
            ("limit".to_owned(), "2".to_owned())
        ]
    );
}

#[test]
fn clearing_an_undeclared_filter_is_rejected() {
    let mut machine = ListMachine::new(distribution_schema());
    assert!(matches!(
        machine.begin_set_filter("owner", None),
        Err(AppError::Validation(_))
    ));
    assert!(!machine.has_pending_fetch());
}

#[test]
fn refresh_moves_ready_to_refreshing_and_keeps_rows() {
    let mut machine = ListMachine::new(distribution_schema());
    assert!(machine.begin_refresh().is_none());

    let mount = machine
        .begin_mount()
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!());
    assert_eq!(machine.state().phase(), ListPhase::Loading);
    machine.on_fetch_success(mount.seq, page(five_rows(), Some(5)));

    let refresh = machine.begin_refresh().unwrap_or_else(|| unreachable!());
    assert_eq!(refresh.query.page.page, 1);
    assert_eq!(machine.state().phase(), ListPhase::Refreshing);
    assert!(machine.state().is_refreshing());
    assert!(!machine.state().is_loading());
    assert_eq!(machine.state().rows().len(), 5);

    assert_eq!(
        machine.on_fetch_success(refresh.seq, page(five_rows(), Some(5))),
        FetchOutcome::Applied
    );
    assert_eq!(machine.state().phase(), ListPhase::Ready);
}

#[tokio::test]
async fn failed_refresh_keeps_existing_rows() {
    let gateway = FakeGateway::new();
    gateway.push_list(Ok(page(five_rows(), Some(5)))).await;
    let controller = ListController::new(distribution_schema(), gateway.clone(), signed_in());
    assert!(controller.mount().await.is_ok());

    let server_error = AppError::Server {
        status: Some(500),
        message: Some("database unavailable".to_owned()),
    };
    gateway.fail_path("/admin/distributions", server_error.clone()).await;
    gateway.fail_path("/distributions", server_error.clone()).await;

    let result = controller.refresh().await;
    assert_eq!(result.err(), Some(server_error.clone()));

    let state = controller.snapshot().await;
    assert_eq!(state.phase(), ListPhase::Error);
    assert_eq!(state.rows().len(), 5);
    assert_eq!(state.error(), Some(&server_error));
}

#[tokio::test]
async fn local_fallback_search_without_matches_is_empty_and_ready() {
    let registry = sppg_registry().unwrap_or_else(|_| unreachable!());
    let gateway = FakeGateway::new();
    let rows = vec![
        json!({"id": 1, "name": "SDN 1 Cibinong", "npsn": "20200001", "address": "Jl. Raya"}),
        json!({"id": 2, "name": "SMPN 3 Bogor", "npsn": "20200002", "address": "Jl. Pajajaran"}),
    ];
    gateway.push_list(Ok(page(rows.clone(), None))).await;
    gateway.push_list(Ok(page(rows, None))).await;
    let controller = ListController::new(registry.get("schools"), gateway.clone(), signed_in());

    let mounted = controller.mount().await.unwrap_or_else(|_| unreachable!());
    assert_eq!(mounted.visible_rows().len(), 2);

    let state = controller
        .set_search("budi")
        .await
        .unwrap_or_else(|_| unreachable!());
    assert!(state.visible_rows().is_empty());
    assert_eq!(state.rows().len(), 2);
    assert!(state.error().is_none());
    assert_eq!(state.phase(), ListPhase::Ready);

    let requests = gateway.list_requests.lock().await;
    assert!(requests[1].query.iter().all(|(key, _)| key != "search"));
}

#[tokio::test]
async fn load_more_appends_until_total_is_reached() {
    let gateway = FakeGateway::new();
    gateway
        .push_list(Ok(page(vec![json!({"id": 1}), json!({"id": 2})], Some(3))))
        .await;
    gateway.push_list(Ok(page(vec![json!({"id": 3})], Some(3)))).await;
    let controller = ListController::new(distribution_schema(), gateway.clone(), signed_in());
    assert!(controller.mount().await.is_ok());

    let state = controller.load_more().await.unwrap_or_else(|_| unreachable!());
    let ids: Vec<Option<String>> = state.rows().iter().map(|row| row.id()).collect();
    assert_eq!(
        ids,
        vec![Some("1".to_owned()), Some("2".to_owned()), Some("3".to_owned())]
    );
    assert_eq!(state.query().page.page, 2);
    assert!(state.is_exhausted());

    assert!(controller.load_more().await.is_ok());
    assert_eq!(gateway.list_requests.lock().await.len(), 2);
}

#[test]
fn load_more_is_a_no_op_while_a_fetch_is_in_flight() {
    let mut machine = ListMachine::new(distribution_schema());
    let mount = machine
        .begin_mount()
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!());
    machine.on_fetch_success(mount.seq, page(vec![json!({"id": 1}), json!({"id": 2})], None));

    let more = machine.begin_load_more();
    assert!(more.is_some());
    assert_eq!(machine.state().phase(), ListPhase::LoadingMore);
    assert!(machine.begin_load_more().is_none());
}

#[tokio::test]
async fn unknown_filter_never_reaches_the_network() {
    let gateway = FakeGateway::new();
    let controller = ListController::new(distribution_schema(), gateway.clone(), signed_in());
    assert!(controller.mount().await.is_ok());

    let result = controller
        .set_filter("menu_condition", Some(FilterValue::exact("good")))
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(gateway.list_requests.lock().await.len(), 1);
    assert_eq!(controller.snapshot().await.phase(), ListPhase::Ready);
}

#[tokio::test]
async fn missing_token_short_circuits_with_auth_error() {
    let gateway = FakeGateway::new();
    let controller = ListController::new(
        distribution_schema(),
        gateway.clone(),
        Arc::new(FixedTokenProvider(None)),
    );

    let result = controller.mount().await;
    assert!(matches!(&result, Err(error) if error.is_auth()));
    assert!(gateway.list_requests.lock().await.is_empty());
    assert_eq!(controller.snapshot().await.phase(), ListPhase::Error);
}

#[tokio::test]
async fn endpoint_strategies_are_tried_in_order() {
    let gateway = FakeGateway::new();
    gateway
        .fail_path(
            "/admin/distributions",
            AppError::Server {
                status: Some(404),
                message: None,
            },
        )
        .await;
    gateway.push_list(Ok(page(vec![json!({"id": 9})], None))).await;
    let controller = ListController::new(distribution_schema(), gateway.clone(), signed_in());

    let state = controller.mount().await.unwrap_or_else(|_| unreachable!());
    assert_eq!(state.rows().len(), 1);

    let paths: Vec<String> = gateway
        .list_requests
        .lock()
        .await
        .iter()
        .map(|request| request.path.clone())
        .collect();
    assert_eq!(paths, vec!["/admin/distributions", "/distributions"]);
}

#[tokio::test]
async fn auth_failures_do_not_fall_through_to_legacy_endpoints() {
    let gateway = FakeGateway::new();
    gateway
        .fail_path(
            "/admin/distributions",
            AppError::Unauthorized {
                status: Some(401),
                message: None,
            },
        )
        .await;
    let controller = ListController::new(distribution_schema(), gateway.clone(), signed_in());

    let result = controller.mount().await;
    assert!(matches!(result, Err(AppError::Unauthorized { .. })));
    assert_eq!(gateway.list_requests.lock().await.len(), 1);
}

#[tokio::test]
async fn unmount_ignores_in_flight_responses() {
    let gateway = FakeGateway::new();
    gateway.push_list(Ok(page(five_rows(), None))).await;
    let gate = gateway.gate("1").await;
    let controller = ListController::new(distribution_schema(), gateway.clone(), signed_in());

    let mount = controller.mount();
    let leave = async {
        controller.unmount().await;
        gate.notify_one();
    };
    let (mount_result, ()) = tokio::join!(mount, leave);
    assert!(mount_result.is_ok());

    let state = controller.snapshot().await;
    assert!(state.rows().is_empty());
    assert!(controller.refresh().await.is_ok());
    assert_eq!(gateway.list_requests.lock().await.len(), 1);
}
