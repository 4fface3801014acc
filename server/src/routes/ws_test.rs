use super::*;
use crate::state::test_helpers;
use tokio::time::{Duration, timeout};

async fn recv_event(rx: &mut mpsc::Receiver<ServerEvent>) -> ServerEvent {
    timeout(Duration::from_millis(200), rx.recv())
        .await
        .expect("event receive timed out")
        .expect("channel closed")
}

async fn assert_no_event(rx: &mut mpsc::Receiver<ServerEvent>) {
    assert!(
        timeout(Duration::from_millis(80), rx.recv()).await.is_err(),
        "expected no event"
    );
}

fn encode(event: &ClientEvent) -> String {
    serde_json::to_string(event).expect("client event serializes")
}

fn snap(tag: &str) -> Snapshot {
    Snapshot::new(format!("data:image/png;base64,{tag}"))
}

#[tokio::test]
async fn draw_end_reaches_peers_but_never_the_sender() {
    let state = test_helpers::test_app_state();
    let (sender, mut sender_rx) = test_helpers::seed_member(&state, "r1").await;
    let (_peer, mut peer_rx) = test_helpers::seed_member(&state, "r1").await;

    let path = vec![test_helpers::dummy_point(1.0, 2.0), test_helpers::dummy_point(3.0, 4.0)];
    let text = encode(&ClientEvent::DrawEnd { path: path.clone() });
    dispatch_event(&state, "r1", sender, &text).await;

    let event = recv_event(&mut peer_rx).await;
    let ServerEvent::DrawEnd { user_id, path: relayed, timestamp } = event else {
        panic!("expected draw-end, got {event:?}");
    };
    assert_eq!(user_id, sender);
    assert_eq!(relayed, path);
    assert!(timestamp > 0);

    assert_no_event(&mut sender_rx).await;
}

#[tokio::test]
async fn cursor_move_excludes_the_sender() {
    let state = test_helpers::test_app_state();
    let (sender, mut sender_rx) = test_helpers::seed_member(&state, "r1").await;
    let (_peer, mut peer_rx) = test_helpers::seed_member(&state, "r1").await;

    let text = encode(&ClientEvent::CursorMove { x: 640.0, y: 350.0 });
    dispatch_event(&state, "r1", sender, &text).await;

    let event = recv_event(&mut peer_rx).await;
    assert!(matches!(event, ServerEvent::CursorMove { user_id, .. } if user_id == sender));
    assert_no_event(&mut sender_rx).await;
}

#[tokio::test]
async fn undo_with_snapshot_commits_and_echoes_to_everyone() {
    let state = test_helpers::test_app_state();
    let (sender, mut sender_rx) = test_helpers::seed_member(&state, "r1").await;
    let (_peer, mut peer_rx) = test_helpers::seed_member(&state, "r1").await;

    let text = encode(&ClientEvent::Undo { canvas_state: Some(snap("UNDONE")) });
    dispatch_event(&state, "r1", sender, &text).await;

    for rx in [&mut sender_rx, &mut peer_rx] {
        let event = recv_event(rx).await;
        let ServerEvent::Undo { user_id, canvas_state } = event else {
            panic!("expected undo, got {event:?}");
        };
        assert_eq!(user_id, sender);
        assert_eq!(canvas_state, Some(snap("UNDONE")));
    }

    // The fabricated snapshot became the authoritative state verbatim.
    assert_eq!(history::current_snapshot(&state, "r1").await, Some(snap("UNDONE")));
}

#[tokio::test]
async fn undo_without_snapshot_walks_server_history() {
    let state = test_helpers::test_app_state();
    let (sender, mut sender_rx) = test_helpers::seed_member(&state, "r1").await;
    history::commit_snapshot(&state, "r1", snap("A")).await;
    history::commit_snapshot(&state, "r1", snap("B")).await;

    dispatch_event(&state, "r1", sender, &encode(&ClientEvent::Undo { canvas_state: None })).await;

    let event = recv_event(&mut sender_rx).await;
    let ServerEvent::Undo { canvas_state, .. } = event else {
        panic!("expected undo, got {event:?}");
    };
    assert_eq!(canvas_state, Some(snap("A")));

    dispatch_event(&state, "r1", sender, &encode(&ClientEvent::Redo { canvas_state: None })).await;
    let event = recv_event(&mut sender_rx).await;
    let ServerEvent::Redo { canvas_state, .. } = event else {
        panic!("expected redo, got {event:?}");
    };
    assert_eq!(canvas_state, Some(snap("B")));
}

#[tokio::test]
async fn noop_undo_produces_no_fanout() {
    let state = test_helpers::test_app_state();
    let (sender, mut sender_rx) = test_helpers::seed_member(&state, "r1").await;
    let (_peer, mut peer_rx) = test_helpers::seed_member(&state, "r1").await;

    // Empty history: nothing to step back into.
    dispatch_event(&state, "r1", sender, &encode(&ClientEvent::Undo { canvas_state: None })).await;

    assert_no_event(&mut sender_rx).await;
    assert_no_event(&mut peer_rx).await;
}

#[tokio::test]
async fn clear_canvas_reaches_everyone_and_clears_the_store() {
    let state = test_helpers::test_app_state();
    let (sender, mut sender_rx) = test_helpers::seed_member(&state, "r1").await;
    let (_peer, mut peer_rx) = test_helpers::seed_member(&state, "r1").await;
    history::commit_snapshot(&state, "r1", snap("A")).await;

    dispatch_event(&state, "r1", sender, &encode(&ClientEvent::ClearCanvas {})).await;

    assert!(matches!(recv_event(&mut sender_rx).await, ServerEvent::ClearCanvas {}));
    assert!(matches!(recv_event(&mut peer_rx).await, ServerEvent::ClearCanvas {}));
    assert_eq!(history::current_snapshot(&state, "r1").await, None);
}

#[tokio::test]
async fn malformed_input_is_dropped_without_effect() {
    let state = test_helpers::test_app_state();
    let (sender, mut sender_rx) = test_helpers::seed_member(&state, "r1").await;
    let (_peer, mut peer_rx) = test_helpers::seed_member(&state, "r1").await;

    for garbage in [
        "{not json",
        r#"{"type":"explode","data":{}}"#,
        r#"{"type":"draw-start","data":{}}"#,
        r#"{"type":"draw-end","data":{"path":[]}}"#,
        r#"{"type":"draw-move","data":{"points":[]}}"#,
    ] {
        dispatch_event(&state, "r1", sender, garbage).await;
    }

    assert_no_event(&mut sender_rx).await;
    assert_no_event(&mut peer_rx).await;

    // No state was touched either.
    assert!(state.canvases.read().await.is_empty());
    assert_eq!(history::stats_of(&state, "r1").await.op_count, 0);
}

#[tokio::test]
async fn draw_end_records_operation_and_closes_stroke() {
    let state = test_helpers::test_app_state();
    let (sender, _sender_rx) = test_helpers::seed_member(&state, "r1").await;

    let start = test_helpers::dummy_point(1.0, 1.0);
    dispatch_event(&state, "r1", sender, &encode(&ClientEvent::DrawStart { point: start })).await;
    assert_eq!(registry::active_strokes(&state, "r1").await, 1);

    dispatch_event(
        &state,
        "r1",
        sender,
        &encode(&ClientEvent::DrawMove { points: vec![PathPoint { x: 2.0, y: 2.0 }] }),
    )
    .await;

    let path = vec![test_helpers::dummy_point(1.0, 1.0), test_helpers::dummy_point(2.0, 2.0)];
    dispatch_event(&state, "r1", sender, &encode(&ClientEvent::DrawEnd { path })).await;

    assert_eq!(registry::active_strokes(&state, "r1").await, 0);
    let stats = history::stats_of(&state, "r1").await;
    assert_eq!(stats.op_count, 1);
    // Strokes never feed the snapshot history.
    assert_eq!(stats.history_len, 0);
}

#[tokio::test]
async fn draw_events_relay_to_peers_in_order() {
    let state = test_helpers::test_app_state();
    let (sender, _sender_rx) = test_helpers::seed_member(&state, "r1").await;
    let (_peer, mut peer_rx) = test_helpers::seed_member(&state, "r1").await;

    dispatch_event(
        &state,
        "r1",
        sender,
        &encode(&ClientEvent::DrawStart { point: test_helpers::dummy_point(0.0, 0.0) }),
    )
    .await;
    dispatch_event(
        &state,
        "r1",
        sender,
        &encode(&ClientEvent::DrawMove { points: vec![PathPoint { x: 1.0, y: 1.0 }] }),
    )
    .await;
    dispatch_event(
        &state,
        "r1",
        sender,
        &encode(&ClientEvent::DrawEnd { path: vec![test_helpers::dummy_point(1.0, 1.0)] }),
    )
    .await;

    assert_eq!(recv_event(&mut peer_rx).await.kind(), "draw-start");
    assert_eq!(recv_event(&mut peer_rx).await.kind(), "draw-move");
    assert_eq!(recv_event(&mut peer_rx).await.kind(), "draw-end");
}

#[tokio::test]
async fn events_stay_inside_their_room() {
    let state = test_helpers::test_app_state();
    let (sender, _sender_rx) = test_helpers::seed_member(&state, "r1").await;
    let (_bystander, mut bystander_rx) = test_helpers::seed_member(&state, "r2").await;

    dispatch_event(&state, "r1", sender, &encode(&ClientEvent::ClearCanvas {})).await;

    assert_no_event(&mut bystander_rx).await;
}
