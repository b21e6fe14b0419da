//! Response routing and buffering.

use update_session::models::{Envelope, ExtraDatum, ResponseKind, UpdateAction, UpdateStep};
use update_session::session::{ResponseRouter, Route};

fn response(kind: ResponseKind) -> Envelope {
    Envelope::response(UpdateStep::DownloadUpdate, kind)
}

#[test]
fn delivers_when_not_buffering() {
    let mut router = ResponseRouter::new();

    for kind in [
        ResponseKind::Progress,
        ResponseKind::Succeeded,
        ResponseKind::Failed,
        ResponseKind::Nothing,
    ] {
        assert_eq!(router.route(response(kind)), Route::Deliver(response(kind)));
    }
    assert_eq!(router.buffered_len(), 0);
}

#[test]
fn buffering_drops_progress_and_keeps_the_rest() {
    let mut router = ResponseRouter::new();
    router.set_buffering(true);

    assert_eq!(router.route(response(ResponseKind::Progress)), Route::Dropped);
    assert_eq!(router.route(response(ResponseKind::Succeeded)), Route::Buffered);
    assert_eq!(router.route(response(ResponseKind::Nothing)), Route::Buffered);
    assert_eq!(router.route(response(ResponseKind::Failed)), Route::Buffered);

    assert_eq!(router.buffered_len(), 3);
}

#[test]
fn flush_returns_arrival_order_and_stops_buffering() {
    let mut router = ResponseRouter::new();
    router.set_buffering(true);
    router.route(response(ResponseKind::Failed));
    router.route(response(ResponseKind::Succeeded));

    let flushed = router.flush();

    assert_eq!(
        flushed,
        vec![response(ResponseKind::Failed), response(ResponseKind::Succeeded)]
    );
    assert!(!router.is_buffering());
    assert_eq!(router.buffered_len(), 0);
    assert!(router.flush().is_empty());
}

#[test]
fn control_envelopes_bypass_buffering() {
    let mut router = ResponseRouter::new();
    router.set_buffering(true);

    let pid_reply = Envelope {
        action: UpdateAction::GetProcessId,
        process_id: Some(31),
        ..Envelope::default()
    };
    let replacement = Envelope {
        action: UpdateAction::NewCompanionProcess,
        process_id: Some(32),
        extra: vec![ExtraDatum::plain("next")],
        ..Envelope::default()
    };

    assert_eq!(router.route(pid_reply), Route::ProcessId(Some(31)));
    assert_eq!(
        router.route(replacement.clone()),
        Route::NewCompanion(replacement)
    );
    assert_eq!(router.buffered_len(), 0);
}

#[test]
fn cancel_replies_are_ordinary() {
    let mut router = ResponseRouter::new();
    let reply = Envelope {
        action: UpdateAction::Cancel,
        response: ResponseKind::Succeeded,
        ..Envelope::default()
    };

    assert_eq!(router.route(reply.clone()), Route::Deliver(reply));
}
