//! Command construction and the envelope wire contract.

use update_session::models::{
    Command, Envelope, ExtraDatum, ResponseKind, RestartInfo, UpdateAction, UpdateStep,
};

// ── Commands ─────────────────────────────────────────

#[test]
fn step_command_has_no_extra_data() {
    let command = Command::for_step(UpdateStep::DownloadUpdate);

    assert_eq!(command.action(), UpdateAction::UpdateStep);
    assert_eq!(command.step(), UpdateStep::DownloadUpdate);
    assert!(command.extra().is_empty());
}

#[test]
fn cancel_targets_start_of_workflow() {
    let command = Command::cancel();
    assert_eq!(command.action(), UpdateAction::Cancel);
    assert_eq!(command.step(), UpdateStep::CheckForUpdate);
}

#[test]
fn restart_info_minimal_layout() {
    let command = Command::restart_info(&RestartInfo {
        file_to_execute: "/opt/app/bin/app".into(),
        ..RestartInfo::default()
    });

    assert_eq!(command.step(), UpdateStep::RestartInfo);
    assert_eq!(command.extra(), [ExtraDatum::plain("/opt/app/bin/app")]);
}

#[test]
fn restart_info_service_flag_rides_on_first_entry() {
    let command = Command::restart_info(&RestartInfo {
        file_to_execute: "svc".into(),
        is_service: true,
        ..RestartInfo::default()
    });

    assert!(command.extra()[0].is_rich_text);
}

#[test]
fn restart_info_full_layout() {
    let command = Command::restart_info(&RestartInfo {
        file_to_execute: "app".into(),
        auto_update_id: Some("nightly".into()),
        arguments_for_files: Some("--resume".into()),
        is_service: false,
    });

    assert_eq!(
        command.extra(),
        [
            ExtraDatum::plain("app"),
            ExtraDatum::plain("nightly"),
            ExtraDatum::plain("--resume"),
        ]
    );
}

#[test]
fn restart_info_arguments_need_an_update_id() {
    let without_id = Command::restart_info(&RestartInfo {
        file_to_execute: "app".into(),
        auto_update_id: None,
        arguments_for_files: Some("--resume".into()),
        is_service: false,
    });
    let empty_id = Command::restart_info(&RestartInfo {
        file_to_execute: "app".into(),
        auto_update_id: Some(String::new()),
        arguments_for_files: Some("--resume".into()),
        is_service: false,
    });

    assert_eq!(without_id.extra().len(), 1);
    assert_eq!(empty_id.extra().len(), 1);
}

#[test]
fn restart_info_empty_arguments_are_omitted() {
    let command = Command::restart_info(&RestartInfo {
        file_to_execute: "app".into(),
        auto_update_id: Some("nightly".into()),
        arguments_for_files: Some(String::new()),
        is_service: false,
    });

    assert_eq!(command.extra().len(), 2);
}

// ── Workflow vocabulary ──────────────────────────────

#[test]
fn force_recheck_normalizes_to_check() {
    assert_eq!(
        UpdateStep::ForceRecheckForUpdate.normalized(),
        UpdateStep::CheckForUpdate
    );
    assert_eq!(UpdateStep::Install.normalized(), UpdateStep::Install);
}

#[test]
fn control_actions() {
    assert!(UpdateAction::GetProcessId.is_control());
    assert!(UpdateAction::NewCompanionProcess.is_control());
    assert!(!UpdateAction::UpdateStep.is_control());
    assert!(!UpdateAction::Cancel.is_control());
}

#[test]
fn step_display_matches_wire_names() {
    for step in [
        UpdateStep::CheckForUpdate,
        UpdateStep::ForceRecheckForUpdate,
        UpdateStep::DownloadUpdate,
        UpdateStep::BeginExtraction,
        UpdateStep::RestartInfo,
        UpdateStep::Install,
    ] {
        let wire = serde_json::to_string(&step).expect("serialize");
        assert_eq!(wire, format!("\"{step}\""));
    }
}

// ── Envelope wire form ───────────────────────────────

#[test]
fn outbound_envelope_omits_empty_optionals() {
    let envelope = Envelope::from(&Command::for_step(UpdateStep::Install));

    let json: serde_json::Value = serde_json::to_value(&envelope).expect("serialize");

    assert_eq!(
        json,
        serde_json::json!({
            "action": "update_step",
            "response": "nothing",
            "step": "install",
        })
    );
}

#[test]
fn companion_reply_with_handle_and_extra_decodes() {
    let raw = r#"{
        "action": "update_step",
        "response": "succeeded",
        "step": "restart_info",
        "window_handle": 655360,
        "extra": [{"text": "ready", "is_rich_text": true}]
    }"#;

    let envelope: Envelope = serde_json::from_str(raw).expect("deserialize");

    assert_eq!(envelope.response, ResponseKind::Succeeded);
    assert_eq!(envelope.step, UpdateStep::RestartInfo);
    assert_eq!(envelope.window_handle, Some(655_360));
    assert_eq!(envelope.process_id, None);
    assert_eq!(envelope.first_text(), Some("ready"));
    assert!(envelope.extra[0].is_rich_text);
}

#[test]
fn missing_response_defaults_to_nothing() {
    let envelope: Envelope =
        serde_json::from_str(r#"{"action":"get_process_id","step":"check_for_update","process_id":42}"#)
            .expect("deserialize");

    assert_eq!(envelope.action, UpdateAction::GetProcessId);
    assert_eq!(envelope.response, ResponseKind::Nothing);
    assert_eq!(envelope.process_id, Some(42));
}

#[test]
fn extra_rich_text_bit_defaults_to_false() {
    let datum: ExtraDatum = serde_json::from_str(r#"{"text":"pipe-name"}"#).expect("deserialize");
    assert_eq!(datum, ExtraDatum::plain("pipe-name"));
}
