//! `AppError` display format and conversions.

use update_session::AppError;

#[test]
fn display_is_kind_prefixed() {
    let cases = [
        (AppError::Config("x".into()), "config: x"),
        (AppError::Launch("x".into()), "launch: x"),
        (AppError::Startup("x".into()), "startup: x"),
        (AppError::Send("x".into()), "send: x"),
        (AppError::ProcessUnreachable("x".into()), "process unreachable: x"),
        (AppError::Attach("x".into()), "attach: x"),
        (AppError::Codec("x".into()), "codec: x"),
        (AppError::Ipc("x".into()), "ipc: x"),
        (AppError::Io("x".into()), "io: x"),
    ];

    for (err, expected) in cases {
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn io_errors_convert_to_io() {
    let err: AppError = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed").into();
    assert!(matches!(err, AppError::Io(ref msg) if msg.contains("pipe closed")));
}

#[test]
fn json_errors_convert_to_codec() {
    let json_err = serde_json::from_str::<serde_json::Value>("{").expect_err("invalid json");
    let err: AppError = json_err.into();
    assert!(err.to_string().starts_with("codec:"));
}

#[test]
fn toml_errors_convert_to_config() {
    let toml_err = toml::from_str::<toml::Value>("= nope").expect_err("invalid toml");
    let err: AppError = toml_err.into();
    assert!(err.to_string().starts_with("config: invalid config:"));
}

#[test]
fn app_error_is_a_std_error() {
    fn assert_error<E: std::error::Error + Send + Sync + 'static>(_: &E) {}
    assert_error(&AppError::Send("retries exhausted".into()));
}
