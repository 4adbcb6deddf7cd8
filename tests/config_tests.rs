// Config loading from TOML files

use std::io::Write;
use std::time::Duration;
use voice_relay::Config;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_minimal_config_uses_defaults() {
    let file = write_config(
        r#"
[nats]
url = "nats://localhost:4222"

[control]
operator_id = "operator-1"
"#,
    );

    let cfg = Config::load(file.path().to_str().unwrap()).unwrap();
    assert_eq!(cfg.service.name, "voice-relay");
    assert_eq!(cfg.service.http.port, 8090);
    assert_eq!(cfg.nats.voice_prefix, "voice");
    assert_eq!(cfg.control.subject, "voice-relay.control");
    assert!(!cfg.stream.autostart);

    let settings = cfg.supervisor_settings();
    assert_eq!(settings.respawn_delay, Duration::from_secs(5));
    assert_eq!(settings.connect_timeout, Duration::from_secs(20));
    assert_eq!(settings.disconnect_grace, Duration::from_secs(20));
    assert_eq!(settings.reconnect_backoff, Duration::from_secs(30));

    assert!(cfg.target_channel().is_none());
    assert!(!cfg.media_source().has_url());
    assert_eq!(cfg.transcoder_settings().program, "ffmpeg");
}

#[test]
fn test_stream_section() {
    let file = write_config(
        r#"
[nats]
url = "nats://localhost:4222"

[control]
operator_id = "operator-1"

[stream]
url = "https://media.example/live"
cookie = "sid=1"
volume = 0.8
channel_id = "111"
autostart = true

[supervisor]
respawn_delay_secs = 2
"#,
    );

    let cfg = Config::load(file.path().to_str().unwrap()).unwrap();
    let source = cfg.media_source();
    assert_eq!(source.url, "https://media.example/live");
    assert_eq!(source.cookie.as_deref(), Some("sid=1"));
    assert_eq!(source.volume, 0.8);

    assert_eq!(cfg.target_channel().unwrap().channel_id, "111");
    assert!(cfg.stream.autostart);
    assert_eq!(cfg.supervisor_settings().respawn_delay, Duration::from_secs(2));
    assert_eq!(
        cfg.supervisor_settings().reconnect_backoff,
        Duration::from_secs(30)
    );
}

#[test]
fn test_out_of_range_volume_falls_back() {
    let file = write_config(
        r#"
[nats]
url = "nats://localhost:4222"

[control]
operator_id = "operator-1"

[stream]
volume = 4.0
"#,
    );

    let cfg = Config::load(file.path().to_str().unwrap()).unwrap();
    assert_eq!(cfg.media_source().volume, 1.0);
}

#[test]
fn test_missing_operator_is_an_error() {
    let file = write_config(
        r#"
[nats]
url = "nats://localhost:4222"
"#,
    );

    assert!(Config::load(file.path().to_str().unwrap()).is_err());
}
