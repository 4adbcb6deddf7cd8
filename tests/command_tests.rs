// Operator command parsing and the replies produced by the router

mod common;

use common::{harness, settle, source};
use voice_relay::control::{Command, CommandRouter, HELP};
use voice_relay::error::StreamError;
use voice_relay::supervisor::SupervisorState;

const OPERATOR: &str = "operator-1";

fn router(h: &common::Harness) -> CommandRouter {
    CommandRouter::new(h.handle.clone(), OPERATOR)
}

#[test]
fn test_parse_commands() {
    assert_eq!(
        Command::parse("setvc 111").unwrap(),
        Command::SetVc {
            channel_id: "111".to_string(),
            switch: false
        }
    );
    assert_eq!(
        Command::parse("SWITCHVC 222").unwrap(),
        Command::SetVc {
            channel_id: "222".to_string(),
            switch: true
        }
    );
    assert_eq!(
        Command::parse("setstream https://a.example/x").unwrap(),
        Command::SetStream {
            url: "https://a.example/x".to_string()
        }
    );
    assert_eq!(Command::parse("  Start ").unwrap(), Command::Start);
    assert_eq!(Command::parse("volume 0.5").unwrap(), Command::Volume { volume: 0.5 });
    assert_eq!(Command::parse("info").unwrap(), Command::Info);
}

#[test]
fn test_parse_setcookie_joins_arguments() {
    assert_eq!(
        Command::parse("setcookie a=1; b=2").unwrap(),
        Command::SetCookie {
            cookie: Some("a=1; b=2".to_string())
        }
    );
    assert_eq!(
        Command::parse("setcookie").unwrap(),
        Command::SetCookie { cookie: None }
    );
}

#[test]
fn test_parse_errors() {
    assert!(matches!(
        Command::parse("setvc").unwrap_err(),
        StreamError::Usage("setvc <channelId>")
    ));
    assert!(matches!(
        Command::parse("setstream a b").unwrap_err(),
        StreamError::Usage(_)
    ));
    assert!(matches!(
        Command::parse("volume loud").unwrap_err(),
        StreamError::Usage(_)
    ));
    match Command::parse("dance now").unwrap_err() {
        StreamError::UnknownCommand(verb) => assert_eq!(verb, "dance"),
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_setvc_then_start_then_status() {
    let h = harness(source("https://media.example/live"), None);
    let r = router(&h);

    assert_eq!(r.handle(OPERATOR, "setvc 111").await.unwrap(), "VC set to 111");
    assert_eq!(r.handle(OPERATOR, "start").await.unwrap(), "Streaming started");

    let status = r.handle(OPERATOR, "status").await.unwrap();
    assert!(status.contains("VC: 111"));
    assert!(status.contains("Streaming: true"));
    assert!(status.contains("Cookie: unset"));

    assert_eq!(r.handle(OPERATOR, "start").await.unwrap(), "Already streaming");
}

#[tokio::test(start_paused = true)]
async fn test_start_without_vc_reports_failure() {
    let h = harness(source("https://media.example/live"), None);
    let r = router(&h);

    let reply = r.handle(OPERATOR, "start").await.unwrap();
    assert_eq!(reply, "Failed to start: no voice channel configured");
}

#[tokio::test(start_paused = true)]
async fn test_status_before_anything_is_set() {
    let h = harness(source(""), None);
    let r = router(&h);

    let status = r.handle(OPERATOR, "status").await.unwrap();
    assert!(status.contains("VC: (not set)"));
    assert!(status.contains("Streaming: false"));
    assert!(status.contains("Stream: (not set)"));
}

#[tokio::test(start_paused = true)]
async fn test_volume_out_of_range_changes_nothing() {
    let h = harness(source("https://media.example/live"), Some("111"));
    let r = router(&h);
    r.handle(OPERATOR, "start").await.unwrap();

    let reply = r.handle(OPERATOR, "volume 3.5").await.unwrap();
    assert_eq!(reply, "Usage: volume <0.0-2.0>");
    assert_eq!(h.handle.status().await.unwrap().volume, 1.0);

    let reply = r.handle(OPERATOR, "volume 1.2").await.unwrap();
    assert_eq!(reply, "Volume set to 1.2");
    assert_eq!(h.handle.status().await.unwrap().volume, 1.2);
}

#[tokio::test(start_paused = true)]
async fn test_volume_when_nothing_plays() {
    let h = harness(source("https://media.example/live"), Some("111"));
    let r = router(&h);

    let reply = r.handle(OPERATOR, "volume 0.5").await.unwrap();
    assert_eq!(reply, "Nothing is playing");
}

#[tokio::test(start_paused = true)]
async fn test_unauthorized_author_is_ignored() {
    let h = harness(source("https://media.example/live"), Some("111"));
    let r = router(&h);

    assert!(!r.is_authorized("someone-else"));
    assert!(r.handle("someone-else", "start").await.is_none());
    settle().await;

    assert_eq!(h.handle.status().await.unwrap().state, SupervisorState::Stopped);
    assert_eq!(h.transport.opens(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_and_empty_commands() {
    let h = harness(source(""), None);
    let r = router(&h);

    let reply = r.handle(OPERATOR, "dance").await.unwrap();
    assert!(reply.contains("unknown command `dance`"));

    let reply = r.handle(OPERATOR, "   ").await.unwrap();
    assert!(reply.starts_with("Empty command"));

    assert_eq!(r.handle(OPERATOR, "help").await.unwrap(), HELP);
}

#[tokio::test(start_paused = true)]
async fn test_cookie_and_stream_replies() {
    let h = harness(source(""), None);
    let r = router(&h);

    assert_eq!(
        r.handle(OPERATOR, "setstream https://media.example/b").await.unwrap(),
        "Stream set to https://media.example/b"
    );
    assert_eq!(r.handle(OPERATOR, "setcookie sid=1").await.unwrap(), "Cookie set");

    let status = h.handle.status().await.unwrap();
    assert_eq!(status.source.url, "https://media.example/b");
    assert!(status.source.cookie_set);

    assert_eq!(r.handle(OPERATOR, "setcookie").await.unwrap(), "Cookie cleared");
    assert!(!h.handle.status().await.unwrap().source.cookie_set);
}

#[tokio::test(start_paused = true)]
async fn test_switchvc_and_reconnect_replies() {
    let h = harness(source("https://media.example/live"), Some("111"));
    let r = router(&h);

    assert_eq!(r.handle(OPERATOR, "reconnect").await.unwrap(), "Not streaming");

    r.handle(OPERATOR, "start").await.unwrap();
    assert_eq!(
        r.handle(OPERATOR, "switchvc 222").await.unwrap(),
        "Switched VC to 222"
    );
    assert_eq!(r.handle(OPERATOR, "reconnect").await.unwrap(), "Voice reconnected");
    assert_eq!(
        h.transport.opened_channels(),
        vec!["111".to_string(), "222".to_string(), "222".to_string()]
    );

    let info = r.handle(OPERATOR, "info").await.unwrap();
    assert!(info.contains("Reconnects: 1"));
    assert_eq!(r.handle(OPERATOR, "stop").await.unwrap(), "Streaming stopped");
}
