// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use joiner_app::{CandidateSource, TriggerKind};
use joiner_wildcards::{CandidateFetcher, Client, load_candidates};
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Response, Server};

fn json_response(body: &str, status: u16) -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string(body)
        .with_status_code(status)
        .with_header(
            Header::from_bytes("Content-Type", "application/json")
                .expect("valid content type header"),
        )
}

#[test]
fn unreachable_server_error_is_actionable() {
    let client = Client::new("http://127.0.0.1:1", Duration::from_millis(50))
        .expect("client should initialize");

    let error = client
        .fetch(TriggerKind::Wildcard)
        .expect_err("fetch should fail for unreachable endpoint");
    assert!(error.to_string().contains("wildcard server running"));
}

#[test]
fn fetches_both_kinds_from_mock_server() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        for _ in 0..2 {
            let request = server.recv().expect("request expected");
            let body = match request.url() {
                "/my_utils/wildcards" => r#"["__colors__","__season__"]"#,
                "/my_utils/presets" => r#"["/* size: 896x1152 */"]"#,
                other => panic!("unexpected path {other}"),
            };
            request
                .respond(json_response(body, 200))
                .expect("response should succeed");
        }
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let mut source = CandidateSource::new();
    assert_eq!(load_candidates(&client, &mut source), 3);
    assert_eq!(
        source.filter(TriggerKind::Wildcard, "__SEA"),
        vec!["__season__".to_owned()]
    );
    assert_eq!(source.candidates(TriggerKind::Preset).len(), 1);

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn server_error_degrades_to_empty_candidates() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        request
            .respond(json_response(r#"{"error":"wildcard pack missing"}"#, 500))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let error = client
        .fetch(TriggerKind::Wildcard)
        .expect_err("500 should surface as an error");
    assert_eq!(
        error.to_string(),
        "server error (500): wildcard pack missing"
    );
    handle.join().expect("server thread should join");

    let mut source = CandidateSource::new();
    source.populate(TriggerKind::Wildcard, Err(error));
    assert!(source.filter(TriggerKind::Wildcard, "__").is_empty());
    Ok(())
}

#[test]
fn non_list_body_is_a_decode_error() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        request
            .respond(json_response(r#"{"wildcards":[]}"#, 200))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let error = client
        .fetch(TriggerKind::Preset)
        .expect_err("object body should not decode");
    assert!(format!("{error:#}").contains("decode preset list"));

    handle.join().expect("server thread should join");
    Ok(())
}
