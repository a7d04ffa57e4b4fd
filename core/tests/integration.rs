//! Commit lifecycle against the live mock daemon.
//!
//! # Design
//! Starts the mock daemon on a random port, then drives `EngineClient` over
//! `UreqTransport`, so request encoding, the HTTP round-trip and response
//! classification are all exercised against a real server.

use std::net::TcpListener;

use engine_client::{ClientConfig, CommitOptions, EngineClient, ErrorKind, UreqTransport};
use serde_json::Value;

/// Start the mock daemon on a random loopback port and return its base URL.
fn start_daemon(containers: &[&str]) -> String {
    let std_listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();
    let containers: Vec<String> = containers.iter().map(|c| c.to_string()).collect();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, containers).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn list_images(base_url: &str) -> Vec<Value> {
    let mut response = ureq::get(&format!("{base_url}/images/json")).call().unwrap();
    let body = response.body_mut().read_to_string().unwrap();
    serde_json::from_str(&body).unwrap()
}

#[test]
fn commit_lifecycle() {
    let base_url = start_daemon(&["web", "db"]);
    let client = EngineClient::from_config(&ClientConfig {
        host: base_url.clone(),
        ..ClientConfig::default()
    });

    // Step 1: commit with every option set.
    let options = CommitOptions {
        reference: Some("repository_name:tag".to_string()),
        comment: Some("nightly snapshot".to_string()),
        author: Some("ops <ops@example.com>".to_string()),
        changes: vec!["ENV MODE=prod".to_string(), "EXPOSE 8080".to_string()],
        pause: false,
    };
    let created = client.container_commit("web", &options).unwrap();
    assert!(created.id.starts_with("sha256:"));

    // Step 2: the daemon saw exactly what was encoded.
    let images = list_images(&base_url);
    assert_eq!(images.len(), 1);
    let image = &images[0];
    assert_eq!(image["Id"], created.id.as_str());
    assert_eq!(image["Container"], "web");
    assert_eq!(image["RepoTags"][0], "docker.io/library/repository_name:tag");
    assert_eq!(image["Comment"], "nightly snapshot");
    assert_eq!(image["Author"], "ops <ops@example.com>");
    assert_eq!(image["Changes"][0], "ENV MODE=prod");
    assert_eq!(image["Changes"][1], "EXPOSE 8080");
    assert_eq!(image["Paused"], false);

    // Step 3: defaults pause and send no repo.
    client
        .container_commit("  db  ", &CommitOptions::default())
        .unwrap();
    let images = list_images(&base_url);
    assert_eq!(images.len(), 2);
    assert_eq!(images[1]["Container"], "db");
    assert_eq!(images[1]["Paused"], true);
    assert_eq!(images[1]["RepoTags"].as_array().unwrap().len(), 0);

    // Step 4: unknown container is NotFound with the daemon's message.
    let err = client
        .container_commit("ghost", &CommitOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.message(), "No such container: ghost");
    assert_eq!(err.status(), Some(404));

    // Step 5: blank id fails locally; the daemon records nothing new.
    let err = client
        .container_commit("   ", &CommitOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(list_images(&base_url).len(), 2);
}

#[test]
fn versioned_client_reaches_daemon() {
    let base_url = start_daemon(&["web"]);
    let client =
        EngineClient::new(UreqTransport::new(&base_url, None)).with_api_version("1.45");

    let created = client
        .container_commit("web", &CommitOptions::default())
        .unwrap();
    assert!(created.id.starts_with("sha256:"));
}

#[test]
fn closed_port_is_transport_error() {
    // Bind then drop to get a port nothing listens on.
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let client = EngineClient::new(UreqTransport::new(&format!("http://127.0.0.1:{port}"), None));

    let err = client
        .container_commit("web", &CommitOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.status().is_none());
    assert!(std::error::Error::source(&err).is_some());
}
