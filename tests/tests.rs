use sa_access_token::{
    client::{CustomHyperClientBuilder, HttpClient, HyperClientBuilder, SendError},
    run_with_client, Error, Opts, DEFAULT_CLIENT_ID, DEFAULT_SCOPES, GRANT_TYPE,
};

use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::Duration;

use http::StatusCode;
use httptest::{
    matchers::*,
    responders::{delay_and_then, json_encoded, status_code},
    Expectation, Server,
};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const TOKEN_PATH: &str = "/am/oauth2/access_token";
const SERVICE_ACCOUNT_ID: &str = "6a5f3c1e-8d4b-4f5e-9a1b-0c2d3e4f5a6b";

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn opts_for(server: &Server) -> Opts {
    Opts {
        // A trailing slash must not end up in the token endpoint.
        tenant_url: server.url_str("/"),
        service_account_id: SERVICE_ACCOUNT_ID.to_string(),
        jwk_path: fixture("service-account.jwk.json"),
        client_id: DEFAULT_CLIENT_ID.to_string(),
        scopes: DEFAULT_SCOPES.to_string(),
        timeout: None,
    }
}

fn plain_client(timeout: Option<Duration>) -> HttpClient<HttpConnector> {
    let hyper_client = hyper_util::client::legacy::Client::builder(TokioExecutor::new())
        .build::<_, String>(HttpConnector::new());
    let mut builder = CustomHyperClientBuilder::from(hyper_client);
    if let Some(timeout) = timeout {
        builder = builder.with_timeout(timeout);
    }
    builder
        .build_hyper_client()
        .expect("Hyper client to be built")
}

#[tokio::test]
async fn test_jwt_bearer_success() {
    let _ = env_logger::try_init();
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", TOKEN_PATH),
            request::body(url_decoded(all_of![
                contains(("grant_type", GRANT_TYPE)),
                contains(("assertion", matches(r"^[\w-]+\.[\w-]+\.[\w-]+$"))),
                contains(("scope", "fr:idm:* fr:am:*")),
                contains(("client_id", "service-account")),
            ])),
        ])
        .respond_with(json_encoded(serde_json::json!({
            "access_token": "abc123",
            "scope": "fr:idm:* fr:am:*",
            "token_type": "Bearer",
            "expires_in": 899
        }))),
    );

    let mut out = Vec::new();
    run_with_client(&opts_for(&server), &plain_client(None), &mut out)
        .await
        .expect("token failed");
    let out = String::from_utf8(out).unwrap();

    assert!(out.contains("\"access_token\": \"abc123\""), "{}", out);
    assert!(out.contains("\"expires_in\": 899"), "{}", out);
    assert!(out.ends_with("\n=== Access Token ===\n\nabc123\n"), "{}", out);
}

#[tokio::test]
async fn test_jwt_bearer_custom_client_and_scopes() {
    let _ = env_logger::try_init();
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", TOKEN_PATH),
            request::body(url_decoded(all_of![
                contains(("scope", "openid profile")),
                contains(("client_id", "my-client")),
            ])),
        ])
        .respond_with(json_encoded(serde_json::json!({
            "access_token": "xyz",
        }))),
    );

    let opts = Opts {
        client_id: "my-client".to_string(),
        scopes: "openid profile".to_string(),
        jwk_path: fixture("service-account-no-kid.jwk.json"),
        ..opts_for(&server)
    };
    let mut out = Vec::new();
    run_with_client(&opts, &plain_client(None), &mut out)
        .await
        .expect("token failed");
    assert!(String::from_utf8(out).unwrap().ends_with("\nxyz\n"));
}

#[tokio::test]
async fn test_jwt_bearer_error() {
    let _ = env_logger::try_init();
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", TOKEN_PATH)).respond_with(
            status_code(400).body(r#"{"error":"invalid_grant","error_description":"bad sub"}"#),
        ),
    );

    let mut out = Vec::new();
    let result = run_with_client(&opts_for(&server), &plain_client(None), &mut out).await;
    match result {
        Err(Error::TokenEndpoint { status, body }) => {
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body.contains("invalid_grant"));
        }
        other => panic!("expected a token endpoint error, got {:?}", other),
    }
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_request_sent_once_on_server_error() {
    let _ = env_logger::try_init();
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", TOKEN_PATH))
            .times(1)
            .respond_with(status_code(503)),
    );

    let result = run_with_client(&opts_for(&server), &plain_client(None), &mut Vec::new()).await;
    assert!(matches!(
        result,
        Err(Error::TokenEndpoint { status, .. }) if status == StatusCode::SERVICE_UNAVAILABLE
    ));
}

#[tokio::test]
async fn test_non_json_success_body() {
    let _ = env_logger::try_init();
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", TOKEN_PATH))
            .respond_with(status_code(200).body("<html>maintenance</html>")),
    );

    let result = run_with_client(&opts_for(&server), &plain_client(None), &mut Vec::new()).await;
    assert!(matches!(result, Err(Error::JSONError(_))), "{:?}", result);
}

#[tokio::test]
async fn test_timeout() {
    let _ = env_logger::try_init();
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", TOKEN_PATH)).respond_with(
            delay_and_then(
                Duration::from_secs(2),
                json_encoded(serde_json::json!({"access_token": "late"})),
            ),
        ),
    );

    let result = run_with_client(
        &opts_for(&server),
        &plain_client(Some(Duration::from_millis(200))),
        &mut Vec::new(),
    )
    .await;
    assert!(matches!(result, Err(Error::Send(_))), "{:?}", result);
}

#[tokio::test]
async fn test_timeout_covers_response_body() {
    let _ = env_logger::try_init();
    // Sends the head and part of the body, then stalls.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 16384];
        let _ = socket.read(&mut buf).await;
        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
                  content-length: 64\r\n\r\n{\"access_token\":",
            )
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let opts = Opts {
        tenant_url: format!("http://{}", addr),
        service_account_id: SERVICE_ACCOUNT_ID.to_string(),
        jwk_path: fixture("service-account.jwk.json"),
        client_id: DEFAULT_CLIENT_ID.to_string(),
        scopes: DEFAULT_SCOPES.to_string(),
        timeout: None,
    };
    let mut out = Vec::new();
    let result = run_with_client(
        &opts,
        &plain_client(Some(Duration::from_millis(300))),
        &mut out,
    )
    .await;
    assert!(
        matches!(result, Err(Error::Send(SendError::Timeout))),
        "{:?}",
        result
    );
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_missing_key_file_sends_nothing() {
    let _ = env_logger::try_init();
    let server = Server::run();
    let opts = Opts {
        jwk_path: fixture("missing.jwk.json"),
        ..opts_for(&server)
    };

    let result = run_with_client(&opts, &plain_client(None), &mut Vec::new()).await;
    assert!(matches!(result, Err(Error::LowLevelError(_))), "{:?}", result);
    // The server verifies on drop that no unexpected request arrived.
}

fn run_binary(server: &Server, jwk: &str) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sa-access-token"))
        .arg("-u")
        .arg(server.url_str("/"))
        .args(["-s", SERVICE_ACCOUNT_ID])
        .arg("-k")
        .arg(fixture(jwk))
        .output()
        .expect("binary to run")
}

#[test]
fn test_binary_prints_token() {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", TOKEN_PATH),
            request::body(url_decoded(contains(("grant_type", GRANT_TYPE)))),
        ])
        .respond_with(json_encoded(serde_json::json!({
            "access_token": "abc123",
            "token_type": "Bearer"
        }))),
    );

    let output = run_binary(&server, "service-account.jwk.json");
    assert!(output.status.success(), "{:?}", output);
    let stdout = String::from_utf8(output.stdout).unwrap();
    let json = "{\n  \"access_token\": \"abc123\",\n  \"token_type\": \"Bearer\"\n}";
    let json_at = stdout.find(json).expect("full JSON on stdout");
    let token_at = stdout.rfind("\nabc123\n").expect("token line on stdout");
    assert!(json_at < token_at);
}

#[test]
fn test_binary_exits_1_on_token_error() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", TOKEN_PATH))
            .respond_with(status_code(400).body(r#"{"error":"invalid_client"}"#)),
    );

    let output = run_binary(&server, "service-account.jwk.json");
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("ERROR 400 fetching token:"), "{}", stderr);
    assert!(stderr.contains(r#"{"error":"invalid_client"}"#), "{}", stderr);
}

#[test]
fn test_binary_usage_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_sa-access-token"))
        .args(["-u", "https://acme.example.com"])
        .output()
        .expect("binary to run");
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("service-account-id"), "{}", stderr);
}
