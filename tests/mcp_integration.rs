#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

//! MCP Server Integration Tests
//!
//! Drives the JSON-RPC loop end to end over in-memory pipes: handshake,
//! listing, tool calls, resource reads, error responses and shutdown.

use async_trait::async_trait;
use crm_mcp::commands::build_server;
use crm_mcp::config::Config;
use crm_mcp::crm::{CrmBackend, CrmError, CrmResult, Customer, NewTicket, PlaceholderCrm, Ticket};
use crm_mcp::mcp::{ConnectionState, McpServer};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines};
use tokio::task::JoinHandle;

/// Backend whose listings fail, for exercising error propagation
struct UnreachableCrm;

#[async_trait]
impl CrmBackend for UnreachableCrm {
    async fn fetch_customer(&self, _: &str, _: Option<&[String]>) -> CrmResult<Customer> {
        Err(CrmError::Unavailable("crm.internal timed out".to_string()))
    }

    async fn create_ticket(&self, _: NewTicket) -> CrmResult<Ticket> {
        Err(CrmError::Unavailable("crm.internal timed out".to_string()))
    }

    async fn fetch_all_customers(&self) -> CrmResult<Vec<Customer>> {
        Err(CrmError::Unavailable("crm.internal timed out".to_string()))
    }

    async fn fetch_open_tickets(&self) -> CrmResult<Vec<Ticket>> {
        Err(CrmError::Unavailable("crm.internal timed out".to_string()))
    }
}

/// Test client connected to a server running on its own task
struct TestClient {
    server: Arc<McpServer>,
    writer: DuplexStream,
    reader: Lines<BufReader<DuplexStream>>,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestClient {
    async fn start(crm: Arc<dyn CrmBackend>) -> Self {
        let server = build_server(&Config::default(), crm)
            .await
            .expect("Failed to build server");

        let (writer, server_input) = tokio::io::duplex(64 * 1024);
        let (server_output, client_input) = tokio::io::duplex(64 * 1024);

        let handle = tokio::spawn(
            Arc::clone(&server).serve_transport(BufReader::new(server_input), server_output),
        );

        Self {
            server,
            writer,
            reader: BufReader::new(client_input).lines(),
            handle,
        }
    }

    async fn send_raw(&mut self, line: &str) {
        self.send_bytes(line.as_bytes()).await;
    }

    async fn send_bytes(&mut self, line: &[u8]) {
        self.writer.write_all(line).await.expect("write to server");
        self.writer.write_all(b"\n").await.expect("write newline");
    }

    async fn send(&mut self, message: &Value) {
        self.send_raw(&message.to_string()).await;
    }

    async fn recv(&mut self) -> Value {
        let line = self
            .reader
            .next_line()
            .await
            .expect("read from server")
            .expect("server closed the stream");
        serde_json::from_str(&line).expect("server writes JSON")
    }

    async fn request(&mut self, id: i64, method: &str, params: Value) -> Value {
        self.send(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        }))
        .await;
        let response = self.recv().await;
        assert_eq!(response["id"], id);
        response
    }

    async fn initialize(&mut self) -> Value {
        let response = self
            .request(
                0,
                "initialize",
                json!({
                    "protocolVersion": "2025-06-18",
                    "capabilities": {},
                    "clientInfo": {"name": "integration-test", "version": "0.0.1"}
                }),
            )
            .await;
        self.send(&json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .await;
        response
    }

    async fn shutdown(self) -> Arc<McpServer> {
        drop(self.writer);
        self.handle
            .await
            .expect("server task panicked")
            .expect("server loop failed");
        self.server
    }
}

fn tool_text(response: &Value) -> &str {
    response["result"]["content"][0]["text"]
        .as_str()
        .expect("text content")
}

#[tokio::test]
async fn initialize_handshake() {
    let mut client = TestClient::start(Arc::new(PlaceholderCrm::new())).await;

    let response = client.initialize().await;
    let result = &response["result"];
    assert_eq!(result["protocolVersion"], "2025-06-18");
    assert_eq!(result["serverInfo"]["name"], "enterprise-crm-server");
    assert_eq!(result["serverInfo"]["version"], "1.0.0");
    assert!(result["capabilities"]["tools"].is_object());
    assert!(result["capabilities"]["resources"].is_object());

    // Notifications get no reply; the ping answer is the next line
    let pong = client.request(1, "ping", json!({})).await;
    assert_eq!(pong["result"], json!({}));
    assert_eq!(client.server.connection_state().await, ConnectionState::Ready);

    let server = client.shutdown().await;
    assert_eq!(server.connection_state().await, ConnectionState::Closed);
}

#[tokio::test]
async fn older_protocol_version_is_echoed() {
    let mut client = TestClient::start(Arc::new(PlaceholderCrm::new())).await;

    let response = client
        .request(
            1,
            "initialize",
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {"name": "old-client", "version": "0.1"}
            }),
        )
        .await;
    assert_eq!(response["result"]["protocolVersion"], "2024-11-05");

    client.shutdown().await;
}

#[tokio::test]
async fn unsupported_protocol_version() {
    let mut client = TestClient::start(Arc::new(PlaceholderCrm::new())).await;

    let response = client
        .request(
            1,
            "initialize",
            json!({
                "protocolVersion": "1999-01-01",
                "capabilities": {},
                "clientInfo": {"name": "ancient-client", "version": "0.1"}
            }),
        )
        .await;
    assert_eq!(response["error"]["code"], -32000);
    assert_eq!(
        client.server.connection_state().await,
        ConnectionState::Uninitialized
    );

    client.shutdown().await;
}

#[tokio::test]
async fn lists_tools_and_resources() {
    let mut client = TestClient::start(Arc::new(PlaceholderCrm::new())).await;
    client.initialize().await;

    let tools = client.request(1, "tools/list", json!({})).await;
    let tools = tools["result"]["tools"].as_array().expect("tools array");
    assert_eq!(tools.len(), 2);
    assert_eq!(tools[0]["name"], "create_support_ticket");
    assert_eq!(tools[1]["name"], "query_customer");
    assert_eq!(tools[1]["inputSchema"]["required"], json!(["customer_id"]));

    let resources = client.request(2, "resources/list", json!({})).await;
    let resources = resources["result"]["resources"]
        .as_array()
        .expect("resources array");
    assert_eq!(resources.len(), 2);
    assert_eq!(resources[0]["uri"], "crm://customers");
    assert_eq!(resources[0]["mimeType"], "application/json");
    assert_eq!(resources[1]["uri"], "crm://open-tickets");

    client.shutdown().await;
}

#[tokio::test]
async fn query_customer_round_trip() {
    let mut client = TestClient::start(Arc::new(PlaceholderCrm::new())).await;
    client.initialize().await;

    let response = client
        .request(
            1,
            "tools/call",
            json!({"name": "query_customer", "arguments": {"customer_id": "ACME-77"}}),
        )
        .await;

    assert_eq!(response["result"]["isError"], false);
    let customer: Value = serde_json::from_str(tool_text(&response)).expect("customer JSON");
    assert_eq!(customer["id"], "ACME-77");

    client.shutdown().await;
}

#[tokio::test]
async fn create_support_ticket_round_trip() {
    let mut client = TestClient::start(Arc::new(PlaceholderCrm::new())).await;
    client.initialize().await;

    let mut ids = Vec::new();
    for (id, priority) in [(1, None), (2, Some("critical"))] {
        let mut arguments = json!({
            "customer_id": "ACME-77",
            "title": "Invoice missing",
            "description": "The March invoice never arrived"
        });
        if let Some(priority) = priority {
            arguments["priority"] = json!(priority);
        }

        let response = client
            .request(
                id,
                "tools/call",
                json!({"name": "create_support_ticket", "arguments": arguments}),
            )
            .await;

        let text = tool_text(&response);
        let expected = format!("Priority: {}", priority.unwrap_or("medium"));
        assert!(text.contains(&expected), "{text}");
        ids.push(
            text.lines()
                .find_map(|l| l.strip_prefix("Ticket ID: TICKET-"))
                .expect("ticket id line")
                .to_string(),
        );
    }

    assert_ne!(ids[0], ids[1]);
    client.shutdown().await;
}

#[tokio::test]
async fn tool_errors_map_to_json_rpc_codes() {
    let mut client = TestClient::start(Arc::new(PlaceholderCrm::new())).await;
    client.initialize().await;

    let unknown = client
        .request(1, "tools/call", json!({"name": "merge_customers", "arguments": {}}))
        .await;
    assert_eq!(unknown["error"]["code"], -32001);

    let missing = client
        .request(
            2,
            "tools/call",
            json!({"name": "query_customer", "arguments": {"fields": ["email"]}}),
        )
        .await;
    assert_eq!(missing["error"]["code"], -32602);
    assert!(
        missing["error"]["message"]
            .as_str()
            .expect("message")
            .contains("customer_id")
    );

    let no_name = client.request(3, "tools/call", json!({"arguments": {}})).await;
    assert_eq!(no_name["error"]["code"], -32602);

    client.shutdown().await;
}

#[tokio::test]
async fn read_customers_resource() {
    let mut client = TestClient::start(Arc::new(PlaceholderCrm::new())).await;
    client.initialize().await;

    let response = client
        .request(1, "resources/read", json!({"uri": "crm://customers"}))
        .await;
    assert_eq!(
        response["result"]["contents"],
        json!([{"uri": "crm://customers", "mimeType": "application/json", "text": "[]"}])
    );

    let missing = client
        .request(2, "resources/read", json!({"uri": "crm://invoices"}))
        .await;
    assert_eq!(missing["error"]["code"], -32002);

    client.shutdown().await;
}

#[tokio::test]
async fn backend_failures_follow_tool_and_resource_semantics() {
    let mut client = TestClient::start(Arc::new(UnreachableCrm)).await;
    client.initialize().await;

    // Resources propagate the failure as an error response
    let response = client
        .request(1, "resources/read", json!({"uri": "crm://customers"}))
        .await;
    assert_eq!(response["error"]["code"], -32603);
    assert!(
        response["error"]["message"]
            .as_str()
            .expect("message")
            .starts_with("Failed to fetch customers:")
    );

    let response = client
        .request(2, "resources/read", json!({"uri": "crm://open-tickets"}))
        .await;
    assert!(
        response["error"]["message"]
            .as_str()
            .expect("message")
            .starts_with("Failed to fetch tickets:")
    );

    // Tools report it in-band
    let response = client
        .request(
            3,
            "tools/call",
            json!({"name": "query_customer", "arguments": {"customer_id": "C-1"}}),
        )
        .await;
    assert!(response.get("error").is_none());
    assert_eq!(response["result"]["isError"], true);
    assert!(tool_text(&response).contains("crm.internal timed out"));

    // And the server is still serving
    let pong = client.request(4, "ping", json!({})).await;
    assert_eq!(pong["result"], json!({}));

    client.shutdown().await;
}

#[tokio::test]
async fn malformed_messages_do_not_stop_the_server() {
    let mut client = TestClient::start(Arc::new(PlaceholderCrm::new())).await;

    client.send_raw("{not json").await;
    let response = client.recv().await;
    assert_eq!(response["error"]["code"], -32700);
    assert!(response["id"].is_null());

    client.send(&json!({"jsonrpc": "1.0", "id": 5, "method": "ping"})).await;
    let response = client.recv().await;
    assert_eq!(response["error"]["code"], -32600);
    assert_eq!(response["id"], 5);

    let response = client.request(6, "prompts/list", json!({})).await;
    assert_eq!(response["error"]["code"], -32601);

    client.send_raw("").await;
    let pong = client.request(7, "ping", json!({})).await;
    assert_eq!(pong["result"], json!({}));

    client.shutdown().await;
}

#[tokio::test]
async fn invalid_utf8_first_line_is_a_parse_error() {
    let mut client = TestClient::start(Arc::new(PlaceholderCrm::new())).await;

    client.send_bytes(b"\xff\xfe").await;
    let response = client.recv().await;
    assert_eq!(response["error"]["code"], -32700);
    assert!(response["id"].is_null());

    let pong = client.request(1, "ping", json!({})).await;
    assert_eq!(pong["result"], json!({}));

    client.shutdown().await;
}

#[tokio::test]
async fn invalid_utf8_mid_stream_keeps_serving() {
    let mut client = TestClient::start(Arc::new(PlaceholderCrm::new())).await;

    let pong = client.request(1, "ping", json!({})).await;
    assert_eq!(pong["result"], json!({}));

    client.send_bytes(b"{\"jsonrpc\": \"2.0\", \"id\": \xff}").await;
    let response = client.recv().await;
    assert_eq!(response["error"]["code"], -32700);

    let pong = client.request(2, "ping", json!({})).await;
    assert_eq!(pong["result"], json!({}));

    client.shutdown().await;
}

#[tokio::test]
async fn null_id_request_gets_invalid_request() {
    let mut client = TestClient::start(Arc::new(PlaceholderCrm::new())).await;

    client
        .send(&json!({"jsonrpc": "2.0", "id": null, "method": "ping"}))
        .await;
    let response = client.recv().await;
    assert_eq!(response["error"]["code"], -32600);
    assert!(response["id"].is_null());

    let pong = client.request(3, "ping", json!({})).await;
    assert_eq!(pong["result"], json!({}));

    client.shutdown().await;
}

#[tokio::test]
async fn server_health_monitoring() {
    let client = TestClient::start(Arc::new(PlaceholderCrm::new())).await;

    let health = client.server.health_status().await;
    assert_eq!(health.connection_state, ConnectionState::Uninitialized);
    assert_eq!(health.tools_registered, 2);
    assert_eq!(health.resources_registered, 2);

    let statistics = client.server.server_statistics().await;
    assert_eq!(statistics.server_info.name, "enterprise-crm-server");
    assert_eq!(statistics.registered_tools.len(), 2);

    client.shutdown().await;
}
