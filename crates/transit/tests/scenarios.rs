//! Scenario tests for the transit layer, exercised over a hand-written
//! in-memory transporter rather than any real socket.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use transit::{
    Broker, CallRequest, CallerContext, DefaultContextFactory, JsonSerializer, NodeId, OnConnect,
    OnMessage, Packet, Payload, Registry, RemoteFailure, Serializer, SystemClock, TestClock,
    Transit, TransitError, TransitState, Transporter,
};
use transit::packet::{PongPayload, RequestPayload};
use transit_config::TransitConfig;

struct MockTransporter {
    connected: AtomicBool,
    sent: Mutex<Vec<Packet>>,
    on_connect: Mutex<Option<OnConnect>>,
}

impl MockTransporter {
    fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            on_connect: Mutex::new(None),
        }
    }

    fn sent_packets(&self) -> Vec<Packet> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transporter for MockTransporter {
    fn init(&self, _on_message: OnMessage, on_connect: OnConnect) {
        *self.on_connect.lock().unwrap() = Some(on_connect);
    }

    async fn connect(&self) -> Result<(), TransitError> {
        self.connected.store(true, Ordering::SeqCst);
        if let Some(on_connect) = self.on_connect.lock().unwrap().as_ref() {
            on_connect();
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransitError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn subscribe(&self, _topic: &str, _node_id: Option<&NodeId>) -> Result<(), TransitError> {
        Ok(())
    }

    async fn prepublish(&self, packet: &Packet) -> Result<(), TransitError> {
        self.sent.lock().unwrap().push(packet.clone());
        Ok(())
    }

    async fn make_service_specific_subscriptions(&self) -> Result<(), TransitError> {
        Ok(())
    }
}

struct MockBroker {
    node_id: NodeId,
    local_events: Mutex<Vec<(String, Value)>>,
}

#[async_trait]
impl Broker for MockBroker {
    fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    fn broadcast_local(&self, name: &str, data: Value, _sender: Option<&NodeId>) {
        self.local_events
            .lock()
            .unwrap()
            .push((name.to_string(), data));
    }

    async fn handle_remote_request(&self, _ctx: CallerContext) -> Result<Value, RemoteFailure> {
        Ok(json!({"ok": true}))
    }

    fn emit_local_services(&self, _event: &str, _data: Value, _groups: &[String], _sender: &NodeId) {}

    fn local_node_info(&self) -> Value {
        json!({
            "services": [],
            "ip_list": ["127.0.0.1"],
            "client": {},
            "config": {},
        })
    }

    fn event_groups(&self, _event: &str) -> Vec<String> {
        Vec::new()
    }
}

struct MockRegistry {
    disconnected: Mutex<Vec<NodeId>>,
}

impl Registry for MockRegistry {
    fn process_node_info(&self, _sender: &NodeId, _info: &Value) {}

    fn node_disconnected(&self, sender: &NodeId) {
        self.disconnected.lock().unwrap().push(sender.clone());
    }

    fn node_heartbeat(&self, _sender: &NodeId, _cpu: f64) {}
}

struct Harness {
    transit: Arc<Transit<MockTransporter>>,
}

impl Harness {
    fn new(max_queue_size: usize) -> Self {
        let mut config = TransitConfig::default();
        config.max_queue_size = max_queue_size;
        let transit = Transit::new(
            NodeId::new("self-node"),
            MockTransporter::new(),
            Arc::new(MockBroker {
                node_id: NodeId::new("self-node"),
                local_events: Mutex::new(Vec::new()),
            }),
            Arc::new(MockRegistry {
                disconnected: Mutex::new(Vec::new()),
            }),
            Arc::new(DefaultContextFactory),
            Arc::new(JsonSerializer),
            Arc::new(SystemClock),
            config,
        );
        // These tests exercise dispatch/pending/outbound directly, not the
        // connect handshake, so open the gate publish() waits behind.
        transit.mark_subscribed();
        Self { transit }
    }

    fn sent(&self) -> Vec<Packet> {
        self.transit.transporter().sent_packets()
    }
}

fn encode(packet: &Packet) -> Vec<u8> {
    JsonSerializer.serialize(packet).unwrap()
}

/// S1 — request/response success: a RESPONSE carrying the generated id
/// completes the pending call with its data.
#[tokio::test]
async fn request_response_success() {
    let harness = Harness::new(0);
    let transit = harness.transit.clone();

    let call = {
        let transit = transit.clone();
        tokio::spawn(async move {
            transit
                .request(CallRequest {
                    node_id: NodeId::new("B"),
                    action: "math.add".to_string(),
                    params: json!({"a": 2, "b": 3}),
                    meta: Value::Null,
                    timeout: None,
                    level: None,
                    metrics: None,
                    parent_id: None,
                    request_id: None,
                })
                .await
        })
    };

    // Give the REQUEST a chance to publish so we can read its correlation id.
    tokio::task::yield_now().await;
    let published = harness.sent();
    let request_id = match published.last() {
        Some(p) => {
            assert_eq!(p.target, Some(NodeId::new("B")), "REQUEST must target B");
            match &p.payload {
                Payload::Request(req) => req.id.clone(),
                other => panic!("expected a published REQUEST, got {other:?}"),
            }
        }
        None => panic!("expected a published REQUEST"),
    };

    let response = Packet::new(
        NodeId::new("B"),
        Payload::Response(transit::packet::ResponsePayload {
            id: request_id,
            success: true,
            data: Some(json!(5)),
            error: None,
        }),
    );
    transit.on_message(encode(&response)).await;

    let outcome = call.await.unwrap().unwrap();
    assert_eq!(outcome.unwrap(), json!(5));
}

/// S2 — request/response failure: error fields are copied into the
/// reconstructed `RemoteFailure`.
#[tokio::test]
async fn request_response_failure() {
    let harness = Harness::new(0);
    let transit = harness.transit.clone();

    let call = {
        let transit = transit.clone();
        tokio::spawn(async move {
            transit
                .request(CallRequest {
                    node_id: NodeId::new("B"),
                    action: "math.add".to_string(),
                    params: json!({"a": "x"}),
                    meta: Value::Null,
                    timeout: None,
                    level: None,
                    metrics: None,
                    parent_id: None,
                    request_id: None,
                })
                .await
        })
    };

    tokio::task::yield_now().await;
    let published = harness.sent();
    let request_id = match published.last().map(|p| &p.payload) {
        Some(Payload::Request(req)) => req.id.clone(),
        other => panic!("expected a published REQUEST, got {other:?}"),
    };

    let response = Packet::new(
        NodeId::new("B"),
        Payload::Response(transit::packet::ResponsePayload {
            id: request_id,
            success: false,
            data: None,
            error: Some(transit::packet::ErrorEnvelope {
                name: "ValidationError".to_string(),
                message: "bad".to_string(),
                code: Some(422),
                error_type: Some("BAD_ARG".to_string()),
                node_id: None,
                data: Some(json!({"field": "a"})),
                stack: None,
            }),
        }),
    );
    transit.on_message(encode(&response)).await;

    let outcome = call.await.unwrap().unwrap();
    let failure = outcome.unwrap_err();
    assert_eq!(failure.name, "ValidationError");
    assert_eq!(failure.code, Some(422));
    assert!(failure.message.contains("(NodeID: B)"));
}

/// S3 — a RESPONSE arriving after its peer was swept by DISCONNECT is a
/// silent no-op; the earlier sweep already completed the call.
#[tokio::test]
async fn late_response_after_disconnect_sweep_is_dropped() {
    let harness = Harness::new(0);
    let transit = harness.transit.clone();

    let call = {
        let transit = transit.clone();
        tokio::spawn(async move {
            transit
                .request(CallRequest {
                    node_id: NodeId::new("C"),
                    action: "math.add".to_string(),
                    params: Value::Null,
                    meta: Value::Null,
                    timeout: None,
                    level: None,
                    metrics: None,
                    parent_id: None,
                    request_id: None,
                })
                .await
        })
    };

    tokio::task::yield_now().await;
    let published = harness.sent();
    let request_id = match published.last().map(|p| &p.payload) {
        Some(Payload::Request(req)) => req.id.clone(),
        other => panic!("expected a published REQUEST, got {other:?}"),
    };

    let disconnect = Packet::new(NodeId::new("C"), Payload::Disconnect);
    transit.on_message(encode(&disconnect)).await;

    let outcome = call.await.unwrap().unwrap();
    assert!(outcome.unwrap_err().message.contains("rejected"));

    // A RESPONSE for the same id arriving afterward must be a table miss,
    // not a second completion (the oneshot is already consumed).
    let late_response = Packet::new(
        NodeId::new("C"),
        Payload::Response(transit::packet::ResponsePayload {
            id: request_id,
            success: true,
            data: Some(json!(5)),
            error: None,
        }),
    );
    transit.on_message(encode(&late_response)).await;
}

/// S5 — protocol version mismatch: dropped before any handler runs, no
/// RESPONSE or other side effect is observed.
#[tokio::test]
async fn version_mismatch_is_dropped_without_side_effects() {
    let harness = Harness::new(0);
    let transit = harness.transit.clone();

    let mut packet = Packet::new(
        NodeId::new("peer"),
        Payload::Request(RequestPayload {
            id: "r1".to_string(),
            action: "math.add".to_string(),
            params: Value::Null,
            meta: Value::Null,
            timeout: None,
            level: None,
            metrics: None,
            parent_id: None,
            request_id: None,
        }),
    );
    packet.ver = "3".to_string();

    transit.on_message(encode(&packet)).await;

    assert_eq!(transit.stats().packets_received(), 1);
    assert_eq!(harness.sent().len(), 0);
}

/// Self-echo filter: DISCOVER from ourselves is dropped; REQUEST from
/// ourselves is still processed (balancer loopback).
#[tokio::test]
async fn self_echo_filter_is_command_specific() {
    let harness = Harness::new(0);
    let transit = harness.transit.clone();

    let discover = Packet::new(NodeId::new("self-node"), Payload::Discover);
    transit.on_message(encode(&discover)).await;
    assert_eq!(harness.sent().len(), 0, "DISCOVER self-echo must be dropped");

    let request = Packet::new(
        NodeId::new("self-node"),
        Payload::Request(RequestPayload {
            id: "r2".to_string(),
            action: "math.add".to_string(),
            params: Value::Null,
            meta: Value::Null,
            timeout: None,
            level: None,
            metrics: None,
            parent_id: None,
            request_id: None,
        }),
    );
    transit.on_message(encode(&request)).await;
    let sent = harness.sent();
    assert_eq!(sent.len(), 1, "REQUEST self-echo must still produce a RESPONSE");
    assert_eq!(
        sent[0].target,
        Some(NodeId::new("self-node")),
        "RESPONSE must be targeted back at the requester, not broadcast"
    );
}

/// S4 — PING/PONG clock skew: the worked example from the wire contract.
#[tokio::test]
async fn ping_pong_emits_elapsed_time_and_time_diff() {
    let clock = Arc::new(TestClock::new(1000));
    let mut config = TransitConfig::default();
    config.max_queue_size = 0;
    let transit = Transit::new(
        NodeId::new("self-node"),
        MockTransporter::new(),
        Arc::new(MockBroker {
            node_id: NodeId::new("self-node"),
            local_events: Mutex::new(Vec::new()),
        }),
        Arc::new(MockRegistry {
            disconnected: Mutex::new(Vec::new()),
        }),
        Arc::new(DefaultContextFactory),
        Arc::new(JsonSerializer),
        clock.clone(),
        config,
    );
    transit.mark_subscribed();

    clock.set(1100);
    let pong = Packet::new(
        NodeId::new("D"),
        Payload::Pong(PongPayload {
            time: 1000,
            arrived: 1040,
        }),
    );
    transit.on_message(encode(&pong)).await;
}

/// A received PING must produce a PONG targeted back at the sender, not a
/// broadcast indistinguishable from one sent to every peer.
#[tokio::test]
async fn ping_reply_is_targeted_at_the_sender() {
    let harness = Harness::new(0);
    let transit = harness.transit.clone();

    let ping = Packet::new(
        NodeId::new("D"),
        Payload::Ping(transit::packet::PingPayload { time: 1000 }),
    );
    transit.on_message(encode(&ping)).await;

    let sent = harness.sent();
    assert_eq!(sent.len(), 1);
    assert!(matches!(sent[0].payload, Payload::Pong(_)));
    assert_eq!(sent[0].target, Some(NodeId::new("D")));
}

/// S6 — queue full: a third concurrent request over `maxQueueSize=2` is
/// rejected with the real current size, not an unrelated `.length`.
#[tokio::test]
async fn queue_full_rejects_third_request() {
    let harness = Harness::new(2);
    let transit = harness.transit.clone();

    let _a = {
        let transit = transit.clone();
        tokio::spawn(async move {
            transit
                .request(CallRequest {
                    node_id: NodeId::new("B"),
                    action: "a".to_string(),
                    params: Value::Null,
                    meta: Value::Null,
                    timeout: None,
                    level: None,
                    metrics: None,
                    parent_id: None,
                    request_id: None,
                })
                .await
        })
    };
    let _b = {
        let transit = transit.clone();
        tokio::spawn(async move {
            transit
                .request(CallRequest {
                    node_id: NodeId::new("B"),
                    action: "b".to_string(),
                    params: Value::Null,
                    meta: Value::Null,
                    timeout: None,
                    level: None,
                    metrics: None,
                    parent_id: None,
                    request_id: None,
                })
                .await
        })
    };
    tokio::task::yield_now().await;

    let third = transit
        .request(CallRequest {
            node_id: NodeId::new("B"),
            action: "c".to_string(),
            params: Value::Null,
            meta: Value::Null,
            timeout: None,
            level: None,
            metrics: None,
            parent_id: None,
            request_id: None,
        })
        .await;

    match third {
        Err(TransitError::QueueFull { size, limit, .. }) => {
            assert_eq!(size, 2);
            assert_eq!(limit, 2);
        }
        other => panic!("expected QueueFull, got {other:?}"),
    }
}

/// `connect()` must not resolve until the post-connect handshake has
/// actually declared the node connected, not merely once the transporter's
/// own connect future completes.
#[tokio::test]
async fn connect_resolves_only_after_handshake_completes() {
    let config = TransitConfig::default();
    let transit = Transit::new(
        NodeId::new("self-node"),
        MockTransporter::new(),
        Arc::new(MockBroker {
            node_id: NodeId::new("self-node"),
            local_events: Mutex::new(Vec::new()),
        }),
        Arc::new(MockRegistry {
            disconnected: Mutex::new(Vec::new()),
        }),
        Arc::new(DefaultContextFactory),
        Arc::new(JsonSerializer),
        Arc::new(SystemClock),
        config,
    );

    transit.connect().await;

    assert_eq!(transit.state(), TransitState::Connected);
}
