//! Cross-crate integration and E2E tests
//!
//! These tests run C# sources through the source index, the graph pipeline
//! and the exporter, and check the report written to disk.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use eventgraph_core::testing::{CallFixture, SnapshotBuilder};
use eventgraph_core::{
    BusDefinition, Direction, ExportOptions, Snapshot, SnapshotIndex, build_graph, export,
};
use eventgraph_csharp::{LoadOptions, SourceIndex};
use serde_json::{Value, json};
use tempfile::TempDir;
use tracing_subscriber::fmt::MakeWriter;

const BUS: &str = r#"namespace Core.Events
{
    public interface IEvent {}

    public class EventBus
    {
        public void Publish(IEvent evt) { }
        public void Publish<T>(T evt) where T : IEvent { }
        public void Publish<T, U>(T first, U second) { }
        public void PublishExclusive<T>(T evt) where T : IEvent { }
        public void Subscribe<T>(System.Action<T> handler) where T : IEvent { }
        public void SubscribeOnce<T>(System.Action<T> handler) where T : IEvent { }
        public void SubscribeUntilTrue<T>(System.Func<T, bool> handler) where T : IEvent { }
        public void SetSubscribed<T>(System.Action<T> handler, bool subscribed) where T : IEvent { }
    }
}
"#;

// Publish<OrderCreated> sits on line 10
const CHECKOUT: &str = r#"using Core.Events;

public class Checkout
{
    private EventBus bus;

    public void Complete()
    {
        // order confirmed
        bus.Publish<OrderCreated>(new OrderCreated());
    }
}
"#;

const MAILER: &str = r#"using Core.Events;

public class Mailer
{
    private EventBus bus;

    void OnEnable()
    {
        bus.Subscribe<OrderCreated>(OnOrder);
    }
}
"#;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (relative, content) in files {
        write(dir.path(), relative, content);
    }
    dir
}

/// Index `root`, build the graph, export it and read the report back.
async fn analyze(root: &Path) -> Value {
    let index = SourceIndex::load(root, &LoadOptions::default()).unwrap();
    let graph = build_graph(&index, &BusDefinition::default()).await;

    let out = root.join("out").join("eventgraph.json");
    export(&graph.nodes, &out, ExportOptions::default()).unwrap();
    serde_json::from_str(&fs::read_to_string(out).unwrap()).unwrap()
}

/// Log output shared with a test subscriber.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run [`analyze`] with warnings captured, returning the report and the log text.
fn analyze_with_warnings(root: &Path) -> (Value, String) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();

    let report = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(analyze(root))
    });
    (report, logs.contents())
}

/// E2E Test: a codebase without the bus type exports an empty object and says why
#[test]
fn test_e2e_bus_type_absent() {
    let dir = project(&[("Player.cs", "public class Player { void Jump() { Publish(); } }")]);

    let (report, logs) = analyze_with_warnings(dir.path());
    assert_eq!(report, json!({}));
    assert!(
        logs.contains("Could not find Core.Events.EventBus in the index"),
        "missing bus warning in: {logs}"
    );
    assert!(logs.contains("does not use the expected event-bus type"));
}

/// E2E Test: one publication produces one record under its class
#[tokio::test]
async fn test_e2e_single_publication() {
    let dir = project(&[("Bus.cs", BUS), ("Checkout.cs", CHECKOUT)]);

    let report = analyze(dir.path()).await;
    assert_eq!(
        report,
        json!({
            "Checkout": [{
                "EventType": "OrderCreated",
                "MethodName": "Complete",
                "FilePath": "Checkout.cs",
                "LineSpan": "10",
                "AssemblyName": "Assembly-CSharp",
                "Direction": "Outgoing"
            }]
        })
    );
}

/// E2E Test: publication and subscription merge into one node
#[tokio::test]
async fn test_e2e_publish_and_subscribe_merge() {
    let dir = project(&[
        ("Bus.cs", BUS),
        ("Checkout.cs", CHECKOUT),
        ("Mailer.cs", MAILER),
    ]);

    let index = SourceIndex::load(dir.path(), &LoadOptions::default()).unwrap();
    let graph = build_graph(&index, &BusDefinition::default()).await;

    assert_eq!(graph.nodes.len(), 1);
    let node = &graph.nodes[0];
    assert_eq!(node.event_type, "OrderCreated");
    let directions: Vec<_> = node.connections.iter().map(|c| c.direction).collect();
    assert_eq!(directions, vec![Direction::Outgoing, Direction::Incoming]);

    let report = analyze(dir.path()).await;
    let classes: Vec<_> = report.as_object().unwrap().keys().cloned().collect();
    assert_eq!(classes, vec!["Checkout", "Mailer"]);
    assert_eq!(report["Checkout"][0]["Direction"], "Outgoing");
    assert_eq!(report["Mailer"][0]["Direction"], "Incoming");
    assert_eq!(report["Mailer"][0]["MethodName"], "OnEnable");
    assert_eq!(report["Mailer"][0]["LineSpan"], "9");
}

/// E2E Test: calls with two type arguments or none are left out of the report
#[test]
fn test_e2e_unsupported_arities_are_dropped() {
    let relay = r#"using Core.Events;

public class Relay
{
    private EventBus bus;

    void Forward(IEvent payload)
    {
        bus.Publish<OrderCreated, OrderShipped>(new OrderCreated(), new OrderShipped());
        bus.Publish(payload);
        bus.PublishExclusive<OrderShipped>(new OrderShipped());
    }
}
"#;
    let dir = project(&[("Bus.cs", BUS), ("Relay.cs", relay)]);

    let (report, logs) = analyze_with_warnings(dir.path());
    let records = report["Relay"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["EventType"], "OrderShipped");
    assert_eq!(records[0]["LineSpan"], "11");

    assert_eq!(
        logs.matches("ambiguous: 2 type arguments, expected 1").count(),
        1,
        "expected one ambiguity warning in: {logs}"
    );
    assert!(logs.contains("Relay.cs:9"), "warning names the call site: {logs}");
    assert!(!logs.contains("does not use the expected event-bus type"));
}

/// E2E Test: a captured snapshot rebuilds the same graph offline
#[tokio::test]
async fn test_e2e_snapshot_round_trip() {
    let dir = project(&[
        ("Bus.cs", BUS),
        ("Checkout.cs", CHECKOUT),
        ("Mailer.cs", MAILER),
    ]);
    let bus = BusDefinition::default();

    let index = SourceIndex::load(dir.path(), &LoadOptions::default()).unwrap();
    let live = build_graph(&index, &bus).await;

    let json = Snapshot::capture(&index, &bus).await.to_json(true).unwrap();
    let offline = SnapshotIndex::from_json(&json).unwrap();
    let replayed = build_graph(&offline, &bus).await;

    assert!(!live.is_empty());
    assert_eq!(replayed, live);
}

/// E2E Test: the project filter keeps only calls made from that assembly
#[tokio::test]
async fn test_e2e_project_filter() {
    let dir = project(&[
        ("Core/Core.asmdef", r#"{ "name": "Game.Core" }"#),
        ("Core/Bus.cs", BUS),
        ("Shop/Shop.asmdef", r#"{ "name": "Game.Shop" }"#),
        ("Shop/Checkout.cs", CHECKOUT),
        ("Mailer.cs", MAILER),
    ]);
    let options = LoadOptions {
        project: Some("Game.Shop".to_string()),
        ..Default::default()
    };

    let index = SourceIndex::load(dir.path(), &options).unwrap();
    let graph = build_graph(&index, &BusDefinition::default()).await;

    let node = graph.node("OrderCreated").unwrap();
    assert_eq!(node.connections.len(), 1);
    assert_eq!(node.connections[0].class_name, "Checkout");
    assert_eq!(node.connections[0].assembly_name, "Game.Shop");
    assert_eq!(node.connections[0].file_path, "Shop/Checkout.cs");
}

/// E2E Test: a hand-built index and the source index agree on the same calls
#[tokio::test]
async fn test_e2e_fixture_index_matches_sources() {
    let dir = project(&[
        ("Bus.cs", BUS),
        ("Checkout.cs", CHECKOUT),
        ("Mailer.cs", MAILER),
    ]);
    let bus = BusDefinition::default();

    let index = SourceIndex::load(dir.path(), &LoadOptions::default()).unwrap();
    let from_sources = build_graph(&index, &bus).await;

    let fixture = SnapshotBuilder::new()
        .with_type("Core.Events.EventBus", &["Publish", "Subscribe"])
        .with_call(
            "Publish",
            CallFixture::new("Checkout", "Complete", "Checkout.cs", 10).type_args(&["OrderCreated"]),
        )
        .with_call(
            "Subscribe",
            CallFixture::new("Mailer", "OnEnable", "Mailer.cs", 9).type_args(&["OrderCreated"]),
        )
        .build();
    let from_fixture = build_graph(&fixture, &bus).await;

    assert_eq!(from_fixture, from_sources);
}
