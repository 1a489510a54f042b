//! Integration tests for eventgraph-core
//!
//! Tests the public API: a hand-written snapshot file and a custom
//! [`CodeIndex`] driven through `build_graph` and `export`.

use std::collections::HashMap;

use async_trait::async_trait;
use eventgraph_core::{
    BusDefinition, CallerInfo, CallingContext, CodeIndex, ExportOptions, IndexError,
    IndexSummary, LineSpan, Location, ResolvedMethodCall, SnapshotIndex, SymbolId, TypeId,
    build_graph, export,
};
use tempfile::tempdir;

const SNAPSHOT: &str = r#"{
  "types": [
    {
      "id": "Core.Events.EventBus",
      "full_name": "Core.Events.EventBus",
      "members": [
        {
          "id": "Core.Events.EventBus.Publish#0",
          "name": "Publish",
          "callers": [
            {
              "context": { "class_name": "Checkout", "method_name": "Complete", "assembly_name": "Game" },
              "locations": [
                { "file_path": "Checkout.cs", "span": { "start_line": 10, "start_column": 13, "end_line": 10, "end_column": 20 } }
              ]
            }
          ]
        },
        {
          "id": "Core.Events.EventBus.Subscribe#0",
          "name": "Subscribe",
          "callers": [
            {
              "context": { "class_name": "Mailer", "method_name": "OnEnable", "assembly_name": "Game" },
              "locations": [
                { "file_path": "Mailer.cs", "span": { "start_line": 4, "start_column": 9, "end_line": 6, "end_column": 10 } },
                { "span": { "start_line": 1, "start_column": 1, "end_line": 1, "end_column": 1 } }
              ]
            }
          ]
        }
      ]
    }
  ],
  "invocations": [
    {
      "location": { "file_path": "Checkout.cs", "span": { "start_line": 10, "start_column": 13, "end_line": 10, "end_column": 20 } },
      "call": { "method_name": "Publish", "type_arguments": ["OrderCreated"] }
    },
    {
      "location": { "file_path": "Mailer.cs", "span": { "start_line": 4, "start_column": 9, "end_line": 6, "end_column": 10 } },
      "call": { "method_name": "Subscribe", "type_arguments": ["OrderCreated"] }
    }
  ]
}"#;

#[tokio::test]
async fn test_snapshot_file_to_report() {
    let dir = tempdir().unwrap();
    let snapshot_path = dir.path().join("index.json");
    std::fs::write(&snapshot_path, SNAPSHOT).unwrap();

    let index = SnapshotIndex::from_file(&snapshot_path).unwrap();
    let graph = build_graph(&index, &BusDefinition::default()).await;

    let stats = graph.stats();
    assert_eq!(stats.nodes, 1);
    assert_eq!(stats.outgoing, 1);
    assert_eq!(stats.incoming, 1, "location outside source is skipped");

    let out = dir.path().join("report.json");
    let summary = export(&graph.nodes, &out, ExportOptions { pretty: false }).unwrap();
    assert_eq!(summary.classes, 2);
    assert_eq!(summary.records, 2);

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(report["Checkout"][0]["LineSpan"], "10");
    assert_eq!(report["Mailer"][0]["LineSpan"], "4-6");
    assert_eq!(report["Mailer"][0]["Direction"], "Incoming");
}

#[test]
fn test_malformed_snapshot_is_rejected() {
    let err = SnapshotIndex::from_json("{ \"types\": 3 }").unwrap_err();
    assert!(matches!(err, IndexError::Snapshot(_)));
}

/// An index whose caller lookup fails for one symbol.
struct FlakyIndex {
    callers: HashMap<SymbolId, Result<Vec<CallerInfo>, String>>,
    calls: HashMap<Location, ResolvedMethodCall>,
}

impl FlakyIndex {
    fn new() -> Self {
        let publish = Location::in_source("Shop.cs", LineSpan::line(3));
        let exclusive = Location::in_source("Shop.cs", LineSpan::line(7));

        let mut callers = HashMap::new();
        callers.insert(
            SymbolId::new("Publish"),
            Ok(vec![CallerInfo {
                context: CallingContext::new("Shop", "Buy", "Game"),
                locations: vec![publish.clone()],
            }]),
        );
        callers.insert(
            SymbolId::new("PublishExclusive"),
            Err("symbol table unavailable".to_string()),
        );

        let mut calls = HashMap::new();
        calls.insert(
            publish,
            ResolvedMethodCall::new("Publish", vec!["ItemBought".to_string()]),
        );
        calls.insert(
            exclusive,
            ResolvedMethodCall::new("PublishExclusive", vec!["ItemSold".to_string()]),
        );

        Self { callers, calls }
    }
}

#[async_trait]
impl CodeIndex for FlakyIndex {
    async fn find_type_by_full_name(&self, full_name: &str) -> Option<TypeId> {
        (full_name == "Core.Events.EventBus").then(|| TypeId::new(full_name))
    }

    async fn members_by_name(&self, _ty: &TypeId, member_name: &str) -> Vec<SymbolId> {
        let symbol = SymbolId::new(member_name);
        if self.callers.contains_key(&symbol) {
            vec![symbol]
        } else {
            Vec::new()
        }
    }

    async fn find_callers_of(&self, symbol: &SymbolId) -> Result<Vec<CallerInfo>, IndexError> {
        match self.callers.get(symbol) {
            Some(Ok(callers)) => Ok(callers.clone()),
            Some(Err(reason)) => Err(IndexError::Query(reason.clone())),
            None => Ok(Vec::new()),
        }
    }

    async fn resolve_invocation_at(&self, location: &Location) -> Option<ResolvedMethodCall> {
        self.calls.get(location).cloned()
    }

    fn summary(&self) -> IndexSummary {
        IndexSummary {
            backend: "flaky".to_string(),
            documents: 1,
            types: 1,
        }
    }
}

#[tokio::test]
async fn test_failed_caller_lookup_is_isolated() {
    let index = FlakyIndex::new();

    let graph = build_graph(&index, &BusDefinition::default()).await;

    assert_eq!(graph.nodes.len(), 1);
    assert_eq!(graph.nodes[0].event_type, "ItemBought");
    assert!(graph.node("ItemSold").is_none());
}
