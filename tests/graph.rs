use serde_json::json;
use sset::{
    Error,
    graph::{Graph, GraphParts},
};

fn org_chart() -> Graph {
    Graph::from_parts(GraphParts {
        nodes: vec![
            json!({"id": "ceo", "name": "Grace"}),
            json!({"id": "cto", "name": "Alan"}),
            json!({"id": "dev", "name": "Ada"}),
        ],
        edges: vec![
            json!({"id": "e1", "from": "ceo", "to": "cto", "kind": "manages"}),
            json!({"id": "e2", "from": "cto", "to": "dev", "kind": "manages"}),
        ],
    })
    .unwrap()
}

#[test]
fn traversal() {
    let chart = org_chart();
    let reports = chart.reached_by_id(&"cto").unwrap();
    assert_eq!(reports.to_parts().nodes, vec![json!({"id": "dev", "name": "Ada"})]);

    let two_levels = chart
        .reached_by_id(&"ceo")
        .unwrap()
        .nodes()
        .iter()
        .map(|manager| chart.reached_by_id(&manager["id"]).unwrap())
        .fold(Graph::new(), |acc, g| acc.union(&g));
    assert!(two_levels.has_node_id(&"dev").unwrap());
}

#[test]
fn edits_are_persistent() {
    let chart = org_chart();
    let promoted = chart
        .update_node(
            &json!({"id": "dev", "name": "Ada"}),
            &json!({"id": "dev", "name": "Ada", "title": "lead"}),
        )
        .unwrap()
        .toggle_edge(&json!({"id": "e3", "from": "ceo", "to": "dev"}))
        .unwrap();

    assert_eq!(promoted.node_by_id(&"dev").unwrap()["title"], "lead");
    assert_eq!(promoted.edges_from(&"ceo").unwrap().edges().len(), 2);
    assert!(chart.node_by_id(&"dev").unwrap().get("title").is_none());
    assert_eq!(chart.edges_from(&"ceo").unwrap().edges().len(), 1);

    let back = promoted
        .toggle_edge(&json!({"id": "e3", "from": "ceo", "to": "dev"}))
        .unwrap();
    assert!(!back.has_edge_id(&"e3").unwrap());
}

#[test]
fn missing_things_are_errors() {
    let chart = org_chart();
    assert!(matches!(
        chart.node_by_id(&"intern"),
        Err(Error::NodeIdNotFound { .. })
    ));
    assert!(matches!(
        chart.update_edge(&json!({"id": "e9"}), &json!({"id": "e9", "from": "a"})),
        Err(Error::ValueNotFound { .. })
    ));
    assert!(matches!(
        chart.add_node(&json!({"id": "ceo", "name": "Grace"})),
        Err(Error::ValueAlreadyExists { .. })
    ));
}

#[test]
fn graphs_serialize_as_two_sets() {
    let chart = org_chart();
    let document = serde_json::to_value(&chart).unwrap();
    assert_eq!(document["nodes"]["props"]["size"], 3);
    assert_eq!(document["edges"]["props"]["size"], 2);

    let back: Graph = serde_json::from_value(document).unwrap();
    assert_eq!(back, chart);
}
