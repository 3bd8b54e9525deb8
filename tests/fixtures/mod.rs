//! Shared archives for integration tests.
#![allow(dead_code)]

use hivearchive_core::node::Node;
use hivearchive_planner::{MemoryTemplates, Registry};

pub const DYNAMO_SERDE_JAR: &str = "s3://warehouse-jars/hive-dynamodb-serde.jar";

/// Event pipeline feeding a DynamoDB-backed stats table:
///
/// ```text
/// atomic.events ─insert─▶ inputs.partitioned_events ─▶ events.searches ─▶ events.impressions ─┐
///                                                  └─▶ events.result_views ─────────────────────┴▶ dynamo.stage_dynamo_result_stats
///                                                                                      ─insert─▶ dynamo.dynamo_result_stats
/// ```
pub fn warehouse() -> Registry {
    let templates = MemoryTemplates::new()
        .with(
            "events.hql",
            "(user_id STRING, kind STRING, ts BIGINT)\nPARTITIONED BY (dt STRING)\nLOCATION 's3://atomic/events/'",
        )
        .with(
            "partitioned_events.hql",
            "(user_id STRING, kind STRING, ts BIGINT)\nPARTITIONED BY (dt STRING)\nLOCATION 's3://inputs/partitioned_events/'",
        )
        .with(
            "insert_overwrite_partitioned_events.hql",
            "PARTITION (dt)\nSELECT user_id, kind, ts, dt FROM {{ inputs.events }}",
        )
        .with(
            "searches.hql",
            "SELECT * FROM {{ inputs.partitioned_events }} WHERE kind = 'search'",
        )
        .with(
            "impressions.hql",
            "SELECT user_id, count(*) AS shown FROM {{ inputs.searches }} GROUP BY user_id",
        )
        .with(
            "result_views.hql",
            "SELECT user_id, count(*) AS viewed FROM {{ inputs['partitioned_events'] }} WHERE kind = 'view' GROUP BY user_id",
        )
        .with(
            "stage_dynamo_result_stats.hql",
            "SELECT i.user_id, i.shown, v.viewed\nFROM {{ inputs.impressions }} i\nJOIN {{ inputs.result_views }} v ON i.user_id = v.user_id;",
        )
        .with(
            "dynamo_result_stats.hql",
            "(user_id STRING, shown BIGINT, viewed BIGINT)\nSTORED BY 'org.apache.hadoop.hive.dynamodb.DynamoDBStorageHandler'\nTBLPROPERTIES ('dynamodb.table.name' = 'result_stats')",
        )
        .with(
            "insert_overwrite_dynamo_result_stats.hql",
            "SELECT * FROM {{ inputs.stage_dynamo_result_stats }}",
        );

    let mut reg = Registry::new("tests", templates);
    reg.add(Node::external_table("atomic", "events").partitioned())
        .unwrap();
    reg.add(Node::external_table("inputs", "partitioned_events").partitioned())
        .unwrap();
    reg.add(
        Node::insert_overwrite("insert_overwrite_partitioned_events", "partitioned_events")
            .with_inputs(["events"])
            .with_setting("hive.exec.dynamic.partition.mode", "nonstrict")
            .with_setting("hive.enforce.bucketing", "true"),
    )
    .unwrap();
    reg.add(Node::view("events", "searches").with_inputs(["partitioned_events"]))
        .unwrap();
    reg.add(Node::view("events", "impressions").with_inputs(["searches"]))
        .unwrap();
    reg.add(Node::view("events", "result_views").with_inputs(["partitioned_events"]))
        .unwrap();
    reg.add(
        Node::table("dynamo", "stage_dynamo_result_stats").with_inputs(["impressions", "result_views"]),
    )
    .unwrap();
    reg.add(Node::external_table("dynamo", "dynamo_result_stats").with_resource("jar", DYNAMO_SERDE_JAR))
        .unwrap();
    reg.add(
        Node::insert_overwrite("insert_overwrite_dynamo_result_stats", "dynamo_result_stats")
            .with_inputs(["stage_dynamo_result_stats"])
            .with_resource("jar", DYNAMO_SERDE_JAR)
            .with_setting("dynamodb.throughput.write.percent", "1.0")
            .with_setting("hive.exec.compress.output", "false")
            .with_setting("mapred.reduce.tasks", "8"),
    )
    .unwrap();
    reg
}

/// `events ← partitioned_events ← searches ← impressions`, with `impressions`
/// read by two reports. Ambiguous nodes use `threshold`.
pub fn funnel(threshold: u32) -> Registry {
    let templates = MemoryTemplates::new()
        .with("events.hql", "PARTITIONED BY (dt STRING)\nLOCATION 's3://atomic/events/'")
        .with(
            "partitioned_events.hql",
            "LOCATION 's3://inputs/partitioned_events/'\n-- reads {{ inputs.events }}",
        )
        .with("searches.hql", "SELECT * FROM {{ inputs.partitioned_events }}")
        .with("impressions.hql", "SELECT * FROM {{ inputs.searches }}")
        .with("daily.hql", "SELECT dt, count(*) FROM {{ inputs.impressions }} GROUP BY dt")
        .with("weekly.hql", "SELECT count(*) FROM {{ inputs.impressions }}");

    let mut reg = Registry::new("funnel", templates);
    reg.add(Node::external_table("atomic", "events").partitioned())
        .unwrap();
    reg.add(Node::external_table("inputs", "partitioned_events").with_inputs(["events"]))
        .unwrap();
    reg.add(
        Node::view_until_table("events", "searches")
            .with_threshold(threshold)
            .with_inputs(["partitioned_events"]),
    )
    .unwrap();
    reg.add(
        Node::view_until_table("events", "impressions")
            .with_threshold(threshold)
            .with_inputs(["searches"]),
    )
    .unwrap();
    reg.add(Node::view("reports", "daily").with_inputs(["impressions"]))
        .unwrap();
    reg.add(Node::view("reports", "weekly").with_inputs(["impressions"]))
        .unwrap();
    reg
}
