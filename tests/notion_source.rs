mod support;

use mockito::Matcher;
use serde_json::json;
use task_digest::config::{SourceConfig, SourceCredentials};
use task_digest::error::Error;
use task_digest::notion::NotionClient;
use task_digest::source::{fetch_all, MappingRules, QueryFilter};
use task_digest::task::Priority;

use support::{jst, jst_now, notion_page, query_response};

fn client(server: &mockito::Server) -> NotionClient {
    let config = SourceConfig {
        api_base: server.url(),
        ..SourceConfig::default()
    };
    let credentials = SourceCredentials {
        token: "secret_token".to_string(),
        database_id: "db123".to_string(),
    };
    NotionClient::new(&credentials, &config).expect("client")
}

fn filter() -> QueryFilter {
    QueryFilter::for_run(jst_now(2024, 6, 10, 9, 0), 3, &SourceConfig::default())
}

fn rules() -> MappingRules {
    MappingRules::from_config(&SourceConfig::default(), jst())
}

#[test]
fn fetches_every_page_and_maps_records() {
    let mut server = mockito::Server::new();
    let second = server
        .mock("POST", "/databases/db123/query")
        .match_body(Matcher::PartialJson(json!({ "start_cursor": "cursor-2" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(query_response(
            vec![notion_page(
                "p3",
                "Ranged",
                "2024-06-09",
                Some("2024-06-12T18:00:00+09:00"),
                None,
            )],
            None,
        ))
        .expect(1)
        .create();
    let first = server
        .mock("POST", "/databases/db123/query")
        .match_header("authorization", "Bearer secret_token")
        .match_header("notion-version", "2022-06-28")
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(json!({ "page_size": 100 })),
            Matcher::Regex(r#""is_not_empty":true"#.to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(query_response(
            vec![
                notion_page("p1", "Pay invoice", "2024-06-10", None, Some("High")),
                notion_page("p2", "", "2024-06-11", None, None),
            ],
            Some("cursor-2"),
        ))
        .expect(1)
        .create();

    let fetched = fetch_all(&client(&server), &filter(), &rules()).expect("fetch");

    first.assert();
    second.assert();
    assert_eq!(fetched.skipped, 1);
    let tasks = fetched.tasks;
    let ids: Vec<&str> = tasks.iter().map(|task| task.id()).collect();
    assert_eq!(ids, vec!["p1", "p3"]);
    assert_eq!(tasks[0].priority(), Some(Priority::High));
    assert_eq!(tasks[0].url(), "https://www.notion.so/p1");
    assert_eq!(
        tasks[1].effective_due().expect("due").at().to_string(),
        "2024-06-12 18:00:00"
    );
}

#[test]
fn range_ending_after_window_is_dropped() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/databases/db123/query")
        .with_status(200)
        .with_body(query_response(
            vec![
                notion_page("inside", "Inside", "2024-06-12", None, None),
                notion_page("outside", "Outside", "2024-06-09", Some("2024-06-20"), None),
            ],
            None,
        ))
        .create();

    let fetched = fetch_all(&client(&server), &filter(), &rules()).expect("fetch");
    mock.assert();
    let ids: Vec<&str> = fetched.tasks.iter().map(|task| task.id()).collect();
    assert_eq!(ids, vec!["inside"]);
    assert_eq!(fetched.skipped, 0);
}

#[test]
fn api_error_aborts_the_fetch() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/databases/db123/query")
        .with_status(401)
        .with_body(r#"{"object":"error","status":401,"code":"unauthorized","message":"API token is invalid."}"#)
        .create();

    let err = fetch_all(&client(&server), &filter(), &rules()).expect_err("unauthorized");
    mock.assert();
    match err {
        Error::SourceFetch(reason) => assert!(reason.contains("unauthorized"), "{reason}"),
        other => panic!("unexpected error: {other}"),
    }
}
