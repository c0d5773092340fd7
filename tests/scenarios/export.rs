use futures::TryStreamExt;
use serde_json::json;
use tally_sf::bulk::{BulkExportReader, ExportSource, Row};
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{bulk, requests, API};

const JOB: &str = "750xx00000000E1AAA";

async fn mount_two_pages(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("{API}/jobs/query/{JOB}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": JOB, "state": "JobComplete", "operation": "query"
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/jobs/query/{JOB}/results")))
        .and(query_param_is_missing("locator"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Sforce-Locator", "cGFnZTI")
                .set_body_string("\"Id\",\"Note__c\"\n\"a05A\",\"first\"\n\"a05B\",\"nul\0here\"\n"),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/jobs/query/{JOB}/results")))
        .and(query_param("locator", "cGFnZTI"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Sforce-Locator", "null")
                .set_body_string("\"Id\",\"Note__c\"\n\"a05C\",\"last\"\n"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn export_by_job_id_never_submits_a_query() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;

    let reader = BulkExportReader::new(bulk(&server), ExportSource::Job(JOB.to_string()));
    let rows: Vec<Row> = reader.into_rows().try_collect().await.unwrap();

    let ids: Vec<&str> = rows.iter().map(|r| r["Id"].as_str()).collect();
    assert_eq!(ids, ["a05A", "a05B", "a05C"]);
    assert_eq!(rows[1]["Note__c"], "nul\0here");
    assert!(requests(&server, "POST", &format!("{API}/jobs/query"))
        .await
        .is_empty());
}

#[tokio::test]
async fn export_resumes_from_saved_locator() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;

    let mut reader = BulkExportReader::new(bulk(&server), ExportSource::Job(JOB.to_string()));
    let first = reader.next_page().await.unwrap().unwrap();
    assert_eq!(first.len(), 2);
    let saved_job = reader.job_id().unwrap().to_string();
    let saved_locator = reader.locator().unwrap().to_string();
    drop(reader);

    let polls_before = requests(&server, "GET", &format!("{API}/jobs/query/{JOB}"))
        .await
        .len();

    let resumed = BulkExportReader::resume_at(bulk(&server), saved_job, saved_locator);
    let rest: Vec<Row> = resumed.into_rows().try_collect().await.unwrap();

    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0]["Note__c"], "last");
    let polls_after = requests(&server, "GET", &format!("{API}/jobs/query/{JOB}"))
        .await
        .len();
    assert_eq!(polls_before, polls_after);
}

#[tokio::test]
async fn export_surfaces_failed_job() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{API}/jobs/query")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": JOB, "state": "UploadComplete", "operation": "query"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/jobs/query/{JOB}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": JOB, "state": "Aborted", "operation": "query"
        })))
        .mount(&server)
        .await;

    let mut reader = BulkExportReader::new(
        bulk(&server),
        ExportSource::Query("SELECT Id FROM IntegrationError__c".to_string()),
    );
    let err = reader.next_page().await.unwrap_err();

    assert!(err.is_job_failure());
    assert!(err.to_string().contains("Aborted"));
}
