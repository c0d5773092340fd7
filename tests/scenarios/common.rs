use std::time::Duration;

use serde_json::{json, Value};
use tally_sf::bulk::BulkApiClient;
use tally_sf::runs::Session;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const API: &str = "/services/data/v62.0";
pub const POLL: Duration = Duration::from_millis(10);

pub fn session(server: &MockServer) -> Session {
    Session::new(server.uri(), "test-token")
        .expect("session")
        .with_poll_interval(POLL)
}

pub fn bulk(server: &MockServer) -> BulkApiClient {
    BulkApiClient::new(server.uri(), "test-token")
        .expect("bulk client")
        .with_poll_interval(POLL)
}

pub fn created(id: &str) -> ResponseTemplate {
    ResponseTemplate::new(201).set_body_json(json!({"id": id, "success": true, "errors": []}))
}

/// Requests received so far for `method` on `path`, bodies parsed as JSON.
pub async fn json_bodies(server: &MockServer, method_name: &str, req_path: &str) -> Vec<Value> {
    requests(server, method_name, req_path)
        .await
        .iter()
        .map(|r| serde_json::from_slice(&r.body).expect("json body"))
        .collect()
}

pub async fn requests(server: &MockServer, method_name: &str, req_path: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .into_iter()
        .filter(|r| r.method.as_str() == method_name && r.url.path() == req_path)
        .collect()
}

/// Mount a Bulk 2.0 ingest job that completes with `failed` failed records.
///
/// Every job created on this server gets `job_id`.
pub async fn mount_ingest_job(server: &MockServer, job_id: &str, failed: i64, failed_csv: &str) {
    let job = |state: &str| {
        json!({
            "id": job_id,
            "state": state,
            "object": "IntegrationError__c",
            "operation": "delete",
            "numberRecordsProcessed": 0,
            "numberRecordsFailed": failed,
            "apiVersion": 62.0
        })
    };

    Mock::given(method("POST"))
        .and(path(format!("{API}/jobs/ingest")))
        .respond_with(ResponseTemplate::new(200).set_body_json(job("Open")))
        .mount(server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("{API}/jobs/ingest/{job_id}/batches")))
        .respond_with(ResponseTemplate::new(201))
        .mount(server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(format!("{API}/jobs/ingest/{job_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(job("UploadComplete")))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/jobs/ingest/{job_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(job("JobComplete")))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/jobs/ingest/{job_id}/failedResults")))
        .respond_with(ResponseTemplate::new(200).set_body_string(failed_csv))
        .mount(server)
        .await;
}

/// Mount a finished query job whose results come back as one CSV page.
pub async fn mount_query_results(server: &MockServer, job_id: &str, csv: &str) {
    Mock::given(method("GET"))
        .and(path(format!("{API}/jobs/query/{job_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": job_id, "state": "JobComplete", "operation": "query"
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/jobs/query/{job_id}/results")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Sforce-Locator", "null")
                .set_body_string(csv),
        )
        .mount(server)
        .await;
}
