use serde_json::json;
use tally_sf::runs::{ErrorKind, LedgerConfig, LogLevel, RunLedger};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{created, json_bodies, mount_ingest_job, requests, session, API};

const INTEGRATION_NAME: &str = "example-integration";
const INTEGRATION_ID: &str = "a00000000000001AAA";
const EXECUTION_ID: &str = "a01000000000001AAA";

fn unmanaged() -> LedgerConfig {
    LedgerConfig::new().with_namespace("")
}

async fn mount_integration_lookup(server: &MockServer, object: &str, found: bool) {
    let records = if found {
        json!([{"attributes": {"type": object}, "Id": INTEGRATION_ID}])
    } else {
        json!([])
    };
    Mock::given(method("GET"))
        .and(path(format!("{API}/query")))
        .and(query_param(
            "q",
            format!("SELECT Id FROM {object} WHERE Name = '{INTEGRATION_NAME}' LIMIT 1"),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": records.as_array().map(Vec::len).unwrap_or(0),
            "done": true,
            "records": records
        })))
        .mount(server)
        .await;
}

async fn mount_execution_create(server: &MockServer, object: &str) {
    Mock::given(method("POST"))
        .and(path(format!("{API}/sobjects/{object}")))
        .respond_with(created(EXECUTION_ID))
        .mount(server)
        .await;
}

async fn started_ledger(server: &MockServer) -> RunLedger {
    mount_integration_lookup(server, "Integration__c", true).await;
    mount_execution_create(server, "IntegrationExecution__c").await;
    RunLedger::start(
        session(server),
        &unmanaged(),
        INTEGRATION_NAME,
        &json!({"start_date": "2021-10-12"}),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn start_creates_one_execution_with_payload() {
    let server = MockServer::start().await;
    let ledger = started_ledger(&server).await;

    assert_eq!(ledger.execution_id(), EXECUTION_ID);
    assert_eq!(ledger.integration_id(), INTEGRATION_ID);
    assert!(!ledger.is_finished());

    let bodies = json_bodies(&server, "POST", &format!("{API}/sobjects/IntegrationExecution__c")).await;
    assert_eq!(
        bodies,
        [json!({
            "Integration__c": INTEGRATION_ID,
            "ExecutionPayload__c": "{\"start_date\": \"2021-10-12\"}"
        })]
    );
}

#[tokio::test]
async fn start_uses_managed_names() {
    let server = MockServer::start().await;
    mount_integration_lookup(&server, "KicksawEng__Integration__c", true).await;
    mount_execution_create(&server, "KicksawEng__IntegrationExecution__c").await;

    RunLedger::start(session(&server), &LedgerConfig::default(), INTEGRATION_NAME, &json!({}))
        .await
        .unwrap();

    let bodies = json_bodies(
        &server,
        "POST",
        &format!("{API}/sobjects/KicksawEng__IntegrationExecution__c"),
    )
    .await;
    assert_eq!(bodies[0]["KicksawEng__Integration__c"], INTEGRATION_ID);
    assert_eq!(bodies[0]["KicksawEng__ExecutionPayload__c"], "{}");
}

#[tokio::test]
async fn missing_integration_fails_without_create_missing() {
    let server = MockServer::start().await;
    mount_integration_lookup(&server, "Integration__c", false).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let err = RunLedger::start(session(&server), &unmanaged(), INTEGRATION_NAME, &json!({}))
        .await
        .unwrap_err();

    assert!(matches!(err.kind, ErrorKind::IntegrationNotFound(ref name) if name == INTEGRATION_NAME));
}

#[tokio::test]
async fn missing_integration_is_created_once() {
    let server = MockServer::start().await;
    mount_integration_lookup(&server, "Integration__c", false).await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/sobjects/Integration__c")))
        .and(body_json(json!({"Name": INTEGRATION_NAME, "LambdaName__c": "example-lambda"})))
        .respond_with(created(INTEGRATION_ID))
        .expect(1)
        .mount(&server)
        .await;
    mount_execution_create(&server, "IntegrationExecution__c").await;

    let config = unmanaged()
        .with_create_missing_integration(true)
        .with_launcher_name("example-lambda");
    let ledger = RunLedger::start(session(&server), &config, INTEGRATION_NAME, &json!({}))
        .await
        .unwrap();

    assert_eq!(ledger.integration_id(), INTEGRATION_ID);
    let executions =
        requests(&server, "POST", &format!("{API}/sobjects/IntegrationExecution__c")).await;
    assert_eq!(executions.len(), 1);
}

#[tokio::test]
async fn resume_by_id_creates_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/sobjects/IntegrationExecution__c/{EXECUTION_ID}")))
        .and(query_param(
            "fields",
            "Id,Integration__c,SuccessfulCompletion__c,ErrorMessage__c",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "attributes": {"type": "IntegrationExecution__c"},
            "Id": EXECUTION_ID,
            "Integration__c": INTEGRATION_ID,
            "SuccessfulCompletion__c": false,
            "ErrorMessage__c": null
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let ledger = RunLedger::resume(session(&server), &unmanaged(), EXECUTION_ID)
        .await
        .unwrap();

    assert_eq!(ledger.execution_id(), EXECUTION_ID);
    assert_eq!(ledger.integration_id(), INTEGRATION_ID);
    assert!(!ledger.is_finished());
}

#[tokio::test]
async fn resumed_finished_execution_rejects_terminal_update() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/sobjects/IntegrationExecution__c/{EXECUTION_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Id": EXECUTION_ID,
            "Integration__c": INTEGRATION_ID,
            "SuccessfulCompletion__c": true,
            "ErrorMessage__c": null
        })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let mut ledger = RunLedger::resume(session(&server), &unmanaged(), EXECUTION_ID)
        .await
        .unwrap();

    assert!(ledger.is_finished());
    let err = ledger.handle_exception("late failure").await.unwrap_err();
    assert!(matches!(err.kind, ErrorKind::AlreadyFinished(_)));
}

#[tokio::test]
async fn log_rows_reference_the_execution() {
    let server = MockServer::start().await;
    let ledger = started_ledger(&server).await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/sobjects/IntegrationLog__c")))
        .and(body_json(json!({
            "Message__c": "Some message",
            "LogLevel__c": "INFO",
            "ParentExecution__c": EXECUTION_ID
        })))
        .respond_with(created("a02000000000001AAA"))
        .expect(1)
        .mount(&server)
        .await;

    let id = ledger.log("Some message", LogLevel::Info).await.unwrap();
    assert_eq!(id, "a02000000000001AAA");
}

#[tokio::test]
async fn duplicate_upsert_records_one_error_per_failed_record() {
    let server = MockServer::start().await;
    let ledger = started_ledger(&server).await;

    let job = "750xx00000000U1AAA";
    let duplicate = "DUPLICATE_EXTERNAL_ID:A user-specified external ID matches more than one record during an upsert.:--";
    mount_ingest_job(
        &server,
        job,
        2,
        &format!(
            "\"sf__Id\",\"sf__Error\",\"UpsertKey__c\",\"Name\"\n\
             \"\",\"{duplicate}\",\"1a2b3c\",\"Name 1\"\n\
             \"\",\"{duplicate}\",\"1a2b3c\",\"Name 1\"\n"
        ),
    )
    .await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/composite/sobjects")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "a03000000000001AAA", "success": true, "errors": []},
            {"id": "a03000000000002AAA", "success": true, "errors": []}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let data = [
        json!({"UpsertKey__c": "1a2b3c", "Name": "Name 1"}),
        json!({"UpsertKey__c": "xyz123", "Name": "Name 2"}),
        json!({"UpsertKey__c": "1a2b3c", "Name": "Name 1"}),
    ];
    let result = ledger
        .bulk_upsert("CustomObject__c", &data, "UpsertKey__c")
        .await
        .unwrap();
    assert!(result.has_failures());

    let upload = requests(&server, "PUT", &format!("{API}/jobs/ingest/{job}/batches")).await;
    assert_eq!(
        String::from_utf8_lossy(&upload[0].body),
        "UpsertKey__c,Name\n1a2b3c,Name 1\nxyz123,Name 2\n1a2b3c,Name 1\n"
    );

    let bodies = json_bodies(&server, "POST", &format!("{API}/composite/sobjects")).await;
    let rows = bodies[0]["records"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    for row in rows {
        assert_eq!(
            *row,
            json!({
                "attributes": {"type": "IntegrationError__c"},
                "IntegrationExecution__c": EXECUTION_ID,
                "Operation__c": "upsert",
                "SalesforceObject__c": "CustomObject__c",
                "ErrorCode__c": "DUPLICATE_EXTERNAL_ID",
                "ErrorMessage__c": "A user-specified external ID matches more than one record during an upsert.",
                "UpsertKey__c": "UpsertKey__c",
                "UpsertKeyValue__c": "1a2b3c",
                "ObjectPayload__c": "{\"UpsertKey__c\": \"1a2b3c\", \"Name\": \"Name 1\"}"
            })
        );
    }
}

#[tokio::test]
async fn failed_bulk_rows_keep_the_submitted_values() {
    let server = MockServer::start().await;
    let ledger = started_ledger(&server).await;

    let job = "750xx00000000U2AAA";
    mount_ingest_job(
        &server,
        job,
        2,
        "\"sf__Id\",\"sf__Error\",\"UpsertKey__c\",\"Amount__c\",\"Note__c\",\"Name\"\n\
         \"\",\"INVALID_FIELD:bad value:--\",\"\",\"\",\"\",\"only name\"\n\
         \"\",\"INVALID_FIELD:bad value:--\",\"k1\",\"12\",\"#N/A\",\"\"\n",
    )
    .await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/composite/sobjects")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "a03000000000001AAA", "success": true, "errors": []},
            {"id": "a03000000000002AAA", "success": true, "errors": []}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let data = [
        json!({"UpsertKey__c": "k1", "Amount__c": 12, "Note__c": null}),
        json!({"Name": "only name"}),
    ];
    ledger
        .bulk_upsert("CustomObject__c", &data, "UpsertKey__c")
        .await
        .unwrap();

    let bodies = json_bodies(&server, "POST", &format!("{API}/composite/sobjects")).await;
    let rows = bodies[0]["records"].as_array().unwrap();
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0]["ObjectPayload__c"], "{\"Name\": \"only name\"}");
    assert!(rows[0].get("UpsertKeyValue__c").is_none());

    assert_eq!(
        rows[1]["ObjectPayload__c"],
        "{\"UpsertKey__c\": \"k1\", \"Amount__c\": 12, \"Note__c\": null}"
    );
    assert_eq!(rows[1]["UpsertKeyValue__c"], "k1");
    assert_eq!(rows[1]["UpsertKey__c"], "UpsertKey__c");
}

#[tokio::test]
async fn complete_execution_sets_success_and_response() {
    let server = MockServer::start().await;
    let mut ledger = started_ledger(&server).await;
    Mock::given(method("PATCH"))
        .and(path(format!("{API}/sobjects/IntegrationExecution__c/{EXECUTION_ID}")))
        .and(body_json(json!({
            "SuccessfulCompletion__c": true,
            "ResponsePayload__c": "{\"AllGood\": true}"
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    ledger
        .complete_execution(Some(&json!({"AllGood": true})))
        .await
        .unwrap();
    assert!(ledger.is_finished());

    let err = ledger.complete_execution(None).await.unwrap_err();
    assert!(matches!(err.kind, ErrorKind::AlreadyFinished(ref id) if id == EXECUTION_ID));
}

#[tokio::test]
async fn handle_exception_stores_message_only() {
    let server = MockServer::start().await;
    let mut ledger = started_ledger(&server).await;
    Mock::given(method("PATCH"))
        .and(path(format!("{API}/sobjects/IntegrationExecution__c/{EXECUTION_ID}")))
        .and(body_json(json!({
            "SuccessfulCompletion__c": false,
            "ErrorMessage__c": "Code died"
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    ledger.handle_exception("Code died").await.unwrap();

    let err = ledger.complete_execution(None).await.unwrap_err();
    assert!(matches!(err.kind, ErrorKind::AlreadyFinished(_)));
}

#[tokio::test]
async fn update_payload_and_read_back() {
    let server = MockServer::start().await;
    let ledger = started_ledger(&server).await;
    Mock::given(method("PATCH"))
        .and(path(format!("{API}/sobjects/IntegrationExecution__c/{EXECUTION_ID}")))
        .and(body_json(json!({"ExecutionPayload__c": "{\"start_date\": \"2021-11-01\"}"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/sobjects/IntegrationExecution__c/{EXECUTION_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Id": EXECUTION_ID,
            "Integration__c": INTEGRATION_ID,
            "ExecutionPayload__c": "{\"start_date\": \"2021-11-01\"}"
        })))
        .mount(&server)
        .await;

    ledger
        .update_execution_payload(&json!({"start_date": "2021-11-01"}))
        .await
        .unwrap();
    let execution = ledger.get_execution().await.unwrap();

    assert_eq!(execution["Integration__c"], INTEGRATION_ID);
    assert_eq!(execution["ExecutionPayload__c"], "{\"start_date\": \"2021-11-01\"}");
}

#[tokio::test]
async fn collection_insert_failures_become_error_rows() {
    let server = MockServer::start().await;
    let ledger = started_ledger(&server).await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/composite/sobjects")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "001000000000001AAA", "success": true, "errors": []},
            {"id": null, "success": false, "errors": [
                {"statusCode": "REQUIRED_FIELD_MISSING", "message": "Required fields are missing: [Name]", "fields": ["Name"]}
            ]}
        ])))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/composite/sobjects")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "a03000000000009AAA", "success": true, "errors": []}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let results = ledger
        .insert_records("Account", &[json!({"Name": "Acme"}), json!({"Phone": "555"})])
        .await
        .unwrap();
    assert_eq!(results.len(), 2);

    let bodies = json_bodies(&server, "POST", &format!("{API}/composite/sobjects")).await;
    let error_row = &bodies[1]["records"][0];
    assert_eq!(error_row["Operation__c"], "insert");
    assert_eq!(error_row["ErrorCode__c"], "REQUIRED_FIELD_MISSING");
    assert_eq!(error_row["ObjectPayload__c"], "{\"Phone\": \"555\"}");
    assert!(error_row.get("UpsertKey__c").is_none());
}
