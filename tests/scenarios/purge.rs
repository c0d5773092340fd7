use serde_json::json;
use tally_sf::runs::{purge_aged_errors, ErrorKind, PurgeConfig, PurgeSummary};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{bulk, mount_ingest_job, mount_query_results, requests, API};

const FIRST_PASS: &str = "750xx0000000P01AAA";
const SECOND_PASS: &str = "750xx0000000P02AAA";
const DELETE_JOB: &str = "750xx0000000D01AAA";
const HEADER: &str = "\"Id\",\"CreatedDate\",\"IntegrationExecution__c\"\n";

async fn mount_query_job(server: &MockServer, job_id: &str, times: Option<u64>) {
    let mock = Mock::given(method("POST"))
        .and(path(format!("{API}/jobs/query")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": job_id, "state": "UploadComplete", "operation": "query"
        })));
    match times {
        Some(n) => mock.up_to_n_times(n).mount(server).await,
        None => mock.mount(server).await,
    }
}

fn aged_rows(ids: &[&str]) -> String {
    let mut csv = HEADER.to_string();
    for id in ids {
        csv.push_str(&format!(
            "\"{id}\",\"2021-01-04T10:00:00.000+0000\",\"a01000000000001AAA\"\n"
        ));
    }
    csv
}

#[tokio::test]
async fn purge_repeats_passes_until_nothing_is_left() {
    let server = MockServer::start().await;
    mount_query_job(&server, FIRST_PASS, Some(1)).await;
    mount_query_job(&server, SECOND_PASS, None).await;
    mount_query_results(
        &server,
        FIRST_PASS,
        &aged_rows(&["a02000000000001AAA", "a02000000000002AAA", "a02000000000003AAA"]),
    )
    .await;
    mount_query_results(&server, SECOND_PASS, HEADER).await;
    mount_ingest_job(&server, DELETE_JOB, 0, "").await;

    let config = PurgeConfig::default()
        .with_namespace("")
        .with_delete_batch_size(2);
    let summary = purge_aged_errors(&bulk(&server), &config).await.unwrap();

    assert_eq!(
        summary,
        PurgeSummary {
            passes: 2,
            deleted: 3,
            batches: 2
        }
    );

    let submitted = requests(&server, "POST", &format!("{API}/jobs/query")).await;
    assert_eq!(submitted.len(), 2);
    let job: serde_json::Value = serde_json::from_slice(&submitted[0].body).unwrap();
    assert_eq!(
        job["query"],
        "SELECT Id, CreatedDate, IntegrationExecution__c FROM IntegrationError__c \
         WHERE CreatedDate < LAST_N_MONTHS:4 ORDER BY CreatedDate ASC LIMIT 100000"
    );

    let deletes = requests(&server, "POST", &format!("{API}/jobs/ingest")).await;
    let delete_job: serde_json::Value = serde_json::from_slice(&deletes[0].body).unwrap();
    assert_eq!(delete_job["object"], "IntegrationError__c");
    assert_eq!(delete_job["operation"], "delete");

    let uploads = requests(&server, "PUT", &format!("{API}/jobs/ingest/{DELETE_JOB}/batches")).await;
    let bodies: Vec<String> = uploads
        .iter()
        .map(|r| String::from_utf8_lossy(&r.body).into_owned())
        .collect();
    assert_eq!(
        bodies,
        [
            "Id\na02000000000001AAA\na02000000000002AAA\n",
            "Id\na02000000000003AAA\n"
        ]
    );
}

#[tokio::test]
async fn purge_with_nothing_aged_deletes_nothing() {
    let server = MockServer::start().await;
    mount_query_job(&server, FIRST_PASS, None).await;
    mount_query_results(&server, FIRST_PASS, HEADER).await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/jobs/ingest")))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let summary = purge_aged_errors(&bulk(&server), &PurgeConfig::default().with_namespace(""))
        .await
        .unwrap();

    assert_eq!(summary.passes, 1);
    assert_eq!(summary.deleted, 0);
    assert_eq!(summary.batches, 0);
}

#[tokio::test]
async fn purge_stops_on_rejected_delete() {
    let server = MockServer::start().await;
    mount_query_job(&server, FIRST_PASS, None).await;
    mount_query_results(&server, FIRST_PASS, &aged_rows(&["a02000000000001AAA"])).await;
    mount_ingest_job(
        &server,
        DELETE_JOB,
        1,
        "\"sf__Id\",\"sf__Error\",\"Id\"\n\
         \"a02000000000001AAA\",\"ENTITY_IS_DELETED:entity is deleted:--\",\"a02000000000001AAA\"\n",
    )
    .await;

    let err = purge_aged_errors(&bulk(&server), &PurgeConfig::default().with_namespace(""))
        .await
        .unwrap_err();

    match err.kind {
        ErrorKind::DeleteFailed {
            submitted,
            failed,
            ref failed_csv,
        } => {
            assert_eq!(submitted, 1);
            assert_eq!(failed, 1);
            assert!(failed_csv.contains("ENTITY_IS_DELETED"));
        }
        other => panic!("expected DeleteFailed, got {other:?}"),
    }
    let submitted = requests(&server, "POST", &format!("{API}/jobs/query")).await;
    assert_eq!(submitted.len(), 1);
}
