use std::io::Write;

use actitime_batch::helpers::actitime::client_init;
use actitime_batch::{
    BatchSubmitService, Driver, DriverConfig, DriverError, ParserOptions, SubmitConfig,
    TimeTrackWriter, TimesheetRow,
};
use mockito::{Matcher, Server};
use serde_json::json;

const JOHN_AUTH: &str = "Basic am9obi5kb2U6Rm9vQmFyMTg=";

fn driver(server: &Server) -> Driver {
    let config = DriverConfig {
        target: format!("{}/", server.url()),
    };
    Driver::new(client_init().unwrap(), config)
}

fn row() -> TimesheetRow {
    TimesheetRow {
        year: 2019,
        month: 8,
        day: 9,
        task_id: 558,
        hours: 1,
    }
}

#[tokio::test]
async fn start_reads_identity() {
    let mut server = Server::new_async().await;
    let me = server
        .mock("GET", "/users/me")
        .match_header("authorization", JOHN_AUTH)
        .match_header("accept", "application/json; charset=UTF-8")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":7,"firstName":"John","lastName":"Doe"}"#)
        .create_async()
        .await;

    let mut driver = driver(&server);
    let identity = driver.start("john.doe", "FooBar18").await.unwrap();

    assert_eq!(identity.id, 7);
    assert_eq!(identity.first_name, "John");
    assert!(driver.is_started());
    me.assert_async().await;
}

#[tokio::test]
async fn start_reports_rejected_credentials() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/users/me")
        .with_status(401)
        .with_body("Unauthorized")
        .create_async()
        .await;

    let mut driver = driver(&server);
    match driver.start("john.doe", "wrong").await {
        Err(DriverError::Status { status, body }) => {
            assert_eq!(status.as_u16(), 401);
            assert_eq!(body, "Unauthorized");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(!driver.is_started());
}

#[tokio::test]
async fn write_before_start_fails() {
    let server = Server::new_async().await;
    let driver = driver(&server);

    assert!(matches!(
        driver.write_day_time_track(&row(), 60, "").await,
        Err(DriverError::NotStarted)
    ));
}

#[tokio::test]
async fn write_patches_padded_date() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/users/me")
        .with_status(200)
        .with_body(r#"{"id":7,"firstName":"John","lastName":"Doe"}"#)
        .create_async()
        .await;
    let patch = server
        .mock("PATCH", "/timetrack/7/2019-08-09/558")
        .match_header("authorization", JOHN_AUTH)
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({"time": 60, "comment": "sprint \"42\""})))
        .with_status(200)
        .with_body(r#"{"userId":7,"date":"2019-08-09","taskId":558,"time":60}"#)
        .create_async()
        .await;

    let mut driver = driver(&server);
    driver.start("john.doe", "FooBar18").await.unwrap();
    let ack = driver
        .write_day_time_track(&row(), 60, "sprint \"42\"")
        .await
        .unwrap();

    assert_eq!(ack["time"], 60);
    patch.assert_async().await;
}

#[tokio::test]
async fn process_file_submits_every_row() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/users/me")
        .with_status(200)
        .with_body(r#"{"id":7,"firstName":"John","lastName":"Doe"}"#)
        .expect(1)
        .create_async()
        .await;
    let first = server
        .mock("PATCH", "/timetrack/7/2019-08-19/558")
        .match_body(Matcher::Json(json!({"time": 60, "comment": "import"})))
        .with_body(r#"{"time":60}"#)
        .create_async()
        .await;
    let second = server
        .mock("PATCH", "/timetrack/7/2019-08-19/13619")
        .match_body(Matcher::Json(json!({"time": 420, "comment": "import"})))
        .with_body(r#"{"time":420}"#)
        .create_async()
        .await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "START ENTRY;\nUSERNAME;john.doe;\nPASSWORD;FooBar18;\nSTART TIMESHEET;\n\
         2019;8;19;558;1;\n2019;8;19;13619;7;\nEND TIMESHEET;\nEND ENTRY;\n"
    )
    .unwrap();
    file.flush().unwrap();

    let service = BatchSubmitService::new(SubmitConfig {
        comment: "import".to_string(),
        ..SubmitConfig::default()
    });
    let mut driver = driver(&server);
    let report = service
        .process_file(&mut driver, file.path(), ParserOptions::default())
        .await
        .unwrap();

    assert_eq!(report.entries, 1);
    assert_eq!(report.rows, 2);
    assert_eq!(report.acknowledgments[1]["time"], 420);
    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn process_file_reports_parse_errors() {
    let server = Server::new_async().await;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "START ENTRY;\nPASSWORD;x;\n").unwrap();
    file.flush().unwrap();

    let mut driver = driver(&server);
    let err = BatchSubmitService::default()
        .process_file(&mut driver, file.path(), ParserOptions::default())
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("Error parsing batch file"));
    assert!(format!("{err:#}").contains("expected USERNAME after START ENTRY"));
}
