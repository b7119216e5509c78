use chrono::NaiveDate;
use kurs_emas::core::config::AppConfig;
use kurs_emas::core::{DailyRecord, FixedClock, RecordSink};
use kurs_emas::store::SqliteSink;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const JISDOR_PAGE: &str = r#"
        <html><body>
          <div id="tableData">
            <table>
              <tr><th>Tanggal</th><th>Kurs</th></tr>
              <tr><td> 19 November 2024 </td><td> Rp 15.567,50 </td></tr>
              <tr><td> 18 November 2024 </td><td> Rp 15.600,00 </td></tr>
            </table>
          </div>
        </body></html>
    "#;

    pub const GOLD_PRICES: &str = r#"{
        "data": [
            {"type": "ubs", "buy": 1100000, "sell": 1200000},
            {"type": "antam", "buy": 1150000, "sell": 1234500}
        ]
    }"#;

    pub async fn create_mock_server(rate_page: &str, gold_prices: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/jisdor"))
            .respond_with(ResponseTemplate::new(200).set_body_string(rate_page))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/prices/indogold"))
            .respond_with(ResponseTemplate::new(200).set_body_string(gold_prices))
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub fn write_config(dir: &std::path::Path, server_uri: &str, extra: &str) -> std::path::PathBuf {
        let config_path = dir.join("config.yaml");
        let config_content = format!(
            r#"
sources:
  rate:
    url: "{server_uri}/jisdor"
  gold:
    url: "{server_uri}/prices/indogold"
schedule:
  retries: 0
  retry_delay_secs: 0
connection: test
connections:
  test:
    path: "{}"
{extra}
"#,
            dir.join("kurs_emas.db").display()
        );
        std::fs::write(&config_path, config_content).expect("Failed to write config file");
        config_path
    }
}

fn nov_19() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 11, 19).unwrap()
}

fn stored_rows(db_path: &Path) -> Vec<DailyRecord> {
    SqliteSink::new(db_path).recent(100).expect("Failed to read store")
}

#[test_log::test(tokio::test)]
async fn test_daily_run_stores_one_record() {
    let mock_server =
        test_utils::create_mock_server(test_utils::JISDOR_PAGE, test_utils::GOLD_PRICES).await;
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = test_utils::write_config(temp_dir.path(), &mock_server.uri(), "");
    let config = AppConfig::load_from_path(&config_path).unwrap();

    let clock = Arc::new(FixedClock(nov_19()));
    let record = kurs_emas::run_daily(&config, clock.clone())
        .await
        .unwrap()
        .expect("Run should not be skipped");
    info!(?record, "Pipeline produced record");

    let expected = DailyRecord {
        date: nov_19(),
        rate: 15567,
        gold_sell_price: 1_234_500,
    };
    assert_eq!(record, expected);

    // Re-running the same day must not duplicate the row
    kurs_emas::run_daily(&config, clock).await.unwrap();
    let db_path = temp_dir.path().join("kurs_emas.db");
    assert_eq!(stored_rows(&db_path), vec![expected]);
    assert_eq!(
        SqliteSink::new(db_path).get(nov_19()).unwrap(),
        Some(expected)
    );
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_mock() {
    let mock_server =
        test_utils::create_mock_server(test_utils::JISDOR_PAGE, test_utils::GOLD_PRICES).await;
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = test_utils::write_config(temp_dir.path(), &mock_server.uri(), "");

    let result =
        kurs_emas::run_command(kurs_emas::AppCommand::Run, Some(config_path.to_str().unwrap()))
            .await;
    assert!(
        result.is_ok(),
        "Main function failed with: {:?}",
        result.err()
    );

    // Positional pairing dates the record from the rate page, whatever today is
    let rows = stored_rows(&temp_dir.path().join("kurs_emas.db"));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].date, nov_19());

    let result = kurs_emas::run_command(
        kurs_emas::AppCommand::History { limit: 5 },
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "History failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_missing_product_writes_nothing() {
    let mock_server =
        test_utils::create_mock_server(test_utils::JISDOR_PAGE, test_utils::GOLD_PRICES).await;
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = test_utils::write_config(temp_dir.path(), &mock_server.uri(), "");
    let mut config = AppConfig::load_from_path(&config_path).unwrap();
    config.sources.gold.product_type = "galeri24".to_string();

    let err = kurs_emas::run_daily(&config, Arc::new(FixedClock(nov_19())))
        .await
        .unwrap_err();
    assert!(
        format!("{err:#}").contains("Product type 'galeri24' not found"),
        "{err:#}"
    );
    assert!(!temp_dir.path().join("kurs_emas.db").exists());
}

#[test_log::test(tokio::test)]
async fn test_strict_pairing_rejects_weekend_run() {
    let mock_server =
        test_utils::create_mock_server(test_utils::JISDOR_PAGE, test_utils::GOLD_PRICES).await;
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path =
        test_utils::write_config(temp_dir.path(), &mock_server.uri(), "pairing: strict");
    let config = AppConfig::load_from_path(&config_path).unwrap();

    let saturday = NaiveDate::from_ymd_opt(2024, 11, 23).unwrap();
    let err = kurs_emas::run_daily(&config, Arc::new(FixedClock(saturday)))
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("does not match"), "{err:#}");

    // Same-day gold price pairs fine
    let record = kurs_emas::run_daily(&config, Arc::new(FixedClock(nov_19())))
        .await
        .unwrap();
    assert_eq!(record.map(|r| r.date), Some(nov_19()));
}

#[test_log::test(tokio::test)]
async fn test_run_before_start_date_is_skipped() {
    let mock_server =
        test_utils::create_mock_server(test_utils::JISDOR_PAGE, test_utils::GOLD_PRICES).await;
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = test_utils::write_config(temp_dir.path(), &mock_server.uri(), "");
    let mut config = AppConfig::load_from_path(&config_path).unwrap();
    config.schedule.start_date = Some(NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());

    let result = kurs_emas::run_daily(&config, Arc::new(FixedClock(nov_19())))
        .await
        .unwrap();
    assert!(result.is_none());
    assert!(!temp_dir.path().join("kurs_emas.db").exists());
}

#[test_log::test(tokio::test)]
async fn test_unparseable_rate_date_fails_run() {
    let page = test_utils::JISDOR_PAGE.replace(" 19 November 2024 ", "not-a-date");
    let mock_server = test_utils::create_mock_server(&page, test_utils::GOLD_PRICES).await;
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = test_utils::write_config(temp_dir.path(), &mock_server.uri(), "");
    let config = AppConfig::load_from_path(&config_path).unwrap();

    let err = kurs_emas::run_daily(&config, Arc::new(FixedClock(nov_19())))
        .await
        .unwrap_err();
    assert!(
        format!("{err:#}").contains("No rate observations left"),
        "{err:#}"
    );

    let written = fs::metadata(temp_dir.path().join("kurs_emas.db")).is_ok();
    assert!(!written);
}
