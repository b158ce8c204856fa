use common::config::Config;
use common::sources::RefundSources;

fn live_sources() -> RefundSources {
    let config = Config::from_toml_str(include_str!("../../../config/default.toml")).unwrap();
    RefundSources::new(&config.sources).unwrap()
}

#[tokio::test]
#[ignore] // requires network
async fn test_fetch_real_eth_usd_price() {
    let price = live_sources().fetch_eth_usd().await.unwrap();
    assert!(price > rust_decimal::Decimal::ZERO);
}

#[tokio::test]
#[ignore] // requires network and a reachable refund CSV host
async fn test_fetch_real_day_csv_parses() {
    let date = (chrono::Local::now().date_naive() - chrono::Duration::days(2))
        .format("%Y-%m-%d")
        .to_string();
    let records = live_sources().fetch_day_csv(&date).await.unwrap();
    if let Some(records) = records {
        assert!(records.iter().all(|r| !r.refund_value_eth.is_empty()));
    }
}
