use std::sync::Arc;
use std::time::Duration;

use trendbot::bot::Controller;
use trendbot::broker::BridgeClient;
use trendbot::config::{Config, Mt5Credentials};
use trendbot::models::{BotStatus, Direction, TradeSource, TradeStatus};

fn candles_json(closes: &[f64], step_secs: i64) -> String {
    let bars: Vec<String> = closes
        .iter()
        .enumerate()
        .map(|(i, close)| {
            format!(
                r#"{{"time":{},"open":{},"high":{},"low":{},"close":{},"tick_volume":10}}"#,
                1700000000 + i as i64 * step_secs,
                close,
                close + 0.5,
                close - 0.5,
                close
            )
        })
        .collect();
    format!(r#"{{"candles":[{}]}}"#, bars.join(","))
}

fn test_config(bridge_url: String) -> Config {
    Config {
        credentials: Mt5Credentials {
            login: 279478161,
            password: "secret".to_string(),
            server: "Demo-MT5".to_string(),
        },
        bridge_url,
        symbol: "BTCUSD".to_string(),
        lot: 1.0,
        poll_interval: Duration::from_millis(50),
        error_backoff: Duration::from_millis(20),
        cooldown: Duration::from_secs(60),
        bind_addr: "127.0.0.1:0".to_string(),
    }
}

#[tokio::test]
async fn test_full_buy_cycle() {
    let _ = tracing_subscriber::fmt::try_init();

    let mut server = mockito::Server::new_async().await;

    server
        .mock("POST", "/connect")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success":true,"message":"Account connected successfully"}"#)
        .create_async()
        .await;

    // 15m trend: steadily rising closes, EMA(9) ends above EMA(15)
    let trend_closes: Vec<f64> = (0..50).map(|i| 100.0 + i as f64 * 0.5).collect();
    server
        .mock("GET", "/candles?symbol=BTCUSD&timeframe=M15&count=50")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(candles_json(&trend_closes, 900))
        .create_async()
        .await;

    // 5m confirmation: latest close 126.0 breaks the prior high 125.5
    server
        .mock("GET", "/candles?symbol=BTCUSD&timeframe=M5&count=3")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(candles_json(&[124.0, 125.0, 126.0], 300))
        .create_async()
        .await;

    let order_mock = server
        .mock("POST", "/order")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"retcode":10009,"price":126.01,"comment":"Request executed"}"#)
        .create_async()
        .await;

    let config = test_config(server.url());
    let controller = Arc::new(Controller::new(BridgeClient::new(server.url()), config));

    controller.start().await.unwrap();
    assert!(controller.is_running());

    // Let the loop run a few iterations; the cooldown holds further
    // entries back, so exactly one order goes out.
    tokio::time::sleep(Duration::from_millis(400)).await;

    order_mock.assert_async().await;

    let status = controller.status();
    assert_eq!(status.status, BotStatus::Running);
    assert_eq!(status.trades_executed, 1);
    assert_eq!(status.current_direction, Some(Direction::Buy));
    let last_trade = status.last_trade.expect("last trade recorded");
    assert_eq!(last_trade.direction, Direction::Buy);
    assert_eq!(last_trade.entry, 126.0);
    // stop = prior low 124.5, risk 1.5, tp = entry + 2 * risk
    assert_eq!(last_trade.sl, 124.5);
    assert_eq!(last_trade.tp, 129.0);

    controller.stop().unwrap();
    assert!(!controller.is_running());
}

#[tokio::test]
async fn test_trades_merge_bot_and_terminal_views() {
    let mut server = mockito::Server::new_async().await;

    server
        .mock("POST", "/connect")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success":true}"#)
        .create_async()
        .await;

    let trend_closes: Vec<f64> = (0..50).map(|i| 100.0 + i as f64 * 0.5).collect();
    server
        .mock("GET", "/candles?symbol=BTCUSD&timeframe=M15&count=50")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(candles_json(&trend_closes, 900))
        .create_async()
        .await;
    server
        .mock("GET", "/candles?symbol=BTCUSD&timeframe=M5&count=3")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(candles_json(&[124.0, 125.0, 126.0], 300))
        .create_async()
        .await;
    server
        .mock("POST", "/order")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"retcode":10009,"price":126.01}"#)
        .create_async()
        .await;

    server
        .mock("GET", "/positions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"positions":[{"ticket":555123,"symbol":"BTCUSD","type":0,"volume":1.0,
                "price_open":126.0,"price_current":126.4,"time":1700003000,"profit":0.4}]}"#,
        )
        .create_async()
        .await;
    server
        .mock("GET", mockito::Matcher::Regex("^/deals".to_string()))
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"deals":[{"ticket":444001,"symbol":"BTCUSD","type":1,"entry":1,"price":118.2,
                "volume":1.0,"time":1699990000,"profit":-3.1,"commission":-0.2}]}"#,
        )
        .create_async()
        .await;

    let config = test_config(server.url());
    let controller = Arc::new(Controller::new(BridgeClient::new(server.url()), config));

    controller.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    controller.stop().unwrap();

    assert_eq!(controller.status().trades_executed, 1);

    let trades = controller.trades().await;
    let ids: Vec<&str> = trades.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["bot-1", "mt5-555123", "mt5-closed-444001"]);

    let bot_trade = &trades[0];
    assert_eq!(bot_trade.source, TradeSource::Bot);
    assert_eq!(bot_trade.status, TradeStatus::Open);
    assert_eq!(bot_trade.direction, Direction::Buy);

    let closed = &trades[2];
    assert_eq!(closed.status, TradeStatus::Closed);
    assert_eq!(closed.direction, Direction::Sell);
    assert_eq!(closed.profit, Some(-3.1));

    // A second rebuild must not duplicate anything
    let trades_again = controller.trades().await;
    assert_eq!(trades_again.len(), 3);
}

#[tokio::test]
async fn test_no_trade_without_confirmation() {
    let mut server = mockito::Server::new_async().await;

    server
        .mock("POST", "/connect")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success":true}"#)
        .create_async()
        .await;

    let trend_closes: Vec<f64> = (0..50).map(|i| 100.0 + i as f64 * 0.5).collect();
    server
        .mock("GET", "/candles?symbol=BTCUSD&timeframe=M15&count=50")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(candles_json(&trend_closes, 900))
        .create_async()
        .await;

    // Falling 5m closes: no breakout above the prior high, so no order
    server
        .mock("GET", "/candles?symbol=BTCUSD&timeframe=M5&count=3")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(candles_json(&[126.0, 125.0, 124.0], 300))
        .create_async()
        .await;

    let order_mock = server
        .mock("POST", "/order")
        .expect(0)
        .create_async()
        .await;

    let config = test_config(server.url());
    let controller = Arc::new(Controller::new(BridgeClient::new(server.url()), config));

    controller.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    controller.stop().unwrap();

    order_mock.assert_async().await;
    let status = controller.status();
    assert_eq!(status.trades_executed, 0);
    assert_eq!(status.current_direction, Some(Direction::Buy));
}
