//! 行情事件示例：STORE 组先落地、PROCESS 组再计算，演示退订、失败隔离与等待。
//!
//! 运行：`RUST_LOG=debug cargo run -p demo -- [config.json]`
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result as AnyResult};
use soso_event::{Event, EventConfig, EventOptions, Group, Handler, Task};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct Quote {
    symbol: &'static str,
    price: f64,
}

fn load_config() -> AnyResult<EventConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing {path}"))
        }
        None => Ok(EventConfig::default()),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let quotes = EventOptions::<Quote>::builder()
        .name("Quote")
        .config(load_config()?)
        .build()
        .create()?;
    quotes.on_disconnect(|ev| tracing::info!(%ev, "subscriber left"));

    let history = Arc::new(Mutex::new(Vec::new()));
    let store = Handler::new({
        let history = history.clone();
        move |q: &Quote| {
            if let Ok(mut h) = history.lock() {
                h.push(q.price);
            }
        }
    })
    .named("store");
    let _store = quotes.connect(&store, Group::Store);

    let _average = quotes.connect_fn(
        {
            let history = history.clone();
            move |q: &Quote| {
                let symbol = q.symbol;
                let history = history.clone();
                Task::new(async move {
                    let avg = history
                        .lock()
                        .map(|h| h.iter().sum::<f64>() / h.len().max(1) as f64)
                        .unwrap_or_default();
                    tracing::info!(symbol, avg, "running average");
                })
            }
        },
        Group::Process,
    );

    let _sanity = quotes.connect_fn(
        |q: &Quote| {
            if q.price <= 0.0 {
                anyhow::bail!("non-positive price for {}", q.symbol);
            }
            Ok(())
        },
        Group::Process,
    );

    let next = quotes.next_emission();
    quotes.emit(Quote { symbol: "AAPL", price: 190.5 })?;
    tracing::info!(quote = ?next.await?, "awaited first quote");

    quotes.emit(Quote { symbol: "AAPL", price: -1.0 })?;
    quotes.emit(Quote { symbol: "AAPL", price: 0.0 })?;
    quotes.emit(Quote { symbol: "AAPL", price: 191.0 })?;

    tokio::time::sleep(Duration::from_millis(10)).await;
    tracing::info!(%quotes, "done");
    Ok(())
}
