// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Basic adaptive-cache usage example.
//!
//! Demonstrates:
//! 1. Creating a small cache and starting its background tasks
//! 2. Writing related and unrelated entries
//! 3. Reading entries back (hits and misses)
//! 4. Watching evictions on the event stream
//! 5. Stats, health and captured metrics
//! 6. Clean shutdown
//!
//! # Run
//!
//! ```bash
//! cargo run --example basic_usage
//! ```

use std::time::Duration;

use adaptive_cache::{AdaptiveCache, AdaptiveCacheConfig, CacheEvent, Priority, SetOptions};
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install metrics recorder (captures everything the cache records)
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("failed to install metrics recorder");

    tracing_subscriber::fmt()
        .with_env_filter("adaptive_cache=debug")
        .with_target(false)
        .compact()
        .init();

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║           adaptive-cache: Basic Usage Example                 ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    // ─────────────────────────────────────────────────────────────────────────
    // 1. Configure and start
    // ─────────────────────────────────────────────────────────────────────────
    let config = AdaptiveCacheConfig {
        max_size: 4,
        min_size: 4,
        max_size_cap: 16,
        ..Default::default()
    };
    let cache: AdaptiveCache = AdaptiveCache::new(config)?;
    let mut events = cache.subscribe();
    cache.initialize();
    println!("🚀 Cache state: {}", cache.state());

    // ─────────────────────────────────────────────────────────────────────────
    // 2. Write entries
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📝 Writing entries...");
    cache.set("user:42:profile", json!({"name": "Ada", "role": "admin"}), SetOptions::default());
    cache.set("user:42:settings", json!({"theme": "dark"}), SetOptions::default());
    cache.set(
        "config:global",
        json!({"feature_flags": ["a", "b"]}),
        SetOptions::default().with_priority(Priority::High),
    );
    cache.set(
        "session:xyz",
        json!({"token": "t0k3n"}),
        SetOptions::default().with_ttl(Duration::from_secs(30)).with_priority(Priority::Low),
    );
    let report = json!({"rows": vec![json!({"region": "emea", "total": 1234}); 100]});
    cache.set("report:daily", report, SetOptions::default());

    println!("   🔗 user:42:profile linked to {:?}", cache.linked_keys("user:42:profile"));

    // ─────────────────────────────────────────────────────────────────────────
    // 3. Read back
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📖 Reading entries...");
    for key in ["user:42:profile", "config:global", "report:daily", "missing:key"] {
        match cache.get(key) {
            Some(_) => println!("   ✅ {} (hit)", key),
            None => println!("   ❌ {} (miss)", key),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 4. Events
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📣 Events:");
    while let Ok(event) = events.try_recv() {
        match event {
            CacheEvent::Set { key, stored_size, compressed } => {
                println!("   set      {} ({} bytes{})", key, stored_size, if compressed { ", zstd" } else { "" });
            }
            CacheEvent::Eviction { key } => println!("   evicted  {}", key),
            CacheEvent::Hit { key } => println!("   hit      {}", key),
            CacheEvent::Miss { key } => println!("   miss     {}", key),
            other => println!("   {:?}", other),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 5. Stats, health, manual ticks
    // ─────────────────────────────────────────────────────────────────────────
    let tick = cache.run_capacity_tuning();
    let maintenance = cache.run_maintenance();
    println!(
        "\n🔧 Capacity tick: max_size {} → {}, composite weight {:.2}",
        tick.previous_max_size, tick.max_size, tick.composite_weight
    );
    println!("🧹 Maintenance: {:?}", maintenance);

    println!("\n📊 Stats:\n{}", serde_json::to_string_pretty(&cache.stats())?);
    println!("\n❤️  Health:\n{}", serde_json::to_string_pretty(&cache.health())?);

    println!("\n📈 Metrics:");
    cache.update_gauge_metrics();
    dump_metrics(&snapshotter);

    // ─────────────────────────────────────────────────────────────────────────
    // 6. Clean shutdown
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n🛑 Shutting down...");
    cache.shutdown().await;
    println!("   ✅ Shutdown complete! State: {}", cache.state());

    Ok(())
}

fn dump_metrics(snapshotter: &Snapshotter) {
    let snapshot = snapshotter.snapshot();

    let mut counters: Vec<_> = vec![];
    let mut gauges: Vec<_> = vec![];
    let mut histograms: Vec<_> = vec![];

    for (composite_key, _, _, value) in snapshot.into_vec() {
        let (_, key) = composite_key.into_parts();
        let name = key.name().to_string();
        let labels: Vec<_> = key.labels().map(|l| format!("{}={}", l.key(), l.value())).collect();
        let label_str = if labels.is_empty() { String::new() } else { format!("{{{}}}", labels.join(",")) };

        match value {
            DebugValue::Counter(v) => counters.push((name, label_str, v)),
            DebugValue::Gauge(v) => gauges.push((name, label_str, v.into_inner())),
            DebugValue::Histogram(samples) => {
                let count = samples.len();
                let sum: f64 = samples.iter().map(|v| v.into_inner()).sum();
                histograms.push((name, label_str, count, sum));
            }
        }
    }

    counters.sort();
    gauges.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    histograms.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    if !counters.is_empty() {
        println!("   ┌─ Counters (cumulative)");
        for (name, labels, value) in &counters {
            println!("   │  └─ {}{} = {}", name, labels, value);
        }
    }
    if !gauges.is_empty() {
        println!("   ├─ Gauges (current value)");
        for (name, labels, value) in &gauges {
            println!("   │  └─ {}{} = {:.2}", name, labels, value);
        }
    }
    if !histograms.is_empty() {
        println!("   └─ Histograms (distributions)");
        for (name, labels, count, sum) in &histograms {
            let avg = if *count > 0 { sum / *count as f64 } else { 0.0 };
            println!("   │  └─ {}{} count={} avg={:.6}", name, labels, count, avg);
        }
    }
    if counters.is_empty() && gauges.is_empty() && histograms.is_empty() {
        println!("   └─ (no metrics recorded)");
    }
}
