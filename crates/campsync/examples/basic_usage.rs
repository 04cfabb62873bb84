//! Basic usage example for campsync.
//!
//! This example walks through the core API:
//! - Checking whether gated content is unlocked
//! - Planning a full sync under a storage budget
//! - Planning an incremental sync after time offline
//! - Planning storage cleanup
//!
//! Run with: cargo run --example basic_usage

use std::collections::HashSet;

use campsync::unlock::DAY_MS;
use campsync::{
    Config, ContentPackage, EventWindow, StorageCleaner, SyncPlanner, UnlockEvaluator,
    UserLocation,
};

fn main() -> campsync::Result<()> {
    // Initialize logging for visibility
    tracing_subscriber::fmt::init();

    println!("=== campsync Basic Usage Example ===\n");

    let config = Config::default();
    let event_start = 1_808_726_400_000; // 2027-04-26T08:00:00Z
    let event = EventWindow::new(event_start, event_start + 7 * DAY_MS, -32.3263, 19.7486, 5.0)?
        .with_name("Tankwa Dust 2027");

    // -------------------------------------------------------------------------
    // Step 1: Unlock checks
    // -------------------------------------------------------------------------
    println!("1. Evaluating unlocks three days before the event...");

    let evaluator = UnlockEvaluator::new(config.unlock.clone());
    let now = event_start - 3 * DAY_MS;

    let far_away = UserLocation::new(-33.9249, 18.4241, Some(10.0), true, now)?;
    let decision = evaluator.evaluate(Some(&event), Some(&far_away), true, now);
    println!("   From Cape Town: {decision:?}");

    let on_site = UserLocation::new(-32.3270, 19.7490, Some(10.0), true, now)?;
    let decision = evaluator.evaluate(Some(&event), Some(&on_site), true, now);
    println!("   On site:        {decision:?}\n");

    // -------------------------------------------------------------------------
    // Step 2: Full sync
    // -------------------------------------------------------------------------
    println!("2. Planning a full sync into 300 MB...");

    let catalog = vec![
        ContentPackage::new("safety_info", "Safety information", 1, 50_000_000)?,
        ContentPackage::new("event_map", "Offline event map", 2, 250_000_000)?,
        ContentPackage::new("schedule", "Performance schedule", 2, 20_000_000)?,
        ContentPackage::new("art_guide", "Art guide", 3, 400_000_000)?,
    ];

    let planner = SyncPlanner::new(config.sync.clone());
    let plan = planner.plan_full_sync(&catalog, 300_000_000, None)?;
    println!("   Selected: {:?}", plan.package_ids());
    println!("   Total: {} bytes\n", plan.total_size_bytes);

    let pinned: HashSet<String> = ["Art guide".to_string()].into();
    let plan = planner.plan_full_sync(&catalog, 500_000_000, Some(&pinned))?;
    println!("   With the art guide pinned into 500 MB: {:?}\n", plan.package_ids());

    // -------------------------------------------------------------------------
    // Step 3: Incremental sync
    // -------------------------------------------------------------------------
    println!("3. Planning incremental syncs...");

    for hours in [1, 25, 73] {
        let plan = planner.plan_incremental_sync(now - hours * 60 * 60 * 1000, now)?;
        println!("   Offline {hours:>2}h: {:?}", plan.package_ids());
    }
    println!();

    // -------------------------------------------------------------------------
    // Step 4: Storage cleanup
    // -------------------------------------------------------------------------
    println!("4. Planning cleanup with 300 MB installed in a 310 MB budget...");

    let cleaner = StorageCleaner::new(config.cleanup);
    let installed = &catalog[..3];
    let cleanup = cleaner.plan_cleanup(installed, 310_000_000)?;
    println!("   Level: {:?}", cleanup.level);
    println!(
        "   Evict: {:?}",
        cleanup.evicted.iter().map(|p| p.id.as_str()).collect::<Vec<_>>()
    );
    println!("   Remaining: {} bytes", cleanup.remaining_bytes);

    println!("\n=== Example Complete ===");
    Ok(())
}
