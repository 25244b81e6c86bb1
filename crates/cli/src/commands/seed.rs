use lunchly_db::{DemoSeedDataset, VerificationResult};

use crate::commands::{run_with_pool, CommandFailure, CommandResult};

pub fn run() -> CommandResult {
    run_with_pool("seed", |pool| async move {
        let seed_result = DemoSeedDataset::load(&pool)
            .await
            .map_err(|error| CommandFailure::new("seed_execution", error.to_string(), 5))?;

        let verification = DemoSeedDataset::verify(&pool)
            .await
            .map_err(|error| CommandFailure::new("seed_verification", error.to_string(), 6))?;

        if !verification.all_present {
            return Err(CommandFailure::new("seed_verification", verification_message(&verification), 6));
        }

        Ok(CommandResult::success(
            "seed",
            format!(
                "demo dataset loaded ({} new rows); checks passed: {}",
                seed_result.rows_inserted,
                verification.checks.iter().map(|(check, _)| *check).collect::<Vec<_>>().join(", ")
            ),
        ))
    })
}

fn verification_message(verification: &VerificationResult) -> String {
    let failed_checks = verification
        .checks
        .iter()
        .filter_map(|(check, passed)| (!passed).then_some(*check))
        .collect::<Vec<_>>();

    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
