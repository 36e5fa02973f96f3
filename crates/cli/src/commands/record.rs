// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeMap;

use ll_core::protocol::PurchaseValidation;

use crate::cli::RecordCommand;
use crate::error::{Error, Result};
use crate::net::{DispatchError, Transport};
use crate::services::Services;
use crate::store::Delivery;

/// Execute a record subcommand.
///
/// Reports go to the backend right away and wait in the offline queue when
/// it cannot be reached. A new best score also triggers a sync.
pub async fn run<T: Transport + 'static>(services: &Services<T>, cmd: RecordCommand) -> Result<()> {
    let store = &services.store;
    match cmd {
        RecordCommand::Score { score, streak, level } => {
            let new_best = store.record_game_result(score, streak)?;
            if new_best {
                println!("New best score: {}", score);
            } else {
                println!("Recorded score {} (best {})", score, store.stats().best_score);
            }
            print_delivery("Score", &store.submit_score(score, streak, level).await?);
            if new_best && !store.sync().await {
                println!("Sync failed; stats will be sent later");
            }
        }
        RecordCommand::Coins { delta } => {
            let balance = if delta >= 0 {
                store.add_coins(delta.unsigned_abs())?
            } else {
                store.spend_coins(delta.unsigned_abs())?
            };
            println!("Coins: {}", balance);
        }
        RecordCommand::Mission { mission_id, progress, target } => {
            let delivery = store.report_mission(&mission_id, progress, target).await?;
            println!("Mission {}: {}/{}", mission_id, progress.min(target), target);
            print_delivery("Progress", &delivery);
        }
        RecordCommand::Achievement { achievement_id } => {
            let delivery = store.unlock_achievement(&achievement_id).await?;
            println!("Achievement unlocked: {}", achievement_id);
            print_delivery("Unlock", &delivery);
        }
        RecordCommand::Event { name, props } => {
            let delivery = store.track_event(&name, parse_props(&props)?).await?;
            print_delivery("Event", &delivery);
        }
        RecordCommand::Purchase { product_id, receipt, store: issuer } => {
            let validation = PurchaseValidation {
                product_id,
                receipt,
                store: issuer.unwrap_or_else(|| services.config.api.platform.clone()),
            };
            match store.validate_purchase(&validation).await {
                Ok(receipt) if receipt.valid => {
                    println!(
                        "Purchase valid: +{} coins, +{} gems{}",
                        receipt.coins_granted,
                        receipt.gems_granted,
                        if receipt.premium { ", premium" } else { "" }
                    );
                }
                Ok(_) => {
                    return Err(Error::InvalidInput(format!(
                        "receipt for {} was rejected",
                        validation.product_id
                    )));
                }
                Err(Error::Dispatch(DispatchError::Queued { id, .. })) => {
                    println!("Validation queued as {}; it is retried when the backend is reachable", id);
                }
                Err(e) => return Err(e),
            }
        }
    }
    Ok(())
}

fn print_delivery(what: &str, delivery: &Delivery) {
    match delivery {
        Delivery::Sent => println!("{} sent", what),
        Delivery::Queued(id) => println!("{} queued as {}", what, id),
    }
}

/// Parses `KEY=VALUE` pairs. Values that are not valid JSON are kept as
/// strings.
pub fn parse_props(props: &[String]) -> Result<BTreeMap<String, serde_json::Value>> {
    props
        .iter()
        .map(|prop| {
            let (key, value) = prop
                .split_once('=')
                .filter(|(key, _)| !key.is_empty())
                .ok_or_else(|| Error::InvalidInput(format!("expected KEY=VALUE, got '{prop}'")))?;
            let value = serde_json::from_str(value)
                .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
            Ok((key.to_string(), value))
        })
        .collect()
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
