//! `ledger`, `transactions` and `events` commands.

use std::ops::RangeInclusive;

use anyhow::{Context, Result};
use futures::StreamExt;
use serde::Serialize;

use ledgerlake_core::{
    EventFilter, EventRecord, LedgerLake, RecordStream, TransactionFilter, TransactionRecord,
};

pub async fn ledger(lake: &LedgerLake, seq: u32, json: bool) -> Result<()> {
    let meta = lake
        .get_ledger(seq)
        .await
        .with_context(|| format!("failed to fetch ledger {seq}"))?;
    let header = meta.header();

    if json {
        let summary = serde_json::json!({
            "sequence": header.ledger_seq,
            "hash": hex::encode(header.hash),
            "previous_hash": hex::encode(header.previous_ledger_hash),
            "close_time": header.close_time,
            "protocol_version": header.protocol_version,
            "meta_version": meta.version(),
            "transaction_count": meta.transaction_count(),
        });
        println!("{summary}");
    } else {
        println!("Ledger:     {}", header.ledger_seq);
        println!("Hash:       {}", hex::encode(header.hash));
        println!("Closed at:  {}", format_time(header.close_time));
        println!("Protocol:   {}", header.protocol_version);
        println!("Meta:       v{}", meta.version());
        println!("Txs:        {}", meta.transaction_count());
    }

    let stream = lake
        .transactions(seq..=seq, TransactionFilter::new().include_failed(true))
        .await?;
    drain(stream, None, json, print_transaction).await
}

pub async fn transactions(
    lake: &LedgerLake,
    range: RangeInclusive<u32>,
    filter: TransactionFilter,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let stream = lake
        .transactions(range, filter)
        .await
        .context("failed to start transaction query")?;
    drain(stream, limit, json, print_transaction).await
}

pub async fn events(
    lake: &LedgerLake,
    range: RangeInclusive<u32>,
    filter: EventFilter,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let stream = lake
        .events(range, filter)
        .await
        .context("failed to start event query")?;
    drain(stream, limit, json, print_event).await
}

/// Print records until the stream ends, fails, or `limit` is reached.
async fn drain<T: Serialize>(
    mut stream: RecordStream<T>,
    limit: Option<usize>,
    json: bool,
    print: fn(&T),
) -> Result<()> {
    let mut count = 0usize;
    while let Some(item) = stream.next().await {
        let record = item.context("query failed")?;
        if json {
            println!("{}", serde_json::to_string(&record)?);
        } else {
            print(&record);
        }
        count += 1;
        if limit.is_some_and(|l| count >= l) {
            break;
        }
    }
    if !json {
        eprintln!("{count} record(s)");
    }
    Ok(())
}

fn print_transaction(tx: &TransactionRecord) {
    println!(
        "{:>10}  #{:<4} {}  {}  ops={} fee={}{}{}",
        tx.ledger_sequence,
        tx.application_order,
        tx.hash,
        tx.source_account,
        tx.operation_count,
        tx.fee_charged,
        if tx.fee_bump { " fee-bump" } else { "" },
        if tx.successful { "" } else { " FAILED" },
    );
}

fn print_event(ev: &EventRecord) {
    let topics: Vec<String> = ev.topics.iter().map(ToString::to_string).collect();
    let contract = if ev.is_system() { "-" } else { ev.contract_id.as_str() };
    println!(
        "{:>10}  {}  {:<10} {}  [{}] => {}",
        ev.ledger_sequence,
        &ev.transaction_hash[..ev.transaction_hash.len().min(12)],
        ev.kind.to_string(),
        contract,
        topics.join(", "),
        ev.value,
    );
}

fn format_time(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|s| chrono::DateTime::from_timestamp(s, 0))
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| secs.to_string())
}
