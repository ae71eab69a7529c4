//! Scripted walk through the three manual sync strategies.

use anyhow::Result;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use docsync_common::RecordPatch;
use docsync_storage::{sample_records, DocumentStore, Query};
use docsync_sync::SyncEngine;

/// Owner written by the touch step.
const TOUCHED_OWNER: &str = "test4";

/// Load the sample records, then check full, batched and incremental sync.
///
/// Writes one numbered line per check and returns how many passed.
pub async fn run_demo<W>(engine: &SyncEngine, batch_size: usize, out: &mut W) -> Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let source = engine.source().clone();
    let mut inserted = Vec::new();
    for fields in sample_records() {
        inserted.push(source.insert(fields).await?);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let total = source.count(&Query::all()).await?;

    // Touch by id: preloaded records may also be called GE.
    let ge = inserted
        .first()
        .map(|r| r.id)
        .ok_or_else(|| anyhow::anyhow!("No sample records"))?;
    if let Some(record) = source.get(ge).await? {
        line(out, format!("GE: {}", record)).await?;
    }

    let mut passed = 0;

    let full = engine.sync_full().await?;
    passed += check(out, 1, full.events(), total).await?;

    let batched = engine.sync_batched(batch_size).await?;
    passed += check(out, 2, batched.events(), total).await?;

    tokio::time::sleep(Duration::from_millis(10)).await;
    source
        .update(&Query::by_id(ge), &RecordPatch::owner(TOUCHED_OWNER))
        .await?;
    let incremental = engine.sync_incremental().await?;
    passed += check(out, 3, incremental.events(), 1).await?;

    Ok(passed)
}

async fn check<W>(out: &mut W, step: usize, sent: usize, expected: usize) -> Result<usize>
where
    W: AsyncWrite + Unpin,
{
    if sent == expected {
        line(out, format!("{}. synchronized correct number of events", step)).await?;
        Ok(1)
    } else {
        line(
            out,
            format!("{}. expected {} events, sent {}", step, expected, sent),
        )
        .await?;
        Ok(0)
    }
}

async fn line<W>(out: &mut W, text: String) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(text.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await?;
    Ok(())
}
