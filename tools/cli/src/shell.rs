//! Interactive menu over the two stores and the sync engine.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use docsync_common::{
    parse_integer, parse_non_negative, parse_positive, Error, RecordId, RecordPatch,
};
use docsync_storage::{load_source, DocumentStore, Query, RecordGenerator};
use docsync_sync::{SchedulerStatus, SyncEngine, SyncReport, SyncScheduler};

/// Largest number of records one Load action inserts.
const MAX_LOAD_RECORDS: u64 = 100_000;

const MENU: &str = "\
1) Load synthetic records into source
2) Show source records
3) Show target records
4) Change a record's owner (by id)
5) Full sync
6) Batched sync
7) Incremental sync
8) Toggle auto-sync
9) Status
0) Exit";

/// A menu entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Load,
    ShowSource,
    ShowTarget,
    ChangeOwner,
    FullSync,
    BatchedSync,
    IncrementalSync,
    ToggleAutoSync,
    Status,
    Exit,
}

impl Action {
    fn from_choice(choice: i64) -> Option<Self> {
        let action = match choice {
            1 => Action::Load,
            2 => Action::ShowSource,
            3 => Action::ShowTarget,
            4 => Action::ChangeOwner,
            5 => Action::FullSync,
            6 => Action::BatchedSync,
            7 => Action::IncrementalSync,
            8 => Action::ToggleAutoSync,
            9 => Action::Status,
            0 => Action::Exit,
            _ => return None,
        };
        Some(action)
    }
}

/// Line-oriented shell, generic over its input and output.
pub struct Shell<R, W> {
    input: R,
    output: W,
    engine: Arc<SyncEngine>,
    scheduler: SyncScheduler,
    generator: RecordGenerator,
}

impl<R, W> Shell<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(engine: Arc<SyncEngine>, input: R, output: W) -> Self {
        Self {
            input,
            output,
            scheduler: SyncScheduler::new(engine.clone()),
            engine,
            generator: RecordGenerator::new(),
        }
    }

    /// Consume the shell and hand back its output sink.
    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }

    /// Run the menu loop until Exit or end of input.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            self.say(MENU).await?;
            let Some(choice) = self.prompt("Choose an option: ", parse_integer).await? else {
                break;
            };

            let Some(action) = Action::from_choice(choice) else {
                self.say(format!("Unknown option {}.", choice)).await?;
                continue;
            };

            debug!("Menu action: {:?}", action);
            if action == Action::Exit || !self.dispatch(action).await? {
                break;
            }
        }

        if self.scheduler.stop().await? {
            self.say("Auto-sync stopped.").await?;
        }
        self.say("Bye.").await?;
        Ok(())
    }

    /// Run one action. Returns false when input ran out mid-action.
    async fn dispatch(&mut self, action: Action) -> Result<bool> {
        match action {
            Action::Load => {
                let Some(count) = self.prompt("How many records? ", parse_load_count).await?
                else {
                    return Ok(false);
                };
                let loaded = load_source(self.engine.source().as_ref(), count as usize).await?;
                self.say(format!("Loaded {} record(s) into source.", loaded)).await?;
            }
            Action::ShowSource => {
                let store = self.engine.source().clone();
                self.show(store.as_ref()).await?;
            }
            Action::ShowTarget => {
                let store = self.engine.target().clone();
                self.show(store.as_ref()).await?;
            }
            Action::ChangeOwner => return self.change_owner().await,
            Action::FullSync => {
                let result = self.engine.sync_full().await;
                self.report(result).await?;
            }
            Action::BatchedSync => {
                let Some(batch_size) = self.prompt("Batch size: ", parse_positive).await? else {
                    return Ok(false);
                };
                let result = self.engine.sync_batched(batch_size as usize).await;
                self.report(result).await?;
            }
            Action::IncrementalSync => {
                let result = self.engine.sync_incremental().await;
                self.report(result).await?;
            }
            Action::ToggleAutoSync => return self.toggle_auto_sync().await,
            Action::Status => self.status().await?,
            Action::Exit => {}
        }
        Ok(true)
    }

    async fn change_owner(&mut self) -> Result<bool> {
        let Some(id) = self.prompt("Record id: ", parse_positive).await? else {
            return Ok(false);
        };
        let id = RecordId::new(id)?;

        if self.engine.source().get(id).await?.is_none() {
            self.say(format!("No record with id {} in source.", id)).await?;
            return Ok(true);
        }

        self.write("New owner (blank for random): ").await?;
        let Some(line) = self.read_line().await? else {
            return Ok(false);
        };
        let owner = match line.trim() {
            "" => self.generator.owner(),
            owner => owner.to_string(),
        };

        let updated = self
            .engine
            .source()
            .update(&Query::by_id(id), &RecordPatch::owner(owner))
            .await?;
        match updated.first() {
            Some(record) => self.say(format!("Updated {}", record)).await?,
            None => self.say(format!("No record with id {} in source.", id)).await?,
        }
        Ok(true)
    }

    async fn toggle_auto_sync(&mut self) -> Result<bool> {
        let interval = match self.scheduler.status().await {
            SchedulerStatus::Running { .. } => None,
            SchedulerStatus::Stopped => {
                let Some(secs) = self.prompt("Interval in seconds: ", parse_positive).await?
                else {
                    return Ok(false);
                };
                Some(Duration::from_secs(secs))
            }
        };

        match self.scheduler.toggle(interval).await {
            Ok(SchedulerStatus::Running { interval }) => {
                self.say(format!("Auto-sync running every {}s.", interval.as_secs()))
                    .await?
            }
            Ok(SchedulerStatus::Stopped) => self.say("Auto-sync stopped.").await?,
            Err(e) => self.say(format!("Auto-sync failed to start: {}", e)).await?,
        }
        Ok(true)
    }

    async fn status(&mut self) -> Result<()> {
        let state = self.engine.status().await;
        let source = self.engine.source().count(&Query::all()).await?;
        let target = self.engine.target().count(&Query::all()).await?;
        let auto = match self.scheduler.status().await {
            SchedulerStatus::Running { interval } => {
                format!("running every {}s", interval.as_secs())
            }
            SchedulerStatus::Stopped => "stopped".to_string(),
        };

        self.say(format!("Last synced at: {}", state.watermark())).await?;
        self.say(format!("Sync passes: {}", state.passes())).await?;
        if let Some(report) = state.last_report() {
            self.say(format!("Last pass: {}", describe(report))).await?;
        }
        self.say(format!("Source records: {}", source)).await?;
        self.say(format!("Target records: {}", target)).await?;
        self.say(format!("Auto-sync: {}", auto)).await?;
        Ok(())
    }

    async fn show(&mut self, store: &dyn DocumentStore) -> Result<()> {
        let records = store.find(&Query::all()).await?;
        if records.is_empty() {
            self.say(format!("{} store is empty.", store.name())).await?;
            return Ok(());
        }

        self.say(format!("{} store ({} records):", store.name(), records.len()))
            .await?;
        for record in records {
            self.say(format!("  {}", record)).await?;
        }
        Ok(())
    }

    async fn report(&mut self, result: docsync_common::Result<SyncReport>) -> Result<()> {
        match result {
            Ok(report) => self.say(describe(&report)).await,
            Err(e) => self.say(format!("Sync failed: {}", e)).await,
        }
    }

    /// Ask until `parse` accepts the line. `None` means end of input.
    async fn prompt<T>(
        &mut self,
        question: &str,
        parse: fn(&str) -> docsync_common::Result<T>,
    ) -> Result<Option<T>> {
        loop {
            self.write(question).await?;
            let Some(line) = self.read_line().await? else {
                return Ok(None);
            };
            match parse(&line) {
                Ok(value) => return Ok(Some(value)),
                Err(e) => self.say(format!("{}. Please enter a valid integer.", e)).await?,
            }
        }
    }

    async fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }

    async fn write(&mut self, text: &str) -> Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.flush().await?;
        Ok(())
    }

    async fn say(&mut self, line: impl AsRef<str>) -> Result<()> {
        self.write(line.as_ref()).await?;
        self.write("\n").await
    }
}

/// A record count for the Load action, capped at `MAX_LOAD_RECORDS`.
fn parse_load_count(input: &str) -> docsync_common::Result<u64> {
    let count = parse_non_negative(input)?;
    if count > MAX_LOAD_RECORDS {
        return Err(Error::InvalidInput(format!(
            "at most {} records can be loaded at once",
            MAX_LOAD_RECORDS
        )));
    }
    Ok(count)
}

/// One-line summary of a sync pass.
pub fn describe(report: &SyncReport) -> String {
    let mut summary = format!(
        "{} sync: {} inserted, {} updated",
        report.strategy, report.inserted, report.updated
    );
    if report.cleared > 0 {
        summary.push_str(&format!(", {} cleared", report.cleared));
    }
    if report.batches > 0 {
        summary.push_str(&format!(", {} batches", report.batches));
    }
    if report.missing > 0 {
        summary.push_str(&format!(", {} missing in target", report.missing));
    }
    summary.push_str(&format!(" ({:?})", report.duration));
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsync_storage::MemoryStore;
    use docsync_sync::SyncConfig;

    fn engine() -> Arc<SyncEngine> {
        let source = Arc::new(MemoryStore::new("source"));
        let target = Arc::new(MemoryStore::new("target"));
        Arc::new(SyncEngine::new(source, target, SyncConfig::default()).unwrap())
    }

    async fn run_script(engine: Arc<SyncEngine>, script: &str) -> String {
        let mut shell = Shell::new(engine, script.as_bytes(), Vec::new());
        shell.run().await.unwrap();
        String::from_utf8(shell.into_output()).unwrap()
    }

    #[test]
    fn test_action_from_choice() {
        assert_eq!(Action::from_choice(5), Some(Action::FullSync));
        assert_eq!(Action::from_choice(0), Some(Action::Exit));
        assert_eq!(Action::from_choice(10), None);
        assert_eq!(Action::from_choice(-1), None);
    }

    #[tokio::test]
    async fn test_exit() {
        let output = run_script(engine(), "0\n").await;
        assert!(output.contains("1) Load synthetic records"));
        assert!(output.ends_with("Bye.\n"));
    }

    #[tokio::test]
    async fn test_eof_exits() {
        let output = run_script(engine(), "").await;
        assert!(output.ends_with("Bye.\n"));
    }

    #[tokio::test]
    async fn test_unknown_option() {
        let output = run_script(engine(), "42\n0\n").await;
        assert!(output.contains("Unknown option 42."));
    }

    #[tokio::test]
    async fn test_reprompts_invalid_numbers() {
        let engine = engine();
        let output = run_script(engine.clone(), "1\nabc\n2.5\n-1\n4\n0\n").await;

        assert_eq!(output.matches("Please enter a valid integer.").count(), 3);
        assert!(output.contains("Loaded 4 record(s) into source."));
        assert_eq!(engine.source().count(&Query::all()).await.unwrap(), 4);
    }

    #[test]
    fn test_parse_load_count() {
        assert_eq!(parse_load_count(" 0 ").unwrap(), 0);
        assert_eq!(parse_load_count("100000").unwrap(), MAX_LOAD_RECORDS);
        assert!(matches!(
            parse_load_count("100001"),
            Err(Error::InvalidInput(_))
        ));
        assert!(parse_load_count("-3").is_err());
    }

    #[tokio::test]
    async fn test_load_rejects_huge_count() {
        let engine = engine();
        let output = run_script(engine.clone(), "1\n1000000000000000000\n2\n0\n").await;

        assert!(output.contains("at most 100000 records can be loaded at once"));
        assert!(output.contains("Loaded 2 record(s) into source."));
        assert_eq!(engine.source().count(&Query::all()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_load_sync_change_owner_incremental() {
        let engine = engine();
        let output = run_script(engine.clone(), "1\n3\n5\n4\n1\nzed\n7\n3\n0\n").await;

        assert!(output.contains("full sync: 3 inserted"));
        assert!(output.contains("incremental sync: 0 inserted, 1 updated"));

        let records = engine.target().find(&Query::all()).await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records.iter().filter(|r| r.owner == "zed").count(), 1);
    }

    #[tokio::test]
    async fn test_change_owner_unknown_id() {
        let output = run_script(engine(), "4\n99\n0\n").await;
        assert!(output.contains("No record with id 99 in source."));
    }

    #[tokio::test]
    async fn test_batched_sync_rejects_zero_then_runs() {
        let engine = engine();
        let output = run_script(engine.clone(), "1\n5\n6\n0\n2\n0\n").await;

        assert!(output.contains("must be a positive integer"));
        assert!(output.contains("batched(2) sync: 5 inserted"));
        assert_eq!(engine.target().count(&Query::all()).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_toggle_auto_sync() {
        let engine = engine();
        let output = run_script(engine.clone(), "1\n2\n8\n60\n9\n8\n9\n0\n").await;

        assert!(output.contains("Auto-sync running every 60s."));
        assert!(output.contains("Auto-sync: running every 60s"));
        assert!(output.contains("Auto-sync stopped."));
        assert!(output.contains("Auto-sync: stopped"));
        // Bootstrap copied the source into the empty target.
        assert_eq!(engine.target().count(&Query::all()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_exit_stops_auto_sync() {
        let output = run_script(engine(), "8\n30\n0\n").await;
        assert!(output.contains("Auto-sync running every 30s."));
        assert!(output.ends_with("Auto-sync stopped.\nBye.\n"));
    }

    #[tokio::test]
    async fn test_show_empty_target() {
        let output = run_script(engine(), "3\n0\n").await;
        assert!(output.contains("target store is empty."));
    }
}
