//! # Journal
//!
//! A small line journal built on the runtime, and what the `lineloop`
//! binary runs. Every plain line typed becomes a timestamped entry; lines
//! starting with `:` are commands.
//!
//! ```text
//! Journal
//! ├── store: JournalStore     // JSON file on disk
//! ├── entries: Vec<Entry>     // everything typed (and loaded)
//! ├── loaded: bool            // init's load finished
//! ├── load_failed: bool       // disk copy unreadable, never overwrite it
//! ├── dirty: bool             // entries not yet on disk
//! ├── stats: BTreeMap         // last :stats results
//! └── status: String          // last thing said to the user
//! ```
//!
//! Disk access only happens inside commands and `teardown`; `update` just
//! decides what to do next.

pub mod store;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::core::command::Command;
use crate::core::message::Message;
use crate::core::model::{Model, TeardownError};

pub use store::{Entry, JournalStore};

const HELP: &str = "\
Type a line to add it to the journal.
  :list   show all entries
  :stats  count entries, words and characters
  :save   write the journal to disk now
  :help   show this help
  :quit   save and exit";

#[derive(Debug)]
pub enum JournalMsg {
    Loaded(Result<Vec<Entry>, String>),
    /// Number of entries written, or why writing failed.
    Saved(Result<usize, String>),
    Stat { label: &'static str, value: usize },
}

/// Where the journal's replies go. Replies are queued in the order
/// `update` produces them and written by a single consumer.
#[derive(Clone, Debug)]
pub struct Output {
    tx: mpsc::UnboundedSender<String>,
}

impl Output {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }

    /// Spawns the stdout printer. The handle finishes once every `Output`
    /// clone is dropped and the queued replies are written.
    pub fn stdout() -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let printer = tokio::spawn(async move {
            let mut out = tokio::io::stdout();
            while let Some(text) = rx.recv().await {
                let line = format!("{text}\n");
                if let Err(e) = out.write_all(line.as_bytes()).await {
                    warn!("Failed to write to stdout: {}", e);
                    continue;
                }
                if let Err(e) = out.flush().await {
                    warn!("Failed to flush stdout: {}", e);
                }
            }
        });
        (Self::new(tx), printer)
    }

    fn emit(&self, text: String) {
        if self.tx.send(text).is_err() {
            debug!("Reply dropped, output receiver is gone");
        }
    }
}

pub struct Journal {
    store: JournalStore,
    output: Output,
    pub entries: Vec<Entry>,
    pub loaded: bool,
    pub load_failed: bool,
    pub dirty: bool,
    pub stats: BTreeMap<&'static str, usize>,
    pub status: String,
}

impl Journal {
    pub fn with_output(store: JournalStore, output: Output) -> Self {
        Self {
            store,
            output,
            entries: Vec::new(),
            loaded: false,
            load_failed: false,
            dirty: false,
            stats: BTreeMap::new(),
            status: String::new(),
        }
    }

    /// Queues a reply. Queuing never blocks, so replies keep their order.
    fn say(&mut self, text: impl Into<String>) {
        self.status = text.into();
        self.output.emit(self.status.clone());
    }

    fn save_command(&self) -> Option<Command<JournalMsg>> {
        let store = self.store.clone();
        let entries = self.entries.clone();
        Some(Command::perform(
            async move {
                store
                    .save(&entries)
                    .await
                    .map(|_| entries.len())
                    .map_err(|e| e.to_string())
            },
            JournalMsg::Saved,
        ))
    }

    fn stats_command(&self) -> Option<Command<JournalMsg>> {
        let texts: Vec<String> = self.entries.iter().map(|e| e.text.clone()).collect();
        let words = texts.clone();
        let chars = texts.clone();
        Command::batch([
            Some(stat("entries", async move { texts.len() })),
            Some(stat("words", async move {
                words.iter().map(|t| t.split_whitespace().count()).sum::<usize>()
            })),
            Some(stat("characters", async move {
                chars.iter().map(|t| t.chars().count()).sum::<usize>()
            })),
        ])
    }

    fn listing(&self) -> String {
        if self.entries.is_empty() {
            return "The journal is empty.".to_string();
        }
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| {
                format!(
                    "{:>3}  {}  {}",
                    i + 1,
                    e.created_at.format("%Y-%m-%d %H:%M"),
                    e.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn handle_line(mut self, line: String) -> (Self, Option<Command<JournalMsg>>) {
        let trimmed = line.trim();
        let cmd = match trimmed {
            "" => None,
            ":q" | ":quit" => Some(Command::quit()),
            ":save" if self.load_failed => {
                self.say("The journal on disk could not be read, not overwriting it.");
                None
            }
            ":save" if !self.loaded => {
                self.say("Still loading the journal, try :save again in a moment.");
                None
            }
            ":save" => self.save_command(),
            ":stats" => self.stats_command(),
            ":help" => {
                self.say(HELP);
                None
            }
            ":list" => {
                let listing = self.listing();
                self.say(listing);
                None
            }
            other if other.starts_with(':') => {
                self.say(format!("Unknown command {other}, try :help"));
                None
            }
            text => {
                self.entries.push(Entry::new(text));
                self.dirty = true;
                debug!("Journal now has {} entries", self.entries.len());
                None
            }
        };
        (self, cmd)
    }
}

fn stat<F>(label: &'static str, count: F) -> Command<JournalMsg>
where
    F: std::future::Future<Output = usize> + Send + 'static,
{
    Command::perform(count, move |value| JournalMsg::Stat { label, value })
}

#[derive(Debug)]
struct NotSaved(String);

impl fmt::Display for NotSaved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "journal not saved: {}", self.0)
    }
}

impl std::error::Error for NotSaved {}

#[async_trait]
impl Model for Journal {
    type Msg = JournalMsg;

    fn init(&self) -> Option<Command<JournalMsg>> {
        let store = self.store.clone();
        let load = Command::perform(
            async move { store.load().await.map_err(|e| e.to_string()) },
            JournalMsg::Loaded,
        );
        self.output.emit(format!(
            "Journal at {}. Type :help for commands.",
            self.store.path().display()
        ));
        Some(load)
    }

    fn update(mut self, msg: Message<JournalMsg>) -> (Self, Option<Command<JournalMsg>>) {
        match msg {
            Message::Input(line) => self.handle_line(line),
            Message::App(JournalMsg::Loaded(Ok(mut earlier))) => {
                let loaded = earlier.len();
                earlier.append(&mut self.entries);
                self.entries = earlier;
                self.loaded = true;
                self.say(format!("Loaded {loaded} entries."));
                (self, None)
            }
            Message::App(JournalMsg::Loaded(Err(e))) => {
                warn!("Journal load failed: {}", e);
                self.loaded = true;
                self.load_failed = true;
                self.say(format!("Could not load journal ({e}); it will not be overwritten."));
                (self, None)
            }
            Message::App(JournalMsg::Saved(Ok(count))) => {
                // Entries typed while the save ran are still unsaved.
                if count == self.entries.len() {
                    self.dirty = false;
                }
                self.say(format!("Saved {count} entries."));
                (self, None)
            }
            Message::App(JournalMsg::Saved(Err(e))) => {
                self.say(format!("Save failed: {e}"));
                (self, None)
            }
            Message::App(JournalMsg::Stat { label, value }) => {
                self.stats.insert(label, value);
                self.say(format!("{label}: {value}"));
                (self, None)
            }
            Message::Quit | Message::Batch(_) => (self, None),
        }
    }

    async fn teardown(mut self, deadline: Instant) -> Result<(), TeardownError> {
        if !self.dirty {
            debug!("Journal clean, nothing to save");
            return Ok(());
        }
        if self.load_failed {
            return Err(Box::new(NotSaved(format!(
                "{} could not be read earlier",
                self.store.path().display()
            ))));
        }
        if !self.loaded {
            // Quit arrived before the initial load finished.
            let mut earlier = self.store.load().await?;
            earlier.append(&mut self.entries);
            self.entries = earlier;
        }

        info!(
            "Saving {} entries ({:?} left before deadline)",
            self.entries.len(),
            deadline.saturating_duration_since(Instant::now())
        );
        self.store.save(&self.entries).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::store::temp_store;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn journal() -> Journal {
        Journal::with_output(temp_store(), Output::new(mpsc::unbounded_channel().0))
    }

    fn input(j: Journal, line: &str) -> (Journal, Option<Command<JournalMsg>>) {
        j.update(Message::Input(line.to_string()))
    }

    async fn run(cmd: Option<Command<JournalMsg>>) -> Option<Message<JournalMsg>> {
        cmd.expect("a command").execute(CancellationToken::new()).await
    }

    #[test]
    fn test_plain_line_becomes_entry() {
        let (j, cmd) = input(journal(), "  bought milk  ");
        assert!(cmd.is_none());
        assert_eq!(j.entries.len(), 1);
        assert_eq!(j.entries[0].text, "bought milk");
        assert!(j.dirty);
    }

    #[test]
    fn test_blank_line_is_ignored() {
        let (j, cmd) = input(journal(), "   ");
        assert!(cmd.is_none());
        assert!(j.entries.is_empty());
        assert!(!j.dirty);
    }

    #[tokio::test]
    async fn test_quit_command_resolves_to_quit() {
        let (_, cmd) = input(journal(), ":quit");
        assert!(matches!(run(cmd).await, Some(Message::Quit)));
    }

    #[tokio::test]
    async fn test_stats_fans_out_as_batch() {
        let (j, _) = input(journal(), "one two");
        let (j, _) = input(j, "three");
        let (_, cmd) = input(j, ":stats");

        let Some(Message::Batch(commands)) = run(cmd).await else {
            panic!("expected a batch");
        };
        assert_eq!(commands.len(), 3);

        let mut stats = BTreeMap::new();
        for c in commands {
            match c.execute(CancellationToken::new()).await {
                Some(Message::App(JournalMsg::Stat { label, value })) => {
                    stats.insert(label, value);
                }
                other => panic!("expected a stat, got {:?}", other),
            }
        }
        assert_eq!(stats["entries"], 2);
        assert_eq!(stats["words"], 3);
        assert_eq!(stats["characters"], 12);
    }

    #[test]
    fn test_unknown_command_sets_status() {
        let (j, cmd) = input(journal(), ":frobnicate");
        assert!(cmd.is_none());
        assert!(j.status.contains(":frobnicate"));
        assert!(j.entries.is_empty());
    }

    #[test]
    fn test_replies_keep_their_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let j = Journal::with_output(temp_store(), Output::new(tx));
        assert!(j.init().is_some());
        let (j, _) = j.update(Message::App(JournalMsg::Loaded(Ok(Vec::new()))));
        let (j, _) = input(j, ":list");
        let (j, _) = input(j, ":nope");
        drop(j);

        let mut replies = Vec::new();
        while let Ok(reply) = rx.try_recv() {
            replies.push(reply);
        }
        assert_eq!(replies.len(), 4);
        assert!(replies[0].starts_with("Journal at "));
        assert_eq!(replies[1], "Loaded 0 entries.");
        assert_eq!(replies[2], "The journal is empty.");
        assert!(replies[3].starts_with("Unknown command :nope"));
    }

    #[tokio::test]
    async fn test_stdout_printer_finishes_when_outputs_drop() {
        let (output, printer) = Output::stdout();
        let j = Journal::with_output(temp_store(), output);
        let (j, _) = input(j, ":help");
        drop(j);
        tokio_test::assert_ok!(printer.await);
    }

    #[test]
    fn test_loaded_entries_come_before_typed_ones() {
        let (j, _) = input(journal(), "typed early");
        let disk = vec![Entry::new("from disk")];
        let (j, _) = j.update(Message::App(JournalMsg::Loaded(Ok(disk))));
        let texts: Vec<_> = j.entries.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["from disk", "typed early"]);
        assert!(j.loaded);
        assert!(j.dirty);
    }

    #[test]
    fn test_save_result_only_clears_dirty_when_current() {
        let (j, _) = input(journal(), "a");
        let (j, _) = input(j, "b");
        let (j, _) = j.update(Message::App(JournalMsg::Saved(Ok(1))));
        assert!(j.dirty);
        let (j, _) = j.update(Message::App(JournalMsg::Saved(Ok(2))));
        assert!(!j.dirty);
    }

    #[tokio::test]
    async fn test_teardown_persists_dirty_entries() {
        let store = temp_store();
        let j = Journal::with_output(store.clone(), Output::new(mpsc::unbounded_channel().0));
        let (j, _) = j.update(Message::App(JournalMsg::Loaded(Ok(Vec::new()))));
        let (j, _) = input(j, "keep me");

        tokio_test::assert_ok!(j.teardown(Instant::now() + Duration::from_secs(5)).await);
        let saved = tokio_test::assert_ok!(store.load().await);
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].text, "keep me");

        let _ = std::fs::remove_dir_all(store.path().parent().unwrap());
    }

    #[tokio::test]
    async fn test_teardown_merges_when_load_never_finished() {
        let store = temp_store();
        tokio_test::assert_ok!(store.save(&[Entry::new("old")]).await);

        let j = Journal::with_output(store.clone(), Output::new(mpsc::unbounded_channel().0));
        let (j, _) = input(j, "new");
        tokio_test::assert_ok!(j.teardown(Instant::now() + Duration::from_secs(5)).await);

        let saved = tokio_test::assert_ok!(store.load().await);
        let texts: Vec<_> = saved.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["old", "new"]);

        let _ = std::fs::remove_dir_all(store.path().parent().unwrap());
    }

    #[tokio::test]
    async fn test_teardown_refuses_after_failed_load() {
        let j = journal();
        let (j, _) = j.update(Message::App(JournalMsg::Loaded(Err("corrupt".into()))));
        let (j, _) = input(j, "something");
        let deadline = Instant::now() + Duration::from_secs(5);
        let err = tokio_test::assert_err!(j.teardown(deadline).await);
        assert!(err.to_string().contains("journal not saved"));
    }

    #[test]
    fn test_save_refused_after_failed_load() {
        let (j, _) = journal().update(Message::App(JournalMsg::Loaded(Err("corrupt".into()))));
        let (j, cmd) = input(j, ":save");
        assert!(cmd.is_none());
        assert!(j.status.contains("not overwriting"));
    }

    #[tokio::test]
    async fn test_save_waits_for_initial_load() {
        let store = temp_store();
        tokio_test::assert_ok!(store.save(&[Entry::new("old")]).await);

        let j = Journal::with_output(store.clone(), Output::new(mpsc::unbounded_channel().0));
        let (j, _) = input(j, "new");
        let (j, cmd) = input(j, ":save");
        assert!(cmd.is_none());
        assert!(j.status.contains("Still loading"));

        // The disk copy is untouched, so the late load merges cleanly.
        let on_disk = tokio_test::assert_ok!(store.load().await);
        let (j, _) = j.update(Message::App(JournalMsg::Loaded(Ok(on_disk))));
        let texts: Vec<_> = j.entries.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["old", "new"]);

        let (j, cmd) = input(j, ":save");
        let Some(Message::App(JournalMsg::Saved(Ok(2)))) = run(cmd).await else {
            panic!("expected two entries saved");
        };
        let saved = tokio_test::assert_ok!(store.load().await);
        let texts: Vec<_> = saved.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["old", "new"]);
        assert!(j.dirty);

        let _ = std::fs::remove_dir_all(store.path().parent().unwrap());
    }

    #[tokio::test]
    async fn test_clean_teardown_touches_nothing() {
        let j = journal();
        let path = j.store.path().to_path_buf();
        tokio_test::assert_ok!(j.teardown(Instant::now() + Duration::from_secs(5)).await);
        assert!(!path.exists());
    }
}
