//! Journals: the durable record of every committed unit of work
//!
//! The file journal is line-delimited JSON (one event per line), appended and
//! flushed on every write. Reading a journal back in order rebuilds the state
//! it describes.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use super::traits::Journal;
use crate::types::{
    Account, BankError, BankResult, Card, Person, Transaction, WithdrawalCode,
};

/// One atomic change of the account engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    PersonSaved {
        person: Person,
    },
    /// Account created or changed without a balance movement
    AccountSaved {
        account: Account,
    },
    CardSaved {
        card: Card,
    },
    CodeSaved {
        code: WithdrawalCode,
    },
    /// Balance movement: new state of every touched account, the transaction
    /// record and the card or code consumed by it
    Posted {
        accounts: Vec<Account>,
        transaction: Transaction,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        card: Option<Card>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<WithdrawalCode>,
    },
}

/// Journal kept in memory
#[derive(Debug)]
pub struct MemoryJournal<E> {
    events: Mutex<Vec<E>>,
}

impl<E: Clone> MemoryJournal<E> {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of every appended event, oldest first
    pub fn events(&self) -> Vec<E> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<E: Clone> Default for MemoryJournal<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone + Send> Journal<E> for MemoryJournal<E> {
    fn append(&self, event: &E) -> BankResult<()> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}

/// File a [`FileJournal`] appends to
pub trait JournalFile: Write + Send {
    /// Current length in bytes
    fn size(&self) -> io::Result<u64>;

    fn set_len(&self, len: u64) -> io::Result<()>;

    fn sync_data(&self) -> io::Result<()>;
}

impl JournalFile for File {
    fn size(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn set_len(&self, len: u64) -> io::Result<()> {
        File::set_len(self, len)
    }

    fn sync_data(&self) -> io::Result<()> {
        File::sync_data(self)
    }
}

/// Append-only JSONL file journal
///
/// Each event is written with a single unbuffered `write_all`. A write that
/// fails part way is cut back off the file, so a rejected event never
/// reappears on a later append or after a restart.
#[derive(Debug)]
pub struct FileJournal<F = File> {
    path: PathBuf,
    file: Mutex<F>,
    /// Also fsync every write
    sync: bool,
}

impl FileJournal {
    /// Open (creating if needed) the journal at `path` for appending
    ///
    /// A torn last line is cut off first so that the next event starts on a
    /// line of its own.
    pub fn open(path: impl AsRef<Path>, sync: bool) -> BankResult<Self> {
        let path = path.as_ref().to_path_buf();
        truncate_torn_tail(&path)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                BankError::storage(format!("failed to open journal {}: {}", path.display(), e))
            })?;
        Ok(Self::with_file(path, file, sync))
    }
}

impl<F: JournalFile> FileJournal<F> {
    /// Journal over an already opened file positioned for appending
    ///
    /// `path` is only used in log messages.
    pub fn with_file(path: impl Into<PathBuf>, file: F, sync: bool) -> Self {
        let path = path.into();
        Self {
            path,
            file: Mutex::new(file),
            sync,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&self, file: &mut F, line: &[u8]) -> io::Result<()> {
        file.write_all(line)?;
        file.flush()?;
        if self.sync {
            file.sync_data()?;
        }
        Ok(())
    }
}

impl<E: Serialize, F: JournalFile> Journal<E> for FileJournal<F> {
    fn append(&self, event: &E) -> BankResult<()> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        let len = file.size()?;
        if let Err(e) = self.write_line(&mut file, line.as_bytes()) {
            match file.set_len(len) {
                Ok(()) => warn!(
                    journal = %self.path.display(),
                    error = %e,
                    "journal write failed, entry discarded"
                ),
                Err(cut) => error!(
                    journal = %self.path.display(),
                    error = %e,
                    truncate_error = %cut,
                    "journal write failed and the partial entry could not be removed"
                ),
            }
            return Err(e.into());
        }
        Ok(())
    }
}

/// Drop trailing bytes after the last newline of an existing journal
fn truncate_torn_tail(path: &Path) -> BankResult<()> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    if bytes.last().is_none_or(|&b| b == b'\n') {
        return Ok(());
    }
    let keep = bytes
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |newline| newline + 1);
    warn!(
        journal = %path.display(),
        dropped_bytes = bytes.len() - keep,
        "truncating incomplete journal entry"
    );
    let file = OpenOptions::new().write(true).open(path)?;
    file.set_len(keep as u64)?;
    Ok(())
}

/// Read every event of a journal file, oldest first
///
/// A missing file is an empty journal. A torn last line (crash while
/// appending) is dropped with a warning; corruption anywhere else is an error.
pub fn read_events<E: DeserializeOwned>(path: impl AsRef<Path>) -> BankResult<Vec<E>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    let lines: Vec<String> = BufReader::new(file).lines().collect::<Result<_, _>>()?;
    let last = lines.len().saturating_sub(1);
    let mut events = Vec::with_capacity(lines.len());

    for (index, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<E>(line) {
            Ok(event) => events.push(event),
            Err(e) if index == last => {
                warn!(
                    journal = %path.display(),
                    line = index + 1,
                    error = %e,
                    "dropping incomplete journal entry"
                );
            }
            Err(e) => {
                return Err(BankError::storage(format!(
                    "corrupt journal {} at line {}: {}",
                    path.display(),
                    index + 1,
                    e
                )))
            }
        }
    }

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Entry {
        n: u32,
    }

    #[test]
    fn test_memory_journal_keeps_order() {
        let journal = MemoryJournal::new();
        journal.append(&Entry { n: 1 }).unwrap();
        journal.append(&Entry { n: 2 }).unwrap();
        assert_eq!(journal.events(), vec![Entry { n: 1 }, Entry { n: 2 }]);
    }

    #[test]
    fn test_file_journal_appends_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");

        let journal = FileJournal::open(&path, false).unwrap();
        journal.append(&Entry { n: 1 }).unwrap();
        drop(journal);

        let journal = FileJournal::open(&path, true).unwrap();
        journal.append(&Entry { n: 2 }).unwrap();

        let events: Vec<Entry> = read_events(&path).unwrap();
        assert_eq!(events, vec![Entry { n: 1 }, Entry { n: 2 }]);
    }

    #[test]
    fn test_read_missing_journal_is_empty() {
        let dir = tempdir().unwrap();
        let events: Vec<Entry> = read_events(dir.path().join("none.jsonl")).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_torn_last_line_is_dropped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        fs::write(&path, "{\"n\":1}\n{\"n\":").unwrap();

        let events: Vec<Entry> = read_events(&path).unwrap();
        assert_eq!(events, vec![Entry { n: 1 }]);
    }

    #[test]
    fn test_open_cuts_torn_tail_before_appending() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        fs::write(&path, "{\"n\":1}\n{\"n\":").unwrap();

        let journal = FileJournal::open(&path, false).unwrap();
        journal.append(&Entry { n: 2 }).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"n\":1}\n{\"n\":2}\n");
    }

    /// In-memory file whose next write stores a few bytes and then fails
    #[derive(Debug, Default)]
    struct FlakyFile {
        bytes: RefCell<Vec<u8>>,
        fail_next: bool,
    }

    impl Write for FlakyFile {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let bytes = self.bytes.get_mut();
            if std::mem::take(&mut self.fail_next) {
                bytes.extend_from_slice(&buf[..buf.len().min(4)]);
                return Err(io::Error::new(ErrorKind::Other, "disk full"));
            }
            bytes.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl JournalFile for FlakyFile {
        fn size(&self) -> io::Result<u64> {
            Ok(self.bytes.borrow().len() as u64)
        }

        fn set_len(&self, len: u64) -> io::Result<()> {
            self.bytes.borrow_mut().truncate(len as usize);
            Ok(())
        }

        fn sync_data(&self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_write_is_cut_and_not_replayed() {
        let file = FlakyFile::default();
        let journal = FileJournal::with_file("flaky.jsonl", file, true);
        journal.append(&Entry { n: 1 }).unwrap();

        journal.file.lock().unwrap().fail_next = true;
        let err = journal.append(&Entry { n: 2 }).unwrap_err();
        assert_eq!(err.kind(), crate::types::ErrorKind::Storage);
        journal.append(&Entry { n: 3 }).unwrap();

        let written = journal.file.lock().unwrap().bytes.borrow().clone();
        assert_eq!(String::from_utf8(written).unwrap(), "{\"n\":1}\n{\"n\":3}\n");
    }

    #[test]
    fn test_corrupt_middle_line_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        fs::write(&path, "{\"n\":1}\ngarbage\n{\"n\":3}\n").unwrap();

        let err = read_events::<Entry>(&path).unwrap_err();
        assert_eq!(err.kind(), crate::types::ErrorKind::Storage);
    }
}
