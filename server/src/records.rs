//! Durable store of retired-player records.
//!
//! Records append to a JSON-lines file through a bounded pool of file
//! connections. Acquiring blocks on a condition variable until a
//! connection is free, so an exhausted pool shows up as latency rather
//! than failure. Appends that cannot commit land in an in-memory pending
//! queue and are retried ahead of the next append.
//!
//! The ranked query orders by score descending, then play time
//! ascending, then name ascending, with offset/limit pagination.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex};
use thiserror::Error;
use uuid::Uuid;

/// Page size the ranked query uses when the caller does not care.
pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Error)]
pub enum RecordsError {
    #[error("records i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("records encoding: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One persisted retirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetiredRecord {
    pub id: Uuid,
    pub name: String,
    pub score: i64,
    pub play_time_ms: i64,
}

impl RetiredRecord {
    pub fn new(name: impl Into<String>, score: i64, play_time_seconds: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            score,
            play_time_ms: (play_time_seconds * 1000.0).round() as i64,
        }
    }
}

/// Bounded pool of connections. `acquire` blocks until a connection is
/// idle; dropping the guard returns it and wakes one waiter.
pub struct ConnectionPool<C> {
    idle: Mutex<Vec<C>>,
    ready: Condvar,
}

impl<C> ConnectionPool<C> {
    pub fn new(connections: Vec<C>) -> Self {
        Self {
            idle: Mutex::new(connections),
            ready: Condvar::new(),
        }
    }

    pub fn acquire(&self) -> PooledConnection<'_, C> {
        let mut idle = self.idle.lock().unwrap();
        loop {
            if let Some(conn) = idle.pop() {
                return PooledConnection {
                    conn: Some(conn),
                    pool: self,
                };
            }
            idle = self.ready.wait(idle).unwrap();
        }
    }

    fn release(&self, conn: C) {
        self.idle.lock().unwrap().push(conn);
        self.ready.notify_one();
    }
}

pub struct PooledConnection<'a, C> {
    conn: Option<C>,
    pool: &'a ConnectionPool<C>,
}

impl<C> Deref for PooledConnection<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.conn.as_ref().expect("connection present until drop")
    }
}

impl<C> DerefMut for PooledConnection<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.conn.as_mut().expect("connection present until drop")
    }
}

impl<C> Drop for PooledConnection<'_, C> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}

/// An open append handle to the records file.
pub struct RecordConn {
    file: File,
}

impl RecordConn {
    fn open(path: &Path) -> Result<Self, RecordsError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }

    fn append(&mut self, record: &RetiredRecord) -> Result<(), RecordsError> {
        let line = serde_json::to_string(record)?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        self.file.flush()?;
        Ok(())
    }
}

pub struct RecordStore {
    path: PathBuf,
    pool: ConnectionPool<RecordConn>,
    pending: Mutex<VecDeque<RetiredRecord>>,
}

impl RecordStore {
    /// Prepare the store: create the parent directory and the file, and
    /// open `pool_size` append connections.
    pub fn open(path: impl Into<PathBuf>, pool_size: usize) -> Result<Self, RecordsError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let connections = (0..pool_size.max(1))
            .map(|_| RecordConn::open(&path))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            path,
            pool: ConnectionPool::new(connections),
            pending: Mutex::new(VecDeque::new()),
        })
    }

    /// Append one retirement. Any records still pending from earlier
    /// failed appends are committed first, in their original order.
    pub fn add(&self, name: &str, score: i64, play_time_seconds: f64) -> Result<(), RecordsError> {
        self.commit(RetiredRecord::new(name, score, play_time_seconds))
    }

    fn commit(&self, record: RetiredRecord) -> Result<(), RecordsError> {
        let mut batch: Vec<RetiredRecord> = self.pending.lock().unwrap().drain(..).collect();
        batch.push(record);

        let mut conn = self.pool.acquire();
        for done in 0..batch.len() {
            if let Err(err) = conn.append(&batch[done]) {
                let mut pending = self.pending.lock().unwrap();
                for rec in batch.drain(done..).rev() {
                    pending.push_front(rec);
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Records awaiting a retry after a failed append.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Ranked page of records: score descending, play time ascending,
    /// name ascending. A line torn by a crash mid-append is skipped.
    pub fn top(&self, start: usize, max_items: usize) -> Result<Vec<RetiredRecord>, RecordsError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if let Ok(record) = serde_json::from_str::<RetiredRecord>(&line) {
                records.push(record);
            }
        }
        records.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then(a.play_time_ms.cmp(&b.play_time_ms))
                .then(a.name.cmp(&b.name))
        });
        Ok(records.into_iter().skip(start).take(max_items).collect())
    }
}
