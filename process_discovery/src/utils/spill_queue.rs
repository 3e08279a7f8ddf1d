use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Lines, Seek, SeekFrom, Write},
};

use serde::{de::DeserializeOwned, Serialize};

///
/// Errors when spilling items to (or replaying them from) backing storage
///
#[derive(Debug)]
pub enum SpillQueueError {
    /// IO error on the temporary backing file
    IOError(std::io::Error),
    /// Item could not be (de)serialized
    SerdeError(serde_json::Error),
}

impl std::fmt::Display for SpillQueueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpillQueueError::IOError(e) => write!(f, "Spill storage IO error: {e}"),
            SpillQueueError::SerdeError(e) => write!(f, "Spill storage serialization error: {e}"),
        }
    }
}

impl std::error::Error for SpillQueueError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SpillQueueError::IOError(e) => Some(e),
            SpillQueueError::SerdeError(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for SpillQueueError {
    fn from(e: std::io::Error) -> Self {
        Self::IOError(e)
    }
}

impl From<serde_json::Error> for SpillQueueError {
    fn from(e: serde_json::Error) -> Self {
        Self::SerdeError(e)
    }
}

///
/// Append-only queue with bounded memory usage
///
/// The first `capacity` items are kept in memory. Every further item is written as one
/// JSON line to an anonymous temporary file. Draining the queue yields all items in
/// insertion order: first the in-memory ones, then the spilled ones read back sequentially.
///
/// Meant for a single producer followed by a single consumer; not for sharing across threads.
///
#[derive(Debug)]
pub struct SpillQueue<T> {
    capacity: usize,
    memory: Vec<T>,
    spill: Option<BufWriter<File>>,
    spilled: usize,
}

impl<T: Serialize + DeserializeOwned> SpillQueue<T> {
    /// Create a new queue holding at most `capacity` items in memory
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            memory: Vec::new(),
            spill: None,
            spilled: 0,
        }
    }

    /// Append an item
    pub fn push(&mut self, item: T) -> Result<(), SpillQueueError> {
        if self.memory.len() < self.capacity {
            self.memory.push(item);
            return Ok(());
        }
        if self.spill.is_none() {
            self.spill = Some(BufWriter::new(tempfile::tempfile()?));
        }
        if let Some(writer) = self.spill.as_mut() {
            serde_json::to_writer(&mut *writer, &item)?;
            writer.write_all(b"\n")?;
            self.spilled += 1;
        }
        Ok(())
    }

    /// Total number of items (in memory and spilled)
    pub fn len(&self) -> usize {
        self.memory.len() + self.spilled
    }

    /// Whether no item was pushed yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of items written to backing storage
    pub fn spilled(&self) -> usize {
        self.spilled
    }

    /// Consume the queue, iterating over all items in insertion order
    pub fn drain(self) -> Result<SpillQueueIter<T>, SpillQueueError> {
        let spilled = match self.spill {
            Some(writer) => {
                let mut file = writer.into_inner().map_err(|e| e.into_error())?;
                file.seek(SeekFrom::Start(0))?;
                Some(BufReader::new(file).lines())
            }
            None => None,
        };
        Ok(SpillQueueIter {
            memory: self.memory.into_iter(),
            spilled,
        })
    }
}

/// Iterator returned by [`SpillQueue::drain`]
#[derive(Debug)]
pub struct SpillQueueIter<T> {
    memory: std::vec::IntoIter<T>,
    spilled: Option<Lines<BufReader<File>>>,
}

impl<T: DeserializeOwned> Iterator for SpillQueueIter<T> {
    type Item = Result<T, SpillQueueError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(item) = self.memory.next() {
            return Some(Ok(item));
        }
        let line = self.spilled.as_mut()?.next()?;
        Some(
            line.map_err(SpillQueueError::from)
                .and_then(|l| serde_json::from_str(&l).map_err(SpillQueueError::from)),
        )
    }
}
