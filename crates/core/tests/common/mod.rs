#![allow(dead_code)]

use async_trait::async_trait;
use settle_core::{DocumentSource, HarnessError};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Document whose serialized length follows a script; the last length repeats.
pub struct ScriptedDocument {
    lengths: Mutex<VecDeque<usize>>,
    last: Mutex<usize>,
    samples: AtomicUsize,
}

impl ScriptedDocument {
    pub fn new(lengths: impl IntoIterator<Item = usize>) -> Self {
        Self {
            lengths: Mutex::new(lengths.into_iter().collect()),
            last: Mutex::new(0),
            samples: AtomicUsize::new(0),
        }
    }

    pub fn constant(length: usize) -> Self {
        Self::new([length])
    }

    pub fn samples(&self) -> usize {
        self.samples.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentSource for ScriptedDocument {
    async fn content(&self) -> Result<String, HarnessError> {
        self.samples.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.lengths.lock().unwrap().pop_front() {
            *last = next;
        }
        Ok("x".repeat(*last))
    }
}

/// Document that grows by one byte on every sample.
pub struct GrowingDocument {
    samples: AtomicUsize,
}

impl GrowingDocument {
    pub fn new() -> Self {
        Self {
            samples: AtomicUsize::new(0),
        }
    }

    pub fn samples(&self) -> usize {
        self.samples.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentSource for GrowingDocument {
    async fn content(&self) -> Result<String, HarnessError> {
        let n = self.samples.fetch_add(1, Ordering::SeqCst) + 1;
        Ok("x".repeat(n))
    }
}
