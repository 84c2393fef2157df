//! The streaming executor: one producer thread per active query, a bounded hand-off
//! queue, and an idempotent cancel.
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use ffdb_core::errors::FfdbError;
use ffdb_core::record::CssRecord;
use ffdb_core::Result;

use super::exec;
use super::plan::ExecPlan;
use crate::FFDatabase;

/// A running streaming query. Drop closes it.
#[derive(Debug)]
pub struct QueryHandle {
    rx: Option<Receiver<CssRecord>>,
    error: Arc<Mutex<Option<FfdbError>>>,
    cancel: Arc<AtomicBool>,
    producer: Option<JoinHandle<()>>,
}

/// Start the producer. The caller has already parsed and planned, so an invalid query
/// never reaches this point.
pub(super) fn spawn(db: &FFDatabase, plan: ExecPlan) -> Result<QueryHandle> {
    let (tx, rx): (Sender<CssRecord>, Receiver<CssRecord>) = bounded(db.max_mem_records());
    let error = Arc::new(Mutex::new(None));
    let cancel = Arc::new(AtomicBool::new(false));

    // The producer only needs the file layout, not the full database handle; a private
    // clone of the layout state keeps the thread free of the caller's lifetime.
    let worker_db = db.clone_layout();
    let worker_error = error.clone();
    let worker_cancel = cancel.clone();
    let producer = std::thread::Builder::new()
        .name("ffdb-query".to_string())
        .spawn(move || {
            let result = exec::run(&worker_db, &plan, &mut |rec| {
                if worker_cancel.load(Ordering::Acquire) {
                    return false;
                }
                // A closed receiver means the consumer went away; stop quietly.
                tx.send(rec).is_ok()
            });
            if let Err(e) = result {
                *worker_error.lock().unwrap() = Some(e);
            }
        })
        .map_err(|e| FfdbError::ThreadErr {
            reason: e.to_string(),
        })?;

    Ok(QueryHandle {
        rx: Some(rx),
        error,
        cancel,
        producer: Some(producer),
    })
}

impl QueryHandle {
    /// Dequeue up to `num_to_fetch` records, blocking until they arrive or the producer
    /// finishes. A producer error is reported on the first call after it occurred.
    pub fn results(&mut self, num_to_fetch: usize, out: &mut Vec<CssRecord>) -> Result<usize> {
        if let Some(e) = self.error.lock().unwrap().take() {
            return Err(e);
        }
        let rx = match &self.rx {
            Some(rx) => rx,
            None => return Ok(0),
        };
        let mut fetched = 0;
        while fetched < num_to_fetch {
            match rx.recv() {
                Ok(rec) => {
                    out.push(rec);
                    fetched += 1;
                }
                Err(_) => {
                    // Producer done; surface its error if it left one.
                    if let Some(e) = self.error.lock().unwrap().take() {
                        return Err(e);
                    }
                    break;
                }
            }
        }
        Ok(fetched)
    }

    /// Signal cancel, unblock the producer and join it. Safe to call any number of
    /// times.
    pub fn close(&mut self) -> Result<()> {
        self.cancel.store(true, Ordering::Release);
        // Dropping the receiver fails the producer's next send.
        self.rx = None;
        if let Some(handle) = self.producer.take() {
            handle.join().map_err(|_| FfdbError::JoinErr {
                reason: "query producer panicked".to_string(),
            })?;
        }
        Ok(())
    }
}

impl Drop for QueryHandle {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
