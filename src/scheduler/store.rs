use std::collections::{HashMap, VecDeque};
use std::path::Path;

use uuid::Uuid;

use crate::error::Result;
use crate::scheduler::job::{Job, JobStatus};

/// In-memory job table plus the FIFO dispatch queue and the failed list.
///
/// Owned exclusively by the coordinator event loop; nothing here is
/// shared or locked. Queue membership tracks `Pending` status: every id
/// in the queue refers to a `Pending` record, and a `Pending` record is
/// in the queue, except after `clear_pending`, which deliberately strands
/// records.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: HashMap<Uuid, Job>,
    pending: VecDeque<Uuid>,
    failed: Vec<Uuid>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a fresh `Pending` job for the given command and queue it.
    pub fn add(&mut self, command: String) -> Uuid {
        let job = Job::new(command);
        let id = job.id;
        self.jobs.insert(id, job);
        self.pending.push_back(id);
        id
    }

    /// One job per non-empty line, commands taken verbatim. Returns how
    /// many jobs were added.
    pub fn ingest_file(&mut self, path: &Path) -> Result<usize> {
        let text = std::fs::read_to_string(path)?;

        let mut added = 0;
        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            self.add(line.to_string());
            added += 1;
        }

        tracing::info!(added, pending = self.pending.len(), "Jobs ingested");
        Ok(added)
    }

    /// Pop the next queued id. The caller transitions the record to
    /// `InWork` via [`begin_work`](Self::begin_work) once a worker is
    /// bound to it.
    pub fn take_next(&mut self) -> Option<Uuid> {
        self.pending.pop_front()
    }

    /// Mark a dequeued job as `InWork` and hand back its command.
    pub fn begin_work(&mut self, id: &Uuid) -> Option<String> {
        let job = self.jobs.get_mut(id)?;
        job.status = JobStatus::InWork;
        Some(job.command.clone())
    }

    /// Record the outcome of a dispatched job. Terminal records are left
    /// untouched; failures are appended to the failed list.
    pub fn complete(&mut self, id: &Uuid, success: bool) {
        let Some(job) = self.jobs.get_mut(id) else {
            tracing::warn!(job_id = %id, "Completion for unknown job");
            return;
        };

        if job.status.is_terminal() {
            tracing::warn!(job_id = %id, status = %job.status, "Completion for terminal job ignored");
            return;
        }

        if success {
            job.status = JobStatus::Done;
        } else {
            job.status = JobStatus::Failed;
            self.failed.push(*id);
        }
    }

    /// Drop queue membership without touching the records: the stranded
    /// jobs stay `Pending` but are no longer reachable for dispatch. A
    /// later snapshot restore re-queues them.
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    pub fn get(&self, id: &Uuid) -> Option<&Job> {
        self.jobs.get(id)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn failed_len(&self) -> usize {
        self.failed.len()
    }

    pub fn count_with_status(&self, status: JobStatus) -> usize {
        self.jobs.values().filter(|j| j.status == status).count()
    }

    pub fn has_in_work(&self) -> bool {
        self.jobs.values().any(|j| j.status == JobStatus::InWork)
    }

    /// All records, ordered by id so the snapshot bytes are stable.
    pub fn snapshot_records(&self) -> Vec<Job> {
        let mut records: Vec<Job> = self.jobs.values().cloned().collect();
        records.sort_by_key(|j| j.id);
        records
    }

    /// Re-insert restored `Pending` records and queue them; records in any
    /// other status were terminal at save time and are discarded. Returns
    /// how many jobs were queued.
    pub fn absorb_restored(&mut self, records: Vec<Job>) -> usize {
        let mut added = 0;
        for job in records {
            if job.status != JobStatus::Pending {
                continue;
            }
            let id = job.id;
            self.jobs.insert(id, job);
            self.pending.push_back(id);
            added += 1;
        }
        added
    }
}
