//! Following a background command until it settles.
//!
//! The only state kept between queries is the last observed `Command`.
//! Watching is unbounded unless the caller sets a deadline; the loop is
//! otherwise stopped only by terminating the process.

use std::time::{Duration, Instant};
use tracing::debug;

use crate::api::ApiClient;
use crate::dispatch::JobHandle;
use crate::error::{Error, Result};
use crate::models::Command;
use crate::transport::Transport;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Deadline {
    #[default]
    Unbounded,
    After(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Keep querying until a terminal status instead of querying once.
    pub wait: bool,
    pub interval: Duration,
    pub deadline: Deadline,
}

impl Default for PollOptions {
    fn default() -> Self {
        PollOptions {
            wait: false,
            interval: DEFAULT_INTERVAL,
            deadline: Deadline::Unbounded,
        }
    }
}

/// Receives every observation, terminal or not.
pub trait PollObserver {
    fn observe(&mut self, job: &Command);

    fn waiting(&mut self, _interval: Duration) {}
}

/// Query `handle` per `opts`, sleeping with `std::thread::sleep`.
pub fn poll<T: Transport, O: PollObserver>(
    api: &ApiClient<T>,
    handle: &JobHandle,
    opts: PollOptions,
    observer: &mut O,
) -> Result<Command> {
    poll_with_sleep(api, handle, opts, observer, std::thread::sleep)
}

/// A terminal `failed`/`cancelled` status is returned, not raised. Only a
/// failing status query (or an elapsed deadline) is an error.
pub fn poll_with_sleep<T, O, S>(
    api: &ApiClient<T>,
    handle: &JobHandle,
    opts: PollOptions,
    observer: &mut O,
    mut sleep: S,
) -> Result<Command>
where
    T: Transport,
    O: PollObserver,
    S: FnMut(Duration),
{
    let started = Instant::now();
    let mut queries = 0u32;
    loop {
        let job = api.get_command(handle.as_str())?;
        queries += 1;
        debug!(job = %handle, status = %job.status, progress = ?job.progress, queries, "observed job");
        observer.observe(&job);

        if job.status.is_terminal() || !opts.wait {
            return Ok(job);
        }
        if let Deadline::After(limit) = opts.deadline {
            let elapsed = started.elapsed();
            if elapsed >= limit {
                return Err(Error::Deadline {
                    job_id: handle.to_string(),
                    elapsed,
                });
            }
        }

        observer.waiting(opts.interval);
        sleep(opts.interval);
    }
}
