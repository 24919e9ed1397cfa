//! Timed multi-client workload driver.
//!
//! Spawns a fixed number of client threads against one transport. Each
//! thread picks a random target set once, then submits back-to-back
//! requests until the stop flag trips. Threads start with a random
//! ramp-up delay between them, and the configured runtime counts only
//! from the moment all clients are up, so the measured window covers
//! full load.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use canopy_topology::Topology;
use canopy_types::GroupId;
use canopy_wire::{ClientRequest, GroupTransport};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{error, info, warn};

use crate::client::MulticastClient;
use crate::error::Result;
use crate::stats::Sample;

// ============================================================================
// WorkloadConfig
// ============================================================================

/// Tuning for one workload run.
#[derive(Debug, Clone)]
pub struct WorkloadConfig {
    /// Concurrent client threads.
    pub clients: usize,

    /// Full-load run duration, measured after all clients have started.
    pub runtime: Duration,

    /// Targets drawn (uniformly, without replacement) for each client.
    pub targets_per_request: usize,

    /// Opaque request payload.
    pub payload: Bytes,

    /// Upper bound of the random delay between client starts.
    pub ramp_up_max: Duration,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            clients: 8,
            runtime: Duration::from_secs(120),
            targets_per_request: 2,
            payload: Bytes::from_static(b"req"),
            ramp_up_max: Duration::from_millis(600),
        }
    }
}

// ============================================================================
// WorkloadReport
// ============================================================================

/// Everything a finished run produced.
#[derive(Debug)]
pub struct WorkloadReport {
    /// Latency samples per client, in client-start order.
    pub per_client: Vec<Vec<Sample>>,

    /// The configured full-load runtime.
    pub runtime: Duration,
}

impl WorkloadReport {
    /// Total completed requests across all clients.
    pub fn total_requests(&self) -> usize {
        self.per_client.iter().map(Vec::len).sum()
    }

    /// Completed requests per second of full-load runtime.
    pub fn throughput(&self) -> f64 {
        let seconds = self.runtime.as_secs_f64();
        if seconds == 0.0 {
            return 0.0;
        }
        self.total_requests() as f64 / seconds
    }
}

// ============================================================================
// Driver
// ============================================================================

struct ClientWorker<T> {
    client: MulticastClient<T>,
    client_id: usize,
    targets: Vec<GroupId>,
    payload: Bytes,
    stop: Arc<AtomicBool>,
    epoch: Instant,
}

impl<T: GroupTransport> ClientWorker<T> {
    fn run(self) -> Vec<Sample> {
        info!(client = self.client_id, targets = ?self.targets, "client started");

        let entry = match self.client.entry_group(&self.targets) {
            Ok(entry) => entry,
            Err(err) => {
                error!(client = self.client_id, error = %err, "no entry group for targets");
                return Vec::new();
            }
        };

        let mut samples = Vec::new();
        while !self.stop.load(Ordering::Relaxed) {
            let request = ClientRequest::new(self.targets.clone(), self.payload.clone());

            let before = self.epoch.elapsed();
            match self.client.submit_request_to(entry, &request) {
                Ok(response) => {
                    let after = self.epoch.elapsed();
                    if response.outcome.is_error() {
                        warn!(
                            request = %request.id,
                            outcome = %response.outcome,
                            "request settled with an error outcome"
                        );
                    }
                    samples.push(Sample {
                        id: request.id,
                        before_micros: before.as_micros() as u64,
                        after_micros: after.as_micros() as u64,
                    });
                }
                Err(err) => {
                    error!(
                        client = self.client_id,
                        request = %request.id,
                        error = %err,
                        "request failed"
                    );
                }
            }
        }

        info!(client = self.client_id, requests = samples.len(), "client finished");
        samples
    }
}

/// Runs the workload to completion and collects every client's samples.
pub fn run_workload<T>(
    client: &MulticastClient<T>,
    config: &WorkloadConfig,
) -> Result<WorkloadReport>
where
    T: GroupTransport + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let epoch = Instant::now();
    let mut rng = rand::thread_rng();
    let ramp_up_millis = config.ramp_up_max.as_millis() as u64;

    let mut workers = Vec::with_capacity(config.clients);
    for client_id in 0..config.clients {
        let worker = ClientWorker {
            client: client.clone(),
            client_id,
            targets: select_targets(&mut rng, client.topology(), config.targets_per_request),
            payload: config.payload.clone(),
            stop: Arc::clone(&stop),
            epoch,
        };
        workers.push(thread::spawn(move || worker.run()));

        if ramp_up_millis > 0 {
            thread::sleep(Duration::from_millis(rng.gen_range(0..ramp_up_millis)));
        }
    }

    thread::sleep(config.runtime);
    stop.store(true, Ordering::Relaxed);

    let mut per_client = Vec::with_capacity(workers.len());
    for worker in workers {
        match worker.join() {
            Ok(samples) => per_client.push(samples),
            Err(_) => {
                error!("client thread panicked");
                per_client.push(Vec::new());
            }
        }
    }

    Ok(WorkloadReport {
        per_client,
        runtime: config.runtime,
    })
}

/// Draws a client's fixed target set: shuffle the groups, keep the first
/// `count`.
fn select_targets(rng: &mut impl Rng, topology: &Topology, count: usize) -> Vec<GroupId> {
    let mut groups: Vec<GroupId> = topology.groups().collect();
    groups.shuffle(rng);
    groups.truncate(count.clamp(1, groups.len()));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    use canopy_wire::{Outcome, Reply, Response, TransportError, encode_reply};

    fn tree() -> Arc<Topology> {
        let topology = Topology::build([
            (GroupId::new(0), vec![GroupId::new(1), GroupId::new(2)]),
            (GroupId::new(1), vec![GroupId::new(3)]),
        ])
        .unwrap();
        Arc::new(topology)
    }

    /// Settles every submission instantly.
    struct InstantTransport;

    impl GroupTransport for InstantTransport {
        fn invoke_ordered(
            &self,
            group: GroupId,
            _command: &[u8],
        ) -> std::result::Result<Vec<u8>, TransportError> {
            encode_reply(&Reply::Single(Response::new(Outcome::Handled))).map_err(|err| {
                TransportError::Engine {
                    group,
                    detail: err.to_string(),
                }
            })
        }
    }

    #[test]
    fn the_driver_collects_samples_from_every_client() {
        let client = MulticastClient::new(tree(), Arc::new(InstantTransport));
        let config = WorkloadConfig {
            clients: 2,
            runtime: Duration::from_millis(50),
            ramp_up_max: Duration::from_millis(1),
            ..WorkloadConfig::default()
        };

        let report = run_workload(&client, &config).unwrap();

        assert_eq!(report.per_client.len(), 2);
        assert!(report.total_requests() > 0);
        assert!(report.throughput() > 0.0);

        for samples in &report.per_client {
            for sample in samples {
                assert!(sample.after_micros >= sample.before_micros);
            }
        }
    }

    #[test]
    fn target_selection_respects_the_requested_count() {
        let mut rng = rand::thread_rng();
        let topology = tree();

        for _ in 0..16 {
            let targets = select_targets(&mut rng, &topology, 2);
            assert_eq!(targets.len(), 2);
            assert_ne!(targets[0], targets[1]);
        }

        // Oversized requests clamp to the whole tree.
        let all = select_targets(&mut rng, &topology, 99);
        assert_eq!(all.len(), 4);
    }
}
