//! Scripted ports for exercising the scanner without a network.

use crate::scanner::error::{ScanError, ScanResult};
use crate::scanner::ports::{DeviceDiscovery, NetworkScanner, StatsSource};
use crate::scanner::types::{DiscoveryResult, RootDevice, RouterEndpoint, RouterStats, ScanSnapshot};
use crate::upnp::{UpnpError, UpnpResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

enum Candidate {
    Found(String),
    Failed(String, String),
}

/// Discovery port that answers from a fixed candidate list.
#[derive(Default)]
pub struct FakeDiscovery {
    candidates: Mutex<Vec<Candidate>>,
    failure: Mutex<Option<String>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discovery whose search always fails
    pub fn failing(reason: &str) -> Self {
        let discovery = Self::new();
        discovery.fail_with(reason);
        discovery
    }

    pub fn found(self, location: &str) -> Self {
        self.candidates
            .lock()
            .push(Candidate::Found(location.to_string()));
        self
    }

    /// A candidate that answered the search but could not be resolved
    pub fn unresolvable(self, location: &str, reason: &str) -> Self {
        self.candidates
            .lock()
            .push(Candidate::Failed(location.to_string(), reason.to_string()));
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fail_with(&self, reason: &str) {
        *self.failure.lock() = Some(reason.to_string());
    }

    /// Clear any failure and answer with `locations` from now on
    pub fn answer_with(&self, locations: &[&str]) {
        *self.failure.lock() = None;
        *self.candidates.lock() = locations
            .iter()
            .map(|l| Candidate::Found(l.to_string()))
            .collect();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceDiscovery for FakeDiscovery {
    async fn discover_devices(&self, _device_type: &str) -> UpnpResult<Vec<DiscoveryResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(reason) = self.failure.lock().clone() {
            return Err(UpnpError::Transport(reason));
        }

        let candidates = self.candidates.lock();
        let mut results = Vec::with_capacity(candidates.len());
        for candidate in candidates.iter() {
            match candidate {
                Candidate::Found(location) => {
                    let endpoint: RouterEndpoint = location.parse()?;
                    let root = RootDevice {
                        location: endpoint.url().clone(),
                        url_base: None,
                        device_type: Some(crate::scanner::GATEWAY_DEVICE_TYPE.to_string()),
                        friendly_name: None,
                    };
                    results.push(DiscoveryResult::Found { endpoint, root });
                }
                Candidate::Failed(location, reason) => results.push(DiscoveryResult::Failed {
                    location: location.clone(),
                    error: UpnpError::Transport(reason.clone()),
                }),
            }
        }

        Ok(results)
    }
}

#[derive(Clone)]
enum Reply {
    Stats(RouterStats),
    Error(String),
    Delayed(Duration),
}

/// Stats port with a scripted reply per endpoint. Unknown endpoints fail.
#[derive(Default)]
pub struct FakeStats {
    replies: Mutex<HashMap<String, Reply>>,
    latency: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(
        self,
        router: &str,
        packets_sent: u32,
        packets_received: u32,
        bytes_sent: u64,
        bytes_received: u64,
    ) -> Self {
        self.set_stats(RouterStats {
            router: router.to_string(),
            packets_sent,
            packets_received,
            bytes_sent,
            bytes_received,
        });
        self
    }

    pub fn failing(self, router: &str, reason: &str) -> Self {
        self.replies
            .lock()
            .insert(router.to_string(), Reply::Error(reason.to_string()));
        self
    }

    /// A router that never answers within `delay`
    pub fn delayed(self, router: &str, delay: Duration) -> Self {
        self.replies
            .lock()
            .insert(router.to_string(), Reply::Delayed(delay));
        self
    }

    /// Delay every reply, successful or not, by `latency`
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn set_stats(&self, stats: RouterStats) {
        self.replies
            .lock()
            .insert(stats.router.clone(), Reply::Stats(stats));
    }

    pub fn remove(&self, router: &str) {
        self.replies.lock().remove(router);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatsSource for FakeStats {
    async fn query_stats(&self, endpoint: &RouterEndpoint) -> UpnpResult<RouterStats> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let reply = self.replies.lock().get(endpoint.as_str()).cloned();
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match reply {
            Some(Reply::Stats(stats)) => Ok(stats),
            Some(Reply::Error(reason)) => Err(UpnpError::Transport(reason)),
            Some(Reply::Delayed(delay)) => {
                tokio::time::sleep(delay).await;
                Err(UpnpError::Transport(format!("{endpoint} answered too late")))
            }
            None => Err(UpnpError::Transport(format!("{endpoint} is unreachable"))),
        }
    }
}

/// Scanner stand-in for collector tests
pub struct FakeScanner {
    result: Result<ScanSnapshot, String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeScanner {
    pub fn returning(snapshot: ScanSnapshot) -> Self {
        Self {
            result: Ok(snapshot),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            result: Err(reason.to_string()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// A scanner whose scan never finishes within `delay`
    pub fn hanging(delay: Duration) -> Self {
        Self {
            result: Ok(ScanSnapshot::default()),
            delay: Some(delay),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NetworkScanner for FakeScanner {
    async fn report_network_stats(&self) -> ScanResult<ScanSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.result.clone().map_err(ScanError::Unavailable)
    }

    fn routers(&self) -> Vec<String> {
        match &self.result {
            Ok(snapshot) => snapshot.routers().into_iter().map(String::from).collect(),
            Err(_) => Vec::new(),
        }
    }
}
