// Scripted RemoteStore shared by the integration tests
#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dmfs::remote::{AttributeSnapshot, Namespace, RemoteError, RemoteStore};

/// In-memory remote: serves a settable snapshot and records every call.
///
/// Successful renames and deletes are applied to the snapshot.
#[derive(Default)]
pub struct ScriptedRemote {
    snapshot: Mutex<AttributeSnapshot>,
    fetch_delay: Mutex<Duration>,
    fail_fetch: AtomicBool,
    fail_probe: AtomicBool,
    fail_mutations: AtomicBool,
    fetches: AtomicUsize,
    probes: AtomicUsize,
    renames: Mutex<Vec<(String, String)>>,
    deletes: Mutex<Vec<String>>,
}

impl ScriptedRemote {
    pub fn with_namespaces(namespaces: Vec<Namespace>) -> Self {
        let remote = Self::default();
        remote.set_namespaces(namespaces);
        remote
    }

    pub fn set_namespaces(&self, namespaces: Vec<Namespace>) {
        *self.snapshot.lock().unwrap() = AttributeSnapshot::new(namespaces);
    }

    /// Every fetch sleeps this long before answering.
    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock().unwrap() = delay;
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn fail_probes(&self, fail: bool) {
        self.fail_probe.store(fail, Ordering::SeqCst);
    }

    pub fn fail_mutations(&self, fail: bool) {
        self.fail_mutations.store(fail, Ordering::SeqCst);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn renames(&self) -> Vec<(String, String)> {
        self.renames.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    fn mutation_result(&self) -> Result<(), RemoteError> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(RemoteError::Status { status: 500, message: "scripted failure".to_string() });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for ScriptedRemote {
    async fn fetch_attributes(&self) -> Result<AttributeSnapshot, RemoteError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let delay = *self.fetch_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("scripted failure".to_string()));
        }
        Ok(self.snapshot.lock().unwrap().clone())
    }

    async fn rename_namespace(&self, old_id: &str, new_id: &str) -> Result<(), RemoteError> {
        self.renames.lock().unwrap().push((old_id.to_string(), new_id.to_string()));
        self.mutation_result()?;

        for namespace in self.snapshot.lock().unwrap().namespaces.iter_mut() {
            if namespace.name == old_id {
                namespace.name = new_id.to_string();
            }
        }
        Ok(())
    }

    async fn delete_namespace(&self, id: &str) -> Result<(), RemoteError> {
        self.deletes.lock().unwrap().push(id.to_string());
        self.mutation_result()?;

        self.snapshot.lock().unwrap().namespaces.retain(|namespace| namespace.name != id);
        Ok(())
    }

    async fn probe_reachable(&self) -> Result<(), RemoteError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.fail_probe.load(Ordering::SeqCst) {
            return Err(RemoteError::Status { status: 401, message: "unauthorized".to_string() });
        }
        Ok(())
    }
}
