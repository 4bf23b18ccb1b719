//! Host metrics collection
//!
//! [`SysinfoSource`] reads CPU, memory, disk and process counters through
//! `sysinfo` and counts open sockets from the kernel's socket tables. The
//! work is blocking (CPU usage needs two refreshes some time apart), so it
//! runs on the blocking thread pool.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

use async_trait::async_trait;
use chrono::Utc;
use sysinfo::{Disks, ProcessesToUpdate, System};
use tracing::{instrument, trace};

use crate::{
    MetricsSnapshot, ProcessInfo,
    error::{MonitorError, MonitorResult},
};

/// Processes at or below this CPU share are left out of a snapshot.
pub const PROCESS_CPU_INCLUSION_THRESHOLD: f32 = 5.0;

/// Maximum number of processes carried in a snapshot.
pub const TOP_PROCESS_LIMIT: usize = 5;

/// Anything that can produce a snapshot of the current host state
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn sample(&self) -> MonitorResult<MetricsSnapshot>;
}

/// Metrics source backed by the local operating system
#[derive(Debug, Clone)]
pub struct SysinfoSource {
    system: Arc<Mutex<System>>,
    disk_path: PathBuf,
}

impl SysinfoSource {
    pub fn new(disk_path: impl Into<PathBuf>) -> Self {
        Self {
            system: Arc::new(Mutex::new(System::new_all())),
            disk_path: disk_path.into(),
        }
    }
}

#[async_trait]
impl MetricsSource for SysinfoSource {
    #[instrument(skip(self), fields(disk = %self.disk_path.display()))]
    async fn sample(&self) -> MonitorResult<MetricsSnapshot> {
        let system = Arc::clone(&self.system);
        let disk_path = self.disk_path.clone();

        tokio::task::spawn_blocking(move || {
            let mut guard = lock_system(&system)?;
            collect(&mut guard, &disk_path)
        })
        .await
        .map_err(|e| MonitorError::SamplingFailed(format!("sampling task failed: {e}")))?
    }
}

/// Never waits: a sample that outlived its timeout may still hold the handle.
fn lock_system(system: &Mutex<System>) -> MonitorResult<MutexGuard<'_, System>> {
    system.try_lock().map_err(|e| match e {
        TryLockError::WouldBlock => {
            MonitorError::SamplingFailed("previous sample still running".into())
        }
        TryLockError::Poisoned(_) => MonitorError::SamplingFailed("system handle poisoned".into()),
    })
}

fn collect(system: &mut System, disk_path: &Path) -> MonitorResult<MetricsSnapshot> {
    system.refresh_cpu_usage();
    system.refresh_processes(ProcessesToUpdate::All, true);
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    system.refresh_cpu_usage();
    system.refresh_memory();
    system.refresh_processes(ProcessesToUpdate::All, true);

    let total_memory = system.total_memory();
    if total_memory == 0 {
        return Err(MonitorError::SamplingFailed(
            "total memory reported as zero".into(),
        ));
    }

    let processes = system
        .processes()
        .iter()
        .map(|(pid, process)| ProcessInfo {
            pid: pid.as_u32(),
            name: process.name().to_string_lossy().into_owned(),
            cpu_percent: process.cpu_usage(),
            memory_percent: percent(process.memory(), total_memory),
        })
        .collect();

    let snapshot = MetricsSnapshot {
        timestamp: Utc::now(),
        cpu_percent: system.global_cpu_usage(),
        memory_percent: percent(system.used_memory(), total_memory),
        disk_percent: disk_usage(disk_path)?,
        connection_count: count_connections()?,
        top_processes: select_top_processes(processes),
    };

    trace!(
        "sampled cpu {:.1}%, memory {:.1}%, disk {:.1}%, {} connections",
        snapshot.cpu_percent,
        snapshot.memory_percent,
        snapshot.disk_percent,
        snapshot.connection_count
    );

    Ok(snapshot)
}

fn percent(part: u64, total: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64 * 100.0) as f32
}

/// Keep processes above the inclusion threshold, busiest first, at most five.
pub fn select_top_processes(mut processes: Vec<ProcessInfo>) -> Vec<ProcessInfo> {
    processes.retain(|process| process.cpu_percent > PROCESS_CPU_INCLUSION_THRESHOLD);
    processes.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent));
    processes.truncate(TOP_PROCESS_LIMIT);
    processes
}

fn disk_usage(path: &Path) -> MonitorResult<f32> {
    let disks = Disks::new_with_refreshed_list();
    let mounts = disks
        .list()
        .iter()
        .map(|disk| (disk.mount_point(), disk.total_space(), disk.available_space()));

    let Some((_, total, available)) = covering_mount(mounts, path) else {
        return Err(MonitorError::SamplingFailed(format!(
            "no mounted filesystem covers {}",
            path.display()
        )));
    };

    Ok(percent(total.saturating_sub(available), total))
}

/// Pick the mount with the longest mount point that is a prefix of `path`.
fn covering_mount<'a, I>(mounts: I, path: &Path) -> Option<(&'a Path, u64, u64)>
where
    I: IntoIterator<Item = (&'a Path, u64, u64)>,
{
    mounts
        .into_iter()
        .filter(|(mount_point, _, _)| path.starts_with(mount_point))
        .max_by_key(|(mount_point, _, _)| mount_point.components().count())
}

#[cfg(target_os = "linux")]
const SOCKET_TABLES: [&str; 4] = [
    "/proc/net/tcp",
    "/proc/net/tcp6",
    "/proc/net/udp",
    "/proc/net/udp6",
];

#[cfg(target_os = "linux")]
fn count_connections() -> MonitorResult<usize> {
    let mut total = 0;
    for table in SOCKET_TABLES {
        match std::fs::read_to_string(table) {
            Ok(content) => total += count_socket_entries(&content),
            // tcp6/udp6 are missing when IPv6 is disabled
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(MonitorError::SamplingFailed(format!(
                    "failed to read {table}: {e}"
                )));
            }
        }
    }
    Ok(total)
}

#[cfg(not(target_os = "linux"))]
fn count_connections() -> MonitorResult<usize> {
    Ok(0)
}

/// Number of socket rows in a `/proc/net/*` table, header excluded.
fn count_socket_entries(table: &str) -> usize {
    table
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .count()
}
