//! Process memory sampling and human-readable byte formatting.

use crate::clock::round_to;

/// Reports how much memory the current process is using, in bytes.
pub trait MemoryProbe: Send + Sync {
    fn current(&self) -> u64;

    /// Highest usage the platform knows about, if it tracks one.
    fn peak(&self) -> Option<u64> {
        None
    }
}

/// Resident set size of this process, read through `sysinfo`.
#[cfg(feature = "sysinfo")]
pub struct SysinfoProbe {
    pid: Option<sysinfo::Pid>,
    system: std::sync::Mutex<sysinfo::System>,
}

#[cfg(feature = "sysinfo")]
impl SysinfoProbe {
    pub fn new() -> Self {
        Self {
            pid: sysinfo::get_current_pid().ok(),
            system: std::sync::Mutex::new(sysinfo::System::new()),
        }
    }
}

#[cfg(feature = "sysinfo")]
impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "sysinfo")]
impl MemoryProbe for SysinfoProbe {
    fn current(&self) -> u64 {
        use sysinfo::{ProcessRefreshKind, ProcessesToUpdate};

        let Some(pid) = self.pid else { return 0 };
        let mut system = self.system.lock().unwrap_or_else(|e| e.into_inner());
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            false,
            ProcessRefreshKind::nothing().with_memory(),
        );
        system.process(pid).map(|p| p.memory()).unwrap_or(0)
    }
}

/// Always reports the same number. Used when no platform probe is compiled
/// in, and handy for deterministic tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedProbe(pub u64);

impl MemoryProbe for FixedProbe {
    fn current(&self) -> u64 {
        self.0
    }
}

/// The probe used when the caller does not supply one.
pub fn default_probe() -> Box<dyn MemoryProbe> {
    #[cfg(feature = "sysinfo")]
    {
        Box::new(SysinfoProbe::new())
    }

    #[cfg(not(feature = "sysinfo"))]
    {
        Box::new(FixedProbe(0))
    }
}

/// `512 B`, `1.5 KB`, `12.34 MB`.
pub fn format_memory(bytes: i64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1_048_576 {
        format!("{} KB", round_to(bytes as f64 / 1024.0, 2))
    } else {
        format!("{} MB", round_to(bytes as f64 / 1_048_576.0, 2))
    }
}
