//! Thread, process and machine facts.

use chrono::DateTime;
use sysinfo::{ProcessesToUpdate, System};

use faultline_core::{CaptureConfig, CategorizedRecord, catch_panic};

use crate::error::CaptureError;

/// Category holding thread facts.
pub const THREAD_CATEGORY: &str = "Thread";
/// Category holding process facts.
pub const PROCESS_CATEGORY: &str = "Process";
/// Category holding machine facts.
pub const COMPUTER_CATEGORY: &str = "Computer";

/// Copies runtime identity facts into a record.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentCollector {
    app_version: Option<String>,
}

impl EnvironmentCollector {
    /// Create a collector from capture configuration.
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            app_version: config.app_version.clone(),
        }
    }

    /// Write the `Thread`, `Process` and `Computer` categories.
    ///
    /// A category that cannot be read is reported and left partial.
    pub fn collect(&self, record: &mut CategorizedRecord, on_error: &mut dyn FnMut(CaptureError)) {
        append_thread(record);
        match catch_panic(|| self.append_process(record)) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => on_error(e),
            Err(message) => on_error(CaptureError::panicked("process facts", message)),
        }
        if let Err(message) = catch_panic(|| append_computer(record)) {
            on_error(CaptureError::panicked("computer facts", message));
        }
    }

    fn append_process(&self, record: &mut CategorizedRecord) -> Result<(), CaptureError> {
        if let Some(version) = &self.app_version {
            record.set(PROCESS_CATEGORY, "AppVersion", version.as_str());
        }
        if let Ok(dir) = std::env::current_dir() {
            record.set(PROCESS_CATEGORY, "CurrentDirectory", dir.display().to_string());
        }
        if let Ok(exe) = std::env::current_exe() {
            record.set(PROCESS_CATEGORY, "Executable", exe.display().to_string());
        }

        let pid = sysinfo::get_current_pid().map_err(|e| CaptureError::Environment(e.to_string()))?;
        record.set(PROCESS_CATEGORY, "ProcessId", pid.as_u32());

        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        let process = system
            .process(pid)
            .ok_or_else(|| CaptureError::Environment(format!("process {} not found", pid)))?;

        record.set(PROCESS_CATEGORY, "ProcessName", process.name().to_string_lossy().into_owned());
        record.set(PROCESS_CATEGORY, "WorkingSet", process.memory());
        record.set(PROCESS_CATEGORY, "VirtualMemory", process.virtual_memory());
        if let Some(start) = DateTime::from_timestamp(process.start_time() as i64, 0) {
            record.set(PROCESS_CATEGORY, "StartTime", start);
        }
        if let Some(tasks) = process.tasks() {
            record.set(PROCESS_CATEGORY, "ThreadCount", tasks.len());
        }
        Ok(())
    }
}

fn append_thread(record: &mut CategorizedRecord) {
    let thread = std::thread::current();
    record.set(THREAD_CATEGORY, "ThreadId", format!("{:?}", thread.id()));
    record.set(THREAD_CATEGORY, "ThreadName", thread.name());
}

fn append_computer(record: &mut CategorizedRecord) {
    record.set(COMPUTER_CATEGORY, "MachineName", System::host_name());
    record.set(COMPUTER_CATEGORY, "OsName", System::name());
    record.set(COMPUTER_CATEGORY, "OsVersion", System::long_os_version());
    record.set(COMPUTER_CATEGORY, "KernelVersion", System::kernel_version());
    record.set(COMPUTER_CATEGORY, "Architecture", std::env::consts::ARCH);
    if let Ok(cpus) = std::thread::available_parallelism() {
        record.set(COMPUTER_CATEGORY, "ProcessorCount", cpus.get());
    }
}
