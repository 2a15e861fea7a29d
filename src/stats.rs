//! Process metrics for /stats.

use std::time::Duration;

use sysinfo::{Disks, Networks, System};

use crate::limits::{human_duration, human_size};

/// Render the status report. CPU usage needs two samples, so this waits the
/// minimum sampling interval between refreshes.
pub async fn render(uptime: Duration) -> String {
    let mut sys = System::new();
    sys.refresh_cpu_usage();
    tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
    sys.refresh_cpu_usage();
    sys.refresh_memory();

    let cpu = sys.global_cpu_usage();
    let memory = if sys.total_memory() > 0 {
        sys.used_memory() as f64 / sys.total_memory() as f64 * 100.0
    } else {
        0.0
    };

    let disks = Disks::new_with_refreshed_list();
    let mut disk_total = 0u64;
    let mut disk_free = 0u64;
    for disk in disks.list() {
        disk_total += disk.total_space();
        disk_free += disk.available_space();
    }
    let disk_used = disk_total.saturating_sub(disk_free);

    let networks = Networks::new_with_refreshed_list();
    let mut sent = 0u64;
    let mut received = 0u64;
    for (_name, data) in &networks {
        sent += data.total_transmitted();
        received += data.total_received();
    }

    format!(
        "Bot status\n\n\
         Uptime: {}\n\
         Disk: {} total, {} used, {} free\n\
         Memory: {:.1}%\n\
         CPU: {:.1}%\n\
         Network: up {} / down {}",
        human_duration(uptime.as_secs()),
        human_size(disk_total),
        human_size(disk_used),
        human_size(disk_free),
        memory,
        cpu,
        human_size(sent),
        human_size(received),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_render_contains_all_sections() {
        let report = render(Duration::from_secs(3661)).await;
        assert!(report.contains("Uptime: 1h 1m 1s"));
        assert!(report.contains("Disk:"));
        assert!(report.contains("Memory:"));
        assert!(report.contains("CPU:"));
        assert!(report.contains("Network:"));
    }
}
