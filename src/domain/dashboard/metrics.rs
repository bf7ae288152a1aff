//! System metrics pushed by the backend on `system_metrics`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::foundation::Timestamp;

/// Host-level metrics sample.
///
/// Every section is optional; unknown fields are preserved in `extra` so the
/// rendering layer can show metrics this crate does not model yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub cpu: Option<CpuMetrics>,
    pub memory: Option<MemoryMetrics>,
    pub disk: Option<DiskMetrics>,
    pub network: Option<NetworkMetrics>,
    /// Producer-side sample time, as sent.
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuMetrics {
    pub percent: Option<f64>,
    pub count: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetrics {
    pub percent: Option<f64>,
    pub used: Option<u64>,
    pub total: Option<u64>,
    pub available: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskMetrics {
    pub percent: Option<f64>,
    pub used: Option<u64>,
    pub total: Option<u64>,
    pub free: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetrics {
    pub bytes_sent: Option<u64>,
    pub bytes_recv: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SystemMetrics {
    pub fn cpu_percent(&self) -> Option<f64> {
        self.cpu.as_ref().and_then(|c| c.percent)
    }

    pub fn memory_percent(&self) -> Option<f64> {
        self.memory.as_ref().and_then(|m| m.percent)
    }

    pub fn disk_percent(&self) -> Option<f64> {
        self.disk.as_ref().and_then(|d| d.percent)
    }
}

/// Latest metrics sample together with the local time it arrived.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub metrics: SystemMetrics,
    pub received_at: Timestamp,
}

impl MetricsSnapshot {
    pub fn new(metrics: SystemMetrics, received_at: Timestamp) -> Self {
        Self {
            metrics,
            received_at,
        }
    }
}
