//! Periodic collection of rig telemetry into metric families.
//!
//! Unlike a scrape-driven collector, rig telemetry is refreshed on its
//! own cadence: a background task re-reads the agent files and swaps
//! in a fresh set of families, and scrapes serve whatever snapshot is
//! current.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use minemon_common::{MetricFamily, MetricKind, MetricSample, render_families};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::stats::{self, GpuCard, GpuStats, RigStats, StatPaths, StatsError};

const GPU_LABELS: &[&str] = &["rig", "card", "model", "brand", "vendor"];
const GPU_HASHRATE_LABELS: &[&str] = &[
    "rig",
    "card",
    "model",
    "brand",
    "vendor",
    "coin",
    "miner",
    "miner_version",
];
const CPU_HASHRATE_LABELS: &[&str] = &["rig", "core", "coin", "miner", "miner_version"];
const CPU_TEMP_LABELS: &[&str] = &["rig", "cpu"];
const RATIO_LABELS: &[&str] = &["rig", "type", "coin", "miner", "miner_version"];
const MINER_HASHRATE_LABELS: &[&str] = &["rig", "coin", "miner", "miner_version"];

/// Shared reference to the collector.
pub type SharedRigCollector = Arc<RigCollector>;

/// Holds the current metric snapshot for one rig.
pub struct RigCollector {
    rig: String,
    paths: StatPaths,
    families: RwLock<Vec<MetricFamily>>,
    refresh_count: AtomicU64,
}

impl RigCollector {
    /// Create a collector for the named rig.
    pub fn new(rig: impl Into<String>, paths: StatPaths) -> Self {
        Self {
            rig: rig.into(),
            paths,
            families: RwLock::new(Vec::new()),
            refresh_count: AtomicU64::new(0),
        }
    }

    /// Re-read the telemetry files and swap in fresh families.
    ///
    /// On failure the previous snapshot stays in place, so transient
    /// agent restarts degrade to stale metrics instead of none.
    pub fn refresh(&self) -> Result<(), StatsError> {
        let cards = stats::read_gpu_cards(&self.paths.gpu_detect)?;
        let rig_stats = stats::read_rig_stats(&self.paths.last_stat)?;
        let gpu_stats = stats::read_gpu_stats(&self.paths.gpu_stats)?;

        let families = build_families(&self.rig, &cards, &rig_stats, &gpu_stats);
        *self.families.write() = families;
        self.refresh_count.fetch_add(1, Ordering::Relaxed);
        debug!(rig = %self.rig, "Rig metrics refreshed");
        Ok(())
    }

    /// Number of successful refreshes since startup.
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count.load(Ordering::Relaxed)
    }

    /// Render the current snapshot in the text exposition format.
    pub fn render(&self) -> String {
        render_families(&self.families.read())
    }
}

fn build_families(
    rig: &str,
    cards: &[GpuCard],
    rig_stats: &RigStats,
    gpu_stats: &GpuStats,
) -> Vec<MetricFamily> {
    let mut gpu_fan = MetricFamily::new("hiveos_gpu_fan", "GPU Fan Speed", MetricKind::Gauge, GPU_LABELS);
    let mut gpu_coretemp = MetricFamily::new(
        "hiveos_gpu_core_temp",
        "GPU Core Temp",
        MetricKind::Gauge,
        GPU_LABELS,
    );
    let mut gpu_hash = MetricFamily::new(
        "hiveos_gpu_hashrate",
        "GPU Hashrate",
        MetricKind::Gauge,
        GPU_HASHRATE_LABELS,
    );
    let mut gpu_jtemp = MetricFamily::new(
        "hiveos_gpu_junction_temp",
        "GPU Junction Temperature",
        MetricKind::Gauge,
        GPU_LABELS,
    );
    let mut gpu_load = MetricFamily::new(
        "hiveos_gpu_load",
        "GPU load utilization",
        MetricKind::Gauge,
        GPU_LABELS,
    );
    let mut gpu_memtemp = MetricFamily::new(
        "hiveos_gpu_mem_temp",
        "GPU Memory Temperature",
        MetricKind::Gauge,
        GPU_LABELS,
    );
    let mut gpu_power = MetricFamily::new(
        "hiveos_gpu_power_watts",
        "GPU Power Consumption",
        MetricKind::Gauge,
        GPU_LABELS,
    );
    let mut cpu_hash = MetricFamily::new(
        "hiveos_cpu_hashrate",
        "CPU Hashrate",
        MetricKind::Gauge,
        CPU_HASHRATE_LABELS,
    );
    let mut cpu_temp = MetricFamily::new(
        "hiveos_cpu_temp",
        "CPU Temperature",
        MetricKind::Gauge,
        CPU_TEMP_LABELS,
    );
    let mut ratio = MetricFamily::new(
        "hiveos_miner_ratio",
        "Acceptance ratio",
        MetricKind::Gauge,
        RATIO_LABELS,
    );
    let mut total_hash = MetricFamily::new(
        "hiveos_miner_hashrate",
        "Hashrate",
        MetricKind::Gauge,
        MINER_HASHRATE_LABELS,
    );

    let by_bus: HashMap<u32, &GpuCard> = cards.iter().map(|c| (c.bus_number, c)).collect();

    for miner in &rig_stats.miners {
        if let Some(accepted) = miner.stats.ar.first() {
            ratio.push(
                ratio_labels(rig, "accepted", miner),
                MetricSample::new(*accepted),
            );
        }
        if let Some(rejected) = miner.stats.ar.get(1) {
            ratio.push(
                ratio_labels(rig, "rejected", miner),
                MetricSample::new(*rejected),
            );
        }
        if let Some(invalid) = miner.stats.ar.get(2) {
            ratio.push(
                ratio_labels(rig, "invalid", miner),
                MetricSample::new(*invalid),
            );
        } else {
            debug!(miner = %miner.name, "Miner does not support tracking invalid shares");
        }

        total_hash.push(
            vec![
                rig.to_string(),
                miner.coin.clone(),
                miner.name.clone(),
                miner.stats.ver.clone(),
            ],
            MetricSample::new(miner.total_hashrate),
        );

        if miner.is_gpu_miner() {
            for (index, bus) in miner.stats.bus_numbers.iter().enumerate() {
                let Some(value) = miner.stats.hs.get(index) else {
                    continue;
                };
                match bus.and_then(|b| by_bus.get(&b)).copied() {
                    Some(card) => {
                        gpu_hash.push(
                            gpu_hash_labels(rig, card, miner),
                            MetricSample::new(*value),
                        );
                    }
                    None => {
                        warn!(
                            miner = %miner.name,
                            "Device detected with invalid bus number. Assuming this is a non-GPU device"
                        );
                        let mut labels = vec![
                            rig.to_string(),
                            index.to_string(),
                            "unknown".to_string(),
                            "unknown".to_string(),
                            "unknown".to_string(),
                        ];
                        labels.extend(miner_labels(miner));
                        gpu_hash.push(labels, MetricSample::new(*value));
                    }
                }
            }
        } else if miner.is_cpu_miner() {
            for (core, value) in miner.stats.hs.iter().enumerate() {
                let mut labels = vec![rig.to_string(), core.to_string()];
                labels.extend(miner_labels(miner));
                cpu_hash.push(labels, MetricSample::new(*value));
            }
        }
    }

    for card in cards {
        let labels = gpu_labels(rig, card);
        if let Some(v) = gpu_stats.temp.get(card.index) {
            gpu_coretemp.push(labels.clone(), MetricSample::new(*v));
        }
        if let Some(v) = gpu_stats.power.get(card.index) {
            gpu_power.push(labels.clone(), MetricSample::new(*v));
        }
        if let Some(v) = gpu_stats.fan.get(card.index) {
            gpu_fan.push(labels.clone(), MetricSample::new(*v));
        }
        if let Some(v) = gpu_stats.load.get(card.index) {
            gpu_load.push(labels.clone(), MetricSample::new(*v));
        }

        // Not all cards support tracking memory/junction temps.
        if let Some(v) = gpu_stats.mtemp.as_ref().and_then(|m| m.get(card.index)) {
            if *v >= 1.0 {
                gpu_memtemp.push(labels.clone(), MetricSample::new(*v));
            }
        }
        if let Some(v) = gpu_stats.jtemp.as_ref().and_then(|j| j.get(card.index)) {
            if *v >= 1.0 {
                gpu_jtemp.push(labels.clone(), MetricSample::new(*v));
            }
        }
    }

    for (index, temp) in rig_stats.cputemp.iter().enumerate() {
        cpu_temp.push(
            vec![rig.to_string(), index.to_string()],
            MetricSample::new(*temp),
        );
    }

    vec![
        gpu_fan,
        gpu_coretemp,
        gpu_hash,
        gpu_jtemp,
        gpu_load,
        gpu_memtemp,
        gpu_power,
        cpu_hash,
        cpu_temp,
        ratio,
        total_hash,
    ]
}

fn gpu_labels(rig: &str, card: &GpuCard) -> Vec<String> {
    vec![
        rig.to_string(),
        card.index.to_string(),
        card.model.clone(),
        card.brand.clone(),
        card.vendor.clone(),
    ]
}

fn gpu_hash_labels(rig: &str, card: &GpuCard, miner: &stats::Miner) -> Vec<String> {
    let mut labels = gpu_labels(rig, card);
    labels.extend(miner_labels(miner));
    labels
}

fn ratio_labels(rig: &str, kind: &str, miner: &stats::Miner) -> Vec<String> {
    vec![
        rig.to_string(),
        kind.to_string(),
        miner.coin.clone(),
        miner.name.clone(),
        miner.stats.ver.clone(),
    ]
}

fn miner_labels(miner: &stats::Miner) -> Vec<String> {
    vec![
        miner.coin.clone(),
        miner.name.clone(),
        miner.stats.ver.clone(),
    ]
}
