//! Readers for the telemetry files the HiveOS agent maintains under
//! `/run/hive`.
//!
//! Three files matter: `gpu-detect.json` (the installed cards),
//! `last_stat.json` (the agent's last report, including per-miner
//! statistics in numbered slots) and `gpu-stats.json` (current sensor
//! readings indexed by card).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Default directory for the HiveOS agent's runtime files.
pub const DEFAULT_RUN_DIR: &str = "/run/hive";

const GPU_DETECT_FILE: &str = "gpu-detect.json";
const LAST_STAT_FILE: &str = "last_stat.json";
const GPU_STATS_FILE: &str = "gpu-stats.json";

/// Errors raised while reading rig telemetry files.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed rig statistics in {path}: {reason}")]
    Malformed { path: String, reason: String },
}

/// Locations of the three telemetry files.
#[derive(Debug, Clone)]
pub struct StatPaths {
    pub gpu_detect: PathBuf,
    pub last_stat: PathBuf,
    pub gpu_stats: PathBuf,
}

impl StatPaths {
    /// Standard layout under one runtime directory.
    pub fn new(run_dir: impl AsRef<Path>) -> Self {
        let run_dir = run_dir.as_ref();
        Self {
            gpu_detect: run_dir.join(GPU_DETECT_FILE),
            last_stat: run_dir.join(LAST_STAT_FILE),
            gpu_stats: run_dir.join(GPU_STATS_FILE),
        }
    }
}

impl Default for StatPaths {
    fn default() -> Self {
        Self::new(DEFAULT_RUN_DIR)
    }
}

#[derive(Debug, Deserialize)]
struct GpuDetectEntry {
    name: String,
    brand: String,
    subvendor: String,
    busid: String,
}

/// One installed GPU, identified by PCI bus number.
#[derive(Debug, Clone, PartialEq)]
pub struct GpuCard {
    pub index: usize,
    pub model: String,
    pub brand: String,
    pub vendor: String,
    pub bus_number: u32,
}

/// Per-miner statistics as reported in `last_stat.json`.
///
/// `hs` is indexed like `bus_numbers` for GPU miners and per CPU core
/// for CPU miners. `ar` holds accepted/rejected and, for miners that
/// track them, invalid share counters.
#[derive(Debug, Clone, Deserialize)]
pub struct MinerStats {
    pub ver: String,
    pub ar: Vec<f64>,
    pub hs: Vec<f64>,
    pub bus_numbers: Vec<Option<u32>>,
}

/// One active miner resolved from the numbered slots.
#[derive(Debug, Clone)]
pub struct Miner {
    pub name: String,
    pub coin: String,
    /// Total hashrate in H/s. The agent reports kH/s.
    pub total_hashrate: f64,
    pub stats: MinerStats,
}

impl Miner {
    pub fn is_gpu_miner(&self) -> bool {
        matches!(self.stats.bus_numbers.first(), Some(Some(_)))
    }

    pub fn is_cpu_miner(&self) -> bool {
        matches!(self.stats.bus_numbers.first(), Some(None))
    }
}

/// The rig's last agent report: active miners plus CPU temperatures.
#[derive(Debug, Clone, Default)]
pub struct RigStats {
    pub miners: Vec<Miner>,
    pub cputemp: Vec<f64>,
}

/// Current sensor readings, one entry per card index.
#[derive(Debug, Clone, Deserialize)]
pub struct GpuStats {
    pub temp: Vec<f64>,
    pub power: Vec<f64>,
    pub fan: Vec<f64>,
    pub load: Vec<f64>,
    #[serde(default)]
    pub mtemp: Option<Vec<f64>>,
    #[serde(default)]
    pub jtemp: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct LastStat {
    params: RigParams,
}

#[derive(Debug, Deserialize)]
struct RigParams {
    meta: BTreeMap<String, MinerMeta>,
    #[serde(default)]
    cputemp: Option<Vec<f64>>,
    #[serde(flatten)]
    slots: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct MinerMeta {
    coin: String,
}

const KHS_TO_HS: f64 = 1000.0;

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StatsError> {
    let raw = std::fs::read_to_string(path).map_err(|source| StatsError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| StatsError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Read the installed cards, in detection order.
pub fn read_gpu_cards(path: &Path) -> Result<Vec<GpuCard>, StatsError> {
    debug!(path = %path.display(), "Reading GPU details");
    let entries: Vec<GpuDetectEntry> = read_json(path)?;

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let bus_number = parse_bus_number(&entry.busid).ok_or_else(|| {
                StatsError::Malformed {
                    path: path.display().to_string(),
                    reason: format!("invalid bus id '{}'", entry.busid),
                }
            })?;
            Ok(GpuCard {
                index,
                model: entry.name,
                brand: entry.brand,
                vendor: entry.subvendor,
                bus_number,
            })
        })
        .collect()
}

/// A PCI bus id like `0a:00.0` carries the bus number as leading hex.
fn parse_bus_number(busid: &str) -> Option<u32> {
    let (bus, _) = busid.split_once(':')?;
    u32::from_str_radix(bus, 16).ok()
}

/// Read the agent's last report and resolve the active miners.
///
/// `params` names each running miner in numbered slots (`miner`,
/// `miner2`, ...) with matching `miner_stats`/`total_khs` entries,
/// while `meta` maps miner names to the coin they mine. A miner
/// listed in `meta` without a matching slot is simply not running.
pub fn read_rig_stats(path: &Path) -> Result<RigStats, StatsError> {
    debug!(path = %path.display(), "Reading rig statistics");
    let stat: LastStat = read_json(path)?;
    let params = stat.params;

    let mut miners = Vec::new();
    for (miner_name, meta) in &params.meta {
        for slot in 1..=params.meta.len() {
            let postfix = if slot > 1 {
                slot.to_string()
            } else {
                String::new()
            };
            let slot_name = params
                .slots
                .get(&format!("miner{}", postfix))
                .and_then(Value::as_str);
            if slot_name != Some(miner_name.as_str()) {
                continue;
            }

            let stats_value = params
                .slots
                .get(&format!("miner_stats{}", postfix))
                .ok_or_else(|| StatsError::Malformed {
                    path: path.display().to_string(),
                    reason: format!("missing miner_stats{} for '{}'", postfix, miner_name),
                })?;
            let stats: MinerStats =
                serde_json::from_value(stats_value.clone()).map_err(|source| {
                    StatsError::Parse {
                        path: path.display().to_string(),
                        source,
                    }
                })?;
            let total_khs = params
                .slots
                .get(&format!("total_khs{}", postfix))
                .and_then(Value::as_f64)
                .ok_or_else(|| StatsError::Malformed {
                    path: path.display().to_string(),
                    reason: format!("missing total_khs{} for '{}'", postfix, miner_name),
                })?;

            miners.push(Miner {
                name: miner_name.clone(),
                coin: meta.coin.clone(),
                total_hashrate: total_khs * KHS_TO_HS,
                stats,
            });
            break;
        }
    }

    Ok(RigStats {
        miners,
        cputemp: params.cputemp.unwrap_or_default(),
    })
}

/// Read the current per-card sensor values.
pub fn read_gpu_stats(path: &Path) -> Result<GpuStats, StatsError> {
    debug!(path = %path.display(), "Reading GPU statistics");
    read_json(path)
}
