/*!
 * PMU Probe
 * Picks the counter that approximates "instructions retired" on this host
 *
 * Detection reads sysfs only. When no usable hardware event is found the
 * software CPU clock is used instead, which still samples the running
 * instruction but with time rather than instruction weighting.
 */

use crate::decode::DecoderKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Generic perf event type ids
/// [LINUX-COMPAT] enum perf_type_id
pub const PERF_TYPE_SOFTWARE: u32 = 1;
pub const PERF_TYPE_RAW: u32 = 4;

/// [LINUX-COMPAT] PERF_COUNT_SW_CPU_CLOCK
pub const PERF_COUNT_SW_CPU_CLOCK: u64 = 0;

/// INST_RETIRED.ANY on recent Intel cores
const INTEL_INST_RETIRED: u64 = 0x00c0;
/// IBS op sampling, count dispatched ops
const AMD_IBS_OP_CONFIG: u64 = 0x80000;
/// INST_RETIRED on Arm PMUv3
const ARM_INST_RETIRED: u64 = 0x08;

const INTEL_PMUS: [&str; 3] = ["skylake", "icelake", "sapphire_rapids"];

/// Counter programmed on every CPU
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PmuEvent {
    pub type_: u32,
    pub config: u64,
    pub exclude_guest: bool,
    /// Human-readable name for logs and the summary
    pub description: String,
}

impl PmuEvent {
    pub fn software_clock() -> Self {
        Self {
            type_: PERF_TYPE_SOFTWARE,
            config: PERF_COUNT_SW_CPU_CLOCK,
            exclude_guest: true,
            description: "cpu-clock".into(),
        }
    }

    pub fn is_software(&self) -> bool {
        self.type_ == PERF_TYPE_SOFTWARE
    }
}

/// Where the probe looks for sysfs and procfs files
#[derive(Debug, Clone)]
pub struct PmuProbe {
    sys_root: PathBuf,
    proc_root: PathBuf,
}

impl Default for PmuProbe {
    fn default() -> Self {
        Self::new("/sys", "/proc")
    }
}

impl PmuProbe {
    pub fn new(sys_root: impl AsRef<Path>, proc_root: impl AsRef<Path>) -> Self {
        Self {
            sys_root: sys_root.as_ref().to_path_buf(),
            proc_root: proc_root.as_ref().to_path_buf(),
        }
    }

    /// Choose the event for the given instruction set
    pub fn detect(&self, arch: DecoderKind) -> PmuEvent {
        let event = match arch {
            DecoderKind::Aarch64 => PmuEvent {
                type_: PERF_TYPE_RAW,
                config: ARM_INST_RETIRED,
                exclude_guest: true,
                description: "armv8 inst_retired".into(),
            },
            DecoderKind::X86 => self.detect_x86(),
        };
        info!(
            event = %event.description,
            type_ = event.type_,
            config = format_args!("{:#x}", event.config),
            "sampling event selected"
        );
        event
    }

    fn detect_x86(&self) -> PmuEvent {
        if let Some(name) = self.pmu_name() {
            if INTEL_PMUS.iter().any(|p| name.starts_with(p)) {
                return PmuEvent {
                    type_: PERF_TYPE_RAW,
                    config: INTEL_INST_RETIRED,
                    exclude_guest: true,
                    description: format!("{} inst_retired.any", name),
                };
            }
        }

        if self.is_amd() {
            match self.ibs_op_type() {
                Some(type_) => {
                    return PmuEvent {
                        type_,
                        config: AMD_IBS_OP_CONFIG,
                        exclude_guest: false,
                        description: "amd ibs_op".into(),
                    }
                }
                None => warn!("ibs_op PMU not available, using software events"),
            }
        } else {
            warn!("unable to detect a supported PMU, using software events");
        }

        PmuEvent::software_clock()
    }

    /// Contents of /sys/devices/cpu/caps/pmu_name
    fn pmu_name(&self) -> Option<String> {
        let path = self.sys_root.join("devices/cpu/caps/pmu_name");
        fs::read_to_string(path).ok().map(|s| s.trim().to_string())
    }

    fn is_amd(&self) -> bool {
        fs::read_to_string(self.proc_root.join("cpuinfo"))
            .map(|info| {
                info.lines()
                    .find(|l| l.starts_with("vendor_id"))
                    .map(|l| l.contains("AuthenticAMD"))
                    .unwrap_or(false)
            })
            .unwrap_or(false)
    }

    fn ibs_op_type(&self) -> Option<u32> {
        let path = self.sys_root.join("bus/event_source/devices/ibs_op/type");
        match fs::read_to_string(&path) {
            Ok(s) => s.trim().parse().ok(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read ibs_op type");
                None
            }
        }
    }
}
