/*!
 * Simulated Workload
 * Synthetic sample producer for hosts without perf access
 *
 * A background thread publishes samples for a fixed set of fake
 * processes, each with its own instruction mix, into a channel transport.
 * One pid periodically changes its name to exercise pid reuse.
 */

use super::channel::SampleSender;
use super::types::RawSample;
use crate::core::types::Pid;
use crate::decode::DecoderKind;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

const BATCH_INTERVAL: Duration = Duration::from_millis(10);
const DEFAULT_SAMPLES_PER_SEC: u64 = 20_000;
/// Chance per batch that the reused pid switches program
const EXEC_PROBABILITY: f64 = 0.02;

// x86-64 encodings
const X86_ADD: &[u8] = &[0x48, 0x01, 0xd8];
const X86_MOV: &[u8] = &[0x48, 0x89, 0xc3];
const X86_JE: &[u8] = &[0x74, 0x00];
const X86_CALL: &[u8] = &[0xe8, 0x00, 0x00, 0x00, 0x00];
const X86_RET: &[u8] = &[0xc3];
const X86_ADDPS: &[u8] = &[0x0f, 0x58, 0xc1];
const X86_VADDPS: &[u8] = &[0xc5, 0xf8, 0x58, 0xc1];
const X86_VADDPS_ZMM: &[u8] = &[0x62, 0xf1, 0x7c, 0x48, 0x58, 0xc1];
const X86_FADD: &[u8] = &[0xd8, 0xc1];
const X86_GARBAGE: &[u8] = &[0xff];

// A64 encodings, little endian
const A64_ADD: &[u8] = &[0x20, 0x00, 0x02, 0x8b];
const A64_ADDI: &[u8] = &[0x20, 0x04, 0x00, 0x91];
const A64_LDR: &[u8] = &[0x20, 0x00, 0x40, 0xf9];
const A64_STP: &[u8] = &[0xfd, 0x7b, 0xbf, 0xa9];
const A64_BCOND: &[u8] = &[0x00, 0x00, 0x00, 0x54];
const A64_BL: &[u8] = &[0x00, 0x00, 0x00, 0x94];
const A64_RET: &[u8] = &[0xc0, 0x03, 0x5f, 0xd6];
const A64_FADD: &[u8] = &[0x20, 0x28, 0x22, 0x1e];
const A64_NOP: &[u8] = &[0x1f, 0x20, 0x03, 0xd5];
const A64_GARBAGE: &[u8] = &[0x00, 0x00, 0x00, 0x00];

/// One fake process and the instruction mix it executes
#[derive(Debug, Clone)]
pub struct SimulatedProcess {
    pub pid: Pid,
    /// Names the process cycles through; more than one models pid reuse
    pub names: Vec<&'static str>,
    /// Relative share of all samples
    pub weight: u32,
    /// (encoding, weight) pairs
    pub mix: Vec<(&'static [u8], u32)>,
}

/// Synthetic producer configuration
#[derive(Debug, Clone)]
pub struct SimulatedWorkload {
    processes: Vec<SimulatedProcess>,
    samples_per_sec: u64,
    seed: u64,
}

impl SimulatedWorkload {
    /// Default process set for an instruction set
    pub fn new(arch: DecoderKind) -> Self {
        let processes = match arch {
            DecoderKind::X86 => vec![
                SimulatedProcess {
                    pid: 4101,
                    names: vec!["matmul"],
                    weight: 6,
                    mix: vec![(X86_VADDPS_ZMM, 5), (X86_VADDPS, 3), (X86_ADD, 2), (X86_JE, 1)],
                },
                SimulatedProcess {
                    pid: 4102,
                    names: vec!["nginx"],
                    weight: 3,
                    mix: vec![(X86_MOV, 6), (X86_ADD, 3), (X86_JE, 3), (X86_CALL, 2), (X86_RET, 2)],
                },
                SimulatedProcess {
                    pid: 4103,
                    names: vec!["sh", "cc1"],
                    weight: 2,
                    mix: vec![(X86_MOV, 4), (X86_ADDPS, 2), (X86_FADD, 1), (X86_RET, 1)],
                },
                SimulatedProcess {
                    pid: 4104,
                    names: vec!["jit-runtime"],
                    weight: 1,
                    mix: vec![(X86_ADD, 3), (X86_GARBAGE, 1)],
                },
            ],
            DecoderKind::Aarch64 => vec![
                SimulatedProcess {
                    pid: 4101,
                    names: vec!["matmul"],
                    weight: 6,
                    mix: vec![(A64_FADD, 6), (A64_LDR, 3), (A64_ADDI, 1), (A64_BCOND, 1)],
                },
                SimulatedProcess {
                    pid: 4102,
                    names: vec!["nginx"],
                    weight: 3,
                    mix: vec![(A64_LDR, 4), (A64_ADD, 3), (A64_BL, 2), (A64_RET, 2), (A64_STP, 2)],
                },
                SimulatedProcess {
                    pid: 4103,
                    names: vec!["sh", "cc1"],
                    weight: 2,
                    mix: vec![(A64_ADD, 3), (A64_NOP, 1), (A64_BCOND, 2)],
                },
                SimulatedProcess {
                    pid: 4104,
                    names: vec!["jit-runtime"],
                    weight: 1,
                    mix: vec![(A64_ADDI, 3), (A64_GARBAGE, 1)],
                },
            ],
        };

        Self {
            processes,
            samples_per_sec: DEFAULT_SAMPLES_PER_SEC,
            seed: 0x5eed,
        }
    }

    /// Keep only the given pid, mirroring a pid-restricted perf session
    pub fn only_pid(mut self, pid: Option<Pid>) -> Self {
        if let Some(pid) = pid {
            self.processes.retain(|p| p.pid == pid);
        }
        self
    }

    pub fn with_rate(mut self, samples_per_sec: u64) -> Self {
        self.samples_per_sec = samples_per_sec;
        self
    }

    pub fn processes(&self) -> &[SimulatedProcess] {
        &self.processes
    }

    /// Start the producer thread
    pub fn spawn(self, sender: SampleSender) -> std::io::Result<SimulationHandle> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name("insnmix-sim".into())
            .spawn(move || self.run(sender, thread_stop))?;

        Ok(SimulationHandle {
            stop,
            thread: Some(thread),
        })
    }

    fn run(self, sender: SampleSender, stop: Arc<AtomicBool>) {
        let mut generator = match Generator::new(&self.processes, self.seed) {
            Some(g) => g,
            None => {
                info!("simulated workload has no processes");
                return;
            }
        };
        let per_batch =
            (self.samples_per_sec * BATCH_INTERVAL.as_millis() as u64 / 1000).max(1) as usize;
        info!(
            processes = self.processes.len(),
            samples_per_sec = self.samples_per_sec,
            "simulated workload started"
        );

        while !stop.load(Ordering::Relaxed) {
            generator.maybe_exec();
            for _ in 0..per_batch {
                sender.publish(generator.next_sample());
            }
            thread::sleep(BATCH_INTERVAL);
        }
        debug!(produced = sender.produced(), "simulated workload stopped");
    }
}

/// Weighted sample generator over a process set
pub struct Generator<'a> {
    processes: &'a [SimulatedProcess],
    pick_process: WeightedIndex<u32>,
    pick_insn: Vec<WeightedIndex<u32>>,
    current_name: Vec<usize>,
    rng: StdRng,
}

impl<'a> Generator<'a> {
    /// Returns `None` for an empty or zero-weight process set
    pub fn new(processes: &'a [SimulatedProcess], seed: u64) -> Option<Self> {
        let pick_process = WeightedIndex::new(processes.iter().map(|p| p.weight)).ok()?;
        let pick_insn = processes
            .iter()
            .map(|p| WeightedIndex::new(p.mix.iter().map(|(_, w)| *w)).ok())
            .collect::<Option<Vec<_>>>()?;

        Some(Self {
            processes,
            pick_process,
            pick_insn,
            current_name: vec![0; processes.len()],
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Switch multi-name processes to their next program name
    pub fn maybe_exec(&mut self) {
        for (i, process) in self.processes.iter().enumerate() {
            if process.names.len() > 1 && self.rng.gen_bool(EXEC_PROBABILITY) {
                self.current_name[i] = (self.current_name[i] + 1) % process.names.len();
            }
        }
    }

    pub fn next_sample(&mut self) -> RawSample {
        let p = self.pick_process.sample(&mut self.rng);
        let process = &self.processes[p];
        let insn = process.mix[self.pick_insn[p].sample(&mut self.rng)].0;
        let name = process.names[self.current_name[p]];
        RawSample::new(process.pid, insn, name.as_bytes())
    }
}

/// Running producer; stops and joins on drop
pub struct SimulationHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SimulationHandle {
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for SimulationHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{Outcome, SampleClassifier};

    #[test]
    fn test_every_simulated_encoding_is_known() {
        for arch in [DecoderKind::X86, DecoderKind::Aarch64] {
            let classifier = SampleClassifier::new(arch);
            let workload = SimulatedWorkload::new(arch);
            let mut failed = 0;
            for process in workload.processes() {
                for (insn, _) in &process.mix {
                    if classifier.classify(insn) == Outcome::Failed {
                        failed += 1;
                    }
                }
            }
            // Exactly the deliberate garbage entry
            assert_eq!(failed, 1, "{:?}", arch);
        }
    }

    #[test]
    fn test_generator_is_deterministic() {
        let workload = SimulatedWorkload::new(DecoderKind::X86);
        let mut a = Generator::new(workload.processes(), 7).unwrap();
        let mut b = Generator::new(workload.processes(), 7).unwrap();
        for _ in 0..100 {
            assert_eq!(a.next_sample(), b.next_sample());
        }
    }

    #[test]
    fn test_only_pid_filters_processes() {
        let workload = SimulatedWorkload::new(DecoderKind::X86).only_pid(Some(4102));
        assert_eq!(workload.processes().len(), 1);
        let mut generator = Generator::new(workload.processes(), 1).unwrap();
        assert_eq!(generator.next_sample().pid, 4102);

        let empty = SimulatedWorkload::new(DecoderKind::X86).only_pid(Some(1));
        assert!(Generator::new(empty.processes(), 1).is_none());
    }

    #[test]
    fn test_spawned_producer_publishes() {
        let (tx, mut source) = crate::sampling::channel::sample_channel(1 << 16);
        let mut handle = SimulatedWorkload::new(DecoderKind::X86)
            .with_rate(10_000)
            .spawn(tx)
            .unwrap();
        std::thread::sleep(Duration::from_millis(50));
        handle.stop();

        use crate::sampling::SampleSource;
        let delivered = source.poll(&mut |_| {}).unwrap();
        assert!(delivered > 0);
    }
}
