/*!
 * Perf Transport
 * Per-CPU perf_event sampling with mmap'd ring buffers
 *
 * One event is opened on every online CPU (optionally restricted to a
 * pid). Each sample carries the instruction pointer, pid and tid; the
 * instruction bytes are then read from the target's address space. Thread
 * names are tracked from COMM records in ring order, so a sample keeps the
 * name its thread had when it was taken even if the ring is drained after
 * an exec. Samples whose memory cannot be read are dropped and counted as
 * lost.
 */

use super::pmu::PmuEvent;
use super::traits::SampleSource;
use super::types::RawSample;
use crate::core::errors::{Result, SetupError};
use crate::core::limits::{COMM_LEN, DESIRED_NOFILE_LIMIT, PERF_RING_PAGES};
use crate::core::types::{comm_from_bytes, CommName, Pid};
use ahash::AHashMap;
use nix::sys::resource::{getrlimit, setrlimit, Resource};
use nix::sys::uio::{process_vm_readv, RemoteIoVec};
use perf_event_open_sys::bindings::{
    perf_event_attr, perf_event_mmap_page, PERF_FLAG_FD_CLOEXEC, PERF_RECORD_COMM,
    PERF_RECORD_EXIT, PERF_RECORD_LOST, PERF_RECORD_SAMPLE, PERF_SAMPLE_IP, PERF_SAMPLE_TID,
};
use std::io::{self, IoSliceMut};
use std::ptr;
use std::sync::atomic::{fence, Ordering};
use tracing::{debug, info, warn};

const HEADER_LEN: usize = 8;
const ONLINE_CPUS: &str = "/sys/devices/system/cpu/online";

/// Ring buffer shared with the kernel
struct PerfRing {
    base: *mut u8,
    mmap_len: usize,
    data_offset: usize,
    data_size: usize,
}

// The mapping is only touched from the thread that owns the source
unsafe impl Send for PerfRing {}

impl PerfRing {
    fn map(fd: i32, pages: usize) -> io::Result<Self> {
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
        let mmap_len = (pages + 1) * page_size;
        let base = unsafe {
            libc::mmap(
                ptr::null_mut(),
                mmap_len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };
        if base == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        let page = base as *const perf_event_mmap_page;
        // Older kernels leave these zero
        let (offset, size) = unsafe {
            (
                ptr::read_volatile(ptr::addr_of!((*page).data_offset)) as usize,
                ptr::read_volatile(ptr::addr_of!((*page).data_size)) as usize,
            )
        };
        let (data_offset, data_size) = if size == 0 {
            (page_size, pages * page_size)
        } else {
            (offset, size)
        };

        Ok(Self {
            base: base as *mut u8,
            mmap_len,
            data_offset,
            data_size,
        })
    }

    /// Consume every complete record, passing (type, body) to `on_record`
    fn drain(&mut self, scratch: &mut Vec<u8>, mut on_record: impl FnMut(u32, &[u8])) -> usize {
        let page = self.base as *mut perf_event_mmap_page;
        let head = unsafe { ptr::read_volatile(ptr::addr_of!((*page).data_head)) };
        fence(Ordering::Acquire);
        let mut tail = unsafe { ptr::read_volatile(ptr::addr_of!((*page).data_tail)) };

        let data =
            unsafe { std::slice::from_raw_parts(self.base.add(self.data_offset), self.data_size) };
        let mut records = 0;

        while tail < head {
            let offset = (tail % self.data_size as u64) as usize;
            copy_wrapped(data, offset, HEADER_LEN, scratch);
            let type_ = u32::from_ne_bytes([scratch[0], scratch[1], scratch[2], scratch[3]]);
            let size = u16::from_ne_bytes([scratch[6], scratch[7]]) as usize;
            if size < HEADER_LEN {
                warn!(size, "corrupt perf record header, skipping rest of ring");
                tail = head;
                break;
            }
            copy_wrapped(data, offset, size, scratch);
            on_record(type_, &scratch[HEADER_LEN..size]);
            tail += size as u64;
            records += 1;
        }

        fence(Ordering::SeqCst);
        unsafe { ptr::write_volatile(ptr::addr_of_mut!((*page).data_tail), tail) };
        records
    }
}

impl Drop for PerfRing {
    fn drop(&mut self) {
        unsafe { libc::munmap(self.base as *mut libc::c_void, self.mmap_len) };
    }
}

/// Copy `len` bytes starting at `start`, wrapping at the end of `data`
fn copy_wrapped(data: &[u8], start: usize, len: usize, out: &mut Vec<u8>) {
    out.clear();
    let first = (data.len() - start).min(len);
    out.extend_from_slice(&data[start..start + first]);
    out.extend_from_slice(&data[..len - first]);
}

struct PerfEvent {
    fd: i32,
    cpu: i32,
    ring: PerfRing,
}

impl Drop for PerfEvent {
    fn drop(&mut self) {
        unsafe { perf_event_open_sys::ioctls::DISABLE(self.fd, 0) };
        // PerfRing::drop unmaps after the fd is closed, which Linux allows
        unsafe { libc::close(self.fd) };
    }
}

/// Live perf session across all online CPUs
pub struct PerfSampleSource {
    events: Vec<PerfEvent>,
    max_insn_len: usize,
    scratch: Vec<u8>,
    records: RecordDecoder,
    kernel_lost: u64,
    unreadable: u64,
}

impl PerfSampleSource {
    /// Program `event` on every online CPU
    ///
    /// Offline CPUs are skipped with a warning; any other failure closes
    /// the events opened so far and is returned.
    pub fn open(
        event: &PmuEvent,
        sample_period: u64,
        pid: Option<Pid>,
        max_insn_len: usize,
    ) -> Result<Self> {
        raise_nofile_limit();

        let online = std::fs::read_to_string(ONLINE_CPUS)
            .map_err(|e| SetupError::Topology(format!("{}: {}", ONLINE_CPUS, e)))?;
        let cpus = parse_cpu_list(&online).map_err(SetupError::Topology)?;

        let mut attr = build_attr(event, sample_period);
        let target = pid.map(|p| p as i32).unwrap_or(-1);
        let mut events = Vec::with_capacity(cpus.len());

        for cpu in cpus {
            match open_event(&mut attr, target, cpu) {
                Ok(ev) => events.push(ev),
                Err(failure) => match failure.into_setup_error(cpu) {
                    Some(e) => return Err(e.into()),
                    None => warn!(cpu, "CPU is offline, skipping"),
                },
            }
        }

        if events.is_empty() {
            return Err(SetupError::NoCpus.into());
        }

        info!(
            cpus = events.len(),
            event = %event.description,
            sample_period,
            pid = ?pid,
            "perf sampling started"
        );

        Ok(Self {
            events,
            max_insn_len,
            scratch: Vec::with_capacity(256),
            records: RecordDecoder::new(read_comm),
            kernel_lost: 0,
            unreadable: 0,
        })
    }
}

impl SampleSource for PerfSampleSource {
    fn name(&self) -> &'static str {
        "perf"
    }

    fn poll(&mut self, sink: &mut dyn FnMut(RawSample)) -> Result<usize> {
        let Self {
            events,
            max_insn_len,
            scratch,
            records,
            kernel_lost,
            unreadable,
        } = self;
        let mut delivered = 0;

        for event in events.iter_mut() {
            let cpu = event.cpu;
            event.ring.drain(scratch, |type_, body| match records.decode(type_, body) {
                Some(Record::Sample { ip, pid, comm }) => {
                    let mut insn = [0u8; crate::core::limits::MAX_INSN_BYTES];
                    let len = (*max_insn_len).min(insn.len());
                    match read_remote(pid, ip, &mut insn[..len]) {
                        Some(n) if n > 0 => {
                            sink(RawSample::new(pid, &insn[..n], comm.as_bytes()));
                            delivered += 1;
                        }
                        _ => *unreadable += 1,
                    }
                }
                Some(Record::Lost(lost)) => {
                    debug!(cpu, lost, "kernel dropped samples");
                    *kernel_lost += lost;
                }
                None => {}
            });
        }

        Ok(delivered)
    }

    fn lost(&self) -> u64 {
        self.kernel_lost + self.unreadable
    }
}

fn build_attr(event: &PmuEvent, sample_period: u64) -> perf_event_attr {
    let mut attr = perf_event_attr::default();
    attr.size = std::mem::size_of::<perf_event_attr>() as u32;
    attr.type_ = event.type_;
    attr.config = event.config;
    attr.__bindgen_anon_1.sample_period = sample_period;
    attr.sample_type = PERF_SAMPLE_IP as u64 | PERF_SAMPLE_TID as u64;
    attr.set_disabled(1);
    attr.set_inherit(1);
    // Thread names arrive in ring order alongside the samples
    attr.set_comm(1);
    attr.set_comm_exec(1);
    attr.set_task(1);
    // Instruction bytes are read from user memory only
    attr.set_exclude_kernel(1);
    attr.set_exclude_hv(1);
    attr.set_exclude_guest(u64::from(event.exclude_guest));
    attr
}

/// Why a CPU's event could not be brought up
#[derive(Debug)]
enum OpenFailure {
    Open(io::Error),
    Map(io::Error),
}

impl OpenFailure {
    /// `None` means the CPU went offline and can be skipped
    fn into_setup_error(self, cpu: i32) -> Option<SetupError> {
        match self {
            OpenFailure::Open(e) => match e.raw_os_error() {
                Some(libc::ENODEV) => None,
                Some(libc::EACCES) | Some(libc::EPERM) => {
                    Some(SetupError::PermissionDenied(e.to_string()))
                }
                _ => Some(SetupError::PerfOpen {
                    cpu,
                    reason: e.to_string(),
                }),
            },
            OpenFailure::Map(e) => Some(SetupError::RingMap(format!("CPU {}: {}", cpu, e))),
        }
    }
}

fn open_event(
    attr: &mut perf_event_attr,
    pid: i32,
    cpu: i32,
) -> std::result::Result<PerfEvent, OpenFailure> {
    let fd = unsafe {
        perf_event_open_sys::perf_event_open(attr, pid, cpu, -1, PERF_FLAG_FD_CLOEXEC as libc::c_ulong)
    };
    if fd < 0 {
        return Err(OpenFailure::Open(io::Error::last_os_error()));
    }

    let ring = match PerfRing::map(fd, PERF_RING_PAGES) {
        Ok(ring) => ring,
        Err(e) => {
            unsafe { libc::close(fd) };
            return Err(OpenFailure::Map(e));
        }
    };
    let event = PerfEvent { fd, cpu, ring };

    if unsafe { perf_event_open_sys::ioctls::ENABLE(fd, 0) } < 0 {
        return Err(OpenFailure::Open(io::Error::last_os_error()));
    }
    Ok(event)
}

/// Ring records that matter to ingestion
#[derive(Debug, Clone, PartialEq, Eq)]
enum Record {
    Sample { ip: u64, pid: Pid, comm: CommName },
    Lost(u64),
}

/// Turns raw ring records into samples, tracking thread names by tid
struct RecordDecoder {
    comms: AHashMap<Pid, CommName>,
    /// Name of a thread seen before any COMM record for it
    lookup: fn(Pid, Pid) -> CommName,
}

impl RecordDecoder {
    fn new(lookup: fn(Pid, Pid) -> CommName) -> Self {
        Self {
            comms: AHashMap::new(),
            lookup,
        }
    }

    fn decode(&mut self, type_: u32, body: &[u8]) -> Option<Record> {
        match type_ {
            PERF_RECORD_SAMPLE => {
                let (ip, pid, tid) = parse_sample(body)?;
                let lookup = self.lookup;
                let comm = self
                    .comms
                    .entry(tid)
                    .or_insert_with(|| lookup(pid, tid))
                    .clone();
                Some(Record::Sample { ip, pid, comm })
            }
            PERF_RECORD_COMM => {
                let (tid, comm) = parse_comm(body)?;
                self.comms.insert(tid, comm);
                None
            }
            PERF_RECORD_EXIT => {
                let tid = parse_exit(body)?;
                self.comms.remove(&tid);
                None
            }
            PERF_RECORD_LOST => parse_lost(body).map(Record::Lost),
            _ => None,
        }
    }
}

/// PERF_RECORD_SAMPLE body for IP | TID: u64 ip, u32 pid, u32 tid
fn parse_sample(body: &[u8]) -> Option<(u64, Pid, Pid)> {
    let ip = u64::from_ne_bytes(body.get(0..8)?.try_into().ok()?);
    let pid = u32::from_ne_bytes(body.get(8..12)?.try_into().ok()?);
    let tid = u32::from_ne_bytes(body.get(12..16)?.try_into().ok()?);
    Some((ip, pid, tid))
}

/// PERF_RECORD_COMM body: u32 pid, u32 tid, NUL-padded name
fn parse_comm(body: &[u8]) -> Option<(Pid, CommName)> {
    let tid = u32::from_ne_bytes(body.get(4..8)?.try_into().ok()?);
    let name = body.get(8..)?;
    Some((tid, comm_from_bytes(&name[..name.len().min(COMM_LEN)])))
}

/// PERF_RECORD_EXIT body: u32 pid, ppid, tid, ptid, u64 time
fn parse_exit(body: &[u8]) -> Option<Pid> {
    Some(u32::from_ne_bytes(body.get(8..12)?.try_into().ok()?))
}

/// PERF_RECORD_LOST body: u64 id, u64 lost
fn parse_lost(body: &[u8]) -> Option<u64> {
    Some(u64::from_ne_bytes(body.get(8..16)?.try_into().ok()?))
}

/// Read up to `buf.len()` bytes at `addr` in `pid`; short reads at a
/// page boundary are allowed
fn read_remote(pid: Pid, addr: u64, buf: &mut [u8]) -> Option<usize> {
    let remote = [RemoteIoVec {
        base: addr as usize,
        len: buf.len(),
    }];
    let mut local = [IoSliceMut::new(buf)];
    process_vm_readv(nix::unistd::Pid::from_raw(pid as i32), &mut local, &remote).ok()
}

fn read_comm(pid: Pid, tid: Pid) -> CommName {
    std::fs::read_to_string(format!("/proc/{}/task/{}/comm", pid, tid))
        .map(|s| CommName::from(s.trim_end()))
        .unwrap_or_else(|_| CommName::from("<exited>"))
}

/// Parse the kernel cpu list format, e.g. "0-3,5,7-11"
pub fn parse_cpu_list(list: &str) -> std::result::Result<Vec<i32>, String> {
    let mut cpus = Vec::new();
    for part in list.trim().split(',').filter(|p| !p.is_empty()) {
        if let Some((start, end)) = part.split_once('-') {
            let start: i32 = start.parse().map_err(|e| format!("bad cpu range {}: {}", part, e))?;
            let end: i32 = end.parse().map_err(|e| format!("bad cpu range {}: {}", part, e))?;
            cpus.extend(start..=end);
        } else {
            cpus.push(part.parse().map_err(|e| format!("bad cpu id {}: {}", part, e))?);
        }
    }
    Ok(cpus)
}

/// One fd per CPU can exceed the default soft limit on large machines
fn raise_nofile_limit() {
    match getrlimit(Resource::RLIMIT_NOFILE) {
        Ok((soft, hard)) => {
            let wanted = DESIRED_NOFILE_LIMIT.min(hard);
            if soft < wanted {
                match setrlimit(Resource::RLIMIT_NOFILE, wanted, hard) {
                    Ok(()) => debug!(from = soft, to = wanted, "raised open file limit"),
                    Err(e) => warn!(error = %e, "failed to raise open file limit"),
                }
            }
        }
        Err(e) => warn!(error = %e, "failed to read open file limit"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cpu_list() {
        assert_eq!(parse_cpu_list("0-3,5,7-8\n").unwrap(), vec![0, 1, 2, 3, 5, 7, 8]);
        assert_eq!(parse_cpu_list("0").unwrap(), vec![0]);
        assert!(parse_cpu_list("a-b").is_err());
    }

    #[test]
    fn test_copy_wrapped() {
        let data = [1u8, 2, 3, 4, 5, 6];
        let mut out = Vec::new();
        copy_wrapped(&data, 4, 4, &mut out);
        assert_eq!(out, vec![5, 6, 1, 2]);
        copy_wrapped(&data, 1, 3, &mut out);
        assert_eq!(out, vec![2, 3, 4]);
    }

    #[test]
    fn test_parse_records() {
        let mut body = Vec::new();
        body.extend_from_slice(&0x4000_1000u64.to_ne_bytes());
        body.extend_from_slice(&42u32.to_ne_bytes());
        body.extend_from_slice(&43u32.to_ne_bytes());
        assert_eq!(parse_sample(&body), Some((0x4000_1000, 42, 43)));
        assert_eq!(parse_sample(&body[..10]), None);

        let mut lost = Vec::new();
        lost.extend_from_slice(&7u64.to_ne_bytes());
        lost.extend_from_slice(&12u64.to_ne_bytes());
        assert_eq!(parse_lost(&lost), Some(12));
    }

    fn sample_body(ip: u64, pid: Pid, tid: Pid) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&ip.to_ne_bytes());
        body.extend_from_slice(&pid.to_ne_bytes());
        body.extend_from_slice(&tid.to_ne_bytes());
        body
    }

    fn comm_body(pid: Pid, tid: Pid, name: &str) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&pid.to_ne_bytes());
        body.extend_from_slice(&tid.to_ne_bytes());
        body.extend_from_slice(name.as_bytes());
        // NUL terminated, padded to 8 bytes
        body.resize(8 + (name.len() / 8 + 1) * 8, 0);
        body
    }

    fn exit_body(pid: Pid, tid: Pid) -> Vec<u8> {
        let mut body = Vec::new();
        for v in [pid, 1, tid, 1] {
            body.extend_from_slice(&v.to_ne_bytes());
        }
        body.extend_from_slice(&0u64.to_ne_bytes());
        body
    }

    fn fixed_lookup(_pid: Pid, _tid: Pid) -> CommName {
        CommName::from("sh")
    }

    fn sample_comm(record: Option<Record>) -> CommName {
        match record {
            Some(Record::Sample { comm, .. }) => comm,
            other => panic!("expected a sample, got {:?}", other),
        }
    }

    #[test]
    fn test_exec_between_samples_keeps_name_at_sample_time() {
        let mut records = RecordDecoder::new(fixed_lookup);

        let before = records.decode(PERF_RECORD_SAMPLE, &sample_body(0x1000, 42, 42));
        assert!(records
            .decode(PERF_RECORD_COMM, &comm_body(42, 42, "cc1"))
            .is_none());
        let after = records.decode(PERF_RECORD_SAMPLE, &sample_body(0x2000, 42, 42));

        assert_eq!(sample_comm(before).as_str(), "sh");
        assert_eq!(sample_comm(after).as_str(), "cc1");
    }

    #[test]
    fn test_threads_keep_their_own_names() {
        let mut records = RecordDecoder::new(fixed_lookup);
        records.decode(PERF_RECORD_COMM, &comm_body(42, 43, "worker-0"));

        let main = records.decode(PERF_RECORD_SAMPLE, &sample_body(0x1000, 42, 42));
        let worker = records.decode(PERF_RECORD_SAMPLE, &sample_body(0x1000, 42, 43));
        assert_eq!(sample_comm(main).as_str(), "sh");
        match worker {
            Some(Record::Sample { pid, comm, .. }) => {
                assert_eq!(pid, 42);
                assert_eq!(comm.as_str(), "worker-0");
            }
            other => panic!("expected a sample, got {:?}", other),
        }
    }

    #[test]
    fn test_exit_forgets_thread_name() {
        let mut records = RecordDecoder::new(fixed_lookup);
        records.decode(PERF_RECORD_COMM, &comm_body(42, 42, "cc1"));
        records.decode(PERF_RECORD_EXIT, &exit_body(42, 42));

        // A reused tid falls back to the lookup
        let reused = records.decode(PERF_RECORD_SAMPLE, &sample_body(0x1000, 42, 42));
        assert_eq!(sample_comm(reused).as_str(), "sh");
    }

    #[test]
    fn test_lost_record_is_reported() {
        let mut records = RecordDecoder::new(fixed_lookup);
        let mut lost = Vec::new();
        lost.extend_from_slice(&1u64.to_ne_bytes());
        lost.extend_from_slice(&5u64.to_ne_bytes());
        assert_eq!(records.decode(PERF_RECORD_LOST, &lost), Some(Record::Lost(5)));
    }

    #[test]
    fn test_open_failures_map_to_setup_errors() {
        let offline = OpenFailure::Open(io::Error::from_raw_os_error(libc::ENODEV));
        assert_eq!(offline.into_setup_error(3), None);

        let denied = OpenFailure::Open(io::Error::from_raw_os_error(libc::EACCES));
        assert!(matches!(
            denied.into_setup_error(0),
            Some(SetupError::PermissionDenied(_))
        ));

        let other = OpenFailure::Open(io::Error::from_raw_os_error(libc::EINVAL));
        assert!(matches!(
            other.into_setup_error(2),
            Some(SetupError::PerfOpen { cpu: 2, .. })
        ));
    }

    #[test]
    fn test_ring_map_failure_is_reported_as_ring_map() {
        let Err(e) = PerfRing::map(-1, 1) else {
            panic!("mapping an invalid fd succeeded");
        };
        match OpenFailure::Map(e).into_setup_error(1) {
            Some(SetupError::RingMap(reason)) => assert!(reason.starts_with("CPU 1")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_read_own_memory() {
        let secret = [0xde_u8, 0xad, 0xbe, 0xef];
        let mut buf = [0u8; 4];
        let n = read_remote(std::process::id(), secret.as_ptr() as u64, &mut buf);
        // Reading our own address space needs no privilege
        if n == Some(4) {
            assert_eq!(buf, secret);
        }
    }
}
