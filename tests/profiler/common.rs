/*!
 * Shared fixtures
 * A two-category decoder and a sink that records every view
 */

use insnmix::core::errors::RenderError;
use insnmix::decode::{Classification, Domains, GroupSet, InstructionDecoder, Outcome};
use insnmix::ranking::{ColumnOrder, IntervalView, ProcessOrder};
use insnmix::ui::RenderSink;
use insnmix::{ProfilerContext, RawSample, SampleClassifier};
use parking_lot::Mutex;
use std::sync::Arc;

pub const ARITHMETIC_INSN: &[u8] = &[0x01];
pub const CONTROL_FLOW_INSN: &[u8] = &[0xeb];
pub const GARBAGE_INSN: &[u8] = &[0xff];

/// `0x01` is ARITHMETIC/add, `0xeb` is CONTROL_FLOW/jmp, anything else fails
pub struct FixtureDecoder {
    domains: Domains,
}

impl FixtureDecoder {
    pub fn new() -> Self {
        Self {
            domains: Domains::new(
                vec!["ARITHMETIC".into(), "CONTROL_FLOW".into()],
                vec!["add".into(), "jmp".into()],
                vec![],
            ),
        }
    }
}

impl InstructionDecoder for FixtureDecoder {
    fn name(&self) -> &'static str {
        "fixture"
    }

    fn domains(&self) -> &Domains {
        &self.domains
    }

    fn max_insn_len(&self) -> usize {
        1
    }

    fn classify(&self, bytes: &[u8]) -> Outcome {
        let index = match bytes.first() {
            Some(0x01) => 0,
            Some(0xeb) => 1,
            _ => return Outcome::Failed,
        };
        Outcome::Decoded(Classification {
            mnemonic: index,
            categories: GroupSet::from_iter([index]),
            extensions: GroupSet::new(),
        })
    }
}

pub fn fixture_context() -> Arc<ProfilerContext> {
    let classifier = SampleClassifier::with_decoder(Arc::new(FixtureDecoder::new()));
    Arc::new(ProfilerContext::new(classifier))
}

pub fn sample(pid: u32, name: &str, insn: &[u8]) -> RawSample {
    RawSample::new(pid, insn, name.as_bytes())
}

/// Sink that keeps a copy of every rendered view
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub views: Arc<Mutex<Vec<IntervalView>>>,
}

impl RenderSink for RecordingSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn column_order(&self) -> ColumnOrder {
        ColumnOrder::ByPercent
    }

    fn process_order(&self) -> ProcessOrder {
        ProcessOrder::BySamples
    }

    fn render(&mut self, view: &IntervalView) -> Result<(), RenderError> {
        self.views.lock().push(view.clone());
        Ok(())
    }
}
