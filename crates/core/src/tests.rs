// WbHarness - Wishbone Core Test Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

#[cfg(test)]
mod harness_tests {
    use crate::bus::WishboneBus;
    use crate::{
        BusInputs, BusOutputs, ByteLanes, ClockedCore, Harness, RunOutcome, SignalSample,
        SimulationError, TraceSink,
    };

    const RAM: usize = 4096;
    const UART: u32 = 0x8000_0000;

    /// Presents `script[n]` after the n-th rising edge out of reset, whatever the slave answered.
    #[derive(Debug, Default)]
    struct ScriptedCore {
        script: Vec<BusOutputs>,
        during_reset: BusOutputs,
        clk: bool,
        prev_clk: bool,
        rst: bool,
        inputs: BusInputs,
        current: Option<usize>,
        reset_edges: u32,
        acks_seen: Vec<bool>,
        data_seen: Vec<u32>,
    }

    impl ScriptedCore {
        fn new(script: Vec<BusOutputs>) -> Self {
            Self {
                script,
                ..Self::default()
            }
        }
    }

    impl ClockedCore for ScriptedCore {
        fn set_clock(&mut self, level: bool) {
            self.clk = level;
        }

        fn set_reset(&mut self, level: bool) {
            self.rst = level;
        }

        fn set_inputs(&mut self, inputs: BusInputs) {
            self.inputs = inputs;
        }

        fn outputs(&self) -> BusOutputs {
            if self.rst {
                return self.during_reset;
            }
            self.current
                .and_then(|i| self.script.get(i).copied())
                .unwrap_or(BusOutputs::IDLE)
        }

        fn eval(&mut self) {
            let rising = self.clk && !self.prev_clk;
            self.prev_clk = self.clk;
            if !rising {
                return;
            }
            if self.rst {
                self.reset_edges += 1;
                return;
            }
            self.acks_seen.push(self.inputs.ack);
            self.data_seen.push(self.inputs.dat);
            self.current = Some(self.current.map_or(0, |i| i + 1));
        }
    }

    #[derive(Debug, Default)]
    struct RecordingTrace {
        samples: Vec<(u64, SignalSample)>,
        flushes: u32,
        fail_at: Option<u64>,
    }

    impl TraceSink for RecordingTrace {
        fn sample(&mut self, tick: u64, sample: &SignalSample) -> std::io::Result<()> {
            if self.fail_at == Some(tick) {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
            }
            self.samples.push((tick, *sample));
            Ok(())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    fn uart_put(byte: u8) -> BusOutputs {
        BusOutputs::write(UART, ByteLanes::WORD, byte as u32)
    }

    fn uart_script(text: &[u8]) -> Vec<BusOutputs> {
        text.iter().map(|&b| uart_put(b)).collect()
    }

    fn harness(core: ScriptedCore, max_cycles: u64) -> Harness<ScriptedCore> {
        Harness::with_limits(core, WishboneBus::new(RAM, UART), 5, max_cycles)
    }

    #[test]
    fn test_pass_stops_at_matching_cycle() {
        let mut script = vec![BusOutputs::IDLE];
        script.extend(uart_script(b"OK\n"));
        script.extend(uart_script(b"XYZ"));
        let mut h = harness(ScriptedCore::new(script), 100);
        let mut trace = RecordingTrace::default();

        let report = h.run(&mut trace).unwrap();
        assert_eq!(report.outcome, RunOutcome::Pass);
        assert_eq!(report.cycles, 4);
        assert_eq!(report.uart, "OK\n");
        assert_eq!(h.bus.stats.uart_writes, 3);
        assert_eq!(trace.flushes, 1);
    }

    #[test]
    fn test_fail_signature() {
        let mut h = harness(ScriptedCore::new(uart_script(b"ERROR\n")), 100);
        let report = h.run(&mut RecordingTrace::default()).unwrap();
        assert_eq!(report.outcome, RunOutcome::Fail);
        assert_eq!(report.cycles, 6);
    }

    #[test]
    fn test_timeout_runs_full_budget() {
        let mut h = harness(ScriptedCore::new(Vec::new()), 50);
        let mut trace = RecordingTrace::default();
        let report = h.run(&mut trace).unwrap();
        assert_eq!(report.outcome, RunOutcome::Timeout);
        assert_eq!(report.cycles, 50);
        assert_eq!(h.core.acks_seen.len(), 50);
        // Two samples per cycle, reset included.
        assert_eq!(trace.samples.len() as u64, 2 * (5 + 50));
        assert_eq!(h.ticks(), 2 * (5 + 50));
        assert_eq!(trace.flushes, 1);
    }

    #[test]
    fn test_output_past_signature_never_matches() {
        let mut h = harness(ScriptedCore::new(uart_script(b">OK\n")), 40);
        let report = h.run(&mut RecordingTrace::default()).unwrap();
        assert_eq!(report.outcome, RunOutcome::Timeout);
        assert_eq!(report.uart, ">OK\n");
    }

    #[test]
    fn test_partial_mask_uart_writes_do_not_count() {
        let sel = ByteLanes::from_bits_truncate(0b0111);
        let mut script = vec![BusOutputs::write(UART, sel, b'O' as u32)];
        script.extend(uart_script(b"OK\n"));
        let mut h = harness(ScriptedCore::new(script), 40);
        let report = h.run(&mut RecordingTrace::default()).unwrap();
        assert_eq!(report.outcome, RunOutcome::Pass);
        assert_eq!(report.stats.uart_ignored, 1);
    }

    #[test]
    fn test_reset_phase_never_services_bus() {
        let mut core = ScriptedCore::new(Vec::new());
        core.during_reset = uart_put(b'E');
        let mut h = harness(core, 10);
        // Seed RAM so a stray reset-time write would be visible.
        h.bus.ram.load_bytes(&[0xAA; 8]);
        h.core.during_reset = BusOutputs::write(0, ByteLanes::WORD, 0);

        let mut trace = RecordingTrace::default();
        h.reset_phase(&mut trace).unwrap();
        assert_eq!(h.core.reset_edges, 5);
        assert_eq!(h.bus.stats, Default::default());
        assert_eq!(h.bus.ram.read_u32(0), 0xAAAA_AAAA);
        assert!(h.bus.uart.transmitted().is_empty());
        assert!(trace.samples.iter().all(|(_, s)| s.rst && !s.inputs.ack));
        assert_eq!(trace.samples.len(), 10);
    }

    #[test]
    fn test_reset_phase_write_to_uart_is_ignored() {
        let mut core = ScriptedCore::new(Vec::new());
        core.during_reset = uart_put(b'O');
        let mut h = harness(core, 10);
        let report = h.run(&mut RecordingTrace::default()).unwrap();
        assert_eq!(report.outcome, RunOutcome::Timeout);
        assert!(report.uart.is_empty());
    }

    #[test]
    fn test_ack_is_deasserted_for_unmapped_cycle() {
        let script = vec![
            BusOutputs::read(0, ByteLanes::WORD),
            BusOutputs::read(0x4000_0000, ByteLanes::WORD),
            BusOutputs::IDLE,
            BusOutputs::IDLE,
        ];
        let mut h = harness(ScriptedCore::new(script), 4);
        h.bus.ram.load_bytes(&[0x78, 0x56, 0x34, 0x12]);
        h.run(&mut RecordingTrace::default()).unwrap();

        // Rising edge n samples what the slave drove during cycle n - 1.
        assert_eq!(h.core.acks_seen, vec![false, true, false, false]);
        // Read data holds its last value when nothing replaces it.
        assert_eq!(h.core.data_seen[1], 0x1234_5678);
        assert_eq!(h.core.data_seen[2], 0x1234_5678);
        assert_eq!(h.bus.stats.unmapped, 1);
    }

    #[test]
    fn test_trace_samples_are_sequential_with_alternating_clock() {
        let mut h = harness(ScriptedCore::new(Vec::new()), 3);
        let mut trace = RecordingTrace::default();
        h.run(&mut trace).unwrap();
        for (i, (tick, sample)) in trace.samples.iter().enumerate() {
            assert_eq!(*tick, i as u64);
            assert_eq!(sample.clk, i % 2 == 0);
        }
    }

    #[test]
    fn test_trace_error_propagates_and_still_flushes() {
        let mut h = harness(ScriptedCore::new(Vec::new()), 10);
        let mut trace = RecordingTrace {
            fail_at: Some(12),
            ..RecordingTrace::default()
        };
        let err = h.run(&mut trace).unwrap_err();
        assert!(matches!(err, SimulationError::Trace(_)));
        assert_eq!(trace.flushes, 1);
    }
}
