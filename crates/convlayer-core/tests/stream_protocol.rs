//! Handshake, backpressure, reset and configuration-cloning behaviour.
//!
//! These drive the controller tick by tick where the exact cycle matters and
//! fall back to `TickDriver` where it does not.

use convlayer_chip::regs::bench;
use convlayer_core::prelude::*;
use convlayer_core::reference_vectors;

fn bench_controller() -> StreamController {
    let mut ctl = StreamController::new();
    ctl.write_register(Register::Bcfg1, bench::BCFG1);
    ctl.write_register(Register::Bcfg2, bench::BCFG2);
    ctl.write_register(Register::Cprm1, bench::CPRM1);
    ctl.set_kernel(
        0,
        KernelWeights::from_bytes(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09]).unwrap(),
    )
    .unwrap();
    ctl.set_kernel(
        1,
        KernelWeights::from_bytes(&[0x0A, 0xF6, 0x14, 0xEC, 0x1E, 0xE2, 0x28, 0xD8, 0x32]).unwrap(),
    )
    .unwrap();
    ctl
}

fn bench_kernels(ctl: &StreamController) -> Vec<KernelWeights> {
    (0..2).map(|slot| ctl.kernels().get(slot).unwrap()).collect()
}

fn ramp(n: usize) -> ActivationMatrix {
    ActivationMatrix::from_fn(n, |r, c| i8::try_from(r * n + c).unwrap())
}

/// Stream `samples` one per tick with assertions on; returns every vector
/// and the number of `run_done` pulses seen, stopping once the samples run
/// out and `settle` extra ticks have passed.
fn stream(ctl: &mut StreamController, samples: &[i8], settle: usize) -> (Vec<ResultVector>, usize) {
    let mut vectors = Vec::new();
    let mut done = 0;
    let mut next = 0;
    let mut quiet = 0;
    while quiet <= settle {
        let inputs = match samples.get(next) {
            Some(&sample) => TickInputs::sample(sample).with_assertions(true),
            None => {
                quiet += 1;
                TickInputs::idle().with_assertions(true)
            }
        };
        let out = ctl.tick(&inputs);
        if out.used_data {
            next += 1;
        }
        if out.run_done {
            done += 1;
        }
        vectors.extend(out.results);
    }
    (vectors, done)
}

// ── Configuration cloning ────────────────────────────────────────────────────

#[test]
fn matrix_size_written_mid_run_waits_for_next_start() {
    let mut ctl = bench_controller();
    let kernels = bench_kernels(&ctl);
    let matrix = ramp(5);

    // stage 1: 0..24, BCFG2 rewritten to 16 right after the run starts
    ctl.tick(&TickInputs::reset().with_assertions(true));
    ctl.tick(&TickInputs::idle().with_assertions(true));
    assert_eq!(ctl.tick(&TickInputs::start().with_assertions(true)).state, RunState::Loading);
    ctl.tick(&TickInputs::sample(0).with_assertions(true));
    ctl.write_register(Register::Bcfg2, bench::BCFG2_MID_RUN);
    assert_eq!(ctl.read_field(ConfigField::MatrixSize), 5);

    let (vectors, done) = stream(&mut ctl, &matrix.samples()[1..], 4);
    assert_eq!(done, 1);
    assert_eq!(vectors, reference_vectors(&matrix, &kernels, 1, 0, true));
    assert_eq!(ctl.read_field(ConfigField::MatrixSize), 16);
    assert!(ctl.fault().is_none());

    // stage 2: reset, restore the size, stream the negated ramp
    ctl.tick(&TickInputs::reset().with_assertions(true));
    ctl.tick(&TickInputs::idle().with_assertions(true));
    ctl.write_register(Register::Bcfg2, bench::BCFG2);
    ctl.tick(&TickInputs::start().with_assertions(true));

    let negated: Vec<i32> = (0..25).map(|i| -i).collect();
    let matrix = ActivationMatrix::from_wrapping(5, &negated).unwrap();
    let (vectors, done) = stream(&mut ctl, matrix.samples(), 4);
    assert_eq!(done, 1);
    assert_eq!(vectors, reference_vectors(&matrix, &kernels, 1, 0, true));
    assert_eq!(vectors[0].values, vec![-366, -460]);
}

#[test]
fn new_size_applies_after_reset_and_start() {
    let mut ctl = bench_controller();
    let mut driver = TickDriver::new(&mut ctl);
    driver.run(&ramp(5), &StallPattern::none(), &mut DiscardSink).unwrap();

    driver.controller().write_register(Register::Bcfg2, 0x0006);
    driver.reset(1);
    let report = driver.run(&ramp(6), &StallPattern::none(), &mut DiscardSink).unwrap();
    assert_eq!(report.vectors.len(), 16);
    assert_eq!(driver.controller().active_config().matrix_size, 6);
}

#[test]
fn driver_rejects_matrix_of_wrong_size() {
    let mut ctl = bench_controller();
    let err = TickDriver::new(&mut ctl)
        .run(&ramp(4), &StallPattern::none(), &mut DiscardSink)
        .unwrap_err();
    assert!(matches!(err, ConvError::InvalidMatrix { .. }));
    assert_eq!(ctl.state(), RunState::Idle);
}

// ── Backpressure ─────────────────────────────────────────────────────────────

#[test]
fn stall_delays_output_by_exactly_k_ticks() {
    let mut ctl = bench_controller();
    let baseline = TickDriver::new(&mut ctl)
        .run(&ramp(5), &StallPattern::none(), &mut DiscardSink)
        .unwrap();

    for k in [1u64, 3, 7] {
        let mut ctl = bench_controller();
        let stalled = TickDriver::new(&mut ctl)
            .run(&ramp(5), &StallPattern::burst(5, k), &mut DiscardSink)
            .unwrap();

        assert_eq!(stalled.vectors, baseline.vectors);
        assert_eq!(stalled.ticks, baseline.ticks + k);
        for (late, early) in stalled.vector_ticks.iter().zip(&baseline.vector_ticks) {
            assert_eq!(*late, early + k);
        }
    }
}

#[test]
fn cursor_holds_while_data_not_ready() {
    let mut ctl = bench_controller();
    ctl.tick(&TickInputs::start());
    ctl.tick(&TickInputs::sample(0));
    for _ in 0..5 {
        let out = ctl.tick(&TickInputs::idle().with_request_next(true));
        assert!(!out.used_data);
        assert!(out.running);
        assert_eq!(ctl.samples_accepted(), 1);
    }
    assert!(ctl.tick(&TickInputs::sample(1)).used_data);
    assert_eq!(ctl.samples_accepted(), 2);
}

#[test]
fn stalled_producer_times_out_in_driver() {
    let mut ctl = bench_controller();
    let err = TickDriver::new(&mut ctl)
        .with_max_ticks(200)
        .run(&ramp(5), &StallPattern::burst(10, 1000), &mut DiscardSink)
        .unwrap_err();
    assert_eq!(err, ConvError::Timeout { ticks: 200 });
    assert_eq!(ctl.state(), RunState::Running);
    assert_eq!(ctl.samples_accepted(), 10);
}

// ── Reset and start ──────────────────────────────────────────────────────────

#[test]
fn reset_mid_run_stops_results_until_restart() {
    let mut ctl = bench_controller();
    let kernels = bench_kernels(&ctl);
    let matrix = ramp(5);
    let samples = matrix.samples();

    ctl.tick(&TickInputs::start());
    let mut valid = 0;
    for &sample in &samples[..14] {
        if ctl.tick(&TickInputs::sample(sample)).results_valid {
            valid += 1;
        }
    }
    assert_eq!(valid, 2);

    for &sample in &samples[14..17] {
        let out = ctl.tick(&TickInputs::sample(sample).with_reset(true));
        assert_eq!(out.state, RunState::Resetting);
        assert!(!out.results_valid && !out.used_data && !out.running && !out.run_done);
    }
    for &sample in &samples[17..] {
        let out = ctl.tick(&TickInputs::sample(sample));
        assert!(!out.results_valid && !out.used_data);
        assert_eq!(out.state, RunState::Idle);
    }

    ctl.tick(&TickInputs::start());
    let (vectors, done) = stream(&mut ctl, samples, 2);
    assert_eq!(done, 1);
    assert_eq!(vectors, reference_vectors(&matrix, &kernels, 1, 0, true));
}

#[test]
fn reset_on_done_tick_swallows_pulse() {
    let mut ctl = bench_controller();
    ctl.tick(&TickInputs::start());
    for &sample in ramp(5).samples() {
        ctl.tick(&TickInputs::sample(sample));
    }
    assert_eq!(ctl.state(), RunState::Done);
    let out = ctl.tick(&TickInputs::reset());
    assert!(!out.run_done);
    let out = ctl.tick(&TickInputs::idle());
    assert!(!out.run_done);
}

#[test]
fn start_while_running_is_ignored() {
    let mut ctl = bench_controller();
    let kernels = bench_kernels(&ctl);
    let matrix = ramp(5);
    let samples = matrix.samples();

    ctl.tick(&TickInputs::start());
    let mut vectors = Vec::new();
    for (i, &sample) in samples.iter().enumerate() {
        let out = ctl.tick(&TickInputs::sample(sample).with_start(i % 4 == 2));
        assert!(out.used_data);
        vectors.extend(out.results);
    }
    assert_eq!(vectors, reference_vectors(&matrix, &kernels, 1, 0, true));
}

// ── Faults ───────────────────────────────────────────────────────────────────

#[test]
fn invalid_config_never_signals_done() {
    let mut ctl = bench_controller();
    ctl.write_field(ConfigField::EngineCount, 0).unwrap();

    let out = ctl.tick(&TickInputs::start().with_assertions(true));
    assert_eq!(out.state, RunState::Idle);
    assert!(matches!(ctl.take_fault(), Some(ConvError::Configuration { .. })));

    for &sample in ramp(5).samples() {
        let out = ctl.tick(&TickInputs::sample(sample));
        assert!(!out.run_done && !out.results_valid && !out.used_data);
    }

    let err = TickDriver::new(&mut ctl)
        .run(&ramp(5), &StallPattern::none(), &mut DiscardSink)
        .unwrap_err();
    assert!(matches!(err, ConvError::Configuration { .. }));
}

#[test]
fn protocol_fault_leaves_run_intact() {
    let mut ctl = bench_controller();
    let kernels = bench_kernels(&ctl);
    let matrix = ramp(5);
    let samples = matrix.samples();

    ctl.tick(&TickInputs::start().with_assertions(true));
    // offer sample 0 without a request, then withdraw it
    ctl.tick(
        &TickInputs::sample(samples[0])
            .with_request_next(false)
            .with_assertions(true),
    );
    ctl.tick(&TickInputs::idle().with_assertions(true));
    assert!(matches!(ctl.take_fault(), Some(ConvError::Protocol { .. })));

    let (vectors, done) = stream(&mut ctl, samples, 2);
    assert_eq!(done, 1);
    assert_eq!(vectors, reference_vectors(&matrix, &kernels, 1, 0, true));
    assert!(ctl.fault().is_none());
}
