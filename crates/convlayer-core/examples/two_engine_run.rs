//! Two-engine bring-up run
//!
//! Replays the layer's bring-up sequence in software: program the bench
//! register words and kernels, stream a 5x5 ramp, rewrite the matrix size
//! mid-run, reset, restore the size and stream the negated ramp. Each vector
//! is printed next to the software reference.
//!
//! ```text
//! RUST_LOG=convlayer_core=debug cargo run --example two_engine_run
//! ```

use anyhow::{bail, Result};
use convlayer_chip::regs::bench;
use convlayer_core::prelude::*;
use convlayer_core::{reference_vectors, DEFAULT_MAX_TICKS};
use tracing_subscriber::EnvFilter;

const MATRIX_SIZE: usize = 5;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "convlayer_core=info".into()),
        )
        .init();

    let mut ctl = StreamController::new();
    ctl.write_register(Register::Bcfg1, bench::BCFG1);
    ctl.write_register(Register::Bcfg2, bench::BCFG2);
    ctl.write_register(Register::Cprm1, bench::CPRM1);

    let kernels = [
        KernelWeights::from_bytes(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09])?,
        KernelWeights::from_bytes(&[0x0A, 0xF6, 0x14, 0xEC, 0x1E, 0xE2, 0x28, 0xD8, 0x32])?,
    ];
    for (slot, kernel) in kernels.iter().enumerate() {
        ctl.set_kernel(slot, *kernel)?;
    }

    println!("Stage 1: ramp 0..24, BCFG2 rewritten to 0x{:04x} mid-run", bench::BCFG2_MID_RUN);
    let ramp: Vec<i32> = (0..25).collect();
    let matrix = ActivationMatrix::from_wrapping(MATRIX_SIZE, &ramp)?;
    let vectors = stream_with_mid_run_write(&mut ctl, &matrix)?;
    compare(&vectors, &reference_vectors(&matrix, &kernels, 1, 0, true))?;

    println!("\nStage 2: reset, BCFG2 restored, ramp 0..-24");
    let mut driver = TickDriver::new(&mut ctl);
    driver.reset(1);
    driver
        .controller()
        .write_register(Register::Bcfg2, bench::BCFG2);

    let negated: Vec<i32> = (0..25).map(|i| -i).collect();
    let matrix = ActivationMatrix::from_wrapping(MATRIX_SIZE, &negated)?;
    let mut sink = MemorySink::new();
    let report = driver.run(&matrix, &StallPattern::every(4, 40), &mut sink)?;
    compare(&report.vectors, &reference_vectors(&matrix, &kernels, 1, 0, true))?;

    println!(
        "\n✅ {} vectors exported, stage 2 done after {} ticks",
        sink.vectors().len(),
        report.ticks
    );
    Ok(())
}

/// Drive stage 1 by hand so the register write lands while Running.
fn stream_with_mid_run_write(
    ctl: &mut StreamController,
    matrix: &ActivationMatrix,
) -> Result<Vec<ResultVector>> {
    ctl.tick(&TickInputs::start().with_assertions(true));

    let mut vectors = Vec::new();
    let mut next = 0;
    for tick in 0..DEFAULT_MAX_TICKS {
        if tick == 1 {
            ctl.write_register(Register::Bcfg2, bench::BCFG2_MID_RUN);
        }
        let inputs = match matrix.samples().get(next) {
            Some(&sample) => TickInputs::sample(sample),
            None => TickInputs::idle(),
        }
        .with_assertions(true);

        let out = ctl.tick(&inputs);
        if out.used_data {
            next += 1;
        }
        vectors.extend(out.results);
        if out.run_done {
            return Ok(vectors);
        }
    }
    bail!("stage 1 did not finish within {DEFAULT_MAX_TICKS} ticks")
}

fn compare(got: &[ResultVector], expected: &[ResultVector]) -> Result<()> {
    if got.len() != expected.len() {
        bail!("{} vectors, expected {}", got.len(), expected.len());
    }
    for (g, e) in got.iter().zip(expected) {
        let mark = if g.values == e.values { "ok" } else { "MISMATCH" };
        println!(
            "  #{:<2} at {}  engine0={:>6}  engine1={:>6}  ({mark})",
            g.sequence, g.position, g.values[0], g.values[1]
        );
        if g != e {
            bail!("vector #{} differs: {:?} vs {:?}", g.sequence, g.values, e.values);
        }
    }
    Ok(())
}
