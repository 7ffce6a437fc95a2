// SPDX-License-Identifier: Apache-2.0

//! `joinmark`: measures N-thread join barrier latency under seven wait
//! disciplines, from pure spinning to pure kernel blocking.

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use joinmark_runner::{Discipline, RunConfig, RunSummary, run};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Command-line arguments.
///
/// Flag spelling keeps the underscore form (`--input_count`) that downstream
/// result-collection scripts already parse.
#[derive(Debug, Parser)]
#[command(
    name = "joinmark",
    version,
    about = "Microbenchmark of N-thread join barrier latency under spin, monitor-wait and kernel-wait disciplines"
)]
struct Cli {
    /// Number of workload items (prime searches) per thread.
    #[arg(long = "input_count")]
    input_count: u32,

    /// Input magnitude exponent; taken modulo 32.
    #[arg(long = "complexity")]
    complexity: u32,

    /// Worker thread count. Defaults to all logical processors in all
    /// processor groups.
    #[arg(long = "thread_count")]
    thread_count: Option<usize>,

    /// Wait discipline: 1 = pause, 2 = pause soft-only, 3 = mwaitx in-loop,
    /// 4 = mwaitx in-loop soft-only, 5 = mwaitx no-loop, 6 = mwaitx no-loop
    /// soft-only, 7 = hard-wait only.
    #[arg(
        long = "join_type",
        default_value_t = 1,
        value_parser = clap::value_parser!(u8).range(1..=7)
    )]
    join_type: u8,

    /// Cycle bound passed to mwaitx; required for join types 3-6.
    #[arg(long = "mwaitx_cycle_count")]
    mwaitx_cycle_count: Option<u32>,
}

fn main() -> miette::Result<()> {
    let argv: Vec<String> = std::env::args().collect();
    if let Some(flag) = duplicated_flag(&argv) {
        let err = Cli::command().error(
            ErrorKind::ArgumentConflict,
            format!("'{flag}' already specified."),
        );
        let _ = err.print();
        std::process::exit(1);
    }

    let cli = match Cli::try_parse_from(&argv) {
        Ok(cli) => cli,
        Err(err) => {
            // Every parse failure, including an explicit help request, prints
            // usage and exits 1 so result-collection scripts can rely on the
            // exit code meaning "no measurement was taken".
            let _ = err.print();
            std::process::exit(1);
        }
    };

    init_tracing();

    let discipline = Discipline::from_join_type(cli.join_type)
        .expect("clap keeps join_type within 1..=7");
    let config = RunConfig {
        input_count: cli.input_count,
        complexity: cli.complexity % 32,
        thread_count: cli.thread_count,
        discipline,
        mwaitx_cycles: cli.mwaitx_cycle_count,
    };

    let summary = run(&config)?;
    emit(&config, &summary);

    // The folded answers stay observable to the very end of the program.
    let _ = std::hint::black_box(summary.answer);
    Ok(())
}

/// Reports the first flag that occurs more than once on the command line.
///
/// Each flag is accepted at most once; keeping the last of two conflicting
/// values would silently measure something the caller did not ask for.
fn duplicated_flag(argv: &[String]) -> Option<&'static str> {
    const FLAGS: [&str; 5] = [
        "--input_count",
        "--complexity",
        "--thread_count",
        "--join_type",
        "--mwaitx_cycle_count",
    ];
    FLAGS.into_iter().find(|flag| {
        argv.iter()
            .filter(|arg| {
                arg.as_str() == *flag
                    || arg
                        .strip_prefix(flag)
                        .is_some_and(|rest| rest.starts_with('='))
            })
            .count()
            > 1
    })
}

fn init_tracing() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");
}

fn emit(config: &RunConfig, summary: &RunSummary) {
    let input_count = u64::from(config.input_count);
    let thread_count = summary.thread_count as u64;
    let elapsed_ms = summary.elapsed.as_millis();

    joinmark_telemetry::emit::thread_lines(&summary.reports);
    joinmark_telemetry::emit::rollup_block(
        input_count,
        thread_count,
        &summary.totals,
        summary.elapsed_ticks,
        elapsed_ms,
        summary.cpu_time.map(|cpu| cpu.as_millis()),
    );
    joinmark_telemetry::emit::summary_line(
        input_count,
        config.complexity,
        thread_count,
        &summary.totals,
        summary.elapsed_ticks,
        elapsed_ms,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn repeated_flags_are_rejected() {
        let argv = argv(&[
            "joinmark",
            "--input_count",
            "1",
            "--input_count",
            "2",
            "--complexity",
            "0",
        ]);
        assert_eq!(duplicated_flag(&argv), Some("--input_count"));
    }

    #[test]
    fn equals_form_counts_as_an_occurrence() {
        let argv = argv(&["joinmark", "--complexity=1", "--complexity", "2"]);
        assert_eq!(duplicated_flag(&argv), Some("--complexity"));
    }

    #[test]
    fn distinct_flags_pass() {
        let argv = argv(&[
            "joinmark",
            "--input_count",
            "1",
            "--complexity",
            "0",
            "--join_type",
            "2",
        ]);
        assert_eq!(duplicated_flag(&argv), None);
    }
}
