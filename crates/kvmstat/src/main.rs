use std::error::Error;
use std::process;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use kvmstat_core::{KvmHandle, KvmInterface, KvmResult, ProcessStatusCounts, QueryError};
use kvmstat_utils::{
    debug, env_log_format, info, init_logging, init_logging_with_format, init_logging_with_level, warn, LogFormat,
    LogLevel,
};

/// Report swap usage and process-state counts read through libkvm.
#[derive(Parser, Debug)]
#[command(name = "kvmstat")]
#[command(version)]
#[command(about = "Report swap usage and process-state counts read through libkvm", long_about = None)]
struct Cli
{
    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format: pretty or json (overrides KVMSTAT_LOG_FORMAT)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Print the number of swap pages in use
    Swap,
    /// Print process counts grouped by command name and state
    Procs
    {
        /// Only print the N largest groups
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Collect both statistics periodically, reopening the kvm handle after failures
    Watch
    {
        /// Delay between collection cycles in milliseconds
        #[arg(short, long, default_value_t = 15_000)]
        interval_ms: u64,
        /// Stop after this many cycles (default: run forever)
        #[arg(short, long)]
        cycles: Option<u64>,
    },
}

fn main()
{
    let cli = Cli::parse();

    // Each flag overrides only its own env var
    let logging = match (cli.log_level, cli.log_format) {
        (None, None) => init_logging(),
        (None, Some(format)) => init_logging_with_format(format),
        (Some(level), Some(format)) => init_logging_with_level(level, format),
        (Some(level), None) => env_log_format().and_then(|format| init_logging_with_level(level, format)),
    };
    if let Err(e) = logging {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    if let Err(e) = run_command(cli.command) {
        eprintln!("Error: {}", error_chain(&e));
        process::exit(1);
    }
}

fn run_command(command: Commands) -> KvmResult<()>
{
    match command {
        Commands::Swap => {
            let kvm = KvmHandle::try_new()?;
            println!("{}", kvm.swap_used_pages()?);
            Ok(())
        }
        Commands::Procs { limit } => {
            let kvm = KvmHandle::try_new()?;
            let counts = kvm.process_status_counts()?;
            print_counts(&counts, limit);
            Ok(())
        }
        Commands::Watch { interval_ms, cycles } => {
            watch(Duration::from_millis(interval_ms), cycles);
            Ok(())
        }
    }
}

fn print_counts(counts: &ProcessStatusCounts, limit: Option<usize>)
{
    let sorted = counts.sorted();
    let shown = limit.unwrap_or(sorted.len());
    for (key, count) in sorted.iter().take(shown) {
        println!("{:>6}  {:<6} {}", count, key.status(), key.name());
    }
    if shown < sorted.len() {
        println!("   ...  {} more groups", sorted.len() - shown);
    }
    println!("{:>6}  total", counts.total());
}

/// Collection loop in the style of a metrics scraper
///
/// A failed cycle drops the handle, and the next cycle opens a new one; the
/// handle itself never retries.
fn watch(interval: Duration, cycles: Option<u64>)
{
    let mut kvm = None;
    let mut cycle: u64 = 0;

    loop {
        cycle += 1;
        if let Some((swap, counts)) = run_cycle(&mut kvm, cycle, KvmHandle::try_new) {
            println!("cycle {cycle}: kvm_swap_used_pages {swap}");
            for (key, count) in counts.sorted() {
                println!(
                    "cycle {cycle}: kvm_processes{{name=\"{}\",status=\"{}\"}} {count}",
                    key.name(),
                    key.status()
                );
            }
        }

        if cycles.is_some_and(|max| cycle >= max) {
            info!(cycle, "requested cycles completed");
            break;
        }
        debug!(?interval, "sleeping until next cycle");
        thread::sleep(interval);
    }
}

/// One collection pass, opening the handle first if there is none
///
/// Failures are logged with their full cause chain and leave `kvm` empty.
fn run_cycle<K, F>(kvm: &mut Option<KvmHandle<K>>, cycle: u64, open: F) -> Option<(u64, ProcessStatusCounts)>
where
    K: KvmInterface,
    F: FnOnce() -> KvmResult<KvmHandle<K>>,
{
    let handle = match kvm.take() {
        Some(handle) => handle,
        None => match open() {
            Ok(handle) => handle,
            Err(err) => {
                warn!(cycle, error = %error_chain(&err), "couldn't open kvm handle, retrying next cycle");
                return None;
            }
        },
    };

    match collect(&handle) {
        Ok(stats) => {
            *kvm = Some(handle);
            Some(stats)
        }
        Err(err) => {
            warn!(cycle, error = %error_chain(&err), "collection failed, reopening kvm handle");
            None
        }
    }
}

fn collect<K: KvmInterface>(kvm: &KvmHandle<K>) -> KvmResult<(u64, ProcessStatusCounts)>
{
    let swap = kvm.swap_used_pages()?;
    let counts = kvm.process_status_counts()?;
    Ok((swap, counts))
}

/// `err` followed by each of its sources, joined with `": "`
fn error_chain(err: &QueryError) -> String
{
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests
{
    use clap::CommandFactory;
    use kvmstat_core::{FfiError, NativeKvm};

    use super::*;

    #[test]
    fn test_cli_definition_is_valid()
    {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_watch_defaults()
    {
        let cli = Cli::try_parse_from(["kvmstat", "watch"]).unwrap();
        match cli.command {
            Commands::Watch { interval_ms, cycles } => {
                assert_eq!(interval_ms, 15_000);
                assert_eq!(cycles, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_global_log_options()
    {
        let cli = Cli::try_parse_from(["kvmstat", "procs", "--limit", "5", "--log-level", "debug", "--log-format", "json"])
            .unwrap();
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        assert!(matches!(cli.command, Commands::Procs { limit: Some(5) }));
    }

    #[test]
    fn test_parse_format_without_level()
    {
        let cli = Cli::try_parse_from(["kvmstat", "swap", "--log-format", "json"]).unwrap();
        assert_eq!(cli.log_level, None);
        assert_eq!(cli.log_format, Some(LogFormat::Json));
    }

    #[test]
    fn test_error_chain_includes_open_cause()
    {
        let err = QueryError::OpenFailure(FfiError::Unsupported("plan9"));
        assert_eq!(error_chain(&err), "couldn't open kvm session: kvm is not available on plan9");
        assert_eq!(error_chain(&QueryError::HandleInvalid), "kvm handle is invalid");
    }

    #[test]
    fn test_run_cycle_open_failure_leaves_no_handle()
    {
        let mut kvm: Option<KvmHandle<NativeKvm>> = None;
        let stats = run_cycle(&mut kvm, 1, || Err(QueryError::OpenFailure(FfiError::Unsupported("plan9"))));
        assert!(stats.is_none());
        assert!(kvm.is_none());
    }

    #[test]
    fn test_run_cycle_reopens_after_open_failure()
    {
        let mut kvm: Option<KvmHandle<NativeKvm>> = None;
        let mut opens = 0;
        for cycle in 1..=3 {
            run_cycle(&mut kvm, cycle, || {
                opens += 1;
                Err(QueryError::OpenFailure(FfiError::Unsupported("plan9")))
            });
        }
        assert_eq!(opens, 3);
    }

    #[test]
    fn test_parse_rejects_unknown_level()
    {
        assert!(Cli::try_parse_from(["kvmstat", "swap", "--log-level", "loud"]).is_err());
    }
}
