use anyhow::bail;
use clap::Parser;
use multiproc::{PoolConfig, SourceClosed};

use crate::command::CommandError;

/// Command-line arguments for the `multiproc` binary.
///
/// All flags may also be supplied through environment variables (or a `.env`
/// file), which makes the runner easy to tune from a CI job or container
/// without editing the invocation.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "multiproc",
    version,
    about = "Run a command once per input line across a bounded worker pool"
)]
pub struct CliArgs {
    /// Number of commands allowed to run at the same time.
    ///
    /// Environment variable: `CONCURRENCY`
    #[arg(short = 'j', long, env = "CONCURRENCY", default_value_t = 4)]
    pub concurrency: usize,

    /// Number of input lines read ahead of the workers.
    ///
    /// Reading stops once this many lines are waiting, so a slow pool applies
    /// backpressure to whatever is writing to stdin.
    ///
    /// Environment variable: `BUFFER_SIZE`
    #[arg(long, env = "BUFFER_SIZE", default_value_t = 64)]
    pub buffer_size: usize,

    /// Treat the end of input as a failure.
    ///
    /// Useful when stdin is expected to be endless (`tail -f`, a FIFO) and
    /// its closing means the producer died.
    ///
    /// Environment variable: `STRICT`
    #[arg(long, env = "STRICT", default_value_t = false)]
    pub strict: bool,

    /// Emit logs as JSON lines instead of human-readable text.
    ///
    /// Environment variable: `LOG_JSON`
    #[arg(long, env = "LOG_JSON", default_value_t = false)]
    pub log_json: bool,

    /// Program to run, followed by its leading arguments. Each input line is
    /// appended as the final argument.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub pool: PoolConfig,
    pub buffer_size: usize,
    pub program: String,
    pub args: Vec<String>,
    pub log_json: bool,
}

impl TryFrom<CliArgs> for RunConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.concurrency == 0 {
            bail!("CONCURRENCY must be greater than 0");
        }

        if args.buffer_size == 0 {
            bail!("BUFFER_SIZE must be greater than 0");
        }

        let mut command = args.command.into_iter();
        let Some(program) = command.next() else {
            bail!("a command to run is required");
        };

        let source_closed = if args.strict {
            SourceClosed::Fail
        } else {
            SourceClosed::Finish
        };
        let pool =
            PoolConfig::new::<CommandError>(args.concurrency)?.with_source_closed(source_closed);

        Ok(Self {
            pool,
            buffer_size: args.buffer_size,
            program,
            args: command.collect(),
            log_json: args.log_json,
        })
    }
}
