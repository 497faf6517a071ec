use clap::{Parser, Subcommand, ValueEnum};
use probe_core::trace::DEFAULT_MAX_PACKETS;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "vpp-probe",
    version,
    about = "Discover, inspect and trace VPP dataplane instances"
)]
pub(crate) struct Args {
    #[arg(long, global = true, default_value = "config/probe.toml")]
    pub(crate) config: PathBuf,
    /// Also write JSON logs to daily files in this directory.
    #[arg(long, global = true)]
    pub(crate) log_dir: Option<PathBuf>,
    /// Log filter, e.g. `debug` or `probe_core=trace`. Overrides RUST_LOG.
    #[arg(long, global = true)]
    pub(crate) log_level: Option<String>,
    #[arg(long, global = true, default_value_t = false)]
    pub(crate) no_color: bool,
    /// Instance filter: `name=..`, `status=..`, `version=..` or a bare name.
    #[arg(long = "query", short = 'q', global = true)]
    pub(crate) queries: Vec<String>,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Probe every instance and print its diagnostic record.
    Discover(DiscoverArgs),
    /// Capture packet traces on every instance.
    Trace(TraceArgs),
    /// Run one dataplane CLI on every instance, streaming its output.
    Exec(ExecArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::Args, Debug)]
pub(crate) struct DiscoverArgs {
    /// Extra CLI captured on every instance; repeat for more.
    #[arg(long = "extraclis")]
    pub(crate) extra_clis: Vec<String>,
    #[arg(long = "printclis", default_value_t = false)]
    pub(crate) print_clis: bool,
    #[arg(long, default_value_t = false)]
    pub(crate) nsm: bool,
    /// Correlate IPsec SAs across instances (needs --nsm).
    #[arg(long = "ipsec-agg", default_value_t = false)]
    pub(crate) ipsec_agg: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub(crate) format: OutputFormat,
}

#[derive(clap::Args, Debug)]
pub(crate) struct TraceArgs {
    /// Nodes to trace, comma separated [default: the common input nodes].
    /// An instance missing any listed node fails to start its trace, so name
    /// only the nodes your VPP build has.
    #[arg(long, value_delimiter = ',')]
    pub(crate) nodes: Vec<String>,
    #[arg(long = "num-packets", default_value_t = DEFAULT_MAX_PACKETS)]
    pub(crate) num_packets: u32,
    #[arg(long, default_value = "5s", value_parser = humantime::parse_duration)]
    pub(crate) duration: Duration,
    #[arg(long = "result-dir")]
    pub(crate) result_dir: Option<PathBuf>,
    /// Print every capture of every packet, not just the summary.
    #[arg(long, default_value_t = false)]
    pub(crate) print: bool,
}

#[derive(clap::Args, Debug)]
pub(crate) struct ExecArgs {
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub(crate) cli: Vec<String>,
}
