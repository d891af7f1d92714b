use std::path::PathBuf;

use clap::Parser;

/// Huddle: join a real-time audio channel, publish the microphone and leave.
///
/// Runs against the in-process loopback transport; remote participants and
/// transport faults are simulated from the flags below.
#[derive(Parser, Debug)]
#[command(name = "huddle", version, about)]
pub struct Args {
    /// Channel to join.
    #[arg(short, long, default_value = "support-room")]
    pub channel: String,

    /// Local uid. A random one is generated when omitted.
    #[arg(long)]
    pub uid: Option<u32>,

    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Number of simulated remote participants publishing audio.
    #[arg(long, default_value_t = 2)]
    pub remotes: usize,

    /// Fail the first N publish attempts with a transient error.
    #[arg(long, default_value_t = 0)]
    pub publish_failures: u32,

    /// Make the transport's leave call fail.
    #[arg(long)]
    pub fail_leave: bool,

    /// Seconds to stay in the channel before leaving.
    #[arg(long, default_value_t = 5)]
    pub hold_secs: u64,

    /// Mute the microphone once it is published.
    #[arg(long)]
    pub mute: bool,

    /// Print the effective config as JSON and exit.
    #[arg(long)]
    pub print_config: bool,
}

pub fn parse() -> Args {
    Args::parse()
}
