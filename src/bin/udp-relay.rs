/// Forward UDP datagrams between an application on 127.0.0.1:9996 and an
/// operator-supplied destination.
use argh::FromArgs;
use tokio_util::sync::CancellationToken;
use tracing::info;

use udp_relay::{Forwarder, ForwarderConfig, parse_endpoint};

/// Address the proxied application is pre-agreed to use.
const LOCAL_ENDPOINT: &str = "127.0.0.1:9996";

#[derive(FromArgs)]
/// relay args
struct CmdOptions {
    /// destination address, i.e.: 192.168.0.4:9997
    #[argh(option, short = 'd')]
    dst: String,
    /// be quiet
    #[argh(switch, short = 'q')]
    quiet: bool,
    /// be loud
    #[argh(switch, short = 'v')]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd_opts: CmdOptions = argh::from_env();

    let max_level = if cmd_opts.quiet {
        tracing::Level::ERROR
    } else if cmd_opts.verbose {
        tracing::Level::TRACE
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_max_level(max_level)
        .init();

    let local = parse_endpoint(LOCAL_ENDPOINT)?;
    let remote = parse_endpoint(&cmd_opts.dst)?;
    info!("forwarding between {} and {}", local, remote);

    let forwarder = Forwarder::bind(ForwarderConfig::new(local, remote)).await?;

    // No graceful-shutdown path of its own, termination comes from the OS.
    forwarder.run(CancellationToken::new()).await?;
    Ok(())
}
