use probe_core::render::{Line, Report, Style};
use tracing::error;

use super::CommandContext;
use crate::cli::ExecArgs;

/// Runs the CLI on one instance at a time so streamed output never
/// interleaves.
pub(crate) async fn run(ctx: &CommandContext, args: &ExecArgs) -> anyhow::Result<()> {
    let instances = ctx.instances().await?;
    let cli = args.cli.join(" ");
    let mut failed = 0;
    for instance in &instances {
        print!("{}", ctx.style.render(&heading(instance.id(), &cli)));
        let mut command = instance.cli().command(&cli);
        command.set_stdout(tokio::io::stdout())?;
        command.set_stderr(tokio::io::stderr())?;
        if let Err(err) = command.run().await {
            failed += 1;
            error!(
                event = "instance.failed",
                instance = %instance.id(),
                error = %format!("{:#}", anyhow::Error::from(err)),
                "exec error"
            );
        }
    }
    if failed == instances.len() {
        anyhow::bail!("{cli:?} failed on all {failed} instances");
    }
    Ok(())
}

fn heading(instance: &str, cli: &str) -> Report {
    let mut line = Line::new();
    line.push("= instance ", Style::Label)
        .push(instance, Style::Value)
        .push(" | ", Style::Plain)
        .push("vpp# ", Style::Label)
        .push(cli, Style::CaptureNode);
    Report { lines: vec![line] }
}
