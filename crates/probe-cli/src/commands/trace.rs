use probe_core::orchestrator::{run_trace, TraceOptions, TraceOutcome};
use probe_core::render::{render_packet_summary, render_trace_report, Line, Report, Style};
use probe_core::trace::common_nodes;
use system_utils::path::expand_tilde;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::CommandContext;
use crate::cli::TraceArgs;
use crate::output::StylePolicy;

pub(crate) async fn run(ctx: &CommandContext, args: &TraceArgs) -> anyhow::Result<()> {
    let instances = ctx.instances().await?;
    let opts = TraceOptions {
        nodes: if args.nodes.is_empty() {
            common_nodes()
        } else {
            args.nodes.clone()
        },
        max_packets: args.num_packets,
        duration: args.duration,
        result_dir: args
            .result_dir
            .as_deref()
            .map(|dir| expand_tilde(&dir.to_string_lossy())),
    };
    info!(
        instances = instances.len(),
        nodes = opts.nodes.len(),
        duration = %humantime::format_duration(opts.duration),
        "tracing, press Ctrl-C to stop early"
    );

    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });
    let outcomes = run_trace(instances, &opts, cancel).await;
    interrupt.abort();

    print!("{}", render_outcomes(&outcomes, args.print, ctx.style));

    let failed = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, TraceOutcome::Failed { .. }))
        .count();
    if failed == outcomes.len() {
        anyhow::bail!("trace failed on all {} instances", failed);
    }
    Ok(())
}

fn render_outcomes(outcomes: &[TraceOutcome], full: bool, style: StylePolicy) -> String {
    let mut out = Report::default();
    for outcome in outcomes {
        let TraceOutcome::Captured {
            instance,
            result,
            saved,
            ..
        } = outcome
        else {
            continue;
        };
        let mut heading = Line::new();
        heading
            .push("= instance ", Style::Label)
            .push(instance.id.clone(), Style::Value)
            .push(": traced ", Style::Label)
            .push(result.packets().len().to_string(), Style::Value)
            .push(" packets", Style::Label);
        match saved {
            Some(Ok(path)) => {
                heading
                    .push(" | saved to ", Style::Plain)
                    .push(path.display().to_string(), Style::Plain);
            }
            Some(Err(err)) => {
                heading
                    .push(" | ", Style::Plain)
                    .push(format!("not saved: {err}"), Style::Error);
            }
            None => {}
        }
        out.push(heading);

        if full {
            out.extend(render_trace_report(result));
        } else {
            for packet in result.packets() {
                out.push(render_packet_summary(packet));
            }
        }
    }
    style.render(&out)
}
