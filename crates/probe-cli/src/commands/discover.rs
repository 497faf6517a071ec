use probe_core::orchestrator::{run_discover, DiscoverOptions, DiscoverReport};
use probe_core::render::{render_cli_outputs, render_instance, render_ipsec_correlation, Report};
use tracing::warn;

use super::CommandContext;
use crate::cli::{DiscoverArgs, OutputFormat};
use crate::output::StylePolicy;

pub(crate) async fn run(ctx: &CommandContext, args: &DiscoverArgs) -> anyhow::Result<()> {
    let opts = DiscoverOptions {
        extra_clis: args.extra_clis.clone(),
        nsm: args.nsm,
        ipsec_agg: args.ipsec_agg,
    };
    if opts.ipsec_agg && !opts.nsm {
        warn!("--ipsec-agg only applies to NSM instances, pass --nsm to enable it");
    }

    let report = run_discover(&ctx.discovery, &ctx.queries, &opts).await?;
    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print!("{}", render_discover(&report, args.print_clis, ctx.style)),
    }
    Ok(())
}

fn render_discover(report: &DiscoverReport, print_clis: bool, style: StylePolicy) -> String {
    let mut out = Report::default();
    for record in report.records() {
        out.extend(render_instance(record));
        if print_clis {
            out.extend(render_cli_outputs(record));
        }
    }
    if let Some(ipsec) = &report.ipsec {
        out.extend(render_ipsec_correlation(ipsec));
    }
    style.render(&out)
}
