use turbulence_stats::config::dendro;
use turbulence_stats::diagnostics::{
    HierarchyReport, HierarchySummary, InputDescriptor, TimingBreakdown,
};
use turbulence_stats::distance::HierarchyDistance;
use turbulence_stats::field::io::{load_field, write_json_file};
use turbulence_stats::hierarchy::HierarchyStats;
use std::env;
use std::path::Path;

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    env_logger::init();
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = dendro::load_config(Path::new(&config_path))?;
    let min_deltas = config.resolve_min_deltas();

    let mut timings = TimingBreakdown::default();
    let mut datasets: Vec<(InputDescriptor, HierarchyStats)> = Vec::new();
    for path in std::iter::once(&config.input).chain(config.compare_with.iter()) {
        let label = path.display().to_string();
        let field = timings
            .measure(format!("load {label}"), || load_field(path))
            .map_err(|e| e.to_string())?;
        let input = InputDescriptor::new(label, field.data());
        let mut stats = HierarchyStats::new(field, Some(min_deltas.clone()), config.params.clone())
            .map_err(|e| e.to_string())?;
        timings
            .measure(format!("{} hierarchy", input.label), || {
                stats.run(&config.run).map(|_| ())
            })
            .map_err(|e| format!("{}: {e}", input.label))?;
        datasets.push((input, stats));
    }

    if let (Some(saved), Some((_, stats))) = (&config.output.saved_stats, datasets.first()) {
        stats
            .save_results(saved, config.output.keep_data)
            .map_err(|e| e.to_string())?;
        println!("Saved statistics to {}", saved.display());
    }

    let distance = match datasets.as_slice() {
        [(_, a), (_, b)] => {
            let mut metric = HierarchyDistance::new(
                a,
                b,
                config.distance.nbins,
                config.distance.min_features,
            )
            .map_err(|e| e.to_string())?;
            let report = timings
                .measure("distance", || metric.distance_metric())
                .map_err(|e| e.to_string())?;
            Some(report)
        }
        _ => None,
    };
    timings.close();

    let summaries = datasets
        .iter()
        .map(|(input, stats)| HierarchySummary::from_stats(input.clone(), stats))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;

    println!("dendrogram statistics over {} thresholds", min_deltas.len());
    for summary in &summaries {
        println!("  {}", summary.summary_line());
    }
    if let Some(d) = &distance {
        println!(
            "  distance: histogram={:.4} numfeature={:.4} (levels 0..{})",
            d.histogram_distance, d.numfeature_distance, d.cutoff
        );
    }
    println!("  total {:.2} ms", timings.total_ms);

    let report = HierarchyReport {
        datasets: summaries,
        distance,
        timings,
    };
    write_json_file(&config.output.result_json, &report).map_err(|e| e.to_string())?;
    println!("Saved report to {}", config.output.result_json.display());
    Ok(())
}

fn usage() -> String {
    "Usage: dendro_demo <config.json>".to_string()
}
