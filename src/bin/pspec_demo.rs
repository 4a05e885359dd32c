use turbulence_stats::config::pspec::{self, SpectrumInput};
use turbulence_stats::diagnostics::{
    InputDescriptor, SpectrumReport, SpectrumSummary, TimingBreakdown,
};
use turbulence_stats::distance::{PowerLawDistance, PowerLawStatistic, SlopeComparison};
use turbulence_stats::field::io::{load_field, write_json_file};
use turbulence_stats::field::{Field, FieldHeader, Map2};
use turbulence_stats::spectrum::{Mvc, PowerSpectrum, SpectrumRunOptions, SpectrumStatistic, Vca};
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
    let config = pspec::load_config(Path::new(&config_path))?;

    let kind = config.input.kind_name();
    let inputs: Vec<&SpectrumInput> = std::iter::once(&config.input)
        .chain(config.compare_with.iter())
        .collect();
    if let Some(other) = inputs.iter().find(|i| i.kind_name() != kind) {
        return Err(format!(
            "Cannot compare a {kind} statistic with a {} statistic",
            other.kind_name()
        ));
    }

    let header = config.header.as_ref();
    let mut timings = TimingBreakdown::default();
    let (datasets, comparison) = match kind {
        "power" => {
            let stats = open_all(&inputs, |i| open_power(i, header), &mut timings)?;
            analyse(stats, &config.run, &mut timings)?
        }
        "vca" => {
            let stats = open_all(&inputs, |i| open_vca(i, header), &mut timings)?;
            analyse(stats, &config.run, &mut timings)?
        }
        "mvc" => {
            let stats = open_all(&inputs, |i| open_mvc(i, header), &mut timings)?;
            analyse(stats, &config.run, &mut timings)?
        }
        other => return Err(format!("Unsupported spectrum input kind: {other}")),
    };
    timings.close();

    println!("{kind} spectrum");
    for summary in &datasets {
        println!("  {}", summary.summary_line());
    }
    if let Some(cmp) = &comparison {
        println!(
            "  distance: {:.4} (slopes {:.4} vs {:.4})",
            cmp.distance, cmp.slope1, cmp.slope2
        );
    }
    println!("  total {:.2} ms", timings.total_ms);

    let report = SpectrumReport {
        kind: kind.to_string(),
        datasets,
        comparison,
        timings,
    };
    write_json_file(&config.output.result_json, &report).map_err(|e| e.to_string())?;
    println!("Saved report to {}", config.output.result_json.display());
    Ok(())
}

fn usage() -> String {
    "Usage: pspec_demo <config.json>".to_string()
}

fn open_all<S>(
    inputs: &[&SpectrumInput],
    open: impl Fn(&SpectrumInput) -> Result<(InputDescriptor, S), String>,
    timings: &mut TimingBreakdown,
) -> Result<Vec<(InputDescriptor, S)>, String> {
    inputs
        .iter()
        .enumerate()
        .map(|(i, input)| timings.measure(format!("load dataset {i}"), || open(*input)))
        .collect()
}

fn analyse<S>(
    mut stats: Vec<(InputDescriptor, S)>,
    opts: &SpectrumRunOptions,
    timings: &mut TimingBreakdown,
) -> Result<(Vec<SpectrumSummary>, Option<SlopeComparison>), String>
where
    S: SpectrumStatistic + PowerLawStatistic,
{
    let mut summaries = Vec::with_capacity(stats.len());
    for (input, stat) in stats.iter_mut() {
        timings
            .measure(format!("{} run", input.label), || stat.run(opts).map(|_| ()))
            .map_err(|e| format!("{}: {e}", input.label))?;
        let summary = SpectrumSummary::from_analysis(input.clone(), stat.analysis())
            .map_err(|e| e.to_string())?;
        summaries.push(summary);
    }
    let comparison = match stats.as_slice() {
        [(_, a), (_, b)] => Some(
            PowerLawDistance::new(a, b)
                .compare()
                .map_err(|e| e.to_string())?,
        ),
        _ => None,
    };
    Ok((summaries, comparison))
}

fn open_field(path: &Path, header: Option<&FieldHeader>) -> Result<Field, String> {
    let field = load_field(path).map_err(|e| e.to_string())?;
    match header {
        Some(header) if !field.has_header() => {
            let (data, _) = field.into_parts();
            let mut header = header.clone();
            if header.axes.len() != data.ndim() {
                header.axes = FieldHeader::for_ndim(data.ndim()).axes;
            }
            Field::new(data, header).map_err(|e| e.to_string())
        }
        _ => Ok(field),
    }
}

fn open_power(
    input: &SpectrumInput,
    header: Option<&FieldHeader>,
) -> Result<(InputDescriptor, PowerSpectrum), String> {
    let SpectrumInput::Power { path } = input else {
        return Err(format!("Expected a power input, got {}", input.kind_name()));
    };
    let field = open_field(path, header)?;
    let descriptor = InputDescriptor::new(path.display().to_string(), field.data());
    let stat = PowerSpectrum::from_field(field).map_err(|e| e.to_string())?;
    Ok((descriptor, stat))
}

fn open_vca(
    input: &SpectrumInput,
    header: Option<&FieldHeader>,
) -> Result<(InputDescriptor, Vca), String> {
    let SpectrumInput::Vca {
        path,
        channel_binning,
    } = input
    else {
        return Err(format!("Expected a vca input, got {}", input.kind_name()));
    };
    let field = open_field(path, header)?;
    let descriptor = InputDescriptor::new(path.display().to_string(), field.data());
    let mut stat = Vca::from_field(field).map_err(|e| e.to_string())?;
    if let Some(factor) = channel_binning {
        stat = stat
            .with_channel_binning(*factor)
            .map_err(|e| e.to_string())?;
    }
    Ok((descriptor, stat))
}

fn open_mvc(
    input: &SpectrumInput,
    header: Option<&FieldHeader>,
) -> Result<(InputDescriptor, Mvc), String> {
    let SpectrumInput::Mvc {
        centroid,
        moment0,
        linewidth,
    } = input
    else {
        return Err(format!("Expected an mvc input, got {}", input.kind_name()));
    };
    let open_map = |path: &Path| -> Result<(Field, Map2), String> {
        let field = open_field(path, header)?;
        let map = field
            .as_map()
            .cloned()
            .ok_or_else(|| format!("{} is not a 2D map", path.display()))?;
        Ok((field, map))
    };
    let (centroid_field, c) = open_map(centroid)?;
    let (_, m0) = open_map(moment0)?;
    let (_, lw) = open_map(linewidth)?;
    let descriptor = InputDescriptor::new(centroid.display().to_string(), centroid_field.data());
    let stat = Mvc::new(c, m0, lw, centroid_field.header().clone()).map_err(|e| e.to_string())?;
    Ok((descriptor, stat))
}
