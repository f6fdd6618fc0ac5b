use structure_detector::config::demo as cfg;
use structure_detector::raster::io::{load_patch, write_json_file};
use structure_detector::{DetectionResult, ProgressEvent, StructureDetector};
use std::env;
use std::path::Path;

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = cfg::load_config(Path::new(&config_path))?;

    let patch = load_patch(&config.patch_path)?;
    let (w, h) = patch.dims();
    let profile = config.resolve_profile()?;
    println!(
        "Patch {}x{} at {:.2} m/cell ({}), profile `{}` [{}]",
        w, h, patch.resolution_m, patch.source, profile.name, profile.structure_type
    );

    let detector = StructureDetector::new(profile)
        .map_err(|issues| format!("Invalid profile:\n  - {}", issues.join("\n  - ")))?;
    let options = config.detect_options();

    let result = if config.streaming {
        detector
            .detect_streaming(&patch, &options, &mut print_progress)
            .map_err(|e| e.to_string())?
    } else {
        detector
            .detect_with_options(&patch, &options)
            .map_err(|e| e.to_string())?
    };

    print_summary(&result);

    if let Some(path) = &config.output.json_out {
        write_json_file(path, &result)?;
        println!("\nJSON report written to {}", path.display());
    }

    Ok(())
}

fn usage() -> String {
    "Usage: detect_demo <config.json>".to_string()
}

fn print_progress(event: ProgressEvent) {
    let streaming = &event.streaming;
    if event.result.valid {
        println!(
            "[{:>5.1}%] {:<12} score={:.3} polarity={} running={:.3}{}",
            streaming.completion_percentage,
            event.module,
            event.result.score,
            event.result.polarity,
            streaming.aggregation.final_score,
            if streaming.early_decision_possible {
                " (early decision possible)"
            } else {
                ""
            }
        );
    } else {
        println!(
            "[{:>5.1}%] {:<12} invalid: {}",
            streaming.completion_percentage, event.module, event.result.reason
        );
    }
}

fn print_summary(result: &DetectionResult) {
    let meta = &result.metadata;
    println!("\nDetection summary");
    println!("  detected: {}", result.detected);
    println!(
        "  final_score: {:.3} (threshold {:.3})",
        result.final_score, meta.detection_threshold
    );
    println!("  confidence: {:.3}", result.confidence);
    println!("  reason: {}", result.reason);
    if meta.early_decision {
        println!("  early_decision: true");
    }
    if result.refinement_attempts > 0 {
        println!("  refinement_attempts: {}", result.refinement_attempts);
        for (round, outcome) in result.refinement_history.iter().enumerate() {
            println!(
                "    round {}: score={:.3} confidence={:.3}",
                round + 1,
                outcome.final_score,
                outcome.confidence
            );
        }
    }

    println!(
        "\nModules ({}/{} valid)",
        meta.modules_valid, meta.modules_planned
    );
    for (name, feature) in &result.feature_results {
        if !feature.valid {
            println!("  {:<12} invalid: {}", name, feature.reason);
        } else if feature.reason.is_empty() {
            println!(
                "  {:<12} score={:.3} polarity={}",
                name, feature.score, feature.polarity
            );
        } else {
            println!(
                "  {:<12} score={:.3} polarity={} ({})",
                name, feature.score, feature.polarity, feature.reason
            );
        }
    }

    let timing = &meta.timing;
    print!("\nTimings (ms):");
    for stage in &timing.stages {
        print!(" {}={:.3}", stage.label, stage.elapsed_ms);
    }
    println!(" total={:.3}", timing.total_ms);
}
